mod api;
mod client;
mod wire;

pub use api::VocabApi;
pub use client::{HttpRemoteClient, RemoteConfig, RemoteConfigError};
