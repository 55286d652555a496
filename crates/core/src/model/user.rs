use serde::{Deserialize, Serialize};

use crate::model::UserId;

/// A user identity record.
///
/// The `id` namespaces both remote and local storage; `name` is
/// display-only and carries no uniqueness guarantee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
}

impl UserProfile {
    #[must_use]
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}
