//! Tiered persistence state for the progress store.
//!
//! Replaces ad hoc "remote enabled" / "local available" flags with one
//! state machine. Transitions are one-way: a tier that fails is disabled
//! for the rest of the session and only a fresh session re-attempts it.

/// Which persistence tiers the store still trusts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceTier {
    /// Remote is authoritative; the local cache mirrors it when available.
    RemotePreferred { local_available: bool },
    /// Remote disabled for the session; the local cache is the durable tier.
    LocalOnly,
    /// Both tiers disabled; the in-memory snapshot is all there is. Nothing
    /// survives a restart, but no operation fails either.
    MemoryOnly,
}

impl PersistenceTier {
    /// Initial state from the session configuration and the one-time local
    /// medium probe.
    #[must_use]
    pub fn new(remote_enabled: bool, local_available: bool) -> Self {
        match (remote_enabled, local_available) {
            (true, local_available) => Self::RemotePreferred { local_available },
            (false, true) => Self::LocalOnly,
            (false, false) => Self::MemoryOnly,
        }
    }

    #[must_use]
    pub fn remote_active(self) -> bool {
        matches!(self, Self::RemotePreferred { .. })
    }

    #[must_use]
    pub fn local_active(self) -> bool {
        matches!(
            self,
            Self::RemotePreferred {
                local_available: true
            } | Self::LocalOnly
        )
    }

    /// Disable the remote tier for the rest of the session.
    pub fn demote_remote(&mut self) {
        if let Self::RemotePreferred { local_available } = *self {
            *self = if local_available {
                Self::LocalOnly
            } else {
                Self::MemoryOnly
            };
        }
    }

    /// Disable the local tier for the rest of the session.
    pub fn demote_local(&mut self) {
        match *self {
            Self::RemotePreferred { .. } => {
                *self = Self::RemotePreferred {
                    local_available: false,
                };
            }
            Self::LocalOnly => *self = Self::MemoryOnly,
            Self::MemoryOnly => {}
        }
    }
}
