//! Storage keys
//!
//! `Events` routes to batch framing; every other key is a scalar held in
//! the preference store.

use std::fmt;

/// Key accepted by `BatchStore::write` / `read`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// Serialized events (batch files)
    Events,
    UserId,
    Traits,
    AnonymousId,
    Settings,
    AppVersion,
    AppBuild,
    DeviceId,
}

impl StorageKey {
    /// Preference key name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Events => "segment.events",
            Self::UserId => "segment.userId",
            Self::Traits => "segment.traits",
            Self::AnonymousId => "segment.anonymousId",
            Self::Settings => "segment.settings",
            Self::AppVersion => "segment.app.version",
            Self::AppBuild => "segment.app.build",
            Self::DeviceId => "segment.deviceId",
        }
    }

    /// Whether this key is backed by the preference store
    #[inline]
    pub const fn is_scalar(&self) -> bool {
        !matches!(self, Self::Events)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
