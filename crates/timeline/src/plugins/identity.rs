//! Identity tracking
//!
//! Keeps the anonymous id, user id and traits in a [`StateStore`], persists
//! them through the batch store's scalar keys and stamps them on events.

use std::sync::Arc;

use async_trait::async_trait;
use beacon_protocol::{Event, EventType};
use beacon_storage::{BatchStore, StorageKey};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{Plugin, PluginKind, PluginResult, StateStore};

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;

/// Identity snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserInfo {
    pub anonymous_id: String,
    pub user_id: Option<String>,
    pub traits: Map<String, Value>,
}

/// Before-stage plugin stamping identity on events
pub struct IdentityPlugin {
    storage: Arc<BatchStore>,
    state: StateStore<UserInfo>,
}

impl IdentityPlugin {
    /// Load identity from storage, minting an anonymous id on first use
    pub fn load(storage: Arc<BatchStore>) -> PluginResult<Self> {
        let anonymous_id = match storage.read(StorageKey::AnonymousId) {
            Some(id) if !id.is_empty() => id,
            _ => {
                let id = Uuid::new_v4().to_string();
                storage.write(StorageKey::AnonymousId, &id)?;
                id
            }
        };

        let traits = storage
            .read(StorageKey::Traits)
            .and_then(|raw| serde_json::from_str::<Map<String, Value>>(&raw).ok())
            .unwrap_or_default();

        let info = UserInfo {
            anonymous_id,
            user_id: storage.read(StorageKey::UserId),
            traits,
        };

        Ok(Self {
            storage,
            state: StateStore::new(info),
        })
    }

    /// Current identity snapshot
    pub fn user_info(&self) -> Arc<UserInfo> {
        self.state.current()
    }

    /// Subscribe to identity changes
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<Arc<UserInfo>> {
        self.state.subscribe()
    }

    /// Forget the user and mint a new anonymous id
    pub fn reset(&self) -> PluginResult<()> {
        let info = self.state.dispatch(|_| UserInfo {
            anonymous_id: Uuid::new_v4().to_string(),
            ..UserInfo::default()
        });

        self.storage.write(StorageKey::AnonymousId, &info.anonymous_id)?;
        self.storage.remove(StorageKey::UserId)?;
        self.storage.remove(StorageKey::Traits)?;
        Ok(())
    }

    fn identify(&self, event: &Event) -> PluginResult<()> {
        let user_id = event.user_id.clone();
        let traits = event.traits().cloned();

        let info = self.state.dispatch(|current| UserInfo {
            anonymous_id: current.anonymous_id.clone(),
            user_id: user_id.or_else(|| current.user_id.clone()),
            traits: traits.unwrap_or_else(|| current.traits.clone()),
        });

        self.persist(&info)
    }

    fn alias(&self, event: &mut Event) -> PluginResult<()> {
        let current = self.state.current();
        let previous = current
            .user_id
            .clone()
            .unwrap_or_else(|| current.anonymous_id.clone());

        event
            .payload
            .entry("previousId")
            .or_insert(Value::String(previous));

        let new_id = event.user_id.clone();
        let info = self.state.dispatch(|current| UserInfo {
            user_id: new_id.or_else(|| current.user_id.clone()),
            ..current.clone()
        });

        self.persist(&info)
    }

    fn persist(&self, info: &UserInfo) -> PluginResult<()> {
        if let Some(user_id) = &info.user_id {
            self.storage.write(StorageKey::UserId, user_id)?;
        }
        let traits = serde_json::to_string(&info.traits)?;
        self.storage.write(StorageKey::Traits, &traits)?;
        Ok(())
    }
}

#[async_trait]
impl Plugin for IdentityPlugin {
    fn kind(&self) -> PluginKind {
        PluginKind::Before
    }

    fn name(&self) -> &str {
        "identity"
    }

    async fn execute(&self, mut event: Event) -> PluginResult<Option<Event>> {
        match event.event_type {
            EventType::Identify => self.identify(&event)?,
            EventType::Alias => self.alias(&mut event)?,
            _ => {}
        }

        let info = self.state.current();
        if event.anonymous_id.is_empty() {
            event.anonymous_id = info.anonymous_id.clone();
        }
        if event.user_id.is_none() {
            event.user_id = info.user_id.clone();
        }

        Ok(Some(event))
    }
}

impl std::fmt::Debug for IdentityPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityPlugin")
            .field("user_info", &self.state.current())
            .finish()
    }
}
