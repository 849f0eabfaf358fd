//! Built-in Before-stage plugins

mod context;
mod identity;

pub use context::ContextPlugin;
pub use identity::{IdentityPlugin, UserInfo};
