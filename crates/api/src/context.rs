use std::sync::Arc;

use flowdeck_auth::Actor;
use flowdeck_core::UserId;

/// The resolved account behind the current request.
///
/// Inserted by the auth middleware alongside the `TenantContext`; handlers
/// that need identity fields (and not just permissions) read it from here.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    actor: Arc<Actor>,
}

impl CurrentUser {
    pub fn new(actor: Actor) -> Self {
        Self {
            actor: Arc::new(actor),
        }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn user_id(&self) -> UserId {
        self.actor.user_id
    }

    pub fn username(&self) -> &str {
        &self.actor.username
    }
}
