use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::storage::config::SessionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    UpdateEvents,
    DeleteEvents,
    ViewConnections,
}

/// Capability checks and identity of the current request.
#[cfg_attr(test, mockall::automock)]
pub trait Authorizer {
    fn has_capability(&self, capability: Capability) -> bool;
    fn current_organization_id(&self) -> Option<i64>;
    fn current_user_id(&self) -> Option<i64>;
}

/// Grants a fixed capability set to one user.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionAuthorizer {
    organization_id: Option<i64>,
    user_id: Option<i64>,
    granted: HashSet<Capability>,
}

impl SessionAuthorizer {
    pub fn new(
        organization_id: Option<i64>,
        user_id: Option<i64>,
        granted: impl IntoIterator<Item = Capability>,
    ) -> Self {
        Self {
            organization_id,
            user_id,
            granted: granted.into_iter().collect(),
        }
    }

    pub fn from_config(session: &SessionConfig) -> Self {
        Self::new(
            session.organization_id,
            Some(session.user_id),
            session.capabilities.iter().copied(),
        )
    }
}

impl Authorizer for SessionAuthorizer {
    fn has_capability(&self, capability: Capability) -> bool {
        self.granted.contains(&capability)
    }

    fn current_organization_id(&self) -> Option<i64> {
        self.organization_id
    }

    fn current_user_id(&self) -> Option<i64> {
        self.user_id
    }
}
