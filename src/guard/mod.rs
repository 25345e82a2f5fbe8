//! Authorization guard: policy evaluation against the caller's identity.
//!
//! Checks are read-only and re-read the resource on every call; nothing is
//! cached across requests. A resource that disappears between the check and
//! the handler surfaces as not-found from the handler, not from here.

use std::sync::Arc;

use tracing::debug;

use crate::error::AppResult;
use crate::models::Principal;
use crate::repositories::ActivityRepository;
use uuid::Uuid;

/// Policies a request kind can attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// The caller must be the host of the target activity.
    IsHost,
}

/// Outcome of a policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

/// Denial text shared by the missing-resource and wrong-caller cases, so a
/// denial never reveals whether the resource exists.
const NOT_HOST: &str = "you are not the host of this activity";

pub struct Guard {
    activities: Arc<dyn ActivityRepository>,
}

impl Guard {
    pub fn new(activities: Arc<dyn ActivityRepository>) -> Self {
        Self { activities }
    }

    pub async fn evaluate(
        &self,
        policy: Policy,
        principal: &Principal,
        resource: Uuid,
    ) -> AppResult<Decision> {
        match policy {
            Policy::IsHost => {
                let host = self.activities.host_of(resource).await?;
                let decision = match host {
                    Some(host) if host == principal.username => Decision::Allow,
                    Some(_) | None => Decision::Deny(NOT_HOST.to_string()),
                };
                debug!(
                    resource = %resource,
                    caller = %principal.username,
                    allowed = decision == Decision::Allow,
                    "is-host check"
                );
                Ok(decision)
            }
        }
    }
}
