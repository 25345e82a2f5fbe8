//! Request dispatch: every command/query is routed to exactly one
//! registered handler, after payload validation and policy authorization.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::guard::{Decision, Guard};
use crate::models::Principal;
use crate::repositories::{ActivityRepository, PhotoGateway, UserRepository};

pub mod activities;
pub mod comments;
pub mod photos;
pub mod profiles;
pub mod requests;
pub mod user;

pub use requests::{Reply, Request, RequestKind};

/// The single function executing a given request kind.
///
/// Handlers are pure request-to-reply mappings over the persistence
/// collaborators; they hold no dispatcher state.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(
        &self,
        principal: Option<&Principal>,
        request: Request,
        cancel: &CancellationToken,
    ) -> AppResult<Reply>;
}

/// Routes requests to handlers. Built once at startup; duplicate
/// registrations fail there, never at call time.
pub struct Dispatcher {
    handlers: HashMap<RequestKind, Arc<dyn RequestHandler>>,
    guard: Guard,
}

impl Dispatcher {
    pub fn new(guard: Guard) -> Self {
        Self {
            handlers: HashMap::new(),
            guard,
        }
    }

    /// Register the handler for a request kind. Fails if the kind already
    /// has one.
    pub fn register(
        &mut self,
        kind: RequestKind,
        handler: Arc<dyn RequestHandler>,
    ) -> AppResult<()> {
        if self.handlers.contains_key(&kind) {
            return Err(AppError::Config(format!(
                "handler for {:?} is already registered",
                kind
            )));
        }
        self.handlers.insert(kind, handler);
        Ok(())
    }

    /// Validate, authorize, then invoke the handler.
    ///
    /// Cancellation is observed cooperatively: a token cancelled before the
    /// handler starts fails the dispatch with [`AppError::Canceled`]. No
    /// retries happen at this layer.
    pub async fn dispatch(
        &self,
        principal: Option<&Principal>,
        request: Request,
        cancel: &CancellationToken,
    ) -> AppResult<Reply> {
        if cancel.is_cancelled() {
            return Err(AppError::Canceled);
        }

        request.validate().map_err(AppError::Validation)?;

        if let Some((policy, resource)) = request.policy() {
            let principal = principal.ok_or_else(|| {
                AppError::Unauthorized("authentication required".to_string())
            })?;
            match self.guard.evaluate(policy, principal, resource).await? {
                Decision::Allow => {}
                Decision::Deny(reason) => return Err(AppError::Forbidden(reason)),
            }
        }

        if cancel.is_cancelled() {
            return Err(AppError::Canceled);
        }

        let kind = request.kind();
        let handler = self.handlers.get(&kind).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("no handler registered for {:?}", kind))
        })?;
        debug!(kind = ?kind, command = kind.is_command(), "dispatch");
        handler.handle(principal, request, cancel).await
    }
}

/// A handler was routed a request of the wrong kind; only reachable through
/// a mis-registration.
pub(crate) fn mismatch(kind: RequestKind) -> AppError {
    AppError::Internal(anyhow::anyhow!(
        "handler for {:?} received a mismatched request",
        kind
    ))
}

pub(crate) fn require_principal(principal: Option<&Principal>) -> AppResult<&Principal> {
    principal.ok_or_else(|| AppError::Unauthorized("authentication required".to_string()))
}

/// Wire the full handler set against the persistence collaborators.
pub fn build_dispatcher(
    activities: Arc<dyn ActivityRepository>,
    users: Arc<dyn UserRepository>,
    photos: Arc<dyn PhotoGateway>,
) -> AppResult<Dispatcher> {
    let guard = Guard::new(activities.clone());
    let mut dispatcher = Dispatcher::new(guard);

    dispatcher.register(
        RequestKind::ListActivities,
        Arc::new(activities::ListHandler::new(activities.clone())),
    )?;
    dispatcher.register(
        RequestKind::ActivityDetails,
        Arc::new(activities::DetailsHandler::new(activities.clone())),
    )?;
    dispatcher.register(
        RequestKind::CreateActivity,
        Arc::new(activities::CreateHandler::new(
            activities.clone(),
            users.clone(),
        )),
    )?;
    dispatcher.register(
        RequestKind::EditActivity,
        Arc::new(activities::EditHandler::new(activities.clone())),
    )?;
    dispatcher.register(
        RequestKind::DeleteActivity,
        Arc::new(activities::DeleteHandler::new(activities.clone())),
    )?;
    dispatcher.register(
        RequestKind::Attend,
        Arc::new(activities::AttendHandler::new(
            activities.clone(),
            users.clone(),
        )),
    )?;
    dispatcher.register(
        RequestKind::Unattend,
        Arc::new(activities::UnattendHandler::new(activities.clone())),
    )?;
    dispatcher.register(
        RequestKind::CreateComment,
        Arc::new(comments::CreateCommentHandler::new(
            activities.clone(),
            users.clone(),
        )),
    )?;
    dispatcher.register(
        RequestKind::CurrentUser,
        Arc::new(user::CurrentUserHandler::new(users.clone())),
    )?;
    dispatcher.register(
        RequestKind::ProfileDetails,
        Arc::new(profiles::DetailsHandler::new(users.clone())),
    )?;
    dispatcher.register(
        RequestKind::EditProfile,
        Arc::new(profiles::EditHandler::new(users.clone())),
    )?;
    dispatcher.register(
        RequestKind::AddPhoto,
        Arc::new(photos::AddHandler::new(users.clone(), photos.clone())),
    )?;
    dispatcher.register(
        RequestKind::SetMainPhoto,
        Arc::new(photos::SetMainHandler::new(users.clone())),
    )?;
    dispatcher.register(
        RequestKind::DeletePhoto,
        Arc::new(photos::DeleteHandler::new(users, photos)),
    )?;

    Ok(dispatcher)
}
