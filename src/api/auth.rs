use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::observability::RequestId;
use super::{AccountDto, ApiError, ApiResponse, AppState, MessageResponse};
use crate::domain::{AccountId, ActorContext};
use crate::models::account::Account;

/// Session key holding the signed-in account id.
pub const SESSION_ACCOUNT_KEY: &str = "account_id";

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "login_identifier", alias = "employee_id")]
    pub identifier: String,
    #[serde(alias = "password")]
    pub secret: String,
}

// ============================================================================
// Extractors
// ============================================================================

/// Account resolved by [`auth_middleware`] for the current request.
#[derive(Clone, Debug)]
pub struct CurrentAccount(pub Account);

/// Request metadata for operations that may run without a signed-in account.
pub struct RequestContext(pub ActorContext);

impl<S: Send + Sync> FromRequestParts<S> for RequestContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let account_id = parts
            .extensions
            .get::<CurrentAccount>()
            .map(|current| current.0.id);
        let request_id = parts.extensions.get::<RequestId>().map(|id| id.0.clone());

        Ok(Self(ActorContext {
            account_id,
            request_id,
        }))
    }
}

/// Signed-in account plus the actor context handed to services.
pub struct Authenticated {
    pub account: Account,
    pub actor: ActorContext,
}

impl<S: Send + Sync> FromRequestParts<S> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(CurrentAccount(account)) = parts.extensions.get::<CurrentAccount>().cloned()
        else {
            return Err(ApiError::unauthorized());
        };
        let RequestContext(actor) = RequestContext::from_request_parts(parts, state).await?;

        Ok(Self { account, actor })
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Restores the session's account through the active-only read path. A
/// session whose account was deleted or disabled is flushed and rejected.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let account_id = session
        .get::<i32>(SESSION_ACCOUNT_KEY)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to read session: {e}")))?;

    let Some(account_id) = account_id else {
        return Err(ApiError::unauthorized());
    };

    let Some(account) = state.auth().session_account(AccountId::new(account_id)).await? else {
        tracing::info!(account_id, "Session account is no longer active, signing out");
        let _ = session.flush().await;
        return Err(ApiError::unauthorized());
    };

    tracing::Span::current().record("account_id", account.id.value());
    request.extensions_mut().insert(CurrentAccount(account));

    Ok(next.run(request).await)
}

/// Rejects non-administrators. Must run after [`auth_middleware`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    match request.extensions().get::<CurrentAccount>() {
        Some(CurrentAccount(account)) if account.is_admin => Ok(next.run(request).await),
        Some(_) => Err(ApiError::forbidden()),
        None => Err(ApiError::unauthorized()),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    RequestContext(actor): RequestContext,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AccountDto>>, ApiError> {
    let account = state
        .auth()
        .login(&actor, &payload.identifier, &payload.secret)
        .await?;

    // New id on privilege change.
    session
        .cycle_id()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to rotate session: {e}")))?;
    session
        .insert(SESSION_ACCOUNT_KEY, account.id.value())
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;

    Ok(Json(ApiResponse::success(AccountDto::from(account))))
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    session: Session,
    RequestContext(actor): RequestContext,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if let Ok(Some(account_id)) = session.get::<i32>(SESSION_ACCOUNT_KEY).await {
        let account_id = AccountId::new(account_id);
        if let Ok(Some(account)) = state.auth().session_account(account_id).await {
            let actor = ActorContext {
                account_id: Some(account_id),
                ..actor
            };
            state.auth().logout(&actor, &account).await;
        }
    }

    session
        .flush()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to clear session: {e}")))?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Logged out".to_string(),
    })))
}

/// GET /auth/me
pub async fn get_current_account(auth: Authenticated) -> Json<ApiResponse<AccountDto>> {
    Json(ApiResponse::success(AccountDto::from(auth.account)))
}
