//! # Authorization Guard
//!
//! One capability check per request, parameterized by policy and applied by
//! an extractor before the handler body runs.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Authorized<P> Extraction                             │
//! │                                                                         │
//! │  Authorization: Bearer eyJhbGciOi...                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  extract_bearer_token ── missing/empty ──────────────► 401             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  JwtManager::validate ── bad signature / expired ────► 401             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  P::LOAD_ACCOUNT? ── yes ── accounts().get_by_id ── gone ──► 401       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  P::permits(&caller) ── role / approval mismatch ────► 403             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  handler(caller, ...)                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! | Policy            | Token | Live account row | Requirement          |
//! |-------------------|-------|------------------|----------------------|
//! | `AnyAccount`      | yes   | no               | none                 |
//! | `ApprovedAccount` | yes   | yes              | admin or approved    |
//! | `AdminOnly`       | yes   | no               | role = ADMIN         |

use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::warn;

use pharmatrade_core::{Account, Role};

use crate::auth::{extract_bearer_token, Claims};
use crate::error::ApiError;
use crate::AppState;

// =============================================================================
// Caller
// =============================================================================

/// The authenticated principal behind a request.
#[derive(Debug, Clone)]
pub struct Caller {
    /// Verified token claims
    pub claims: Claims,

    /// Live account row, present when the policy loads it
    pub account: Option<Account>,
}

impl Caller {
    pub fn account_id(&self) -> i64 {
        self.claims.user_id
    }

    pub fn role(&self) -> Role {
        self.account.as_ref().map_or(self.claims.role, |a| a.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Role::Admin
    }
}

// =============================================================================
// Policies
// =============================================================================

/// A capability requirement checked against the caller.
pub trait AccessPolicy: 'static {
    /// Whether the account row must be read before `permits` runs.
    const LOAD_ACCOUNT: bool = false;

    fn permits(caller: &Caller) -> Result<(), ApiError>;
}

/// Any holder of a valid token.
#[derive(Debug)]
pub struct AnyAccount;

impl AccessPolicy for AnyAccount {
    fn permits(_caller: &Caller) -> Result<(), ApiError> {
        Ok(())
    }
}

/// Administrators, or retailers/clinics whose application was approved.
#[derive(Debug)]
pub struct ApprovedAccount;

impl AccessPolicy for ApprovedAccount {
    const LOAD_ACCOUNT: bool = true;

    fn permits(caller: &Caller) -> Result<(), ApiError> {
        match &caller.account {
            Some(account) if account.is_approved() => Ok(()),
            _ => Err(ApiError::forbidden("Account is not approved")),
        }
    }
}

/// Administrators only.
#[derive(Debug)]
pub struct AdminOnly;

impl AccessPolicy for AdminOnly {
    fn permits(caller: &Caller) -> Result<(), ApiError> {
        if caller.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Administrator access required"))
        }
    }
}

// =============================================================================
// Extractor
// =============================================================================

/// Extractor that succeeds only when the caller satisfies `P`.
///
/// ## Usage
/// ```rust,ignore
/// async fn create_product(
///     State(state): State<Arc<AppState>>,
///     Authorized(caller, ..): Authorized<AdminOnly>,
///     ApiJson(body): ApiJson<ProductBody>,
/// ) -> Result<(StatusCode, Json<ProductDto>), ApiError> { ... }
/// ```
pub struct Authorized<P: AccessPolicy>(pub Caller, pub PhantomData<fn() -> P>);

impl<P: AccessPolicy> Deref for Authorized<P> {
    type Target = Caller;

    fn deref(&self) -> &Caller {
        &self.0
    }
}

impl<P: AccessPolicy> FromRequestParts<Arc<AppState>> for Authorized<P> {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(extract_bearer_token)
            .ok_or_else(|| ApiError::unauthorized("Missing authorization token"))?;

        let claims = state.tokens.validate(token)?;

        let account = if P::LOAD_ACCOUNT {
            let account = state
                .db
                .accounts()
                .get_by_id(claims.user_id)
                .await?
                .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;
            Some(account)
        } else {
            None
        };

        let caller = Caller { claims, account };

        if let Err(e) = P::permits(&caller) {
            warn!(
                account_id = caller.account_id(),
                role = %caller.role(),
                path = %parts.uri.path(),
                "Access denied"
            );
            return Err(e);
        }

        Ok(Authorized(caller, PhantomData))
    }
}
