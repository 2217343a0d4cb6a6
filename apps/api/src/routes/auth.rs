//! Signup and login.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::multipart::{Field, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use pharmatrade_core::validation::{validate_company_name, validate_email, validate_password};
use pharmatrade_core::{ApprovalState, NewAccount, Role};

use crate::auth::{hash_password, verify_password};
use crate::error::ApiError;
use crate::routes::ApiJson;
use crate::AppState;

// =============================================================================
// Signup
// =============================================================================

/// Raw multipart fields, before validation.
#[derive(Default)]
struct SignupForm {
    email: Option<String>,
    password: Option<String>,
    role: Option<String>,
    company_name: Option<String>,
    license: Option<(Option<String>, Vec<u8>)>,
}

impl SignupForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = SignupForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "email" => form.email = Some(text(field).await?),
                "password" => form.password = Some(field.text().await?),
                "role" => form.role = Some(text(field).await?),
                "company_name" | "company" => form.company_name = Some(text(field).await?),
                "license" => {
                    let file_name = field.file_name().map(str::to_string);
                    let bytes = field.bytes().await?;
                    form.license = Some((file_name, bytes.to_vec()));
                }
                _ => debug!(field = %name, "Ignoring unknown signup field"),
            }
        }

        Ok(form)
    }
}

async fn text(field: Field<'_>) -> Result<String, ApiError> {
    Ok(field.text().await?.trim().to_string())
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation(format!("{} is required", field)))
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: String,
    pub user_id: i64,
    pub approval_state: ApprovalState,
}

/// POST /api/signup
///
/// Multipart form: `email`, `password`, `role`, `company_name` (or
/// `company`), and a `license` file unless the role is ADMIN.
#[tracing::instrument(skip_all)]
pub async fn signup(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    let form = SignupForm::read(multipart?).await?;

    let email = validate_email(&required(form.email, "email")?)?;
    let password = required(form.password, "password")?;
    validate_password(&password)?;
    let role = Role::from_str(&required(form.role, "role")?)?;
    let company_name = validate_company_name(form.company_name.as_deref())?;

    if role == Role::Admin && !state.config.allow_admin_signup {
        warn!(%email, "Administrator signup attempted while disabled");
        return Err(ApiError::forbidden("Administrator signup is disabled"));
    }

    if role.requires_review() && form.license.is_none() {
        return Err(ApiError::validation("License document is required"));
    }

    let password_hash = hash_password(password).await?;

    let license_document = match &form.license {
        Some((file_name, bytes)) => Some(state.licenses.save(file_name.as_deref(), bytes).await?),
        None => None,
    };

    let new = NewAccount {
        email,
        password_hash,
        role,
        company_name,
        license_document: license_document.clone(),
    };

    let account = match state.db.accounts().insert(new).await {
        Ok(account) => account,
        Err(e) => {
            if let Some(stored) = &license_document {
                state.licenses.remove(stored).await;
            }
            return Err(e.into());
        }
    };

    let message = if account.is_approved() {
        "Signup successful."
    } else {
        "Signup successful. Wait for Admin approval."
    };

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: message.to_string(),
            user_id: account.id,
            approval_state: account.approval_state,
        }),
    ))
}

// =============================================================================
// Login
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

/// POST /api/login
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = body.email.trim().to_lowercase();

    let account = state.db.accounts().find_by_email(&email).await?;

    let stored_hash = account.as_ref().map(|a| a.password_hash.clone());
    let verified = verify_password(body.password, stored_hash).await;

    let account = match account {
        Some(account) if verified => account,
        _ => {
            warn!("Login failed: invalid credentials");
            return Err(ApiError::unauthorized("Invalid credentials"));
        }
    };

    if !account.is_approved() {
        warn!(account_id = account.id, state = %account.approval_state, "Login refused");
        return Err(match account.approval_state {
            ApprovalState::Rejected => ApiError::forbidden("Account application was rejected"),
            _ => ApiError::forbidden("Account pending approval from Admin"),
        });
    }

    let issued = state.tokens.issue(&account)?;

    info!(account_id = account.id, role = %account.role, "Login succeeded");

    Ok(Json(LoginResponse {
        token: issued.token,
        role: account.role,
        expires_at: issued.expires_at,
    }))
}
