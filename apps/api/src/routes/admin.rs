//! Administrator endpoints: applicant review and license documents.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use pharmatrade_core::validation::{validate_license_number, validate_review_note};
use pharmatrade_core::{Account, ApprovalDecision, ApprovalState, Role};

use crate::authz::{AdminOnly, Authorized};
use crate::error::ApiError;
use crate::routes::ApiJson;
use crate::AppState;

/// Pending applicant as shown in the review queue.
#[derive(Debug, Serialize)]
pub struct ClientDto {
    pub id: i64,
    pub email: String,
    pub company: Option<String>,
    pub role: Role,
    pub license_link: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ClientDto {
    fn from_account(account: Account, public_base_url: &str) -> Self {
        ClientDto {
            id: account.id,
            license_link: account
                .license_document
                .as_deref()
                .map(|path| format!("{}/{}", public_base_url, path)),
            email: account.email,
            company: account.company_name,
            role: account.role,
            created_at: account.created_at,
        }
    }
}

/// GET /api/clients
#[tracing::instrument(skip_all)]
pub async fn pending_clients(
    State(state): State<Arc<AppState>>,
    _caller: Authorized<AdminOnly>,
) -> Result<Json<Vec<ClientDto>>, ApiError> {
    let pending = state.db.accounts().list_pending_applicants().await?;
    let base = state.config.public_base_url.as_str();

    Ok(Json(
        pending
            .into_iter()
            .map(|account| ClientDto::from_account(account, base))
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub user_id: i64,
    #[serde(default = "default_approve")]
    pub approve: bool,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub rejection_note: Option<String>,
}

fn default_approve() -> bool {
    true
}

impl ReviewRequest {
    fn decision(&self) -> Result<ApprovalDecision, ApiError> {
        if self.approve {
            let license_number = match self.license_number.as_deref().map(str::trim) {
                Some(number) if !number.is_empty() => Some(validate_license_number(number)?),
                _ => None,
            };
            Ok(ApprovalDecision::Approve { license_number })
        } else {
            let note = validate_review_note(self.rejection_note.as_deref())?;
            Ok(ApprovalDecision::Reject { note })
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub message: String,
    pub user: Account,
}

/// POST /api/admin/approve
///
/// Moves a pending applicant to approved or rejected, exactly once.
#[tracing::instrument(skip_all, fields(user_id = body.user_id, approve = body.approve))]
pub async fn review(
    State(state): State<Arc<AppState>>,
    caller: Authorized<AdminOnly>,
    ApiJson(body): ApiJson<ReviewRequest>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let decision = body.decision()?;

    let account = state.db.accounts().review(body.user_id, decision).await?;

    info!(
        account_id = account.id,
        state = %account.approval_state,
        by = caller.account_id(),
        "Account reviewed"
    );

    let message = match account.approval_state {
        ApprovalState::Approved => "User approved successfully",
        _ => "User approval rejected",
    };

    Ok(Json(ReviewResponse {
        message: message.to_string(),
        user: account,
    }))
}

/// GET /uploads/{file}
#[tracing::instrument(skip(state, _caller))]
pub async fn license_document(
    State(state): State<Arc<AppState>>,
    _caller: Authorized<AdminOnly>,
    Path(file): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (bytes, content_type) = state.licenses.open(&file).await?;
    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(approve: bool, number: Option<&str>, note: Option<&str>) -> ReviewRequest {
        ReviewRequest {
            user_id: 1,
            approve,
            license_number: number.map(str::to_string),
            rejection_note: note.map(str::to_string),
        }
    }

    #[test]
    fn test_approve_defaults_to_true() {
        let body: ReviewRequest = serde_json::from_str(r#"{"user_id": 5}"#).unwrap();
        assert!(body.approve);
        assert_eq!(
            body.decision().unwrap(),
            ApprovalDecision::Approve {
                license_number: None
            }
        );
    }

    #[test]
    fn test_license_number_validated() {
        let decision = request(true, Some(" DL-2024/0091 "), None).decision().unwrap();
        assert_eq!(
            decision,
            ApprovalDecision::Approve {
                license_number: Some("DL-2024/0091".to_string())
            }
        );

        assert!(request(true, Some("<script>"), None).decision().is_err());
    }

    #[test]
    fn test_rejection_carries_note() {
        let decision = request(false, None, Some("License expired")).decision().unwrap();
        assert_eq!(
            decision,
            ApprovalDecision::Reject {
                note: Some("License expired".to_string())
            }
        );
    }

    #[test]
    fn test_license_link() {
        let now = Utc::now();
        let account = Account {
            id: 2,
            email: "r@pharmacy.example".to_string(),
            password_hash: String::new(),
            role: Role::Retailer,
            approval_state: ApprovalState::Pending,
            company_name: Some("Corner Pharmacy".to_string()),
            license_document: Some("uploads/abc-license.pdf".to_string()),
            license_number: None,
            review_note: None,
            created_at: now,
            updated_at: now,
            reviewed_at: None,
        };

        let dto = ClientDto::from_account(account, "http://localhost:8080");
        assert_eq!(
            dto.license_link.as_deref(),
            Some("http://localhost:8080/uploads/abc-license.pdf")
        );
        assert_eq!(dto.company.as_deref(), Some("Corner Pharmacy"));
    }
}
