//! # Account Repository (Account Store)
//!
//! Account rows and the one-time approval transition.
//!
//! ## Approval Transition
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  review(id, decision)                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE accounts SET approval_state = <target> ...                     │
//! │  WHERE id = ? AND approval_state = 'pending' [AND license on file]     │
//! │       │                                                                 │
//! │       ├── 1 row  → reviewed account                                    │
//! │       │                                                                 │
//! │       └── 0 rows → re-read to explain:                                 │
//! │              absent                → AccountNotFound                   │
//! │              approved / rejected   → AlreadyReviewed                   │
//! │              pending, no license   → MissingLicense                    │
//! │                                                                         │
//! │  Check and write are one statement, so two admins approving the same   │
//! │  account at once get exactly one success.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use pharmatrade_core::validation::{validate_license_number, validate_review_note};
use pharmatrade_core::{Account, ApprovalDecision, ApprovalState, CoreError, NewAccount, Role};

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, role, approval_state, company_name, \
     license_document, license_number, review_note, created_at, updated_at, reviewed_at";

/// Repository for account database operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    /// Creates a new AccountRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AccountRepository { pool }
    }

    /// Stores a new account.
    ///
    /// Administrators start Approved, everyone else Pending.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - Email already registered
    pub async fn insert(&self, new: NewAccount) -> DbResult<Account> {
        let email = new.email.trim().to_lowercase();
        let state = ApprovalState::initial_for(new.role);
        let now = Utc::now();

        debug!(email = %email, role = %new.role, "Inserting account");

        let result = sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO accounts (
                email, password_hash, role, approval_state,
                company_name, license_document, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(&email)
        .bind(&new.password_hash)
        .bind(new.role)
        .bind(state)
        .bind(&new.company_name)
        .bind(&new.license_document)
        .bind(now)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(account) => {
                info!(
                    account_id = account.id,
                    role = %account.role,
                    state = %account.approval_state,
                    "Account created"
                );
                Ok(account)
            }
            Err(e) => match DbError::from(e) {
                DbError::UniqueViolation { .. } => Err(DbError::duplicate("email", email)),
                other => Err(other),
            },
        }
    }

    /// Finds an account by email (case-insensitive).
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<Account>> {
        let email = email.trim().to_lowercase();

        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = ?1"
        ))
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Gets an account by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Lists Retailer/Clinic accounts awaiting review, oldest first.
    pub async fn list_pending_applicants(&self) -> DbResult<Vec<Account>> {
        let accounts = sqlx::query_as::<_, Account>(&format!(
            r#"
            SELECT {ACCOUNT_COLUMNS}
            FROM accounts
            WHERE approval_state = ?1 AND role != ?2
            ORDER BY id
            "#
        ))
        .bind(ApprovalState::Pending)
        .bind(Role::Admin)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = accounts.len(), "Listed pending applicants");
        Ok(accounts)
    }

    /// Applies an administrator's decision to a pending account.
    ///
    /// ## Errors
    /// * `Domain(Validation)` - License number or note malformed
    /// * `Domain(AccountNotFound)` - No such account
    /// * `Domain(AlreadyReviewed)` - Account is not pending (includes admins)
    /// * `Domain(MissingLicense)` - Approving a retailer/clinic with no
    ///   license document on file
    pub async fn review(&self, id: i64, decision: ApprovalDecision) -> DbResult<Account> {
        let now = Utc::now();
        let target = decision.target_state();

        let updated = match &decision {
            ApprovalDecision::Approve { license_number } => {
                let license_number = license_number
                    .as_deref()
                    .map(validate_license_number)
                    .transpose()
                    .map_err(CoreError::from)?;

                sqlx::query_as::<_, Account>(&format!(
                    r#"
                    UPDATE accounts
                    SET
                        approval_state = ?2,
                        license_number = COALESCE(?3, license_number),
                        reviewed_at = ?4,
                        updated_at = ?4
                    WHERE id = ?1
                      AND approval_state = ?5
                      AND (role = ?6 OR license_document IS NOT NULL)
                    RETURNING {ACCOUNT_COLUMNS}
                    "#
                ))
                .bind(id)
                .bind(target)
                .bind(license_number)
                .bind(now)
                .bind(ApprovalState::Pending)
                .bind(Role::Admin)
                .fetch_optional(&self.pool)
                .await?
            }
            ApprovalDecision::Reject { note } => {
                let note = validate_review_note(note.as_deref()).map_err(CoreError::from)?;

                sqlx::query_as::<_, Account>(&format!(
                    r#"
                    UPDATE accounts
                    SET
                        approval_state = ?2,
                        review_note = ?3,
                        reviewed_at = ?4,
                        updated_at = ?4
                    WHERE id = ?1 AND approval_state = ?5
                    RETURNING {ACCOUNT_COLUMNS}
                    "#
                ))
                .bind(id)
                .bind(target)
                .bind(note)
                .bind(now)
                .bind(ApprovalState::Pending)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        if let Some(account) = updated {
            info!(account_id = id, state = %account.approval_state, "Account reviewed");
            return Ok(account);
        }

        // Nothing matched; find out why.
        let current = self.get_by_id(id).await?;
        let err = match current {
            None => CoreError::AccountNotFound(id),
            Some(account) if account.approval_state.is_terminal() => CoreError::AlreadyReviewed {
                account_id: id,
                state: account.approval_state,
            },
            Some(_) => CoreError::MissingLicense { account_id: id },
        };

        debug!(account_id = id, error = %err, "Review rejected");
        Err(err.into())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn signup(email: &str, role: Role, license: Option<&str>) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            password_hash: "$argon2id$v=19$placeholder".to_string(),
            role,
            company_name: Some("Northside Pharmacy".to_string()),
            license_document: license.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_initial_states() {
        let db = test_db().await;
        let repo = db.accounts();

        let admin = repo
            .insert(signup("root@pharmatrade.test", Role::Admin, None))
            .await
            .unwrap();
        let retailer = repo
            .insert(signup(
                "shop@pharmacy.test",
                Role::Retailer,
                Some("licenses/a.pdf"),
            ))
            .await
            .unwrap();

        assert_eq!(admin.approval_state, ApprovalState::Approved);
        assert_eq!(retailer.approval_state, ApprovalState::Pending);
        assert_eq!(retailer.role, Role::Retailer);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_case_insensitive() {
        let db = test_db().await;
        let repo = db.accounts();

        repo.insert(signup("Clinic@Example.test", Role::Clinic, Some("l.pdf")))
            .await
            .unwrap();
        let err = repo
            .insert(signup("clinic@example.test", Role::Clinic, Some("l.pdf")))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "email"));

        let found = repo.find_by_email("CLINIC@example.TEST").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_pending_listing_excludes_reviewed_and_admins() {
        let db = test_db().await;
        let repo = db.accounts();

        repo.insert(signup("admin@x.test", Role::Admin, None))
            .await
            .unwrap();
        let a = repo
            .insert(signup("a@x.test", Role::Retailer, Some("a.pdf")))
            .await
            .unwrap();
        let b = repo
            .insert(signup("b@x.test", Role::Clinic, Some("b.pdf")))
            .await
            .unwrap();
        repo.review(a.id, ApprovalDecision::Reject { note: None })
            .await
            .unwrap();

        let pending = repo.list_pending_applicants().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, b.id);
    }

    #[tokio::test]
    async fn test_approve_records_license_number() {
        let db = test_db().await;
        let repo = db.accounts();

        let shop = repo
            .insert(signup("shop@x.test", Role::Retailer, Some("s.pdf")))
            .await
            .unwrap();
        let approved = repo
            .review(
                shop.id,
                ApprovalDecision::Approve {
                    license_number: Some(" PH-2024/77 ".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(approved.approval_state, ApprovalState::Approved);
        assert_eq!(approved.license_number.as_deref(), Some("PH-2024/77"));
        assert!(approved.reviewed_at.is_some());
        assert!(approved.is_approved());
    }

    #[tokio::test]
    async fn test_review_happens_once() {
        let db = test_db().await;
        let repo = db.accounts();

        let clinic = repo
            .insert(signup("c@x.test", Role::Clinic, Some("c.pdf")))
            .await
            .unwrap();
        repo.review(
            clinic.id,
            ApprovalDecision::Reject {
                note: Some("License expired".to_string()),
            },
        )
        .await
        .unwrap();

        let err = repo
            .review(
                clinic.id,
                ApprovalDecision::Approve {
                    license_number: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::AlreadyReviewed {
                state: ApprovalState::Rejected,
                ..
            })
        ));

        let stored = repo.get_by_id(clinic.id).await.unwrap().unwrap();
        assert_eq!(stored.review_note.as_deref(), Some("License expired"));
    }

    #[tokio::test]
    async fn test_review_admin_is_conflict() {
        let db = test_db().await;
        let repo = db.accounts();

        let admin = repo
            .insert(signup("boss@x.test", Role::Admin, None))
            .await
            .unwrap();
        let err = repo
            .review(admin.id, ApprovalDecision::Reject { note: None })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::AlreadyReviewed { .. })
        ));
    }

    #[tokio::test]
    async fn test_review_missing_account_and_license() {
        let db = test_db().await;
        let repo = db.accounts();

        let err = repo
            .review(
                404,
                ApprovalDecision::Approve {
                    license_number: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::AccountNotFound(404))
        ));

        let unlicensed = repo
            .insert(signup("nolicense@x.test", Role::Retailer, None))
            .await
            .unwrap();
        let err = repo
            .review(
                unlicensed.id,
                ApprovalDecision::Approve {
                    license_number: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::MissingLicense { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_license_number_is_validation_error() {
        let db = test_db().await;
        let repo = db.accounts();

        let shop = repo
            .insert(signup("v@x.test", Role::Retailer, Some("v.pdf")))
            .await
            .unwrap();
        let err = repo
            .review(
                shop.id,
                ApprovalDecision::Approve {
                    license_number: Some("<script>".to_string()),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
        let stored = repo.get_by_id(shop.id).await.unwrap().unwrap();
        assert_eq!(stored.approval_state, ApprovalState::Pending);
    }
}
