//! Domain errors for the marketplace.
//!
//! `ValidationError` covers malformed input and is raised before anything
//! touches the store. `CoreError` covers broken business rules (missing
//! product, short stock, a second review). The store crate wraps `CoreError`
//! in `DbError::Domain`, and the HTTP layer maps all of them to a status and
//! an error code:
//!
//! ```text
//!   ValidationError ─► CoreError ─► DbError::Domain ─► ApiError { code, message }
//! ```

use thiserror::Error;

use crate::types::ApprovalState;

/// A business rule refused the operation. Store failures are never
/// represented here.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product does not exist or has been deleted.
    #[error("Product ID {0} not found")]
    ProductNotFound(i64),

    /// Requested quantity exceeds available stock.
    ///
    /// ## User Workflow
    /// ```text
    /// Order (product 1, qty: 5)
    ///      │
    ///      ▼
    /// Locked read: stock=3
    ///      │
    ///      ▼
    /// InsufficientStock { product_id: 1, requested: 5, available: 3 }
    ///      │
    ///      ▼
    /// Whole order rolled back, stock stays 3
    /// ```
    #[error(
        "Insufficient stock for Product ID {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: i64,
        requested: i64,
        available: i64,
    },

    /// Cart contains no items.
    #[error("Order must contain at least one item")]
    EmptyCart,

    /// Cart has more distinct products than allowed.
    #[error("Order cannot contain more than {max} different products")]
    CartTooLarge { max: usize },

    /// Order total does not fit in the money representation.
    #[error("Order total is too large")]
    AmountOverflow,

    /// Account cannot be found.
    #[error("Account {0} not found")]
    AccountNotFound(i64),

    /// Account was already reviewed; approval happens exactly once.
    #[error("Account {account_id} has already been reviewed ({state})")]
    AlreadyReviewed {
        account_id: i64,
        state: ApprovalState,
    },

    /// Approval requested for a retailer/clinic with no license on file.
    #[error("Account {account_id} has no license document on file")]
    MissingLicense { account_id: i64 },

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),
}

/// Input rejected by a `validate_*` function. `field` is the wire name.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} needs at least {min} characters")]
    TooShort { field: String, min: usize },

    #[error("{field} allows at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be greater than zero")]
    MustBePositive { field: String },

    /// Wrong shape, e.g. an email without a domain or a price with
    /// sub-cent digits.
    #[error("{field} is malformed: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} must be one of {}", allowed.join(", "))]
    NotAllowed { field: String, allowed: Vec<String> },
}

pub type CoreResult<T> = Result<T, CoreError>;
