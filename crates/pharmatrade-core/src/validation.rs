//! # Validation Module
//!
//! Input validation utilities for PharmaTrade.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractors (apps/api)                                   │
//! │  ├── JSON / multipart shape                                            │
//! │  └── Decimal price → Money                                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Lengths, formats, ranges                                          │
//! │  └── Business rules (quantities, license numbers)                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (stock_quantity >= 0), CHECK (quantity > 0)                 │
//! │  ├── UNIQUE (email)                                                    │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use pharmatrade_core::validation::{validate_email, validate_quantity};
//!
//! assert_eq!(validate_email(" Buyer@Pharmacy.test ").unwrap(), "buyer@pharmacy.test");
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::MAX_ITEM_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Minimum password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Maximum password length. Bounds the hashing work per login.
pub const MAX_PASSWORD_LEN: usize = 128;

const MAX_EMAIL_LEN: usize = 254;
const MAX_NAME_LEN: usize = 200;
const MAX_LICENSE_NUMBER_LEN: usize = 64;
const MAX_NOTE_LEN: usize = 1000;

// =============================================================================
// Account Validators
// =============================================================================

/// Validates an email address and returns its normalized (trimmed,
/// lower-cased) form.
///
/// ## Rules
/// - Exactly one `@`, non-empty local part and domain
/// - Domain contains a dot that is neither first nor last
/// - No whitespace, at most 254 characters
///
/// ## Example
/// ```rust
/// use pharmatrade_core::validation::validate_email;
///
/// assert!(validate_email("orders@clinic.example").is_ok());
/// assert!(validate_email("not-an-email").is_err());
/// assert!(validate_email("a@b").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    if email.len() > MAX_EMAIL_LEN {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: MAX_EMAIL_LEN,
        });
    }

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: reason.to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain spaces"));
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| invalid("must look like name@domain"))?;

    if local.is_empty() || domain.contains('@') {
        return Err(invalid("must look like name@domain"));
    }

    match domain.find('.') {
        Some(pos) if pos > 0 && !domain.ends_with('.') => {}
        _ => return Err(invalid("domain must contain a dot")),
    }

    Ok(email.to_lowercase())
}

/// Validates a password's length. Content is not inspected.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    let len = password.chars().count();

    if len == 0 {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }

    if len < MIN_PASSWORD_LEN {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LEN,
        });
    }

    if len > MAX_PASSWORD_LEN {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max: MAX_PASSWORD_LEN,
        });
    }

    Ok(())
}

/// Validates an optional company name and returns it trimmed.
///
/// Blank input is treated as absent.
pub fn validate_company_name(name: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "company_name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(Some(name.to_string()))
}

/// Validates a license number recorded at approval time.
///
/// ## Rules
/// - 1 to 64 characters after trimming
/// - Letters, digits, `-`, `/` and spaces only
///
/// ## Example
/// ```rust
/// use pharmatrade_core::validation::validate_license_number;
///
/// assert!(validate_license_number("PH-2024/0117").is_ok());
/// assert!(validate_license_number("").is_err());
/// assert!(validate_license_number("DROP TABLE;").is_err());
/// ```
pub fn validate_license_number(number: &str) -> ValidationResult<String> {
    let number = number.trim();

    if number.is_empty() {
        return Err(ValidationError::Required {
            field: "license_number".to_string(),
        });
    }

    if number.chars().count() > MAX_LICENSE_NUMBER_LEN {
        return Err(ValidationError::TooLong {
            field: "license_number".to_string(),
            max: MAX_LICENSE_NUMBER_LEN,
        });
    }

    if !number
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '/' || c == ' ')
    {
        return Err(ValidationError::InvalidFormat {
            field: "license_number".to_string(),
            reason: "must contain only letters, numbers, hyphens, slashes, and spaces"
                .to_string(),
        });
    }

    Ok(number.to_string())
}

/// Validates an optional rejection note and returns it trimmed.
pub fn validate_review_note(note: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(note) = note.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    if note.chars().count() > MAX_NOTE_LEN {
        return Err(ValidationError::TooLong {
            field: "rejection_note".to_string(),
            max: MAX_NOTE_LEN,
        });
    }

    Ok(Some(note.to_string()))
}

// =============================================================================
// Catalog Validators
// =============================================================================

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 200 characters
///
/// ## Example
/// ```rust
/// use pharmatrade_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Paracetamol 500mg x 100").is_ok());
/// assert!(validate_product_name("   ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates a price in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free samples)
///
/// ## Example
/// ```rust
/// use pharmatrade_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates an absolute stock level set through catalog management.
pub fn validate_stock_quantity(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::OutOfRange {
            field: "stock_quantity".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Order Validators
// =============================================================================

/// Validates an ordered quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  POST /api/orders  {"items":[{"product_id":1,"quantity":0}]}            │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  Cart::new ──► validate_quantity(0) ← THIS FUNCTION                    │
/// │       │                                                                 │
/// │       ├── qty <= 0?     → 400 "quantity must be positive"              │
/// │       ├── qty > 10000?  → 400 "quantity must be between 1 and 10000"  │
/// │       └── OK → Order Engine                                            │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
