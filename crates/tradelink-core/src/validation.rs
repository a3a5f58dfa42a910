//! # Validation Module
//!
//! Field-level validators shared by every input schema.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization (serde)                                      │
//! │  ├── Shape and types                                                   │
//! │  └── EntityId format (parsed once, never re-checked)                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Input schemas (input.rs)                                     │
//! │  └── THIS MODULE: lengths, ranges, formats, allowed values             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE constraints (connection pair, invite code, numbers)        │
//! │  └── CHECK (available_quantity >= 0)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tradelink_core::validation::{validate_quantity, validate_username};
//!
//! assert!(validate_username("ravi_traders").is_err());
//! assert!(validate_username("ravitraders").is_ok());
//! assert!(validate_quantity(5).is_ok());
//! ```

use crate::error::ValidationError;
use crate::{
    INVITE_MAX_TTL_DAYS, INVITE_MIN_TTL_DAYS, MAX_AMOUNT_PAISE, MAX_INVITE_USES, MAX_ITEM_QUANTITY,
    MAX_ORDER_ITEMS,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Selling units a product may be listed in.
pub const PRODUCT_UNITS: &[&str] = &["PCS", "KG", "LITER", "METER", "GRAM", "BOX", "PACK", "SET"];

// =============================================================================
// String Validators
// =============================================================================

/// Trims `value` and checks its character count is within `min..=max`.
///
/// ## Returns
/// The trimmed string.
///
/// ## Example
/// ```rust
/// use tradelink_core::validation::validate_text;
///
/// assert_eq!(validate_text("name", "  Acme  ", 1, 100).unwrap(), "Acme");
/// assert!(validate_text("name", "   ", 1, 100).is_err());
/// ```
pub fn validate_text(field: &str, value: &str, min: usize, max: usize) -> ValidationResult<String> {
    let value = value.trim();
    let len = value.chars().count();

    if len == 0 && min > 0 {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if len < min {
        return Err(ValidationError::TooShort {
            field: field.to_string(),
            min,
        });
    }

    if len > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

/// Like [`validate_text`] for optional fields. Blank strings become `None`.
pub fn validate_optional_text(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> ValidationResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => validate_text(field, v, 1, max).map(Some),
    }
}

/// Validates a username.
///
/// ## Rules
/// - 3 to 30 characters
/// - ASCII letters and digits only
pub fn validate_username(username: &str) -> ValidationResult<String> {
    let username = validate_text("username", username, 3, 30)?;

    if !username.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must contain only letters and numbers".to_string(),
        });
    }

    Ok(username)
}

/// Validates an email address and lowercases it.
///
/// Only the shape is checked (one `@`, a dot in the domain). Deliverability
/// is not this layer's concern.
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = validate_text("email", email, 3, 254)?.to_lowercase();

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must be a valid email address".to_string(),
        });
    }

    Ok(email)
}

/// Validates a password before hashing. Minimum 6 characters.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }

    if password.chars().count() < 6 {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: 6,
        });
    }

    if password.len() > 128 {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max: 128,
        });
    }

    Ok(())
}

/// Validates a SKU.
///
/// ## Rules
/// - 1 to 50 characters
/// - Letters, numbers, hyphens, underscores
///
/// ## Example
/// ```rust
/// use tradelink_core::validation::validate_sku;
///
/// assert!(validate_sku("RICE-5KG").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<String> {
    let sku = validate_text("sku", sku, 1, 50)?;

    // Check for valid characters (alphanumeric, hyphen, underscore)
    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(sku)
}

/// Validates an HSN code: 2 to 8 digits.
pub fn validate_hsn_code(code: &str) -> ValidationResult<String> {
    let code = validate_text("hsn_code", code, 2, 8)?;

    if !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "hsn_code".to_string(),
            reason: "must contain only digits".to_string(),
        });
    }

    Ok(code)
}

/// Validates a selling unit against [`PRODUCT_UNITS`]. Case-insensitive.
pub fn validate_unit(unit: &str) -> ValidationResult<String> {
    let unit = unit.trim().to_uppercase();

    if !PRODUCT_UNITS.contains(&unit.as_str()) {
        return Err(ValidationError::NotAllowed {
            field: "unit".to_string(),
            allowed: PRODUCT_UNITS.iter().map(|u| u.to_string()).collect(),
        });
    }

    Ok(unit)
}

/// Validates an Indian postal code: exactly 6 digits.
pub fn validate_pincode(pincode: &str) -> ValidationResult<String> {
    let pincode = pincode.trim();

    if pincode.len() != 6 || !pincode.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "pincode".to_string(),
            reason: "must be 6 digits".to_string(),
        });
    }

    Ok(pincode.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (9999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Retailer: Place Order                                                  │
/// │                                                                         │
/// │  Line quantity: 50                                                     │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(50) ← THIS FUNCTION                                 │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "quantity must be positive"               │
/// │       │                                                                 │
/// │       ├── qty > 9999? → Error: "quantity must be between 1 and 9999"   │
/// │       │                                                                 │
/// │       └── OK → product lookup, then conditional stock decrement        │
/// │                                                                         │
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

/// Validates an amount in paise (prices, discounts, credit limits).
///
/// ## Rules
/// - Must be between 0 and [`MAX_AMOUNT_PAISE`]
/// - The upper bound keeps line and order arithmetic inside `i64`
///
/// ## Example
/// ```rust
/// use tradelink_core::validation::validate_amount_paise;
///
/// assert!(validate_amount_paise("price", 1099).is_ok());
/// assert!(validate_amount_paise("price", 0).is_ok());
/// assert!(validate_amount_paise("price", -100).is_err());
/// assert!(validate_amount_paise("price", i64::MAX).is_err());
/// ```
pub fn validate_amount_paise(field: &str, paise: i64) -> ValidationResult<()> {
    if !(0..=MAX_AMOUNT_PAISE).contains(&paise) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_PAISE,
        });
    }

    Ok(())
}

/// Validates a stock level.
pub fn validate_stock_quantity(field: &str, qty: i64) -> ValidationResult<()> {
    if !(0..=i32::MAX as i64).contains(&qty) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i32::MAX as i64,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%)
/// - GST slabs top out at 28% (2800) plus cess
pub fn validate_tax_rate_bps(field: &str, bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

/// Validates an invite lifetime in days.
pub fn validate_invite_ttl_days(days: i64) -> ValidationResult<()> {
    if !(INVITE_MIN_TTL_DAYS..=INVITE_MAX_TTL_DAYS).contains(&days) {
        return Err(ValidationError::OutOfRange {
            field: "expires_in_days".to_string(),
            min: INVITE_MIN_TTL_DAYS,
            max: INVITE_MAX_TTL_DAYS,
        });
    }

    Ok(())
}

/// Validates how many times an invite may be redeemed.
pub fn validate_invite_max_uses(max_uses: i64) -> ValidationResult<()> {
    if !(1..=MAX_INVITE_USES).contains(&max_uses) {
        return Err(ValidationError::OutOfRange {
            field: "max_uses".to_string(),
            min: 1,
            max: MAX_INVITE_USES,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines on an order or invoice: 1 to MAX_ORDER_ITEMS.
pub fn validate_item_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if count > MAX_ORDER_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_ORDER_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_text_trims_and_bounds() {
        assert_eq!(validate_text("message", "  hello  ", 1, 10).unwrap(), "hello");
        assert!(matches!(
            validate_text("message", "", 1, 10),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_text("message", "short", 10, 500),
            Err(ValidationError::TooShort { min: 10, .. })
        ));
        assert!(matches!(
            validate_text("message", &"x".repeat(501), 10, 500),
            Err(ValidationError::TooLong { max: 500, .. })
        ));
    }

    #[test]
    fn test_validate_text_counts_characters_not_bytes() {
        // 6 characters, 18 bytes
        assert!(validate_text("name", "ऋषिकेश", 1, 6).is_ok());
    }

    #[test]
    fn test_validate_optional_text() {
        assert_eq!(validate_optional_text("notes", None, 10).unwrap(), None);
        assert_eq!(validate_optional_text("notes", Some("   "), 10).unwrap(), None);
        assert_eq!(
            validate_optional_text("notes", Some(" ok "), 10).unwrap(),
            Some("ok".to_string())
        );
        assert!(validate_optional_text("notes", Some("way too long"), 5).is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("ravi01").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("ravi traders").is_err());
        assert!(validate_username(&"a".repeat(31)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email("Ravi@Example.com").unwrap(), "ravi@example.com");
        assert!(validate_email("ravi@example").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ravi@@example.com").is_err());
        assert!(validate_email("not an email").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret").is_ok());
        assert!(validate_password("").is_err());
        assert!(validate_password("12345").is_err());
    }

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("RICE-5KG").is_ok());
        assert!(validate_sku("product_1").is_ok());
        assert!(validate_sku("").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_hsn_and_pincode() {
        assert!(validate_hsn_code("1006").is_ok());
        assert!(validate_hsn_code("10AB").is_err());
        assert!(validate_pincode("411001").is_ok());
        assert!(validate_pincode("4110").is_err());
        assert!(validate_pincode("41100A").is_err());
    }

    #[test]
    fn test_validate_unit_normalises_case() {
        assert_eq!(validate_unit("kg").unwrap(), "KG");
        assert!(matches!(
            validate_unit("bag"),
            Err(ValidationError::NotAllowed { .. })
        ));
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(9999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(10_000).is_err());
    }

    #[test]
    fn test_validate_amounts_and_rates() {
        assert!(validate_amount_paise("price", 0).is_ok());
        assert!(validate_amount_paise("price", -1).is_err());
        assert!(validate_amount_paise("price", MAX_AMOUNT_PAISE).is_ok());
        assert!(validate_amount_paise("price", MAX_AMOUNT_PAISE + 1).is_err());
        assert!(validate_amount_paise("unit_price", i64::MAX / 2 + 1).is_err());
        assert!(validate_tax_rate_bps("cgst_rate", 10000).is_ok());
        assert!(validate_tax_rate_bps("cgst_rate", 10001).is_err());
        assert!(validate_stock_quantity("available_quantity", -1).is_err());
    }

    #[test]
    fn test_validate_invite_bounds() {
        assert!(validate_invite_ttl_days(1).is_ok());
        assert!(validate_invite_ttl_days(30).is_ok());
        assert!(validate_invite_ttl_days(0).is_err());
        assert!(validate_invite_ttl_days(31).is_err());
        assert!(validate_invite_max_uses(1).is_ok());
        assert!(validate_invite_max_uses(0).is_err());
        assert!(validate_invite_max_uses(1001).is_err());
    }

    #[test]
    fn test_validate_item_count() {
        assert!(validate_item_count(1).is_ok());
        assert!(validate_item_count(100).is_ok());
        assert!(validate_item_count(0).is_err());
        assert!(validate_item_count(101).is_err());
    }
}
