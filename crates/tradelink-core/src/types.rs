//! # Shared Domain Types
//!
//! Small value types used by every collection.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Shared Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    EntityId     │   │    TaxRate      │   │      Role       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  UUID string    │   │  bps (u32)      │   │  Manufacturer   │       │
//! │  │  validated once │   │  900 = 9%       │   │  Retailer       │       │
//! │  │  at the edge    │   │                 │   │  Employee/Staff │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐                                                    │
//! │  │ DeliveryAddress │  line1, line2?, city, state, pincode, country     │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::validation::ValidationResult;

// =============================================================================
// Entity Id
// =============================================================================

/// Server-generated opaque identifier for any stored entity.
///
/// Parsing happens once, when a request body or path segment is decoded.
/// Engine operations accept only this type, so they never re-check formats.
///
/// ```rust
/// use tradelink_core::EntityId;
///
/// assert!(EntityId::parse("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(EntityId::parse("64f1c2").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type), sqlx(transparent))]
#[ts(export)]
pub struct EntityId(String);

impl EntityId {
    /// Generates a fresh UUID v4 id.
    pub fn generate() -> Self {
        EntityId(Uuid::new_v4().to_string())
    }

    /// Parses and normalises (lowercase, hyphenated) an id.
    pub fn parse(raw: &str) -> ValidationResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ValidationError::Required {
                field: "id".to_string(),
            });
        }

        let uuid = Uuid::parse_str(raw).map_err(|_| ValidationError::InvalidFormat {
            field: "id".to_string(),
            reason: "must be a valid UUID".to_string(),
        })?;

        Ok(EntityId(uuid.hyphenated().to_string()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last `n` hex digits, uppercased. Used in human-facing document numbers.
    pub fn short_suffix(&self, n: usize) -> String {
        let hex: Vec<char> = self.0.chars().filter(|c| *c != '-').collect();
        let start = hex.len().saturating_sub(n);
        hex[start..].iter().collect::<String>().to_uppercase()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        EntityId::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01%. GST slabs (0, 5, 12, 18, 28%) split into
/// CGST+SGST halves such as 2.5% = 250 bps, which a whole-percent
/// integer cannot hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (seed data and tests).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Role
// =============================================================================

/// Role reported by the identity service for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Owns companies and their catalogs.
    Manufacturer,
    /// Buys from connected companies.
    Retailer,
    /// Works for a company (delivery, fulfilment).
    Employee,
    /// Platform staff with operator access to every company.
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Manufacturer => "manufacturer",
            Role::Retailer => "retailer",
            Role::Employee => "employee",
            Role::Staff => "staff",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Delivery Address
// =============================================================================

/// Where an order ships to. Snapshotted onto the order at placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DeliveryAddress {
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "India".to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_parse_normalises_case() {
        let id = EntityId::parse(" 550E8400-E29B-41D4-A716-446655440000 ").unwrap();
        assert_eq!(id.as_str(), "550e8400-e29b-41d4-a716-446655440000");
    }

    #[test]
    fn test_entity_id_rejects_garbage() {
        assert!(matches!(
            EntityId::parse(""),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            EntityId::parse("64f1c2aa0b"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_entity_id_deserialize_validates() {
        let ok: Result<EntityId, _> =
            serde_json::from_str("\"550e8400-e29b-41d4-a716-446655440000\"");
        assert!(ok.is_ok());

        let bad: Result<EntityId, _> = serde_json::from_str("\"nope\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_entity_id_short_suffix() {
        let id = EntityId::parse("550e8400-e29b-41d4-a716-446655440abc").unwrap();
        assert_eq!(id.short_suffix(6), "440ABC");
    }

    #[test]
    fn test_tax_rate_from_percentage() {
        assert_eq!(TaxRate::from_percentage(9.0).bps(), 900);
        assert_eq!(TaxRate::from_percentage(2.5).bps(), 250);
        assert!((TaxRate::from_bps(1800).percentage() - 18.0).abs() < 0.001);
    }

    #[test]
    fn test_role_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Role::Manufacturer).unwrap(), "\"manufacturer\"");
        let staff: Role = serde_json::from_str("\"staff\"").unwrap();
        assert_eq!(staff, Role::Staff);
    }

    #[test]
    fn test_delivery_address_defaults_country() {
        let addr: DeliveryAddress = serde_json::from_str(
            r#"{"address_line1":"12 MG Road","city":"Pune","state":"MH","pincode":"411001"}"#,
        )
        .unwrap();
        assert_eq!(addr.country, "India");
        assert!(addr.address_line2.is_none());
    }
}
