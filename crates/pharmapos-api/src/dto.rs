//! # Wire DTOs
//!
//! Shapes of the JSON the pharmacy backend sends and receives, and their
//! validated conversion into `pharmapos-core` domain types.
//!
//! ## Decode Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HTTP body ──serde──► ProductDto ──try_from──► Product                 │
//! │                           │                        │                   │
//! │                  shape mismatch            value out of range          │
//! │                           │                        │                   │
//! │                           └──────► ApiError::Decode { entity, reason } │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Backend Leniency
//! - Decimals (price, discount, total) arrive as JSON numbers or strings.
//! - Product status arrives in any letter case.
//! - Dates are RFC 3339 timestamps or plain `YYYY-MM-DD` (midnight UTC).
//! - Nested promotions and batches may omit `productId`; the parent's is used.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

use pharmapos_core::validation::{
    validate_discount_bps, validate_id, validate_price_cents, validate_product_name,
    validate_quantity, validate_stock_level,
};
use pharmapos_core::{
    Batch, Branch, Customer, Inventory, Money, Product, ProductStatus, Promotion, SaleReceipt,
    SaleReceiptLine, ValidationError,
};

use crate::error::ApiError;

// =============================================================================
// Scalar Wrappers
// =============================================================================

/// A decimal value the backend may send as a number or a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WireDecimal {
    Number(f64),
    Text(String),
}

impl WireDecimal {
    /// Two-decimal amount in minor units (cents, or bps for percentages).
    fn to_hundredths(&self, field: &str) -> Result<i64, ValidationError> {
        let parsed = match self {
            WireDecimal::Number(n) => Money::from_decimal_f64(*n),
            WireDecimal::Text(s) => Money::parse_decimal(s),
        };
        parsed.map(|m| m.cents()).map_err(|_| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("{:?} is not a decimal", self),
        })
    }

    pub fn to_money(&self, field: &str) -> Result<Money, ValidationError> {
        self.to_hundredths(field).map(Money::from_cents)
    }

    /// Percentage (0 to 100) as basis points.
    pub fn to_bps(&self, field: &str) -> Result<u32, ValidationError> {
        let hundredths = self.to_hundredths(field)?;
        let bps = u32::try_from(hundredths).map_err(|_| ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 100,
        })?;
        validate_discount_bps(bps)?;
        Ok(bps)
    }
}

/// Parses an RFC 3339 timestamp, a naive timestamp (taken as UTC) or a plain
/// date (midnight UTC).
pub fn parse_wire_date(field: &str, raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }

    Err(ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: format!("'{}' is not a date", raw),
    })
}

fn parse_status(raw: Option<&str>) -> Result<ProductStatus, ValidationError> {
    match raw.map(|s| s.trim().to_lowercase()).as_deref() {
        None | Some("active") => Ok(ProductStatus::Active),
        Some("inactive") => Ok(ProductStatus::Inactive),
        Some("expired") => Ok(ProductStatus::Expired),
        Some(_) => Err(ValidationError::NotAllowed {
            field: "status".to_string(),
            allowed: vec![
                "active".to_string(),
                "inactive".to_string(),
                "expired".to_string(),
            ],
        }),
    }
}

// =============================================================================
// Catalog DTOs
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionDto {
    pub id: String,
    #[serde(alias = "discountPercentage", alias = "discount")]
    pub discount_percent: WireDecimal,
    #[serde(default)]
    pub product_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDto {
    pub id: String,
    #[serde(default)]
    pub lot_number: String,
    pub expiration_date: String,
    pub quantity: i64,
    #[serde(default)]
    pub product_id: Option<String>,
    pub branch_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryDto {
    pub branch_id: String,
    pub total_stock: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: WireDecimal,
    #[serde(default)]
    pub requires_prescription: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub promotions: Vec<PromotionDto>,
    #[serde(default)]
    pub batches: Vec<BatchDto>,
    #[serde(default)]
    pub inventory: Vec<InventoryDto>,
}

impl ProductDto {
    fn into_domain(self) -> Result<Product, ValidationError> {
        validate_id("id", &self.id)?;
        validate_product_name(&self.name)?;

        let price_cents = self.price.to_money("price")?.cents();
        validate_price_cents(price_cents)?;

        let status = parse_status(self.status.as_deref())?;

        let promotions = self
            .promotions
            .into_iter()
            .map(|p| {
                validate_id("promotion id", &p.id)?;
                Ok(Promotion {
                    discount_bps: p.discount_percent.to_bps("discountPercent")?,
                    product_id: p.product_id.unwrap_or_else(|| self.id.clone()),
                    id: p.id,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        let batches = self
            .batches
            .into_iter()
            .map(|b| {
                validate_id("batch id", &b.id)?;
                Ok(Batch {
                    expiration_date: parse_wire_date("expirationDate", &b.expiration_date)?,
                    product_id: b.product_id.unwrap_or_else(|| self.id.clone()),
                    id: b.id,
                    lot_number: b.lot_number,
                    quantity: b.quantity,
                    branch_id: b.branch_id,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        let inventory = self
            .inventory
            .into_iter()
            .map(|i| {
                validate_id("branchId", &i.branch_id)?;
                validate_stock_level("totalStock", i.total_stock)?;
                Ok(Inventory {
                    branch_id: i.branch_id,
                    total_stock: i.total_stock,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        Ok(Product {
            id: self.id,
            name: self.name,
            description: self.description,
            price_cents,
            requires_prescription: self.requires_prescription,
            status,
            category_id: self.category_id,
            promotions,
            batches,
            inventory,
        })
    }
}

impl TryFrom<ProductDto> for Product {
    type Error = ApiError;

    fn try_from(dto: ProductDto) -> Result<Self, Self::Error> {
        let id = dto.id.clone();
        dto.into_domain()
            .map_err(|e| ApiError::decode("product", format!("{}: {}", id, e)))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchDto {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
}

impl TryFrom<BranchDto> for Branch {
    type Error = ApiError;

    fn try_from(dto: BranchDto) -> Result<Self, Self::Error> {
        validate_id("id", &dto.id).map_err(|e| ApiError::decode("branch", e))?;
        Ok(Branch {
            id: dto.id,
            name: dto.name,
            address: dto.address,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDto {
    pub id: String,
    #[serde(alias = "fullName")]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl TryFrom<CustomerDto> for Customer {
    type Error = ApiError;

    fn try_from(dto: CustomerDto) -> Result<Self, Self::Error> {
        validate_id("id", &dto.id).map_err(|e| ApiError::decode("customer", e))?;
        Ok(Customer {
            id: dto.id,
            name: dto.name,
            email: dto.email,
        })
    }
}

// =============================================================================
// Sale DTOs
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineDto {
    pub product_id: String,
    pub quantity: i64,
    #[serde(alias = "price")]
    pub unit_price: WireDecimal,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleReceiptDto {
    pub id: String,
    pub total: WireDecimal,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, alias = "items")]
    pub lines: Vec<SaleLineDto>,
}

impl SaleReceiptDto {
    fn into_domain(self) -> Result<SaleReceipt, ValidationError> {
        validate_id("id", &self.id)?;

        let lines = self
            .lines
            .into_iter()
            .map(|l| {
                validate_quantity(l.quantity)?;
                Ok(SaleReceiptLine {
                    unit_price_cents: l.unit_price.to_money("unitPrice")?.cents(),
                    product_id: l.product_id,
                    quantity: l.quantity,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        Ok(SaleReceipt {
            total_cents: self.total.to_money("total")?.cents(),
            created_at: self
                .created_at
                .as_deref()
                .map(|raw| parse_wire_date("createdAt", raw))
                .transpose()?,
            id: self.id,
            customer_id: self.customer_id,
            lines,
        })
    }
}

impl TryFrom<SaleReceiptDto> for SaleReceipt {
    type Error = ApiError;

    fn try_from(dto: SaleReceiptDto) -> Result<Self, Self::Error> {
        dto.into_domain().map_err(|e| ApiError::decode("sale", e))
    }
}

// =============================================================================
// Error Body
// =============================================================================

/// `message` of a non-2xx response: one string, or a list of validation
/// messages.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ErrorMessage {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub message: ErrorMessage,
}

impl ErrorBody {
    /// Message text as shown to the operator.
    pub fn into_message(self) -> String {
        match self.message {
            ErrorMessage::One(message) => message,
            ErrorMessage::Many(messages) => messages.join(", "),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
