//! Domain Value Objects
//!
//! Validated product fields. Constructors trim their input and reject
//! anything the store would refuse.

use std::fmt;

use serde::Serialize;

use crate::error::{CatalogError, CatalogResult};

pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 2000;
pub const MAX_CATEGORY_CHARS: usize = 50;
pub const MAX_SKU_CHARS: usize = 50;

fn bounded(field: &'static str, raw: &str, max: usize) -> CatalogResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::invalid(field, format!("{field} must not be empty")));
    }
    if trimmed.chars().count() > max {
        return Err(CatalogError::invalid(
            field,
            format!("{field} must be at most {max} characters"),
        ));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(CatalogError::invalid(
            field,
            format!("{field} contains control characters"),
        ));
    }
    Ok(trimmed.to_string())
}

// ============================================================================
// Text fields
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProductName(String);

impl ProductName {
    pub fn new(raw: &str) -> CatalogResult<Self> {
        bounded("name", raw, MAX_NAME_CHARS).map(Self)
    }

    pub fn from_db(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stock keeping unit, unique across the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Sku(String);

impl Sku {
    pub fn new(raw: &str) -> CatalogResult<Self> {
        let sku = bounded("sku", raw, MAX_SKU_CHARS)?;
        if sku.chars().any(char::is_whitespace) {
            return Err(CatalogError::invalid("sku", "sku must not contain whitespace"));
        }
        Ok(Self(sku))
    }

    pub fn from_db(sku: impl Into<String>) -> Self {
        Self(sku.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub fn new(raw: &str) -> CatalogResult<Self> {
        bounded("category", raw, MAX_CATEGORY_CHARS).map(Self)
    }

    pub fn from_db(category: impl Into<String>) -> Self {
        Self(category.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Free text; `None` when blank
pub fn description(raw: &str) -> CatalogResult<Option<String>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(CatalogError::invalid(
            "description",
            format!("description must be at most {MAX_DESCRIPTION_CHARS} characters"),
        ));
    }
    Ok(Some(trimmed.to_string()))
}

// ============================================================================
// Numeric fields
// ============================================================================

/// Unit price, strictly positive, rounded to cents
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Price(f64);

impl Price {
    pub fn new(value: f64) -> CatalogResult<Self> {
        if !value.is_finite() || value <= 0.0 {
            return Err(CatalogError::invalid("price", "price must be greater than 0"));
        }
        let rounded = (value * 100.0).round() / 100.0;
        if rounded <= 0.0 {
            return Err(CatalogError::invalid("price", "price must be at least 0.01"));
        }
        Ok(Self(rounded))
    }

    pub fn from_db(value: f64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Shipping weight, strictly positive
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Weight(f64);

impl Weight {
    pub fn new(value: f64) -> CatalogResult<Self> {
        if !value.is_finite() || value <= 0.0 {
            return Err(CatalogError::invalid("weight", "weight must be greater than 0"));
        }
        Ok(Self(value))
    }

    pub fn from_db(value: f64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

pub fn stock(value: i32) -> CatalogResult<i32> {
    if value < 0 {
        return Err(CatalogError::invalid("stock", "stock must not be negative"));
    }
    Ok(value)
}

// ============================================================================
// Listing filter
// ============================================================================

/// Validated listing query
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFilter {
    pub skip: i64,
    pub limit: i64,
    /// Case-insensitive match on name or description
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub available_only: bool,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 100,
            search: None,
            category: None,
            min_price: None,
            max_price: None,
            available_only: true,
        }
    }
}

impl ProductFilter {
    /// Reject out-of-range paging and inverted price bounds
    pub fn validate(self, max_limit: i64) -> CatalogResult<Self> {
        if self.skip < 0 {
            return Err(CatalogError::invalid("skip", "skip must not be negative"));
        }
        if !(1..=max_limit).contains(&self.limit) {
            return Err(CatalogError::invalid(
                "limit",
                format!("limit must be between 1 and {max_limit}"),
            ));
        }
        for (field, bound) in [("min_price", self.min_price), ("max_price", self.max_price)] {
            if let Some(value) = bound
                && (!value.is_finite() || value < 0.0)
            {
                return Err(CatalogError::invalid(field, format!("{field} must not be negative")));
            }
        }
        if let (Some(min), Some(max)) = (self.min_price, self.max_price)
            && min > max
        {
            return Err(CatalogError::invalid(
                "min_price",
                "min_price must not exceed max_price",
            ));
        }

        Ok(Self {
            search: non_blank(self.search),
            category: non_blank(self.category),
            ..self
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_trimmed_and_bounded() {
        assert_eq!(ProductName::new("  Laptop ").unwrap().as_str(), "Laptop");
        assert!(ProductName::new("   ").is_err());
        assert!(ProductName::new(&"x".repeat(101)).is_err());
        assert!(ProductName::new(&"x".repeat(100)).is_ok());
    }

    #[test]
    fn test_price_rounds_to_cents() {
        assert_eq!(Price::new(19.999).unwrap().value(), 20.0);
        assert_eq!(Price::new(0.014).unwrap().value(), 0.01);
        assert!(Price::new(0.0).is_err());
        assert!(Price::new(-1.0).is_err());
        assert!(Price::new(0.004).is_err());
        assert!(Price::new(f64::NAN).is_err());
    }

    #[test]
    fn test_sku_rejects_whitespace() {
        assert_eq!(Sku::new(" LAP-001 ").unwrap().as_str(), "LAP-001");
        assert!(Sku::new("LAP 001").is_err());
    }

    #[test]
    fn test_blank_description_is_none() {
        assert_eq!(description("  ").unwrap(), None);
        assert!(description(&"d".repeat(2001)).is_err());
    }

    #[test]
    fn test_negative_stock_rejected() {
        assert!(stock(-1).is_err());
        assert_eq!(stock(0).unwrap(), 0);
    }

    #[test]
    fn test_filter_limits() {
        let ok = ProductFilter::default().validate(100).unwrap();
        assert_eq!(ok.limit, 100);
        assert!(ok.available_only);

        let zero = ProductFilter {
            limit: 0,
            ..Default::default()
        };
        assert!(zero.validate(100).is_err());

        let big = ProductFilter {
            limit: 101,
            ..Default::default()
        };
        assert!(big.validate(100).is_err());
    }

    #[test]
    fn test_filter_price_bounds() {
        let inverted = ProductFilter {
            min_price: Some(50.0),
            max_price: Some(10.0),
            ..Default::default()
        };
        assert!(inverted.validate(100).is_err());

        let negative = ProductFilter {
            min_price: Some(-1.0),
            ..Default::default()
        };
        assert!(negative.validate(100).is_err());
    }

    #[test]
    fn test_filter_drops_blank_text() {
        let filter = ProductFilter {
            search: Some("  ".into()),
            category: Some(" electronics ".into()),
            ..Default::default()
        }
        .validate(100)
        .unwrap();
        assert_eq!(filter.search, None);
        assert_eq!(filter.category.as_deref(), Some("electronics"));
    }
}
