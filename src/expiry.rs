// ⏳ Lifecycle Classifier - expiry dates and the one-way "expired" flip
//
// Stored expiry is either a DD-MM-YYYY date, the sentinel "expired", or
// free text we could not parse. Unparseable text is kept verbatim and the
// product stays active.

use crate::error::InventoryError;
use crate::product::{Product, ProductId};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use tracing::{debug, info};

/// Format used for every stored and displayed expiry date.
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// Sentinel written in place of the date once a product has expired.
pub const EXPIRED_SENTINEL: &str = "expired";

// ============================================================================
// EXPIRY VALUE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expiry {
    /// Product is good through this date (inclusive). `text` is the stored
    /// form, kept as read so a lenient match like "1-1-2030" is not rewritten.
    On { date: NaiveDate, text: String },

    /// Product has passed its date; never reverts
    Expired,

    /// Text that is not a DD-MM-YYYY date (empty when the field was absent)
    Unparsed(String),
}

impl Expiry {
    /// A date in the canonical DD-MM-YYYY form.
    pub fn on(date: NaiveDate) -> Self {
        Expiry::On {
            date,
            text: date.format(DATE_FORMAT).to_string(),
        }
    }

    /// Lenient parse used when reading stored records.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case(EXPIRED_SENTINEL) {
            return Expiry::Expired;
        }

        match NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
            Ok(date) => Expiry::On {
                date,
                text: raw.to_string(),
            },
            Err(_) => Expiry::Unparsed(raw.to_string()),
        }
    }

    /// Strict parse used for caller input: only a DD-MM-YYYY date is accepted.
    pub fn parse_date(raw: &str) -> Result<NaiveDate, InventoryError> {
        NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
            .map_err(|_| InventoryError::InvalidDate(raw.trim().to_string()))
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, Expiry::Expired)
    }

    /// A dated product is past its expiry when the date is strictly before today.
    pub fn is_past(&self, today: NaiveDate) -> bool {
        match self {
            Expiry::On { date, .. } => *date < today,
            _ => false,
        }
    }

    /// Classification as of `today`. Expired stays expired; unparsed stays as is.
    pub fn classify(&self, today: NaiveDate) -> Expiry {
        if self.is_past(today) {
            Expiry::Expired
        } else {
            self.clone()
        }
    }

    /// Text written to the JSON file / SQLite column.
    pub fn as_stored(&self) -> String {
        match self {
            Expiry::On { text, .. } => text.clone(),
            Expiry::Expired => EXPIRED_SENTINEL.to_string(),
            Expiry::Unparsed(raw) => raw.clone(),
        }
    }
}

impl Default for Expiry {
    fn default() -> Self {
        Expiry::Unparsed(String::new())
    }
}

impl fmt::Display for Expiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expiry::Unparsed(raw) if raw.trim().is_empty() => write!(f, "N/A"),
            other => write!(f, "{}", other.as_stored()),
        }
    }
}

impl Serialize for Expiry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_stored())
    }
}

impl<'de> Deserialize<'de> for Expiry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(|s| Expiry::parse(&s)).unwrap_or_default())
    }
}

// ============================================================================
// CLASSIFIER
// ============================================================================

/// Outcome of one classification pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationReport {
    /// Products flipped to expired by this pass (these need persisting)
    pub newly_expired: Vec<ProductId>,

    /// Products whose expiry text could not be parsed (left active)
    pub unparsed: Vec<ProductId>,
}

impl ClassificationReport {
    pub fn changed(&self) -> bool {
        !self.newly_expired.is_empty()
    }
}

/// Reclassify products in place as of `today`.
pub fn classify_products<'a, I>(products: I, today: NaiveDate) -> ClassificationReport
where
    I: IntoIterator<Item = &'a mut Product>,
{
    let mut report = ClassificationReport::default();

    for product in products {
        match &product.expiry {
            Expiry::On { date, .. } if *date < today => {
                info!(id = product.id, name = %product.name, expiry = %date, "product expired");
                product.expiry = Expiry::Expired;
                report.newly_expired.push(product.id);
            }
            Expiry::Unparsed(raw) => {
                debug!(id = product.id, expiry = %raw, "unparseable expiry date, treating as active");
                report.unparsed.push(product.id);
            }
            _ => {}
        }
    }

    report
}

/// Split products into (active, expired).
pub fn partition(products: Vec<Product>) -> (Vec<Product>, Vec<Product>) {
    products.into_iter().partition(|p| !p.expiry.is_expired())
}
