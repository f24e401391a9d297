// 🔎 Lookup & Disambiguation
// A query made only of digits is an ID; anything else is a product name.

use crate::product::{title_case, ProductId};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Id(ProductId),
    /// Already title-cased
    Name(String),
}

impl Lookup {
    /// Returns None for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        if trimmed.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(id) = trimmed.parse() {
                return Some(Lookup::Id(id));
            }
        }

        Some(Lookup::by_name(trimmed))
    }

    pub fn by_name(raw: &str) -> Self {
        Lookup::Name(title_case(raw))
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Id(id) => write!(f, "ID {}", id),
            Lookup::Name(name) => write!(f, "'{}'", name),
        }
    }
}

/// What a lookup matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    NotFound,
    Unique(ProductId),
    /// Several products share the name; the caller must pick one by ID
    Ambiguous(Vec<ProductId>),
}

impl Resolution {
    pub fn from_matches(ids: Vec<ProductId>) -> Self {
        match ids.len() {
            0 => Resolution::NotFound,
            1 => Resolution::Unique(ids[0]),
            _ => Resolution::Ambiguous(ids),
        }
    }

    /// The chosen ID if it is one of the candidates.
    pub fn pick(&self, chosen: ProductId) -> Option<ProductId> {
        match self {
            Resolution::Unique(id) if *id == chosen => Some(chosen),
            Resolution::Ambiguous(ids) if ids.contains(&chosen) => Some(chosen),
            _ => None,
        }
    }
}
