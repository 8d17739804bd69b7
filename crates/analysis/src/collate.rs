//! Locale-aware string ordering.
//!
//! Names are compared the way a French reader orders them, using the CLDR
//! collation tables: accents and case only break ties between otherwise
//! equal words, so "élément" sorts next to "element" instead of after "z".

use std::cmp::Ordering;
use icu_collator::{Collator, CollatorOptions};
use icu_locid::locale;
use tracing::warn;
use unicode_normalization::UnicodeNormalization;

/// Comparator for display names.
pub struct ReadingOrder {
    collator: Option<Collator>,
}

impl ReadingOrder {
    /// French collation. Falls back to [`ReadingOrder::code_points`] if the
    /// collation data cannot be loaded.
    pub fn french() -> Self {
        match Collator::try_new(&locale!("fr").into(), CollatorOptions::new()) {
            Ok(collator) => Self { collator: Some(collator) },
            Err(e) => {
                warn!("French collation unavailable, ordering by code point: {}", e);
                Self::code_points()
            }
        }
    }

    /// Code point order of the NFC forms.
    pub fn code_points() -> Self {
        Self { collator: None }
    }

    /// Compare two strings. Canonically equivalent strings are equal.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match &self.collator {
            Some(collator) => collator.compare(a, b),
            None => a.nfc().cmp(b.nfc()),
        }
    }
}

/// Compare two strings in French reading order.
///
/// Builds a fresh [`ReadingOrder`]; keep one around when sorting.
pub fn compare(a: &str, b: &str) -> Ordering {
    ReadingOrder::french().compare(a, b)
}
