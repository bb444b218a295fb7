//! Domain records produced by a crawl run.

use serde::{Deserialize, Serialize};

/// One brand's page worth of coupon data, emitted to the sink exactly once.
///
/// Field shapes mirror the JSON-LD the site publishes: an `Organization`
/// block supplies `name`/`logo_url`, an `ItemList` block supplies `offers`.
/// Any of them may be missing on a given page, so everything except
/// `source_url` and the offer list itself is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandRecord {
    /// The brand-detail page this record was extracted from.
    pub source_url: String,
    pub name: Option<String>,
    pub logo_url: Option<String>,
    /// Offers in the order the page lists them.
    pub offers: Vec<OfferRecord>,
}

impl BrandRecord {
    /// Creates an empty record for a page, prior to extraction.
    #[must_use]
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            name: None,
            logo_url: None,
            offers: Vec::new(),
        }
    }

    /// Whether this record carries enough data to be worth emitting.
    ///
    /// Pages that yield neither a brand name nor a single offer are skipped
    /// silently rather than emitted as empty shells or treated as errors.
    #[must_use]
    pub fn is_emittable(&self) -> bool {
        self.name.is_some() || !self.offers.is_empty()
    }
}

/// A single offer within a [`BrandRecord`].
///
/// `name` is the join key used to correlate a structured-data offer with its
/// DOM article counterpart, and is unique within one brand's offer list.
/// `coupon_code` stays `None` whenever reveal was not attempted or did not
/// produce a code; the offer itself is never dropped for that reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferRecord {
    pub name: String,
    pub description: Option<String>,
    /// ISO date string as published in the JSON-LD, passed through as-is.
    pub valid_from: Option<String>,
    pub offer_url: Option<String>,
    pub coupon_code: Option<String>,
}

impl OfferRecord {
    /// Creates an offer with only a name; all optional fields default to `None`.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            valid_from: None,
            offer_url: None,
            coupon_code: None,
        }
    }
}
