//! Brand and offer extraction from a fetched page.
//!
//! JSON-LD is the primary source: the site embeds an `Organization` block
//! for the brand and an `ItemList` block for its offers. Markup scraping of
//! the offer cards is only a fallback for pages that ship no `ItemList`.

use scraper::{Html, Selector};
use serde_json::Value;

use couponcrawl_core::{BrandRecord, OfferRecord};

const JSON_LD_CSS: &str = "script[type=\"application/ld+json\"]";
const FALLBACK_CARD_CSS: &str = "article.Offer";
const FALLBACK_TITLE_CSS: &str = "h3";
const FALLBACK_DESCRIPTION_CSS: &str = "p.description";

/// Extracts a [`BrandRecord`] from a brand-detail page.
///
/// Every JSON-LD block is parsed independently; a malformed block is logged
/// and skipped, never fatal to the page. The first `Organization` block wins
/// for name/logo and the first `ItemList` block wins for offers. When no
/// `ItemList` exists at all, offer cards are scraped from the markup
/// directly, with coupon codes left null.
///
/// A page with zero extractable data yields an empty record, which the
/// emission invariant upstream then discards.
#[must_use]
pub fn extract(html: &Html, source_url: &str) -> BrandRecord {
    let mut record = BrandRecord::new(source_url);
    let mut saw_item_list = false;

    let Ok(script_selector) = Selector::parse(JSON_LD_CSS) else {
        return record;
    };

    for script in html.select(&script_selector) {
        let raw: String = script.text().collect();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value: Value = match serde_json::from_str(trimmed) {
            Ok(value) => value,
            Err(error) => {
                tracing::debug!(source_url, %error, "skipping malformed JSON-LD block");
                continue;
            }
        };
        // A block may be a single node or a top-level array of nodes.
        match value {
            Value::Array(nodes) => {
                for node in &nodes {
                    apply_json_ld_node(node, &mut record, &mut saw_item_list);
                }
            }
            node => apply_json_ld_node(&node, &mut record, &mut saw_item_list),
        }
    }

    if !saw_item_list {
        record.offers = fallback_offer_cards(html);
        if !record.offers.is_empty() {
            tracing::debug!(
                source_url,
                offers = record.offers.len(),
                "no ItemList block; extracted offers from markup"
            );
        }
    }

    record
}

fn apply_json_ld_node(node: &Value, record: &mut BrandRecord, saw_item_list: &mut bool) {
    match node.get("@type").and_then(Value::as_str) {
        Some("Organization") => {
            // First occurrence wins when duplicates exist.
            if record.name.is_none() {
                record.name = node.get("name").and_then(Value::as_str).map(str::to_owned);
            }
            if record.logo_url.is_none() {
                record.logo_url = node.get("logo").and_then(logo_url);
            }
        }
        Some("ItemList") => {
            if !*saw_item_list {
                record.offers = offers_from_item_list(node);
            }
            *saw_item_list = true;
        }
        _ => {}
    }
}

/// The `logo` field is published either as a plain URL string or as an
/// `ImageObject` with a `url` field.
fn logo_url(logo: &Value) -> Option<String> {
    match logo {
        Value::String(url) => Some(url.clone()),
        Value::Object(map) => map.get("url").and_then(Value::as_str).map(str::to_owned),
        _ => None,
    }
}

/// Maps `itemListElement[].item` entries to offers, preserving list order.
/// Missing subfields become `None`; entries without a name are skipped since
/// the name is the join key for reveal matching.
fn offers_from_item_list(node: &Value) -> Vec<OfferRecord> {
    let Some(elements) = node.get("itemListElement").and_then(Value::as_array) else {
        return Vec::new();
    };

    elements
        .iter()
        .filter_map(|element| {
            let item = element.get("item")?;
            let name = item.get("name").and_then(Value::as_str)?;
            let mut offer = OfferRecord::named(name);
            offer.offer_url = item.get("url").and_then(Value::as_str).map(str::to_owned);
            offer.description = item
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_owned);
            offer.valid_from = item
                .get("validFrom")
                .and_then(Value::as_str)
                .map(str::to_owned);
            Some(offer)
        })
        .collect()
}

/// Scrapes offer cards straight out of the markup. Reveal is never attempted
/// for these offers; without structured data there is no offer URL to chase.
fn fallback_offer_cards(html: &Html) -> Vec<OfferRecord> {
    let (Ok(card), Ok(title), Ok(description)) = (
        Selector::parse(FALLBACK_CARD_CSS),
        Selector::parse(FALLBACK_TITLE_CSS),
        Selector::parse(FALLBACK_DESCRIPTION_CSS),
    ) else {
        return Vec::new();
    };

    html.select(&card)
        .filter_map(|article| {
            let name: String = article.select(&title).next()?.text().collect();
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let mut offer = OfferRecord::named(name);
            offer.description = article.select(&description).next().map(|d| {
                let text: String = d.text().collect();
                text.trim().to_owned()
            });
            Some(offer)
        })
        .collect()
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
