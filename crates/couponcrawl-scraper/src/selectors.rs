//! Ordered selector strategies with graceful fallback.
//!
//! The site's markup has changed repeatedly; rather than betting on one
//! selector, each extraction point declares an ordered list of candidates
//! and takes the first that matches anything. Strategies after the winner
//! are never parsed or consulted.

use scraper::{ElementRef, Html, Selector};

use crate::error::CrawlError;

/// A named CSS selector candidate.
#[derive(Debug, Clone, Copy)]
pub struct SelectorStrategy {
    /// Short identifier used in logs.
    pub name: &'static str,
    pub css: &'static str,
}

/// Result of a successful [`resolve`]: which strategy won and what it matched.
#[derive(Debug)]
pub struct Resolved<'a> {
    pub strategy: &'static str,
    pub elements: Vec<ElementRef<'a>>,
}

/// Candidate selectors for brand links on a letter index page, in priority
/// order. The first two target the brand grid layouts observed on the site;
/// the last is a broad fallback that matches any brand-path anchor.
pub const BRAND_LINK_STRATEGIES: [SelectorStrategy; 3] = [
    SelectorStrategy {
        name: "brand-grid",
        css: "ul.grid.grid-cols-1 a",
    },
    SelectorStrategy {
        name: "brand-list",
        css: ".brand-list a",
    },
    SelectorStrategy {
        name: "brand-anchor",
        css: "a[href*=\"/brands/\"]",
    },
];

/// CSS class the site puts on offer cards.
const OFFER_ARTICLE_CSS: &str = "article.Offer";
/// Title element inside an offer card.
const OFFER_TITLE_CSS: &str = "h3";

/// Title prefixes the site prepends to verified offers. Stripped before
/// matching a structured-data offer name against its DOM article, since the
/// JSON-LD name does not carry the prefix.
const VERIFIED_PREFIXES: [&str; 2] = ["Verificat", "Verified"];

/// Tries `strategies` in declaration order and returns the first that yields
/// a non-empty match set, or `Ok(None)` when every strategy matches nothing.
///
/// Later strategies are not parsed once one succeeds, so an invalid selector
/// string after the winning strategy is not an error.
///
/// # Errors
///
/// Returns [`CrawlError::InvalidSelector`] if a strategy that is actually
/// consulted fails to parse as CSS.
pub fn resolve<'a>(
    html: &'a Html,
    strategies: &[SelectorStrategy],
) -> Result<Option<Resolved<'a>>, CrawlError> {
    for strategy in strategies {
        let selector =
            Selector::parse(strategy.css).map_err(|_| CrawlError::InvalidSelector {
                strategy: strategy.name.to_owned(),
                css: strategy.css.to_owned(),
            })?;
        let elements: Vec<ElementRef<'a>> = html.select(&selector).collect();
        if !elements.is_empty() {
            return Ok(Some(Resolved {
                strategy: strategy.name,
                elements,
            }));
        }
        tracing::debug!(strategy = strategy.name, "selector strategy matched nothing");
    }
    Ok(None)
}

/// Normalizes an offer title for article matching: strips the site's
/// verified-offer prefix (if any) and collapses internal whitespace.
#[must_use]
pub fn normalize_offer_title(raw: &str) -> String {
    let trimmed = raw.trim();
    let stripped = VERIFIED_PREFIXES
        .iter()
        .find_map(|prefix| {
            let (head, tail) = trimmed.split_at_checked(prefix.len())?;
            head.eq_ignore_ascii_case(prefix).then_some(tail)
        })
        .unwrap_or(trimmed);
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Finds the offer-card article whose title matches `offer_name` after
/// normalization on both sides. Returns the first match in document order.
#[must_use]
pub fn find_offer_article<'a>(html: &'a Html, offer_name: &str) -> Option<ElementRef<'a>> {
    // Both selectors are fixed strings; parse failures here would be a bug,
    // not a data condition.
    let article_selector = Selector::parse(OFFER_ARTICLE_CSS).ok()?;
    let title_selector = Selector::parse(OFFER_TITLE_CSS).ok()?;

    let wanted = normalize_offer_title(offer_name);
    html.select(&article_selector).find(|article| {
        article.select(&title_selector).any(|title| {
            let text: String = title.text().collect();
            normalize_offer_title(&text) == wanted
        })
    })
}

#[cfg(test)]
#[path = "selectors_test.rs"]
mod tests;
