//! Coupon-code reveal.
//!
//! A listing page only says an offer *has* a code; getting the code string
//! itself takes a second interaction. The site has shipped several behaviors
//! over time: a plain coupon page, an interstitial that bounces through an
//! outbound redirect, a click-to-reveal panel, and a JSON endpoint. They are
//! consolidated here into one pipeline tried in fixed order, cheapest first,
//! stopping at the first mode that yields a code. A rendering engine is only
//! consulted when static retrieval cannot reach the code.

use std::time::Duration;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::engine::BrowserEngine;
use crate::error::CrawlError;
use crate::fetch::{Document, Fetcher};
use crate::selectors::find_offer_article;

/// Coupon input candidates on a reveal page, in priority order.
const COUPON_FIELD_PRIMARY_CSS: &str = "input[id^=\"coupon-\"]";
const COUPON_FIELD_FALLBACK_CSS: &str = "input.CopyCode";

/// Outbound-redirect anchors on an interstitial offer page.
const REDIRECT_LINK_CSS: [&str; 2] = ["a[href*=\"/out/\"]", "a[href*=\"/go/\"]"];

/// "Get code" call-to-action inside an offer card.
const CTA_CSS: &str = "div.OutlinkCta, button.OutlinkCta, a.OutlinkCta";
/// CTA label fallback for markup revisions that dropped the class.
const CTA_LABELS: [&str; 3] = ["get code", "obtine codul", "obține codul"];

/// Revealed-code element the interactive mode reads when the input is absent.
const REVEALED_CODE_CSS: &str = "div.CopyCode, span.RevealedCode";
const INTERACTIVE_WAIT: Duration = Duration::from_secs(10);

/// Result of one reveal attempt. Either exactly one non-empty code string or
/// an explicit negative reason, never partially valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealOutcome {
    Code(String),
    /// The offer's article carries no "get code" call-to-action.
    NoButton,
    /// No DOM article matches the offer's normalized title.
    NoMatch,
    /// The offer page could not be fetched at all.
    Unreachable,
    /// Every applicable mode ran and none produced a code.
    ParseFailed,
}

/// Decides whether an offer is worth a reveal attempt: it must have a DOM
/// article counterpart and that article must carry a "get code" CTA. Returns
/// the terminal outcome when it is not, `None` when a coupon-page fetch
/// should follow.
#[must_use]
pub fn precheck(brand_page: &Html, offer_name: &str) -> Option<RevealOutcome> {
    let Some(article) = find_offer_article(brand_page, offer_name) else {
        return Some(RevealOutcome::NoMatch);
    };
    if has_get_code_cta(article) {
        None
    } else {
        Some(RevealOutcome::NoButton)
    }
}

fn has_get_code_cta(article: ElementRef<'_>) -> bool {
    if let Ok(selector) = Selector::parse(CTA_CSS) {
        if article.select(&selector).next().is_some() {
            return true;
        }
    }
    // Markup revisions without the CTA class still label the control.
    let Ok(clickable) = Selector::parse("a, button, span") else {
        return false;
    };
    article.select(&clickable).any(|el| {
        let text: String = el.text().collect();
        let lowered = text.trim().to_lowercase();
        CTA_LABELS.iter().any(|label| lowered.contains(label))
    })
}

/// Searches a reveal page for a populated coupon input, primary selector
/// first. Whitespace-only values do not count as a code.
#[must_use]
pub fn find_coupon_code(html: &Html) -> Option<String> {
    for css in [COUPON_FIELD_PRIMARY_CSS, COUPON_FIELD_FALLBACK_CSS] {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        if let Some(code) = html
            .select(&selector)
            .filter_map(|input| input.attr("value"))
            .map(str::trim)
            .find(|value| !value.is_empty())
        {
            return Some(code.to_owned());
        }
    }
    None
}

/// Finds an outbound-redirect link on an interstitial offer page, resolved
/// against the page URL.
#[must_use]
pub fn find_redirect_link(html: &Html, page_url: &str) -> Option<String> {
    let base = Url::parse(page_url).ok()?;
    for css in REDIRECT_LINK_CSS {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        if let Some(href) = html.select(&selector).find_map(|a| a.attr("href")) {
            return base.join(href).ok().map(Into::into);
        }
    }
    None
}

/// Extracts the numeric coupon id the site encodes as a URL suffix, e.g.
/// `https://x/offer/super-deal-4821` → `4821`.
#[must_use]
pub fn offer_id_from_url(offer_url: &str) -> Option<String> {
    let parsed = Url::parse(offer_url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).next_back()?;
    let id = segment.rsplit('-').next()?;
    (!id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())).then(|| id.to_owned())
}

/// Runs the reveal mode pipeline for one offer.
pub struct RevealResolver<'a, E> {
    fetcher: &'a Fetcher,
    engine: Option<&'a E>,
}

impl<'a, E: BrowserEngine> RevealResolver<'a, E> {
    #[must_use]
    pub fn new(fetcher: &'a Fetcher, engine: Option<&'a E>) -> Self {
        Self { fetcher, engine }
    }

    /// Resolves a code from an already-fetched offer page (or its fetch
    /// error), trying modes in fixed order: static coupon-field search,
    /// redirect-follow, interactive click-through, coupon API.
    ///
    /// Network and timeout failures inside any mode mean that mode failed and
    /// the next one runs; nothing here is ever crawl-fatal. A page fetch that
    /// died on the network yields [`RevealOutcome::Unreachable`] when the
    /// remaining modes come up empty; a challenge page or an ordinary page
    /// with no code yields [`RevealOutcome::ParseFailed`].
    pub async fn resolve_from_page(
        &self,
        offer_url: &str,
        page: Result<&Document, &CrawlError>,
    ) -> RevealOutcome {
        let mut page_unreachable = false;

        match page {
            Ok(doc) => {
                // Html is not Send: query what we need and drop it before
                // any await.
                let (code, redirect) = {
                    let html = doc.parse();
                    (find_coupon_code(&html), find_redirect_link(&html, &doc.url))
                };
                if let Some(code) = code {
                    return RevealOutcome::Code(code);
                }
                if let Some(target) = redirect {
                    if let Some(code) = self.follow_redirect(&target).await {
                        return RevealOutcome::Code(code);
                    }
                }
            }
            Err(CrawlError::Challenge { url }) => {
                tracing::debug!(url, "offer page served a challenge; skipping static mode");
            }
            Err(error) => {
                tracing::debug!(offer_url, %error, "offer page unreachable; skipping static mode");
                page_unreachable = true;
            }
        }

        if let Some(code) = self.interactive_mode(offer_url).await {
            return RevealOutcome::Code(code);
        }
        if let Some(code) = self.api_mode(offer_url).await {
            return RevealOutcome::Code(code);
        }

        if page_unreachable {
            RevealOutcome::Unreachable
        } else {
            RevealOutcome::ParseFailed
        }
    }

    /// Redirect-follow mode: fetch the outbound target and repeat the
    /// coupon-field search there.
    async fn follow_redirect(&self, target: &str) -> Option<String> {
        match self.fetcher.fetch(target).await {
            Ok(doc) => {
                let html = doc.parse();
                find_coupon_code(&html)
            }
            Err(error) => {
                tracing::debug!(target, %error, "redirect-follow mode failed");
                None
            }
        }
    }

    /// Interactive mode: click the CTA in a real browsing context, wait for
    /// the reveal, then read the coupon field (or a revealed code element)
    /// from the live DOM.
    async fn interactive_mode(&self, offer_url: &str) -> Option<String> {
        let engine = self.engine?;
        let result = async {
            engine.navigate(offer_url).await?;
            engine.click(CTA_CSS).await?;
            engine
                .wait_for_selector(COUPON_FIELD_PRIMARY_CSS, INTERACTIVE_WAIT)
                .await?;
            if let Some(value) = engine.read_attr(COUPON_FIELD_PRIMARY_CSS, "value").await? {
                return Ok(Some(value));
            }
            engine.read_text(REVEALED_CODE_CSS).await
        }
        .await;

        match result {
            Ok(Some(code)) => {
                let code = code.trim();
                (!code.is_empty()).then(|| code.to_owned())
            }
            Ok(None) => None,
            Err(error) => {
                tracing::debug!(offer_url, %error, "interactive mode failed");
                None
            }
        }
    }

    /// API mode: when the offer URL carries a numeric id suffix, ask the
    /// site's coupon endpoint for the code directly.
    async fn api_mode(&self, offer_url: &str) -> Option<String> {
        let id = offer_id_from_url(offer_url)?;
        let origin = Url::parse(offer_url).ok()?.origin().ascii_serialization();
        let endpoint = format!("{origin}/api/v1/coupon/{id}");

        match self.fetcher.fetch_json(&endpoint).await {
            Ok(body) => body
                .get("code")
                .and_then(serde_json::Value::as_str)
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(str::to_owned),
            Err(error) => {
                tracing::debug!(endpoint, %error, "API mode failed");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "reveal_test.rs"]
mod tests;
