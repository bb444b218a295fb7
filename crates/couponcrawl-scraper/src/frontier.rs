//! The pending-request queue driving the crawl, and its retry policy.
//!
//! Every request the crawl makes (seed letter pages, brand pages, coupon
//! follow-ups) goes through the frontier and the same retry state machine:
//! Pending → Fetching → Routed on success, re-enqueued with backoff on a
//! transient failure, Dropped once attempts are exhausted. The crawl never
//! dies because one request did.

use std::collections::VecDeque;

use crate::error::CrawlError;

/// Ceiling for challenge backoff so a persistent interstitial cannot stall
/// the frontier for minutes per request.
const CHALLENGE_BACKOFF_CAP_MS: u64 = 120_000;

/// Selects which handler processes a request's response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    /// A brand-index letter page; yields brand-detail follow-ups.
    BrandList,
    /// A brand's own page; yields a record and coupon-page follow-ups.
    BrandDetail,
    /// An offer's reveal page; yields a code for its parent offer.
    CouponPage,
}

/// Back-reference from a coupon-page request to the offer it reveals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferRef {
    /// `source_url` of the parked brand record.
    pub brand_key: String,
    /// Index into that record's offer list.
    pub offer_index: usize,
}

/// One unit of pending work.
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    pub url: String,
    pub label: Label,
    /// Fetch attempts already made; 0 for a fresh request.
    pub attempt: u32,
    /// Extra delay before the fetch, on top of the global rate cap. Carries
    /// retry backoff and the per-offer stagger.
    pub delay_ms: u64,
    /// Set only for [`Label::CouponPage`] requests.
    pub offer: Option<OfferRef>,
}

impl CrawlRequest {
    #[must_use]
    pub fn new(url: impl Into<String>, label: Label) -> Self {
        Self {
            url: url.into(),
            label,
            attempt: 0,
            delay_ms: 0,
            offer: None,
        }
    }

    /// A coupon-page follow-up staggered by `delay_ms` and tied back to its
    /// parent offer.
    #[must_use]
    pub fn coupon_page(url: impl Into<String>, offer: OfferRef, delay_ms: u64) -> Self {
        Self {
            url: url.into(),
            label: Label::CouponPage,
            attempt: 0,
            delay_ms,
            offer: Some(offer),
        }
    }

    /// The same request, one attempt later, delayed by `backoff_ms`.
    #[must_use]
    pub fn retried(mut self, backoff_ms: u64) -> Self {
        self.attempt += 1;
        self.delay_ms = backoff_ms;
        self
    }
}

/// FIFO frontier. The serial dispatcher is the queue's only owner, so no
/// locking is involved; a multi-worker variant would need to wrap it in a
/// mutex and keep dequeue atomic.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<CrawlRequest>,
}

impl Frontier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn seeded(requests: impl IntoIterator<Item = CrawlRequest>) -> Self {
        Self {
            queue: requests.into_iter().collect(),
        }
    }

    pub fn push(&mut self, request: CrawlRequest) {
        self.queue.push_back(request);
    }

    pub fn pop(&mut self) -> Option<CrawlRequest> {
        self.queue.pop_front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// How a fetch failure is treated by the retry state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Timeout, connection failure, or 5xx: retried with exponential backoff.
    Transient,
    /// Anti-bot interstitial: retried with a longer, capped backoff.
    Challenge,
    /// Everything else (4xx, bad selectors, bad seeds): not worth retrying.
    Fatal,
}

#[must_use]
pub fn retry_class(error: &CrawlError) -> RetryClass {
    match error {
        CrawlError::Timeout { .. } | CrawlError::Network { .. } => RetryClass::Transient,
        CrawlError::HttpStatus { status, .. } if *status >= 500 => RetryClass::Transient,
        CrawlError::Challenge { .. } => RetryClass::Challenge,
        _ => RetryClass::Fatal,
    }
}

/// Backoff before re-enqueueing a failed request.
///
/// Transient failures grow exponentially from `base_ms`; challenges grow
/// linearly from the (already long) `challenge_base_ms` and are capped.
#[must_use]
pub fn backoff_ms(class: RetryClass, attempt: u32, base_ms: u64, challenge_base_ms: u64) -> u64 {
    match class {
        RetryClass::Transient => base_ms.saturating_mul(1u64 << attempt.min(20)),
        RetryClass::Challenge => challenge_base_ms
            .saturating_mul(u64::from(attempt) + 1)
            .min(CHALLENGE_BACKOFF_CAP_MS),
        RetryClass::Fatal => 0,
    }
}

#[cfg(test)]
#[path = "frontier_test.rs"]
mod tests;
