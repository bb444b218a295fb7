//! Frontier dispatcher: drains requests serially, routes responses by label,
//! and emits completed brand records to the sink.
//!
//! The serial drain is deliberate: one in-flight fetch at a time, with a
//! randomized inter-request delay derived from the configured rate cap,
//! keeps the crawl inside the target site's tolerance. Brand records are
//! independent of one another, so a future multi-worker variant only needs
//! an atomic dequeue and a locked code cache; nothing about their ordering
//! carries meaning.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use rand::Rng;
use url::Url;

use couponcrawl_core::{BrandRecord, CrawlConfig, RecordSink};

use crate::engine::{BrowserEngine, NoBrowser};
use crate::error::CrawlError;
use crate::extract::extract;
use crate::fetch::{Document, Fetcher};
use crate::frontier::{
    backoff_ms, retry_class, CrawlRequest, Frontier, Label, OfferRef, RetryClass,
};
use crate::reveal::{precheck, RevealOutcome, RevealResolver};
use crate::selectors::{resolve, BRAND_LINK_STRATEGIES};

/// Counters reported at the end of a run. Failures along the way surface
/// here rather than aborting the crawl.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub brands_emitted: u64,
    pub offers_total: u64,
    pub offers_without_code: u64,
    pub requests_dropped: u64,
}

/// A brand record waiting for its coupon-page follow-ups to finish.
struct PendingBrand {
    record: BrandRecord,
    outstanding: usize,
}

/// The crawl engine. Generic over the rendering-engine collaborator; plain
/// [`Crawler::new`] builds one without a browser, where the interactive
/// reveal mode simply never succeeds.
pub struct Crawler<E = NoBrowser> {
    config: CrawlConfig,
    fetcher: Fetcher,
    engine: Option<E>,
    /// Revealed codes keyed by offer URL, so the same coupon is never
    /// revealed twice in one run.
    code_cache: HashMap<String, String>,
}

impl Crawler<NoBrowser> {
    /// Builds a crawler with no rendering engine.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Client`] if the HTTP client cannot be built.
    pub fn new(config: CrawlConfig) -> Result<Self, CrawlError> {
        Self::build(config, None)
    }
}

impl<E: BrowserEngine> Crawler<E> {
    /// Builds a crawler that may use `engine` for interactive reveals.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Client`] if the HTTP client cannot be built.
    pub fn with_engine(config: CrawlConfig, engine: E) -> Result<Self, CrawlError> {
        Self::build(config, Some(engine))
    }

    fn build(config: CrawlConfig, engine: Option<E>) -> Result<Self, CrawlError> {
        let fetcher = Fetcher::new(config.request_timeout_secs)?;
        Ok(Self {
            config,
            fetcher,
            engine,
            code_cache: HashMap::new(),
        })
    }

    /// Drains the frontier to completion and returns the run's counters.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Seed`] if the configured seeds are unusable
    /// (the only failure that aborts before any fetch), or
    /// [`CrawlError::Sink`] if the sink rejects a record mid-run. Fetch and
    /// parse failures never abort; they are retried, dropped, or recovered
    /// per the frontier policy.
    pub async fn run<S: RecordSink>(&mut self, sink: &mut S) -> Result<RunSummary, CrawlError> {
        let seeds = seed_requests(&self.config)?;
        tracing::info!(seeds = seeds.len(), "starting crawl");

        let mut frontier = Frontier::seeded(seeds);
        let mut pending: HashMap<String, PendingBrand> = HashMap::new();
        let mut discovered: HashSet<String> = HashSet::new();
        let mut summary = RunSummary::default();

        while let Some(request) = frontier.pop() {
            // A coupon page revealed earlier in the run settles from the
            // cache without another fetch.
            if request.label == Label::CouponPage {
                if let Some(code) = self.code_cache.get(&request.url).cloned() {
                    if let Some(offer_ref) = request.offer.clone() {
                        tracing::debug!(url = %request.url, "code cache hit");
                        self.settle_offer(
                            request.url,
                            &offer_ref,
                            RevealOutcome::Code(code),
                            &mut pending,
                            &mut summary,
                            sink,
                        )
                        .await?;
                    }
                    continue;
                }
            }

            self.pace(&request).await;
            tracing::debug!(
                url = %request.url,
                label = ?request.label,
                attempt = request.attempt,
                "fetching"
            );
            match self.fetcher.fetch(&request.url).await {
                Ok(doc) => {
                    self.route(
                        request,
                        &doc,
                        &mut frontier,
                        &mut pending,
                        &mut discovered,
                        &mut summary,
                        sink,
                    )
                    .await?;
                }
                Err(error) => {
                    self.handle_failure(
                        request,
                        &error,
                        &mut frontier,
                        &mut pending,
                        &mut summary,
                        sink,
                    )
                    .await?;
                }
            }
        }

        // Every coupon-page terminal path resolves its parent, so nothing
        // should still be parked; emit rather than lose a record if one is.
        let leftovers: Vec<BrandRecord> = pending.drain().map(|(_, p)| p.record).collect();
        for record in leftovers {
            tracing::warn!(source_url = %record.source_url, "brand still pending at drain end");
            self.emit(record, &mut summary, sink).await?;
        }

        tracing::info!(
            brands_emitted = summary.brands_emitted,
            offers_without_code = summary.offers_without_code,
            requests_dropped = summary.requests_dropped,
            "crawl finished"
        );
        Ok(summary)
    }

    /// Sleeps out the request's own delay plus the randomized gap implied by
    /// the rate cap. The fetcher itself never sleeps.
    async fn pace(&self, request: &CrawlRequest) {
        let mut delay_ms = request.delay_ms;
        if self.config.requests_per_minute > 0 {
            let gap = 60_000 / self.config.requests_per_minute;
            let jitter = rand::rng().random_range(0..=gap / 2);
            delay_ms += gap + jitter;
        }
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn route<S: RecordSink>(
        &mut self,
        request: CrawlRequest,
        doc: &Document,
        frontier: &mut Frontier,
        pending: &mut HashMap<String, PendingBrand>,
        discovered: &mut HashSet<String>,
        summary: &mut RunSummary,
        sink: &mut S,
    ) -> Result<(), CrawlError> {
        match request.label {
            Label::BrandList => {
                self.handle_brand_list(doc, frontier, discovered);
                Ok(())
            }
            Label::BrandDetail => {
                self.handle_brand_detail(doc, frontier, pending, summary, sink)
                    .await
            }
            Label::CouponPage => {
                self.handle_coupon_page(request, doc, pending, summary, sink)
                    .await
            }
        }
    }

    /// Brand-link discovery on a letter index page. Matched links are
    /// resolved to absolute URLs, deduplicated across the run, and enqueued
    /// as brand-detail requests.
    fn handle_brand_list(
        &self,
        doc: &Document,
        frontier: &mut Frontier,
        discovered: &mut HashSet<String>,
    ) {
        let links = {
            let html = doc.parse();
            match resolve(&html, &BRAND_LINK_STRATEGIES) {
                Ok(Some(resolved)) => {
                    tracing::debug!(
                        url = %doc.url,
                        strategy = resolved.strategy,
                        matches = resolved.elements.len(),
                        "brand links found"
                    );
                    collect_brand_links(&resolved.elements, &doc.url)
                }
                Ok(None) => {
                    tracing::warn!(url = %doc.url, "no brand links found on list page");
                    Vec::new()
                }
                Err(error) => {
                    tracing::warn!(url = %doc.url, %error, "brand link discovery failed");
                    Vec::new()
                }
            }
        };

        for link in links {
            if link == doc.url || !discovered.insert(link.clone()) {
                continue;
            }
            frontier.push(CrawlRequest::new(link, Label::BrandDetail));
        }
    }

    /// Extraction plus reveal planning for one brand page. Offers that pass
    /// the article/CTA prechecks get a staggered coupon-page follow-up; the
    /// record parks until those resolve. Brands with nothing to reveal emit
    /// immediately, and empty pages are skipped silently.
    async fn handle_brand_detail<S: RecordSink>(
        &mut self,
        doc: &Document,
        frontier: &mut Frontier,
        pending: &mut HashMap<String, PendingBrand>,
        summary: &mut RunSummary,
        sink: &mut S,
    ) -> Result<(), CrawlError> {
        let (mut record, plan) = {
            let html = doc.parse();
            let record = extract(&html, &doc.url);
            let mut plan: Vec<(usize, String)> = Vec::new();
            for (index, offer) in record.offers.iter().enumerate() {
                let Some(offer_url) = offer.offer_url.clone() else {
                    continue;
                };
                match precheck(&html, &offer.name) {
                    None => plan.push((index, offer_url)),
                    Some(outcome) => {
                        tracing::debug!(offer = %offer.name, ?outcome, "reveal skipped");
                    }
                }
            }
            (record, plan)
        };

        if !record.is_emittable() {
            tracing::debug!(url = %doc.url, "page yielded no brand data; skipping");
            return Ok(());
        }

        let brand_key = record.source_url.clone();
        // Two discovered links can redirect to the same final URL. The first
        // page owns the parked record and its coupon follow-ups; replacing
        // it would strand those settlements on the wrong counter.
        if pending.contains_key(&brand_key) {
            tracing::warn!(url = %brand_key, "brand already pending; duplicate page ignored");
            return Ok(());
        }

        let mut outstanding = 0usize;
        for (ordinal, (index, offer_url)) in plan.into_iter().enumerate() {
            if let Some(code) = self.code_cache.get(&offer_url) {
                tracing::debug!(offer_url, "code cache hit");
                record.offers[index].coupon_code = Some(code.clone());
                continue;
            }
            let stagger = self.config.offer_stagger_ms * ordinal as u64;
            frontier.push(CrawlRequest::coupon_page(
                offer_url,
                OfferRef {
                    brand_key: brand_key.clone(),
                    offer_index: index,
                },
                stagger,
            ));
            outstanding += 1;
        }

        if outstanding == 0 {
            self.emit(record, summary, sink).await
        } else {
            pending.insert(brand_key, PendingBrand {
                record,
                outstanding,
            });
            Ok(())
        }
    }

    /// Runs the reveal pipeline against a fetched coupon page and settles
    /// the parent offer.
    async fn handle_coupon_page<S: RecordSink>(
        &mut self,
        request: CrawlRequest,
        doc: &Document,
        pending: &mut HashMap<String, PendingBrand>,
        summary: &mut RunSummary,
        sink: &mut S,
    ) -> Result<(), CrawlError> {
        let Some(offer_ref) = request.offer.clone() else {
            tracing::warn!(url = %request.url, "coupon page without parent offer; ignoring");
            return Ok(());
        };
        let outcome = {
            let resolver = RevealResolver::new(&self.fetcher, self.engine.as_ref());
            resolver.resolve_from_page(&request.url, Ok(doc)).await
        };
        self.settle_offer(request.url, &offer_ref, outcome, pending, summary, sink)
            .await
    }

    /// Uniform retry/drop state machine for every label. A dropped
    /// coupon-page request still settles its offer (the reveal pipeline runs
    /// its remaining modes without a document), so reveal failures never
    /// drop an offer or strand a brand record.
    async fn handle_failure<S: RecordSink>(
        &mut self,
        request: CrawlRequest,
        error: &CrawlError,
        frontier: &mut Frontier,
        pending: &mut HashMap<String, PendingBrand>,
        summary: &mut RunSummary,
        sink: &mut S,
    ) -> Result<(), CrawlError> {
        let class = retry_class(error);
        if class != RetryClass::Fatal && request.attempt < self.config.max_retries {
            let delay_ms = backoff_ms(
                class,
                request.attempt,
                self.config.backoff_base_ms,
                self.config.challenge_backoff_ms,
            );
            tracing::warn!(
                url = %request.url,
                attempt = request.attempt,
                max_retries = self.config.max_retries,
                delay_ms,
                %error,
                "transient fetch error, retrying after backoff"
            );
            frontier.push(request.retried(delay_ms));
            return Ok(());
        }

        summary.requests_dropped += 1;
        tracing::warn!(
            url = %request.url,
            attempts = request.attempt + 1,
            %error,
            "request dropped"
        );

        if request.label == Label::CouponPage {
            if let Some(offer_ref) = request.offer.clone() {
                let outcome = {
                    let resolver = RevealResolver::new(&self.fetcher, self.engine.as_ref());
                    resolver.resolve_from_page(&request.url, Err(error)).await
                };
                self.settle_offer(request.url, &offer_ref, outcome, pending, summary, sink)
                    .await?;
            }
        }
        Ok(())
    }

    /// Attaches a reveal outcome to its parent offer and emits the brand
    /// once its last coupon page settles. Negative outcomes leave the code
    /// null; the offer is kept either way.
    async fn settle_offer<S: RecordSink>(
        &mut self,
        offer_url: String,
        offer_ref: &OfferRef,
        outcome: RevealOutcome,
        pending: &mut HashMap<String, PendingBrand>,
        summary: &mut RunSummary,
        sink: &mut S,
    ) -> Result<(), CrawlError> {
        if let RevealOutcome::Code(code) = &outcome {
            self.code_cache.insert(offer_url.clone(), code.clone());
        }

        let Some(parked) = pending.get_mut(&offer_ref.brand_key) else {
            tracing::warn!(
                brand_key = %offer_ref.brand_key,
                offer_url,
                "reveal outcome for a brand that is not pending"
            );
            return Ok(());
        };

        match outcome {
            RevealOutcome::Code(code) => {
                if let Some(offer) = parked.record.offers.get_mut(offer_ref.offer_index) {
                    tracing::debug!(offer = %offer.name, "coupon code revealed");
                    offer.coupon_code = Some(code);
                }
            }
            negative => {
                tracing::debug!(offer_url, outcome = ?negative, "reveal yielded no code");
            }
        }

        parked.outstanding -= 1;
        if parked.outstanding == 0 {
            if let Some(done) = pending.remove(&offer_ref.brand_key) {
                self.emit(done.record, summary, sink).await?;
            }
        }
        Ok(())
    }

    async fn emit<S: RecordSink>(
        &self,
        record: BrandRecord,
        summary: &mut RunSummary,
        sink: &mut S,
    ) -> Result<(), CrawlError> {
        if !record.is_emittable() {
            tracing::debug!(source_url = %record.source_url, "empty record discarded");
            return Ok(());
        }
        summary.brands_emitted += 1;
        summary.offers_total += record.offers.len() as u64;
        summary.offers_without_code += record
            .offers
            .iter()
            .filter(|offer| offer.coupon_code.is_none())
            .count() as u64;
        tracing::info!(
            brand = record.name.as_deref().unwrap_or("<unnamed>"),
            offers = record.offers.len(),
            "emitting brand record"
        );
        let url = record.source_url.clone();
        sink.emit(record)
            .await
            .map_err(|source| CrawlError::Sink { url, source })
    }
}

/// Builds and validates the initial frontier contents. The only error in
/// the whole run that aborts before a single fetch.
fn seed_requests(config: &CrawlConfig) -> Result<Vec<CrawlRequest>, CrawlError> {
    config
        .seed_urls()
        .into_iter()
        .map(|url| {
            Url::parse(&url).map_err(|e| CrawlError::Seed {
                url: url.clone(),
                reason: e.to_string(),
            })?;
            Ok(CrawlRequest::new(url, Label::BrandList))
        })
        .collect()
}

/// Resolves matched anchors to absolute http(s) URLs against the page URL.
fn collect_brand_links(elements: &[scraper::ElementRef<'_>], page_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(page_url) else {
        return Vec::new();
    };
    elements
        .iter()
        .filter_map(|element| element.attr("href"))
        .filter_map(|href| base.join(href).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(Into::into)
        .collect()
}
