//! End-to-end crawl scenarios against a local wiremock server.
//!
//! Each test stands up its own server, seeds the crawler with a letter page
//! on it, and drains the frontier to completion. Pacing, stagger, and
//! backoff delays are zeroed so the tests run at full speed.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use couponcrawl_core::{CrawlConfig, MemorySink, SeedMode};
use couponcrawl_scraper::Crawler;

fn test_config(seeds: Vec<String>) -> CrawlConfig {
    CrawlConfig {
        seed_mode: SeedMode::Explicit(seeds),
        requests_per_minute: 0,
        request_timeout_secs: 5,
        max_retries: 1,
        backoff_base_ms: 0,
        challenge_backoff_ms: 0,
        offer_stagger_ms: 0,
        ..CrawlConfig::default()
    }
}

/// Letter page whose brand grid links to one brand path.
fn letter_page(brand_href: &str) -> String {
    format!(
        r#"<html><body>
          <ul class="grid grid-cols-1"><li><a href="{brand_href}">Brand</a></li></ul>
        </body></html>"#
    )
}

/// Brand page with an Organization block, one ItemList offer pointing at
/// `offer_url`, and the given extra markup (offer articles, if any).
fn brand_page(offer_url: &str, extra_markup: &str) -> String {
    format!(
        r#"<html><head>
          <script type="application/ld+json">{{"@type": "Organization", "name": "Acme", "logo": "https://cdn.example.com/acme.png"}}</script>
          <script type="application/ld+json">{{"@type": "ItemList", "itemListElement": [
            {{"item": {{"name": "10% off", "url": "{offer_url}"}}}}
          ]}}</script>
        </head><body>{extra_markup}</body></html>"#
    )
}

const OFFER_ARTICLE_WITH_CTA: &str = r#"
  <article class="Offer">
    <h3>Verificat 10% off</h3>
    <div class="OutlinkCta">Obține codul</div>
  </article>
"#;

// ---------------------------------------------------------------------------
// Scenario 1 – extraction without a matching DOM article: no reveal attempted
// ---------------------------------------------------------------------------

#[tokio::test]
async fn brand_without_matching_article_emits_with_null_code() {
    let server = MockServer::start().await;
    let offer_url = format!("{}/offer/1", server.uri());

    Mock::given(method("GET"))
        .and(path("/brands/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string(letter_page("/acme")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/acme"))
        .respond_with(ResponseTemplate::new(200).set_body_string(brand_page(&offer_url, "")))
        .mount(&server)
        .await;

    let mut sink = MemorySink::new();
    let mut crawler =
        Crawler::new(test_config(vec![format!("{}/brands/a", server.uri())])).unwrap();
    let summary = crawler.run(&mut sink).await.unwrap();

    assert_eq!(summary.brands_emitted, 1);
    assert_eq!(summary.offers_without_code, 1);
    assert_eq!(summary.requests_dropped, 0);

    let record = &sink.records[0];
    assert_eq!(record.name.as_deref(), Some("Acme"));
    assert_eq!(record.logo_url.as_deref(), Some("https://cdn.example.com/acme.png"));
    assert_eq!(record.offers.len(), 1);
    assert_eq!(record.offers[0].name, "10% off");
    assert!(record.offers[0].coupon_code.is_none());
}

// ---------------------------------------------------------------------------
// Scenario 2 – static reveal: the offer page carries the coupon input
// ---------------------------------------------------------------------------

#[tokio::test]
async fn static_reveal_attaches_code_from_coupon_input() {
    let server = MockServer::start().await;
    let offer_url = format!("{}/offer/deal", server.uri());

    Mock::given(method("GET"))
        .and(path("/brands/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string(letter_page("/acme")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/acme"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(brand_page(&offer_url, OFFER_ARTICLE_WITH_CTA)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/offer/deal"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><input id="coupon-42" value="SAVE10"></body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let mut sink = MemorySink::new();
    let mut crawler =
        Crawler::new(test_config(vec![format!("{}/brands/a", server.uri())])).unwrap();
    let summary = crawler.run(&mut sink).await.unwrap();

    assert_eq!(summary.brands_emitted, 1);
    assert_eq!(summary.offers_without_code, 0);
    assert_eq!(
        sink.records[0].offers[0].coupon_code.as_deref(),
        Some("SAVE10")
    );
}

// ---------------------------------------------------------------------------
// Scenario 3 – challenge page on the offer URL: reveal falls through all
// modes, code stays null, the record is still emitted
// ---------------------------------------------------------------------------

#[tokio::test]
async fn challenge_on_offer_page_leaves_code_null_but_emits_record() {
    let server = MockServer::start().await;
    let offer_url = format!("{}/offer/deal", server.uri());

    Mock::given(method("GET"))
        .and(path("/brands/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string(letter_page("/acme")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/acme"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(brand_page(&offer_url, OFFER_ARTICLE_WITH_CTA)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/offer/deal"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><body><div class=\"challenge-running\">checking</div></body></html>",
        ))
        .mount(&server)
        .await;

    let mut sink = MemorySink::new();
    let mut crawler =
        Crawler::new(test_config(vec![format!("{}/brands/a", server.uri())])).unwrap();
    let summary = crawler.run(&mut sink).await.unwrap();

    // The coupon page was retried then dropped, but the brand still emitted
    // with the offer intact and its code null.
    assert_eq!(summary.brands_emitted, 1);
    assert_eq!(summary.offers_without_code, 1);
    assert_eq!(summary.requests_dropped, 1);
    assert_eq!(sink.records.len(), 1);
    assert!(sink.records[0].offers[0].coupon_code.is_none());
}

// ---------------------------------------------------------------------------
// Scenario 4 – a seed that times out is dropped after max_retries+1 attempts
// and the crawl proceeds to the next seed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn timed_out_seed_is_dropped_and_crawl_continues() {
    let server = MockServer::start().await;
    let offer_url = format!("{}/offer/1", server.uri());

    Mock::given(method("GET"))
        .and(path("/brands/a"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(std::time::Duration::from_secs(3))
                .set_body_string(letter_page("/acme")),
        )
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/brands/b"))
        .respond_with(ResponseTemplate::new(200).set_body_string(letter_page("/acme")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/acme"))
        .respond_with(ResponseTemplate::new(200).set_body_string(brand_page(&offer_url, "")))
        .mount(&server)
        .await;

    let mut config = test_config(vec![
        format!("{}/brands/a", server.uri()),
        format!("{}/brands/b", server.uri()),
    ]);
    config.request_timeout_secs = 1;
    config.max_retries = 1;

    let mut sink = MemorySink::new();
    let mut crawler = Crawler::new(config).unwrap();
    let summary = crawler.run(&mut sink).await.unwrap();

    // max_retries=1 means two total attempts on the dead seed (asserted via
    // the mock's expect), then Dropped; the second seed still emits.
    assert_eq!(summary.requests_dropped, 1);
    assert_eq!(summary.brands_emitted, 1);
    assert_eq!(sink.records[0].name.as_deref(), Some("Acme"));
}

// ---------------------------------------------------------------------------
// Redirect-follow mode: interstitial offer page bounces to an /out/ URL
// ---------------------------------------------------------------------------

#[tokio::test]
async fn redirect_follow_finds_code_on_target_page() {
    let server = MockServer::start().await;
    let offer_url = format!("{}/offer/deal", server.uri());

    Mock::given(method("GET"))
        .and(path("/brands/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string(letter_page("/acme")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/acme"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(brand_page(&offer_url, OFFER_ARTICLE_WITH_CTA)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/offer/deal"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><a href="/out/9">Continue to store</a></body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/out/9"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><input class="CopyCode" value="BOUNCE20"></body></html>"#,
        ))
        .mount(&server)
        .await;

    let mut sink = MemorySink::new();
    let mut crawler =
        Crawler::new(test_config(vec![format!("{}/brands/a", server.uri())])).unwrap();
    crawler.run(&mut sink).await.unwrap();

    assert_eq!(
        sink.records[0].offers[0].coupon_code.as_deref(),
        Some("BOUNCE20")
    );
}

// ---------------------------------------------------------------------------
// API mode: codeless offer page, but the URL carries a coupon id suffix
// ---------------------------------------------------------------------------

#[tokio::test]
async fn api_mode_reveals_code_from_coupon_endpoint() {
    let server = MockServer::start().await;
    let offer_url = format!("{}/offer/mega-deal-77", server.uri());

    Mock::given(method("GET"))
        .and(path("/brands/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string(letter_page("/acme")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/acme"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(brand_page(&offer_url, OFFER_ARTICLE_WITH_CTA)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/offer/mega-deal-77"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><p>reveal requires a click</p></body></html>"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/coupon/77"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"id": 77, "code": "API77"}"#),
        )
        .mount(&server)
        .await;

    let mut sink = MemorySink::new();
    let mut crawler =
        Crawler::new(test_config(vec![format!("{}/brands/a", server.uri())])).unwrap();
    crawler.run(&mut sink).await.unwrap();

    assert_eq!(
        sink.records[0].offers[0].coupon_code.as_deref(),
        Some("API77")
    );
}

// ---------------------------------------------------------------------------
// Revealed-code cache: the same offer URL is only revealed once per run
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shared_offer_url_is_revealed_once_and_cached() {
    let server = MockServer::start().await;
    let offer_url = format!("{}/offer/deal", server.uri());

    let list = r#"<html><body><ul class="grid grid-cols-1">
             <li><a href="/acme">Acme</a></li>
             <li><a href="/zenith">Zenith</a></li>
           </ul></body></html>"#;
    Mock::given(method("GET"))
        .and(path("/brands/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string(list))
        .mount(&server)
        .await;
    for brand in ["/acme", "/zenith"] {
        Mock::given(method("GET"))
            .and(path(brand))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(brand_page(&offer_url, OFFER_ARTICLE_WITH_CTA)),
            )
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/offer/deal"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><input id="coupon-1" value="ONCE"></body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let mut sink = MemorySink::new();
    let mut crawler =
        Crawler::new(test_config(vec![format!("{}/brands/a", server.uri())])).unwrap();
    let summary = crawler.run(&mut sink).await.unwrap();

    assert_eq!(summary.brands_emitted, 2);
    for record in &sink.records {
        assert_eq!(record.offers[0].coupon_code.as_deref(), Some("ONCE"));
    }
}
