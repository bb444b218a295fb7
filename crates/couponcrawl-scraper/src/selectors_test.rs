use scraper::Html;

use super::*;

const BRAND_GRID_PAGE: &str = r#"
<html><body>
  <ul class="grid grid-cols-1">
    <li><a href="/acme">Acme</a></li>
    <li><a href="/zenith">Zenith</a></li>
  </ul>
  <a href="/brands/a">A</a>
</body></html>
"#;

#[test]
fn first_matching_strategy_wins() {
    let html = Html::parse_document(BRAND_GRID_PAGE);
    let resolved = resolve(&html, &BRAND_LINK_STRATEGIES).unwrap().unwrap();
    assert_eq!(resolved.strategy, "brand-grid");
    assert_eq!(resolved.elements.len(), 2);
}

#[test]
fn falls_through_to_later_strategy_when_earlier_matches_nothing() {
    let html = Html::parse_document(r#"<a href="/brands/acme">Acme</a>"#);
    let resolved = resolve(&html, &BRAND_LINK_STRATEGIES).unwrap().unwrap();
    assert_eq!(resolved.strategy, "brand-anchor");
    assert_eq!(resolved.elements.len(), 1);
}

#[test]
fn returns_none_when_no_strategy_matches() {
    let html = Html::parse_document("<p>nothing here</p>");
    assert!(resolve(&html, &BRAND_LINK_STRATEGIES).unwrap().is_none());
}

/// The short-circuit property: once a strategy matches, later strategies are
/// never consulted. The second strategy here is deliberately unparsable, so
/// consulting it would surface as `InvalidSelector`.
#[test]
fn later_strategies_are_not_consulted_after_a_match() {
    let strategies = [
        SelectorStrategy {
            name: "wins",
            css: "ul.grid.grid-cols-1 a",
        },
        SelectorStrategy {
            name: "poison",
            css: ":::not-a-selector",
        },
    ];
    let html = Html::parse_document(BRAND_GRID_PAGE);
    let resolved = resolve(&html, &strategies).unwrap().unwrap();
    assert_eq!(resolved.strategy, "wins");
}

/// Control for the test above: the same poison strategy *is* an error when
/// the resolver actually reaches it.
#[test]
fn consulted_invalid_selector_is_an_error() {
    let strategies = [
        SelectorStrategy {
            name: "no-match",
            css: "section.absent",
        },
        SelectorStrategy {
            name: "poison",
            css: ":::not-a-selector",
        },
    ];
    let html = Html::parse_document(BRAND_GRID_PAGE);
    let result = resolve(&html, &strategies);
    assert!(
        matches!(
            result,
            Err(CrawlError::InvalidSelector { ref strategy, .. }) if strategy == "poison"
        ),
        "expected InvalidSelector, got: {result:?}"
    );
}

#[test]
fn normalize_strips_verificat_prefix() {
    assert_eq!(normalize_offer_title("Verificat 10% reducere"), "10% reducere");
}

#[test]
fn normalize_strips_verified_prefix_case_insensitively() {
    assert_eq!(normalize_offer_title("VERIFIED 10% off"), "10% off");
}

#[test]
fn normalize_collapses_whitespace() {
    assert_eq!(normalize_offer_title("  10%   off \n everything "), "10% off everything");
}

#[test]
fn normalize_leaves_unprefixed_titles_alone() {
    assert_eq!(normalize_offer_title("Free shipping"), "Free shipping");
}

#[test]
fn find_offer_article_matches_prefixed_title() {
    let html = Html::parse_document(
        r#"
        <article class="Offer"><h3>Verificat 10% off</h3></article>
        <article class="Offer"><h3>Free shipping</h3></article>
        "#,
    );
    let article = find_offer_article(&html, "10% off").unwrap();
    let text: String = article.text().collect();
    assert!(text.contains("10% off"));
}

#[test]
fn find_offer_article_returns_none_without_match() {
    let html = Html::parse_document(r#"<article class="Offer"><h3>Free shipping</h3></article>"#);
    assert!(find_offer_article(&html, "10% off").is_none());
}

#[test]
fn find_offer_article_ignores_non_offer_articles() {
    let html = Html::parse_document(r#"<article class="Blog"><h3>10% off</h3></article>"#);
    assert!(find_offer_article(&html, "10% off").is_none());
}
