use super::*;

fn client_with_relay(relay: &str) -> VariantClient {
    VariantClient::new(5, vec!["vscout-test/0.1".to_owned()], 0, 0)
        .unwrap()
        .with_relay(Some(relay.to_owned()))
}

#[test]
fn request_url_is_target_without_relay() {
    let client = VariantClient::new(5, vec![], 0, 0).unwrap();
    assert_eq!(
        client.request_url("https://www.amazon.com/dp/B0X?th=1"),
        "https://www.amazon.com/dp/B0X?th=1"
    );
}

#[test]
fn request_url_percent_encodes_target_for_relay() {
    let client = client_with_relay("https://relay.example.com/api/scrape?url=");
    assert_eq!(
        client.request_url("https://www.amazon.com/dp/B0X?th=1&psc=1"),
        "https://relay.example.com/api/scrape?url=https%3A%2F%2Fwww.amazon.com%2Fdp%2FB0X%3Fth%3D1%26psc%3D1"
    );
}

#[test]
fn request_url_keeps_unreserved_marks() {
    let client = client_with_relay("https://r.test/?u=");
    assert_eq!(
        client.request_url("https://a.test/x_y-z.(1)~*!'"),
        "https://r.test/?u=https%3A%2F%2Fa.test%2Fx_y-z.(1)~*!'"
    );
}

#[test]
fn extract_origin_strips_path_and_query() {
    assert_eq!(
        extract_origin("https://www.amazon.co.jp/dp/B0X?th=1").as_deref(),
        Some("https://www.amazon.co.jp")
    );
}

#[test]
fn extract_origin_rejects_non_http() {
    assert_eq!(extract_origin("ftp://www.amazon.com/dp/B0X"), None);
    assert_eq!(extract_origin("www.amazon.com/dp/B0X"), None);
    assert_eq!(extract_origin(""), None);
}

#[test]
fn extract_domain_strips_scheme() {
    assert_eq!(extract_domain("https://www.amazon.com/dp/B0X"), "www.amazon.com");
    assert_eq!(extract_domain("not a url"), "not a url");
}

#[test]
fn result_body_with_error_field_is_relay_failure() {
    let err = parse_result_body("https://www.amazon.com/dp/B0X", r#"{"error": "blocked"}"#)
        .unwrap_err();
    assert!(
        matches!(err, ScraperError::RelayFailed { ref reason, .. } if reason == "blocked"),
        "expected RelayFailed, got: {err:?}"
    );
}

#[test]
fn result_body_parses_scraping_result() {
    let result = parse_result_body(
        "https://www.amazon.com/dp/B0X",
        r#"{"success": true, "variants": [], "parentPrice": "$2.00"}"#,
    )
    .unwrap();
    assert!(result.success);
    assert_eq!(result.parent_price, "$2.00");
}

#[test]
fn result_body_that_is_not_json_is_deserialize_error() {
    let err = parse_result_body("https://www.amazon.com/dp/B0X", "<html>").unwrap_err();
    assert!(matches!(err, ScraperError::Deserialize { .. }));
}

#[tokio::test]
async fn fetch_rejects_relative_target() {
    let client = VariantClient::new(5, vec![], 0, 0).unwrap();
    let err = client.fetch("/dp/B0X").await.unwrap_err();
    assert!(
        matches!(err, ScraperError::InvalidTargetUrl { .. }),
        "expected InvalidTargetUrl, got: {err:?}"
    );
}
