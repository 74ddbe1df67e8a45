use super::*;
use reqwest::header::HeaderValue;

#[test]
fn default_policy_matches_budget() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_retries, 3);
    assert_eq!(policy.base_delay, Duration::from_secs(60));
}

#[test]
fn backoff_doubles_from_base() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay(0, None), Duration::from_secs(60));
    assert_eq!(policy.delay(1, None), Duration::from_secs(120));
    assert_eq!(policy.delay(2, None), Duration::from_secs(240));
}

#[test]
fn retry_after_takes_priority() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay(2, Some(Duration::from_secs(5))), Duration::from_secs(5));
}

#[test]
fn allows_exactly_max_retries() {
    let policy = RetryPolicy::default();
    assert!(policy.allows(0));
    assert!(policy.allows(2));
    assert!(!policy.allows(3));
}

#[test]
fn parses_numeric_retry_after() {
    let mut headers = HeaderMap::new();
    headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
    assert_eq!(retry_after(&headers), Some(Duration::from_secs(7)));

    headers.insert(RETRY_AFTER, HeaderValue::from_static("0.5"));
    assert_eq!(retry_after(&headers), Some(Duration::from_millis(500)));
}

#[test]
fn ignores_missing_or_date_retry_after() {
    let mut headers = HeaderMap::new();
    assert_eq!(retry_after(&headers), None);

    headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
    assert_eq!(retry_after(&headers), None);

    headers.insert(RETRY_AFTER, HeaderValue::from_static("-3"));
    assert_eq!(retry_after(&headers), None);
}

#[test]
fn oversized_retry_after_falls_back_to_backoff() {
    let mut headers = HeaderMap::new();
    headers.insert(RETRY_AFTER, HeaderValue::from_static("1e30"));
    assert_eq!(retry_after(&headers), None);

    headers.insert(RETRY_AFTER, HeaderValue::from_static("inf"));
    assert_eq!(retry_after(&headers), None);

    let policy = RetryPolicy::default();
    assert_eq!(policy.delay(0, retry_after(&headers)), Duration::from_secs(DEFAULT_RETRY_BASE_SECS));
}
