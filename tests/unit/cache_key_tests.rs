//! Cache Key Unit Tests
//!
//! Tests key derivation:
//! - Endpoint sanitization
//! - Parameter order independence
//! - File name round trip and rejection of foreign files

use dashboard_api::cache::CacheKey;

#[test]
fn test_plain_endpoint_is_sanitized() {
    let key = CacheKey::derive("/services/status", &[]);
    assert_eq!(key.as_str(), "_services_status");
    assert_eq!(key.file_name(), "_services_status.json");
}

#[test]
fn test_parameter_order_is_irrelevant() {
    let a = CacheKey::derive("/external-services/feed", &[("b", "2"), ("a", "1")]);
    let b = CacheKey::derive("/external-services/feed", &[("a", "1"), ("b", "2")]);
    assert_eq!(a, b);
}

#[test]
fn test_parameter_values_change_the_key() {
    let github = CacheKey::derive("/external-services/feed", &[("feed", "github")]);
    let discord = CacheKey::derive("/external-services/feed", &[("feed", "discord")]);
    assert_ne!(github, discord);
    assert_ne!(github, CacheKey::derive("/external-services/feed", &[]));
}

#[test]
fn test_parameterized_key_shape() {
    let key = CacheKey::derive("/external-services/feed", &[("feed", "github")]);
    let (prefix, digest) = key.as_str().rsplit_once('_').unwrap();
    assert_eq!(prefix, "_external-services_feed");
    assert_eq!(digest.len(), 32);
    assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_file_name_round_trip() {
    let key = CacheKey::derive("/sites/count", &[]);
    assert_eq!(CacheKey::from_file_name(&key.file_name()), Some(key));
}

#[test]
fn test_foreign_files_are_not_keys() {
    assert!(CacheKey::from_file_name(".sweep_lock").is_none());
    assert!(CacheKey::from_file_name(".tmpAbc123.partial").is_none());
    assert!(CacheKey::from_file_name("notes.txt").is_none());
    assert!(CacheKey::from_file_name(".json").is_none());
}

#[test]
fn test_endpoint_matching_covers_variants_only() {
    let plain = CacheKey::derive("/sites", &[]);
    let variant = CacheKey::derive("/sites", &[("page", "2")]);
    let count = CacheKey::derive("/sites/count", &[]);

    assert!(plain.matches_endpoint("/sites"));
    assert!(variant.matches_endpoint("/sites"));
    assert!(!count.matches_endpoint("/sites"));
}
