//! Upstream Payload Unit Tests
//!
//! Tests Uptime Robot summaries and monitor formatting, and StatusPage
//! indicator normalization.

use dashboard_api::upstream::{
    status_text, FeedStatus, MonitorList, OverallStatus, RawMonitor, UptimeSummary,
};
use serde_json::json;

fn monitors() -> Vec<RawMonitor> {
    serde_json::from_value(json!([
        {"id": 11, "friendly_name": "Shop", "url": "https://shop.example", "status": 2,
         "custom_uptime_ratio": "100.000-99.950-99.900"},
        {"id": 12, "friendly_name": "Blog", "url": "https://blog.example", "status": 9,
         "custom_uptime_ratio": "50.000-90.000-95.000", "last_check_time": 1700000000},
        {"id": 13, "status": 0}
    ]))
    .unwrap()
}

#[test]
fn test_summary_counts() {
    let summary = UptimeSummary::from_monitors(&monitors());
    assert!(summary.enabled);
    assert_eq!(summary.overall_status, OverallStatus::Critical);
    assert_eq!(summary.total_monitors, 3);
    assert_eq!((summary.up, summary.down, summary.paused), (1, 1, 1));
}

#[test]
fn test_summary_serialization() {
    let summary = UptimeSummary::from_monitors(&monitors()[..1]);
    assert_eq!(
        serde_json::to_value(summary).unwrap(),
        json!({
            "enabled": true,
            "overall_status": "healthy",
            "total_monitors": 1,
            "up": 1,
            "down": 0,
            "paused": 0
        })
    );
}

#[test]
fn test_monitor_list() {
    let list = MonitorList::from_monitors(&monitors());
    assert_eq!(list.total, 3);

    let blog = &list.monitors[1];
    assert_eq!(blog.name, "Blog");
    assert_eq!(blog.status_text, "Down");
    assert_eq!(blog.uptime_day, Some(50.0));
    assert_eq!(blog.last_check, Some(1_700_000_000));

    let bare = &list.monitors[2];
    assert_eq!(bare.name, "Unknown");
    assert_eq!(bare.url, "");
    assert_eq!(bare.uptime_month, None);
}

#[test]
fn test_status_text_table() {
    assert_eq!(status_text(1), "Not checked yet");
    assert_eq!(status_text(8), "Seems down");
    assert_eq!(status_text(3), "Unknown");
}

#[test]
fn test_feed_status() {
    assert_eq!(
        FeedStatus::from_indicator("none").description,
        "All Systems Operational"
    );
    assert_eq!(FeedStatus::from_indicator("minor").indicator, "minor");
    assert_eq!(FeedStatus::unreachable().indicator, "major");
}
