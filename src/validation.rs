//! Input validation and output sanitization
//!
//! Request parameters that end up in command arguments or file paths go
//! through these checks first. Payloads are HTML-escaped before they are
//! cached or sent, and anything user-controlled is flattened before it is
//! written to a log line.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Default maximum length for free-form string parameters
pub const MAX_STRING_LEN: usize = 255;

/// Maximum length of a sanitized log field
pub const MAX_LOG_FIELD_LEN: usize = 255;

/// Services that may be probed by name
const ALLOWED_SERVICES: &[&str] = &["nginx", "mariadb", "redis-server"];

static PHP_FPM_SERVICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^php[a-zA-Z0-9._-]*fpm[a-zA-Z0-9._-]*$").expect("valid php-fpm pattern")
});

static PATH_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._-]+$").expect("valid path segment pattern"));

/// Accept known service names and PHP-FPM unit variants
/// (`php-fpm`, `php8.4-fpm`, `php-fpm8.4`, `php84-fpm`)
pub fn validate_service(input: &str) -> Option<&str> {
    if ALLOWED_SERVICES.contains(&input) || PHP_FPM_SERVICE.is_match(input) {
        Some(input)
    } else {
        None
    }
}

/// Accept a single file name component: `[A-Za-z0-9._-]+` with no `..`
pub fn validate_path_segment(input: &str) -> Option<&str> {
    if PATH_SEGMENT.is_match(input) && !input.contains("..") {
        Some(input)
    } else {
        None
    }
}

/// Trim, bound and defang a free-form string parameter
pub fn validate_string(input: &str, max_len: usize) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.len() > max_len {
        return None;
    }
    let stripped: String = trimmed
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\''))
        .collect();
    Some(escape_html(&stripped))
}

/// HTML-escape `&`, `<`, `>`, `"` and `'`
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            c => out.push(c),
        }
    }
    out
}

/// Recursively HTML-escape every string value; keys and non-strings are kept
pub fn sanitize_output(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(escape_html(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_output).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, sanitize_output(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Make a value safe to embed in a single log line
///
/// Control characters become spaces, whitespace runs collapse, and the
/// result is truncated to [`MAX_LOG_FIELD_LEN`] characters.
pub fn sanitize_log_input(input: &str) -> String {
    let spaced: String = input
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    spaced
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_LOG_FIELD_LEN)
        .collect()
}

/// Record a security-relevant event on the `security` log target
pub fn log_security_event(event: &str, details: &str, client_ip: Option<std::net::IpAddr>) {
    tracing::warn!(
        target: "security",
        event = %sanitize_log_input(event),
        details = %sanitize_log_input(details),
        client_ip = %client_ip.map(|ip| ip.to_string()).unwrap_or_else(|| "unknown".to_string()),
        "Security event"
    );
}
