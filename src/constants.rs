//! Global constants and helpers for filenames, networking defaults, retry bounds, and chart geometry
use std::path::{Path, PathBuf};

/// Binary name used in user agents and log output
pub const BINARY_NAME: &str = "sizetrack";

/// Package version from Cargo.toml (set at compile time)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the user agent string for HTTP requests
pub fn user_agent() -> String {
    format!("{}/{}", BINARY_NAME, VERSION)
}

// ============================================================================
// History Store Constants
// ============================================================================

/// File extension for per-bucket history logs
pub const HISTORY_FILE_EXT: &str = "jsonl";

/// Returns the on-disk history log filename for a bucket
///
/// Bucket names are sanitized for the filesystem; records embed the real
/// bucket name, so a lossy filename never loses data.
pub fn history_filename(bucket: &str) -> String {
    format!("{}.{}", sanitize_component(bucket), HISTORY_FILE_EXT)
}

/// Resolves an on-disk history log path relative to the provided directory
pub fn history_path(dir: impl AsRef<Path>, bucket: &str) -> PathBuf {
    dir.as_ref().join(history_filename(bucket))
}

/// Replace any filesystem-hostile character with '_'
pub fn sanitize_component(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Validate a bucket identifier (S3-style: 3-63 chars, lowercase letters,
/// digits, dots and dashes, alphanumeric at both ends)
pub fn validate_bucket_name(name: &str) -> bool {
    let len = name.len();
    if !(3..=63).contains(&len) {
        return false;
    }
    let bytes = name.as_bytes();
    if !bytes[0].is_ascii_lowercase() && !bytes[0].is_ascii_digit() {
        return false;
    }
    if !bytes[len - 1].is_ascii_lowercase() && !bytes[len - 1].is_ascii_digit() {
        return false;
    }
    name.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
}

// ============================================================================
// Aggregation Constants
// ============================================================================

/// Maximum conditional-append attempts per event before surfacing a failure
pub const AGGREGATE_MAX_ATTEMPTS: usize = 4;

/// Base backoff between conditional-append retries (milliseconds, doubled per attempt)
pub const AGGREGATE_BACKOFF_BASE_MS: u64 = 2;

/// Number of delivery ids remembered for duplicate detection
pub const DELIVERY_WINDOW_CAPACITY: usize = 4096;

/// Number of (bucket, key) → size entries kept for resolving removal deltas
pub const OBJECT_CACHE_CAPACITY: usize = 65_536;

// ============================================================================
// Render / Orchestration Constants
// ============================================================================

/// Default timeout for the driver's outbound render call (seconds)
pub const RENDER_TIMEOUT_SECS: u64 = 30;

/// Default attempts for the driver's render call
pub const DRIVER_MAX_ATTEMPTS: usize = 3;

/// Base backoff between driver retries (milliseconds, doubled per attempt)
pub const DRIVER_BACKOFF_BASE_MS: u64 = 500;

/// Chart dimensions in pixels
pub const CHART_WIDTH: u32 = 960;
pub const CHART_HEIGHT: u32 = 540;

/// Content type of published chart artifacts
pub const ARTIFACT_CONTENT_TYPE: &str = "image/svg+xml";

/// Returns the artifact key for a rendered plot
///
/// `scope` is the bucket name, or "all" for a multi-bucket chart. Keys are
/// timestamp-versioned so regeneration never clobbers an artifact mid-read.
pub fn plot_artifact_key(scope: &str, generated_at: i64) -> String {
    format!("plot_{}_{}.svg", sanitize_component(scope), generated_at)
}

// ============================================================================
// Network Constants
// ============================================================================

/// Default listen address for the HTTP server
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

/// Default base URL the driver uses to reach the render endpoint
pub const DEFAULT_RENDER_URL: &str = "http://127.0.0.1:8080";

// ============================================================================
// Environment Variables (startup configuration, never re-read at runtime)
// ============================================================================

pub const ENV_HISTORY_DIR: &str = "SIZETRACK_HISTORY_DIR";
pub const ENV_ARTIFACT_DIR: &str = "SIZETRACK_ARTIFACT_DIR";
pub const ENV_LISTEN_ADDR: &str = "SIZETRACK_LISTEN_ADDR";
pub const ENV_RENDER_URL: &str = "SIZETRACK_RENDER_URL";
pub const ENV_RENDER_TIMEOUT_SECS: &str = "SIZETRACK_RENDER_TIMEOUT_SECS";
pub const ENV_RETRY_LIMIT: &str = "SIZETRACK_RETRY_LIMIT";

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_user_agent() {
        let ua = user_agent();
        assert!(ua.starts_with("sizetrack/"));
    }

    #[test]
    fn test_history_filename() {
        assert_eq!(history_filename("my-bucket"), "my-bucket.jsonl");
        assert_eq!(history_filename("a/b c"), "a_b_c.jsonl");
    }

    #[test]
    fn test_history_path() {
        let dir = Path::new("/tmp/history");
        assert_eq!(
            history_path(dir, "logs.example.com"),
            Path::new("/tmp/history/logs.example.com.jsonl")
        );
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("abc-123.x_y"), "abc-123.x_y");
        assert_eq!(sanitize_component("../etc/passwd"), ".._etc_passwd");
        assert_eq!(sanitize_component("a b\tc"), "a_b_c");
    }

    #[test]
    fn test_validate_bucket_name() {
        assert!(validate_bucket_name("my-bucket"));
        assert!(validate_bucket_name("logs.example.com"));
        assert!(validate_bucket_name("abc"));
        assert!(!validate_bucket_name("ab"));
        assert!(!validate_bucket_name("-leading-dash"));
        assert!(!validate_bucket_name("trailing-dash-"));
        assert!(!validate_bucket_name("UpperCase"));
        assert!(!validate_bucket_name("has space"));
        assert!(!validate_bucket_name(&"x".repeat(64)));
    }

    #[test]
    fn test_plot_artifact_key() {
        assert_eq!(
            plot_artifact_key("my-bucket", 1700000000000),
            "plot_my-bucket_1700000000000.svg"
        );
        assert_eq!(plot_artifact_key("all", 42), "plot_all_42.svg");
    }

    #[test]
    fn test_constants_values() {
        assert_eq!(AGGREGATE_MAX_ATTEMPTS, 4);
        assert_eq!(DELIVERY_WINDOW_CAPACITY, 4096);
        assert_eq!(RENDER_TIMEOUT_SECS, 30);
        assert_eq!(DRIVER_MAX_ATTEMPTS, 3);
        assert_eq!(DEFAULT_LISTEN_ADDR, "127.0.0.1:8080");
        assert_eq!(HISTORY_FILE_EXT, "jsonl");
    }
}
