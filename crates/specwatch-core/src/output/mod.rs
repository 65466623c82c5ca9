//! Human-readable output

pub mod summary;

pub use summary::{build_body, build_first_run_title, build_title, RouteSummary};

/// Escape a value for a GitHub Actions output file
#[inline]
pub fn safe_output_escape(s: &str) -> String {
    s.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
