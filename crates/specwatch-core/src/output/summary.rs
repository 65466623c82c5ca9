//! Plain-text title and body for a pipeline run

use crate::types::{ChangeRecord, ChangeStatus, ChangedRoute, Classification};
use std::fmt::Write;

/// One classified route, as shown in the body
#[derive(Debug, Clone, Copy)]
pub struct RouteSummary<'a> {
    /// `METHOD /path`
    pub route: &'a str,
    /// Added, modified or deleted
    pub status: ChangeStatus,
    /// Classifier output for the route
    pub classification: &'a Classification,
}

/// One-line title
pub fn build_title(provider: &str, changed: &[ChangedRoute]) -> String {
    match changed.len() {
        0 => format!("{}: no API changes", provider),
        1 => format!("{}: 1 route changed", provider),
        n => format!("{}: {} routes changed", provider, n),
    }
}

/// Title used when a provider is seen for the first time
pub fn build_first_run_title(provider: &str) -> String {
    format!("{}: initial snapshot", provider)
}

/// Body with one section per route
pub fn build_body(provider: &str, routes: &[RouteSummary<'_>]) -> String {
    let mut buf = String::with_capacity(256 + routes.len() * 128);
    let breaking = routes
        .iter()
        .flat_map(|r| r.classification.changes.iter())
        .filter(|c| c.breaking)
        .count();

    let _ = writeln!(buf, "API changes detected for {}.", provider);
    let _ = writeln!(
        buf,
        "Routes changed: {}, breaking changes: {}",
        routes.len(),
        breaking
    );

    for route in routes {
        let _ = writeln!(buf);
        let _ = writeln!(buf, "{} {}", route.status.as_byte() as char, route.route);
        if !route.classification.summary.is_empty() {
            let _ = writeln!(buf, "{}", route.classification.summary);
        }
        for change in &route.classification.changes {
            let _ = writeln!(buf, "- {}", describe(change));
        }
    }

    buf
}

fn describe(change: &ChangeRecord) -> String {
    let mut flags = Vec::new();
    if change.breaking {
        flags.push("breaking");
    }
    if change.deprecated {
        flags.push("deprecated");
    }
    if change.doc_only {
        flags.push("docs");
    }

    let mut line = String::new();
    if !flags.is_empty() {
        let _ = write!(line, "[{}] ", flags.join(", "));
    }
    let _ = write!(
        line,
        "{} {}: {}",
        change.change.as_str(),
        change.target.as_str(),
        change.note
    );
    line
}
