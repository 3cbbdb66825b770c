//! Static HTML report rendered from the archive and the latest fetch.
//!
//! The report is derived output: it is rebuilt on every run and can always be
//! regenerated from the archive. Rendering is a pure function of its inputs
//! and the injected generation time.
pub mod diff;

use crate::archive::ArchivedSnapshot;
use crate::fingerprint::Fingerprint;
use crate::normalize::NormalizedDocument;
use crate::util::{escape_html, write_atomic};
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::{Path, PathBuf};

const STYLE: &str = "\
body{font-family:system-ui,Arial,sans-serif;margin:2rem;max-width:900px;}
table{border-collapse:collapse;width:100%;margin-bottom:2rem;}
th,td{border:1px solid #ccc;padding:4px 8px;font-size:0.9rem;vertical-align:top;}
th{background:#f0f0f0;}
code{background:#f7f7f7;padding:2px 4px;font-size:0.9em;}
details{margin-bottom:1.5rem;}
pre{white-space:pre-wrap;}
.hash{font-family:monospace;font-size:0.8rem;}
.num{color:#888;text-align:right;width:2.5rem;}
.diff-insert td{background:#e6ffed;}
.diff-delete td{background:#ffeef0;}
.diff-replace td{background:#fff5b1;}
.diff-gap td{text-align:center;color:#888;}
.placeholder{font-style:italic;}
";

/// What the current text is compared against in the diff section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Baseline<'a> {
    /// Nothing was archived before this capture.
    Initial,
    /// The fetch matched the latest snapshot; there is nothing to diff.
    Unchanged,
    /// Text of the snapshot the current one replaced.
    Previous(&'a str),
}

impl<'a> Baseline<'a> {
    /// An empty previous text means there was no prior observation.
    pub fn from_previous(text: &'a str) -> Self {
        if text.is_empty() {
            Baseline::Initial
        } else {
            Baseline::Previous(text)
        }
    }
}

/// Everything the report shows apart from the generation time.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub source_url: &'a str,
    pub current: &'a NormalizedDocument,
    pub current_fingerprint: &'a Fingerprint,
    pub baseline: Baseline<'a>,
    pub history: &'a [ArchivedSnapshot],
}

#[derive(Debug, thiserror::Error)]
#[error("write report {}: {source}", .path.display())]
pub struct ReportError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

pub fn render(input: &ReportInput<'_>, generated_at: DateTime<Utc>) -> String {
    let generated = generated_at.to_rfc3339_opts(SecondsFormat::Secs, true);
    let url = escape_html(input.source_url);

    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<title>Page Change Monitor</title>\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width,initial-scale=1\">\n");
    out.push_str(&format!("<style>\n{STYLE}</style>\n</head>\n<body>\n"));
    out.push_str("<h1>Page Change Monitor</h1>\n");
    out.push_str(&format!(
        "<p>Last run: <strong>{generated}</strong> (UTC).</p>\n"
    ));
    out.push_str(&format!(
        "<p>Latest detected content hash: <code class=\"hash\">{}</code>.</p>\n",
        input.current_fingerprint
    ));
    out.push_str(&format!(
        "<p>Monitoring source: <a href=\"{url}\">{url}</a></p>\n"
    ));

    out.push_str("\n<h2>Snapshot History</h2>\n");
    out.push_str(&history_table(input.history));

    out.push_str("\n<h2>Latest Change Diff</h2>\n");
    match input.baseline {
        Baseline::Initial => out.push_str(
            "<p class=\"placeholder\">No previous snapshot; initial capture.</p>\n",
        ),
        Baseline::Unchanged => out.push_str(
            "<p class=\"placeholder\">No change detected since the latest snapshot.</p>\n",
        ),
        Baseline::Previous(previous) => {
            out.push_str(&diff::render_diff_table(previous, &input.current.text))
        }
    }

    out.push_str("\n<h2>Current Extracted Content</h2>\n");
    out.push_str("<details open><summary>Show/Hide</summary>\n");
    out.push_str(&format!(
        "<pre>{}</pre>\n</details>\n",
        escape_html(&input.current.text)
    ));

    out.push_str("\n<h2>Current Filtered HTML</h2>\n");
    out.push_str("<details><summary>Show raw HTML</summary>\n");
    out.push_str(&format!(
        "<pre>{}</pre>\n</details>\n",
        escape_html(&input.current.raw_markup)
    ));

    out.push_str(&format!(
        "\n<footer><p>Generated by pagewatch {}.</p></footer>\n",
        env!("CARGO_PKG_VERSION")
    ));
    out.push_str("</body>\n</html>\n");
    out
}

fn history_table(history: &[ArchivedSnapshot]) -> String {
    let mut out = String::new();
    out.push_str("<table>\n  <thead><tr><th>Timestamp</th><th>Hash</th></tr></thead>\n  <tbody>\n");
    if history.is_empty() {
        out.push_str("  <tr><td colspan=\"2\">No snapshots archived yet.</td></tr>\n");
    }
    for snapshot in history {
        let at = snapshot.stamp.to_datetime().format("%Y-%m-%d %H:%M:%S UTC");
        out.push_str(&format!(
            "  <tr><td>{at}</td><td class=\"hash\">{}</td></tr>\n",
            snapshot.fingerprint()
        ));
    }
    out.push_str("  </tbody>\n</table>\n");
    out
}

/// Replace the report file, creating its directory when needed.
pub fn write_report(path: &Path, html: &str) -> Result<(), ReportError> {
    write_atomic(path, html.as_bytes()).map_err(|source| ReportError {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), bytes = html.len(), "report written");
    Ok(())
}
