//! Side-by-side line diff with a fixed context window.
use crate::util::escape_html;
use similar::{capture_diff_slices, group_diff_ops, Algorithm, DiffTag};

/// Unchanged lines kept around each changed region.
pub const CONTEXT_LINES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Equal,
    Insert,
    Delete,
    Replace,
}

impl RowKind {
    fn css_class(self) -> &'static str {
        match self {
            RowKind::Equal => "diff-equal",
            RowKind::Insert => "diff-insert",
            RowKind::Delete => "diff-delete",
            RowKind::Replace => "diff-replace",
        }
    }
}

/// One aligned table row; line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRow<'a> {
    pub kind: RowKind,
    pub previous: Option<(usize, &'a str)>,
    pub current: Option<(usize, &'a str)>,
}

/// Changed regions with surrounding context, one inner vec per hunk.
///
/// Identical inputs produce no hunks.
pub fn diff_hunks<'a>(previous: &'a str, current: &'a str) -> Vec<Vec<DiffRow<'a>>> {
    let old: Vec<&str> = previous.lines().collect();
    let new: Vec<&str> = current.lines().collect();
    let ops = capture_diff_slices(Algorithm::Myers, &old, &new);

    let mut hunks = Vec::new();
    for group in group_diff_ops(ops, CONTEXT_LINES) {
        let mut rows = Vec::new();
        for op in group {
            let (tag, old_range, new_range) = op.as_tag_tuple();
            let left = |idx: usize| (idx + 1, old[idx]);
            let right = |idx: usize| (idx + 1, new[idx]);
            match tag {
                DiffTag::Equal => {
                    for (o, n) in old_range.zip(new_range) {
                        rows.push(DiffRow {
                            kind: RowKind::Equal,
                            previous: Some(left(o)),
                            current: Some(right(n)),
                        });
                    }
                }
                DiffTag::Delete => {
                    for o in old_range {
                        rows.push(DiffRow {
                            kind: RowKind::Delete,
                            previous: Some(left(o)),
                            current: None,
                        });
                    }
                }
                DiffTag::Insert => {
                    for n in new_range {
                        rows.push(DiffRow {
                            kind: RowKind::Insert,
                            previous: None,
                            current: Some(right(n)),
                        });
                    }
                }
                DiffTag::Replace => {
                    let span = old_range.len().max(new_range.len());
                    for offset in 0..span {
                        let o = old_range.start + offset;
                        let n = new_range.start + offset;
                        rows.push(DiffRow {
                            kind: RowKind::Replace,
                            previous: (o < old_range.end).then(|| left(o)),
                            current: (n < new_range.end).then(|| right(n)),
                        });
                    }
                }
            }
        }
        hunks.push(rows);
    }
    hunks
}

/// Render the diff between two normalized texts as an HTML table.
pub fn render_diff_table(previous: &str, current: &str) -> String {
    let hunks = diff_hunks(previous, current);
    if hunks.is_empty() {
        return "<p class=\"placeholder\">No differences between the compared snapshots.</p>\n"
            .to_string();
    }

    let mut out = String::new();
    out.push_str("<table class=\"diff\">\n");
    out.push_str(
        "  <thead><tr><th class=\"num\"></th><th>Previous</th><th class=\"num\"></th><th>Current</th></tr></thead>\n",
    );
    out.push_str("  <tbody>\n");
    for (idx, hunk) in hunks.iter().enumerate() {
        if idx > 0 {
            out.push_str("  <tr class=\"diff-gap\"><td colspan=\"4\">&hellip;</td></tr>\n");
        }
        for row in hunk {
            out.push_str(&format!("  <tr class=\"{}\">", row.kind.css_class()));
            push_side(&mut out, row.previous);
            push_side(&mut out, row.current);
            out.push_str("</tr>\n");
        }
    }
    out.push_str("  </tbody>\n</table>\n");
    out
}

fn push_side(out: &mut String, side: Option<(usize, &str)>) {
    match side {
        Some((number, line)) => out.push_str(&format!(
            "<td class=\"num\">{number}</td><td>{}</td>",
            escape_html(line)
        )),
        None => out.push_str("<td class=\"num\"></td><td></td>"),
    }
}
