//! Canonical plain-text extraction from page markup.
//!
//! Page markup churns between requests (inline script state, generated ids,
//! whitespace) while the human-visible wording stays put. The normalized text
//! keeps only the visible wording so fingerprints track what a reader sees.
use crate::fingerprint::Fingerprint;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Subtrees that never carry visible content or only carry site chrome.
const STRIPPED_ELEMENTS: &str =
    "script, style, noscript, head, meta, link, nav, header, footer, aside";

/// Elements whose text is collected, in document order.
const TEXT_ELEMENTS: &str = "p, li, h1, h2, h3, h4, h5, h6, span, a, div";

/// Normalized view of one fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDocument {
    /// Visible text lines, de-duplicated in first-occurrence order, joined by `\n`.
    pub text: String,
    /// Filtered markup kept for display only; never compared.
    pub raw_markup: String,
}

impl NormalizedDocument {
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.text)
    }
}

/// Normalize raw page markup into comparison-stable text plus filtered markup.
pub fn normalize(raw_markup: &str) -> NormalizedDocument {
    let mut document = Html::parse_document(raw_markup);
    strip_invisible(&mut document);

    let text_elements = selector(TEXT_ELEMENTS);
    let mut seen = HashSet::new();
    let mut lines = Vec::new();
    // Detached subtrees stay in the node arena; only walk what is still attached.
    for element in document.root_element().select(&text_elements) {
        let Some(chunk) = visible_chunk(element) else {
            continue;
        };
        if seen.insert(chunk.clone()) {
            lines.push(chunk);
        }
    }

    NormalizedDocument {
        text: lines.join("\n"),
        raw_markup: document.html(),
    }
}

/// Detach every non-visible subtree before any text is collected, so text
/// under a hidden ancestor can never surface.
fn strip_invisible(document: &mut Html) {
    let stripped = selector(STRIPPED_ELEMENTS);
    let styled = selector("[style]");
    let aria_hidden = selector(r#"[aria-hidden="true"]"#);

    let mut doomed = Vec::new();
    doomed.extend(document.select(&stripped).map(|element| element.id()));
    doomed.extend(
        document
            .select(&styled)
            .filter(|element| {
                element
                    .value()
                    .attr("style")
                    .is_some_and(|style| display_none().is_match(style))
            })
            .map(|element| element.id()),
    );
    doomed.extend(document.select(&aria_hidden).map(|element| element.id()));

    for id in doomed {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Text contributed by one element: its sole direct string when that is
/// non-blank, otherwise all descendant strings joined by single spaces.
fn visible_chunk(element: ElementRef<'_>) -> Option<String> {
    if let Some(direct) = sole_string(element) {
        let direct = direct.trim();
        if !direct.is_empty() {
            return Some(direct.to_string());
        }
    }
    let full = element
        .text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if full.is_empty() {
        None
    } else {
        Some(full)
    }
}

/// The element's only string, following single-child element chains.
///
/// Elements with more than one child (mixed text and markup) have none.
fn sole_string<'a>(element: ElementRef<'a>) -> Option<&'a str> {
    let mut children = element.children();
    let only = children.next()?;
    if children.next().is_some() {
        return None;
    }
    match only.value() {
        Node::Text(text) => Some(&**text),
        Node::Element(_) => ElementRef::wrap(only).and_then(sole_string),
        _ => None,
    }
}

fn display_none() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)display\s*:\s*none").expect("static regex"))
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
