//! Defensive JSON recovery from model output
//!
//! Providers instruct the remote to emit JSON only, but models wrap
//! their answers in prose, code fences, or markup anyway. Recovery is a
//! linear chain of strategies, each returning an optional parsed value;
//! the first success wins and nothing on this path panics.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::types::Enrichment;

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("static regex"));

static XML_ENVELOPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<json>\s*(\{.*?\})\s*</json>").expect("static regex"));

// Simple one-level objects first, then single-nested structures
static BRACE_SCAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(?:[^{}]|\{[^{}]*\})*\}").expect("static regex"));

/// Parse text as a JSON object, rejecting non-object values
fn parse_object(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

/// Strategy 1: the whole response is already JSON
fn direct(text: &str) -> Option<Value> {
    parse_object(text)
}

/// Strategy 2: a fenced ```json block
fn fenced(text: &str) -> Option<Value> {
    FENCED_JSON
        .captures(text)
        .and_then(|c| parse_object(c.get(1)?.as_str()))
}

/// Strategy 3: the span from the first `{` to the last `}`
fn brace_span(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if start >= end {
        return None;
    }
    parse_object(&text[start..=end])
}

/// Strategy 4: an XML-like `<json>...</json>` envelope
fn xml_envelope(text: &str) -> Option<Value> {
    XML_ENVELOPE
        .captures(text)
        .and_then(|c| parse_object(c.get(1)?.as_str()))
}

/// Strategy 5: scan for brace-balanced substrings
fn brace_scan(text: &str) -> Option<Value> {
    BRACE_SCAN
        .find_iter(text)
        .find_map(|m| parse_object(m.as_str()))
}

/// Recover a JSON object from model output
///
/// Strategies run in order; returns `None` only when every strategy
/// fails, at which point the caller substitutes a fallback enrichment.
pub fn extract_json(text: &str) -> Option<Value> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    direct(text)
        .or_else(|| fenced(text))
        .or_else(|| brace_span(text))
        .or_else(|| xml_envelope(text))
        .or_else(|| brace_scan(text))
}

/// Recover and deserialize an [`Enrichment`] from model output
pub fn parse_enrichment(text: &str) -> Option<Enrichment> {
    let value = extract_json(text)?;
    serde_json::from_value::<Enrichment>(value)
        .ok()
        .map(Enrichment::sanitize)
}
