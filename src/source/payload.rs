//! Extraction of the pseudo-JSON arrays embedded in script and endpoint
//! bodies, plus tolerant positional accessors for their elements.

use crate::runtime::error::CrawlError;
use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static NESTED_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[[^{}]+?\]\]").expect("nested array pattern is valid"));

static TRIPLE_CLOSED_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[[^{}]+?\]\]\]").expect("triple array pattern is valid"));

/// A street response that carries an empty result list, e.g.
/// `callback({success:true,result:[]})`, or a bare `[]` body.
static EMPTY_RESULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*\[\s*\]\s*$|["']?result["']?\s*:\s*\[\s*\]"#)
        .expect("empty result pattern is valid")
});

/// One positional `[id, name, parent_id]` entry of a street response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreetEntry {
    pub id: u64,
    pub name: String,
    pub parent_id: u64,
}

/// Bodies delimit strings with single quotes; JSON wants double quotes.
pub fn normalize_quotes(raw: &str) -> String {
    raw.replace('\'', "\"")
}

/// Returns the first `[[...]]` array in `body`, if any.
pub fn first_array(body: &str) -> Option<&str> {
    NESTED_ARRAY.find(body).map(|found| found.as_str())
}

/// All `[[...]]` matches followed by all `[[...]]]` matches, in that order.
/// The script asset is classified by position in this combined list.
pub fn all_arrays(body: &str) -> Vec<&str> {
    NESTED_ARRAY
        .find_iter(body)
        .chain(TRIPLE_CLOSED_ARRAY.find_iter(body))
        .map(|found| found.as_str())
        .collect()
}

/// Normalizes and decodes one extracted array into its JSON elements.
pub fn decode_array(raw: &str) -> Result<Vec<Value>> {
    let normalized = normalize_quotes(raw);
    let value: Value = serde_json::from_str(&normalized)
        .map_err(|err| CrawlError::decode(format!("invalid array literal: {err}")))?;
    match value {
        Value::Array(items) => Ok(items),
        other => Err(CrawlError::decode(format!("expected an array, found {other}")).into()),
    }
}

/// Decodes a street endpoint body into its positional entries.
///
/// An explicitly empty result list decodes to no entries.
pub fn decode_streets(body: &str) -> Result<Vec<StreetEntry>> {
    let Some(raw) = first_array(body) else {
        if EMPTY_RESULT.is_match(body) {
            return Ok(Vec::new());
        }
        return Err(CrawlError::decode("no bracket-delimited array in response body").into());
    };
    let items = decode_array(raw)?;
    Ok(items
        .iter()
        .map(|item| StreetEntry {
            id: int_at(item, &[0]),
            name: text_at(item, &[1]),
            parent_id: int_at(item, &[2]),
        })
        .collect())
}

/// Integer at a nested position; numbers and numeric strings are accepted,
/// anything else reads as `0`.
pub fn int_at(value: &Value, path: &[usize]) -> u64 {
    match lookup(value, path) {
        Some(Value::Number(number)) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(text)) => text.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Text at a nested position; numbers are rendered, anything else is empty.
pub fn text_at(value: &Value, path: &[usize]) -> String {
    match lookup(value, path) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}

fn lookup<'v>(value: &'v Value, path: &[usize]) -> Option<&'v Value> {
    path.iter()
        .try_fold(value, |current, index| current.as_array()?.get(*index))
}
