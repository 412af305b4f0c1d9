//! Normalization of raw flag values into query-model inputs.

use anyhow::{bail, Result};

/// Splits `FIELD=VALUE` pairs into where entries.
///
/// Values may be wrapped in one matching pair of single or double quotes.
/// Pairs are returned in flag order; duplicate keys are resolved later by
/// [`shared::query::QueryOptions::insert_where`], so the query string and
/// the flag form share one set of semantics.
///
/// # Errors
///
/// Fails when an entry has no `=` or an empty field name.
pub fn parse_where_filters(raw: &[String]) -> Result<Vec<(String, String)>> {
    let mut entries = Vec::with_capacity(raw.len());
    for item in raw {
        let Some((key, value)) = item.split_once('=') else {
            bail!("invalid --where filter '{item}': expected FIELD=VALUE");
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("invalid --where filter '{item}': field name is empty");
        }
        let value = strip_quotes(value.trim());
        entries.push((key.to_string(), value.to_string()));
    }
    Ok(entries)
}

/// Removes one matching pair of surrounding quotes, if present.
fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'\'' || first == b'"') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Splits comma-separated name lists, trims whitespace, and deduplicates
/// preserving the first occurrence.
#[must_use]
pub fn normalize_names(raw: &[String]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for item in raw {
        for piece in item.split(',') {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            if !names.iter().any(|existing| existing == piece) {
                names.push(piece.to_string());
            }
        }
    }
    names
}

// ============================================================================
// Tests
// ============================================================================
