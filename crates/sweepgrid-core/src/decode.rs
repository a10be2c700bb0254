//! Decoder for sweep-generated output file names.
//!
//! This is the parsing dual of [`crate::combo`]'s encoding, the grammar the
//! external viewers rely on: split the stem on `--` into segments, each
//! segment on `-` into exactly `node-input-value`, strip an optional
//! trailing `_<digits>`/`_<digits>_` counter from the value token, then map
//! `_` back to `.` and try a numeric parse. A file whose name does not fit
//! the grammar is simply not sweep-generated.

use std::path::Path;

/// One decoded `(node, input, value)` dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedDim {
    pub node_id: u64,
    pub input: String,
    /// Present when the value token parses as a number after `_` → `.`
    /// substitution; used for sortable numeric axes.
    pub numeric: Option<f64>,
    /// Dotted text for numeric values, the raw token otherwise.
    pub label: String,
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_counter_suffix(s: &str) -> bool {
    // `_+<digits>_?`: leading underscores, then digits, then at most one
    // trailing underscore.
    let Some(rest) = s.strip_prefix('_') else {
        return false;
    };
    let rest = rest.trim_start_matches('_');
    let digits = rest.strip_suffix('_').unwrap_or(rest);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// Remove an optional trailing counter (`_00001` or `_00001_`), keeping the
/// shortest non-empty prefix. `"7_5_00001"` becomes `"7_5"`; a bare counter
/// like `"_00001"` is left alone.
///
/// Stripping applies to every segment's value token, not just the last one,
/// so a mid-name float whose fractional part is all digits loses it:
/// `7_5` in a non-final segment decodes as `7`, not `7.5`. The grammar
/// cannot tell such a fraction from a counter.
pub fn strip_counter(token: &str) -> &str {
    for (i, _) in token.char_indices().skip(1) {
        if is_counter_suffix(&token[i..]) {
            return &token[..i];
        }
    }
    token
}

fn decode_segment(seg: &str) -> Option<DecodedDim> {
    let parts: Vec<&str> = seg.split('-').collect();
    if parts.len() != 3 {
        return None;
    }
    let (node_str, input, value_token) = (parts[0], parts[1], parts[2]);
    if node_str.is_empty() || !node_str.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let node_id: u64 = node_str.parse().ok()?;
    if !is_word(input) {
        return None;
    }

    let value_token = strip_counter(value_token);
    let dotted = value_token.replace('_', ".");
    match dotted.parse::<f64>() {
        Ok(v) => Some(DecodedDim {
            node_id,
            input: input.to_string(),
            numeric: Some(v),
            label: dotted,
        }),
        Err(_) => {
            if !is_word(value_token) {
                return None;
            }
            Some(DecodedDim {
                node_id,
                input: input.to_string(),
                numeric: None,
                label: value_token.to_string(),
            })
        }
    }
}

/// Decode a sweep output file name into its dimensions, or `None` when the
/// name was not produced by the sweep encoder.
pub fn decode_file_name(name: &str) -> Option<Vec<DecodedDim>> {
    let stem = Path::new(name).file_stem()?.to_str()?;
    let mut dims = Vec::new();
    for seg in stem.split("--") {
        dims.push(decode_segment(seg)?);
    }
    Some(dims)
}

// ============================================================================
// Tests
// ============================================================================
