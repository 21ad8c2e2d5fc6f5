//! Upstream transaction-history formats
//!
//! Bank endpoints return one of two known JSON shapes. [`UpstreamFormat::detect`]
//! classifies a decoded payload by structure alone; [`RawPayload`] then carries
//! the records for the matching normalizer, which maps each record to a
//! canonical [`Transaction`].
//!
//! Normalizers never fail: a malformed record yields a zeroed transaction so
//! one bad row cannot drop the rest of the batch.

pub mod direct;
pub mod enveloped;

use crate::types::Transaction;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;

pub use enveloped::Envelope;

/// Field names that only the direct-array upstream exposes
pub const DIRECT_ARRAY_KEYS: [&str; 4] = ["refNo", "tranId", "creditAmount", "debitAmount"];

/// Known upstream wire shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamFormat {
    /// Bare JSON array of records with split credit/debit legs
    DirectArray,
    /// `{code, des, transactions: [...], nextIndex}` envelope
    Enveloped,
}

impl UpstreamFormat {
    /// Classify a decoded payload. Anything that is not a non-empty array whose
    /// first element carries a direct-array key is treated as enveloped.
    pub fn detect(payload: &Value) -> Self {
        let first = payload.as_array().and_then(|records| records.first());
        match first.and_then(Value::as_object) {
            Some(record) if DIRECT_ARRAY_KEYS.iter().any(|key| record.contains_key(*key)) => {
                UpstreamFormat::DirectArray
            }
            _ => UpstreamFormat::Enveloped,
        }
    }
}

impl fmt::Display for UpstreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamFormat::DirectArray => write!(f, "direct-array"),
            UpstreamFormat::Enveloped => write!(f, "enveloped"),
        }
    }
}

/// Payload tagged with its detected format
#[derive(Debug)]
pub enum RawPayload<'a> {
    /// Direct-array records
    DirectArray(&'a [Value]),
    /// Decoded envelope
    Enveloped(Envelope),
}

/// Envelope whose status code is missing or not the success sentinel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Upstream status code, empty when the envelope carried none
    pub code: String,
    /// Upstream status message
    pub message: Option<String>,
}

impl<'a> RawPayload<'a> {
    /// Detect the format of `payload` and decode it accordingly
    pub fn decode(payload: &'a Value) -> Self {
        match (UpstreamFormat::detect(payload), payload.as_array()) {
            (UpstreamFormat::DirectArray, Some(records)) => RawPayload::DirectArray(records),
            _ => RawPayload::Enveloped(Envelope::from_value(payload)),
        }
    }

    /// Detected format
    pub fn format(&self) -> UpstreamFormat {
        match self {
            RawPayload::DirectArray(_) => UpstreamFormat::DirectArray,
            RawPayload::Enveloped(_) => UpstreamFormat::Enveloped,
        }
    }

    /// Normalize every record, or report the envelope's rejection
    pub fn into_transactions(self) -> Result<Vec<Transaction>, Rejection> {
        match self {
            RawPayload::DirectArray(records) => Ok(records.iter().map(direct::normalize).collect()),
            RawPayload::Enveloped(envelope) => envelope.into_transactions(),
        }
    }
}

/// Parse an upstream amount string into a non-negative integer.
///
/// Thousands separators are dropped, a leading sign is ignored and any
/// fractional part is truncated. Anything unparseable yields `0`.
pub fn parse_amount(raw: &str) -> u64 {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    let unsigned = cleaned
        .strip_prefix(|c: char| c == '+' || c == '-')
        .unwrap_or(&cleaned);
    let end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    unsigned[..end].parse().unwrap_or(0)
}

/// First value that is present and non-empty
pub(crate) fn first_present<'a>(candidates: &[&'a Option<String>]) -> Option<&'a str> {
    candidates
        .iter()
        .copied()
        .filter_map(Option::as_deref)
        .find(|value| !value.is_empty())
}

/// Join narrative fragments with single spaces, dropping empty ones
pub(crate) fn join_narrative(fragments: &[&Option<String>]) -> String {
    fragments
        .iter()
        .filter_map(|fragment| fragment.as_deref())
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Accept strings, numbers and booleans as text; anything else is absent
pub(crate) fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }))
}
