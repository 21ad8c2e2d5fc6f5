//! Enveloped format: a status envelope wrapping the transaction list.
//!
//! ```json
//! {
//!   "code": "00",
//!   "des": "success",
//!   "transactions": [
//!     {
//!       "tranDate": "02/04/2024",
//!       "TransactionDate": "02/04/2024",
//!       "Reference": "5243 - 51972",
//!       "CD": "-",
//!       "Amount": "10,000",
//!       "Description": "MBVCB.5655475306.order118064",
//!       "PCTime": "160258",
//!       "DorCCode": "D",
//!       "PostingTime": "160258",
//!       "Remark": "...",
//!       "SeqNo": "51972"
//!     }
//!   ],
//!   "nextIndex": "1"
//! }
//! ```

use super::{first_present, join_narrative, lenient_text, parse_amount, Rejection};
use crate::types::{Direction, Transaction};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// Status code signalling a usable transaction list
pub const SUCCESS_CODE: &str = "00";

/// Decoded status envelope
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    /// Status code, `"00"` on success
    #[serde(default, deserialize_with = "lenient_text")]
    pub code: Option<String>,
    /// Status message
    #[serde(default, deserialize_with = "lenient_text")]
    pub des: Option<String>,
    /// Raw transaction records
    #[serde(default, deserialize_with = "lenient_list")]
    pub transactions: Vec<Value>,
    /// Paging cursor
    #[serde(default, rename = "nextIndex", deserialize_with = "lenient_text")]
    pub next_index: Option<String>,
}

impl Envelope {
    /// Decode an envelope; payloads that are not objects decode as empty
    pub fn from_value(payload: &Value) -> Self {
        if !payload.is_object() {
            return Envelope::default();
        }
        Envelope::deserialize(payload).unwrap_or_default()
    }

    /// Normalize the records, unless the status code is missing or reports a failure
    pub fn into_transactions(self) -> Result<Vec<Transaction>, Rejection> {
        if self.code.as_deref() != Some(SUCCESS_CODE) {
            return Err(Rejection {
                code: self.code.unwrap_or_default(),
                message: self.des,
            });
        }
        Ok(self.transactions.iter().map(normalize).collect())
    }
}

#[derive(Debug, Deserialize)]
struct EnvelopedRecord {
    #[serde(default, rename = "tranDate", deserialize_with = "lenient_text")]
    tran_date: Option<String>,
    #[serde(default, rename = "TransactionDate", deserialize_with = "lenient_text")]
    transaction_date: Option<String>,
    #[serde(default, rename = "Reference", deserialize_with = "lenient_text")]
    reference: Option<String>,
    #[serde(default, rename = "SeqNo", deserialize_with = "lenient_text")]
    seq_no: Option<String>,
    #[serde(default, rename = "CD", deserialize_with = "lenient_text")]
    cd: Option<String>,
    #[serde(default, rename = "DorCCode", deserialize_with = "lenient_text")]
    dorc_code: Option<String>,
    #[serde(default, rename = "Amount", deserialize_with = "lenient_text")]
    amount: Option<String>,
    #[serde(default, rename = "Description", deserialize_with = "lenient_text")]
    description: Option<String>,
    #[serde(default, rename = "Remark", deserialize_with = "lenient_text")]
    remark: Option<String>,
    #[serde(default, rename = "PCTime", deserialize_with = "lenient_text")]
    pc_time: Option<String>,
    #[serde(default, rename = "PostingTime", deserialize_with = "lenient_text")]
    posting_time: Option<String>,
}

/// Normalize one enveloped record
pub fn normalize(record: &Value) -> Transaction {
    let record = match EnvelopedRecord::deserialize(record) {
        Ok(record) => record,
        Err(e) => {
            warn!("Skipping malformed enveloped record: {}", e);
            return Transaction::default();
        }
    };

    let incoming = record.cd.as_deref().map(str::trim) == Some("+")
        || record.dorc_code.as_deref().map(str::trim) == Some("C");

    Transaction {
        external_id: first_present(&[&record.reference, &record.seq_no])
            .unwrap_or("")
            .to_string(),
        amount: record.amount.as_deref().map(parse_amount).unwrap_or(0),
        description: join_narrative(&[&record.description, &record.remark]),
        date: first_present(&[&record.tran_date, &record.transaction_date])
            .unwrap_or("")
            .to_string(),
        time: first_present(&[&record.pc_time, &record.posting_time])
            .unwrap_or("")
            .to_string(),
        direction: if incoming { Direction::In } else { Direction::Out },
    }
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(records)) => Ok(records),
        _ => Ok(Vec::new()),
    }
}
