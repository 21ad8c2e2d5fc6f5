//! Direct-array format: each element is one ledger movement with separate
//! credit and debit legs.
//!
//! ```json
//! {
//!   "refNo": "FT26041592608140",
//!   "tranId": "FT26041592608140",
//!   "postingDate": "10/02/2026 23:59:59",
//!   "transactionDate": "10/02/2026 00:06:00",
//!   "accountNo": "0919847223",
//!   "creditAmount": "286000",
//!   "debitAmount": "0",
//!   "currency": "VND",
//!   "description": "Nguyen Van A dlm196183- Ma GD ACSP/ sk539788",
//!   "addDescription": "dlm196183- Ma GD ACSP/ sk539788 ",
//!   "availableBalance": "6774603",
//!   "beneficiaryAccount": "",
//!   "transactionType": "BI2B"
//! }
//! ```

use super::{first_present, join_narrative, lenient_text, parse_amount};
use crate::types::{Direction, Transaction};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DirectRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    ref_no: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    tran_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    posting_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    transaction_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    credit_amount: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    debit_amount: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    add_description: Option<String>,
}

/// Normalize one direct-array record
pub fn normalize(record: &Value) -> Transaction {
    let record = match DirectRecord::deserialize(record) {
        Ok(record) => record,
        Err(e) => {
            warn!("Skipping malformed direct-array record: {}", e);
            return Transaction::default();
        }
    };

    let credit = record.credit_amount.as_deref().map(parse_amount).unwrap_or(0);
    let debit = record.debit_amount.as_deref().map(parse_amount).unwrap_or(0);

    // "10/02/2026 00:06:00" -> ("10/02/2026", "00:06:00")
    let timestamp = first_present(&[&record.transaction_date, &record.posting_date]).unwrap_or("");
    let mut parts = timestamp.split_whitespace();
    let date = parts.next().unwrap_or("").to_string();
    let time = parts.next().unwrap_or("").to_string();

    Transaction {
        external_id: first_present(&[&record.ref_no, &record.tran_id])
            .unwrap_or("")
            .to_string(),
        amount: credit.max(debit),
        description: join_narrative(&[&record.description, &record.add_description]),
        date,
        time,
        direction: if credit > 0 { Direction::In } else { Direction::Out },
    }
}
