//! Core types for payment reconciliation

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Direction of a bank ledger movement relative to the monitored account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Funds credited to the monitored account
    #[serde(rename = "IN")]
    In,
    /// Funds debited from the monitored account
    #[serde(rename = "OUT")]
    Out,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::In => write!(f, "IN"),
            Direction::Out => write!(f, "OUT"),
        }
    }
}

/// Canonical, upstream-agnostic bank transaction
///
/// Produced per fetch and never persisted. `date` and `time` keep the
/// upstream's own representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Upstream reference for the movement, empty when none was given
    pub external_id: String,
    /// Magnitude of the movement in local-currency units
    pub amount: u64,
    /// Narrative fields joined by a single space
    pub description: String,
    /// Upstream date string
    pub date: String,
    /// Upstream time string
    pub time: String,
    /// Movement direction
    pub direction: Direction,
}

impl Default for Transaction {
    fn default() -> Self {
        Self {
            external_id: String::new(),
            amount: 0,
            description: String::new(),
            date: String::new(),
            time: String::new(),
            direction: Direction::Out,
        }
    }
}

impl Transaction {
    /// Whether the movement credited the monitored account
    pub fn is_incoming(&self) -> bool {
        self.direction == Direction::In
    }
}

/// Monitored bank account a payment is expected to arrive on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    /// Account identifier
    pub id: Uuid,
    /// Bank display name
    pub bank_name: String,
    /// Account number at the bank
    pub account_number: String,
    /// Transaction-history endpoint
    pub api_url: Option<String>,
}

impl BankAccount {
    /// Configured endpoint, if any non-blank one is set
    pub fn endpoint(&self) -> Option<&str> {
        self.api_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

impl fmt::Display for BankAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.bank_name, self.account_number)
    }
}

/// Payment lifecycle status
///
/// Expired payments are deleted rather than moved to a stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Awaiting an incoming transfer
    Pending,
    /// Transfer confirmed and wallet credited
    Completed,
}

impl PaymentStatus {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
        }
    }
}

/// Expected incoming transfer awaiting confirmation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Payment identifier
    pub id: Uuid,
    /// Account holder whose wallet is credited on completion
    pub seller_id: Uuid,
    /// Account the transfer should arrive on
    pub bank_account: BankAccount,
    /// Primary amount
    pub amount: u64,
    /// Amount in the bank's local currency, preferred over `amount`
    pub amount_local: Option<u64>,
    /// Amount to credit in wallet currency
    pub amount_wallet: Option<Decimal>,
    /// Token the payer puts in the transfer narrative
    pub transfer_reference: String,
    /// Lifecycle status
    pub status: PaymentStatus,
    /// Deadline after which a pending payment is purged
    pub expires_at: DateTime<Utc>,
    /// When the payment was completed
    pub completed_at: Option<DateTime<Utc>>,
}

impl PaymentIntent {
    /// Amount an incoming transaction must carry
    pub fn expected_amount(&self) -> u64 {
        match self.amount_local {
            Some(local) if local > 0 => local,
            _ => self.amount,
        }
    }

    /// Amount to add to the seller's wallet, converting the expected amount
    /// at `fallback_rate` when no wallet amount was recorded
    pub fn credit_amount(&self, fallback_rate: Decimal) -> Decimal {
        match self.amount_wallet {
            Some(wallet) if wallet > Decimal::ZERO => wallet,
            _ if fallback_rate > Decimal::ZERO => {
                Decimal::from(self.expected_amount()) / fallback_rate
            }
            _ => Decimal::ZERO,
        }
    }

    /// Whether the deadline has passed at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Account holder owning a wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountHolder {
    /// Account holder identifier
    pub id: Uuid,
    /// Wallet balance in wallet currency
    pub wallet_balance: Decimal,
}

/// Result of one reconciliation pass, reported to the scheduler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    /// Payments checked against fetched transactions
    pub checked: usize,
    /// Payments moved to completed
    pub updated: usize,
    /// Expired payments purged
    pub deleted: u64,
    /// Set when the pass aborted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReconciliationSummary {
    /// Zero-progress summary carrying an error message
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn intent(amount: u64, amount_local: Option<u64>, amount_wallet: Option<Decimal>) -> PaymentIntent {
        PaymentIntent {
            id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            bank_account: BankAccount {
                id: Uuid::new_v4(),
                bank_name: "MB".to_string(),
                account_number: "0919847223".to_string(),
                api_url: None,
            },
            amount,
            amount_local,
            amount_wallet,
            transfer_reference: "ABC123".to_string(),
            status: PaymentStatus::Pending,
            expires_at: Utc::now() + Duration::minutes(15),
            completed_at: None,
        }
    }

    #[test]
    fn test_expected_amount_prefers_local() {
        assert_eq!(intent(10, Some(250_000), None).expected_amount(), 250_000);
        assert_eq!(intent(10, None, None).expected_amount(), 10);
        assert_eq!(intent(10, Some(0), None).expected_amount(), 10);
    }

    #[test]
    fn test_credit_amount_fallback_rate() {
        assert_eq!(intent(250_000, None, Some(dec!(10.5))).credit_amount(dec!(25000)), dec!(10.5));
        assert_eq!(intent(250_000, None, None).credit_amount(dec!(25000)), dec!(10));
        assert_eq!(intent(1, Some(500_000), None).credit_amount(dec!(20000)), dec!(25));
    }

    #[test]
    fn test_endpoint_blank_is_none() {
        let mut account = intent(1, None, None).bank_account;
        assert_eq!(account.endpoint(), None);

        account.api_url = Some("   ".to_string());
        assert_eq!(account.endpoint(), None);

        account.api_url = Some(" https://bank.example/history ".to_string());
        assert_eq!(account.endpoint(), Some("https://bank.example/history"));
    }

    #[test]
    fn test_summary_serialization_omits_missing_error() {
        let ok = serde_json::to_value(ReconciliationSummary {
            checked: 2,
            updated: 1,
            deleted: 3,
            error: None,
        })
        .unwrap();
        assert_eq!(ok, serde_json::json!({"checked": 2, "updated": 1, "deleted": 3}));

        let failed = serde_json::to_value(ReconciliationSummary::failed("boom")).unwrap();
        assert_eq!(failed["error"], "boom");
        assert_eq!(failed["checked"], 0);
    }
}
