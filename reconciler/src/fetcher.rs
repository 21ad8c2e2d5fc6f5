//! Bank API client for fetching transaction history

use crate::config::ReconcilerConfig;
use crate::formats::{RawPayload, Rejection, UpstreamFormat};
use crate::types::{BankAccount, Transaction};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

/// Longest slice of an error body kept for diagnostics
const MAX_DIAGNOSTIC_BODY: usize = 512;

/// Why a fetch produced no usable data
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection or protocol failure
    #[error("Request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// No response within the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Non-2xx response
    #[error("Bank API returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Leading part of the response body
        body: String,
    },

    /// Body was not JSON
    #[error("Malformed response body: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Result of fetching one bank account's history
///
/// Only [`FetchOutcome::Fetched`] carries transactions; every other variant
/// means the account contributes nothing to the current pass.
#[derive(Debug)]
pub enum FetchOutcome {
    /// History retrieved and normalized
    Fetched {
        /// Detected upstream format
        format: UpstreamFormat,
        /// Canonical transactions in upstream order
        transactions: Vec<Transaction>,
    },
    /// Account has no endpoint configured
    NoEndpoint,
    /// Envelope reported a non-success status code, or none at all
    Rejected(Rejection),
    /// Transport, status or decoding failure
    Failed(FetchError),
}

impl FetchOutcome {
    /// Fetched transactions, empty unless the fetch succeeded
    pub fn transactions(&self) -> &[Transaction] {
        match self {
            FetchOutcome::Fetched { transactions, .. } => transactions,
            _ => &[],
        }
    }

    /// Consume into the fetched transactions
    pub fn into_transactions(self) -> Vec<Transaction> {
        match self {
            FetchOutcome::Fetched { transactions, .. } => transactions,
            _ => Vec::new(),
        }
    }

    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            FetchOutcome::Fetched { .. } => "fetched",
            FetchOutcome::NoEndpoint => "no_endpoint",
            FetchOutcome::Rejected(_) => "rejected",
            FetchOutcome::Failed(_) => "failed",
        }
    }
}

/// Source of canonical transactions for a bank account
///
/// Implementations never fail: every problem is folded into the outcome.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Fetch and normalize the account's recent transactions
    async fn fetch(&self, account: &BankAccount) -> FetchOutcome;
}

#[async_trait]
impl<T: TransactionSource + ?Sized> TransactionSource for Arc<T> {
    async fn fetch(&self, account: &BankAccount) -> FetchOutcome {
        (**self).fetch(account).await
    }
}

/// HTTP client reading each account's configured history endpoint
#[derive(Debug, Clone)]
pub struct BankClient {
    http_client: Client,
    timeout: Duration,
}

impl BankClient {
    /// Create a client using the configured fetch timeout
    pub fn new(config: &ReconcilerConfig) -> crate::Result<Self> {
        let timeout = config.fetch_timeout();
        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            timeout,
        })
    }

    async fn get_payload(&self, url: &str) -> Result<Value, FetchError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate(&body, MAX_DIAGNOSTIC_BODY),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    fn classify(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Transport(e)
        }
    }
}

#[async_trait]
impl TransactionSource for BankClient {
    async fn fetch(&self, account: &BankAccount) -> FetchOutcome {
        let Some(url) = account.endpoint() else {
            warn!("Bank account {} has no API URL configured, skipping", account);
            return FetchOutcome::NoEndpoint;
        };

        info!("🔌 Fetching transactions for bank account {}", account);

        let payload = match self.get_payload(url).await {
            Ok(payload) => payload,
            Err(e) => {
                match &e {
                    FetchError::Status { status, body } => error!(
                        "Failed to fetch transactions for {}: status={}, body={}",
                        account, status, body
                    ),
                    other => error!("Failed to fetch transactions for {}: {}", account, other),
                }
                return FetchOutcome::Failed(e);
            }
        };

        let raw = RawPayload::decode(&payload);
        let format = raw.format();

        match raw.into_transactions() {
            Ok(transactions) => {
                info!(
                    "✅ Fetched {} transactions ({} format) for {}",
                    transactions.len(),
                    format,
                    account
                );
                FetchOutcome::Fetched {
                    format,
                    transactions,
                }
            }
            Err(rejection) if rejection.code.is_empty() => {
                warn!(
                    "Bank API for {} returned no status code: {}",
                    account,
                    rejection.message.as_deref().unwrap_or("no message")
                );
                FetchOutcome::Rejected(rejection)
            }
            Err(rejection) => {
                warn!(
                    "Bank API for {} returned error code {}: {}",
                    account,
                    rejection.code,
                    rejection.message.as_deref().unwrap_or("no message")
                );
                FetchOutcome::Rejected(rejection)
            }
        }
    }
}

fn truncate(body: &str, max: usize) -> String {
    match body.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_string(),
    }
}
