//! Reconciliation engine
//!
//! Runs one reconciliation pass: pending payments are grouped by bank
//! account, each account's history is fetched once, every payment in the
//! group is matched against that history, and matched payments are settled.
//! Expired pending payments are purged at the end of every pass, whether or
//! not anything was pending.
//!
//! Fetch problems never abort a pass; the affected group simply finds no
//! match. A failed completion is logged and the pass moves on. Only failures
//! of the pending query or the purge abort the pass, and those are reported
//! in [`ReconciliationSummary::error`] instead of being returned.

use crate::config::ReconcilerConfig;
use crate::error::Result;
use crate::fetcher::{FetchOutcome, TransactionSource};
use crate::matcher::Matcher;
use crate::metrics;
use crate::store::{CompletionOutcome, CompletionRequest, PaymentStore};
use crate::types::{BankAccount, PaymentIntent, ReconciliationSummary, Transaction};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Payments waiting on the same bank account
#[derive(Debug)]
struct AccountGroup {
    account: BankAccount,
    payments: Vec<PaymentIntent>,
}

/// Orchestrates reconciliation passes over a store and a transaction source
#[derive(Debug)]
pub struct ReconciliationEngine<S, T> {
    store: S,
    source: T,
    matcher: Matcher,
    config: ReconcilerConfig,
}

impl<S: PaymentStore, T: TransactionSource> ReconciliationEngine<S, T> {
    /// Create an engine over a store and a transaction source
    pub fn new(store: S, source: T, config: ReconcilerConfig) -> Self {
        Self {
            matcher: Matcher::new(config.match_policy),
            store,
            source,
            config,
        }
    }

    /// Underlying payment store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Active configuration
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Run a pass at the current time
    pub async fn run_pass(&self) -> ReconciliationSummary {
        self.run_pass_at(Utc::now()).await
    }

    /// Run a pass treating `now` as the current time. Never fails: an
    /// aborted pass yields a zero-progress summary with `error` set.
    pub async fn run_pass_at(&self, now: DateTime<Utc>) -> ReconciliationSummary {
        let timer = metrics::PASS_DURATION.start_timer();

        let summary = match self.try_run_pass_at(now).await {
            Ok(summary) => {
                metrics::PASSES_TOTAL.with_label_values(&["ok"]).inc();
                summary
            }
            Err(e) => {
                error!("Reconciliation pass failed: {}", e);
                metrics::PASSES_TOTAL.with_label_values(&["error"]).inc();
                ReconciliationSummary::failed(e.to_string())
            }
        };

        timer.observe_duration();
        summary
    }

    /// Run a pass, returning store failures to the caller
    pub async fn try_run_pass_at(&self, now: DateTime<Utc>) -> Result<ReconciliationSummary> {
        let pending = self.store.pending_payments(now).await?;

        if pending.is_empty() {
            let deleted = self.purge_expired(now).await?;
            return Ok(ReconciliationSummary {
                deleted,
                ..ReconciliationSummary::default()
            });
        }

        info!("🔍 Found {} pending payment(s)", pending.len());

        let mut checked = 0;
        let mut updated = 0;

        let fetches = stream::iter(group_by_account(pending))
            .map(|group| async move {
                let outcome = match group.account.endpoint() {
                    Some(_) => self.source.fetch(&group.account).await,
                    None => FetchOutcome::NoEndpoint,
                };
                (group, outcome)
            })
            .buffered(self.config.max_concurrent_fetches.max(1));
        futures::pin_mut!(fetches);

        while let Some((group, outcome)) = fetches.next().await {
            metrics::FETCHES_TOTAL
                .with_label_values(&[outcome.kind()])
                .inc();

            if let FetchOutcome::NoEndpoint = outcome {
                warn!(
                    "Bank account {} has no API URL, skipping {} payment(s)",
                    group.account,
                    group.payments.len()
                );
                continue;
            }

            let transactions = outcome.transactions();
            info!(
                "📊 Checking {} payment(s) for {} against {} transaction(s)",
                group.payments.len(),
                group.account,
                transactions.len()
            );

            checked += group.payments.len();
            for payment in &group.payments {
                if self.settle(payment, transactions, now).await {
                    updated += 1;
                }
            }
        }

        let deleted = self.purge_expired(now).await?;

        metrics::PAYMENTS_CHECKED.inc_by(checked as u64);
        metrics::PAYMENTS_COMPLETED.inc_by(updated as u64);

        Ok(ReconciliationSummary {
            checked,
            updated,
            deleted,
            error: None,
        })
    }

    /// Match one payment and settle it. Returns true when it was completed
    /// by this call.
    async fn settle(
        &self,
        payment: &PaymentIntent,
        transactions: &[Transaction],
        now: DateTime<Utc>,
    ) -> bool {
        let Some(transaction) = self.matcher.find_match(payment, transactions) else {
            info!(
                "- Payment {} ({}, {}) has no matching transaction yet",
                payment.id,
                payment.transfer_reference,
                payment.expected_amount()
            );
            return false;
        };

        let request = CompletionRequest {
            payment_id: payment.id,
            seller_id: payment.seller_id,
            credit: payment.credit_amount(self.config.fallback_conversion_rate),
            completed_at: now,
        };

        match self.store.complete_payment(&request).await {
            Ok(CompletionOutcome::Completed { seller_credited: true }) => {
                info!(
                    "✓ Payment {} ({}, {}) matched transaction {}, credited {} to seller {}",
                    payment.id,
                    payment.transfer_reference,
                    payment.expected_amount(),
                    transaction.external_id,
                    request.credit,
                    payment.seller_id
                );
                true
            }
            Ok(CompletionOutcome::Completed { seller_credited: false }) => {
                warn!(
                    "Payment {} matched transaction {} but seller {} was not found; completed without wallet credit",
                    payment.id, transaction.external_id, payment.seller_id
                );
                true
            }
            Ok(CompletionOutcome::AlreadySettled) => {
                info!("⏭️  Payment {} already settled, skipping", payment.id);
                false
            }
            Err(e) => {
                error!("Failed to complete payment {}: {}", payment.id, e);
                false
            }
        }
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let deleted = self.store.purge_expired(now).await?;
        if deleted > 0 {
            info!("🗑️  Purged {} expired payment(s)", deleted);
            metrics::PAYMENTS_PURGED.inc_by(deleted);
        }
        Ok(deleted)
    }
}

/// Group payments by bank account, keeping first-seen order
fn group_by_account(payments: Vec<PaymentIntent>) -> Vec<AccountGroup> {
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    let mut groups: Vec<AccountGroup> = Vec::new();

    for payment in payments {
        match index.get(&payment.bank_account.id) {
            Some(&i) => groups[i].payments.push(payment),
            None => {
                index.insert(payment.bank_account.id, groups.len());
                groups.push(AccountGroup {
                    account: payment.bank_account.clone(),
                    payments: vec![payment],
                });
            }
        }
    }

    groups
}
