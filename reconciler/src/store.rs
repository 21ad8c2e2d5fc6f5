//! Storage seam for payments and account holders
//!
//! The reconciler does not own its records. [`PaymentStore`] is the boundary
//! to whatever database holds them; [`InMemoryStore`] is the reference
//! implementation used by tests and embedding callers.
//!
//! # Completion unit
//!
//! Crediting a wallet and completing a payment are one operation,
//! [`PaymentStore::complete_payment`]. Implementations must apply both or
//! neither, and must only credit while the payment is still pending, so a
//! replayed completion can never credit twice.

use crate::error::{Error, Result};
use crate::types::{AccountHolder, PaymentIntent, PaymentStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Request to settle one matched payment
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Payment to complete
    pub payment_id: Uuid,
    /// Account holder whose wallet is credited
    pub seller_id: Uuid,
    /// Amount added to the wallet
    pub credit: Decimal,
    /// Completion timestamp
    pub completed_at: DateTime<Utc>,
}

/// What [`PaymentStore::complete_payment`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Payment moved to completed in this call
    Completed {
        /// False when the account holder does not exist and no credit was applied
        seller_credited: bool,
    },
    /// Payment was no longer pending; nothing changed
    AlreadySettled,
}

/// Persistence operations the reconciliation pass depends on
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Pending payments whose deadline is after `now`, with bank accounts resolved
    async fn pending_payments(&self, now: DateTime<Utc>) -> Result<Vec<PaymentIntent>>;

    /// Delete pending payments whose deadline is at or before `now`
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Credit the seller and complete the payment as a single unit
    async fn complete_payment(&self, request: &CompletionRequest) -> Result<CompletionOutcome>;
}

#[async_trait]
impl<T: PaymentStore + ?Sized> PaymentStore for Arc<T> {
    async fn pending_payments(&self, now: DateTime<Utc>) -> Result<Vec<PaymentIntent>> {
        (**self).pending_payments(now).await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        (**self).purge_expired(now).await
    }

    async fn complete_payment(&self, request: &CompletionRequest) -> Result<CompletionOutcome> {
        (**self).complete_payment(request).await
    }
}

#[derive(Debug, Default)]
struct StoreState {
    payments: Vec<PaymentIntent>,
    holders: HashMap<Uuid, AccountHolder>,
}

/// Mutex-guarded store; every operation runs under one lock
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a payment
    pub fn insert_payment(&self, payment: PaymentIntent) {
        let mut state = self.state.lock();
        match state.payments.iter_mut().find(|p| p.id == payment.id) {
            Some(existing) => *existing = payment,
            None => state.payments.push(payment),
        }
    }

    /// Insert or replace an account holder
    pub fn insert_account_holder(&self, holder: AccountHolder) {
        self.state.lock().holders.insert(holder.id, holder);
    }

    /// Current state of a payment, if stored
    pub fn payment(&self, id: Uuid) -> Option<PaymentIntent> {
        self.state.lock().payments.iter().find(|p| p.id == id).cloned()
    }

    /// Current state of an account holder, if stored
    pub fn account_holder(&self, id: Uuid) -> Option<AccountHolder> {
        self.state.lock().holders.get(&id).cloned()
    }

    /// Number of stored payments in any status
    pub fn payment_count(&self) -> usize {
        self.state.lock().payments.len()
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn pending_payments(&self, now: DateTime<Utc>) -> Result<Vec<PaymentIntent>> {
        Ok(self
            .state
            .lock()
            .payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Pending && !p.is_expired(now))
            .cloned()
            .collect())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.lock();
        let before = state.payments.len();
        state
            .payments
            .retain(|p| !(p.status == PaymentStatus::Pending && p.is_expired(now)));
        Ok((before - state.payments.len()) as u64)
    }

    async fn complete_payment(&self, request: &CompletionRequest) -> Result<CompletionOutcome> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let payment = state
            .payments
            .iter_mut()
            .find(|p| p.id == request.payment_id)
            .ok_or_else(|| Error::PaymentNotFound(request.payment_id.to_string()))?;

        if payment.status != PaymentStatus::Pending {
            return Ok(CompletionOutcome::AlreadySettled);
        }

        let seller_credited = match state.holders.get_mut(&request.seller_id) {
            Some(holder) => {
                holder.wallet_balance += request.credit;
                true
            }
            None => false,
        };

        payment.status = PaymentStatus::Completed;
        payment.completed_at = Some(request.completed_at);

        Ok(CompletionOutcome::Completed { seller_credited })
    }
}
