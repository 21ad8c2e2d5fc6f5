//! Matcher - pairs a pending payment with the incoming transaction that pays it

use crate::config::MatchPolicy;
use crate::types::{PaymentIntent, Transaction};
use tracing::{debug, warn};

/// Decides which fetched transaction, if any, satisfies a payment
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    policy: MatchPolicy,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(MatchPolicy::FirstMatch)
    }
}

impl Matcher {
    /// Create a matcher with the given policy
    pub fn new(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    /// Active match policy
    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// A transaction satisfies a payment when it is incoming, carries exactly
    /// the expected amount and its description contains the transfer
    /// reference, ignoring case.
    pub fn satisfies(intent: &PaymentIntent, transaction: &Transaction) -> bool {
        let expected = intent.expected_amount();
        let reference = intent.transfer_reference.trim().to_lowercase();

        let matches_amount = transaction.amount == expected;
        let matches_reference = !reference.is_empty()
            && transaction.description.to_lowercase().contains(&reference);
        let incoming = transaction.is_incoming();

        debug!(
            "Checking transaction {}: amount={}, expected={}, matches_amount={}, matches_reference={}, incoming={}, description={:?}, reference={:?}",
            transaction.external_id,
            transaction.amount,
            expected,
            matches_amount,
            matches_reference,
            incoming,
            transaction.description,
            intent.transfer_reference
        );

        matches_amount && matches_reference && incoming
    }

    /// Find the transaction paying `intent`, scanning in upstream order
    pub fn find_match<'t>(
        &self,
        intent: &PaymentIntent,
        transactions: &'t [Transaction],
    ) -> Option<&'t Transaction> {
        if intent.transfer_reference.trim().is_empty() {
            warn!("Payment {} has no transfer reference, cannot match", intent.id);
            return None;
        }

        let mut candidates = transactions
            .iter()
            .filter(|transaction| Self::satisfies(intent, transaction));

        match self.policy {
            MatchPolicy::FirstMatch => candidates.next(),
            MatchPolicy::RequireUnique => {
                let first = candidates.next()?;
                let extra = candidates.count();
                if extra > 0 {
                    warn!(
                        "Payment {} is satisfied by {} transactions, refusing ambiguous match",
                        intent.id,
                        extra + 1
                    );
                    return None;
                }
                Some(first)
            }
        }
    }
}
