//! Property-based tests for normalization and matching invariants
//!
//! - Amount parsing ignores thousands separators
//! - Outgoing transactions never satisfy a payment
//! - Matching requires exact amount equality
//! - Reference matching ignores case

use chrono::{Duration, Utc};
use payment_reconciler::formats::parse_amount;
use payment_reconciler::{
    BankAccount, Direction, MatchPolicy, Matcher, PaymentIntent, PaymentStatus, Transaction,
};
use proptest::prelude::*;
use uuid::Uuid;

fn intent(expected: u64, reference: &str) -> PaymentIntent {
    PaymentIntent {
        id: Uuid::new_v4(),
        seller_id: Uuid::new_v4(),
        bank_account: BankAccount {
            id: Uuid::new_v4(),
            bank_name: "MB".to_string(),
            account_number: "1".to_string(),
            api_url: None,
        },
        amount: expected,
        amount_local: None,
        amount_wallet: None,
        transfer_reference: reference.to_string(),
        status: PaymentStatus::Pending,
        expires_at: Utc::now() + Duration::minutes(15),
        completed_at: None,
    }
}

/// Render an integer with `,` every three digits
fn with_separators(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Strategy for transfer references
fn reference_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9]{3,12}"
}

proptest! {
    #[test]
    fn prop_separators_do_not_change_amount(value in 0u64..1_000_000_000_000u64) {
        prop_assert_eq!(parse_amount(&with_separators(value)), value);
        prop_assert_eq!(parse_amount(&value.to_string()), value);
    }

    #[test]
    fn prop_outgoing_never_matches(
        amount in 1u64..10_000_000u64,
        reference in reference_strategy(),
        prefix in "[a-z ]{0,10}",
    ) {
        let payment = intent(amount, &reference);
        let transactions = vec![Transaction {
            amount,
            description: format!("{}{}", prefix, reference),
            direction: Direction::Out,
            ..Transaction::default()
        }];

        for policy in [MatchPolicy::FirstMatch, MatchPolicy::RequireUnique] {
            prop_assert!(Matcher::new(policy).find_match(&payment, &transactions).is_none());
        }
    }

    #[test]
    fn prop_amount_must_be_exact(
        amount in 2u64..10_000_000u64,
        delta in 1u64..1_000u64,
        reference in reference_strategy(),
    ) {
        let payment = intent(amount, &reference);
        let transactions = vec![
            Transaction {
                amount: amount + delta,
                description: reference.clone(),
                direction: Direction::In,
                ..Transaction::default()
            },
            Transaction {
                amount: amount.saturating_sub(delta).max(1).min(amount - 1),
                description: reference.clone(),
                direction: Direction::In,
                ..Transaction::default()
            },
        ];

        prop_assert!(Matcher::default().find_match(&payment, &transactions).is_none());
    }

    #[test]
    fn prop_reference_case_is_ignored(
        amount in 1u64..10_000_000u64,
        reference in reference_strategy(),
        upper in any::<bool>(),
    ) {
        let description = if upper {
            format!("PAYMENT {} THANKS", reference.to_uppercase())
        } else {
            format!("payment {} thanks", reference.to_lowercase())
        };
        let payment = intent(amount, &reference);
        let transactions = vec![Transaction {
            amount,
            description,
            direction: Direction::In,
            ..Transaction::default()
        }];

        prop_assert!(Matcher::default().find_match(&payment, &transactions).is_some());
    }
}
