//! Bank client tests against a mock upstream

use chrono::{Duration, Utc};
use payment_reconciler::{
    AccountHolder, BankAccount, BankClient, Direction, FetchError, FetchOutcome, InMemoryStore,
    PaymentIntent, PaymentStatus, ReconcilerConfig, ReconciliationEngine, TransactionSource,
    UpstreamFormat,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn account_for(server: &MockServer) -> BankAccount {
    BankAccount {
        id: Uuid::new_v4(),
        bank_name: "MB".to_string(),
        account_number: "0919847223".to_string(),
        api_url: Some(format!("{}/history", server.uri())),
    }
}

async fn serve(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/history"))
        .respond_with(response)
        .mount(server)
        .await;
}

fn client() -> BankClient {
    BankClient::new(&ReconcilerConfig::default()).unwrap()
}

#[tokio::test]
async fn test_direct_array_response() {
    let server = MockServer::start().await;
    serve(
        &server,
        ResponseTemplate::new(200).set_body_json(json!([
            {
                "refNo": "FT26041592608140",
                "tranId": "FT26041592608140",
                "postingDate": "10/02/2026 23:59:59",
                "transactionDate": "10/02/2026 00:06:00",
                "accountNo": "0919847223",
                "creditAmount": "286000",
                "debitAmount": "0",
                "currency": "VND",
                "description": "order X",
                "addDescription": "",
                "availableBalance": "6774603",
                "beneficiaryAccount": "",
                "transactionType": "BI2B"
            },
            {
                "refNo": "FT2",
                "creditAmount": "0",
                "debitAmount": "50,000",
                "description": "fee"
            }
        ])),
    )
    .await;

    let outcome = client().fetch(&account_for(&server)).await;

    match &outcome {
        FetchOutcome::Fetched { format, transactions } => {
            assert_eq!(*format, UpstreamFormat::DirectArray);
            assert_eq!(transactions.len(), 2);
            assert_eq!(transactions[0].amount, 286_000);
            assert_eq!(transactions[0].direction, Direction::In);
            assert_eq!(transactions[0].description, "order X");
            assert_eq!(transactions[1].amount, 50_000);
            assert_eq!(transactions[1].direction, Direction::Out);
        }
        other => panic!("expected fetched outcome, got {:?}", other),
    }
}

#[tokio::test]
async fn test_enveloped_success_response() {
    let server = MockServer::start().await;
    serve(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "mid": "14",
            "code": "00",
            "des": "success",
            "transactions": [{
                "tranDate": "02/04/2024",
                "TransactionDate": "02/04/2024",
                "Reference": "5243 - 51972",
                "CD": "+",
                "Amount": "10,000",
                "Description": "MBVCB.5655475306.order118064",
                "PCTime": "160258",
                "DorCCode": "C"
            }],
            "nextIndex": "1"
        })),
    )
    .await;

    let outcome = client().fetch(&account_for(&server)).await;

    assert_eq!(outcome.kind(), "fetched");
    let transactions = outcome.into_transactions();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].external_id, "5243 - 51972");
    assert_eq!(transactions[0].amount, 10_000);
    assert_eq!(transactions[0].direction, Direction::In);
}

#[tokio::test]
async fn test_enveloped_error_code_yields_nothing() {
    let server = MockServer::start().await;
    serve(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "code": "01",
            "des": "invalid token",
            "transactions": [{"Reference": "1", "CD": "+", "Amount": "10,000", "Description": "X"}]
        })),
    )
    .await;

    let outcome = client().fetch(&account_for(&server)).await;

    match &outcome {
        FetchOutcome::Rejected(rejection) => {
            assert_eq!(rejection.code, "01");
            assert_eq!(rejection.message.as_deref(), Some("invalid token"));
        }
        other => panic!("expected rejection, got {:?}", other),
    }
    assert!(outcome.transactions().is_empty());
}

#[tokio::test]
async fn test_envelope_without_code_yields_nothing() {
    let server = MockServer::start().await;
    serve(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "des": "missing code",
            "transactions": [{"CD": "+", "Amount": "100", "Description": "order X"}]
        })),
    )
    .await;

    let outcome = client().fetch(&account_for(&server)).await;

    assert!(matches!(&outcome, FetchOutcome::Rejected(rejection) if rejection.code.is_empty()));
    assert!(outcome.transactions().is_empty());
}

#[tokio::test]
async fn test_server_error_is_absorbed() {
    let server = MockServer::start().await;
    serve(&server, ResponseTemplate::new(502).set_body_string("upstream down")).await;

    let outcome = client().fetch(&account_for(&server)).await;

    match outcome {
        FetchOutcome::Failed(FetchError::Status { status, body }) => {
            assert_eq!(status, 502);
            assert_eq!(body, "upstream down");
        }
        other => panic!("expected status failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_body_is_absorbed() {
    let server = MockServer::start().await;
    serve(&server, ResponseTemplate::new(200).set_body_string("<html>oops</html>")).await;

    let outcome = client().fetch(&account_for(&server)).await;

    assert!(matches!(outcome, FetchOutcome::Failed(FetchError::Malformed(_))));
    assert!(outcome.transactions().is_empty());
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let server = MockServer::start().await;
    serve(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(json!([]))
            .set_delay(std::time::Duration::from_secs(3)),
    )
    .await;

    let config = ReconcilerConfig {
        fetch_timeout_secs: 1,
        ..ReconcilerConfig::default()
    };
    let outcome = BankClient::new(&config)
        .unwrap()
        .fetch(&account_for(&server))
        .await;

    assert!(matches!(outcome, FetchOutcome::Failed(FetchError::Timeout(_))));
}

#[tokio::test]
async fn test_missing_endpoint_skips_request() {
    let server = MockServer::start().await;
    let mut account = account_for(&server);
    account.api_url = None;

    let outcome = client().fetch(&account).await;

    assert!(matches!(outcome, FetchOutcome::NoEndpoint));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_end_to_end_pass_over_http() {
    let server = MockServer::start().await;
    serve(
        &server,
        ResponseTemplate::new(200).set_body_json(json!([{
            "refNo": "FT26041592608140",
            "transactionDate": "10/02/2026 00:06:00",
            "creditAmount": "286000",
            "debitAmount": "0",
            "description": "order X"
        }])),
    )
    .await;

    let now = Utc::now();
    let account = account_for(&server);
    let store = Arc::new(InMemoryStore::new());
    let first = PaymentIntent {
        id: Uuid::new_v4(),
        seller_id: Uuid::new_v4(),
        bank_account: account.clone(),
        amount: 286_000,
        amount_local: None,
        amount_wallet: Some(dec!(11.44)),
        transfer_reference: "X".to_string(),
        status: PaymentStatus::Pending,
        expires_at: now + Duration::minutes(15),
        completed_at: None,
    };
    let second = PaymentIntent {
        id: Uuid::new_v4(),
        transfer_reference: "Y".to_string(),
        ..first.clone()
    };
    store.insert_account_holder(AccountHolder {
        id: first.seller_id,
        wallet_balance: Decimal::ZERO,
    });
    store.insert_payment(first.clone());
    store.insert_payment(second.clone());

    let engine = ReconciliationEngine::new(store.clone(), client(), ReconcilerConfig::default());
    let summary = engine.run_pass_at(now).await;

    assert_eq!(summary.checked, 2);
    assert_eq!(summary.updated, 1);
    assert_eq!(store.payment(first.id).unwrap().status, PaymentStatus::Completed);
    assert_eq!(store.payment(second.id).unwrap().status, PaymentStatus::Pending);
    assert_eq!(store.account_holder(first.seller_id).unwrap().wallet_balance, dec!(11.44));

    // Both payments share the account: one request
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}
