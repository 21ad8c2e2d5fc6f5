// Postgres-backed payment store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use payment_reconciler::{
    BankAccount, CompletionOutcome, CompletionRequest, Error, PaymentIntent, PaymentStatus,
    PaymentStore, Result,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct PendingPaymentRow {
    id: Uuid,
    seller_id: Uuid,
    amount: i64,
    amount_local: Option<i64>,
    amount_wallet: Option<Decimal>,
    transfer_reference: String,
    expires_at: DateTime<Utc>,
    bank_account_id: Uuid,
    bank_name: String,
    account_number: String,
    api_url: Option<String>,
}

impl From<PendingPaymentRow> for PaymentIntent {
    fn from(row: PendingPaymentRow) -> Self {
        PaymentIntent {
            id: row.id,
            seller_id: row.seller_id,
            bank_account: BankAccount {
                id: row.bank_account_id,
                bank_name: row.bank_name,
                account_number: row.account_number,
                api_url: row.api_url,
            },
            amount: u64::try_from(row.amount).unwrap_or(0),
            amount_local: row.amount_local.and_then(|v| u64::try_from(v).ok()),
            amount_wallet: row.amount_wallet,
            transfer_reference: row.transfer_reference,
            status: PaymentStatus::Pending,
            expires_at: row.expires_at,
            completed_at: None,
        }
    }
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_error(e: sqlx::Error) -> Error {
    Error::Store(e.to_string())
}

#[async_trait]
impl PaymentStore for PgStore {
    async fn pending_payments(&self, now: DateTime<Utc>) -> Result<Vec<PaymentIntent>> {
        let rows = sqlx::query_as::<_, PendingPaymentRow>(
            r#"
            SELECT p.id, p.seller_id, p.amount, p.amount_local, p.amount_wallet,
                   p.transfer_reference, p.expires_at,
                   b.id AS bank_account_id, b.bank_name, b.account_number, b.api_url
            FROM payments p
            JOIN bank_accounts b ON b.id = p.bank_account_id
            WHERE p.status = 'pending'
              AND p.expires_at > $1
            ORDER BY p.created_at
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(rows.into_iter().map(PaymentIntent::from).collect())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM payments WHERE status = 'pending' AND expires_at <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(result.rows_affected())
    }

    async fn complete_payment(&self, request: &CompletionRequest) -> Result<CompletionOutcome> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        // Status guard: only a pending payment may be completed and credited
        let completed = sqlx::query(
            r#"
            UPDATE payments
            SET status = 'completed', completed_at = $2
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(request.payment_id)
        .bind(request.completed_at)
        .execute(&mut *tx)
        .await
        .map_err(store_error)?
        .rows_affected();

        if completed == 0 {
            let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM payments WHERE id = $1")
                .bind(request.payment_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(store_error)?;
            tx.rollback().await.map_err(store_error)?;

            return match exists {
                Some(_) => Ok(CompletionOutcome::AlreadySettled),
                None => Err(Error::PaymentNotFound(request.payment_id.to_string())),
            };
        }

        let credited = sqlx::query(
            "UPDATE users SET wallet_balance = wallet_balance + $1 WHERE id = $2",
        )
        .bind(request.credit)
        .bind(request.seller_id)
        .execute(&mut *tx)
        .await
        .map_err(store_error)?
        .rows_affected();

        tx.commit().await.map_err(store_error)?;

        info!(
            "💾 Payment {} committed as {} (wallet rows updated: {})",
            request.payment_id,
            PaymentStatus::Completed.as_str(),
            credited
        );

        Ok(CompletionOutcome::Completed {
            seller_credited: credited > 0,
        })
    }
}
