//! Ledger aggregation: the transaction set is the sole source of truth
//! for member balances.
//!
//! Historically the sign of debit-type rows varied by call site: some
//! paths stored registration, contribution and arrears amounts negative,
//! others positive. [`normalize`] fixes a single sign table and is applied
//! at every read boundary, so either storage convention aggregates to the
//! same balance.

use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::HashMap;

use payloads::{MemberId, TransactionType, responses};

use super::{StoreError, Transaction};

/// Apply the sign table: registration, contribution and arrears represent
/// money owed by the member and are forced negative; every other type
/// keeps its stored sign.
pub fn normalize(amount: Decimal, transaction_type: TransactionType) -> Decimal {
    match transaction_type {
        TransactionType::Registration
        | TransactionType::Contribution
        | TransactionType::Arrears => -amount.abs(),
        TransactionType::Disbursement
        | TransactionType::Renewal
        | TransactionType::Penalty
        | TransactionType::WalletFunding
        | TransactionType::Mpesa
        | TransactionType::Suspense => amount,
    }
}

/// Sum of normalized amounts over a set of rows.
pub fn balance(transactions: &[Transaction]) -> Decimal {
    transactions
        .iter()
        .map(|tx| normalize(tx.amount, tx.transaction_type))
        .sum()
}

/// A member's wallet balance, derived from exactly that member's rows.
pub async fn wallet_balance(
    member_id: &MemberId,
    pool: &PgPool,
) -> Result<Decimal, StoreError> {
    let transactions = sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE member_id = $1",
    )
    .bind(member_id)
    .fetch_all(pool)
    .await?;
    Ok(balance(&transactions))
}

/// Wallet balances for a set of members in one query. Members without
/// transactions are absent from the map.
pub async fn wallet_balances(
    member_ids: &[MemberId],
    pool: &PgPool,
) -> Result<HashMap<MemberId, Decimal>, StoreError> {
    if member_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let transactions = sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE member_id = ANY($1)",
    )
    .bind(member_ids)
    .fetch_all(pool)
    .await?;
    Ok(super::fold_balances(transactions))
}

/// A member's transaction history, most recent first.
pub async fn member_transactions(
    member_id: &MemberId,
    limit: i64,
    offset: i64,
    pool: &PgPool,
) -> Result<Vec<responses::Transaction>, StoreError> {
    super::read_member_row(member_id, pool).await?;
    let transactions = sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions
         WHERE member_id = $1
         ORDER BY created_at DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(member_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(transactions.into_iter().map(Into::into).collect())
}
