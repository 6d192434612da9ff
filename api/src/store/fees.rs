//! Fee collection and transfer operations.
//!
//! Every operation here takes a client-supplied idempotency key and runs
//! inside a single database transaction: a retry with the same key
//! returns the original outcome instead of writing again. Bulk renewal
//! deliberately remains re-runnable under a fresh key, since the annual
//! levy is charged once per run, not once per member lifetime.
//!
//! Debit rows are written negative, matching the sign convention in the
//! store module docs.

use jiff_sqlx::ToSqlx;
use rust_decimal::Decimal;
use sqlx::PgPool;

use payloads::{
    AccountKind, MemberId, OperationId, SuspenseId, TransactionType, requests,
    responses,
};

use super::{StoreError, Transaction, ledger};
use crate::time::TimeSource;

/// Record a single fee payment.
///
/// Paying a registration or penalty fee also reactivates a lapsed
/// member. A replayed key returns the originally created transaction.
pub async fn collect_fee(
    request: &requests::CollectFee,
    time_source: &TimeSource,
    pool: &PgPool,
) -> Result<responses::Transaction, StoreError> {
    let fee = match request.amount {
        Some(amount) => amount,
        None => default_fee(request.fee_type, pool).await?,
    };
    if fee <= Decimal::ZERO {
        return Err(StoreError::AmountMustBePositive);
    }

    let mut tx = pool.begin().await?;

    if let Some(operation_id) =
        super::existing_operation(request.idempotency_key, &mut tx).await?
    {
        let existing = operation_transaction(&operation_id, &mut tx).await?;
        tx.commit().await?;
        return Ok(existing.into());
    }

    // Errors here also cover a nonexistent member before any write.
    let member = super::read_member_row(&request.member_id, pool).await?;

    let operation_id =
        super::record_operation(request.idempotency_key, "collect_fee", &mut tx)
            .await?;

    let row = sqlx::query_as::<_, Transaction>(
        "INSERT INTO transactions (
            member_id, amount, transaction_type, description, operation_id,
            created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *",
    )
    .bind(member.id)
    .bind(-fee.abs())
    .bind(request.fee_type.transaction_type())
    .bind(fee_description(request.fee_type))
    .bind(operation_id)
    .bind(time_source.now().to_sqlx())
    .fetch_one(&mut *tx)
    .await?;

    if request.fee_type.reactivates_member() {
        sqlx::query("UPDATE members SET is_active = true WHERE id = $1")
            .bind(member.id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(row.into())
}

/// Charge every member the annual renewal fee, in insert batches of 500,
/// all inside one transaction.
///
/// Replaying the same key reports the original run; a fresh key charges
/// every member again.
pub async fn collect_renewal_fees(
    request: &requests::CollectRenewalFees,
    time_source: &TimeSource,
    pool: &PgPool,
) -> Result<responses::BulkRenewalResult, StoreError> {
    let fee = match request.amount {
        Some(amount) => amount,
        None => default_fee(AccountKind::Renewal, pool).await?,
    };
    if fee <= Decimal::ZERO {
        return Err(StoreError::AmountMustBePositive);
    }

    let mut tx = pool.begin().await?;

    if let Some(operation_id) =
        super::existing_operation(request.idempotency_key, &mut tx).await?
    {
        let result = renewal_run_summary(&operation_id, &mut tx).await?;
        tx.commit().await?;
        return Ok(result);
    }

    let operation_id = super::record_operation(
        request.idempotency_key,
        "collect_renewal_fees",
        &mut tx,
    )
    .await?;

    let member_ids: Vec<MemberId> =
        sqlx::query_scalar("SELECT id FROM members ORDER BY member_number")
            .fetch_all(&mut *tx)
            .await?;

    let amount = -fee.abs();
    let now = time_source.now();
    for batch in member_ids.chunks(500) {
        sqlx::query(
            "INSERT INTO transactions (
                member_id, amount, transaction_type, description,
                operation_id, created_at
            )
            SELECT member_id, $2, $3, $4, $5, $6
            FROM UNNEST($1::uuid[]) AS member_id",
        )
        .bind(batch)
        .bind(amount)
        .bind(TransactionType::Renewal)
        .bind("Annual renewal fee")
        .bind(operation_id)
        .bind(now.to_sqlx())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(responses::BulkRenewalResult {
        members_charged: member_ids.len(),
        total_amount: fee * Decimal::from(member_ids.len() as i64),
    })
}

/// Record a member's contribution toward an active case.
pub async fn collect_contribution(
    request: &requests::CollectContribution,
    time_source: &TimeSource,
    pool: &PgPool,
) -> Result<responses::Transaction, StoreError> {
    if request.amount <= Decimal::ZERO {
        return Err(StoreError::AmountMustBePositive);
    }

    let mut tx = pool.begin().await?;

    // Replay wins over validation: a key recorded while the case was
    // still open returns its transaction even after finalization.
    if let Some(operation_id) =
        super::existing_operation(request.idempotency_key, &mut tx).await?
    {
        let existing = operation_transaction(&operation_id, &mut tx).await?;
        tx.commit().await?;
        return Ok(existing.into());
    }

    let case = super::cases::read_case_row(&request.case_id, pool).await?;
    if case.is_finalized {
        return Err(StoreError::CaseFinalized);
    }
    if !case.is_active {
        return Err(StoreError::CaseNotActive);
    }
    let member = super::read_member_row(&request.member_id, pool).await?;

    let operation_id = super::record_operation(
        request.idempotency_key,
        "collect_contribution",
        &mut tx,
    )
    .await?;

    let row = sqlx::query_as::<_, Transaction>(
        "INSERT INTO transactions (
            member_id, case_id, amount, transaction_type, description,
            operation_id, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *",
    )
    .bind(member.id)
    .bind(case.id)
    .bind(-request.amount.abs())
    .bind(TransactionType::Contribution)
    .bind(format!("Contribution to case #{}", case.case_number))
    .bind(operation_id)
    .bind(time_source.now().to_sqlx())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row.into())
}

/// Credit a member's wallet. The ledger row and the advisory balance
/// column move together in one transaction.
pub async fn fund_wallet(
    request: &requests::FundWallet,
    time_source: &TimeSource,
    pool: &PgPool,
) -> Result<responses::Transaction, StoreError> {
    if request.amount <= Decimal::ZERO {
        return Err(StoreError::AmountMustBePositive);
    }
    let member = super::read_member_row(&request.member_id, pool).await?;

    let mut tx = pool.begin().await?;

    if let Some(operation_id) =
        super::existing_operation(request.idempotency_key, &mut tx).await?
    {
        let existing = operation_transaction(&operation_id, &mut tx).await?;
        tx.commit().await?;
        return Ok(existing.into());
    }

    let operation_id = super::record_operation(
        request.idempotency_key,
        "fund_wallet",
        &mut tx,
    )
    .await?;

    let row = sqlx::query_as::<_, Transaction>(
        "INSERT INTO transactions (
            member_id, amount, transaction_type, mpesa_reference,
            description, operation_id, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *",
    )
    .bind(member.id)
    .bind(request.amount)
    .bind(TransactionType::WalletFunding)
    .bind(&request.mpesa_reference)
    .bind("Wallet funding")
    .bind(operation_id)
    .bind(time_source.now().to_sqlx())
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE members SET wallet_balance = wallet_balance + $1
         WHERE id = $2",
    )
    .bind(request.amount)
    .bind(member.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row.into())
}

/// Move funds between member wallets via the `transfer_funds` stored
/// procedure. The sender's ledger-derived balance must cover the amount.
pub async fn create_transfer(
    request: &requests::CreateTransfer,
    pool: &PgPool,
) -> Result<(), StoreError> {
    if request.amount <= Decimal::ZERO {
        return Err(StoreError::AmountMustBePositive);
    }
    if request.from_member_id == request.to_member_id {
        return Err(StoreError::TransferToSelf);
    }
    super::read_member_row(&request.from_member_id, pool).await?;
    super::read_member_row(&request.to_member_id, pool).await?;

    let sender_balance =
        ledger::wallet_balance(&request.from_member_id, pool).await?;
    if sender_balance < request.amount {
        return Err(StoreError::InsufficientFunds);
    }

    let mut tx = pool.begin().await?;

    if super::existing_operation(request.idempotency_key, &mut tx)
        .await?
        .is_some()
    {
        return Ok(());
    }
    super::record_operation(request.idempotency_key, "create_transfer", &mut tx)
        .await?;

    sqlx::query("SELECT transfer_funds($1, $2, $3, $4)")
        .bind(request.from_member_id)
        .bind(request.to_member_id)
        .bind(request.amount)
        .bind(request.note.as_deref().unwrap_or("Member transfer"))
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Attribute a flagged M-Pesa payment to a member: credit their wallet
/// through `transfer_funds` (NULL source, the funds enter from outside
/// the ledger) and mark the suspense row resolved.
pub async fn resolve_suspense(
    request: &requests::ResolveSuspense,
    time_source: &TimeSource,
    pool: &PgPool,
) -> Result<(), StoreError> {
    super::read_member_row(&request.member_id, pool).await?;

    let mut tx = pool.begin().await?;

    if super::existing_operation(request.idempotency_key, &mut tx)
        .await?
        .is_some()
    {
        return Ok(());
    }

    let suspense = sqlx::query_as::<_, super::WrongMpesaTransaction>(
        "SELECT * FROM wrong_mpesa_transactions WHERE id = $1 FOR UPDATE",
    )
    .bind(request.suspense_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(StoreError::SuspenseNotFound)?;
    if suspense.resolved_at.is_some() {
        return Err(StoreError::SuspenseAlreadyResolved);
    }

    super::record_operation(
        request.idempotency_key,
        "resolve_suspense",
        &mut tx,
    )
    .await?;

    sqlx::query("SELECT transfer_funds($1, $2, $3, $4)")
        .bind(None::<MemberId>)
        .bind(request.member_id)
        .bind(suspense.amount)
        .bind(format!("Suspense resolution {}", suspense.mpesa_reference))
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "UPDATE wrong_mpesa_transactions
         SET resolved_at = $1, resolved_member_id = $2
         WHERE id = $3",
    )
    .bind(time_source.now().to_sqlx())
    .bind(request.member_id)
    .bind(request.suspense_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Register an unmatched M-Pesa payment, as the external reconciliation
/// process would.
pub async fn record_wrong_mpesa(
    mpesa_reference: &str,
    sender_name: &str,
    amount: Decimal,
    description: Option<&str>,
    pool: &PgPool,
) -> Result<SuspenseId, StoreError> {
    if amount <= Decimal::ZERO {
        return Err(StoreError::AmountMustBePositive);
    }
    let id: SuspenseId = sqlx::query_scalar(
        "INSERT INTO wrong_mpesa_transactions (
            mpesa_reference, sender_name, amount, description
        )
        VALUES ($1, $2, $3, $4)
        RETURNING id",
    )
    .bind(mpesa_reference)
    .bind(sender_name)
    .bind(amount)
    .bind(description)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn default_fee(
    kind: AccountKind,
    pool: &PgPool,
) -> Result<Decimal, StoreError> {
    let settings = super::get_settings(pool).await?;
    match kind {
        AccountKind::Registration => Ok(settings.registration_fee),
        AccountKind::Renewal => Ok(settings.renewal_fee),
        AccountKind::Penalty => Ok(settings.penalty_fee),
        // Arrears have no configured default.
        AccountKind::Arrears => Err(StoreError::AmountRequired),
    }
}

fn fee_description(kind: AccountKind) -> &'static str {
    match kind {
        AccountKind::Registration => "Registration fee",
        AccountKind::Renewal => "Renewal fee",
        AccountKind::Penalty => "Penalty fee",
        AccountKind::Arrears => "Arrears payment",
    }
}

/// The transaction created by a previously recorded single-row operation.
async fn operation_transaction(
    operation_id: &OperationId,
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
) -> Result<Transaction, StoreError> {
    sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE operation_id = $1",
    )
    .bind(operation_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(StoreError::TransactionNotFound)
}

/// Reconstruct the outcome of an earlier renewal run from its rows.
async fn renewal_run_summary(
    operation_id: &OperationId,
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
) -> Result<responses::BulkRenewalResult, StoreError> {
    let row: (i64, Option<Decimal>) = sqlx::query_as(
        "SELECT COUNT(*), SUM(amount) FROM transactions
         WHERE operation_id = $1",
    )
    .bind(operation_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(responses::BulkRenewalResult {
        members_charged: row.0 as usize,
        total_amount: row.1.unwrap_or(Decimal::ZERO).abs(),
    })
}
