//! Case (benefit request) management and funding progress.
//!
//! Contributions join to cases through `transactions.case_id`;
//! descriptions are display-only. The funding target recomputes against
//! the current member count at every read, so it drifts as membership
//! changes.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sqlx::PgPool;

use payloads::{CaseId, TransactionType, requests, responses};

use super::{Case, StoreError};

/// Progress figures for a case.
///
/// `expected = contribution_per_member x member_count`; zero expected
/// yields 0%. The percentage is not clamped: an over-collected case
/// exceeds 100.
pub fn case_progress(
    contribution_per_member: Decimal,
    member_count: i64,
    actual_amount: Decimal,
) -> responses::CaseProgress {
    let expected_amount = contribution_per_member * Decimal::from(member_count);
    let progress_percent = if expected_amount.is_zero() {
        0
    } else {
        (actual_amount / expected_amount * Decimal::ONE_HUNDRED)
            .round()
            .to_i64()
            .unwrap_or(0)
    };
    responses::CaseProgress {
        expected_amount,
        actual_amount,
        progress_percent,
    }
}

/// Sum of contribution amounts collected for a case. Amounts are stored
/// negative (member debits), so the collected total is the absolute sum.
async fn actual_amount(
    case_id: &CaseId,
    pool: &PgPool,
) -> Result<Decimal, StoreError> {
    let amounts: Vec<Decimal> = sqlx::query_scalar(
        "SELECT amount FROM transactions
         WHERE case_id = $1 AND transaction_type = $2",
    )
    .bind(case_id)
    .bind(TransactionType::Contribution)
    .fetch_all(pool)
    .await?;
    Ok(amounts.into_iter().map(|amount| amount.abs()).sum())
}

fn validate_case_details(details: &payloads::Case) -> Result<(), StoreError> {
    if details.contribution_per_member <= Decimal::ZERO {
        return Err(StoreError::AmountMustBePositive);
    }
    Ok(())
}

/// The referenced member, and the dependant when given, must exist.
async fn validate_case_references(
    details: &payloads::Case,
    pool: &PgPool,
) -> Result<(), StoreError> {
    super::read_member_row(&details.affected_member_id, pool).await?;
    if let Some(dependant_id) = &details.dependant_id {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM dependants WHERE id = $1)",
        )
        .bind(dependant_id)
        .fetch_one(pool)
        .await?;
        if !exists {
            return Err(StoreError::DependantNotFound);
        }
    }
    Ok(())
}

pub async fn create_case(
    details: &payloads::Case,
    pool: &PgPool,
) -> Result<CaseId, StoreError> {
    validate_case_details(details)?;
    validate_case_references(details, pool).await?;
    let id: CaseId = sqlx::query_scalar(
        "INSERT INTO cases (
            affected_member_id, dependant_id, case_type,
            contribution_per_member, start_date, end_date
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id",
    )
    .bind(details.affected_member_id)
    .bind(details.dependant_id)
    .bind(details.case_type)
    .bind(details.contribution_per_member)
    .bind(jiff_sqlx::ToSqlx::to_sqlx(details.start_date))
    .bind(jiff_sqlx::ToSqlx::to_sqlx(details.end_date))
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn read_case_row(
    case_id: &CaseId,
    pool: &PgPool,
) -> Result<Case, StoreError> {
    sqlx::query_as::<_, Case>("SELECT * FROM cases WHERE id = $1")
        .bind(case_id)
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => StoreError::CaseNotFound,
            e => StoreError::Database(e),
        })
}

async fn into_response(
    row: Case,
    pool: &PgPool,
) -> Result<responses::Case, StoreError> {
    let member_count = super::member_count(pool).await?;
    let actual = actual_amount(&row.id, pool).await?;
    let progress =
        case_progress(row.contribution_per_member, member_count, actual);
    Ok(responses::Case {
        case_id: row.id,
        case_number: row.case_number,
        details: payloads::Case {
            affected_member_id: row.affected_member_id,
            dependant_id: row.dependant_id,
            case_type: row.case_type,
            contribution_per_member: row.contribution_per_member,
            start_date: row.start_date,
            end_date: row.end_date,
        },
        is_active: row.is_active,
        is_finalized: row.is_finalized,
        progress,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

pub async fn read_case(
    case_id: &CaseId,
    pool: &PgPool,
) -> Result<responses::Case, StoreError> {
    let row = read_case_row(case_id, pool).await?;
    into_response(row, pool).await
}

pub async fn list_cases(
    request: &requests::ListCases,
    pool: &PgPool,
) -> Result<Vec<responses::Case>, StoreError> {
    let rows = if request.active_only {
        sqlx::query_as::<_, Case>(
            "SELECT * FROM cases
             WHERE is_active = true AND is_finalized = false
             ORDER BY case_number DESC
             LIMIT $1 OFFSET $2",
        )
        .bind(request.limit)
        .bind(request.offset)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, Case>(
            "SELECT * FROM cases
             ORDER BY case_number DESC
             LIMIT $1 OFFSET $2",
        )
        .bind(request.limit)
        .bind(request.offset)
        .fetch_all(pool)
        .await?
    };

    let mut cases = Vec::with_capacity(rows.len());
    for row in rows {
        cases.push(into_response(row, pool).await?);
    }
    Ok(cases)
}

pub async fn update_case(
    request: &requests::UpdateCase,
    pool: &PgPool,
) -> Result<responses::Case, StoreError> {
    validate_case_details(&request.details)?;
    validate_case_references(&request.details, pool).await?;
    let result = sqlx::query(
        "UPDATE cases
         SET affected_member_id = $1, dependant_id = $2, case_type = $3,
             contribution_per_member = $4, start_date = $5, end_date = $6,
             is_active = $7, is_finalized = $8
         WHERE id = $9",
    )
    .bind(request.details.affected_member_id)
    .bind(request.details.dependant_id)
    .bind(request.details.case_type)
    .bind(request.details.contribution_per_member)
    .bind(jiff_sqlx::ToSqlx::to_sqlx(request.details.start_date))
    .bind(jiff_sqlx::ToSqlx::to_sqlx(request.details.end_date))
    .bind(request.is_active)
    .bind(request.is_finalized)
    .bind(request.case_id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::CaseNotFound);
    }
    read_case(&request.case_id, pool).await
}

/// Activate a draft or suspended case. Finalized cases stay closed.
pub async fn activate_case(
    case_id: &CaseId,
    pool: &PgPool,
) -> Result<responses::Case, StoreError> {
    let row = read_case_row(case_id, pool).await?;
    if row.is_finalized {
        return Err(StoreError::CaseFinalized);
    }
    sqlx::query("UPDATE cases SET is_active = true WHERE id = $1")
        .bind(case_id)
        .execute(pool)
        .await?;
    read_case(case_id, pool).await
}

/// Finalize a case, closing it to further contributions.
pub async fn finalize_case(
    case_id: &CaseId,
    pool: &PgPool,
) -> Result<responses::Case, StoreError> {
    read_case_row(case_id, pool).await?;
    sqlx::query("UPDATE cases SET is_finalized = true WHERE id = $1")
        .bind(case_id)
        .execute(pool)
        .await?;
    read_case(case_id, pool).await
}

/// Delete a case. Contribution rows survive with their `case_id` cleared
/// (the FK is ON DELETE SET NULL), so the ledger is unaffected.
pub async fn delete_case(
    case_id: &CaseId,
    pool: &PgPool,
) -> Result<(), StoreError> {
    let result = sqlx::query("DELETE FROM cases WHERE id = $1")
        .bind(case_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::CaseNotFound);
    }
    Ok(())
}
