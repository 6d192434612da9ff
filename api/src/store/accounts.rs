//! Virtual account views: named partitions of the transaction set.
//!
//! Direct accounts (registration, renewal, penalty, arrears) are a single
//! equality filter on `transaction_type`. The suspense account has two
//! independent definitions that predate this codebase and can disagree;
//! they are kept as explicitly versioned classifiers rather than merged
//! behind a fabricated guarantee of set-equality.

use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::HashSet;

use payloads::{AccountKind, MemberId, SuspenseClassifier, responses};

use super::{StoreError, Transaction, WrongMpesaTransaction, ledger};

/// One of the direct transaction partitions with its normalized total.
///
/// The total covers the whole partition; the transaction list is paged.
pub async fn account_view(
    kind: AccountKind,
    limit: i64,
    offset: i64,
    pool: &PgPool,
) -> Result<responses::AccountView, StoreError> {
    let transaction_type = kind.transaction_type();

    let amounts: Vec<Decimal> = sqlx::query_scalar(
        "SELECT amount FROM transactions WHERE transaction_type = $1",
    )
    .bind(transaction_type)
    .fetch_all(pool)
    .await?;
    let total = amounts
        .into_iter()
        .map(|amount| ledger::normalize(amount, transaction_type))
        .sum();

    let transactions = sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions
         WHERE transaction_type = $1
         ORDER BY created_at DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(transaction_type)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(responses::AccountView {
        kind,
        total,
        transactions: transactions.into_iter().map(Into::into).collect(),
    })
}

/// The member fields the V2 heuristic matches descriptions against.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MemberHandle {
    pub id: MemberId,
    pub member_number: String,
    pub name: String,
}

/// The V2 heuristic: a transaction counts as suspense iff its description
/// contains no digit AND it carries no recognizable member reference
/// (blank description, a member id that doesn't resolve, or no textual
/// match against any member's name, number or id).
///
/// Digit presence is an unconditional disqualifier, regardless of member
/// match status.
pub fn is_suspense_candidate(
    description: Option<&str>,
    member_resolves: bool,
    directory: &[MemberHandle],
) -> bool {
    let description = description.unwrap_or("").trim();
    if description.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    if description.is_empty() {
        return true;
    }
    if !member_resolves {
        return true;
    }
    let lower = description.to_lowercase();
    !directory.iter().any(|member| {
        lower.contains(&member.name.to_lowercase())
            || lower.contains(&member.member_number.to_lowercase())
            || lower.contains(&member.id.to_string())
    })
}

/// The suspense account under the requested classifier.
pub async fn suspense_view(
    classifier: SuspenseClassifier,
    pool: &PgPool,
) -> Result<responses::SuspenseView, StoreError> {
    match classifier {
        SuspenseClassifier::V1 => {
            // Rows the external M-Pesa reconciliation process flagged as
            // unmatched and nobody has resolved yet.
            let rows = sqlx::query_as::<_, WrongMpesaTransaction>(
                "SELECT * FROM wrong_mpesa_transactions
                 WHERE resolved_at IS NULL
                 ORDER BY created_at DESC",
            )
            .fetch_all(pool)
            .await?;
            Ok(responses::SuspenseView::V1 {
                entries: rows.into_iter().map(Into::into).collect(),
            })
        }
        SuspenseClassifier::V2 => {
            let transactions = sqlx::query_as::<_, Transaction>(
                "SELECT * FROM transactions ORDER BY created_at DESC",
            )
            .fetch_all(pool)
            .await?;
            let directory = sqlx::query_as::<_, MemberHandle>(
                "SELECT id, member_number, name FROM members",
            )
            .fetch_all(pool)
            .await?;
            let known_ids: HashSet<MemberId> =
                directory.iter().map(|m| m.id).collect();

            let entries = transactions
                .into_iter()
                .filter(|tx| {
                    let member_resolves = tx
                        .member_id
                        .map(|id| known_ids.contains(&id))
                        .unwrap_or(false);
                    is_suspense_candidate(
                        tx.description.as_deref(),
                        member_resolves,
                        &directory,
                    )
                })
                .map(Into::into)
                .collect();
            Ok(responses::SuspenseView::V2 { entries })
        }
    }
}
