//! Database store for the welfare society portal.
//!
//! ## Design Decisions
//!
//! ### Sign convention
//! - **Debits are stored negative**: every member-debit row (registration,
//!   renewal, penalty, arrears, contribution) is written with a negative
//!   amount. The [`ledger::normalize`] sign table is additionally applied
//!   at every read boundary, so historical rows imported with the wrong
//!   sign still aggregate correctly.
//! - **Derived balances**: a member's wallet balance is always recomputed
//!   from their transaction rows. The `members.wallet_balance` column is
//!   advisory and never returned to callers.
//!
//! ### Idempotency
//! - **Operations table**: multi-row business operations (fee collection,
//!   bulk renewal, wallet funding, transfers) record a client-supplied
//!   idempotency key in the `operations` table inside the same database
//!   transaction as their writes. Re-running with a key that is already
//!   present returns the original outcome without inserting new rows.
//!
//! ### Database Triggers
//! - **Auto-updated timestamps**: triggers maintain `updated_at` columns,
//!   so application code doesn't set them.
//! - **Server-side allocation**: member numbers and case numbers come from
//!   database sequences (`insert_member` and `case_number_seq`), never
//!   from application counters.
//!
//! ### Type Safety
//! - **Newtype IDs with sqlx::Type**: all ID types implement `sqlx::Type`
//!   so they can be bound directly in queries without accessing the inner
//!   UUID value (`.0`).

use jiff::Timestamp;
use jiff_sqlx::{Timestamp as SqlxTs, ToSqlx};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;

use payloads::{
    CaseId, DependantId, Gender, MemberId, OperationId, OptionalTimestamp,
    ResidenceId, Role, SuspenseId, TransactionId, TransactionType, UserId,
    requests, responses,
};

pub mod accounts;
pub mod cases;
pub mod fees;
pub mod ledger;

/// A complete user row that stays in the backend.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
    #[sqlx(try_from = "SqlxTs")]
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, FromRow)]
pub struct Member {
    pub id: MemberId,
    pub member_number: String,
    pub name: String,
    pub gender: Gender,
    pub national_id: String,
    pub phone: String,
    pub email: Option<String>,
    pub residence_id: Option<ResidenceId>,
    #[sqlx(try_from = "SqlxTs")]
    pub registration_date: Timestamp,
    pub is_active: bool,
    /// Advisory only, see the module docs. Never returned to callers.
    pub wallet_balance: Decimal,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
    #[sqlx(try_from = "SqlxTs")]
    pub updated_at: Timestamp,
}

impl Member {
    /// Build the response form, with the balance derived from the ledger.
    pub fn into_response(self, wallet_balance: Decimal) -> responses::Member {
        responses::Member {
            member_id: self.id,
            member_number: self.member_number,
            details: payloads::Member {
                name: self.name,
                gender: self.gender,
                national_id: self.national_id,
                phone: self.phone,
                email: self.email,
                residence_id: self.residence_id,
                registration_date: self.registration_date,
            },
            is_active: self.is_active,
            wallet_balance,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Residence {
    pub id: ResidenceId,
    pub name: String,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
}

impl From<Residence> for responses::Residence {
    fn from(r: Residence) -> Self {
        Self {
            residence_id: r.id,
            name: r.name,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Dependant {
    pub id: DependantId,
    pub member_id: MemberId,
    pub name: String,
    pub relationship: String,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
}

impl From<Dependant> for responses::Dependant {
    fn from(d: Dependant) -> Self {
        Self {
            dependant_id: d.id,
            member_id: d.member_id,
            name: d.name,
            relationship: d.relationship,
            created_at: d.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Case {
    pub id: CaseId,
    pub case_number: i64,
    pub affected_member_id: MemberId,
    pub dependant_id: Option<DependantId>,
    pub case_type: payloads::CaseType,
    pub contribution_per_member: Decimal,
    #[sqlx(try_from = "SqlxTs")]
    pub start_date: Timestamp,
    #[sqlx(try_from = "SqlxTs")]
    pub end_date: Timestamp,
    pub is_active: bool,
    pub is_finalized: bool,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
    #[sqlx(try_from = "SqlxTs")]
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, FromRow)]
pub struct Transaction {
    pub id: TransactionId,
    pub member_id: Option<MemberId>,
    pub case_id: Option<CaseId>,
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    pub mpesa_reference: Option<String>,
    pub description: Option<String>,
    pub operation_id: Option<OperationId>,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
}

impl From<Transaction> for responses::Transaction {
    fn from(tx: Transaction) -> Self {
        let normalized_amount =
            ledger::normalize(tx.amount, tx.transaction_type);
        Self {
            transaction_id: tx.id,
            member_id: tx.member_id,
            case_id: tx.case_id,
            amount: tx.amount,
            normalized_amount,
            transaction_type: tx.transaction_type,
            mpesa_reference: tx.mpesa_reference,
            description: tx.description,
            created_at: tx.created_at,
        }
    }
}

/// An M-Pesa payment the external reconciliation process flagged as
/// unmatched.
#[derive(Debug, Clone, FromRow)]
pub struct WrongMpesaTransaction {
    pub id: SuspenseId,
    pub mpesa_reference: String,
    pub sender_name: String,
    pub amount: Decimal,
    pub description: Option<String>,
    #[sqlx(try_from = "OptionalTimestamp")]
    pub resolved_at: Option<Timestamp>,
    pub resolved_member_id: Option<MemberId>,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
}

impl From<WrongMpesaTransaction> for responses::SuspenseTransaction {
    fn from(row: WrongMpesaTransaction) -> Self {
        Self {
            suspense_id: row.id,
            mpesa_reference: row.mpesa_reference,
            sender_name: row.sender_name,
            amount: row.amount,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Settings {
    pub registration_fee: Decimal,
    pub renewal_fee: Decimal,
    pub penalty_fee: Decimal,
    pub member_number_seq: i64,
    pub organization_name: String,
    pub organization_phone: String,
    #[sqlx(try_from = "SqlxTs")]
    pub updated_at: Timestamp,
}

impl From<Settings> for responses::Settings {
    fn from(s: Settings) -> Self {
        Self {
            settings: payloads::Settings {
                registration_fee: s.registration_fee,
                renewal_fee: s.renewal_fee,
                penalty_fee: s.penalty_fee,
                organization_name: s.organization_name,
                organization_phone: s.organization_phone,
            },
            updated_at: s.updated_at,
        }
    }
}

// --- users ---

pub async fn create_user(
    pool: &PgPool,
    username: &str,
    role: Role,
    password_hash: &str,
) -> Result<User, StoreError> {
    if !requests::validate_username(username).is_valid() {
        return Err(StoreError::InvalidUsername);
    }
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (username, role, password_hash)
            VALUES ($1, $2, $3)
            RETURNING *;",
    )
    .bind(username)
    .bind(role)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;
    Ok(user)
}

pub async fn read_user(pool: &PgPool, id: &UserId) -> Result<User, StoreError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1;")
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => StoreError::UserNotFound,
            e => StoreError::Database(e),
        })
}

pub async fn user_count(pool: &PgPool) -> Result<i64, StoreError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Error unless the user exists and holds the admin role.
pub async fn ensure_admin(
    user_id: &UserId,
    pool: &PgPool,
) -> Result<User, StoreError> {
    let user = read_user(pool, user_id).await?;
    if !user.role.is_admin() {
        return Err(StoreError::RequiresAdminPermissions);
    }
    Ok(user)
}

// --- members ---

fn validate_member_details(
    details: &payloads::Member,
) -> Result<(), StoreError> {
    if details.name.len() > requests::NAME_MAX_LEN
        || details.national_id.len() > requests::NAME_MAX_LEN
    {
        return Err(StoreError::FieldTooLong);
    }
    if details.phone.len() > requests::PHONE_MAX_LEN {
        return Err(StoreError::FieldTooLong);
    }
    if !requests::validate_phone(&details.phone) {
        return Err(StoreError::InvalidPhone);
    }
    Ok(())
}

/// Error unless the residence exists.
async fn ensure_residence_exists(
    id: &ResidenceId,
    pool: &PgPool,
) -> Result<(), StoreError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM residences WHERE id = $1)",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;
    if !exists {
        return Err(StoreError::ResidenceNotFound);
    }
    Ok(())
}

/// Register a member. The member number is allocated atomically by the
/// `insert_member` stored procedure.
pub async fn create_member(
    details: &payloads::Member,
    pool: &PgPool,
) -> Result<MemberId, StoreError> {
    validate_member_details(details)?;
    if let Some(residence_id) = &details.residence_id {
        ensure_residence_exists(residence_id, pool).await?;
    }
    let member_id: MemberId =
        sqlx::query_scalar("SELECT insert_member($1, $2, $3, $4, $5, $6, $7)")
            .bind(&details.name)
            .bind(details.gender)
            .bind(&details.national_id)
            .bind(&details.phone)
            .bind(&details.email)
            .bind(details.residence_id)
            .bind(details.registration_date.to_sqlx())
            .fetch_one(pool)
            .await?;
    Ok(member_id)
}

pub async fn read_member_row(
    id: &MemberId,
    pool: &PgPool,
) -> Result<Member, StoreError> {
    sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = $1;")
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => StoreError::MemberNotFound,
            e => StoreError::Database(e),
        })
}

pub async fn read_member(
    id: &MemberId,
    pool: &PgPool,
) -> Result<responses::Member, StoreError> {
    let row = read_member_row(id, pool).await?;
    let balance = ledger::wallet_balance(id, pool).await?;
    Ok(row.into_response(balance))
}

pub async fn update_member(
    request: &requests::UpdateMember,
    pool: &PgPool,
) -> Result<responses::Member, StoreError> {
    validate_member_details(&request.details)?;
    if let Some(residence_id) = &request.details.residence_id {
        ensure_residence_exists(residence_id, pool).await?;
    }
    let result = sqlx::query(
        "UPDATE members
         SET name = $1, gender = $2, national_id = $3, phone = $4,
             email = $5, residence_id = $6, registration_date = $7,
             is_active = $8
         WHERE id = $9",
    )
    .bind(&request.details.name)
    .bind(request.details.gender)
    .bind(&request.details.national_id)
    .bind(&request.details.phone)
    .bind(&request.details.email)
    .bind(request.details.residence_id)
    .bind(request.details.registration_date.to_sqlx())
    .bind(request.is_active)
    .bind(request.member_id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::MemberNotFound);
    }
    read_member(&request.member_id, pool).await
}

pub async fn list_members(
    request: &requests::ListMembers,
    pool: &PgPool,
) -> Result<Vec<responses::Member>, StoreError> {
    let rows = match &request.search {
        Some(search) => {
            let pattern = format!("%{search}%");
            sqlx::query_as::<_, Member>(
                "SELECT * FROM members
                 WHERE name ILIKE $1
                    OR member_number ILIKE $1
                    OR national_id ILIKE $1
                    OR phone ILIKE $1
                 ORDER BY member_number
                 LIMIT $2 OFFSET $3",
            )
            .bind(pattern)
            .bind(request.limit)
            .bind(request.offset)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Member>(
                "SELECT * FROM members
                 ORDER BY member_number
                 LIMIT $1 OFFSET $2",
            )
            .bind(request.limit)
            .bind(request.offset)
            .fetch_all(pool)
            .await?
        }
    };

    let ids: Vec<MemberId> = rows.iter().map(|m| m.id).collect();
    let mut balances = ledger::wallet_balances(&ids, pool).await?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let balance =
                balances.remove(&row.id).unwrap_or(Decimal::ZERO);
            row.into_response(balance)
        })
        .collect())
}

/// Current total member count, used for case funding targets.
pub async fn member_count(pool: &PgPool) -> Result<i64, StoreError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM members")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

// --- residences ---

pub async fn create_residence(
    name: &str,
    pool: &PgPool,
) -> Result<ResidenceId, StoreError> {
    if name.len() > requests::NAME_MAX_LEN {
        return Err(StoreError::FieldTooLong);
    }
    let id: ResidenceId = sqlx::query_scalar(
        "INSERT INTO residences (name) VALUES ($1) RETURNING id",
    )
    .bind(name)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn list_residences(
    pool: &PgPool,
) -> Result<Vec<responses::Residence>, StoreError> {
    let rows = sqlx::query_as::<_, Residence>(
        "SELECT * FROM residences ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

// --- dependants ---

pub async fn create_dependant(
    request: &requests::CreateDependant,
    pool: &PgPool,
) -> Result<DependantId, StoreError> {
    if request.name.len() > requests::NAME_MAX_LEN
        || request.relationship.len() > requests::NAME_MAX_LEN
    {
        return Err(StoreError::FieldTooLong);
    }
    // FK violation means the member doesn't exist
    read_member_row(&request.member_id, pool).await?;
    let id: DependantId = sqlx::query_scalar(
        "INSERT INTO dependants (member_id, name, relationship)
         VALUES ($1, $2, $3)
         RETURNING id",
    )
    .bind(request.member_id)
    .bind(&request.name)
    .bind(&request.relationship)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn list_dependants(
    member_id: &MemberId,
    pool: &PgPool,
) -> Result<Vec<responses::Dependant>, StoreError> {
    read_member_row(member_id, pool).await?;
    let rows = sqlx::query_as::<_, Dependant>(
        "SELECT * FROM dependants WHERE member_id = $1 ORDER BY name",
    )
    .bind(member_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

// --- settings ---

pub async fn get_settings(pool: &PgPool) -> Result<Settings, StoreError> {
    sqlx::query_as::<_, Settings>("SELECT * FROM settings WHERE id = true")
        .fetch_one(pool)
        .await
        .map_err(StoreError::Database)
}

pub async fn update_settings(
    settings: &payloads::Settings,
    pool: &PgPool,
) -> Result<Settings, StoreError> {
    if settings.organization_name.len() > requests::NAME_MAX_LEN {
        return Err(StoreError::FieldTooLong);
    }
    if settings.registration_fee < Decimal::ZERO
        || settings.renewal_fee < Decimal::ZERO
        || settings.penalty_fee < Decimal::ZERO
    {
        return Err(StoreError::AmountMustBePositive);
    }
    let updated = sqlx::query_as::<_, Settings>(
        "UPDATE settings
         SET registration_fee = $1, renewal_fee = $2, penalty_fee = $3,
             organization_name = $4, organization_phone = $5
         WHERE id = true
         RETURNING *",
    )
    .bind(settings.registration_fee)
    .bind(settings.renewal_fee)
    .bind(settings.penalty_fee)
    .bind(&settings.organization_name)
    .bind(&settings.organization_phone)
    .fetch_one(pool)
    .await?;
    Ok(updated)
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Admin permissions required")]
    RequiresAdminPermissions,
    #[error("Invalid username")]
    InvalidUsername,
    #[error("Invalid phone number")]
    InvalidPhone,
    #[error("Field too long")]
    FieldTooLong,
    #[error("Amount must be positive")]
    AmountMustBePositive,
    #[error("Amount required: no default fee is configured for this type")]
    AmountRequired,
    #[error("Insufficient funds")]
    InsufficientFunds,
    #[error("Cannot transfer to the same member")]
    TransferToSelf,
    #[error("Case is not active")]
    CaseNotActive,
    #[error("Case is finalized")]
    CaseFinalized,
    #[error("Suspense transaction already resolved")]
    SuspenseAlreadyResolved,
    #[error("User not found")]
    UserNotFound,
    #[error("Member not found")]
    MemberNotFound,
    #[error("Residence not found")]
    ResidenceNotFound,
    #[error("Dependant not found")]
    DependantNotFound,
    #[error("Case not found")]
    CaseNotFound,
    #[error("Transaction not found")]
    TransactionNotFound,
    #[error("Suspense transaction not found")]
    SuspenseNotFound,
    #[error("Unique constraint violation")]
    NotUnique(#[source] sqlx::Error),
    #[error("Database error")]
    Database(#[source] sqlx::Error),
    #[error("Unexpected error")]
    UnexpectedError(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e
            && db_err.is_unique_violation()
        {
            return StoreError::NotUnique(e);
        }
        StoreError::Database(e)
    }
}

/// Look up an operation by its idempotency key, if it has run before.
pub(crate) async fn existing_operation(
    key: payloads::IdempotencyKey,
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
) -> Result<Option<OperationId>, StoreError> {
    let existing: Option<OperationId> = sqlx::query_scalar(
        "SELECT id FROM operations WHERE idempotency_key = $1",
    )
    .bind(key)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(existing)
}

/// Record the operation so a retry with the same key becomes a no-op.
pub(crate) async fn record_operation(
    key: payloads::IdempotencyKey,
    operation_type: &str,
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
) -> Result<OperationId, StoreError> {
    let id: OperationId = sqlx::query_scalar(
        "INSERT INTO operations (idempotency_key, operation_type)
         VALUES ($1, $2)
         RETURNING id",
    )
    .bind(key)
    .bind(operation_type)
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}

/// Balances for the given members keyed by id, derived from the ledger.
pub(crate) fn fold_balances(
    transactions: Vec<Transaction>,
) -> HashMap<MemberId, Decimal> {
    let mut balances: HashMap<MemberId, Decimal> = HashMap::new();
    for tx in transactions {
        if let Some(member_id) = tx.member_id {
            *balances.entry(member_id).or_default() +=
                ledger::normalize(tx.amount, tx.transaction_type);
        }
    }
    balances
}
