//! Shared API types for the welfare society portal.
//!
//! Newtype IDs wrap `uuid::Uuid` and implement `sqlx::Type` behind the
//! `use-sqlx` feature so the backend can bind them directly in queries
//! without reaching for the inner value.

pub mod api_client;
pub mod requests;
pub mod responses;

pub use api_client::{APIClient, ClientError, ok_body, ok_empty};

use derive_more::Display;
use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type, sqlx::FromRow))]
#[cfg_attr(feature = "use-sqlx", sqlx(transparent))]
pub struct UserId(pub Uuid);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type, sqlx::FromRow))]
#[cfg_attr(feature = "use-sqlx", sqlx(transparent))]
pub struct MemberId(pub Uuid);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type, sqlx::FromRow))]
#[cfg_attr(feature = "use-sqlx", sqlx(transparent))]
pub struct DependantId(pub Uuid);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type, sqlx::FromRow))]
#[cfg_attr(feature = "use-sqlx", sqlx(transparent))]
pub struct ResidenceId(pub Uuid);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type, sqlx::FromRow))]
#[cfg_attr(feature = "use-sqlx", sqlx(transparent))]
pub struct CaseId(pub Uuid);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type, sqlx::FromRow))]
#[cfg_attr(feature = "use-sqlx", sqlx(transparent))]
pub struct TransactionId(pub Uuid);

/// Id of a row in `wrong_mpesa_transactions` (an incoming payment the
/// external reconciliation process could not attribute to a member).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type, sqlx::FromRow))]
#[cfg_attr(feature = "use-sqlx", sqlx(transparent))]
pub struct SuspenseId(pub Uuid);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type, sqlx::FromRow))]
#[cfg_attr(feature = "use-sqlx", sqlx(transparent))]
pub struct OperationId(pub Uuid);

/// Client-generated key that makes a multi-row business operation safe to
/// retry. Two requests with the same key execute at most once.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type, sqlx::FromRow))]
#[cfg_attr(feature = "use-sqlx", sqlx(transparent))]
pub struct IdempotencyKey(pub Uuid);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "transaction_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Contribution,
    Disbursement,
    Registration,
    Renewal,
    Penalty,
    Arrears,
    WalletFunding,
    Mpesa,
    Suspense,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "case_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum CaseType {
    Education,
    Sickness,
    Death,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "member_gender", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "use-sqlx",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Clerk,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// A named, non-persisted partition of the transaction set. Also the set
/// of fee types a single collection can record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Registration,
    Renewal,
    Penalty,
    Arrears,
}

impl AccountKind {
    pub fn transaction_type(self) -> TransactionType {
        match self {
            AccountKind::Registration => TransactionType::Registration,
            AccountKind::Renewal => TransactionType::Renewal,
            AccountKind::Penalty => TransactionType::Penalty,
            AccountKind::Arrears => TransactionType::Arrears,
        }
    }

    /// Paying registration or penalty fees reactivates a lapsed member.
    pub fn reactivates_member(self) -> bool {
        matches!(self, AccountKind::Registration | AccountKind::Penalty)
    }
}

/// The two suspense-detection definitions in use. They are independent and
/// can disagree; callers must pick one explicitly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SuspenseClassifier {
    /// Rows the external M-Pesa reconciliation process already flagged as
    /// unmatched (`wrong_mpesa_transactions` with no resolution).
    V1,
    /// Legacy heuristic over the transactions table: digit-free
    /// description with no recognizable member reference.
    V2,
}

/// Member details as submitted at registration. The member number is
/// allocated server-side and the wallet balance is always derived from the
/// ledger, so neither appears here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub gender: Gender,
    pub national_id: String,
    pub phone: String,
    pub email: Option<String>,
    pub residence_id: Option<ResidenceId>,
    pub registration_date: Timestamp,
}

/// Case details as submitted at creation. The case number is allocated
/// server-side; expected/actual amounts are always derived at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub affected_member_id: MemberId,
    pub dependant_id: Option<DependantId>,
    pub case_type: CaseType,
    pub contribution_per_member: Decimal,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
}

/// The organization-wide settings singleton: default fee amounts and
/// organization metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub registration_fee: Decimal,
    pub renewal_fee: Decimal,
    pub penalty_fee: Decimal,
    pub organization_name: String,
    pub organization_phone: String,
}

/// Bridge for nullable timestamptz columns when deriving `FromRow`.
#[cfg(feature = "use-sqlx")]
#[derive(Debug, Clone, Copy, sqlx::Type)]
#[sqlx(transparent)]
pub struct OptionalTimestamp(pub Option<jiff_sqlx::Timestamp>);

#[cfg(feature = "use-sqlx")]
impl From<OptionalTimestamp> for Option<Timestamp> {
    fn from(x: OptionalTimestamp) -> Option<Timestamp> {
        x.0.map(|x| x.to_jiff())
    }
}
