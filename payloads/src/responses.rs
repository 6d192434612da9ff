use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    AccountKind, CaseId, DependantId, MemberId, ResidenceId, Role,
    SuspenseId, TransactionId, TransactionType, UserId,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
}

/// A member row with the ledger-derived wallet balance.
///
/// `wallet_balance` is always recomputed from the member's transactions;
/// the stored column is advisory only and never returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub member_id: MemberId,
    pub member_number: String,
    pub details: crate::Member,
    pub is_active: bool,
    pub wallet_balance: Decimal,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Residence {
    pub residence_id: ResidenceId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependant {
    pub dependant_id: DependantId,
    pub member_id: MemberId,
    pub name: String,
    pub relationship: String,
    pub created_at: Timestamp,
}

/// A ledger row. `normalized_amount` is the amount after the sign table is
/// applied; summing it per member yields the wallet balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: TransactionId,
    pub member_id: Option<MemberId>,
    pub case_id: Option<CaseId>,
    pub amount: Decimal,
    pub normalized_amount: Decimal,
    pub transaction_type: TransactionType,
    pub mpesa_reference: Option<String>,
    pub description: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletBalance {
    pub member_id: MemberId,
    pub balance: Decimal,
}

/// One of the named transaction partitions with its normalized total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountView {
    pub kind: AccountKind,
    pub total: Decimal,
    pub transactions: Vec<Transaction>,
}

/// An unresolved row from `wrong_mpesa_transactions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspenseTransaction {
    pub suspense_id: SuspenseId,
    pub mpesa_reference: String,
    pub sender_name: String,
    pub amount: Decimal,
    pub description: Option<String>,
    pub created_at: Timestamp,
}

/// The suspense account under one of the two classifier definitions. The
/// views are independent and may disagree; no set-equality is implied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "classifier", rename_all = "snake_case")]
pub enum SuspenseView {
    V1 { entries: Vec<SuspenseTransaction> },
    V2 { entries: Vec<Transaction> },
}

/// Funding progress, derived at read time. `expected_amount` tracks the
/// current member count and therefore drifts as membership changes;
/// `progress_percent` is not clamped and exceeds 100 for over-collected
/// cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseProgress {
    pub expected_amount: Decimal,
    pub actual_amount: Decimal,
    pub progress_percent: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub case_id: CaseId,
    pub case_number: i64,
    pub details: crate::Case,
    pub is_active: bool,
    pub is_finalized: bool,
    pub progress: CaseProgress,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub settings: crate::Settings,
    pub updated_at: Timestamp,
}

/// Outcome of a bulk renewal run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkRenewalResult {
    pub members_charged: usize,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessMessage {
    pub message: String,
}
