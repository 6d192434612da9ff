use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    AccountKind, CaseId, IdempotencyKey, MemberId, Role, SuspenseClassifier,
};

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 30;
pub const NAME_MAX_LEN: usize = 255;
pub const PHONE_MAX_LEN: usize = 20;
pub const DESCRIPTION_MAX_LEN: usize = 500;

/// Validation result for usernames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsernameValidation {
    Valid,
    TooShort,
    TooLong,
    InvalidCharacters,
    MustStartWithLetter,
}

impl UsernameValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn error_message(&self) -> Option<&'static str> {
        match self {
            Self::Valid => None,
            Self::TooShort => Some("Username must be at least 3 characters"),
            Self::TooLong => Some("Username must be at most 30 characters"),
            Self::InvalidCharacters => Some(
                "Username can only contain letters, numbers, and underscores",
            ),
            Self::MustStartWithLetter => {
                Some("Username must start with a letter")
            }
        }
    }
}

/// Validate a username.
///
/// Rules:
/// - 3-30 characters
/// - ASCII letters, numbers, and underscores only
/// - Must start with a letter
pub fn validate_username(username: &str) -> UsernameValidation {
    if username.len() < USERNAME_MIN_LEN {
        return UsernameValidation::TooShort;
    }
    if username.len() > USERNAME_MAX_LEN {
        return UsernameValidation::TooLong;
    }

    let mut chars = username.chars();

    if let Some(first) = chars.next()
        && !first.is_ascii_alphabetic()
    {
        return UsernameValidation::MustStartWithLetter;
    }

    for c in chars {
        if !c.is_ascii_alphanumeric() && c != '_' {
            return UsernameValidation::InvalidCharacters;
        }
    }

    UsernameValidation::Valid
}

/// Validate a phone number: optional leading `+`, then 7-15 digits.
pub fn validate_phone(phone: &str) -> bool {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    (7..=15).contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit())
}

#[derive(Serialize, Deserialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterMember {
    pub details: crate::Member,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateMember {
    pub member_id: MemberId,
    pub details: crate::Member,
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListMembers {
    /// Case-insensitive match against name, member number or national id.
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateResidence {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateDependant {
    pub member_id: MemberId,
    pub name: String,
    pub relationship: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCase {
    pub details: crate::Case,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateCase {
    pub case_id: CaseId,
    pub details: crate::Case,
    pub is_active: bool,
    pub is_finalized: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListCases {
    pub active_only: bool,
    pub limit: i64,
    pub offset: i64,
}

/// Record a single fee payment. When `amount` is None the default from the
/// settings singleton applies.
#[derive(Debug, Serialize, Deserialize)]
pub struct CollectFee {
    pub member_id: MemberId,
    pub fee_type: AccountKind,
    pub amount: Option<Decimal>,
    pub idempotency_key: IdempotencyKey,
}

/// Charge every registered member the annual renewal fee. One operation
/// key covers the whole run: retrying with the same key is a no-op, a new
/// key charges everyone again.
#[derive(Debug, Serialize, Deserialize)]
pub struct CollectRenewalFees {
    pub amount: Option<Decimal>,
    pub idempotency_key: IdempotencyKey,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CollectContribution {
    pub member_id: MemberId,
    pub case_id: CaseId,
    pub amount: Decimal,
    pub idempotency_key: IdempotencyKey,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FundWallet {
    pub member_id: MemberId,
    pub amount: Decimal,
    pub mpesa_reference: Option<String>,
    pub idempotency_key: IdempotencyKey,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTransfer {
    pub from_member_id: MemberId,
    pub to_member_id: MemberId,
    pub amount: Decimal,
    pub note: Option<String>,
    pub idempotency_key: IdempotencyKey,
}

/// Attribute a flagged M-Pesa payment to a member, crediting their wallet
/// and marking the suspense row resolved.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveSuspense {
    pub suspense_id: crate::SuspenseId,
    pub member_id: MemberId,
    pub idempotency_key: IdempotencyKey,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetAccountView {
    pub kind: AccountKind,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListSuspense {
    pub classifier: SuspenseClassifier,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListMemberTransactions {
    pub member_id: MemberId,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListDependants {
    pub member_id: MemberId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateSettings {
    pub settings: crate::Settings,
}
