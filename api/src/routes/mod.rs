pub mod accounts;
pub mod cases;
pub mod fees;
pub mod ledger;
pub mod login;
pub mod members;
pub mod settings;

use actix_identity::Identity;
use actix_web::{
    HttpResponse, Responder, ResponseError, body::BoxBody,
    dev::HttpServiceFactory, get, web,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::store::{self, StoreError};

pub fn api_services() -> impl HttpServiceFactory {
    web::scope("/api")
        .service(health_check)
        .service(login::login)
        .service(login::login_check)
        .service(login::logout)
        .service(login::create_user)
        .service(login::user_profile)
        .service(members::register_member)
        .service(members::get_member)
        .service(members::list_members)
        .service(members::update_member)
        .service(members::create_residence)
        .service(members::list_residences)
        .service(members::create_dependant)
        .service(members::list_dependants)
        .service(ledger::get_wallet_balance)
        .service(ledger::list_member_transactions)
        .service(accounts::get_account_view)
        .service(accounts::list_suspense)
        .service(cases::create_case)
        .service(cases::get_case)
        .service(cases::list_cases)
        .service(cases::update_case)
        .service(cases::activate_case)
        .service(cases::finalize_case)
        .service(cases::delete_case)
        .service(fees::collect_fee)
        .service(fees::collect_renewal_fees)
        .service(fees::collect_contribution)
        .service(fees::fund_wallet)
        .service(fees::create_transfer)
        .service(fees::resolve_suspense)
        .service(settings::get_settings)
        .service(settings::update_settings)
}

#[get("/health_check")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("healthy")
}

#[derive(Debug, thiserror::Error)]
pub enum APIError {
    #[error("Authentication failed")]
    AuthError(#[source] anyhow::Error),
    #[error("Bad request")]
    BadRequest(#[source] anyhow::Error),
    #[error("Not found")]
    NotFound(#[source] anyhow::Error),
    #[error("Something went wrong")]
    UnexpectedError(#[from] anyhow::Error),
}

impl ResponseError for APIError {
    fn error_response(&self) -> HttpResponse<BoxBody> {
        match self {
            Self::AuthError(e) => {
                HttpResponse::Unauthorized().body(format!("{self}: {e}"))
            }
            Self::BadRequest(e) => {
                HttpResponse::BadRequest().body(format!("{self}: {e}"))
            }
            Self::NotFound(e) => {
                HttpResponse::NotFound().body(format!("{self}: {e}"))
            }
            Self::UnexpectedError(_) => {
                HttpResponse::InternalServerError().body(self.to_string())
            }
        }
    }
}

impl From<StoreError> for APIError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Database(_) => APIError::UnexpectedError(e.into()),
            StoreError::RequiresAdminPermissions => APIError::AuthError(e.into()),
            StoreError::UserNotFound => APIError::NotFound(e.into()),
            StoreError::MemberNotFound => APIError::NotFound(e.into()),
            StoreError::ResidenceNotFound => APIError::NotFound(e.into()),
            StoreError::DependantNotFound => APIError::NotFound(e.into()),
            StoreError::CaseNotFound => APIError::NotFound(e.into()),
            StoreError::TransactionNotFound => APIError::NotFound(e.into()),
            StoreError::SuspenseNotFound => APIError::NotFound(e.into()),
            _ => APIError::BadRequest(e.into()),
        }
    }
}

fn get_user_id(user: &Identity) -> Result<payloads::UserId, APIError> {
    let id_str = user.id().map_err(|e| {
        APIError::AuthError(
            anyhow::Error::from(e).context("Invalid login session"),
        )
    })?;
    // special case: since this is used in so many routes, the user_id is
    // recorded here, but attaches to the span for the api route itself
    tracing::Span::current()
        .record("user_id", tracing::field::display(&id_str));
    Ok(payloads::UserId(
        Uuid::parse_str(&id_str).map_err(anyhow::Error::from)?,
    ))
}

/// Resolve the session to a user row, verifying the admin role.
async fn require_admin(
    user: &Identity,
    pool: &PgPool,
) -> Result<store::User, APIError> {
    let user_id = get_user_id(user)?;
    Ok(store::ensure_admin(&user_id, pool).await?)
}

/// Resolve the session to a user row; any role suffices.
async fn require_user(
    user: &Identity,
    pool: &PgPool,
) -> Result<store::User, APIError> {
    let user_id = get_user_id(user)?;
    Ok(store::read_user(pool, &user_id).await?)
}
