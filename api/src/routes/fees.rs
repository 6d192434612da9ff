use actix_identity::Identity;
use actix_web::{HttpResponse, post, web};
use sqlx::PgPool;

use payloads::requests;

use crate::store;
use crate::time::TimeSource;

use super::{APIError, require_admin, require_user};

#[tracing::instrument(skip(user, request, pool, time_source))]
#[post("/collect_fee")]
pub async fn collect_fee(
    user: Identity,
    request: web::Json<requests::CollectFee>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    require_user(&user, &pool).await?;
    let transaction =
        store::fees::collect_fee(&request, &time_source, &pool).await?;
    Ok(HttpResponse::Ok().json(transaction))
}

/// Admin only: the annual levy touches every member.
#[tracing::instrument(skip(user, request, pool, time_source))]
#[post("/collect_renewal_fees")]
pub async fn collect_renewal_fees(
    user: Identity,
    request: web::Json<requests::CollectRenewalFees>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    require_admin(&user, &pool).await?;
    let result =
        store::fees::collect_renewal_fees(&request, &time_source, &pool)
            .await?;
    Ok(HttpResponse::Ok().json(result))
}

#[tracing::instrument(skip(user, request, pool, time_source))]
#[post("/collect_contribution")]
pub async fn collect_contribution(
    user: Identity,
    request: web::Json<requests::CollectContribution>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    require_user(&user, &pool).await?;
    let transaction =
        store::fees::collect_contribution(&request, &time_source, &pool)
            .await?;
    Ok(HttpResponse::Ok().json(transaction))
}

#[tracing::instrument(skip(user, request, pool, time_source))]
#[post("/fund_wallet")]
pub async fn fund_wallet(
    user: Identity,
    request: web::Json<requests::FundWallet>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    require_user(&user, &pool).await?;
    let transaction =
        store::fees::fund_wallet(&request, &time_source, &pool).await?;
    Ok(HttpResponse::Ok().json(transaction))
}

#[tracing::instrument(skip(user, request, pool))]
#[post("/create_transfer")]
pub async fn create_transfer(
    user: Identity,
    request: web::Json<requests::CreateTransfer>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    require_user(&user, &pool).await?;
    store::fees::create_transfer(&request, &pool).await?;
    Ok(HttpResponse::Ok().finish())
}

#[tracing::instrument(skip(user, request, pool, time_source))]
#[post("/resolve_suspense")]
pub async fn resolve_suspense(
    user: Identity,
    request: web::Json<requests::ResolveSuspense>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    require_user(&user, &pool).await?;
    store::fees::resolve_suspense(&request, &time_source, &pool).await?;
    Ok(HttpResponse::Ok().finish())
}
