use actix_identity::Identity;
use actix_web::{HttpResponse, post, web};
use sqlx::PgPool;

use payloads::{MemberId, requests, responses};

use crate::store;

use super::{APIError, require_user};

/// The ledger-derived balance; the stored column is never consulted.
#[tracing::instrument(skip(user, pool))]
#[post("/get_wallet_balance")]
pub async fn get_wallet_balance(
    user: Identity,
    member_id: web::Json<MemberId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    require_user(&user, &pool).await?;
    store::read_member_row(&member_id, &pool).await?;
    let balance = store::ledger::wallet_balance(&member_id, &pool).await?;
    Ok(HttpResponse::Ok().json(responses::WalletBalance {
        member_id: *member_id,
        balance,
    }))
}

#[tracing::instrument(skip(user, request, pool))]
#[post("/list_member_transactions")]
pub async fn list_member_transactions(
    user: Identity,
    request: web::Json<requests::ListMemberTransactions>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    require_user(&user, &pool).await?;
    let transactions = store::ledger::member_transactions(
        &request.member_id,
        request.limit,
        request.offset,
        &pool,
    )
    .await?;
    Ok(HttpResponse::Ok().json(transactions))
}
