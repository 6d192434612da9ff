use actix_identity::Identity;
use actix_web::{HttpResponse, post, web};
use sqlx::PgPool;

use payloads::requests;

use crate::store;

use super::{APIError, require_user};

#[tracing::instrument(skip(user, request, pool))]
#[post("/get_account_view")]
pub async fn get_account_view(
    user: Identity,
    request: web::Json<requests::GetAccountView>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    require_user(&user, &pool).await?;
    let view = store::accounts::account_view(
        request.kind,
        request.limit,
        request.offset,
        &pool,
    )
    .await?;
    Ok(HttpResponse::Ok().json(view))
}

#[tracing::instrument(skip(user, request, pool))]
#[post("/list_suspense")]
pub async fn list_suspense(
    user: Identity,
    request: web::Json<requests::ListSuspense>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    require_user(&user, &pool).await?;
    let view =
        store::accounts::suspense_view(request.classifier, &pool).await?;
    Ok(HttpResponse::Ok().json(view))
}
