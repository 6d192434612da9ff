use actix_identity::Identity;
use actix_web::{HttpResponse, post, web};
use sqlx::PgPool;

use payloads::{requests, responses};

use crate::store;

use super::{APIError, require_admin, require_user};

#[tracing::instrument(skip(user, pool))]
#[post("/get_settings")]
pub async fn get_settings(
    user: Identity,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    require_user(&user, &pool).await?;
    let settings = store::get_settings(&pool).await?;
    Ok(HttpResponse::Ok().json(responses::Settings::from(settings)))
}

#[tracing::instrument(skip(user, request, pool))]
#[post("/update_settings")]
pub async fn update_settings(
    user: Identity,
    request: web::Json<requests::UpdateSettings>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    require_admin(&user, &pool).await?;
    let updated = store::update_settings(&request.settings, &pool).await?;
    Ok(HttpResponse::Ok().json(responses::Settings::from(updated)))
}
