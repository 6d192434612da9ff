use actix_identity::Identity;
use actix_web::{HttpResponse, post, web};
use sqlx::PgPool;

use payloads::{MemberId, requests};

use crate::store;

use super::{APIError, require_user};

#[tracing::instrument(skip(user, request, pool))]
#[post("/register_member")]
pub async fn register_member(
    user: Identity,
    request: web::Json<requests::RegisterMember>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    require_user(&user, &pool).await?;
    let member_id = store::create_member(&request.details, &pool).await?;
    Ok(HttpResponse::Ok().json(member_id))
}

#[tracing::instrument(skip(user, pool))]
#[post("/get_member")]
pub async fn get_member(
    user: Identity,
    member_id: web::Json<MemberId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    require_user(&user, &pool).await?;
    let member = store::read_member(&member_id, &pool).await?;
    Ok(HttpResponse::Ok().json(member))
}

#[tracing::instrument(skip(user, request, pool))]
#[post("/list_members")]
pub async fn list_members(
    user: Identity,
    request: web::Json<requests::ListMembers>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    require_user(&user, &pool).await?;
    let members = store::list_members(&request, &pool).await?;
    Ok(HttpResponse::Ok().json(members))
}

#[tracing::instrument(skip(user, request, pool))]
#[post("/update_member")]
pub async fn update_member(
    user: Identity,
    request: web::Json<requests::UpdateMember>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    require_user(&user, &pool).await?;
    let member = store::update_member(&request, &pool).await?;
    Ok(HttpResponse::Ok().json(member))
}

#[tracing::instrument(skip(user, request, pool))]
#[post("/create_residence")]
pub async fn create_residence(
    user: Identity,
    request: web::Json<requests::CreateResidence>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    require_user(&user, &pool).await?;
    let residence_id = store::create_residence(&request.name, &pool).await?;
    Ok(HttpResponse::Ok().json(residence_id))
}

#[tracing::instrument(skip(user, pool))]
#[post("/list_residences")]
pub async fn list_residences(
    user: Identity,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    require_user(&user, &pool).await?;
    let residences = store::list_residences(&pool).await?;
    Ok(HttpResponse::Ok().json(residences))
}

#[tracing::instrument(skip(user, request, pool))]
#[post("/create_dependant")]
pub async fn create_dependant(
    user: Identity,
    request: web::Json<requests::CreateDependant>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    require_user(&user, &pool).await?;
    let dependant_id = store::create_dependant(&request, &pool).await?;
    Ok(HttpResponse::Ok().json(dependant_id))
}

#[tracing::instrument(skip(user, request, pool))]
#[post("/list_dependants")]
pub async fn list_dependants(
    user: Identity,
    request: web::Json<requests::ListDependants>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    require_user(&user, &pool).await?;
    let dependants =
        store::list_dependants(&request.member_id, &pool).await?;
    Ok(HttpResponse::Ok().json(dependants))
}
