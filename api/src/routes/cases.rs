use actix_identity::Identity;
use actix_web::{HttpResponse, post, web};
use sqlx::PgPool;

use payloads::{CaseId, requests};

use crate::store;

use super::{APIError, require_admin, require_user};

#[tracing::instrument(skip(user, request, pool))]
#[post("/create_case")]
pub async fn create_case(
    user: Identity,
    request: web::Json<requests::CreateCase>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    require_user(&user, &pool).await?;
    let case_id = store::cases::create_case(&request.details, &pool).await?;
    Ok(HttpResponse::Ok().json(case_id))
}

#[tracing::instrument(skip(user, pool))]
#[post("/get_case")]
pub async fn get_case(
    user: Identity,
    case_id: web::Json<CaseId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    require_user(&user, &pool).await?;
    let case = store::cases::read_case(&case_id, &pool).await?;
    Ok(HttpResponse::Ok().json(case))
}

#[tracing::instrument(skip(user, request, pool))]
#[post("/list_cases")]
pub async fn list_cases(
    user: Identity,
    request: web::Json<requests::ListCases>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    require_user(&user, &pool).await?;
    let cases = store::cases::list_cases(&request, &pool).await?;
    Ok(HttpResponse::Ok().json(cases))
}

#[tracing::instrument(skip(user, request, pool))]
#[post("/update_case")]
pub async fn update_case(
    user: Identity,
    request: web::Json<requests::UpdateCase>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    require_user(&user, &pool).await?;
    let case = store::cases::update_case(&request, &pool).await?;
    Ok(HttpResponse::Ok().json(case))
}

#[tracing::instrument(skip(user, pool))]
#[post("/activate_case")]
pub async fn activate_case(
    user: Identity,
    case_id: web::Json<CaseId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    require_user(&user, &pool).await?;
    let case = store::cases::activate_case(&case_id, &pool).await?;
    Ok(HttpResponse::Ok().json(case))
}

#[tracing::instrument(skip(user, pool))]
#[post("/finalize_case")]
pub async fn finalize_case(
    user: Identity,
    case_id: web::Json<CaseId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    require_user(&user, &pool).await?;
    let case = store::cases::finalize_case(&case_id, &pool).await?;
    Ok(HttpResponse::Ok().json(case))
}

/// Admin only: deleting a case removes the funding target but keeps the
/// contribution rows in the ledger.
#[tracing::instrument(skip(user, pool))]
#[post("/delete_case")]
pub async fn delete_case(
    user: Identity,
    case_id: web::Json<CaseId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    require_admin(&user, &pool).await?;
    store::cases::delete_case(&case_id, &pool).await?;
    Ok(HttpResponse::Ok().finish())
}
