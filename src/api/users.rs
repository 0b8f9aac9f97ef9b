use crate::{
    api::errors::ApiError,
    attendance::AttendanceService,
    auth::{auth::AuthUser, password::hash_password},
    model::user::User,
};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

const MISSING_FIELDS: &str = "Please fill all fields. Password is required for new users.";

#[derive(Deserialize, ToSchema)]
pub struct CreateUser {
    #[schema(example = "Alice")]
    pub name: String,
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "alice123")]
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateUser {
    #[schema(example = "Alice Nguyen")]
    pub name: String,
    #[schema(example = "alice")]
    pub username: String,
    /// Leave empty to keep the current password
    pub password: Option<String>,
}

fn hash(password: &str) -> Result<String, ApiError> {
    hash_password(password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        ApiError::internal_server_error("Failed to hash password")
    })
}

/// List employees
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All employee accounts", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn list_users(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let users: Vec<User> = service
        .store()
        .list_users()
        .await?
        .into_iter()
        .filter(|u| !u.is_admin())
        .collect();

    Ok(HttpResponse::Ok().json(users))
}

/// Add an employee
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "Employee created", body = Object),
        (status = 400, description = "Missing fields"),
        (status = 409, description = "Username already exists")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn create_user(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    payload: web::Json<CreateUser>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let name = payload.name.trim();
    let username = payload.username.trim();
    if name.is_empty() || username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request(MISSING_FIELDS));
    }

    let user = User::new_employee(name.to_string(), username.to_string(), hash(&payload.password)?);
    service.store().create_user(&user).await?;

    info!(user_id = %user.id, username, "Employee created");
    Ok(HttpResponse::Created().json(user))
}

/// Edit an employee
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    request_body = UpdateUser,
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Employee updated", body = Object),
        (status = 400, description = "Missing fields"),
        (status = 404, description = "No such user"),
        (status = 409, description = "Username already exists")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn update_user(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    path: web::Path<Uuid>,
    payload: web::Json<UpdateUser>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let id = path.into_inner();
    let name = payload.name.trim();
    let username = payload.username.trim();
    if name.is_empty() || username.is_empty() {
        return Err(ApiError::bad_request(MISSING_FIELDS));
    }

    let store = service.store();
    let mut user = store
        .find_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    user.name = name.to_string();
    user.username = username.to_string();
    // blank keeps the current password
    if let Some(password) = payload.password.as_deref().filter(|p| !p.is_empty()) {
        user.password_hash = hash(password)?;
    }
    if !store.update_profile(&user).await? {
        return Err(ApiError::not_found("User not found"));
    }

    // status may have moved since the read above
    let user = store
        .find_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!(user_id = %id, "Employee updated");
    Ok(HttpResponse::Ok().json(user))
}

/// Delete an employee; their attendance history is kept
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Employee deleted", body = Object, example = json!({
            "success": true,
            "message": "User deleted"
        })),
        (status = 400, description = "Cannot delete own account"),
        (status = 404, description = "No such user")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn delete_user(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let id = path.into_inner();
    if id == auth.user_id {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }

    if !service.store().delete_user(id).await? {
        return Err(ApiError::not_found("User not found"));
    }

    info!(user_id = %id, "Employee deleted");
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "User deleted"
    })))
}
