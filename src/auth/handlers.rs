use crate::{
    api::errors::ApiError,
    attendance::AttendanceService,
    auth::{credentials::find_by_credentials, jwt::generate_access_token},
    config::Config,
    models::{LoginReqDto, LoginResponse},
};
use actix_web::{HttpResponse, web};
use tracing::{debug, error, info, instrument};

const INVALID_CREDENTIALS: &str = "Invalid username or password.";

/// Login
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in", body = Object, example = json!({
            "access_token": "eyJhbGciOi...",
            "user": {"id": "0190...", "name": "Alice", "username": "alice", "role": "EMPLOYEE", "status": "Checked Out", "last_check_in": null}
        })),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid username or password")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(service, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    service: web::Data<AttendanceService>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(ApiError::bad_request("Username or password required"));
    }

    let db_user = find_by_credentials(service.store(), &user.username, &user.password)
        .await?
        .ok_or_else(|| {
            info!("Invalid credentials");
            ApiError::unauthorized(INVALID_CREDENTIALS)
        })?;

    debug!(user_id = %db_user.id, "Generating access token");

    let access_token = generate_access_token(&db_user, &config.jwt_secret, config.access_token_ttl)
        .map_err(|e| {
            error!(error = %e, "Failed to sign access token");
            ApiError::internal_server_error("Failed to sign access token")
        })?;

    info!("Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        user: db_user,
    }))
}
