//! Protected user endpoint

use axum::{extract::State, Json};
use passgate_core::UserProfile;

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/user
///
/// Profile of the Bearer token holder.
#[utoipa::path(
    get,
    path = "/api/user",
    tag = "User",
    responses(
        (status = 200, description = "JSON with username, id, credentialsCount and registeredAt"),
        (status = 401, description = "Missing, invalid or expired token"),
        (status = 404, description = "Token subject is not a known user")
    ),
    security(("bearer_auth" = []))
)]
pub async fn current_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state.authority.user_profile(&user.username)?;
    Ok(Json(profile))
}
