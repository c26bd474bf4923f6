//! OpenID Connect UserInfo endpoint.

use crate::AppState;
use crate::response::{ErrorBody, report};
use crate::userinfo::extract_bearer_token;
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use utoipa_axum::{router::OpenApiRouter, routes};

pub const USERINFO_TAG: &str = "OpenID Connect";

pub fn router() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(userinfo))
}

#[tracing::instrument(skip(state, headers))]
#[utoipa::path(
    get,
    path = "/userinfo",
    tag = USERINFO_TAG,
    operation_id = "OpenID Connect UserInfo",
    summary = "Get the authenticated user's profile",
    description = "Introspects the bearer token with the authorization server and returns the \
                   upstream profile cached for its subject, with `email` set to the subject.\n\n\
                   **Authentication:** Include the access token as a Bearer token in the Authorization header.",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Upstream profile fields plus `email`", content_type = "application/json"),
        (status = 401, description = "No access token in the Authorization header", body = ErrorBody),
        (status = 403, description = "The access token is inactive", body = ErrorBody),
        (status = 500, description = "Introspection failed (JSON) or the profile lookup failed (HTML error page)", body = ErrorBody),
    )
)]
pub async fn userinfo(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let access_token = extract_bearer_token(&headers);

    match state.userinfo.resolve(&access_token).await {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(e) => report(&e, &state.site_name),
    }
}
