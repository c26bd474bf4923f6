//! Consent endpoints.
//!
//! - Consent page (GET) - shows what the application is requesting and issues the CSRF token
//! - Consent confirmation (POST) - reports the decision to the authorization backend

use crate::AppState;
use crate::consent::{ConfirmationRequest, ConsentForm, ConsentPrompt};
use crate::error::ConsentError;
use crate::response::{render_error_page, report};
use askama::Template;
use axum::{
    Form,
    extract::{Query, State, rejection::FormRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};

pub const CONSENT_TAG: &str = "Consent";

/// Scope information for display.
#[derive(Debug, Clone)]
pub struct ScopeInfo {
    pub name: String,
    pub description: String,
}

/// Get human-readable scope information.
fn get_scope_info(scope: &str) -> ScopeInfo {
    let (name, description) = match scope {
        "openid" => ("OpenID", "Verify your identity"),
        "email" => ("Email", "Access your email address"),
        "profile" => ("Profile", "Access your profile information"),
        "offline" | "offline_access" => ("Offline access", "Stay signed in when you are away"),
        _ => {
            return ScopeInfo {
                name: scope.to_string(),
                description: format!("Access to {}", scope),
            };
        }
    };
    ScopeInfo {
        name: name.to_string(),
        description: description.to_string(),
    }
}

#[derive(Template)]
#[template(path = "consent.html")]
struct ConsentTemplate<'a> {
    site_name: &'a str,
    client_name: &'a str,
    subject: &'a str,
    scopes: Vec<ScopeInfo>,
    csrf_token: &'a str,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ConsentQuery {
    /// Challenge the authorization server attached to the redirect.
    #[serde(default)]
    pub consent_challenge: String,
}

pub fn router() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(consent_page))
        .routes(routes!(consent_confirm))
}

/// Display the consent page.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/consent",
    tag = CONSENT_TAG,
    operation_id = "Consent Page",
    summary = "Display the consent page",
    description = "Looks up the consent challenge with the authorization server and renders the \
                   consent form. The form carries a single-use CSRF token bound to the challenge.\n\n\
                   If the authorization server reports that the user already consented and asked to \
                   be remembered, the request is accepted immediately and the browser is redirected.",
    params(ConsentQuery),
    responses(
        (status = 200, description = "Consent page HTML", content_type = "text/html"),
        (status = 307, description = "Consent previously remembered, redirect to the authorization server"),
        (status = 400, description = "Error page HTML if the challenge is missing", content_type = "text/html"),
        (status = 500, description = "Error page HTML if the challenge cannot be resolved", content_type = "text/html"),
    )
)]
pub async fn consent_page(
    State(state): State<AppState>,
    Query(query): Query<ConsentQuery>,
) -> Response {
    match state.consent.prepare(&query.consent_challenge).await {
        Ok(ConsentPrompt::Redirect(url)) => Redirect::temporary(&url).into_response(),
        Ok(ConsentPrompt::Form(form)) => render_consent_form(&state.site_name, &form),
        Err(e) => report(&e, &state.site_name),
    }
}

/// Handle consent form submission.
#[tracing::instrument(skip(state, form))]
#[utoipa::path(
    post,
    path = "/consent/confirm",
    tag = CONSENT_TAG,
    operation_id = "Consent Confirm",
    summary = "Submit a consent decision",
    description = "Consumes the CSRF token issued with the consent page and reports the decision to \
                   the authorization server. `accept` grants exactly the requested scopes and \
                   audiences; `reject` reports `rejected_by_user`.\n\n\
                   On success the browser is sent (307) to the URL returned by the authorization server.",
    request_body(
        content = ConfirmationRequest,
        content_type = "application/x-www-form-urlencoded",
        description = "Consent decision and CSRF token"
    ),
    responses(
        (status = 307, description = "Redirect to the authorization server"),
        (status = 400, description = "Error page HTML for an unparsable form or unknown action", content_type = "text/html"),
        (status = 500, description = "Error page HTML when the session or the authorization server fails", content_type = "text/html"),
    )
)]
pub async fn consent_confirm(
    State(state): State<AppState>,
    form: Result<Form<ConfirmationRequest>, FormRejection>,
) -> Response {
    tracing::debug!("Parsing request...");
    let request = match form {
        Ok(Form(request)) => request,
        Err(rejection) => {
            return report(
                &ConsentError::MalformedRequest(rejection.body_text()),
                &state.site_name,
            );
        }
    };

    match state.consent.confirm(request).await {
        Ok(url) => {
            tracing::debug!("User should now be redirecting to target URI.");
            Redirect::temporary(&url).into_response()
        }
        Err(e) => report(&e, &state.site_name),
    }
}

fn render_consent_form(site_name: &str, form: &ConsentForm) -> Response {
    let template = ConsentTemplate {
        site_name,
        client_name: form.request.client_display_name(),
        subject: &form.request.subject,
        scopes: form
            .request
            .requested_scope
            .iter()
            .map(|s| get_scope_info(s))
            .collect(),
        csrf_token: &form.csrf_token,
    };

    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Failed to render consent template: {}", e);
            render_error_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                site_name,
                "Failed to prepare consent form",
            )
        }
    }
}
