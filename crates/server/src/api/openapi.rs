//! OpenAPI/Utoipa configuration.

use crate::api::{consent::CONSENT_TAG, health::MISC_TAG, userinfo::USERINFO_TAG};
use utoipa::{
    Modify, OpenApi,
    openapi::{
        Components,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};

/// Security addon for OpenAPI documentation.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Components::new);
        let bearer = HttpBuilder::new()
            .scheme(HttpAuthScheme::Bearer)
            .description(Some(
                "Access token issued by the authorization server. Checked by introspection.",
            ))
            .build();
        components.add_security_scheme("bearer_auth", SecurityScheme::Http(bearer));
    }
}

/// OpenAPI documentation configuration.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Consent Bridge API",
        version = "1.0.0",
        description = "Consent confirmation and userinfo endpoints in front of an OAuth2 authorization server."
    ),
    tags(
        (name = MISC_TAG, description = "Miscellaneous endpoints"),
        (name = CONSENT_TAG, description = "Browser-facing consent flow"),
        (name = USERINFO_TAG, description = "OpenID Connect endpoints")
    )
)]
pub struct ApiDoc;
