//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3 document served at `/api-docs/openapi.json`.

use axum::Json;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers::{
    AuthenticationOptionsRequest, AuthenticationVerifyRequest, HealthResponse,
    RegistrationOptionsRequest, RegistrationVerifyRequest, TokenRequest, VerifyResponse,
};

/// Passgate API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Passgate - Passkey Authority API",
        version = "0.1.0",
        description = r#"
## Passkey login with one-time code exchange

1. **Register** a passkey: `POST /webauthn/registration/options`, run
   `navigator.credentials.create()`, then `POST /webauthn/registration/verify`
2. **Authenticate**: `POST /webauthn/authentication/options`, run
   `navigator.credentials.get()`, then `POST /webauthn/authentication/verify`
   which returns a one-time `code` valid for 60 seconds
3. **Exchange** the code at `POST /oauth/token` for a Bearer token valid for one hour
4. Call `GET /api/user` with `Authorization: Bearer <token>`

Every error response is `{"error": "...", "code": "..."}`.
"#,
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:3001", description = "Local development server")
    ),
    tags(
        (name = "WebAuthn", description = "Passkey registration and authentication ceremonies"),
        (name = "Token", description = "One-time code to Bearer token exchange"),
        (name = "User", description = "Protected resources"),
        (name = "Health", description = "Service health endpoint")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::webauthn::registration_options,
        crate::handlers::webauthn::registration_verify,
        crate::handlers::webauthn::authentication_options,
        crate::handlers::webauthn::authentication_verify,
        crate::handlers::token::exchange_code,
        crate::handlers::user::current_user,
    ),
    components(
        schemas(
            HealthResponse,
            RegistrationOptionsRequest,
            RegistrationVerifyRequest,
            AuthenticationOptionsRequest,
            AuthenticationVerifyRequest,
            VerifyResponse,
            TokenRequest,
        )
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme used by protected paths
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// GET /api-docs/openapi.json
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
