//! REST API layer: route handlers, OpenAPI document, and router
//! composition.
//!
//! All endpoints are mounted at the root level.

pub mod handlers;

use axum::Router;

use crate::app_state::AppState;

/// OpenAPI document backing the Swagger UI.
#[cfg(feature = "swagger-ui")]
#[derive(utoipa::OpenApi)]
#[openapi(
    info(
        title = "pulse-gateway",
        description = "Real-time dashboard gateway: WebSocket presence, room fanout, and telemetry broadcast."
    ),
    paths(handlers::system::health_handler, handlers::system::stats_handler),
    tags((name = "System", description = "Health and gateway statistics"))
)]
struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
///
/// With the `swagger-ui` feature enabled the interactive documentation
/// is served at `/docs` and the raw document at `/api-docs/openapi.json`.
pub fn build_router() -> Router<AppState> {
    let router = Router::new().merge(handlers::routes());

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/docs")
                .url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
    };

    router
}
