use axum::Router;
use axum::extract::OriginalUri;
use axum::handler::HandlerWithoutStateExt;
use axum::routing::get;
use bulwark_config::StaticFilesConfig;
use bulwark_core::AppError;
use tower_http::services::ServeDir;

use crate::failure::ApiError;

/// Root route and application routes, then static files, then 404
pub fn router(static_files: &StaticFilesConfig, routes: Router) -> Router {
    let router = Router::new()
        .route("/", get(root_handler))
        .merge(routes)
        .method_not_allowed_fallback(not_found);

    if static_files.enabled {
        let serve_dir = ServeDir::new(&static_files.dir)
            .call_fallback_on_method_not_allowed(true)
            .fallback(not_found.into_service());
        router.fallback_service(serve_dir)
    } else {
        router.fallback(not_found)
    }
}

/// Liveness check
pub async fn root_handler() -> &'static str {
    "Server working!"
}

/// Every request no route or file matched
pub async fn not_found(OriginalUri(uri): OriginalUri) -> ApiError {
    AppError::new(format!("Can't find {uri} route on this server!"), 404).into()
}
