use std::future::Future;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{csv, health, material, AppState};

/// The full HTTP surface over one table
pub fn app(state: AppState, api: &ApiConfig) -> Router {
    let router = Router::new()
        .route("/health", get(health::health))
        .merge(material_routes())
        .merge(csv_routes())
        .layer(DefaultBodyLimit::max(api.max_upload_bytes))
        .with_state(state);

    if api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

fn material_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(material::list_all))
        .route("/columns", get(material::list_columns))
        .route(
            "/material",
            get(material::search)
                .post(material::create)
                .put(material::update),
        )
        .route(
            "/material/:id",
            get(material::get_by_id).delete(material::delete_by_id),
        )
}

fn csv_routes() -> Router<AppState> {
    Router::new()
        .route("/appendcsv", post(csv::append_csv))
        .route("/importcsv", post(csv::import_csv))
}

/// Serve the app on an already bound listener until `shutdown` resolves
pub async fn serve<F>(
    listener: TcpListener,
    state: AppState,
    api: &ApiConfig,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app(state, api))
        .with_graceful_shutdown(shutdown)
        .await
}
