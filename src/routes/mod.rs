pub mod agents;
mod error;
pub mod health;
pub mod records;
pub mod signals;

use axum::{
    Router,
    routing::{get, post},
};
pub use error::ApiError;

use crate::AppState;

pub fn get_api_routes() -> Router<AppState> {
    Router::new().nest("/v1", api_v1_routes())
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/records/{id}/recover", get(records::recover))
        .route("/hosts/status", get(signals::host_status))
        .route(
            "/hosts/{host_id}/signals",
            get(signals::list).delete(signals::truncate),
        )
        .route(
            "/hosts/{host_id}/signals/{id}",
            get(signals::get).delete(signals::delete),
        )
        .route("/hosts/{host_id}/signals/{id}/notify", post(signals::notify))
        .route("/agents/{host_id}/ws", get(agents::ws_handler))
}
