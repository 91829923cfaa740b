//! Connection probe route

use log::info;
use warp::Filter;

use super::{JSON_BODY_LIMIT, with_state};
use crate::models::responses::ConnectionTestResult;
use crate::server::app::SharedState;

/// POST /api/test-connection
pub fn create_connection_routes(
    state: SharedState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("api")
        .and(warp::path("test-connection"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(JSON_BODY_LIMIT))
        .and(warp::body::json())
        .and(with_state(state))
        .and_then(test_connection_handler)
}

/// Accepts an inline profile (`{"type": ...}`) or `{"board_id": ...}`
async fn test_connection_handler(
    body: serde_json::Value,
    state: SharedState,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = match state.registry.resolve_connection(&body) {
        Ok(profile) => {
            info!("🔎 Testing connection to {}", profile.describe());
            state.coordinator.test_connection(&profile).await
        }
        Err(e) => ConnectionTestResult::failed(format!("{:#}", e)),
    };

    Ok(warp::reply::json(&result))
}
