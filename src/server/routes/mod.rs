//! HTTP routes for the boardxfer server

pub mod boards;
pub mod connection;
pub mod health;
pub mod transfer;

use serde_json::json;
use std::convert::Infallible;
use warp::Filter;
use warp::http::StatusCode;

use crate::server::app::SharedState;

/// Upper bound for JSON request bodies
pub const JSON_BODY_LIMIT: u64 = 64 * 1024;

/// Create all server routes
pub fn create_routes(
    state: SharedState,
) -> impl Filter<Extract = impl warp::Reply, Error = Infallible> + Clone {
    connection::create_connection_routes(state.clone())
        .or(transfer::create_transfer_routes(state.clone()))
        .or(boards::create_board_routes(state))
        .or(health::create_health_route())
        .recover(handle_rejection)
}

/// Helper function to pass server state to handlers
pub(crate) fn with_state(
    state: SharedState,
) -> impl Filter<Extract = (SharedState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Turn rejections into JSON `{success: false, message}` replies
async fn handle_rejection(err: warp::Rejection) -> Result<impl warp::Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            "Upload exceeds the configured size limit".to_string(),
        )
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e))
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed".to_string(),
        )
    } else {
        log::warn!("Unhandled rejection: {:?}", err);
        (StatusCode::BAD_REQUEST, format!("{:?}", err))
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&json!({ "success": false, "message": message })),
        status,
    ))
}
