//! Board and serial port listing routes

use log::error;
use serde_json::json;
use warp::Filter;
use warp::http::StatusCode;

use super::with_state;
use crate::models::responses::{BoardListResponse, BoardSummary, ServerInfo};
use crate::server::app::SharedState;

/// Create all board-related routes
pub fn create_board_routes(
    state: SharedState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let boards_list = boards_list_route(state.clone());
    let board_info = board_info_route(state.clone());
    let serial_ports = serial_ports_route(state);

    warp::path("api").and(boards_list.or(board_info).or(serial_ports))
}

/// GET /api/boards - List registered boards
fn boards_list_route(
    state: SharedState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("boards")
        .and(warp::get())
        .and(warp::path::end())
        .and(with_state(state))
        .and_then(list_boards_handler)
}

/// GET /api/boards/{id} - One registered board
fn board_info_route(
    state: SharedState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("boards")
        .and(warp::path::param::<String>())
        .and(warp::get())
        .and(warp::path::end())
        .and(with_state(state))
        .and_then(get_board_info_handler)
}

/// GET /api/serial-ports - Serial ports visible to the server
fn serial_ports_route(
    state: SharedState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("serial-ports")
        .and(warp::get())
        .and(warp::path::end())
        .and(with_state(state))
        .and_then(serial_ports_handler)
}

async fn list_boards_handler(state: SharedState) -> Result<impl warp::Reply, warp::Rejection> {
    let boards = state.registry.summaries();

    let hostname = hostname::get()
        .unwrap_or_else(|_| "boardxfer-server".into())
        .to_string_lossy()
        .to_string();

    let response = BoardListResponse {
        server_info: ServerInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            hostname,
            started_at: state.started_at,
            total_boards: boards.len(),
        },
        boards,
    };

    Ok(warp::reply::json(&response))
}

async fn get_board_info_handler(
    board_id: String,
    state: SharedState,
) -> Result<impl warp::Reply, warp::Rejection> {
    let summary = state
        .registry
        .summaries()
        .into_iter()
        .find(|summary: &BoardSummary| summary.id == board_id);

    match summary {
        Some(board) => Ok(warp::reply::with_status(
            warp::reply::json(&board),
            StatusCode::OK,
        )),
        None => Ok(warp::reply::with_status(
            warp::reply::json(&json!({
                "success": false,
                "message": format!("Board not found: {}", board_id),
            })),
            StatusCode::NOT_FOUND,
        )),
    }
}

async fn serial_ports_handler(state: SharedState) -> Result<impl warp::Reply, warp::Rejection> {
    let ports = tokio::task::spawn_blocking(move || state.registry.serial_ports())
        .await
        .map_err(anyhow::Error::from)
        .and_then(|result| result);

    match ports {
        Ok(ports) => Ok(warp::reply::with_status(
            warp::reply::json(&ports),
            StatusCode::OK,
        )),
        Err(e) => {
            error!("❌ Serial port enumeration failed: {:#}", e);
            Ok(warp::reply::with_status(
                warp::reply::json(&json!({
                    "success": false,
                    "message": format!("{:#}", e),
                })),
                StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}
