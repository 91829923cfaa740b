//! Health check route

use serde_json::json;
use warp::Filter;

/// GET /health
pub fn create_health_route()
-> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("health")
        .and(warp::get())
        .and(warp::path::end())
        .map(|| {
            warp::reply::json(&json!({
                "status": "healthy",
                "service": "boardxfer",
                "version": env!("CARGO_PKG_VERSION")
            }))
        })
}
