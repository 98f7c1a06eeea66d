//! Defines routes for the browsing proxy.
//!
//! ## Structure
//! - **Session endpoints**
//!   - `GET/POST /login` — render form / validate credentials
//!   - `GET  /logout`    — clear the session
//!
//! - **Views**
//!   - `GET /` — bucket list for the authenticated identity
//!
//! - **Object endpoints** (session-cookie authenticated)
//!   - `GET  /objects`  — one listing page (bucket, prefix, cursor)
//!   - `GET  /search`   — prefix search (bucket, q)
//!   - `GET  /download` — object bytes as an attachment (bucket, key)
//!   - `POST /upload`   — multipart form (file, bucket, prefix?)
//!   - `POST /delete`   — form (bucket, key)
//!
//! The router carries shared state (`StorageService`) to all handlers.

use crate::{
    handlers::{
        auth_handlers::{index, login, login_page, logout},
        health_handlers::healthz,
        object_handlers::{
            delete_object, download_object, list_objects, search_objects, upload_object,
        },
    },
    services::storage_service::StorageService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Upload request-body ceiling. Transfers are buffered whole in memory, so
/// this bound is the admission control for process memory.
const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// Build and return the router for all proxy routes.
pub fn routes() -> Router<StorageService> {
    Router::new()
        // health endpoint (mounted at root)
        .route("/healthz", get(healthz))
        // session endpoints
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
        // views
        .route("/", get(index))
        // object endpoints
        .route("/objects", get(list_objects))
        .route("/search", get(search_objects))
        .route("/download", get(download_object))
        .route(
            "/upload",
            post(upload_object).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/delete", post(delete_object))
}
