//! JSON API server for the dashboard.
//!
//! A lightweight sync HTTP server (`tiny_http`) exposing every view as
//! JSON. There is no HTML frontend; any chart or table UI consumes these
//! endpoints:
//!
//! - `GET /api/summary|status|aging|cost|customers|pareto|tickets`
//! - `GET /api/options`: filter choices
//! - `GET /api/health`
//! - `POST /api/refresh`: invalidate the fetch cache and reload
//!
//! Launched via `ncdash serve` (default: `http://127.0.0.1:8501`).

mod api;

use std::io::Cursor;

use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use tiny_http::{Header, Method, Response, Server, StatusCode};

use crate::dashboard::Dashboard;
use crate::logging;

pub use api::Reply;

const VIEW_ROUTES: [&str; 7] = ["summary", "status", "aging", "cost", "customers", "pareto", "tickets"];

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Serve the API on `addr`. Blocks the current thread.
///
/// Requests are handled sequentially, which is enough for a local
/// dashboard and lets every request share the dashboard's fetch cache.
/// A failing request gets a JSON error and never stops the server.
pub fn serve(mut dashboard: Dashboard, addr: &str) -> Result<()> {
    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    println!("ncdash API running at http://{addr}/api/summary");
    println!("Data source: {}", dashboard.describe());
    println!("Press Ctrl+C to stop.\n");

    for request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();

        let reply = dispatch(&mut dashboard, &method, &url, Local::now().naive_local())
            .unwrap_or_else(|e| Reply::error(500, format!("{e:#}")));

        let path = url.split('?').next().unwrap_or(&url);
        dashboard
            .log()
            .request(&dashboard.describe(), &format!("{method} {path}"), reply.status);
        if reply.status >= 500 {
            logging::warn(format!("{method} {url} -> {}", reply.status));
        }

        let _ = request.respond(into_response(&reply));

        // Brief access log
        println!(
            "{} {} {} {}",
            method,
            url,
            reply.status,
            Local::now().format("%H:%M:%S")
        );
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Dispatch a request to its handler. `now` is the clock views use unless
/// the query string overrides it.
pub fn dispatch(dashboard: &mut Dashboard, method: &Method, url: &str, now: NaiveDateTime) -> Result<Reply> {
    let path = url.split('?').next().unwrap_or(url);
    let route = path.strip_prefix("/api/").unwrap_or("").trim_end_matches('/');

    match (method, route) {
        (&Method::Get, "health") => api::get_health(dashboard),
        (&Method::Get, "options") => api::get_options(dashboard),
        (&Method::Post, "refresh") => api::post_refresh(dashboard),
        (&Method::Get, view) if VIEW_ROUTES.contains(&view) => api::get_view(dashboard, view, url, now),
        (_, "refresh") => Ok(Reply::error(405, "use POST /api/refresh")),
        _ => Ok(Reply::error(404, "not found")),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn into_response(reply: &Reply) -> Response<Cursor<Vec<u8>>> {
    let response = Response::from_data(reply.body.to_string().into_bytes())
        .with_status_code(StatusCode(reply.status));
    match content_type_json() {
        Some(header) => response.with_header(header),
        None => response,
    }
}

/// JSON content type header.
fn content_type_json() -> Option<Header> {
    Header::from_bytes("Content-Type", "application/json; charset=utf-8").ok()
}
