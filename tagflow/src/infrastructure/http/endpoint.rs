// /////////////////////////////////////////////////////////////////////////////
// Tagflow
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Dashboard HTTP Server
//!
//! A lightweight read-only HTTP server exposing the observability store as
//! JSON, plus a Prometheus scrape endpoint and a small HTML dashboard. It
//! runs on its own tokio tasks so request serving never competes with the
//! routing engine for a scheduling context.
//!
//! ## Endpoints
//!
//! - `GET /` - service banner and endpoint index
//! - `GET /stats` - per-stage counters, memory snapshot, summary totals,
//!   and file-queue state
//! - `GET /trace?limit&search&processor&tag` - filtered traces
//!   (`limit` clamped to 1..=1000, default 100)
//! - `GET /errors?limit` - recent errors (`limit` clamped to 1..=500,
//!   default 50)
//! - `GET /processors` - stage listing with `active`/`idle` status
//! - `GET /health` - liveness, memory, queue sizes
//! - `GET /dashboard` - embedded HTML view
//! - `GET /metrics` - Prometheus text exposition
//!
//! All endpoints are read-only; state mutation only happens through the
//! engine and the daemon. Handler failures return 500 with a JSON detail
//! and never take the server down. Timestamps on the wire are
//! floating-point seconds since the epoch.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use tagflow_domain::time::now_epoch_secs;
use tagflow_domain::FlowError;

use crate::infrastructure::metrics::service::MetricsService;
use crate::infrastructure::metrics::store::MetricsStore;
use crate::infrastructure::watch::layout::{QueueCounts, QueueLayout};

const DASHBOARD_HTML: &str = include_str!("dashboard.html");

/// Shared, immutable server context.
struct ServerState {
    store: Arc<MetricsStore>,
    metrics: Option<Arc<MetricsService>>,
    layout: Option<QueueLayout>,
    started_at: Instant,
}

/// A rendered HTTP response.
struct HttpResponse {
    status: u16,
    reason: &'static str,
    content_type: &'static str,
    body: String,
}

impl HttpResponse {
    fn json(status: u16, reason: &'static str, value: serde_json::Value) -> Self {
        Self {
            status,
            reason,
            content_type: "application/json",
            body: value.to_string(),
        }
    }

    fn ok_json(value: serde_json::Value) -> Self {
        Self::json(200, "OK", value)
    }

    fn not_found() -> Self {
        Self::json(404, "Not Found", json!({"detail": "Not Found"}))
    }

    fn method_not_allowed() -> Self {
        Self::json(405, "Method Not Allowed", json!({"detail": "only GET is supported"}))
    }

    fn server_error(err: &FlowError) -> Self {
        Self::json(
            500,
            "Internal Server Error",
            json!({"detail": format!("{}", err)}),
        )
    }

    fn into_bytes(self) -> Vec<u8> {
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.status,
            self.reason,
            self.content_type,
            self.body.len(),
            self.body
        )
        .into_bytes()
    }
}

/// The observability HTTP server. Bind first (so callers can learn the
/// local address), then `serve` forever on a spawned task.
pub struct DashboardServer {
    listener: TcpListener,
    state: Arc<ServerState>,
}

impl DashboardServer {
    /// Binds the server socket.
    ///
    /// `layout` enables the file-queue section of `/stats` and `/health`
    /// in watch mode; `metrics` enables `/metrics`.
    pub async fn bind(
        addr: &str,
        store: Arc<MetricsStore>,
        metrics: Option<Arc<MetricsService>>,
        layout: Option<QueueLayout>,
    ) -> Result<Self, FlowError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| FlowError::io_error(format!("failed to bind dashboard endpoint '{}': {}", addr, e)))?;
        Ok(Self {
            listener,
            state: Arc::new(ServerState {
                store,
                metrics,
                layout,
                started_at: Instant::now(),
            }),
        })
    }

    /// The locally bound address (useful when binding port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, FlowError> {
        self.listener
            .local_addr()
            .map_err(|e| FlowError::io_error(format!("failed to read local address: {}", e)))
    }

    /// Accepts connections forever, one task per connection.
    pub async fn serve(self) -> Result<(), FlowError> {
        if let Ok(addr) = self.local_addr() {
            info!("Dashboard started on http://{}/dashboard", addr);
        }
        loop {
            match self.listener.accept().await {
                Ok((mut stream, _)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_request(&mut stream, state).await {
                            error!("Error handling dashboard request: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }
}

/// Reads one request, routes it, and writes the response.
async fn handle_request(
    stream: &mut TcpStream,
    state: Arc<ServerState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut buffer = [0u8; 8192];
    let n = stream.read(&mut buffer).await?;
    let request = String::from_utf8_lossy(&buffer[..n]);
    let request_line = request.lines().next().unwrap_or("");
    debug!("Received request: {}", request_line);

    let response = match parse_request_line(request_line) {
        Some(("GET", target)) => {
            let (path, query) = match target.split_once('?') {
                Some((path, query)) => (path, query),
                None => (target, ""),
            };
            route(path, &parse_query(query), &state)
        }
        Some((_, _)) => HttpResponse::method_not_allowed(),
        None => HttpResponse::not_found(),
    };

    stream.write_all(&response.into_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

/// Splits `"GET /path HTTP/1.1"` into method and target.
fn parse_request_line(line: &str) -> Option<(&str, &str)> {
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    Some((method, target))
}

/// Dispatches one GET request. Handlers are synchronous; every failure
/// becomes a 500.
fn route(path: &str, params: &HashMap<String, String>, state: &ServerState) -> HttpResponse {
    let result = match path {
        "/" => root(state),
        "/stats" => stats(state),
        "/trace" => traces(state, params),
        "/errors" => errors(state, params),
        "/processors" => processors(state),
        "/health" => health(state),
        "/dashboard" => {
            return HttpResponse {
                status: 200,
                reason: "OK",
                content_type: "text/html; charset=utf-8",
                body: DASHBOARD_HTML.to_string(),
            };
        }
        "/metrics" => return prometheus_metrics(state),
        _ => return HttpResponse::not_found(),
    };
    match result {
        Ok(value) => HttpResponse::ok_json(value),
        Err(err) => {
            error!("Dashboard handler for '{}' failed: {}", path, err);
            HttpResponse::server_error(&err)
        }
    }
}

fn root(state: &ServerState) -> Result<serde_json::Value, FlowError> {
    Ok(json!({
        "service": "Tagflow Dashboard",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Real-time observability for the tagflow routing engine",
        "endpoints": {
            "stats": "/stats - stage statistics with memory metrics",
            "trace": "/trace - line traces with search and filtering",
            "errors": "/errors - recent error log",
            "processors": "/processors - stage listing with status",
            "health": "/health - service health check",
            "dashboard": "/dashboard - HTML dashboard",
            "metrics": "/metrics - Prometheus exposition",
        },
        "trace_enabled": state.store.trace_enabled(),
        "timestamp": now_epoch_secs(),
    }))
}

fn queue_counts(state: &ServerState) -> Result<QueueCounts, FlowError> {
    match &state.layout {
        Some(layout) => layout.counts(),
        None => Ok(QueueCounts::default()),
    }
}

fn stats(state: &ServerState) -> Result<serde_json::Value, FlowError> {
    let stages = state.store.get_stats();
    let memory = state.store.get_memory();
    let activity = state.store.get_file_activity(10);
    let counts = queue_counts(state)?;

    let total_lines: u64 = stages.values().map(|m| m.count).sum();
    let total_errors: u64 = stages.values().map(|m| m.errors).sum();
    let total_time: f64 = stages.values().map(|m| m.total_time).sum();

    Ok(json!({
        "timestamp": now_epoch_secs(),
        "processors": serde_json::to_value(&stages)?,
        "memory": serde_json::to_value(&memory)?,
        "summary": {
            "total_processors": stages.len(),
            "total_lines_processed": total_lines,
            "total_errors": total_errors,
            "total_processing_time": total_time,
            "avg_processing_time": total_time / (total_lines.max(1) as f64),
            "memory_usage_mb": memory.current_memory_mb,
            "memory_growth_mb": memory.memory_growth_mb,
        },
        "file_queue": {
            "unprocessed": counts.unprocessed,
            "underprocess": counts.underprocess,
            "processed": counts.processed,
            "current_file": activity.current_file,
            "last_processed": serde_json::to_value(&activity.last_processed)?,
        },
    }))
}

fn traces(state: &ServerState, params: &HashMap<String, String>) -> Result<serde_json::Value, FlowError> {
    let limit = clamped_limit(params.get("limit"), 100, 1000);
    let search = params.get("search").map(String::as_str);
    let processor = params.get("processor").map(String::as_str);
    let tag = params.get("tag").map(String::as_str);

    let traces = state.store.get_traces(limit, search, processor, tag);
    Ok(json!({
        "timestamp": now_epoch_secs(),
        "traces": serde_json::to_value(&traces)?,
        "total_traces": traces.len(),
        "trace_enabled": state.store.trace_enabled(),
        "filters": {
            "limit": limit,
            "search": search.unwrap_or(""),
            "processor": processor.unwrap_or(""),
            "tag": tag.unwrap_or(""),
        },
    }))
}

fn errors(state: &ServerState, params: &HashMap<String, String>) -> Result<serde_json::Value, FlowError> {
    let limit = clamped_limit(params.get("limit"), 50, 500);
    let errors = state.store.get_errors(limit);
    Ok(json!({
        "timestamp": now_epoch_secs(),
        "errors": serde_json::to_value(&errors)?,
        "total_errors": errors.len(),
        "limit": limit,
    }))
}

fn processors(state: &ServerState) -> Result<serde_json::Value, FlowError> {
    let processors = state.store.get_processors();
    let active = processors.iter().filter(|p| p.status == "active").count();
    let idle = processors.len() - active;
    Ok(json!({
        "timestamp": now_epoch_secs(),
        "processors": serde_json::to_value(&processors)?,
        "total_processors": processors.len(),
        "active_processors": active,
        "idle_processors": idle,
    }))
}

fn health(state: &ServerState) -> Result<serde_json::Value, FlowError> {
    let memory = state.store.get_memory();
    let counts = queue_counts(state)?;
    Ok(json!({
        "status": "healthy",
        "timestamp": now_epoch_secs(),
        "trace_enabled": state.store.trace_enabled(),
        "uptime_seconds": state.started_at.elapsed().as_secs_f64(),
        "memory": serde_json::to_value(&memory)?,
        "queue": serde_json::to_value(counts)?,
        "system_health": {
            "active_traces": memory.active_traces,
            "stored_traces": memory.stored_traces,
            "stored_errors": memory.stored_errors,
        },
    }))
}

fn prometheus_metrics(state: &ServerState) -> HttpResponse {
    match &state.metrics {
        Some(service) => match service.get_metrics() {
            Ok(text) => HttpResponse {
                status: 200,
                reason: "OK",
                content_type: "text/plain; version=0.0.4; charset=utf-8",
                body: text,
            },
            Err(err) => HttpResponse::server_error(&err),
        },
        None => HttpResponse::not_found(),
    }
}

/// Parses a `limit` parameter, falling back to `default` and clamping into
/// `1..=max`.
fn clamped_limit(raw: Option<&String>, default: usize, max: usize) -> usize {
    raw.and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
        .clamp(1, max)
}

/// Parses an `application/x-www-form-urlencoded` query string.
fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (percent_decode(key), percent_decode(value)),
            None => (percent_decode(pair), String::new()),
        })
        .collect()
}

/// Minimal percent-decoding: `+` to space and `%XX` byte escapes.
fn percent_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                let hi = (bytes[i + 1] as char).to_digit(16);
                let lo = (bytes[i + 2] as char).to_digit(16);
                match (hi, lo) {
                    (Some(hi), Some(lo)) => {
                        out.push((hi * 16 + lo) as u8);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::infrastructure::metrics::store::StoreLimits;

    fn state() -> ServerState {
        let store = Arc::new(
            MetricsStore::new(StoreLimits::default()).with_trace_enabled(true),
        );
        store.record_stage_metrics("start", 0.001, true);
        let id = store.start_trace("hello");
        store.add_trace_step(id, "start", "hello", "HELLO", vec!["end".to_string()], 0.001);
        store.complete_trace(id, "HELLO");
        store.record_error("router", "boom", None, Some("a line"));
        ServerState {
            store,
            metrics: Some(Arc::new(MetricsService::new().unwrap())),
            layout: None,
            started_at: Instant::now(),
        }
    }

    fn body_json(response: HttpResponse) -> serde_json::Value {
        assert_eq!(response.status, 200, "body: {}", response.body);
        serde_json::from_str(&response.body).unwrap()
    }

    #[test]
    fn test_root_lists_endpoints() {
        let value = body_json(route("/", &HashMap::new(), &state()));
        assert_eq!(value["service"], "Tagflow Dashboard");
        assert!(value["endpoints"]["stats"].as_str().unwrap().contains("/stats"));
    }

    #[test]
    fn test_stats_summarizes_stages() {
        let value = body_json(route("/stats", &HashMap::new(), &state()));
        assert_eq!(value["summary"]["total_lines_processed"], 1);
        // record_error bumped the router stage's error counter
        assert_eq!(value["summary"]["total_errors"], 1);
        assert_eq!(value["file_queue"]["unprocessed"], 0);
        assert!(value["processors"]["start"]["count"].is_number());
    }

    #[test]
    fn test_trace_endpoint_filters_and_clamps() {
        let st = state();
        let value = body_json(route("/trace", &parse_query("limit=5000&search=hello"), &st));
        assert_eq!(value["filters"]["limit"], 1000);
        assert_eq!(value["total_traces"], 1);

        let none = body_json(route("/trace", &parse_query("search=absent"), &st));
        assert_eq!(none["total_traces"], 0);
    }

    #[test]
    fn test_errors_endpoint() {
        let value = body_json(route("/errors", &parse_query("limit=0"), &state()));
        assert_eq!(value["limit"], 1);
        assert_eq!(value["errors"][0]["processor"], "router");
        assert_eq!(value["errors"][0]["line_content"], "a line");
    }

    #[test]
    fn test_processors_endpoint_reports_status() {
        let value = body_json(route("/processors", &HashMap::new(), &state()));
        assert_eq!(value["total_processors"], 2); // start + router
        assert_eq!(value["active_processors"], 1);
    }

    #[test]
    fn test_health_is_200() {
        let value = body_json(route("/health", &HashMap::new(), &state()));
        assert_eq!(value["status"], "healthy");
        assert_eq!(value["system_health"]["stored_errors"], 1);
    }

    #[test]
    fn test_dashboard_serves_html() {
        let response = route("/dashboard", &HashMap::new(), &state());
        assert_eq!(response.status, 200);
        assert!(response.content_type.starts_with("text/html"));
        assert!(response.body.contains("Tagflow Dashboard"));
    }

    #[test]
    fn test_metrics_serves_prometheus_text() {
        let response = route("/metrics", &HashMap::new(), &state());
        assert_eq!(response.status, 200);
        assert!(response.content_type.starts_with("text/plain"));
    }

    #[test]
    fn test_unknown_path_is_404() {
        let response = route("/nope", &HashMap::new(), &state());
        assert_eq!(response.status, 404);
    }

    #[test]
    fn test_parse_query_and_decode() {
        let params = parse_query("search=hello+world&tag=error&x=%2Fpath");
        assert_eq!(params["search"], "hello world");
        assert_eq!(params["tag"], "error");
        assert_eq!(params["x"], "/path");
        assert!(parse_query("").is_empty());
    }

    #[test]
    fn test_percent_decode_tolerates_malformed_escapes() {
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("a%zzb"), "a%zzb");
    }

    #[test]
    fn test_parse_request_line() {
        assert_eq!(parse_request_line("GET /stats HTTP/1.1"), Some(("GET", "/stats")));
        assert_eq!(parse_request_line(""), None);
    }
}
