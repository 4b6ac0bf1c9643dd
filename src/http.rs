//! HTTP surface
//!
//! | Method | Path | Handler |
//! |---|---|---|
//! | POST | `/v1/ingestion/{tenantId}/kyc` | JSON KYC ingestion |
//! | POST | `/v2/ingestion/{tenantId}/kyc` | protobuf KYC ingestion |
//! | POST | `/v1/ingestion/{tenantId}/kycs`, `/kyt`, `/kyts` | accepted, no work done |
//! | GET | `/health`, `/` | liveness |
//!
//! Successful ingestions answer `{"requestId","userId"}`. Failures answer the
//! status from [`IngestError::status_code`] with `{"error","requestId"}`.

use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::ingest::{new_request_id, IngestPipeline, IngestReceipt};
use crate::wire::{decode_json, decode_protobuf};
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Per-request bounds taken from configuration
#[derive(Debug, Clone)]
pub struct RequestLimits {
    pub body_read_timeout: Duration,
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
}

impl From<&IngestConfig> for RequestLimits {
    fn from(config: &IngestConfig) -> Self {
        Self {
            body_read_timeout: config.body_read_timeout,
            request_timeout: config.request_timeout,
            max_body_bytes: config.max_body_bytes,
        }
    }
}

pub struct AppState {
    pipeline: IngestPipeline,
    limits: RequestLimits,
}

impl AppState {
    pub fn new(pipeline: IngestPipeline, limits: RequestLimits) -> Self {
        Self { pipeline, limits }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Protocol {
    Json,
    Protobuf,
}

#[derive(Debug, PartialEq, Eq)]
enum Route<'a> {
    Root,
    Health,
    Kyc { tenant_id: &'a str, protocol: Protocol },
    Unimplemented,
    NotFound,
}

fn route(path: &str) -> Route<'_> {
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    match segments.as_slice() {
        [""] => Route::Root,
        ["health"] => Route::Health,
        ["v1", "ingestion", tenant_id, "kyc"] if !tenant_id.is_empty() => Route::Kyc {
            tenant_id: *tenant_id,
            protocol: Protocol::Json,
        },
        ["v2", "ingestion", tenant_id, "kyc"] if !tenant_id.is_empty() => Route::Kyc {
            tenant_id: *tenant_id,
            protocol: Protocol::Protobuf,
        },
        ["v1", "ingestion", tenant_id, "kycs" | "kyt" | "kyts"] if !tenant_id.is_empty() => {
            Route::Unimplemented
        }
        _ => Route::NotFound,
    }
}

/// Dispatches one request
pub async fn handle_http_request<B>(
    state: Arc<AppState>,
    req: Request<B>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let path = req.uri().path().to_string();
    let method = req.method().clone();
    let response = match (&method, route(&path)) {
        (&Method::GET, Route::Root) => text(StatusCode::OK, "kyc-ingestion\n"),
        (&Method::GET, Route::Health) => text(StatusCode::OK, "ok\n"),
        (&Method::POST, Route::Kyc { tenant_id, protocol }) => {
            handle_kyc(&state, req, tenant_id, protocol).await
        }
        (&Method::POST, Route::Unimplemented) => text(StatusCode::OK, "ok\n"),
        (_, Route::NotFound) => text(StatusCode::NOT_FOUND, "not found\n"),
        _ => text(StatusCode::METHOD_NOT_ALLOWED, "method not allowed\n"),
    };

    Ok(response)
}

async fn handle_kyc<B>(
    state: &AppState,
    req: Request<B>,
    tenant_id: &str,
    protocol: Protocol,
) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let request_id = new_request_id();

    let receipt = match ingest_request(state, req, tenant_id, protocol, &request_id).await {
        Ok(receipt) => receipt,
        Err(e) => {
            // pipeline failures are already logged with their stage
            if e.status_code() != StatusCode::BAD_GATEWAY {
                warn!(request_id = %request_id, tenant_id = %tenant_id, error = %e, "Request rejected");
            }
            return error_response(&e, &request_id);
        }
    };

    match serde_json::to_vec(&receipt) {
        Ok(body) => json(StatusCode::OK, body),
        Err(e) => {
            let e = IngestError::from(e);
            error!(request_id = %request_id, error = %e, "Failed to serialize response");
            error_response(&e, &request_id)
        }
    }
}

async fn ingest_request<B>(
    state: &AppState,
    req: Request<B>,
    tenant_id: &str,
    protocol: Protocol,
    request_id: &str,
) -> Result<IngestReceipt>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let body = read_body(req.into_body(), &state.limits).await?;
    let record = match protocol {
        Protocol::Json => decode_json(&body)?,
        Protocol::Protobuf => decode_protobuf(&body)?,
    };

    tokio::time::timeout(
        state.limits.request_timeout,
        state.pipeline.ingest(tenant_id, record, request_id),
    )
    .await
    .map_err(|_| IngestError::RequestTimeout)?
}

async fn read_body<B>(body: B, limits: &RequestLimits) -> Result<Bytes>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let collected = tokio::time::timeout(
        limits.body_read_timeout,
        Limited::new(body, limits.max_body_bytes).collect(),
    )
    .await
    .map_err(|_| IngestError::BodyReadTimeout)?;

    match collected {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(IngestError::PayloadTooLarge {
                limit: limits.max_body_bytes,
            })
        }
        Err(e) => Err(IngestError::BodyRead(e.to_string())),
    }
}

fn error_response(e: &IngestError, request_id: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": e.to_string(),
        "requestId": request_id,
    });
    match serde_json::to_vec(&body) {
        Ok(body) => json(e.status_code(), body),
        Err(_) => text(e.status_code(), ""),
    }
}

fn json(status: StatusCode, body: Vec<u8>) -> Response<Full<Bytes>> {
    respond(status, "application/json", Bytes::from(body))
}

fn text(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    respond(status, "text/plain", Bytes::from_static(body.as_bytes()))
}

fn respond(status: StatusCode, content_type: &'static str, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Accepts connections until `shutdown` resolves, then waits up to `grace`
/// for in-flight connections before aborting them
///
/// On shutdown every open connection finishes its current request and closes;
/// idle keep-alive connections close immediately.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
    grace: Duration,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let (stop_tx, stop_rx) = watch::channel(false);
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, remote_addr) = accepted?;
                let io = TokioIo::new(stream);
                let state = Arc::clone(&state);
                let mut stop = stop_rx.clone();

                connections.spawn(async move {
                    let service =
                        service_fn(move |req| handle_http_request(Arc::clone(&state), req));
                    let conn = http1::Builder::new().serve_connection(io, service);
                    tokio::pin!(conn);

                    let result = tokio::select! {
                        res = conn.as_mut() => res,
                        _ = stop.changed() => {
                            conn.as_mut().graceful_shutdown();
                            conn.await
                        }
                    };
                    if let Err(e) = result {
                        error!(remote_addr = %remote_addr, error = %e, "Connection error");
                    }
                });
            }
            _ = &mut shutdown => break,
        }

        while connections.try_join_next().is_some() {}
    }

    info!(in_flight = connections.len(), "Shutting down, draining connections");
    let _ = stop_tx.send(true);
    let drained = tokio::time::timeout(grace, async {
        while connections.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        warn!(remaining = connections.len(), "Graceful timeout elapsed, aborting connections");
        connections.abort_all();
    }
    Ok(())
}
