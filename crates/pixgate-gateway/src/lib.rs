use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use pixgate_contracts::envelope::Envelope;
use pixgate_contracts::features::{Feature, DEFAULT_FEATURE_ID};
use pixgate_contracts::routes::{FEATURE_FIELD, FEATURE_HEADER, PROCESS_ROUTE};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::{debug, info, Instrument};
use uuid::Uuid;

pub mod config;
pub mod error;
pub mod upstream;

pub use config::GatewayConfig;
pub use error::GatewayError;

use upstream::{collect_fields, failure_envelope, success_envelope, ForwardField, UpstreamBody};

#[derive(Debug, Clone)]
pub struct GatewayState {
    config: Arc<GatewayConfig>,
    http: reqwest::Client,
}

impl GatewayState {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config: Arc::new(config),
            http: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

pub fn router(state: GatewayState) -> Router {
    let body_limit = state.config.body_limit;
    Router::new()
        .route(PROCESS_ROUTE, post(process))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub async fn serve(config: GatewayConfig) -> std::io::Result<()> {
    let listener = TcpListener::bind(&config.bind).await?;
    info!(
        bind = %listener.local_addr()?,
        api_base = %config.api_base,
        "gateway listening"
    );
    axum::serve(listener, router(GatewayState::new(config))).await
}

pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn process(State(state): State<GatewayState>, request: Request) -> Response {
    let trace_id = Uuid::new_v4();
    let span = tracing::info_span!("process", %trace_id);
    match handle_process(state, request).instrument(span).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

fn header_feature(headers: &HeaderMap) -> Option<String> {
    headers
        .get(FEATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn resolve_feature(raw: &str) -> Result<Feature, GatewayError> {
    Feature::from_id(raw).ok_or_else(|| GatewayError::UnknownFeature(raw.to_string()))
}

async fn handle_process(state: GatewayState, request: Request) -> Result<Response, GatewayError> {
    let from_header = header_feature(request.headers());
    // Reject unknown header values before reading the body.
    if let Some(raw) = &from_header {
        resolve_feature(raw)?;
    }

    let multipart = Multipart::from_request(request, &state)
        .await
        .map_err(|rejection| GatewayError::Form(rejection.body_text()))?;
    let mut fields = collect_fields(multipart).await?;

    let raw_feature = match from_header {
        Some(raw) => raw,
        None => upstream::field_text(&fields, FEATURE_FIELD)
            .unwrap_or_else(|| DEFAULT_FEATURE_ID.to_string()),
    };
    let feature = resolve_feature(&raw_feature)?;
    fields.retain(|field: &ForwardField| field.name != FEATURE_FIELD);

    let endpoint = state.config.upstream_url(feature.upstream_path());
    info!(feature = %feature, endpoint = %endpoint, "calling upstream");

    let request = UpstreamBody::for_feature(feature, fields).apply(state.http.post(&endpoint))?;
    let response = request.send().await?;
    let status = response.status().as_u16();
    let body = response.bytes().await?;
    let upstream: Value = serde_json::from_slice(&body)?;
    debug!(status, "upstream responded");

    let now = now_iso();
    let (status, envelope) = if (200..300).contains(&status) {
        (StatusCode::OK, success_envelope(&upstream, &now))
    } else {
        let code = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
        (code, failure_envelope(&upstream, &now))
    };
    Ok(envelope_response(status, envelope))
}

fn envelope_response(status: StatusCode, envelope: Envelope) -> Response {
    (status, Json(envelope)).into_response()
}
