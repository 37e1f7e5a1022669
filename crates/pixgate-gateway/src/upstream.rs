use axum::body::Bytes;
use axum::extract::Multipart;
use pixgate_contracts::envelope::{
    pages_from_value, Envelope, EnvelopeStatus, ErrorBody, CODE_PROCESSING,
};
use pixgate_contracts::features::Feature;
use pixgate_contracts::form::ComicRequest;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use crate::error::GatewayError;

pub const FALLBACK_UPSTREAM_MESSAGE: &str = "Processing failed";

/// One multipart field as received, kept byte-for-byte for forwarding.
#[derive(Debug, Clone)]
pub struct ForwardField {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl ForwardField {
    pub fn is_file(&self) -> bool {
        self.file_name.is_some() || self.content_type.is_some()
    }

    pub fn text(&self) -> Option<String> {
        if self.is_file() {
            return None;
        }
        Some(String::from_utf8_lossy(&self.data).to_string())
    }
}

pub async fn collect_fields(mut multipart: Multipart) -> Result<Vec<ForwardField>, GatewayError> {
    let mut fields = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| GatewayError::Form(err.body_text()))?
    {
        let name = field.name().unwrap_or("").to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|err| GatewayError::Form(err.body_text()))?;
        fields.push(ForwardField {
            name,
            file_name,
            content_type,
            data,
        });
    }
    Ok(fields)
}

pub fn field_text(fields: &[ForwardField], name: &str) -> Option<String> {
    fields
        .iter()
        .find(|field| field.name == name)
        .and_then(ForwardField::text)
        .filter(|value| !value.is_empty())
}

/// Body sent upstream for one feature.
#[derive(Debug)]
pub enum UpstreamBody {
    Json(ComicRequest),
    Multipart(Vec<ForwardField>),
}

impl UpstreamBody {
    pub fn for_feature(feature: Feature, fields: Vec<ForwardField>) -> Self {
        if feature.sends_json() {
            UpstreamBody::Json(ComicRequest::from_fields(
                field_text(&fields, "prompt").as_deref(),
                field_text(&fields, "panels").as_deref(),
                field_text(&fields, "style").as_deref(),
            ))
        } else {
            UpstreamBody::Multipart(fields)
        }
    }

    pub fn apply(self, request: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, GatewayError> {
        match self {
            UpstreamBody::Json(payload) => {
                let body = serde_json::to_vec(&payload)?;
                Ok(request.header(CONTENT_TYPE, "application/json").body(body))
            }
            UpstreamBody::Multipart(fields) => Ok(request.multipart(multipart_form(fields)?)),
        }
    }
}

fn multipart_form(fields: Vec<ForwardField>) -> Result<Form, GatewayError> {
    let mut form = Form::new();
    for field in fields {
        if !field.is_file() {
            let value = String::from_utf8_lossy(&field.data).to_string();
            form = form.text(field.name, value);
            continue;
        }
        let mut part = Part::bytes(field.data.to_vec());
        if let Some(file_name) = field.file_name {
            part = part.file_name(file_name);
        }
        if let Some(content_type) = field.content_type {
            part = part.mime_str(&content_type)?;
        }
        form = form.part(field.name, part);
    }
    Ok(form)
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn non_null(value: &Value, key: &str) -> Option<Value> {
    value.get(key).filter(|inner| !inner.is_null()).cloned()
}

/// Rewraps a non-2xx upstream body into the error envelope.
pub fn failure_envelope(upstream: &Value, now: &str) -> Envelope {
    let error = upstream.get("error");
    let message = error
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
        .or_else(|| error.and_then(Value::as_str))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(FALLBACK_UPSTREAM_MESSAGE);
    let code = error
        .and_then(|error| error.get("code"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(CODE_PROCESSING);

    Envelope {
        status: EnvelopeStatus::Error,
        request_id: str_field(upstream, "request_id"),
        error: Some(ErrorBody::detail(message, code)),
        timestamp: Some(str_field(upstream, "timestamp").unwrap_or_else(|| now.to_string())),
        ..Envelope::default()
    }
}

/// Rewraps a 2xx upstream body into the success envelope.
pub fn success_envelope(upstream: &Value, now: &str) -> Envelope {
    let pages = upstream.get("pages").and_then(pages_from_value);
    Envelope {
        status: EnvelopeStatus::Success,
        request_id: str_field(upstream, "request_id"),
        data: non_null(upstream, "data"),
        meta: non_null(upstream, "meta"),
        page_url: str_field(upstream, "page_url"),
        pages,
        error: None,
        timestamp: Some(str_field(upstream, "timestamp").unwrap_or_else(|| now.to_string())),
    }
}
