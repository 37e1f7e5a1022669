use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CODE_VALIDATION: &str = "VALIDATION_ERROR";
pub const CODE_PROCESSING: &str = "PROCESSING_ERROR";
pub const CODE_INTERNAL: &str = "INTERNAL_ERROR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    #[default]
    Success,
    Error,
}

/// Upstream errors arrive either as a bare string or as a structured object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorBody {
    Text(String),
    Detail(ErrorDetail),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorBody {
    pub fn detail(message: impl Into<String>, code: impl Into<String>) -> Self {
        ErrorBody::Detail(ErrorDetail {
            message: Some(message.into()),
            code: Some(code.into()),
            details: None,
        })
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ErrorBody::Text(text) => Some(text.as_str()),
            ErrorBody::Detail(detail) => detail.message.as_deref(),
        }
        .map(str::trim)
        .filter(|value| !value.is_empty())
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            ErrorBody::Text(_) => None,
            ErrorBody::Detail(detail) => detail
                .code
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutputImage {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub index: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ComicPage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presigned_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub panels: Vec<Value>,
}

/// Normalized response wrapper shared by the gateway and every upstream feature.
///
/// `data` and `meta` stay as raw JSON so the gateway can pass them through
/// untouched; [`ResultData::from_value`] gives the typed view the client reads.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub status: EnvelopeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<ComicPage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Envelope {
    pub fn failure(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            status: EnvelopeStatus::Error,
            error: Some(ErrorBody::detail(message, code)),
            ..Self::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == EnvelopeStatus::Error
    }

    pub fn result_data(&self) -> ResultData {
        self.data
            .as_ref()
            .map(ResultData::from_value)
            .unwrap_or_default()
    }

    /// Reads an upstream reply field by field. A field of the wrong type is
    /// treated as absent instead of failing the whole body; numeric ids and
    /// codes are kept as their decimal text.
    pub fn from_value(value: &Value) -> Self {
        let status = match value.get("status").and_then(Value::as_str) {
            Some(status) if status.trim().eq_ignore_ascii_case("error") => EnvelopeStatus::Error,
            _ => EnvelopeStatus::Success,
        };
        Self {
            status,
            request_id: value.get("request_id").and_then(scalar_text),
            data: non_null(value, "data"),
            meta: non_null(value, "meta"),
            page_url: value
                .get("page_url")
                .and_then(Value::as_str)
                .map(str::to_string),
            pages: value.get("pages").and_then(pages_from_value),
            error: value.get("error").and_then(ErrorBody::from_value),
            timestamp: value.get("timestamp").and_then(scalar_text),
        }
    }
}

impl ErrorBody {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(ErrorBody::Text(text.clone())),
            Value::Object(_) => Some(ErrorBody::Detail(ErrorDetail {
                message: value.get("message").and_then(scalar_text),
                code: value.get("code").and_then(scalar_text),
                details: non_null(value, "details"),
            })),
            _ => None,
        }
    }
}

impl ComicPage {
    pub fn from_value(value: &Value) -> Self {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            page_index: value.get("page_index").and_then(Value::as_i64),
            page_url: text("page_url"),
            key: text("key"),
            presigned_url: text("presigned_url"),
            panels: value
                .get("panels")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
        }
    }
}

/// Every object in a `pages` array, each read leniently; `None` when `pages`
/// is not an array.
pub fn pages_from_value(value: &Value) -> Option<Vec<ComicPage>> {
    let rows = value.as_array()?;
    Some(
        rows.iter()
            .filter(|row| row.is_object())
            .map(ComicPage::from_value)
            .collect(),
    )
}

/// Strings as-is, numbers as their decimal text, anything else absent.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn non_null(value: &Value, key: &str) -> Option<Value> {
    value.get(key).filter(|inner| !inner.is_null()).cloned()
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultData {
    pub url: Option<String>,
    pub presigned_url: Option<String>,
    pub key: Option<String>,
    pub outputs: Vec<OutputImage>,
}

impl ResultData {
    /// Lenient view over `data`: fields of the wrong type are treated as absent.
    pub fn from_value(value: &Value) -> Self {
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        let outputs = value
            .get("outputs")
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .map(|row| OutputImage {
                        url: row.get("url").and_then(Value::as_str).map(str::to_string),
                        index: row.get("index").and_then(Value::as_i64),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            url: text("url"),
            presigned_url: text("presigned_url"),
            key: text("key"),
            outputs,
        }
    }
}
