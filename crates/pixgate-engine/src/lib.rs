use std::env;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use image::ImageFormat;
use pixgate_contracts::envelope::Envelope;
use pixgate_contracts::form::{plan_form, ComicRequest, FormField, ImageUpload, SubmissionInput};
use pixgate_contracts::routes::{api_base_from, normalize_base, API_BASE_ENV, FEATURE_HEADER};
use reqwest::blocking::multipart::{Form as MultipartForm, Part as MultipartPart};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::Value;
use tracing::{debug, info};

pub mod download;
pub mod ticker;
pub mod workbench;

pub use download::{download_image, BrowserOpener, DownloadOutcome, LinkOpener};
pub use ticker::ProgressTicker;
pub use workbench::Workbench;

/// Where a submission is sent: straight to the upstream service, or through
/// the gateway route, which picks the upstream path from the feature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Direct,
    Gateway(String),
}

#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub endpoint: String,
    pub http_status: u16,
    pub http_ok: bool,
    pub envelope: Envelope,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    api_base: String,
    http: HttpClient,
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiClient {
    pub fn new() -> Self {
        Self::with_base(&resolve_api_base())
    }

    pub fn with_base(api_base: &str) -> Self {
        Self {
            api_base: normalize_base(api_base),
            http: HttpClient::new(),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn endpoint_for(&self, input: &SubmissionInput, route: &Route) -> String {
        match route {
            Route::Direct => format!("{}{}", self.api_base, input.feature.direct_path()),
            Route::Gateway(url) => url.trim().to_string(),
        }
    }

    /// Sends one submission and decodes whatever envelope comes back.
    ///
    /// Non-2xx replies that still carry a JSON envelope are returned as data;
    /// transport failures and unparseable bodies are errors.
    pub fn submit(&self, input: &SubmissionInput, route: &Route) -> Result<UpstreamReply> {
        let endpoint = self.endpoint_for(input, route);
        let mut request = self.http.post(&endpoint);
        if let Route::Gateway(_) = route {
            request = request.header(FEATURE_HEADER, input.feature.gateway_id());
        }

        request = if input.feature.sends_json() && *route == Route::Direct {
            request.json(&ComicRequest::from_input(input))
        } else {
            request.multipart(multipart_form(&plan_form(input))?)
        };

        info!(feature = %input.feature, endpoint = %endpoint, "submitting");
        let response = request
            .send()
            .with_context(|| format!("request to {endpoint} failed"))?;
        let http_status = response.status().as_u16();
        let http_ok = response.status().is_success();
        let envelope = envelope_from_response(response)?;
        debug!(status = http_status, "upstream replied");

        Ok(UpstreamReply {
            endpoint,
            http_status,
            http_ok,
            envelope,
        })
    }

    pub fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .send()
            .with_context(|| format!("failed downloading {url}"))?;
        if !response.status().is_success() {
            let code = response.status().as_u16();
            bail!("image download failed ({code})");
        }
        Ok(response
            .bytes()
            .with_context(|| format!("failed reading image bytes from {url}"))?
            .to_vec())
    }
}

pub fn resolve_api_base() -> String {
    api_base_from(env::var(API_BASE_ENV).ok())
}

fn multipart_form(fields: &[FormField]) -> Result<MultipartForm> {
    let mut form = MultipartForm::new();
    for field in fields {
        form = match field {
            FormField::Text { name, value } => form.text(name.clone(), value.clone()),
            FormField::File { name, upload } => {
                let part = MultipartPart::bytes(upload.bytes.clone())
                    .file_name(upload.file_name.clone())
                    .mime_str(&upload.content_type)
                    .with_context(|| format!("invalid content type for {}", upload.file_name))?;
                form.part(name.clone(), part)
            }
        };
    }
    Ok(form)
}

fn envelope_from_response(response: HttpResponse) -> Result<Envelope> {
    let status = response.status();
    let body = response.text().context("response body read failed")?;
    match serde_json::from_str::<Value>(&body) {
        Ok(value) if value.is_object() => Ok(Envelope::from_value(&value)),
        Ok(_) | Err(_) if !status.is_success() => {
            bail!(
                "request failed ({}): {}",
                status.as_u16(),
                truncate_text(&body, 512)
            )
        }
        Ok(_) => bail!("server returned a non-object JSON payload"),
        Err(err) => Err(err).context("server returned an invalid JSON payload"),
    }
}

/// Reads an image from disk, sniffing its content type from the bytes.
pub fn load_upload(path: &Path) -> Result<ImageUpload> {
    let bytes = fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
    let format = image::guess_format(&bytes)
        .with_context(|| format!("{} is not a recognised image", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| format!("upload.{}", extension_for(format)));
    Ok(ImageUpload::new(file_name, format.to_mime_type(), bytes))
}

pub(crate) fn extension_for(format: ImageFormat) -> &'static str {
    format.extensions_str().first().copied().unwrap_or("jpg")
}

pub(crate) fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() || parts.last().is_some_and(|last| last == trimmed) {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return truncate_text(&err.to_string(), max_chars);
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
pub(crate) mod testing {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};
    use std::time::Duration;

    /// Serves exactly one HTTP response and hands back the raw request.
    pub fn serve_once(
        status_line: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> anyhow::Result<(String, JoinHandle<Vec<u8>>)> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        let head = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        let handle = thread::spawn(move || {
            let Ok((mut stream, _)) = listener.accept() else {
                return Vec::new();
            };
            let _ = stream.set_read_timeout(Some(Duration::from_millis(500)));
            let request = read_request(&mut stream);
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&body);
            let _ = stream.flush();
            request
        });
        Ok((format!("http://{addr}"), handle))
    }

    fn read_request(stream: &mut impl Read) -> Vec<u8> {
        let mut raw = Vec::new();
        let mut chunk = [0_u8; 8192];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(read) => raw.extend_from_slice(&chunk[..read]),
            }
            if let Some(expected) = expected_len(&raw) {
                if raw.len() >= expected {
                    break;
                }
            }
        }
        raw
    }

    fn expected_len(raw: &[u8]) -> Option<usize> {
        let head_end = raw.windows(4).position(|window| window == b"\r\n\r\n")? + 4;
        let head = String::from_utf8_lossy(&raw[..head_end]).to_ascii_lowercase();
        let length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))?
            .trim()
            .parse::<usize>()
            .ok()?;
        Some(head_end + length)
    }

    /// A local address nothing listens on.
    pub fn closed_url() -> anyhow::Result<String> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        drop(listener);
        Ok(format!("http://{addr}"))
    }

    pub const PNG_BYTES: &[u8] = &[
        0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n', 0, 0, 0, 0x0d, b'I', b'H', b'D', b'R',
    ];
}
