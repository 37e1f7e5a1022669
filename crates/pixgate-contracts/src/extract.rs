use crate::envelope::{Envelope, ErrorBody};

pub type Extractor = fn(&Envelope) -> Option<Vec<String>>;

/// Result shapes in priority order. The first extractor that yields a
/// non-empty list wins.
pub const EXTRACTORS: &[(&str, Extractor)] = &[
    ("pages", from_pages),
    ("page_url", from_page_url),
    ("outputs", from_outputs),
    ("single", from_single_image),
];

pub const FALLBACK_FAILURE_MESSAGE: &str = "Processing failed. Please try again.";
pub const NO_IMAGE_MESSAGE: &str = "Processing finished but no image URL was returned.";

pub fn extract_image_urls(envelope: &Envelope) -> Vec<String> {
    EXTRACTORS
        .iter()
        .find_map(|(_, extractor)| extractor(envelope))
        .unwrap_or_default()
}

/// Name of the shape that produced the URLs, if any.
pub fn matched_shape(envelope: &Envelope) -> Option<&'static str> {
    EXTRACTORS
        .iter()
        .find(|(_, extractor)| extractor(envelope).is_some())
        .map(|(name, _)| *name)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn collect_urls(urls: impl Iterator<Item = Option<String>>) -> Option<Vec<String>> {
    let urls = urls.flatten().collect::<Vec<String>>();
    if urls.is_empty() {
        None
    } else {
        Some(urls)
    }
}

pub fn from_pages(envelope: &Envelope) -> Option<Vec<String>> {
    let pages = envelope.pages.as_ref()?;
    collect_urls(pages.iter().map(|page| {
        non_empty(page.presigned_url.as_deref()).or_else(|| non_empty(page.page_url.as_deref()))
    }))
}

pub fn from_page_url(envelope: &Envelope) -> Option<Vec<String>> {
    non_empty(envelope.page_url.as_deref()).map(|url| vec![url])
}

pub fn from_outputs(envelope: &Envelope) -> Option<Vec<String>> {
    let data = envelope.result_data();
    collect_urls(
        data.outputs
            .iter()
            .map(|output| non_empty(output.url.as_deref())),
    )
}

pub fn from_single_image(envelope: &Envelope) -> Option<Vec<String>> {
    let data = envelope.result_data();
    non_empty(data.presigned_url.as_deref())
        .or_else(|| non_empty(data.url.as_deref()))
        .map(|url| vec![url])
}

/// Terminal state of one submission as the user sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultOutcome {
    Failed {
        message: String,
        request_id: Option<String>,
    },
    Completed {
        urls: Vec<String>,
        request_id: Option<String>,
    },
    NoImage {
        request_id: Option<String>,
    },
}

impl ResultOutcome {
    pub fn failed(message: impl Into<String>) -> Self {
        ResultOutcome::Failed {
            message: message.into(),
            request_id: None,
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            ResultOutcome::Failed { request_id, .. }
            | ResultOutcome::Completed { request_id, .. }
            | ResultOutcome::NoImage { request_id } => request_id.as_deref(),
        }
    }

    pub fn urls(&self) -> &[String] {
        match self {
            ResultOutcome::Completed { urls, .. } => urls.as_slice(),
            _ => &[],
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, ResultOutcome::Failed { .. })
    }

    pub fn status_line(&self) -> String {
        match self {
            ResultOutcome::Failed { message, .. } => message.clone(),
            ResultOutcome::Completed { urls, request_id } => {
                let noun = if urls.len() == 1 { "image" } else { "images" };
                match request_id {
                    Some(id) => format!("Completed {} {noun} · Request: {id}", urls.len()),
                    None => format!("Completed {} {noun}", urls.len()),
                }
            }
            ResultOutcome::NoImage { .. } => NO_IMAGE_MESSAGE.to_string(),
        }
    }
}

/// Reads a response the way the result panel does: a non-OK HTTP status or an
/// error envelope fails, otherwise the extraction chain decides between a
/// completed result and an empty one.
pub fn interpret_response(http_ok: bool, envelope: &Envelope) -> ResultOutcome {
    let request_id = envelope.request_id.clone();
    if !http_ok || envelope.is_error() {
        let message = envelope
            .error
            .as_ref()
            .and_then(ErrorBody::message)
            .unwrap_or(FALLBACK_FAILURE_MESSAGE)
            .to_string();
        return ResultOutcome::Failed {
            message,
            request_id,
        };
    }

    let urls = extract_image_urls(envelope);
    if urls.is_empty() {
        ResultOutcome::NoImage { request_id }
    } else {
        ResultOutcome::Completed { urls, request_id }
    }
}
