use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::features::{Feature, FeatureConfig, DEFAULT_COMIC_PANELS, DEFAULT_COMIC_STYLE};

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_BACKGROUND_MODE: &str = "replace";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundMode {
    Remove,
    Replace,
}

/// Everything the form holds for one feature between selection and submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionInput {
    pub feature: Feature,
    pub values: IndexMap<String, String>,
    pub image: Option<ImageUpload>,
    pub background: Option<ImageUpload>,
}

impl SubmissionInput {
    /// Fresh form state seeded with the feature's defaults.
    pub fn for_feature(feature: Feature) -> Self {
        Self {
            feature,
            values: feature.config().default_values(),
            image: None,
            background: None,
        }
    }

    pub fn config(&self) -> &'static FeatureConfig {
        self.feature.config()
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.values.insert(field.into(), value.into());
    }

    /// Trimmed, non-empty value of a field.
    pub fn value(&self, field: &str) -> Option<&str> {
        self.values
            .get(field)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub fn background_mode(&self) -> BackgroundMode {
        let raw = self
            .value("mode")
            .or_else(|| self.config().default_value("mode"))
            .unwrap_or(DEFAULT_BACKGROUND_MODE);
        if raw == "remove" {
            BackgroundMode::Remove
        } else {
            BackgroundMode::Replace
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormField {
    Text { name: String, value: String },
    File { name: String, upload: ImageUpload },
}

impl FormField {
    pub fn name(&self) -> &str {
        match self {
            FormField::Text { name, .. } | FormField::File { name, .. } => name.as_str(),
        }
    }

    fn text(name: &str, value: &str) -> Self {
        FormField::Text {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    fn file(name: &str, upload: &ImageUpload) -> Self {
        FormField::File {
            name: name.to_string(),
            upload: upload.clone(),
        }
    }
}

const FILE_INPUTS: &[&str] = &["image", "fg", "bg"];

/// Lays out the multipart fields sent upstream, files first, then every
/// declared input that holds a value, in declaration order.
pub fn plan_form(input: &SubmissionInput) -> Vec<FormField> {
    let config = input.config();
    let mut fields = Vec::new();

    match input.feature {
        Feature::Relight => {
            if let Some(image) = &input.image {
                fields.push(FormField::file("image", image));
            } else if let Some(url) = input.value("image_url") {
                fields.push(FormField::text("image_url", url));
            }
        }
        Feature::ReplaceBackground => {
            if let Some(image) = &input.image {
                fields.push(FormField::file("fg", image));
            }
            if input.background_mode() == BackgroundMode::Replace {
                if let Some(background) = &input.background {
                    fields.push(FormField::file("bg", background));
                }
            }
        }
        _ => {
            if config.accepts("image") {
                if let Some(image) = &input.image {
                    fields.push(FormField::file("image", image));
                }
            }
        }
    }

    for key in config.inputs {
        if FILE_INPUTS.contains(key) || *key == "image_url" {
            continue;
        }
        let Some(value) = input.values.get(*key).filter(|value| !value.is_empty()) else {
            continue;
        };
        fields.push(FormField::text(key, value));
    }

    fields
}

/// JSON body for comic generation, the one feature not sent as multipart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComicRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub panels: i64,
    pub style: String,
}

impl ComicRequest {
    pub fn from_fields(prompt: Option<&str>, panels: Option<&str>, style: Option<&str>) -> Self {
        Self {
            prompt: prompt.map(str::to_string),
            panels: panels
                .and_then(parse_leading_int)
                .unwrap_or(DEFAULT_COMIC_PANELS),
            style: style
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .unwrap_or(DEFAULT_COMIC_STYLE)
                .to_string(),
        }
    }

    pub fn from_input(input: &SubmissionInput) -> Self {
        Self::from_fields(
            input.values.get("prompt").map(String::as_str),
            input.value("panels"),
            input.value("style"),
        )
    }
}

/// Integer prefix of `raw` ("4 panels" reads as 4); `None` when there is none.
fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    let sign_len = usize::from(trimmed.starts_with(['-', '+']));
    let digits = trimmed[sign_len..]
        .chars()
        .take_while(char::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }
    trimmed[..sign_len + digits].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(name: &str) -> ImageUpload {
        ImageUpload::new(name, "image/png", vec![0x89, b'P', b'N', b'G'])
    }

    fn names(fields: &[FormField]) -> Vec<&str> {
        fields.iter().map(FormField::name).collect()
    }

    #[test]
    fn defaults_seed_the_form() {
        let input = SubmissionInput::for_feature(Feature::Enhance);
        assert_eq!(input.value("scale"), Some("2"));
        assert_eq!(input.value("model"), Some("standard-v2"));
        assert!(input.image.is_none());
    }

    #[test]
    fn plain_feature_sends_image_then_values() {
        let mut input = SubmissionInput::for_feature(Feature::Upscale);
        input.image = Some(png("face.png"));
        let fields = plan_form(&input);
        assert_eq!(names(&fields), vec!["image", "scale", "version"]);
    }

    #[test]
    fn empty_values_are_skipped() {
        let mut input = SubmissionInput::for_feature(Feature::Style);
        input.image = Some(png("cat.png"));
        input.set("extra", "");
        let fields = plan_form(&input);
        assert_eq!(names(&fields), vec!["image", "style"]);
    }

    #[test]
    fn background_replace_renames_files() {
        let mut input = SubmissionInput::for_feature(Feature::ReplaceBackground);
        input.image = Some(png("person.png"));
        input.background = Some(png("beach.png"));
        let fields = plan_form(&input);
        assert_eq!(
            names(&fields),
            vec!["fg", "bg", "mode", "fit", "position", "featherPx", "shadow", "signTtl"]
        );
    }

    #[test]
    fn background_remove_drops_background_file() {
        let mut input = SubmissionInput::for_feature(Feature::ReplaceBackground);
        input.set("mode", "remove");
        input.image = Some(png("person.png"));
        input.background = Some(png("beach.png"));
        let fields = plan_form(&input);
        assert_eq!(names(&fields)[..2], ["fg", "mode"]);
        assert!(!names(&fields).contains(&"bg"));
    }

    #[test]
    fn relight_file_wins_over_url() {
        let mut input = SubmissionInput::for_feature(Feature::Relight);
        input.set("image_url", "https://example.com/face.jpg");
        input.image = Some(png("face.png"));
        let fields = plan_form(&input);
        assert_eq!(fields[0].name(), "image");
        assert!(!names(&fields).contains(&"image_url"));
    }

    #[test]
    fn relight_url_is_trimmed_when_no_file() {
        let mut input = SubmissionInput::for_feature(Feature::Relight);
        input.set("image_url", "  https://example.com/face.jpg ");
        let fields = plan_form(&input);
        assert_eq!(
            fields[0],
            FormField::Text {
                name: "image_url".to_string(),
                value: "https://example.com/face.jpg".to_string(),
            }
        );
        assert_eq!(
            names(&fields)
                .iter()
                .filter(|name| **name == "image_url")
                .count(),
            1
        );
    }

    #[test]
    fn comic_request_applies_defaults() {
        let request = ComicRequest::from_fields(Some("a robot and a fox"), None, None);
        assert_eq!(request.panels, 4);
        assert_eq!(request.style, "anime_color");

        let request = ComicRequest::from_fields(Some("x"), Some("6 panels"), Some(" "));
        assert_eq!(request.panels, 6);
        assert_eq!(request.style, "anime_color");

        let request = ComicRequest::from_fields(None, Some("many"), Some("noir"));
        assert_eq!(request.prompt, None);
        assert_eq!(request.panels, 4);
        assert_eq!(request.style, "noir");
    }

    #[test]
    fn missing_comic_prompt_is_omitted_from_json() -> anyhow::Result<()> {
        let request = ComicRequest::from_fields(None, None, None);
        assert_eq!(
            serde_json::to_value(&request)?,
            serde_json::json!({"panels": 4, "style": "anime_color"})
        );
        Ok(())
    }

    #[test]
    fn comic_has_no_file_fields() {
        let mut input = SubmissionInput::for_feature(Feature::Comic);
        input.set("prompt", "a cat detective in the rain");
        input.image = Some(png("ignored.png"));
        let fields = plan_form(&input);
        assert_eq!(names(&fields), vec!["prompt", "panels", "style"]);
    }
}
