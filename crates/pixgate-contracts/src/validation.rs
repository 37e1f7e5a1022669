use thiserror::Error;

use crate::features::Feature;
use crate::form::{BackgroundMode, SubmissionInput, MAX_UPLOAD_BYTES};

pub const MIN_PROMPT_CHARS: usize = 5;
pub const MIN_DIMENSION: u32 = 256;
pub const MAX_DIMENSION: u32 = 1024;
pub const DIMENSION_STEP: u32 = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please upload an image before submitting.")]
    MissingImage,
    #[error("A foreground image (fg) is required.")]
    MissingForeground,
    #[error("Upload an image or provide an image_url.")]
    MissingImageSource,
    #[error("Choose a background image when mode is replace.")]
    MissingBackground,
    #[error("Prompt must be at least {min} characters.")]
    PromptTooShort { min: usize },
    #[error("Invalid {field} for {feature}: {value} (allowed: {allowed})")]
    InvalidChoice {
        feature: &'static str,
        field: &'static str,
        value: String,
        allowed: String,
    },
    #[error("{field} must be between 256 and 1024 and a multiple of 64.")]
    InvalidDimension { field: &'static str },
    #[error("{file_name} is larger than 10MB.")]
    FileTooLarge { file_name: String },
}

pub type Rule = fn(&SubmissionInput) -> Result<(), ValidationError>;

/// Checks applied to every submission, in order; the first failure wins.
const RULES: &[Rule] = &[
    require_main_image,
    require_foreground,
    require_relight_source,
    require_background_for_replace,
    require_comic_prompt,
    check_choices,
    check_relight_dimensions,
    check_upload_sizes,
];

pub fn validate(input: &SubmissionInput) -> Result<(), ValidationError> {
    RULES.iter().try_for_each(|rule| rule(input))
}

pub fn require_main_image(input: &SubmissionInput) -> Result<(), ValidationError> {
    let exempt = matches!(input.feature, Feature::Comic | Feature::Relight);
    if !exempt && input.config().accepts("image") && input.image.is_none() {
        return Err(ValidationError::MissingImage);
    }
    Ok(())
}

pub fn require_foreground(input: &SubmissionInput) -> Result<(), ValidationError> {
    if input.config().accepts("fg") && input.image.is_none() {
        return Err(ValidationError::MissingForeground);
    }
    Ok(())
}

pub fn require_relight_source(input: &SubmissionInput) -> Result<(), ValidationError> {
    if input.feature == Feature::Relight
        && input.image.is_none()
        && input.value("image_url").is_none()
    {
        return Err(ValidationError::MissingImageSource);
    }
    Ok(())
}

pub fn require_background_for_replace(input: &SubmissionInput) -> Result<(), ValidationError> {
    if input.feature == Feature::ReplaceBackground
        && input.background_mode() == BackgroundMode::Replace
        && input.background.is_none()
    {
        return Err(ValidationError::MissingBackground);
    }
    Ok(())
}

pub fn require_comic_prompt(input: &SubmissionInput) -> Result<(), ValidationError> {
    if input.feature != Feature::Comic {
        return Ok(());
    }
    let chars = input.value("prompt").map(|prompt| prompt.chars().count());
    if chars.unwrap_or(0) < MIN_PROMPT_CHARS {
        return Err(ValidationError::PromptTooShort {
            min: MIN_PROMPT_CHARS,
        });
    }
    Ok(())
}

pub fn check_choices(input: &SubmissionInput) -> Result<(), ValidationError> {
    let config = input.config();
    for choice in config.choices {
        let Some(value) = input.value(choice.field) else {
            continue;
        };
        if !choice.allowed.contains(&value) {
            return Err(ValidationError::InvalidChoice {
                feature: config.id,
                field: choice.field,
                value: value.to_string(),
                allowed: choice.allowed.join(", "),
            });
        }
    }
    Ok(())
}

pub fn is_valid_dimension(raw: &str) -> bool {
    raw.trim().parse::<u32>().is_ok_and(|value| {
        (MIN_DIMENSION..=MAX_DIMENSION).contains(&value) && value % DIMENSION_STEP == 0
    })
}

pub fn check_relight_dimensions(input: &SubmissionInput) -> Result<(), ValidationError> {
    if input.feature != Feature::Relight {
        return Ok(());
    }
    for field in ["width", "height"] {
        if let Some(raw) = input.value(field) {
            if !is_valid_dimension(raw) {
                return Err(ValidationError::InvalidDimension { field });
            }
        }
    }
    Ok(())
}

pub fn check_upload_sizes(input: &SubmissionInput) -> Result<(), ValidationError> {
    for upload in [&input.image, &input.background].into_iter().flatten() {
        if upload.len() > MAX_UPLOAD_BYTES {
            return Err(ValidationError::FileTooLarge {
                file_name: upload.file_name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::ImageUpload;

    fn upload() -> ImageUpload {
        ImageUpload::new("in.png", "image/png", vec![1, 2, 3])
    }

    fn with_image(feature: Feature) -> SubmissionInput {
        let mut input = SubmissionInput::for_feature(feature);
        input.image = Some(upload());
        input
    }

    #[test]
    fn image_features_require_an_upload() {
        for feature in [
            Feature::Upscale,
            Feature::Clarity,
            Feature::Enhance,
            Feature::Beautify,
            Feature::Style,
        ] {
            let input = SubmissionInput::for_feature(feature);
            assert_eq!(validate(&input), Err(ValidationError::MissingImage), "{feature}");
            assert_eq!(validate(&with_image(feature)), Ok(()), "{feature}");
        }
    }

    #[test]
    fn relight_needs_file_or_url() {
        let input = SubmissionInput::for_feature(Feature::Relight);
        assert_eq!(validate(&input), Err(ValidationError::MissingImageSource));

        let mut blank_url = SubmissionInput::for_feature(Feature::Relight);
        blank_url.set("image_url", "   ");
        assert_eq!(validate(&blank_url), Err(ValidationError::MissingImageSource));

        let mut by_url = SubmissionInput::for_feature(Feature::Relight);
        by_url.set("image_url", "https://example.com/p.jpg");
        assert_eq!(validate(&by_url), Ok(()));

        assert_eq!(validate(&with_image(Feature::Relight)), Ok(()));
    }

    #[test]
    fn replace_mode_requires_background() {
        let input = with_image(Feature::ReplaceBackground);
        assert_eq!(validate(&input), Err(ValidationError::MissingBackground));

        let mut remove = with_image(Feature::ReplaceBackground);
        remove.set("mode", "remove");
        assert_eq!(validate(&remove), Ok(()));

        let mut replace = with_image(Feature::ReplaceBackground);
        replace.background = Some(upload());
        assert_eq!(validate(&replace), Ok(()));

        let no_fg = SubmissionInput::for_feature(Feature::ReplaceBackground);
        assert_eq!(validate(&no_fg), Err(ValidationError::MissingForeground));
    }

    #[test]
    fn comic_prompt_minimum_length() {
        let mut input = SubmissionInput::for_feature(Feature::Comic);
        assert_eq!(
            validate(&input),
            Err(ValidationError::PromptTooShort { min: 5 })
        );
        input.set("prompt", "  cat  ");
        assert!(validate(&input).is_err());
        input.set("prompt", "chats");
        assert_eq!(validate(&input), Ok(()));
        input.set("prompt", "mèo ơi");
        assert_eq!(validate(&input), Ok(()));
    }

    #[test]
    fn scale_allow_lists_are_feature_specific() {
        let mut clarity = with_image(Feature::Clarity);
        clarity.set("scale", "6");
        assert!(matches!(
            validate(&clarity),
            Err(ValidationError::InvalidChoice { field: "scale", .. })
        ));

        let mut enhance = with_image(Feature::Enhance);
        enhance.set("scale", "6");
        assert_eq!(validate(&enhance), Ok(()));

        enhance.set("model", "mystery-v9");
        assert!(matches!(
            validate(&enhance),
            Err(ValidationError::InvalidChoice { field: "model", .. })
        ));

        let mut upscale = with_image(Feature::Upscale);
        upscale.set("scale", "1");
        assert_eq!(validate(&upscale), Ok(()));
    }

    #[test]
    fn relight_dimensions() {
        assert!(!is_valid_dimension("300"));
        assert!(is_valid_dimension("320"));
        assert!(is_valid_dimension("768"));
        assert!(!is_valid_dimension("1088"));
        assert!(!is_valid_dimension("192"));
        assert!(!is_valid_dimension("wide"));

        let mut input = with_image(Feature::Relight);
        input.set("width", "300");
        assert_eq!(
            validate(&input),
            Err(ValidationError::InvalidDimension { field: "width" })
        );
        input.set("width", "320");
        input.set("height", "1088");
        assert_eq!(
            validate(&input),
            Err(ValidationError::InvalidDimension { field: "height" })
        );
        input.set("height", "768");
        assert_eq!(validate(&input), Ok(()));
    }

    #[test]
    fn oversized_upload_is_rejected() {
        let mut input = SubmissionInput::for_feature(Feature::Beautify);
        input.image = Some(ImageUpload::new(
            "huge.png",
            "image/png",
            vec![0; MAX_UPLOAD_BYTES + 1],
        ));
        assert_eq!(
            validate(&input),
            Err(ValidationError::FileTooLarge {
                file_name: "huge.png".to_string()
            })
        );
    }

    #[test]
    fn messages_are_user_facing() {
        assert_eq!(
            ValidationError::InvalidDimension { field: "width" }.to_string(),
            "width must be between 256 and 1024 and a multiple of 64."
        );
        assert_eq!(
            ValidationError::PromptTooShort { min: 5 }.to_string(),
            "Prompt must be at least 5 characters."
        );
    }
}
