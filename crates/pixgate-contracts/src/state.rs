use crate::extract::ResultOutcome;
use crate::features::Feature;

/// What the result panel shows between submissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub selected_feature: Feature,
    pub uploaded_image: Option<String>,
    pub processed_images: Vec<String>,
    pub is_processing: bool,
    pub status: String,
    pub request_id: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            selected_feature: Feature::Upscale,
            uploaded_image: None,
            processed_images: Vec::new(),
            is_processing: false,
            status: String::new(),
            request_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SelectFeature(Feature),
    ImageUploaded(String),
    ProcessingChanged { processing: bool, status: String },
    ResultReceived(ResultOutcome),
    DeleteImage,
}

pub fn reduce(state: &AppState, action: Action) -> AppState {
    match action {
        Action::SelectFeature(feature) => AppState {
            selected_feature: feature,
            ..AppState::default()
        },
        Action::ImageUploaded(label) => AppState {
            uploaded_image: Some(label),
            ..state.clone()
        },
        Action::ProcessingChanged { processing, status } => {
            let mut next = AppState {
                is_processing: processing,
                status,
                ..state.clone()
            };
            if processing {
                next.processed_images.clear();
                next.request_id = None;
            }
            next
        }
        Action::ResultReceived(outcome) => {
            let mut next = state.clone();
            if let Some(request_id) = outcome.request_id() {
                next.request_id = Some(request_id.to_string());
            }
            next.processed_images = outcome.urls().to_vec();
            next.status = outcome.status_line();
            next.is_processing = false;
            next
        }
        Action::DeleteImage => AppState {
            uploaded_image: None,
            processed_images: Vec::new(),
            status: String::new(),
            request_id: None,
            ..state.clone()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::NO_IMAGE_MESSAGE;

    #[test]
    fn selecting_a_feature_resets_everything() {
        let mut state = AppState::default();
        state = reduce(&state, Action::ImageUploaded("face.png".to_string()));
        state = reduce(
            &state,
            Action::ResultReceived(ResultOutcome::Completed {
                urls: vec!["a".to_string()],
                request_id: Some("r".to_string()),
            }),
        );
        let next = reduce(&state, Action::SelectFeature(Feature::Comic));
        assert_eq!(next.selected_feature, Feature::Comic);
        assert!(next.uploaded_image.is_none());
        assert!(next.processed_images.is_empty());
        assert!(next.request_id.is_none());
    }

    #[test]
    fn starting_processing_clears_previous_results() {
        let state = AppState {
            processed_images: vec!["old".to_string()],
            request_id: Some("old-req".to_string()),
            ..AppState::default()
        };
        let next = reduce(
            &state,
            Action::ProcessingChanged {
                processing: true,
                status: "Sending request...".to_string(),
            },
        );
        assert!(next.is_processing);
        assert!(next.processed_images.is_empty());
        assert!(next.request_id.is_none());
        assert_eq!(next.status, "Sending request...");
    }

    #[test]
    fn no_image_result_keeps_request_id_and_distinct_status() {
        let state = AppState {
            is_processing: true,
            ..AppState::default()
        };
        let next = reduce(
            &state,
            Action::ResultReceived(ResultOutcome::NoImage {
                request_id: Some("r-7".to_string()),
            }),
        );
        assert!(!next.is_processing);
        assert!(next.processed_images.is_empty());
        assert_eq!(next.request_id.as_deref(), Some("r-7"));
        assert_eq!(next.status, NO_IMAGE_MESSAGE);
    }

    #[test]
    fn delete_image_keeps_feature() {
        let state = AppState {
            selected_feature: Feature::Style,
            uploaded_image: Some("cat.png".to_string()),
            processed_images: vec!["a".to_string()],
            ..AppState::default()
        };
        let next = reduce(&state, Action::DeleteImage);
        assert_eq!(next.selected_feature, Feature::Style);
        assert!(next.uploaded_image.is_none());
        assert!(next.processed_images.is_empty());
    }
}
