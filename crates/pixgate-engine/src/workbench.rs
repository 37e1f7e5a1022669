use std::path::Path;

use anyhow::Result;
use pixgate_contracts::extract::{interpret_response, ResultOutcome};
use pixgate_contracts::features::Feature;
use pixgate_contracts::form::SubmissionInput;
use pixgate_contracts::state::{reduce, Action, AppState};
use pixgate_contracts::validation::validate;
use tracing::{info, warn};

use crate::download::{download_image, DownloadOutcome, LinkOpener};
use crate::ticker::ProgressTicker;
use crate::{error_chain_text, load_upload, ApiClient, Route};

pub const BUSY_MESSAGE: &str = "A submission is already in progress.";
pub const SENDING_STATUS: &str = "Sending request to the server...";

/// Client-side session: the selected feature, its form and the result panel.
pub struct Workbench {
    client: ApiClient,
    route: Route,
    state: AppState,
    input: SubmissionInput,
}

impl Workbench {
    pub fn new(client: ApiClient, route: Route) -> Self {
        let state = AppState::default();
        let input = SubmissionInput::for_feature(state.selected_feature);
        Self {
            client,
            route,
            state,
            input,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn input(&self) -> &SubmissionInput {
        &self.input
    }

    fn dispatch(&mut self, action: Action) {
        self.state = reduce(&self.state, action);
    }

    pub fn select_feature(&mut self, feature: Feature) {
        self.dispatch(Action::SelectFeature(feature));
        self.input = SubmissionInput::for_feature(feature);
    }

    pub fn set_value(&mut self, field: &str, value: &str) {
        self.input.set(field, value);
    }

    pub fn upload_image(&mut self, path: &Path) -> Result<()> {
        let upload = load_upload(path)?;
        self.dispatch(Action::ImageUploaded(upload.file_name.clone()));
        self.input.image = Some(upload);
        Ok(())
    }

    pub fn upload_background(&mut self, path: &Path) -> Result<()> {
        self.input.background = Some(load_upload(path)?);
        Ok(())
    }

    pub fn delete_image(&mut self) {
        self.dispatch(Action::DeleteImage);
        self.input.image = None;
    }

    /// Validates, submits and interprets one request.
    ///
    /// Every failure mode ends up as [`ResultOutcome::Failed`]: validation
    /// problems never reach the network, and transport or parse errors are
    /// turned into their message.
    pub fn submit<F>(&mut self, on_progress: F) -> ResultOutcome
    where
        F: Fn(u8) + Send + 'static,
    {
        if self.state.is_processing {
            return ResultOutcome::failed(BUSY_MESSAGE);
        }
        if let Err(err) = validate(&self.input) {
            let outcome = ResultOutcome::failed(err.to_string());
            self.dispatch(Action::ResultReceived(outcome.clone()));
            return outcome;
        }

        self.dispatch(Action::ProcessingChanged {
            processing: true,
            status: SENDING_STATUS.to_string(),
        });
        let ticker = ProgressTicker::spawn(on_progress);
        let outcome = match self.client.submit(&self.input, &self.route) {
            Ok(reply) => {
                info!(
                    feature = %self.input.feature,
                    status = reply.http_status,
                    "submission settled"
                );
                interpret_response(reply.http_ok, &reply.envelope)
            }
            Err(err) => {
                let message = error_chain_text(&err, 512);
                warn!(feature = %self.input.feature, error = %message, "submission failed");
                ResultOutcome::failed(message)
            }
        };
        ticker.finish(outcome.is_success());

        self.dispatch(Action::ResultReceived(outcome.clone()));
        outcome
    }

    pub fn download_results(&self, out_dir: &Path, fallback: &dyn LinkOpener) -> Vec<DownloadOutcome> {
        self.state
            .processed_images
            .iter()
            .enumerate()
            .map(|(index, url)| {
                download_image(
                    &self.client,
                    url,
                    self.state.selected_feature,
                    index,
                    out_dir,
                    fallback,
                )
            })
            .collect()
    }
}
