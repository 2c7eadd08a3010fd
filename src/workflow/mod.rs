//! Workflow controller.
//!
//! The controller owns the API client, the active-file [`Session`] and the
//! display [`Surface`]. Its actions take `&self` so several can be in flight
//! at once; the session and surface locks are only held between awaits.
//! Every action ends in exactly one notice: a success message, a warning for
//! bad input, or a danger notice for a failed request.

pub mod controls;
pub mod session;
pub mod surface;

use parking_lot::Mutex;

use crate::api::{ApiClient, Operation, ProcessingRequest, ResponseSource};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult, ErrorKind};
use crate::media::{MediaCategory, UploadedFile, DEFAULT_MAX_UPLOAD_BYTES};
use crate::render::{self, page::PageOptions, Rendered};

pub use controls::{AudioControls, Controls, ImageControls, MeshControls};
pub use session::{Generation, Session, WorkflowState};
pub use surface::{Notice, NoticeLevel, PanelSlot, Surface};

pub const MSG_NO_FILE: &str = "Please upload a file first";
pub const MSG_PROCESSING: &str = "Processing file...";
pub const MSG_UPLOADED: &str = "File uploaded successfully";
pub const MSG_PREPROCESSED: &str = "File preprocessed successfully";
pub const MSG_AUGMENTED: &str = "File augmented successfully";

/// What happened to an action's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Rendered into its panel.
    Applied,
    /// A newer file was selected while the request was in flight.
    Discarded,
}

pub struct Controller {
    api: ApiClient,
    max_upload_bytes: u64,
    session: Mutex<Session>,
    surface: Mutex<Surface>,
}

impl Controller {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            session: Mutex::new(Session::new()),
            surface: Mutex::new(Surface::new()),
        }
    }

    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        let api = ApiClient::from_config(config)?;
        Ok(Self::new(api).with_max_upload_bytes(config.max_upload_bytes))
    }

    pub fn with_max_upload_bytes(mut self, limit: u64) -> Self {
        self.max_upload_bytes = limit;
        self
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Make `file` the active file and upload it.
    ///
    /// Everything shown for the previous file is cleared first, whether or
    /// not the new file is accepted. An upload failure keeps the file active
    /// so preprocess and augment still work on it.
    pub async fn select_file(&self, file: UploadedFile) -> ClientResult<ActionOutcome> {
        let generation = {
            let mut session = self.session.lock();
            let generation = session.begin_selection();
            self.surface.lock().reset();
            generation
        };
        tracing::info!(
            file = file.filename(),
            size = file.size(),
            generation,
            "file selected"
        );

        let category = match self.admit(&file) {
            Ok(category) => category,
            Err(err) => {
                self.report(generation, Operation::Upload, &err);
                return Err(err);
            }
        };

        {
            let mut session = self.session.lock();
            if !session.activate(generation, file.clone()) {
                return Ok(ActionOutcome::Discarded);
            }
            let mut surface = self.surface.lock();
            surface.set_controls(Some(Controls::defaults(category)));
            surface.notify(Notice::info(MSG_PROCESSING));
        }

        let outcome = match self.api.upload(category, &file).await {
            Ok(result) => render::render_upload(&result)
                .map(|rendered| (rendered, result.source()))
                .map_err(ClientError::from),
            Err(err) => Err(err),
        };
        self.settle(
            generation,
            Operation::Upload,
            outcome,
            PanelSlot::Original,
            WorkflowState::OriginalLoaded,
        )
    }

    fn admit(&self, file: &UploadedFile) -> ClientResult<MediaCategory> {
        let category = file.category().ok_or_else(|| ClientError::UnsupportedFile {
            filename: file.filename().to_string(),
        })?;
        if file.size() > self.max_upload_bytes {
            return Err(ClientError::FileTooLarge {
                size: file.size(),
                limit: self.max_upload_bytes,
            });
        }
        Ok(category)
    }

    pub async fn preprocess(&self, category: MediaCategory) -> ClientResult<ActionOutcome> {
        let (generation, request) = self.begin_action(category, Operation::Preprocess)?;
        let outcome = match self.api.preprocess(category, &request).await {
            Ok(result) => render::render_preprocess(&result)
                .map(|rendered| (rendered, result.source()))
                .map_err(ClientError::from),
            Err(err) => Err(err),
        };
        self.settle(
            generation,
            Operation::Preprocess,
            outcome,
            PanelSlot::Processed,
            WorkflowState::Preprocessed,
        )
    }

    pub async fn augment(&self, category: MediaCategory) -> ClientResult<ActionOutcome> {
        let (generation, request) = self.begin_action(category, Operation::Augment)?;
        let outcome = match self.api.augment(category, &request).await {
            Ok(result) => render::render_augment(&result)
                .map(|rendered| (rendered, result.source()))
                .map_err(ClientError::from),
            Err(err) => Err(err),
        };
        self.settle(
            generation,
            Operation::Augment,
            outcome,
            PanelSlot::Processed,
            WorkflowState::Augmented,
        )
    }

    /// Check preconditions and build the request. Failures are reported
    /// here, before anything is sent.
    fn begin_action(
        &self,
        category: MediaCategory,
        op: Operation,
    ) -> ClientResult<(Generation, ProcessingRequest)> {
        let session = self.session.lock();
        let mut surface = self.surface.lock();
        let generation = session.generation();

        match build_request(&session, &surface, category, op) {
            Ok(request) => {
                surface.notify(Notice::info(MSG_PROCESSING));
                Ok((generation, request))
            }
            Err(err) => {
                tracing::debug!(error = %err, ?op, "action rejected");
                surface.notify(notice_for(op, &err));
                Err(err)
            }
        }
    }

    fn settle(
        &self,
        generation: Generation,
        op: Operation,
        outcome: ClientResult<(Rendered, ResponseSource)>,
        slot: PanelSlot,
        state: WorkflowState,
    ) -> ClientResult<ActionOutcome> {
        let mut session = self.session.lock();
        if !session.is_current(generation) {
            tracing::debug!(generation, ?op, "discarding result for superseded file");
            return Ok(ActionOutcome::Discarded);
        }
        let mut surface = self.surface.lock();
        match outcome {
            Ok((rendered, source)) => {
                surface.install(slot, rendered);
                session.advance(generation, state);
                let mut message = match op {
                    Operation::Upload => MSG_UPLOADED,
                    Operation::Preprocess => MSG_PREPROCESSED,
                    Operation::Augment => MSG_AUGMENTED,
                }
                .to_string();
                if source.is_fixture() {
                    message.push_str(" (sample data)");
                }
                surface.notify(Notice::success(message));
                Ok(ActionOutcome::Applied)
            }
            Err(err) => {
                tracing::warn!(error = %err, ?op, "action failed");
                surface.notify(notice_for(op, &err));
                Err(err)
            }
        }
    }

    fn report(&self, generation: Generation, op: Operation, err: &ClientError) {
        let session = self.session.lock();
        if session.is_current(generation) {
            self.surface.lock().notify(notice_for(op, err));
        }
    }

    /// Edit the visible controls. Fails when no controls are shown.
    pub fn update_controls(&self, edit: impl FnOnce(&mut Controls)) -> ClientResult<()> {
        let mut surface = self.surface.lock();
        let controls = surface.controls_mut().ok_or(ClientError::NoActiveFile)?;
        edit(controls);
        Ok(())
    }

    pub fn controls(&self) -> Option<Controls> {
        self.surface.lock().controls().cloned()
    }

    pub fn state(&self) -> WorkflowState {
        self.session.lock().state()
    }

    pub fn generation(&self) -> Generation {
        self.session.lock().generation()
    }

    pub fn active_file(&self) -> Option<UploadedFile> {
        self.session.lock().active_file().cloned()
    }

    pub fn notice(&self) -> Option<Notice> {
        self.surface.lock().alert().cloned()
    }

    /// Run `f` against the current surface.
    pub fn with_surface<R>(&self, f: impl FnOnce(&Surface) -> R) -> R {
        f(&self.surface.lock())
    }

    pub fn render_page(&self, options: &PageOptions) -> String {
        self.with_surface(|surface| render::page::render_page(surface, options))
    }
}

fn build_request(
    session: &Session,
    surface: &Surface,
    category: MediaCategory,
    op: Operation,
) -> ClientResult<ProcessingRequest> {
    let file = session.active_file().ok_or(ClientError::NoActiveFile)?;
    let active = file.category().ok_or_else(|| ClientError::UnsupportedFile {
        filename: file.filename().to_string(),
    })?;
    if active != category {
        return Err(ClientError::CategoryMismatch {
            active,
            requested: category,
        });
    }
    let defaults = Controls::defaults(category);
    let controls = surface.controls().unwrap_or(&defaults);
    let params = match op {
        Operation::Augment => controls.augment_params()?,
        Operation::Preprocess | Operation::Upload => controls.preprocess_params()?,
    };
    let mut request = ProcessingRequest::new(file.clone());
    request.params = params;
    Ok(request)
}

/// The single notice shown for a failed action.
pub fn notice_for(op: Operation, err: &ClientError) -> Notice {
    match err.kind() {
        ErrorKind::UserInput => Notice::warning(match err {
            ClientError::NoActiveFile => MSG_NO_FILE.to_string(),
            ClientError::UnsupportedFile { filename } => {
                format!("Unsupported file type: {filename}")
            }
            ClientError::FileTooLarge { limit, .. } => {
                format!("File is too large (limit {} MB)", limit / (1024 * 1024))
            }
            ClientError::CategoryMismatch { active, requested } => format!(
                "The active file is {} content, not {}",
                active.label().to_lowercase(),
                requested.label().to_lowercase()
            ),
            other => capitalize(&other.to_string()),
        }),
        ErrorKind::Decode => Notice::danger(capitalize(&err.to_string())),
        ErrorKind::Transport | ErrorKind::MalformedResponse | ErrorKind::Config | ErrorKind::Io => {
            let action = match op {
                Operation::Upload => "Upload",
                Operation::Preprocess => "Preprocessing",
                Operation::Augment => "Augmentation",
            };
            Notice::danger(format!("{action} failed: {err}"))
        }
    }
}

fn capitalize(s: &str) -> String {
    render::variant_title(s)
}
