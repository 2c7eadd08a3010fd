//! Active-file session state.

use crate::media::UploadedFile;

/// Where the active file is in its workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkflowState {
    #[default]
    Empty,
    OriginalLoaded,
    Preprocessed,
    Augmented,
}

/// Identifies one file selection. Results carrying an older generation are stale.
pub type Generation = u64;

#[derive(Debug, Default)]
pub struct Session {
    generation: Generation,
    active: Option<UploadedFile>,
    state: WorkflowState,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new selection. Always bumps the generation, even when the
    /// file is rejected and nothing becomes active.
    pub fn begin_selection(&mut self) -> Generation {
        self.generation += 1;
        self.active = None;
        self.state = WorkflowState::Empty;
        self.generation
    }

    pub fn activate(&mut self, generation: Generation, file: UploadedFile) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.active = Some(file);
        true
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.generation == generation
    }

    pub fn active_file(&self) -> Option<&UploadedFile> {
        self.active.as_ref()
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// Move to `state` if `generation` is still current.
    pub fn advance(&mut self, generation: Generation, state: WorkflowState) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.state = state;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_bumps_generation() {
        let mut session = Session::new();
        let first = session.begin_selection();
        assert!(session.activate(first, UploadedFile::new("a.png", vec![1u8])));
        assert!(session.advance(first, WorkflowState::OriginalLoaded));

        let second = session.begin_selection();
        assert!(second > first);
        assert!(session.active_file().is_none());
        assert_eq!(session.state(), WorkflowState::Empty);
    }

    #[test]
    fn test_stale_generation_is_ignored() {
        let mut session = Session::new();
        let old = session.begin_selection();
        let new = session.begin_selection();
        assert!(!session.activate(old, UploadedFile::new("a.png", vec![1u8])));
        assert!(!session.advance(old, WorkflowState::Preprocessed));
        assert!(session.activate(new, UploadedFile::new("b.png", vec![1u8])));
        assert_eq!(session.active_file().map(|f| f.filename()), Some("b.png"));
    }
}
