//! Workbench display surface.
//!
//! Holds what is currently on screen: the controls for the active file, the
//! original and processed panels, and the alert notice. Installing a panel
//! replaces it whole and releases the blobs of the panel it replaced.

use super::controls::Controls;
use crate::render::{BlobRegistry, Rendered, TextExport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Danger,
}

impl NoticeLevel {
    /// Alert class suffix.
    pub fn css_class(&self) -> &'static str {
        match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "success",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Danger => "danger",
        }
    }
}

/// Transient user-visible message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Danger, message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelSlot {
    Original,
    Processed,
}

#[derive(Debug, Default)]
pub struct Surface {
    controls: Option<Controls>,
    original: Option<Rendered>,
    processed: Option<Rendered>,
    alert: Option<Notice>,
    blobs: BlobRegistry,
}

impl Surface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear every panel and hide the controls.
    pub fn reset(&mut self) {
        self.clear(PanelSlot::Original);
        self.clear(PanelSlot::Processed);
        self.controls = None;
        self.alert = None;
    }

    pub fn install(&mut self, slot: PanelSlot, rendered: Rendered) {
        self.blobs.register(rendered.blobs.iter().cloned());
        if let Some(old) = self.slot_mut(slot).replace(rendered) {
            self.blobs.release(&old.blob_ids());
        }
    }

    pub fn clear(&mut self, slot: PanelSlot) {
        if let Some(old) = self.slot_mut(slot).take() {
            self.blobs.release(&old.blob_ids());
        }
    }

    fn slot_mut(&mut self, slot: PanelSlot) -> &mut Option<Rendered> {
        match slot {
            PanelSlot::Original => &mut self.original,
            PanelSlot::Processed => &mut self.processed,
        }
    }

    pub fn panel(&self, slot: PanelSlot) -> Option<&Rendered> {
        match slot {
            PanelSlot::Original => self.original.as_ref(),
            PanelSlot::Processed => self.processed.as_ref(),
        }
    }

    pub fn set_controls(&mut self, controls: Option<Controls>) {
        self.controls = controls;
    }

    pub fn controls(&self) -> Option<&Controls> {
        self.controls.as_ref()
    }

    pub fn controls_mut(&mut self) -> Option<&mut Controls> {
        self.controls.as_mut()
    }

    pub fn notify(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Danger => tracing::warn!(message = %notice.message, "notice"),
            _ => tracing::debug!(level = ?notice.level, message = %notice.message, "notice"),
        }
        self.alert = Some(notice);
    }

    pub fn alert(&self) -> Option<&Notice> {
        self.alert.as_ref()
    }

    pub fn blobs(&self) -> &BlobRegistry {
        &self.blobs
    }

    /// Processed text currently on screen, if any.
    pub fn text_export(&self) -> Option<&TextExport> {
        self.processed.as_ref()?.text_export.as_ref()
    }
}
