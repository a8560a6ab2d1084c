//! Narrow interfaces to the world outside the engine, plus in-memory implementations.
//!
//! The editor never renders, persists or uploads anything itself. It reports through a
//! [`MessageSink`], announces finished operations through a [`ModelUpdateNotifier`],
//! stores clipboard payloads in a [`ClipboardStore`] and asks a [`FileStore`] to
//! duplicate images during copy.

use crate::clipboard::ProcessClipboardData;
use crate::error::FileStoreError;
use crate::model::ShapeId;
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// User-visible messages: rejection reasons and limit warnings.
pub trait MessageSink: Send + Sync {
    fn add_error(&self, message: &str);
    fn add_warning(&self, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Add,
    Update,
    Remove,
}

/// Receives exactly one notification per completed structural operation.
pub trait ModelUpdateNotifier: Send + Sync {
    fn notify(&self, kind: ChangeKind, focused_id: ShapeId);
}

pub trait ClipboardStore: Send + Sync {
    fn set_data(&self, data: ProcessClipboardData);
    fn get_data(&self) -> Option<ProcessClipboardData>;
}

/// Result of duplicating one stored image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopiedImage {
    pub original_id: String,
    pub new_image_id: String,
    pub new_image_url: String,
}

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn copy_artifact_images_to_filestore(
        &self,
        image_ids: Vec<String>,
        expiry: Duration,
    ) -> Result<Vec<CopiedImage>, FileStoreError>;
}

/// Forwards messages to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMessages;

impl MessageSink for LogMessages {
    fn add_error(&self, message: &str) {
        log::error!("{}", message);
    }

    fn add_warning(&self, message: &str) {
        log::warn!("{}", message);
    }
}

/// Keeps every message so callers can inspect them after an operation.
#[derive(Debug, Default)]
pub struct RecordingMessages {
    errors: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
}

impl RecordingMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl MessageSink for RecordingMessages {
    fn add_error(&self, message: &str) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }

    fn add_warning(&self, message: &str) {
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl ModelUpdateNotifier for NoopNotifier {
    fn notify(&self, _kind: ChangeKind, _focused_id: ShapeId) {}
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<(ChangeKind, ShapeId)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(ChangeKind, ShapeId)> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ModelUpdateNotifier for RecordingNotifier {
    fn notify(&self, kind: ChangeKind, focused_id: ShapeId) {
        log::debug!("model update {:?} focused on {}", kind, focused_id);
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((kind, focused_id));
    }
}

#[derive(Debug, Default)]
pub struct MemoryClipboard {
    data: Mutex<Option<ProcessClipboardData>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardStore for MemoryClipboard {
    fn set_data(&self, data: ProcessClipboardData) {
        *self.data.lock().unwrap_or_else(PoisonError::into_inner) = Some(data);
    }

    fn get_data(&self) -> Option<ProcessClipboardData> {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
