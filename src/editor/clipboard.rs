use super::{ProcessEditor, accepts_task_content, merge_entries_fed_by, position_between};
use crate::clipboard::{PasteOutcome, ProcessClipboardData, build_clipboard_data, paste_into};
use crate::collab::{ChangeKind, ClipboardStore, CopiedImage};
use crate::error::{EditError, FileStoreError};
use crate::model::{IMAGE_ID_KEY, IMAGE_URL_KEY, ProcessGraph, PropertyValue, Shape, ShapeId, ShapeKind};
use ahash::AHashMap;
use std::sync::Arc;

impl ProcessEditor {
    /// Copies a selection into the clipboard store and returns the payload.
    ///
    /// Images of copied system tasks are duplicated through the file store. When that
    /// fails or times out the copy still succeeds, without the image fields.
    ///
    /// `image_copy_timeout` is enforced only inside a tokio runtime, which must have its
    /// time driver enabled. Under any other executor the request is awaited unbounded.
    pub async fn copy(
        &self,
        graph: &ProcessGraph,
        selection: &[ShapeId],
    ) -> Result<ProcessClipboardData, EditError> {
        let clipboard = self.clipboard_store()?;
        let mut data = build_clipboard_data(graph, selection).map_err(|e| self.reject(e.into()))?;
        self.duplicate_images(&mut data).await;
        clipboard.set_data(data.clone());
        log::debug!(
            "copied {} shapes, {} links",
            data.shapes.len(),
            data.links.len()
        );
        Ok(data)
    }

    /// Pastes the clipboard content between `source_ids` and `destination_id`.
    pub fn paste(
        &self,
        graph: &mut ProcessGraph,
        source_ids: &[ShapeId],
        destination_id: ShapeId,
    ) -> Result<PasteOutcome, EditError> {
        let clipboard = self.clipboard_store()?;
        let data = match clipboard.get_data() {
            Some(data) if !data.is_empty() => data,
            _ => return Err(self.reject(EditError::EmptyClipboard)),
        };

        let destination_kind = self.kind_of(graph, destination_id)?;
        let Some(&first_source) = source_ids.first() else {
            return Err(self.reject(EditError::MissingSources(destination_id)));
        };
        for &source_id in source_ids {
            let source_kind = self.kind_of(graph, source_id)?;
            if !graph.next_ids(source_id).contains(&destination_id) {
                return Err(self.reject(EditError::LinkNotFound {
                    source_id,
                    destination_id,
                }));
            }
            if !accepts_task_content(source_kind, destination_kind) {
                return Err(self.reject(EditError::InvalidInsertionPoint {
                    kind: data.shapes[0].kind,
                    source_id,
                    destination_id,
                }));
            }
            if source_kind == ShapeKind::UserDecision && !data.is_pastable_after_user_decision {
                return Err(self.reject(EditError::NotPastableAfterUserDecision {
                    decision_id: source_id,
                }));
            }
        }
        data.validate().map_err(|e| self.reject(e.into()))?;

        let total = self.ensure_budget(graph, data.shapes.len())?;
        let moved_entries = if source_ids.len() > 1 {
            merge_entries_fed_by(graph, source_ids, destination_id)
        } else {
            Vec::new()
        };
        self.warn_if_near_limit(total);

        let anchor = position_between(graph, first_source, destination_id);
        let outcome = paste_into(
            graph,
            &data,
            source_ids,
            destination_id,
            anchor,
            &moved_entries,
        )
        .map_err(|e| self.reject(e.into()))?;

        log::debug!(
            "pasted {} shapes before {}, first is {}",
            outcome.id_map.len(),
            destination_id,
            outcome.first_id
        );
        self.notifier.notify(ChangeKind::Add, outcome.first_id);
        Ok(outcome)
    }

    fn clipboard_store(&self) -> Result<&Arc<dyn ClipboardStore>, EditError> {
        self.clipboard
            .as_ref()
            .ok_or_else(|| self.reject(EditError::MissingCollaborator("clipboard store")))
    }

    async fn duplicate_images(&self, data: &mut ProcessClipboardData) {
        let image_ids: Vec<String> = data
            .shapes
            .iter()
            .filter_map(durable_image_id)
            .collect();
        if image_ids.is_empty() {
            return;
        }

        let result = match &self.file_store {
            Some(store) => {
                let request = store
                    .copy_artifact_images_to_filestore(image_ids, self.config.image_copy_expiry);
                match self.config.image_copy_timeout {
                    Some(limit) if tokio::runtime::Handle::try_current().is_ok() => {
                        tokio::time::timeout(limit, request)
                            .await
                            .unwrap_or(Err(FileStoreError::TimedOut))
                    }
                    Some(_) => {
                        log::debug!("no tokio runtime, image copy runs without a timeout");
                        request.await
                    }
                    None => request.await,
                }
            }
            None => Err(FileStoreError::Request("no file store configured".to_string())),
        };

        match result {
            Ok(copies) => apply_copied_images(data, &copies),
            Err(error) => {
                let message = format!("Images were not copied: {}", error);
                log::warn!("{}", message);
                self.messages.add_warning(&message);
                for shape in data.shapes.iter_mut().filter(|s| s.kind == ShapeKind::SystemTask) {
                    strip_image(shape);
                }
            }
        }
    }
}

/// Image id of a system task whose image has been saved, not just previewed.
fn durable_image_id(shape: &Shape) -> Option<String> {
    if shape.kind != ShapeKind::SystemTask {
        return None;
    }
    let id = match shape.property(IMAGE_ID_KEY)? {
        PropertyValue::Text(text) if !text.is_empty() => text.clone(),
        PropertyValue::Number(number) => PropertyValue::Number(*number).to_string(),
        _ => return None,
    };
    let transient = shape
        .property(IMAGE_URL_KEY)
        .and_then(PropertyValue::as_text)
        .is_some_and(|url| url.starts_with("blob:") || url.starts_with("data:"));
    (!transient).then_some(id)
}

fn apply_copied_images(data: &mut ProcessClipboardData, copies: &[CopiedImage]) {
    let by_original: AHashMap<&str, &CopiedImage> = copies
        .iter()
        .map(|copy| (copy.original_id.as_str(), copy))
        .collect();
    for shape in data.shapes.iter_mut() {
        let Some(original_id) = durable_image_id(shape) else {
            continue;
        };
        match by_original.get(original_id.as_str()) {
            Some(copy) => {
                shape.set_property(IMAGE_ID_KEY, PropertyValue::Text(copy.new_image_id.clone()));
                shape.set_property(IMAGE_URL_KEY, PropertyValue::Text(copy.new_image_url.clone()));
            }
            None => {
                log::warn!("no copy returned for image {}", original_id);
                strip_image(shape);
            }
        }
    }
}

fn strip_image(shape: &mut Shape) {
    shape.remove_property(IMAGE_ID_KEY);
    shape.remove_property(IMAGE_URL_KEY);
}
