//! One open document: view state, element edits and its annotation history.

use std::collections::BTreeMap;
use std::sync::Arc;

use lectern_core::{Annotation, AnnotationId, TabId, TabPatch};

use crate::history::{History, Snapshot};

/// One open document and its view and edit state.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentTab {
    pub id: TabId,
    pub name: String,
    pub path: String,
    pub is_active: bool,
    pub is_suspended: bool,
    pub last_accessed: i64,
    pub scroll_position: f64,
    pub zoom: f64,
    pub current_page: u32,
    pub total_pages: u32,
    pub edits: BTreeMap<String, String>,
    pub text_boxes: Snapshot,
    pub history: History,
}

impl DocumentTab {
    pub fn new(name: impl Into<String>, path: impl Into<String>, now: i64) -> Self {
        let history = History::default();
        Self {
            id: TabId::generate(),
            name: name.into(),
            path: path.into(),
            is_active: false,
            is_suspended: false,
            last_accessed: now,
            scroll_position: 0.0,
            zoom: 1.0,
            current_page: 1,
            total_pages: 0,
            edits: BTreeMap::new(),
            text_boxes: Arc::clone(history.current()),
            history,
        }
    }

    pub fn annotation(&self, id: &AnnotationId) -> Option<&Annotation> {
        self.text_boxes.iter().find(|a| &a.id == id)
    }

    pub fn apply_patch(&mut self, patch: &TabPatch) -> bool {
        let mut changed = false;
        if let Some(zoom) = patch.zoom
            && zoom.is_finite()
            && zoom > 0.0
        {
            changed |= self.zoom != zoom;
            self.zoom = zoom;
        }
        if let Some(scroll) = patch.scroll_position
            && scroll.is_finite()
        {
            let scroll = scroll.max(0.0);
            changed |= self.scroll_position != scroll;
            self.scroll_position = scroll;
        }
        if let Some(total) = patch.total_pages {
            changed |= self.total_pages != total;
            self.total_pages = total;
        }
        if let Some(page) = patch.current_page {
            let page = if self.total_pages > 0 {
                page.clamp(1, self.total_pages)
            } else {
                page.max(1)
            };
            changed |= self.current_page != page;
            self.current_page = page;
        }
        changed
    }

    /// Records `set` as the newest history entry and makes it live.
    pub(crate) fn commit(&mut self, set: Vec<Annotation>) {
        self.text_boxes = self.history.record(set);
    }

    pub(crate) fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.text_boxes = snapshot;
                true
            }
            None => false,
        }
    }

    pub(crate) fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.text_boxes = snapshot;
                true
            }
            None => false,
        }
    }
}
