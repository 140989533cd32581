//! Application state for Lectern: the tab registry, per-document annotation
//! history, and the suspension budget, mutated only through `Command`s.

use lectern_core::{
    Annotation, AnnotationId, AnnotationPatch, MAX_ACTIVE_TABS_LIMIT, Settings, ShapeColor, TabId,
    TabPatch, ViewMode,
};

pub mod history;
pub mod suspension;
mod tab;

pub use history::{History, MAX_HISTORY, Snapshot};
pub use tab::DocumentTab;

/// Source of `last_accessed` timestamps, in unix milliseconds.
pub trait Clock {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddTab {
        name: String,
        path: String,
    },
    RemoveTab {
        tab_id: TabId,
    },
    SetActiveTab {
        tab_id: TabId,
    },
    UpdateTab {
        tab_id: TabId,
        patch: TabPatch,
    },
    UpdateEdit {
        tab_id: TabId,
        target: String,
        text: String,
    },
    AddAnnotation {
        tab_id: TabId,
        annotation: Annotation,
    },
    UpdateAnnotationContent {
        tab_id: TabId,
        annotation_id: AnnotationId,
        content: String,
    },
    UpdateAnnotation {
        tab_id: TabId,
        annotation_id: AnnotationId,
        patch: AnnotationPatch,
    },
    DeleteAnnotation {
        tab_id: TabId,
        annotation_id: AnnotationId,
    },
    Undo {
        tab_id: TabId,
    },
    Redo {
        tab_id: TabId,
    },
    SetMaxActiveTabs(usize),
    SetViewMode(ViewMode),
    SetEditMode(bool),
    SetShapeColor(ShapeColor),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub settings: Settings,
    tabs: Vec<DocumentTab>,
    active_tab_id: Option<TabId>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            tabs: Vec::new(),
            active_tab_id: None,
        }
    }

    /// Rebuilds state from stored parts and repairs the activation
    /// invariants: the active flag follows `active_tab_id`, and the active
    /// tab is never suspended.
    pub fn from_parts(
        mut settings: Settings,
        mut tabs: Vec<DocumentTab>,
        active_tab_id: Option<TabId>,
    ) -> Self {
        settings.normalize();
        let active_tab_id = active_tab_id
            .filter(|id| tabs.iter().any(|tab| &tab.id == id))
            .or_else(|| {
                tabs.iter()
                    .find(|tab| tab.is_active)
                    .or(tabs.last())
                    .map(|tab| tab.id.clone())
            });
        for tab in &mut tabs {
            tab.is_active = Some(&tab.id) == active_tab_id.as_ref();
            if tab.is_active {
                tab.is_suspended = false;
            }
        }
        Self {
            settings,
            tabs,
            active_tab_id,
        }
    }

    pub fn tabs(&self) -> &[DocumentTab] {
        &self.tabs
    }

    pub fn tab(&self, id: &TabId) -> Option<&DocumentTab> {
        self.tabs.iter().find(|tab| &tab.id == id)
    }

    pub fn active_tab_id(&self) -> Option<&TabId> {
        self.active_tab_id.as_ref()
    }

    pub fn active_tab(&self) -> Option<&DocumentTab> {
        self.tab(self.active_tab_id.as_ref()?)
    }

    pub fn unsuspended_count(&self) -> usize {
        suspension::unsuspended_count(&self.tabs)
    }

    /// Resolves a user-supplied selector: exact id, then 1-based tab-bar
    /// position, then unique id prefix. A number in `1..=tabs.len()` is
    /// always a position, even when it is also a prefix of some id.
    pub fn find_tab(&self, selector: &str) -> Option<&DocumentTab> {
        let selector = selector.trim();
        if selector.is_empty() {
            return None;
        }
        if let Some(tab) = self.tabs.iter().find(|tab| tab.id.as_str() == selector) {
            return Some(tab);
        }
        if let Some(tab) = selector
            .parse::<usize>()
            .ok()
            .and_then(|position| position.checked_sub(1))
            .and_then(|index| self.tabs.get(index))
        {
            return Some(tab);
        }
        let mut prefixed = self
            .tabs
            .iter()
            .filter(|tab| tab.id.as_str().starts_with(selector));
        match (prefixed.next(), prefixed.next()) {
            (Some(tab), None) => Some(tab),
            _ => None,
        }
    }

    fn tab_mut(&mut self, id: &TabId) -> Option<&mut DocumentTab> {
        self.tabs.iter_mut().find(|tab| &tab.id == id)
    }

    /// Applies one command. Returns whether the state changed; commands that
    /// target an unknown tab or annotation are no-ops.
    pub fn apply(&mut self, command: Command, now: i64) -> bool {
        match command {
            Command::AddTab { name, path } => {
                self.add_tab(name, path, now);
                true
            }
            Command::RemoveTab { tab_id } => self.remove_tab(&tab_id, now),
            Command::SetActiveTab { tab_id } => self.set_active_tab(&tab_id, now),
            Command::UpdateTab { tab_id, patch } => self
                .tab_mut(&tab_id)
                .is_some_and(|tab| tab.apply_patch(&patch)),
            Command::UpdateEdit {
                tab_id,
                target,
                text,
            } => {
                let Some(tab) = self.tab_mut(&tab_id) else {
                    return false;
                };
                if text.is_empty() {
                    tab.edits.remove(&target).is_some()
                } else {
                    tab.edits.insert(target, text.clone()).as_ref() != Some(&text)
                }
            }
            Command::AddAnnotation { tab_id, annotation } => {
                self.edit_annotations(&tab_id, |set| {
                    if set.iter().any(|a| a.id == annotation.id) {
                        return false;
                    }
                    set.push(annotation);
                    true
                })
            }
            Command::UpdateAnnotationContent {
                tab_id,
                annotation_id,
                content,
            } => self.edit_annotations(&tab_id, |set| {
                set.iter_mut()
                    .find(|a| a.id == annotation_id)
                    .is_some_and(|a| a.set_content(content))
            }),
            Command::UpdateAnnotation {
                tab_id,
                annotation_id,
                patch,
            } => self.edit_annotations(&tab_id, |set| {
                set.iter_mut()
                    .find(|a| a.id == annotation_id)
                    .is_some_and(|a| a.apply_patch(&patch))
            }),
            Command::DeleteAnnotation {
                tab_id,
                annotation_id,
            } => self.edit_annotations(&tab_id, |set| {
                let before = set.len();
                set.retain(|a| a.id != annotation_id);
                set.len() != before
            }),
            Command::Undo { tab_id } => self.tab_mut(&tab_id).is_some_and(DocumentTab::undo),
            Command::Redo { tab_id } => self.tab_mut(&tab_id).is_some_and(DocumentTab::redo),
            Command::SetMaxActiveTabs(max) => {
                let max = max.clamp(1, MAX_ACTIVE_TABS_LIMIT);
                let changed = self.settings.max_active_tabs != max;
                self.settings.max_active_tabs = max;
                changed
            }
            Command::SetViewMode(mode) => {
                let changed = self.settings.view_mode != mode;
                self.settings.view_mode = mode;
                changed
            }
            Command::SetEditMode(enabled) => {
                let changed = self.settings.is_edit_mode != enabled;
                self.settings.is_edit_mode = enabled;
                changed
            }
            Command::SetShapeColor(color) => {
                let changed = self.settings.shape_color != color;
                self.settings.shape_color = color;
                changed
            }
        }
    }

    /// Opens a document in a new, active tab and returns its id.
    pub fn add_tab(&mut self, name: impl Into<String>, path: impl Into<String>, now: i64) -> TabId {
        for tab in &mut self.tabs {
            tab.is_active = false;
        }
        let mut tab = DocumentTab::new(name, path, now);
        tab.is_active = true;
        let id = tab.id.clone();
        tracing::debug!(tab = %id, name = %tab.name, "opened tab");
        self.tabs.push(tab);
        self.active_tab_id = Some(id.clone());
        suspension::enforce(&mut self.tabs, self.settings.max_active_tabs);
        id
    }

    fn remove_tab(&mut self, id: &TabId, now: i64) -> bool {
        let Some(index) = self.tabs.iter().position(|tab| &tab.id == id) else {
            return false;
        };
        let removed = self.tabs.remove(index);
        tracing::debug!(tab = %removed.id, "closed tab");

        if self.active_tab_id.as_ref() == Some(&removed.id) {
            self.active_tab_id = None;
            if let Some(next) = self.tabs.last_mut() {
                next.is_active = true;
                next.is_suspended = false;
                next.last_accessed = now;
                self.active_tab_id = Some(next.id.clone());
            }
        }
        true
    }

    fn set_active_tab(&mut self, id: &TabId, now: i64) -> bool {
        if !self.tabs.iter().any(|tab| &tab.id == id) {
            return false;
        }
        for tab in &mut self.tabs {
            if &tab.id == id {
                tab.is_active = true;
                tab.is_suspended = false;
                tab.last_accessed = now;
            } else {
                tab.is_active = false;
            }
        }
        self.active_tab_id = Some(id.clone());
        suspension::enforce(&mut self.tabs, self.settings.max_active_tabs);
        true
    }

    /// Runs `edit` against a copy of the tab's live set and, if it reports a
    /// change, records the result as one undoable step.
    fn edit_annotations(
        &mut self,
        id: &TabId,
        edit: impl FnOnce(&mut Vec<Annotation>) -> bool,
    ) -> bool {
        let Some(tab) = self.tab_mut(id) else {
            return false;
        };
        let mut set = tab.text_boxes.to_vec();
        if !edit(&mut set) {
            return false;
        }
        tab.commit(set);
        true
    }
}

/// Notified after every dispatch that changed the state.
pub trait StateObserver {
    fn state_changed(&mut self, state: &AppState);
}

/// Owns the state and serializes every mutation through `dispatch`.
pub struct Store<C: Clock = SystemClock> {
    state: AppState,
    clock: C,
    observers: Vec<Box<dyn StateObserver>>,
}

impl Store<SystemClock> {
    pub fn new(state: AppState) -> Self {
        Self::with_clock(state, SystemClock)
    }
}

impl<C: Clock> Store<C> {
    pub fn with_clock(state: AppState, clock: C) -> Self {
        Self {
            state,
            clock,
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: impl StateObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn into_state(self) -> AppState {
        self.state
    }

    pub fn dispatch(&mut self, command: Command) -> bool {
        let now = self.clock.now_millis();
        let changed = self.state.apply(command, now);
        if changed {
            self.notify();
        }
        changed
    }

    /// Same as dispatching `AddTab`, but hands back the new tab's id.
    pub fn open_tab(&mut self, name: impl Into<String>, path: impl Into<String>) -> TabId {
        let now = self.clock.now_millis();
        let id = self.state.add_tab(name, path, now);
        self.notify();
        id
    }

    fn notify(&mut self) {
        for observer in &mut self.observers {
            observer.state_changed(&self.state);
        }
    }
}

impl<C: Clock + std::fmt::Debug> std::fmt::Debug for Store<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.state)
            .field("clock", &self.clock)
            .field("observers", &self.observers.len())
            .finish()
    }
}
