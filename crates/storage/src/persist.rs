//! Serialized session state and its migration.
//!
//! The blob is `{"state": {...}, "version": N}`. Version 0 blobs predate the
//! undo history; their tabs carry `textBoxes` only and get a one-entry
//! history on load. Unknown or malformed fields are defaulted, never fatal.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context as _;
use lectern_application::{AppState, DocumentTab, History, Snapshot, StateObserver};
use lectern_core::{Annotation, Settings, ShapeColor, TabId, ViewMode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::Storage;

pub const STATE_KEY: &str = "pdf-tabs-storage";
pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Envelope {
    #[serde(default, deserialize_with = "lenient")]
    state: StoredState,
    #[serde(default, deserialize_with = "lenient")]
    version: u32,
}

/// Settings are optional so that a missing or mistyped key falls back to the
/// `Settings` default rather than the type's zero value.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StoredState {
    #[serde(deserialize_with = "lenient")]
    tabs: Vec<Value>,
    #[serde(deserialize_with = "lenient")]
    active_tab_id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    is_edit_mode: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    view_mode: Option<String>,
    #[serde(deserialize_with = "lenient")]
    max_active_tabs: Option<usize>,
    #[serde(deserialize_with = "lenient")]
    shape_color: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StoredTab {
    #[serde(deserialize_with = "lenient")]
    id: String,
    #[serde(deserialize_with = "lenient")]
    name: String,
    #[serde(deserialize_with = "lenient")]
    path: String,
    #[serde(deserialize_with = "lenient")]
    is_active: bool,
    #[serde(deserialize_with = "lenient")]
    is_suspended: bool,
    #[serde(deserialize_with = "lenient")]
    last_accessed: i64,
    #[serde(deserialize_with = "lenient")]
    scroll_position: f64,
    #[serde(deserialize_with = "lenient")]
    zoom: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    current_page: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    total_pages: u32,
    #[serde(deserialize_with = "lenient")]
    edits: BTreeMap<String, String>,
    #[serde(deserialize_with = "lenient")]
    text_boxes: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    history: Option<Vec<Vec<Value>>>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    history_index: Option<usize>,
}

/// Reads any JSON value and falls back to `T::default()` when it is `null`
/// or the wrong shape. Browser-written state stores `NaN` as `null`.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

pub fn encode_state(state: &AppState) -> anyhow::Result<String> {
    let settings = &state.settings;
    let tabs = state
        .tabs()
        .iter()
        .map(|tab| {
            let stored = store_tab(tab)?;
            serde_json::to_value(stored).context("serialize tab")
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    let envelope = Envelope {
        state: StoredState {
            tabs,
            active_tab_id: state.active_tab_id().map(|id| id.0.clone()),
            is_edit_mode: Some(settings.is_edit_mode),
            view_mode: Some(settings.view_mode.as_str().to_string()),
            max_active_tabs: Some(settings.max_active_tabs),
            shape_color: Some(settings.shape_color.as_str().to_string()),
        },
        version: STATE_VERSION,
    };
    serde_json::to_string(&envelope).context("serialize state")
}

fn store_tab(tab: &DocumentTab) -> anyhow::Result<StoredTab> {
    let history = tab
        .history
        .entries()
        .iter()
        .map(|snapshot| store_annotations(snapshot))
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(StoredTab {
        id: tab.id.0.clone(),
        name: tab.name.clone(),
        path: tab.path.clone(),
        is_active: tab.is_active,
        is_suspended: tab.is_suspended,
        last_accessed: tab.last_accessed,
        scroll_position: tab.scroll_position,
        zoom: Some(tab.zoom),
        current_page: Some(tab.current_page),
        total_pages: tab.total_pages,
        edits: tab.edits.clone(),
        text_boxes: store_annotations(&tab.text_boxes)?,
        history: Some(history),
        history_index: Some(tab.history.index()),
    })
}

fn store_annotations(set: &[Annotation]) -> anyhow::Result<Vec<Value>> {
    set.iter()
        .map(|annotation| serde_json::to_value(annotation).context("serialize annotation"))
        .collect()
}

pub fn decode_state(raw: &str) -> anyhow::Result<AppState> {
    let envelope: Envelope = serde_json::from_str(raw).context("parse persisted state")?;
    if envelope.version > STATE_VERSION {
        tracing::warn!(
            version = envelope.version,
            supported = STATE_VERSION,
            "persisted state is newer than this build; reading known fields only"
        );
    }

    let stored = envelope.state;
    let defaults = Settings::default();
    let view_mode = match stored.view_mode.as_deref() {
        Some(raw) => raw.parse::<ViewMode>().unwrap_or_else(|_| {
            tracing::warn!(view_mode = %raw, "unknown view mode; using default");
            defaults.view_mode
        }),
        None => defaults.view_mode,
    };
    let shape_color = stored
        .shape_color
        .and_then(|raw| raw.parse::<ShapeColor>().ok())
        .unwrap_or_else(|| defaults.shape_color.clone());
    let settings = Settings {
        max_active_tabs: stored.max_active_tabs.unwrap_or(defaults.max_active_tabs),
        view_mode,
        is_edit_mode: stored.is_edit_mode.unwrap_or(defaults.is_edit_mode),
        shape_color,
    };

    let tabs = stored
        .tabs
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<StoredTab>(value) {
            Ok(tab) => Some(restore_tab(tab)),
            Err(err) => {
                tracing::warn!(error = %err, "dropping unreadable tab");
                None
            }
        })
        .collect();
    let active_tab_id = stored.active_tab_id.filter(|id| !id.is_empty()).map(TabId);
    Ok(AppState::from_parts(settings, tabs, active_tab_id))
}

fn restore_tab(stored: StoredTab) -> DocumentTab {
    let id = if stored.id.is_empty() {
        TabId::generate()
    } else {
        TabId(stored.id)
    };
    let text_boxes: Snapshot = restore_annotations(stored.text_boxes, &id).into();

    let history = match stored.history {
        Some(entries) => {
            let entries: Vec<Snapshot> = entries
                .into_iter()
                .map(|set| restore_annotations(set, &id).into())
                .collect();
            let index = stored
                .history_index
                .unwrap_or_else(|| entries.len().saturating_sub(1));
            History::from_parts(entries, index)
        }
        None => {
            tracing::debug!(tab = %id, "seeding history for legacy tab");
            History::seeded(Arc::clone(&text_boxes))
        }
    };

    // Share the live set with the history entry it mirrors.
    let text_boxes = if *history.current() == text_boxes {
        Arc::clone(history.current())
    } else {
        text_boxes
    };

    let zoom = stored.zoom.filter(|z| z.is_finite() && *z > 0.0).unwrap_or(1.0);
    DocumentTab {
        id,
        name: stored.name,
        path: stored.path,
        is_active: stored.is_active,
        is_suspended: stored.is_suspended,
        last_accessed: stored.last_accessed,
        scroll_position: stored.scroll_position.max(0.0),
        zoom,
        current_page: stored.current_page.unwrap_or(1).max(1),
        total_pages: stored.total_pages,
        edits: stored.edits,
        text_boxes,
        history,
    }
}

fn restore_annotations(values: Vec<Value>, tab: &TabId) -> Vec<Annotation> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<Annotation>(value) {
            Ok(annotation) => Some(annotation),
            Err(err) => {
                tracing::warn!(tab = %tab, error = %err, "dropping unreadable annotation");
                None
            }
        })
        .collect()
}

/// Reads and writes the session under `STATE_KEY`.
#[derive(Debug)]
pub struct Persistence {
    storage: Storage,
}

impl Persistence {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Loads the stored session. Missing or unreadable data yields the empty
    /// state; this never fails.
    pub fn load(&self) -> AppState {
        let raw = match self.storage.get(STATE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return AppState::default(),
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "failed to read stored state");
                return AppState::default();
            }
        };
        match decode_state(&raw) {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "stored state is corrupt; starting empty");
                AppState::default()
            }
        }
    }

    pub fn save(&self, state: &AppState) -> anyhow::Result<()> {
        let raw = encode_state(state)?;
        self.storage.set(STATE_KEY, &raw)
    }
}

impl StateObserver for Persistence {
    fn state_changed(&mut self, state: &AppState) {
        if let Err(err) = self.save(state) {
            tracing::error!(error = %format!("{err:#}"), "failed to persist state");
        }
    }
}
