//! Test helpers and fixtures.

use std::cell::Cell;

use lectern_application::{AppState, Clock, Store};
use lectern_core::{
    Annotation, AnnotationKind, HighlightBody, HighlightRect, Settings, ShapeBody, ShapeKind,
    TabId, TextBody, TextStyle,
};

/// Strictly increasing clock, one millisecond per reading.
#[derive(Debug, Default)]
pub struct TickClock {
    now: Cell<i64>,
}

impl TickClock {
    pub fn starting_at(now: i64) -> Self {
        Self {
            now: Cell::new(now),
        }
    }
}

impl Clock for TickClock {
    fn now_millis(&self) -> i64 {
        let now = self.now.get() + 1;
        self.now.set(now);
        now
    }
}

pub fn make_settings(max_active_tabs: usize) -> Settings {
    Settings {
        max_active_tabs,
        ..Settings::default()
    }
}

pub fn make_store(max_active_tabs: usize) -> Store<TickClock> {
    Store::with_clock(
        AppState::new(make_settings(max_active_tabs)),
        TickClock::default(),
    )
}

/// Opens one tab per name, in order, returning their ids.
pub fn open_all(store: &mut Store<TickClock>, names: &[&str]) -> Vec<TabId> {
    names
        .iter()
        .map(|name| store.open_tab(*name, format!("/docs/{name}.pdf")))
        .collect()
}

pub fn text_note(page: u32, content: &str) -> Annotation {
    let body = TextBody {
        content: content.to_string(),
        color: None,
    };
    Annotation::new(page, 10.0, 20.0, AnnotationKind::text(TextStyle::Text, body))
}

pub fn rect(page: u32, x: f64, y: f64) -> Annotation {
    let body = ShapeBody {
        color: Some("#00ff00".to_string()),
        ..ShapeBody::default()
    };
    Annotation::new(page, x, y, AnnotationKind::shape(ShapeKind::Rect, body))
}

pub fn highlight(page: u32, content: &str, lines: usize) -> Annotation {
    let rects = (0..lines)
        .map(|line| HighlightRect {
            x: 5.0,
            y: 10.0 + 3.0 * line as f64,
            width: 60.0,
            height: 2.0,
        })
        .collect();
    let body = HighlightBody {
        content: content.to_string(),
        color: Some("#ffff00".to_string()),
        rects,
    };
    Annotation::new(page, 5.0, 10.0, AnnotationKind::Highlight(body))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lectern_application::{Command, MAX_HISTORY};
    use lectern_core::AnnotationPatch;
    use lectern_storage::{Persistence, Storage, decode_state, encode_state};
    use proptest::prelude::*;

    use super::*;

    fn assert_invariants(state: &AppState, max_active_tabs: usize) {
        let active: Vec<_> = state.tabs().iter().filter(|tab| tab.is_active).collect();
        if state.tabs().is_empty() {
            assert!(active.is_empty());
            assert!(state.active_tab_id().is_none());
        } else {
            assert_eq!(active.len(), 1);
            assert_eq!(state.active_tab_id(), Some(&active[0].id));
            assert!(!active[0].is_suspended);
        }
        assert!(state.unsuspended_count() <= max_active_tabs);
        for tab in state.tabs() {
            assert!(!tab.history.is_empty());
            assert!(tab.history.len() <= MAX_HISTORY);
            assert!(tab.history.index() < tab.history.len());
            assert_eq!(&tab.text_boxes, tab.history.current());
        }
    }

    #[test]
    fn fourth_tab_suspends_least_recently_used() {
        let mut store = make_store(3);
        let ids = open_all(&mut store, &["a", "b", "c", "d"]);
        let state = store.state();

        assert_eq!(state.unsuspended_count(), 3);
        assert!(state.tab(&ids[0]).unwrap().is_suspended);
        assert_eq!(state.active_tab_id(), Some(&ids[3]));
        assert_invariants(state, 3);
    }

    #[test]
    fn reactivation_suspends_the_next_oldest() {
        let mut store = make_store(3);
        let ids = open_all(&mut store, &["a", "b", "c", "d"]);

        store.dispatch(Command::SetActiveTab {
            tab_id: ids[0].clone(),
        });
        let state = store.state();
        assert!(!state.tab(&ids[0]).unwrap().is_suspended);
        assert!(state.tab(&ids[1]).unwrap().is_suspended);
        assert_invariants(state, 3);

        // b was just suspended; touching c makes d the oldest live tab.
        store.dispatch(Command::SetActiveTab {
            tab_id: ids[2].clone(),
        });
        store.dispatch(Command::SetActiveTab {
            tab_id: ids[1].clone(),
        });
        let state = store.state();
        assert!(state.tab(&ids[3]).unwrap().is_suspended);
        assert!(!state.tab(&ids[1]).unwrap().is_suspended);
        assert_invariants(state, 3);
    }

    #[test]
    fn closing_active_tab_promotes_last_and_wakes_it() {
        let mut store = make_store(1);
        let ids = open_all(&mut store, &["a", "b", "c"]);
        assert!(store.state().tab(&ids[1]).unwrap().is_suspended);

        store.dispatch(Command::SetActiveTab {
            tab_id: ids[0].clone(),
        });
        store.dispatch(Command::RemoveTab {
            tab_id: ids[0].clone(),
        });
        let state = store.state();
        let active = state.active_tab().unwrap();
        assert_eq!(active.id, ids[2]);
        assert!(!active.is_suspended);
        assert_invariants(state, 1);
    }

    #[test]
    fn annotation_history_round_trips() {
        let mut store = make_store(3);
        let tab_id = store.open_tab("paper", "/docs/paper.pdf");
        let note = text_note(1, "intro");
        let note_id = note.id.clone();
        let annotations = [note, rect(2, 30.0, 40.0), highlight(3, "key claim", 2)];
        for annotation in annotations {
            assert!(store.dispatch(Command::AddAnnotation {
                tab_id: tab_id.clone(),
                annotation,
            }));
        }
        assert!(store.dispatch(Command::UpdateAnnotationContent {
            tab_id: tab_id.clone(),
            annotation_id: note_id.clone(),
            content: "introduction".to_string(),
        }));
        let final_set = Arc::clone(&store.state().tab(&tab_id).unwrap().text_boxes);

        for _ in 0..4 {
            assert!(store.dispatch(Command::Undo {
                tab_id: tab_id.clone()
            }));
        }
        assert!(!store.dispatch(Command::Undo {
            tab_id: tab_id.clone()
        }));
        assert!(store.state().tab(&tab_id).unwrap().text_boxes.is_empty());

        for _ in 0..4 {
            assert!(store.dispatch(Command::Redo {
                tab_id: tab_id.clone()
            }));
        }
        let tab = store.state().tab(&tab_id).unwrap();
        assert_eq!(tab.text_boxes, final_set);
        assert_eq!(
            tab.annotation(&note_id).and_then(Annotation::content),
            Some("introduction")
        );
    }

    #[test]
    fn new_edit_after_undo_drops_redo_branch() {
        let mut store = make_store(3);
        let tab_id = store.open_tab("paper", "/docs/paper.pdf");
        let shape = rect(1, 10.0, 10.0);
        let shape_id = shape.id.clone();
        store.dispatch(Command::AddAnnotation {
            tab_id: tab_id.clone(),
            annotation: shape,
        });
        store.dispatch(Command::UpdateAnnotation {
            tab_id: tab_id.clone(),
            annotation_id: shape_id.clone(),
            patch: AnnotationPatch {
                x: Some(50.0),
                ..AnnotationPatch::default()
            },
        });
        store.dispatch(Command::Undo {
            tab_id: tab_id.clone(),
        });
        store.dispatch(Command::DeleteAnnotation {
            tab_id: tab_id.clone(),
            annotation_id: shape_id,
        });

        let tab = store.state().tab(&tab_id).unwrap();
        assert!(!tab.history.can_redo());
        assert_eq!(tab.history.len(), 3);
        assert!(tab.text_boxes.is_empty());
    }

    #[test]
    fn session_survives_reopen() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let db_path = dir.path().join("lectern.db");
        let (tab_id, note_id) = {
            let mut store = make_store(2);
            store.subscribe(Persistence::new(Storage::open(&db_path)?));
            let tab_id = store.open_tab("paper", "/docs/paper.pdf");
            let note = text_note(4, "revisit");
            let note_id = note.id.clone();
            store.dispatch(Command::AddAnnotation {
                tab_id: tab_id.clone(),
                annotation: note,
            });
            store.dispatch(Command::UpdateEdit {
                tab_id: tab_id.clone(),
                target: "p4-line2".to_string(),
                text: "fixed typo".to_string(),
            });
            (tab_id, note_id)
        };

        let state = Persistence::new(Storage::open(&db_path)?).load();
        assert_eq!(state.settings.max_active_tabs, 2);
        let tab = state.tab(&tab_id).expect("tab restored");
        assert!(tab.is_active);
        assert!(tab.annotation(&note_id).is_some());
        assert_eq!(tab.history.len(), 2);
        assert_eq!(tab.edits.get("p4-line2").map(String::as_str), Some("fixed typo"));
        Ok(())
    }

    #[test]
    fn legacy_blob_gets_seeded_history() -> anyhow::Result<()> {
        let blob = serde_json::json!({
            "state": {
                "tabs": [{
                    "id": "legacy",
                    "name": "old.pdf",
                    "path": "/docs/old.pdf",
                    "isActive": true,
                    "lastAccessed": 5,
                    "textBoxes": [
                        { "id": "n1", "type": "text", "page": 1, "x": 1.0, "y": 2.0, "content": "kept" },
                        { "id": "n2", "type": "sparkle", "page": 1, "x": 1.0, "y": 2.0 }
                    ]
                }],
                "activeTabId": "legacy"
            },
            "version": 0
        });
        let state = decode_state(&blob.to_string())?;
        let tab = state.tab(&TabId::from("legacy")).expect("legacy tab");

        assert_eq!(tab.text_boxes.len(), 1);
        assert_eq!(tab.history.len(), 1);
        assert_eq!(tab.history.index(), 0);
        assert_eq!(tab.history.current(), &tab.text_boxes);
        assert!(!tab.history.can_undo());
        Ok(())
    }

    #[derive(Debug, Clone)]
    enum Op {
        Open,
        Activate(usize),
        Close(usize),
        Note(usize),
        Shape(usize, u8, u8),
        Delete(usize, usize),
        Undo(usize),
        Redo(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            2 => Just(Op::Open),
            2 => any::<usize>().prop_map(Op::Activate),
            1 => any::<usize>().prop_map(Op::Close),
            3 => any::<usize>().prop_map(Op::Note),
            2 => (any::<usize>(), 0u8..=100, 0u8..=100).prop_map(|(t, x, y)| Op::Shape(t, x, y)),
            1 => (any::<usize>(), any::<usize>()).prop_map(|(t, a)| Op::Delete(t, a)),
            2 => any::<usize>().prop_map(Op::Undo),
            1 => any::<usize>().prop_map(Op::Redo),
        ]
    }

    fn pick(state: &AppState, index: usize) -> Option<TabId> {
        let tabs = state.tabs();
        (!tabs.is_empty()).then(|| tabs[index % tabs.len()].id.clone())
    }

    fn run_op(store: &mut Store<TickClock>, op: Op) {
        let state = store.state();
        match op {
            Op::Open => {
                let n = state.tabs().len();
                store.open_tab(format!("doc{n}"), format!("/docs/doc{n}.pdf"));
            }
            Op::Activate(t) => {
                if let Some(tab_id) = pick(state, t) {
                    store.dispatch(Command::SetActiveTab { tab_id });
                }
            }
            Op::Close(t) => {
                if let Some(tab_id) = pick(state, t) {
                    store.dispatch(Command::RemoveTab { tab_id });
                }
            }
            Op::Note(t) => {
                if let Some(tab_id) = pick(state, t) {
                    store.dispatch(Command::AddAnnotation {
                        tab_id,
                        annotation: text_note(1, "note"),
                    });
                }
            }
            Op::Shape(t, x, y) => {
                if let Some(tab_id) = pick(state, t) {
                    store.dispatch(Command::AddAnnotation {
                        tab_id,
                        annotation: rect(2, f64::from(x), f64::from(y)),
                    });
                }
            }
            Op::Delete(t, a) => {
                let Some(tab_id) = pick(state, t) else {
                    return;
                };
                let Some(annotation_id) = state.tab(&tab_id).and_then(|tab| {
                    let set = &tab.text_boxes;
                    (!set.is_empty()).then(|| set[a % set.len()].id.clone())
                }) else {
                    return;
                };
                store.dispatch(Command::DeleteAnnotation {
                    tab_id,
                    annotation_id,
                });
            }
            Op::Undo(t) => {
                if let Some(tab_id) = pick(state, t) {
                    store.dispatch(Command::Undo { tab_id });
                }
            }
            Op::Redo(t) => {
                if let Some(tab_id) = pick(state, t) {
                    store.dispatch(Command::Redo { tab_id });
                }
            }
        }
    }

    proptest! {
        #[test]
        fn invariants_hold_under_random_commands(
            max_active_tabs in 1usize..=4,
            ops in prop::collection::vec(op_strategy(), 0..120),
        ) {
            let mut store = make_store(max_active_tabs);
            for op in ops {
                run_op(&mut store, op);
                assert_invariants(store.state(), max_active_tabs);
            }
        }

        #[test]
        fn history_never_exceeds_bound(notes in 0usize..140) {
            let mut store = make_store(3);
            let tab_id = store.open_tab("long", "/docs/long.pdf");
            for i in 0..notes {
                store.dispatch(Command::AddAnnotation {
                    tab_id: tab_id.clone(),
                    annotation: text_note(1, &format!("note {i}")),
                });
            }
            let tab = store.state().tab(&tab_id).unwrap();
            prop_assert_eq!(tab.history.len(), (notes + 1).min(MAX_HISTORY));
            prop_assert_eq!(tab.history.index(), tab.history.len() - 1);
            prop_assert_eq!(tab.text_boxes.len(), notes);
        }

        #[test]
        fn undo_then_redo_restores_state(edits in 1usize..30, undos in 0usize..40) {
            let mut store = make_store(3);
            let tab_id = store.open_tab("doc", "/docs/doc.pdf");
            for i in 0..edits {
                store.dispatch(Command::AddAnnotation {
                    tab_id: tab_id.clone(),
                    annotation: text_note(1, &format!("n{i}")),
                });
            }
            let before = store.state().tab(&tab_id).unwrap().text_boxes.clone();
            let mut undone = 0;
            for _ in 0..undos {
                if store.dispatch(Command::Undo { tab_id: tab_id.clone() }) {
                    undone += 1;
                }
            }
            prop_assert_eq!(undone, undos.min(edits));
            for _ in 0..undone {
                let redone = store.dispatch(Command::Redo { tab_id: tab_id.clone() });
                prop_assert!(redone);
            }
            prop_assert_eq!(&store.state().tab(&tab_id).unwrap().text_boxes, &before);
        }

        #[test]
        fn encoding_is_stable_across_reload(
            ops in prop::collection::vec(op_strategy(), 0..60),
        ) {
            let mut store = make_store(2);
            for op in ops {
                run_op(&mut store, op);
            }
            let first = encode_state(store.state()).unwrap();
            let reloaded = decode_state(&first).unwrap();
            prop_assert_eq!(&reloaded, store.state());
            prop_assert_eq!(encode_state(&reloaded).unwrap(), first);
        }
    }
}
