use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use clap::Parser as _;
use directories::ProjectDirs;
use lectern_application::{AppState, Command, DocumentTab, Store};
use lectern_core::{
    Annotation, AnnotationId, AnnotationKind, AnnotationPatch, HighlightBody, ShapeBody, TabId,
    TabPatch, TextBody,
};
use lectern_engine::{Engine, display_name, fingerprint};
use lectern_storage::{Dictionary, Persistence, Storage};

mod cli;
mod logging;

use cli::{Cli, Command as CliCommand};
use logging::{LogConfig, init_logging};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log_config = LogConfig::from_verbosity(cli.verbose)
        .with_format(cli.log_format)
        .with_log_file(cli.log_file.clone());
    init_logging(&log_config).context("initialize logging")?;

    match cli.command {
        CliCommand::Define { word } => define(&word),
        CliCommand::Fingerprint { file } => {
            println!("{}", fingerprint(&file)?);
            Ok(())
        }
        command => {
            let mut store = open_session(cli.db)?;
            execute(&mut store, command)
        }
    }
}

fn open_session(db: Option<PathBuf>) -> anyhow::Result<Store> {
    let db_path = match db {
        Some(path) => path,
        None => default_db_path()?,
    };
    let storage = Storage::open(&db_path)?;
    let persistence = Persistence::new(storage);
    let state = persistence.load();
    tracing::debug!(db = %db_path.display(), tabs = state.tabs().len(), "session loaded");

    let mut store = Store::new(state);
    store.subscribe(persistence);
    Ok(store)
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let project_dirs =
        ProjectDirs::from("dev", "lectern", "lectern").context("resolve project dirs")?;
    let config_dir = project_dirs.config_dir();
    fs::create_dir_all(config_dir)
        .with_context(|| format!("create config dir {}", config_dir.display()))?;
    Ok(config_dir.join("lectern.db"))
}

fn execute(store: &mut Store, command: CliCommand) -> anyhow::Result<()> {
    match command {
        CliCommand::Open { file, name } => open(store, &file, name),
        CliCommand::Close { tab } => {
            let tab_id = resolve_tab(store.state(), &tab)?;
            store.dispatch(Command::RemoveTab { tab_id });
            print_tabs(store.state());
            Ok(())
        }
        CliCommand::Activate { tab } => {
            let tab_id = resolve_tab(store.state(), &tab)?;
            store.dispatch(Command::SetActiveTab { tab_id });
            print_tabs(store.state());
            Ok(())
        }
        CliCommand::List => {
            print_tabs(store.state());
            Ok(())
        }
        CliCommand::View(args) => {
            let tab_id = resolve_tab(store.state(), &args.tab)?;
            let patch = TabPatch {
                zoom: args.zoom,
                scroll_position: args.scroll,
                current_page: args.page,
                total_pages: args.total_pages,
            };
            if patch.is_empty() {
                bail!("nothing to update: pass --zoom, --scroll, --page or --total-pages");
            }
            store.dispatch(Command::UpdateTab {
                tab_id: tab_id.clone(),
                patch,
            });
            if let Some(tab) = store.state().tab(&tab_id) {
                println!(
                    "page {}/{} zoom {:.2} scroll {:.1}",
                    tab.current_page, tab.total_pages, tab.zoom, tab.scroll_position
                );
            }
            Ok(())
        }
        CliCommand::Note(args) => {
            let tab_id = resolve_tab(store.state(), &args.tab)?;
            let body = TextBody {
                content: args.text,
                color: args.color.map(|color| color.to_string()),
            };
            let kind = AnnotationKind::text(args.style, body);
            add_annotation(store, tab_id, Annotation::new(args.at.page, args.at.x, args.at.y, kind))
        }
        CliCommand::Shape(args) => {
            let tab_id = resolve_tab(store.state(), &args.tab)?;
            let color = args
                .color
                .unwrap_or_else(|| store.state().settings.shape_color.clone());
            let body = ShapeBody {
                width: args.width,
                height: args.height,
                rotation: args.rotation.rem_euclid(360.0),
                color: Some(color.to_string()),
            };
            let kind = AnnotationKind::shape(args.kind, body);
            add_annotation(store, tab_id, Annotation::new(args.at.page, args.at.x, args.at.y, kind))
        }
        CliCommand::Highlight(args) => {
            let tab_id = resolve_tab(store.state(), &args.tab)?;
            // Anchored at the first line's origin.
            let (x, y) = args
                .rects
                .first()
                .map(|rect| (rect.x, rect.y))
                .unwrap_or_default();
            let kind = AnnotationKind::Highlight(HighlightBody {
                content: args.text,
                color: args.color.map(|color| color.to_string()),
                rects: args.rects,
            });
            add_annotation(store, tab_id, Annotation::new(args.page, x, y, kind))
        }
        CliCommand::SetText { tab, id, text } => {
            let (tab_id, annotation_id) = resolve_annotation(store.state(), &tab, &id)?;
            let changed = store.dispatch(Command::UpdateAnnotationContent {
                tab_id,
                annotation_id: annotation_id.clone(),
                content: text,
            });
            if !changed {
                bail!("annotation {annotation_id} has no text");
            }
            println!("{annotation_id}");
            Ok(())
        }
        CliCommand::Move(args) => {
            let (tab_id, annotation_id) = resolve_annotation(store.state(), &args.tab, &args.id)?;
            let patch = AnnotationPatch {
                page: args.page,
                x: args.x,
                y: args.y,
                width: args.width,
                height: args.height,
                rotation: args.rotation,
                color: args.color,
                content: None,
            };
            if patch == AnnotationPatch::default() {
                bail!("nothing to update");
            }
            if !store.dispatch(Command::UpdateAnnotation {
                tab_id,
                annotation_id: annotation_id.clone(),
                patch,
            }) {
                tracing::info!(annotation = %annotation_id, "patch did not apply to this annotation type");
            }
            println!("{annotation_id}");
            Ok(())
        }
        CliCommand::Delete { tab, id } => {
            let (tab_id, annotation_id) = resolve_annotation(store.state(), &tab, &id)?;
            store.dispatch(Command::DeleteAnnotation {
                tab_id,
                annotation_id,
            });
            Ok(())
        }
        CliCommand::Undo { tab } => {
            let tab_id = resolve_tab(store.state(), &tab)?;
            if !store.dispatch(Command::Undo {
                tab_id: tab_id.clone(),
            }) {
                println!("nothing to undo");
            }
            print_history(store.state(), &tab_id);
            Ok(())
        }
        CliCommand::Redo { tab } => {
            let tab_id = resolve_tab(store.state(), &tab)?;
            if !store.dispatch(Command::Redo {
                tab_id: tab_id.clone(),
            }) {
                println!("nothing to redo");
            }
            print_history(store.state(), &tab_id);
            Ok(())
        }
        CliCommand::Edit { tab, target, text } => {
            let tab_id = resolve_tab(store.state(), &tab)?;
            store.dispatch(Command::UpdateEdit {
                tab_id,
                target,
                text,
            });
            Ok(())
        }
        CliCommand::Annotations { tab } => {
            let tab_id = resolve_tab(store.state(), &tab)?;
            let tab = require_tab(store.state(), &tab_id)?;
            let json = serde_json::to_string_pretty(&*tab.text_boxes)
                .context("serialize annotations")?;
            println!("{json}");
            Ok(())
        }
        CliCommand::Settings(args) => {
            if let Some(max) = args.max_active_tabs {
                store.dispatch(Command::SetMaxActiveTabs(max));
            }
            if let Some(mode) = args.view_mode {
                store.dispatch(Command::SetViewMode(mode));
            }
            if let Some(edit_mode) = args.edit_mode {
                store.dispatch(Command::SetEditMode(edit_mode));
            }
            if let Some(color) = args.shape_color {
                store.dispatch(Command::SetShapeColor(color));
            }
            let settings = &store.state().settings;
            println!("max_active_tabs = {}", settings.max_active_tabs);
            println!("view_mode = {}", settings.view_mode);
            println!("is_edit_mode = {}", settings.is_edit_mode);
            println!("shape_color = {}", settings.shape_color);
            Ok(())
        }
        CliCommand::Define { .. } | CliCommand::Fingerprint { .. } => {
            bail!("command does not use the session")
        }
    }
}

fn open(store: &mut Store, file: &Path, name: Option<String>) -> anyhow::Result<()> {
    if !file.is_file() {
        bail!("not a file: {}", file.display());
    }
    if !is_pdf(file) {
        tracing::warn!(path = %file.display(), "file does not have a .pdf extension");
    }
    let normalized = fs::canonicalize(file).unwrap_or_else(|_| file.to_path_buf());
    let name = name.unwrap_or_else(|| display_name(&normalized));
    let tab_id = store.open_tab(name, normalized.to_string_lossy().to_string());

    match Engine::new().page_count(&normalized) {
        Ok(total_pages) => {
            store.dispatch(Command::UpdateTab {
                tab_id: tab_id.clone(),
                patch: TabPatch {
                    total_pages: Some(total_pages),
                    ..TabPatch::default()
                },
            });
        }
        Err(err) => tracing::warn!(path = %normalized.display(), "page count unavailable: {err:#}"),
    }

    println!("{tab_id}");
    Ok(())
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

fn define(word: &str) -> anyhow::Result<()> {
    let dictionary = Dictionary::open_in_memory()?;
    let definitions = dictionary.lookup(word)?;
    if definitions.is_empty() {
        println!("no definition found for {word:?}");
    }
    for (index, definition) in definitions.iter().enumerate() {
        println!("{}. {definition}", index + 1);
    }
    Ok(())
}

fn add_annotation(store: &mut Store, tab_id: TabId, annotation: Annotation) -> anyhow::Result<()> {
    let id = annotation.id.clone();
    store.dispatch(Command::AddAnnotation { tab_id, annotation });
    println!("{id}");
    Ok(())
}

fn resolve_tab(state: &AppState, selector: &str) -> anyhow::Result<TabId> {
    state
        .find_tab(selector)
        .map(|tab| tab.id.clone())
        .with_context(|| format!("no tab matches {selector:?}"))
}

fn require_tab<'a>(state: &'a AppState, tab_id: &TabId) -> anyhow::Result<&'a DocumentTab> {
    state
        .tab(tab_id)
        .with_context(|| format!("tab {tab_id} is gone"))
}

fn resolve_annotation(
    state: &AppState,
    tab_selector: &str,
    annotation_selector: &str,
) -> anyhow::Result<(TabId, AnnotationId)> {
    let tab_id = resolve_tab(state, tab_selector)?;
    let tab = require_tab(state, &tab_id)?;
    let exact = AnnotationId::from(annotation_selector);
    if tab.annotation(&exact).is_some() {
        return Ok((tab_id, exact));
    }
    let mut prefixed = tab
        .text_boxes
        .iter()
        .filter(|annotation| annotation.id.as_str().starts_with(annotation_selector));
    match (prefixed.next(), prefixed.next()) {
        (Some(annotation), None) if !annotation_selector.is_empty() => {
            Ok((tab_id, annotation.id.clone()))
        }
        (Some(_), Some(_)) => bail!("annotation prefix {annotation_selector:?} is ambiguous"),
        _ => bail!("no annotation matches {annotation_selector:?} in {}", tab.name),
    }
}

fn print_tabs(state: &AppState) {
    if state.tabs().is_empty() {
        println!("no open tabs");
        return;
    }
    for (position, tab) in state.tabs().iter().enumerate() {
        let marker = if tab.is_active {
            '*'
        } else if tab.is_suspended {
            'z'
        } else {
            ' '
        };
        println!(
            "{marker} {:>2} {:.8}  {}  p{}/{}  {} notes",
            position + 1,
            tab.id.as_str(),
            tab.name,
            tab.current_page,
            tab.total_pages,
            tab.text_boxes.len()
        );
    }
}

fn print_history(state: &AppState, tab_id: &TabId) {
    if let Some(tab) = state.tab(tab_id) {
        println!(
            "history {}/{}  {} annotations",
            tab.history.index() + 1,
            tab.history.len(),
            tab.text_boxes.len()
        );
    }
}
