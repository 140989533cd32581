//! Command-line arguments for `lectern`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use lectern_core::{HighlightRect, ShapeColor, ShapeKind, TextStyle, ViewMode};

use crate::logging::LogFormat;

#[derive(Debug, Parser)]
#[command(
    name = "lectern",
    version,
    about = "PDF reading sessions: tabs, annotations and undo history"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Session database (default: the platform config dir).
    #[arg(long, value_name = "PATH", global = true)]
    pub db: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormat,

    /// Append logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open a document in a new active tab.
    Open {
        file: PathBuf,
        /// Tab title (default: the file name).
        #[arg(long)]
        name: Option<String>,
    },
    /// Close a tab.
    Close { tab: String },
    /// Switch to a tab.
    Activate { tab: String },
    /// List open tabs.
    List,
    /// Update a tab's view state.
    View(ViewArgs),
    /// Add a text annotation.
    Note(NoteArgs),
    /// Add a shape annotation.
    Shape(ShapeArgs),
    /// Add a highlight spanning one or more rectangles.
    Highlight(HighlightArgs),
    /// Replace the text of an annotation.
    SetText {
        tab: String,
        id: String,
        text: String,
    },
    /// Move, resize or recolour an annotation.
    Move(MoveArgs),
    /// Delete an annotation.
    Delete { tab: String, id: String },
    /// Undo the last annotation change in a tab.
    Undo { tab: String },
    /// Redo an undone annotation change.
    Redo { tab: String },
    /// Replace the text of a document element (empty text clears it).
    Edit {
        tab: String,
        target: String,
        text: String,
    },
    /// Print a tab's annotations as JSON.
    Annotations { tab: String },
    /// Show or change reader settings.
    Settings(SettingsArgs),
    /// Look up a word in the built-in dictionary.
    Define { word: String },
    /// Print the SHA-256 fingerprint of a file.
    Fingerprint { file: PathBuf },
}

#[derive(Debug, Args)]
pub struct ViewArgs {
    pub tab: String,
    #[arg(long)]
    pub zoom: Option<f64>,
    #[arg(long)]
    pub scroll: Option<f64>,
    #[arg(long)]
    pub page: Option<u32>,
    #[arg(long = "total-pages")]
    pub total_pages: Option<u32>,
}

#[derive(Debug, Args)]
pub struct Placement {
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, default_value_t = 10.0)]
    pub x: f64,
    #[arg(long, default_value_t = 10.0)]
    pub y: f64,
}

#[derive(Debug, Args)]
pub struct NoteArgs {
    pub tab: String,
    pub text: String,
    #[arg(long, default_value = "text", value_parser = parse_text_style)]
    pub style: TextStyle,
    #[command(flatten)]
    pub at: Placement,
    #[arg(long, value_parser = parse_color)]
    pub color: Option<ShapeColor>,
}

#[derive(Debug, Args)]
pub struct ShapeArgs {
    pub tab: String,
    #[arg(value_parser = parse_shape_kind)]
    pub kind: ShapeKind,
    #[command(flatten)]
    pub at: Placement,
    #[arg(long, default_value_t = 10.0)]
    pub width: f64,
    #[arg(long, default_value_t = 10.0)]
    pub height: f64,
    #[arg(long, default_value_t = 0.0)]
    pub rotation: f64,
    /// Defaults to the configured shape colour.
    #[arg(long, value_parser = parse_color)]
    pub color: Option<ShapeColor>,
}

#[derive(Debug, Args)]
pub struct HighlightArgs {
    pub tab: String,
    pub text: String,
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    /// `x,y,width,height` in page percent; repeat for multi-line spans.
    #[arg(long = "rect", required = true, value_parser = parse_rect)]
    pub rects: Vec<HighlightRect>,
    #[arg(long, value_parser = parse_color)]
    pub color: Option<ShapeColor>,
}

#[derive(Debug, Args)]
pub struct MoveArgs {
    pub tab: String,
    pub id: String,
    #[arg(long)]
    pub page: Option<u32>,
    #[arg(long)]
    pub x: Option<f64>,
    #[arg(long)]
    pub y: Option<f64>,
    #[arg(long)]
    pub width: Option<f64>,
    #[arg(long)]
    pub height: Option<f64>,
    #[arg(long)]
    pub rotation: Option<f64>,
    #[arg(long, value_parser = parse_color)]
    pub color: Option<ShapeColor>,
}

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[arg(long = "max-active-tabs")]
    pub max_active_tabs: Option<usize>,
    #[arg(long = "view-mode", value_parser = parse_view_mode)]
    pub view_mode: Option<ViewMode>,
    #[arg(long = "edit-mode")]
    pub edit_mode: Option<bool>,
    #[arg(long = "shape-color", value_parser = parse_color)]
    pub shape_color: Option<ShapeColor>,
}

fn parse_text_style(value: &str) -> Result<TextStyle, String> {
    value.parse().map_err(|err: &str| err.to_string())
}

fn parse_shape_kind(value: &str) -> Result<ShapeKind, String> {
    value.parse().map_err(|err: &str| err.to_string())
}

fn parse_view_mode(value: &str) -> Result<ViewMode, String> {
    value.parse().map_err(|err: &str| err.to_string())
}

fn parse_color(value: &str) -> Result<ShapeColor, String> {
    value.parse().map_err(|err: &str| err.to_string())
}

fn parse_rect(value: &str) -> Result<HighlightRect, String> {
    value.parse().map_err(|err: &str| err.to_string())
}
