//! Core domain types for Lectern.

use serde::{Deserialize, Serialize};

mod annotation;

pub use annotation::{
    Annotation, AnnotationId, AnnotationKind, AnnotationPatch, HighlightBody, HighlightRect,
    ShapeBody, ShapeKind, TextBody, TextStyle,
};

pub const DEFAULT_MAX_ACTIVE_TABS: usize = 3;
pub const MAX_ACTIVE_TABS_LIMIT: usize = 32;
pub const DEFAULT_SHAPE_COLOR: &str = "#ff0000";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub String);

impl TabId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TabId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Reader colour scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Light,
    Dark,
    Sepia,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Light => "light",
            ViewMode::Dark => "dark",
            ViewMode::Sepia => "sepia",
        }
    }

    pub fn cycle(self) -> Self {
        match self {
            ViewMode::Light => ViewMode::Dark,
            ViewMode::Dark => ViewMode::Sepia,
            ViewMode::Sepia => ViewMode::Light,
        }
    }
}

impl std::fmt::Display for ViewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ViewMode {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(ViewMode::Light),
            "dark" => Ok(ViewMode::Dark),
            "sepia" => Ok(ViewMode::Sepia),
            _ => Err("unknown view mode"),
        }
    }
}

/// Hex colour used for newly drawn shapes, stored as `#rrggbb`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeColor(String);

impl ShapeColor {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_valid(&self) -> bool {
        self.0.parse::<ShapeColor>().is_ok_and(|parsed| parsed == *self)
    }
}

impl Default for ShapeColor {
    fn default() -> Self {
        Self(DEFAULT_SHAPE_COLOR.to_string())
    }
}

impl std::fmt::Display for ShapeColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ShapeColor {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let hex = value
            .trim()
            .strip_prefix('#')
            .ok_or("colour must start with '#'")?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err("colour must be hexadecimal");
        }
        let hex = hex.to_ascii_lowercase();
        match hex.len() {
            6 => Ok(Self(format!("#{hex}"))),
            3 => {
                let expanded: String = hex.chars().flat_map(|c| [c, c]).collect();
                Ok(Self(format!("#{expanded}")))
            }
            _ => Err("colour must have 3 or 6 hex digits"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub max_active_tabs: usize,
    pub view_mode: ViewMode,
    pub is_edit_mode: bool,
    pub shape_color: ShapeColor,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_active_tabs: DEFAULT_MAX_ACTIVE_TABS,
            view_mode: ViewMode::Light,
            is_edit_mode: false,
            shape_color: ShapeColor::default(),
        }
    }
}

impl Settings {
    pub fn normalize(&mut self) {
        self.max_active_tabs = self.max_active_tabs.clamp(1, MAX_ACTIVE_TABS_LIMIT);
        if !self.shape_color.is_valid() {
            self.shape_color = match self.shape_color.as_str().parse::<ShapeColor>() {
                Ok(color) => color,
                Err(_) => ShapeColor::default(),
            };
        }
    }

    pub fn cycle_view_mode(&mut self) {
        self.view_mode = self.view_mode.cycle();
    }
}

/// Partial view-state update for a tab. `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TabPatch {
    pub zoom: Option<f64>,
    pub scroll_position: Option<f64>,
    pub current_page: Option<u32>,
    pub total_pages: Option<u32>,
}

impl TabPatch {
    pub fn is_empty(&self) -> bool {
        self.zoom.is_none()
            && self.scroll_position.is_none()
            && self.current_page.is_none()
            && self.total_pages.is_none()
    }
}
