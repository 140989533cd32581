//! Positioned overlays on a page: text labels, shapes and highlight spans.
//!
//! Coordinates are percentages of the page box (0–100) so they survive zoom
//! changes. On the wire an annotation is a single flat object carrying a
//! `type` tag, e.g. `{"id":"a1","page":1,"x":10,"y":20,"type":"h1","content":"Intro"}`.

use serde::{Deserialize, Serialize};

use crate::ShapeColor;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(pub String);

impl AnnotationId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnnotationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub page: u32,
    pub x: f64,
    pub y: f64,
    #[serde(flatten)]
    pub kind: AnnotationKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnnotationKind {
    Title(TextBody),
    H1(TextBody),
    H2(TextBody),
    H3(TextBody),
    Text(TextBody),
    Rect(ShapeBody),
    Circle(ShapeBody),
    Oval(ShapeBody),
    Arrow(ShapeBody),
    Highlight(HighlightBody),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextBody {
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeBody {
    #[serde(default = "default_shape_extent")]
    pub width: f64,
    #[serde(default = "default_shape_extent")]
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

fn default_shape_extent() -> f64 {
    10.0
}

impl Default for ShapeBody {
    fn default() -> Self {
        Self {
            width: default_shape_extent(),
            height: default_shape_extent(),
            rotation: 0.0,
            color: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HighlightBody {
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub rects: Vec<HighlightRect>,
}

/// One line of a multi-line highlight, in page percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighlightRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl std::str::FromStr for HighlightRect {
    type Err = &'static str;

    /// Parses `x,y,width,height`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parts = value
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| "rect values must be numbers")?;
        match parts.as_slice() {
            [x, y, width, height] if *width >= 0.0 && *height >= 0.0 => Ok(Self {
                x: *x,
                y: *y,
                width: *width,
                height: *height,
            }),
            [_, _, _, _] => Err("rect size must not be negative"),
            _ => Err("rect must be x,y,width,height"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStyle {
    Title,
    H1,
    H2,
    H3,
    Text,
}

impl TextStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextStyle::Title => "title",
            TextStyle::H1 => "h1",
            TextStyle::H2 => "h2",
            TextStyle::H3 => "h3",
            TextStyle::Text => "text",
        }
    }
}

impl std::str::FromStr for TextStyle {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(TextStyle::Title),
            "h1" => Ok(TextStyle::H1),
            "h2" => Ok(TextStyle::H2),
            "h3" => Ok(TextStyle::H3),
            "text" => Ok(TextStyle::Text),
            _ => Err("unknown text style"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Rect,
    Circle,
    Oval,
    Arrow,
}

impl ShapeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Rect => "rect",
            ShapeKind::Circle => "circle",
            ShapeKind::Oval => "oval",
            ShapeKind::Arrow => "arrow",
        }
    }
}

impl std::str::FromStr for ShapeKind {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rect" => Ok(ShapeKind::Rect),
            "circle" => Ok(ShapeKind::Circle),
            "oval" => Ok(ShapeKind::Oval),
            "arrow" => Ok(ShapeKind::Arrow),
            _ => Err("unknown shape"),
        }
    }
}

impl AnnotationKind {
    pub fn text(style: TextStyle, body: TextBody) -> Self {
        match style {
            TextStyle::Title => AnnotationKind::Title(body),
            TextStyle::H1 => AnnotationKind::H1(body),
            TextStyle::H2 => AnnotationKind::H2(body),
            TextStyle::H3 => AnnotationKind::H3(body),
            TextStyle::Text => AnnotationKind::Text(body),
        }
    }

    pub fn shape(kind: ShapeKind, body: ShapeBody) -> Self {
        match kind {
            ShapeKind::Rect => AnnotationKind::Rect(body),
            ShapeKind::Circle => AnnotationKind::Circle(body),
            ShapeKind::Oval => AnnotationKind::Oval(body),
            ShapeKind::Arrow => AnnotationKind::Arrow(body),
        }
    }

    /// The wire `type` tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            AnnotationKind::Title(_) => "title",
            AnnotationKind::H1(_) => "h1",
            AnnotationKind::H2(_) => "h2",
            AnnotationKind::H3(_) => "h3",
            AnnotationKind::Text(_) => "text",
            AnnotationKind::Rect(_) => "rect",
            AnnotationKind::Circle(_) => "circle",
            AnnotationKind::Oval(_) => "oval",
            AnnotationKind::Arrow(_) => "arrow",
            AnnotationKind::Highlight(_) => "highlight",
        }
    }

    fn text_body_mut(&mut self) -> Option<&mut TextBody> {
        match self {
            AnnotationKind::Title(body)
            | AnnotationKind::H1(body)
            | AnnotationKind::H2(body)
            | AnnotationKind::H3(body)
            | AnnotationKind::Text(body) => Some(body),
            _ => None,
        }
    }

    fn shape_body_mut(&mut self) -> Option<&mut ShapeBody> {
        match self {
            AnnotationKind::Rect(body)
            | AnnotationKind::Circle(body)
            | AnnotationKind::Oval(body)
            | AnnotationKind::Arrow(body) => Some(body),
            _ => None,
        }
    }
}

/// Partial update for `Annotation::apply_patch`. Fields that do not exist on
/// the target variant are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationPatch {
    pub page: Option<u32>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub rotation: Option<f64>,
    pub color: Option<ShapeColor>,
    pub content: Option<String>,
}

impl Annotation {
    pub fn new(page: u32, x: f64, y: f64, kind: AnnotationKind) -> Self {
        Self {
            id: AnnotationId::generate(),
            page: page.max(1),
            x: clamp_percent(x),
            y: clamp_percent(y),
            kind,
        }
    }

    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            AnnotationKind::Title(body)
            | AnnotationKind::H1(body)
            | AnnotationKind::H2(body)
            | AnnotationKind::H3(body)
            | AnnotationKind::Text(body) => Some(&body.content),
            AnnotationKind::Highlight(body) => Some(&body.content),
            _ => None,
        }
    }

    pub fn color(&self) -> Option<&str> {
        match &self.kind {
            AnnotationKind::Title(body)
            | AnnotationKind::H1(body)
            | AnnotationKind::H2(body)
            | AnnotationKind::H3(body)
            | AnnotationKind::Text(body) => body.color.as_deref(),
            AnnotationKind::Rect(body)
            | AnnotationKind::Circle(body)
            | AnnotationKind::Oval(body)
            | AnnotationKind::Arrow(body) => body.color.as_deref(),
            AnnotationKind::Highlight(body) => body.color.as_deref(),
        }
    }

    /// Replaces the text content. Returns false for shapes, which carry none.
    pub fn set_content(&mut self, content: impl Into<String>) -> bool {
        if let Some(body) = self.kind.text_body_mut() {
            body.content = content.into();
            return true;
        }
        if let AnnotationKind::Highlight(body) = &mut self.kind {
            body.content = content.into();
            return true;
        }
        false
    }

    /// Merges the applicable fields of `patch`. Returns whether any field of
    /// the patch applied to this variant.
    pub fn apply_patch(&mut self, patch: &AnnotationPatch) -> bool {
        let mut applied = false;

        if let Some(page) = patch.page {
            self.page = page.max(1);
            applied = true;
        }
        if let Some(x) = patch.x {
            self.x = clamp_percent(x);
            applied = true;
        }
        if let Some(y) = patch.y {
            self.y = clamp_percent(y);
            applied = true;
        }
        if let Some(content) = &patch.content {
            applied |= self.set_content(content.clone());
        }

        if let Some(body) = self.kind.shape_body_mut() {
            if let Some(width) = patch.width {
                body.width = width.max(0.0);
                applied = true;
            }
            if let Some(height) = patch.height {
                body.height = height.max(0.0);
                applied = true;
            }
            if let Some(rotation) = patch.rotation {
                body.rotation = rotation.rem_euclid(360.0);
                applied = true;
            }
        }

        if let Some(color) = &patch.color {
            let slot = match &mut self.kind {
                AnnotationKind::Title(body)
                | AnnotationKind::H1(body)
                | AnnotationKind::H2(body)
                | AnnotationKind::H3(body)
                | AnnotationKind::Text(body) => &mut body.color,
                AnnotationKind::Rect(body)
                | AnnotationKind::Circle(body)
                | AnnotationKind::Oval(body)
                | AnnotationKind::Arrow(body) => &mut body.color,
                AnnotationKind::Highlight(body) => &mut body.color,
            };
            *slot = Some(color.as_str().to_string());
            applied = true;
        }

        applied
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
