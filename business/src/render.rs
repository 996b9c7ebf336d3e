//! Vector QR graphics and the registry the exporter looks them up in.
//!
//! A [`QrGraphic`] is the module matrix of an encoded code plus its display
//! style. It serializes itself to SVG text and is the input the export
//! rasterizer draws from.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{PoisonError, RwLock};

use log::debug;
use qrcode::{Color, EcLevel, QrCode};
use qrdesk_states::{HexColor, SavedCode, ShapeStyle};

use crate::error::RenderError;

/// Encoded when the text to render is blank.
pub const FALLBACK_TEXT: &str = "https://example.com";

/// Light modules added on every side when the margin is on.
pub const QUIET_ZONE_MODULES: usize = 4;

/// Corner radius of the `rounded` shape at display size, in pixels.
pub const ROUNDED_RADIUS_PX: u32 = 10;

/// Element id of the generator's live preview.
pub const PREVIEW_ELEMENT_ID: &str = "qr-code";

/// How a code is drawn. Never affects the encoded data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeStyle {
    pub background: HexColor,
    pub foreground: HexColor,
    pub shape: ShapeStyle,
    /// Display edge length in pixels.
    pub size: u32,
    pub include_margin: bool,
}

impl Default for CodeStyle {
    fn default() -> Self {
        Self {
            background: HexColor::WHITE,
            foreground: HexColor::BLACK,
            shape: ShapeStyle::Square,
            size: 200,
            include_margin: true,
        }
    }
}

impl From<&SavedCode> for CodeStyle {
    fn from(code: &SavedCode) -> Self {
        Self {
            background: code.background_color,
            foreground: code.foreground_color,
            shape: code.shape,
            size: code.size,
            include_margin: code.include_margin,
        }
    }
}

/// An encoded code ready to draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrGraphic {
    text: String,
    style: CodeStyle,
    /// Modules per side, quiet zone included.
    edge: usize,
    /// Row-major, `true` for dark.
    modules: Vec<bool>,
}

impl QrGraphic {
    /// Encodes `text` at error-correction level H.
    pub fn new(text: &str, style: CodeStyle) -> Result<Self, RenderError> {
        let text = if text.trim().is_empty() {
            FALLBACK_TEXT
        } else {
            text
        };
        let code = QrCode::with_error_correction_level(text.as_bytes(), EcLevel::H)
            .map_err(|e| RenderError::Encode(e.to_string()))?;

        let width = code.width();
        let quiet = if style.include_margin {
            QUIET_ZONE_MODULES
        } else {
            0
        };
        let edge = width + 2 * quiet;
        let mut modules = vec![false; edge * edge];
        for (i, color) in code.to_colors().into_iter().enumerate() {
            if color == Color::Dark {
                let (x, y) = (i % width + quiet, i / width + quiet);
                modules[y * edge + x] = true;
            }
        }

        debug!("Encoded {} byte(s) into {width}x{width} modules", text.len());
        Ok(Self {
            text: text.to_owned(),
            style,
            edge,
            modules,
        })
    }

    /// The text actually encoded, after the blank fallback.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn style(&self) -> &CodeStyle {
        &self.style
    }

    /// Modules per side, quiet zone included.
    pub fn edge(&self) -> usize {
        self.edge
    }

    /// Whether module `(x, y)` is dark. Out-of-range modules are light.
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.edge && y < self.edge && self.modules[y * self.edge + x]
    }

    /// Serializes to a standalone SVG document.
    ///
    /// The view box is in module units so the image scales cleanly to any
    /// `width`/`height`.
    pub fn to_svg(&self) -> String {
        let CodeStyle {
            background,
            foreground,
            shape,
            size,
            ..
        } = self.style;
        let edge = self.edge;

        let mut path = String::new();
        for y in 0..edge {
            let mut x = 0;
            while x < edge {
                if !self.is_dark(x, y) {
                    x += 1;
                    continue;
                }
                let start = x;
                while x < edge && self.is_dark(x, y) {
                    x += 1;
                }
                let _ = write!(path, "M{start} {y}h{}v1H{start}z", x - start);
            }
        }

        let style_attr = if shape == ShapeStyle::Rounded {
            format!(r#" style="border-radius:{ROUNDED_RADIUS_PX}px""#)
        } else {
            String::new()
        };

        format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{size}" height="{size}" "#,
                r#"viewBox="0 0 {edge} {edge}" shape-rendering="crispEdges"{style_attr}>"#,
                r#"<path fill="{bg}" d="M0,0 h{edge}v{edge}H0z"/>"#,
                r#"<path fill="{fg}" d="{path}"/>"#,
                "</svg>"
            ),
            size = size,
            edge = edge,
            style_attr = style_attr,
            bg = background,
            fg = foreground,
            path = path,
        )
    }
}

/// Looks up rendered graphics by element id.
pub trait RenderTarget: Send + Sync {
    fn element(&self, element_id: &str) -> Option<QrGraphic>;
}

/// In-memory registry of everything currently rendered.
#[derive(Debug, Default)]
pub struct RenderedCodes {
    elements: RwLock<HashMap<String, QrGraphic>>,
}

impl RenderedCodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, element_id: impl Into<String>, graphic: QrGraphic) {
        self.elements
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(element_id.into(), graphic);
    }

    pub fn remove(&self, element_id: &str) -> Option<QrGraphic> {
        self.elements
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(element_id)
    }

    /// Renders the generator preview under [`PREVIEW_ELEMENT_ID`].
    pub fn render_preview(&self, text: &str, style: CodeStyle) -> Result<QrGraphic, RenderError> {
        let graphic = QrGraphic::new(text, style)?;
        self.register(PREVIEW_ELEMENT_ID, graphic.clone());
        Ok(graphic)
    }

    /// Renders a saved code under its `qr-code-<id>` element id.
    pub fn render_saved(&self, code: &SavedCode) -> Result<String, RenderError> {
        let element_id = code.element_id();
        self.register(element_id.clone(), QrGraphic::new(&code.url, code.into())?);
        Ok(element_id)
    }

    pub fn len(&self) -> usize {
        self.elements
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RenderTarget for RenderedCodes {
    fn element(&self, element_id: &str) -> Option<QrGraphic> {
        self.elements
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(element_id)
            .cloned()
    }
}
