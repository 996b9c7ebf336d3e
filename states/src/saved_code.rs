use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::HexColor;

/// Storage key of the saved code collection.
pub const SAVED_CODES_KEY: &str = "savedQRCodes";

/// How a rendered code is presented.
///
/// This is styling only. The encoder never sees it, and `Dots` renders the
/// same as `Square`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeStyle {
    #[default]
    Square,
    Dots,
    Rounded,
}

impl ShapeStyle {
    pub const ALL: [Self; 3] = [Self::Square, Self::Dots, Self::Rounded];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Square => "square",
            Self::Dots => "dots",
            Self::Rounded => "rounded",
        }
    }
}

impl fmt::Display for ShapeStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShapeStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|shape| shape.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown shape {s:?}, expected square, dots or rounded"))
    }
}

/// A code the user saved from the generator.
///
/// Saved codes are immutable: they are created by an explicit save and
/// removed by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedCode {
    pub id: Uuid,
    /// Encoded payload, usually a URL.
    pub url: String,
    pub background_color: HexColor,
    pub foreground_color: HexColor,
    pub shape: ShapeStyle,
    /// Rendered width and height in pixels.
    pub size: u32,
    pub include_margin: bool,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl SavedCode {
    /// Render-target id under which this code is registered.
    pub fn element_id(&self) -> String {
        format!("qr-code-{}", self.id)
    }
}
