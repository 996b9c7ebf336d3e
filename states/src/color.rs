use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An opaque sRGB color written as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor([u8; 3]);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid color {0:?}, expected #RGB or #RRGGBB")]
pub struct ParseColorError(pub String);

impl HexColor {
    pub const WHITE: Self = Self([0xFF, 0xFF, 0xFF]);
    pub const BLACK: Self = Self([0x00, 0x00, 0x00]);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    pub fn rgb(self) -> [u8; 3] {
        self.0
    }

    pub fn rgba(self) -> [u8; 4] {
        let [r, g, b] = self.0;
        [r, g, b, 0xFF]
    }
}

impl FromStr for HexColor {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseColorError(s.to_owned());
        let digits = s.trim().strip_prefix('#').ok_or_else(err)?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }

        let channel = |hex: &str| u8::from_str_radix(hex, 16).ok().ok_or_else(err);
        match digits.len() {
            3 => {
                // #abc expands to #aabbcc
                let mut rgb = [0u8; 3];
                for (slot, i) in rgb.iter_mut().zip(0..3) {
                    let nibble = channel(&digits[i..=i])?;
                    *slot = nibble * 0x11;
                }
                Ok(Self(rgb))
            }
            6 => Ok(Self([
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            ])),
            _ => Err(err()),
        }
    }
}

impl TryFrom<String> for HexColor {
    type Error = ParseColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.to_string()
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02X}{g:02X}{b:02X}")
    }
}
