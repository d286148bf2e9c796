use std::fmt;

use serde::{de, Deserialize, Deserializer};
use serde::de::Visitor;

use crate::errors::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

const NAMED_COLORS: [(&str, Color); 10] = [
    ("black", Color::rgb(0x00, 0x00, 0x00)),
    ("white", Color::rgb(0xff, 0xff, 0xff)),
    ("red", Color::rgb(0xff, 0x00, 0x00)),
    ("green", Color::rgb(0x00, 0x80, 0x00)),
    ("blue", Color::rgb(0x00, 0x00, 0xff)),
    ("yellow", Color::rgb(0xff, 0xff, 0x00)),
    ("orange", Color::rgb(0xff, 0xa5, 0x00)),
    ("brown", Color::rgb(0xa5, 0x2a, 0x2a)),
    ("gray", Color::rgb(0x80, 0x80, 0x80)),
    ("grey", Color::rgb(0x80, 0x80, 0x80)),
];

fn parse_hex_byte(string: &str) -> Option<u8> {
    u8::from_str_radix(string, 16).ok()
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);

    /// Accepts `#rgb`, `#rrggbb` and a few CSS color names.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let lowercase = text.to_ascii_lowercase();
        if let Some((_, color)) = NAMED_COLORS.iter().find(|(name, _)| *name == lowercase) {
            return Ok(*color);
        }
        let invalid = || Error::malformed(format!("Invalid color `{}`", text));
        let hex = text.strip_prefix('#').ok_or_else(invalid)?;
        if !hex.is_ascii() {
            return Err(invalid());
        }
        match hex.len() {
            3 => {
                let mut channels = [0u8; 3];
                for (index, channel) in channels.iter_mut().enumerate() {
                    let digit = parse_hex_byte(&hex[index..index + 1]).ok_or_else(invalid)?;
                    *channel = digit * 17;
                }
                Ok(Color::rgb(channels[0], channels[1], channels[2]))
            }
            6 => Ok(Color::rgb(
                parse_hex_byte(&hex[0..2]).ok_or_else(invalid)?,
                parse_hex_byte(&hex[2..4]).ok_or_else(invalid)?,
                parse_hex_byte(&hex[4..6]).ok_or_else(invalid)?,
            )),
            _ => Err(invalid()),
        }
    }

    /// Moves each channel towards white (`amount > 0`) or black (`amount < 0`).
    pub fn lighten(&self, amount: f32) -> Self {
        let amount = amount.clamp(-1.0, 1.0);
        let channel = |value: u8| -> u8 {
            let value = value as f32;
            let target = if amount >= 0.0 { 255.0 } else { 0.0 };
            (value + (target - value) * amount.abs()).round() as u8
        };
        Color::rgb(channel(self.r), channel(self.g), channel(self.b))
    }

    /// Relative luminance above the middle gray.
    pub fn is_bright(&self) -> bool {
        0.2126 * self.r as f32 + 0.7152 * self.g as f32 + 0.0722 * self.b as f32 > 153.0
    }

    pub fn hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

struct ColorVisitor;

impl<'de> Visitor<'de> for ColorVisitor {
    type Value = Color;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a color like `#rrggbb`, `#rgb` or `white`")
    }

    fn visit_str<E>(self, string: &str) -> std::result::Result<Self::Value, E> where E: de::Error {
        Color::parse(string).map_err(|_| de::Error::invalid_value(de::Unexpected::Str(string), &self))
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
        where D: Deserializer<'de> {
        deserializer.deserialize_str(ColorVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Color::parse("#98AC64").unwrap(), Color::rgb(0x98, 0xac, 0x64));
        assert_eq!(Color::parse("#fff").unwrap(), Color::WHITE);
        assert_eq!(Color::parse("White").unwrap(), Color::WHITE);
        assert!(Color::parse("#12345").is_err());
        assert!(Color::parse("#zzzzzz").is_err());
        assert!(Color::parse("salmon-ish").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Color::rgb(0x42, 0x42, 0x42).to_string(), "#424242");
    }

    #[test]
    fn test_lighten() {
        let color = Color::rgb(100, 100, 100);
        assert_eq!(color.lighten(1.0), Color::WHITE);
        assert_eq!(color.lighten(-1.0), Color::BLACK);
        assert_eq!(color.lighten(0.0), color);
        assert!(Color::WHITE.is_bright());
        assert!(!Color::BLACK.is_bright());
    }

    #[test]
    fn test_deserialize() {
        let color: Color = serde_json::from_str("\"#0088ff\"").unwrap();
        assert_eq!(color, Color::rgb(0x00, 0x88, 0xff));
        assert!(serde_json::from_str::<Color>("\"nope\"").is_err());
    }
}
