#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Color representation (straight, not premultiplied, alpha).
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid color: {value}"))
    }
}

impl From<Color> for String {
    fn from(val: Color) -> Self {
        val.to_hex()
    }
}

const NAMED_COLORS: &[(&str, Color)] = &[
    ("transparent", Color::TRANSPARENT),
    ("black", Color::BLACK),
    ("white", Color::WHITE),
    ("red", Color::RED),
    ("green", Color::rgba(0, 128, 0, 255)),
    ("lime", Color::GREEN),
    ("blue", Color::BLUE),
    ("yellow", Color::rgba(255, 255, 0, 255)),
    ("cyan", Color::rgba(0, 255, 255, 255)),
    ("magenta", Color::rgba(255, 0, 255, 255)),
    ("gray", Color::rgba(128, 128, 128, 255)),
    ("grey", Color::rgba(128, 128, 128, 255)),
    ("silver", Color::rgba(192, 192, 192, 255)),
    ("maroon", Color::rgba(128, 0, 0, 255)),
    ("olive", Color::rgba(128, 128, 0, 255)),
    ("navy", Color::rgba(0, 0, 128, 255)),
    ("teal", Color::rgba(0, 128, 128, 255)),
    ("purple", Color::PURPLE),
    ("orange", Color::rgba(255, 165, 0, 255)),
    ("brown", Color::rgba(165, 42, 42, 255)),
    ("pink", Color::rgba(255, 192, 203, 255)),
    ("steelblue", Color::rgba(70, 130, 180, 255)),
    ("lightblue", Color::rgba(173, 216, 230, 255)),
    ("lightgray", Color::rgba(211, 211, 211, 255)),
    ("lightgrey", Color::rgba(211, 211, 211, 255)),
    ("darkgray", Color::rgba(169, 169, 169, 255)),
    ("darkgrey", Color::rgba(169, 169, 169, 255)),
    ("beige", Color::rgba(245, 245, 220, 255)),
    ("salmon", Color::rgba(250, 128, 114, 255)),
];

impl Color {
    /// Transparent color: `#00000000`
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    /// Red color: `#FF0000FF`
    pub const RED: Color = Color::rgba(255, 0, 0, 255);
    /// Green color: `#00FF00FF`
    pub const GREEN: Color = Color::rgba(0, 255, 0, 255);
    /// Blue color: `#0000FFFF`
    pub const BLUE: Color = Color::rgba(0, 0, 255, 255);
    /// White color: `#FFFFFFFF`
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    /// Black color: `#000000FF`
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    /// Gray color: `#808080FF`
    pub const GRAY: Color = Color::rgba(128, 128, 128, 255);
    /// Purple color: `#800080FF`
    pub const PURPLE: Color = Color::rgba(128, 0, 128, 255);

    /// Constructs color from its RGBA channels.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Constructs an opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Converts the color into u8 array (RGBA).
    pub fn to_u8_array(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Converts the color into premultiplied RGBA with channels in `0.0..=1.0`.
    pub fn to_premultiplied(&self) -> [f32; 4] {
        let a = self.a as f32 / 255.0;
        [
            self.r as f32 / 255.0 * a,
            self.g as f32 / 255.0 * a,
            self.b as f32 / 255.0 * a,
            a,
        ]
    }

    /// Converts the color into HEX8 string: `#RRGGBBAA`.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }

    /// Parses a color from a hex string (`#RGB`, `#RRGGBB`, `#RRGGBBAA`), a functional form
    /// (`rgb(r,g,b)`, `rgba(r,g,b,a)` with `a` in `0..=1`) or a basic CSS color name.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.starts_with('#') {
            return Self::try_from_hex(value);
        }

        let lower = value.to_ascii_lowercase();
        if let Some(args) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return Self::parse_functional(args);
        }

        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, color)| *color)
    }

    fn parse_functional(args: &str) -> Option<Self> {
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        if parts.len() != 3 && parts.len() != 4 {
            return None;
        }

        let channel = |s: &str| -> Option<u8> {
            if let Some(percent) = s.strip_suffix('%') {
                let v: f64 = percent.trim().parse().ok()?;
                Some((v.clamp(0.0, 100.0) * 2.55).round() as u8)
            } else {
                let v: f64 = s.parse().ok()?;
                Some(v.clamp(0.0, 255.0).round() as u8)
            }
        };

        let a = match parts.get(3) {
            Some(alpha) => {
                let v: f64 = alpha.parse().ok()?;
                (v.clamp(0.0, 1.0) * 255.0).round() as u8
            }
            None => 255,
        };

        Some(Self::rgba(
            channel(parts[0])?,
            channel(parts[1])?,
            channel(parts[2])?,
            a,
        ))
    }

    /// Parses a color from the hex string. Hex string can be HEX3 (`#RGB`), HEX6 (`#RRGGBB`) or
    /// HEX8 (`#RRGGBBAA`).
    pub fn try_from_hex(hex_string: &str) -> Option<Self> {
        if !hex_string.is_ascii() || !hex_string.starts_with('#') {
            return None;
        }

        if hex_string.len() == 4 {
            let digit = |i: usize| u8::from_str_radix(&hex_string[i..i + 1], 16).ok();
            return Some(Self::rgb(digit(1)? * 17, digit(2)? * 17, digit(3)? * 17));
        }

        if hex_string.len() != 7 && hex_string.len() != 9 {
            return None;
        }

        let r = u8::from_str_radix(&hex_string[1..3], 16).ok()?;
        let g = u8::from_str_radix(&hex_string[3..5], 16).ok()?;
        let b = u8::from_str_radix(&hex_string[5..7], 16).ok()?;
        let a = if hex_string.len() == 9 {
            u8::from_str_radix(&hex_string[7..9], 16).ok()?
        } else {
            255
        };

        Some(Self { r, g, b, a })
    }

    /// Returns a new color instance, copied from the base one but with the given alpha channel.
    pub fn with_alpha(&self, a: u8) -> Self {
        Self { a, ..*self }
    }

    /// Returns a copy with the alpha channel multiplied by `opacity` (clamped to `0..=1`).
    pub fn with_opacity(&self, opacity: f64) -> Self {
        let a = (self.a as f64 * opacity.clamp(0.0, 1.0)).round() as u8;
        self.with_alpha(a)
    }

    /// Returns a copy with the RGB channels multiplied by `factor`.
    pub fn darken(&self, factor: f64) -> Self {
        let scale = |c: u8| (c as f64 * factor).round().clamp(0.0, 255.0) as u8;
        Self {
            r: scale(self.r),
            g: scale(self.g),
            b: scale(self.b),
            a: self.a,
        }
    }

    /// Returns true if the color is fully transparent (`a == 0`).
    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// Red component of the color in RGBA space.
    pub fn r(&self) -> u8 {
        self.r
    }

    /// Green component of the color in RGBA space.
    pub fn g(&self) -> u8 {
        self.g
    }

    /// Blue component of the color in RGBA space.
    pub fn b(&self) -> u8 {
        self.b
    }

    /// Opacity component of the color.
    pub fn a(&self) -> u8 {
        self.a
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_serialization() {
        let hex = "#FF1000AA";
        let color = Color::try_from_hex(hex).unwrap();
        assert_eq!(&color.to_hex(), hex);
    }

    #[test]
    fn invalid_hex_is_rejected() {
        assert_eq!(Color::try_from_hex("#FF10G0"), None);
        assert_eq!(Color::try_from_hex("FF1000"), None);
        assert_eq!(Color::try_from_hex("#FF10"), None);
        assert_eq!(Color::parse("#é0000"), None);
    }

    #[test]
    fn parse_forms() {
        assert_eq!(Color::parse("#f00"), Some(Color::RED));
        assert_eq!(Color::parse("#ff0000"), Some(Color::RED));
        assert_eq!(Color::parse("rgb(255, 0, 0)"), Some(Color::RED));
        assert_eq!(
            Color::parse("rgba(0,0,255,0.5)"),
            Some(Color::rgba(0, 0, 255, 128))
        );
        assert_eq!(Color::parse("Steelblue"), Some(Color::rgb(70, 130, 180)));
        assert_eq!(Color::parse("notacolor"), None);
        assert_eq!(Color::parse("#12345"), None);
    }

    #[test]
    fn premultiplied() {
        let [r, g, b, a] = Color::rgba(255, 0, 0, 51).to_premultiplied();
        assert!((r - 0.2).abs() < 1e-6);
        assert_eq!(g, 0.0);
        assert_eq!(b, 0.0);
        assert!((a - 0.2).abs() < 1e-6);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_round_trip() {
        let json = serde_json::to_string(&Color::BLUE).unwrap();
        assert_eq!(json, "\"#0000FFFF\"");
        let back: Color = serde_json::from_str("\"#0000ff\"").unwrap();
        assert_eq!(back, Color::BLUE);
    }
}
