//! The weighted text prompt record shared by bindings, the registry and the
//! render loop.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of prompt slots on screen. Registry membership never changes after
/// startup.
pub const SLOT_COUNT: usize = 16;

pub const WEIGHT_MIN: f32 = 0.0;
pub const WEIGHT_MAX: f32 = 2.0;

pub const CC_MAX: u8 = 127;
pub const CHANNEL_MAX: u8 = 15;

#[derive(
    Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize,
)]
#[serde(transparent)]
pub struct PromptId(String);

impl PromptId {
    pub fn for_slot(index: usize) -> Self {
        Self(format!("prompt-{}", index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PromptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PromptId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// An opaque sRGB display color.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (leading `#` optional).
    pub fn from_hex(hex: &str) -> Result<Self, ColorParseError> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(ColorParseError(hex.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map_err(|_| ColorParseError(hex.to_string()))
        };
        Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Blend toward `other` by `t` in `[0, 1]`.
    pub fn mix(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let blend = |a: u8, b: u8| {
            (f32::from(a) + (f32::from(b) - f32::from(a)) * t).round() as u8
        };
        Color::rgb(
            blend(self.r, other.r),
            blend(self.g, other.g),
            blend(self.b, other.b),
        )
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColorParseError(pub String);

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid color '{}'; expected #rrggbb", self.0)
    }
}

impl std::error::Error for ColorParseError {}

/// One weighted text input.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Prompt {
    pub id: PromptId,
    pub text: String,
    pub weight: f32,
    pub cc: u8,
    pub channel: u8,
    pub color: Color,
}

impl Prompt {
    pub fn new(index: usize, text: &str, color: Color) -> Self {
        Self {
            id: PromptId::for_slot(index),
            text: text.to_string(),
            weight: WEIGHT_MIN,
            cc: (index as u8).min(CC_MAX),
            channel: 0,
            color,
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.set_weight(weight);
        self
    }

    pub fn set_weight(&mut self, weight: f32) {
        self.weight = clamp_weight(weight);
    }

    pub fn is_active(&self) -> bool {
        self.weight > WEIGHT_MIN
    }
}

pub fn clamp_weight(weight: f32) -> f32 {
    if weight.is_nan() {
        return WEIGHT_MIN;
    }
    weight.clamp(WEIGHT_MIN, WEIGHT_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_ids_follow_slot_scheme() {
        let id = PromptId::for_slot(7);
        assert_eq!(id.as_str(), "prompt-7");
        assert_eq!(PromptId::from("bogus").as_str(), "bogus");
    }

    #[test]
    fn color_hex_round_trip() {
        let color = Color::from_hex("#9900ff").unwrap();
        assert_eq!(color, Color::rgb(0x99, 0x00, 0xff));
        assert_eq!(color.to_hex(), "#9900ff");
        assert!(Color::from_hex("#99").is_err());
        assert!(Color::from_hex("zzzzzz").is_err());
    }

    #[test]
    fn weight_is_clamped() {
        let mut prompt = Prompt::new(0, "Funk", Color::WHITE);
        prompt.set_weight(3.5);
        assert_eq!(prompt.weight, WEIGHT_MAX);
        prompt.set_weight(-1.0);
        assert_eq!(prompt.weight, WEIGHT_MIN);
        prompt.set_weight(f32::NAN);
        assert_eq!(prompt.weight, WEIGHT_MIN);
    }

    #[test]
    fn new_prompt_binds_cc_to_slot_index() {
        let prompt = Prompt::new(12, "Dubstep", Color::WHITE);
        assert_eq!(prompt.cc, 12);
        assert_eq!(prompt.channel, 0);
        assert!(!prompt.is_active());
    }

    #[test]
    fn mix_blends_toward_target() {
        let black = Color::rgb(0, 0, 0);
        assert_eq!(black.mix(Color::WHITE, 0.0), black);
        assert_eq!(black.mix(Color::WHITE, 1.0), Color::WHITE);
        assert_eq!(black.mix(Color::WHITE, 0.5), Color::rgb(128, 128, 128));
    }
}
