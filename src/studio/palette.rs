use std::fmt;
use std::str::FromStr;

use crate::error::StudioError;

pub type Rgb = [u8; 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Palette {
    #[default]
    OceanBreeze,
    SunsetGlow,
    ForestWhisper,
    NeonNights,
    Monochrome,
}

impl Palette {
    pub const ALL: [Palette; 5] = [
        Palette::OceanBreeze,
        Palette::SunsetGlow,
        Palette::ForestWhisper,
        Palette::NeonNights,
        Palette::Monochrome,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Palette::OceanBreeze => "Ocean Breeze",
            Palette::SunsetGlow => "Sunset Glow",
            Palette::ForestWhisper => "Forest Whisper",
            Palette::NeonNights => "Neon Nights",
            Palette::Monochrome => "Monochrome",
        }
    }

    /// First entry is the background.
    pub fn colors(self) -> &'static [Rgb] {
        match self {
            Palette::OceanBreeze => &[
                [0x0b, 0x1d, 0x33],
                [0x1b, 0x4f, 0x72],
                [0x2e, 0x86, 0xab],
                [0x7f, 0xc8, 0xd6],
                [0xe0, 0xf7, 0xfa],
            ],
            Palette::SunsetGlow => &[
                [0x2d, 0x13, 0x2c],
                [0x80, 0x13, 0x36],
                [0xc7, 0x2c, 0x41],
                [0xee, 0x45, 0x40],
                [0xf8, 0xb1, 0x95],
            ],
            Palette::ForestWhisper => &[
                [0x1a, 0x23, 0x1c],
                [0x2f, 0x4f, 0x3a],
                [0x5b, 0x8c, 0x5a],
                [0xa3, 0xc9, 0xa8],
                [0xe9, 0xf5, 0xdb],
            ],
            Palette::NeonNights => &[
                [0x0d, 0x02, 0x21],
                [0xff, 0x00, 0x7f],
                [0x00, 0xf5, 0xd4],
                [0x9d, 0x4e, 0xdd],
                [0xfe, 0xe4, 0x40],
            ],
            Palette::Monochrome => &[
                [0x11, 0x11, 0x11],
                [0x44, 0x44, 0x44],
                [0x88, 0x88, 0x88],
                [0xbb, 0xbb, 0xbb],
                [0xee, 0xee, 0xee],
            ],
        }
    }

    pub fn background(self) -> Rgb {
        self.colors()[0]
    }

    pub fn foreground(self) -> &'static [Rgb] {
        &self.colors()[1..]
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Palette {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Palette::ALL
            .into_iter()
            .find(|p| normalize(p.name()) == wanted)
            .ok_or_else(|| StudioError::UnknownPalette(s.trim().to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shape {
    Circle,
    Square,
    Triangle,
    #[default]
    Mixed,
}

impl Shape {
    pub const ALL: [Shape; 4] = [Shape::Circle, Shape::Square, Shape::Triangle, Shape::Mixed];

    pub fn name(self) -> &'static str {
        match self {
            Shape::Circle => "Circle",
            Shape::Square => "Square",
            Shape::Triangle => "Triangle",
            Shape::Mixed => "Mixed",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Shape {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Shape::ALL
            .into_iter()
            .find(|shape| normalize(shape.name()) == wanted)
            .ok_or_else(|| StudioError::UnknownShape(s.trim().to_string()))
    }
}

// "sunset-glow", "Sunset Glow" and "sunsetglow" all match.
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
