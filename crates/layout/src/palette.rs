use serde::Serialize;

/// An 8-bit sRGB-encoded colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn from_hex(hex: u32) -> Self {
        Rgb {
            r: ((hex >> 16) & 0xff) as u8,
            g: ((hex >> 8) & 0xff) as u8,
            b: (hex & 0xff) as u8,
        }
    }

    /// Encoded channels in `[0, 1]`.
    pub fn channels(self) -> [f32; 3] {
        [self.r, self.g, self.b].map(|c| c as f32 / 255.0)
    }

    /// Converts to linear light for shading.
    pub fn to_linear(self) -> [f32; 3] {
        self.channels().map(|c| {
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        })
    }

    pub fn to_rgba(self) -> [f32; 4] {
        let [r, g, b] = self.to_linear();
        [r, g, b, 1.0]
    }
}

/// Named colours used by the layout.
pub struct Palette;

impl Palette {
    pub const EMERALD: Rgb = Rgb::from_hex(0x047857);
    pub const FOREST: Rgb = Rgb::from_hex(0x064e3b);
    pub const PINE: Rgb = Rgb::from_hex(0x0f5132);
    pub const DARK_GREEN: Rgb = Rgb::from_hex(0x022c22);

    pub const GOLD: Rgb = Rgb::from_hex(0xffd700);
    pub const ROSE_GOLD: Rgb = Rgb::from_hex(0xe0bfb8);
    pub const SILVER: Rgb = Rgb::from_hex(0xe2e8f0);

    pub const RED: Rgb = Rgb::from_hex(0xd00000);
    pub const BURGUNDY: Rgb = Rgb::from_hex(0x800020);
    pub const MIDNIGHT_BLUE: Rgb = Rgb::from_hex(0x1e3a8a);

    pub const WARM_WHITE: Rgb = Rgb::from_hex(0xfff7ed);

    pub const BAUBLES: [Rgb; 6] = [
        Self::RED,
        Self::GOLD,
        Self::ROSE_GOLD,
        Self::SILVER,
        Self::BURGUNDY,
        Self::MIDNIGHT_BLUE,
    ];

    pub const WRAPPING: [Rgb; 6] = [
        Rgb::from_hex(0x022c22),
        Rgb::from_hex(0x064e3b),
        Rgb::from_hex(0x78350f),
        Rgb::from_hex(0x450a0a),
        Rgb::from_hex(0xfcfbf7),
        Rgb::from_hex(0x171717),
    ];

    /// Weighted foliage pick from a uniform sample in `[0, 1)`.
    pub fn foliage(sample: f32) -> Rgb {
        if sample > 0.7 {
            Self::EMERALD
        } else if sample > 0.4 {
            Self::PINE
        } else if sample > 0.1 {
            Self::FOREST
        } else {
            Self::DARK_GREEN
        }
    }
}
