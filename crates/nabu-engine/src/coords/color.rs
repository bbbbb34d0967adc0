/// Straight-alpha RGBA color with channels in `[0, 1]`.
///
/// Backends decide how to encode it natively; [`Color::premultiplied`] is
/// provided for the common GPU blending convention.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Builds a color from 8-bit channels, e.g. a `#rrggbbaa` literal.
    #[inline]
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            f32::from(a) / 255.0,
        )
    }

    /// Parses `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(text: &str) -> Option<Self> {
        let hex = text.strip_prefix('#')?;
        let nibble = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();

        match hex.len() {
            3 => Some(Self::from_rgba8(
                nibble(0)? * 17,
                nibble(1)? * 17,
                nibble(2)? * 17,
                255,
            )),
            6 => Some(Self::from_rgba8(byte(0)?, byte(2)?, byte(4)?, 255)),
            8 => Some(Self::from_rgba8(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    /// Channels multiplied by alpha, clamped to `[0, 1]`.
    #[inline]
    pub fn premultiplied(self) -> [f32; 4] {
        let a = self.a.clamp(0.0, 1.0);
        [
            self.r.clamp(0.0, 1.0) * a,
            self.g.clamp(0.0, 1.0) * a,
            self.b.clamp(0.0, 1.0) * a,
            a,
        ]
    }

    /// Packs into `0xAARRGGBB`.
    pub fn to_argb32(self) -> u32 {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u32;
        (q(self.a) << 24) | (q(self.r) << 16) | (q(self.g) << 8) | q(self.b)
    }
}

impl From<Color> for wgpu::Color {
    fn from(color: Color) -> Self {
        let [r, g, b, a] = color.premultiplied();
        Self {
            r: f64::from(r),
            g: f64::from(g),
            b: f64::from(b),
            a: f64::from(a),
        }
    }
}
