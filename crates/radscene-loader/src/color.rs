//! Per-session display colors for modifier collections.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

/// Linear RGB color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rgb {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
}

impl Rgb {
    /// Create a color, clamping components into range.
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
        }
    }

    /// Convert from hue (turns, wrapped), saturation and value.
    pub fn from_hsv(h: f32, s: f32, v: f32) -> Self {
        let h = h.rem_euclid(1.0) * 6.0;
        let sector = h.floor();
        let f = h - sector;
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));
        let (r, g, b) = match sector as u32 {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        };
        Self::new(r, g, b)
    }

    /// `#rrggbb` form.
    pub fn to_hex(&self) -> String {
        let byte = |c: f32| (c * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", byte(self.r), byte(self.g), byte(self.b))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Supplies colors for newly seen modifiers.
pub trait ColorSource: Send + fmt::Debug {
    /// Produce the next color.
    fn next_color(&mut self) -> Rgb;
}

/// Saturated colors from a seeded SplitMix64 stream.
#[derive(Debug, Clone)]
pub struct SplitMixColors {
    state: u64,
}

impl SplitMixColors {
    /// Seed used by [`SessionContext::new`].
    pub const DEFAULT_SEED: u64 = 0x2545_f491_4f6c_dd1d;

    /// Create a generator from a seed.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    fn next_unit(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }
}

impl ColorSource for SplitMixColors {
    fn next_color(&mut self) -> Rgb {
        let h = self.next_unit();
        let s = 0.55 + 0.3 * self.next_unit();
        let v = 0.75 + 0.2 * self.next_unit();
        Rgb::from_hsv(h, s, v)
    }
}

/// Cycles through a fixed list. Used to pin colors in tests.
#[derive(Debug, Clone)]
pub struct FixedColors {
    colors: Vec<Rgb>,
    next: usize,
}

impl FixedColors {
    /// Create a source cycling through `colors`.
    pub fn new(colors: Vec<Rgb>) -> Self {
        Self { colors, next: 0 }
    }
}

impl ColorSource for FixedColors {
    fn next_color(&mut self) -> Rgb {
        if self.colors.is_empty() {
            return Rgb::new(0.5, 0.5, 0.5);
        }
        let color = self.colors[self.next % self.colors.len()];
        self.next += 1;
        color
    }
}

/// Modifier name to color, generated on first request.
#[derive(Debug)]
pub struct ColorCache {
    source: Box<dyn ColorSource>,
    colors: HashMap<String, Rgb>,
}

impl ColorCache {
    /// Create an empty cache fed by `source`.
    pub fn new(source: impl ColorSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            colors: HashMap::new(),
        }
    }

    /// Color for a modifier, generating one if it has none yet.
    pub fn color_for(&mut self, modifier: &str) -> Rgb {
        if let Some(color) = self.colors.get(modifier) {
            return *color;
        }
        let color = self.source.next_color();
        self.colors.insert(modifier.to_string(), color);
        color
    }

    /// Color for a modifier if one was generated.
    pub fn get(&self, modifier: &str) -> Option<Rgb> {
        self.colors.get(modifier).copied()
    }

    /// Forget all colors. The source keeps its position.
    pub fn clear(&mut self) {
        self.colors.clear();
    }

    /// Number of cached colors.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// True if no colors are cached.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

/// State that outlives a single load.
///
/// Holding on to the same context across reloads keeps collection colors
/// stable.
#[derive(Debug)]
pub struct SessionContext {
    colors: ColorCache,
}

impl SessionContext {
    /// Context with the default color seed.
    pub fn new() -> Self {
        Self::with_seed(SplitMixColors::DEFAULT_SEED)
    }

    /// Context with a specific color seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_source(SplitMixColors::new(seed))
    }

    /// Context with a custom color source.
    pub fn with_source(source: impl ColorSource + 'static) -> Self {
        Self {
            colors: ColorCache::new(source),
        }
    }

    /// Color cache.
    pub fn colors(&self) -> &ColorCache {
        &self.colors
    }

    /// Mutable color cache.
    pub fn colors_mut(&mut self) -> &mut ColorCache {
        &mut self.colors
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}
