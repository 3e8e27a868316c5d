//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are filled
//! from [`WatermarkConfig`](crate::config::WatermarkConfig) by the CLI and
//! passed down to the overlay builder and the encoder.
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality (1–100, default 95). Clamped on construction.
//! - [`LogoSizing`]: how wide a logo watermark is relative to the canvas.
//! - [`TextSizing`]: how large rendered text is relative to the canvas.
//! - [`Sizing`]: both of the above, as one value threaded through a run.

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(95)
    }
}

/// Logo width rule: `width_fraction` of the canvas width, clamped to
/// `[min_width, max(min_width, max_width_fraction * canvas width)]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogoSizing {
    pub width_fraction: f32,
    pub min_width: u32,
    pub max_width_fraction: f32,
}

impl Default for LogoSizing {
    fn default() -> Self {
        Self {
            width_fraction: 0.2,
            min_width: 48,
            max_width_fraction: 0.8,
        }
    }
}

/// Font size rule: `size_fraction` of the canvas width, clamped to
/// `[min_size, max_size]` pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextSizing {
    pub size_fraction: f32,
    pub min_size: u32,
    pub max_size: u32,
}

impl Default for TextSizing {
    fn default() -> Self {
        Self {
            size_fraction: 0.05,
            min_size: 16,
            max_size: 256,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sizing {
    pub logo: LogoSizing,
    pub text: TextSizing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_95() {
        assert_eq!(Quality::default().value(), 95);
    }

    #[test]
    fn sizing_defaults() {
        let sizing = Sizing::default();
        assert_eq!(sizing.logo.min_width, 48);
        assert_eq!(sizing.logo.width_fraction, 0.2);
        assert_eq!(sizing.text.min_size, 16);
        assert_eq!(sizing.text.max_size, 256);
    }
}
