use image::{GrayImage, Luma, Rgb, RgbImage};

/// How much the disabled look pulls every intensity toward white, in percent.
pub const DISABLED_GRAY_PERCENT: u32 = 50;

pub trait GrayscaleStrategy {
    fn intensity(&self, px: &Rgb<u8>) -> u8;

    /// Always returns a fresh buffer; `img` is left untouched.
    fn convert(&self, img: &RgbImage) -> GrayImage {
        let (w, h) = img.dimensions();
        let mut gray = GrayImage::new(w, h);
        for (src, dst) in img.pixels().zip(gray.pixels_mut()) {
            *dst = Luma([self.intensity(src)]);
        }
        gray
    }
}

fn weighted(px: &Rgb<u8>) -> f64 {
    let r = px.0[0] as f64;
    let g = px.0[1] as f64;
    let b = px.0[2] as f64;
    0.30 * r + 0.59 * g + 0.11 * b
}

/// Plain NTSC-weighted intensity.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrueLuminance;

impl GrayscaleStrategy for TrueLuminance {
    fn intensity(&self, px: &Rgb<u8>) -> u8 {
        weighted(px).round().min(255.0) as u8
    }
}

/// Greyed-out "disabled icon" rendering: the weighted intensity is divided by
/// three, then blended halfway toward white. Every output lands in
/// `128..=170`, so this is not a neutral grayscale.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledStyle;

impl GrayscaleStrategy for DisabledStyle {
    fn intensity(&self, px: &Rgb<u8>) -> u8 {
        let gray = (weighted(px) / 3.0) as i32;
        let percent = DISABLED_GRAY_PERCENT as i32;
        let gray = 255 - ((255 - gray) * (100 - percent) / 100);
        gray.clamp(0, 255) as u8
    }
}

/// Config-level selector for the grayscale pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Grayscale {
    #[default]
    TrueLuminance,
    DisabledStyle,
}

impl GrayscaleStrategy for Grayscale {
    fn intensity(&self, px: &Rgb<u8>) -> u8 {
        match self {
            Grayscale::TrueLuminance => TrueLuminance.intensity(px),
            Grayscale::DisabledStyle => DisabledStyle.intensity(px),
        }
    }
}

impl std::str::FromStr for Grayscale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(|c: char| c == '-' || c == '_', "").as_str() {
            "trueluminance" | "luminance" => Ok(Grayscale::TrueLuminance),
            "disabledstyle" | "disabled" => Ok(Grayscale::DisabledStyle),
            other => Err(format!("unknown grayscale mode `{}`", other)),
        }
    }
}

impl std::fmt::Display for Grayscale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Grayscale::TrueLuminance => f.write_str("true-luminance"),
            Grayscale::DisabledStyle => f.write_str("disabled-style"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn true_luminance_uses_ntsc_weights() {
        assert_eq!(TrueLuminance.intensity(&Rgb([0, 0, 0])), 0);
        assert_eq!(TrueLuminance.intensity(&Rgb([255, 255, 255])), 255);
        assert_eq!(TrueLuminance.intensity(&Rgb([100, 0, 0])), 30);
        assert_eq!(TrueLuminance.intensity(&Rgb([0, 100, 0])), 59);
        assert_eq!(TrueLuminance.intensity(&Rgb([0, 0, 100])), 11);
    }

    #[test]
    fn disabled_style_pulls_toward_white() {
        // black: gray 0 -> 255 - 255 * 50 / 100 = 128
        assert_eq!(DisabledStyle.intensity(&Rgb([0, 0, 0])), 128);
        // white: weighted 255 / 3 ~ 85 -> 170
        assert_eq!(DisabledStyle.intensity(&Rgb([255, 255, 255])), 170);
        // pure red 100: 30 / 3 = 10 -> 255 - 245 * 50 / 100 = 133
        assert_eq!(DisabledStyle.intensity(&Rgb([100, 0, 0])), 133);
    }

    #[test]
    fn convert_keeps_dimensions_and_input() {
        let img = RgbImage::from_pixel(7, 3, Rgb([10, 200, 30]));
        let before = img.clone();
        let gray = Grayscale::TrueLuminance.convert(&img);
        assert_eq!(gray.dimensions(), (7, 3));
        assert!(gray.pixels().all(|p| p.0[0] == 124));
        assert_eq!(img, before);
    }

    #[test]
    fn selector_parses_both_spellings() {
        assert_eq!("disabled-style".parse(), Ok(Grayscale::DisabledStyle));
        assert_eq!("TrueLuminance".parse(), Ok(Grayscale::TrueLuminance));
        assert!("sepia".parse::<Grayscale>().is_err());
    }
}
