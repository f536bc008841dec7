use std::collections::BTreeMap;

use palette::{Hsl, IntoColor, Srgb};

use crate::data::loader::parse_quantity;

/// Colour used when a wavelength label has no numeric part.
pub fn fallback_color() -> Srgb<u8> {
    Srgb::new(128, 128, 128)
}

/// Wavelengths mapped onto the hue circle, in nm.
const HUE_RANGE_NM: (f32, f32) = (800.0, 2000.0);

// ---------------------------------------------------------------------------
// Wavelength → false colour
// ---------------------------------------------------------------------------

/// Spectral false colour for a wavelength label such as `"1550nm"`.
///
/// The wavelength is remapped linearly from 800–2000 nm onto 0–360° of hue
/// (clamped), at full saturation and half lightness.
pub fn wavelength_color(label: &str) -> Srgb<u8> {
    let Some(nm) = parse_quantity(label) else {
        return fallback_color();
    };
    let (lo, hi) = HUE_RANGE_NM;
    let hue = ((nm as f32 - lo) / (hi - lo)).clamp(0.0, 1.0) * 360.0;
    let hsl = Hsl::new(hue, 1.0, 0.5);
    let rgb: Srgb = hsl.into_color();
    rgb.into_format()
}

/// `#RRGGBB` form of a colour.
pub fn to_hex(color: Srgb<u8>) -> String {
    format!("#{:02X}{:02X}{:02X}", color.red, color.green, color.blue)
}

// ---------------------------------------------------------------------------
// Legend: wavelength → colour
// ---------------------------------------------------------------------------

/// One colour per distinct wavelength among the loaded traces.
#[derive(Debug, Clone, Default)]
pub struct Legend {
    mapping: BTreeMap<String, Srgb<u8>>,
}

impl Legend {
    pub fn new<'a, I>(wavelengths: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mapping = wavelengths
            .into_iter()
            .map(|w| (w.to_string(), wavelength_color(w)))
            .collect();
        Legend { mapping }
    }

    /// Look up the colour for a wavelength label.
    pub fn color_for(&self, wavelength: &str) -> Srgb<u8> {
        self.mapping
            .get(wavelength)
            .copied()
            .unwrap_or_else(fallback_color)
    }

    /// Legend entries (label → hex colour), sorted by label.
    pub fn legend_entries(&self) -> Vec<(String, String)> {
        self.mapping
            .iter()
            .map(|(w, c)| (w.clone(), to_hex(*c)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_ends_are_red() {
        assert_eq!(wavelength_color("800nm"), Srgb::new(255, 0, 0));
        assert_eq!(wavelength_color("2000nm"), Srgb::new(255, 0, 0));
        assert_eq!(wavelength_color("400nm"), Srgb::new(255, 0, 0));
    }

    #[test]
    fn test_mid_range_is_cyan() {
        assert_eq!(to_hex(wavelength_color("1400 nm")), "#00FFFF");
    }

    #[test]
    fn test_unparseable_label_is_grey() {
        assert_eq!(wavelength_color("n/a"), fallback_color());
        assert_eq!(to_hex(fallback_color()), "#808080");
    }

    #[test]
    fn test_legend_dedupes_wavelengths() {
        let legend = Legend::new(["1550nm", "1310nm", "1550nm"]);
        let entries = legend.legend_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "1310nm");
        assert_eq!(legend.color_for("1625nm"), fallback_color());
        assert_eq!(legend.color_for("1550nm"), wavelength_color("1550nm"));
    }
}
