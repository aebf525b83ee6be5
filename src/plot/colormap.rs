//! Named sequential colormaps for heat maps
//!
//! Each map is a list of evenly spaced hex stops, interpolated linearly in
//! RGB. The same stops are shipped to the D3 script, so inline SVG and CDN
//! pages color a cell identically. Names match case-insensitively.

use log::warn;

/// Used when a plot names no colormap, or one that is not known
pub const DEFAULT_COLORMAP: &str = "viridis";

const COLORMAPS: &[(&str, &[&str])] = &[
    ("viridis", &["#440154", "#482878", "#3e4989", "#31688e", "#26828e", "#1f9e89", "#35b779", "#6ece58", "#b5de2b", "#fde725"]),
    ("BuPu", &["#f7fcfd", "#e0ecf4", "#bfd3e6", "#9ebcda", "#8c96c6", "#8c6bb1", "#88419d", "#810f7c", "#4d004b"]),
    ("PuBu", &["#fff7fb", "#ece7f2", "#d0d1e6", "#a6bddb", "#74a9cf", "#3690c0", "#0570b0", "#045a8d", "#023858"]),
    ("PuRd", &["#f7f4f9", "#e7e1ef", "#d4b9da", "#c994c7", "#df65b0", "#e7298a", "#ce1256", "#980043", "#67001f"]),
    ("Greens", &["#f7fcf5", "#e5f5e0", "#c7e9c0", "#a1d99b", "#74c476", "#41ab5d", "#238b45", "#006d2c", "#00441b"]),
    ("Blues", &["#f7fbff", "#deebf7", "#c6dbef", "#9ecae1", "#6baed6", "#4292c6", "#2171b5", "#08519c", "#08306b"]),
    ("Reds", &["#fff5f0", "#fee0d2", "#fcbba1", "#fc9272", "#fb6a4a", "#ef3b2c", "#cb181d", "#a50f15", "#67000d"]),
    ("Greys", &["#ffffff", "#f0f0f0", "#d9d9d9", "#bdbdbd", "#969696", "#737373", "#525252", "#252525", "#000000"]),
];

fn find(name: &str) -> Option<&'static [&'static str]> {
    COLORMAPS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, stops)| *stops)
}

/// Whether `name` is a known colormap
pub fn is_known(name: &str) -> bool {
    find(name).is_some()
}

/// Stops of `name`, falling back to [`DEFAULT_COLORMAP`]
pub fn stops(name: &str) -> &'static [&'static str] {
    find(name).or_else(|| find(DEFAULT_COLORMAP)).unwrap_or(&[])
}

/// Every map as a JSON object keyed by lowercase name, for the D3 script
pub fn to_json() -> String {
    let map: serde_json::Map<String, serde_json::Value> = COLORMAPS
        .iter()
        .map(|(name, stops)| (name.to_ascii_lowercase(), serde_json::json!(stops)))
        .collect();
    serde_json::Value::Object(map).to_string()
}

fn parse_hex(s: &str) -> Option<[u8; 3]> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some([r, g, b])
}

/// Color at `t` in `[0, 1]` (clamped) as `#rrggbb`
pub fn color_at(name: &str, t: f64) -> String {
    if !is_known(name) {
        warn!("Unknown colormap '{}', using {}", name, DEFAULT_COLORMAP);
    }
    let stops: Vec<[u8; 3]> = stops(name).iter().filter_map(|s| parse_hex(s)).collect();
    let (first, last) = match (stops.first(), stops.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return "#000000".to_string(),
    };

    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let rgb = if stops.len() == 1 || t <= 0.0 {
        first
    } else if t >= 1.0 {
        last
    } else {
        let pos = t * (stops.len() - 1) as f64;
        let i = pos.floor() as usize;
        let frac = pos - i as f64;
        let (a, b) = (stops[i], stops[(i + 1).min(stops.len() - 1)]);
        let mix = |k: usize| (a[k] as f64 + (b[k] as f64 - a[k] as f64) * frac).round() as u8;
        [mix(0), mix(1), mix(2)]
    };
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ends_are_first_and_last_stop() {
        assert_eq!(color_at("BuPu", 0.0), "#f7fcfd");
        assert_eq!(color_at("BuPu", 1.0), "#4d004b");
        assert_eq!(color_at("bupu", 1.0), "#4d004b");
    }

    #[test]
    fn test_interpolates_between_stops() {
        // Greys has 9 stops, so 1/16 is halfway between the first two
        assert_eq!(color_at("Greys", 1.0 / 16.0), "#f8f8f8");
        assert_eq!(color_at("Greys", 0.5), "#969696");
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(color_at("PuBu", -3.0), "#fff7fb");
        assert_eq!(color_at("PuBu", 7.0), "#023858");
        assert_eq!(color_at("PuBu", f64::NAN), "#fff7fb");
    }

    #[test]
    fn test_unknown_name_falls_back() {
        assert!(!is_known("Jet"));
        assert_eq!(color_at("Jet", 0.0), color_at(DEFAULT_COLORMAP, 0.0));
    }

    #[test]
    fn test_json_keys_are_lowercase() {
        let json: serde_json::Value = serde_json::from_str(&to_json()).unwrap();
        assert_eq!(json["pubu"][0], "#fff7fb");
        assert_eq!(json["viridis"].as_array().unwrap().len(), 10);
    }
}
