//! Responsive source selection
//!
//! Picks which copy of a photo to load:
//! - Grid tiles: the 640px tier, else the original
//! - Lightbox: the smallest tier covering 1200 CSS px at the device pixel
//!   ratio, else the largest tier, else the original
//! - Prefetch: the largest tier, else the original
//!
//! Every available tier is also exposed as a width-annotated candidate so
//! the view can refine the default against its actual layout width.

use crate::state::data::{PhotoRecord, Tier};

/// Baseline lightbox width in CSS pixels
pub const LIGHTBOX_BASE_WIDTH: f32 = 1200.0;

/// Device pixel ratios outside this range are clamped
pub const MIN_PIXEL_RATIO: f32 = 1.0;
pub const MAX_PIXEL_RATIO: f32 = 3.0;

/// One width-annotated source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub url: String,
    pub width: u32,
}

/// A default source plus every alternative the view may refine to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsiveSource {
    pub default: String,
    /// Narrowest first; empty when the record has no variants
    pub candidates: Vec<Candidate>,
}

impl ResponsiveSource {
    /// Best candidate for a layout `width` in logical pixels at `pixel_ratio`.
    /// Falls back to the default when there is nothing to choose from.
    pub fn for_layout(&self, width: f32, pixel_ratio: f32) -> &str {
        let target = target_width(width, pixel_ratio);
        pick_for_width(&self.candidates, target)
            .map(|c| c.url.as_str())
            .unwrap_or(&self.default)
    }
}

/// Clamp a device pixel ratio into [1, 3]; junk input counts as 1
pub fn clamp_pixel_ratio(ratio: f32) -> f32 {
    if ratio.is_finite() {
        ratio.clamp(MIN_PIXEL_RATIO, MAX_PIXEL_RATIO)
    } else {
        MIN_PIXEL_RATIO
    }
}

/// Physical pixels needed to fill `css_width` at `pixel_ratio`
pub fn target_width(css_width: f32, pixel_ratio: f32) -> u32 {
    (css_width.max(0.0) * clamp_pixel_ratio(pixel_ratio)).ceil() as u32
}

/// Width-annotated candidates of a record, narrowest first
pub fn candidates(record: &PhotoRecord) -> Vec<Candidate> {
    match &record.variants {
        Some(variants) => variants
            .available()
            .map(|(tier, url)| Candidate { url: url.to_string(), width: tier.width() })
            .collect(),
        None => Vec::new(),
    }
}

/// Smallest candidate at least `target` wide, else the widest one.
/// `None` only when `candidates` is empty.
pub fn pick_for_width(candidates: &[Candidate], target: u32) -> Option<&Candidate> {
    candidates
        .iter()
        .filter(|c| c.width >= target)
        .min_by_key(|c| c.width)
        .or_else(|| candidates.iter().max_by_key(|c| c.width))
}

/// Source for the lightbox at a given device pixel ratio
pub fn lightbox_source(record: &PhotoRecord, pixel_ratio: f32) -> ResponsiveSource {
    let candidates = candidates(record);
    let target = target_width(LIGHTBOX_BASE_WIDTH, pixel_ratio);
    let default = pick_for_width(&candidates, target)
        .map(|c| c.url.clone())
        .unwrap_or_else(|| record.url.clone());
    ResponsiveSource { default, candidates }
}

/// Source for a grid tile: bounded bandwidth on the overview
pub fn grid_source(record: &PhotoRecord) -> ResponsiveSource {
    let default = record
        .variants
        .as_ref()
        .and_then(|v| v.get(Tier::W640))
        .unwrap_or(&record.url)
        .to_string();
    ResponsiveSource { default, candidates: candidates(record) }
}

/// What to warm up for a neighbour: the highest-resolution tier
pub fn prefetch_source(record: &PhotoRecord) -> &str {
    record
        .variants
        .as_ref()
        .and_then(|v| v.available().last().map(|(_, url)| url))
        .unwrap_or(&record.url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::Variants;

    fn record(variants: Option<Variants>) -> PhotoRecord {
        PhotoRecord {
            id: "p1".to_string(),
            url: "orig.jpg".to_string(),
            created_at: None,
            variants,
            uid: None,
            storage_path: None,
            original_name: None,
            size: None,
            content_type: None,
        }
    }

    fn three_tiers() -> Variants {
        Variants {
            w320: Some("320.jpg".to_string()),
            w640: Some("640.jpg".to_string()),
            w1024: Some("1024.jpg".to_string()),
            w1600: None,
        }
    }

    #[test]
    fn test_lightbox_falls_back_to_largest_tier() {
        let source = lightbox_source(&record(Some(three_tiers())), 1.0);
        assert_eq!(source.default, "1024.jpg");
        assert_eq!(source.candidates.len(), 3);
    }

    #[test]
    fn test_smallest_tier_covering_target() {
        let candidates = candidates(&record(Some(three_tiers())));
        assert_eq!(pick_for_width(&candidates, 600).unwrap().url, "640.jpg");
        assert_eq!(pick_for_width(&candidates, 640).unwrap().url, "640.jpg");
        assert_eq!(pick_for_width(&candidates, 100).unwrap().url, "320.jpg");
    }

    #[test]
    fn test_lightbox_uses_1600_when_it_covers_target() {
        let mut variants = three_tiers();
        variants.w1600 = Some("1600.jpg".to_string());
        let rec = record(Some(variants));

        assert_eq!(lightbox_source(&rec, 1.0).default, "1600.jpg");
        // 1200 * 3 = 3600, nothing covers it, widest wins
        assert_eq!(lightbox_source(&rec, 3.0).default, "1600.jpg");
    }

    #[test]
    fn test_pixel_ratio_is_clamped() {
        assert_eq!(target_width(LIGHTBOX_BASE_WIDTH, 0.5), 1200);
        assert_eq!(target_width(LIGHTBOX_BASE_WIDTH, 2.0), 2400);
        assert_eq!(target_width(LIGHTBOX_BASE_WIDTH, 8.0), 3600);
        assert_eq!(target_width(LIGHTBOX_BASE_WIDTH, f32::NAN), 1200);
    }

    #[test]
    fn test_record_without_variants_resolves_to_url() {
        let rec = record(None);
        assert_eq!(lightbox_source(&rec, 2.0).default, "orig.jpg");
        assert_eq!(grid_source(&rec).default, "orig.jpg");
        assert_eq!(prefetch_source(&rec), "orig.jpg");
        assert_eq!(grid_source(&rec).for_layout(200.0, 2.0), "orig.jpg");
    }

    #[test]
    fn test_grid_prefers_mid_tier() {
        let rec = record(Some(three_tiers()));
        assert_eq!(grid_source(&rec).default, "640.jpg");

        let only_small = Variants { w320: Some("320.jpg".to_string()), ..Variants::default() };
        assert_eq!(grid_source(&record(Some(only_small))).default, "orig.jpg");
    }

    #[test]
    fn test_layout_refinement() {
        let source = grid_source(&record(Some(three_tiers())));
        assert_eq!(source.for_layout(200.0, 1.0), "320.jpg");
        assert_eq!(source.for_layout(200.0, 2.0), "640.jpg");
        assert_eq!(source.for_layout(900.0, 2.0), "1024.jpg");
    }

    #[test]
    fn test_prefetch_takes_highest_tier() {
        assert_eq!(prefetch_source(&record(Some(three_tiers()))), "1024.jpg");
    }
}
