//! Starfield: stars scattered over the background, a few twinkling at a time.

use rand::Rng;
use web_sys::Element;

use super::sparkle::{build_items, SparkleLayout, SparkleTheme};
use crate::renderer::RendererError;

pub const ID: &str = "starfield";

const AREA_PER_STAR: f64 = 9_000.0;
const MIN_STARS: usize = 24;
const MAX_STARS: usize = 220;

pub struct StarLayout;

pub type Starfield = SparkleTheme<StarLayout>;

/// Star count for a background of `width` x `height` CSS pixels.
pub fn star_count(width: f64, height: f64) -> usize {
    let estimate = (width * height / AREA_PER_STAR).round();
    if estimate.is_finite() && estimate > 0.0 {
        (estimate as usize).clamp(MIN_STARS, MAX_STARS)
    } else {
        MIN_STARS
    }
}

impl SparkleLayout for StarLayout {
    const ID: &'static str = ID;
    const SPAWN_EVERY_MS: f64 = 120.0;
    const LIFETIME_MS: f64 = 1_800.0;
    const MAX_ACTIVE: usize = 24;

    fn layout_key(width: f64, height: f64) -> usize {
        star_count(width, height)
    }

    fn build(root: &Element, width: f64, height: f64) -> Result<Vec<Element>, RendererError> {
        let mut rng = rand::rng();
        build_items(root, "span", Self::idle_class(), star_count(width, height), |_| {
            let size = rng.random_range(1..=3);
            Some(format!(
                "position: absolute; left: {:.2}%; top: {:.2}%; width: {size}px; height: {size}px;",
                rng.random_range(0.0..100.0),
                rng.random_range(0.0..100.0),
            ))
        })
    }

    fn idle_class() -> &'static str {
        "star"
    }

    fn lit_class(_rng: &mut impl Rng) -> String {
        "star star--twinkle".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_count_scales_with_area_and_clamps() {
        assert_eq!(star_count(0.0, 0.0), MIN_STARS);
        assert_eq!(star_count(600.0, 600.0), 40);
        assert_eq!(star_count(3840.0, 2160.0), MAX_STARS);
        assert_eq!(star_count(f64::INFINITY, 10.0), MIN_STARS);
    }
}
