//! Contribution graph: seven rows of cells, with random cells lighting up
//! to one of four intensity levels and fading back.

use rand::Rng;
use web_sys::Element;

use super::sparkle::{build_items, SparkleLayout, SparkleTheme};
use crate::renderer::RendererError;

pub const ID: &str = "contribution-graph";

const ROWS: usize = 7;
const CELL_PX: f64 = 14.0;
const GAP_PX: f64 = 4.0;
const MAX_COLUMNS: usize = 53;

pub struct GraphLayout;

pub type ContributionGraph = SparkleTheme<GraphLayout>;

/// Week columns that fit in `width`, at least one.
pub fn columns_for(width: f64) -> usize {
    let fit = (width / (CELL_PX + GAP_PX)).floor();
    if fit.is_finite() && fit > 0.0 {
        (fit as usize).clamp(1, MAX_COLUMNS)
    } else {
        1
    }
}

impl SparkleLayout for GraphLayout {
    const ID: &'static str = ID;
    const SPAWN_EVERY_MS: f64 = 90.0;
    const LIFETIME_MS: f64 = 1_400.0;
    const MAX_ACTIVE: usize = 48;

    fn layout_key(width: f64, _height: f64) -> usize {
        columns_for(width)
    }

    fn build(root: &Element, width: f64, _height: f64) -> Result<Vec<Element>, RendererError> {
        let columns = columns_for(width);
        root.set_attribute(
            "style",
            &format!(
                "display: grid; grid-template-rows: repeat({ROWS}, {CELL_PX}px); \
                 grid-auto-flow: column; gap: {GAP_PX}px;"
            ),
        )?;
        build_items(root, "span", Self::idle_class(), columns * ROWS, |_| None)
    }

    fn idle_class() -> &'static str {
        "cell level-0"
    }

    fn lit_class(rng: &mut impl Rng) -> String {
        format!("cell level-{}", rng.random_range(1..=4))
    }
}
