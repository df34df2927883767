use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Waste classification used for tallying.
///
/// The numeric ids returned by [`WasteCategory::id`] are stored in the tally
/// table and read by downstream dashboards. They MUST NOT be renumbered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WasteCategory {
    Organic,
    Hazardous,
    RecyclablePaper,
    RecyclableCans,
    RecyclableCardboard,
    RecyclableBottles,
    RecyclableClothing,
    Other,
}

/// Number of category variants.
pub const CATEGORY_COUNT: usize = 8;

/// Categories in match priority order. `Other` is the fallback and always last.
pub const PRIORITY_ORDER: [WasteCategory; CATEGORY_COUNT] = [
    WasteCategory::Hazardous,
    WasteCategory::RecyclableBottles,
    WasteCategory::RecyclableCans,
    WasteCategory::RecyclablePaper,
    WasteCategory::RecyclableCardboard,
    WasteCategory::RecyclableClothing,
    WasteCategory::Organic,
    WasteCategory::Other,
];

// Keyword sets are lowercase. A keyword may appear in more than one set;
// PRIORITY_ORDER decides which category it lands in.
const HAZARDOUS_KEYWORDS: &[&str] = &[
    "battery",
    "batteries",
    "aerosol can",
    "paint can",
    "light bulb",
    "fluorescent bulb",
    "electronics",
    "e-waste",
];

const BOTTLE_KEYWORDS: &[&str] = &[
    "water",
    "bottle",
    "plastic bottle",
    "mineral water",
    "water bottle",
    "glass bottle",
    "beverage",
];

const CAN_KEYWORDS: &[&str] = &[
    "can",
    "cans",
    "soda",
    "soda can",
    "aluminum can",
    "tin can",
    "aerosol can",
    "beverage",
];

const PAPER_KEYWORDS: &[&str] = &["paper", "polyethene", "coffee cup", "newspaper", "magazine"];

const CARDBOARD_KEYWORDS: &[&str] = &["cardboard", "carton", "box"];

const CLOTHING_KEYWORDS: &[&str] = &[
    "clothing", "apparel", "shirt", "t-shirt", "jeans", "jacket", "sweater", "textile",
];

const ORGANIC_KEYWORDS: &[&str] = &[
    "compost",
    "food waste",
    "food scraps",
    "coffee grounds",
    "eggshell",
];

impl WasteCategory {
    /// Stable storage id for this category.
    pub fn id(self) -> u8 {
        match self {
            WasteCategory::Other => 0,
            WasteCategory::RecyclableBottles => 1,
            WasteCategory::RecyclableCans => 2,
            WasteCategory::RecyclablePaper => 3,
            WasteCategory::RecyclableCardboard => 4,
            WasteCategory::Hazardous => 5,
            WasteCategory::Organic => 6,
            WasteCategory::RecyclableClothing => 7,
        }
    }

    /// Inverse of [`WasteCategory::id`].
    pub fn from_id(id: i64) -> Result<Self> {
        PRIORITY_ORDER
            .iter()
            .copied()
            .find(|category| i64::from(category.id()) == id)
            .ok_or_else(|| anyhow!("unknown waste category id {}", id))
    }

    /// Lowercase keywords that map to this category. Empty for `Other`.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            WasteCategory::Hazardous => HAZARDOUS_KEYWORDS,
            WasteCategory::RecyclableBottles => BOTTLE_KEYWORDS,
            WasteCategory::RecyclableCans => CAN_KEYWORDS,
            WasteCategory::RecyclablePaper => PAPER_KEYWORDS,
            WasteCategory::RecyclableCardboard => CARDBOARD_KEYWORDS,
            WasteCategory::RecyclableClothing => CLOTHING_KEYWORDS,
            WasteCategory::Organic => ORGANIC_KEYWORDS,
            WasteCategory::Other => &[],
        }
    }

    /// Human-readable label used in logs and reports.
    pub fn label(self) -> &'static str {
        match self {
            WasteCategory::Organic => "organic",
            WasteCategory::Hazardous => "hazardous",
            WasteCategory::RecyclablePaper => "recyclable_paper",
            WasteCategory::RecyclableCans => "recyclable_cans",
            WasteCategory::RecyclableCardboard => "recyclable_cardboard",
            WasteCategory::RecyclableBottles => "recyclable_bottles",
            WasteCategory::RecyclableClothing => "recyclable_clothing",
            WasteCategory::Other => "other",
        }
    }

    pub fn is_recyclable(self) -> bool {
        matches!(
            self,
            WasteCategory::RecyclablePaper
                | WasteCategory::RecyclableCans
                | WasteCategory::RecyclableCardboard
                | WasteCategory::RecyclableBottles
                | WasteCategory::RecyclableClothing
        )
    }

    /// Dense index used for tally storage.
    pub(crate) fn index(self) -> usize {
        match self {
            WasteCategory::Organic => 0,
            WasteCategory::Hazardous => 1,
            WasteCategory::RecyclablePaper => 2,
            WasteCategory::RecyclableCans => 3,
            WasteCategory::RecyclableCardboard => 4,
            WasteCategory::RecyclableBottles => 5,
            WasteCategory::RecyclableClothing => 6,
            WasteCategory::Other => 7,
        }
    }
}

impl fmt::Display for WasteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
