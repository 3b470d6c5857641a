use crate::config::SeedTierConfig;
use serde::{Deserialize, Serialize};

/// Number of tiers every affix is expanded to
pub const TIER_COUNT: u32 = 12;

/// Required item level per tier, tier 1 first
pub const REQUIRED_ILVL_LADDER: [u32; TIER_COUNT as usize] = [60, 50, 45, 40, 35, 30, 25, 20, 15, 10, 5, 1];

/// Curve exponent for ranges whose authored magnitude is at most 1
pub const GAMMA_PERCENT: f64 = 1.35;

/// Curve exponent for every other range
pub const GAMMA_FLAT: f64 = 1.6;

/// One power band of an affix. Tier 1 is the strongest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffixTier {
    pub tier: u32,
    pub min: f64,
    pub max: f64,
    pub required_ilvl: u32,
}

impl AffixTier {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Seed tier after coercion: bounds ordered, requirement at least 1
#[derive(Debug, Clone, Copy, PartialEq)]
struct Anchor {
    min: f64,
    max: f64,
    required_ilvl: u32,
}

/// Expand seed tiers into the full ladder.
///
/// Affixes are authored with two or three anchor tiers. The ladder
/// interpolates between the weakest and the strongest anchor along a gamma
/// curve. An empty seed yields no tiers; such an affix can never roll.
pub fn expand_tiers(seed: &[SeedTierConfig]) -> Vec<AffixTier> {
    let anchors = normalize_seed(seed);
    let (Some(worst), Some(best)) = (anchors.first(), anchors.last()) else {
        return Vec::new();
    };

    let magnitude = [worst.min, worst.max, best.min, best.max]
        .iter()
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let gamma = if magnitude <= 1.0 { GAMMA_PERCENT } else { GAMMA_FLAT };

    (1..=TIER_COUNT)
        .map(|tier| {
            let quality_linear = f64::from(TIER_COUNT - tier) / f64::from(TIER_COUNT - 1);
            let quality = quality_linear.powf(gamma);
            AffixTier {
                tier,
                min: round_bound(lerp(worst.min, best.min, quality)),
                max: round_bound(lerp(worst.max, best.max, quality)),
                required_ilvl: REQUIRED_ILVL_LADDER[(tier - 1) as usize].max(1),
            }
        })
        .collect()
}

fn normalize_seed(seed: &[SeedTierConfig]) -> Vec<Anchor> {
    let mut anchors: Vec<Anchor> = seed
        .iter()
        .filter(|t| t.min.is_finite() && t.max.is_finite())
        .map(|t| Anchor {
            min: t.min.min(t.max),
            max: t.min.max(t.max),
            required_ilvl: t.required_ilvl.max(1),
        })
        .collect();
    // Stable, so equal requirements keep authored order
    anchors.sort_by_key(|a| a.required_ilvl);
    anchors
}

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

/// Four decimals for fractional magnitudes, two otherwise
pub fn round_bound(value: f64) -> f64 {
    if value.abs() <= 1.0 {
        round_to(value, 4)
    } else {
        round_to(value, 2)
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
