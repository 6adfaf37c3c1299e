// src/zones.rs
//
// Assigns reported damaged parts to a spatial region of the vehicle from
// their free-text identifiers alone, so a report can be grouped for display
// without any geometry attached to the parts. Pure and total: garbled or
// missing fields degrade to `Other`, never to an error.
use crate::models::DamagedPart;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Front,
    Rear,
    Left,
    Right,
    Other,
}

impl Zone {
    /// Display order for the five regions.
    pub const ALL: [Zone; 5] = [Zone::Front, Zone::Rear, Zone::Left, Zone::Right, Zone::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Front => "front",
            Zone::Rear => "rear",
            Zone::Left => "left",
            Zone::Right => "right",
            Zone::Other => "other",
        }
    }
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Parts that sit unambiguously at the back of the vehicle, checked first so
// that e.g. "Left Rear Quarter Panel" lands in `rear` rather than `left`.
const REAR_TOKENS: &[&str] = &[
    "trunk",
    "decklid",
    "tailgate",
    "hatch",
    "quarter panel",
    "quarter_panel",
    "rear bumper",
    "rear_bumper",
];

// Side-mounted part categories. These resolve through laterality only: a
// "front door" is still a left or right part, never a front one, and a side
// part with no left/right marker goes to `other` rather than falling through
// to the front/rear checks.
const SIDE_TOKENS: &[&str] = &[
    "door",
    "mirror",
    "rocker",
    "side skirt",
    "side-skirt",
    "side_skirt",
    "sideskirt",
];

const FRONT_TOKENS: &[&str] = &[
    "hood",
    "radiator",
    "core support",
    "core_support",
    "grill",
    "front bumper",
    "front_bumper",
    "bumper cover",
    "bumper_cover",
    "headlight",
    "fog light",
    "fog_light",
    "foglight",
    "foglamp",
];

fn contains_any(text: &str, tokens: &[&str]) -> bool {
    tokens.iter().any(|t| text.contains(t))
}

/// Assigns a part to one of the five zones. First match wins, and the check
/// order is deliberate; see the token list notes above.
pub fn classify_part(part: &DamagedPart) -> Zone {
    let text = format!(
        "{} {}",
        part.part_id.as_deref().unwrap_or(""),
        part.part_name
    )
    .to_lowercase();

    if contains_any(&text, REAR_TOKENS) {
        return Zone::Rear;
    }

    if contains_any(&text, SIDE_TOKENS) {
        if text.contains("left") {
            return Zone::Left;
        }
        if text.contains("right") {
            return Zone::Right;
        }
        return Zone::Other;
    }

    if contains_any(&text, FRONT_TOKENS) {
        return Zone::Front;
    }

    if text.contains("left") {
        return Zone::Left;
    }
    if text.contains("right") {
        return Zone::Right;
    }

    if text.contains("rear") {
        return Zone::Rear;
    }
    if text.contains("front") {
        return Zone::Front;
    }

    Zone::Other
}

/// Groups parts by zone, preserving each part's original relative order
/// within its zone. Every zone key is present even when empty, so a
/// consumer can always render all five regions.
pub fn group_by_zone(parts: &[DamagedPart]) -> BTreeMap<Zone, Vec<&DamagedPart>> {
    let mut groups: BTreeMap<Zone, Vec<&DamagedPart>> =
        Zone::ALL.iter().map(|z| (*z, Vec::new())).collect();

    for part in parts {
        groups
            .entry(classify_part(part))
            .or_default()
            .push(part);
    }

    groups
}
