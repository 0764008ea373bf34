//! Conflict-branch labels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Color of a conflict branch.
///
/// Messages carry a color in their payload (usually [`Color::Undefined`]);
/// booking inherits colors along parent references. Opinions and approval
/// weights are tallied per color. The derived `Ord` (Undefined < Red <
/// Green < Blue) is the documented tie-break order for opinion formation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum Color {
    #[default]
    Undefined,
    Red,
    Green,
    Blue,
}

impl Color {
    /// All colors, in tie-break order.
    pub const ALL: [Color; 4] = [Color::Undefined, Color::Red, Color::Green, Color::Blue];

    /// The concrete (non-undefined) colors, in tie-break order.
    pub const CONCRETE: [Color; 3] = [Color::Red, Color::Green, Color::Blue];

    /// Dense index for per-color tables.
    pub fn index(&self) -> usize {
        match self {
            Color::Undefined => 0,
            Color::Red => 1,
            Color::Green => 2,
            Color::Blue => 3,
        }
    }

    /// Parse the single-letter form used in adversary configuration ("R",
    /// "G", "B"). Anything else maps to `Undefined`.
    pub fn from_letter(s: &str) -> Color {
        match s.trim().to_ascii_uppercase().as_str() {
            "R" => Color::Red,
            "G" => Color::Green,
            "B" => Color::Blue,
            _ => Color::Undefined,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Color::Undefined => "Undefined",
            Color::Red => "Red",
            Color::Green => "Green",
            Color::Blue => "Blue",
        };
        write!(f, "{name}")
    }
}
