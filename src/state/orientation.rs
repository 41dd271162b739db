//! Physical panel orientation and display geometry.

use serde::{Deserialize, Serialize};

/// Clockwise physical rotation of the panel relative to its native pixel
/// axes.
///
/// Exactly one value is current at any time. Transitions are direct jumps to
/// the value bound to a pressed button, never a cyclic increment.
///
/// Serialized as the strings `"0"`, `"90"`, `"180"`, `"270"` so the settings
/// file stays readable by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Orientation {
    #[default]
    #[serde(rename = "0")]
    Deg0,
    #[serde(rename = "90")]
    Deg90,
    #[serde(rename = "180")]
    Deg180,
    #[serde(rename = "270")]
    Deg270,
}

impl Orientation {
    /// Rotation angle in degrees, clockwise.
    pub fn degrees(self) -> u32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// True when content must be composed with the panel axes swapped
    /// (the panel is mounted on its side).
    pub fn is_sideways(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Fixed pixel dimensions of the physical panel.
///
/// The *working* geometry is the same pair with width and height swapped for
/// sideways orientations: content is composed in reading axes first and only
/// rotated onto the panel's native axes as the final step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayGeometry {
    pub width: u32,
    pub height: u32,
}

impl DisplayGeometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Target frame for composing content before the final rotation.
    pub fn working(self, orientation: Orientation) -> (u32, u32) {
        if orientation.is_sideways() {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_upright() {
        assert_eq!(Orientation::default(), Orientation::Deg0);
    }

    #[test]
    fn test_serialized_as_degree_string() {
        assert_eq!(
            serde_json::to_string(&Orientation::Deg90).unwrap(),
            "\"90\""
        );
        let parsed: Orientation = serde_json::from_str("\"270\"").unwrap();
        assert_eq!(parsed, Orientation::Deg270);
    }

    #[test]
    fn test_working_geometry_swaps_for_sideways() {
        let geometry = DisplayGeometry::new(600, 448);

        assert_eq!(geometry.working(Orientation::Deg0), (600, 448));
        assert_eq!(geometry.working(Orientation::Deg180), (600, 448));
        assert_eq!(geometry.working(Orientation::Deg90), (448, 600));
        assert_eq!(geometry.working(Orientation::Deg270), (448, 600));
    }
}
