use serde::{Deserialize, Serialize};

/// Collision geometry computed by an external bake pass over an image.
/// The kernel only stores it and checks it belongs to the booted image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BakedAsset {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Closed outlines in pixel coordinates.
    #[serde(default)]
    pub polygons: Vec<Polygon>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    /// Colour the outline was traced from, `#RRGGBB`.
    #[serde(default)]
    pub color: Option<String>,
    pub points: Vec<[f32; 2]>,
}

impl BakedAsset {
    /// Parse a baked asset from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn matches_size(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }
}
