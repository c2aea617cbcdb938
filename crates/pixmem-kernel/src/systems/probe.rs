//! Colour-pair contact tests for `Collision(A:#RRGGBB, B:#RRGGBB)` triggers.

use serde::{Deserialize, Serialize};

use crate::memory::buffer::StateBuffer;

/// `Entity:#RRGGBB` side of a collision trigger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorTag {
    pub entity: String,
    pub color: [u8; 3],
}

impl ColorTag {
    /// Parse `Hero:#FF0000`. The `#` is optional.
    pub fn parse(s: &str) -> Option<Self> {
        let (entity, hex) = s.split_once(':')?;
        let entity = entity.trim();
        let hex = hex.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if entity.is_empty() || hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let rgb = u32::from_str_radix(hex, 16).ok()?;
        Some(Self {
            entity: entity.to_string(),
            color: [(rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8],
        })
    }

    pub fn matches(&self, pixel: [u8; 4]) -> bool {
        pixel[..3] == self.color
    }
}

/// Decides whether two colour-tagged regions of the live buffer touch.
pub trait CollisionProbe {
    fn contact(&self, buffer: &StateBuffer, a: &ColorTag, b: &ColorTag) -> bool;
}

/// Never reports contact. For hosts without collision support.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContact;

impl CollisionProbe for NoContact {
    fn contact(&self, _buffer: &StateBuffer, _a: &ColorTag, _b: &ColorTag) -> bool {
        false
    }
}

/// Contact when a pixel of colour A is, or is 4-adjacent to, a pixel of
/// colour B. Alpha is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelAdjacencyProbe;

impl CollisionProbe for PixelAdjacencyProbe {
    fn contact(&self, buffer: &StateBuffer, a: &ColorTag, b: &ColorTag) -> bool {
        let width = buffer.width() as usize;
        let height = buffer.height() as usize;
        let pixels = buffer.pixels();

        for (i, &px) in pixels.iter().enumerate() {
            if !a.matches(px) {
                continue;
            }
            if b.matches(px) {
                return true;
            }
            let (x, y) = (i % width, i / width);
            let neighbours = [
                (x > 0).then(|| i - 1),
                (x + 1 < width).then(|| i + 1),
                (y > 0).then(|| i - width),
                (y + 1 < height).then(|| i + width),
            ];
            if neighbours.into_iter().flatten().any(|n| b.matches(pixels[n])) {
                return true;
            }
        }
        false
    }
}
