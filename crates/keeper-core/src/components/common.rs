//! Shared spatial components.

use serde::{Deserialize, Serialize};

/// Rooms are square grids of this many tiles per side.
pub const ROOM_SIZE: i32 = 50;

/// Stable identifier minted by the world for every game object.
///
/// hecs entity ids are not stable across save/load, so anything persisted
/// in durable memory (repair claims, source assignments) references
/// objects by this instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

/// Position of an object: room name plus tile coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pos {
    pub room: String,
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub fn new(room: impl Into<String>, x: i32, y: i32) -> Self {
        Self { room: room.into(), x, y }
    }

    /// Chebyshev distance; `None` when the positions are in different rooms.
    pub fn range_to(&self, other: &Pos) -> Option<u32> {
        if self.room != other.room {
            return None;
        }
        Some((self.x - other.x).abs().max((self.y - other.y).abs()) as u32)
    }

    /// Within interaction range (adjacent or same tile).
    pub fn is_near(&self, other: &Pos) -> bool {
        matches!(self.range_to(other), Some(r) if r <= 1)
    }

    /// Within ranged-interaction distance (build/repair/upgrade).
    pub fn in_range(&self, other: &Pos, range: u32) -> bool {
        matches!(self.range_to(other), Some(r) if r <= range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_is_chebyshev() {
        let a = Pos::new("alpha", 10, 10);
        let b = Pos::new("alpha", 13, 11);
        assert_eq!(a.range_to(&b), Some(3));
        assert!(a.in_range(&b, 3));
        assert!(!a.is_near(&b));
    }

    #[test]
    fn cross_room_range_is_none() {
        let a = Pos::new("alpha", 10, 10);
        let b = Pos::new("beta", 10, 10);
        assert_eq!(a.range_to(&b), None);
        assert!(!a.is_near(&b));
    }
}
