use serde::{Deserialize, Serialize};
use std::fmt;

/// A chunk column coordinate packed into a single ordered 64-bit value.
///
/// The x component occupies the high 32 bits and z the low 32 bits, so every
/// pair of `i32` components maps to its own key and unpacking is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey(pub i64);

impl ChunkKey {
    pub fn new(x: i32, z: i32) -> Self {
        Self(pack(x, z))
    }

    /// Key of the chunk column containing the absolute block column (x, z).
    pub fn from_block(x: i32, z: i32) -> Self {
        Self::new(x >> 4, z >> 4)
    }

    pub fn x(&self) -> i32 {
        (self.0 >> 32) as i32
    }

    pub fn z(&self) -> i32 {
        self.0 as i32
    }

    pub fn unpack(&self) -> (i32, i32) {
        (self.x(), self.z())
    }
}

pub fn pack(x: i32, z: i32) -> i64 {
    ((x as i64) << 32) | (z as u32 as i64)
}

impl From<(i32, i32)> for ChunkKey {
    fn from((x, z): (i32, i32)) -> Self {
        Self::new(x, z)
    }
}

impl From<ChunkKey> for i64 {
    fn from(key: ChunkKey) -> Self {
        key.0
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x(), self.z())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::collections::HashSet;

    #[test]
    fn test_unpack_extremes() {
        let values = [i32::MIN, i32::MIN + 1, -1, 0, 1, i32::MAX - 1, i32::MAX];
        for &x in &values {
            for &z in &values {
                assert_eq!(ChunkKey::new(x, z).unpack(), (x, z));
            }
        }
    }

    #[test]
    fn test_unpack_random() {
        let mut rng = rand::thread_rng();
        for _ in 0..10_000 {
            let (x, z) = (rng.gen::<i32>(), rng.gen::<i32>());
            assert_eq!(ChunkKey::new(x, z).unpack(), (x, z));
        }
    }

    #[test]
    fn test_no_collisions_around_origin() {
        let mut seen = HashSet::new();
        for x in -64..64 {
            for z in -64..64 {
                assert!(seen.insert(ChunkKey::new(x, z)), "collision at {} {}", x, z);
            }
        }
    }

    #[test]
    fn test_negative_z_does_not_bleed_into_x() {
        assert_eq!(ChunkKey::new(0, -1).x(), 0);
        assert_eq!(ChunkKey::new(5, -1).0, (5i64 << 32) | 0xFFFF_FFFF);
    }

    #[test]
    fn test_from_block() {
        assert_eq!(ChunkKey::from_block(-1, 17).unpack(), (-1, 1));
        assert_eq!(ChunkKey::from_block(-16, -17).unpack(), (-1, -2));
        assert_eq!(ChunkKey::from_block(15, 0).unpack(), (0, 0));
    }
}
