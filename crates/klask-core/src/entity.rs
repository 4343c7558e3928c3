//! Entity identity, classification, and collider tagging.

use serde::{Deserialize, Serialize};

use crate::board;

/// RGBA color tag carried by every rendered fixture.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }
}

/// Coarse classification of a physics body.
///
/// Replaces name-substring matching: the kind is assigned once at creation
/// time and drives contact classification and rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Wall,
    Divider,
    Ground,
    Puck,
    Ball,
    Biscuit,
}

/// Stable identity of every tracked dynamic entity on the board.
///
/// Walls, the divider, and the ground reference body are untracked: their
/// colliders carry no user data and never participate in merges or
/// snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityId {
    Puck1,
    Puck2,
    Ball,
    Biscuit1,
    Biscuit2,
    Biscuit3,
}

impl EntityId {
    pub const ALL: [EntityId; 6] = [
        EntityId::Puck1,
        EntityId::Puck2,
        EntityId::Ball,
        EntityId::Biscuit1,
        EntityId::Biscuit2,
        EntityId::Biscuit3,
    ];

    pub const PUCKS: [EntityId; 2] = [EntityId::Puck1, EntityId::Puck2];

    pub const BISCUITS: [EntityId; 3] =
        [EntityId::Biscuit1, EntityId::Biscuit2, EntityId::Biscuit3];

    pub fn kind(self) -> EntityKind {
        match self {
            EntityId::Puck1 | EntityId::Puck2 => EntityKind::Puck,
            EntityId::Ball => EntityKind::Ball,
            EntityId::Biscuit1 | EntityId::Biscuit2 | EntityId::Biscuit3 => EntityKind::Biscuit,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EntityId::Puck1 => "puck1",
            EntityId::Puck2 => "puck2",
            EntityId::Ball => "ball",
            EntityId::Biscuit1 => "biscuit1",
            EntityId::Biscuit2 => "biscuit2",
            EntityId::Biscuit3 => "biscuit3",
        }
    }

    pub fn color(self) -> Color {
        match self.kind() {
            EntityKind::Puck => board::PUCK_COLOR,
            EntityKind::Ball => board::BALL_COLOR,
            EntityKind::Biscuit => board::BISCUIT_COLOR,
            // Tracked entities are always one of the three kinds above.
            EntityKind::Wall | EntityKind::Divider | EntityKind::Ground => {
                unreachable!("static kinds are never tracked entities")
            }
        }
    }

    fn index(self) -> u64 {
        Self::ALL
            .iter()
            .position(|&id| id == self)
            .expect("EntityId::ALL covers every variant") as u64
    }
}

/// Type tag marking tracked-entity colliders in `user_data`.
/// Boundary and ground colliders keep the default of zero.
const USER_DATA_ENTITY: u64 = 1;

/// Encodes a tracked entity into collider `user_data`.
pub fn encode_user_data(id: EntityId) -> u128 {
    (u128::from(USER_DATA_ENTITY) << 64) | u128::from(id.index())
}

/// Decodes collider `user_data` back into a tracked entity.
/// Returns `None` for untagged (boundary/ground) colliders.
pub fn decode_user_data(user_data: u128) -> Option<EntityId> {
    let type_tag = (user_data >> 64) as u64;
    if type_tag != USER_DATA_ENTITY {
        return None;
    }
    let index = user_data as u64;
    EntityId::ALL.get(usize::try_from(index).ok()?).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_data_roundtrip() {
        for id in EntityId::ALL {
            assert_eq!(decode_user_data(encode_user_data(id)), Some(id));
        }
    }

    #[test]
    fn test_untagged_user_data_decodes_to_none() {
        assert_eq!(decode_user_data(0), None);
        assert_eq!(decode_user_data(42), None);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(EntityId::Puck1.kind(), EntityKind::Puck);
        assert_eq!(EntityId::Puck2.kind(), EntityKind::Puck);
        assert_eq!(EntityId::Ball.kind(), EntityKind::Ball);
        for id in EntityId::BISCUITS {
            assert_eq!(id.kind(), EntityKind::Biscuit);
        }
    }

    #[test]
    fn test_names_are_stable() {
        assert_eq!(EntityId::Puck1.name(), "puck1");
        assert_eq!(EntityId::Biscuit3.name(), "biscuit3");
    }
}
