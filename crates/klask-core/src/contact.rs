//! Contact filtering and the deferred puck-biscuit merge queue.
//!
//! The engine delivers contact notifications mid-solve, where the world must
//! not be mutated. The filter therefore only classifies, suppresses, and
//! queues; the simulator drains the queue once the step returns and applies
//! the merges through the registry.

use parking_lot::Mutex;
use rapier2d::prelude::*;

use crate::entity::{EntityId, EntityKind, decode_user_data};

/// A puck-biscuit contact recorded during the solver pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingMerge {
    pub puck: EntityId,
    pub biscuit: EntityId,
}

/// Physics hook that disables puck-biscuit collision response and queues the
/// pair for merging after the step.
///
/// Pairs queue in detection order and drain FIFO, so when one biscuit
/// touches both pucks in the same step the earliest detection wins; the
/// later merge finds the biscuit already retired and is dropped.
#[derive(Debug, Default)]
pub struct ContactFilter {
    pending: Mutex<Vec<PendingMerge>>,
}

impl ContactFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes every merge queued since the last drain, in detection order.
    pub fn drain(&self) -> Vec<PendingMerge> {
        std::mem::take(&mut *self.pending.lock())
    }

    /// Classifies a contact pair. Untagged (boundary/ground) fixtures and
    /// pairs that are not puck-versus-biscuit produce no merge.
    fn classify(a: Option<EntityId>, b: Option<EntityId>) -> Option<PendingMerge> {
        let (a, b) = (a?, b?);
        match (a.kind(), b.kind()) {
            (EntityKind::Puck, EntityKind::Biscuit) => Some(PendingMerge { puck: a, biscuit: b }),
            (EntityKind::Biscuit, EntityKind::Puck) => Some(PendingMerge { puck: b, biscuit: a }),
            _ => None,
        }
    }

    fn record(&self, merge: PendingMerge) {
        let mut pending = self.pending.lock();
        // One entry per pair per step, keeping the queue's FIFO order stable
        // when a pair produces several manifolds.
        if !pending.contains(&merge) {
            pending.push(merge);
        }
    }
}

impl PhysicsHooks for ContactFilter {
    fn modify_solver_contacts(&self, context: &mut ContactModificationContext) {
        if context.solver_contacts.is_empty() {
            return;
        }

        let entity = |handle: ColliderHandle| {
            context
                .colliders
                .get(handle)
                .and_then(|collider| decode_user_data(collider.user_data))
        };

        if let Some(merge) = Self::classify(entity(context.collider1), entity(context.collider2)) {
            // Suppress the physical response so the biscuit is not bounced.
            context.solver_contacts.clear();
            self.record(merge);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_puck_biscuit_both_orders() {
        let merge = PendingMerge {
            puck: EntityId::Puck1,
            biscuit: EntityId::Biscuit2,
        };
        assert_eq!(
            ContactFilter::classify(Some(EntityId::Puck1), Some(EntityId::Biscuit2)),
            Some(merge)
        );
        assert_eq!(
            ContactFilter::classify(Some(EntityId::Biscuit2), Some(EntityId::Puck1)),
            Some(merge)
        );
    }

    #[test]
    fn test_classify_rejects_other_pairs() {
        assert_eq!(
            ContactFilter::classify(Some(EntityId::Puck1), Some(EntityId::Ball)),
            None
        );
        assert_eq!(
            ContactFilter::classify(Some(EntityId::Biscuit1), Some(EntityId::Biscuit2)),
            None
        );
        assert_eq!(
            ContactFilter::classify(Some(EntityId::Puck1), Some(EntityId::Puck2)),
            None
        );
    }

    #[test]
    fn test_classify_skips_untagged_fixtures() {
        assert_eq!(ContactFilter::classify(None, Some(EntityId::Biscuit1)), None);
        assert_eq!(ContactFilter::classify(Some(EntityId::Puck2), None), None);
        assert_eq!(ContactFilter::classify(None, None), None);
    }

    #[test]
    fn test_drain_preserves_detection_order_and_clears() {
        let filter = ContactFilter::new();
        let first = PendingMerge {
            puck: EntityId::Puck1,
            biscuit: EntityId::Biscuit1,
        };
        let second = PendingMerge {
            puck: EntityId::Puck2,
            biscuit: EntityId::Biscuit3,
        };

        filter.record(first);
        filter.record(second);
        // A repeat detection of the same pair does not reorder the queue.
        filter.record(first);

        assert_eq!(filter.drain(), vec![first, second]);
        assert!(filter.drain().is_empty());
    }
}
