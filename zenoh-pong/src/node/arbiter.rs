//! Role arbitration between nodes sharing a bus
//!
//! The first node to move claims authority and tells the others with a
//! RoleClaim frame. Nodes that hear a claim while still unassigned become
//! replicas. Two nodes claiming at the same time both end up authority for
//! a moment; the claim carries the sender's [`BusId`] and the node with the
//! higher id steps down when it hears the lower one.

use crate::config::RolePolicy;
use crate::types::{BusId, Intent, NodeRole};

/// What a node must do after hearing a remote claim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimResponse {
    /// Was unassigned, now a replica
    BecameReplica,
    /// Was authority and lost the tie-break, now a replica
    Demoted,
    /// Was authority and won the tie-break; broadcast the own claim again
    Reassert,
    /// Claim carries our own bus id; nothing can be decided
    Conflict,
    /// Already a replica, nothing to do
    Ignored,
}

#[derive(Debug, Clone)]
pub struct RoleArbiter {
    bus_id: BusId,
    policy: RolePolicy,
    role: NodeRole,
}

impl RoleArbiter {
    pub fn new(bus_id: BusId, policy: RolePolicy) -> Self {
        Self {
            bus_id,
            policy,
            role: NodeRole::Unassigned,
        }
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn bus_id(&self) -> BusId {
        self.bus_id
    }

    pub fn policy(&self) -> RolePolicy {
        self.policy
    }

    /// Claim authority on a local move while unassigned
    ///
    /// A forced authority claims on its first call regardless of input; a
    /// forced replica never claims. Returns the role after the attempt.
    pub fn attempt_claim(&mut self, local_intent: Intent) -> NodeRole {
        if self.role == NodeRole::Unassigned {
            let claims = match self.policy {
                RolePolicy::FirstMover => local_intent.is_moving(),
                RolePolicy::ForceAuthority => true,
                RolePolicy::ForceReplica => false,
            };
            if claims {
                self.role = NodeRole::Authority;
            }
        }
        self.role
    }

    /// Handle a RoleClaim carrying `remote`
    pub fn on_claim(&mut self, remote: BusId) -> ClaimResponse {
        match self.role {
            NodeRole::Unassigned if self.policy == RolePolicy::ForceAuthority => {
                // Forced authority heard a claim before its first tick
                self.role = NodeRole::Authority;
                self.settle(remote)
            }
            NodeRole::Unassigned => {
                self.role = NodeRole::Replica;
                ClaimResponse::BecameReplica
            }
            NodeRole::Authority => self.settle(remote),
            NodeRole::Replica => ClaimResponse::Ignored,
        }
    }

    fn settle(&mut self, remote: BusId) -> ClaimResponse {
        match remote.cmp(&self.bus_id) {
            std::cmp::Ordering::Less => {
                self.role = NodeRole::Replica;
                ClaimResponse::Demoted
            }
            std::cmp::Ordering::Greater => ClaimResponse::Reassert,
            std::cmp::Ordering::Equal => ClaimResponse::Conflict,
        }
    }

    /// Forget the role; used by a full session reset
    pub fn reset(&mut self) {
        self.role = NodeRole::Unassigned;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_still_input_never_claims() {
        let mut arbiter = RoleArbiter::new(BusId(1), RolePolicy::FirstMover);
        for _ in 0..100 {
            assert_eq!(arbiter.attempt_claim(Intent::Still), NodeRole::Unassigned);
        }
    }

    #[test]
    fn test_first_move_claims_authority() {
        let mut arbiter = RoleArbiter::new(BusId(1), RolePolicy::FirstMover);
        assert_eq!(arbiter.attempt_claim(Intent::MoveDown), NodeRole::Authority);
        // A role once taken is not re-evaluated by later input
        assert_eq!(arbiter.attempt_claim(Intent::Still), NodeRole::Authority);
    }

    #[test]
    fn test_claim_makes_unassigned_node_replica() {
        let mut arbiter = RoleArbiter::new(BusId(1), RolePolicy::FirstMover);
        assert_eq!(arbiter.on_claim(BusId(9)), ClaimResponse::BecameReplica);
        assert_eq!(arbiter.role(), NodeRole::Replica);
        assert_eq!(arbiter.attempt_claim(Intent::MoveUp), NodeRole::Replica);
        assert_eq!(arbiter.on_claim(BusId(0)), ClaimResponse::Ignored);
    }

    #[test]
    fn test_tie_break_lower_id_wins() {
        let mut low = RoleArbiter::new(BusId(3), RolePolicy::FirstMover);
        let mut high = RoleArbiter::new(BusId(7), RolePolicy::FirstMover);
        low.attempt_claim(Intent::MoveUp);
        high.attempt_claim(Intent::MoveDown);

        assert_eq!(low.on_claim(high.bus_id()), ClaimResponse::Reassert);
        assert_eq!(high.on_claim(low.bus_id()), ClaimResponse::Demoted);
        assert_eq!(low.role(), NodeRole::Authority);
        assert_eq!(high.role(), NodeRole::Replica);
    }

    #[test]
    fn test_equal_ids_conflict_keeps_role() {
        let mut arbiter = RoleArbiter::new(BusId(5), RolePolicy::FirstMover);
        arbiter.attempt_claim(Intent::MoveUp);
        assert_eq!(arbiter.on_claim(BusId(5)), ClaimResponse::Conflict);
        assert_eq!(arbiter.role(), NodeRole::Authority);
    }

    #[test]
    fn test_forced_policies() {
        let mut host = RoleArbiter::new(BusId(5), RolePolicy::ForceAuthority);
        assert_eq!(host.attempt_claim(Intent::Still), NodeRole::Authority);

        let mut early = RoleArbiter::new(BusId(5), RolePolicy::ForceAuthority);
        assert_eq!(early.on_claim(BusId(8)), ClaimResponse::Reassert);
        assert_eq!(early.role(), NodeRole::Authority);

        let mut thin = RoleArbiter::new(BusId(5), RolePolicy::ForceReplica);
        assert_eq!(thin.attempt_claim(Intent::MoveUp), NodeRole::Unassigned);
        assert_eq!(thin.on_claim(BusId(8)), ClaimResponse::BecameReplica);
    }

    #[test]
    fn test_reset_clears_role() {
        let mut arbiter = RoleArbiter::new(BusId(1), RolePolicy::FirstMover);
        arbiter.attempt_claim(Intent::MoveUp);
        arbiter.reset();
        assert_eq!(arbiter.role(), NodeRole::Unassigned);
    }
}
