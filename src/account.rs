use serde::{Deserialize, Serialize};

pub type AccountId = u32;

/// Participant role, fixed at registration. Batch approval decisions are
/// restricted to [`Role::Verifier`] and [`Role::Regulator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Producer,
    Buyer,
    Verifier,
    Regulator,
}

impl Role {
    pub fn may_decide_batches(&self) -> bool {
        matches!(self, Role::Verifier | Role::Regulator)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub account_id: AccountId,
    pub role: Role,
    /// On-chain address, only consumed by reconciliation. Never part of
    /// any write-path decision.
    pub chain_address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_decisions_are_role_gated() {
        assert!(Role::Verifier.may_decide_batches());
        assert!(Role::Regulator.may_decide_batches());
        assert!(!Role::Producer.may_decide_batches());
        assert!(!Role::Buyer.may_decide_batches());
    }
}
