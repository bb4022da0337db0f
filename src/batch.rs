use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::account::AccountId;

pub type BatchId = u32;

/// Outcome of a verifier/regulator decision on a batch. A rejected batch
/// can still be approved later, but only through a new explicit decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApprovalDecision {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// A verified unit of physical production. Approval is the single
/// authorization gate for issuance: only approved batches back new lots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub batch_id: BatchId,
    pub producer: AccountId,
    pub quantity_kg: Decimal,
    pub production_date: NaiveDate,
    pub certification: Option<String>,
    pub decision: ApprovalDecision,
}

impl Batch {
    pub fn is_approved(&self) -> bool {
        self.decision == ApprovalDecision::Approved
    }

    pub fn decide(&mut self, approved: bool) {
        self.decision = if approved {
            ApprovalDecision::Approved
        } else {
            ApprovalDecision::Rejected
        };
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::prelude::FromPrimitive;

    use super::*;

    fn batch() -> Batch {
        Batch {
            batch_id: 1,
            producer: 1,
            quantity_kg: Decimal::from_u32(500).unwrap(),
            production_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            certification: None,
            decision: ApprovalDecision::Pending,
        }
    }

    #[test]
    fn starts_pending_and_follows_decisions() {
        let mut batch = batch();
        assert!(!batch.is_approved());

        batch.decide(false);
        assert_eq!(batch.decision, ApprovalDecision::Rejected);
        assert!(!batch.is_approved());

        // a rejected batch may be approved by a new explicit decision
        batch.decide(true);
        assert!(batch.is_approved());
    }
}
