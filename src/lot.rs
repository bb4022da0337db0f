use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::account::AccountId;
use crate::batch::BatchId;

pub type LotId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LotStatus {
    Active,
    Retired,
}

#[derive(Debug, PartialEq, Eq)]
pub enum LotEventKind {
    /// Full transfer: the whole amount moves, the lot changes owner and
    /// stays active. Transfer history lives in the ledger log, not in the
    /// lot status.
    Reassigned { to: AccountId },
    /// Partial transfer: the moved amount leaves this lot; the engine
    /// creates a counterpart lot for the destination owner.
    Debited,
    /// Retirement: the amount is consumed for good. Reaching zero flips
    /// the lot into its terminal state.
    Retired,
}

#[derive(Debug)]
pub struct LotEvent {
    pub lot_id: LotId,
    pub amount: Decimal,
    pub kind: LotEventKind,
}

#[derive(Debug, Error)]
pub enum LotError {
    #[error("Lot is not active, no further operations are allowed")]
    NotActive,
    #[error("Insufficient credit amount: requested {requested}, lot holds {available}")]
    InsufficientAmount {
        requested: Decimal,
        available: Decimal,
    },
    #[error("Account {0} is not the current owner of this lot")]
    NotOwner(AccountId),
}

/// The ledger's fungible-but-traceable unit: an amount of credits owned by
/// exactly one account and backed by exactly one batch.
///
/// State is modified using events, which are created by handling commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditLot {
    pub lot_id: LotId,
    pub batch_id: BatchId,
    pub owner: AccountId,
    pub amount: Decimal,
    pub status: LotStatus,
}

impl CreditLot {
    pub fn new_active(lot_id: LotId, batch_id: BatchId, owner: AccountId, amount: Decimal) -> Self {
        Self {
            lot_id,
            batch_id,
            owner,
            amount,
            status: LotStatus::Active,
        }
    }

    pub fn apply(&mut self, event: &LotEvent) {
        match event.kind {
            LotEventKind::Reassigned { to } => {
                self.owner = to;
            }
            LotEventKind::Debited => {
                self.amount -= event.amount;
            }
            LotEventKind::Retired => {
                self.amount -= event.amount;
                if self.amount.is_zero() {
                    self.status = LotStatus::Retired;
                }
            }
        }
    }

    /// Self-transfer (`caller == to`) is allowed and produces a regular
    /// event so the operation still lands in the audit log.
    pub fn handle_transfer(
        &self,
        caller: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<LotEvent, LotError> {
        self.check_spendable(caller, amount)?;
        let kind = if amount == self.amount {
            LotEventKind::Reassigned { to }
        } else {
            LotEventKind::Debited
        };
        Ok(LotEvent {
            lot_id: self.lot_id,
            amount,
            kind,
        })
    }

    pub fn handle_retire(&self, caller: AccountId, amount: Decimal) -> Result<LotEvent, LotError> {
        self.check_spendable(caller, amount)?;
        Ok(LotEvent {
            lot_id: self.lot_id,
            amount,
            kind: LotEventKind::Retired,
        })
    }

    fn check_spendable(&self, caller: AccountId, amount: Decimal) -> Result<(), LotError> {
        if self.owner != caller {
            return Err(LotError::NotOwner(caller));
        }
        if self.status != LotStatus::Active {
            return Err(LotError::NotActive);
        }
        if amount > self.amount {
            return Err(LotError::InsufficientAmount {
                requested: amount,
                available: self.amount,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::prelude::{FromPrimitive, Zero};

    use super::*;

    fn lot(owner: AccountId, amount: u32) -> CreditLot {
        CreditLot::new_active(1, 1, owner, Decimal::from_u32(amount).unwrap())
    }

    #[test]
    fn apply_events() {
        let mut lot = lot(1, 100);
        // event is the source of truth, there's no more validation happening
        lot.apply(&LotEvent {
            lot_id: 1,
            amount: Decimal::from_u32(40).unwrap(),
            kind: LotEventKind::Debited,
        });
        assert_eq!(lot.amount, Decimal::from_u32(60).unwrap());
        assert_eq!(lot.status, LotStatus::Active);

        lot.apply(&LotEvent {
            lot_id: 1,
            amount: Decimal::from_u32(40).unwrap(),
            kind: LotEventKind::Reassigned { to: 7 },
        });
        assert_eq!(lot.owner, 7);
        assert_eq!(lot.status, LotStatus::Active);

        lot.apply(&LotEvent {
            lot_id: 1,
            amount: Decimal::from_u32(60).unwrap(),
            kind: LotEventKind::Retired,
        });
        assert!(lot.amount.is_zero());
        assert_eq!(lot.status, LotStatus::Retired);
    }

    #[test]
    fn partial_retirement_stays_active() {
        let mut lot = lot(1, 100);
        lot.apply(&LotEvent {
            lot_id: 1,
            amount: Decimal::from_u32(30).unwrap(),
            kind: LotEventKind::Retired,
        });
        assert_eq!(lot.amount, Decimal::from_u32(70).unwrap());
        assert_eq!(lot.status, LotStatus::Active);
    }

    #[test]
    fn handle_transfer() {
        let lot = lot(1, 100);

        // full amount reassigns ownership
        let evt = lot
            .handle_transfer(1, 2, Decimal::from_u32(100).unwrap())
            .unwrap();
        assert!(matches!(evt.kind, LotEventKind::Reassigned { to: 2 }));

        // partial amount debits the source lot
        let evt = lot
            .handle_transfer(1, 2, Decimal::from_u32(40).unwrap())
            .unwrap();
        assert!(matches!(evt.kind, LotEventKind::Debited));
        assert_eq!(evt.amount, Decimal::from_u32(40).unwrap());

        // self-transfer is allowed, the log keeps audit parity
        let evt = lot
            .handle_transfer(1, 1, Decimal::from_u32(100).unwrap())
            .unwrap();
        assert!(matches!(evt.kind, LotEventKind::Reassigned { to: 1 }));

        // only the current owner may move the lot
        let err = lot
            .handle_transfer(9, 2, Decimal::from_u32(10).unwrap())
            .unwrap_err();
        assert!(matches!(err, LotError::NotOwner(9)));

        // never move more than the lot holds
        let err = lot
            .handle_transfer(1, 2, Decimal::from_u32(150).unwrap())
            .unwrap_err();
        assert!(matches!(err, LotError::InsufficientAmount { .. }));
        assert_eq!(
            err.to_string(),
            "Insufficient credit amount: requested 150, lot holds 100"
        );
    }

    #[test]
    fn retired_lot_is_terminal() {
        let mut lot = lot(1, 50);
        let evt = lot
            .handle_retire(1, Decimal::from_u32(50).unwrap())
            .unwrap();
        lot.apply(&evt);
        assert_eq!(lot.amount, Decimal::zero());
        assert_eq!(lot.status, LotStatus::Retired);

        let err = lot
            .handle_transfer(1, 2, Decimal::from_u32(1).unwrap())
            .unwrap_err();
        assert!(matches!(err, LotError::NotActive));
        let err = lot.handle_retire(1, Decimal::from_u32(1).unwrap()).unwrap_err();
        assert!(matches!(err, LotError::NotActive));
    }

    #[test]
    fn retire_requires_ownership() {
        let lot = lot(3, 20);
        let err = lot.handle_retire(4, Decimal::from_u32(5).unwrap()).unwrap_err();
        assert!(matches!(err, LotError::NotOwner(4)));
    }
}
