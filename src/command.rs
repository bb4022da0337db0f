use rust_decimal::{Decimal, prelude::Zero};
use thiserror::Error;

use crate::account::AccountId;
use crate::batch::BatchId;
use crate::lot::LotId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerAction {
    Mint,
    Transfer,
    Retire,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Amount is required for {action:?}")]
    AmountRequired { action: LedgerAction },
    #[error("Amount must be positive for {action:?}")]
    NonPositiveAmount { action: LedgerAction },
    #[error("An idempotency token is required for Mint")]
    TokenRequired,
    #[error("Field `{0}` is required")]
    FieldRequired(&'static str),
}

#[derive(Debug, Clone)]
pub struct MintCommand {
    pub batch_id: BatchId,
    pub owner: AccountId,
    pub amount: Decimal,
    /// Caller-supplied idempotency token. A retried request carrying the
    /// same token is rejected instead of minting twice.
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct TransferCommand {
    pub lot_id: LotId,
    /// Initiating account, as verified by the identity layer. Must be the
    /// lot's current owner.
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Decimal,
}

#[derive(Debug, Clone)]
pub struct RetireCommand {
    pub lot_id: LotId,
    pub owner: AccountId,
    pub amount: Decimal,
}

impl MintCommand {
    pub fn parse(
        batch_id: BatchId,
        owner: AccountId,
        amount: Option<Decimal>,
        token: Option<String>,
    ) -> Result<Self, CommandError> {
        let amount = parse_amount(LedgerAction::Mint, amount)?;
        match token {
            Some(token) if !token.trim().is_empty() => Ok(Self {
                batch_id,
                owner,
                amount,
                token,
            }),
            _ => Err(CommandError::TokenRequired),
        }
    }
}

impl TransferCommand {
    pub fn parse(
        lot_id: LotId,
        from: AccountId,
        to: AccountId,
        amount: Option<Decimal>,
    ) -> Result<Self, CommandError> {
        Ok(Self {
            lot_id,
            from,
            to,
            amount: parse_amount(LedgerAction::Transfer, amount)?,
        })
    }
}

impl RetireCommand {
    pub fn parse(
        lot_id: LotId,
        owner: AccountId,
        amount: Option<Decimal>,
    ) -> Result<Self, CommandError> {
        Ok(Self {
            lot_id,
            owner,
            amount: parse_amount(LedgerAction::Retire, amount)?,
        })
    }
}

fn parse_amount(action: LedgerAction, amount: Option<Decimal>) -> Result<Decimal, CommandError> {
    if let Some(amount) = amount {
        if amount > Decimal::zero() {
            Ok(amount)
        } else {
            Err(CommandError::NonPositiveAmount { action })
        }
    } else {
        Err(CommandError::AmountRequired { action })
    }
}

/// Pulls a required field out of a sparse input row.
pub fn require<T>(field: &'static str, value: Option<T>) -> Result<T, CommandError> {
    value.ok_or(CommandError::FieldRequired(field))
}

#[cfg(test)]
mod tests {
    use rust_decimal::prelude::FromPrimitive;

    use super::*;

    #[test]
    fn mint_requires_positive_amount_and_token() {
        let err = MintCommand::parse(1, 1, None, Some("t".into())).unwrap_err();
        assert!(matches!(
            err,
            CommandError::AmountRequired {
                action: LedgerAction::Mint
            }
        ));

        let err =
            MintCommand::parse(1, 1, Some(Decimal::zero()), Some("t".into())).unwrap_err();
        assert!(matches!(
            err,
            CommandError::NonPositiveAmount {
                action: LedgerAction::Mint
            }
        ));
        assert_eq!(err.to_string(), "Amount must be positive for Mint");

        let err = MintCommand::parse(1, 1, Some(Decimal::from_u32(10).unwrap()), None).unwrap_err();
        assert!(matches!(err, CommandError::TokenRequired));
        let err = MintCommand::parse(1, 1, Some(Decimal::from_u32(10).unwrap()), Some("  ".into()))
            .unwrap_err();
        assert!(matches!(err, CommandError::TokenRequired));

        let cmd =
            MintCommand::parse(1, 2, Some(Decimal::from_u32(10).unwrap()), Some("tok".into()))
                .unwrap();
        assert_eq!(cmd.owner, 2);
        assert_eq!(cmd.token, "tok");
    }

    #[test]
    fn transfer_and_retire_reject_negative_amounts() {
        let err =
            TransferCommand::parse(1, 1, 2, Some(Decimal::from_i32(-5).unwrap())).unwrap_err();
        assert!(matches!(
            err,
            CommandError::NonPositiveAmount {
                action: LedgerAction::Transfer
            }
        ));

        let err = RetireCommand::parse(1, 1, None).unwrap_err();
        assert!(matches!(
            err,
            CommandError::AmountRequired {
                action: LedgerAction::Retire
            }
        ));
    }
}
