use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, warn};

use crate::account::{AccountId, Role};
use crate::batch::{Batch, BatchId};
use crate::command::{CommandError, MintCommand, RetireCommand, TransferCommand};
use crate::lot::{CreditLot, LotError, LotEventKind, LotId};
use crate::record::{LedgerRecord, RecordDraft, RetirementReceipt, TxId, TxKind};
use crate::store::{LedgerStore, LotWrite, StoreError, VersionedLot};

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// kg of CO2 offset per retired credit, for retirement receipts.
    /// Display-side constant, not part of ledger correctness.
    pub offset_factor: Decimal,
    /// How many times a losing optimistic-lock race is retried against the
    /// refreshed lot before surfacing [`LedgerError::Conflict`].
    pub max_conflict_retries: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            // 1 credit = 10kg CO2 offset
            offset_factor: Decimal::from(10),
            max_conflict_retries: 3,
        }
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("Batch {0} not found")]
    BatchNotFound(BatchId),
    #[error("Batch {0} is not approved for minting")]
    BatchNotApproved(BatchId),
    #[error("Account {0} not found")]
    AccountNotFound(AccountId),
    #[error("Lot {0} not found")]
    LotNotFound(LotId),
    #[error("Lot {0} is not active")]
    LotNotActive(LotId),
    #[error("Account {account} is not the current owner of lot {lot_id}")]
    NotOwner { lot_id: LotId, account: AccountId },
    #[error("Insufficient credit amount: requested {requested}, lot holds {available}")]
    InsufficientAmount {
        requested: Decimal,
        available: Decimal,
    },
    #[error("Mint token `{token}` was already used by transaction {original}")]
    DuplicateMint { token: String, original: TxId },
    #[error("Only verifiers or regulators can decide batches (account {account} is a {role:?})")]
    RoleNotPermitted { account: AccountId, role: Role },
    #[error("Lot {0} was modified concurrently, retry the operation")]
    Conflict(LotId),
}

impl LedgerError {
    /// Conflicts are transient and safe to retry; every other class needs
    /// a changed request or a changed world.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Conflict(_))
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AccountNotFound(id) => LedgerError::AccountNotFound(id),
            StoreError::BatchNotFound(id) => LedgerError::BatchNotFound(id),
            StoreError::LotNotFound(id) => LedgerError::LotNotFound(id),
            StoreError::VersionConflict { lot_id, .. } => LedgerError::Conflict(lot_id),
            StoreError::DuplicateMintToken { token, original } => {
                LedgerError::DuplicateMint { token, original }
            }
        }
    }
}

fn lot_error(lot_id: LotId, err: LotError) -> LedgerError {
    match err {
        LotError::NotActive => LedgerError::LotNotActive(lot_id),
        LotError::NotOwner(account) => LedgerError::NotOwner { lot_id, account },
        LotError::InsufficientAmount {
            requested,
            available,
        } => LedgerError::InsufficientAmount {
            requested,
            available,
        },
    }
}

#[derive(Debug)]
pub struct MintOutcome {
    pub lot: CreditLot,
    pub record: LedgerRecord,
}

#[derive(Debug)]
pub struct TransferOutcome {
    pub source: CreditLot,
    /// Present for partial transfers: the lot split off for the
    /// destination owner, with the same batch provenance.
    pub created: Option<CreditLot>,
    pub record: LedgerRecord,
}

#[derive(Debug)]
pub struct RetireOutcome {
    pub lot: CreditLot,
    pub receipt: RetirementReceipt,
    pub record: LedgerRecord,
}

/// Issuance, transfer and retirement against a [`LedgerStore`]. All
/// operations are judged against the store alone; nothing here ever waits
/// on an external chain.
pub struct LedgerEngine<S> {
    store: S,
    config: LedgerConfig,
}

impl<S> LedgerEngine<S>
where
    S: LedgerStore,
{
    pub fn new(store: S) -> Self {
        Self::with_config(store, LedgerConfig::default())
    }

    pub fn with_config(store: S, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Issues a new lot against an approved batch. The lot and its mint
    /// record land in one atomic commit, so a failure leaves nothing
    /// behind. The command's idempotency token makes a network retry a
    /// [`LedgerError::DuplicateMint`] instead of a second lot.
    pub fn mint(&self, cmd: MintCommand) -> Result<MintOutcome, LedgerError> {
        let batch = self.store.get_batch(cmd.batch_id)?;
        if !batch.is_approved() {
            return Err(LedgerError::BatchNotApproved(batch.batch_id));
        }
        let owner = self.store.get_account(cmd.owner)?;

        let lot = CreditLot::new_active(
            self.store.allocate_lot_id(),
            batch.batch_id,
            owner.account_id,
            cmd.amount,
        );
        let draft = RecordDraft {
            kind: TxKind::Mint,
            lot_id: lot.lot_id,
            from: None,
            to: Some(owner.account_id),
            amount: cmd.amount,
            mint_token: Some(cmd.token),
        };
        let receipt = self.store.commit(vec![LotWrite::Create(lot.clone())], draft)?;
        debug!(
            lot = lot.lot_id,
            batch = batch.batch_id,
            owner = owner.account_id,
            amount = %cmd.amount,
            "minted credit lot"
        );
        Ok(MintOutcome {
            lot,
            record: receipt.record,
        })
    }

    /// Moves ownership of a lot, whole or in part. A losing concurrent
    /// writer retries against the refreshed lot state; validation runs
    /// again on every attempt, so a transfer never applies against stale
    /// state.
    pub fn transfer(&self, cmd: TransferCommand) -> Result<TransferOutcome, LedgerError> {
        let to = self.store.get_account(cmd.to)?;
        let mut attempts = 0;
        loop {
            let VersionedLot { lot, version } = self.store.get_lot(cmd.lot_id)?;
            let event = lot
                .handle_transfer(cmd.from, to.account_id, cmd.amount)
                .map_err(|err| lot_error(lot.lot_id, err))?;

            let mut source = lot.clone();
            source.apply(&event);
            let mut writes = vec![LotWrite::Mutate {
                lot_id: lot.lot_id,
                expected_version: version,
                new_state: source.clone(),
            }];
            let created = if event.kind == LotEventKind::Debited {
                let split = CreditLot::new_active(
                    self.store.allocate_lot_id(),
                    lot.batch_id,
                    to.account_id,
                    cmd.amount,
                );
                writes.push(LotWrite::Create(split.clone()));
                Some(split)
            } else {
                None
            };
            let draft = RecordDraft {
                kind: TxKind::Transfer,
                lot_id: lot.lot_id,
                from: Some(lot.owner),
                to: Some(to.account_id),
                amount: cmd.amount,
                mint_token: None,
            };

            match self.store.commit(writes, draft) {
                Ok(receipt) => {
                    debug!(
                        lot = lot.lot_id,
                        from = lot.owner,
                        to = to.account_id,
                        amount = %cmd.amount,
                        split = created.as_ref().map(|l| l.lot_id),
                        "transferred credits"
                    );
                    return Ok(TransferOutcome {
                        source,
                        created,
                        record: receipt.record,
                    });
                }
                Err(StoreError::VersionConflict { .. }) if attempts < self.config.max_conflict_retries => {
                    attempts += 1;
                }
                Err(err) => {
                    if matches!(err, StoreError::VersionConflict { .. }) {
                        warn!(lot = cmd.lot_id, attempts, "transfer lost optimistic-lock race repeatedly");
                    }
                    return Err(err.into());
                }
            }
        }
    }

    /// Permanently consumes credits. Reaching zero flips the lot into its
    /// terminal retired state. Emits a retirement receipt for external
    /// emissions-offset accounting.
    pub fn retire(&self, cmd: RetireCommand) -> Result<RetireOutcome, LedgerError> {
        let owner = self.store.get_account(cmd.owner)?;
        let mut attempts = 0;
        loop {
            let VersionedLot { lot, version } = self.store.get_lot(cmd.lot_id)?;
            let event = lot
                .handle_retire(owner.account_id, cmd.amount)
                .map_err(|err| lot_error(lot.lot_id, err))?;

            let mut retired = lot.clone();
            retired.apply(&event);
            let draft = RecordDraft {
                kind: TxKind::Retire,
                lot_id: lot.lot_id,
                from: Some(owner.account_id),
                to: None,
                amount: cmd.amount,
                mint_token: None,
            };

            match self.store.commit(
                vec![LotWrite::Mutate {
                    lot_id: lot.lot_id,
                    expected_version: version,
                    new_state: retired.clone(),
                }],
                draft,
            ) {
                Ok(receipt) => {
                    debug!(
                        lot = lot.lot_id,
                        owner = owner.account_id,
                        amount = %cmd.amount,
                        remaining = %retired.amount,
                        "retired credits"
                    );
                    let receipt_out = RetirementReceipt {
                        lot_id: lot.lot_id,
                        amount: cmd.amount,
                        co2_offset_kg: cmd.amount * self.config.offset_factor,
                        tx_id: receipt.record.tx_id,
                        timestamp: receipt.record.timestamp,
                    };
                    return Ok(RetireOutcome {
                        lot: retired,
                        receipt: receipt_out,
                        record: receipt.record,
                    });
                }
                Err(StoreError::VersionConflict { .. }) if attempts < self.config.max_conflict_retries => {
                    attempts += 1;
                }
                Err(err) => {
                    if matches!(err, StoreError::VersionConflict { .. }) {
                        warn!(lot = cmd.lot_id, attempts, "retire lost optimistic-lock race repeatedly");
                    }
                    return Err(err.into());
                }
            }
        }
    }

    /// Approves or rejects a batch. Only verifiers and regulators may
    /// decide; a new explicit decision may overturn an earlier one.
    pub fn decide_batch(
        &self,
        caller: AccountId,
        batch_id: BatchId,
        approve: bool,
    ) -> Result<Batch, LedgerError> {
        let caller = self.store.get_account(caller)?;
        if !caller.role.may_decide_batches() {
            return Err(LedgerError::RoleNotPermitted {
                account: caller.account_id,
                role: caller.role,
            });
        }
        let batch = self.store.decide_batch(batch_id, approve)?;
        debug!(batch = batch.batch_id, approved = approve, "batch decision recorded");
        Ok(batch)
    }
}
