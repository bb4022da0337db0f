use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::account::{Account, AccountId, Role};
use crate::batch::{Batch, BatchId};
use crate::lot::{CreditLot, LotId};
use crate::record::{LedgerRecord, RecordDraft, TxId};

pub mod in_memory_store;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Account {0} not found")]
    AccountNotFound(AccountId),
    #[error("Batch {0} not found")]
    BatchNotFound(BatchId),
    #[error("Lot {0} not found")]
    LotNotFound(LotId),
    #[error("Lot {lot_id} was modified concurrently (expected version {expected})")]
    VersionConflict { lot_id: LotId, expected: u64 },
    #[error("Mint token `{token}` was already used by transaction {original}")]
    DuplicateMintToken { token: String, original: TxId },
}

/// A lot together with its optimistic-lock version. The version increments
/// on every mutation; a mutation against a stale version is rejected.
#[derive(Debug, Clone)]
pub struct VersionedLot {
    pub lot: CreditLot,
    pub version: u64,
}

#[derive(Debug)]
pub enum LotWrite {
    Create(CreditLot),
    Mutate {
        lot_id: LotId,
        expected_version: u64,
        new_state: CreditLot,
    },
}

#[derive(Debug, Clone)]
pub struct CommitReceipt {
    pub record: LedgerRecord,
}

/// Aggregate issued/retired figures, maintained incrementally from the
/// transaction log. Read by reconciliation, never in the write path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerTotals {
    pub minted: Decimal,
    pub retired: Decimal,
}

impl LedgerTotals {
    pub fn outstanding(&self) -> Decimal {
        self.minted - self.retired
    }
}

/// Single source of truth for accounts, batches, credit lots and the
/// transaction log. The three engines are its only writers.
///
/// NOTE: the in-memory implementation is enough for the core logic and for
/// tests; this seam is where a durable backend would plug in.
pub trait LedgerStore: Send + Sync {
    fn register_account(&self, role: Role, chain_address: Option<String>) -> Account;
    fn get_account(&self, id: AccountId) -> Result<Account, StoreError>;

    fn create_batch(
        &self,
        producer: AccountId,
        quantity_kg: Decimal,
        production_date: NaiveDate,
        certification: Option<String>,
    ) -> Result<Batch, StoreError>;
    fn get_batch(&self, id: BatchId) -> Result<Batch, StoreError>;
    fn decide_batch(&self, id: BatchId, approved: bool) -> Result<Batch, StoreError>;

    fn get_lot(&self, id: LotId) -> Result<VersionedLot, StoreError>;
    /// Lot ids are handed out before the commit so the record draft can
    /// reference a lot that does not exist yet. Unused ids leave gaps,
    /// which is fine.
    fn allocate_lot_id(&self) -> LotId;

    /// Applies every write and appends the sealed record as one atomic
    /// unit. Any version conflict or duplicate mint token means nothing
    /// is applied. The store assigns the transaction id and a
    /// per-store monotonic UTC timestamp.
    fn commit(&self, writes: Vec<LotWrite>, draft: RecordDraft)
    -> Result<CommitReceipt, StoreError>;

    fn lots(&self) -> Vec<CreditLot>;
    fn records(&self) -> Vec<LedgerRecord>;
    /// Derived per-account balance, maintained from lot-changed
    /// notifications at commit time.
    fn balance_of(&self, id: AccountId) -> Decimal;
    fn totals(&self) -> LedgerTotals;
}
