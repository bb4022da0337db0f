use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use rust_decimal::Decimal;

use crate::account::{Account, AccountId, Role};
use crate::batch::{ApprovalDecision, Batch, BatchId};
use crate::lot::{CreditLot, LotId};
use crate::record::{LedgerRecord, RecordDraft, TxKind};

use super::{CommitReceipt, LedgerStore, LedgerTotals, LotWrite, StoreError, VersionedLot};

#[derive(Default)]
struct StoreInner {
    accounts: HashMap<AccountId, Account>,
    next_account_id: AccountId,
    batches: HashMap<BatchId, Batch>,
    next_batch_id: BatchId,
    lots: HashMap<LotId, VersionedLot>,
    log: Vec<LedgerRecord>,
    mint_tokens: HashMap<String, u64>,
    balances: HashMap<AccountId, Decimal>,
    totals: LedgerTotals,
    last_timestamp: Option<DateTime<Utc>>,
}

impl StoreInner {
    /// Timestamps are monotonic across the whole store, which makes them
    /// monotonic per lot as required by the record contract.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_timestamp {
            Some(last) if now <= last => last + TimeDelta::nanoseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }

    fn note_lot_changed(&mut self, before: Option<&CreditLot>, after: &CreditLot) {
        if let Some(before) = before {
            *self.balances.entry(before.owner).or_default() -= before.amount;
        }
        *self.balances.entry(after.owner).or_default() += after.amount;
    }
}

#[derive(Default)]
pub struct InMemoryLedgerStore {
    inner: Mutex<StoreInner>,
    next_lot_id: AtomicU64,
}

impl LedgerStore for InMemoryLedgerStore {
    fn register_account(&self, role: Role, chain_address: Option<String>) -> Account {
        let mut inner = self.inner.lock().unwrap();
        inner.next_account_id += 1;
        let account = Account {
            account_id: inner.next_account_id,
            role,
            chain_address,
        };
        inner.accounts.insert(account.account_id, account.clone());
        account
    }

    fn get_account(&self, id: AccountId) -> Result<Account, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .accounts
            .get(&id)
            .cloned()
            .ok_or(StoreError::AccountNotFound(id))
    }

    fn create_batch(
        &self,
        producer: AccountId,
        quantity_kg: Decimal,
        production_date: NaiveDate,
        certification: Option<String>,
    ) -> Result<Batch, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.accounts.contains_key(&producer) {
            return Err(StoreError::AccountNotFound(producer));
        }
        inner.next_batch_id += 1;
        let batch = Batch {
            batch_id: inner.next_batch_id,
            producer,
            quantity_kg,
            production_date,
            certification,
            decision: ApprovalDecision::Pending,
        };
        inner.batches.insert(batch.batch_id, batch.clone());
        Ok(batch)
    }

    fn get_batch(&self, id: BatchId) -> Result<Batch, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .batches
            .get(&id)
            .cloned()
            .ok_or(StoreError::BatchNotFound(id))
    }

    fn decide_batch(&self, id: BatchId, approved: bool) -> Result<Batch, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let batch = inner
            .batches
            .get_mut(&id)
            .ok_or(StoreError::BatchNotFound(id))?;
        batch.decide(approved);
        Ok(batch.clone())
    }

    fn get_lot(&self, id: LotId) -> Result<VersionedLot, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .lots
            .get(&id)
            .cloned()
            .ok_or(StoreError::LotNotFound(id))
    }

    fn allocate_lot_id(&self) -> LotId {
        self.next_lot_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn commit(
        &self,
        writes: Vec<LotWrite>,
        draft: RecordDraft,
    ) -> Result<CommitReceipt, StoreError> {
        let mut inner = self.inner.lock().unwrap();

        // validate everything before touching state, so a rejected commit
        // leaves no partial effects
        for write in &writes {
            if let LotWrite::Mutate {
                lot_id,
                expected_version,
                ..
            } = write
            {
                let current = inner
                    .lots
                    .get(lot_id)
                    .ok_or(StoreError::LotNotFound(*lot_id))?;
                if current.version != *expected_version {
                    return Err(StoreError::VersionConflict {
                        lot_id: *lot_id,
                        expected: *expected_version,
                    });
                }
            }
        }
        if let Some(token) = &draft.mint_token {
            if let Some(original) = inner.mint_tokens.get(token) {
                return Err(StoreError::DuplicateMintToken {
                    token: token.clone(),
                    original: *original,
                });
            }
        }

        let tx_id = inner.log.len() as u64 + 1;
        let timestamp = inner.next_timestamp();
        let record = draft.seal(tx_id, timestamp);

        for write in writes {
            match write {
                LotWrite::Create(lot) => {
                    inner.note_lot_changed(None, &lot);
                    inner.lots.insert(lot.lot_id, VersionedLot { lot, version: 1 });
                }
                LotWrite::Mutate {
                    lot_id, new_state, ..
                } => {
                    let before = inner.lots.get(&lot_id).map(|v| v.lot.clone());
                    inner.note_lot_changed(before.as_ref(), &new_state);
                    let versioned = inner.lots.get_mut(&lot_id).unwrap();
                    versioned.version += 1;
                    versioned.lot = new_state;
                }
            }
        }
        match record.kind {
            TxKind::Mint => inner.totals.minted += record.amount,
            TxKind::Retire => inner.totals.retired += record.amount,
            TxKind::Transfer => {}
        }
        if let Some(token) = &record.mint_token {
            inner.mint_tokens.insert(token.clone(), tx_id);
        }
        inner.log.push(record.clone());

        Ok(CommitReceipt { record })
    }

    fn lots(&self) -> Vec<CreditLot> {
        self.inner
            .lock()
            .unwrap()
            .lots
            .values()
            .map(|v| v.lot.clone())
            .collect()
    }

    fn records(&self) -> Vec<LedgerRecord> {
        self.inner.lock().unwrap().log.clone()
    }

    fn balance_of(&self, id: AccountId) -> Decimal {
        self.inner
            .lock()
            .unwrap()
            .balances
            .get(&id)
            .copied()
            .unwrap_or_default()
    }

    fn totals(&self) -> LedgerTotals {
        self.inner.lock().unwrap().totals
    }
}
