use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::account::AccountId;
use crate::lot::LotId;

pub type TxId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Mint,
    Transfer,
    Retire,
}

impl TxKind {
    fn as_str(&self) -> &'static str {
        match self {
            TxKind::Mint => "mint",
            TxKind::Transfer => "transfer",
            TxKind::Retire => "retire",
        }
    }
}

/// One entry of the append-only transaction log. Once written it is never
/// updated or deleted; the log is the audit trail and the only legitimate
/// way to reconstruct a lot's provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerRecord {
    pub tx_id: TxId,
    #[serde(rename = "type")]
    pub kind: TxKind,
    pub lot_id: LotId,
    pub from: Option<AccountId>,
    pub to: Option<AccountId>,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    /// External reference id: hex SHA-256 over the canonical field string.
    /// Not a hash chain, records do not link to their predecessors.
    pub content_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mint_token: Option<String>,
}

/// The caller-built half of a record. The store fills in `tx_id` and the
/// timestamp at commit time and seals the draft into a [`LedgerRecord`].
#[derive(Debug, Clone)]
pub struct RecordDraft {
    pub kind: TxKind,
    pub lot_id: LotId,
    pub from: Option<AccountId>,
    pub to: Option<AccountId>,
    pub amount: Decimal,
    pub mint_token: Option<String>,
}

impl RecordDraft {
    pub fn seal(self, tx_id: TxId, timestamp: DateTime<Utc>) -> LedgerRecord {
        let content_hash = content_hash(&self, tx_id, timestamp);
        LedgerRecord {
            tx_id,
            kind: self.kind,
            lot_id: self.lot_id,
            from: self.from,
            to: self.to,
            amount: self.amount,
            timestamp,
            content_hash,
            mint_token: self.mint_token,
        }
    }
}

/// Canonical field order is fixed; `tx_id` and the nanosecond timestamp act
/// as the uniqueness component.
fn content_hash(draft: &RecordDraft, tx_id: TxId, timestamp: DateTime<Utc>) -> String {
    let canonical = format!(
        "{}:{}:{}:{}:{}:{}:{}",
        draft.kind.as_str(),
        draft.lot_id,
        fmt_account(draft.from),
        fmt_account(draft.to),
        draft.amount,
        timestamp.timestamp_nanos_opt().unwrap_or_default(),
        tx_id,
    );
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

fn fmt_account(account: Option<AccountId>) -> String {
    account.map_or_else(|| "null".to_string(), |id| id.to_string())
}

/// Proof of retirement handed to external emissions-offset accounting.
/// The offset figure is derived display data, not ledger state.
#[derive(Debug, Clone, Serialize)]
pub struct RetirementReceipt {
    pub lot_id: LotId,
    pub amount: Decimal,
    pub co2_offset_kg: Decimal,
    pub tx_id: TxId,
    pub timestamp: DateTime<Utc>,
}
