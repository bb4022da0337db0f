use std::io::Read;

use csv::{DeserializeRecordsIntoIter, Trim};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::account::{AccountId, Role};
use crate::batch::BatchId;
use crate::lot::LotId;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Account,
    Batch,
    Approve,
    Mint,
    Transfer,
    Retire,
}

/// One row of the operations file. Which fields are required depends on
/// the operation; missing ones show up as `None` and are checked later.
#[derive(Debug, Deserialize)]
pub struct OperationRow {
    pub op: OperationKind,
    pub role: Option<Role>,
    pub account: Option<AccountId>,
    pub batch: Option<BatchId>,
    pub lot: Option<LotId>,
    pub to: Option<AccountId>,
    pub amount: Option<Decimal>,
    pub token: Option<String>,
}

/// Parses the operations list in CSV format
///
/// # Panics
///
/// If a row cannot be parsed
pub struct CsvOperationParser<R> {
    iter: DeserializeRecordsIntoIter<R, OperationRow>,
}

impl<R> CsvOperationParser<R>
where
    R: Read,
{
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(source);

        Self {
            iter: reader.into_deserialize(),
        }
    }
}

impl<R> Iterator for CsvOperationParser<R>
where
    R: Read,
{
    type Item = (u64, OperationRow);

    fn next(&mut self) -> Option<Self::Item> {
        let curr_line = self.iter.reader().position().line();
        self.iter.next().map(|row| (curr_line, row.unwrap()))
    }
}
