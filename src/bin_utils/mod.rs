//! This module could be a separate crate on its own, to bootstrap [`h2_ledger`] within binary
//! but for simplicity purposes, I include this module directly in binary.

use std::io::{Read, Write};

use anyhow::Result;
use chrono::Utc;

use crate::command::{MintCommand, RetireCommand, TransferCommand, require};
use crate::engine::{LedgerEngine, LedgerError};
use crate::store::LedgerStore;
use crate::store::in_memory_store::InMemoryLedgerStore;
use csv_parser::{CsvOperationParser, OperationKind, OperationRow};
use csv_printer::{LotRow, print_lots};
pub mod csv_parser;
pub mod csv_printer;

pub struct Service<'w, R, W: 'w> {
    pub input: R,
    pub output: &'w mut W,
    pub error_printer: Box<dyn FnMut(u64, LedgerError)>,
}

impl<'w, R, W> Service<'w, R, W>
where
    R: Read,
    W: Write + 'w,
{
    pub fn run(mut self) -> Result<()> {
        let parser = CsvOperationParser::new(self.input);

        let engine = LedgerEngine::new(InMemoryLedgerStore::default());

        for (line, row) in parser {
            if let Err(err) = apply_row(&engine, row) {
                (self.error_printer)(line, err);
            }
        }

        let mut lots = engine.store().lots();
        lots.sort_by_key(|lot| lot.lot_id);
        print_lots(
            self.output,
            lots.into_iter().map(|lot| LotRow {
                lot: lot.lot_id,
                batch: lot.batch_id,
                owner: lot.owner,
                amount: lot.amount,
                status: lot.status,
            }),
        )
    }
}

/// Registration rows get their ids in file order, so a fixture can refer
/// to accounts and batches by position.
fn apply_row(
    engine: &LedgerEngine<InMemoryLedgerStore>,
    row: OperationRow,
) -> Result<(), LedgerError> {
    match row.op {
        OperationKind::Account => {
            engine
                .store()
                .register_account(require("role", row.role)?, None);
            Ok(())
        }
        OperationKind::Batch => {
            engine.store().create_batch(
                require("account", row.account)?,
                row.amount.unwrap_or_default(),
                Utc::now().date_naive(),
                row.token,
            )?;
            Ok(())
        }
        OperationKind::Approve => engine
            .decide_batch(
                require("account", row.account)?,
                require("batch", row.batch)?,
                true,
            )
            .map(drop),
        OperationKind::Mint => engine
            .mint(MintCommand::parse(
                require("batch", row.batch)?,
                require("account", row.account)?,
                row.amount,
                row.token,
            )?)
            .map(drop),
        OperationKind::Transfer => engine
            .transfer(TransferCommand::parse(
                require("lot", row.lot)?,
                require("account", row.account)?,
                require("to", row.to)?,
                row.amount,
            )?)
            .map(drop),
        OperationKind::Retire => engine
            .retire(RetireCommand::parse(
                require("lot", row.lot)?,
                require("account", row.account)?,
                row.amount,
            )?)
            .map(drop),
    }
}
