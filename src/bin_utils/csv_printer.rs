use std::io::Write;

use csv::Writer;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::account::AccountId;
use crate::batch::BatchId;
use crate::lot::{LotId, LotStatus};

#[derive(Debug, Serialize)]
pub struct LotRow {
    pub lot: LotId,
    pub batch: BatchId,
    pub owner: AccountId,
    pub amount: Decimal,
    pub status: LotStatus,
}

pub fn print_lots<W>(output: &mut W, lots: impl Iterator<Item = LotRow>) -> anyhow::Result<()>
where
    W: Write,
{
    let mut writer = Writer::from_writer(output);
    for lot in lots {
        if let Err(err) = writer.serialize(lot) {
            anyhow::bail!("Failed to write to CSV: {err}")
        }
    }
    // Ensure all data is flushed to the output
    if let Err(err) = writer.flush() {
        anyhow::bail!("Failed to flush CSV writer: {err}")
    }
    Ok(())
}
