//! Writes one canonical CSV per account.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use umsatz_core::{Account, TransactionRecord};

const COLUMNS: [&str; 6] = [
    "date",
    "amount",
    "currency",
    "counterparty",
    "description",
    "balance",
];

/// Write `records` under `dir`, preferring the server-suggested filename.
/// Dates come out ISO, amounts canonical, balance blank when unavailable.
pub fn write_records(
    dir: &Path,
    account: &Account,
    suggested_name: Option<&str>,
    records: &[TransactionRecord],
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;

    let name = suggested_name
        .map(sanitize)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("{}.csv", sanitize(&account.number)));
    let path = dir.join(name);

    let mut writer =
        csv::Writer::from_path(&path).with_context(|| format!("create {}", path.display()))?;
    writer.write_record(COLUMNS)?;
    for record in records {
        writer.write_record([
            record.date.format("%Y-%m-%d").to_string(),
            record.amount.to_string(),
            record.currency.clone(),
            record.counterparty.clone(),
            record.description.clone(),
            record.balance.map(|b| b.to_string()).unwrap_or_default(),
        ])?;
    }
    writer
        .flush()
        .with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

/// Server-suggested names and account numbers can carry path separators and
/// other hostile characters; keep a conservative subset.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_matches('.')
        .to_string()
}
