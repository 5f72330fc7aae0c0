use std::io::Write;

use crate::error::ReconError;
use crate::model::{fixed, BlockEntries, EntryBlock, JournalEntry};

/// Ledger import columns, in order.
pub const ENTRY_HEADER: [&str; 15] = [
    "Journal Date",
    "Reference Number",
    "Journal Number Prefix",
    "Journal Number Suffix",
    "Notes",
    "Journal Type",
    "Currency",
    "Account",
    "Description",
    "Contact Name",
    "Debit",
    "Credit",
    "Project Name",
    "Status",
    "Exchange Rate",
];

const JOURNAL_TYPE: &str = "both";
const STATUS: &str = "published";

/// Concatenate block outputs in the fixed DIV, PUR, SAL, UNR order.
/// Internal order and journal numbers are kept as produced.
pub fn combine(blocks: &[BlockEntries]) -> Vec<JournalEntry> {
    EntryBlock::ALL
        .iter()
        .filter_map(|block| blocks.iter().find(|b| b.block == *block))
        .flat_map(|b| b.entries.iter().cloned())
        .collect()
}

/// Write entries in ledger import format. Output is byte-stable for equal input.
pub fn write_entries_csv(entries: &[JournalEntry], writer: impl Write) -> Result<(), ReconError> {
    let mut csv = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    csv.write_record(ENTRY_HEADER)?;
    for entry in entries {
        csv.write_record([
            entry.journal_date.format("%Y-%m-%d").to_string(),
            entry.reference_number.clone(),
            entry.journal_prefix.clone(),
            entry.journal_suffix.to_string(),
            entry.notes.clone(),
            JOURNAL_TYPE.to_string(),
            entry.currency.clone(),
            entry.account.clone(),
            entry.description.clone(),
            String::new(),
            entry.debit().map(|d| fixed(d, 2)).unwrap_or_default(),
            entry.credit().map(|c| fixed(c, 2)).unwrap_or_default(),
            String::new(),
            STATUS.to_string(),
            String::new(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Render to an in-memory CSV string.
pub fn entries_to_csv_string(entries: &[JournalEntry]) -> Result<String, ReconError> {
    let mut buf = Vec::new();
    write_entries_csv(entries, &mut buf)?;
    String::from_utf8(buf).map_err(|e| ReconError::Io(e.to_string()))
}
