//! One row parser per account kind; each owns its column layout and fails
//! per row with a reason string instead of aborting the export.

pub mod credit_card;
pub mod giro;

use csv::StringRecord;

/// Read the ISO currency code out of the amount column header, e.g.
/// `Betrag (EUR)` → `EUR`.
pub(crate) fn currency_from_header(header: &StringRecord) -> Option<String> {
    let amount_column = header.iter().find(|f| f.trim().starts_with("Betrag"))?;
    let open = amount_column.find('(')?;
    let close = amount_column.find(')')?;
    let code = amount_column.get(open + 1..close)?.trim();
    if code.is_empty() {
        None
    } else {
        Some(code.to_string())
    }
}

pub(crate) fn field<'a>(row: &'a StringRecord, index: usize) -> &'a str {
    row.get(index).unwrap_or("").trim()
}
