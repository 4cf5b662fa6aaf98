//! Turns one raw export into canonical records plus row-level warnings.
//!
//! Exports arrive as semicolon-separated CSV with a metadata preamble, then
//! the column header, then data rows. A row that cannot be parsed becomes a
//! warning and parsing continues; every data row ends up as exactly one
//! record or one warning.

use csv::StringRecord;
use thiserror::Error;
use tracing::debug;

use umsatz_core::{Account, AccountKind, ExportWarning, TransactionRecord};

use crate::parsers::{credit_card, currency_from_header, giro};

/// The export never showed the expected column header; the layout drifted and
/// nothing in the payload can be trusted. Account-level, permanent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unrecognized export layout: {0}")]
pub struct LayoutError(pub String);

/// The preamble stated a row count that does not match what was parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowCountMismatch {
    pub stated: usize,
    pub seen: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedExport {
    pub records: Vec<TransactionRecord>,
    pub warnings: Vec<ExportWarning>,
    /// Set when the export's own row-count checksum disagrees; non-fatal.
    pub row_count_mismatch: Option<RowCountMismatch>,
}

/// Parse the raw CSV for `account` into canonical records. Deterministic:
/// identical input yields identical records and warnings.
pub fn normalize(account: &Account, raw: &str) -> Result<NormalizedExport, LayoutError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .has_headers(false)
        .from_reader(raw.as_bytes());

    let mut records = Vec::new();
    let mut warnings = Vec::new();
    let mut stated_rows: Option<usize> = None;
    let mut currency: Option<String> = None;
    let mut header_seen = false;
    let mut data_row = 0usize;

    for row in reader.records() {
        let row = match row {
            Ok(r) => r,
            Err(e) => {
                // Only reachable for I/O-level trouble; string input makes
                // this effectively dead, but never drop a row silently.
                data_row += 1;
                warnings.push(ExportWarning {
                    account: account.number.clone(),
                    row: data_row,
                    raw: String::new(),
                    reason: format!("unreadable csv row: {e}"),
                });
                continue;
            }
        };

        if is_blank(&row) {
            continue;
        }

        if !header_seen {
            if is_header(account.kind, &row) {
                header_seen = true;
                currency = currency_from_header(&row);
                debug!(
                    account = %account.number,
                    currency = currency.as_deref().unwrap_or("EUR"),
                    "export header recognized"
                );
            } else if let Some((key, value)) = metadata_line(&row) {
                if key.starts_with("Anzahl") {
                    stated_rows = value.trim().parse().ok();
                }
            }
            continue;
        }

        data_row += 1;
        let currency = currency.as_deref().unwrap_or("EUR");
        let parsed = match account.kind {
            AccountKind::Giro => giro::parse_row(&row, account, currency),
            AccountKind::CreditCard => credit_card::parse_row(&row, account, currency),
        };
        match parsed {
            Ok(record) => records.push(record),
            Err(reason) => warnings.push(ExportWarning {
                account: account.number.clone(),
                row: data_row,
                raw: row.iter().collect::<Vec<_>>().join(";"),
                reason,
            }),
        }
    }

    if !header_seen {
        return Err(LayoutError(format!(
            "no {:?} column header found in export for {}",
            account.kind, account.number
        )));
    }

    let row_count_mismatch = stated_rows
        .filter(|stated| *stated != data_row)
        .map(|stated| RowCountMismatch {
            stated,
            seen: data_row,
        });

    Ok(NormalizedExport {
        records,
        warnings,
        row_count_mismatch,
    })
}

fn is_blank(row: &StringRecord) -> bool {
    row.iter().all(|f| f.trim().is_empty())
}

fn is_header(kind: AccountKind, row: &StringRecord) -> bool {
    match kind {
        AccountKind::Giro => giro::is_header(row),
        AccountKind::CreditCard => credit_card::is_header(row),
    }
}

/// Preamble lines look like `"Anzahl Umsätze:";"27"`.
fn metadata_line(row: &StringRecord) -> Option<(String, String)> {
    let key = row.get(0)?.trim().trim_end_matches(':').to_string();
    let value = row.get(1)?.trim().to_string();
    if key.is_empty() { None } else { Some((key, value)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use umsatz_core::Amount;

    fn giro_account() -> Account {
        Account {
            number: "DE02120300000000202051".to_string(),
            kind: AccountKind::Giro,
            name: "DE02120300000000202051 / Girokonto".to_string(),
        }
    }

    fn credit_account() -> Account {
        Account {
            number: "4998________1234".to_string(),
            kind: AccountKind::CreditCard,
            name: "4998________1234 / Kreditkarte".to_string(),
        }
    }

    const GIRO_HEADER: &str = "\"Buchungstag\";\"Wertstellung\";\"Buchungstext\";\"Auftraggeber / Begünstigter\";\"Verwendungszweck\";\"Kontonummer\";\"BLZ\";\"Betrag (EUR)\";\"Gläubiger-ID\";\"Mandatsreferenz\";\"Kundenreferenz\";";

    fn giro_export(rows: &[&str]) -> String {
        let mut out = String::new();
        out.push_str("\"Kontonummer:\";\"DE02120300000000202051 / Girokonto\";\n");
        out.push_str("\"Von:\";\"01.01.2023\";\n");
        out.push_str("\"Bis:\";\"01.02.2023\";\n");
        out.push_str("\"Kontostand vom 01.02.2023:\";\"1.234,56 EUR\";\n");
        out.push_str(";\n");
        out.push_str(GIRO_HEADER);
        out.push('\n');
        for row in rows {
            out.push_str(row);
            out.push('\n');
        }
        out
    }

    fn giro_row(date: &str, counterparty: &str, purpose: &str, amount: &str) -> String {
        format!(
            "\"{date}\";\"{date}\";\"Lastschrift\";\"{counterparty}\";\"{purpose}\";\"DE11111111111111111111\";\"12030000\";\"{amount}\";\"\";\"\";\"\";"
        )
    }

    #[test]
    fn test_giro_row_maps_to_canonical_record() {
        let raw = giro_export(&[&giro_row("01.02.2023", "Shop", "Purchase", "-12,34")]);
        let out = normalize(&giro_account(), &raw).unwrap();

        assert_eq!(out.warnings, vec![]);
        assert_eq!(out.records.len(), 1);
        let record = &out.records[0];
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2023, 2, 1).unwrap());
        assert_eq!(record.amount, Amount::from_cents(-1234));
        assert_eq!(record.currency, "EUR");
        assert_eq!(record.counterparty, "Shop");
        assert_eq!(record.description, "Purchase");
        assert_eq!(record.balance, None);
        assert_eq!(record.account, "DE02120300000000202051");
    }

    #[test]
    fn test_malformed_row_becomes_warning_not_abort() {
        let mut rows: Vec<String> = (1..=9)
            .map(|day| giro_row(&format!("{day:02}.01.2023"), "Shop", "Purchase", "-1,00"))
            .collect();
        rows.insert(4, giro_row("banana", "Shop", "Purchase", "-1,00"));
        let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        let raw = giro_export(&refs);

        let out = normalize(&giro_account(), &raw).unwrap();
        assert_eq!(out.records.len(), 9);
        assert_eq!(out.warnings.len(), 1);
        let warning = &out.warnings[0];
        assert_eq!(warning.row, 5);
        assert!(warning.reason.contains("booking date"));
        assert!(warning.raw.contains("banana"));
    }

    #[test]
    fn test_row_count_invariant() {
        let rows = [
            giro_row("01.01.2023", "A", "x", "-1,00"),
            giro_row("02.01.2023", "B", "y", "kaputt"),
            giro_row("03.01.2023", "C", "z", "3,00"),
            "\"nur\";\"zwei\"".to_string(),
        ];
        let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        let raw = giro_export(&refs);

        let out = normalize(&giro_account(), &raw).unwrap();
        assert_eq!(out.records.len() + out.warnings.len(), 4);
    }

    #[test]
    fn test_stated_row_count_mismatch_is_reported() {
        let mut raw = String::from("\"Anzahl Umsätze:\";\"3\";\n");
        raw.push_str(GIRO_HEADER);
        raw.push('\n');
        raw.push_str(&giro_row("01.01.2023", "A", "x", "-1,00"));
        raw.push('\n');

        let out = normalize(&giro_account(), &raw).unwrap();
        assert_eq!(
            out.row_count_mismatch,
            Some(RowCountMismatch { stated: 3, seen: 1 })
        );
        // The summary never masquerades as a row warning.
        assert_eq!(out.warnings, vec![]);
    }

    #[test]
    fn test_stated_row_count_match_is_silent() {
        let mut raw = String::from("\"Anzahl Umsätze:\";\"1\";\n");
        raw.push_str(GIRO_HEADER);
        raw.push('\n');
        raw.push_str(&giro_row("01.01.2023", "A", "x", "-1,00"));
        raw.push('\n');

        let out = normalize(&giro_account(), &raw).unwrap();
        assert_eq!(out.row_count_mismatch, None);
    }

    #[test]
    fn test_missing_header_is_a_layout_error() {
        let raw = "\"v5 something new\";\"entirely\";\n\"01.01.2023\";\"-1,00\";\n";
        assert!(normalize(&giro_account(), raw).is_err());
    }

    #[test]
    fn test_credit_card_charge_sign_is_normalized() {
        let raw = concat!(
            "\"Kreditkarte:\";\"4998________1234\";\n",
            "\"Saldo:\";\"123,45 EUR\";\n",
            "\"Datum:\";\"01.02.2023\";\n",
            ";\n",
            "\"Umsatz abgerechnet und nicht im Saldo enthalten\";\"Wertstellung\";\"Belegdatum\";\"Beschreibung\";\"Betrag (EUR)\";\"Ursprünglicher Betrag\";\n",
            "\"Ja\";\"20.01.2023\";\"18.01.2023\";\"KAUFHAUS BERLIN\";\"59,99\";\"\";\n",
            "\"Ja\";\"21.01.2023\";\"19.01.2023\";\"ERSTATTUNG SHOP\";\"-10,00\";\"\";\n",
        );
        let out = normalize(&credit_account(), raw).unwrap();

        assert_eq!(out.records.len(), 2);
        // A charge leaves the account: canonical sign is negative.
        assert_eq!(out.records[0].amount, Amount::from_cents(-5999));
        assert_eq!(out.records[0].counterparty, "KAUFHAUS BERLIN");
        assert_eq!(
            out.records[0].date,
            NaiveDate::from_ymd_opt(2023, 1, 18).unwrap()
        );
        // A refund flows back in.
        assert_eq!(out.records[1].amount, Amount::from_cents(1000));
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let rows = [
            giro_row("01.01.2023", "A", "x", "-1,00"),
            giro_row("02.01.2023", "B", "y", "oops"),
        ];
        let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        let raw = giro_export(&refs);

        let first = normalize(&giro_account(), &raw).unwrap();
        let second = normalize(&giro_account(), &raw).unwrap();
        assert_eq!(first, second);
    }
}
