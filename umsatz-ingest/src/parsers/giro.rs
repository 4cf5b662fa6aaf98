//! Giro (checking) export layout.
//!
//! Columns after the preamble:
//!   "Buchungstag";"Wertstellung";"Buchungstext";"Auftraggeber / Begünstigter";
//!   "Verwendungszweck";"Kontonummer";"BLZ";"Betrag (EUR)";"Gläubiger-ID";
//!   "Mandatsreferenz";"Kundenreferenz"
//!
//! Amounts are already signed from the account's point of view; they pass
//! through unchanged. There is no per-row running balance in this layout.

use csv::StringRecord;

use umsatz_core::{Account, Amount, TransactionRecord, parse_de_date};

use super::field;

const COL_BOOKING_DATE: usize = 0;
const COL_COUNTERPARTY: usize = 3;
const COL_PURPOSE: usize = 4;
const COL_AMOUNT: usize = 7;
const MIN_COLUMNS: usize = 8;

pub(crate) fn is_header(row: &StringRecord) -> bool {
    field(row, 0) == "Buchungstag"
}

pub(crate) fn parse_row(
    row: &StringRecord,
    account: &Account,
    currency: &str,
) -> Result<TransactionRecord, String> {
    if row.len() < MIN_COLUMNS {
        return Err(format!(
            "expected at least {MIN_COLUMNS} columns, got {}",
            row.len()
        ));
    }

    let date = parse_de_date(field(row, COL_BOOKING_DATE))
        .map_err(|e| format!("bad booking date {:?}: {e}", field(row, COL_BOOKING_DATE)))?;
    let amount = Amount::parse_de(field(row, COL_AMOUNT))
        .map_err(|e| format!("bad amount: {e}"))?;

    Ok(TransactionRecord {
        date,
        amount,
        currency: currency.to_string(),
        counterparty: field(row, COL_COUNTERPARTY).to_string(),
        description: field(row, COL_PURPOSE).to_string(),
        balance: None,
        account: account.number.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use umsatz_core::AccountKind;

    fn account() -> Account {
        Account {
            number: "DE02120300000000202051".to_string(),
            kind: AccountKind::Giro,
            name: "DE02120300000000202051 / Girokonto".to_string(),
        }
    }

    fn row(values: &[&str]) -> StringRecord {
        StringRecord::from(values.to_vec())
    }

    #[test]
    fn test_short_row_is_rejected_with_column_count() {
        let err = parse_row(&row(&["01.01.2023", "x"]), &account(), "EUR").unwrap_err();
        assert!(err.contains("columns"));
    }

    #[test]
    fn test_incoming_amount_keeps_positive_sign() {
        let record = parse_row(
            &row(&[
                "15.03.2023",
                "15.03.2023",
                "Gutschrift",
                "Arbeitgeber GmbH",
                "Gehalt März",
                "DE11111111111111111111",
                "12030000",
                "2.500,00",
            ]),
            &account(),
            "EUR",
        )
        .unwrap();
        assert_eq!(record.amount, Amount::from_cents(250_000));
        assert_eq!(record.counterparty, "Arbeitgeber GmbH");
        assert_eq!(record.description, "Gehalt März");
    }
}
