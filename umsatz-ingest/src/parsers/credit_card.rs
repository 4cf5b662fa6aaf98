//! Credit card export layout.
//!
//! Columns after the preamble:
//!   "Umsatz abgerechnet und nicht im Saldo enthalten";"Wertstellung";
//!   "Belegdatum";"Beschreibung";"Betrag (EUR)";"Ursprünglicher Betrag"
//!
//! This layout writes charges with a positive sign, the inverse of the giro
//! convention, so amounts are negated: canonical negative always means money
//! leaving the account. The record date is the document date (Belegdatum).

use csv::StringRecord;

use umsatz_core::{Account, Amount, TransactionRecord, parse_de_date};

use super::field;

const COL_DOCUMENT_DATE: usize = 2;
const COL_DESCRIPTION: usize = 3;
const COL_AMOUNT: usize = 4;
const COL_ORIGINAL_AMOUNT: usize = 5;
const MIN_COLUMNS: usize = 5;

pub(crate) fn is_header(row: &StringRecord) -> bool {
    field(row, 0).starts_with("Umsatz abgerechnet")
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

    let date = parse_de_date(field(row, COL_DOCUMENT_DATE))
        .map_err(|e| format!("bad document date {:?}: {e}", field(row, COL_DOCUMENT_DATE)))?;
    let amount = Amount::parse_de(field(row, COL_AMOUNT))
        .map_err(|e| format!("bad amount: {e}"))?;

    // Foreign-currency purchases carry their original amount in a trailing
    // column; keep it as the description.
    let original = field(row, COL_ORIGINAL_AMOUNT);

    Ok(TransactionRecord {
        date,
        amount: -amount,
        currency: currency.to_string(),
        counterparty: field(row, COL_DESCRIPTION).to_string(),
        description: original.to_string(),
        balance: None,
        account: account.number.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use umsatz_core::AccountKind;

    fn account() -> Account {
        Account {
            number: "4998________1234".to_string(),
            kind: AccountKind::CreditCard,
            name: "4998________1234 / Kreditkarte".to_string(),
        }
    }

    #[test]
    fn test_charge_is_negated() {
        let row = StringRecord::from(vec![
            "Ja",
            "20.01.2023",
            "18.01.2023",
            "HOTEL LISBOA",
            "89,90",
            "94,10 USD",
        ]);
        let record = parse_row(&row, &account(), "EUR").unwrap();
        assert_eq!(record.amount, Amount::from_cents(-8990));
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2023, 1, 18).unwrap());
        assert_eq!(record.counterparty, "HOTEL LISBOA");
        assert_eq!(record.description, "94,10 USD");
    }

    #[test]
    fn test_bad_amount_is_rejected() {
        let row = StringRecord::from(vec!["Ja", "20.01.2023", "18.01.2023", "X", "zwölf", ""]);
        assert!(parse_row(&row, &account(), "EUR").is_err());
    }
}
