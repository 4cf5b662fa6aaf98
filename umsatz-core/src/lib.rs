//! umsatz-core: canonical domain types for the DKB transaction exporter

pub mod account;
pub mod amount;
pub mod dates;
pub mod error;
pub mod record;
pub mod report;

pub use account::{Account, AccountKind, Credentials, Session};
pub use amount::Amount;
pub use dates::{DateRange, parse_de_date};
pub use error::{AuthError, DiscoveryError, ExportError};
pub use record::{ExportWarning, TransactionRecord};
pub use report::RunReport;
