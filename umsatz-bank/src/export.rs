//! Per-account export download.
//!
//! Accounts run strictly sequentially against the single session; the bank's
//! session model does not tolerate concurrent authenticated requests. Failures
//! are classified up front: transient ones retry with exponential backoff,
//! permanent ones skip the account, an expired session ends the run.

use regex::Regex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use umsatz_core::{Account, AccountKind, DateRange, ExportError, Session};

use crate::auth::session_lost;
use crate::config::BankConfig;
use crate::discovery::{ACCOUNT_SELECT_NAME, OVERVIEW_PATH};
use crate::transport::{Page, Transport, TransportError};

/// One account's downloaded export, still in the bank's own CSV dialect.
#[derive(Debug, Clone)]
pub struct RawExport {
    pub account: Account,
    pub csv: String,
    /// Filename suggested by the server's Content-Disposition header.
    pub suggested_name: Option<String>,
}

/// Download one account's CSV export over the given window, retrying
/// transient failures up to the configured limit.
pub async fn export_account<T: Transport>(
    transport: &T,
    session: &Session,
    config: &BankConfig,
    account: &Account,
    range: &DateRange,
) -> Result<RawExport, ExportError> {
    let mut attempt = 0u32;
    loop {
        match try_export(transport, session, account, range).await {
            Ok(raw) => {
                info!(account = %account.number, bytes = raw.csv.len(), "export downloaded");
                return Ok(raw);
            }
            Err(ExportError::Transient(reason)) if attempt < config.export_retry_limit => {
                attempt += 1;
                let delay = config.backoff_base * 2u32.pow(attempt - 1);
                warn!(
                    account = %account.number,
                    %reason,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "transient export failure, backing off"
                );
                sleep(delay).await;
            }
            Err(ExportError::Transient(reason)) => {
                return Err(ExportError::Permanent(format!(
                    "retries exhausted: {reason}"
                )));
            }
            Err(e) => return Err(e),
        }
    }
}

async fn try_export<T: Transport>(
    transport: &T,
    session: &Session,
    account: &Account,
    range: &DateRange,
) -> Result<RawExport, ExportError> {
    // Selecting the account reloads the form with the kind-specific filters.
    let page = transport
        .post_form(
            OVERVIEW_PATH,
            &[
                (ACCOUNT_SELECT_NAME, account.number.as_str()),
                ("XSRFPreventionToken", session.xsrf_token.as_str()),
            ],
        )
        .await
        .map_err(transient)?;
    checked(page, "account selection")?;

    let from = range.from_de();
    let to = range.to_de();
    let filter: Vec<(&str, &str)> = match account.kind {
        AccountKind::Giro => vec![
            ("searchPeriodRadio", "1"),
            ("transactionDate", from.as_str()),
            ("toTransactionDate", to.as_str()),
            ("$event", "search"),
            ("XSRFPreventionToken", session.xsrf_token.as_str()),
        ],
        AccountKind::CreditCard => vec![
            ("filterType", "DATE_RANGE"),
            ("postingDate", from.as_str()),
            ("toPostingDate", to.as_str()),
            ("$event", "search"),
            ("XSRFPreventionToken", session.xsrf_token.as_str()),
        ],
    };
    debug!(account = %account.number, %from, %to, "requesting export window");
    let page = transport
        .post_form(OVERVIEW_PATH, &filter)
        .await
        .map_err(transient)?;
    let page = checked(page, "date range search")?;

    let Some(href) = csv_href(&page.body) else {
        return Err(ExportError::Permanent(
            "export view carries no csv link".to_string(),
        ));
    };

    let page = transport.get(&href).await.map_err(transient)?;
    let page = checked(page, "csv download")?;
    if page.body.trim().is_empty() {
        return Err(ExportError::Permanent("empty export payload".to_string()));
    }

    Ok(RawExport {
        account: account.clone(),
        suggested_name: page.attachment_name.clone(),
        csv: page.body,
    })
}

/// Map a response to the failure taxonomy: 5xx retries, 4xx does not, and a
/// login form instead of banking content means the session is gone.
fn checked(page: Page, step: &str) -> Result<Page, ExportError> {
    if session_lost(&page.body) {
        return Err(ExportError::SessionExpired);
    }
    if page.is_server_error() {
        return Err(ExportError::Transient(format!(
            "{step} answered HTTP {}",
            page.status
        )));
    }
    if page.is_client_error() {
        return Err(ExportError::Permanent(format!(
            "{step} answered HTTP {}",
            page.status
        )));
    }
    Ok(page)
}

fn transient(e: TransportError) -> ExportError {
    ExportError::Transient(e.to_string())
}

fn csv_href(body: &str) -> Option<String> {
    let re = Regex::new(r#"href="(?P<href>[^"]*csv[^"]*)""#).ok()?;
    Some(re.captures(body)?["href"].to_string())
}
