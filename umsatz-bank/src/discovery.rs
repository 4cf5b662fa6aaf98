//! Account discovery from the post-login transaction overview.
//!
//! The overview carries one `<select>` listing every account; its option
//! labels look like `DE02120300000000202051 / Girokonto` or
//! `4998________1234 / Kreditkarte`. The select control disappearing means
//! the page format drifted and nothing can be exported, so that fails loudly.

use regex::Regex;
use tracing::warn;

use umsatz_core::{Account, AccountKind, AuthError, DiscoveryError, Session};

use crate::auth::session_lost;
use crate::transport::Transport;

pub(crate) const OVERVIEW_PATH: &str = "/banking/finanzstatus/kontoumsaetze?$javascript=disabled";
pub(crate) const ACCOUNT_SELECT_NAME: &str = "slAllAccounts";

const GIRO_SUFFIX: &str = "Girokonto";
const CREDIT_SUFFIX: &str = "Kreditkarte";

/// A line item that looked like an account but could not be understood. The
/// run reports these as per-account failures; export never sees them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedLine {
    pub label: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredAccounts {
    pub accounts: Vec<Account>,
    pub rejected: Vec<RejectedLine>,
}

pub async fn discover<T: Transport>(
    transport: &T,
    _session: &Session,
) -> Result<DiscoveredAccounts, DiscoveryError> {
    let page = transport
        .get(OVERVIEW_PATH)
        .await
        .map_err(|e| DiscoveryError::Auth(AuthError::Transport(e.to_string())))?;
    if session_lost(&page.body) {
        return Err(DiscoveryError::Auth(AuthError::SessionExpired));
    }
    parse_overview(&page.body)
}

pub(crate) fn parse_overview(body: &str) -> Result<DiscoveredAccounts, DiscoveryError> {
    if !body.contains(ACCOUNT_SELECT_NAME) {
        return Err(DiscoveryError::Parse(format!(
            "account selection control '{ACCOUNT_SELECT_NAME}' not found in overview"
        )));
    }

    let option_re = Regex::new(r"<option[^>]*>(?P<label>[^<]+)</option>")
        .map_err(|e| DiscoveryError::Parse(e.to_string()))?;

    let mut accounts: Vec<Account> = Vec::new();
    let mut rejected = Vec::new();

    for caps in option_re.captures_iter(body) {
        let label = caps["label"].trim().to_string();
        if label.is_empty() {
            continue;
        }

        match parse_label(&label) {
            Ok(account) => {
                if accounts.iter().any(|a| a.number == account.number) {
                    continue;
                }
                accounts.push(account);
            }
            Err(reason) => {
                warn!(%label, %reason, "skipping unrecognized overview line");
                rejected.push(RejectedLine { label, reason });
            }
        }
    }

    if accounts.is_empty() && rejected.is_empty() {
        return Err(DiscoveryError::Parse(
            "no account entries recognized in overview".to_string(),
        ));
    }

    Ok(DiscoveredAccounts { accounts, rejected })
}

fn parse_label(label: &str) -> Result<Account, String> {
    let Some((number, kind_name)) = label.rsplit_once('/') else {
        return Err("missing '<number> / <type>' separator".to_string());
    };
    let number = number.trim();
    if number.is_empty() {
        return Err("empty account number".to_string());
    }

    let kind = match kind_name.trim() {
        k if k.ends_with(GIRO_SUFFIX) => AccountKind::Giro,
        k if k.ends_with(CREDIT_SUFFIX) => AccountKind::CreditCard,
        other => return Err(format!("unknown account type {other:?}")),
    };

    Ok(Account {
        number: number.to_string(),
        kind,
        name: label.to_string(),
    })
}
