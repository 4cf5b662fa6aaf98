//! The run pipeline: login → discover → export each account sequentially →
//! normalize → write. Fatal errors abort immediately; per-account failures
//! are collected and the run keeps going.

use std::path::Path;

use chrono::Local;
use thiserror::Error;
use tracing::{info, warn};

use umsatz_bank::{HttpTransport, LoginFlow, discover, export_account, logout};
use umsatz_core::{
    Account, AuthError, Credentials, DateRange, DiscoveryError, ExportError, RunReport, Session,
};
use umsatz_ingest::normalize;

use crate::{Cli, config, output, prompt};

const DEFAULT_WINDOW_DAYS: u64 = 180;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

enum AccountError {
    /// The session died; nothing further can succeed.
    Fatal,
    /// This account is lost, the rest of the run is not.
    Skipped(String),
}

pub async fn run(cli: Cli) -> Result<RunReport, RunError> {
    let config = config::load(cli.config.as_deref()).map_err(|e| RunError::Usage(format!("{e:#}")))?;
    let bank_config = config.bank_config();

    let today = Local::now().date_naive();
    let range = DateRange {
        from: cli
            .from_date
            .unwrap_or_else(|| DateRange::last_days(today, DEFAULT_WINDOW_DAYS).from),
        to: cli.to_date.unwrap_or(today),
    };
    if range.from > range.to {
        return Err(RunError::Usage(format!(
            "--from-date {} lies after --to-date {}",
            range.from_de(),
            range.to_de()
        )));
    }

    let pin = prompt::read_pin(cli.batch).map_err(|e| RunError::Usage(format!("{e:#}")))?;
    let credentials = Credentials {
        user_id: cli.userid.clone(),
        pin,
    };

    let transport = HttpTransport::new(&bank_config)
        .map_err(|e| AuthError::Transport(e.to_string()))?;

    println!("Logging in as {}; confirm in the banking app when asked.", credentials.user_id);
    let mut flow = LoginFlow::new(&transport, &bank_config);
    let session = tokio::select! {
        result = flow.run(&credentials) => result?,
        _ = tokio::signal::ctrl_c() => return Err(AuthError::Interrupted.into()),
    };

    let found = discover(&transport, &session).await?;
    info!(
        accounts = found.accounts.len(),
        rejected = found.rejected.len(),
        "overview parsed"
    );

    let mut report = RunReport::default();
    for rejected in &found.rejected {
        report.record_failure(&rejected.label, rejected.reason.clone());
    }

    for account in &found.accounts {
        let processed = process_account(
            &transport,
            &session,
            &bank_config,
            account,
            &range,
            &cli.output,
        )
        .await;
        match processed {
            Ok((records, warnings)) => report.record_success(&account.number, records, warnings),
            Err(AccountError::Fatal) => return Err(AuthError::SessionExpired.into()),
            Err(AccountError::Skipped(reason)) => {
                warn!(account = %account.number, %reason, "account skipped");
                report.record_failure(&account.number, reason);
            }
        }
    }

    logout(&transport).await;
    Ok(report)
}

async fn process_account(
    transport: &HttpTransport,
    session: &Session,
    bank_config: &umsatz_bank::BankConfig,
    account: &Account,
    range: &DateRange,
    out_dir: &Path,
) -> Result<(usize, usize), AccountError> {
    let raw = export_account(transport, session, bank_config, account, range)
        .await
        .map_err(|e| match e {
            ExportError::SessionExpired => AccountError::Fatal,
            other => AccountError::Skipped(other.to_string()),
        })?;

    let normalized =
        normalize(account, &raw.csv).map_err(|e| AccountError::Skipped(e.to_string()))?;
    if let Some(mismatch) = normalized.row_count_mismatch {
        warn!(
            account = %account.number,
            stated = mismatch.stated,
            seen = mismatch.seen,
            "export states a different row count than it carries"
        );
    }
    for warning in &normalized.warnings {
        warn!(
            account = %warning.account,
            row = warning.row,
            reason = %warning.reason,
            "row skipped"
        );
    }

    let path = output::write_records(
        out_dir,
        account,
        raw.suggested_name.as_deref(),
        &normalized.records,
    )
    .map_err(|e| AccountError::Skipped(format!("writing output: {e:#}")))?;

    info!(
        account = %account.number,
        records = normalized.records.len(),
        warnings = normalized.warnings.len(),
        file = %path.display(),
        "account exported"
    );
    Ok((normalized.records.len(), normalized.warnings.len()))
}

pub fn print_summary(report: &RunReport) {
    println!();
    for success in &report.succeeded {
        println!(
            "{}: {} records, {} row warnings",
            success.account, success.records, success.warnings
        );
    }
    for failure in &report.failed {
        println!("{}: failed ({})", failure.account, failure.reason);
    }
    if report.succeeded.is_empty() && report.failed.is_empty() {
        println!("No accounts found.");
    }
}
