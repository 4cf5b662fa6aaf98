//! Login state machine with app-based push confirmation.
//!
//! The flow submits the credential form, waits for the user to confirm the
//! login on their bound device, and polls the confirmation status endpoint
//! until it resolves. The poll protocol is an undocumented, institution-owned
//! contract; everything that knows about it lives in this module.

use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use umsatz_core::{AuthError, Credentials, Session};

use crate::config::BankConfig;
use crate::transport::{Transport, TransportError};

pub(crate) const LOGIN_PATH: &str = "/-?$javascript=disabled";
const CONFIRM_PATH: &str = "/DkbTransactionBanking/content/LoginWithBoundDevice/LoginWithBoundDeviceProcess/confirmLogin.xhtml";
const POLL_PATH: &str = "/DkbTransactionBanking/content/LoginWithBoundDevice/LoginWithBoundDeviceProcess/confirmLogin.xhtml?$event=pollingVerification";

/// The login form re-appearing in a response means we are not (or no longer)
/// authenticated.
pub(crate) const LOGIN_FORM_MARKER: &str = "Anmeldung zum Internet-Banking";
/// Shown when the bank wants the login confirmed in the app.
const APP_CONFIRM_MARKER: &str = "und bestätigen dort";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    Unauthenticated,
    CredentialsSubmitted,
    ChallengeIssued,
    Polling,
    Authenticated,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeStatus {
    Pending,
    Confirmed,
    Rejected,
    Expired,
}

/// The server-issued second-factor request. At most one per login attempt;
/// its status only ever moves away from `Pending` once.
#[derive(Debug, Clone)]
pub struct Challenge {
    /// XSRF prevention token scoped to this confirmation.
    pub token: String,
    /// Device the bank pushed the confirmation to.
    pub device: String,
    pub status: ChallengeStatus,
}

/// Drives one login attempt to exactly one terminal stage. The flow holds the
/// only mutable handle to authentication state; on success the [`Session`] is
/// handed out and never touched again.
pub struct LoginFlow<'a, T: Transport> {
    transport: &'a T,
    config: &'a BankConfig,
    stage: AuthStage,
}

impl<'a, T: Transport> LoginFlow<'a, T> {
    pub fn new(transport: &'a T, config: &'a BankConfig) -> Self {
        Self {
            transport,
            config,
            stage: AuthStage::Unauthenticated,
        }
    }

    pub fn stage(&self) -> AuthStage {
        self.stage
    }

    /// Run the full login. Every await inside is cancel-safe, so callers can
    /// `tokio::select!` this against Ctrl-C.
    pub async fn run(&mut self, credentials: &Credentials) -> Result<Session, AuthError> {
        match self.drive(credentials).await {
            Ok(session) => {
                self.stage = AuthStage::Authenticated;
                info!(user = %session.user_id, "login complete");
                Ok(session)
            }
            Err(e) => {
                self.stage = AuthStage::Failed;
                Err(e)
            }
        }
    }

    async fn drive(&mut self, credentials: &Credentials) -> Result<Session, AuthError> {
        info!(user = %credentials.user_id, "starting login");
        self.transport
            .get(LOGIN_PATH)
            .await
            .map_err(transport_err)?;

        let page = self
            .transport
            .post_form(
                LOGIN_PATH,
                &[
                    ("j_username", credentials.user_id.as_str()),
                    ("j_password", credentials.pin.as_str()),
                    ("jsEnabled", "false"),
                    ("browserName", "Firefox"),
                    ("browserVersion", "140"),
                ],
            )
            .await
            .map_err(transport_err)?;
        self.stage = AuthStage::CredentialsSubmitted;

        if page.body.contains(LOGIN_FORM_MARKER) {
            return Err(AuthError::InvalidCredentials);
        }

        let mut challenge = issue_challenge(&page.body)?;
        self.stage = AuthStage::ChallengeIssued;
        info!(device = %challenge.device, "confirm the login in the banking app");

        self.stage = AuthStage::Polling;
        self.poll(&mut challenge).await?;
        debug_assert_eq!(challenge.status, ChallengeStatus::Confirmed);

        let page = self
            .transport
            .post_form(
                CONFIRM_PATH,
                &[
                    ("$event", "next"),
                    ("XSRFPreventionToken", challenge.token.as_str()),
                ],
            )
            .await
            .map_err(transport_err)?;
        if page.body.contains(LOGIN_FORM_MARKER) {
            return Err(AuthError::SessionExpired);
        }

        Ok(Session {
            user_id: credentials.user_id.clone(),
            xsrf_token: challenge.token,
        })
    }

    /// Query the challenge status until it resolves or the overall deadline
    /// passes. Confirmation happens out-of-band; we can only observe it.
    async fn poll(&self, challenge: &mut Challenge) -> Result<(), AuthError> {
        let deadline = Instant::now() + self.config.challenge_timeout;
        let mut consecutive_failures = 0u32;

        loop {
            match self.transport.get(POLL_PATH).await {
                Ok(page) => {
                    consecutive_failures = 0;
                    match poll_status(&page.body) {
                        ChallengeStatus::Confirmed => {
                            challenge.status = ChallengeStatus::Confirmed;
                            info!("login confirmed");
                            return Ok(());
                        }
                        ChallengeStatus::Rejected => {
                            challenge.status = ChallengeStatus::Rejected;
                            return Err(AuthError::ChallengeRejected);
                        }
                        ChallengeStatus::Expired => {
                            challenge.status = ChallengeStatus::Expired;
                            return Err(AuthError::ChallengeTimeout);
                        }
                        ChallengeStatus::Pending => {
                            debug!("confirmation still pending");
                        }
                    }
                }
                Err(e) => {
                    consecutive_failures += 1;
                    warn!(error = %e, attempt = consecutive_failures, "status poll failed");
                    if consecutive_failures > self.config.poll_retry_limit {
                        return Err(AuthError::Transport(e.to_string()));
                    }
                }
            }

            // Never overshoot the budget by more than one interval.
            if Instant::now() + self.config.poll_interval > deadline {
                challenge.status = ChallengeStatus::Expired;
                return Err(AuthError::ChallengeTimeout);
            }
            sleep(self.config.poll_interval).await;
        }
    }
}

/// Best-effort session termination; failures are logged and swallowed.
pub async fn logout<T: Transport>(transport: &T) {
    let page = match transport.get(LOGIN_PATH).await {
        Ok(page) => page,
        Err(e) => {
            debug!(error = %e, "logout skipped");
            return;
        }
    };
    let Some(href) = logout_href(&page.body) else {
        debug!("no logout link found");
        return;
    };
    match transport.get(&href).await {
        Ok(_) => info!("logged out"),
        Err(e) => debug!(error = %e, "logout request failed"),
    }
}

pub(crate) fn session_lost(body: &str) -> bool {
    body.contains(LOGIN_FORM_MARKER)
}

fn transport_err(e: TransportError) -> AuthError {
    AuthError::Transport(e.to_string())
}

fn issue_challenge(body: &str) -> Result<Challenge, AuthError> {
    if !body.contains(APP_CONFIRM_MARKER) {
        // Neither the login form nor the app prompt: the bank changed the
        // page, or wants a factor this tool does not speak (e.g. chipTAN).
        return Err(AuthError::Transport(
            "login response carries no app confirmation prompt".to_string(),
        ));
    }
    let token = extract_input_value(body, "XSRFPreventionToken").ok_or_else(|| {
        AuthError::Transport("confirmation form carries no XSRFPreventionToken".to_string())
    })?;
    let device = extract_between(body, "Gerät: <strong>", "</strong>")
        .unwrap_or_else(|| "unbekannt".to_string());
    Ok(Challenge {
        token,
        device,
        status: ChallengeStatus::Pending,
    })
}

fn poll_status(body: &str) -> ChallengeStatus {
    if body.contains("MAP_TO_EXIT") {
        ChallengeStatus::Confirmed
    } else if body.contains("REJECTED") || body.contains("ABORTED") {
        ChallengeStatus::Rejected
    } else if body.contains("EXPIRED") {
        ChallengeStatus::Expired
    } else {
        // Includes the documented WAITING marker; anything unrecognized keeps
        // polling until the deadline rather than failing on format drift.
        ChallengeStatus::Pending
    }
}

fn extract_input_value(body: &str, name: &str) -> Option<String> {
    let marker = format!("name=\"{name}\"");
    let tag_start = body.find(&marker)?;
    let rest = &body[tag_start..];
    let value_at = rest.find("value=\"")?;
    let rest = &rest[value_at + "value=\"".len()..];
    let end = rest.find('"')?;
    let value = &rest[..end];
    if value.is_empty() { None } else { Some(value.to_string()) }
}

fn extract_between(body: &str, start: &str, end: &str) -> Option<String> {
    let at = body.find(start)?;
    let rest = &body[at + start.len()..];
    let stop = rest.find(end)?;
    Some(rest[..stop].trim().to_string())
}

fn logout_href(body: &str) -> Option<String> {
    let anchor = body.find(">Abmelden<")?;
    let head = &body[..anchor];
    let href_at = head.rfind("href=\"")?;
    let rest = &head[href_at + "href=\"".len()..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use crate::transport::Page;
    use tokio::time::Duration;

    fn config() -> BankConfig {
        BankConfig {
            poll_interval: Duration::from_millis(10),
            challenge_timeout: Duration::from_millis(100),
            backoff_base: Duration::from_millis(1),
            ..BankConfig::default()
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            user_id: "jdoe".to_string(),
            pin: "123456".to_string(),
        }
    }

    fn challenge_page() -> String {
        concat!(
            "<p>Sie haben eine Anfrage erhalten und bestätigen dort die Anmeldung.</p>",
            "<p>Gerät: <strong>Pixel 7</strong></p>",
            "<input type=\"hidden\" name=\"XSRFPreventionToken\" value=\"tok-1\"/>"
        )
        .to_string()
    }

    fn script_until_challenge(transport: &ScriptedTransport) {
        transport.on_get("$javascript", Ok(Page::ok("<form>login</form>")));
        transport.on_post("$javascript", Ok(Page::ok(challenge_page())));
    }

    #[tokio::test]
    async fn test_confirmed_challenge_authenticates() {
        let transport = ScriptedTransport::new();
        script_until_challenge(&transport);
        transport.on_get("pollingVerification", Ok(Page::ok("WAITING")));
        transport.on_get("pollingVerification", Ok(Page::ok("MAP_TO_EXIT")));
        transport.on_post("confirmLogin.xhtml", Ok(Page::ok("<html>Finanzstatus</html>")));

        let config = config();
        let mut flow = LoginFlow::new(&transport, &config);
        let session = flow.run(&credentials()).await.unwrap();

        assert_eq!(flow.stage(), AuthStage::Authenticated);
        assert_eq!(session.user_id, "jdoe");
        assert_eq!(session.xsrf_token, "tok-1");
        let confirms = transport.requests_matching("POST", "confirmLogin.xhtml");
        assert_eq!(confirms, 1);
    }

    #[tokio::test]
    async fn test_wrong_pin_fails_with_invalid_credentials() {
        let transport = ScriptedTransport::new();
        transport.on_get("$javascript", Ok(Page::ok("<form>login</form>")));
        transport.on_post(
            "$javascript",
            Ok(Page::ok("Anmeldung zum Internet-Banking <form>…</form>")),
        );

        let config = config();
        let mut flow = LoginFlow::new(&transport, &config);
        let err = flow.run(&credentials()).await.unwrap_err();

        assert_eq!(err, AuthError::InvalidCredentials);
        assert_eq!(flow.stage(), AuthStage::Failed);
        // The poll endpoint is never touched for a rejected credential pair.
        assert_eq!(transport.requests_matching("GET", "pollingVerification"), 0);
    }

    #[tokio::test]
    async fn test_rejected_challenge_fails() {
        let transport = ScriptedTransport::new();
        script_until_challenge(&transport);
        transport.on_get("pollingVerification", Ok(Page::ok("REJECTED")));

        let config = config();
        let mut flow = LoginFlow::new(&transport, &config);
        let err = flow.run(&credentials()).await.unwrap_err();

        assert_eq!(err, AuthError::ChallengeRejected);
        assert_eq!(flow.stage(), AuthStage::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unresolved_challenge_times_out_within_budget() {
        let transport = ScriptedTransport::new();
        script_until_challenge(&transport);
        transport.on_get("pollingVerification", Ok(Page::ok("WAITING")));

        let config = BankConfig {
            poll_interval: Duration::from_secs(3),
            challenge_timeout: Duration::from_secs(300),
            ..BankConfig::default()
        };
        let started = Instant::now();
        let mut flow = LoginFlow::new(&transport, &config);
        let err = flow.run(&credentials()).await.unwrap_err();

        assert_eq!(err, AuthError::ChallengeTimeout);
        assert_eq!(flow.stage(), AuthStage::Failed);
        // Bounded by the budget plus at most one polling interval.
        assert!(started.elapsed() <= config.challenge_timeout + config.poll_interval);
    }

    #[tokio::test]
    async fn test_transient_poll_failures_are_retried() {
        let transport = ScriptedTransport::new();
        script_until_challenge(&transport);
        transport.on_get("pollingVerification", Err(TransportError("reset".into())));
        transport.on_get("pollingVerification", Err(TransportError("reset".into())));
        transport.on_get("pollingVerification", Ok(Page::ok("MAP_TO_EXIT")));
        transport.on_post("confirmLogin.xhtml", Ok(Page::ok("<html>Finanzstatus</html>")));

        let config = config();
        let mut flow = LoginFlow::new(&transport, &config);
        assert!(flow.run(&credentials()).await.is_ok());
    }

    #[tokio::test]
    async fn test_persistent_poll_failure_is_a_transport_error() {
        let transport = ScriptedTransport::new();
        script_until_challenge(&transport);
        transport.on_get("pollingVerification", Err(TransportError("refused".into())));

        let config = config();
        let mut flow = LoginFlow::new(&transport, &config);
        let err = flow.run(&credentials()).await.unwrap_err();

        assert!(matches!(err, AuthError::Transport(_)));
        assert_eq!(flow.stage(), AuthStage::Failed);
        // One initial try plus poll_retry_limit retries.
        assert_eq!(
            transport.requests_matching("GET", "pollingVerification"),
            (config.poll_retry_limit + 1) as usize
        );
    }

    #[tokio::test]
    async fn test_unrecognized_login_response_is_not_misread() {
        let transport = ScriptedTransport::new();
        transport.on_get("$javascript", Ok(Page::ok("<form>login</form>")));
        transport.on_post("$javascript", Ok(Page::ok("chipTAN Startcode 12345678")));

        let config = config();
        let mut flow = LoginFlow::new(&transport, &config);
        let err = flow.run(&credentials()).await.unwrap_err();
        assert!(matches!(err, AuthError::Transport(_)));
    }

    #[test]
    fn test_poll_status_markers() {
        assert_eq!(poll_status("…WAITING…"), ChallengeStatus::Pending);
        assert_eq!(poll_status("something else"), ChallengeStatus::Pending);
        assert_eq!(poll_status("…MAP_TO_EXIT…"), ChallengeStatus::Confirmed);
        assert_eq!(poll_status("…ABORTED…"), ChallengeStatus::Rejected);
        assert_eq!(poll_status("…EXPIRED…"), ChallengeStatus::Expired);
    }

    #[test]
    fn test_issue_challenge_extracts_token_and_device() {
        let challenge = issue_challenge(&challenge_page()).unwrap();
        assert_eq!(challenge.token, "tok-1");
        assert_eq!(challenge.device, "Pixel 7");
        assert_eq!(challenge.status, ChallengeStatus::Pending);
    }

    #[test]
    fn test_logout_href() {
        let body = r#"<a class="nav" href="/logout?x=1">Abmelden</a>"#;
        assert_eq!(logout_href(body), Some("/logout?x=1".to_string()));
        assert_eq!(logout_href("<a href=\"/x\">Konto</a>"), None);
    }
}
