use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountKind {
    Giro,
    CreditCard,
}

/// One line item from the post-login account overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// IBAN for giro accounts, masked card number for credit cards.
    pub number: String,
    pub kind: AccountKind,
    /// Display label as shown in the overview dropdown.
    pub name: String,
}

/// Login material, read once and never written anywhere.
#[derive(Clone)]
pub struct Credentials {
    pub user_id: String,
    pub pin: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("pin", &"<redacted>")
            .finish()
    }
}

/// Proof of a completed login. Constructed only by the login flow; everything
/// downstream borrows it. Cookie state stays inside the transport.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    /// XSRF prevention token the bank expects on authenticated form posts.
    pub xsrf_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts_pin() {
        let creds = Credentials {
            user_id: "jdoe".to_string(),
            pin: "123456".to_string(),
        };
        let printed = format!("{creds:?}");
        assert!(printed.contains("jdoe"));
        assert!(!printed.contains("123456"));
    }
}
