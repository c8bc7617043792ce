use super::de::nullable;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The Enterprise Grid organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enterprise {
    /// Enterprise id, `E…`
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    /// Display name
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    /// Enterprise subdomain
    #[serde(default, deserialize_with = "nullable")]
    pub domain: String,
    /// Allowed sign-up email domain
    #[serde(default, deserialize_with = "nullable")]
    pub email_domain: String,
    /// Verified organization
    #[serde(default, deserialize_with = "nullable")]
    pub is_verified: bool,
    /// Discoverability setting, a flag or a policy name depending on the team
    #[serde(default)]
    pub discoverable: Value,
    /// Billing currency
    #[serde(default, deserialize_with = "nullable")]
    pub pay_prod_cur: String,
    /// Default locale
    #[serde(default, deserialize_with = "nullable")]
    pub locale: String,
}

impl Enterprise {
    /// Web URL of the enterprise.
    #[must_use]
    pub fn url(&self) -> String {
        format!("https://{}.enterprise.slack.com", self.domain)
    }
}
