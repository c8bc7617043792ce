use super::de::{epoch, nullable};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A workspace (team) of the enterprise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    /// Team id, `T…`
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    /// Display name
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    /// Subdomain used in permalinks
    #[serde(default, deserialize_with = "nullable")]
    pub domain: String,
    /// Allowed sign-up email domain
    #[serde(default, deserialize_with = "nullable")]
    pub email_domain: String,
    /// Verified organization
    #[serde(default, deserialize_with = "nullable")]
    pub is_verified: bool,
    /// Archived workspace
    #[serde(default, deserialize_with = "nullable")]
    pub archived: bool,
    /// Deleted workspace
    #[serde(default, deserialize_with = "nullable")]
    pub deleted: bool,
    /// Discoverability setting, a flag or a policy name depending on the team
    #[serde(default)]
    pub discoverable: Value,
    /// Owning enterprise id
    #[serde(default, deserialize_with = "nullable")]
    pub enterprise_id: String,
    /// Owning enterprise domain
    #[serde(default, deserialize_with = "nullable")]
    pub enterprise_domain: String,
    /// Owning enterprise name
    #[serde(default, deserialize_with = "nullable")]
    pub enterprise_name: String,
    /// Creation time, epoch seconds
    #[serde(default, deserialize_with = "epoch")]
    pub created: i64,
    /// Free-form description
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
}

impl Workspace {
    /// Admin URL of the workspace inside its enterprise.
    #[must_use]
    pub fn url(&self) -> String {
        format!(
            "https://{}.enterprise.slack.com/workspace/{}",
            self.enterprise_domain, self.id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_team_record() {
        let workspace: Workspace = serde_json::from_value(json!({
            "id": "T1",
            "name": "Engineering",
            "domain": "eng",
            "enterprise_domain": "acme",
            "created": 1_600_000_000,
            "discoverable": null,
            "icon": { "image_34": "https://example.com/icon.png" }
        }))
        .expect("parse workspace");

        assert_eq!(workspace.domain, "eng");
        assert!(workspace.discoverable.is_null());
        assert_eq!(workspace.url(), "https://acme.enterprise.slack.com/workspace/T1");
    }
}
