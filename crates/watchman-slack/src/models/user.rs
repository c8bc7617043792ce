use super::de::{epoch, nullable};
use super::workspace::Workspace;
use serde::{Deserialize, Serialize};

/// The `profile` object of a user record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserProfile {
    /// Job title
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    /// Phone number
    #[serde(default, deserialize_with = "nullable")]
    pub phone: String,
    /// Skype handle
    #[serde(default, deserialize_with = "nullable")]
    pub skype: String,
    /// Display name
    #[serde(default, deserialize_with = "nullable")]
    pub display_name: String,
    /// First name
    #[serde(default, deserialize_with = "nullable")]
    pub first_name: String,
    /// Last name
    #[serde(default, deserialize_with = "nullable")]
    pub last_name: String,
    /// Email address
    #[serde(default, deserialize_with = "nullable")]
    pub email: String,
    /// App id for app users
    #[serde(default, deserialize_with = "nullable")]
    pub api_app_id: String,
    /// Bot id for bot users
    #[serde(default, deserialize_with = "nullable")]
    pub bot_id: String,
    /// Bot is always shown active
    #[serde(default, deserialize_with = "nullable")]
    pub always_active: bool,
}

/// A user record as returned by `discovery.users.list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawUser {
    /// User id
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    /// Handle
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    /// Deactivated
    #[serde(default, deserialize_with = "nullable")]
    pub deleted: bool,
    /// Full name
    #[serde(default, deserialize_with = "nullable")]
    pub real_name: String,
    /// Time zone name
    #[serde(default, deserialize_with = "nullable")]
    pub tz: String,
    /// Time zone label
    #[serde(default, deserialize_with = "nullable")]
    pub tz_label: String,
    /// Offset from UTC in seconds
    #[serde(default, deserialize_with = "nullable")]
    pub tz_offset: i64,
    /// Workspace admin
    #[serde(default, deserialize_with = "nullable")]
    pub is_admin: bool,
    /// Workspace owner
    #[serde(default, deserialize_with = "nullable")]
    pub is_owner: bool,
    /// Primary owner
    #[serde(default, deserialize_with = "nullable")]
    pub is_primary_owner: bool,
    /// Multi-channel guest
    #[serde(default, deserialize_with = "nullable")]
    pub is_restricted: bool,
    /// Single-channel guest
    #[serde(default, deserialize_with = "nullable")]
    pub is_ultra_restricted: bool,
    /// Bot account
    #[serde(default, deserialize_with = "nullable")]
    pub is_bot: bool,
    /// App user
    #[serde(default, deserialize_with = "nullable")]
    pub is_app_user: bool,
    /// Email confirmed
    #[serde(default, deserialize_with = "nullable")]
    pub is_email_confirmed: bool,
    /// Last profile update, epoch seconds
    #[serde(default, deserialize_with = "epoch")]
    pub updated: i64,
    /// Profile details
    #[serde(default, deserialize_with = "nullable")]
    pub profile: UserProfile,
    /// Ids of the workspaces the user belongs to
    #[serde(default, deserialize_with = "nullable")]
    pub teams: Vec<String>,
}

/// A user of the enterprise with resolved workspaces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct User {
    /// User id
    pub id: String,
    /// Handle
    pub name: String,
    /// Full name
    pub real_name: String,
    /// Display name
    pub display_name: String,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Email address
    pub email: String,
    /// Job title
    pub title: String,
    /// Phone number
    pub phone: String,
    /// Skype handle
    pub skype: String,
    /// Deactivated
    pub deleted: bool,
    /// Time zone name
    pub tz: String,
    /// Time zone label
    pub tz_label: String,
    /// Offset from UTC in seconds
    pub tz_offset: i64,
    /// Workspace admin
    pub is_admin: bool,
    /// Workspace owner
    pub is_owner: bool,
    /// Primary owner
    pub is_primary_owner: bool,
    /// Multi-channel guest
    pub is_restricted: bool,
    /// Single-channel guest
    pub is_ultra_restricted: bool,
    /// Bot account
    pub is_bot: bool,
    /// App user
    pub is_app_user: bool,
    /// Bot id for bot users
    pub bot_id: String,
    /// App id for app users
    pub api_app_id: String,
    /// Email confirmed
    pub is_email_confirmed: bool,
    /// Last profile update, epoch seconds
    pub updated: i64,
    /// Workspaces the user belongs to
    pub workspaces: Vec<Workspace>,
}

impl User {
    /// Build a user, resolving its `teams` against the known workspaces.
    ///
    /// Team ids with no matching workspace are dropped.
    #[must_use]
    pub fn from_raw(raw: RawUser, workspaces: &[Workspace]) -> Self {
        let member_of = workspaces
            .iter()
            .filter(|workspace| raw.teams.contains(&workspace.id))
            .cloned()
            .collect();

        let RawUser {
            id,
            name,
            deleted,
            real_name,
            tz,
            tz_label,
            tz_offset,
            is_admin,
            is_owner,
            is_primary_owner,
            is_restricted,
            is_ultra_restricted,
            is_bot,
            is_app_user,
            is_email_confirmed,
            updated,
            profile,
            teams: _,
        } = raw;

        Self {
            id,
            name,
            real_name,
            display_name: profile.display_name,
            first_name: profile.first_name,
            last_name: profile.last_name,
            email: profile.email,
            title: profile.title,
            phone: profile.phone,
            skype: profile.skype,
            deleted,
            tz,
            tz_label,
            tz_offset,
            is_admin,
            is_owner,
            is_primary_owner,
            is_restricted,
            is_ultra_restricted,
            is_bot,
            is_app_user,
            bot_id: profile.bot_id,
            api_app_id: profile.api_app_id,
            is_email_confirmed,
            updated,
            workspaces: member_of,
        }
    }

    /// Copy of the user without its workspace list, as attached to results.
    #[must_use]
    pub fn without_workspaces(&self) -> Self {
        Self {
            workspaces: Vec::new(),
            ..self.clone()
        }
    }
}
