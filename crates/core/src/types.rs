use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::ops::Deref;

const GUEST_MARKER: &str = "#EXT#";
const EMAIL_SIGN_IN_TYPE: &str = "emailAddress";

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Deref for $name {
            type Target = str;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// Opaque directory identifier of a group
    GroupId
);

string_id!(
    /// Opaque directory identifier of a user
    UserId
);

/// A catalog entry: a directory group reduced to its id and display name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

impl Group {
    pub fn new(id: impl Into<GroupId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Group as returned by the directory service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryGroup {
    pub id: GroupId,
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub mail: Option<String>,
}

impl From<DirectoryGroup> for Group {
    fn from(group: DirectoryGroup) -> Self {
        Self {
            id: group.id,
            name: group.display_name,
        }
    }
}

/// Sign-in identity attached to a directory user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub sign_in_type: String,
    #[serde(default)]
    pub issuer: Option<String>,
    pub issuer_assigned_id: Option<String>,
}

/// User as returned by the directory service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: UserId,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub mail: Option<String>,
    #[serde(default)]
    pub user_principal_name: String,
    #[serde(default)]
    pub other_mails: Option<Vec<String>>,
    #[serde(default)]
    pub identities: Option<Vec<UserIdentity>>,
    #[serde(default)]
    pub account_enabled: Option<bool>,
    #[serde(default)]
    pub member_of: Vec<DirectoryGroup>,
}

impl DirectoryUser {
    /// A user with no profile fields and no memberships
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            given_name: None,
            surname: None,
            display_name: None,
            mail: None,
            user_principal_name: String::new(),
            other_mails: None,
            identities: None,
            account_enabled: None,
            member_of: Vec::new(),
        }
    }

    /// Display names of every group the user belongs to
    #[must_use]
    pub fn group_names(&self) -> Vec<String> {
        self.member_of
            .iter()
            .map(|group| group.display_name.clone())
            .collect()
    }

    /// Resolve the user's email address.
    ///
    /// Guest principals carry their home address escaped into the
    /// principal name (`jane_example.com#EXT#@tenant`), so when neither
    /// `mail` nor `other_mails` is set the address is recovered from it.
    #[must_use]
    pub fn resolved_email(&self) -> Option<String> {
        if let Some(mail) = &self.mail {
            return Some(mail.clone());
        }

        if self.user_principal_name.contains(GUEST_MARKER) {
            if let Some(first) = self.other_mails.as_ref().and_then(|m| m.first()) {
                return Some(first.clone());
            }
            let escaped = self
                .user_principal_name
                .split(GUEST_MARKER)
                .next()
                .unwrap_or_default();
            return Some(match escaped.rsplit_once('_') {
                Some((local, domain)) => format!("{local}@{domain}"),
                None => escaped.to_string(),
            });
        }

        self.identities.as_ref().and_then(|identities| {
            identities
                .iter()
                .find(|identity| identity.sign_in_type == EMAIL_SIGN_IN_TYPE)
                .and_then(|identity| identity.issuer_assigned_id.clone())
        })
    }
}

/// Partial update of a directory user's profile. Unset fields are left
/// as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
}

impl UserUpdate {
    /// Update that only switches sign-in on or off
    #[must_use]
    pub fn enabled(enabled: bool) -> Self {
        Self {
            account_enabled: Some(enabled),
            ..Self::default()
        }
    }
}
