//! Caller context threaded through every catalog action.

use std::borrow::Cow;

/// Who is making a call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Identity {
    /// Neutral identity used when authorization checks are bypassed
    Anonymous,
    User(String),
}

impl Identity {
    pub fn username(&self) -> Option<&str> {
        match self {
            Identity::Anonymous => None,
            Identity::User(name) => Some(name),
        }
    }
}

/// Immutable per-call context
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallerContext {
    pub identity: Option<Identity>,
    pub sysadmin: bool,
    pub ignore_auth: bool,
    /// Decorate show responses with fork sync status and lineage
    pub check_synced: bool,
}

impl Default for CallerContext {
    fn default() -> Self {
        Self {
            identity: None,
            sysadmin: false,
            ignore_auth: false,
            check_synced: true,
        }
    }
}

impl CallerContext {
    pub fn user(username: impl Into<String>) -> Self {
        Self {
            identity: Some(Identity::User(username.into())),
            ..Self::default()
        }
    }

    /// Context used for internal calls that bypass authorization
    pub fn ignoring_auth() -> Self {
        Self {
            ignore_auth: true,
            ..Self::default()
        }
    }

    pub fn with_sysadmin(mut self, sysadmin: bool) -> Self {
        self.sysadmin = sysadmin;
        self
    }

    pub fn with_check_synced(mut self, check_synced: bool) -> Self {
        self.check_synced = check_synced;
        self
    }

    pub fn username(&self) -> Option<&str> {
        self.identity.as_ref().and_then(Identity::username)
    }

    /// Whether private objects are readable regardless of ownership
    pub fn bypasses_auth(&self) -> bool {
        self.ignore_auth || self.sysadmin
    }

    /// Historical lookups require an identity. A context that bypasses
    /// authorization but carries none gets an anonymous identity on a copy.
    pub fn for_history_lookup(&self) -> Cow<'_, CallerContext> {
        if self.identity.is_none() && self.ignore_auth {
            Cow::Owned(Self {
                identity: Some(Identity::Anonymous),
                ..self.clone()
            })
        } else {
            Cow::Borrowed(self)
        }
    }
}
