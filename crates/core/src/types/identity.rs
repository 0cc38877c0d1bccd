//! Session identity.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// The context a cart is scoped to.
///
/// Anonymous carts live in device-local storage; authenticated carts live in the
/// remote store keyed by user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "user_id", rename_all = "snake_case")]
pub enum Identity {
    /// No signed-in user.
    #[default]
    Anonymous,
    /// Signed in as the given user.
    Authenticated(UserId),
}

impl Identity {
    /// Signed-in identity for `user`.
    #[must_use]
    pub fn user(user: impl Into<UserId>) -> Self {
        Self::Authenticated(user.into())
    }

    /// The signed-in user, if any.
    #[must_use]
    pub const fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(user) => Some(user),
        }
    }

    /// Whether this identity is anonymous.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("anonymous"),
            Self::Authenticated(user) => write!(f, "user:{user}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_user_id() {
        assert_eq!(Identity::Anonymous.user_id(), None);
        assert_eq!(
            Identity::user("U1").user_id(),
            Some(&UserId::new("U1"))
        );
    }

    #[test]
    fn test_identity_display() {
        assert_eq!(Identity::Anonymous.to_string(), "anonymous");
        assert_eq!(Identity::user("U1").to_string(), "user:U1");
    }
}
