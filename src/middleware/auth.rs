// Authenticated caller identity extracted from a session token

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Caller role. Admin-only operations check this before touching the store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Authenticated user information extracted from the session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub exp: u64,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Owner-or-admin check used by resource handlers
    pub fn can_access(&self, owner_id: Uuid) -> bool {
        self.is_admin() || self.user_id == owner_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_owner_or_admin_access() {
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let user = AuthenticatedUser {
            user_id: owner,
            email: "a@b.c".into(),
            role: Role::User,
            exp: 0,
        };
        assert!(user.can_access(owner));
        assert!(!user.can_access(other));

        let admin = AuthenticatedUser {
            user_id: other,
            email: "admin@b.c".into(),
            role: Role::Admin,
            exp: 0,
        };
        assert!(admin.can_access(owner));
    }
}
