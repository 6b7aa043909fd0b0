//! Caller identity and capability checks
//!
//! Tokens are minted by the upstream identity service; this service only
//! decodes them and applies the role policy.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Caller roles carried in the token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
}

/// Operations gated by the role policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ManageBooks,
    ManageCategories,
    ManageBorrowings,
    ViewAllBorrowings,
    ViewOwnBorrowings,
}

impl Action {
    fn describe(&self) -> &'static str {
        match self {
            Action::ManageBooks => "manage books",
            Action::ManageCategories => "manage categories",
            Action::ManageBorrowings => "manage borrowings",
            Action::ViewAllBorrowings => "view all borrowings",
            Action::ViewOwnBorrowings => "view own borrowings",
        }
    }
}

impl Role {
    /// Single policy predicate over identity and operation
    pub fn allows(&self, action: Action) -> bool {
        match self {
            Role::Admin => true,
            Role::Student => matches!(action, Action::ViewOwnBorrowings),
        }
    }
}

/// JWT claims decoded from the Authorization header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub id: i32,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Parse and verify a bearer token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Check the role policy for an operation, failing with 403 when denied
    pub fn authorize(&self, action: Action) -> Result<(), AppError> {
        if self.role.allows(action) {
            Ok(())
        } else {
            Err(AppError::Authorization(format!(
                "Insufficient rights to {}",
                action.describe()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_is_allowed_everything() {
        for action in [
            Action::ManageBooks,
            Action::ManageCategories,
            Action::ManageBorrowings,
            Action::ViewAllBorrowings,
            Action::ViewOwnBorrowings,
        ] {
            assert!(Role::Admin.allows(action));
        }
    }

    #[test]
    fn student_is_limited_to_own_borrowings() {
        assert!(Role::Student.allows(Action::ViewOwnBorrowings));
        assert!(!Role::Student.allows(Action::ManageBooks));
        assert!(!Role::Student.allows(Action::ManageCategories));
        assert!(!Role::Student.allows(Action::ManageBorrowings));
        assert!(!Role::Student.allows(Action::ViewAllBorrowings));
    }
}
