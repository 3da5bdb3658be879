//! Access token claims

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{
    enums::Role,
    member::{Admin, MemberWithLevel},
};
use crate::error::{AppError, ErrorCode};

/// JWT claims for both counter staff and members
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    /// `admin_id` or `member_id`, depending on the role
    pub account_id: i64,
    pub name: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(role: Role, account_id: i64, name: &str, lifetime_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            sub: format!("{}:{}", serde_plain_role(role), account_id),
            role,
            account_id,
            name: name.to_string(),
            exp: (now + Duration::hours(lifetime_hours)).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Admin id of a counter staff token
    pub fn require_admin(&self) -> Result<i64, AppError> {
        match self.role {
            Role::Admin => Ok(self.account_id),
            Role::Member => Err(AppError::Authorization(
                ErrorCode::Forbidden,
                "Counter staff access required".to_string(),
            )),
        }
    }

    /// Member id of a member token
    pub fn require_member(&self) -> Result<i64, AppError> {
        match self.role {
            Role::Member => Ok(self.account_id),
            Role::Admin => Err(AppError::Authorization(
                ErrorCode::Forbidden,
                "Member access required".to_string(),
            )),
        }
    }
}

fn serde_plain_role(role: Role) -> &'static str {
    match role {
        Role::Admin => "admin",
        Role::Member => "member",
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminLoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub admin: Admin,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MemberLoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub member: MemberWithLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_token_round_trip() {
        let claims = Claims::new(Role::Member, 42, "Lin", 1);
        let token = claims.create_token(SECRET).unwrap();
        let decoded = Claims::from_token(&token, SECRET).unwrap();

        assert_eq!(decoded.role, Role::Member);
        assert_eq!(decoded.account_id, 42);
        assert_eq!(decoded.sub, "member:42");
        assert_eq!(decoded.require_member().unwrap(), 42);
        assert!(decoded.require_admin().is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = Claims::new(Role::Admin, 1, "admin", 8)
            .create_token(SECRET)
            .unwrap();
        assert!(Claims::from_token(&token, "other-secret").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        // Beyond the default 60s leeway
        let token = Claims::new(Role::Admin, 1, "admin", -1)
            .create_token(SECRET)
            .unwrap();
        assert!(Claims::from_token(&token, SECRET).is_err());
    }

    #[test]
    fn test_admin_claims() {
        let claims = Claims::new(Role::Admin, 7, "desk", 8);
        assert_eq!(claims.require_admin().unwrap(), 7);
        let err = claims.require_member().unwrap_err();
        assert!(matches!(err, AppError::Authorization(ErrorCode::Forbidden, _)));
    }
}
