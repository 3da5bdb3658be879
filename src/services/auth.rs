//! Login for counter staff and members

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult, ErrorCode},
    models::{
        auth::{AdminLoginResponse, Claims, MemberLoginResponse},
        enums::{AdminStatus, MemberStatus, Role},
        member::LoginRequest,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Authenticate counter staff by name and phone
    pub async fn admin_login(&self, login: &LoginRequest) -> AppResult<AdminLoginResponse> {
        let candidates = self.repository.admins.find_by_name(login.name.trim()).await?;
        if candidates.is_empty() {
            return Err(account_not_found());
        }

        let admin = candidates
            .into_iter()
            .find(|a| a.phone == login.phone.trim())
            .ok_or_else(invalid_password)?;

        if admin.status != AdminStatus::Active {
            return Err(AppError::Authorization(
                ErrorCode::AdminInactive,
                "Admin account is not active".to_string(),
            ));
        }

        let lifetime = self.config.admin_token_hours;
        let token = self.issue(Claims::new(Role::Admin, admin.admin_id, &admin.name, lifetime))?;

        tracing::info!(admin_id = admin.admin_id, "Admin logged in");

        Ok(AdminLoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: lifetime * 3600,
            admin,
        })
    }

    /// Authenticate a member by name and phone
    pub async fn member_login(&self, login: &LoginRequest) -> AppResult<MemberLoginResponse> {
        let candidates = self.repository.members.find_by_name(login.name.trim()).await?;
        if candidates.is_empty() {
            return Err(account_not_found());
        }

        let member = candidates
            .into_iter()
            .find(|m| m.member.phone == login.phone.trim())
            .ok_or_else(invalid_password)?;

        if member.member.status != MemberStatus::Active {
            return Err(AppError::Authorization(
                ErrorCode::MemberInactive,
                format!("Member account is {}", member.member.status),
            ));
        }

        let lifetime = self.config.member_token_hours;
        let token = self.issue(Claims::new(
            Role::Member,
            member.member.member_id,
            &member.member.name,
            lifetime,
        ))?;

        Ok(MemberLoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: lifetime * 3600,
            member,
        })
    }

    /// Validate a bearer token
    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        Claims::from_token(token, &self.config.jwt_secret).map_err(|_| {
            AppError::Authentication(
                ErrorCode::Unauthorized,
                "Invalid or expired token".to_string(),
            )
        })
    }

    fn issue(&self, claims: Claims) -> AppResult<String> {
        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }
}

fn account_not_found() -> AppError {
    AppError::Authentication(ErrorCode::AccountNotFound, "Account not found".to_string())
}

fn invalid_password() -> AppError {
    AppError::Authentication(ErrorCode::InvalidPassword, "Name and phone do not match".to_string())
}
