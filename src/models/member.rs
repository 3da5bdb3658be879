//! Member, membership level and counter staff models

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::{AdminStatus, MemberStatus};

/// Digits with optional `+`, spaces, dashes or parentheses
pub static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 ()\-]{5,19}$").expect("valid phone regex"));

/// Membership level terms
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MembershipLevel {
    pub level_id: i64,
    pub level_name: String,
    /// Multiplier applied to copy rental prices (0.9 = 10% off)
    pub discount_rate: Decimal,
    pub min_balance_required: Decimal,
    pub max_book_allowed: i32,
    pub hold_days: Option<i32>,
}

impl MembershipLevel {
    pub fn hold_days_or(&self, default: i32) -> i32 {
        self.hold_days.unwrap_or(default)
    }
}

/// Member row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Member {
    pub member_id: i64,
    pub name: String,
    pub level_id: i64,
    /// Counter staff who registered the member
    pub admin_id: Option<i64>,
    pub join_date: NaiveDate,
    pub email: Option<String>,
    pub phone: String,
    pub balance: Decimal,
    pub status: MemberStatus,
}

/// Member joined with its level terms
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct MemberWithLevel {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub member: Member,
    pub level_name: String,
    pub discount_rate: Decimal,
    pub min_balance_required: Decimal,
    pub max_book_allowed: i32,
    pub hold_days: Option<i32>,
}

impl MemberWithLevel {
    pub fn level(&self) -> MembershipLevel {
        MembershipLevel {
            level_id: self.member.level_id,
            level_name: self.level_name.clone(),
            discount_rate: self.discount_rate,
            min_balance_required: self.min_balance_required,
            max_book_allowed: self.max_book_allowed,
            hold_days: self.hold_days,
        }
    }
}

/// Counter staff account
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Admin {
    pub admin_id: i64,
    pub name: String,
    #[serde(skip_serializing)]
    pub phone: String,
    pub role: String,
    pub status: AdminStatus,
}

/// Balance credit recorded at the counter
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct TopUp {
    pub top_up_id: i64,
    pub member_id: i64,
    pub admin_id: Option<i64>,
    pub admin_name: Option<String>,
    pub amount: Decimal,
    pub top_up_date: DateTime<Utc>,
}

/// Member profile as seen by the member
#[derive(Debug, Serialize, ToSchema)]
pub struct MemberProfile {
    #[serde(flatten)]
    pub member: MemberWithLevel,
    pub active_loans: i64,
}

/// Member detail as seen at the counter
#[derive(Debug, Serialize, ToSchema)]
pub struct MemberDetail {
    #[serde(flatten)]
    pub member: MemberWithLevel,
    pub top_ups: Vec<TopUp>,
}

/// One loan of a member, summarised
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct MemberLoanSummary {
    pub loan_id: i64,
    pub admin_id: i64,
    pub final_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub item_count: i64,
    pub active_count: i64,
}

/// Login with name and phone number
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 30, message = "Phone is required"))]
    pub phone: String,
}

/// Register a member at the counter
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMemberRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(regex(path = *PHONE_RE, message = "Invalid phone number"))]
    pub phone: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    /// Opening balance, also used to pick the membership level
    #[serde(alias = "initialBalance")]
    pub initial_balance: Option<Decimal>,
}

/// Signed balance adjustment
#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustBalanceRequest {
    pub amount: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateMemberStatusRequest {
    pub status: MemberStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TopUpRequest {
    pub amount: Decimal,
}

/// Result of a top-up
#[derive(Debug, Serialize, ToSchema)]
pub struct TopUpResponse {
    pub top_up: TopUp,
    pub balance: Decimal,
    pub level_id: i64,
    pub level_name: String,
    pub level_upgraded: bool,
}

/// Counter member search
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MemberSearchQuery {
    pub member_id: Option<i64>,
    /// Case-insensitive substring of the member name
    pub name: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_pattern() {
        assert!(PHONE_RE.is_match("0912345678"));
        assert!(PHONE_RE.is_match("+886 912-345-678"));
        assert!(!PHONE_RE.is_match("12"));
        assert!(!PHONE_RE.is_match("phone"));
    }

    #[test]
    fn test_create_member_validation() {
        let request = CreateMemberRequest {
            name: "Lin".into(),
            phone: "0912345678".into(),
            email: Some("lin@example.com".into()),
            initial_balance: None,
        };
        assert!(request.validate().is_ok());

        let request = CreateMemberRequest {
            name: String::new(),
            phone: "x".into(),
            email: Some("not-an-email".into()),
            initial_balance: None,
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("phone"));
        assert!(fields.contains_key("email"));
    }

    #[test]
    fn test_create_member_accepts_camel_case_balance() {
        let request: CreateMemberRequest = serde_json::from_str(
            r#"{"name":"Lin","phone":"0912345678","initialBalance":5000}"#,
        )
        .unwrap();
        assert_eq!(request.initial_balance, Some(Decimal::from(5000)));
    }

    #[test]
    fn test_hold_days_fallback() {
        let level = MembershipLevel {
            level_id: 1,
            level_name: "Bronze".into(),
            discount_rate: Decimal::ONE,
            min_balance_required: Decimal::ZERO,
            max_book_allowed: 3,
            hold_days: None,
        };
        assert_eq!(level.hold_days_or(7), 7);
    }

    #[test]
    fn test_admin_phone_not_serialized() {
        let admin = Admin {
            admin_id: 1,
            name: "admin".into(),
            phone: "0900000000".into(),
            role: "Manager".into(),
            status: AdminStatus::Active,
        };
        let json = serde_json::to_value(&admin).unwrap();
        assert!(json.get("phone").is_none());
        assert_eq!(json["status"], "Active");
    }
}
