//! Loan (borrow) models, counter requests and results

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::{BookCondition, CopyStatus, FeeKind};
use crate::pricing::FineBreakdown;

/// Loan header: one counter transaction
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct BookLoan {
    pub loan_id: i64,
    pub admin_id: i64,
    pub member_id: i64,
    /// Sum of the rental fees charged at checkout
    pub final_price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Loan line item for one copy
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct LoanRecord {
    pub loan_id: i64,
    pub book_id: i64,
    pub copies_serial: i32,
    pub date_out: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub rental_fee: Decimal,
    pub renew_cnt: i32,
}

impl LoanRecord {
    pub fn is_returned(&self) -> bool {
        self.return_date.is_some()
    }
}

/// Loan record locked for return or renewal, with the data the rules need
#[derive(Debug, Clone, FromRow)]
pub struct LockedLoanRecord {
    #[sqlx(flatten)]
    pub record: LoanRecord,
    pub member_id: i64,
    pub original_condition: BookCondition,
    pub purchase_price: Decimal,
    pub book_price: Decimal,
    pub today: NaiveDate,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct FeeType {
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub fee_type: String,
    pub base_amount: Option<Decimal>,
    pub rate: Option<Decimal>,
    pub description: Option<String>,
}

/// Additional fee attached to a loan item
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct AddFee {
    pub add_fee_id: i64,
    pub loan_id: i64,
    pub book_id: i64,
    pub copies_serial: i32,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: FeeKind,
    pub amount: Decimal,
    pub date: NaiveDate,
}

/// Loan item joined with book and copy data
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct LoanItemView {
    pub loan_id: i64,
    pub book_id: i64,
    pub copies_serial: i32,
    pub book_name: String,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub book_condition: BookCondition,
    pub purchase_price: Decimal,
    pub date_out: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub rental_fee: Decimal,
    pub renew_cnt: i32,
    /// Sum of additional fees recorded for this item
    pub add_fee_total: Decimal,
}

/// Loan item with its additional fees
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoanItemWithFees {
    #[serde(flatten)]
    pub item: LoanItemView,
    pub add_fees: Vec<AddFee>,
}

/// Loan with its unreturned items, for the return desk
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OpenLoan {
    pub loan_id: i64,
    pub member_id: i64,
    pub member_name: String,
    pub loan_date: NaiveDate,
    pub max_due_date: NaiveDate,
    pub records: Vec<LoanItemView>,
}

/// Identifies one copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct CopyRef {
    pub book_id: i64,
    pub copies_serial: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    pub member_id: i64,
    #[validate(length(min = 1, max = 50, message = "At least one item is required"))]
    pub items: Vec<CopyRef>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckedOutItem {
    pub book_id: i64,
    pub copies_serial: i32,
    pub book_condition: BookCondition,
    pub rental_price: Decimal,
    pub rental_fee: Decimal,
    pub date_out: NaiveDate,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutResult {
    pub loan_id: i64,
    pub member_id: i64,
    pub final_price: Decimal,
    pub balance_after: Decimal,
    pub items: Vec<CheckedOutItem>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BorrowPreviewQuery {
    pub member_id: i64,
    pub book_id: i64,
    pub copies_serial: i32,
}

/// What a checkout of one copy would cost
#[derive(Debug, Serialize, ToSchema)]
pub struct BorrowPreview {
    pub member_id: i64,
    pub member_name: String,
    pub level_name: String,
    pub discount_rate: Decimal,
    pub balance: Decimal,
    pub active_loans: i64,
    pub max_book_allowed: i32,
    pub book_id: i64,
    pub copies_serial: i32,
    pub book_name: String,
    pub book_condition: BookCondition,
    pub rental_price: Decimal,
    pub rental_fee: Decimal,
    pub due_date: NaiveDate,
}

/// Return options for one copy
#[derive(Debug, Default, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReturnOptions {
    /// Condition at return; absent means unchanged
    pub final_condition: Option<BookCondition>,
    #[serde(default)]
    pub lost: bool,
    /// Debit the fees from the member balance right away
    #[serde(default, alias = "immediateCharge")]
    pub immediate_charge: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReturnResult {
    pub loan_id: i64,
    pub book_id: i64,
    pub copies_serial: i32,
    pub return_date: NaiveDate,
    pub overdue_days: i64,
    pub copy_status: CopyStatus,
    pub book_condition: BookCondition,
    pub fees: Vec<AddFee>,
    pub total_add_fee: Decimal,
    /// Amount actually debited from the balance
    pub charged_amount: Decimal,
    pub balance_after: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchReturnItem {
    pub loan_id: i64,
    pub book_id: i64,
    pub copies_serial: i32,
    #[serde(flatten)]
    pub options: ReturnOptions,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BatchReturnRequest {
    #[validate(length(min = 1, max = 100, message = "At least one item is required"))]
    pub items: Vec<BatchReturnItem>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BatchItemError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BatchReturnOutcome {
    pub loan_id: i64,
    pub book_id: i64,
    pub copies_serial: i32,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ReturnResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<BatchItemError>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchReturnResponse {
    pub results: Vec<BatchReturnOutcome>,
    pub success_count: usize,
    pub fail_count: usize,
}

/// One item of a fine estimate
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FineItem {
    pub loan_id: Option<i64>,
    pub book_id: Option<i64>,
    pub copies_serial: Option<i32>,
    pub due_date: Option<NaiveDate>,
    pub purchase_price: Decimal,
    pub original_condition: BookCondition,
    pub final_condition: Option<BookCondition>,
    #[serde(default)]
    pub lost: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct FineCalculationRequest {
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<FineItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FineEstimate {
    pub loan_id: Option<i64>,
    pub book_id: Option<i64>,
    pub copies_serial: Option<i32>,
    pub fine_breakdown: FineBreakdown,
    pub overdue_days: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FineCalculationResponse {
    pub today: NaiveDate,
    pub items: Vec<FineEstimate>,
    pub total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RenewResult {
    pub loan_id: i64,
    pub book_id: i64,
    pub copies_serial: i32,
    pub due_date: NaiveDate,
    pub renew_cnt: i32,
    pub renewal_fee: Decimal,
    pub balance_after: Decimal,
}

/// Return desk search mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanSearchType {
    LoanId,
    MemberId,
}

impl LoanSearchType {
    pub fn parse(value: Option<&str>) -> Option<Self> {
        match value? {
            "loan_id" => Some(LoanSearchType::LoanId),
            "member_id" => Some(LoanSearchType::MemberId),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoanSearchQuery {
    /// `loan_id` or `member_id`
    #[serde(rename = "type")]
    pub search_type: Option<String>,
    pub loan_id: Option<i64>,
    pub member_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_options_default_flags() {
        let options: ReturnOptions = serde_json::from_str(r#"{"final_condition":"Fair"}"#).unwrap();
        assert_eq!(options.final_condition, Some(BookCondition::Fair));
        assert!(!options.lost);
        assert!(!options.immediate_charge);
    }

    #[test]
    fn test_batch_item_flattens_options() {
        let item: BatchReturnItem = serde_json::from_str(
            r#"{"loan_id":4,"book_id":2,"copies_serial":1,"lost":true,"immediate_charge":true}"#,
        )
        .unwrap();
        assert_eq!(item.loan_id, 4);
        assert!(item.options.lost);
        assert!(item.options.immediate_charge);
        assert_eq!(item.options.final_condition, None);
    }

    #[test]
    fn test_return_options_accept_camel_case_charge() {
        let options: ReturnOptions = serde_json::from_str(r#"{"immediateCharge":true}"#).unwrap();
        assert!(options.immediate_charge);
    }

    #[test]
    fn test_batch_and_fine_requests_validate_item_count() {
        let batch = BatchReturnRequest { items: vec![] };
        assert!(batch.validate().is_err());

        let batch: BatchReturnRequest = serde_json::from_str(
            r#"{"items":[{"loan_id":1,"book_id":2,"copies_serial":1}]}"#,
        )
        .unwrap();
        assert!(batch.validate().is_ok());

        let fines = FineCalculationRequest { items: vec![] };
        assert!(fines.validate().is_err());
    }

    #[test]
    fn test_checkout_requires_items() {
        let request = CheckoutRequest {
            member_id: 1,
            items: vec![],
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_loan_search_type_parse() {
        assert_eq!(LoanSearchType::parse(Some("loan_id")), Some(LoanSearchType::LoanId));
        assert_eq!(LoanSearchType::parse(Some("member_id")), Some(LoanSearchType::MemberId));
        assert_eq!(LoanSearchType::parse(Some("book_id")), None);
        assert_eq!(LoanSearchType::parse(None), None);
    }

    #[test]
    fn test_fee_type_uses_type_key() {
        let fee = FeeType {
            fee_type: "overdue".into(),
            base_amount: Some(Decimal::from(10)),
            rate: None,
            description: None,
        };
        let json = serde_json::to_value(&fee).unwrap();
        assert_eq!(json["type"], "overdue");
    }
}
