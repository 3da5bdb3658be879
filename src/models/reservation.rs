//! Reservation models

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{enums::ReservationStatus, loan::CopyRef};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Reservation {
    pub reservation_id: i64,
    pub member_id: i64,
    pub reserve_date: NaiveDate,
    pub pickup_date: Option<NaiveDate>,
    pub status: ReservationStatus,
}

/// Book held by a reservation, with the copy set aside for it
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ReservedBook {
    pub reservation_id: i64,
    pub book_id: i64,
    pub copies_serial: Option<i32>,
    pub book_name: String,
    pub author: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReservationDetail {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub member_name: Option<String>,
    pub books: Vec<ReservedBook>,
}

/// Reservation row joined with the member name
#[derive(Debug, Clone, FromRow)]
pub struct ReservationRow {
    #[sqlx(flatten)]
    pub reservation: Reservation,
    pub member_name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReservationRequest {
    #[validate(length(min = 1, max = 20, message = "At least one book is required"))]
    pub book_ids: Vec<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedReservation {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub books: Vec<ReservedBook>,
    /// Expected cost at pickup, checked against the balance
    pub estimated_cost: Decimal,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReservationListQuery {
    pub status: Option<ReservationStatus>,
    pub member_id: Option<i64>,
    /// Case-insensitive substring of a reserved book title
    pub book_name: Option<String>,
}

/// Fulfil a reservation at the counter
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct FulfillReservationRequest {
    /// Copies to lend; defaults to the copies held for the reservation
    pub items: Option<Vec<CopyRef>>,
}

impl FulfillReservationRequest {
    /// Parse an optional JSON body; only an empty body falls back to the held copies
    pub fn from_body(body: &[u8]) -> AppResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))
    }
}

/// Duplicate ids in a request, in first-seen order
pub fn duplicate_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    let mut duplicates = Vec::new();
    for id in ids {
        if !seen.insert(*id) && !duplicates.contains(id) {
            duplicates.push(*id);
        }
    }
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_ids() {
        assert!(duplicate_ids(&[1, 2, 3]).is_empty());
        assert_eq!(duplicate_ids(&[4, 1, 4, 2, 1, 4]), vec![4, 1]);
    }

    #[test]
    fn test_create_reservation_needs_books() {
        let request = CreateReservationRequest { book_ids: vec![] };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_fulfill_request_items_optional() {
        let request: FulfillReservationRequest = serde_json::from_str("{}").unwrap();
        assert!(request.items.is_none());
    }

    #[test]
    fn test_fulfill_empty_body_uses_held_copies() {
        assert!(FulfillReservationRequest::from_body(b"").unwrap().items.is_none());
        assert!(FulfillReservationRequest::from_body(b" \n").unwrap().items.is_none());
    }

    #[test]
    fn test_fulfill_malformed_body_rejected() {
        let truncated = br#"{"items": [{"book_id": 1, "copies_serial": "#;
        assert!(matches!(
            FulfillReservationRequest::from_body(truncated),
            Err(AppError::BadRequest(_))
        ));

        let wrong_shape = br#"{"items": {"book_id": 1}}"#;
        assert!(FulfillReservationRequest::from_body(wrong_shape).is_err());
    }

    #[test]
    fn test_fulfill_body_with_items() {
        let body = br#"{"items": [{"book_id": 3, "copies_serial": 2}]}"#;
        let items = FulfillReservationRequest::from_body(body).unwrap().items.unwrap();
        assert_eq!(items, vec![CopyRef { book_id: 3, copies_serial: 2 }]);
    }
}
