//! Reservation endpoints for members and the counter

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        loan::CheckoutResult,
        reservation::{
            CreateReservationRequest, CreatedReservation, FulfillReservationRequest, Reservation,
            ReservationDetail, ReservationListQuery,
        },
    },
    AppState,
};

use super::AuthenticatedUser;

/// Reserve books; one available copy of each is held for pickup
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    request_body = CreateReservationRequest,
    responses(
        (status = 201, description = "Reservation created", body = CreatedReservation),
        (status = 400, description = "Duplicate ids, too many books, balance too low or no copy available", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Book already reserved by the member", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_reservation(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateReservationRequest>,
) -> AppResult<(StatusCode, Json<CreatedReservation>)> {
    let member_id = claims.require_member()?;
    let reservation = state.services.reservations.create(member_id, request).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Reservations of the logged in member
#[utoipa::path(
    get,
    path = "/member/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Reservations with their books", body = Vec<ReservationDetail>)
    )
)]
pub async fn my_reservations(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<ReservationDetail>>> {
    let member_id = claims.require_member()?;
    let reservations = state.services.reservations.list_for_member(member_id).await?;
    Ok(Json(reservations))
}

#[utoipa::path(
    delete,
    path = "/member/reservations/{id}",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation cancelled", body = Reservation),
        (status = 400, description = "Not an own active reservation", body = crate::error::ErrorResponse),
        (status = 404, description = "Reservation not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn cancel_reservation(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(reservation_id): Path<i64>,
) -> AppResult<Json<Reservation>> {
    let member_id = claims.require_member()?;
    let reservation = state
        .services
        .reservations
        .cancel(member_id, reservation_id)
        .await?;
    Ok(Json(reservation))
}

/// Counter listing of reservations
#[utoipa::path(
    get,
    path = "/admin/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(ReservationListQuery),
    responses(
        (status = 200, description = "Matching reservations", body = Vec<ReservationDetail>)
    )
)]
pub async fn list_reservations(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ReservationListQuery>,
) -> AppResult<Json<Vec<ReservationDetail>>> {
    claims.require_admin()?;
    let reservations = state.services.reservations.search(&query).await?;
    Ok(Json(reservations))
}

/// Lend the reserved books and close the reservation
#[utoipa::path(
    post,
    path = "/admin/reservations/{id}/fulfill",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Reservation ID")),
    request_body(content = FulfillReservationRequest, description = "Copies to lend; an empty body lends the held copies"),
    responses(
        (status = 200, description = "Reservation fulfilled", body = CheckoutResult),
        (status = 400, description = "Malformed body, reservation not active or item mismatch", body = crate::error::ErrorResponse),
        (status = 404, description = "Reservation not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn fulfill_reservation(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(reservation_id): Path<i64>,
    body: Bytes,
) -> AppResult<Json<CheckoutResult>> {
    let admin_id = claims.require_admin()?;
    let items = FulfillReservationRequest::from_body(&body)?.items;
    let result = state
        .services
        .reservations
        .fulfill(admin_id, reservation_id, items)
        .await?;
    Ok(Json(result))
}
