//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    api::{auth, books, health, loans, member, members, reservations, search_history, stats},
    models::{
        book, enums, loan, member as member_models, pagination, reservation,
        search_history as history,
    },
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Book Rental API",
        version = "1.0.0",
        description = "Counter and member REST API of a book rental shop",
        license(name = "MIT")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::admin_login,
        auth::member_login,
        // Members
        members::create_member,
        members::search_members,
        members::get_member,
        members::adjust_balance,
        members::update_status,
        members::top_up,
        members::member_loans,
        // Member self-service
        member::profile,
        member::active_loans,
        member::loan_history,
        member::renew,
        // Books
        books::search_books,
        books::get_book,
        books::list_categories,
        books::list_inventory,
        books::create_book,
        books::admin_search,
        books::update_book,
        books::delete_book,
        books::set_book_categories,
        books::add_copy,
        books::update_copy,
        books::create_category,
        books::rename_category,
        books::list_fee_types,
        // Loans
        loans::borrow_preview,
        loans::checkout,
        loans::return_item,
        loans::batch_return,
        loans::calculate_fines,
        loans::renew_item,
        loans::search_loans,
        loans::loan_records,
        // Reservations
        reservations::create_reservation,
        reservations::my_reservations,
        reservations::cancel_reservation,
        reservations::list_reservations,
        reservations::fulfill_reservation,
        // Stats
        stats::top_books,
        stats::top_categories,
        // Search history
        search_history::member_history,
        search_history::analytics,
    ),
    components(
        schemas(
            // Enums
            enums::MemberStatus,
            enums::AdminStatus,
            enums::CopyStatus,
            enums::BookCondition,
            enums::ReservationStatus,
            enums::FeeKind,
            enums::Role,
            // Auth
            member_models::LoginRequest,
            crate::models::auth::AdminLoginResponse,
            crate::models::auth::MemberLoginResponse,
            // Members
            member_models::MembershipLevel,
            member_models::Member,
            member_models::MemberWithLevel,
            member_models::Admin,
            member_models::TopUp,
            member_models::MemberProfile,
            member_models::MemberDetail,
            member_models::MemberLoanSummary,
            member_models::CreateMemberRequest,
            member_models::AdjustBalanceRequest,
            member_models::UpdateMemberStatusRequest,
            member_models::TopUpRequest,
            member_models::TopUpResponse,
            pagination::PaginatedMembers,
            // Books
            book::Category,
            book::Book,
            book::BookCopy,
            book::BookSearchResult,
            book::CopyGroup,
            book::BookDetail,
            book::BookInventory,
            book::BookWithCopies,
            book::CreateBookRequest,
            book::CreatedBook,
            book::UpdateBookRequest,
            book::CategoryRequest,
            book::SetBookCategoriesRequest,
            book::AddCopyRequest,
            book::UpdateCopyRequest,
            pagination::PaginatedInventory,
            // Loans
            loan::BookLoan,
            loan::LoanRecord,
            loan::FeeType,
            loan::AddFee,
            loan::LoanItemView,
            loan::LoanItemWithFees,
            loan::OpenLoan,
            loan::CopyRef,
            loan::CheckoutRequest,
            loan::CheckedOutItem,
            loan::CheckoutResult,
            loan::BorrowPreview,
            loan::ReturnOptions,
            loan::ReturnResult,
            loan::BatchReturnItem,
            loan::BatchReturnRequest,
            loan::BatchItemError,
            loan::BatchReturnOutcome,
            loan::BatchReturnResponse,
            loan::FineItem,
            loan::FineCalculationRequest,
            loan::FineEstimate,
            loan::FineCalculationResponse,
            loan::RenewResult,
            crate::pricing::FineBreakdown,
            // Reservations
            reservation::Reservation,
            reservation::ReservedBook,
            reservation::ReservationDetail,
            reservation::CreateReservationRequest,
            reservation::CreatedReservation,
            reservation::FulfillReservationRequest,
            // Stats
            stats::TopBook,
            stats::TopCategory,
            // Search history
            history::SearchFilters,
            history::SearchHistoryEntry,
            history::KeywordCount,
            history::BookSearchCount,
            history::DailySearchCount,
            history::FilterCombination,
            history::CategorySearchCount,
            history::PriceRangeCount,
            history::SearchAnalytics,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorCode,
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Login for counter staff and members"),
        (name = "members", description = "Member management at the counter"),
        (name = "member", description = "Member self-service"),
        (name = "books", description = "Catalogue and copies"),
        (name = "loans", description = "Checkout, return, renewal and fines"),
        (name = "reservations", description = "Book reservations"),
        (name = "stats", description = "Borrowing statistics"),
        (name = "search-history", description = "Catalogue search history and analytics")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` JWT scheme referenced by secured paths
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_routes_and_security() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/admin/loans"));
        assert!(doc.paths.paths.contains_key("/books/{id}"));
        assert!(doc
            .components
            .as_ref()
            .is_some_and(|c| c.security_schemes.contains_key("bearer_auth")));
    }
}
