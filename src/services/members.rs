//! Member registration, balance and profile service

use rust_decimal::Decimal;
use validator::Validate;

use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::{
        enums::MemberStatus,
        member::{
            CreateMemberRequest, Member, MemberDetail, MemberLoanSummary, MemberProfile,
            MemberSearchQuery, MemberWithLevel, MembershipLevel, TopUpResponse,
        },
        pagination::{PageParams, Paginated},
    },
    repository::Repository,
    services::ensure_active,
};

#[derive(Clone)]
pub struct MembersService {
    repository: Repository,
}

impl MembersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Register a member; the opening balance decides the level
    pub async fn create_member(
        &self,
        admin_id: i64,
        request: CreateMemberRequest,
    ) -> AppResult<Member> {
        request.validate()?;

        let balance = request.initial_balance.unwrap_or(Decimal::ZERO);
        if balance < Decimal::ZERO {
            return Err(AppError::BadRequest("initial_balance must not be negative".to_string()));
        }

        let mut tx = self.repository.pool.begin().await?;

        if self
            .repository
            .members
            .exists_with_name_phone(&mut tx, request.name.trim(), request.phone.trim())
            .await?
        {
            return Err(AppError::Conflict(
                ErrorCode::MemberAlreadyExists,
                "A member with this name and phone already exists".to_string(),
            ));
        }

        let level = self
            .repository
            .members
            .level_for_amount(&mut tx, balance)
            .await?
            .ok_or_else(|| {
                AppError::business(
                    ErrorCode::NoLevelMatch,
                    format!("No membership level for an opening balance of {}", balance),
                )
            })?;

        let member = self
            .repository
            .members
            .create(&mut tx, admin_id, level.level_id, &request, balance)
            .await?;

        tx.commit().await?;

        tracing::info!(
            member_id = member.member_id,
            level = %level.level_name,
            "Member registered"
        );

        Ok(member)
    }

    pub async fn search(
        &self,
        query: &MemberSearchQuery,
    ) -> AppResult<Paginated<MemberWithLevel>> {
        let page = PageParams {
            page: query.page,
            limit: Some(query.limit.unwrap_or(100)),
        };
        let (members, total) = self.repository.members.search(query, &page).await?;
        Ok(Paginated::new(members, total, &page))
    }

    /// Member with level and top-up history
    pub async fn get_detail(&self, member_id: i64) -> AppResult<MemberDetail> {
        let member = self.repository.members.get_with_level(member_id).await?;
        let top_ups = self.repository.members.list_top_ups(member_id).await?;
        Ok(MemberDetail { member, top_ups })
    }

    pub async fn profile(&self, member_id: i64) -> AppResult<MemberProfile> {
        let member = self.repository.members.get_with_level(member_id).await?;
        let active_loans = self.repository.members.active_loan_count(member_id).await?;
        Ok(MemberProfile {
            member,
            active_loans,
        })
    }

    pub async fn update_status(&self, member_id: i64, status: MemberStatus) -> AppResult<Member> {
        let member = self.repository.members.update_status(member_id, status).await?;
        tracing::info!(member_id, status = %status, "Member status changed");
        Ok(member)
    }

    /// Signed manual balance correction
    pub async fn adjust_balance(&self, member_id: i64, amount: Decimal) -> AppResult<Member> {
        match self.repository.members.adjust_balance(member_id, amount).await? {
            Some(member) => {
                tracing::info!(member_id, %amount, balance = %member.balance, "Balance adjusted");
                Ok(member)
            }
            None => {
                // Tell a missing member apart from a refused debit
                self.repository.members.get_with_level(member_id).await?;
                Err(AppError::business(
                    ErrorCode::InsufficientBalance,
                    "Adjustment would make the balance negative",
                ))
            }
        }
    }

    /// Credit the balance and upgrade the level the top-up qualifies for
    pub async fn top_up(
        &self,
        admin_id: i64,
        member_id: i64,
        amount: Decimal,
    ) -> AppResult<TopUpResponse> {
        if amount <= Decimal::ZERO {
            return Err(AppError::BadRequest("Top-up amount must be positive".to_string()));
        }

        let mut tx = self.repository.pool.begin().await?;

        let member = self.repository.members.lock_with_level(&mut tx, member_id).await?;
        ensure_active(&member)?;

        let top_up = self
            .repository
            .members
            .insert_top_up(&mut tx, member_id, admin_id, amount)
            .await?;
        let balance = self.repository.members.credit(&mut tx, member_id, amount).await?;

        let mut level_id = member.member.level_id;
        let mut level_name = member.level_name.clone();
        let mut level_upgraded = false;

        let qualifying = self.repository.members.level_for_amount(&mut tx, amount).await?;
        if let Some(level) = upgrade_for_top_up(member.min_balance_required, qualifying) {
            self.repository
                .members
                .set_level(&mut tx, member_id, level.level_id)
                .await?;
            level_id = level.level_id;
            level_name = level.level_name;
            level_upgraded = true;
        }

        tx.commit().await?;

        tracing::info!(
            member_id,
            admin_id,
            %amount,
            level_upgraded,
            "Member topped up"
        );

        Ok(TopUpResponse {
            top_up,
            balance,
            level_id,
            level_name,
            level_upgraded,
        })
    }

    pub async fn loans(&self, member_id: i64) -> AppResult<Vec<MemberLoanSummary>> {
        self.repository.members.get_with_level(member_id).await?;
        self.repository.members.list_loans(member_id).await
    }
}

/// The level a single top-up qualifies for, when it ranks above the current
/// one; a small top-up never lowers a member's level
fn upgrade_for_top_up(
    current_min_balance: Decimal,
    qualifying: Option<MembershipLevel>,
) -> Option<MembershipLevel> {
    qualifying.filter(|level| level.min_balance_required > current_min_balance)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(level_id: i64, name: &str, min_balance: i64) -> MembershipLevel {
        MembershipLevel {
            level_id,
            level_name: name.into(),
            discount_rate: Decimal::ONE,
            min_balance_required: Decimal::from(min_balance),
            max_book_allowed: 5,
            hold_days: None,
        }
    }

    #[test]
    fn test_top_up_upgrades_to_higher_level() {
        let upgraded = upgrade_for_top_up(Decimal::from(500), Some(level(3, "Gold", 1000)));
        assert_eq!(upgraded.map(|l| l.level_id), Some(3));
    }

    #[test]
    fn test_top_up_never_downgrades() {
        // A Gold member tops up an amount that only reaches Bronze
        let current = Decimal::from(1000);
        assert!(upgrade_for_top_up(current, Some(level(1, "Bronze", 0))).is_none());
        assert!(upgrade_for_top_up(current, Some(level(3, "Gold", 1000))).is_none());
        assert!(upgrade_for_top_up(current, None).is_none());
    }
}
