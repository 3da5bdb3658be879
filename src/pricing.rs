//! Rental and fine arithmetic
//!
//! Everything here is pure: the services load prices, rates and dates inside
//! their transactions and hand them to these functions. Amounts are rounded to
//! whole currency units, half away from zero.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    config::RentalConfig,
    models::{
        enums::{BookCondition, FeeKind},
        loan::FeeType,
    },
};

/// Round to a whole currency unit
pub fn round_amount(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Rental price of a copy: book list price scaled by the condition factor
pub fn rental_price(book_price: Decimal, discount_factor: Decimal) -> Decimal {
    round_amount(book_price * discount_factor)
}

/// Fee a member pays for one copy after the membership discount
pub fn rental_fee(rental_price: Decimal, discount_rate: Decimal) -> Decimal {
    round_amount(rental_price * discount_rate)
}

pub fn overdue_days(today: NaiveDate, due_date: NaiveDate) -> i64 {
    (today - due_date).num_days().max(0)
}

pub fn overdue_fee(days: i64, daily_amount: Decimal) -> Decimal {
    Decimal::from(days.max(0)) * daily_amount
}

/// Damage fee kind for a condition change, `None` when the copy did not get worse
pub fn damage_fee_kind(original: BookCondition, returned: BookCondition) -> Option<FeeKind> {
    match (original, returned) {
        (BookCondition::Good, BookCondition::Fair) => Some(FeeKind::DamageGoodToFair),
        (BookCondition::Good, BookCondition::Poor) => Some(FeeKind::DamageGoodToPoor),
        (BookCondition::Fair, BookCondition::Poor) => Some(FeeKind::DamageFairToPoor),
        _ => None,
    }
}

/// Share of the purchase price, used for damage and loss
pub fn purchase_price_fee(purchase_price: Decimal, rate: Decimal) -> Decimal {
    round_amount(purchase_price * rate)
}

/// Expected cost of a reservation once picked up
///
/// Priced with the cheapest condition factor, the same copies a reservation
/// holds, so the balance check only rejects what no copy could satisfy.
pub fn reservation_estimate(
    book_prices: &[Decimal],
    min_discount_factor: Decimal,
    discount_rate: Decimal,
) -> Decimal {
    book_prices
        .iter()
        .map(|price| *price * min_discount_factor * discount_rate)
        .sum()
}

/// Fee rates in effect, read from the `fee_type` table
#[derive(Debug, Clone, PartialEq)]
pub struct FeeSchedule {
    pub overdue_daily: Decimal,
    pub lost_rate: Decimal,
    pub good_to_fair_rate: Decimal,
    pub good_to_poor_rate: Decimal,
    pub fair_to_poor_rate: Decimal,
    pub renewal_fee: Decimal,
}

impl FeeSchedule {
    /// Build the schedule, falling back to configured values for missing rows
    pub fn from_fee_types(fee_types: &[FeeType], rental: &RentalConfig) -> Self {
        let find = |kind: FeeKind| fee_types.iter().find(|f| f.fee_type == kind.as_str());
        let base = |kind: FeeKind| find(kind).and_then(|f| f.base_amount);
        let rate = |kind: FeeKind| find(kind).and_then(|f| f.rate);

        Self {
            overdue_daily: base(FeeKind::Overdue).unwrap_or(rental.overdue_daily_fee),
            lost_rate: rate(FeeKind::Lost).unwrap_or(rental.lost_rate),
            good_to_fair_rate: rate(FeeKind::DamageGoodToFair).unwrap_or_default(),
            good_to_poor_rate: rate(FeeKind::DamageGoodToPoor).unwrap_or_default(),
            fair_to_poor_rate: rate(FeeKind::DamageFairToPoor).unwrap_or_default(),
            renewal_fee: base(FeeKind::Renew).unwrap_or(rental.renewal_fee),
        }
    }

    pub fn damage_rate(&self, kind: FeeKind) -> Decimal {
        match kind {
            FeeKind::DamageGoodToFair => self.good_to_fair_rate,
            FeeKind::DamageGoodToPoor => self.good_to_poor_rate,
            FeeKind::DamageFairToPoor => self.fair_to_poor_rate,
            _ => Decimal::ZERO,
        }
    }
}

/// What a returned copy owes
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct FineBreakdown {
    pub overdue_fee: Decimal,
    pub damage_fee: Decimal,
    pub lost_fee: Decimal,
    pub total: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damage_kind: Option<FeeKind>,
}

/// Inputs for assessing one copy
#[derive(Debug, Clone, Copy)]
pub struct FineInput {
    pub due_date: Option<NaiveDate>,
    pub purchase_price: Decimal,
    pub original_condition: BookCondition,
    pub final_condition: Option<BookCondition>,
    pub lost: bool,
}

/// Assess the fines for one copy; a lost copy is never also charged for damage
pub fn assess_fine(
    schedule: &FeeSchedule,
    today: NaiveDate,
    input: &FineInput) -> (FineBreakdown, i64,
) {
    let days = input
        .due_date
        .map(|due| overdue_days(today, due))
        .unwrap_or(0);

    let mut breakdown = FineBreakdown {
        overdue_fee: overdue_fee(days, schedule.overdue_daily),
        ..Default::default()
    };

    if input.lost {
        breakdown.lost_fee = purchase_price_fee(input.purchase_price, schedule.lost_rate);
    } else if let Some(kind) = input
        .final_condition
        .and_then(|returned| damage_fee_kind(input.original_condition, returned))
    {
        breakdown.damage_fee = purchase_price_fee(input.purchase_price, schedule.damage_rate(kind));
        breakdown.damage_kind = Some(kind);
    }

    breakdown.total = breakdown.overdue_fee + breakdown.damage_fee + breakdown.lost_fee;
    (breakdown, days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn schedule() -> FeeSchedule {
        FeeSchedule {
            overdue_daily: dec("10"),
            lost_rate: dec("1.0"),
            good_to_fair_rate: dec("0.2"),
            good_to_poor_rate: dec("0.5"),
            fair_to_poor_rate: dec("0.3"),
            renewal_fee: dec("10"),
        }
    }

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(round_amount(dec("2.5")), dec("3"));
        assert_eq!(round_amount(dec("2.49")), dec("2"));
        assert_eq!(round_amount(dec("-2.5")), dec("-3"));
    }

    #[test]
    fn test_rental_price_from_condition() {
        assert_eq!(rental_price(dec("350"), dec("1.00")), dec("350"));
        assert_eq!(rental_price(dec("350"), dec("0.80")), dec("280"));
        assert_eq!(rental_price(dec("333"), dec("0.60")), dec("200"));
    }

    #[test]
    fn test_rental_fee_member_discount() {
        assert_eq!(rental_fee(dec("280"), dec("0.90")), dec("252"));
        assert_eq!(rental_fee(dec("45"), dec("0.90")), dec("41"));
        assert_eq!(rental_fee(dec("45"), dec("1.00")), dec("45"));
    }

    #[test]
    fn test_overdue_days_never_negative() {
        assert_eq!(overdue_days(date(2024, 3, 10), date(2024, 3, 7)), 3);
        assert_eq!(overdue_days(date(2024, 3, 7), date(2024, 3, 7)), 0);
        assert_eq!(overdue_days(date(2024, 3, 1), date(2024, 3, 7)), 0);
    }

    #[test]
    fn test_damage_kind_only_when_worse() {
        use BookCondition::*;
        assert_eq!(damage_fee_kind(Good, Fair), Some(FeeKind::DamageGoodToFair));
        assert_eq!(damage_fee_kind(Good, Poor), Some(FeeKind::DamageGoodToPoor));
        assert_eq!(damage_fee_kind(Fair, Poor), Some(FeeKind::DamageFairToPoor));
        assert_eq!(damage_fee_kind(Good, Good), None);
        assert_eq!(damage_fee_kind(Poor, Good), None);
        assert_eq!(damage_fee_kind(Fair, Good), None);
    }

    #[test]
    fn test_reservation_estimate() {
        let estimate = reservation_estimate(&[dec("300"), dec("200")], dec("0.6"), dec("0.9"));
        assert_eq!(estimate, dec("270"));
        assert_eq!(reservation_estimate(&[], dec("0.6"), dec("0.9")), Decimal::ZERO);
    }

    #[test]
    fn test_assess_overdue_and_damage() {
        let input = FineInput {
            due_date: Some(date(2024, 5, 1)),
            purchase_price: dec("400"),
            original_condition: BookCondition::Good,
            final_condition: Some(BookCondition::Poor),
            lost: false,
        };
        let (fine, days) = assess_fine(&schedule(), date(2024, 5, 4), &input);
        assert_eq!(days, 3);
        assert_eq!(fine.overdue_fee, dec("30"));
        assert_eq!(fine.damage_fee, dec("200"));
        assert_eq!(fine.lost_fee, Decimal::ZERO);
        assert_eq!(fine.total, dec("230"));
        assert_eq!(fine.damage_kind, Some(FeeKind::DamageGoodToPoor));
    }

    #[test]
    fn test_lost_copy_skips_damage() {
        let input = FineInput {
            due_date: Some(date(2024, 5, 10)),
            purchase_price: dec("399"),
            original_condition: BookCondition::Good,
            final_condition: Some(BookCondition::Poor),
            lost: true,
        };
        let (fine, days) = assess_fine(&schedule(), date(2024, 5, 4), &input);
        assert_eq!(days, 0);
        assert_eq!(fine.lost_fee, dec("399"));
        assert_eq!(fine.damage_fee, Decimal::ZERO);
        assert_eq!(fine.damage_kind, None);
        assert_eq!(fine.total, dec("399"));
    }

    #[test]
    fn test_schedule_fallbacks() {
        let rental = RentalConfig::default();
        let schedule = FeeSchedule::from_fee_types(&[], &rental);
        assert_eq!(schedule.overdue_daily, dec("10"));
        assert_eq!(schedule.lost_rate, Decimal::ONE);
        assert_eq!(schedule.damage_rate(FeeKind::DamageGoodToFair), Decimal::ZERO);
        assert_eq!(schedule.renewal_fee, dec("10"));

        let fee_types = vec![
            FeeType {
                fee_type: "overdue".into(),
                base_amount: Some(dec("15")),
                rate: None,
                description: None,
            },
            FeeType {
                fee_type: "damage_fair_to_poor".into(),
                base_amount: None,
                rate: Some(dec("0.35")),
                description: None,
            },
        ];
        let schedule = FeeSchedule::from_fee_types(&fee_types, &rental);
        assert_eq!(schedule.overdue_daily, dec("15"));
        assert_eq!(schedule.damage_rate(FeeKind::DamageFairToPoor), dec("0.35"));
        assert_eq!(schedule.damage_rate(FeeKind::Overdue), Decimal::ZERO);
    }
}
