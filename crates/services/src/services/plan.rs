//! Capability limits per subscription tier. The single source of truth for
//! every numeric cap and feature toggle in the product.

use db::models::user::PlanTier;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

/// Sentinel meaning "no cap" for any numeric limit field.
pub const UNLIMITED: i64 = -1;

/// The only place the sentinel is compared. Callers must never test `-1`
/// themselves.
pub fn is_unlimited(limit: i64) -> bool {
    limit == UNLIMITED
}

/// True when `count` has consumed the whole allowance. A count exactly equal
/// to the limit blocks further creation.
pub fn at_limit(count: i64, limit: i64) -> bool {
    !is_unlimited(limit) && count >= limit
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS)]
pub struct PlanLimits {
    pub max_drivers: i64,
    pub max_vehicles: i64,
    pub max_platforms: i64,
    pub max_expense_types: i64,
    pub max_payment_methods: i64,
    pub max_budgets: i64,
    pub max_goals: i64,
    pub monthly_exports: i64,
    pub advanced_reports: bool,
    pub partner_offers: bool,
}

const FREE_LIMITS: PlanLimits = PlanLimits {
    max_drivers: 1,
    max_vehicles: 1,
    max_platforms: 3,
    max_expense_types: 5,
    max_payment_methods: 2,
    max_budgets: 1,
    max_goals: 1,
    monthly_exports: 3,
    advanced_reports: false,
    partner_offers: false,
};

const SIMPLE_LIMITS: PlanLimits = PlanLimits {
    max_drivers: 3,
    max_vehicles: 3,
    max_platforms: 5,
    max_expense_types: 15,
    max_payment_methods: 5,
    max_budgets: 5,
    max_goals: 5,
    monthly_exports: 20,
    advanced_reports: true,
    partner_offers: false,
};

const PRO_LIMITS: PlanLimits = PlanLimits {
    max_drivers: UNLIMITED,
    max_vehicles: UNLIMITED,
    max_platforms: UNLIMITED,
    max_expense_types: UNLIMITED,
    max_payment_methods: UNLIMITED,
    max_budgets: UNLIMITED,
    max_goals: UNLIMITED,
    monthly_exports: UNLIMITED,
    advanced_reports: true,
    partner_offers: true,
};

pub fn limits(tier: PlanTier) -> &'static PlanLimits {
    match tier {
        PlanTier::Free => &FREE_LIMITS,
        PlanTier::Simple => &SIMPLE_LIMITS,
        PlanTier::Pro => &PRO_LIMITS,
    }
}

/// Resource kinds that carry a cardinality limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LimitedResource {
    Driver,
    Vehicle,
    Platform,
    ExpenseType,
    PaymentMethod,
    Budget,
    Goal,
    Export,
}

impl LimitedResource {
    pub fn limit_for(self, limits: &PlanLimits) -> i64 {
        match self {
            Self::Driver => limits.max_drivers,
            Self::Vehicle => limits.max_vehicles,
            Self::Platform => limits.max_platforms,
            Self::ExpenseType => limits.max_expense_types,
            Self::PaymentMethod => limits.max_payment_methods,
            Self::Budget => limits.max_budgets,
            Self::Goal => limits.max_goals,
            Self::Export => limits.monthly_exports,
        }
    }

    fn plural_label(self) -> &'static str {
        match self {
            Self::Driver => "drivers",
            Self::Vehicle => "vehicles",
            Self::Platform => "platforms",
            Self::ExpenseType => "expense types",
            Self::PaymentMethod => "payment methods",
            Self::Budget => "budgets",
            Self::Goal => "goals",
            Self::Export => "exports per month",
        }
    }
}

fn tier_label(tier: PlanTier) -> &'static str {
    match tier {
        PlanTier::Free => "Free",
        PlanTier::Simple => "Simple",
        PlanTier::Pro => "Pro",
    }
}

/// User-facing message shown verbatim when a cardinality check fails. Names
/// the exact numeric limit and the upgrade call-to-action.
pub fn limit_message(tier: PlanTier, resource: LimitedResource, limit: i64) -> String {
    format!(
        "Your {} plan allows {} {}. Upgrade your plan to add more.",
        tier_label(tier),
        limit,
        resource.plural_label()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_centralized() {
        assert!(is_unlimited(UNLIMITED));
        assert!(!is_unlimited(0));
        assert!(!is_unlimited(3));
    }

    #[test]
    fn count_equal_to_limit_blocks() {
        assert!(!at_limit(2, 3));
        assert!(at_limit(3, 3));
        assert!(at_limit(4, 3));
    }

    #[test]
    fn unlimited_never_blocks() {
        assert!(!at_limit(1_000_000, UNLIMITED));
    }

    #[test]
    fn pro_is_uncapped_everywhere() {
        let pro = limits(PlanTier::Pro);
        for resource in [
            LimitedResource::Driver,
            LimitedResource::Vehicle,
            LimitedResource::Platform,
            LimitedResource::ExpenseType,
            LimitedResource::PaymentMethod,
            LimitedResource::Budget,
            LimitedResource::Goal,
            LimitedResource::Export,
        ] {
            assert!(is_unlimited(resource.limit_for(pro)));
        }
    }

    #[test]
    fn free_tier_is_single_driver_single_vehicle() {
        let free = limits(PlanTier::Free);
        assert_eq!(free.max_drivers, 1);
        assert_eq!(free.max_vehicles, 1);
    }

    #[test]
    fn message_names_the_limit() {
        let msg = limit_message(PlanTier::Simple, LimitedResource::Driver, 3);
        assert!(msg.contains("Simple"));
        assert!(msg.contains('3'));
        assert!(msg.contains("drivers"));
        assert!(msg.contains("Upgrade"));
    }
}
