//! Financial Calculation Utilities
//!
//! Installment plan arithmetic and currency helpers.
//! This is the single source of truth for installment splitting.

use serde::{Deserialize, Serialize};

/// What to do with the cents lost when a total does not split evenly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingPolicy {
    /// Every installment is round(total / count, 2); the drift is kept.
    #[default]
    AsObserved,
    /// The final installment absorbs the drift so the rows sum to the total.
    LastAbsorbsRemainder,
}

/// Breakdown of a total into scheduled partial charges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentPlan {
    /// Total amount recorded for the purchase
    pub total: f64,
    /// Number of installments (>= 1)
    pub count: u32,
    /// Amount of each installment
    pub per_installment: f64,
    /// Rounding policy used to build the plan
    #[serde(default)]
    pub policy: RoundingPolicy,
}

impl InstallmentPlan {
    pub fn is_single(&self) -> bool {
        self.count <= 1
    }

    /// Amount of every installment, in order
    pub fn installment_amounts(&self) -> Vec<f64> {
        let count = self.count.max(1) as usize;
        let mut amounts = vec![self.per_installment; count];

        if self.policy == RoundingPolicy::LastAbsorbsRemainder && count > 1 {
            let head: f64 = self.per_installment * (count - 1) as f64;
            amounts[count - 1] = round_currency(self.total - head);
        }

        amounts
    }

    /// total − sum(installments), rounded to cents
    pub fn rounding_drift(&self) -> f64 {
        let sum: f64 = self.installment_amounts().iter().sum();
        round_currency(self.total - sum)
    }
}

/// Round to two decimal places (cents)
pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Split a total into `count` installments.
///
/// A count of 0 is treated as 1. The per-installment amount is
/// round(total / count, 2).
///
/// # Example
/// ```
/// use expense_agent_core::financial::{plan_installments, RoundingPolicy};
///
/// let plan = plan_installments(100.0, 3, RoundingPolicy::AsObserved);
/// assert_eq!(plan.per_installment, 33.33);
/// assert_eq!(plan.total, 100.0);
/// ```
pub fn plan_installments(total: f64, count: u32, policy: RoundingPolicy) -> InstallmentPlan {
    let count = count.max(1);

    let per_installment = if count == 1 {
        total
    } else {
        round_currency(total / count as f64)
    };

    InstallmentPlan {
        total,
        count,
        per_installment,
        policy,
    }
}

/// Format as Brazilian reais, e.g. `R$ 1.234,56`
pub fn format_brl(value: f64) -> String {
    let cents = (value * 100.0).round() as i64;
    let negative = cents < 0;
    let cents = cents.abs();
    let units = cents / 100;
    let fraction = cents % 100;

    let digits = units.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!(
        "{}R$ {},{:02}",
        if negative { "-" } else { "" },
        grouped,
        fraction
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_installment_is_total() {
        let plan = plan_installments(80.0, 1, RoundingPolicy::AsObserved);
        assert!(plan.is_single());
        assert_eq!(plan.per_installment, 80.0);
        assert_eq!(plan.installment_amounts(), vec![80.0]);
    }

    #[test]
    fn test_zero_count_is_single() {
        let plan = plan_installments(50.0, 0, RoundingPolicy::AsObserved);
        assert_eq!(plan.count, 1);
        assert_eq!(plan.per_installment, 50.0);
    }

    #[test]
    fn test_uneven_split_keeps_drift() {
        let plan = plan_installments(100.0, 3, RoundingPolicy::AsObserved);
        assert_eq!(plan.per_installment, 33.33);
        assert_eq!(plan.total, 100.0);
        assert_eq!(plan.count, 3);
        // 3 x 33.33 = 99.99
        assert!((plan.rounding_drift() - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_last_installment_absorbs_remainder() {
        let plan = plan_installments(100.0, 3, RoundingPolicy::LastAbsorbsRemainder);
        assert_eq!(plan.per_installment, 33.33);
        let amounts = plan.installment_amounts();
        assert_eq!(amounts, vec![33.33, 33.33, 33.34]);
        assert!(plan.rounding_drift().abs() < 1e-9);
    }

    #[test]
    fn test_even_split() {
        let plan = plan_installments(300.0, 10, RoundingPolicy::AsObserved);
        assert_eq!(plan.per_installment, 30.0);
        assert!(plan.rounding_drift().abs() < 1e-9);
    }

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(47.0), "R$ 47,00");
        assert_eq!(format_brl(1234.5), "R$ 1.234,50");
        assert_eq!(format_brl(1_000_000.0), "R$ 1.000.000,00");
        assert_eq!(format_brl(0.99), "R$ 0,99");
    }
}
