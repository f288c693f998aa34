//! Budget allocation engine: the 50/30/20 rule plus table-driven
//! recommendations.

use crate::core::allocation::split_by_percentages;
use crate::core::config::CurrencyConfig;
use crate::core::currency::{format_amount, round_to_unit, to_decimal};
use crate::core::error::AdvisorError;
use crate::core::template;
use anyhow::{Result, bail};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetCategory {
    Needs,
    Wants,
    SavingsInvestments,
}

impl BudgetCategory {
    /// Evaluation order. `Needs` comes first and absorbs the rounding remainder.
    pub const ALL: [BudgetCategory; 3] = [
        BudgetCategory::Needs,
        BudgetCategory::Wants,
        BudgetCategory::SavingsInvestments,
    ];
}

impl Display for BudgetCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                BudgetCategory::Needs => "Needs",
                BudgetCategory::Wants => "Wants",
                BudgetCategory::SavingsInvestments => "Savings & Investments",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub percentage: Decimal,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetCategories {
    pub needs: CategoryRule,
    pub wants: CategoryRule,
    pub savings_investments: CategoryRule,
}

impl BudgetCategories {
    pub fn get(&self, category: BudgetCategory) -> &CategoryRule {
        match category {
            BudgetCategory::Needs => &self.needs,
            BudgetCategory::Wants => &self.wants,
            BudgetCategory::SavingsInvestments => &self.savings_investments,
        }
    }
}

impl Default for BudgetCategories {
    fn default() -> Self {
        Self {
            needs: CategoryRule {
                percentage: Decimal::from(50),
                description: "Essential expenses like rent, utilities, groceries, insurance"
                    .to_string(),
            },
            wants: CategoryRule {
                percentage: Decimal::from(30),
                description: "Entertainment, dining out, hobbies, non-essential shopping"
                    .to_string(),
            },
            savings_investments: CategoryRule {
                percentage: Decimal::from(20),
                description: "Emergency fund, retirement savings, investments".to_string(),
            },
        }
    }
}

/// Predicate of a recommendation rule over income and the savings amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "when", rename_all = "snake_case")]
pub enum BudgetCondition {
    Always,
    IncomeBelow { amount: Decimal },
    IncomeAtLeast { amount: Decimal },
    SavingsAbove { amount: Decimal },
    SavingsAtMost { amount: Decimal },
}

impl BudgetCondition {
    pub fn matches(&self, income: Decimal, savings: Decimal) -> bool {
        match self {
            BudgetCondition::Always => true,
            BudgetCondition::IncomeBelow { amount } => income < *amount,
            BudgetCondition::IncomeAtLeast { amount } => income >= *amount,
            BudgetCondition::SavingsAbove { amount } => savings > *amount,
            BudgetCondition::SavingsAtMost { amount } => savings <= *amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetRule {
    #[serde(flatten)]
    pub condition: BudgetCondition,
    pub message: String,
}

pub const MAX_EMERGENCY_FUND_MONTHS: Decimal = Decimal::from_parts(120, 0, 0, false, 0);

/// Placeholders available to recommendation messages.
pub const MESSAGE_PLACEHOLDERS: &[&str] = &[
    "income",
    "needs",
    "wants",
    "savings",
    "emergency_fund",
    "emergency_fund_months",
    "savings_equity",
    "savings_debt",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub categories: BudgetCategories,
    /// Months of essential expenses the emergency fund should cover.
    pub emergency_fund_months: Decimal,
    /// Fraction of savings suggested for equity; the rest goes to debt.
    pub savings_equity_share: Decimal,
    pub recommendations: Vec<BudgetRule>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            categories: BudgetCategories::default(),
            emergency_fund_months: Decimal::from(6),
            savings_equity_share: Decimal::new(7, 1),
            recommendations: default_recommendations(),
        }
    }
}

fn default_recommendations() -> Vec<BudgetRule> {
    let rule = |condition, message: &str| BudgetRule {
        condition,
        message: message.to_string(),
    };
    vec![
        rule(
            BudgetCondition::IncomeBelow {
                amount: Decimal::from(25_000),
            },
            "With a monthly income of {income}, build your emergency fund of {emergency_fund} before taking on market risk",
        ),
        rule(
            BudgetCondition::Always,
            "Build an emergency fund of {emergency_fund} ({emergency_fund_months} months of essential expenses)",
        ),
        rule(
            BudgetCondition::SavingsAbove {
                amount: Decimal::from(5_000),
            },
            "Consider investing {savings_equity} in equity mutual funds for long-term growth",
        ),
        rule(
            BudgetCondition::SavingsAbove {
                amount: Decimal::from(5_000),
            },
            "Keep {savings_debt} in fixed deposits or liquid funds for short-term goals",
        ),
        rule(
            BudgetCondition::SavingsAtMost {
                amount: Decimal::from(5_000),
            },
            "Start a monthly SIP with your {savings} of savings; small amounts compound over time",
        ),
        rule(
            BudgetCondition::SavingsAbove {
                amount: Decimal::from(50_000),
            },
            "Saving {savings} a month leaves room to diversify across equity, debt, gold and international funds",
        ),
    ]
}

impl BudgetConfig {
    pub fn validate(&self) -> Result<()> {
        let mut total = Decimal::ZERO;
        for category in BudgetCategory::ALL {
            let pct = self.categories.get(category).percentage;
            if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
                bail!("Budget percentage for {category} must be within 0..=100, got {pct}");
            }
            total += pct;
        }
        if total != Decimal::ONE_HUNDRED {
            bail!("Budget percentages must sum to 100, got {total}");
        }
        if self.emergency_fund_months < Decimal::ZERO
            || self.emergency_fund_months > MAX_EMERGENCY_FUND_MONTHS
        {
            bail!("emergency_fund_months must be within 0..={MAX_EMERGENCY_FUND_MONTHS}");
        }
        if self.savings_equity_share < Decimal::ZERO || self.savings_equity_share > Decimal::ONE {
            bail!("savings_equity_share must be within 0..=1");
        }
        for rule in &self.recommendations {
            template::validate(&rule.message, MESSAGE_PLACEHOLDERS)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetAllocation {
    #[serde(skip)]
    pub category: BudgetCategory,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub percentage: Decimal,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetAllocations {
    pub needs: BudgetAllocation,
    pub wants: BudgetAllocation,
    pub savings_investments: BudgetAllocation,
}

impl BudgetAllocations {
    pub fn iter(&self) -> impl Iterator<Item = &BudgetAllocation> {
        [&self.needs, &self.wants, &self.savings_investments].into_iter()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetResult {
    #[serde(with = "rust_decimal::serde::float")]
    pub monthly_income: Decimal,
    pub allocations: BudgetAllocations,
    pub recommendations: Vec<String>,
}

/// Splits a monthly income into needs, wants and savings. Pure: the same
/// income always produces the same result.
#[derive(Debug, Clone)]
pub struct BudgetEngine {
    config: BudgetConfig,
    currency: CurrencyConfig,
}

impl BudgetEngine {
    pub fn new(config: BudgetConfig, currency: CurrencyConfig) -> Self {
        Self { config, currency }
    }

    pub fn allocate(&self, monthly_income: f64) -> Result<BudgetResult, AdvisorError> {
        let income = to_decimal(monthly_income, "monthly_income")?;
        if income <= Decimal::ZERO {
            return Err(AdvisorError::InvalidInput(
                "monthly_income must be greater than zero".to_string(),
            ));
        }

        let percentages: Vec<Decimal> = BudgetCategory::ALL
            .iter()
            .map(|c| self.config.categories.get(*c).percentage)
            .collect();
        let amounts =
            split_by_percentages(income, &percentages, 0, self.currency.decimal_places);

        let allocation = |index: usize| {
            let category = BudgetCategory::ALL[index];
            let rule = self.config.categories.get(category);
            BudgetAllocation {
                category,
                amount: amounts[index],
                percentage: rule.percentage,
                description: rule.description.clone(),
            }
        };
        let allocations = BudgetAllocations {
            needs: allocation(0),
            wants: allocation(1),
            savings_investments: allocation(2),
        };
        debug!(%income, ?amounts, "Computed budget allocation");

        let recommendations = self.recommendations(income, &allocations)?;
        Ok(BudgetResult {
            monthly_income: income,
            allocations,
            recommendations,
        })
    }

    fn recommendations(
        &self,
        income: Decimal,
        allocations: &BudgetAllocations,
    ) -> Result<Vec<String>, AdvisorError> {
        let savings = allocations.savings_investments.amount;
        let emergency_fund = allocations
            .needs
            .amount
            .checked_mul(self.config.emergency_fund_months)
            .ok_or_else(|| {
                AdvisorError::InvalidInput("monthly_income is out of range".to_string())
            })?;
        let savings_equity = round_to_unit(
            savings * self.config.savings_equity_share,
            self.currency.decimal_places,
        );
        let fmt = |amount: Decimal| format_amount(amount, &self.currency.symbol);

        let vars = [
            ("income", fmt(income)),
            ("needs", fmt(allocations.needs.amount)),
            ("wants", fmt(allocations.wants.amount)),
            ("savings", fmt(savings)),
            ("emergency_fund", fmt(emergency_fund)),
            (
                "emergency_fund_months",
                self.config.emergency_fund_months.normalize().to_string(),
            ),
            ("savings_equity", fmt(savings_equity)),
            ("savings_debt", fmt(savings - savings_equity)),
        ];

        Ok(self
            .config
            .recommendations
            .iter()
            .filter(|rule| rule.condition.matches(income, savings))
            .map(|rule| template::render(&rule.message, &vars))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn engine() -> BudgetEngine {
        BudgetEngine::new(BudgetConfig::default(), CurrencyConfig::default())
    }

    #[test]
    fn test_fifty_thirty_twenty() {
        let result = engine().allocate(50000.0).unwrap();

        assert_eq!(result.monthly_income, dec!(50000));
        assert_eq!(result.allocations.needs.amount, dec!(25000));
        assert_eq!(result.allocations.wants.amount, dec!(15000));
        assert_eq!(result.allocations.savings_investments.amount, dec!(10000));
        assert_eq!(result.allocations.needs.percentage, dec!(50));
        assert_eq!(result.allocations.wants.percentage, dec!(30));
        assert_eq!(result.allocations.savings_investments.percentage, dec!(20));
        assert_eq!(
            result.allocations.needs.description,
            "Essential expenses like rent, utilities, groceries, insurance"
        );
    }

    #[test]
    fn test_amounts_sum_to_income() {
        let engine = engine();
        for income in [0.01, 1.0, 333.33, 1234.57, 99999.99, 12345678.91] {
            let result = engine.allocate(income).unwrap();
            let sum: Decimal = result.allocations.iter().map(|a| a.amount).sum();
            assert_eq!(sum, result.monthly_income, "income {income}");
            let pct: Decimal = result.allocations.iter().map(|a| a.percentage).sum();
            assert_eq!(pct, dec!(100));
        }
    }

    #[test]
    fn test_needs_absorbs_remainder() {
        let result = engine().allocate(100.01).unwrap();
        assert_eq!(result.allocations.wants.amount, dec!(30.00));
        assert_eq!(result.allocations.savings_investments.amount, dec!(20.00));
        assert_eq!(result.allocations.needs.amount, dec!(50.01));
    }

    #[test]
    fn test_invalid_income() {
        let engine = engine();
        for income in [0.0, -1.0, -50000.0, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(engine.allocate(income), Err(AdvisorError::InvalidInput(_))),
                "income {income} should be rejected"
            );
        }
    }

    #[test]
    fn test_huge_income_is_rejected() {
        let engine = engine();
        for income in [3e28, 1e20] {
            assert!(
                matches!(engine.allocate(income), Err(AdvisorError::InvalidInput(_))),
                "income {income} should be rejected"
            );
        }

        let mut config = BudgetConfig::default();
        config.emergency_fund_months = MAX_EMERGENCY_FUND_MONTHS;
        let result = BudgetEngine::new(config, CurrencyConfig::default())
            .allocate(1e15)
            .unwrap();
        let sum: Decimal = result.allocations.iter().map(|a| a.amount).sum();
        assert_eq!(sum, dec!(1000000000000000));
        assert!(result.recommendations[0].contains("₹60,000,000,000,000,000"));
    }

    #[test]
    fn test_idempotent() {
        let engine = engine();
        assert_eq!(engine.allocate(73456.78).unwrap(), engine.allocate(73456.78).unwrap());
    }

    #[test]
    fn test_recommendations_in_rule_order() {
        let result = engine().allocate(50000.0).unwrap();
        assert_eq!(
            result.recommendations,
            vec![
                "Build an emergency fund of ₹150,000 (6 months of essential expenses)",
                "Consider investing ₹7,000 in equity mutual funds for long-term growth",
                "Keep ₹3,000 in fixed deposits or liquid funds for short-term goals",
            ]
        );
    }

    #[test]
    fn test_low_income_recommendations() {
        let result = engine().allocate(20000.0).unwrap();
        assert_eq!(result.recommendations.len(), 3);
        assert!(result.recommendations[0].starts_with("With a monthly income of ₹20,000"));
        assert!(result.recommendations[2].contains("₹4,000 of savings"));
    }

    #[test]
    fn test_custom_rule_table() {
        let mut config = BudgetConfig::default();
        config.recommendations = vec![BudgetRule {
            condition: BudgetCondition::IncomeAtLeast {
                amount: dec!(100000),
            },
            message: "High earner: {wants} for wants".to_string(),
        }];
        let engine = BudgetEngine::new(config, CurrencyConfig::default());

        assert!(engine.allocate(99999.0).unwrap().recommendations.is_empty());
        assert_eq!(
            engine.allocate(100000.0).unwrap().recommendations,
            vec!["High earner: ₹30,000 for wants"]
        );
    }

    #[test]
    fn test_savings_predicates_split_at_threshold() {
        let threshold = dec!(5000);
        let above = BudgetCondition::SavingsAbove { amount: threshold };
        let at_most = BudgetCondition::SavingsAtMost { amount: threshold };
        for savings in [dec!(4999.99), dec!(5000), dec!(5000.01)] {
            assert_ne!(
                above.matches(dec!(25000), savings),
                at_most.matches(dec!(25000), savings),
                "savings {savings}"
            );
        }
        assert!(at_most.matches(dec!(25000), dec!(5000)));

        // Income 25000 leaves exactly 5000 of savings
        let result = engine().allocate(25000.0).unwrap();
        assert!(result.recommendations.iter().any(|r| r.contains("Start a monthly SIP")));
        assert!(!result.recommendations.iter().any(|r| r.contains("equity mutual funds")));
    }

    #[test]
    fn test_validate_rejects_bad_weights() {
        let mut config = BudgetConfig::default();
        config.categories.wants.percentage = dec!(35);
        assert!(config.validate().is_err());

        let mut config = BudgetConfig::default();
        config.recommendations.push(BudgetRule {
            condition: BudgetCondition::Always,
            message: "{bonus}".to_string(),
        });
        assert!(config.validate().is_err());

        let mut config = BudgetConfig::default();
        config.emergency_fund_months = dec!(121);
        assert!(config.validate().is_err());

        assert!(BudgetConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rule_table_from_yaml() {
        let yaml = r#"
- when: always
  message: "Track your spending"
- when: savings_above
  amount: 2500.50
  message: "Invest {savings_equity}"
- when: savings_at_most
  amount: 100
  message: "Start small"
"#;
        let rules: Vec<BudgetRule> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rules[0].condition, BudgetCondition::Always);
        assert_eq!(
            rules[1].condition,
            BudgetCondition::SavingsAbove {
                amount: dec!(2500.50)
            }
        );
        assert_eq!(
            rules[2].condition,
            BudgetCondition::SavingsAtMost { amount: dec!(100) }
        );
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(engine().allocate(50000.0).unwrap()).unwrap();
        assert_eq!(json["monthly_income"], 50000.0);
        assert_eq!(json["allocations"]["needs"]["amount"], 25000.0);
        assert_eq!(json["allocations"]["savings_investments"]["percentage"], 20.0);
        assert!(json["allocations"]["wants"].get("category").is_none());
        assert_eq!(json["recommendations"].as_array().unwrap().len(), 3);
    }
}
