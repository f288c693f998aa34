//! Static personal finance tips

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TipPriority {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinancialTip {
    pub category: &'static str,
    pub tip: &'static str,
    pub priority: TipPriority,
}

const TIPS: &[FinancialTip] = &[
    FinancialTip {
        category: "Budgeting",
        tip: "Follow the 50/30/20 rule: 50% for needs, 30% for wants, 20% for savings and investments.",
        priority: TipPriority::High,
    },
    FinancialTip {
        category: "Emergency Fund",
        tip: "Build an emergency fund covering 6-12 months of essential expenses before investing.",
        priority: TipPriority::High,
    },
    FinancialTip {
        category: "Investing",
        tip: "Start investing early to benefit from compound interest. Even small amounts can grow significantly over time.",
        priority: TipPriority::Medium,
    },
    FinancialTip {
        category: "Diversification",
        tip: "Don't put all your eggs in one basket. Diversify across asset classes and sectors.",
        priority: TipPriority::Medium,
    },
    FinancialTip {
        category: "Debt Management",
        tip: "Pay off high-interest debt (like credit cards) before investing in lower-return assets.",
        priority: TipPriority::High,
    },
    FinancialTip {
        category: "Tax Planning",
        tip: "Utilize tax-saving instruments like ELSS, PPF, and NPS to reduce your tax burden.",
        priority: TipPriority::Medium,
    },
];

pub fn financial_tips() -> &'static [FinancialTip] {
    TIPS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tips_serialize_with_lowercase_priority() {
        let tips = financial_tips();
        assert_eq!(tips.len(), 6);
        assert_eq!(tips[0].category, "Budgeting");

        let json = serde_json::to_value(&tips[2]).unwrap();
        assert_eq!(json["priority"], "medium");
        assert_eq!(json["category"], "Investing");
    }
}
