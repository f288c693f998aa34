use super::ui;
use crate::core::advice::InvestmentAdviceResult;
use crate::core::currency::format_amount;
use comfy_table::Cell;

impl InvestmentAdviceResult {
    pub fn display_as_table(&self, symbol: &str) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Asset Class"),
            ui::header_cell("Share"),
            ui::header_cell("Amount"),
        ]);
        for allocation in &self.allocations {
            table.add_row(vec![
                Cell::new(&allocation.asset_class),
                ui::right_cell(format!("{}%", allocation.percentage.normalize())),
                ui::right_cell(format_amount(allocation.amount, symbol)),
            ]);
        }

        let mut output = format!(
            "{} {} ({} profile)\n\n",
            ui::style_text("Investing", ui::StyleType::TotalLabel),
            ui::style_text(
                &format_amount(self.investment_amount, symbol),
                ui::StyleType::TotalValue
            ),
            self.risk_profile
        );
        output.push_str(&table.to_string());
        output.push_str(&format!(
            "\n\n{}\n{}\n\n",
            ui::style_text("Market Insights", ui::StyleType::Title),
            ui::bullet_list(&self.market_insights)
        ));
        output.push_str(&self.market_data.display_as_tables());
        output
    }
}
