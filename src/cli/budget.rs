use super::ui;
use crate::core::budget::BudgetResult;
use crate::core::currency::format_amount;
use comfy_table::Cell;

impl BudgetResult {
    pub fn display_as_table(&self, symbol: &str) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Category"),
            ui::header_cell("Share"),
            ui::header_cell("Amount"),
            ui::header_cell("Description"),
        ]);

        for allocation in self.allocations.iter() {
            table.add_row(vec![
                Cell::new(allocation.category.to_string()),
                ui::right_cell(format!("{}%", allocation.percentage.normalize())),
                ui::right_cell(format_amount(allocation.amount, symbol)),
                Cell::new(&allocation.description),
            ]);
        }

        let mut output = format!(
            "{}: {}\n\n",
            ui::style_text("Monthly Income", ui::StyleType::TotalLabel),
            ui::style_text(
                &format_amount(self.monthly_income, symbol),
                ui::StyleType::TotalValue
            )
        );
        output.push_str(&table.to_string());

        if !self.recommendations.is_empty() {
            output.push_str(&format!(
                "\n\n{}\n{}",
                ui::style_text("Recommendations", ui::StyleType::Title),
                ui::bullet_list(&self.recommendations)
            ));
        }
        output
    }
}
