use super::ui;
use crate::core::quote::{CategoryStatus, MarketCategory, MarketData};
use comfy_table::{Cell, Table};

fn status_line(category: MarketCategory, status: Option<&CategoryStatus>) -> String {
    let title = ui::style_text(&format!("{category}"), ui::StyleType::Title);
    let detail = match status {
        Some(CategoryStatus::Live { fetched_at }) => {
            format!("live, {}", fetched_at.format("%Y-%m-%d %H:%M:%S UTC"))
        }
        Some(CategoryStatus::Cached { fetched_at }) => {
            format!("cached, {}", fetched_at.format("%Y-%m-%d %H:%M:%S UTC"))
        }
        Some(CategoryStatus::Unavailable) | None => "unavailable".to_string(),
    };
    format!("{title} {}", ui::style_text(&format!("({detail})"), ui::StyleType::Subtle))
}

impl MarketData {
    fn crypto_table(&self) -> Table {
        let mut table = ui::new_styled_table();
        let currency = self
            .crypto
            .values()
            .next()
            .map_or("local".to_string(), |q| q.currency.clone());
        table.set_header(vec![
            ui::header_cell("Coin"),
            ui::header_cell(&format!("Price ({currency})")),
            ui::header_cell("Price (USD)"),
            ui::header_cell("24h Change"),
        ]);
        for quote in self.crypto.values() {
            table.add_row(vec![
                Cell::new(&quote.name),
                ui::right_cell(format!("{:.2}", quote.price_local)),
                ui::format_optional_cell(quote.price_usd, |p| format!("{p:.2}")),
                ui::change_cell(quote.change_24h_percent),
            ]);
        }
        table
    }

    fn stocks_table(&self) -> Table {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Symbol"),
            ui::header_cell("Price"),
            ui::header_cell("Change"),
            ui::header_cell("Change %"),
            ui::header_cell("Volume"),
        ]);
        for quote in self.stocks.values() {
            table.add_row(vec![
                Cell::new(&quote.symbol),
                ui::right_cell(format!("{:.2}", quote.price)),
                ui::right_cell(format!("{:+.2}", quote.change_absolute)),
                ui::change_cell(quote.change_percent),
                ui::format_optional_cell(quote.volume, |v| v.to_string()),
            ]);
        }
        table
    }

    fn forex_table(&self) -> Table {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Pair"),
            ui::header_cell("Rate"),
            ui::header_cell("Last Refreshed"),
        ]);
        for rate in self.forex.values() {
            table.add_row(vec![
                Cell::new(format!("{}/{}", rate.from_currency, rate.to_currency)),
                ui::right_cell(format!("{:.4}", rate.exchange_rate)),
                Cell::new(rate.last_refreshed.as_deref().unwrap_or("N/A")),
            ]);
        }
        table
    }

    /// One section per category; empty categories are listed, not hidden.
    pub fn display_as_tables(&self) -> String {
        let sections: Vec<String> = MarketCategory::ALL
            .into_iter()
            .map(|category| {
                let (count, table) = match category {
                    MarketCategory::Crypto => (self.crypto.len(), self.crypto_table()),
                    MarketCategory::Stocks => (self.stocks.len(), self.stocks_table()),
                    MarketCategory::Forex => (self.forex.len(), self.forex_table()),
                };
                let heading = status_line(category, self.sources.get(&category));
                if count == 0 {
                    format!(
                        "{heading}\n{}",
                        ui::style_text("No quotes available", ui::StyleType::Error)
                    )
                } else {
                    format!("{heading}\n{table}")
                }
            })
            .collect();
        sections.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quote::{ForexRate, MarketQuote};
    use chrono::Utc;

    #[test]
    fn test_empty_categories_are_reported() {
        let mut data = MarketData::default();
        let now = Utc::now();
        data.absorb(
            MarketCategory::Forex,
            CategoryStatus::Live { fetched_at: now },
            vec![MarketQuote::Forex(ForexRate {
                pair: "USD_INR".to_string(),
                from_currency: "USD".to_string(),
                to_currency: "INR".to_string(),
                exchange_rate: 86.1234,
                last_refreshed: Some("2024-06-14 10:00:01".to_string()),
                as_of: now,
                source: "test".to_string(),
            })],
        );
        data.absorb(MarketCategory::Stocks, CategoryStatus::Unavailable, vec![]);

        let output = console::strip_ansi_codes(&data.display_as_tables()).to_string();
        assert!(output.contains("forex (live"));
        assert!(output.contains("USD/INR"));
        assert!(output.contains("86.1234"));
        assert!(output.contains("stocks (unavailable)"));
        assert!(output.contains("crypto (unavailable)"));
        assert_eq!(output.matches("No quotes available").count(), 2);
    }
}
