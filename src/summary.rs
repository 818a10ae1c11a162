use crate::schema::IncomeStatementFlow;
use crate::utils::{format_currency, snap_negligible, sum_amounts};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Subtotal {
    GrossProfit,
    OperatingIncome,
    NetIncome,
}

impl Subtotal {
    pub fn label(&self) -> &'static str {
        match self {
            Self::GrossProfit => "Gross Profit",
            Self::OperatingIncome => "Operating Income",
            Self::NetIncome => "Net Income",
        }
    }
}

impl fmt::Display for Subtotal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The computed totals behind an income statement chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeStatementSummary {
    pub total_revenue: f64,
    pub cost_of_revenue: f64,
    pub gross_profit: f64,
    pub total_operating_expenses: f64,
    pub operating_income: f64,
    pub total_other_expenses: f64,
    pub net_income: f64,
}

impl IncomeStatementSummary {
    /// Subtotals within rounding noise of zero are stored as exactly zero,
    /// so a break-even statement is not reported as a loss.
    pub fn from_flow(flow: &IncomeStatementFlow) -> Self {
        let total_revenue = sum_amounts(&flow.revenue_sources);
        let scale = total_revenue;

        let gross_profit = snap_negligible(total_revenue - flow.cost_of_revenue, scale);
        let total_operating_expenses = sum_amounts(&flow.operating_expenses);
        let operating_income = snap_negligible(gross_profit - total_operating_expenses, scale);
        let total_other_expenses = sum_amounts(&flow.other_expenses);
        let net_income = snap_negligible(operating_income - total_other_expenses, scale);

        Self {
            total_revenue,
            cost_of_revenue: flow.cost_of_revenue,
            gross_profit,
            total_operating_expenses,
            operating_income,
            total_other_expenses,
            net_income,
        }
    }

    pub fn subtotal(&self, subtotal: Subtotal) -> f64 {
        match subtotal {
            Subtotal::GrossProfit => self.gross_profit,
            Subtotal::OperatingIncome => self.operating_income,
            Subtotal::NetIncome => self.net_income,
        }
    }

    /// Subtotals below zero, in statement order.
    pub fn negative_subtotals(&self) -> Vec<(Subtotal, f64)> {
        [
            Subtotal::GrossProfit,
            Subtotal::OperatingIncome,
            Subtotal::NetIncome,
        ]
        .into_iter()
        .map(|s| (s, self.subtotal(s)))
        .filter(|(_, value)| *value < 0.0)
        .collect()
    }

    pub fn gross_margin(&self) -> Option<f64> {
        self.margin(self.gross_profit)
    }

    pub fn operating_margin(&self) -> Option<f64> {
        self.margin(self.operating_income)
    }

    pub fn net_margin(&self) -> Option<f64> {
        self.margin(self.net_income)
    }

    fn margin(&self, value: f64) -> Option<f64> {
        if self.total_revenue == 0.0 {
            None
        } else {
            Some(value / self.total_revenue * 100.0)
        }
    }

    fn rows(&self) -> Vec<(&'static str, f64, Option<f64>)> {
        vec![
            ("Total Revenue", self.total_revenue, None),
            ("Cost of Revenue", self.cost_of_revenue, None),
            ("Gross Profit", self.gross_profit, self.gross_margin()),
            ("Operating Expenses", self.total_operating_expenses, None),
            ("Operating Income", self.operating_income, self.operating_margin()),
            ("Other Expenses", self.total_other_expenses, None),
            ("Net Income", self.net_income, self.net_margin()),
        ]
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str("Line Item,Amount,Margin %\n");

        for (label, amount, margin) in self.rows() {
            let margin = margin.map(|m| format!("{:.1}", m)).unwrap_or_default();
            output.push_str(&format!("{},{:.2},{}\n", label, amount, margin));
        }

        output
    }

    pub fn to_markdown(&self, title: &str, currency_symbol: &str) -> String {
        let mut output = String::new();

        output.push_str(&format!("# Income Statement Summary - {}\n\n", title));
        output.push_str("| Line Item | Amount | Margin |\n");
        output.push_str("|---|---:|---:|\n");

        for (label, amount, margin) in self.rows() {
            let margin = margin.map(|m| format!("{:.1}%", m)).unwrap_or_default();
            let label = if label.contains("Profit") || label.contains("Income") {
                format!("**{}**", label)
            } else {
                label.to_string()
            };
            output.push_str(&format!(
                "| {} | {} | {} |\n",
                label,
                format_currency(amount, currency_symbol),
                margin
            ));
        }

        let negatives = self.negative_subtotals();
        if !negatives.is_empty() {
            output.push('\n');
            for (subtotal, value) in negatives {
                output.push_str(&format!(
                    "> **Loss:** {} is {}\n",
                    subtotal,
                    format_currency(value, currency_symbol)
                ));
            }
        }

        output
    }
}
