use crate::error::{ChartError, Result};
use crate::schema::{LineItem, NegativeSubtotalPolicy, ProfitWalkdown, RevenueBridge};
use crate::summary::Subtotal;
use crate::theme::ThemePalette;
use crate::utils::{
    csv_field, format_currency, snap_negligible, sum_amounts, validate_amount, validate_label,
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarKind {
    Start,
    Increase,
    Decrease,
    Total,
    End,
}

impl BarKind {
    /// Start, Total and End bars stand on zero and show the cumulative value.
    pub fn is_absolute(&self) -> bool {
        matches!(self, Self::Start | Self::Total | Self::End)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterfallBar {
    pub label: String,
    pub kind: BarKind,
    /// Bottom of the drawn segment. Zero for absolute bars.
    pub base: f64,
    /// Signed change for floating bars, cumulative value for absolute bars.
    pub delta: f64,
    pub color: String,
}

impl WaterfallBar {
    /// Drawn segment as `(low, high)`.
    pub fn segment(&self) -> (f64, f64) {
        match self.kind {
            BarKind::Increase => (self.base, self.base + self.delta),
            BarKind::Decrease => (self.base, self.base - self.delta),
            _ => (self.delta.min(0.0), self.delta.max(0.0)),
        }
    }

    /// Running total before this bar is applied.
    pub fn level_before(&self) -> f64 {
        match self.kind {
            BarKind::Increase => self.base,
            BarKind::Decrease => self.base - self.delta,
            _ => self.delta,
        }
    }

    /// Running total after this bar is applied.
    pub fn level_after(&self) -> f64 {
        match self.kind {
            BarKind::Increase => self.base + self.delta,
            BarKind::Decrease => self.base,
            _ => self.delta,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WaterfallSequence {
    pub bars: Vec<WaterfallBar>,
}

impl WaterfallSequence {
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&WaterfallBar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&WaterfallBar> {
        self.bars.last()
    }

    /// Cumulative value of the closing bar.
    pub fn end_value(&self) -> Option<f64> {
        self.bars
            .last()
            .filter(|bar| bar.kind == BarKind::End)
            .map(|bar| bar.delta)
    }

    /// Every bar picks up where the previous one left off.
    pub fn is_continuous(&self, tolerance: f64) -> bool {
        self.bars
            .windows(2)
            .all(|pair| (pair[0].level_after() - pair[1].level_before()).abs() <= tolerance)
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str("Label,Kind,Base,Delta,Running Total\n");

        for bar in &self.bars {
            output.push_str(&format!(
                "{},{:?},{:.2},{:.2},{:.2}\n",
                csv_field(&bar.label),
                bar.kind,
                bar.base,
                bar.delta,
                bar.level_after()
            ));
        }

        output
    }

    pub fn to_markdown(&self, currency_symbol: &str) -> String {
        let mut output = String::new();
        output.push_str("| Step | Change | Running Total |\n");
        output.push_str("|---|---:|---:|\n");

        for bar in &self.bars {
            let change = if bar.kind.is_absolute() {
                String::new()
            } else {
                let formatted = format_currency(bar.delta, currency_symbol);
                if bar.delta >= 0.0 {
                    format!("+{}", formatted)
                } else {
                    formatted
                }
            };
            let label = if bar.kind.is_absolute() {
                format!("**{}**", bar.label)
            } else {
                bar.label.clone()
            };
            output.push_str(&format!(
                "| {} | {} | {} |\n",
                label,
                change,
                format_currency(bar.level_after(), currency_symbol)
            ));
        }

        output
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WaterfallStep {
    /// A signed change applied to the running total.
    Change(LineItem),
    /// A full-height bar showing the running total so far.
    Subtotal(String),
}

pub struct WaterfallSequencer {
    palette: ThemePalette,
    negative_policy: NegativeSubtotalPolicy,
}

impl WaterfallSequencer {
    pub fn new(palette: ThemePalette) -> Self {
        Self {
            palette,
            negative_policy: NegativeSubtotalPolicy::default(),
        }
    }

    pub fn with_negative_policy(mut self, policy: NegativeSubtotalPolicy) -> Self {
        self.negative_policy = policy;
        self
    }

    /// Start bar, one bar per step in the given order, then the end bar.
    pub fn sequence(
        &self,
        start_label: &str,
        start_value: f64,
        steps: &[WaterfallStep],
        end_label: &str,
    ) -> Result<WaterfallSequence> {
        const CONTEXT: &str = "waterfall";

        validate_label(CONTEXT, start_label)?;
        validate_label(CONTEXT, end_label)?;
        validate_amount(CONTEXT, start_label, start_value)?;
        for step in steps {
            match step {
                WaterfallStep::Change(item) => {
                    validate_label(CONTEXT, &item.label)?;
                    validate_amount(CONTEXT, &item.label, item.amount)?;
                }
                WaterfallStep::Subtotal(label) => validate_label(CONTEXT, label)?,
            }
        }

        let scale = steps.iter().fold(start_value.abs(), |acc, step| match step {
            WaterfallStep::Change(item) => acc.max(item.amount.abs()),
            WaterfallStep::Subtotal(_) => acc,
        });

        let mut bars = Vec::with_capacity(steps.len() + 2);
        bars.push(self.absolute_bar(start_label, BarKind::Start, start_value, scale));

        let mut running = start_value;
        for step in steps {
            match step {
                WaterfallStep::Change(item) => {
                    let (kind, base, color) = if item.amount >= 0.0 {
                        (BarKind::Increase, running, self.palette.profit)
                    } else {
                        (BarKind::Decrease, running + item.amount, self.palette.cost)
                    };
                    bars.push(WaterfallBar {
                        label: item.label.clone(),
                        kind,
                        base,
                        delta: item.amount,
                        color: color.to_string(),
                    });
                    running += item.amount;
                }
                WaterfallStep::Subtotal(label) => {
                    bars.push(self.absolute_bar(label, BarKind::Total, running, scale));
                }
            }
        }

        bars.push(self.absolute_bar(end_label, BarKind::End, running, scale));

        debug!(
            "Sequenced {} waterfall bars from {} to {}",
            bars.len(),
            start_value,
            running
        );

        Ok(WaterfallSequence { bars })
    }

    pub fn revenue_bridge(&self, bridge: &RevenueBridge) -> Result<WaterfallSequence> {
        info!(
            "Building revenue bridge '{}' -> '{}' with {} changes",
            bridge.start_label,
            bridge.end_label,
            bridge.changes.len()
        );

        let steps: Vec<WaterfallStep> = bridge
            .changes
            .iter()
            .cloned()
            .map(WaterfallStep::Change)
            .collect();

        self.sequence(&bridge.start_label, bridge.start_value, &steps, &bridge.end_label)
    }

    /// Revenue down to net income: COGS and operating expenses are drawn as
    /// decreases, other items keep their sign.
    pub fn profit_walkdown(&self, walkdown: &ProfitWalkdown) -> Result<WaterfallSequence> {
        info!(
            "Building profit walkdown with {} operating expenses and {} other items",
            walkdown.operating_expenses.len(),
            walkdown.other_items.len()
        );

        self.check_walkdown_subtotals(walkdown)?;

        let mut steps = Vec::with_capacity(
            walkdown.operating_expenses.len() + walkdown.other_items.len() + 3,
        );

        steps.push(WaterfallStep::Change(LineItem::new(
            "COGS",
            -walkdown.cost_of_goods_sold,
        )));
        if walkdown.show_subtotals {
            steps.push(WaterfallStep::Subtotal(Subtotal::GrossProfit.label().to_string()));
        }

        for item in &walkdown.operating_expenses {
            steps.push(WaterfallStep::Change(LineItem::new(
                item.label.clone(),
                -item.amount,
            )));
        }
        if walkdown.show_subtotals {
            steps.push(WaterfallStep::Subtotal(
                Subtotal::OperatingIncome.label().to_string(),
            ));
        }

        steps.extend(walkdown.other_items.iter().cloned().map(WaterfallStep::Change));

        self.sequence("Revenue", walkdown.revenue, &steps, Subtotal::NetIncome.label())
    }

    fn check_walkdown_subtotals(&self, walkdown: &ProfitWalkdown) -> Result<()> {
        let scale = walkdown.revenue;
        let gross_profit = snap_negligible(walkdown.revenue - walkdown.cost_of_goods_sold, scale);
        let operating_income = snap_negligible(
            gross_profit - sum_amounts(&walkdown.operating_expenses),
            scale,
        );
        let net_income = snap_negligible(operating_income + sum_amounts(&walkdown.other_items), scale);

        let subtotals = [
            (Subtotal::GrossProfit, gross_profit),
            (Subtotal::OperatingIncome, operating_income),
            (Subtotal::NetIncome, net_income),
        ];

        for (subtotal, value) in subtotals {
            if value >= 0.0 || value.is_nan() {
                continue;
            }
            match self.negative_policy {
                NegativeSubtotalPolicy::Reject => {
                    return Err(ChartError::NegativeSubtotalError {
                        subtotal: subtotal.label().to_string(),
                        value,
                    });
                }
                NegativeSubtotalPolicy::RenderNegative => {
                    warn!(
                        "{} is negative ({}); drawing it below zero",
                        subtotal,
                        format_currency(value, "")
                    );
                }
            }
        }

        Ok(())
    }

    fn absolute_bar(&self, label: &str, kind: BarKind, value: f64, scale: f64) -> WaterfallBar {
        let value = snap_negligible(value, scale);
        let color = if value < 0.0 {
            self.palette.cost
        } else {
            self.palette.revenue
        };
        WaterfallBar {
            label: label.to_string(),
            kind,
            base: 0.0,
            delta: value,
            color: color.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::line_items;
    use crate::theme::get_theme;

    fn sequencer() -> WaterfallSequencer {
        WaterfallSequencer::new(get_theme("default"))
    }

    fn changes(pairs: &[(&str, f64)]) -> Vec<WaterfallStep> {
        line_items(pairs.iter().copied())
            .into_iter()
            .map(WaterfallStep::Change)
            .collect()
    }

    #[test]
    fn test_bar_positions_follow_running_total() {
        let sequence = sequencer()
            .sequence(
                "Q3",
                10e6,
                &changes(&[("Price", 5e6), ("Volume", -2e6)]),
                "Q4",
            )
            .unwrap();

        assert_eq!(sequence.len(), 4);

        let start = &sequence.bars[0];
        assert_eq!(start.kind, BarKind::Start);
        assert_eq!((start.base, start.delta), (0.0, 10e6));

        let price = &sequence.bars[1];
        assert_eq!(price.label, "Price");
        assert_eq!(price.kind, BarKind::Increase);
        assert_eq!(price.base, 10e6);
        assert_eq!(price.segment(), (10e6, 15e6));

        let volume = &sequence.bars[2];
        assert_eq!(volume.label, "Volume");
        assert_eq!(volume.kind, BarKind::Decrease);
        assert_eq!(volume.base, 10e6 + 5e6 - 2e6);
        assert_eq!(volume.segment(), (13e6, 15e6));

        assert_eq!(sequence.end_value(), Some(13e6));
        assert!(sequence.is_continuous(1e-6));
    }

    #[test]
    fn test_zero_delta_is_a_tick_at_running_total() {
        let sequence = sequencer()
            .sequence("Open", 50.0, &changes(&[("Flat", 0.0)]), "Close")
            .unwrap();

        let flat = &sequence.bars[1];
        assert_eq!(flat.kind, BarKind::Increase);
        assert_eq!(flat.segment(), (50.0, 50.0));
        assert_eq!(sequence.end_value(), Some(50.0));
    }

    #[test]
    fn test_same_labels_are_not_netted() {
        let sequence = sequencer()
            .sequence(
                "Open",
                0.0,
                &changes(&[("FX", 3.0), ("FX", -1.0), ("Other", 2.0)]),
                "Close",
            )
            .unwrap();

        let labels: Vec<&str> = sequence.bars.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Open", "FX", "FX", "Other", "Close"]);
        assert_eq!(sequence.end_value(), Some(4.0));
    }

    #[test]
    fn test_subtotal_bars_do_not_move_running_total() {
        let steps = vec![
            WaterfallStep::Change(LineItem::new("A", 10.0)),
            WaterfallStep::Subtotal("Sub".to_string()),
            WaterfallStep::Change(LineItem::new("B", -4.0)),
        ];
        let sequence = sequencer().sequence("Start", 100.0, &steps, "End").unwrap();

        let sub = &sequence.bars[2];
        assert_eq!(sub.kind, BarKind::Total);
        assert_eq!((sub.base, sub.delta), (0.0, 110.0));
        assert_eq!(sequence.bars[3].base, 106.0);
        assert_eq!(sequence.end_value(), Some(106.0));
        assert!(sequence.is_continuous(1e-9));
    }

    #[test]
    fn test_bar_colors() {
        let palette = get_theme("apple");
        let sequence = WaterfallSequencer::new(palette)
            .sequence("Open", 10.0, &changes(&[("Up", 1.0), ("Down", -20.0)]), "Close")
            .unwrap();

        assert_eq!(sequence.bars[0].color, palette.revenue);
        assert_eq!(sequence.bars[1].color, palette.profit);
        assert_eq!(sequence.bars[2].color, palette.cost);
        // Closing below zero
        assert_eq!(sequence.bars[3].color, palette.cost);
    }

    #[test]
    fn test_invalid_steps() {
        assert!(matches!(
            sequencer().sequence("", 1.0, &[], "End"),
            Err(ChartError::InputShapeError { .. })
        ));
        assert!(matches!(
            sequencer().sequence("Start", 1.0, &changes(&[("Bad", f64::INFINITY)]), "End"),
            Err(ChartError::InputShapeError { .. })
        ));
    }

    #[test]
    fn test_profit_walkdown_with_subtotals() {
        let walkdown = ProfitWalkdown {
            revenue: 100e6,
            cost_of_goods_sold: 60e6,
            operating_expenses: line_items([("R&D", 10e6), ("SG&A", 15e6)]),
            other_items: line_items([("Interest", -2e6), ("Tax", -3e6)]),
            show_subtotals: true,
        };

        let sequence = sequencer().profit_walkdown(&walkdown).unwrap();
        let labels: Vec<&str> = sequence.bars.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Revenue",
                "COGS",
                "Gross Profit",
                "R&D",
                "SG&A",
                "Operating Income",
                "Interest",
                "Tax",
                "Net Income"
            ]
        );

        assert_eq!(sequence.bars[2].delta, 40e6);
        assert_eq!(sequence.bars[5].delta, 15e6);
        assert_eq!(sequence.end_value(), Some(10e6));
    }

    #[test]
    fn test_profit_walkdown_negative_gross_profit() {
        let walkdown = ProfitWalkdown {
            revenue: 50.0,
            cost_of_goods_sold: 80.0,
            operating_expenses: vec![],
            other_items: line_items([("Tax credit", 40.0)]),
            show_subtotals: true,
        };

        let err = sequencer().profit_walkdown(&walkdown).unwrap_err();
        assert!(matches!(
            err,
            ChartError::NegativeSubtotalError { ref subtotal, .. } if subtotal == "Gross Profit"
        ));

        let sequence = sequencer()
            .with_negative_policy(NegativeSubtotalPolicy::RenderNegative)
            .profit_walkdown(&walkdown)
            .unwrap();
        let gross_profit = &sequence.bars[2];
        assert_eq!(gross_profit.delta, -30.0);
        assert_eq!(gross_profit.segment(), (-30.0, 0.0));
        assert_eq!(sequence.end_value(), Some(10.0));
    }

    #[test]
    fn test_profit_walkdown_break_even() {
        let walkdown = ProfitWalkdown {
            revenue: 0.3,
            cost_of_goods_sold: 0.0,
            operating_expenses: line_items([("R&D", 0.1), ("SG&A", 0.2)]),
            other_items: vec![],
            show_subtotals: true,
        };

        let sequence = sequencer().profit_walkdown(&walkdown).unwrap();
        let palette = get_theme("default");

        let operating_income = &sequence.bars[5];
        assert_eq!(operating_income.label, "Operating Income");
        assert_eq!(operating_income.delta, 0.0);
        assert_eq!(operating_income.color, palette.revenue);
        assert_eq!(sequence.end_value(), Some(0.0));
        assert!(sequence.is_continuous(1e-9));
    }

    #[test]
    fn test_csv_quotes_multiline_labels() {
        let sequence = sequencer()
            .sequence("Open", 10.0, &changes(&[("FX,\nnet", -2.0)]), "Close")
            .unwrap();

        assert!(sequence.to_csv().contains("\"FX,\nnet\",Decrease,8.00,-2.00,8.00"));
    }

    #[test]
    fn test_sequence_tables() {
        let sequence = sequencer()
            .sequence("Open", 1_000.0, &changes(&[("Up", 500.0), ("Down", -300.0)]), "Close")
            .unwrap();

        let csv = sequence.to_csv();
        assert!(csv.contains("Down,Decrease,1200.00,-300.00,1200.00"));

        let markdown = sequence.to_markdown("$");
        assert!(markdown.contains("| Up | +$500 | $1.5K |"));
        assert!(markdown.contains("| **Close** |  | $1.2K |"));
    }
}
