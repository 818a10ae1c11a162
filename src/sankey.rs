use crate::error::{ChartError, Result};
use crate::schema::{IncomeStatementFlow, LinkColorMode, NegativeSubtotalPolicy};
use crate::summary::{IncomeStatementSummary, Subtotal};
use crate::theme::{ColorRole, ThemePalette};
use crate::utils::{
    csv_field, format_currency, validate_label, validate_non_negative, validate_unique_labels,
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

pub const TOTAL_REVENUE: &str = "Total Revenue";
pub const COST_OF_REVENUE: &str = "Cost of Revenue";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Revenue streams and the Total Revenue node
    Revenue,
    /// Cost of revenue and every expense or deduction category
    Expense,
    /// Non-negative profit subtotals
    Profit,
    /// A profit subtotal that came out negative and is rendered as a loss
    Loss,
}

impl NodeCategory {
    fn color_role(&self) -> ColorRole {
        match self {
            Self::Revenue => ColorRole::Revenue,
            Self::Expense | Self::Loss => ColorRole::Cost,
            Self::Profit => ColorRole::Profit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    pub label: String,
    pub category: NodeCategory,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowEdge {
    pub source: usize,
    pub target: usize,
    /// Non-negative magnitude
    pub value: f64,
    pub color: String,
    /// The flow stands for a negative subtotal drawn as a loss segment.
    pub negative: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowGraph {
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
}

impl FlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node and returns its index.
    pub fn add_node(&mut self, label: impl Into<String>, category: NodeCategory, color: &str) -> usize {
        self.nodes.push(FlowNode {
            label: label.into(),
            category,
            color: color.to_string(),
        });
        self.nodes.len() - 1
    }

    pub fn add_edge(&mut self, source: usize, target: usize, value: f64, color: &str, negative: bool) {
        self.edges.push(FlowEdge {
            source,
            target,
            value,
            color: color.to_string(),
            negative,
        });
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.label == label)
    }

    pub fn outgoing_total(&self, node: usize) -> f64 {
        self.edges
            .iter()
            .filter(|e| e.source == node)
            .map(|e| e.value)
            .sum()
    }

    pub fn incoming_total(&self, node: usize) -> f64 {
        self.edges
            .iter()
            .filter(|e| e.target == node)
            .map(|e| e.value)
            .sum()
    }

    /// The value shown next to each node: the larger of its inflow and outflow.
    pub fn node_values(&self) -> Vec<f64> {
        let mut incoming = vec![0.0; self.nodes.len()];
        let mut outgoing = vec![0.0; self.nodes.len()];

        for edge in &self.edges {
            if let Some(slot) = outgoing.get_mut(edge.source) {
                *slot += edge.value;
            }
            if let Some(slot) = incoming.get_mut(edge.target) {
                *slot += edge.value;
            }
        }

        incoming
            .into_iter()
            .zip(outgoing)
            .map(|(i, o): (f64, f64)| i.max(o))
            .collect()
    }

    /// Structural check: edge indices in range, magnitudes finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        let count = self.nodes.len();

        for (idx, edge) in self.edges.iter().enumerate() {
            if edge.source >= count || edge.target >= count {
                return Err(ChartError::input_shape(
                    "flow graph",
                    format!(
                        "edge #{} ({} -> {}) references a node outside [0, {})",
                        idx, edge.source, edge.target, count
                    ),
                ));
            }

            if !edge.value.is_finite() || edge.value < 0.0 {
                return Err(ChartError::input_shape(
                    "flow graph",
                    format!("edge #{} has invalid value {}", idx, edge.value),
                ));
            }
        }

        Ok(())
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str("Source,Target,Value,Negative\n");

        for edge in &self.edges {
            output.push_str(&format!(
                "{},{},{:.2},{}\n",
                csv_field(&self.nodes[edge.source].label),
                csv_field(&self.nodes[edge.target].label),
                edge.value,
                edge.negative
            ));
        }

        output
    }

    pub fn to_markdown(&self, currency_symbol: &str) -> String {
        let mut output = String::new();
        output.push_str("| From | To | Amount |\n");
        output.push_str("|---|---|---:|\n");

        for edge in &self.edges {
            let amount = if edge.negative {
                format_currency(-edge.value, currency_symbol)
            } else {
                format_currency(edge.value, currency_symbol)
            };
            output.push_str(&format!(
                "| {} | {} | {} |\n",
                self.nodes[edge.source].label, self.nodes[edge.target].label, amount
            ));
        }

        output
    }
}

/// Assembles the revenue -> costs -> profit flow graph of an income statement.
pub struct SankeyBuilder {
    palette: ThemePalette,
    negative_policy: NegativeSubtotalPolicy,
    link_colors: LinkColorMode,
}

impl SankeyBuilder {
    pub fn new(palette: ThemePalette) -> Self {
        Self {
            palette,
            negative_policy: NegativeSubtotalPolicy::default(),
            link_colors: LinkColorMode::default(),
        }
    }

    pub fn with_negative_policy(mut self, policy: NegativeSubtotalPolicy) -> Self {
        self.negative_policy = policy;
        self
    }

    pub fn with_link_colors(mut self, mode: LinkColorMode) -> Self {
        self.link_colors = mode;
        self
    }

    pub fn build(&self, flow: &IncomeStatementFlow) -> Result<FlowGraph> {
        let summary = self.validate(flow)?;

        info!(
            "Building income statement flow graph: {} revenue sources, {} operating expenses, {} other items",
            flow.revenue_sources.len(),
            flow.operating_expenses.len(),
            flow.other_expenses.len()
        );

        let mut graph = FlowGraph::new();

        let revenue_nodes: Vec<usize> = flow
            .revenue_sources
            .iter()
            .map(|item| self.push_node(&mut graph, &item.label, NodeCategory::Revenue))
            .collect();

        let total_revenue = self.push_node(&mut graph, TOTAL_REVENUE, NodeCategory::Revenue);
        let cost_of_revenue = self.push_node(&mut graph, COST_OF_REVENUE, NodeCategory::Expense);
        let gross_profit = self.push_subtotal(&mut graph, Subtotal::GrossProfit, &summary);

        for (item, &node) in flow.revenue_sources.iter().zip(&revenue_nodes) {
            self.link(&mut graph, node, total_revenue, item.amount);
        }
        self.link(&mut graph, total_revenue, cost_of_revenue, flow.cost_of_revenue);
        self.link(&mut graph, total_revenue, gross_profit, summary.gross_profit);

        let opex_nodes: Vec<usize> = flow
            .operating_expenses
            .iter()
            .map(|item| self.push_node(&mut graph, &item.label, NodeCategory::Expense))
            .collect();
        let operating_income = self.push_subtotal(&mut graph, Subtotal::OperatingIncome, &summary);

        for (item, &node) in flow.operating_expenses.iter().zip(&opex_nodes) {
            self.link(&mut graph, gross_profit, node, item.amount);
        }
        self.link(&mut graph, gross_profit, operating_income, summary.operating_income);

        let other_nodes: Vec<usize> = flow
            .other_expenses
            .iter()
            .map(|item| self.push_node(&mut graph, &item.label, NodeCategory::Expense))
            .collect();
        let net_income = self.push_subtotal(&mut graph, Subtotal::NetIncome, &summary);

        for (item, &node) in flow.other_expenses.iter().zip(&other_nodes) {
            self.link(&mut graph, operating_income, node, item.amount);
        }
        self.link(&mut graph, operating_income, net_income, summary.net_income);

        graph.validate()?;

        debug!(
            "Flow graph assembled with {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        Ok(graph)
    }

    /// Checks the whole input before any node is created so a failure never
    /// leaves a partial graph behind.
    fn validate(&self, flow: &IncomeStatementFlow) -> Result<IncomeStatementSummary> {
        const CONTEXT: &str = "income statement sankey";

        if flow.revenue_sources.is_empty() {
            return Err(ChartError::input_shape(
                CONTEXT,
                "at least one revenue source is required",
            ));
        }

        let items = flow
            .revenue_sources
            .iter()
            .chain(&flow.operating_expenses)
            .chain(&flow.other_expenses);

        for item in items.clone() {
            validate_label(CONTEXT, &item.label)?;
            validate_non_negative(CONTEXT, &item.label, item.amount)?;
        }
        validate_non_negative(CONTEXT, COST_OF_REVENUE, flow.cost_of_revenue)?;

        let subtotal_labels = [
            TOTAL_REVENUE,
            COST_OF_REVENUE,
            Subtotal::GrossProfit.label(),
            Subtotal::OperatingIncome.label(),
            Subtotal::NetIncome.label(),
        ];
        validate_unique_labels(
            CONTEXT,
            subtotal_labels
                .into_iter()
                .chain(items.map(|item| item.label.as_str())),
        )?;

        let summary = IncomeStatementSummary::from_flow(flow);

        for (subtotal, value) in summary.negative_subtotals() {
            match self.negative_policy {
                NegativeSubtotalPolicy::Reject => {
                    return Err(ChartError::NegativeSubtotalError {
                        subtotal: subtotal.label().to_string(),
                        value,
                    });
                }
                NegativeSubtotalPolicy::RenderNegative => {
                    warn!(
                        "{} is negative ({}); drawing it as a loss segment",
                        subtotal,
                        format_currency(value, "")
                    );
                }
            }
        }

        Ok(summary)
    }

    fn push_node(&self, graph: &mut FlowGraph, label: &str, category: NodeCategory) -> usize {
        let color = self.palette.color(category.color_role());
        graph.add_node(label, category, color)
    }

    fn push_subtotal(
        &self,
        graph: &mut FlowGraph,
        subtotal: Subtotal,
        summary: &IncomeStatementSummary,
    ) -> usize {
        let category = if summary.subtotal(subtotal) < 0.0 {
            NodeCategory::Loss
        } else {
            NodeCategory::Profit
        };
        self.push_node(graph, subtotal.label(), category)
    }

    fn link(&self, graph: &mut FlowGraph, source: usize, target: usize, value: f64) {
        let negative = value < 0.0;

        let color = if negative {
            self.palette.link_color(ColorRole::Cost)
        } else {
            let node = match self.link_colors {
                LinkColorMode::Source => &graph.nodes[source],
                LinkColorMode::Target => &graph.nodes[target],
            };
            self.palette.link_color(node.category.color_role())
        };

        graph.add_edge(source, target, value.abs(), color, negative);
    }
}
