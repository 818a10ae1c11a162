use crate::error::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LineItem {
    #[schemars(description = "Display label, e.g. 'iPhone', 'R&D', 'Tax'. Must be non-empty.")]
    pub label: String,

    #[schemars(
        description = "Currency amount. Sankey inputs must be non-negative; waterfall changes are signed (negative = decrease)."
    )]
    pub amount: f64,
}

impl LineItem {
    pub fn new(label: impl Into<String>, amount: f64) -> Self {
        Self {
            label: label.into(),
            amount,
        }
    }
}

impl<S: Into<String>> From<(S, f64)> for LineItem {
    fn from((label, amount): (S, f64)) -> Self {
        Self::new(label, amount)
    }
}

/// Builds an ordered list of line items from `(label, amount)` pairs.
pub fn line_items<S: Into<String>>(pairs: impl IntoIterator<Item = (S, f64)>) -> Vec<LineItem> {
    pairs.into_iter().map(LineItem::from).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IncomeStatementFlow {
    #[schemars(
        description = "Revenue streams in display order (e.g. iPhone, Mac, Services). At least one is required."
    )]
    pub revenue_sources: Vec<LineItem>,

    #[schemars(description = "Total cost of revenue / cost of goods sold. Non-negative.")]
    pub cost_of_revenue: f64,

    #[serde(default)]
    #[schemars(description = "Operating expense categories in display order (e.g. R&D, SG&A). May be empty.")]
    pub operating_expenses: Vec<LineItem>,

    #[serde(default)]
    #[schemars(
        description = "Deductions below operating income (e.g. Tax, Other) as positive amounts. May be empty."
    )]
    pub other_expenses: Vec<LineItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RevenueBridge {
    #[schemars(description = "Label of the opening bar, e.g. 'Q3 Revenue'.")]
    pub start_label: String,

    #[schemars(description = "Opening value.")]
    pub start_value: f64,

    #[schemars(
        description = "Signed changes in display order. Order is preserved exactly; same-labeled entries are not netted."
    )]
    pub changes: Vec<LineItem>,

    #[schemars(description = "Label of the closing bar, e.g. 'Q4 Revenue'.")]
    pub end_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProfitWalkdown {
    #[schemars(description = "Total revenue for the period.")]
    pub revenue: f64,

    #[schemars(description = "Cost of goods sold as a positive amount; drawn as a decrease.")]
    pub cost_of_goods_sold: f64,

    #[serde(default)]
    #[schemars(description = "Operating expenses as positive amounts; each is drawn as a decrease.")]
    pub operating_expenses: Vec<LineItem>,

    #[serde(default)]
    #[schemars(
        description = "Items below operating income as SIGNED amounts (e.g. Interest: -2e6, Tax: -3e6, Gain on sale: 1e6)."
    )]
    pub other_items: Vec<LineItem>,

    #[serde(default = "default_true")]
    #[schemars(description = "Insert Gross Profit and Operating Income subtotal bars. Defaults to true.")]
    pub show_subtotals: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NamedSeries {
    #[schemars(description = "Legend name of the series, e.g. 'FY23' or 'Apple'.")]
    pub name: String,

    #[schemars(description = "One value per category/period, in the same order.")]
    pub values: Vec<f64>,
}

impl NamedSeries {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BarMode {
    #[default]
    #[schemars(description = "Series side by side.")]
    Group,

    #[schemars(description = "Series stacked on top of each other.")]
    Stack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    #[schemars(description = "Categories along the x axis, values rising up.")]
    Vertical,

    #[schemars(description = "Categories down the y axis, values extending right.")]
    Horizontal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartSpec {
    #[schemars(description = "Revenue -> costs -> profit flow diagram.")]
    IncomeStatementSankey(IncomeStatementFlow),

    #[schemars(description = "Period-over-period bridge from a starting to an ending value.")]
    RevenueBridge(RevenueBridge),

    #[schemars(description = "Waterfall from revenue down to net income.")]
    ProfitWalkdown(ProfitWalkdown),

    #[schemars(description = "Single-series bar chart.")]
    Bar {
        categories: Vec<String>,
        values: Vec<f64>,
        #[serde(default)]
        color: Option<String>,
        #[serde(default)]
        orientation: Orientation,
    },

    #[schemars(description = "Several series over the same categories, grouped or stacked.")]
    GroupedBar {
        categories: Vec<String>,
        series: Vec<NamedSeries>,
        #[serde(default)]
        mode: BarMode,
    },

    #[schemars(description = "Horizontal breakdown of revenue by segment, sorted largest first.")]
    RevenueSegments {
        segments: Vec<LineItem>,
        #[serde(default = "default_true")]
        show_percentage: bool,
    },

    #[schemars(description = "Gross/operating/net margin percentages per company.")]
    MarginComparison {
        companies: Vec<String>,
        gross_margins: Vec<f64>,
        operating_margins: Vec<f64>,
        #[serde(default)]
        net_margins: Option<Vec<f64>>,
    },

    #[schemars(description = "Single line over periods.")]
    Line {
        x_values: Vec<String>,
        y_values: Vec<f64>,
        #[serde(default)]
        fill: bool,
    },

    #[schemars(description = "Several lines over the same periods.")]
    MultiLine {
        x_values: Vec<String>,
        series: Vec<NamedSeries>,
    },

    #[schemars(description = "Single line annotated with period-over-period growth.")]
    Trend {
        periods: Vec<String>,
        values: Vec<f64>,
        #[serde(default = "default_true")]
        show_growth: bool,
    },

    #[schemars(description = "Gross/operating/net margin percentages over periods.")]
    MarginTrend {
        periods: Vec<String>,
        gross_margins: Vec<f64>,
        operating_margins: Vec<f64>,
        #[serde(default)]
        net_margins: Option<Vec<f64>>,
    },
}

impl ChartSpec {
    /// The `type` tag this spec is serialized under.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IncomeStatementSankey(_) => "income_statement_sankey",
            Self::RevenueBridge(_) => "revenue_bridge",
            Self::ProfitWalkdown(_) => "profit_walkdown",
            Self::Bar { .. } => "bar",
            Self::GroupedBar { .. } => "grouped_bar",
            Self::RevenueSegments { .. } => "revenue_segments",
            Self::MarginComparison { .. } => "margin_comparison",
            Self::Line { .. } => "line",
            Self::MultiLine { .. } => "multi_line",
            Self::Trend { .. } => "trend",
            Self::MarginTrend { .. } => "margin_trend",
        }
    }

    pub fn default_title(&self) -> &'static str {
        match self {
            Self::IncomeStatementSankey(_) => "Income Statement Flow",
            Self::RevenueBridge(_) => "Revenue Bridge",
            Self::ProfitWalkdown(_) => "Profit Walkdown",
            Self::Bar { .. } => "Bar Chart",
            Self::GroupedBar { .. } => "Grouped Bar Chart",
            Self::RevenueSegments { .. } => "Revenue by Segment",
            Self::MarginComparison { .. } => "Margin Comparison",
            Self::Line { .. } => "Line Chart",
            Self::MultiLine { .. } => "Multi-Line Chart",
            Self::Trend { .. } => "Trend Analysis",
            Self::MarginTrend { .. } => "Margin Trends",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NegativeSubtotalPolicy {
    #[default]
    #[schemars(
        description = "Fail with an error when Gross Profit, Operating Income or Net Income is negative."
    )]
    Reject,

    #[schemars(description = "Draw the negative subtotal explicitly as a loss segment in the cost color.")]
    RenderNegative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LinkColorMode {
    #[default]
    #[schemars(description = "Links inherit the color of the node they leave.")]
    Source,

    #[schemars(description = "Links take the color of the node they enter.")]
    Target,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ChartOptions {
    #[schemars(description = "Chart title. A per-chart default is used when omitted.")]
    pub title: Option<String>,

    #[schemars(
        description = "Theme name: default, corporate, dark, apple, tech, financial or minimal. Unknown names fall back to default."
    )]
    pub theme: String,

    #[schemars(
        description = "Multi-series palette: default, corporate, tech, pastel or vibrant. Unknown names fall back to default."
    )]
    pub palette: String,

    #[schemars(description = "Width in pixels. A per-chart default is used when omitted.")]
    pub width: Option<u32>,

    #[schemars(description = "Height in pixels. A per-chart default is used when omitted.")]
    pub height: Option<u32>,

    #[schemars(description = "Whether node and bar labels carry formatted values.")]
    pub show_values: bool,

    #[schemars(description = "Currency symbol prepended to value labels.")]
    pub currency_symbol: String,

    #[schemars(description = "What to do when a computed subtotal is negative.")]
    pub negative_subtotals: NegativeSubtotalPolicy,

    #[schemars(description = "How Sankey links are colored.")]
    pub link_colors: LinkColorMode,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: None,
            theme: "default".to_string(),
            palette: "default".to_string(),
            width: None,
            height: None,
            show_values: true,
            currency_symbol: "$".to_string(),
            negative_subtotals: NegativeSubtotalPolicy::default(),
            link_colors: LinkColorMode::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChartRequest {
    #[schemars(description = "The chart to build and its input figures.")]
    pub chart: ChartSpec,

    #[serde(default)]
    #[schemars(description = "Presentation options. Every field is optional.")]
    pub options: ChartOptions,
}

impl ChartRequest {
    pub fn new(chart: ChartSpec) -> Self {
        Self {
            chart,
            options: ChartOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ChartOptions) -> Self {
        self.options = options;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ChartRequest)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

fn default_true() -> bool {
    true
}
