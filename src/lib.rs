//! # Financial Charts
//!
//! Builds the geometry behind common financial visualizations from plain
//! figures, and hands it to a pluggable renderer.
//!
//! ## Core Concepts
//!
//! - **Flow Graph**: Income statement as a Sankey diagram, from revenue sources through
//!   Gross Profit and Operating Income down to Net Income
//! - **Waterfall Sequence**: Positioned bars for revenue bridges and profit walkdowns
//! - **Series Charts**: Bar, grouped bar, segment, line and trend charts
//! - **Themes**: Named color palettes applied uniformly to every chart
//! - **Figure**: A renderer-agnostic Plotly description of any built chart
//!
//! ## Example
//!
//! ```rust,ignore
//! use financial_charts::*;
//!
//! let request = ChartRequest::new(ChartSpec::IncomeStatementSankey(IncomeStatementFlow {
//!     revenue_sources: line_items([("iPhone", 205.5e9), ("Services", 78.1e9)]),
//!     cost_of_revenue: 150.0e9,
//!     operating_expenses: line_items([("R&D", 26.2e9), ("SG&A", 25.1e9)]),
//!     other_expenses: line_items([("Tax", 19.3e9)]),
//! }));
//!
//! let chart = build_chart(&request).unwrap();
//! render_chart(&request, "income_statement.html").unwrap();
//! ```

pub mod error;
pub mod figure;
pub mod render;
pub mod sankey;
pub mod schema;
pub mod series;
pub mod summary;
pub mod theme;
pub mod utils;
pub mod waterfall;

pub use error::{ChartError, Result};
pub use figure::Figure;
pub use render::{export_figure, ChartRenderer, HtmlRenderer, OutputFormat};
pub use sankey::{FlowEdge, FlowGraph, FlowNode, NodeCategory, SankeyBuilder};
pub use schema::*;
pub use series::*;
pub use summary::{IncomeStatementSummary, Subtotal};
pub use theme::{get_palette, get_theme, list_palettes, list_themes, SeriesPalette, ThemeName, ThemePalette};
pub use utils::{format_currency, format_magnitude, format_percent, growth_rate};
pub use waterfall::{BarKind, WaterfallBar, WaterfallSequence, WaterfallSequencer, WaterfallStep};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A built chart, ready to be turned into a [`Figure`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Chart {
    Flow(FlowGraph),
    Waterfall(WaterfallSequence),
    Bar(BarChart),
    Line(LineChart),
}

impl Chart {
    pub fn as_flow(&self) -> Option<&FlowGraph> {
        match self {
            Self::Flow(graph) => Some(graph),
            _ => None,
        }
    }

    pub fn as_waterfall(&self) -> Option<&WaterfallSequence> {
        match self {
            Self::Waterfall(sequence) => Some(sequence),
            _ => None,
        }
    }

    /// Tabular export for charts that have a natural table form.
    pub fn to_csv(&self) -> Option<String> {
        match self {
            Self::Flow(graph) => Some(graph.to_csv()),
            Self::Waterfall(sequence) => Some(sequence.to_csv()),
            Self::Bar(_) | Self::Line(_) => None,
        }
    }
}

pub struct ChartProcessor;

impl ChartProcessor {
    pub fn build(request: &ChartRequest) -> Result<Chart> {
        let options = &request.options;
        let theme = get_theme(&options.theme);
        let palette = get_palette(&options.palette);

        info!(
            "Building {} chart with theme '{}'",
            request.chart.kind(),
            theme.name
        );
        debug!(
            "Options: palette '{}', negative subtotals {:?}, link colors {:?}",
            palette.name, options.negative_subtotals, options.link_colors
        );

        let chart = match &request.chart {
            ChartSpec::IncomeStatementSankey(flow) => Chart::Flow(
                SankeyBuilder::new(theme)
                    .with_negative_policy(options.negative_subtotals)
                    .with_link_colors(options.link_colors)
                    .build(flow)?,
            ),
            ChartSpec::RevenueBridge(bridge) => Chart::Waterfall(
                WaterfallSequencer::new(theme)
                    .with_negative_policy(options.negative_subtotals)
                    .revenue_bridge(bridge)?,
            ),
            ChartSpec::ProfitWalkdown(walkdown) => Chart::Waterfall(
                WaterfallSequencer::new(theme)
                    .with_negative_policy(options.negative_subtotals)
                    .profit_walkdown(walkdown)?,
            ),
            ChartSpec::Bar {
                categories,
                values,
                color,
                orientation,
            } => Chart::Bar(bar_chart(
                categories,
                values,
                &theme,
                color.as_deref(),
                *orientation,
                &options.currency_symbol,
            )?),
            ChartSpec::GroupedBar {
                categories,
                series,
                mode,
            } => Chart::Bar(grouped_bar_chart(categories, series, &palette, *mode)?),
            ChartSpec::RevenueSegments {
                segments,
                show_percentage,
            } => Chart::Bar(revenue_segment_chart(
                segments,
                &palette,
                *show_percentage,
                &options.currency_symbol,
            )?),
            ChartSpec::MarginComparison {
                companies,
                gross_margins,
                operating_margins,
                net_margins,
            } => Chart::Bar(margin_comparison_chart(
                companies,
                gross_margins,
                operating_margins,
                net_margins.as_deref(),
                &palette,
            )?),
            ChartSpec::Line {
                x_values,
                y_values,
                fill,
            } => Chart::Line(line_chart(x_values, y_values, &theme, *fill)?),
            ChartSpec::MultiLine { x_values, series } => {
                Chart::Line(multi_line_chart(x_values, series, &palette)?)
            }
            ChartSpec::Trend {
                periods,
                values,
                show_growth,
            } => Chart::Line(trend_chart(
                periods,
                values,
                &theme,
                *show_growth,
                &options.currency_symbol,
            )?),
            ChartSpec::MarginTrend {
                periods,
                gross_margins,
                operating_margins,
                net_margins,
            } => Chart::Line(margin_trend_chart(
                periods,
                gross_margins,
                operating_margins,
                net_margins.as_deref(),
                &palette,
            )?),
        };

        Ok(chart)
    }

    pub fn figure(request: &ChartRequest) -> Result<Figure> {
        let chart = Self::build(request)?;
        let theme = get_theme(&request.options.theme);

        let mut options = request.options.clone();
        if options.title.is_none() {
            options.title = Some(request.chart.default_title().to_string());
        }

        Ok(Figure::from_chart(&chart, &theme, &options))
    }

    /// Builds the chart and exports it. Input errors surface before any
    /// file is touched.
    pub fn render_to_path(
        request: &ChartRequest,
        renderer: &dyn ChartRenderer,
        path: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        let figure = Self::figure(request)?;
        export_figure(renderer, &figure, path)
    }
}

pub fn build_chart(request: &ChartRequest) -> Result<Chart> {
    ChartProcessor::build(request)
}

pub fn build_figure(request: &ChartRequest) -> Result<Figure> {
    ChartProcessor::figure(request)
}

/// Renders `request` to an interactive HTML page at `path`.
pub fn render_chart(request: &ChartRequest, path: impl AsRef<Path>) -> Result<PathBuf> {
    ChartProcessor::render_to_path(request, &HtmlRenderer::new(), path)
}

pub fn income_statement_summary(flow: &IncomeStatementFlow) -> IncomeStatementSummary {
    IncomeStatementSummary::from_flow(flow)
}
