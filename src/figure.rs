use crate::error::Result;
use crate::sankey::{FlowGraph, NodeCategory};
use crate::schema::{BarMode, ChartOptions, Orientation};
use crate::series::{BarChart, ChartSeries, LineChart};
use crate::theme::ThemePalette;
use crate::utils::format_currency;
use crate::waterfall::{BarKind, WaterfallSequence};
use crate::Chart;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Renderer-agnostic chart description in Plotly's figure format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub data: Vec<Value>,
    pub layout: Value,
}

impl Figure {
    pub fn from_chart(chart: &Chart, theme: &ThemePalette, options: &ChartOptions) -> Self {
        match chart {
            Chart::Flow(graph) => Self::sankey(graph, theme, options),
            Chart::Waterfall(sequence) => Self::waterfall(sequence, theme, options),
            Chart::Bar(bars) => Self::bars(bars, theme, options),
            Chart::Line(lines) => Self::lines(lines, theme, options),
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.layout
            .get("title")
            .and_then(|t| t.get("text"))
            .and_then(Value::as_str)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn sankey(graph: &FlowGraph, theme: &ThemePalette, options: &ChartOptions) -> Self {
        let values = graph.node_values();

        let labels: Vec<String> = graph
            .nodes
            .iter()
            .zip(&values)
            .map(|(node, &value)| {
                if !options.show_values || value <= 0.0 {
                    return node.label.clone();
                }
                let shown = if node.category == NodeCategory::Loss {
                    -value
                } else {
                    value
                };
                format!(
                    "{}<br>{}",
                    node.label,
                    format_currency(shown, &options.currency_symbol)
                )
            })
            .collect();

        let trace = json!({
            "type": "sankey",
            "node": {
                "pad": 20,
                "thickness": 25,
                "line": {"color": "white", "width": 0.5},
                "label": labels,
                "color": graph.nodes.iter().map(|n| n.color.as_str()).collect::<Vec<_>>(),
            },
            "link": {
                "source": graph.edges.iter().map(|e| e.source).collect::<Vec<_>>(),
                "target": graph.edges.iter().map(|e| e.target).collect::<Vec<_>>(),
                "value": graph.edges.iter().map(|e| e.value).collect::<Vec<_>>(),
                "color": graph.edges.iter().map(|e| e.color.as_str()).collect::<Vec<_>>(),
            },
        });

        let mut layout = base_layout(theme, options, "Income Statement Flow", (1200, 600));
        layout["margin"] = json!({"l": 50, "r": 50, "t": 80, "b": 50});
        layout["font"]["size"] = json!(12);

        Self {
            data: vec![trace],
            layout,
        }
    }

    fn waterfall(sequence: &WaterfallSequence, theme: &ThemePalette, options: &ChartOptions) -> Self {
        let measure: Vec<&str> = sequence
            .bars
            .iter()
            .map(|bar| match bar.kind {
                BarKind::Start => "absolute",
                BarKind::Increase | BarKind::Decrease => "relative",
                BarKind::Total | BarKind::End => "total",
            })
            .collect();

        let text: Vec<String> = sequence
            .bars
            .iter()
            .map(|bar| {
                let shown = if bar.kind.is_absolute() {
                    bar.delta
                } else {
                    bar.delta.abs()
                };
                format_currency(shown, &options.currency_symbol)
            })
            .collect();

        let trace = json!({
            "type": "waterfall",
            "name": "",
            "orientation": "v",
            "measure": measure,
            "x": sequence.bars.iter().map(|b| b.label.as_str()).collect::<Vec<_>>(),
            "y": sequence.bars.iter().map(|b| b.delta).collect::<Vec<_>>(),
            "text": if options.show_values { json!(text) } else { Value::Null },
            "textposition": "outside",
            "connector": {"line": {"color": theme.grid}},
            "increasing": {"marker": {"color": theme.profit}},
            "decreasing": {"marker": {"color": theme.cost}},
            "totals": {"marker": {"color": theme.revenue}},
        });

        let mut layout = base_layout(theme, options, "Waterfall Chart", (1000, 500));
        layout["showlegend"] = json!(false);
        layout["xaxis"] = json!({"showgrid": false, "showline": true, "linecolor": theme.grid});
        layout["yaxis"] = json!({
            "showgrid": true,
            "gridcolor": theme.grid,
            "showline": true,
            "linecolor": theme.grid,
            "tickprefix": options.currency_symbol,
            "tickformat": ",.0f",
        });

        Self {
            data: vec![trace],
            layout,
        }
    }

    fn bars(chart: &BarChart, theme: &ThemePalette, options: &ChartOptions) -> Self {
        let horizontal = chart.orientation == Orientation::Horizontal;

        let data = chart
            .series
            .iter()
            .map(|series| {
                let (x, y) = if horizontal {
                    (json!(series.values), json!(chart.categories))
                } else {
                    (json!(chart.categories), json!(series.values))
                };
                json!({
                    "type": "bar",
                    "name": series.name,
                    "x": x,
                    "y": y,
                    "orientation": if horizontal { "h" } else { "v" },
                    "marker": {"color": marker_color(series)},
                    "text": point_labels(series, options),
                    "textposition": if horizontal { "auto" } else { "outside" },
                })
            })
            .collect();

        let (default_title, size) = if horizontal {
            ("Bar Chart", (800, 400))
        } else if chart.series.len() > 1 {
            ("Grouped Bar Chart", (900, 500))
        } else {
            ("Bar Chart", (800, 500))
        };

        let mut layout = base_layout(theme, options, default_title, size);
        layout["barmode"] = json!(match chart.mode {
            BarMode::Group => "group",
            BarMode::Stack => "stack",
        });
        layout["showlegend"] = json!(chart.series.len() > 1);
        layout["legend"] = legend();
        let (category_axis, value_axis) = if horizontal {
            ("yaxis", "xaxis")
        } else {
            ("xaxis", "yaxis")
        };
        layout[category_axis] = json!({"showgrid": false, "showline": true, "linecolor": theme.grid});
        layout[value_axis] = json!({
            "showgrid": true,
            "gridcolor": theme.grid,
            "showline": true,
            "linecolor": theme.grid,
        });
        if horizontal {
            layout["margin"]["l"] = json!(120);
        }

        Self { data, layout }
    }

    fn lines(chart: &LineChart, theme: &ThemePalette, options: &ChartOptions) -> Self {
        let data = chart
            .series
            .iter()
            .map(|series| {
                let mut mode = if chart.show_markers {
                    "lines+markers".to_string()
                } else {
                    "lines".to_string()
                };
                if series.labels.is_some() && options.show_values {
                    mode.push_str("+text");
                }

                let mut trace = json!({
                    "type": "scatter",
                    "name": series.name,
                    "mode": mode,
                    "x": chart.x_values,
                    "y": series.values,
                    "line": {"color": series.color, "width": 2.5},
                    "text": point_labels(series, options),
                    "textposition": "top center",
                });
                if chart.show_markers {
                    trace["marker"] = json!({"size": 8, "color": series.color});
                }
                if let Some(fill) = &chart.fill {
                    trace["fill"] = json!("tozeroy");
                    trace["fillcolor"] = json!(fill);
                }
                trace
            })
            .collect();

        let annotations: Vec<Value> = chart
            .annotations
            .iter()
            .map(|a| {
                json!({
                    "x": a.x,
                    "y": a.y,
                    "text": a.text,
                    "showarrow": false,
                    "yshift": 30,
                    "font": {"size": 9, "color": a.color},
                })
            })
            .collect();

        let default_title = if annotations.is_empty() {
            "Line Chart"
        } else {
            "Trend Analysis"
        };

        let mut layout = base_layout(theme, options, default_title, (900, 500));
        layout["margin"]["l"] = json!(70);
        layout["showlegend"] = json!(chart.series.len() > 1);
        layout["legend"] = legend();
        layout["annotations"] = json!(annotations);
        layout["xaxis"] = json!({"showgrid": true, "gridcolor": theme.grid, "showline": true, "linecolor": theme.grid});
        layout["yaxis"] = json!({"showgrid": true, "gridcolor": theme.grid, "showline": true, "linecolor": theme.grid});
        if let Some(y_title) = &chart.y_title {
            layout["yaxis"]["title"] = json!({"text": y_title});
        }

        Self { data, layout }
    }
}

fn base_layout(
    theme: &ThemePalette,
    options: &ChartOptions,
    default_title: &str,
    (width, height): (u32, u32),
) -> Value {
    json!({
        "title": {
            "text": options.title.as_deref().unwrap_or(default_title),
            "font": {"size": 18, "color": theme.text},
            "x": 0.5,
        },
        "font": {"family": "Arial", "color": theme.text},
        "paper_bgcolor": theme.background,
        "plot_bgcolor": theme.background,
        "width": options.width.unwrap_or(width),
        "height": options.height.unwrap_or(height),
        "margin": {"l": 60, "r": 40, "t": 80, "b": 60},
    })
}

fn legend() -> Value {
    json!({"orientation": "h", "yanchor": "bottom", "y": 1.02, "xanchor": "right", "x": 1})
}

fn marker_color(series: &ChartSeries) -> Value {
    match &series.point_colors {
        Some(colors) => json!(colors),
        None => json!(series.color),
    }
}

fn point_labels(series: &ChartSeries, options: &ChartOptions) -> Value {
    match &series.labels {
        Some(labels) if options.show_values => json!(labels),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sankey::SankeyBuilder;
    use crate::schema::{line_items, IncomeStatementFlow};
    use crate::series::{revenue_segment_chart, trend_chart};
    use crate::theme::{get_palette, get_theme};
    use crate::waterfall::{WaterfallSequencer, WaterfallStep};

    fn flow_figure(options: &ChartOptions) -> Figure {
        let theme = get_theme("default");
        let flow = IncomeStatementFlow {
            revenue_sources: line_items([("iPhone", 205.5e9), ("Services", 78.1e9)]),
            cost_of_revenue: 150.0e9,
            operating_expenses: line_items([("R&D", 26.2e9)]),
            other_expenses: vec![],
        };
        let graph = SankeyBuilder::new(theme).build(&flow).unwrap();
        Figure::from_chart(&Chart::Flow(graph), &theme, options)
    }

    #[test]
    fn test_sankey_figure() {
        let figure = flow_figure(&ChartOptions::default());

        assert_eq!(figure.data.len(), 1);
        let trace = &figure.data[0];
        assert_eq!(trace["type"], "sankey");
        assert_eq!(trace["node"]["label"][0], "iPhone<br>$205.5B");
        assert_eq!(trace["link"]["source"][0], 0);
        assert_eq!(trace["link"]["target"][0], 2);
        assert_eq!(figure.title(), Some("Income Statement Flow"));
        assert_eq!(figure.layout["width"], 1200);
    }

    #[test]
    fn test_sankey_figure_without_values() {
        let options = ChartOptions {
            show_values: false,
            title: Some("Apple FY22".to_string()),
            width: Some(800),
            ..ChartOptions::default()
        };
        let figure = flow_figure(&options);

        assert_eq!(figure.data[0]["node"]["label"][0], "iPhone");
        assert_eq!(figure.title(), Some("Apple FY22"));
        assert_eq!(figure.layout["width"], 800);
        assert_eq!(figure.layout["height"], 600);
    }

    #[test]
    fn test_waterfall_figure_measures() {
        let theme = get_theme("dark");
        let steps = vec![
            WaterfallStep::Change(("Price".to_string(), 5e6).into()),
            WaterfallStep::Subtotal("Subtotal".to_string()),
            WaterfallStep::Change(("Churn".to_string(), -2e6).into()),
        ];
        let sequence = WaterfallSequencer::new(theme)
            .sequence("Q3", 80e6, &steps, "Q4")
            .unwrap();

        let figure = Figure::from_chart(&Chart::Waterfall(sequence), &theme, &ChartOptions::default());
        let trace = &figure.data[0];

        assert_eq!(
            trace["measure"],
            json!(["absolute", "relative", "total", "relative", "total"])
        );
        assert_eq!(trace["text"][3], "$2.0M");
        assert_eq!(trace["increasing"]["marker"]["color"], theme.profit);
        assert_eq!(figure.layout["paper_bgcolor"], "#1C2833");
    }

    #[test]
    fn test_segment_figure_is_horizontal() {
        let chart = revenue_segment_chart(
            &line_items([("Mac", 40.2e9), ("iPhone", 205.5e9)]),
            &get_palette("default"),
            false,
            "$",
        )
        .unwrap();

        let figure = Figure::from_chart(&Chart::Bar(chart), &get_theme("default"), &ChartOptions::default());
        let trace = &figure.data[0];

        assert_eq!(trace["orientation"], "h");
        assert_eq!(trace["y"], json!(["iPhone", "Mac"]));
        assert_eq!(trace["marker"]["color"], json!(["#A23B72", "#2E86AB"]));
        assert_eq!(figure.layout["height"], 400);
    }

    #[test]
    fn test_trend_figure_annotations() {
        let theme = get_theme("default");
        let chart = trend_chart(
            &["Q1".to_string(), "Q2".to_string()],
            &[85e6, 92e6],
            &theme,
            true,
            "$",
        )
        .unwrap();

        let figure = Figure::from_chart(&Chart::Line(chart), &theme, &ChartOptions::default());

        assert_eq!(figure.data[0]["mode"], "lines+markers+text");
        assert_eq!(figure.layout["annotations"][0]["text"], "+8.2%");
        assert_eq!(figure.title(), Some("Trend Analysis"));
    }

    #[test]
    fn test_figure_json() {
        let json = flow_figure(&ChartOptions::default()).to_json().unwrap();
        assert!(json.contains("\"type\":\"sankey\""));
    }
}
