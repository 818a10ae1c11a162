//! Bar and line charts over categories or periods.

use crate::error::{ChartError, Result};
use crate::schema::{BarMode, LineItem, NamedSeries, Orientation};
use crate::theme::{Rgb, SeriesPalette, ThemePalette};
use crate::utils::{format_currency, format_percent, growth_rate, sum_amounts, validate_label};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub name: String,
    pub values: Vec<f64>,
    pub color: String,
    /// Text drawn on or next to each point, one per value.
    pub labels: Option<Vec<String>>,
    /// Per-point colors overriding `color`.
    pub point_colors: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarChart {
    pub categories: Vec<String>,
    pub series: Vec<ChartSeries>,
    pub mode: BarMode,
    pub orientation: Orientation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub x: String,
    pub y: f64,
    pub text: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineChart {
    pub x_values: Vec<String>,
    pub series: Vec<ChartSeries>,
    pub show_markers: bool,
    /// Fill color for the area under a single line.
    pub fill: Option<String>,
    pub annotations: Vec<Annotation>,
    pub y_title: Option<String>,
}

fn validate_series(context: &str, categories: &[String], series: &[NamedSeries]) -> Result<()> {
    if categories.is_empty() {
        return Err(ChartError::input_shape(context, "at least one category is required"));
    }
    if series.is_empty() {
        return Err(ChartError::input_shape(context, "at least one series is required"));
    }

    for s in series {
        validate_label(context, &s.name)?;
        if s.values.len() != categories.len() {
            return Err(ChartError::input_shape(
                context,
                format!(
                    "series '{}' has {} values for {} categories",
                    s.name,
                    s.values.len(),
                    categories.len()
                ),
            ));
        }
        if let Some(bad) = s.values.iter().find(|v| !v.is_finite()) {
            return Err(ChartError::input_shape(
                context,
                format!("series '{}' contains a non-finite value ({})", s.name, bad),
            ));
        }
    }

    Ok(())
}

fn colored_series(series: &[NamedSeries], palette: &SeriesPalette) -> Vec<ChartSeries> {
    series
        .iter()
        .enumerate()
        .map(|(i, s)| ChartSeries {
            name: s.name.clone(),
            values: s.values.clone(),
            color: palette.color_at(i).to_string(),
            labels: None,
            point_colors: None,
        })
        .collect()
}

pub fn bar_chart(
    categories: &[String],
    values: &[f64],
    theme: &ThemePalette,
    color: Option<&str>,
    orientation: Orientation,
    currency_symbol: &str,
) -> Result<BarChart> {
    let series = [NamedSeries::new("Value", values.to_vec())];
    validate_series("bar chart", categories, &series)?;

    Ok(BarChart {
        categories: categories.to_vec(),
        series: vec![ChartSeries {
            name: "Value".to_string(),
            values: values.to_vec(),
            color: color.unwrap_or(theme.revenue).to_string(),
            labels: Some(
                values
                    .iter()
                    .map(|v| format_currency(*v, currency_symbol))
                    .collect(),
            ),
            point_colors: None,
        }],
        mode: BarMode::Group,
        orientation,
    })
}

pub fn grouped_bar_chart(
    categories: &[String],
    series: &[NamedSeries],
    palette: &SeriesPalette,
    mode: BarMode,
) -> Result<BarChart> {
    validate_series("grouped bar chart", categories, series)?;
    debug!(
        "Grouped bar chart with {} series over {} categories ({:?})",
        series.len(),
        categories.len(),
        mode
    );

    Ok(BarChart {
        categories: categories.to_vec(),
        series: colored_series(series, palette),
        mode,
        orientation: Orientation::Vertical,
    })
}

/// Gross, operating and (optionally) net margins side by side per company.
pub fn margin_comparison_chart(
    companies: &[String],
    gross_margins: &[f64],
    operating_margins: &[f64],
    net_margins: Option<&[f64]>,
    palette: &SeriesPalette,
) -> Result<BarChart> {
    let series = margin_series(gross_margins, operating_margins, net_margins);
    let mut chart = grouped_bar_chart(companies, &series, palette, BarMode::Group)?;

    for s in &mut chart.series {
        s.labels = Some(s.values.iter().map(|v| format!("{:.1}%", v)).collect());
    }

    Ok(chart)
}

/// Horizontal revenue breakdown, largest segment first.
pub fn revenue_segment_chart(
    segments: &[LineItem],
    palette: &SeriesPalette,
    show_percentage: bool,
    currency_symbol: &str,
) -> Result<BarChart> {
    const CONTEXT: &str = "revenue segment chart";

    if segments.is_empty() {
        return Err(ChartError::input_shape(CONTEXT, "at least one segment is required"));
    }
    for segment in segments {
        validate_label(CONTEXT, &segment.label)?;
        if !segment.amount.is_finite() {
            return Err(ChartError::input_shape(
                CONTEXT,
                format!("segment '{}' has a non-finite amount", segment.label),
            ));
        }
    }

    let total = sum_amounts(segments);

    // Colors are assigned in input order so a segment keeps its color when
    // its rank changes between periods.
    let mut ranked: Vec<(usize, &LineItem)> = segments.iter().enumerate().collect();
    ranked.sort_by(|a, b| b.1.amount.total_cmp(&a.1.amount));

    let labels = ranked
        .iter()
        .map(|(_, s)| {
            let value = format_currency(s.amount, currency_symbol);
            if show_percentage && total != 0.0 {
                format!("{} ({:.1}%)", value, s.amount / total * 100.0)
            } else {
                value
            }
        })
        .collect();

    let series = ChartSeries {
        name: "Revenue".to_string(),
        values: ranked.iter().map(|(_, s)| s.amount).collect(),
        color: palette.color_at(0).to_string(),
        labels: Some(labels),
        point_colors: Some(
            ranked
                .iter()
                .map(|(i, _)| palette.color_at(*i).to_string())
                .collect(),
        ),
    };

    let chart = BarChart {
        categories: ranked.iter().map(|(_, s)| s.label.clone()).collect(),
        series: vec![series],
        mode: BarMode::Group,
        orientation: Orientation::Horizontal,
    };

    Ok(chart)
}

pub fn line_chart(
    x_values: &[String],
    y_values: &[f64],
    theme: &ThemePalette,
    fill: bool,
) -> Result<LineChart> {
    let series = [NamedSeries::new("Value", y_values.to_vec())];
    validate_series("line chart", x_values, &series)?;

    let fill = if fill {
        Rgb::from_hex(theme.revenue).map(|rgb| rgb.to_rgba(0.2))
    } else {
        None
    };

    Ok(LineChart {
        x_values: x_values.to_vec(),
        series: vec![ChartSeries {
            name: "Value".to_string(),
            values: y_values.to_vec(),
            color: theme.revenue.to_string(),
            labels: None,
            point_colors: None,
        }],
        show_markers: true,
        fill,
        annotations: Vec::new(),
        y_title: None,
    })
}

pub fn multi_line_chart(
    x_values: &[String],
    series: &[NamedSeries],
    palette: &SeriesPalette,
) -> Result<LineChart> {
    validate_series("multi-line chart", x_values, series)?;

    Ok(LineChart {
        x_values: x_values.to_vec(),
        series: colored_series(series, palette),
        show_markers: true,
        fill: None,
        annotations: Vec::new(),
        y_title: None,
    })
}

/// A single line with value labels. With `show_growth`, every period after
/// the first is annotated with its growth; periods following a zero value
/// get no annotation.
pub fn trend_chart(
    periods: &[String],
    values: &[f64],
    theme: &ThemePalette,
    show_growth: bool,
    currency_symbol: &str,
) -> Result<LineChart> {
    let mut chart = line_chart(periods, values, theme, false)?;

    chart.series[0].labels = Some(
        values
            .iter()
            .map(|v| format_currency(*v, currency_symbol))
            .collect(),
    );

    if !show_growth {
        return Ok(chart);
    }

    chart.annotations = values
        .windows(2)
        .zip(periods.iter().skip(1))
        .filter_map(|(pair, period)| {
            let growth = growth_rate(pair[0], pair[1])?;
            let color = if growth >= 0.0 { theme.profit } else { theme.cost };
            Some(Annotation {
                x: period.clone(),
                y: pair[1],
                text: format_percent(growth),
                color: color.to_string(),
            })
        })
        .collect();

    Ok(chart)
}

pub fn margin_trend_chart(
    periods: &[String],
    gross_margins: &[f64],
    operating_margins: &[f64],
    net_margins: Option<&[f64]>,
    palette: &SeriesPalette,
) -> Result<LineChart> {
    let series = margin_series(gross_margins, operating_margins, net_margins);
    let mut chart = multi_line_chart(periods, &series, palette)?;
    chart.y_title = Some("Margin (%)".to_string());
    Ok(chart)
}

fn margin_series(gross: &[f64], operating: &[f64], net: Option<&[f64]>) -> Vec<NamedSeries> {
    let mut series = vec![
        NamedSeries::new("Gross Margin", gross.to_vec()),
        NamedSeries::new("Operating Margin", operating.to_vec()),
    ];
    if let Some(net) = net {
        series.push(NamedSeries::new("Net Margin", net.to_vec()));
    }
    series
}
