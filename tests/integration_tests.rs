use financial_charts::*;
use std::fs;

fn apple_fy22() -> IncomeStatementFlow {
    IncomeStatementFlow {
        revenue_sources: line_items([
            ("iPhone", 205.5e9),
            ("Mac", 40.2e9),
            ("iPad", 29.3e9),
            ("Wearables", 41.2e9),
            ("Services", 78.1e9),
        ]),
        cost_of_revenue: 223.6e9,
        operating_expenses: line_items([("R&D", 26.2e9), ("SG&A", 25.1e9)]),
        other_expenses: line_items([("Tax", 19.3e9), ("Other", 0.3e9)]),
    }
}

fn default_theme() -> ThemePalette {
    get_theme("default")
}

#[test]
fn test_gross_profit_outflow_matches_revenue_less_cost() {
    let flow = apple_fy22();
    let graph = SankeyBuilder::new(default_theme()).build(&flow).unwrap();

    let gross_profit = graph.index_of("Gross Profit").unwrap();
    let expected: f64 = flow.revenue_sources.iter().map(|r| r.amount).sum::<f64>() - flow.cost_of_revenue;

    assert_eq!(graph.incoming_total(gross_profit), expected);
    assert!((graph.outgoing_total(gross_profit) - expected).abs() <= expected * 1e-12);
}

#[test]
fn test_node_count_and_edge_indices() {
    let flow = apple_fy22();
    let graph = SankeyBuilder::new(default_theme()).build(&flow).unwrap();

    let expected_nodes = flow.revenue_sources.len()
        + flow.operating_expenses.len()
        + flow.other_expenses.len()
        + 5;
    assert_eq!(graph.node_count(), expected_nodes);

    for edge in &graph.edges {
        assert!(edge.source < graph.node_count());
        assert!(edge.target < graph.node_count());
        assert!(edge.value >= 0.0);
    }
}

#[test]
fn test_bridge_bar_count_and_end_value() {
    let changes = line_items([
        ("Price", 5e6),
        ("Volume", -2e6),
        ("New Customers", 12e6),
        ("Churn", -7e6),
    ]);
    let bridge = RevenueBridge {
        start_label: "Q3 Revenue".to_string(),
        start_value: 80e6,
        changes: changes.clone(),
        end_label: "Q4 Revenue".to_string(),
    };

    let sequence = WaterfallSequencer::new(default_theme())
        .revenue_bridge(&bridge)
        .unwrap();

    assert_eq!(sequence.len(), changes.len() + 2);
    let expected = 80e6 + changes.iter().map(|c| c.amount).sum::<f64>();
    assert!((sequence.end_value().unwrap() - expected).abs() < 1e-6);
    assert!(sequence.is_continuous(1e-6));
}

#[test]
fn test_bridge_preserves_input_order() {
    let bridge = RevenueBridge {
        start_label: "Start".to_string(),
        start_value: 100e6,
        changes: line_items([("Price", 5e6), ("Volume", -2e6)]),
        end_label: "End".to_string(),
    };

    let sequence = WaterfallSequencer::new(default_theme())
        .revenue_bridge(&bridge)
        .unwrap();
    let bars = &sequence.bars;

    let labels: Vec<&str> = bars.iter().map(|b| b.label.as_str()).collect();
    assert_eq!(labels, vec!["Start", "Price", "Volume", "End"]);
    assert_eq!(bars[1].base, 100e6);
    assert!((bars[2].base - (100e6 + 5e6 - 2e6)).abs() < 1e-6);
    assert_eq!(bars[2].kind, BarKind::Decrease);
}

#[test]
fn test_sankey_build_is_idempotent() {
    let flow = apple_fy22();
    let builder = SankeyBuilder::new(get_theme("tech"));

    let first = builder.build(&flow).unwrap();
    let second = builder.build(&flow).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_profit_walkdown_net_income() {
    let walkdown = ProfitWalkdown {
        revenue: 100e6,
        cost_of_goods_sold: 60e6,
        operating_expenses: line_items([("R&D", 10e6), ("SG&A", 15e6)]),
        other_items: line_items([("Tax", -3e6)]),
        show_subtotals: true,
    };

    let sequence = WaterfallSequencer::new(default_theme())
        .profit_walkdown(&walkdown)
        .unwrap();

    let end = sequence.last().unwrap();
    assert_eq!(end.kind, BarKind::End);
    assert_eq!(end.label, "Net Income");
    assert!((end.delta - 12e6).abs() < 1e-6);

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
            "Tax",
            "Net Income"
        ]
    );
}

#[test]
fn test_unknown_theme_falls_back_to_default() {
    assert_eq!(get_theme("nonexistent"), default_theme());
    assert_eq!(get_theme("nonexistent").name, "default");
}

#[test]
fn test_json_request_end_to_end() -> anyhow::Result<()> {
    let json = r#"{
        "chart": {
            "type": "income_statement_sankey",
            "revenue_sources": [
                {"label": "Cloud", "amount": 60000000.0},
                {"label": "Licenses", "amount": 40000000.0}
            ],
            "cost_of_revenue": 35000000.0,
            "operating_expenses": [{"label": "S&M", "amount": 30000000.0}],
            "other_expenses": [{"label": "Tax", "amount": 5000000.0}]
        },
        "options": {"theme": "corporate", "title": "FY24"}
    }"#;

    let request = ChartRequest::from_json_str(json)?;
    let figure = build_figure(&request)?;

    assert_eq!(figure.title(), Some("FY24"));
    let labels = figure.data[0]["node"]["label"]
        .as_array()
        .expect("node labels");
    assert_eq!(labels.len(), 2 + 1 + 1 + 5);
    assert!(labels.iter().any(|l| l == "Net Income<br>$30.0M"));
    assert_eq!(figure.layout["paper_bgcolor"], get_theme("corporate").background);

    let round_trip: ChartRequest = serde_json::from_str(&serde_json::to_string(&request)?)?;
    assert_eq!(round_trip, request);

    Ok(())
}

#[test]
fn test_request_from_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("trend.json");
    fs::write(
        &path,
        r#"{"chart": {"type": "trend", "periods": ["Q1", "Q2", "Q3"], "values": [85e6, 92e6, 0.0]}}"#,
    )?;

    let request = ChartRequest::from_path(&path)?;
    match build_chart(&request)? {
        Chart::Line(chart) => {
            assert_eq!(chart.annotations.len(), 2);
            assert_eq!(chart.annotations[1].text, "-100.0%");
        }
        other => panic!("expected a line chart, got {:?}", other),
    }

    Ok(())
}

#[test]
fn test_html_export_writes_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("income_statement.html");
    let request = ChartRequest::new(ChartSpec::IncomeStatementSankey(apple_fy22()));

    let written = render_chart(&request, &path).unwrap();

    assert_eq!(written, path);
    let html = fs::read_to_string(&path).unwrap();
    assert!(html.contains("\"type\":\"sankey\""));
    assert!(html.contains("<title>Income Statement Flow</title>"));
}

#[test]
fn test_png_export_with_html_renderer_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("income_statement.png");
    let request = ChartRequest::new(ChartSpec::IncomeStatementSankey(apple_fy22()));

    let result = ChartProcessor::render_to_path(&request, &HtmlRenderer::new(), &path);

    assert!(matches!(result, Err(ChartError::UnsupportedFormat(_))));
    assert!(!path.exists());
}

#[test]
fn test_invalid_input_fails_before_export() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.html");
    let request = ChartRequest::new(ChartSpec::IncomeStatementSankey(IncomeStatementFlow {
        revenue_sources: vec![],
        cost_of_revenue: 0.0,
        operating_expenses: vec![],
        other_expenses: vec![],
    }));

    let result = render_chart(&request, &path);

    assert!(matches!(result, Err(ChartError::InputShapeError { .. })));
    assert!(!path.exists());
}

#[test]
fn test_duplicate_labels_rejected() {
    let mut flow = apple_fy22();
    flow.operating_expenses = line_items([("R&D", 1.0), ("R&D", 2.0)]);

    let result = SankeyBuilder::new(default_theme()).build(&flow);
    assert!(matches!(result, Err(ChartError::InputShapeError { .. })));
}

#[test]
fn test_flow_csv_parses() -> anyhow::Result<()> {
    let graph = SankeyBuilder::new(default_theme()).build(&apple_fy22())?;
    let csv_text = graph.to_csv();

    let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
    let headers = reader.headers()?.clone();
    assert_eq!(headers.iter().collect::<Vec<_>>(), vec!["Source", "Target", "Value", "Negative"]);

    let mut rows = 0;
    for record in reader.records() {
        let record = record?;
        let value: f64 = record[2].parse()?;
        assert!(value >= 0.0);
        assert_eq!(&record[3], "false");
        rows += 1;
    }
    assert_eq!(rows, graph.edge_count());

    Ok(())
}

#[test]
fn test_waterfall_csv_running_total() -> anyhow::Result<()> {
    let bridge = RevenueBridge {
        start_label: "FY22".to_string(),
        start_value: 394.3e9,
        changes: line_items([("iPhone", 5.5e9), ("Mac", -11.6e9)]),
        end_label: "FY23".to_string(),
    };
    let sequence = WaterfallSequencer::new(default_theme()).revenue_bridge(&bridge)?;

    let csv_text = sequence.to_csv();
    let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
    let records: Vec<csv::StringRecord> = reader.records().collect::<std::result::Result<_, _>>()?;

    assert_eq!(records.len(), 4);
    let last_running: f64 = records[3][4].parse()?;
    assert!((last_running - sequence.end_value().unwrap()).abs() < 0.01);

    Ok(())
}

#[test]
fn test_summary_markdown_flags_losses() {
    let flow = IncomeStatementFlow {
        revenue_sources: line_items([("Subscriptions", 12e6)]),
        cost_of_revenue: 4e6,
        operating_expenses: line_items([("R&D", 9e6), ("S&M", 2e6)]),
        other_expenses: vec![],
    };

    let markdown = income_statement_summary(&flow).to_markdown("Startup FY24", "$");

    assert!(markdown.contains("| **Gross Profit** | $8.0M | 66.7% |"));
    assert!(markdown.contains("> **Loss:** Operating Income is -$3.0M"));
    assert!(markdown.contains("> **Loss:** Net Income is -$3.0M"));
}

#[test]
fn test_every_theme_renders_a_walkdown() {
    let walkdown = ProfitWalkdown {
        revenue: 50e6,
        cost_of_goods_sold: 20e6,
        operating_expenses: line_items([("Opex", 10e6)]),
        other_items: vec![],
        show_subtotals: false,
    };

    for name in list_themes() {
        let request = ChartRequest::new(ChartSpec::ProfitWalkdown(walkdown.clone())).with_options(
            ChartOptions {
                theme: name.to_string(),
                ..ChartOptions::default()
            },
        );
        let figure = build_figure(&request).unwrap();
        assert_eq!(figure.layout["plot_bgcolor"], get_theme(name).background);
        assert_eq!(figure.data[0]["x"].as_array().unwrap().len(), 4);
    }
}
