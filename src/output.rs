use analytics::{EventStudyReport, TestResult};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Table};

/// Prints the windows, the per-asset table and the pairwise table.
pub fn print_report(report: &EventStudyReport) {
    println!("\nEvent study {} ({})", report.run_id, report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Market proxy: {}", report.market_ticker);
    println!(
        "Estimation window: {} to {} ({} days)",
        report.estimation_window.start, report.estimation_window.end, report.estimation_window.rows
    );
    println!(
        "Event window:      {} to {} ({} days)",
        report.event_window.start, report.event_window.end, report.event_window.rows
    );
    println!(
        "Variance: {:?}, difference test: {:?}",
        report.variance_convention, report.difference_variance
    );

    let mut assets = Table::new();
    assets.load_preset(UTF8_FULL).set_header(vec![
        "Asset", "Alpha", "Beta", "Resid. var", "CAR", "t", "dof", "p-value",
    ]);
    for result in &report.assets {
        assets.add_row(vec![
            Cell::new(&result.ticker),
            number(result.model.alpha(), 6),
            number(result.model.beta(), 4),
            number(result.model.residual_variance(), 8),
            number(result.car.terminal(), 6),
            number(result.test.statistic, 3),
            dof(&result.test),
            p_value(result.p_value),
        ]);
    }
    println!("\n{assets}");

    if report.comparisons.is_empty() {
        return;
    }

    let mut pairs = Table::new();
    pairs
        .load_preset(UTF8_FULL)
        .set_header(vec!["Pair", "CAR diff", "t", "dof", "p-value"]);
    for comparison in &report.comparisons {
        pairs.add_row(vec![
            Cell::new(format!("{} - {}", comparison.left, comparison.right)),
            number(comparison.car_difference, 6),
            number(comparison.test.statistic, 3),
            dof(&comparison.test),
            p_value(comparison.p_value),
        ]);
    }
    println!("\n{pairs}");
}

fn number(value: f64, decimals: usize) -> Cell {
    Cell::new(format!("{value:.decimals$}")).set_alignment(CellAlignment::Right)
}

fn dof(test: &TestResult) -> Cell {
    Cell::new(test.degrees_of_freedom).set_alignment(CellAlignment::Right)
}

fn p_value(p: Option<f64>) -> Cell {
    let text = p.map_or_else(|| "n/a".to_string(), |p| format!("{p:.4}"));
    Cell::new(text).set_alignment(CellAlignment::Right)
}
