//! Terminal summaries of a churn run

use std::time::Duration;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use super::metrics::EvaluationReport;
use super::segments::SegmentReport;

/// Shape of the data at each stage plus per-stage timings
#[derive(Debug, Default)]
pub struct RunSummary {
    pub input_rows: usize,
    pub input_columns: usize,
    pub dropped_records: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub n_features: usize,
    pub n_trees: usize,
    pub timings: Vec<(String, Duration)>,
}

impl RunSummary {
    pub fn new(input_rows: usize, input_columns: usize) -> Self {
        Self {
            input_rows,
            input_columns,
            ..Default::default()
        }
    }

    pub fn add_timing(&mut self, stage: &str, elapsed: Duration) {
        self.timings.push((stage.to_string(), elapsed));
    }

    pub fn total_time(&self) -> Duration {
        self.timings.iter().map(|(_, d)| *d).sum()
    }

    pub fn display(&self) {
        print_section("📋", "RUN SUMMARY");

        let mut table = new_table(&["Metric", "Value"]);
        table.add_row(vec![
            Cell::new("📁 Input records"),
            Cell::new(format!("{} × {}", self.input_rows, self.input_columns)),
        ]);
        table.add_row(vec![
            Cell::new("🗑️  Dropped (unresolvable charge)"),
            Cell::new(self.dropped_records).fg(if self.dropped_records == 0 {
                Color::White
            } else {
                Color::Yellow
            }),
        ]);
        table.add_row(vec![
            Cell::new("🏋️  Training records"),
            Cell::new(self.train_rows),
        ]);
        table.add_row(vec![
            Cell::new("🧪 Evaluation records"),
            Cell::new(self.test_rows),
        ]);
        table.add_row(vec![
            Cell::new("🔢 Encoded features"),
            Cell::new(self.n_features),
        ]);
        table.add_row(vec![Cell::new("🌲 Trees"), Cell::new(self.n_trees)]);
        print_table(&table);

        if !self.timings.is_empty() {
            println!();
            let mut timing_table = new_table(&["Stage", "Time"]);
            for (stage, elapsed) in &self.timings {
                timing_table.add_row(vec![
                    Cell::new(stage),
                    Cell::new(format_duration(*elapsed)).set_alignment(CellAlignment::Right),
                ]);
            }
            timing_table.add_row(vec![
                Cell::new("Total").add_attribute(Attribute::Bold),
                Cell::new(format_duration(self.total_time()))
                    .set_alignment(CellAlignment::Right)
                    .add_attribute(Attribute::Bold),
            ]);
            print_table(&timing_table);
        }
    }
}

/// Accuracy and AUC of one seeded run
#[derive(Debug, Clone, PartialEq)]
pub struct SeedResult {
    pub seed: u64,
    pub accuracy: f64,
    pub roc_auc: Option<f64>,
}

/// Mean and population standard deviation
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 1.0 {
        format!("{:.0} ms", secs * 1000.0)
    } else {
        format!("{:.2} s", secs)
    }
}

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(
        header
            .iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    table
}

// Indent the table
fn print_table(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

fn print_section(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

fn score_color(value: f64) -> Color {
    if value >= 0.8 {
        Color::Green
    } else if value >= 0.6 {
        Color::Yellow
    } else {
        Color::Red
    }
}

/// Print accuracy, confusion matrix, per-class metrics and top importances
pub fn display_report(report: &EvaluationReport, class_names: [&str; 2], top: usize) {
    print_section("📊", "EVALUATION");

    let mut table = new_table(&["Metric", "Value"]);
    table.add_row(vec![
        Cell::new("🎯 Accuracy"),
        Cell::new(format!("{:.2}%", report.accuracy * 100.0))
            .fg(score_color(report.accuracy))
            .add_attribute(Attribute::Bold),
    ]);
    let auc = report
        .roc_auc
        .map_or_else(|| "n/a".to_string(), |v| format!("{:.4}", v));
    table.add_row(vec![
        Cell::new("📈 ROC AUC"),
        Cell::new(auc).fg(report.roc_auc.map_or(Color::White, score_color)),
    ]);
    table.add_row(vec![
        Cell::new("⚖️  Macro F1"),
        Cell::new(format!("{:.4}", report.macro_avg.f1)),
    ]);
    table.add_row(vec![
        Cell::new("⚖️  Weighted F1"),
        Cell::new(format!("{:.4}", report.weighted_avg.f1)),
    ]);
    print_table(&table);

    println!();
    let [neg, pos] = class_names;
    let mut confusion = new_table(&["True \\ Predicted", neg, pos]);
    for (class, row) in report.confusion_matrix.iter().enumerate() {
        confusion.add_row(vec![
            Cell::new(class_names[class]).add_attribute(Attribute::Bold),
            Cell::new(row[0]).set_alignment(CellAlignment::Right),
            Cell::new(row[1]).set_alignment(CellAlignment::Right),
        ]);
    }
    print_table(&confusion);

    println!();
    let mut per_class = new_table(&["Class", "Precision", "Recall", "F1", "Support"]);
    for name in class_names {
        if let Some(m) = report.per_class.get(name) {
            per_class.add_row(vec![
                Cell::new(name),
                Cell::new(format!("{:.4}", m.precision)),
                Cell::new(format!("{:.4}", m.recall)),
                Cell::new(format!("{:.4}", m.f1)),
                Cell::new(m.support).set_alignment(CellAlignment::Right),
            ]);
        }
    }
    print_table(&per_class);

    let top_features = report.top_features(top);
    if !top_features.is_empty() {
        print_section("🌲", "TOP FEATURE IMPORTANCES");
        let mut importances = new_table(&["#", "Feature", "Importance"]);
        for (rank, fi) in top_features.iter().enumerate() {
            importances.add_row(vec![
                Cell::new(rank + 1),
                Cell::new(&fi.feature),
                Cell::new(format!("{:.4}", fi.importance)).fg(Color::Cyan),
            ]);
        }
        print_table(&importances);
    }
}

/// Print the dataset profile and each segment's churn rates
pub fn display_segments(report: &SegmentReport) {
    print_section("👥", "CUSTOMER SEGMENTS");

    let profile = &report.profile;
    println!(
        "      {} customers, {} churned ({})",
        style(profile.customers).yellow().bold(),
        style(profile.churned).yellow().bold(),
        style(format!("{:.1}%", profile.churn_rate * 100.0)).red()
    );
    if let Some(charge) = profile.mean_monthly_charge {
        println!("      Mean monthly charge: {}", style(format!("{:.2}", charge)).cyan());
    }
    if let Some(tenure) = profile.mean_tenure {
        println!("      Mean tenure: {} months", style(format!("{:.1}", tenure)).cyan());
    }

    for segment in &report.segments {
        println!();
        println!("      {}", style(&segment.column).white().bold());
        let mut table = new_table(&["Segment", "Customers", "Churned", "Churn rate"]);
        for rate in &segment.rates {
            table.add_row(vec![
                Cell::new(&rate.segment),
                Cell::new(rate.customers).set_alignment(CellAlignment::Right),
                Cell::new(rate.churned).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.1}%", rate.churn_rate * 100.0))
                    .set_alignment(CellAlignment::Right),
            ]);
        }
        print_table(&table);
    }
}

/// Print one row per seed plus mean ± std of accuracy and AUC
pub fn display_seed_results(results: &[SeedResult]) {
    print_section("🎲", "REPEATED RUNS");

    let mut table = new_table(&["Seed", "Accuracy", "ROC AUC"]);
    for r in results {
        table.add_row(vec![
            Cell::new(r.seed),
            Cell::new(format!("{:.4}", r.accuracy)),
            Cell::new(r.roc_auc.map_or_else(|| "n/a".to_string(), |v| format!("{:.4}", v))),
        ]);
    }

    let accuracies: Vec<f64> = results.iter().map(|r| r.accuracy).collect();
    let aucs: Vec<f64> = results.iter().filter_map(|r| r.roc_auc).collect();
    let (acc_mean, acc_std) = mean_std(&accuracies);
    let (auc_mean, auc_std) = mean_std(&aucs);
    table.add_row(vec![
        Cell::new("mean ± std").add_attribute(Attribute::Bold),
        Cell::new(format!("{:.4} ± {:.4}", acc_mean, acc_std)).add_attribute(Attribute::Bold),
        Cell::new(format!("{:.4} ± {:.4}", auc_mean, auc_std)).add_attribute(Attribute::Bold),
    ]);
    print_table(&table);
}
