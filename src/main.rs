//! churnlens: Telecom Churn Prediction CLI Tool
//!
//! Loads customer records, prepares features, trains a random forest churn
//! classifier and writes its evaluation report.

use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use console::style;

use churnlens::cli::{resolve_config, save_config, Cli};
use churnlens::pipeline::{
    count_classes, evaluate_forest, get_column_names, load_dataset_with_stats, prepare_with_timings,
    run_pipeline_seeds, ChurnForest, PipelineOutput, StageTimings,
};
use churnlens::report::{
    display_report, display_segments, display_seed_results, export_run_artifacts,
    package_run_artifacts, segment_report, ChurnReport, RunSummary, SeedResult, BUNDLE_FILE,
};
use churnlens::utils::{
    create_progress_bar, create_spinner, finish_with_success, finish_with_warning, print_banner,
    print_completion, print_config, print_count, print_info, print_step_header, print_step_time,
    print_success, print_warning,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    let output_dir = cli.output_dir();

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&cli.input, &output_dir, &config);

    if let Some(path) = &cli.save_config {
        save_config(&config, path)?;
        print_success(&format!("Configuration written to {}", path.display()));
    }

    // Step 1: Load dataset
    print_step_header(1, "Load Dataset");
    let step_start = Instant::now();
    let columns = get_column_names(&cli.input)?;
    config.schema.validate_columns(&columns)?;
    let spinner = create_spinner("Reading records...");
    let (df, rows, cols, memory_mb) = load_dataset_with_stats(&cli.input, cli.infer_schema_length)?;
    finish_with_success(&spinner, "Dataset loaded");

    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", rows);
    println!("      Columns: {}", cols);
    println!("      Estimated memory: {:.2} MB", memory_mb);

    let mut summary = RunSummary::new(rows, cols);
    let load_elapsed = step_start.elapsed();
    summary.add_timing("Load", load_elapsed);
    print_step_time(load_elapsed);

    // Step 2: Normalize, split, encode and scale
    print_step_header(2, "Prepare Features");
    let step_start = Instant::now();
    let spinner = create_spinner("Normalizing, splitting and encoding...");
    let mut timings = StageTimings::default();
    let prepared = prepare_with_timings(&df, &config, &mut timings)?;
    finish_with_success(&spinner, "Features prepared");

    let dropped = prepared.normalized.dropped.len();
    if dropped == 0 {
        print_info("No records with an unresolvable cumulative charge");
    } else {
        print_count(
            "record(s) with an unresolvable cumulative charge",
            dropped,
            Some("(dropped, not imputed)"),
        );
    }
    let (train_neg, train_pos) = count_classes(&prepared.train.labels);
    let (test_neg, test_pos) = count_classes(&prepared.test.labels);
    println!(
        "      Training: {} records ({} churned), evaluation: {} records ({} churned)",
        style(train_neg + train_pos).yellow().bold(),
        train_pos,
        style(test_neg + test_pos).yellow().bold(),
        test_pos
    );
    print_count("encoded feature(s)", prepared.train.n_features(), None);

    summary.dropped_records = dropped;
    summary.train_rows = prepared.train.n_samples();
    summary.test_rows = prepared.test.n_samples();
    summary.n_features = prepared.train.n_features();
    summary.add_timing("Normalize + split", timings.normalize);
    summary.add_timing("Encode", timings.encode);
    summary.add_timing("Scale", timings.scale);
    print_step_time(step_start.elapsed());

    // Step 3: Fit the forest
    print_step_header(3, "Train Random Forest");
    let step_start = Instant::now();
    let pb = create_progress_bar(config.forest.n_trees as u64, "Growing trees");
    let forest = ChurnForest::fit_with_progress(&prepared.train, &config.forest, Some(&pb))?;
    finish_with_success(&pb, &format!("{} trees grown", forest.n_trees()));
    summary.n_trees = forest.n_trees();
    timings.fit = step_start.elapsed();
    summary.add_timing("Fit", timings.fit);
    print_step_time(timings.fit);

    // Step 4: Evaluate
    print_step_header(4, "Evaluate");
    let step_start = Instant::now();
    let spinner = create_spinner("Scoring the evaluation partition...");
    let (predictions, report) = evaluate_forest(&forest, &prepared)?;
    let segments = segment_report(&prepared.normalized.frame, &config.schema)?;
    finish_with_success(&spinner, "Evaluation complete");
    timings.evaluate = step_start.elapsed();
    summary.add_timing("Evaluate", timings.evaluate);
    print_step_time(timings.evaluate);

    let mapping = prepared.encoder.label_mapping().clone();
    display_report(&report, [mapping.class_name(0), mapping.class_name(1)], cli.top);
    display_segments(&segments);

    let output = PipelineOutput {
        prepared,
        forest,
        predictions,
        report,
        timings,
    };

    // Optional: repeated runs over several seeds
    let mut step = 5;
    if !cli.seeds.is_empty() {
        print_step_header(step, "Repeated Runs");
        step += 1;
        let step_start = Instant::now();
        let spinner = create_spinner(&format!("Running {} seeded pipelines...", cli.seeds.len()));
        let runs = run_pipeline_seeds(&df, &config, &cli.seeds);
        let failed = runs.iter().filter(|(_, run)| run.is_err()).count();
        if failed == 0 {
            finish_with_success(&spinner, "Repeated runs complete");
        } else {
            finish_with_warning(&spinner, &format!("{} of {} runs failed", failed, runs.len()));
        }

        let mut results = Vec::new();
        for (seed, run) in runs {
            match run {
                Ok(out) => results.push(SeedResult {
                    seed,
                    accuracy: out.report.accuracy,
                    roc_auc: out.report.roc_auc,
                }),
                Err(e) => print_warning(&format!("Seed {} failed: {}", seed, e)),
            }
        }
        if !results.is_empty() {
            display_seed_results(&results);
        }
        let elapsed = step_start.elapsed();
        summary.add_timing("Repeated runs", elapsed);
        print_step_time(elapsed);
    }

    // Export artifacts
    print_step_header(step, "Save Results");
    let step_start = Instant::now();
    let spinner = create_spinner("Writing report files...");
    let churn_report = ChurnReport::new(&output, &config, &cli.input.display().to_string());
    let paths = export_run_artifacts(&output, &churn_report, &segments, &output_dir)?;
    finish_with_success(&spinner, &format!("Saved to {}", output_dir.display()));

    if cli.bundle {
        let zip_path = output_dir.join(BUNDLE_FILE);
        package_run_artifacts(&paths, &zip_path)?;
        print_success(&format!("Bundled into {}", zip_path.display()));
    } else {
        for path in &paths {
            print_info(&path.display().to_string());
        }
    }
    let export_elapsed = step_start.elapsed();
    summary.add_timing("Export", export_elapsed);
    print_step_time(export_elapsed);

    summary.display();
    print_completion();

    Ok(())
}
