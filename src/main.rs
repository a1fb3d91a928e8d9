//! rust_anova command-line interface

use clap::Parser;
use log::{info, LevelFilter};
use std::path::Path;

use rust_anova::cli::{Cli, Commands};
use rust_anova::prelude::*;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    let args: Vec<String> = std::env::args().collect();

    // Find the first non-flag argument (potential subcommand)
    let first_positional = args.iter().skip(1).find(|a| !a.starts_with('-'));
    let subcommands = ["anova", "compare", "help"];
    let has_subcommand = first_positional.is_some_and(|a| subcommands.contains(&a.as_str()));

    if !has_subcommand {
        if args.len() == 1 {
            print_no_args();
            return;
        }
        if args.iter().any(|a| a == "--help") {
            print_long_help();
            return;
        }
        if args.iter().any(|a| a == "-h") {
            print_short_help();
            return;
        }
        if args.iter().any(|a| a == "-V" || a == "--version") {
            println!("rust_anova {}", VERSION);
            return;
        }
        print_no_args();
        return;
    }

    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Some(Commands::Anova {
            input,
            target,
            group,
            output,
            no_rpd,
            reference,
            higher_is_better,
            threads,
        }) => {
            let options = AnalysisOptions {
                normalize: !no_rpd,
                reference,
                sense: if higher_is_better {
                    MetricSense::HigherIsBetter
                } else {
                    MetricSense::LowerIsBetter
                },
            };
            run_anova(&input, &target, &group, &output, &options, threads)
        }
        Some(Commands::Compare {
            input,
            x_axis,
            y_axis,
            hue,
            output,
            no_rpd,
            keep_labels,
        }) => {
            let options = CompareOptions {
                normalize: !no_rpd,
                clean_labels: !keep_labels,
                ..Default::default()
            };
            run_compare(&input, &x_axis, &y_axis, hue.as_deref(), &output, &options)
        }
        None => {
            print_no_args();
            return;
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Custom help output
// ---------------------------------------------------------------------------

fn print_no_args() {
    println!("rust_anova v{}", VERSION);
    println!("Run `rust_anova -h` for usage or `rust_anova --help` for detailed information.");
}

fn print_short_help() {
    println!("rust_anova v{}", VERSION);
    println!();
    println!("Usage: rust_anova <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  anova      Run ANOVA and Tukey HSD on experiment results");
    println!("  compare    Compare a metric across an experiment parameter");
    println!();
    println!("Run `rust_anova <COMMAND> -h` for command-specific options.");
}

fn print_long_help() {
    println!("rust_anova v{}", VERSION);
    println!("Significance analysis of experiment results");
    println!();
    println!("Usage: rust_anova <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  anova      Run ANOVA and Tukey HSD on experiment results");
    println!("               - RPD normalization against the best observed value");
    println!("               - One-way ANOVA for a single grouping variable");
    println!("               - Type II multi-way ANOVA with all interactions");
    println!("               - Tukey HSD on every significant main effect");
    println!("  compare    Mean and 95% CI of a metric per parameter value and algorithm");
    println!();
    println!("Global Options:");
    println!("  -v, --verbose    Enable verbose output");
    println!("  -h               Print short help");
    println!("      --help       Print detailed help");
    println!("  -V, --version    Print version");
    println!();
    println!("Examples:");
    println!("  rust_anova anova -i results.jsonl -t elecCost -g strategy -o out");
    println!();
    println!("  rust_anova anova -i results.csv -t elecCost -g strategy -g ascending -o out");
    println!();
    println!("  rust_anova compare -i results.jsonl -x deadlineFactor -y elecCost --hue name");
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn run_anova(
    inputs: &[String],
    target: &str,
    factors: &[String],
    output_dir: &str,
    options: &AnalysisOptions,
    threads: usize,
) -> Result<()> {
    // Configure thread pool
    if threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .ok();
    }

    // Inputs sharing a file stem must not overwrite each other's reports
    let names = unique_file_stems(inputs.iter().map(|path| base_name(path)));

    let mut jobs = Vec::with_capacity(inputs.len());
    for (path, name) in inputs.iter().zip(names) {
        info!("Loading results from: {}", path);
        let dataset = load_dataset(path)?;
        jobs.push(BatchJob {
            name,
            dataset,
            target: target.to_string(),
            factors: factors.to_vec(),
            options: options.clone(),
        });
    }

    let mut failures = 0;
    for (name, result) in run_batch(&jobs) {
        let report = match result {
            Ok(report) => report,
            Err(e) => {
                eprintln!("Error in {}: {}", name, e);
                failures += 1;
                continue;
            }
        };

        println!("{}", report);
        write_report_bundle(output_dir, &name, &report)?;

        #[cfg(feature = "plotting")]
        write_point_plots(output_dir, &name, &report)?;
    }

    if failures > 0 {
        return Err(AnovaError::InvalidInput {
            reason: format!("{} of {} analyses failed", failures, jobs.len()),
        });
    }
    Ok(())
}

#[cfg(feature = "plotting")]
fn write_point_plots(output_dir: &str, name: &str, report: &AnalysisReport) -> Result<()> {
    use rust_anova::plotting::{plot_point_estimates, PlotConfig};

    let stems = unique_file_stems(&report.factors);
    for (factor, stem) in report.factors.iter().zip(stems) {
        let path = Path::new(output_dir).join(format!("{}_{}_pointplot.png", name, stem));
        let config = PlotConfig {
            y_label: Some(if report.normalized {
                format!("{} (%)", report.analyzed_field)
            } else {
                report.analyzed_field.clone()
            }),
            ..Default::default()
        };
        plot_point_estimates(&report.dataset, factor, &report.analyzed_field, &path, &config)?;
    }
    Ok(())
}

fn run_compare(
    input: &str,
    x_axis: &str,
    y_axis: &str,
    hue: Option<&str>,
    output_dir: &str,
    options: &CompareOptions,
) -> Result<()> {
    info!("Loading results from: {}", input);
    let dataset = load_dataset(input)?;
    let comparison = compare(&dataset, x_axis, y_axis, hue, options)?;

    std::fs::create_dir_all(output_dir)?;
    let stem = format!("{}_{}_{}", base_name(input), x_axis, comparison.y_field);
    let table_path = Path::new(output_dir).join(format!("{}.csv", stem));
    write_comparison_table(&table_path, &comparison)?;
    info!("Comparison table saved to: {}", table_path.display());

    #[cfg(feature = "plotting")]
    {
        use rust_anova::plotting::{plot_comparison, ColorPalette, PlotConfig};

        let plot_path = Path::new(output_dir).join(format!("{}.png", stem));
        let config = PlotConfig {
            palette: ColorPalette::Set2,
            ..Default::default()
        };
        plot_comparison(&comparison, &plot_path, &config)?;
    }

    Ok(())
}

/// File stem used to name output artifacts
fn base_name(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "results".to_string())
}
