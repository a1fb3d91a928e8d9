//! Command-line interface for rust_anova

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rust_anova")]
#[command(version)]
#[command(about = "Significance analysis of experiment results in Rust")]
#[command(disable_help_flag = true)]
#[command(disable_version_flag = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run ANOVA and Tukey HSD on experiment results
    #[command(
        about = "Run ANOVA and Tukey HSD on experiment results",
        long_about = "Run ANOVA and Tukey HSD on experiment results\n\n\
            Normalizes the target into relative percentage deviation (RPD) from the\n\
            best observed value, runs a one-way ANOVA for a single grouping factor or\n\
            a Type II multi-way ANOVA with all interactions for several factors, then\n\
            runs Tukey HSD on every significant main effect.",
        after_long_help = "\
Examples:
  # One-way ANOVA of electricity cost across strategies
  rust_anova anova -i results.jsonl -t elecCost -g strategy -o out

  # Two-way ANOVA on several result files in parallel
  rust_anova anova -i run1.csv -i run2.csv -t elecCost -g strategy -g ascending -o out

  # Analyze the raw target without RPD normalization
  rust_anova anova -i results.json -t makespan -g planner --no-rpd"
    )]
    Anova {
        /// Input result file (.csv, .json, .jsonl)
        #[arg(short, long, required = true,
            long_help = "Input result file (.csv, .json or .jsonl).\n\
                Can be specified multiple times; each file is analyzed independently.")]
        input: Vec<String>,

        /// Target variable
        #[arg(short, long, default_value = "elecCost")]
        target: String,

        /// Grouping variable
        #[arg(short, long, required = true, value_name = "FACTOR",
            long_help = "Grouping variable. One factor gives a one-way ANOVA;\n\
                several (-g a -g b) give a multi-way ANOVA with all interactions.")]
        group: Vec<String>,

        /// Output directory [default: .]
        #[arg(short, long, default_value = ".")]
        output: String,

        /// Analyze the raw target instead of its RPD
        #[arg(long)]
        no_rpd: bool,

        /// Best-known value used as RPD reference
        #[arg(long,
            long_help = "Best-known value used as the RPD reference.\n\
                Without this, the best observed value of the target is used.")]
        reference: Option<f64>,

        /// Larger target values are better (reference = maximum)
        #[arg(long)]
        higher_is_better: bool,

        /// Number of threads (0 = auto) [default: 0]
        #[arg(short = 'j', long, default_value = "0")]
        threads: usize,
    },
    /// Compare a metric across an experiment parameter
    #[command(
        long_about = "Compare a metric across an experiment parameter.\n\n\
            Writes mean and 95% confidence interval of the metric per x level\n\
            (and per hue level when --hue is given).",
        after_long_help = "\
Examples:
  rust_anova compare -i results.jsonl -x deadlineFactor -y elecCost --hue name -o out"
    )]
    Compare {
        /// Input result file (.csv, .json, .jsonl)
        #[arg(short, long)]
        input: String,

        /// Field on the x axis
        #[arg(short = 'x', long, default_value = "deadlineFactor")]
        x_axis: String,

        /// Metric on the y axis
        #[arg(short = 'y', long, default_value = "elecCost")]
        y_axis: String,

        /// Field separating the series (e.g. algorithm name)
        #[arg(long)]
        hue: Option<String>,

        /// Output directory [default: .]
        #[arg(short, long, default_value = ".")]
        output: String,

        /// Compare the raw metric instead of its RPD
        #[arg(long)]
        no_rpd: bool,

        /// Keep parenthesized text in hue labels
        #[arg(long)]
        keep_labels: bool,
    },
}
