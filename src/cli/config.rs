use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::orchestrator::config::{ExplorationConfig, Goal};
use crate::orchestrator::strategy::Strategy;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "app-explorer",
    version,
    about = "Autonomous mobile app exploration engine"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: app-explorer.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Explore a simulated app described by a YAML file
    Explore {
        /// Path to the app description YAML
        #[arg(long)]
        app: String,

        /// Selection strategy: screen_first, priority_based, depth_first,
        /// breadth_first, systematic, adaptive
        #[arg(long)]
        strategy: Option<String>,

        /// Goal: quick_scan, deep_map, coverage_target
        #[arg(long)]
        goal: Option<String>,

        /// Maximum screens to discover (deep_map goal)
        #[arg(long)]
        max_screens: Option<usize>,

        /// Maximum actions to take (quick_scan goal)
        #[arg(long)]
        max_elements: Option<usize>,

        /// Safety time cap in seconds
        #[arg(long)]
        max_duration_secs: Option<u64>,

        /// Element coverage percentage to stop at (coverage_target goal)
        #[arg(long)]
        target_coverage: Option<f64>,

        /// Number of full passes to run
        #[arg(long, default_value_t = 1)]
        passes: u32,

        /// JSONL file for learned policy values, loaded before the run and
        /// appended to during it
        #[arg(long)]
        policy: Option<String>,

        /// JSONL trace file for per-iteration events
        #[arg(long)]
        trace: Option<String>,

        /// Write the final report as JSON to this path
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Print the contents of a saved policy file
    Inspect {
        /// Path to the JSONL policy file
        #[arg(long)]
        policy: String,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `app-explorer.yaml`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub explore: ExplorationConfig,

    /// Default policy file used when the flag is absent
    #[serde(default)]
    pub policy_file: Option<String>,

    /// Default trace file used when the flag is absent
    #[serde(default)]
    pub trace_file: Option<String>,
}

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("app-explorer.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

/// Apply CLI overrides on top of the file-based exploration config.
#[allow(clippy::too_many_arguments)]
pub fn build_exploration_config(
    base: &ExplorationConfig,
    strategy: Option<&str>,
    goal: Option<&str>,
    max_screens: Option<usize>,
    max_elements: Option<usize>,
    max_duration_secs: Option<u64>,
    target_coverage: Option<f64>,
) -> Result<ExplorationConfig, String> {
    let mut config = base.clone();

    if let Some(s) = strategy {
        config.strategy =
            Strategy::parse(s).ok_or_else(|| format!("unknown strategy '{}'", s))?;
    }
    if let Some(g) = goal {
        config.goal = match g {
            "quick_scan" => Goal::QuickScan,
            "deep_map" => Goal::DeepMap,
            "coverage_target" => Goal::CoverageTarget,
            other => return Err(format!("unknown goal '{}'", other)),
        };
    }
    if let Some(n) = max_screens {
        config.max_screens = n;
    }
    if let Some(n) = max_elements {
        config.max_elements = n;
    }
    if let Some(secs) = max_duration_secs {
        config.max_duration_ms = secs * 1000;
    }
    if let Some(pct) = target_coverage {
        config.target_coverage_pct = pct;
    }

    Ok(config)
}
