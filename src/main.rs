use app_explorer::cli::commands::{cmd_explore, cmd_inspect};
use app_explorer::cli::config::{Cli, Commands, load_config};
use clap::Parser;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Explore {
            app,
            strategy,
            goal,
            max_screens,
            max_elements,
            max_duration_secs,
            target_coverage,
            passes,
            policy,
            trace,
            output,
        } => {
            // Resolve file paths: CLI > config file
            let policy_path = policy.as_deref().or(config.policy_file.as_deref());
            let trace_path = trace.as_deref().or(config.trace_file.as_deref());

            cmd_explore(
                &app,
                &config.explore,
                strategy.as_deref(),
                goal.as_deref(),
                max_screens,
                max_elements,
                max_duration_secs,
                target_coverage,
                passes,
                policy_path,
                trace_path,
                output.as_deref(),
                cli.verbose,
            )?;
        }
        Commands::Inspect { policy } => {
            cmd_inspect(&policy)?;
        }
    }

    Ok(())
}
