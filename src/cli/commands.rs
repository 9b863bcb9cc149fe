use std::path::Path;

use crate::cli::config::build_exploration_config;
use crate::device::clock::SystemClock;
use crate::device::sim::{AppDescription, SimulatedDevice};
use crate::device::status::{ConsoleStatusSink, NullStatusSink, StatusSink};
use crate::orchestrator::config::ExplorationConfig;
use crate::orchestrator::report::ExplorationReport;
use crate::orchestrator::session::ExplorationSession;
use crate::policy::store::{PolicyStore, PolicyWriter, load_policy_file};
use crate::trace::logger::TraceLogger;

// ============================================================================
// explore subcommand
// ============================================================================

#[allow(clippy::too_many_arguments)]
pub fn cmd_explore(
    app_path: &str,
    base_config: &ExplorationConfig,
    strategy: Option<&str>,
    goal: Option<&str>,
    max_screens: Option<usize>,
    max_elements: Option<usize>,
    max_duration_secs: Option<u64>,
    target_coverage: Option<f64>,
    passes: u32,
    policy_path: Option<&str>,
    trace_path: Option<&str>,
    output: Option<&str>,
    verbose: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_exploration_config(
        base_config,
        strategy,
        goal,
        max_screens,
        max_elements,
        max_duration_secs,
        target_coverage,
    )?;

    let app = AppDescription::from_yaml_file(app_path)?;
    let package = app.package.clone();
    let device = SimulatedDevice::new(app);

    if verbose > 0 {
        eprintln!(
            "Exploring {} (strategy={}, goal={:?})...",
            package,
            config.strategy.as_str(),
            config.goal
        );
    }

    let status: Box<dyn StatusSink> = if verbose > 1 {
        Box::new(ConsoleStatusSink)
    } else {
        Box::new(NullStatusSink)
    };

    let mut session = ExplorationSession::start(
        package.clone(),
        config,
        Box::new(device.provider()),
        Box::new(device.actuator()),
        status,
        Box::new(SystemClock::new()),
    );

    // Seed from a previous run's policy file and keep appending to it
    if let Some(path) = policy_path {
        let store = load_policy_file(Path::new(path));
        if verbose > 0 && !store.is_empty() {
            eprintln!("Loaded {} learned entries from {}", store.len(), path);
        }
        let orchestrator = session.orchestrator_mut();
        for (key, entry) in store.entries() {
            orchestrator.seed_policy_entry(key, *entry);
        }
        orchestrator.seed_from_store(&store);
        orchestrator.set_policy_writer(PolicyWriter::spawn(path));
    }
    if let Some(path) = trace_path {
        session.orchestrator_mut().set_tracer(TraceLogger::new(path));
    }

    let mut report = session.run();
    for _ in 1..passes.max(1) {
        report = session.start_another_pass();
    }

    print_summary(&report, session.orchestrator_mut().state(), verbose);

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)?;
        if verbose > 0 {
            eprintln!("Wrote report to {}", path);
        }
    }

    Ok(())
}

fn print_summary(
    report: &ExplorationReport,
    state: &crate::orchestrator::state::ExplorationState,
    verbose: u8,
) {
    println!(
        "Explored {} screens, {} actions in {} pass(es) — {:?}",
        report.coverage.screens_discovered,
        report.actions_taken,
        report.passes,
        report.termination
    );
    println!(
        "Coverage: {:.1}% of elements, {:.1}% of screens fully explored",
        report.coverage.element_coverage_pct(),
        report.coverage.screen_coverage_pct()
    );
    if let Some(best) = report.best_strategy {
        println!("Best strategy: {}", best.as_str());
    }

    let mut screens: Vec<_> = state.screens.values().collect();
    screens.sort_by_key(|s| (state.graph.depth_of(&s.id), s.activity.clone()));
    for screen in screens {
        println!(
            "  [{}] {} — {} elements, {} visits",
            state.graph.depth_of(&screen.id),
            screen.activity,
            screen.elements().count(),
            screen.visit_count
        );
    }

    if !report.issues.is_empty() {
        println!("Issues ({}):", report.issues.len());
        for issue in &report.issues {
            println!("  - {:?}: {}", issue.kind, issue.detail);
        }
    }

    if verbose > 0 {
        if let Some(err) = &report.error {
            eprintln!("Run error: {}", err);
        }
    }
}

// ============================================================================
// inspect subcommand
// ============================================================================

pub fn cmd_inspect(policy_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = load_policy_file(Path::new(policy_path));

    if store.is_empty() {
        println!("No learned entries in {}", policy_path);
    } else {
        let mut entries: Vec<_> = store.entries().collect();
        entries.sort_by(|a, b| b.1.q.total_cmp(&a.1.q));
        println!("Learned entries ({}):", entries.len());
        for (key, entry) in entries {
            println!("  {:+.3}  visits={:<3}  {}", entry.q, entry.visits, key);
        }
    }

    let dangerous = store.dangerous_patterns();
    if !dangerous.is_empty() {
        println!("Dangerous patterns ({}):", dangerous.len());
        for pattern in dangerous {
            println!("  {}", pattern);
        }
    }

    for (package, strategy) in store.best_strategies() {
        println!("Best strategy for {}: {}", package, strategy);
    }

    Ok(())
}
