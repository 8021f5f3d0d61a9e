mod loader;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};

use strata::config::{CliOverrides, Config};
use strata::observe::{Reporter, TracingReporter};
use strata::spec::Context as StrataContext;
use strata::store::{GitRevisionStore, RevisionStore};
use strata::{planner, Address, ActionState, Executor, Strategy};

use loader::{DeployLoader, WalkingDeployLoader};

#[derive(Parser, Debug)]
#[command(name = "strata", version)]
#[command(about = "A deployment orchestrator: plan, apply, and inspect revision-bound deployments")]
struct Cli {
    /// Path to the config file.
    #[arg(short = 'c', long = "config", default_value = ".strata.toml")]
    config: PathBuf,

    /// Revision to plan/apply against. Defaults to the project repo's current HEAD.
    #[arg(short = 'r', long = "revision")]
    revision: Option<String>,

    /// Working directory to resolve relative config/project paths against.
    #[arg(long)]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute and print the plan without executing it.
    Plan {
        /// Treat every registered artifact as available, ignoring exists().
        #[arg(short = 'a', long = "all")]
        all: bool,
        /// Allow planning even when a revision state already exists.
        #[arg(short = 'f', long = "force")]
        force: bool,
    },
    /// Compute the plan and execute it, persisting every transition.
    Apply {
        /// Re-apply over an existing non-empty revision state.
        #[arg(short = 'f', long = "force")]
        force: bool,
    },
    /// List registered artifacts.
    Artifacts {
        /// Also evaluate and print each artifact's exists() result.
        #[arg(short = 'e', long = "exist")]
        exist: bool,
    },
}

/// Compiled-in deploy-file registrations. A real distribution wires plugin
/// modules in here; this crate ships none (see §1's non-goals), so the
/// loader always reports zero discovered files unless a caller builds
/// their own `WalkingDeployLoader` with registrations attached.
fn build_loader() -> WalkingDeployLoader {
    WalkingDeployLoader::new()
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[error] {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let cwd = cli.cwd.clone().unwrap_or_else(|| PathBuf::from("."));
    let config_path = if cli.config.is_absolute() {
        cli.config.clone()
    } else {
        cwd.join(&cli.config)
    };

    let overrides = CliOverrides {
        cwd: cli.cwd.clone(),
        revision: cli.revision.clone(),
    };

    let config = Config::load_from_file(&config_path).context("failed to load configuration")?;
    let project_root = overrides.cwd.clone().unwrap_or_else(|| config.project.repo_path.clone());

    let revision = match &overrides.revision {
        Some(r) => r.clone(),
        None => strata::git::current_revision(&config.project.repo_path)
            .context("failed to determine current revision from project repository")?,
    };

    let loader = build_loader();
    let discovered = loader.discover(&project_root, &config.deploy_filename)?;

    let mut strategy = Strategy::new();
    for file in &discovered {
        (file.register)(&mut strategy).with_context(|| format!("failed to register {}", file.path.display()))?;
    }

    let ctx = StrataContext::new(revision.clone()).with_vars(config.vars.clone());
    let reporter: Box<dyn Reporter> = Box::new(TracingReporter);

    match cli.cmd {
        Commands::Plan { all, force } => cmd_plan(&strategy, &ctx, all, force, &config, &revision, reporter.as_ref()),
        Commands::Apply { force } => cmd_apply(&strategy, &ctx, force, &config, &revision, reporter.as_ref()),
        Commands::Artifacts { exist } => cmd_artifacts(&strategy, &ctx, exist),
    }
}

fn available_artifacts(strategy: &Strategy, ctx: &StrataContext, force_all: bool) -> BTreeSet<Address> {
    strategy
        .artifacts()
        .filter(|(_, spec)| force_all || spec.exists(ctx))
        .map(|(addr, _)| addr.clone())
        .collect()
}

fn check_existing_revision(store: &dyn RevisionStore, revision: &str, force: bool) -> Result<()> {
    if force {
        return Ok(());
    }
    if let Some(existing) = store.load_revision(revision)? {
        if !existing.plan.actions.is_empty() {
            bail!("revision {revision} already has a persisted state; pass --force to proceed anyway");
        }
    }
    Ok(())
}

fn cmd_plan(
    strategy: &Strategy,
    ctx: &StrataContext,
    all: bool,
    force: bool,
    config: &Config,
    revision: &str,
    reporter: &dyn Reporter,
) -> Result<()> {
    let store = GitRevisionStore::new(
        config.state_dir(),
        config.state.repo_path.clone(),
        config.state.push,
        config.state.remote_location.clone(),
        reporter,
    );
    check_existing_revision(&store, revision, force)?;

    let available = available_artifacts(strategy, ctx, all);
    let planned = planner::plan(strategy, &available)?;

    println!("revision: {revision}");
    println!("actions:");
    for action in &planned.actions {
        println!("  {:?} {} {:?}", action.action_type, action.address, action.state);
    }

    Ok(())
}

fn cmd_apply(
    strategy: &Strategy,
    ctx: &StrataContext,
    force: bool,
    config: &Config,
    revision: &str,
    reporter: &dyn Reporter,
) -> Result<()> {
    let store = GitRevisionStore::new(
        config.state_dir(),
        config.state.repo_path.clone(),
        config.state.push,
        config.state.remote_location.clone(),
        reporter,
    );
    store.init_state()?;
    check_existing_revision(&store, revision, force)?;
    store.init_revision(revision)?;

    let available = available_artifacts(strategy, ctx, false);
    let planned = planner::plan(strategy, &available)?;
    reporter.info(&format!("planned {} action(s) for revision {revision}", planned.actions.len()));

    let mut executor = Executor::new(strategy, ctx.clone(), planned, reporter);
    let mut failed = false;

    while let Some(result) = executor.next() {
        let plan = result?;
        store.save_revision(revision, &plan)?;

        if plan.actions.iter().any(|a| a.state == ActionState::Failed) {
            failed = true;
        }
    }

    if failed {
        bail!("one or more actions failed for revision {revision}");
    }

    println!("applied revision {revision}");
    Ok(())
}

fn cmd_artifacts(strategy: &Strategy, ctx: &StrataContext, exist: bool) -> Result<()> {
    for (addr, spec) in strategy.artifacts() {
        if exist {
            println!("{addr}: exists={}", spec.exists(ctx));
        } else {
            println!("{addr}");
        }
    }
    Ok(())
}
