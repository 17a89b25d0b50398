use anyhow::{Context, Result};
use sitepipe::cli::commands::{ListCommand, PlanCommand, RunCommand, ValidateCommand};
use sitepipe::cli::output::*;
use sitepipe::cli::{Cli, Command};
use sitepipe::collaborators::HostExecutor;
use sitepipe::core::config::SiteConfig;
use sitepipe::execution::PipelineRunner;
use std::sync::Arc;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_task(cmd, &cli).await?,
        Command::Plan(cmd) => plan_task(cmd, &cli)?,
        Command::Validate(cmd) => validate_config(cmd, &cli)?,
        Command::List(cmd) => list_tasks(cmd, &cli)?,
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<SiteConfig> {
    let mut config =
        SiteConfig::load(cli.config.as_deref()).context("Failed to load build declaration")?;

    for (key, value) in &cli.set {
        println!(
            "{} Path override: {} = {}",
            INFO,
            style(key).cyan(),
            style(value).dim()
        );
    }
    config.apply_path_overrides(&cli.set);

    Ok(config)
}

async fn run_task(cmd: &RunCommand, cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let registry = config
        .to_registry(cli.allow_destructive)
        .context("Failed to build task graph")?;

    if let Some(name) = &config.name {
        println!("{} Loaded site: {}", INFO, style(name).bold());
    }

    let mut runner = PipelineRunner::new(registry, HostExecutor::new(config.tools.clone()));

    // Spinners garble verbose log output
    let printer = Arc::new(EventPrinter::new(!cli.verbose));
    runner.add_event_handler(move |event| printer.handle(&event));

    println!();
    match runner.run(&cmd.name).await {
        Ok(session) => {
            println!(
                "\n{} {} completed {}",
                CHECK,
                style(&cmd.name).bold(),
                style("successfully").green()
            );

            if session.is_long_lived() {
                for handle in session.handles() {
                    println!("{} {}", EYES, style(handle.describe()).dim());
                }
                println!("{} Press Ctrl-C to stop", INFO);
                session.hold(&runner).await;
            }
            Ok(())
        }
        Err(e) => {
            println!(
                "\n{} {} {}",
                CROSS,
                style(&cmd.name).bold(),
                style("failed").red()
            );
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn plan_task(cmd: &PlanCommand, cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let registry = config
        .to_registry(cli.allow_destructive)
        .context("Failed to build task graph")?;
    let operations = registry
        .flatten(&cmd.name)
        .with_context(|| format!("Cannot expand '{}'", cmd.name))?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&operations)?);
    } else {
        println!("{}", format_plan(&cmd.name, &operations));
    }
    Ok(())
}

fn validate_config(cmd: &ValidateCommand, cli: &Cli) -> Result<()> {
    println!("{} Validating build declaration...", INFO);

    let result = load_config(cli).and_then(|config| {
        config.validate()?;
        let registry = config.to_registry(cli.allow_destructive)?;
        Ok((config, registry))
    });

    match result {
        Ok((config, registry)) => {
            println!("{} Build declaration is valid!", CHECK);
            if let Some(name) = &config.name {
                println!("  Name: {}", style(name).bold());
            }
            println!("  Paths: {}", style(config.paths.len()).cyan());
            println!("  Tasks: {}", style(registry.task_names().len()).cyan());
            println!("  Pipelines: {}", style(registry.pipeline_names().len()).cyan());

            if cmd.json {
                let paths = config.paths.resolve_all()?;
                let mut pipelines = serde_json::Map::new();
                for name in registry.pipeline_names() {
                    pipelines.insert(
                        name.to_string(),
                        serde_json::json!(registry.flatten(name)?.len()),
                    );
                }
                let data = serde_json::json!({
                    "valid": true,
                    "paths": paths,
                    "pipelines": pipelines,
                });
                println!("\n{}", serde_json::to_string_pretty(&data)?);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            std::process::exit(1);
        }
    }
}

fn list_tasks(cmd: &ListCommand, cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let registry = config
        .to_registry(true)
        .context("Failed to build task graph")?;

    if cmd.json {
        let pipelines: Vec<_> = registry
            .definitions()
            .filter(|d| d.pipeline)
            .map(|d| {
                serde_json::json!({
                    "name": d.name,
                    "tasks": config.pipelines.get(&d.name),
                })
            })
            .collect();
        let tasks: Vec<_> = registry
            .definitions()
            .filter(|d| !d.pipeline)
            .map(|d| {
                serde_json::json!({
                    "name": d.name,
                    "description": d.description,
                    "destructive": d.destructive,
                })
            })
            .collect();
        let data = serde_json::json!({ "pipelines": pipelines, "tasks": tasks });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!("{} Pipelines:", INFO);
    for (name, tasks) in &config.pipelines {
        println!("  {} = [{}]", style(name).bold(), style(tasks.join(", ")).dim());
    }

    println!("\n{} Tasks:", INFO);
    for definition in registry.definitions().filter(|d| !d.pipeline) {
        let marker = if definition.destructive {
            format!(" {}", style("(destructive)").yellow())
        } else {
            String::new()
        };
        match &definition.description {
            Some(description) => println!(
                "  {}{} - {}",
                style(&definition.name).cyan(),
                marker,
                style(description).dim()
            ),
            None => println!("  {}{}", style(&definition.name).cyan(), marker),
        }
    }

    Ok(())
}
