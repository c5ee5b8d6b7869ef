use anyhow::{Context, Result};
use provision::cli::commands::{ListCommand, RunCommand, ValidateCommand};
use provision::cli::output::*;
use provision::cli::{Cli, Command};
use provision::core::config::PipelineConfig;
use provision::execution::{
    DryRunRunner, ExecutionEvent, Interrupt, PipelineResult, PipelineRunner, ProcessRunner,
    SubprocessRunner,
};
use std::io::Write;
use tracing::{debug, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Exit code for configuration errors (bad definition, unknown task)
const CONFIG_ERROR: i32 = 2;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    let outcome = match &cli.command {
        Command::Run(cmd) => run_task(&cli, cmd).await,
        Command::Validate(cmd) => validate_pipeline(&cli, cmd),
        Command::List(cmd) => list_tasks(&cli, cmd),
    };

    if let Err(e) = &outcome {
        eprintln!("{} {}", CROSS, style(format!("{:#}", e)).red());
    }
    std::process::exit(exit_code(&outcome));
}

/// Process exit code for a command's outcome; errors are configuration errors
fn exit_code(outcome: &Result<i32>) -> i32 {
    match outcome {
        Ok(code) => *code,
        Err(_) => CONFIG_ERROR,
    }
}

async fn run_task(cli: &Cli, cmd: &RunCommand) -> Result<i32> {
    let config = cli.load_config()?;
    let graph = config.to_graph(&cmd.var)?;

    for (key, value) in &cmd.var {
        debug!("Variable override: {} = {}", key, value);
    }

    let workdir = match &cmd.workdir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };

    let interrupt = Interrupt::new();
    let on_ctrl_c = interrupt.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping the current step");
            on_ctrl_c.trigger();
        }
    });

    let result = if cmd.dry_run {
        let runner = PipelineRunner::new(graph, DryRunRunner, workdir).with_interrupt(interrupt);
        execute(runner, cli, cmd).await?
    } else {
        let escalation = if cmd.no_elevate {
            Vec::new()
        } else {
            config.escalation()
        };
        let runner = PipelineRunner::new(graph, SubprocessRunner::new(escalation), workdir)
            .with_interrupt(interrupt);
        execute(runner, cli, cmd).await?
    };

    report(
        &result,
        cmd.json,
        &mut std::io::stdout(),
        &mut std::io::stderr(),
    )?;
    Ok(result.exit_code())
}

/// Run the requested task, printing progress unless a JSON report was asked for
async fn execute<R: ProcessRunner>(
    mut runner: PipelineRunner<R>,
    cli: &Cli,
    cmd: &RunCommand,
) -> Result<PipelineResult> {
    let total_steps: usize = runner.plan(&cmd.task)?.iter().map(|t| t.steps.len()).sum();

    if cmd.json {
        return Ok(runner.run(&cmd.task).await?);
    }

    let bar = create_progress_bar(total_steps);
    let progress = bar.clone();
    let stream = cli.stream;
    let dry_run = cmd.dry_run;
    runner.add_event_handler(move |event| {
        match &event {
            ExecutionEvent::StepOutput { output, .. } => {
                if stream {
                    progress.suspend(|| println!("{}", format_output(output, 20)));
                }
                return;
            }
            ExecutionEvent::StepStarted { step, .. } => progress.set_message(step.clone()),
            ExecutionEvent::StepCompleted { .. } | ExecutionEvent::StepFailed { .. } => {
                progress.inc(1)
            }
            _ => {}
        }
        let line = format_execution_event(&event);
        let line = if dry_run {
            format!("{} {}", style("(dry run)").dim(), line)
        } else {
            line
        };
        progress.suspend(|| println!("{}", line));
    });

    let result = runner.run(&cmd.task).await?;
    bar.finish_and_clear();
    Ok(result)
}

/// Print the end-of-run report; a failure report goes to `err`
fn report(
    result: &PipelineResult,
    json: bool,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(result)?)?;
    } else if result.is_success() {
        writeln!(out, "{}", format_report(result))?;
    } else {
        writeln!(err, "{}", format_report(result))?;
    }
    Ok(())
}

fn validate_pipeline(cli: &Cli, cmd: &ValidateCommand) -> Result<i32> {
    println!("{} Validating pipeline...", INFO);

    let config = cli.load_config()?;
    let graph = config.to_graph(&[])?;

    println!("{} Pipeline configuration is valid!", CHECK);
    println!("  Name: {}", style(&config.name).bold());
    println!("  Tasks: {}", style(graph.len()).cyan());
    println!("  Variables: {}", style(config.variables.len()).cyan());
    println!("  Escalation: {}", style(config.escalation().join(" ")).dim());

    if cmd.json {
        let json = serde_json::to_string_pretty(&config)?;
        println!("\n{}", json);
    }
    Ok(0)
}

fn list_tasks(cli: &Cli, cmd: &ListCommand) -> Result<i32> {
    let config: PipelineConfig = cli.load_config()?;
    let graph = config.to_graph(&[])?;

    if cmd.json {
        let tasks: Vec<_> = graph
            .tasks()
            .map(|task| {
                serde_json::json!({
                    "name": task.name,
                    "aliases": task.aliases,
                    "description": task.description,
                    "depends_on": task.depends_on,
                    "steps": task.steps.iter().map(|step| serde_json::json!({
                        "name": step.name,
                        "command": step.command_line(),
                        "elevated": step.is_elevated(),
                        "best_effort": step.is_best_effort(),
                    })).collect::<Vec<_>>(),
                })
            })
            .collect();
        let data = serde_json::json!({ "pipeline": config.name, "tasks": tasks });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(0);
    }

    println!("{} Tasks in {}:", INFO, style(&config.name).bold());
    println!("{}", format_task_list(&graph));
    Ok(0)
}
