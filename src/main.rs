use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use repair_lab::config::{Config, RunConfig};
use repair_lab::dataset::{resolve_family, DatasetFamily};
use repair_lab::feedback::FeedbackKind;
use repair_lab::lab::{LlmRepairGenerator, SandboxVerifier, ToolCritic};
use repair_lab::llm::models::UsageTotals;
use repair_lab::llm::{LlmClient, PromptShape};
use repair_lab::paths::{input_path, report_path, OutputLayout};
use repair_lab::pipeline::{run_multi_repair, run_multi_score, run_single_repair, run_single_score};
use repair_lab::repair::{Capabilities, RepairSettings, DEFAULT_MAX_ROUNDS};
use repair_lab::score::CumulativeReport;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(
    name = "repair-lab",
    about = "Multi-round LLM code repair and pass-rate scoring over benchmark datasets"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Repair every failing seed once, using its attached feedback
    SingleRepair(SingleRepairArgs),
    /// Verify single-round fixes in place and print the pass rate
    SingleScore(SingleScoreArgs),
    /// Iterate generate-then-verify until each candidate passes or runs out of rounds
    MultiRepair(MultiRepairArgs),
    /// Print the cumulative round-wise pass rate of a multi-round run
    MultiScore(MultiScoreArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Dataset family (HumanEval, CoderEval)
    #[arg(long)]
    dataset: String,
    /// Model family; names the results directory
    #[arg(long)]
    model: String,
    /// Model identifier sent to the API
    #[arg(long)]
    version: String,
    /// test_feedback | compiler_feedback | human_feedback | simple_feedback
    #[arg(long)]
    feedback: FeedbackKind,
    #[arg(long, default_value = "dataset")]
    dataset_dir: PathBuf,
    #[arg(long, default_value = "results")]
    results_dir: PathBuf,
    /// TOML run config (oracle commands, linter, verifier timeout)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl RunArgs {
    fn family(&self) -> Result<&'static dyn DatasetFamily> {
        Ok(resolve_family(&self.dataset)?)
    }

    fn layout<'a>(&'a self, family: &'a dyn DatasetFamily) -> OutputLayout<'a> {
        OutputLayout {
            results_dir: &self.results_dir,
            model: &self.model,
            dataset: family.name(),
            version: &self.version,
            feedback: self.feedback,
        }
    }
}

#[derive(Args, Debug)]
struct PromptArgs {
    #[arg(long)]
    no_docstring: bool,
    #[arg(long)]
    no_context: bool,
    #[arg(long)]
    no_persona: bool,
    #[arg(long)]
    no_instructions: bool,
    /// Ask for step-by-step reasoning before the fix
    #[arg(long)]
    cot: bool,
    /// Include a worked repair example
    #[arg(long)]
    few_shot: bool,
}

impl PromptArgs {
    fn shape(&self) -> PromptShape {
        PromptShape {
            docstring: !self.no_docstring,
            context: !self.no_context,
            persona: !self.no_persona,
            cot: self.cot,
            few_shot: self.few_shot,
            instructions: !self.no_instructions,
        }
    }
}

#[derive(Args, Debug)]
struct SingleRepairArgs {
    #[command(flatten)]
    run: RunArgs,
    #[command(flatten)]
    prompt: PromptArgs,
    #[arg(long, default_value_t = 1)]
    concurrency: usize,
}

#[derive(Args, Debug)]
struct SingleScoreArgs {
    #[command(flatten)]
    run: RunArgs,
    /// Same flags as the repair run, to locate its output
    #[command(flatten)]
    prompt: PromptArgs,
}

#[derive(Args, Debug)]
struct MultiRepairArgs {
    #[command(flatten)]
    run: RunArgs,
    #[arg(long, default_value_t = DEFAULT_MAX_ROUNDS)]
    max_rounds: u32,
    #[arg(long, default_value_t = 1)]
    concurrency: usize,
}

#[derive(Args, Debug)]
struct MultiScoreArgs {
    #[command(flatten)]
    run: RunArgs,
    #[arg(long, default_value_t = DEFAULT_MAX_ROUNDS)]
    max_rounds: u32,
}

#[derive(Debug, Serialize)]
struct RunReport<S: Serialize> {
    timestamp: DateTime<Utc>,
    run_id: String,
    command: &'static str,
    dataset: String,
    model: String,
    version: String,
    feedback: FeedbackKind,
    input: PathBuf,
    output: PathBuf,
    summary: S,
    usage: UsageTotals,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    repair_lab::init_tracing()?;

    match cli.command {
        Commands::SingleRepair(args) => single_repair(args).await,
        Commands::SingleScore(args) => single_score(args).await,
        Commands::MultiRepair(args) => multi_repair(args).await,
        Commands::MultiScore(args) => multi_score(args),
    }
}

async fn single_repair(args: SingleRepairArgs) -> Result<()> {
    let family = args.run.family()?;
    let settings = RepairSettings {
        concurrency: args.concurrency,
        ..RepairSettings::new(args.run.feedback)
    };
    settings.validate()?;
    let shape = args.prompt.shape();
    let input = input_path(&args.run.dataset_dir, family.name());
    let output = args.run.layout(family).single(&shape);

    let client = LlmClient::from_config(&Config::load())?;
    let generator = LlmRepairGenerator::new(client.clone(), &args.run.version);

    let run_id = Uuid::new_v4().to_string();
    info!(run_id = %run_id, model = generator.model(), "starting single-repair");
    let summary = run_single_repair(
        family,
        &input,
        &output,
        args.run.feedback,
        &shape,
        &generator,
        settings.concurrency,
    )
    .await?;

    let report = RunReport {
        timestamp: Utc::now(),
        run_id,
        command: "single-repair",
        dataset: family.name().to_string(),
        model: args.run.model.clone(),
        version: args.run.version.clone(),
        feedback: args.run.feedback,
        input,
        output,
        summary,
        usage: client.usage(),
    };
    write_report_json(&report_path(&report.output), &report)?;

    print_header(&report);
    println!(
        "Repaired {} candidates across {} questions ({} empty)",
        report.summary.candidates, report.summary.questions, report.summary.empty_fixes
    );
    print_usage(&report.usage);
    Ok(())
}

async fn single_score(args: SingleScoreArgs) -> Result<()> {
    let family = args.run.family()?;
    let run_config = RunConfig::load(args.run.config.as_deref())?;
    let verifier = SandboxVerifier::new(
        family,
        run_config.oracle_for(family.name())?,
        run_config.verifier_timeout(),
    );
    let path = args.run.layout(family).single(&args.prompt.shape());

    info!(path = %path.display(), "scoring single-round results");
    let score = run_single_score(family, &path, &verifier).await?;

    println!("Results: {}", path.display());
    println!(
        "Passed {}/{} non-empty fixes ({} empty skipped)",
        score.passed, score.attempted, score.skipped
    );
    println!("Score: {:.2}", score.percent());
    Ok(())
}

async fn multi_repair(args: MultiRepairArgs) -> Result<()> {
    let family = args.run.family()?;
    let settings = RepairSettings {
        max_rounds: args.max_rounds,
        concurrency: args.concurrency,
        ..RepairSettings::new(args.run.feedback)
    };
    settings.validate()?;
    let run_config = RunConfig::load(args.run.config.as_deref())?;
    let input = input_path(&args.run.dataset_dir, family.name());
    let output = args.run.layout(family).multi();

    let config = Config::load();
    let client = LlmClient::from_config(&config)?;
    let generator = LlmRepairGenerator::new(client.clone(), &args.run.version);
    let verifier = SandboxVerifier::new(
        family,
        run_config.oracle_for(family.name())?,
        run_config.verifier_timeout(),
    );
    let critic = ToolCritic::new(family, &run_config.linter, run_config.verifier_timeout())
        .with_reviewer(client.clone(), config.critic_model());
    let caps = Capabilities {
        generator: &generator,
        verifier: &verifier,
        critic: &critic,
    };

    let run_id = Uuid::new_v4().to_string();
    info!(run_id = %run_id, model = generator.model(), "starting multi-repair");
    let summary = run_multi_repair(family, &input, &output, &settings, &caps).await?;
    let rates = run_multi_score(&output, settings.max_rounds)?;

    let report = RunReport {
        timestamp: Utc::now(),
        run_id,
        command: "multi-repair",
        dataset: family.name().to_string(),
        model: args.run.model.clone(),
        version: args.run.version.clone(),
        feedback: args.run.feedback,
        input,
        output,
        summary,
        usage: client.usage(),
    };
    write_report_json(&report_path(&report.output), &report)?;

    print_header(&report);
    let s = &report.summary;
    println!(
        "Candidates: {} (passed {}, empty {}, out of rounds {}, dropped {})",
        s.candidates, s.passed, s.empty_retired, s.budget_exhausted, s.dropped
    );
    println!("Deepest round reached: {}", s.deepest_round);
    print_rates(&rates);
    print_usage(&report.usage);
    Ok(())
}

fn multi_score(args: MultiScoreArgs) -> Result<()> {
    let family = args.run.family()?;
    let path = args.run.layout(family).multi();
    let report = run_multi_score(&path, args.max_rounds)?;

    println!("Results: {}", path.display());
    print_rates(&report);
    Ok(())
}

fn print_header<S: Serialize>(report: &RunReport<S>) {
    println!("Run ID: {}", report.run_id);
    println!("Input: {}", report.input.display());
    println!("Output: {}", report.output.display());
    println!("Report: {}", report_path(&report.output).display());
}

fn print_rates(report: &CumulativeReport) {
    println!(
        "Eligible candidates: {} ({} excluded for empty generations)",
        report.eligible, report.excluded
    );
    for round in &report.rounds {
        println!("Round {}: Pass rate = {:.2}%", round.round, round.rate * 100.0);
    }
}

fn print_usage(usage: &UsageTotals) {
    println!(
        "LLM calls: {} ({} prompt / {} completion tokens, ${:.4})",
        usage.calls, usage.prompt_tokens, usage.completion_tokens, usage.cost_usd
    );
}

fn write_report_json<T: Serialize>(path: &Path, report: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create report directory '{}'", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(report)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report '{}'", path.display()))?;
    Ok(())
}
