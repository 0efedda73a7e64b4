use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use triage_core::{
    classify, egfr_stage, risk_bar_percent, score, trend::trend_series, Brand, Mode, Observation,
    TimelinePoint,
};
use triage_report::{
    badges, build_summary, country_hints,
    review::{ReviewReply, ReviewRequest},
};
use triage_store::{FileStore, StoreConfig, TimelineStore, Vault, VaultError};

#[derive(Parser, Debug)]
#[command(
    name = "triage",
    about = "Educational kidney + infection triage: score observations, keep a local timeline and an encrypted form."
)]
struct Args {
    /// Directory holding the timeline and encrypted form files.
    #[arg(long, env = "TRIAGE_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Passphrase for the encrypted form (at least 6 characters).
    #[arg(long, env = "TRIAGE_PASSPHRASE", global = true, hide_env_values = true)]
    passphrase: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score an observation and print the case summary.
    Analyze {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        context: ContextArgs,
        /// Print score, tier, badges and summary as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the review-proxy request body for an observation.
    Review {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Render a saved review-proxy reply (`{reply}` or `{error}` JSON).
    Reply { file: PathBuf },
    /// Print regional safety hints.
    Hints {
        #[arg(default_value = "NG")]
        country: String,
    },
    /// Manage the saved timeline.
    #[command(subcommand)]
    Timeline(TimelineCommand),
    /// Save or restore the passphrase-encrypted form.
    #[command(subcommand)]
    Vault(VaultCommand),
}

#[derive(Subcommand, Debug)]
enum TimelineCommand {
    /// Score an observation and append it as a timeline point.
    Add {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Saved points, newest first.
    List,
    /// eGFR, creatinine, CRP and risk series with chart bounds.
    Trend,
    /// Delete the point at a position shown by `list`.
    Delete { index: usize },
    Clear,
    /// Write the export document to a file or stdout.
    Export {
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Merge an export document into the timeline.
    Import { file: PathBuf },
}

#[derive(Subcommand, Debug)]
enum VaultCommand {
    Save {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Print the decrypted form as JSON.
    Load,
    Clear,
}

#[derive(ClapArgs, Debug)]
struct InputArgs {
    /// Observation JSON file.
    #[arg(required_unless_present = "demo", conflicts_with = "demo")]
    file: Option<PathBuf>,
    /// Use the built-in demo case.
    #[arg(long)]
    demo: bool,
}

#[derive(ClapArgs, Debug, Default)]
struct ContextArgs {
    /// Country code for the report header (NG, UG, KE).
    #[arg(long)]
    country: Option<String>,
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,
    #[arg(long, value_enum)]
    brand: Option<BrandArg>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ModeArg {
    Patient,
    Doctor,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum BrandArg {
    Bubulizer,
    Drpius,
}

impl ContextArgs {
    fn apply(&self, observation: &mut Observation) {
        if let Some(country) = self.country.as_deref().map(str::trim) {
            if !country.is_empty() {
                observation.context.country = country.to_uppercase();
            }
        }
        if let Some(mode) = self.mode {
            observation.context.mode = match mode {
                ModeArg::Patient => Mode::Patient,
                ModeArg::Doctor => Mode::Doctor,
            };
        }
        if let Some(brand) = self.brand {
            observation.context.brand = match brand {
                BrandArg::Bubulizer => Brand::Bubulizer,
                BrandArg::Drpius => Brand::DrPius,
            };
        }
    }
}

impl InputArgs {
    fn load(&self) -> anyhow::Result<Observation> {
        match &self.file {
            Some(path) if !self.demo => read_observation(path),
            _ => Ok(Observation::demo()),
        }
    }
}

fn read_observation(path: &Path) -> anyhow::Result<Observation> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read observation file {path:?}"))?;
    Observation::from_json(&data).with_context(|| format!("invalid observation in {path:?}"))
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut config = StoreConfig::default();
    if let Some(dir) = args.data_dir.clone() {
        config.data_dir = dir;
    }
    tracing::debug!(data_dir = ?config.data_dir, "using data directory");
    let storage = FileStore::new(&config.data_dir);

    match args.command {
        Command::Analyze {
            input,
            context,
            json,
        } => {
            let mut observation = input.load()?;
            context.apply(&mut observation);
            print!("{}", analyze(&observation, json)?);
        }
        Command::Review { input, context } => {
            let mut observation = input.load()?;
            context.apply(&mut observation);
            println!("{}", review_request(&observation)?);
        }
        Command::Reply { file } => {
            let body = std::fs::read_to_string(&file)
                .with_context(|| format!("cannot read reply file {file:?}"))?;
            println!("{}", ReviewReply::parse(&body).display_text());
        }
        Command::Hints { country } => println!("{}", country_hints(&country)),
        Command::Timeline(command) => {
            let timeline = TimelineStore::new(storage, config.timeline_key);
            run_timeline(&timeline, command)?;
        }
        Command::Vault(command) => {
            let vault = Vault::new(storage, config.vault_key);
            run_vault(&vault, args.passphrase.as_deref(), command).await?;
        }
    }

    Ok(())
}

fn analyze(observation: &Observation, json: bool) -> anyhow::Result<String> {
    let result = score(observation);
    let summary = build_summary(observation, &result);
    if !json {
        return Ok(summary);
    }

    let tier = classify(result.points);
    let stage = egfr_stage(observation.egfr);
    let report = serde_json::json!({
        "points": result.points,
        "flags": result.flags,
        "tier": tier,
        "tier_label": tier.label(),
        "percent": risk_bar_percent(result.points),
        "stage": { "code": stage.code(), "description": stage.description() },
        "badges": badges(observation, result.points),
        "summary": summary,
    });
    Ok(format!("{}\n", serde_json::to_string_pretty(&report)?))
}

fn review_request(observation: &Observation) -> anyhow::Result<String> {
    let summary = build_summary(observation, &score(observation));
    let request = ReviewRequest::new(&summary, &observation.context);
    Ok(serde_json::to_string_pretty(&request)?)
}

fn run_timeline(
    timeline: &TimelineStore<FileStore>,
    command: TimelineCommand,
) -> anyhow::Result<()> {
    match command {
        TimelineCommand::Add { input } => {
            let observation = input.load()?;
            let result = score(&observation);
            timeline.append(TimelinePoint::from_analysis(&observation, &result, Utc::now()))?;
            println!(
                "Saved point ({} / 20, {}). Timeline holds {} points.",
                result.points,
                classify(result.points).short_label(),
                timeline.len()?
            );
        }
        TimelineCommand::List => {
            let points = timeline.list()?;
            if points.is_empty() {
                println!("No saved points yet.");
            }
            for (index, point) in points.iter().enumerate() {
                println!("{}", timeline_row(index, point));
            }
        }
        TimelineCommand::Trend => {
            for series in trend_series(&timeline.stored()?) {
                let unit = series.unit.as_deref().unwrap_or("points");
                println!(
                    "{} ({unit}) range {:.2}..{:.2}",
                    series.name, series.bounds.min, series.bounds.max
                );
                for point in &series.points {
                    println!(
                        "  {}  {}",
                        point.recorded_at.format("%Y-%m-%d %H:%M"),
                        fmt_opt(point.value)
                    );
                }
            }
        }
        TimelineCommand::Delete { index } => {
            let removed = timeline.remove(index)?;
            println!("Deleted point from {}.", removed.recorded_at.to_rfc3339());
        }
        TimelineCommand::Clear => {
            timeline.clear()?;
            println!("Timeline cleared.");
        }
        TimelineCommand::Export { out } => {
            let document = timeline.export_all()?;
            match out {
                Some(path) => {
                    std::fs::write(&path, &document)
                        .with_context(|| format!("cannot write export to {path:?}"))?;
                    println!("Exported {} points to {path:?}.", timeline.len()?);
                }
                None => println!("{document}"),
            }
        }
        TimelineCommand::Import { file } => {
            let document = std::fs::read_to_string(&file)
                .with_context(|| format!("cannot read import file {file:?}"))?;
            let added = timeline
                .import_merge(&document)
                .with_context(|| format!("import of {file:?} failed"))?;
            println!("Imported {added} new points. Timeline holds {} points.", timeline.len()?);
        }
    }
    Ok(())
}

async fn run_vault(
    vault: &Vault<FileStore>,
    passphrase: Option<&str>,
    command: VaultCommand,
) -> anyhow::Result<()> {
    if let VaultCommand::Clear = command {
        vault.clear()?;
        println!("Encrypted form cleared.");
        return Ok(());
    }

    let Some(passphrase) = passphrase else {
        bail!("a passphrase is required (--passphrase or TRIAGE_PASSPHRASE)");
    };

    match command {
        VaultCommand::Save { input } => {
            let observation = input.load()?;
            vault.save(passphrase, &observation).await?;
            println!("Encrypted form saved.");
        }
        VaultCommand::Load => match vault.load(passphrase).await {
            Ok(Some(observation)) => println!("{}", serde_json::to_string_pretty(&observation)?),
            Ok(None) => println!("No encrypted form saved."),
            Err(VaultError::Decryption) => bail!("decryption failed (wrong passphrase or corrupted data)"),
            Err(err) => return Err(err.into()),
        },
        VaultCommand::Clear => {}
    }
    Ok(())
}

fn timeline_row(index: usize, point: &TimelinePoint) -> String {
    let mut row = format!(
        "[{index}] {}  risk {:>2}/20  eGFR {}  creat {}  CRP {}",
        point.recorded_at.format("%Y-%m-%d %H:%M"),
        point.risk,
        fmt_opt(point.egfr),
        fmt_opt(point.creatinine),
        fmt_opt(point.crp),
    );
    if !point.notes.trim().is_empty() {
        row.push_str("  ");
        row.push_str(point.notes.trim());
    }
    row
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "—".to_string(), |v| v.to_string())
}
