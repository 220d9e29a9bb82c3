use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use transclusion_bot_core::TemplateName;
use transclusion_bot_core::api::WikiSession;
use transclusion_bot_core::auth::{login, require_bot_rights};
use transclusion_bot_core::batch::{BatchReport, RunOptions, run};
use transclusion_bot_core::client::MediaWikiClient;
use transclusion_bot_core::config::{BotConfig, ConfigOverrides, load_config_file};
use transclusion_bot_core::preview::preview_run;

const DEFAULT_CONFIG_FILE: &str = "transclusion-bot.toml";

#[derive(Debug, Parser)]
#[command(
    name = "transclusion-bot",
    version,
    about = "Replace transclusions of a MediaWiki template with substitutions"
)]
struct Cli {
    #[arg(
        short = 'w',
        long,
        value_name = "API_URL",
        help = "Path to the api.php of the wiki the bot should edit on"
    )]
    wiki: String,
    #[arg(
        short = 't',
        long,
        value_name = "NAME",
        help = "Template that should have its transclusions replaced with substitutions"
    )]
    template: String,
    #[arg(
        short = 'b',
        long,
        help = "If set, edits will only be made if the account is a bot"
    )]
    forcebot: bool,
    #[arg(long, help = "Submit edits without marking them as bot edits")]
    no_bot_flag: bool,
    #[arg(long, help = "Show the rewrites as diffs without editing")]
    dry_run: bool,
    #[arg(long, value_name = "PATH", help = "Config file (default: ./transclusion-bot.toml)")]
    config: Option<PathBuf>,
    #[arg(short, long, action = clap::ArgAction::Count, help = "Increase log verbosity")]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{}", fatal_message(&error));
            ExitCode::FAILURE
        }
    }
}

/// The single line printed for an error that ends the run.
fn fatal_message(error: &anyhow::Error) -> String {
    format!("Error: {error:#}")
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_cli(cli: Cli) -> Result<()> {
    dotenvy::dotenv().ok();

    let template = TemplateName::parse(&cli.template)?;
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let file = load_config_file(&config_path)?;
    let config = BotConfig::resolve(
        &file,
        &ConfigOverrides {
            api_url: Some(cli.wiki.clone()),
        },
    )?;

    let client = MediaWikiClient::new(&config)?;
    match &config.credentials {
        Some(credentials) => {
            info!("attempting login as {}", credentials.username);
            login(&client, credentials)?;
        }
        None => info!("no username configured; editing anonymously"),
    }

    if cli.dry_run {
        return run_dry(&client, &template, cli.forcebot);
    }

    let options = RunOptions {
        force_bot_check: cli.forcebot,
        mark_as_bot: !cli.no_bot_flag,
    };
    let outcomes = run(&client, &template, options)
        .with_context(|| format!("run for Template:{template} aborted"))?;
    let report = BatchReport::new(&template, outcomes, client.request_count());
    print_report(&report);
    Ok(())
}

fn run_dry(client: &MediaWikiClient, template: &TemplateName, forcebot: bool) -> Result<()> {
    if forcebot {
        require_bot_rights(client)?;
    }
    let previews = preview_run(client, template)?;
    println!("dry run: {} pages transclude Template:{template}", previews.len());
    for preview in &previews {
        println!("page: {} (replacements: {})", preview.title, preview.replacements);
        if !preview.diff.is_empty() {
            print!("{}", preview.diff);
        }
    }
    Ok(())
}

fn print_report(report: &BatchReport) {
    println!("template: Template:{}", report.template);
    println!("pages.discovered: {}", report.discovered);
    println!("pages.edited: {}", report.succeeded);
    println!("pages.failed: {}", report.failed);
    println!("requests: {}", report.request_count);
    for outcome in report.failures() {
        eprintln!(
            "Failed editing {} - {}",
            outcome.title,
            outcome.failure_message()
        );
    }
}
