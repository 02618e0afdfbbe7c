use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};

use subgen::interfaces::{generate, write_subscription, Collaborators};
use subgen::{GenerateError, Settings};

/// Aggregate candidate endpoints from several sources into one base64 subscription
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML or YAML settings file
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Template URI file, overrides `template_path`
    #[arg(short, long, value_name = "FILE")]
    template: Option<String>,

    /// Local domain list, overrides the local list source
    #[arg(short, long, value_name = "FILE")]
    domains: Option<String>,

    /// Output file, overrides `output_path`
    #[arg(short, long, value_name = "OUTPUT_FILE")]
    output: Option<String>,

    /// Skip geolocation lookups
    #[arg(long)]
    no_geo: bool,

    /// Print the payload instead of writing it to a file
    #[arg(long)]
    stdout: bool,
}

fn load_settings(args: &Args) -> anyhow::Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path))?,
        None => Settings::default(),
    };

    if let Some(template) = &args.template {
        settings.template_path = template.clone();
    }
    if let Some(domains) = &args.domains {
        settings.set_domains_file(domains);
    }
    if let Some(output) = &args.output {
        settings.output_path = output.clone();
    }
    if args.no_geo {
        settings.geo.enabled = false;
    }
    Ok(settings)
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let settings = load_settings(&args)?;
    let collaborators =
        Collaborators::from_settings(&settings).context("Failed to set up HTTP client")?;

    let subscription = match generate(&settings, &collaborators).await {
        Ok(subscription) => subscription,
        Err(GenerateError::EmptyResult) => {
            warn!("Nothing to generate: no addresses were collected, no file written");
            return Ok(ExitCode::from(2));
        }
        Err(e) => return Err(e.into()),
    };

    if args.stdout {
        println!("{}", subscription.payload);
    } else {
        write_subscription(&settings.output_path, &subscription.payload)?;
        info!(
            "Wrote {} nodes to {}",
            subscription.uris.len(),
            settings.output_path
        );
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize the logger
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
