//! Command-line interface for chart-image-mirror
//!
//! One linear run: resolve the account, load and retarget the image list,
//! merge it into the values file, print a summary.

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chart_image_mirror::config::{load_image_config, load_targets};
use chart_image_mirror::domain::RegistryTarget;
use chart_image_mirror::registry::{resolve_account_id, rewrite_images, AwsCliLookup, AUTO_ACCOUNT};
use chart_image_mirror::values::{backup_values_file, merge_values_file};

mod summary;

const AFTER_HELP: &str = "\
Examples:
  chart-image-mirror                           # Use defaults (us-west-2, auto-detect account)
  chart-image-mirror us-east-1                 # Use us-east-1, auto-detect account
  chart-image-mirror us-east-1 123456789012    # Use us-east-1 and specific account ID

Configuration:
  ECR images are defined in: tools/ecr-images.conf
  Values file updated:
    - sagemaker-hyperpod-cli/helm_chart/HyperPodHelmChart/values.yaml";

/// Update Helm values.yaml files with ECR image references
#[derive(Parser)]
#[command(name = "chart-image-mirror")]
#[command(author, version, about, long_about = None, after_help = AFTER_HELP)]
pub struct Cli {
    /// AWS region for ECR repositories
    #[arg(default_value = "us-west-2")]
    region: String,

    /// AWS account ID for ECR repositories ("auto" asks the AWS CLI)
    #[arg(default_value = AUTO_ACCOUNT)]
    account_id: String,

    /// Image list in name=registry/path:tag form
    #[arg(long, value_name = "FILE", env = "CHART_MIRROR_CONFIG", default_value = "tools/ecr-images.conf")]
    config: PathBuf,

    /// Helm values file to update in place
    #[arg(
        long,
        value_name = "FILE",
        env = "CHART_MIRROR_VALUES",
        default_value = "sagemaker-hyperpod-cli/helm_chart/HyperPodHelmChart/values.yaml"
    )]
    values: PathBuf,

    /// YAML table of override targets replacing the built-in one
    #[arg(long, value_name = "FILE", env = "CHART_MIRROR_TARGETS")]
    targets: Option<PathBuf>,

    /// AWS CLI executable used for account auto-detection
    #[arg(long, value_name = "PROGRAM", env = "CHART_MIRROR_AWS_CLI", default_value = "aws")]
    aws_cli: String,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long)]
    verbose: bool,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    println!("{}", style("Updating Helm values.yaml files with ECR image references...").blue());
    println!("Region: {}", cli.region);
    println!("Account ID: {}", cli.account_id);
    println!();

    if cli.account_id == AUTO_ACCOUNT {
        println!("{}", style("Auto-detecting AWS account ID...").yellow());
    }
    let account_id = resolve_account_id(&cli.account_id, &AwsCliLookup::new(&cli.aws_cli))?;
    if cli.account_id == AUTO_ACCOUNT {
        println!("Detected account ID: {}", account_id);
    }
    let target = RegistryTarget::new(cli.region, account_id);

    println!("{}", style("Parsing ECR configuration...").blue());
    let mut images = load_image_config(&cli.config)?;
    let targets = load_targets(cli.targets.as_deref())?;

    println!("{}", style("Updating ECR URLs for target account and region...").blue());
    let rewritten = rewrite_images(&mut images, &target);
    tracing::debug!("Rewrote {} of {} image references", rewritten, images.len());

    println!("{}", style("Updating main values.yaml file with ECR image overrides...").blue());
    backup_values_file(&cli.values)
        .with_context(|| format!("Failed backing up {}", cli.values.display()))?;
    println!("{}", style(format!("✓ Backed up {}", cli.values.display())).green());

    let applied = merge_values_file(&cli.values, &images, &targets)
        .with_context(|| format!("Failed updating {}", cli.values.display()))?;
    for entry in &applied {
        println!("{}", style(format!("✓ Added {} override: {}", entry.label, entry.reference)).green());
    }
    println!("{}", style("✓ Updated main values.yaml file with ECR image overrides").green());

    summary::print_summary(&applied, &target)?;
    Ok(())
}
