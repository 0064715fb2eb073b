//! Zenith Control - CLI front end for Zenith diagnostics
//!
//! Collects telemetry from flags, runs the diagnostic sequence and prints
//! the result, or the error pair with a kind-specific exit code.

mod display;
mod errors;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use zenith_common::service::validate_telemetry;
use zenith_common::{
    DiagnosticsService, ErrorReport, OperatingSystem, StorageClass, TelemetryInput, ZenithError,
    APP_VERSION,
};

use display::Painter;

#[derive(Parser)]
#[command(name = "zenithctl")]
#[command(about = "Zenith - hardware bottleneck diagnostics", long_about = None)]
#[command(version = APP_VERSION)]
struct Cli {
    /// Log pipeline progress to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Diagnose a performance problem
    Diagnose {
        #[command(flatten)]
        telemetry: TelemetryArgs,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the prompt that would be sent, without contacting the service
    Prompt {
        #[command(flatten)]
        telemetry: TelemetryArgs,
    },

    /// Show version information
    Version,
}

#[derive(Args, Debug, Clone)]
struct TelemetryArgs {
    /// CPU model, e.g. "AMD Ryzen 5"
    #[arg(long, default_value = "")]
    cpu: String,

    /// GPU model, e.g. "NVIDIA RTX 3050"
    #[arg(long, default_value = "")]
    gpu: String,

    /// Installed memory, e.g. "16GB"
    #[arg(long)]
    ram: Option<String>,

    /// nvme-ssd, sata-ssd or hdd
    #[arg(long)]
    storage: Option<StorageClass>,

    /// windows-10, windows-11, linux or macos
    #[arg(long = "os")]
    os_name: Option<OperatingSystem>,

    /// Application or game being diagnosed
    #[arg(long = "app", default_value = "")]
    application: String,

    /// What goes wrong, in your own words
    #[arg(long)]
    symptoms: Option<String>,
}

impl TelemetryArgs {
    fn into_telemetry(self) -> TelemetryInput {
        TelemetryInput::new(
            self.cpu,
            self.gpu,
            self.ram.as_deref(),
            self.storage,
            self.os_name,
            self.application,
            self.symptoms.as_deref(),
        )
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_env("ZENITH_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn thinking_spinner() -> Option<ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return None;
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template("{spinner:.cyan} {msg}")
    {
        spinner.set_style(style);
    }
    spinner.set_message("Executing diagnostic protocol...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    Some(spinner)
}

fn diagnose(telemetry: TelemetryArgs, json: bool, painter: &Painter) -> Result<()> {
    let telemetry = telemetry.into_telemetry();
    let service = DiagnosticsService::from_env()?;

    let spinner = if json { None } else { thinking_spinner() };
    let result = service.run_diagnostics(&telemetry);
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let response = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!(
            "ZENITH DIAGNOSTICS  {}  {}",
            display::sanitize(&telemetry.application),
            chrono::Local::now().format("%Y-%m-%d %H:%M")
        );
        println!();
        print!("{}", display::render_response(&response, painter));
    }
    Ok(())
}

fn prompt(telemetry: TelemetryArgs) -> Result<()> {
    let telemetry = telemetry.into_telemetry();
    validate_telemetry(&telemetry)?;
    print!("{}", telemetry.format_prompt());
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let painter = Painter::new(std::io::stdout().is_terminal());
    let json = matches!(cli.command, Commands::Diagnose { json: true, .. });

    let outcome = match cli.command {
        Commands::Diagnose { telemetry, json } => diagnose(telemetry, json, &painter),
        Commands::Prompt { telemetry } => prompt(telemetry),
        Commands::Version => {
            println!("zenithctl v{}", APP_VERSION);
            Ok(())
        }
    };

    let Err(err) = outcome else {
        std::process::exit(errors::EXIT_SUCCESS);
    };

    let report = match err.downcast_ref::<ZenithError>() {
        Some(domain) => ErrorReport::from(domain),
        None => ErrorReport::unhandled(&err),
    };

    if json {
        let body = serde_json::json!({ "error": report });
        println!("{}", body);
    } else {
        eprintln!("{}", display::render_error(&report, &Painter::new(std::io::stderr().is_terminal())));
    }

    std::process::exit(errors::exit_code(&report));
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_diagnose_flags() {
        let cli = Cli::try_parse_from([
            "zenithctl",
            "diagnose",
            "--cpu",
            "AMD Ryzen 5",
            "--gpu",
            "NVIDIA RTX 3050",
            "--storage",
            "nvme-ssd",
            "--os",
            "Windows 11",
            "--app",
            "Elden Ring",
            "--json",
        ])
        .unwrap();

        let Commands::Diagnose { telemetry, json } = cli.command else {
            panic!("expected diagnose");
        };
        assert!(json);
        let telemetry = telemetry.into_telemetry();
        assert_eq!(telemetry.storage, Some(StorageClass::NvmeSsd));
        assert_eq!(telemetry.os_name, Some(OperatingSystem::Windows11));
        assert_eq!(telemetry.ram, "Not specified");
        assert_eq!(telemetry.symptoms, "Not specified");
    }

    #[test]
    fn test_unknown_os_is_rejected_by_parser() {
        let result = Cli::try_parse_from(["zenithctl", "prompt", "--os", "TempleOS"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_required_fields_are_left_to_validation() {
        let cli = Cli::try_parse_from(["zenithctl", "prompt", "--gpu", "RTX 4090"]).unwrap();
        let Commands::Prompt { telemetry } = cli.command else {
            panic!("expected prompt");
        };
        let err = prompt(telemetry).unwrap_err();
        let domain = err.downcast_ref::<ZenithError>().unwrap();
        assert_eq!(domain.kind(), zenith_common::ZenithErrorKind::Validation);
    }
}
