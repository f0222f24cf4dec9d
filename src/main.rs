use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use rhui_check::{
    checks::{self, CheckContext},
    cli::{Cli, ReportFormat},
    framework::{self, Framework, FrameworkError},
    logging,
    report::Report,
    RHUI_CHECK_VERSION,
};

const EXIT_HEALTHY: u8 = 0;
const EXIT_LOGGING_SETUP: u8 = 1;
const EXIT_DETECTION: u8 = 2;
const EXIT_CHECK_FAILED: u8 = 3;
const EXIT_RENDER: u8 = 4;

fn run_with(args: &Cli, detect: impl FnOnce() -> Result<Framework, FrameworkError>) -> u8 {
    // Log version ASAP
    info!("rhui-check version: {RHUI_CHECK_VERSION}");

    let framework = match detect() {
        Ok(framework) => framework,
        Err(e) => {
            error!("Framework detection failed: {e}");
            return EXIT_DETECTION;
        }
    };
    info!("Running on framework '{framework}'");

    let ctx = CheckContext {
        root: args.root.clone(),
        framework,
        fix: args.fix,
        timeout: args.timeout(),
    };
    let report = Report::new(framework, args.fix, checks::run_checks(&ctx));

    let rendered = match args.format {
        ReportFormat::Text => Ok(report.render_text()),
        ReportFormat::Json => report.render_json(),
    };
    match rendered {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => {
            error!("Failed to render report: {e:?}");
            return EXIT_RENDER;
        }
    }

    if report.is_healthy() {
        EXIT_HEALTHY
    } else {
        EXIT_CHECK_FAILED
    }
}

fn main() -> ExitCode {
    let args = Cli::parse();

    if let Err(e) = logging::setup(args.verbosity, args.log_file().map(|p| p.as_path())) {
        eprintln!("Failed to initialize logging: {e:?}");
        return ExitCode::from(EXIT_LOGGING_SETUP);
    }

    ExitCode::from(run_with(&args, framework::detect_framework))
}
