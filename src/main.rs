use anyhow::Result;
use clap::Parser;
use crossbeam_channel::{unbounded, Receiver};

use cityfilter::config_file::{extract_config_file_arg, ConfigFile};
use cityfilter::platform::{Ctrl, ExitCode, SafeStderr, SafeStdout, SignalHandler};
use cityfilter::{
    CityFilterConfig, Cli, ErrorReporter, PipelineOutcome, PipelineProcessor, ReportFormatter,
};

fn main() {
    // Shutdown requests from the signal handler
    let (ctrl_tx, ctrl_rx) = unbounded::<Ctrl>();

    let _signal_handler = match SignalHandler::new(ctrl_tx) {
        Ok(handler) => handler,
        Err(e) => {
            eprintln!("cityfilter: Failed to initialize signal handling: {}", e);
            ExitCode::GeneralError.exit();
        }
    };

    let mut stderr = SafeStderr::new();
    let cli = process_args_with_config(&mut stderr);
    let config = CityFilterConfig::from_cli(&cli);

    if let Err(e) = config.validate() {
        stderr
            .writeln(&config.format_error_message(&format!("Error: {}", e)))
            .unwrap_or(());
        ExitCode::InvalidUsage.exit();
    }

    let result = run_pipeline(&config, ctrl_rx);

    // A signal that lands after the walk has finished still cancels the report
    if let Some(code) = SignalHandler::termination_exit_code() {
        stderr
            .writeln(&config.format_error_message("Processing interrupted"))
            .unwrap_or(());
        code.exit();
    }

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            stderr
                .writeln(&config.format_error_message(&format!("Error: {:#}", e)))
                .unwrap_or(());
            ExitCode::GeneralError.exit();
        }
    };

    if let Err(e) = print_report(&config, &outcome) {
        stderr
            .writeln(&config.format_error_message(&e.to_string()))
            .unwrap_or(());
        ExitCode::GeneralError.exit();
    }

    if config.output.stats {
        stderr
            .writeln(&config.format_info_message(&outcome.stats.format_stats()))
            .unwrap_or(());
    }

    let mut reporter = ErrorReporter::new();
    for failure in outcome.failures {
        reporter.report_error(failure);
    }
    if !reporter.has_errors() {
        ExitCode::Success.exit();
    }

    let mut lines = reporter.summary_lines().into_iter();
    if let Some(headline) = lines.next() {
        stderr
            .writeln(&config.format_error_message(&headline))
            .unwrap_or(());
    }
    for line in lines {
        stderr.writeln(&line).unwrap_or(());
    }
    if let Some(path) = &config.output.error_report {
        if let Err(e) = reporter.write_summary_to_file(path) {
            stderr
                .writeln(&config.format_error_message(&format!("{:#}", e)))
                .unwrap_or(());
        }
    }
    ExitCode::GeneralError.exit();
}

/// Parse arguments after applying config file defaults
fn process_args_with_config(stderr: &mut SafeStderr) -> Cli {
    let raw_args: Vec<String> = std::env::args().collect();

    if raw_args.iter().any(|arg| arg == "--show-config") {
        ConfigFile::show_config();
        ExitCode::Success.exit();
    }

    let processed_args = if raw_args.iter().any(|arg| arg == "--ignore-config") {
        raw_args
    } else {
        let config_file_path = extract_config_file_arg(&raw_args);
        match ConfigFile::load_with_custom_path(config_file_path.as_deref())
            .and_then(|config_file| config_file.process_args(raw_args))
        {
            Ok(processed) => processed,
            Err(e) => {
                stderr
                    .writeln(&format!("cityfilter: Config error: {:#}", e))
                    .unwrap_or(());
                ExitCode::GeneralError.exit();
            }
        }
    };

    // Usage errors exit with status 2, --help and --version with 0
    let mut cli = Cli::try_parse_from(processed_args).unwrap_or_else(|e| e.exit());
    cli.resolve_boolean_flags();
    cli
}

fn run_pipeline(config: &CityFilterConfig, ctrl_rx: Receiver<Ctrl>) -> Result<PipelineOutcome> {
    let processor = PipelineProcessor::new(config.pipeline_config());
    processor.run(&config.input.root, ctrl_rx)
}

fn print_report(config: &CityFilterConfig, outcome: &PipelineOutcome) -> Result<()> {
    let mut stdout = SafeStdout::new();
    for line in ReportFormatter::new(config.output.sort).format(&outcome.subdivisions) {
        stdout.writeln(&line)?;
    }
    stdout.flush()
}
