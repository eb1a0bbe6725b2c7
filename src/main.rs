use clap::Parser;
use locres_exporter::{
    Cli, LocresError, LocresExporter, OutputFormatter, OutputMode, UserFriendlyError,
};
use std::process;

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    process::exit(exit_code);
}

async fn run() -> i32 {
    let cli = Cli::parse();

    // Handle special commands first
    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    // Configuration problems stop the run before any tool is started
    let exporter = match LocresExporter::from_cli(&cli) {
        Ok(exporter) => exporter,
        Err(e) => {
            print_startup_error(&cli, &e);
            return exit_code_for(&e);
        }
    };

    if cli.dry_run {
        return handle_dry_run(&cli, &exporter);
    }

    match exporter.export(cli.export_request()).await {
        Ok(report) => {
            let formatter = exporter.output_formatter();
            formatter.print_export_report(&report);

            if report.output.decision.wrote_file() {
                formatter.success("Done");
            } else {
                formatter.warning(&format!(
                    "Overwrite declined, {} was left unchanged",
                    report.output.path.display()
                ));
            }
            0
        }
        Err(e) => {
            exporter.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(error: &LocresError) -> i32 {
    match error {
        LocresError::Cancelled => 130, // Interrupted (SIGINT)
        LocresError::Config { .. }
        | LocresError::InvalidSetting { .. }
        | LocresError::InvalidLanguage { .. } => 2,
        LocresError::VersionNotFound { .. } | LocresError::MalformedVersionData { .. } => 3,
        LocresError::UnpackArtifactMissing { .. }
        | LocresError::ConversionFailed { .. }
        | LocresError::TableArtifactMissing { .. }
        | LocresError::TableFormat { .. }
        | LocresError::ToolLaunch { .. } => 4,
        LocresError::FileAlreadyExists { .. } => 5,
        _ => 1,
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli.config_target();

    match LocresExporter::generate_sample_config(&config_path) {
        Ok(()) => {
            println!(
                "Generated sample configuration file: {}",
                config_path.display()
            );
            println!("\nTo use this configuration:");
            println!("  locres-exporter --config {}", config_path.display());
            println!("\nFill in the [tools] and [paths] sections before the first export.");
            0
        }
        Err(e) => {
            eprintln!(
                "Failed to generate configuration file: {}",
                e.user_message()
            );
            if let LocresError::FileAlreadyExists { .. } = e {
                eprintln!("Suggestion: Edit the existing file or pass --config with a new path.");
            } else if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn handle_dry_run(cli: &Cli, exporter: &LocresExporter) -> i32 {
    let formatter = exporter.output_formatter();
    let request = cli.export_request();
    let plan = exporter.plan(&request);
    let config = exporter.config();

    formatter.info("DRY RUN MODE - No tool will be started and no file written");
    formatter.print_separator();
    formatter.success("Configuration is valid");

    println!("  Language:       {} / {}", request.language.pak(), request.language.folder());
    println!("  Archive:        {}", plan.artifacts.archive.display());
    println!("  Executable:     {}", plan.artifacts.executable.display());
    println!("  Unpack:         {}", config.tools.quickbms_path.display());
    println!("  Unpack script:  {}", config.tools.ut4_path.display());
    if let Some(ref old) = config.tools.ut4_old_path {
        println!("  Fallback:       {}", old.display());
    }
    println!("  Table export:   {}", config.tools.ul_path.display());
    for path in plan.intermediate_files() {
        println!("  Intermediate:   {}", path.display());
    }
    println!("  Output:         {}", plan.output);
    if let Some(ref archive) = plan.archive {
        println!("  Archive copy:   {}", archive);
    }
    println!("  Encoding:       {}", config.output.encoding);

    if plan.needs_version {
        formatter.info("{game_version} will be read from the game executable");
    }
    if request.sort_keys {
        formatter.info("Keys will be sorted naturally below each top-level group");
    }
    if request.force_overwrite {
        formatter.warning("Force mode enabled - existing output would be overwritten");
    }

    formatter.print_separator();
    formatter.success("Dry run completed successfully");
    0
}

fn print_startup_error(cli: &Cli, error: &LocresError) {
    let formatter = OutputFormatter::new(
        match cli.output_mode() {
            OutputMode::Json => OutputMode::Json,
            _ => OutputMode::Human,
        },
        0,
        false,
    );
    formatter.print_user_friendly_error(error);
}
