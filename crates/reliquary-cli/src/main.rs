use std::process::ExitCode;

use clap::Parser;
use reliquary_cli::commands;
use reliquary_cli::config::{Cli, Settings};
use reliquary_logging::ReliquarySubscriberBuilder;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::resolve(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::from(2);
        }
    };

    let mut logging = ReliquarySubscriberBuilder::new().with_config(settings.log.clone());
    if let Some(file) = settings.log_file.clone() {
        logging = logging.with_file_output(file);
    }
    let _guard = match logging.try_init() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    match commands::run(&cli.command, &settings) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(commands::exit_code(&e))
        }
    }
}
