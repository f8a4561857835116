use clap::{Parser, Subcommand};

mod commands;
mod logging;

#[derive(Parser)]
#[command(
    name = "focusforge-cli",
    version,
    about = "FocusForge adaptive session scheduler"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Session log
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Analytics over the session log
    Stats,
    /// Work/break durations
    Schedule {
        #[command(subcommand)]
        action: commands::schedule::ScheduleAction,
    },
    /// Train a scheduling policy from session history
    Train(commands::train::TrainArgs),
    /// Scheduling policy status
    Policy {
        #[command(subcommand)]
        action: commands::policy::PolicyAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    logging::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Session { action } => commands::session::run(action),
        Commands::Stats => commands::stats::run(),
        Commands::Schedule { action } => commands::schedule::run(action),
        Commands::Train(args) => commands::train::run(args),
        Commands::Policy { action } => commands::policy::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
