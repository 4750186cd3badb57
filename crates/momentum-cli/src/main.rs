use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod session;

#[derive(Parser)]
#[command(name = "momentum-cli", version, about = "Momentum CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Business plan import
    Plan {
        #[command(subcommand)]
        action: commands::plan::PlanAction,
    },
    /// Habit check-offs
    Habit {
        #[command(subcommand)]
        action: commands::habit::HabitAction,
    },
    /// Record a task or submission completion from JSON
    Submit {
        /// JSON record, e.g. '{"id":"hw-3","status":"completed","points":5}'
        record: String,
    },
    /// Show the current mood and rendered state
    Mood,
    /// Assistant character controls
    Character {
        #[command(subcommand)]
        action: commands::character::CharacterAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Task { action } => commands::task::run(action).await,
        Commands::Plan { action } => commands::plan::run(action).await,
        Commands::Habit { action } => commands::habit::run(action).await,
        Commands::Submit { record } => commands::habit::submit(&record).await,
        Commands::Mood => commands::mood::run().await,
        Commands::Character { action } => commands::character::run(action).await,
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
