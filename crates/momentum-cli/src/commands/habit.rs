//! Habit check-offs and task submissions.

use clap::Subcommand;
use momentum_core::{HabitCompletion, RawCompletion};

use crate::session::{self, print_json};

#[derive(Subcommand)]
pub enum HabitAction {
    /// Check off a habit for today
    Complete {
        /// Habit ID
        habit_id: String,
        /// Record a miss instead of a completion
        #[arg(long)]
        missed: bool,
        /// Optional notes
        #[arg(long)]
        notes: Option<String>,
    },
}

pub async fn run(action: HabitAction) -> Result<(), Box<dyn std::error::Error>> {
    let session = session::open()?;

    match action {
        HabitAction::Complete {
            habit_id,
            missed,
            notes,
        } => {
            let raw = RawCompletion::Habit(HabitCompletion {
                habit_id,
                completed: Some(!missed),
                notes,
            });
            session.record_completion(raw).await?;
            print_json(&session.latest())?;
        }
    }
    Ok(())
}

/// Record a task/submission completion given as JSON.
pub async fn submit(record: &str) -> Result<(), Box<dyn std::error::Error>> {
    let raw = RawCompletion::from_value(serde_json::from_str(record)?)?;
    let session = session::open()?;
    match session.record_completion(raw).await? {
        Some(event) => print_json(&event)?,
        None => println!("No completion recorded (submission pending)"),
    }
    print_json(&session.latest())?;
    Ok(())
}
