//! Plan task commands for CLI.

use chrono::NaiveDate;
use clap::Subcommand;
use momentum_core::{NewTask, TaskPatch};

use crate::session::{self, print_json};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Create {
        /// Task title
        title: String,
        /// Task description
        #[arg(long)]
        description: Option<String>,
        /// Planned date (YYYY-MM-DD)
        #[arg(long)]
        planned_date: Option<NaiveDate>,
        /// Milestone this task belongs to
        #[arg(long)]
        milestone: Option<String>,
    },
    /// List tasks
    List {
        /// Only tasks of this milestone
        #[arg(long)]
        milestone: Option<String>,
        /// Only tasks without a planned date
        #[arg(long)]
        unscheduled: bool,
    },
    /// Update a task
    Update {
        /// Task ID
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// Set completed status
        #[arg(long)]
        completed: Option<bool>,
        /// New planned date (YYYY-MM-DD)
        #[arg(long)]
        planned_date: Option<NaiveDate>,
        /// Clear the planned date
        #[arg(long, conflicts_with = "planned_date")]
        unschedule: bool,
    },
    /// Flip a task's completion
    Toggle {
        /// Task ID
        id: String,
    },
    /// Move a task to another date, or unschedule it
    Reschedule {
        /// Task ID
        id: String,
        /// New date (YYYY-MM-DD); omit to unschedule
        date: Option<NaiveDate>,
    },
}

pub async fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let session = session::open()?;

    match action {
        TaskAction::Create {
            title,
            description,
            planned_date,
            milestone,
        } => {
            let task = session
                .create_task(NewTask {
                    title,
                    description,
                    planned_date,
                    completed: None,
                    milestone_ref: milestone,
                })
                .await?;
            println!("Task created: {}", task.id);
            print_json(&task)?;
        }
        TaskAction::List {
            milestone,
            unscheduled,
        } => {
            let tasks: Vec<_> = session
                .rendered_state()
                .await?
                .tasks
                .into_iter()
                .filter(|task| {
                    if let Some(ref m) = milestone {
                        if task.milestone_ref.as_ref() != Some(m) {
                            return false;
                        }
                    }
                    !unscheduled || !task.is_scheduled()
                })
                .collect();
            print_json(&tasks)?;
        }
        TaskAction::Update {
            id,
            title,
            description,
            completed,
            planned_date,
            unschedule,
        } => {
            let planned_date = if unschedule {
                Some(None)
            } else {
                planned_date.map(Some)
            };
            let patch = TaskPatch {
                title,
                description,
                completed,
                planned_date,
            };
            let task = session.update_task(id, patch).await?;
            println!("Task updated:");
            print_json(&task)?;
        }
        TaskAction::Toggle { id } => {
            let task = session.toggle_completion(id).await?;
            print_json(&task)?;
            print_json(&session.latest())?;
        }
        TaskAction::Reschedule { id, date } => {
            let task = session.reschedule(id, date).await?;
            print_json(&task)?;
        }
    }
    Ok(())
}
