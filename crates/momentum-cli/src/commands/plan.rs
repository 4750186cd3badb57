//! Business plan import.

use clap::Subcommand;
use momentum_core::AiDetails;
use std::path::PathBuf;

use crate::session::{self, print_json};

#[derive(Subcommand)]
pub enum PlanAction {
    /// Create one task per milestone of a generated plan
    Seed {
        /// Path to the plan JSON
        file: PathBuf,
    },
    /// Show the status of a milestone
    Milestone {
        /// Milestone name
        name: String,
    },
}

pub async fn run(action: PlanAction) -> Result<(), Box<dyn std::error::Error>> {
    let session = session::open()?;

    match action {
        PlanAction::Seed { file } => {
            let plan = AiDetails::from_json(&std::fs::read_to_string(&file)?)?;
            let seeded = session.seed_from_plan(plan).await?;
            println!("Seeded {} task(s)", seeded.len());
            print_json(&seeded)?;
        }
        PlanAction::Milestone { name } => match session.milestone_status(name.clone()).await? {
            Some(status) => print_json(&status)?,
            None => return Err(format!("no tasks reference milestone: {name}").into()),
        },
    }
    Ok(())
}
