//! Assistant character controls.

use clap::Subcommand;
use momentum_core::UserType;

use crate::session::{self, print_json};

#[derive(Subcommand)]
pub enum CharacterAction {
    /// Open the character
    Open,
    /// Close the character
    Close,
    /// Start chatting (opens the character if needed)
    Chat {
        /// Greeting shown while chatting
        #[arg(long, default_value = "")]
        greeting: String,
    },
    /// Stop chatting; the character stays open
    StopChat,
    /// Classify the user
    UserType {
        /// new, experienced, agency, team-lead or unknown
        user_type: String,
    },
}

pub async fn run(action: CharacterAction) -> Result<(), Box<dyn std::error::Error>> {
    let session = session::open()?;

    let snapshot = match action {
        CharacterAction::Open => session.open_character().await?,
        CharacterAction::Close => session.close_character().await?,
        CharacterAction::Chat { greeting } => session.start_chatting(greeting).await?,
        CharacterAction::StopChat => session.stop_chatting().await?,
        CharacterAction::UserType { user_type } => {
            let parsed = UserType::parse(&user_type);
            if parsed == UserType::Unknown && !user_type.eq_ignore_ascii_case("unknown") {
                return Err(format!("unknown user type: {user_type}").into());
            }
            session.set_user_type(parsed).await?
        }
    };
    print_json(&snapshot)?;
    print_json(&session.latest())?;
    Ok(())
}
