//! Engine policy in `~/.config/momentum/config.toml`.

use clap::Subcommand;
use momentum_core::storage::CharacterConfig;
use momentum_core::{Config, ConfigError, MoodConfig};
use serde::Serialize;

use crate::session::print_json;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one value by dot path (e.g. "mood.window_size")
    Get { key: String },
    /// Change one value; the file is written only if the result validates
    Set { key: String, value: String },
    /// Print the validated [mood] and [character] sections
    Show,
}

#[derive(Serialize)]
struct Sections<'a> {
    mood: &'a MoodConfig,
    character: &'a CharacterConfig,
}

#[derive(Serialize)]
struct Updated<'a> {
    key: &'a str,
    value: Option<String>,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;

    match action {
        ConfigAction::Get { key } => {
            let value = config
                .get(&key)
                .ok_or_else(|| ConfigError::UnknownKey(key.clone()))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            config.save()?;
            tracing::info!(%key, %value, "config updated");
            print_json(&Updated {
                key: &key,
                value: config.get(&key),
            })?;
        }
        ConfigAction::Show => {
            config.validate()?;
            print_json(&Sections {
                mood: &config.mood,
                character: &config.character,
            })?;
        }
    }
    Ok(())
}
