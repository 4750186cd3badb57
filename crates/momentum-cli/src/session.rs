//! Session bootstrap for one CLI invocation.

use momentum_core::{spawn_session, Config, Engine, PlanDb, SessionHandle};

/// Open the on-disk store and start a session over it.
pub fn open() -> Result<SessionHandle<PlanDb>, Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let db = PlanDb::open()?;
    tracing::debug!(window_size = config.mood.window_size, "opening cli session");
    let engine = Engine::new(db, &config)?;
    Ok(spawn_session("cli", engine))
}

/// Print any serializable value as pretty JSON.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
