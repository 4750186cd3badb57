use crate::session::{self, print_json};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let session = session::open()?;
    print_json(&session.rendered_state().await?)?;
    Ok(())
}
