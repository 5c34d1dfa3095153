//! `alertd resume`: lift temperature suppression on the hub.

use alertd_core::Engine;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn handle(engine: &Engine, global: &GlobalOpts) -> Result<(), CliError> {
    engine.resume_temperature().await?;
    output::print_status("✓ Temperature monitoring resumed", global.quiet);
    Ok(())
}
