//! `alertd ack`: acknowledge motion or temperature alarms.

use alertd_core::Engine;

use crate::cli::{AckArgs, AckCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub async fn handle(engine: &Engine, args: AckArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        AckCommand::Motion => {
            engine.acknowledge_motion().await?;
            output::print_status("✓ Motion alarm acknowledged", global.quiet);
            Ok(())
        }

        AckCommand::Temperature { no_resume } => {
            engine.acknowledge_temperature().await?;
            output::print_status("✓ Temperature alarm acknowledged", global.quiet);

            if no_resume || !engine.config().auto_resume {
                output::print_status(
                    "  Monitoring stays suppressed; run `alertd resume` to lift it",
                    global.quiet,
                );
                return Ok(());
            }

            output::print_status(
                &format!(
                    "  Resuming monitoring in {}",
                    humantime::format_duration(engine.config().resume_delay)
                ),
                global.quiet,
            );
            engine.wait_auto_resume().await;

            if engine.is_temperature_suppressed() {
                output::print_status(
                    "! Automatic resume failed; run `alertd resume` to retry",
                    global.quiet,
                );
            } else {
                output::print_status("✓ Temperature monitoring resumed", global.quiet);
            }
            Ok(())
        }
    }
}
