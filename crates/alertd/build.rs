//! Renders man pages for `alertd` and its subcommands into `$OUT_DIR/man`:
//! `alertd.1`, `alertd-watch.1`, `alertd-ack-temperature.1`,
//! `alertd-config-show.1` and so on.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::CommandFactory;

// The command tree needs nothing beyond clap and clap_complete.
#[allow(dead_code)]
#[path = "src/cli.rs"]
mod cli;

type BuildResult = Result<(), Box<dyn Error>>;

fn main() -> BuildResult {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let out_dir = std::env::var_os("OUT_DIR").ok_or("cargo did not set OUT_DIR")?;
    let man_dir = PathBuf::from(out_dir).join("man");
    fs::create_dir_all(&man_dir)?;

    let alertd = cli::Cli::command();
    render_page(&alertd, &man_dir)?;
    for command in alertd.get_subcommands().filter(|c| !c.is_hide_set()) {
        render_tree(command, "alertd", &man_dir)?;
    }
    Ok(())
}

/// Page for `command` named `<prefix>-<name>`, then one per nested
/// subcommand (`ack motion` becomes `alertd-ack-motion.1`).
fn render_tree(command: &clap::Command, prefix: &str, dir: &Path) -> BuildResult {
    let name = format!("{prefix}-{}", command.get_name());
    render_page(&command.clone().name(name.clone()), dir)?;

    for sub in command.get_subcommands().filter(|s| !s.is_hide_set()) {
        render_tree(sub, &name, dir)?;
    }
    Ok(())
}

fn render_page(command: &clap::Command, dir: &Path) -> BuildResult {
    let path = dir.join(format!("{}.1", command.get_name()));
    let mut page = Vec::new();
    clap_mangen::Man::new(command.clone())
        .render(&mut page)
        .map_err(|e| format!("rendering man page {}: {e}", path.display()))?;
    fs::write(&path, page).map_err(|e| format!("writing {}: {e}", path.display()))?;
    Ok(())
}
