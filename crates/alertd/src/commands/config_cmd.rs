//! Config subcommand handlers.

use dialoguer::{Confirm, Input};
use serde::Serialize;
use tabled::Tabled;

use alertd_core::DEFAULT_THRESHOLD;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

use super::util::{self, prompt_err};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Tabled)]
struct ProfileRow {
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "URL")]
    base_url: String,
    #[tabled(rename = "Threshold")]
    threshold: f64,
    #[tabled(rename = "Auto-resume")]
    auto_resume: bool,
    #[tabled(rename = "Default")]
    #[serde(rename = "default")]
    is_default: String,
}

fn profile_rows(cfg: &Config) -> Vec<ProfileRow> {
    let default = cfg.default_profile_name();
    let mut rows: Vec<ProfileRow> = cfg
        .profiles
        .iter()
        .map(|(name, p)| ProfileRow {
            name: name.clone(),
            base_url: p.base_url.clone(),
            threshold: p.threshold,
            auto_resume: p.auto_resume,
            is_default: if name == default { "*".into() } else { String::new() },
        })
        .collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => init(global),

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let toml_text = toml::to_string_pretty(&cfg)?;
            let out = output::render_single(
                &global.output,
                &cfg,
                |_| toml_text.trim_end().to_owned(),
                |c| c.default_profile_name().to_owned(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config()?;
            if cfg.profiles.is_empty() {
                output::print_status("No profiles configured. Run: alertd config init", global.quiet);
                return Ok(());
            }
            let rows = profile_rows(&cfg);
            let out = output::render_list(
                &global.output,
                &rows,
                ProfileRow::clone,
                |r| r.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config()?;
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            output::print_status(&format!("✓ Default profile set to '{name}'"), global.quiet);
            Ok(())
        }
    }
}

fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("alertd configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let mut cfg = config::load_config()?;

    // 1. Profile name
    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    if cfg.profiles.contains_key(&profile_name)
        && !util::confirm(&format!("Overwrite profile '{profile_name}'?"), global.yes)?
    {
        eprintln!("Aborted; profile left unchanged.");
        return Ok(());
    }

    // 2. Hub URL
    let base_url: String = Input::new()
        .with_prompt("Alert hub URL")
        .default(global.url.clone().unwrap_or_else(|| alertd_core::DEFAULT_BASE_URL.into()))
        .interact_text()
        .map_err(prompt_err)?;

    // 3. Threshold
    let threshold: f64 = Input::new()
        .with_prompt("Temperature alarm threshold")
        .default(global.threshold.unwrap_or(DEFAULT_THRESHOLD))
        .interact_text()
        .map_err(prompt_err)?;

    // 4. Auto-resume
    let auto_resume = Confirm::new()
        .with_prompt("Resume temperature monitoring automatically after an acknowledgment?")
        .default(true)
        .interact()
        .map_err(prompt_err)?;

    let profile = Profile {
        base_url,
        threshold,
        auto_resume,
        insecure: global.insecure.then_some(true),
        ..Profile::default()
    };

    // Validate before writing anything.
    alertd_config::profile_to_engine_config(&profile)?;

    cfg.profiles.insert(profile_name.clone(), profile);
    if cfg.profiles.len() == 1 || cfg.default_profile.is_none() {
        cfg.default_profile = Some(profile_name.clone());
    }

    let path = config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", path.display());
    eprintln!("  Active profile: {}", cfg.default_profile_name());
    eprintln!("\n  Test it: alertd --profile {profile_name} watch");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_rows_are_sorted_and_mark_the_default() {
        let mut cfg = Config::default();
        cfg.profiles.insert("home".into(), Profile::default());
        cfg.profiles.insert(
            "cellar".into(),
            Profile {
                threshold: 18.0,
                ..Profile::default()
            },
        );
        cfg.default_profile = Some("home".into());

        let rows = profile_rows(&cfg);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "cellar");
        assert!(rows[0].is_default.is_empty());
        assert_eq!(rows[1].name, "home");
        assert_eq!(rows[1].is_default, "*");
    }
}
