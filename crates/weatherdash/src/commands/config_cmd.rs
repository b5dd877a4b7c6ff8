//! Config subcommand handlers.

use dialoguer::{Input, Select};
use secrecy::SecretString;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Profile};
use crate::error::CliError;
use crate::output;

use super::util::prompt_err;

const REDACTED: &str = "********";

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("weatherdash configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());
            eprintln!(
                "   Create an app at https://dev.netatmo.com/apps to get a client id and secret.\n"
            );

            // 1. Profile name
            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            // 2. OAuth app
            let client_id: String = Input::new()
                .with_prompt("Client id")
                .interact_text()
                .map_err(prompt_err)?;
            if client_id.trim().is_empty() {
                return Err(CliError::Validation {
                    field: "client_id".into(),
                    reason: "client id cannot be empty".into(),
                });
            }

            let secret = rpassword::prompt_password("Client secret: ").map_err(prompt_err)?;
            if secret.is_empty() {
                return Err(CliError::Validation {
                    field: "client_secret".into(),
                    reason: "client secret cannot be empty".into(),
                });
            }

            let store_choices = &[
                "Store in system keyring (recommended)",
                "Save to config file (plaintext)",
            ];
            let store_selection = Select::new()
                .with_prompt("Where to store the client secret?")
                .items(store_choices)
                .default(0)
                .interact()
                .map_err(prompt_err)?;

            let client_secret = if store_selection == 0 {
                config::store_client_secret(&profile_name, &SecretString::from(secret))?;
                eprintln!("   ✓ Client secret stored in system keyring");
                None
            } else {
                Some(secret)
            };

            // 3. Account e-mail, used as the login default
            let username: String = Input::new()
                .with_prompt("Netatmo e-mail (optional)")
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_err)?;

            // 4. Merge into the existing config
            let mut cfg = config::load_config_or_default();
            let mut profile = Profile::new(client_id);
            profile.client_secret = client_secret;
            profile.username = Some(username).filter(|u| !u.trim().is_empty());
            cfg.profiles.insert(profile_name.clone(), profile);
            cfg.default_profile = Some(profile_name.clone());

            let path = config::save_config(&cfg)?;

            eprintln!("\n✓ Configuration written to {}", path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Next: weatherdash login");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let mut cfg = config::load_config_or_default();
            for profile in cfg.profiles.values_mut() {
                if profile.client_secret.is_some() {
                    profile.client_secret = Some(REDACTED.into());
                }
            }
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| format!("{c:#?}"),
                |_| "config".into(),
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
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: weatherdash config init");
            } else {
                let mut names: Vec<_> = cfg.profiles.keys().collect();
                names.sort();
                for name in names {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();

            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        // ── SetSecret ───────────────────────────────────────────────
        ConfigCommand::SetSecret { profile } => {
            let cfg = config::load_config_or_default();
            let profile_name =
                profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));

            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name: profile_name,
                });
            }

            let secret = rpassword::prompt_password("Client secret: ").map_err(prompt_err)?;
            if secret.is_empty() {
                return Err(CliError::Validation {
                    field: "client_secret".into(),
                    reason: "value cannot be empty".into(),
                });
            }

            config::store_client_secret(&profile_name, &SecretString::from(secret))?;
            eprintln!("✓ Client secret stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}
