//! Config subcommand handlers.

use tabled::Tabled;

use crate::cli::{AddProfileArgs, ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "")]
    marker: &'static str,
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Timeout")]
    timeout: String,
    #[tabled(rename = "Insecure")]
    insecure: String,
}

fn profile_table(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        return "No profiles configured. Run: vuart config add-profile <name> --url <device-url>"
            .into();
    }
    let default = cfg.default_profile.as_deref().unwrap_or("default");
    let rows: Vec<ProfileRow> = cfg
        .profiles
        .iter()
        .map(|(name, p)| ProfileRow {
            marker: if name == default { "*" } else { "" },
            name: name.clone(),
            device: p.device.clone(),
            timeout: format!("{}s", p.timeout.unwrap_or(cfg.defaults.timeout)),
            insecure: p.insecure.unwrap_or(cfg.defaults.insecure).to_string(),
        })
        .collect();
    output::render_table(&rows)
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let out = output::render_single(global.output, &cfg, profile_table, |c| {
                c.profiles.keys().cloned().collect::<Vec<_>>().join("\n")
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::AddProfile(add) => {
            let mut cfg = config::load_config_or_default();
            let name = add.name.clone();
            let make_default = add.default
                || cfg
                    .default_profile
                    .as_ref()
                    .is_none_or(|d| !cfg.profiles.contains_key(d));

            cfg.profiles.insert(name.clone(), profile_from_args(add)?);
            if make_default {
                cfg.default_profile = Some(name.clone());
            }

            let path = config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Profile '{name}' written to {}", path.display());
                if make_default {
                    eprintln!("  Default profile: {name}");
                }
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();

            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    name,
                    available: cfg.profile_names(),
                });
            }

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Default profile set to '{name}'");
            }
            Ok(())
        }
    }
}

fn profile_from_args(add: AddProfileArgs) -> Result<Profile, CliError> {
    vuart_config::parse_device_url(&add.url)?;
    Ok(Profile {
        insecure: add.allow_insecure.then_some(true),
        timeout: add.timeout,
        prune_stale: add.prune_stale.then_some(true),
        ..Profile::new(add.url)
    })
}
