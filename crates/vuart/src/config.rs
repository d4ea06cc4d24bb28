//! CLI configuration -- thin wrapper around `vuart_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--device, --profile, --insecure, --timeout).

use vuart_core::DashboardConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use vuart_config::{Config, Profile, config_path, load_config_or_default, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `DashboardConfig` from the config file, profile, and CLI overrides.
pub fn build_dashboard_config(global: &GlobalOpts) -> Result<DashboardConfig, CliError> {
    let cfg = load_config_or_default();
    resolve(global, &cfg)
}

/// Flag > env > profile > defaults.
fn resolve(global: &GlobalOpts, cfg: &Config) -> Result<DashboardConfig, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let mut profile = match (cfg.profiles.get(&profile_name), &global.device) {
        (Some(profile), _) => profile.clone(),
        // An explicitly requested profile must exist.
        (None, _) if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: cfg.profile_names(),
            });
        }
        (None, Some(device)) => Profile::new(device.clone()),
        (None, None) => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    if let Some(ref device) = global.device {
        profile.device.clone_from(device);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }

    tracing::debug!(profile = %profile_name, device = %profile.device, "resolved device");
    Ok(vuart_config::profile_to_dashboard_config(
        &profile,
        &cfg.defaults,
    )?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use clap::Parser;
    use vuart_core::TlsVerification;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["vuart"];
        argv.extend_from_slice(args);
        argv.push("system");
        Cli::try_parse_from(argv).unwrap().global
    }

    fn config_with_lab() -> Config {
        let mut cfg = Config::default();
        let mut lab = Profile::new("http://10.0.0.7");
        lab.timeout = Some(3);
        cfg.profiles.insert("lab".into(), lab);
        cfg.default_profile = Some("lab".into());
        cfg
    }

    #[test]
    fn default_profile_is_used() {
        let resolved = resolve(&global(&[]), &config_with_lab()).unwrap();
        assert_eq!(resolved.url.as_str(), "http://10.0.0.7/");
        assert_eq!(resolved.timeout, Duration::from_secs(3));
    }

    #[test]
    fn flags_override_profile() {
        let resolved = resolve(
            &global(&["--device", "http://192.168.4.1", "--timeout", "9", "-k"]),
            &config_with_lab(),
        )
        .unwrap();
        assert_eq!(resolved.url.as_str(), "http://192.168.4.1/");
        assert_eq!(resolved.timeout, Duration::from_secs(9));
        assert_eq!(resolved.tls, TlsVerification::DangerAcceptInvalid);
    }

    #[test]
    fn device_flag_works_without_profiles() {
        let resolved = resolve(&global(&["-d", "http://192.168.4.1"]), &Config::default()).unwrap();
        assert_eq!(resolved.url.host_str(), Some("192.168.4.1"));
    }

    #[test]
    fn missing_device_and_profile_is_reported() {
        assert!(matches!(
            resolve(&global(&[]), &Config::default()),
            Err(CliError::NoConfig { .. })
        ));
        assert!(matches!(
            resolve(&global(&["-p", "nope"]), &config_with_lab()),
            Err(CliError::ProfileNotFound { .. })
        ));
    }
}
