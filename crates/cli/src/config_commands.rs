use {anyhow::Result, clap::Subcommand, hookrelay_config::HookrelayConfig};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML.
    Show,
    /// Print the directory searched for `hookrelay.toml`.
    Path,
}

pub fn handle_config(config: &HookrelayConfig, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", render(config)?);
        },
        ConfigAction::Path => match hookrelay_config::config_dir() {
            Some(dir) => println!("{}", dir.display()),
            None => eprintln!("No config directory could be determined."),
        },
    }
    Ok(())
}

fn render(config: &HookrelayConfig) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_config_loads_back() {
        let mut config = HookrelayConfig::default();
        config.commands.prefix = "?".into();
        config.plugins.ntfy = false;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hookrelay.toml");
        std::fs::write(&path, render(&config).unwrap()).unwrap();

        let loaded = hookrelay_config::load_config(&path).unwrap();
        assert_eq!(loaded.commands.prefix, "?");
        assert!(!loaded.plugins.ntfy);
        assert!(loaded.plugins.ifttt);
        assert_eq!(loaded.http.timeout_secs, config.http.timeout_secs);
    }
}
