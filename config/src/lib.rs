//! Configuration loading for Shopmind.
//!
//! Two layers, used together by the server binary:
//!
//! 1. [`load_and_apply`] merges XDG `config.toml` and a project `.env` into the
//!    process environment with priority **existing env > .env > XDG**.
//! 2. [`Settings::from_env`] takes a typed snapshot of every variable the
//!    backend reads (model names, TTLs, timeouts, listen address).

mod dotenv;
mod settings;
mod xdg_toml;

use std::path::Path;
use thiserror::Error;

pub use settings::Settings;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("xdg config path: {0}")]
    XdgPath(String),
    #[error("read xdg config: {0}")]
    XdgRead(std::io::Error),
    #[error("parse xdg toml: {0}")]
    XdgParse(#[from] toml::de::Error),
    #[error("read .env: {0}")]
    DotenvRead(std::io::Error),
}

/// Loads config from XDG `config.toml` and optional project `.env`, then sets
/// environment variables only for keys that are **not** already set, so the
/// existing environment always wins.
///
/// Order of precedence when a key is missing from the process environment:
/// 1. Value from project `.env` (current directory, or `override_dir` if given)
/// 2. Value from `$XDG_CONFIG_HOME/<app_name>/config.toml` `[env]` table
///
/// * `app_name`: e.g. `"shopmind"` — used for the XDG path
///   `~/.config/<app_name>/config.toml`.
/// * `override_dir`: if `Some`, look for `.env` there instead of the current
///   directory.
pub fn load_and_apply(app_name: &str, override_dir: Option<&Path>) -> Result<(), LoadError> {
    // Merge the file layers lowest-precedence first: start from the XDG
    // table and let .env entries overwrite it.
    let mut resolved = xdg_toml::load_env_map(app_name)?;
    for (name, value) in dotenv::load_env_map(override_dir).map_err(LoadError::DotenvRead)? {
        resolved.insert(name, value);
    }

    // The process environment is never overwritten, only filled in.
    for (name, value) in resolved {
        if std::env::var_os(&name).is_none() {
            std::env::set_var(&name, value);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn restore_var(key: &str, prev: Option<String>) {
        match prev {
            Some(v) => env::set_var(key, v),
            None => env::remove_var(key),
        }
    }

    #[test]
    fn existing_env_wins() {
        env::set_var("SHOPMIND_TEST_EXISTING", "from_env");
        let _ = load_and_apply("shopmind", None);
        assert_eq!(
            env::var("SHOPMIND_TEST_EXISTING").as_deref(),
            Ok("from_env")
        );
        env::remove_var("SHOPMIND_TEST_EXISTING");
    }

    #[test]
    fn load_and_apply_no_config_ok() {
        let r = load_and_apply("shopmind-nonexistent-app-xyz", None::<&std::path::Path>);
        assert!(r.is_ok());
    }

    #[test]
    fn dotenv_overrides_xdg() {
        let xdg_dir = tempfile::tempdir().unwrap();
        let app_dir = xdg_dir.path().join("shopmind");
        std::fs::create_dir_all(&app_dir).unwrap();
        std::fs::write(
            app_dir.join("config.toml"),
            "[env]\nSHOPMIND_TEST_PRIORITY = \"from_xdg\"\n",
        )
        .unwrap();

        let dotenv_dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dotenv_dir.path().join(".env"),
            "SHOPMIND_TEST_PRIORITY=from_dotenv\n",
        )
        .unwrap();

        let prev_xdg = env::var("XDG_CONFIG_HOME").ok();
        env::set_var("XDG_CONFIG_HOME", xdg_dir.path());
        env::remove_var("SHOPMIND_TEST_PRIORITY");

        let _ = load_and_apply("shopmind", Some(dotenv_dir.path()));
        let val = env::var("SHOPMIND_TEST_PRIORITY").unwrap();
        env::remove_var("SHOPMIND_TEST_PRIORITY");
        restore_var("XDG_CONFIG_HOME", prev_xdg);

        assert_eq!(val, "from_dotenv");
    }

    #[test]
    fn xdg_applied_when_no_dotenv() {
        let xdg_dir = tempfile::tempdir().unwrap();
        let app_dir = xdg_dir.path().join("shopmind");
        std::fs::create_dir_all(&app_dir).unwrap();
        std::fs::write(
            app_dir.join("config.toml"),
            "[env]\nSHOPMIND_TEST_XDG_ONLY = \"from_xdg\"\n",
        )
        .unwrap();

        let empty_dir = tempfile::tempdir().unwrap();

        let prev_xdg = env::var("XDG_CONFIG_HOME").ok();
        env::set_var("XDG_CONFIG_HOME", xdg_dir.path());
        env::remove_var("SHOPMIND_TEST_XDG_ONLY");

        let _ = load_and_apply("shopmind", Some(empty_dir.path()));
        let val = env::var("SHOPMIND_TEST_XDG_ONLY").ok();
        env::remove_var("SHOPMIND_TEST_XDG_ONLY");
        restore_var("XDG_CONFIG_HOME", prev_xdg);

        assert_eq!(val.as_deref(), Some("from_xdg"));
    }
}
