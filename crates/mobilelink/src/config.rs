//! CLI configuration: credential resolution from flags, env, and a TOML
//! file.
//!
//! Precedence is flag > `MOBILELINK_*` env > config file. Which auth mode
//! the client gets follows the API's own precedence: a token wins over
//! cookies, cookies win over a username/password account -- and a
//! cookie-mode config that also carries an account keeps it as the
//! expiry fallback.

use std::path::Path;

use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::Deserialize;

use mobilelink_api::{Account, Credentials};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Flat credential config; every field optional, presence decides the
/// auth mode.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub cookies: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

/// Load the config file (explicit path or the platform config dir) with
/// the `MOBILELINK_*` environment overlaid on top.
pub fn load(path: Option<&Path>) -> Result<Config, CliError> {
    let mut figment = Figment::new();
    if let Some(path) = path {
        figment = figment.merge(Toml::file(path));
    } else if let Some(dirs) = ProjectDirs::from("", "", "mobilelink") {
        figment = figment.merge(Toml::file(dirs.config_dir().join("config.toml")));
    }
    Ok(figment.merge(Env::prefixed("MOBILELINK_")).extract()?)
}

impl Config {
    /// Apply CLI flag overrides (flags beat env and file values).
    pub fn with_overrides(mut self, global: &GlobalOpts) -> Self {
        if global.username.is_some() {
            self.username = global.username.clone();
        }
        if global.password.is_some() {
            self.password = global.password.clone();
        }
        if global.cookies.is_some() {
            self.cookies = global.cookies.clone();
        }
        if global.token.is_some() {
            self.token = global.token.clone();
        }
        self
    }

    /// Resolve the configured fields into API credentials.
    pub fn credentials(&self) -> Result<Credentials, CliError> {
        if let Some(token) = &self.token {
            return Ok(Credentials::Token(token.clone().into()));
        }
        if let Some(cookies) = &self.cookies {
            return Ok(Credentials::Cookies {
                header: cookies.clone(),
                fallback: self.account(),
            });
        }
        self.account()
            .map(Credentials::Account)
            .ok_or(CliError::MissingCredentials)
    }

    fn account(&self) -> Option<Account> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => {
                Some(Account::new(username.clone(), password.clone()))
            }
            _ => None,
        }
    }
}
