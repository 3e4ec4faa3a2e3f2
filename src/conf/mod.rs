pub mod cli;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use rust_embed::RustEmbed;
use std::borrow::Cow;
use std::error::Error;

#[derive(RustEmbed)]
#[folder = "src/conf/"]
#[include = "*.toml"]
struct EmbeddedConfigFS;

/// returns the embedded default configuration file in bytes.
fn default_config() -> Cow<'static, [u8]> {
    let config_file = EmbeddedConfigFS::get("default_cli_config.toml").unwrap();
    config_file.data
}

/// returns the default configuration paths that are searched in case user does not specify.
fn config_paths() -> Vec<String> {
    let mut paths = Vec::new();

    if let Some(user_home) = dirs::home_dir() {
        paths.push(
            user_home
                .join(".stevedore.toml")
                .to_string_lossy()
                .into_owned(),
        );
    }

    // Relative, so it is searched for from the working directory upward; deployments
    // usually run from somewhere inside the repository that carries the config.
    paths.push("stevedore.toml".to_string());

    paths
}

/// returns a correctly deserialized config struct from the configuration files and
/// environment passed to it.
///
/// Later sources win: embedded defaults first, then the config files in order, then
/// STEVEDORE_* environment variables override everything.
pub fn parse(path_override: &Option<String>) -> Result<cli::Config, Box<dyn Error>> {
    let default_config_raw = default_config();
    let default_config = std::str::from_utf8(&default_config_raw)?;

    let mut figment = Figment::from(Toml::string(default_config));

    match path_override {
        Some(path) => figment = figment.merge(Toml::file(path)),
        None => {
            for path in config_paths() {
                figment = figment.merge(Toml::file(path));
            }
        }
    }

    let config = figment
        .merge(Env::prefixed("STEVEDORE_").split("__"))
        .extract::<cli::Config>()?;

    Ok(config)
}
