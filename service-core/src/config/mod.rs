use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::de::DeserializeOwned;

/// Load settings for a service from an optional `configuration` file and
/// `<PREFIX>__SECTION__KEY` environment variables, in that order of precedence.
///
/// A `.env` file in the working directory is read first if present.
pub fn load<T: DeserializeOwned>(file_name: &str, env_prefix: &str) -> Result<T, AppError> {
    dotenvy::dotenv().ok();

    let config = Cfg::builder()
        .add_source(File::with_name(file_name).required(false))
        .add_source(
            config::Environment::with_prefix(env_prefix)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    Ok(config.try_deserialize()?)
}
