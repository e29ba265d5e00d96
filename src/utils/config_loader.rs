use async_trait::async_trait;
use dotenvy::dotenv;
use regex::{Captures, Regex};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::{env, fs};
use thiserror::Error;

#[allow(clippy::enum_variant_names)]
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),
    #[error("Error loading config: {0}")]
    ConfigError(String),
}

/// Loads one named section (`[sync]`, ...) of a TOML config file.
#[async_trait]
pub trait ConfigSectionLoader {
    type SectionType;

    async fn load_section_from_file(file_name: &Path) -> Result<Self::SectionType, LoadConfigError>;
}

pub trait ConfigSectionLoaderSync {
    type SectionType;

    fn load_section_from_file_sync(file_name: &Path) -> Result<Self::SectionType, LoadConfigError>;
}

pub async fn load_from_file<T: DeserializeOwned>(file_name: &Path) -> Result<T, LoadConfigError> {
    dotenv().ok();
    let contents = tokio::fs::read_to_string(file_name).await?;
    parse_config(&contents)
}

pub fn load_from_file_sync<T: DeserializeOwned>(file_name: &Path) -> Result<T, LoadConfigError> {
    dotenv().ok();
    let contents = fs::read_to_string(file_name)?;
    parse_config(&contents)
}

/// Expands `${VAR}` references and parses the result as TOML.
pub fn parse_config<T: DeserializeOwned>(raw_config: &str) -> Result<T, LoadConfigError> {
    let contents = expand_vars(raw_config)?;
    Ok(toml::from_str(&contents)?)
}

/// Unknown variables are left as written.
fn expand_vars(raw_config: &str) -> Result<String, LoadConfigError> {
    let re = Regex::new(r"\$\{([a-zA-Z_][0-9a-zA-Z_]*)\}")?;
    Ok(re
        .replace_all(raw_config, |caps: &Captures| match env::var(&caps[1]) {
            Ok(val) => val,
            Err(_) => caps[0].to_string(),
        })
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Section {
        name: String,
        size: usize,
    }

    #[derive(Debug, Deserialize)]
    struct File {
        section: Section,
    }

    #[test]
    fn test_unknown_vars_are_kept() {
        let expanded = expand_vars("name = \"${DEX_AGGREGATOR_SURELY_UNSET_VAR}\"").unwrap();
        assert_eq!(expanded, "name = \"${DEX_AGGREGATOR_SURELY_UNSET_VAR}\"");
    }

    #[test]
    fn test_vars_are_expanded() {
        // SAFETY: the variable name is unique to this test
        unsafe { env::set_var("DEX_AGGREGATOR_TEST_SIZE", "42") };
        let file: File = parse_config("[section]\nname = \"x\"\nsize = ${DEX_AGGREGATOR_TEST_SIZE}\n").unwrap();
        assert_eq!(file.section.name, "x");
        assert_eq!(file.section.size, 42);
    }

    #[test]
    fn test_bad_toml() {
        let result: Result<File, _> = parse_config("[section\n");
        assert!(matches!(result, Err(LoadConfigError::TomlError(_))));
    }
}
