use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{var} must be a port number, got {value:?}")]
    InvalidPort { var: &'static str, value: String },

    #[error("{var} must be true or false, got {value:?}")]
    InvalidFlag { var: &'static str, value: String },
}

/// Runtime settings for the service, read once at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_address: String,
    pub port: u16,
    pub store_path: PathBuf,
    pub model_collection: String,
    pub model_document: String,
    pub model_field: String,
    /// Serve without a model instead of refusing to start.
    pub allow_missing_model: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 5000,
            store_path: PathBuf::from("data/store.json"),
            model_collection: "models".to_string(),
            model_document: "job_scheduler".to_string(),
            model_field: "model_base64".to_string(),
            allow_missing_model: false,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source, so tests do not
    /// have to touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(bind) = lookup("JOB_SCHEDULER_BIND") {
            config.bind_address = bind;
        }
        if let Some(port) = lookup("JOB_SCHEDULER_PORT") {
            config.port = port.trim().parse().map_err(|_| ConfigError::InvalidPort {
                var: "JOB_SCHEDULER_PORT",
                value: port.clone(),
            })?;
        }
        if let Some(path) = lookup("JOB_SCHEDULER_STORE") {
            config.store_path = PathBuf::from(path);
        }
        if let Some(collection) = lookup("JOB_SCHEDULER_MODEL_COLLECTION") {
            config.model_collection = collection;
        }
        if let Some(document) = lookup("JOB_SCHEDULER_MODEL_DOCUMENT") {
            config.model_document = document;
        }
        if let Some(field) = lookup("JOB_SCHEDULER_MODEL_FIELD") {
            config.model_field = field;
        }
        if let Some(flag) = lookup("JOB_SCHEDULER_ALLOW_MISSING_MODEL") {
            config.allow_missing_model = parse_flag("JOB_SCHEDULER_ALLOW_MISSING_MODEL", &flag)?;
        }

        Ok(config)
    }
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            var,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = ServiceConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.model_collection, "models");
        assert_eq!(config.model_document, "job_scheduler");
        assert_eq!(config.model_field, "model_base64");
        assert!(!config.allow_missing_model);
    }

    #[test]
    fn overrides_are_applied() {
        let config = ServiceConfig::from_lookup(lookup_from(&[
            ("JOB_SCHEDULER_PORT", "8081"),
            ("JOB_SCHEDULER_STORE", "/tmp/x.json"),
            ("JOB_SCHEDULER_ALLOW_MISSING_MODEL", "yes"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.store_path, PathBuf::from("/tmp/x.json"));
        assert!(config.allow_missing_model);
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = ServiceConfig::from_lookup(lookup_from(&[("JOB_SCHEDULER_PORT", "http")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort { .. }));
    }

    #[test]
    fn bad_flag_is_rejected() {
        let err = ServiceConfig::from_lookup(lookup_from(&[(
            "JOB_SCHEDULER_ALLOW_MISSING_MODEL",
            "maybe",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFlag { .. }));
    }
}
