//! # Configuration de pmodescription
//!
//! La configuration est construite en trois couches :
//!
//! 1. la configuration par défaut intégrée (`pmodescription.yaml`) ;
//! 2. un fichier YAML externe optionnel, fusionné par-dessus ;
//! 3. les variables d'environnement `PMODESCRIPTION_CONFIG__<CLE>`.
//!
//! ```no_run
//! use pmodescription::DescriptionConfig;
//!
//! let config = DescriptionConfig::load(Some(std::path::Path::new("config.yaml")))?;
//! println!("fetch timeout: {}s", config.fetch_timeout_secs);
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::{env, fs, path::Path, time::Duration};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::info;

use crate::xpath::{Namespaces, UPNP_DEVICE_NAMESPACE, UPNP_PREFIX};

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("pmodescription.yaml");

const ENV_PREFIX: &str = "PMODESCRIPTION_CONFIG__";
const SECTION: &str = "description";

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_AGE_SECS: u64 = 1800;

/// Paramètres de lecture des descriptions de devices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptionConfig {
    /// Namespace lié au préfixe `upnp`
    pub device_namespace: String,

    /// Timeout global des requêtes HTTP de récupération du document
    pub fetch_timeout_secs: u64,

    /// Bail appliqué quand aucun max-age n'est fourni
    pub default_max_age_secs: u64,
}

impl Default for DescriptionConfig {
    fn default() -> Self {
        Self {
            device_namespace: UPNP_DEVICE_NAMESPACE.to_string(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            default_max_age_secs: DEFAULT_MAX_AGE_SECS,
        }
    }
}

impl DescriptionConfig {
    /// Charge la configuration : défauts intégrés, fichier `path` s'il existe,
    /// puis variables d'environnement.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        if let Some(path) = path {
            match fs::read(path) {
                Ok(data) => {
                    info!(config_file=%path.display(), "Loaded description config file");
                    let external: Value = serde_yaml::from_slice(&data)?;
                    merge_yaml(&mut config_value, &lower_keys(external));
                }
                Err(_) => {
                    info!(config_file=%path.display(), "Config file not found, using default embedded config");
                }
            }
        }

        apply_env_overrides(&mut config_value, env::vars());
        Self::from_value(&config_value)
    }

    /// Construit une configuration depuis un document YAML, fusionné avec les défauts.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut config_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;
        let external: Value = serde_yaml::from_str(yaml)?;
        merge_yaml(&mut config_value, &lower_keys(external));
        Self::from_value(&config_value)
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value.get(SECTION) {
            Some(section) if !section.is_null() => Ok(serde_yaml::from_value(section.clone())?),
            _ => Ok(Self::default()),
        }
    }

    /// Liaisons de namespaces à utiliser pour les documents de description.
    pub fn namespaces(&self) -> Namespaces {
        Namespaces::new().bind(UPNP_PREFIX, &self.device_namespace)
    }

    pub fn default_max_age(&self) -> Duration {
        Duration::from_secs(self.default_max_age_secs)
    }
}

fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        // scalaires et séquences sont remplacés
        (d, e) => *d = e.clone(),
    }
}

fn lower_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| match k {
                    Value::String(s) => (Value::String(s.to_lowercase()), lower_keys(v)),
                    other => (other, lower_keys(v)),
                })
                .collect(),
        ),
        _ => value,
    }
}

/// `PMODESCRIPTION_CONFIG__FETCH_TIMEOUT_SECS=5` surcharge `description.fetch_timeout_secs`.
fn apply_env_overrides<I>(config: &mut Value, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        let Some(name) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let name = name.to_lowercase();

        let Value::Mapping(root) = &mut *config else {
            return;
        };
        let section = root
            .entry(Value::String(SECTION.to_string()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        if let Value::Mapping(section) = section {
            section.insert(Value::String(name), convert_env_value(&value));
        }
    }
}

fn convert_env_value(value: &str) -> Value {
    if let Ok(parsed) = serde_yaml::from_str::<Value>(value) {
        return parsed;
    }
    Value::String(value.to_string())
}
