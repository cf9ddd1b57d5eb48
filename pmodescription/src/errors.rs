//! Erreurs relatives à la lecture des descriptions de devices UPnP.

use thiserror::Error;

use crate::fetch::FetchError;
use crate::xpath::PathError;

/// Erreurs levées pendant la construction d'un arbre de devices.
///
/// La construction est atomique : la moindre de ces erreurs, quelle que soit
/// la profondeur à laquelle elle survient, fait échouer la totalité de l'arbre.
#[derive(Error, Debug)]
pub enum DescriptionError {
    /// L'URL du document de description n'est pas une URL valide
    #[error("Malformed description location '{location}': {source}")]
    MalformedLocation {
        location: String,
        #[source]
        source: url::ParseError,
    },

    /// Élément racine absent ou version du schéma non supportée
    #[error("Unsupported device: {0}")]
    UnsupportedDevice(String),

    /// Champ obligatoire absent, vide ou mal typé
    #[error("Mandatory field {0} not provided, uncompliant UPnP device")]
    SchemaViolation(String),

    /// URL impossible à résoudre, même relativement à l'URL de base
    #[error("Invalid URL '{0}'")]
    InvalidUrl(String),

    /// Durée de validité (max-age) non numérique
    #[error("Invalid max-age value '{0}'")]
    InvalidMaxAge(String),

    /// Nœud structurel attendu introuvable pendant le parcours
    #[error("Description path error: {0}")]
    Path(#[from] PathError),

    #[error("XML parse error: {0}")]
    Xml(#[from] xmltree::ParseError),

    #[error("Failed to fetch description document: {0}")]
    Fetch(#[from] FetchError),
}

impl DescriptionError {
    pub fn unsupported_device(reason: &str) -> Self {
        DescriptionError::UnsupportedDevice(reason.to_string())
    }

    pub fn schema_violation(field: &str) -> Self {
        DescriptionError::SchemaViolation(field.to_string())
    }

    pub fn invalid_url(url: &str) -> Self {
        DescriptionError::InvalidUrl(url.to_string())
    }
}
