//! # pmodescription
//!
//! Lecture des documents de description de devices UPnP
//! (`urn:schemas-upnp-org:device-1-0`) en un arbre de devices typé.
//!
//! - [`xpath`] : évaluation de chemins sur le document (`upnp:device[2]/upnp:UDN`)
//! - [`fields`] : extraction des champs obligatoires et optionnels
//! - [`url_resolver`] : résolution des URLs relatives contre l'URL de base
//! - [`devices`] : construction de l'arbre et root device
//! - [`services`] : descripteurs de services
//! - [`validity`] : fenêtre de validité annoncée par la découverte SSDP
//!
//! La récupération réseau et l'annonce SSDP restent à la charge de l'appelant ;
//! seul le texte brut du document peut être récupéré à la demande, via
//! [`fetch::DocumentFetcher`].

pub mod config;
pub mod devices;
pub mod errors;
pub mod fetch;
pub mod fields;
pub mod services;
pub mod url_resolver;
pub mod validity;
pub mod xpath;

pub use config::DescriptionConfig;
pub use devices::{Device, DeviceIcon, RootDevice, RootDeviceBuilder, SpecVersion};
pub use errors::DescriptionError;
pub use fetch::{DocumentFetcher, FetchError, HttpDocumentFetcher};
pub use services::ServiceDescription;
pub use url_resolver::resolve_url;
pub use validity::ValidityWindow;
pub use xpath::{DescriptionDocument, Namespaces, PathContext, XmlContext};
