//! Root device : sommet de l'arbre, porteur des métadonnées du document.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;
use url::Url;

use crate::config::DescriptionConfig;
use crate::errors::DescriptionError;
use crate::fetch::{DocumentFetcher, HttpDocumentFetcher};
use crate::validity::{ValidityWindow, parse_max_age};
use crate::xpath::{DescriptionDocument, PathContext};

use super::Device;
use super::builder::build_tree;

/// Version du schéma déclarée dans `<specVersion>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecVersion {
    pub major: u32,
    pub minor: u32,
}

impl std::fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Root device d'un document de description.
///
/// Regroupe l'arbre des devices, les informations propres au document
/// (version, URL de base, emplacement) et celles fournies par la couche de
/// découverte (bail, firmware, identifiants SSDP). Seule la fenêtre de
/// validité évolue après la construction.
///
/// Toujours partagé via `Arc` : les services de l'arbre gardent un lien
/// faible vers lui.
pub struct RootDevice {
    device: Arc<Device>,
    spec_version: SpecVersion,
    declared_base_url: Option<Url>,
    base_url: Url,
    location: Url,
    validity: ValidityWindow,
    vendor_firmware: Option<String>,
    discovery_usn: Option<String>,
    discovery_udn: Option<String>,
    document_text: OnceLock<String>,
    fetcher: Arc<dyn DocumentFetcher>,
}

impl RootDevice {
    pub fn builder(location: &str) -> RootDeviceBuilder {
        RootDeviceBuilder::new(location)
    }

    /// Device racine de l'arbre
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    pub fn spec_version(&self) -> SpecVersion {
        self.spec_version
    }

    pub fn spec_version_major(&self) -> u32 {
        self.spec_version.major
    }

    pub fn spec_version_minor(&self) -> u32 {
        self.spec_version.minor
    }

    /// URLBase déclarée par le document, si elle était valide.
    pub fn declared_base_url(&self) -> Option<&Url> {
        self.declared_base_url.as_ref()
    }

    /// URL de base effective : déclarée, ou déduite de l'emplacement du document.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Emplacement du document de description
    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn vendor_firmware(&self) -> Option<&str> {
        self.vendor_firmware.as_deref()
    }

    pub fn discovery_usn(&self) -> Option<&str> {
        self.discovery_usn.as_deref()
    }

    pub fn discovery_udn(&self) -> Option<&str> {
        self.discovery_udn.as_deref()
    }

    /// Temps restant avant que la description soit considérée périmée.
    ///
    /// Négatif si le device n'a pas été réannoncé à temps.
    pub fn remaining_time(&self) -> TimeDelta {
        self.validity.remaining_time()
    }

    pub fn remaining_millis(&self) -> i64 {
        self.validity.remaining_millis()
    }

    pub fn is_expired(&self) -> bool {
        self.validity.is_expired()
    }

    pub fn validity_duration(&self) -> Duration {
        self.validity.duration()
    }

    pub fn validity_created_at(&self) -> DateTime<Utc> {
        self.validity.created_at()
    }

    /// Réarme la fenêtre de validité avec un nouveau max-age (en secondes).
    pub fn reset_validity(&self, max_age: &str) -> Result<(), DescriptionError> {
        self.validity.reset_max_age(max_age)
    }

    pub fn reset_validity_duration(&self, duration: Duration) {
        self.validity.reset(duration);
    }

    /// Texte brut du document de description.
    ///
    /// Récupéré au premier appel puis conservé ; un échec n'est pas mis en cache.
    pub fn document_text(&self) -> Result<&str, DescriptionError> {
        if let Some(text) = self.document_text.get() {
            return Ok(text);
        }

        let text = self.fetcher.fetch(&self.location)?;
        Ok(self.document_text.get_or_init(|| text))
    }
}

impl std::fmt::Debug for RootDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootDevice")
            .field("device", &self.device)
            .field("spec_version", &self.spec_version)
            .field("base_url", &self.base_url)
            .field("location", &self.location)
            .field("validity", &self.validity)
            .field("discovery_usn", &self.discovery_usn)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Display for RootDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "RootDevice({} @ {})", self.device.friendly_name(), self.location)
    }
}

/// Paramètres de construction d'un [`RootDevice`].
///
/// # Exemple
///
/// ```ignore
/// let root = RootDevice::builder("http://192.168.1.20:49152/description.xml")
///     .max_age("1800")
///     .discovery_usn("uuid:...::upnp:rootdevice")
///     .build_from_xml(&xml)?;
/// ```
pub struct RootDeviceBuilder {
    location: String,
    max_age: Option<String>,
    vendor_firmware: Option<String>,
    discovery_usn: Option<String>,
    discovery_udn: Option<String>,
    config: DescriptionConfig,
    fetcher: Option<Arc<dyn DocumentFetcher>>,
    document_text: Option<String>,
}

impl RootDeviceBuilder {
    pub fn new(location: &str) -> Self {
        Self {
            location: location.to_string(),
            max_age: None,
            vendor_firmware: None,
            discovery_usn: None,
            discovery_udn: None,
            config: DescriptionConfig::default(),
            fetcher: None,
            document_text: None,
        }
    }

    /// Durée de validité annoncée, en secondes (en-tête `CACHE-CONTROL: max-age`).
    pub fn max_age(mut self, max_age: &str) -> Self {
        self.max_age = Some(max_age.to_string());
        self
    }

    /// Firmware annoncé (en-tête SSDP `SERVER`)
    pub fn vendor_firmware(mut self, firmware: &str) -> Self {
        self.vendor_firmware = Some(firmware.to_string());
        self
    }

    pub fn discovery_usn(mut self, usn: &str) -> Self {
        self.discovery_usn = Some(usn.to_string());
        self
    }

    pub fn discovery_udn(mut self, udn: &str) -> Self {
        self.discovery_udn = Some(udn.to_string());
        self
    }

    pub fn config(mut self, config: DescriptionConfig) -> Self {
        self.config = config;
        self
    }

    /// Source du texte brut, par défaut un [`HttpDocumentFetcher`].
    pub fn fetcher(mut self, fetcher: Arc<dyn DocumentFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Texte brut déjà connu, évitant une récupération ultérieure.
    pub fn document_text(mut self, text: String) -> Self {
        self.document_text = Some(text);
        self
    }

    /// Parse `xml` avec les namespaces de la configuration puis construit l'arbre.
    ///
    /// Le texte est conservé comme texte brut du document.
    pub fn build_from_xml(self, xml: &str) -> Result<Arc<RootDevice>, DescriptionError> {
        let document = DescriptionDocument::parse(xml.as_bytes(), self.config.namespaces())?;
        let builder = if self.document_text.is_some() {
            self
        } else {
            self.document_text(xml.to_string())
        };
        builder.build(&document.context())
    }

    /// Construit l'arbre depuis un contexte positionné au niveau du document.
    pub fn build<C: PathContext>(self, document: &C) -> Result<Arc<RootDevice>, DescriptionError> {
        let location = parse_location(&self.location)?;

        let lease = match &self.max_age {
            Some(max_age) => parse_max_age(max_age)?,
            None => self.config.default_max_age(),
        };

        let tree = build_tree(document, &location)?;
        debug!(
            "built device tree {} (UPnP {}) from {}",
            tree.root.usn(),
            tree.spec_version,
            location
        );

        let document_text = OnceLock::new();
        if let Some(text) = self.document_text {
            let _ = document_text.set(text);
        }

        let fetcher = self
            .fetcher
            .unwrap_or_else(|| Arc::new(HttpDocumentFetcher::new(self.config.fetch_timeout_secs)));

        let root = Arc::new(RootDevice {
            device: tree.root,
            spec_version: tree.spec_version,
            declared_base_url: tree.declared_base_url,
            base_url: tree.base_url,
            location,
            validity: ValidityWindow::new(lease),
            vendor_firmware: self.vendor_firmware,
            discovery_usn: self.discovery_usn,
            discovery_udn: self.discovery_udn,
            document_text,
            fetcher,
        });
        tree.link.set(Arc::downgrade(&root));

        Ok(root)
    }
}

/// L'emplacement sert de base aux URLs relatives : il doit avoir un hôte.
fn parse_location(location: &str) -> Result<Url, DescriptionError> {
    let malformed = |source| DescriptionError::MalformedLocation {
        location: location.to_string(),
        source,
    };

    let url = Url::parse(location).map_err(malformed)?;
    if !url.has_host() {
        return Err(malformed(url::ParseError::EmptyHost));
    }
    Ok(url)
}
