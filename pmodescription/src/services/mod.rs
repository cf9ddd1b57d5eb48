//! Descripteurs de services déclarés dans un document de description.
//!
//! Un service est lu en deux temps :
//!
//! 1. [`ParsedService::from_context`] extrait et résout les champs du
//!    `<service>` ; c'est la seule étape qui peut échouer ;
//! 2. `ParsedService::attach` lie le service au [`RootDevice`] qui le
//!    possède indirectement.
//!
//! Le root device n'existe qu'une fois tout l'arbre lu : les services d'un
//! même document partagent un `RootLink`, renseigné juste après
//! l'allocation du root device. Le lien est faible, le root device reste
//! l'unique propriétaire de l'arbre.

use std::sync::{Arc, OnceLock, Weak};

use url::Url;

use crate::devices::RootDevice;
use crate::errors::DescriptionError;
use crate::fields::{FieldKind, FieldSpec, populate};
use crate::xpath::PathContext;

#[derive(Debug, Default)]
struct ServiceFields {
    service_type: String,
    service_id: String,
    scpd_url: Option<Url>,
    control_url: Option<Url>,
    event_sub_url: Option<Url>,
}

type ServiceSpec = FieldSpec<ServiceFields>;

const SERVICE_FIELDS: &[ServiceSpec] = &[
    ServiceSpec::mandatory("serviceType", "upnp:serviceType", FieldKind::Text, |s, v| {
        s.service_type = v.into_text()
    }),
    ServiceSpec::mandatory("serviceId", "upnp:serviceId", FieldKind::Text, |s, v| {
        s.service_id = v.into_text()
    }),
    ServiceSpec::mandatory("SCPDURL", "upnp:SCPDURL", FieldKind::Url, |s, v| {
        s.scpd_url = v.into_url()
    }),
    ServiceSpec::mandatory("controlURL", "upnp:controlURL", FieldKind::Url, |s, v| {
        s.control_url = v.into_url()
    }),
    // Beaucoup de devices publient un eventSubURL vide
    ServiceSpec::optional("eventSubURL", "upnp:eventSubURL", FieldKind::Url, |s, v| {
        s.event_sub_url = v.into_url()
    }),
];

/// Lien partagé par les services d'un document vers leur root device.
#[derive(Debug, Default)]
pub(crate) struct RootLink {
    root: OnceLock<Weak<RootDevice>>,
}

impl RootLink {
    pub(crate) fn set(&self, root: Weak<RootDevice>) {
        if self.root.set(root).is_err() {
            tracing::warn!("root device link already set");
        }
    }

    fn upgrade(&self) -> Option<Arc<RootDevice>> {
        self.root.get().and_then(Weak::upgrade)
    }
}

/// Service lu mais pas encore rattaché à son root device.
#[derive(Debug)]
pub struct ParsedService {
    service_type: String,
    service_id: String,
    scpd_url: Url,
    control_url: Url,
    event_sub_url: Option<Url>,
}

impl ParsedService {
    /// Lit un élément `<service>`, les URLs étant résolues contre `base`.
    pub fn from_context<C: PathContext>(ctx: &C, base: &Url) -> Result<Self, DescriptionError> {
        let mut fields = ServiceFields::default();
        populate(ctx, SERVICE_FIELDS, Some(base), &mut fields)?;

        Ok(Self {
            service_type: fields.service_type,
            service_id: fields.service_id,
            scpd_url: fields
                .scpd_url
                .ok_or_else(|| DescriptionError::schema_violation("SCPDURL"))?,
            control_url: fields
                .control_url
                .ok_or_else(|| DescriptionError::schema_violation("controlURL"))?,
            event_sub_url: fields.event_sub_url,
        })
    }

    pub(crate) fn attach(self, root: Arc<RootLink>) -> ServiceDescription {
        ServiceDescription {
            service_type: self.service_type,
            service_id: self.service_id,
            scpd_url: self.scpd_url,
            control_url: self.control_url,
            event_sub_url: self.event_sub_url,
            root,
        }
    }
}

/// Service UPnP tel que déclaré par un device.
#[derive(Debug, Clone)]
pub struct ServiceDescription {
    service_type: String,
    service_id: String,
    scpd_url: Url,
    control_url: Url,
    event_sub_url: Option<Url>,
    root: Arc<RootLink>,
}

impl ServiceDescription {
    /// Type UPnP du service (ex: `urn:schemas-upnp-org:service:AVTransport:1`)
    pub fn service_type(&self) -> &str {
        &self.service_type
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// URL du document SCPD
    pub fn scpd_url(&self) -> &Url {
        &self.scpd_url
    }

    /// URL de contrôle SOAP
    pub fn control_url(&self) -> &Url {
        &self.control_url
    }

    /// URL d'abonnement aux événements GENA
    pub fn event_sub_url(&self) -> Option<&Url> {
        self.event_sub_url.as_ref()
    }

    /// Root device du document qui déclare ce service, tant qu'il existe.
    ///
    /// Donne accès à la version du schéma, à l'URL de base et à
    /// l'emplacement du document.
    pub fn root_device(&self) -> Option<Arc<RootDevice>> {
        self.root.upgrade()
    }
}

impl std::fmt::Display for ServiceDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Service({} @ {})", self.service_id, self.control_url)
    }
}
