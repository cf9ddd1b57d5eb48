//! Nœud de l'arbre des devices : un élément `<device>`, racine ou embarqué.

use std::sync::{Arc, OnceLock, Weak};

use url::Url;

use crate::fields::{FieldKind, FieldSpec};
use crate::services::ServiceDescription;

use super::DeviceIcon;

/// Champs scalaires d'un `<device>`, avant assemblage du nœud.
#[derive(Debug, Default)]
pub(crate) struct DeviceFields {
    device_type: String,
    friendly_name: String,
    model_name: String,
    udn: String,
    manufacturer: Option<String>,
    manufacturer_url: Option<Url>,
    presentation_url: Option<Url>,
    model_description: Option<String>,
    model_number: Option<String>,
    model_url: Option<String>,
    serial_number: Option<String>,
    upc: Option<u64>,
}

impl DeviceFields {
    pub(crate) fn device_type(&self) -> &str {
        &self.device_type
    }
}

type DeviceSpec = FieldSpec<DeviceFields>;

/// Table des champs d'un `<device>` : obligatoires d'abord, puis optionnels.
pub(crate) const DEVICE_FIELDS: &[DeviceSpec] = &[
    DeviceSpec::mandatory("deviceType", "upnp:deviceType", FieldKind::Text, |d, v| {
        d.device_type = v.into_text()
    }),
    DeviceSpec::mandatory("friendlyName", "upnp:friendlyName", FieldKind::Text, |d, v| {
        d.friendly_name = v.into_text()
    }),
    DeviceSpec::mandatory("modelName", "upnp:modelName", FieldKind::Text, |d, v| {
        d.model_name = v.into_text()
    }),
    DeviceSpec::mandatory("UDN", "upnp:UDN", FieldKind::Text, |d, v| d.udn = v.into_text()),
    DeviceSpec::optional("manufacturer", "upnp:manufacturer", FieldKind::Text, |d, v| {
        d.manufacturer = Some(v.into_text())
    }),
    DeviceSpec::optional("manufacturerURL", "upnp:manufacturerURL", FieldKind::Url, |d, v| {
        d.manufacturer_url = v.into_url()
    }),
    DeviceSpec::optional("presentationURL", "upnp:presentationURL", FieldKind::Url, |d, v| {
        d.presentation_url = v.into_url()
    }),
    DeviceSpec::optional("modelDescription", "upnp:modelDescription", FieldKind::Text, |d, v| {
        d.model_description = Some(v.into_text())
    }),
    DeviceSpec::optional("modelNumber", "upnp:modelNumber", FieldKind::Text, |d, v| {
        d.model_number = Some(v.into_text())
    }),
    DeviceSpec::optional("modelURL", "upnp:modelURL", FieldKind::Text, |d, v| {
        d.model_url = Some(v.into_text())
    }),
    DeviceSpec::optional("serialNumber", "upnp:serialNumber", FieldKind::Text, |d, v| {
        d.serial_number = Some(v.into_text())
    }),
    // Beaucoup de devices publient un UPC non numérique : il est alors ignoré
    DeviceSpec::optional("UPC", "upnp:UPC", FieldKind::Integer, |d, v| {
        d.upc = v.into_integer()
    }),
];

/// Device UPnP lu depuis un document de description.
///
/// Un device possède ses icônes, ses services et ses sous-devices. Le lien
/// vers le parent est faible et ne sert qu'à remonter l'arbre. Une fois
/// construit, un device n'est plus modifié.
#[derive(Debug)]
pub struct Device {
    device_type: String,
    friendly_name: String,
    model_name: String,
    udn: String,
    usn: String,
    manufacturer: Option<String>,
    manufacturer_url: Option<Url>,
    presentation_url: Option<Url>,
    model_description: Option<String>,
    model_number: Option<String>,
    model_url: Option<String>,
    serial_number: Option<String>,
    upc: Option<u64>,
    icons: Vec<DeviceIcon>,
    services: Vec<ServiceDescription>,
    parent: Option<Weak<Device>>,
    // rempli une seule fois, juste après l'allocation du nœud
    children: OnceLock<Vec<Arc<Device>>>,
}

impl Device {
    pub(crate) fn assemble(
        fields: DeviceFields,
        icons: Vec<DeviceIcon>,
        services: Vec<ServiceDescription>,
        parent: Option<Weak<Device>>,
    ) -> Self {
        let usn = format!("{}::{}", fields.udn, fields.device_type);
        Self {
            device_type: fields.device_type,
            friendly_name: fields.friendly_name,
            model_name: fields.model_name,
            udn: fields.udn,
            usn,
            manufacturer: fields.manufacturer,
            manufacturer_url: fields.manufacturer_url,
            presentation_url: fields.presentation_url,
            model_description: fields.model_description,
            model_number: fields.model_number,
            model_url: fields.model_url,
            serial_number: fields.serial_number,
            upc: fields.upc,
            icons,
            services,
            parent,
            children: OnceLock::new(),
        }
    }

    pub(crate) fn set_children(&self, children: Vec<Arc<Device>>) {
        if self.children.set(children).is_err() {
            tracing::warn!("children of device {} already set", self.udn);
        }
    }

    /// Type UPnP du device (ex: `urn:schemas-upnp-org:device:MediaRenderer:1`)
    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    pub fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Unique Device Name (ex: `uuid:...`)
    pub fn udn(&self) -> &str {
        &self.udn
    }

    /// Unique Service Name : `UDN::deviceType`
    pub fn usn(&self) -> &str {
        &self.usn
    }

    pub fn manufacturer(&self) -> Option<&str> {
        self.manufacturer.as_deref()
    }

    pub fn manufacturer_url(&self) -> Option<&Url> {
        self.manufacturer_url.as_ref()
    }

    pub fn presentation_url(&self) -> Option<&Url> {
        self.presentation_url.as_ref()
    }

    pub fn model_description(&self) -> Option<&str> {
        self.model_description.as_deref()
    }

    pub fn model_number(&self) -> Option<&str> {
        self.model_number.as_deref()
    }

    pub fn model_url(&self) -> Option<&str> {
        self.model_url.as_deref()
    }

    pub fn serial_number(&self) -> Option<&str> {
        self.serial_number.as_deref()
    }

    /// Universal Product Code, absent s'il n'était pas numérique
    pub fn upc(&self) -> Option<u64> {
        self.upc
    }

    pub fn icons(&self) -> &[DeviceIcon] {
        &self.icons
    }

    pub fn services(&self) -> &[ServiceDescription] {
        &self.services
    }

    /// Sous-devices, dans l'ordre du document.
    pub fn children(&self) -> &[Arc<Device>] {
        self.children.get().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Device parent, `None` pour le root device ou si l'arbre a été libéré.
    pub fn parent(&self) -> Option<Arc<Device>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Parcours en profondeur (préfixe) de ce device et de ses descendants.
    pub fn iter(&self) -> DeviceIter<'_> {
        DeviceIter { stack: vec![self] }
    }

    pub fn find_by_udn(&self, udn: &str) -> Option<&Device> {
        self.iter().find(|d| d.udn == udn)
    }

    pub fn find_by_type(&self, device_type: &str) -> Option<&Device> {
        self.iter().find(|d| d.device_type == device_type)
    }

    /// Premier service de ce type dans le sous-arbre.
    pub fn find_service(&self, service_type: &str) -> Option<&ServiceDescription> {
        self.iter()
            .flat_map(|d| d.services.iter())
            .find(|s| s.service_type() == service_type)
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Device({} {})", self.friendly_name, self.usn)
    }
}

/// Itérateur préfixe sur un sous-arbre de devices.
pub struct DeviceIter<'a> {
    stack: Vec<&'a Device>,
}

impl<'a> Iterator for DeviceIter<'a> {
    type Item = &'a Device;

    fn next(&mut self) -> Option<Self::Item> {
        let device = self.stack.pop()?;
        self.stack
            .extend(device.children().iter().rev().map(|child| child.as_ref()));
        Some(device)
    }
}
