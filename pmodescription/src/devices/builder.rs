//! Construction récursive de l'arbre des devices.
//!
//! Le parcours est en profondeur, préfixe : les champs, icônes et services
//! d'un device sont lus avant ses sous-devices. Toute erreur, à n'importe
//! quelle profondeur, remonte et abandonne la construction entière.

use std::sync::{Arc, Weak};

use tracing::{debug, warn};
use url::Url;

use crate::errors::DescriptionError;
use crate::fields::{get_optional, populate};
use crate::services::{ParsedService, RootLink};
use crate::url_resolver::directory_url;
use crate::xpath::PathContext;

use super::device::{DEVICE_FIELDS, DeviceFields};
use super::{Device, DeviceIcon, SpecVersion};

/// URLs de base utilisées pendant le parcours.
#[derive(Debug, Clone)]
pub(crate) struct BaseUrls {
    /// Base des champs de device et des icônes
    pub device: Url,
    /// Base des services : URLBase déclarée, sinon l'URL du document
    pub services: Url,
}

/// Résultat de la construction, avant l'ajout des métadonnées de découverte.
#[derive(Debug)]
pub(crate) struct DeviceTree {
    pub spec_version: SpecVersion,
    pub declared_base_url: Option<Url>,
    pub base_url: Url,
    pub root: Arc<Device>,
    /// Lien des services vers le root device, à renseigner après son allocation
    pub link: Arc<RootLink>,
}

/// Construit l'arbre complet à partir du contexte document.
pub(crate) fn build_tree<C: PathContext>(
    document: &C,
    location: &Url,
) -> Result<DeviceTree, DescriptionError> {
    let root_ctx = document
        .pointer("upnp:root")
        .map_err(|_| DescriptionError::unsupported_device("no 'upnp:root' element"))?;

    let spec_version = read_spec_version(&root_ctx)?;

    let declared_base_url = declared_base_url(&root_ctx);
    let base_url = match &declared_base_url {
        Some(base) => base.clone(),
        None => directory_url(location)?,
    };
    let bases = BaseUrls {
        device: base_url.clone(),
        services: declared_base_url.clone().unwrap_or_else(|| location.clone()),
    };

    let device_ctx = root_ctx
        .pointer("upnp:device")
        .map_err(|_| DescriptionError::schema_violation("device"))?;

    let link = Arc::new(RootLink::default());
    let root = fill_device(&device_ctx, None, &link, &bases)?;

    Ok(DeviceTree {
        spec_version,
        declared_base_url,
        base_url,
        root,
        link,
    })
}

fn read_spec_version<C: PathContext>(root_ctx: &C) -> Result<SpecVersion, DescriptionError> {
    let major = root_ctx
        .value("upnp:specVersion/upnp:major")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .ok_or_else(|| DescriptionError::unsupported_device("missing or invalid specVersion/major"))?;

    let minor = match root_ctx
        .value("upnp:specVersion/upnp:minor")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
    {
        Some(minor) => minor,
        None => {
            warn!("missing or invalid specVersion/minor, assuming 0");
            0
        }
    };

    let version = SpecVersion { major, minor };
    if major != 1 {
        return Err(DescriptionError::UnsupportedDevice(format!(
            "Unsupported device version ({})",
            version
        )));
    }
    Ok(version)
}

/// URLBase déclarée par le document, si elle est présente et valide.
fn declared_base_url<C: PathContext>(root_ctx: &C) -> Option<Url> {
    let base = get_optional(root_ctx, "upnp:URLBase")?;
    match Url::parse(&base) {
        Ok(url) => {
            debug!("device specified URLBase as {}", url);
            Some(url)
        }
        Err(err) => {
            warn!(
                "Error occured while parsing device baseURL '{}': {}; building it from device location instead",
                base, err
            );
            None
        }
    }
}

/// Lit un `<device>` et, récursivement, ses sous-devices.
pub(crate) fn fill_device<C: PathContext>(
    ctx: &C,
    parent: Option<Weak<Device>>,
    link: &Arc<RootLink>,
    bases: &BaseUrls,
) -> Result<Arc<Device>, DescriptionError> {
    let mut fields = DeviceFields::default();
    populate(ctx, DEVICE_FIELDS, Some(&bases.device), &mut fields)?;
    debug!("parsing device {}", fields.device_type());

    // iconList précède serviceList dans le document
    let icons = fill_icons(ctx, &bases.device)?;
    let services = fill_services(ctx, &bases.services)?;

    let services = services
        .into_iter()
        .map(|service| service.attach(Arc::clone(link)))
        .collect();
    let device = Arc::new(Device::assemble(fields, icons, services, parent));

    let children = fill_children(ctx, &device, link, bases)?;
    device.set_children(children);

    Ok(device)
}

fn fill_children<C: PathContext>(
    ctx: &C,
    parent: &Arc<Device>,
    link: &Arc<RootLink>,
    bases: &BaseUrls,
) -> Result<Vec<Arc<Device>>, DescriptionError> {
    // pas de deviceList : device feuille
    let Ok(list) = ctx.pointer("upnp:deviceList") else {
        return Ok(Vec::new());
    };

    let count = list.count("upnp:device")?;
    debug!("child devices count is {}", count);

    let mut children = Vec::with_capacity(count);
    for idx in 1..=count {
        let child_ctx = list.pointer(&format!("upnp:device[{}]", idx))?;
        let child = fill_device(&child_ctx, Some(Arc::downgrade(parent)), link, bases)?;
        debug!("adding child device {}", child.device_type());
        children.push(child);
    }
    Ok(children)
}

fn fill_icons<C: PathContext>(ctx: &C, base: &Url) -> Result<Vec<DeviceIcon>, DescriptionError> {
    let Ok(list) = ctx.pointer("upnp:iconList") else {
        return Ok(Vec::new());
    };

    let count = list.count("upnp:icon")?;
    debug!("device icons count is {}", count);

    let mut icons = Vec::with_capacity(count);
    for idx in 1..=count {
        let icon_ctx = list.pointer(&format!("upnp:icon[{}]", idx))?;
        let icon = DeviceIcon::from_context(&icon_ctx, base)?;
        if let Some(url) = icon.url() {
            debug!("icon URL is {}", url);
        }
        icons.push(icon);
    }
    Ok(icons)
}

fn fill_services<C: PathContext>(
    ctx: &C,
    base: &Url,
) -> Result<Vec<ParsedService>, DescriptionError> {
    let Ok(list) = ctx.pointer("upnp:serviceList") else {
        return Ok(Vec::new());
    };

    let count = list.count("upnp:service")?;
    debug!("device services count is {}", count);

    let mut services = Vec::with_capacity(count);
    for idx in 1..=count {
        let service_ctx = list.pointer(&format!("upnp:service[{}]", idx))?;
        services.push(ParsedService::from_context(&service_ctx, base)?);
    }
    Ok(services)
}
