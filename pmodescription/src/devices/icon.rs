//! Icônes déclarées dans `<iconList>`.

use url::Url;

use crate::errors::DescriptionError;
use crate::fields::{FieldKind, FieldSpec, get_optional, populate};
use crate::url_resolver::resolve_url;
use crate::xpath::PathContext;

/// Icône de présentation d'un device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceIcon {
    mime_type: String,
    width: u32,
    height: u32,
    depth: u32,
    url: Option<Url>,
}

// Integer32 garantit que la valeur tient sur 32 bits
fn dimension(n: Option<u64>) -> u32 {
    n.and_then(|n| u32::try_from(n).ok()).unwrap_or_default()
}

type IconSpec = FieldSpec<DeviceIcon>;

// Tous obligatoires : une icône incomplète invalide tout le document
const ICON_FIELDS: &[IconSpec] = &[
    IconSpec::mandatory("mimetype", "upnp:mimetype", FieldKind::Text, |i, v| {
        i.mime_type = v.into_text()
    }),
    IconSpec::mandatory("width", "upnp:width", FieldKind::Integer32, |i, v| {
        i.width = dimension(v.into_integer())
    }),
    IconSpec::mandatory("height", "upnp:height", FieldKind::Integer32, |i, v| {
        i.height = dimension(v.into_integer())
    }),
    IconSpec::mandatory("depth", "upnp:depth", FieldKind::Integer32, |i, v| {
        i.depth = dimension(v.into_integer())
    }),
];

impl DeviceIcon {
    /// Lit un élément `<icon>`.
    ///
    /// Une URL absente laisse l'icône sans URL ; une URL présente mais
    /// impossible à résoudre est une erreur.
    pub fn from_context<C: PathContext>(ctx: &C, base: &Url) -> Result<Self, DescriptionError> {
        let mut icon = DeviceIcon::default();
        populate(ctx, ICON_FIELDS, Some(base), &mut icon)?;
        icon.url = resolve_url(get_optional(ctx, "upnp:url").as_deref(), Some(base))?;
        Ok(icon)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Profondeur de couleur en bits
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }
}
