//! Évaluation d'expressions de chemin sur un document de description.
//!
//! Le constructeur d'arbre ne manipule jamais directement le XML : il passe
//! par le trait [`PathContext`], qui sait évaluer un chemin relatif à un nœud
//! et renvoyer soit une valeur scalaire, soit un nouveau contexte.
//!
//! La syntaxe supportée est volontairement réduite :
//!
//! - des étapes séparées par `/` (`upnp:specVersion/upnp:major`) ;
//! - un préfixe de namespace optionnel, résolu via [`Namespaces`] ;
//! - un index 1-based optionnel (`upnp:device[2]`).
//!
//! [`XmlContext`] implémente ce trait au-dessus d'un document `xmltree`.

use std::collections::HashMap;
use std::io::Read;

use thiserror::Error;
use xmltree::{Element, XMLNode};

/// Namespace des documents de description de devices UPnP 1.x
pub const UPNP_DEVICE_NAMESPACE: &str = "urn:schemas-upnp-org:device-1-0";

/// Préfixe utilisé dans les chemins pour [`UPNP_DEVICE_NAMESPACE`]
pub const UPNP_PREFIX: &str = "upnp";

/// Erreur d'évaluation d'un chemin
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("No node matches path '{0}'")]
    NotFound(String),

    #[error("Namespace prefix '{0}' is not bound")]
    UnboundPrefix(String),

    #[error("Invalid path step '{0}'")]
    InvalidStep(String),
}

/// Capacité minimale attendue d'un moteur de requêtes sur le document.
pub trait PathContext: Sized {
    /// Valeur texte (trimée) du premier nœud désigné par `path`.
    fn value(&self, path: &str) -> Result<String, PathError>;

    /// Contexte relatif au premier nœud désigné par `path`.
    fn pointer(&self, path: &str) -> Result<Self, PathError>;

    /// Nombre de nœuds désignés par `path`.
    ///
    /// Un chemin ne désignant rien renvoie `Ok(0)` si son parent existe.
    fn count(&self, path: &str) -> Result<usize, PathError>;
}

/// Table de correspondance préfixe → URI de namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespaces {
    bindings: HashMap<String, String>,
}

impl Namespaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Liaison standard `upnp` → `urn:schemas-upnp-org:device-1-0`.
    pub fn upnp_device() -> Self {
        Self::new().bind(UPNP_PREFIX, UPNP_DEVICE_NAMESPACE)
    }

    pub fn bind(mut self, prefix: &str, uri: &str) -> Self {
        self.bindings.insert(prefix.to_string(), uri.to_string());
        self
    }

    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Step<'p> {
    prefix: Option<&'p str>,
    local: &'p str,
    index: Option<usize>,
}

fn parse_step(raw: &str) -> Result<Step<'_>, PathError> {
    let raw = raw.trim();
    let invalid = || PathError::InvalidStep(raw.to_string());

    let (name, index) = match raw.find('[') {
        Some(open) => {
            let inner = raw.strip_suffix(']').ok_or_else(invalid)?;
            let index = inner[open + 1..]
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|idx| *idx >= 1)
                .ok_or_else(invalid)?;
            (raw[..open].trim(), Some(index))
        }
        None => (raw, None),
    };

    let (prefix, local) = match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    };

    if local.is_empty() || prefix.is_some_and(str::is_empty) {
        return Err(invalid());
    }

    Ok(Step {
        prefix,
        local,
        index,
    })
}

#[derive(Debug, Clone, Copy)]
enum Node<'a> {
    /// Nœud document virtuel, dont l'unique enfant est l'élément racine
    Document(&'a Element),
    Element(&'a Element),
}

/// Contexte d'évaluation positionné sur un nœud d'un document `xmltree`.
#[derive(Debug, Clone, Copy)]
pub struct XmlContext<'a> {
    node: Node<'a>,
    namespaces: &'a Namespaces,
}

impl<'a> XmlContext<'a> {
    /// Contexte placé au-dessus de l'élément racine, comme un nœud document.
    pub fn document(root: &'a Element, namespaces: &'a Namespaces) -> Self {
        Self {
            node: Node::Document(root),
            namespaces,
        }
    }

    /// Élément courant, `None` pour le nœud document.
    pub fn element(&self) -> Option<&'a Element> {
        match self.node {
            Node::Document(_) => None,
            Node::Element(element) => Some(element),
        }
    }

    fn children(&self) -> Box<dyn Iterator<Item = &'a Element> + 'a> {
        match self.node {
            Node::Document(root) => Box::new(std::iter::once(root)),
            Node::Element(element) => {
                Box::new(element.children.iter().filter_map(XMLNode::as_element))
            }
        }
    }

    fn namespace_of(&self, step: &Step<'_>) -> Result<Option<&'a str>, PathError> {
        match step.prefix {
            Some(prefix) => self
                .namespaces
                .resolve(prefix)
                .map(Some)
                .ok_or_else(|| PathError::UnboundPrefix(prefix.to_string())),
            None => Ok(None),
        }
    }

    fn matching(&self, step: &Step<'_>) -> Result<Vec<&'a Element>, PathError> {
        let namespace = self.namespace_of(step)?;
        Ok(self
            .children()
            .filter(|e| e.name == step.local && e.namespace.as_deref() == namespace)
            .collect())
    }

    fn select(&self, step: &Step<'_>) -> Result<Option<XmlContext<'a>>, PathError> {
        let position = step.index.unwrap_or(1) - 1;
        Ok(self.matching(step)?.get(position).map(|element| XmlContext {
            node: Node::Element(element),
            namespaces: self.namespaces,
        }))
    }
}

impl PathContext for XmlContext<'_> {
    fn value(&self, path: &str) -> Result<String, PathError> {
        let target = self.pointer(path)?;
        Ok(target
            .element()
            .and_then(|e| e.get_text())
            .map(|text| text.trim().to_string())
            .unwrap_or_default())
    }

    fn pointer(&self, path: &str) -> Result<Self, PathError> {
        let mut current = *self;
        for raw in path.split('/') {
            let step = parse_step(raw)?;
            current = current
                .select(&step)?
                .ok_or_else(|| PathError::NotFound(path.to_string()))?;
        }
        Ok(current)
    }

    fn count(&self, path: &str) -> Result<usize, PathError> {
        let (parent, last) = match path.rsplit_once('/') {
            Some((parent, last)) => (self.pointer(parent)?, last),
            None => (*self, path),
        };
        let step = parse_step(last)?;
        Ok(parent.matching(&step)?.len())
    }
}

/// Document de description déjà parsé, avec ses liaisons de namespaces.
#[derive(Debug, Clone)]
pub struct DescriptionDocument {
    root: Element,
    namespaces: Namespaces,
}

impl DescriptionDocument {
    pub fn new(root: Element, namespaces: Namespaces) -> Self {
        Self { root, namespaces }
    }

    /// Parse un document depuis un flux d'octets.
    pub fn parse<R: Read>(reader: R, namespaces: Namespaces) -> Result<Self, xmltree::ParseError> {
        let root = Element::parse(reader)?;
        Ok(Self::new(root, namespaces))
    }

    /// Parse un document UPnP depuis une chaîne, avec la liaison `upnp` standard.
    pub fn parse_str(xml: &str) -> Result<Self, xmltree::ParseError> {
        Self::parse(xml.as_bytes(), Namespaces::upnp_device())
    }

    pub fn root_element(&self) -> &Element {
        &self.root
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }

    /// Contexte de départ des évaluations, placé au niveau du document.
    pub fn context(&self) -> XmlContext<'_> {
        XmlContext::document(&self.root, &self.namespaces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <specVersion><major>1</major><minor>0</minor></specVersion>
  <device>
    <friendlyName>  Living Room  </friendlyName>
    <deviceList>
      <device><UDN>uuid:a</UDN></device>
      <device><UDN>uuid:b</UDN></device>
    </deviceList>
  </device>
</root>"#;

    #[test]
    fn test_parse_step() {
        let step = parse_step("upnp:device[3]").unwrap();
        assert_eq!(step.prefix, Some("upnp"));
        assert_eq!(step.local, "device");
        assert_eq!(step.index, Some(3));

        assert!(parse_step("upnp:device[0]").is_err());
        assert!(parse_step("upnp:device[x]").is_err());
        assert!(parse_step(":device").is_err());
        assert!(parse_step("").is_err());
    }

    #[test]
    fn test_value_and_pointer() {
        let doc = DescriptionDocument::parse_str(XML).unwrap();
        let root = doc.context().pointer("upnp:root").unwrap();

        assert_eq!(root.value("upnp:specVersion/upnp:major").unwrap(), "1");
        assert_eq!(root.value("upnp:device/upnp:friendlyName").unwrap(), "Living Room");

        let list = root.pointer("upnp:device/upnp:deviceList").unwrap();
        assert_eq!(list.count("upnp:device").unwrap(), 2);
        assert_eq!(list.value("upnp:device[2]/upnp:UDN").unwrap(), "uuid:b");
    }

    #[test]
    fn test_missing_nodes() {
        let doc = DescriptionDocument::parse_str(XML).unwrap();
        let root = doc.context().pointer("upnp:root").unwrap();

        assert_eq!(
            root.value("upnp:URLBase"),
            Err(PathError::NotFound("upnp:URLBase".to_string()))
        );
        assert!(root.pointer("upnp:device/upnp:deviceList/upnp:device[3]").is_err());
        assert_eq!(root.count("upnp:device/upnp:iconList").unwrap(), 0);
        assert!(root.count("upnp:nothing/upnp:icon").is_err());
    }

    #[test]
    fn test_namespace_is_enforced() {
        let doc = DescriptionDocument::parse_str(XML).unwrap();

        // Sans préfixe, seuls les éléments hors namespace correspondent
        assert!(doc.context().pointer("root").is_err());
        assert_eq!(
            doc.context().pointer("other:root").unwrap_err(),
            PathError::UnboundPrefix("other".to_string())
        );
    }
}
