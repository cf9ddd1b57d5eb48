//! Extraction des champs scalaires d'un nœud de description.
//!
//! Chaque champ du schéma est décrit par une entrée [`FieldSpec`] : son nom,
//! son chemin, sa politique ([`Policy::Mandatory`] ou [`Policy::Optional`])
//! et son type cible. Une table de ces entrées est appliquée à une structure cible
//! par [`populate`].
//!
//! Les deux politiques n'ont pas le même traitement de l'absence :
//!
//! - un champ obligatoire absent, vide ou mal typé est une violation du schéma ;
//! - un champ optionnel absent, vide ou mal typé est simplement ignoré.

use tracing::{debug, trace};
use url::Url;

use crate::errors::DescriptionError;
use crate::url_resolver::resolve_url;
use crate::xpath::PathContext;

/// Politique appliquée à un champ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Mandatory,
    Optional,
}

/// Type cible d'un champ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Entier non signé, parsé depuis le texte
    Integer,
    /// Entier non signé tenant sur 32 bits (dimensions d'icône)
    Integer32,
    /// URL résolue contre l'URL de base
    Url,
}

/// Valeur typée extraite d'un document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Integer(u64),
    Url(Url),
}

impl FieldValue {
    pub fn into_text(self) -> String {
        match self {
            FieldValue::Text(text) => text,
            FieldValue::Integer(n) => n.to_string(),
            FieldValue::Url(url) => url.into(),
        }
    }

    pub fn into_integer(self) -> Option<u64> {
        match self {
            FieldValue::Integer(n) => Some(n),
            _ => None,
        }
    }

    pub fn into_url(self) -> Option<Url> {
        match self {
            FieldValue::Url(url) => Some(url),
            _ => None,
        }
    }
}

/// Résultat de l'extraction d'un champ.
#[derive(Debug)]
pub enum Extraction<T> {
    Value(T),
    /// Champ optionnel absent ou inexploitable
    Absent,
    /// Champ obligatoire absent ou inexploitable
    Violation(DescriptionError),
}

/// Description d'un champ : où le trouver, comment le traiter, où le ranger.
pub struct FieldSpec<T> {
    pub name: &'static str,
    pub path: &'static str,
    pub policy: Policy,
    pub kind: FieldKind,
    pub assign: fn(&mut T, FieldValue),
}

impl<T> FieldSpec<T> {
    pub const fn mandatory(
        name: &'static str,
        path: &'static str,
        kind: FieldKind,
        assign: fn(&mut T, FieldValue),
    ) -> Self {
        Self {
            name,
            path,
            policy: Policy::Mandatory,
            kind,
            assign,
        }
    }

    pub const fn optional(
        name: &'static str,
        path: &'static str,
        kind: FieldKind,
        assign: fn(&mut T, FieldValue),
    ) -> Self {
        Self {
            name,
            path,
            policy: Policy::Optional,
            kind,
            assign,
        }
    }
}

/// Lit un champ obligatoire. Ne renvoie jamais de chaîne vide.
///
/// # Errors
///
/// [`DescriptionError::SchemaViolation`] si le chemin ne désigne rien ou
/// désigne un élément vide.
pub fn get_mandatory<C: PathContext>(ctx: &C, path: &str) -> Result<String, DescriptionError> {
    match ctx.value(path) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(DescriptionError::schema_violation(path)),
    }
}

/// Lit un champ optionnel.
///
/// Les erreurs d'évaluation sont absorbées : un élément optionnel absent est
/// une variation normale du document.
pub fn get_optional<C: PathContext>(ctx: &C, path: &str) -> Option<String> {
    match ctx.value(path) {
        Ok(value) if !value.is_empty() => Some(value),
        Ok(_) => None,
        Err(err) => {
            trace!("optional field {} not available: {}", path, err);
            None
        }
    }
}

/// Extrait et type un champ selon son [`FieldSpec`].
pub fn extract<C: PathContext, T>(
    ctx: &C,
    spec: &FieldSpec<T>,
    base: Option<&Url>,
) -> Extraction<FieldValue> {
    let raw = match spec.policy {
        Policy::Mandatory => match get_mandatory(ctx, spec.path) {
            Ok(raw) => raw,
            Err(_) => return Extraction::Violation(DescriptionError::schema_violation(spec.name)),
        },
        Policy::Optional => match get_optional(ctx, spec.path) {
            Some(raw) => raw,
            None => return Extraction::Absent,
        },
    };

    match spec.kind {
        FieldKind::Text => Extraction::Value(FieldValue::Text(raw)),

        FieldKind::Integer | FieldKind::Integer32 => match parse_integer(&raw, spec.kind) {
            Some(n) => Extraction::Value(FieldValue::Integer(n)),
            None if spec.policy == Policy::Mandatory => {
                Extraction::Violation(DescriptionError::schema_violation(spec.name))
            }
            // non numeric optional field, non compliant device
            None => Extraction::Absent,
        },

        FieldKind::Url => match resolve_url(Some(&raw), base) {
            Ok(Some(url)) => Extraction::Value(FieldValue::Url(url)),
            Ok(None) if spec.policy == Policy::Mandatory => {
                Extraction::Violation(DescriptionError::schema_violation(spec.name))
            }
            Ok(None) => Extraction::Absent,
            Err(err) if spec.policy == Policy::Mandatory => Extraction::Violation(err),
            Err(err) => {
                debug!("ignoring malformed {} '{}': {}", spec.name, raw, err);
                Extraction::Absent
            }
        },
    }
}

fn parse_integer(raw: &str, kind: FieldKind) -> Option<u64> {
    match kind {
        FieldKind::Integer32 => raw.parse::<u32>().ok().map(u64::from),
        _ => raw.parse::<u64>().ok(),
    }
}

/// Applique une table de [`FieldSpec`] à `target`, dans l'ordre de la table.
///
/// S'arrête à la première violation.
pub fn populate<C: PathContext, T>(
    ctx: &C,
    table: &[FieldSpec<T>],
    base: Option<&Url>,
    target: &mut T,
) -> Result<(), DescriptionError> {
    for spec in table {
        match extract(ctx, spec, base) {
            Extraction::Value(value) => (spec.assign)(target, value),
            Extraction::Absent => {}
            Extraction::Violation(err) => return Err(err),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xpath::DescriptionDocument;

    const XML: &str = r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <device>
    <friendlyName>Kitchen</friendlyName>
    <modelName></modelName>
    <UPC>ABC123</UPC>
    <width>48</width>
    <height>tall</height>
    <url>icons/a.png</url>
    <presentationURL>http://[broken</presentationURL>
  </device>
</root>"#;

    #[derive(Debug, Default)]
    struct Target {
        name: String,
        upc: Option<u64>,
        width: Option<u64>,
        url: Option<Url>,
    }

    fn with_device<F: FnOnce(crate::xpath::XmlContext<'_>)>(f: F) {
        let doc = DescriptionDocument::parse_str(XML).unwrap();
        let device = doc.context().pointer("upnp:root/upnp:device").unwrap();
        f(device);
    }

    #[test]
    fn test_get_mandatory() {
        with_device(|ctx| {
            assert_eq!(get_mandatory(&ctx, "upnp:friendlyName").unwrap(), "Kitchen");
            assert!(matches!(
                get_mandatory(&ctx, "upnp:modelName"),
                Err(DescriptionError::SchemaViolation(_))
            ));
            assert!(matches!(
                get_mandatory(&ctx, "upnp:UDN"),
                Err(DescriptionError::SchemaViolation(_))
            ));
        });
    }

    #[test]
    fn test_get_optional() {
        with_device(|ctx| {
            assert_eq!(get_optional(&ctx, "upnp:friendlyName").as_deref(), Some("Kitchen"));
            assert_eq!(get_optional(&ctx, "upnp:modelName"), None);
            assert_eq!(get_optional(&ctx, "upnp:serialNumber"), None);
        });
    }

    #[test]
    fn test_populate_with_table() {
        let table: [FieldSpec<Target>; 4] = [
            FieldSpec::<Target>::mandatory("friendlyName", "upnp:friendlyName", FieldKind::Text, |t, v| {
                t.name = v.into_text()
            }),
            FieldSpec::<Target>::optional("UPC", "upnp:UPC", FieldKind::Integer, |t, v| {
                t.upc = v.into_integer()
            }),
            FieldSpec::<Target>::mandatory("width", "upnp:width", FieldKind::Integer, |t, v| {
                t.width = v.into_integer()
            }),
            FieldSpec::<Target>::optional("url", "upnp:url", FieldKind::Url, |t, v| t.url = v.into_url()),
        ];
        let base = Url::parse("http://h:8080/desc").unwrap();

        with_device(|ctx| {
            let mut target = Target::default();
            populate(&ctx, &table, Some(&base), &mut target).unwrap();
            assert_eq!(target.name, "Kitchen");
            assert_eq!(target.upc, None);
            assert_eq!(target.width, Some(48));
            assert_eq!(target.url.unwrap().as_str(), "http://h:8080/desc/icons/a.png");
        });
    }

    #[test]
    fn test_mandatory_integer_must_be_numeric() {
        let table: [FieldSpec<Target>; 1] = [FieldSpec::<Target>::mandatory(
            "height",
            "upnp:height",
            FieldKind::Integer,
            |t, v| t.width = v.into_integer(),
        )];

        with_device(|ctx| {
            let err = populate(&ctx, &table, None, &mut Target::default()).unwrap_err();
            assert!(matches!(err, DescriptionError::SchemaViolation(ref f) if f == "height"));
        });
    }

    #[test]
    fn test_integer32_rejects_overflow() {
        let xml = XML.replace("<width>48</width>", "<width>99999999999</width>");
        let doc = DescriptionDocument::parse_str(&xml).unwrap();
        let ctx = doc.context().pointer("upnp:root/upnp:device").unwrap();

        let narrow: FieldSpec<Target> =
            FieldSpec::<Target>::mandatory("width", "upnp:width", FieldKind::Integer32, |t, v| {
                t.width = v.into_integer()
            });
        assert!(matches!(
            extract(&ctx, &narrow, None),
            Extraction::Violation(DescriptionError::SchemaViolation(ref f)) if f == "width"
        ));

        let wide: FieldSpec<Target> =
            FieldSpec::<Target>::mandatory("width", "upnp:width", FieldKind::Integer, |t, v| {
                t.width = v.into_integer()
            });
        assert!(matches!(
            extract(&ctx, &wide, None),
            Extraction::Value(FieldValue::Integer(99_999_999_999))
        ));
    }

    #[test]
    fn test_optional_url_degrades_to_absent() {
        let spec: FieldSpec<Target> = FieldSpec::<Target>::optional(
            "presentationURL",
            "upnp:presentationURL",
            FieldKind::Url,
            |t, v| t.url = v.into_url(),
        );

        with_device(|ctx| {
            assert!(matches!(extract(&ctx, &spec, None), Extraction::Absent));
        });
    }
}
