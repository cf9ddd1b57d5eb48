//! Résolution des URLs trouvées dans les documents de description.
//!
//! Les devices publient indifféremment des URLs absolues, des chemins
//! relatifs à la racine du serveur (`/icons/logo.png`) ou des chemins
//! relatifs à l'URL de base (`icons/logo.png`, parfois `icons\logo.png`).
//! [`resolve_url`] ramène tout cela à une URL absolue.

use url::Url;

use crate::errors::DescriptionError;

/// Résout `raw` en URL absolue.
///
/// - `raw` absent ou blanc : `Ok(None)` ;
/// - `raw` déjà absolue, avec un hôte : renvoyée telle quelle, `base` est
///   ignorée. `localhost:8080/a.png` ou `urn:upnp-org:serviceId:X/control`
///   n'ont pas d'hôte et sont traitées comme relatives ;
/// - sinon les `\` sont remplacés par des `/`, puis :
///   - `/chemin` est ajouté à `scheme://host:port` de `base` ;
///   - `chemin` est ajouté à la forme externe de `base`, suffixée d'un `/`.
///
/// # Errors
///
/// [`DescriptionError::InvalidUrl`] si `raw` est relative et qu'aucune base
/// n'est fournie, ou si l'URL composée n'est pas valide.
pub fn resolve_url(raw: Option<&str>, base: Option<&Url>) -> Result<Option<Url>, DescriptionError> {
    let raw = match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Ok(None),
    };

    if let Some(url) = Url::parse(raw).ok().filter(Url::has_host) {
        return Ok(Some(url));
    }

    let base = base.ok_or_else(|| DescriptionError::invalid_url(raw))?;
    let normalized = raw.replace('\\', "/");

    let composed = if normalized.starts_with('/') {
        format!("{}{}", url_root(base)?, normalized)
    } else {
        let mut external = base.as_str().to_string();
        if !external.ends_with('/') {
            external.push('/');
        }
        external.push_str(&normalized);
        external
    };

    Url::parse(&composed)
        .map(Some)
        .map_err(|_| DescriptionError::invalid_url(&composed))
}

/// Retourne `scheme://host:port` pour `url`.
///
/// Le port est omis uniquement lorsque le schéma n'a pas de port par défaut
/// connu et que l'URL n'en précise pas.
pub fn url_root(url: &Url) -> Result<String, DescriptionError> {
    let host = url
        .host_str()
        .ok_or_else(|| DescriptionError::invalid_url(url.as_str()))?;

    Ok(match url.port_or_known_default() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

/// URL du répertoire contenant `location` : racine + chemin jusqu'au dernier `/` exclu.
///
/// `http://host:1400/xml/device_description.xml` donne `http://host:1400/xml`.
pub fn directory_url(location: &Url) -> Result<Url, DescriptionError> {
    let mut composed = url_root(location)?;
    let path = location.path();
    if let Some(last_slash) = path.rfind('/') {
        composed.push_str(&path[..last_slash]);
    }

    Url::parse(&composed).map_err(|_| DescriptionError::invalid_url(&composed))
}
