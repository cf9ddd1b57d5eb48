//! Arbre des devices UPnP lu depuis un document de description.
//!
//! # Architecture
//!
//! - [`RootDevice`] : sommet de l'arbre, version du schéma, URLs de base,
//!   fenêtre de validité et métadonnées de découverte
//! - [`Device`] : un `<device>`, racine ou embarqué
//! - [`DeviceIcon`] : une entrée de `<iconList>`
//!
//! La propriété descend l'arbre (un device possède ses sous-devices via
//! `Arc`) ; les liens vers le parent et vers la racine sont des `Weak`.
//!
//! # Exemple
//!
//! ```ignore
//! use pmodescription::devices::RootDevice;
//!
//! let root = RootDevice::builder("http://192.168.1.20:49152/description.xml")
//!     .max_age("1800")
//!     .build_from_xml(&xml)?;
//!
//! for device in root.device().iter() {
//!     println!("{} -> {}", device.friendly_name(), device.usn());
//! }
//! ```

mod builder;
mod device;
mod icon;
mod root;

pub use device::{Device, DeviceIter};
pub use icon::DeviceIcon;
pub use root::{RootDevice, RootDeviceBuilder, SpecVersion};
