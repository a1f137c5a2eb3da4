//! Service layer module root.
//! Contains the signature session starters and finishers, authentication,
//! the signature explorers and the positioning preset helper.

pub mod authentication;
pub mod cades;
pub mod explorer;
pub mod pades;
pub mod presets;
pub mod signature;
pub mod xml;

pub use authentication::Authenticator;
pub use cades::{CadesSignatureFinisher, CadesSignatureStarter};
pub use explorer::{CadesSignatureExplorer, PadesSignatureExplorer};
pub use pades::{PadesSignatureFinisher, PadesSignatureStarter};
pub use presets::{
    shared_preset_cache, InMemoryPresetCache, PadesVisualPositioningPresets, PresetCache,
    SamplePosition,
};
pub use signature::{certificate_subject, SignatureStartResult};
pub use xml::{XmlSignatureFinisher, XmlSignatureStarter};
