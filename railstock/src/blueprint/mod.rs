//! Decoded blueprint documents.
//!
//! Blueprints reach the engine as bytes. A [`BlueprintDecoder`] turns them
//! into an owned [`BlueprintNode`] tree which the vehicle classifier walks by
//! tag name. The crate ships [`XmlBlueprintDecoder`] for the textual markup
//! form; binary decoders plug in through the same trait.
//!
//! Localized display names are picked out of
//! `Localisation-cUserLocalisedString` bundles by a [`DisplayNamePicker`].

mod decoder;
mod localisation;
mod node;

pub use decoder::{
    BlueprintDecoder, DecodeError, XmlBlueprintDecoder, DELTA_NAMESPACE, MAX_NESTING_DEPTH,
};
pub use localisation::{DisplayNamePicker, LanguagePreferencePicker, LOCALISED_STRING_TAG};
pub use node::{BlueprintNode, Descendants, NodeAttribute};
