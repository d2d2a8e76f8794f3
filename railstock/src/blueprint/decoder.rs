//! Blueprint decoding.

use thiserror::Error;

use super::node::{BlueprintNode, NodeAttribute};

/// Namespace of the serializer's type annotations (`d:type`, `d:alt_encoding`).
pub const DELTA_NAMESPACE: &str = "http://www.kuju.com/TnT/2003/Delta";

/// Deepest element nesting accepted in a blueprint document.
///
/// Real blueprints stay well below 64 levels. Conversion, cloning and
/// comparison recurse per level, so deeper documents are rejected up front.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Errors produced while decoding blueprint bytes.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The bytes are not text in the expected encoding.
    #[error("blueprint is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// The bytes do not form a well-formed blueprint document.
    #[error("malformed blueprint: {0}")]
    Malformed(String),
}

/// Turns raw blueprint bytes into a navigable document.
///
/// Implementations must be thread-safe; the catalog scanner decodes from
/// many workers at once.
pub trait BlueprintDecoder: Send + Sync {
    /// Decode bytes into the document's root node.
    fn decode(&self, bytes: &[u8]) -> Result<BlueprintNode, DecodeError>;
}

/// Decoder for the textual markup form of blueprints.
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlBlueprintDecoder;

impl XmlBlueprintDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl BlueprintDecoder for XmlBlueprintDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<BlueprintNode, DecodeError> {
        let text = std::str::from_utf8(bytes)?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let document =
            roxmltree::Document::parse(text).map_err(|e| DecodeError::Malformed(e.to_string()))?;
        let root = document.root_element();
        if exceeds_depth(root, MAX_NESTING_DEPTH) {
            return Err(DecodeError::Malformed(format!(
                "elements nested deeper than {MAX_NESTING_DEPTH} levels"
            )));
        }
        Ok(convert(root))
    }
}

/// Whether the element tree under `root` is more than `limit` levels deep.
fn exceeds_depth(root: roxmltree::Node<'_, '_>, limit: usize) -> bool {
    let mut stack = vec![(root, 1usize)];
    while let Some((node, depth)) = stack.pop() {
        if depth > limit {
            return true;
        }
        stack.extend(
            node.children()
                .filter(|child| child.is_element())
                .map(|child| (child, depth + 1)),
        );
    }
    false
}

// Recursion is bounded by MAX_NESTING_DEPTH.
fn convert(element: roxmltree::Node<'_, '_>) -> BlueprintNode {
    let mut node = BlueprintNode::new(element.tag_name().name());
    for attribute in element.attributes() {
        node.push_attribute(NodeAttribute {
            namespace: attribute.namespace().map(str::to_string),
            name: attribute.name().to_string(),
            value: attribute.value().to_string(),
        });
    }

    let mut text = String::new();
    for child in element.children() {
        if child.is_element() {
            node.push_child(convert(child));
        } else if child.is_text() {
            if let Some(fragment) = child.text() {
                text.push_str(fragment);
            }
        }
    }

    node.with_text(text)
}
