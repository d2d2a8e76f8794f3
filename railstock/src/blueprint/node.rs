//! Owned, navigable blueprint tree.

/// An attribute on a blueprint node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAttribute {
    /// Namespace URI, if the attribute is qualified.
    pub namespace: Option<String>,

    /// Local attribute name (without prefix).
    pub name: String,

    pub value: String,
}

/// One element of a decoded blueprint document.
///
/// Text is the trimmed concatenation of the element's own text content,
/// excluding text inside child elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlueprintNode {
    tag: String,
    attributes: Vec<NodeAttribute>,
    text: String,
    children: Vec<BlueprintNode>,
}

impl BlueprintNode {
    /// Create an empty node with the given tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// Set the node text.
    pub fn with_text(mut self, text: impl AsRef<str>) -> Self {
        self.text = text.as_ref().trim().to_string();
        self
    }

    /// Add an attribute.
    pub fn with_attribute(
        mut self,
        namespace: Option<&str>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.push_attribute(NodeAttribute {
            namespace: namespace.map(str::to_string),
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Append a child node.
    pub fn with_child(mut self, child: BlueprintNode) -> Self {
        self.push_child(child);
        self
    }

    pub fn push_attribute(&mut self, attribute: NodeAttribute) {
        self.attributes.push(attribute);
    }

    pub fn push_child(&mut self, child: BlueprintNode) {
        self.children.push(child);
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attributes(&self) -> &[NodeAttribute] {
        &self.attributes
    }

    pub fn children(&self) -> &[BlueprintNode] {
        &self.children
    }

    /// Whether this node has no element children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Value of the first attribute with this local name, in any namespace.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Value of an attribute qualified by namespace URI.
    pub fn attribute_ns(&self, namespace: &str, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name && a.namespace.as_deref() == Some(namespace))
            .map(|a| a.value.as_str())
    }

    /// First direct child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&BlueprintNode> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// All descendants in document order, excluding `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children.iter().rev().collect(),
        }
    }

    /// Descendants with the given tag, in document order.
    pub fn descendants_named<'a>(
        &'a self,
        tag: &'a str,
    ) -> impl Iterator<Item = &'a BlueprintNode> + 'a {
        self.descendants().filter(move |n| n.tag == tag)
    }

    /// First descendant with the given tag.
    pub fn first_descendant(&self, tag: &str) -> Option<&BlueprintNode> {
        self.descendants().find(|n| n.tag == tag)
    }

    /// Text of the first descendant with the given tag that has no element
    /// children.
    ///
    /// Serialized blueprints reuse tag names for wrappers and values
    /// (`BlueprintID` wraps an absolute id that itself contains a
    /// `BlueprintID` string), so value lookups skip wrappers.
    pub fn leaf_text(&self, tag: &str) -> Option<&str> {
        self.descendants()
            .find(|n| n.tag == tag && n.is_leaf())
            .map(|n| n.text.as_str())
    }
}

/// Pre-order iterator over a node's descendants.
pub struct Descendants<'a> {
    stack: Vec<&'a BlueprintNode>,
}

// Flattens the subtree so dropping a deep tree does not recurse.
impl Drop for BlueprintNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a BlueprintNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
