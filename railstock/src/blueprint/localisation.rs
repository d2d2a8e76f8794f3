//! Localized display-name selection.

use super::node::BlueprintNode;

/// Tag of a localized-string bundle inside a `DisplayName` node.
pub const LOCALISED_STRING_TAG: &str = "Localisation-cUserLocalisedString";

/// Bundle children that never hold a display string.
const NON_LANGUAGE_TAGS: &[&str] = &["Other", "Key"];

/// Picks the display string for the active locale from a localized bundle.
pub trait DisplayNamePicker: Send + Sync {
    /// Return the preferred string, or an empty string if none is set.
    fn pick(&self, bundle: &BlueprintNode) -> String;
}

/// Picks the first populated language from an ordered preference list,
/// falling back to any populated language in bundle order.
///
/// # Example
///
/// ```
/// use railstock::blueprint::{BlueprintNode, DisplayNamePicker, LanguagePreferencePicker};
///
/// let bundle = BlueprintNode::new("Localisation-cUserLocalisedString")
///     .with_child(BlueprintNode::new("English"))
///     .with_child(BlueprintNode::new("German").with_text("Güterwagen"));
///
/// let picker = LanguagePreferencePicker::new(["English"]);
/// assert_eq!(picker.pick(&bundle), "Güterwagen");
/// ```
#[derive(Debug, Clone)]
pub struct LanguagePreferencePicker {
    languages: Vec<String>,
}

impl LanguagePreferencePicker {
    pub fn new<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            languages: languages.into_iter().map(Into::into).collect(),
        }
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }
}

impl Default for LanguagePreferencePicker {
    fn default() -> Self {
        Self::new(["English"])
    }
}

impl DisplayNamePicker for LanguagePreferencePicker {
    fn pick(&self, bundle: &BlueprintNode) -> String {
        let preferred = self
            .languages
            .iter()
            .filter_map(|language| bundle.child(language))
            .find(|node| !node.text().is_empty());

        let chosen = preferred.or_else(|| {
            bundle
                .children()
                .iter()
                .filter(|node| !NON_LANGUAGE_TAGS.contains(&node.tag()))
                .find(|node| !node.text().is_empty())
        });

        chosen.map(|node| node.text().to_string()).unwrap_or_default()
    }
}
