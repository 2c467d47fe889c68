//! Point-in-time capture of the edited document.

use super::surface::EditorSurface;

/// Markup and stylesheet read together from the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    markup: String,
    stylesheet: String,
}

impl DocumentSnapshot {
    pub fn new(markup: impl Into<String>, stylesheet: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            stylesheet: stylesheet.into(),
        }
    }

    /// Read the editor's current markup and stylesheet in one synchronous step.
    ///
    /// Call once per export; the document may change between exports.
    pub fn capture(editor: &dyn EditorSurface) -> Self {
        let (markup, stylesheet) = editor.document();
        Self { markup, stylesheet }
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn stylesheet(&self) -> &str {
        &self.stylesheet
    }

    /// Derive a snapshot whose stylesheet ends with `extra` rules.
    #[must_use]
    pub fn with_extra_stylesheet(&self, extra: &str) -> Self {
        let mut stylesheet = self.stylesheet.clone();
        if !stylesheet.is_empty() && !stylesheet.ends_with('\n') {
            stylesheet.push('\n');
        }
        stylesheet.push_str(extra);
        Self {
            markup: self.markup.clone(),
            stylesheet,
        }
    }

    pub fn into_parts(self) -> (String, String) {
        (self.markup, self.stylesheet)
    }
}
