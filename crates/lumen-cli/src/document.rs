//! Document-head model — the injection target for generated themes.
//!
//! Themes reach the rendered document through exactly two artifacts: one
//! style element holding custom-property declarations and one link
//! element pointing at a web-font stylesheet. Both are addressed by fixed
//! ids, and an upsert removes any prior instance before inserting, inside
//! a single `&mut` call — there is never a moment where two theme style
//! elements coexist.

use lumen_core::theme::GoogleFontSpec;

/// Fixed id of the theme style element.
pub const THEME_STYLE_ID: &str = "lumen-theme-style";
/// Fixed id of the web-font link element.
pub const THEME_FONT_LINK_ID: &str = "lumen-theme-fonts";

/// An element in the document head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadElement {
    Style { id: String, css: String },
    FontLink { id: String, href: String },
}

impl HeadElement {
    pub fn id(&self) -> &str {
        match self {
            Self::Style { id, .. } => id,
            Self::FontLink { id, .. } => id,
        }
    }
}

/// Ordered list of head elements, addressed by id.
#[derive(Debug, Clone, Default)]
pub struct DocumentHead {
    elements: Vec<HeadElement>,
}

impl DocumentHead {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the style element with the given id: remove old, insert new.
    pub fn upsert_style(&mut self, id: &str, css: &str) {
        self.remove(id);
        self.elements.push(HeadElement::Style {
            id: id.to_string(),
            css: css.to_string(),
        });
    }

    /// Replace the link element with the given id: remove old, insert new.
    pub fn upsert_font_link(&mut self, id: &str, href: &str) {
        self.remove(id);
        self.elements.push(HeadElement::FontLink {
            id: id.to_string(),
            href: href.to_string(),
        });
    }

    /// Remove every element with the given id.
    pub fn remove(&mut self, id: &str) {
        self.elements.retain(|e| e.id() != id);
    }

    /// CSS of the style element with the given id, if present.
    pub fn style_css(&self, id: &str) -> Option<&str> {
        self.elements.iter().find_map(|e| match e {
            HeadElement::Style { id: eid, css } if eid == id => Some(css.as_str()),
            _ => None,
        })
    }

    /// Href of the link element with the given id, if present.
    pub fn font_href(&self, id: &str) -> Option<&str> {
        self.elements.iter().find_map(|e| match e {
            HeadElement::FontLink { id: eid, href } if eid == id => Some(href.as_str()),
            _ => None,
        })
    }

    /// How many elements carry the given id. Always 0 or 1.
    pub fn count(&self, id: &str) -> usize {
        self.elements.iter().filter(|e| e.id() == id).count()
    }
}

/// Build the Google Fonts stylesheet URL for a validated font list.
///
/// Family names are `+`-encoded (they are already sanitized to letters,
/// digits, spaces, and hyphens), weights are deduplicated and joined in
/// ascending order with semicolons.
pub fn google_fonts_url(fonts: &[GoogleFontSpec]) -> String {
    let families: Vec<String> = fonts
        .iter()
        .map(|font| {
            let mut weights = font.weights.clone();
            weights.sort_unstable();
            weights.dedup();
            let joined = weights
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(";");
            format!("family={}:wght@{}", font.family.replace(' ', "+"), joined)
        })
        .collect();
    format!(
        "https://fonts.googleapis.com/css2?{}&display=swap",
        families.join("&")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_keeps_at_most_one_element_per_id() {
        let mut head = DocumentHead::new();
        head.upsert_style(THEME_STYLE_ID, ":root { --a: #111; }");
        head.upsert_style(THEME_STYLE_ID, ":root { --a: #222; }");

        assert_eq!(head.count(THEME_STYLE_ID), 1);
        assert_eq!(head.style_css(THEME_STYLE_ID), Some(":root { --a: #222; }"));
    }

    #[test]
    fn remove_returns_to_empty() {
        let mut head = DocumentHead::new();
        head.upsert_style(THEME_STYLE_ID, "x");
        head.upsert_font_link(THEME_FONT_LINK_ID, "https://example/css");
        head.remove(THEME_STYLE_ID);
        head.remove(THEME_FONT_LINK_ID);

        assert_eq!(head.count(THEME_STYLE_ID), 0);
        assert_eq!(head.count(THEME_FONT_LINK_ID), 0);
    }

    #[test]
    fn fonts_url_sorts_and_joins_weights() {
        let fonts = vec![
            GoogleFontSpec {
                family: "Source Serif Pro".to_string(),
                weights: vec![700, 400, 700],
            },
            GoogleFontSpec {
                family: "Inter".to_string(),
                weights: vec![500],
            },
        ];
        assert_eq!(
            google_fonts_url(&fonts),
            "https://fonts.googleapis.com/css2?family=Source+Serif+Pro:wght@400;700&family=Inter:wght@500&display=swap"
        );
    }
}
