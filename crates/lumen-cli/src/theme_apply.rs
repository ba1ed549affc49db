//! Theme application service — applies a validated theme to the document
//! head and persists the committed/favorite slots.
//!
//! Revert is data, not a captured closure: `AppliedState` snapshots what
//! is currently injected, and `restore` puts exactly that back.

use tracing::info;

use lumen_core::error::Result;
use lumen_core::theme::GeneratedTheme;

use crate::document::{
    google_fonts_url, DocumentHead, THEME_FONT_LINK_ID, THEME_STYLE_ID,
};
use crate::store::{StateStore, SLOT_ACTIVE_THEME, SLOT_FAVORITE_THEME};

/// Snapshot of the currently injected theme artifacts. `None` means the
/// element is absent (the Default state).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedState {
    pub css: Option<String>,
    pub font_url: Option<String>,
}

impl AppliedState {
    pub fn default_state() -> Self {
        Self {
            css: None,
            font_url: None,
        }
    }
}

/// Applies themes to the live document and owns the persisted slots.
pub struct ThemeService {
    head: DocumentHead,
    store: StateStore,
}

impl ThemeService {
    pub fn new(store: StateStore) -> Self {
        Self {
            head: DocumentHead::new(),
            store,
        }
    }

    /// Apply a theme's artifacts: style element always, font link only
    /// when the theme carries fonts (a fontless theme removes any link
    /// left by its predecessor).
    pub fn apply(&mut self, theme: &GeneratedTheme) {
        self.head.upsert_style(THEME_STYLE_ID, &theme.css);
        if theme.fonts.is_empty() {
            self.head.remove(THEME_FONT_LINK_ID);
        } else {
            self.head
                .upsert_font_link(THEME_FONT_LINK_ID, &google_fonts_url(&theme.fonts));
        }
    }

    /// Remove both artifacts, returning the document to Default.
    pub fn reset(&mut self) {
        self.head.remove(THEME_STYLE_ID);
        self.head.remove(THEME_FONT_LINK_ID);
    }

    /// Snapshot what is injected right now.
    pub fn snapshot(&self) -> AppliedState {
        AppliedState {
            css: self.head.style_css(THEME_STYLE_ID).map(str::to_string),
            font_url: self.head.font_href(THEME_FONT_LINK_ID).map(str::to_string),
        }
    }

    /// Restore exactly a previous snapshot.
    pub fn restore(&mut self, state: &AppliedState) {
        match &state.css {
            Some(css) => self.head.upsert_style(THEME_STYLE_ID, css),
            None => self.head.remove(THEME_STYLE_ID),
        }
        match &state.font_url {
            Some(url) => self.head.upsert_font_link(THEME_FONT_LINK_ID, url),
            None => self.head.remove(THEME_FONT_LINK_ID),
        }
    }

    /// CSS currently injected, if any.
    pub fn current_css(&self) -> Option<&str> {
        self.head.style_css(THEME_STYLE_ID)
    }

    /// Persist a theme as Active. Overwrites the previous value whole.
    pub fn persist_active(&self, theme: &GeneratedTheme) -> Result<()> {
        info!(theme = %theme.name, "persisting active theme");
        self.store.save(SLOT_ACTIVE_THEME, theme)
    }

    /// Persist a theme as Favorite, independent of Active.
    pub fn persist_favorite(&self, theme: &GeneratedTheme) -> Result<()> {
        info!(theme = %theme.name, "persisting favorite theme");
        self.store.save(SLOT_FAVORITE_THEME, theme)
    }

    pub fn load_active(&self) -> Option<GeneratedTheme> {
        self.store.load(SLOT_ACTIVE_THEME)
    }

    pub fn load_favorite(&self) -> Option<GeneratedTheme> {
        self.store.load(SLOT_FAVORITE_THEME)
    }

    /// Apply the persisted Active theme on startup, if there is one.
    pub fn apply_persisted(&mut self) -> Option<GeneratedTheme> {
        let theme = self.load_active()?;
        self.apply(&theme);
        Some(theme)
    }

    /// Restore the Favorite: direct apply-and-persist-as-Active, no
    /// preview involved.
    pub fn restore_favorite(&mut self) -> Result<Option<GeneratedTheme>> {
        match self.load_favorite() {
            Some(theme) => {
                self.apply(&theme);
                self.persist_active(&theme)?;
                Ok(Some(theme))
            }
            None => Ok(None),
        }
    }

    /// Remove the Active slot and clear the document.
    pub fn clear_active(&mut self) -> Result<()> {
        self.reset();
        self.store.clear(SLOT_ACTIVE_THEME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::theme::GoogleFontSpec;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn theme(name: &str, css: &str, fonts: Vec<GoogleFontSpec>) -> GeneratedTheme {
        GeneratedTheme::from_sanitized(name, css, fonts, HashMap::new())
    }

    fn service() -> (ThemeService, tempfile::TempDir) {
        let tmp = tempdir().unwrap();
        let service = ThemeService::new(StateStore::new(tmp.path().to_path_buf()));
        (service, tmp)
    }

    #[test]
    fn apply_injects_style_and_fonts() {
        let (mut service, _tmp) = service();
        let t = theme(
            "Test",
            ":root {\n  --color-accent: #abc;\n}",
            vec![GoogleFontSpec {
                family: "Inter".to_string(),
                weights: vec![400],
            }],
        );
        service.apply(&t);
        assert_eq!(service.current_css(), Some(t.css.as_str()));
        assert!(service.snapshot().font_url.unwrap().contains("Inter"));
    }

    #[test]
    fn fontless_theme_removes_a_stale_font_link() {
        let (mut service, _tmp) = service();
        service.apply(&theme(
            "A",
            "a",
            vec![GoogleFontSpec {
                family: "Lora".to_string(),
                weights: vec![400],
            }],
        ));
        service.apply(&theme("B", "b", vec![]));
        assert!(service.snapshot().font_url.is_none());
    }

    #[test]
    fn snapshot_restore_round_trip() {
        let (mut service, _tmp) = service();
        service.apply(&theme("A", ":root { --color-accent: #111; }", vec![]));
        let before = service.snapshot();

        service.apply(&theme("B", ":root { --color-accent: #222; }", vec![]));
        service.restore(&before);

        assert_eq!(service.snapshot(), before);
    }

    #[test]
    fn restore_to_default_removes_everything() {
        let (mut service, _tmp) = service();
        service.apply(&theme("A", "a", vec![]));
        service.restore(&AppliedState::default_state());
        assert!(service.current_css().is_none());
    }

    #[test]
    fn active_and_favorite_slots_are_independent() {
        let (mut service, _tmp) = service();
        let active = theme("Active", "a", vec![]);
        let favorite = theme("Favorite", "f", vec![]);

        service.persist_active(&active).unwrap();
        service.persist_favorite(&favorite).unwrap();

        assert_eq!(service.load_active().unwrap().name, "Active");
        assert_eq!(service.load_favorite().unwrap().name, "Favorite");

        // Restoring the favorite overwrites Active, not Favorite.
        let restored = service.restore_favorite().unwrap().unwrap();
        assert_eq!(restored.name, "Favorite");
        assert_eq!(service.load_active().unwrap().name, "Favorite");
        assert_eq!(service.current_css(), Some("f"));
    }
}
