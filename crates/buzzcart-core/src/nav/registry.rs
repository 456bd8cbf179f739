//! View construction

use tracing::{trace, warn};

use super::tag::ViewTag;
use crate::social::{FollowToggle, SearchFilter, SearchState};
use crate::types::UserId;

/// What a view shows
#[derive(Debug, Clone)]
pub enum ViewKind {
    Home,
    Search { filter: SearchFilter, query: String },
    Reels,
    Products,
    Cart,
    Profile,
    Menu,
    UserProfile { user: UserId, follow_toggle: FollowToggle },
}

/// A constructed screen
#[derive(Debug, Clone)]
pub struct View {
    instance: u64,
    tag: ViewTag,
    kind: ViewKind,
    visible: bool,
}

impl View {
    /// Construction number, unique per registry. A new number for the same
    /// tag means the view was rebuilt.
    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub fn tag(&self) -> &ViewTag {
        &self.tag
    }

    pub fn kind(&self) -> &ViewKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut ViewKind {
        &mut self.kind
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub(crate) fn show(&mut self) {
        self.visible = true;
    }

    pub(crate) fn hide(&mut self) {
        self.visible = false;
    }
}

/// Builds views for tags
#[derive(Debug, Default)]
pub struct ViewRegistry {
    next_instance: u64,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the view for `tag`. Never fails: tags the registry cannot
    /// build on its own degrade to the home view.
    pub fn create(&mut self, tag: &ViewTag, search: &SearchState) -> View {
        let kind = match tag {
            ViewTag::Home => ViewKind::Home,
            ViewTag::Search => ViewKind::Search {
                filter: search.filter,
                query: search.query.clone(),
            },
            ViewTag::Reels => ViewKind::Reels,
            ViewTag::Products => ViewKind::Products,
            ViewTag::Cart => ViewKind::Cart,
            ViewTag::Profile => ViewKind::Profile,
            ViewTag::Menu => ViewKind::Menu,
            ViewTag::UserProfile { .. } => {
                warn!(%tag, "Profile view requested without parameters, showing home");
                ViewKind::Home
            }
            ViewTag::Other(_) => {
                warn!(%tag, "Unknown view tag, showing home");
                ViewKind::Home
            }
        };
        self.adopt(tag.clone(), kind)
    }

    /// Wrap a view built elsewhere
    pub fn adopt(&mut self, tag: ViewTag, kind: ViewKind) -> View {
        let instance = self.next_instance;
        self.next_instance += 1;
        trace!(%tag, instance, "Constructed view");
        View {
            instance,
            tag,
            kind,
            visible: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_view_takes_saved_state() {
        let mut registry = ViewRegistry::new();
        let state = SearchState {
            filter: SearchFilter::Sellers,
            query: "shoes".into(),
        };
        let view = registry.create(&ViewTag::Search, &state);
        match view.kind() {
            ViewKind::Search { filter, query } => {
                assert_eq!(*filter, SearchFilter::Sellers);
                assert_eq!(query, "shoes");
            }
            other => panic!("unexpected kind: {:?}", other),
        }
        assert!(!view.is_visible());
    }

    #[test]
    fn test_unknown_tags_degrade_to_home() {
        let mut registry = ViewRegistry::new();
        let state = SearchState::default();

        let view = registry.create(&ViewTag::Other("settings".into()), &state);
        assert!(matches!(view.kind(), ViewKind::Home));
        assert_eq!(view.tag(), &ViewTag::Other("settings".into()));

        let tag = ViewTag::UserProfile {
            user_id: "u1".into(),
            seq: 0,
        };
        assert!(matches!(registry.create(&tag, &state).kind(), ViewKind::Home));
    }

    #[test]
    fn test_every_construction_gets_a_new_instance() {
        let mut registry = ViewRegistry::new();
        let state = SearchState::default();
        let a = registry.create(&ViewTag::Home, &state);
        let b = registry.create(&ViewTag::Home, &state);
        let c = registry.adopt(ViewTag::Cart, ViewKind::Cart);
        assert!(a.instance() < b.instance());
        assert!(b.instance() < c.instance());
    }
}
