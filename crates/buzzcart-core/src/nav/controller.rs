//! Navigation controller

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::registry::{View, ViewKind, ViewRegistry};
use super::stack::TabStack;
use super::tab::TabId;
use super::tag::{Overlay, ViewTag};
use crate::social::SearchState;
use crate::types::UserId;

/// Result of a back press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackOutcome {
    /// The active tab's top tag was popped and the new top is on screen
    Popped(ViewTag),
    /// Another tab was at its root; home is now on screen
    SwitchedHome,
    /// Home is at its root. Nothing changed; the caller decides whether to exit.
    ConfirmExit,
}

/// Session-scoped navigation state that survives process suspension
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavSnapshot {
    pub active_tab: TabId,
    pub home_in_search_mode: bool,
    pub profile_in_menu_mode: bool,
    pub search: SearchState,
    pub next_seq: u64,
}

/// Owns every tab stack, the view cache and the visible view
#[derive(Debug, Default)]
pub struct NavigationController {
    stacks: [TabStack; TabId::COUNT],
    active_tab: TabId,
    active_view: Option<ViewTag>,
    cache: HashMap<ViewTag, View>,
    registry: ViewRegistry,
    home_in_search_mode: bool,
    profile_in_menu_mode: bool,
    search: SearchState,
    next_seq: u64,
}

impl NavigationController {
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════

    pub fn active_tab(&self) -> TabId {
        self.active_tab
    }

    pub fn stack(&self, tab: TabId) -> &TabStack {
        &self.stacks[tab.index()]
    }

    /// Tag of the view on screen, `None` before the first navigation
    pub fn active_tag(&self) -> Option<&ViewTag> {
        self.active_view.as_ref()
    }

    pub fn active_view(&self) -> Option<&View> {
        self.active_view.as_ref().and_then(|tag| self.cache.get(tag))
    }

    pub fn active_view_mut(&mut self) -> Option<&mut View> {
        let tag = self.active_view.as_ref()?;
        self.cache.get_mut(tag)
    }

    pub fn cached(&self, tag: &ViewTag) -> Option<&View> {
        self.cache.get(tag)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Cached views currently marked visible
    pub fn visible_views(&self) -> impl Iterator<Item = &View> {
        self.cache.values().filter(|v| v.is_visible())
    }

    pub fn in_overlay(&self, overlay: Overlay) -> bool {
        match overlay {
            Overlay::Search => self.home_in_search_mode,
            Overlay::Menu => self.profile_in_menu_mode,
        }
    }

    pub fn search_state(&self) -> &SearchState {
        &self.search
    }

    /// Remember the search screen's filter and query
    pub fn save_search_state(&mut self, state: SearchState) {
        self.search = state;
    }

    fn set_overlay(&mut self, overlay: Overlay, on: bool) {
        match overlay {
            Overlay::Search => self.home_in_search_mode = on,
            Overlay::Menu => self.profile_in_menu_mode = on,
        }
    }

    fn stack_mut(&mut self, tab: TabId) -> &mut TabStack {
        &mut self.stacks[tab.index()]
    }

    /// Make sure a visited tab starts with its anchor
    fn ensure_anchor(&mut self, tab: TabId) {
        let stack = self.stack_mut(tab);
        if stack.is_empty() {
            stack.push(tab.anchor());
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Display
    // ═══════════════════════════════════════════════════════════════════════

    /// Hide the current view and show `tag`, building it on first use
    fn show(&mut self, tag: ViewTag) {
        if let Some(previous) = self.active_view.take() {
            if let Some(view) = self.cache.get_mut(&previous) {
                view.hide();
            }
        }

        let registry = &mut self.registry;
        let search = &self.search;
        let view = self
            .cache
            .entry(tag.clone())
            .or_insert_with(|| registry.create(&tag, search));
        view.show();

        debug!(tab = %self.active_tab, view = %tag, instance = view.instance(), "Showing view");
        self.active_view = Some(tag);
    }

    fn show_top(&mut self, tab: TabId) {
        let top = self.stack(tab).top().cloned().unwrap_or_else(|| tab.anchor());
        self.show(top);
    }

    fn evict(&mut self, tag: &ViewTag) {
        if self.cache.remove(tag).is_some() {
            debug!(view = %tag, "Evicted view");
            if self.active_view.as_ref() == Some(tag) {
                self.active_view = None;
            }
        }
    }

    fn evict_where<P>(&mut self, pred: P)
    where
        P: Fn(&ViewTag) -> bool,
    {
        let doomed: Vec<ViewTag> = self.cache.keys().filter(|&t| pred(t)).cloned().collect();
        for tag in doomed {
            self.evict(&tag);
        }
    }

    /// Pop the top of `tab`'s stack. Dynamic tags can never come back, so
    /// their views go with them.
    fn pop(&mut self, tab: TabId) -> Option<ViewTag> {
        let popped = self.stack_mut(tab).pop()?;
        if popped.is_dynamic() {
            self.evict(&popped);
        }
        if let Some(overlay) = Overlay::for_tab(tab) {
            if self.stack(tab).top() == Some(&tab.anchor()) {
                self.set_overlay(overlay, false);
            }
        }
        Some(popped)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Operations
    // ═══════════════════════════════════════════════════════════════════════

    /// Make `tab` active and show the top of its stack
    ///
    /// A first visit pushes the anchor, plus the tab's overlay when its mode
    /// flag survived a restore.
    pub fn switch_tab(&mut self, tab: TabId) {
        self.active_tab = tab;
        if self.stack(tab).is_empty() {
            self.stack_mut(tab).push(tab.anchor());
            if let Some(overlay) = Overlay::for_tab(tab) {
                if self.in_overlay(overlay) {
                    self.stack_mut(tab).push(overlay.tag());
                }
            }
        }
        self.show_top(tab);
    }

    /// Bottom-navigation tap. Tapping the active home or profile tab again
    /// returns it to its anchor.
    pub fn select_tab(&mut self, tab: TabId) {
        let reselect = tab == self.active_tab && self.active_view.is_some();
        if reselect && Overlay::for_tab(tab).is_some() {
            self.reset_tab_to_anchor(tab);
        } else {
            self.switch_tab(tab);
        }
    }

    /// Show a dynamic view on `tab`, replacing any member of the same family
    pub fn push_dynamic<F>(&mut self, tab: TabId, tag: ViewTag, factory: F)
    where
        F: FnOnce() -> ViewKind,
    {
        self.active_tab = tab;
        self.ensure_anchor(tab);

        if let Some(family) = tag.family() {
            let removed = self.stack_mut(tab).remove_all(|t| t.family() == Some(family));
            debug!(tab = %tab, replaced = removed.len(), "Replacing dynamic views");
            self.evict_where(|t| t.family() == Some(family));
        }

        self.stack_mut(tab).push(tag.clone());
        let view = self.registry.adopt(tag.clone(), factory());
        self.cache.insert(tag.clone(), view);
        self.show(tag);
    }

    /// Return `tab` to `[anchor]`, dropping its transient views
    pub fn reset_tab_to_anchor(&mut self, tab: TabId) {
        self.active_tab = tab;
        let removed = self.stack_mut(tab).reset(tab.anchor());
        for tag in removed.iter().filter(|t| t.is_dynamic()) {
            self.evict(tag);
        }

        match tab {
            TabId::Home => {
                self.evict_where(|t| *t == ViewTag::Search || t.is_dynamic());
            }
            TabId::Profile => self.evict(&ViewTag::Menu),
            _ => {}
        }
        if let Some(overlay) = Overlay::for_tab(tab) {
            self.set_overlay(overlay, false);
        }

        debug!(tab = %tab, "Reset tab to anchor");
        self.show(tab.anchor());
    }

    /// Put `overlay` on top of `tab`
    ///
    /// Search always starts fresh: the previous search view, any visited
    /// profiles and the saved search state are discarded. Menu reuses its
    /// cached view.
    ///
    /// # Panics
    ///
    /// If `overlay` does not belong to `tab`.
    pub fn enter_overlay_mode(&mut self, tab: TabId, overlay: Overlay) {
        assert_eq!(overlay.tab(), tab, "overlay {} does not belong to tab {}", overlay, tab);

        self.active_tab = tab;
        self.ensure_anchor(tab);
        self.set_overlay(overlay, true);

        if overlay == Overlay::Search {
            self.stack_mut(tab)
                .remove_all(|t| *t == ViewTag::Search || t.is_dynamic());
            self.evict_where(|t| *t == ViewTag::Search || t.is_dynamic());
            self.search = SearchState::default();
        }

        let tag = overlay.tag();
        if self.stack(tab).top() != Some(&tag) {
            self.stack_mut(tab).push(tag.clone());
        }
        debug!(tab = %tab, overlay = %overlay, "Entered overlay mode");
        self.show(tag);
    }

    /// Leave the overlay on `tab` (the overlay's own back button)
    pub fn exit_overlay_mode(&mut self, tab: TabId) {
        self.active_tab = tab;
        if self.stack(tab).len() > 1 {
            self.pop(tab);
            self.show_top(tab);
        } else {
            self.reset_tab_to_anchor(tab);
        }
    }

    /// System back press
    pub fn resolve_back_press(&mut self) -> BackOutcome {
        let tab = self.active_tab;
        if self.stack(tab).len() > 1 {
            let popped = self.pop(tab).unwrap_or_else(|| tab.anchor());
            self.show_top(tab);
            BackOutcome::Popped(popped)
        } else if tab == TabId::Home {
            BackOutcome::ConfirmExit
        } else {
            self.switch_tab(TabId::Home);
            BackOutcome::SwitchedHome
        }
    }

    /// Mint a fresh tag for visiting `user_id`'s profile
    pub fn user_profile_tag(&mut self, user_id: &UserId) -> ViewTag {
        let seq = self.next_seq;
        self.next_seq += 1;
        ViewTag::UserProfile {
            user_id: user_id.clone(),
            seq,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════════════════════════════════

    pub fn snapshot(&self) -> NavSnapshot {
        NavSnapshot {
            active_tab: self.active_tab,
            home_in_search_mode: self.home_in_search_mode,
            profile_in_menu_mode: self.profile_in_menu_mode,
            search: self.search.clone(),
            next_seq: self.next_seq,
        }
    }

    /// Start over from a snapshot and show the saved tab
    pub fn restore(&mut self, snapshot: NavSnapshot) {
        self.clear();
        self.home_in_search_mode = snapshot.home_in_search_mode;
        self.profile_in_menu_mode = snapshot.profile_in_menu_mode;
        self.search = snapshot.search;
        self.next_seq = self.next_seq.max(snapshot.next_seq);
        debug!(tab = %snapshot.active_tab, "Restoring navigation state");
        self.switch_tab(snapshot.active_tab);
    }

    /// Drop every stack and cached view (sign-out, teardown)
    pub fn clear(&mut self) {
        for stack in &mut self.stacks {
            stack.clear();
        }
        self.cache.clear();
        self.active_view = None;
        self.active_tab = TabId::Home;
        self.home_in_search_mode = false;
        self.profile_in_menu_mode = false;
        self.search = SearchState::default();
        debug!("Cleared navigation state");
    }
}
