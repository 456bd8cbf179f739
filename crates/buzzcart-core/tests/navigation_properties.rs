//! Property-based tests for NavigationController
//!
//! Drives the controller with random tap sequences and checks the
//! invariants that must hold after every step.

use std::collections::HashSet;

use buzzcart_core::nav::{BackOutcome, NavigationController, Overlay, TabId, ViewKind, ViewTag};
use buzzcart_core::social::FollowToggle;
use buzzcart_core::UserId;
use proptest::prelude::*;

// ============================================================================
// Strategy Generators
// ============================================================================

/// What a user can do to the navigation layer
#[derive(Debug, Clone)]
enum NavOp {
    SelectTab(TabId),
    Back,
    OpenSearch,
    CloseSearch,
    OpenMenu,
    CloseMenu,
    VisitProfile(u8),
    Reset(TabId),
    SnapshotRestore,
}

fn tab_strategy() -> impl Strategy<Value = TabId> {
    prop::sample::select(TabId::ALL.to_vec())
}

fn nav_op_strategy() -> impl Strategy<Value = NavOp> {
    prop_oneof![
        3 => tab_strategy().prop_map(NavOp::SelectTab),
        3 => Just(NavOp::Back),
        2 => Just(NavOp::OpenSearch),
        1 => Just(NavOp::CloseSearch),
        1 => Just(NavOp::OpenMenu),
        1 => Just(NavOp::CloseMenu),
        2 => (0..4u8).prop_map(NavOp::VisitProfile),
        1 => tab_strategy().prop_map(NavOp::Reset),
        1 => Just(NavOp::SnapshotRestore),
    ]
}

fn nav_ops_strategy(max_ops: usize) -> impl Strategy<Value = Vec<NavOp>> {
    prop::collection::vec(nav_op_strategy(), 0..max_ops)
}

fn apply(nav: &mut NavigationController, op: &NavOp) {
    match op {
        NavOp::SelectTab(tab) => nav.select_tab(*tab),
        NavOp::Back => {
            nav.resolve_back_press();
        }
        NavOp::OpenSearch => nav.enter_overlay_mode(TabId::Home, Overlay::Search),
        NavOp::CloseSearch => nav.exit_overlay_mode(TabId::Home),
        NavOp::OpenMenu => nav.enter_overlay_mode(TabId::Profile, Overlay::Menu),
        NavOp::CloseMenu => nav.exit_overlay_mode(TabId::Profile),
        NavOp::VisitProfile(n) => {
            let user = UserId::from(format!("user{}", n));
            let tag = nav.user_profile_tag(&user);
            nav.push_dynamic(TabId::Home, tag, move || ViewKind::UserProfile {
                user,
                follow_toggle: FollowToggle::default(),
            });
        }
        NavOp::Reset(tab) => nav.reset_tab_to_anchor(*tab),
        NavOp::SnapshotRestore => {
            let snapshot = nav.snapshot();
            nav.restore(snapshot);
        }
    }
}

fn check_invariants(nav: &NavigationController) -> Result<(), TestCaseError> {
    let visible: Vec<_> = nav.visible_views().collect();
    prop_assert_eq!(visible.len(), 1, "exactly one view is visible");

    let active = nav.active_tab();
    prop_assert_eq!(Some(visible[0].tag()), nav.stack(active).top());
    prop_assert_eq!(nav.active_tag(), Some(visible[0].tag()));

    for tab in TabId::ALL {
        let stack = nav.stack(tab);
        if stack.is_empty() {
            continue;
        }
        prop_assert_eq!(stack.first(), Some(&tab.anchor()));

        let mut seen = HashSet::new();
        let mut families = HashSet::new();
        for tag in stack.iter() {
            prop_assert!(seen.insert(tag.clone()), "{} appears twice on {}", tag, tab);
            if let Some(family) = tag.family() {
                prop_assert!(families.insert(family), "two {:?} views on {}", family, tab);
            }
        }
    }

    // Every cached dynamic view is still reachable from some stack
    for tab in TabId::ALL {
        for tag in nav.stack(tab).iter().filter(|t| t.is_dynamic()) {
            prop_assert!(nav.cached(tag).is_some());
        }
    }
    Ok(())
}

fn driven(ops: &[NavOp]) -> NavigationController {
    let mut nav = NavigationController::new();
    nav.switch_tab(TabId::Home);
    for op in ops {
        apply(&mut nav, op);
    }
    nav
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Invariants hold after every single step
    #[test]
    fn invariants_hold_after_every_op(ops in nav_ops_strategy(40)) {
        let mut nav = NavigationController::new();
        nav.switch_tab(TabId::Home);
        check_invariants(&nav)?;

        for op in &ops {
            apply(&mut nav, op);
            check_invariants(&nav)?;
        }
    }

    /// Resetting a tab always leaves exactly its anchor
    #[test]
    fn reset_leaves_only_anchor(ops in nav_ops_strategy(30), tab in tab_strategy()) {
        let mut nav = driven(&ops);
        nav.reset_tab_to_anchor(tab);

        let stack: Vec<_> = nav.stack(tab).iter().cloned().collect();
        prop_assert_eq!(stack, vec![tab.anchor()]);
        prop_assert_eq!(nav.active_tag(), Some(&tab.anchor()));
        if let Some(overlay) = Overlay::for_tab(tab) {
            prop_assert!(!nav.in_overlay(overlay));
        }
    }

    /// Back at the home root asks for confirmation and changes nothing
    #[test]
    fn back_at_home_root_is_a_no_op(ops in nav_ops_strategy(30)) {
        let mut nav = driven(&ops);
        nav.reset_tab_to_anchor(TabId::Home);

        let before = nav.snapshot();
        let instance = nav.active_view().map(|v| v.instance());
        let cached = nav.cache_len();

        prop_assert_eq!(nav.resolve_back_press(), BackOutcome::ConfirmExit);
        prop_assert_eq!(nav.snapshot(), before);
        prop_assert_eq!(nav.active_view().map(|v| v.instance()), instance);
        prop_assert_eq!(nav.cache_len(), cached);
    }

    /// Pressing back enough times always ends at the home root
    #[test]
    fn back_presses_drain_to_home(ops in nav_ops_strategy(30)) {
        let mut nav = driven(&ops);

        let mut presses = 0;
        while nav.resolve_back_press() != BackOutcome::ConfirmExit {
            presses += 1;
            prop_assert!(presses < 100, "back press never reached home root");
        }
        prop_assert_eq!(nav.active_tab(), TabId::Home);
        prop_assert_eq!(nav.active_tag(), Some(&ViewTag::Home));
        prop_assert!(!nav.in_overlay(Overlay::Search));
    }

    /// Visiting profiles only ever keeps the latest one on home
    #[test]
    fn only_latest_profile_is_kept(visits in prop::collection::vec(0..5u8, 1..10)) {
        let ops: Vec<_> = visits.iter().map(|n| NavOp::VisitProfile(*n)).collect();
        let nav = driven(&ops);

        let dynamic: Vec<_> = nav.stack(TabId::Home).iter().filter(|t| t.is_dynamic()).collect();
        prop_assert_eq!(dynamic.len(), 1);
        let last = format!("user{}", visits[visits.len() - 1]);
        let is_last = matches!(dynamic[0], ViewTag::UserProfile { user_id, .. } if user_id.as_str() == last);
        prop_assert!(is_last);
    }
}
