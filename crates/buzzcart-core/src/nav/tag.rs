//! View tags

use std::fmt;

use serde::{Deserialize, Serialize};

use super::tab::TabId;
use crate::types::UserId;

const USER_PROFILE_PREFIX: &str = "user_profile_";

/// Names a logical screen instance
///
/// Static tags have at most one live instance. `UserProfile` tags are
/// dynamic: one per visited profile, told apart by `seq`. The string form
/// (`home`, `user_profile_<id>_<seq>`, ...) is used in logs and persisted
/// state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ViewTag {
    Home,
    Search,
    Reels,
    Products,
    Cart,
    Profile,
    Menu,
    UserProfile { user_id: UserId, seq: u64 },
    /// Unrecognised tag text
    Other(String),
}

/// Dynamic tag family; at most one member is live per tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagFamily {
    UserProfile,
}

impl ViewTag {
    /// Parse a tag from its string form. Never fails: unknown text becomes
    /// [`ViewTag::Other`].
    pub fn parse(s: &str) -> Self {
        match s {
            "home" => ViewTag::Home,
            "search" => ViewTag::Search,
            "reels" => ViewTag::Reels,
            "products" => ViewTag::Products,
            "cart" => ViewTag::Cart,
            "profile" => ViewTag::Profile,
            "menu" => ViewTag::Menu,
            _ => Self::parse_user_profile(s).unwrap_or_else(|| ViewTag::Other(s.to_string())),
        }
    }

    fn parse_user_profile(s: &str) -> Option<Self> {
        let rest = s.strip_prefix(USER_PROFILE_PREFIX)?;
        let (user_id, seq) = rest.rsplit_once('_')?;
        if user_id.is_empty() {
            return None;
        }
        Some(ViewTag::UserProfile {
            user_id: UserId::from(user_id),
            seq: seq.parse().ok()?,
        })
    }

    pub fn family(&self) -> Option<TagFamily> {
        match self {
            ViewTag::UserProfile { .. } => Some(TagFamily::UserProfile),
            _ => None,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.family().is_some()
    }
}

impl fmt::Display for ViewTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewTag::Home => f.write_str("home"),
            ViewTag::Search => f.write_str("search"),
            ViewTag::Reels => f.write_str("reels"),
            ViewTag::Products => f.write_str("products"),
            ViewTag::Cart => f.write_str("cart"),
            ViewTag::Profile => f.write_str("profile"),
            ViewTag::Menu => f.write_str("menu"),
            ViewTag::UserProfile { user_id, seq } => {
                write!(f, "{}{}_{}", USER_PROFILE_PREFIX, user_id, seq)
            }
            ViewTag::Other(s) => f.write_str(s),
        }
    }
}

impl From<ViewTag> for String {
    fn from(tag: ViewTag) -> Self {
        tag.to_string()
    }
}

impl From<String> for ViewTag {
    fn from(s: String) -> Self {
        ViewTag::parse(&s)
    }
}

/// Transient view shown above a tab's anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Overlay {
    /// Search over home
    Search,
    /// Menu over profile
    Menu,
}

impl Overlay {
    /// The tab this overlay belongs to
    pub fn tab(self) -> TabId {
        match self {
            Overlay::Search => TabId::Home,
            Overlay::Menu => TabId::Profile,
        }
    }

    pub fn tag(self) -> ViewTag {
        match self {
            Overlay::Search => ViewTag::Search,
            Overlay::Menu => ViewTag::Menu,
        }
    }

    /// The overlay a tab can host, if any
    pub fn for_tab(tab: TabId) -> Option<Self> {
        match tab {
            TabId::Home => Some(Overlay::Search),
            TabId::Profile => Some(Overlay::Menu),
            _ => None,
        }
    }
}

impl fmt::Display for Overlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.tag(), f)
    }
}
