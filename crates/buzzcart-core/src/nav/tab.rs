//! Top-level tabs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::tag::ViewTag;
use crate::error::BuzzError;

/// A bottom-navigation destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabId {
    #[default]
    Home,
    Reels,
    Products,
    Cart,
    Profile,
}

impl TabId {
    /// Every tab, in bottom-bar order
    pub const ALL: [TabId; 5] = [
        TabId::Home,
        TabId::Reels,
        TabId::Products,
        TabId::Cart,
        TabId::Profile,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Root view of the tab, always first on its stack
    pub fn anchor(self) -> ViewTag {
        match self {
            TabId::Home => ViewTag::Home,
            TabId::Reels => ViewTag::Reels,
            TabId::Products => ViewTag::Products,
            TabId::Cart => ViewTag::Cart,
            TabId::Profile => ViewTag::Profile,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TabId::Home => "home",
            TabId::Reels => "reels",
            TabId::Products => "products",
            TabId::Cart => "cart",
            TabId::Profile => "profile",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TabId {
    type Err = BuzzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        TabId::ALL
            .into_iter()
            .find(|tab| tab.name() == wanted)
            .ok_or_else(|| BuzzError::UnknownTab(s.to_string()))
    }
}
