//! Text rendering of the visible screen

use std::fmt::Write;

use buzzcart_core::nav::ViewKind;
use buzzcart_core::store::RemoteStore;
use buzzcart_core::{
    format_count, AuthSession, BuzzCartApp, SearchFilter, SearchOutcome, TabId, UserRecord,
};

/// What the shell remembers about screens the core does not hold data for
#[derive(Debug, Default)]
pub struct ScreenData {
    /// Latest result set shown on the search screen
    pub search: Option<SearchOutcome>,
    /// Record behind the visible user profile
    pub profile: Option<UserRecord>,
}

pub const SIGNED_OUT: &str = "\
BuzzCart
  login <email> <password>
  signup <email> <password> <confirm> <full name>";

pub const HELP: &str = "\
Commands:
  tab <home|reels|products|cart|profile>   switch tab (again to reset home/profile)
  back                                     system back
  search                                   open search on home
  q <text>                                 search query
  filter <accounts|sellers|reels|products> search filter
  open <n>                                 open the n-th search result
  follow                                   follow/unfollow the visible profile
  menu / close                             profile menu / leave search or menu
  show                                     redraw the screen
  logout, help, quit";

fn tab_bar(active: TabId) -> String {
    TabId::ALL
        .iter()
        .map(|tab| {
            if *tab == active {
                format!("[{}]", tab.name())
            } else {
                format!(" {} ", tab.name())
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn filter_chips(active: SearchFilter) -> String {
    SearchFilter::ALL
        .iter()
        .map(|f| {
            if *f == active {
                format!("({})", f.label())
            } else {
                f.label().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
}

/// Render the visible view, or the sign-in prompt when nobody is signed in
pub fn render<A: AuthSession, S: RemoteStore>(app: &BuzzCartApp<A, S>, data: &ScreenData) -> String {
    if app.identity().is_none() {
        return SIGNED_OUT.to_string();
    }
    let Some(view) = app.nav().active_view() else {
        return SIGNED_OUT.to_string();
    };

    let mut out = String::new();
    let session = app.session();
    let _ = writeln!(out, "{}", tab_bar(app.nav().active_tab()));
    let _ = writeln!(out, "{}", "-".repeat(48));

    match view.kind() {
        ViewKind::Home => {
            let _ = writeln!(out, "Home");
            let _ = writeln!(out, "  Welcome back, {}", session.full_name());
            let _ = write!(out, "  Type `search` to find people.");
        }
        ViewKind::Search { filter, query } => {
            let _ = writeln!(out, "Search  {}", filter_chips(*filter));
            let _ = writeln!(out, "  Query: {}", query);
            match data.search.as_ref() {
                Some(outcome) => {
                    let _ = writeln!(out, "  {}", outcome.title());
                    for line in outcome.message().lines() {
                        let _ = writeln!(out, "  {}", line);
                    }
                    for (i, user) in outcome.results.iter().enumerate() {
                        let _ = writeln!(out, "  {}. {} <{}>", i + 1, user.full_name, user.email);
                    }
                }
                None => {
                    let _ = writeln!(out, "  Type `q <text>` to search.");
                }
            }
        }
        ViewKind::Reels => {
            let _ = write!(out, "Reels\n  Nothing to watch yet.");
        }
        ViewKind::Products => {
            let _ = write!(out, "Products\n  No products yet.");
        }
        ViewKind::Cart => {
            let _ = write!(out, "Cart\n  Your cart is empty.");
        }
        ViewKind::Profile => {
            let (followers, following) = session.formatted_counts();
            let _ = writeln!(out, "{}", session.full_name());
            let _ = writeln!(out, "  {} Followers   {} Following", followers, following);
            let _ = write!(out, "  Type `menu` for settings.");
        }
        ViewKind::Menu => {
            let _ = writeln!(out, "Menu");
            let _ = writeln!(out, "  Settings\n  Orders\n  Help");
            let _ = write!(out, "  Type `logout` to sign out or `close` to go back.");
        }
        ViewKind::UserProfile { user, follow_toggle } => {
            match data.profile.as_ref().filter(|r| &r.user_id == user) {
                Some(record) => {
                    let _ = writeln!(out, "{}", record.full_name);
                    let _ = writeln!(out, "  {}", record.email);
                    let _ = writeln!(
                        out,
                        "  {} Followers   {} Following   {} Posts",
                        format_count(record.followers_count),
                        format_count(record.following_count),
                        format_count(record.posts_count)
                    );
                }
                None => {
                    let _ = writeln!(out, "{}", user);
                }
            }
            let _ = write!(out, "  [{}]", follow_toggle.label());
        }
    }
    out.trim_end().to_string()
}
