//! BuzzCart Core Library
//!
//! Tab navigation, social graph and account search for a social-commerce
//! client, written against a path-addressed remote document store.
//!
//! ## Overview
//!
//! The app shows five tabs (Home, Reels, Products, Cart, Profile). Each tab
//! keeps its own back stack of view tags. Home can switch into search mode
//! and Profile into menu mode, and other users' profiles are pushed as
//! dynamic views. Exactly one view is visible at a time.
//!
//! ## Core Principles
//!
//! - **Navigation is pure state**: [`NavigationController`] never touches the store
//! - **Partial failure is visible**: follow/unfollow report each of their four writes
//! - **Backends are swappable**: [`RemoteStore`] and [`AuthSession`] are traits
//!
//! ## Quick Start
//!
//! ```ignore
//! use buzzcart_core::{BuzzCartApp, BuzzConfig, SignupForm, TabId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut app = BuzzCartApp::open(&BuzzConfig::new("~/.buzzcart/data"))?;
//!
//!     app.sign_up(&SignupForm {
//!         full_name: "Alice Smith".into(),
//!         email: "alice@example.com".into(),
//!         password: "secret1".into(),
//!         confirm_password: "secret1".into(),
//!     })
//!     .await?;
//!
//!     app.open_search();
//!     if let Some(outcome) = app.search("bo").await? {
//!         println!("{}", outcome.title());
//!     }
//!
//!     app.select_tab(TabId::Profile);
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod nav;
pub mod session;
pub mod social;
pub mod store;
pub mod types;

// Re-exports
pub use app::{AppSnapshot, BuzzCartApp, LiveUpdate};
pub use auth::{AuthSession, Identity, LocalAuth, MIN_PASSWORD_LEN};
pub use config::BuzzConfig;
pub use error::{BuzzError, BuzzResult};
pub use nav::{
    BackOutcome, NavSnapshot, NavigationController, Overlay, TabId, TabStack, View, ViewKind,
    ViewTag,
};
pub use session::SessionCache;
pub use social::{
    FollowAction, FollowAttempt, FollowReport, FollowStep, FollowToggle, ProfileWatch, SearchFilter,
    SearchOutcome, SearchSession, SearchState, SessionProfile, SignupForm,
};
pub use store::{MemoryStore, RedbStore, RemoteStore, StorePath, TransactionOutcome};
pub use types::{format_count, pluralize_results, UserId, UserRecord};
