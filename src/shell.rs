//! Line-oriented front end
//!
//! Reads commands from stdin, drives [`BuzzCartApp`] and prints the visible
//! screen after every command. Store changes behind the open screens (search
//! results, own counters, the visited profile) redraw it without waiting for
//! input.
//!
//! ```text
//! stdin ──► parse ──► Shell::execute ──► BuzzCartApp ──► screens::render ──► stdout
//!                                            ▲
//!                 live subscriptions ────────┘ (tokio::select! with stdin)
//! ```

use std::path::PathBuf;

use anyhow::Result;
use buzzcart_core::store::RemoteStore;
use buzzcart_core::{
    AppSnapshot, AuthSession, BackOutcome, BuzzCartApp, BuzzError, FollowAttempt, LiveUpdate,
    SearchFilter, SignupForm, TabId, UserId, UserRecord, ViewTag,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::screens::{self, ScreenData, HELP};

/// One parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Show,
    Login { email: String, password: String },
    Signup(Vec<String>),
    Logout,
    Tab(TabId),
    Back,
    Search,
    Query(String),
    Filter(SearchFilter),
    Open(usize),
    Follow,
    Menu,
    Close,
    Quit,
}

/// Parse one line. `Ok(None)` for a blank line.
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    let Some((word, rest)) = line
        .split_once(char::is_whitespace)
        .map(|(w, r)| (w, r.trim()))
        .or(Some((line, "")))
        .filter(|(w, _)| !w.is_empty())
    else {
        return Ok(None);
    };

    let args: Vec<&str> = rest.split_whitespace().collect();
    let command = match word.to_lowercase().as_str() {
        "help" | "?" => Command::Help,
        "show" | "ls" => Command::Show,
        "login" => match args.as_slice() {
            [email, password] => Command::Login {
                email: email.to_string(),
                password: password.to_string(),
            },
            _ => return Err("usage: login <email> <password>".into()),
        },
        "signup" => {
            if args.len() < 4 {
                return Err("usage: signup <email> <password> <confirm> <full name>".into());
            }
            Command::Signup(args.iter().map(|s| s.to_string()).collect())
        }
        "logout" => Command::Logout,
        "tab" => {
            let name = args.first().ok_or("usage: tab <name>")?;
            Command::Tab(name.parse().map_err(|e: BuzzError| e.to_string())?)
        }
        "back" | "b" => Command::Back,
        "search" => Command::Search,
        "q" | "query" => Command::Query(rest.to_string()),
        "filter" => {
            let name = args.first().ok_or("usage: filter <name>")?;
            Command::Filter(name.parse().map_err(|e: BuzzError| e.to_string())?)
        }
        "open" => {
            let n = args
                .first()
                .and_then(|n| n.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .ok_or("usage: open <n>")?;
            Command::Open(n)
        }
        "follow" | "unfollow" => Command::Follow,
        "menu" => Command::Menu,
        "close" => Command::Close,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command: {} (try `help`)", other)),
    };
    Ok(Some(command))
}

/// What the loop does after a command
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    Print(String),
    /// Back at the home root; the next line answers the exit question
    AskExit,
    Exit,
}

pub struct Shell<A: AuthSession, S: RemoteStore> {
    app: BuzzCartApp<A, S>,
    snapshot_path: PathBuf,
    data: ScreenData,
    asking_exit: bool,
    /// Screen as last printed
    shown: String,
}

impl<A: AuthSession, S: RemoteStore> Shell<A, S> {
    pub fn new(app: BuzzCartApp<A, S>, snapshot_path: PathBuf) -> Self {
        Self {
            app,
            snapshot_path,
            data: ScreenData::default(),
            asking_exit: false,
            shown: String::new(),
        }
    }

    pub fn app(&self) -> &BuzzCartApp<A, S> {
        &self.app
    }

    pub fn screen(&self) -> String {
        screens::render(&self.app, &self.data)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Session state
    // ═══════════════════════════════════════════════════════════════════════

    /// Resume a saved login, restoring the saved screens if there are any
    pub async fn resume(&mut self) -> Result<()> {
        if self.app.identity().is_none() {
            return Ok(());
        }
        self.app.start().await?;

        match std::fs::read_to_string(&self.snapshot_path) {
            Ok(json) => match serde_json::from_str::<AppSnapshot>(&json) {
                Ok(snapshot) => {
                    debug!(path = ?self.snapshot_path, "Restoring saved screens");
                    self.app.restore(snapshot);
                    self.app.refresh_profile().await?;
                    if self.app.nav().active_tag() == Some(&ViewTag::Search) {
                        self.data.search = self.app.next_search_update().await?;
                    }
                }
                Err(e) => warn!(error = %e, "Ignoring unreadable snapshot"),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, "Failed to read snapshot"),
        }
        self.shown = self.screen();
        Ok(())
    }

    /// Save the screens for the next start, or remove the file when signed out
    pub fn save(&self) -> Result<()> {
        if self.app.identity().is_none() {
            if self.snapshot_path.exists() {
                std::fs::remove_file(&self.snapshot_path)?;
            }
            return Ok(());
        }
        let json = serde_json::to_string_pretty(&self.app.snapshot())?;
        std::fs::write(&self.snapshot_path, json)?;
        debug!(path = ?self.snapshot_path, "Saved screens");
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Commands
    // ═══════════════════════════════════════════════════════════════════════

    /// Handle one input line
    pub async fn handle_line(&mut self, line: &str) -> Step {
        if self.asking_exit {
            self.asking_exit = false;
            return match line.trim().to_lowercase().as_str() {
                "y" | "yes" => Step::Exit,
                _ => Step::Print(self.screen()),
            };
        }

        let step = match parse(line) {
            Ok(None) => Step::Print(String::new()),
            Ok(Some(command)) => match self.execute(command).await {
                Ok(step) => step,
                Err(e) => Step::Print(format!("{}\n{}", self.screen(), e)),
            },
            Err(usage) => Step::Print(usage),
        };
        self.shown = self.screen();
        step
    }

    /// Fold a store change into the screen data. Returns the screen to
    /// print when it differs from the one last shown.
    pub fn apply_live(&mut self, update: LiveUpdate) -> Option<String> {
        match update {
            LiveUpdate::Search(outcome) => self.data.search = Some(outcome),
            LiveUpdate::VisitedProfile(record) => self.data.profile = Some(record),
            // Already in the session cache
            LiveUpdate::OwnProfile(_) => {}
        }
        if self.asking_exit {
            return None;
        }
        let screen = self.screen();
        if screen == self.shown {
            return None;
        }
        self.shown.clone_from(&screen);
        Some(screen)
    }

    pub async fn execute(&mut self, command: Command) -> Result<Step> {
        let signed_in = self.app.identity().is_some();
        let needs_session = !matches!(
            command,
            Command::Help | Command::Show | Command::Login { .. } | Command::Signup(_) | Command::Quit
        );
        if needs_session && !signed_in {
            return Ok(Step::Print(screens::SIGNED_OUT.to_string()));
        }

        let mut note = None;
        match command {
            Command::Help => return Ok(Step::Print(HELP.to_string())),
            Command::Show => {}
            Command::Quit => return Ok(Step::Exit),

            Command::Login { email, password } => {
                if signed_in {
                    self.app.sign_out()?;
                }
                self.data = ScreenData::default();
                self.app.sign_in(&email, &password).await?;
            }
            Command::Signup(args) => {
                let form = SignupForm {
                    email: args[0].clone(),
                    password: args[1].clone(),
                    confirm_password: args[2].clone(),
                    full_name: args[3..].join(" "),
                };
                if signed_in {
                    self.app.sign_out()?;
                }
                self.data = ScreenData::default();
                self.app.sign_up(&form).await?;
                note = Some("Registration successful".to_string());
            }
            Command::Logout => {
                self.app.sign_out()?;
                self.data = ScreenData::default();
            }

            Command::Tab(tab) => self.app.select_tab(tab),
            Command::Back => match self.app.back() {
                BackOutcome::ConfirmExit => {
                    self.asking_exit = true;
                    return Ok(Step::AskExit);
                }
                outcome => debug!(?outcome, "Back press"),
            },
            Command::Menu => self.app.open_menu(),
            Command::Close => {
                if self.app.nav().active_tab() == TabId::Profile {
                    self.app.close_menu();
                } else {
                    self.app.close_search();
                }
            }

            Command::Search => {
                self.app.open_search();
                self.data.search = None;
            }
            Command::Query(text) => {
                self.data.search = self.app.search(&text).await?;
            }
            Command::Filter(filter) => {
                self.data.search = self.app.set_search_filter(filter).await?;
            }
            Command::Open(n) => {
                let user_id = self
                    .data
                    .search
                    .as_ref()
                    .and_then(|o| o.results.get(n - 1))
                    .map(|r| r.user_id.clone())
                    .ok_or_else(|| anyhow::anyhow!("No result {}", n))?;
                let record = self.app.open_user_profile(&user_id).await?;
                self.data.profile = Some(record);
            }
            Command::Follow => {
                note = self.follow().await?;
            }
        }

        let screen = self.screen();
        Ok(Step::Print(match note {
            Some(note) => format!("{}\n{}", screen, note),
            None => screen,
        }))
    }

    async fn follow(&mut self) -> Result<Option<String>> {
        let note = match self.app.toggle_follow().await? {
            FollowAttempt::Completed(report) => {
                let mut lines: Vec<String> = report.warnings.clone();
                if let Some(message) = report.message() {
                    lines.push(message.to_string());
                }
                (!lines.is_empty()).then(|| lines.join("\n"))
            }
            FollowAttempt::AlreadyInProgress => Some("Please wait...".to_string()),
            FollowAttempt::OwnProfile => Some("This is your own profile".to_string()),
        };

        let user = self.app.visible_profile().map(|(user, _)| user.clone());
        if let Some(user) = user {
            self.data.profile = Some(self.reload(&user).await?);
        }
        Ok(note)
    }

    async fn reload(&self, user: &UserId) -> Result<UserRecord> {
        Ok(self.app.user_record(user).await?)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Loop
    // ═══════════════════════════════════════════════════════════════════════

    /// Run until `quit`, a confirmed exit or end of input
    pub async fn run(&mut self) -> Result<()> {
        self.resume().await?;
        println!("{}", self.screen());
        println!("Type `help` for commands.");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let live = self.app.has_live_updates();
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    match self.handle_line(&line).await {
                        Step::Print(text) if text.is_empty() => {}
                        Step::Print(text) => println!("{}", text),
                        Step::AskExit => println!("Exit BuzzCart? (y/n)"),
                        Step::Exit => break,
                    }
                }
                update = self.app.next_live_update(), if live => {
                    if let Some(screen) = update.and_then(|u| self.apply_live(u)) {
                        println!("{}", screen);
                    }
                }
            }
        }

        self.save()?;
        info!("Shell closed");
        Ok(())
    }
}
