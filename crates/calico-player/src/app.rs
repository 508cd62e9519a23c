//! App — terminal front-end over the player core.
//!
//! Architecture:
//! - `PlayerCore` owns the page state and publishes snapshots on a `watch`.
//! - A blocking task reads terminal events into an mpsc channel.
//! - The event loop redraws whenever a snapshot, a key or a UI tick arrives.
//! - Components return `Vec<Action>`; the App turns actions into core
//!   commands or local UI changes.

use std::io;
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Paragraph},
    Terminal,
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::{
    action::Action,
    component::Component,
    components::{
        header::Header, help_overlay::HelpOverlay, now_playing::NowPlaying,
        rating_panel::RatingPanel, recent_tracks::RecentTracks,
    },
    core::PlayerEvent,
    page::PageState,
    theme::{style_muted, C_BG, C_SECONDARY},
};

enum AppMessage {
    Event(Event),
}

pub struct App {
    cmd_tx: mpsc::Sender<PlayerEvent>,
    state_rx: watch::Receiver<PageState>,
    page: PageState,
    header: Header,
    now_playing: NowPlaying,
    rating_panel: RatingPanel,
    recent_tracks: RecentTracks,
    help_overlay: HelpOverlay,
    should_quit: bool,
}

/// Keys handled before any component sees them.
pub fn global_key(key: &KeyEvent, help_visible: bool) -> Option<Action> {
    match key.code {
        KeyCode::Char('c') if key.modifiers == KeyModifiers::CONTROL => Some(Action::Quit),
        KeyCode::Char('q') if !help_visible => Some(Action::Quit),
        KeyCode::Char('?') if !help_visible => Some(Action::ToggleHelp),
        KeyCode::Char(' ') if !help_visible => Some(Action::TogglePause),
        KeyCode::Char('r') if !help_visible => Some(Action::RefreshMetadata),
        _ => None,
    }
}

impl App {
    pub fn new(cmd_tx: mpsc::Sender<PlayerEvent>, state_rx: watch::Receiver<PageState>) -> Self {
        let page = state_rx.borrow().clone();
        Self {
            cmd_tx,
            state_rx,
            page,
            header: Header::new(),
            now_playing: NowPlaying::new(),
            rating_panel: RatingPanel::new(),
            recent_tracks: RecentTracks::new(),
            help_overlay: HelpOverlay::new(),
            should_quit: false,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let (tx, mut rx) = mpsc::channel::<AppMessage>(256);

        // ── Background task: keyboard events ──────────────────────────────────
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // Spinner animation: 100ms
        let mut ui_tick = tokio::time::interval(Duration::from_millis(100));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            tokio::select! {
                Some(AppMessage::Event(ev)) = rx.recv() => {
                    if let Event::Key(key) = ev {
                        if key.kind != KeyEventKind::Release {
                            for action in self.handle_key(key) {
                                self.dispatch(action).await;
                            }
                        }
                    }
                    needs_redraw = true;
                }

                changed = self.state_rx.changed() => {
                    if changed.is_err() {
                        warn!("player core gone, leaving UI");
                        self.should_quit = true;
                    } else {
                        self.page = self.state_rx.borrow_and_update().clone();
                        needs_redraw = true;
                    }
                }

                _ = ui_tick.tick() => {
                    if !self.page.buttons_enabled {
                        self.rating_panel.tick(&self.page);
                        needs_redraw = true;
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        if let Some(action) = global_key(&key, self.help_overlay.visible) {
            return vec![action];
        }
        let (id, actions) = if self.help_overlay.visible {
            (self.help_overlay.id(), self.help_overlay.handle_key(key, &self.page))
        } else {
            (self.rating_panel.id(), self.rating_panel.handle_key(key, &self.page))
        };
        if !actions.is_empty() {
            debug!("{:?}: {:?} → {:?}", id, key.code, actions);
        }
        actions
    }

    async fn dispatch(&mut self, action: Action) {
        debug!("dispatch {:?}", action);
        match action {
            Action::Quit => {
                info!("quit requested");
                self.should_quit = true;
                let _ = self.cmd_tx.send(PlayerEvent::Shutdown).await;
            }
            Action::ToggleHelp => self.help_overlay.on_action(&action, &self.page),
            other => {
                if let Some(cmd) = other.command() {
                    if self.cmd_tx.send(PlayerEvent::ClientCommand(cmd)).await.is_err() {
                        warn!("player core gone, dropping {:?}", other);
                    }
                }
            }
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        let area = frame.area();
        frame.render_widget(Block::default().style(Style::default().bg(C_BG)), area);

        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(self.header.min_height()),
                Constraint::Length(self.now_playing.min_height()),
                Constraint::Min(self.recent_tracks.min_height()),
                Constraint::Length(1),
            ])
            .split(area);

        self.header.draw(frame, outer[0], &self.page);

        let middle = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(outer[1]);
        self.now_playing.draw(frame, middle[0], &self.page);
        self.rating_panel.draw(frame, middle[1], &self.page);

        self.recent_tracks.draw(frame, outer[2], &self.page);

        let keys = Line::from(vec![
            Span::styled(" u/d", Style::default().fg(C_SECONDARY)),
            Span::styled(" rate  ", style_muted()),
            Span::styled("space", Style::default().fg(C_SECONDARY)),
            Span::styled(" pause  ", style_muted()),
            Span::styled("r", Style::default().fg(C_SECONDARY)),
            Span::styled(" refresh  ", style_muted()),
            Span::styled("?", Style::default().fg(C_SECONDARY)),
            Span::styled(" help  ", style_muted()),
            Span::styled("q", Style::default().fg(C_SECONDARY)),
            Span::styled(" quit", style_muted()),
        ]);
        frame.render_widget(Paragraph::new(keys), outer[3]);

        self.help_overlay.draw(frame, area, &self.page);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn global_keys() {
        let none = KeyModifiers::NONE;
        assert_eq!(global_key(&key(KeyCode::Char('q'), none), false), Some(Action::Quit));
        assert_eq!(
            global_key(&key(KeyCode::Char('c'), KeyModifiers::CONTROL), true),
            Some(Action::Quit)
        );
        assert_eq!(global_key(&key(KeyCode::Char(' '), none), false), Some(Action::TogglePause));
        assert_eq!(
            global_key(&key(KeyCode::Char('r'), none), false),
            Some(Action::RefreshMetadata)
        );
        // The overlay owns `q` and `?` while it is open.
        assert_eq!(global_key(&key(KeyCode::Char('q'), none), true), None);
        assert_eq!(global_key(&key(KeyCode::Char('u'), none), false), None);
    }

    #[tokio::test]
    async fn vote_action_becomes_rate_command() {
        let (cmd_tx, mut cmd_rx) = mpsc::channel(8);
        let (_state_tx, state_rx) = watch::channel(PageState::new());
        let mut app = App::new(cmd_tx, state_rx);

        app.dispatch(Action::Vote(calico_proto::protocol::Vote::Up)).await;
        app.dispatch(Action::ToggleHelp).await;
        app.dispatch(Action::Quit).await;

        match cmd_rx.recv().await {
            Some(PlayerEvent::ClientCommand(calico_proto::protocol::Command::Rate { vote })) => {
                assert_eq!(vote, calico_proto::protocol::Vote::Up)
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(cmd_rx.recv().await, Some(PlayerEvent::Shutdown)));
        assert!(app.help_overlay.visible);
        assert!(app.should_quit);
    }
}
