//! RatingPanel component — vote counts, the viewer's vote and the message line.
//!
//! Hidden (drawn as a hint) while nothing is on air.  While a vote is in
//! flight the buttons are drawn disabled with a spinner.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use calico_proto::protocol::Vote;

use crate::{
    action::{Action, ComponentId},
    component::Component,
    page::{PageState, MSG_THANKS},
    theme::{
        style_bold, style_muted, style_secondary, C_MUTED, C_PLAYING, C_PRIMARY, C_VOTE_DOWN,
        C_VOTE_UP,
    },
    widgets::pane_chrome::{pane_chrome, Badge},
};

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub struct RatingPanel {
    spinner_frame: usize,
}

impl RatingPanel {
    pub fn new() -> Self {
        Self { spinner_frame: 0 }
    }
}

/// Key bindings of the vote buttons.
pub fn vote_for_key(code: KeyCode) -> Option<Vote> {
    match code {
        KeyCode::Char('u') | KeyCode::Char('+') => Some(Vote::Up),
        KeyCode::Char('d') | KeyCode::Char('-') => Some(Vote::Down),
        _ => None,
    }
}

fn button<'a>(
    label: &'a str,
    count: &str,
    active: bool,
    enabled: bool,
    color: ratatui::style::Color,
) -> Vec<Span<'a>> {
    let style = if !enabled {
        Style::default().fg(C_MUTED)
    } else if active {
        Style::default()
            .fg(color)
            .add_modifier(Modifier::BOLD | Modifier::REVERSED)
    } else {
        Style::default().fg(color)
    };
    vec![
        Span::styled(format!(" {} ", label), style),
        Span::styled(format!(" {}", count), style_bold(C_PRIMARY)),
        Span::raw("    "),
    ]
}

impl Component for RatingPanel {
    fn id(&self) -> ComponentId {
        ComponentId::RatingPanel
    }

    fn handle_key(&mut self, key: KeyEvent, page: &PageState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release || !page.rating_visible {
            return Vec::new();
        }
        vote_for_key(key.code)
            .map(|vote| vec![Action::Vote(vote)])
            .unwrap_or_default()
    }

    fn tick(&mut self, page: &PageState) {
        if !page.buttons_enabled {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER.len();
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, page: &PageState) {
        let badge = (!page.buttons_enabled).then(|| Badge {
            text: SPINNER[self.spinner_frame],
            color: C_PRIMARY,
        });
        let block = pane_chrome("rate this track", page.rating_visible, badge);

        if !page.rating_visible {
            let hint = Line::from(Span::styled(" waiting for track info", style_muted()));
            frame.render_widget(Paragraph::new(vec![Line::from(""), hint]).block(block), area);
            return;
        }

        let active = page.active_vote();
        let enabled = page.buttons_enabled;
        let mut spans = vec![Span::raw(" ")];
        spans.extend(button(
            "▲ u",
            &page.rating.thumbs_up,
            active == Some(Vote::Up),
            enabled,
            C_VOTE_UP,
        ));
        spans.extend(button(
            "▼ d",
            &page.rating.thumbs_down,
            active == Some(Vote::Down),
            enabled,
            C_VOTE_DOWN,
        ));

        let message_style = if page.rating_message == MSG_THANKS {
            Style::default().fg(C_PLAYING)
        } else {
            style_secondary()
        };
        let lines = vec![
            Line::from(""),
            Line::from(spans),
            Line::from(""),
            Line::from(Span::styled(format!(" {}", page.rating_message), message_style)),
        ];
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn min_height(&self) -> u16 {
        6
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    #[test]
    fn vote_keys_only_act_while_visible() {
        let mut panel = RatingPanel::new();
        let mut page = PageState::new();
        assert!(panel.handle_key(key('u'), &page).is_empty());

        page.rating_visible = true;
        assert_eq!(panel.handle_key(key('u'), &page), vec![Action::Vote(Vote::Up)]);
        assert_eq!(panel.handle_key(key('-'), &page), vec![Action::Vote(Vote::Down)]);
        assert!(panel.handle_key(key('x'), &page).is_empty());
    }

    #[test]
    fn spinner_only_runs_while_vote_in_flight() {
        let mut panel = RatingPanel::new();
        let mut page = PageState::new();
        panel.tick(&page);
        assert_eq!(panel.spinner_frame, 0);
        page.buttons_enabled = false;
        panel.tick(&page);
        panel.tick(&page);
        assert_eq!(panel.spinner_frame, 2);
    }
}
