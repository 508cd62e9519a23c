//! NowPlaying component — cover slot plus title, artist and album lines.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::{
    action::ComponentId,
    component::Component,
    page::{CoverArt, PageState},
    theme::{style_bold, style_default, style_muted, style_secondary, C_PRIMARY, C_SEPARATOR},
    widgets::{pane_chrome::pane_chrome, text::fit},
};

const COVER_WIDTH: u16 = 16;

pub struct NowPlaying;

impl NowPlaying {
    pub fn new() -> Self {
        Self
    }
}

/// Text drawn inside the cover box.
pub fn cover_caption(cover: &CoverArt) -> Vec<String> {
    match cover {
        CoverArt::Placeholder => vec!["♪".to_string()],
        CoverArt::Shown {
            content_type,
            size_bytes,
        } => vec![
            "▣ cover".to_string(),
            content_type.trim_start_matches("image/").to_string(),
            format!("{:.1} KB", *size_bytes as f64 / 1024.0),
        ],
    }
}

impl Component for NowPlaying {
    fn id(&self) -> ComponentId {
        ComponentId::NowPlaying
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, page: &PageState) {
        let block = pane_chrome("now playing", true, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(COVER_WIDTH), Constraint::Min(0)])
            .split(inner);

        let cover_block = Block::default()
            .borders(Borders::ALL)
            .border_style(ratatui::style::Style::default().fg(C_SEPARATOR));
        let cover_lines: Vec<Line> = cover_caption(&page.cover)
            .into_iter()
            .map(|s| Line::from(Span::styled(s, style_muted())).centered())
            .collect();
        frame.render_widget(Paragraph::new(cover_lines).block(cover_block), cols[0]);

        let width = cols[1].width.saturating_sub(2) as usize;
        let np = &page.now_playing;
        let mut lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                format!(" {}", fit(&np.title, width)),
                style_bold(C_PRIMARY).add_modifier(Modifier::ITALIC),
            )),
            Line::from(Span::styled(format!(" {}", fit(&np.artist, width)), style_default())),
        ];
        if !np.album.is_empty() {
            lines.push(Line::from(Span::styled(
                format!(" {}", fit(&np.album, width)),
                style_secondary(),
            )));
        }
        frame.render_widget(Paragraph::new(lines), cols[1]);
    }

    fn min_height(&self) -> u16 {
        7
    }
}
