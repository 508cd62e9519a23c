//! Header component — 2-row top bar.
//!
//! Row 1: app name, playback status, attach mode badge.
//! Row 2: stream quality and source description.
//!
//! Not focusable.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::{
    action::ComponentId,
    component::Component,
    page::{self, AttachMode, PageState},
    theme::{
        style_bold, style_muted, style_secondary, C_ACCENT, C_CONNECTING, C_ERROR, C_MUTED,
        C_PLAYING, C_TAG,
    },
    widgets::text::fit,
};

pub struct Header;

impl Header {
    pub fn new() -> Self {
        Self
    }
}

/// Colour for a status line.  Keyed on the exact texts the page sets.
pub fn status_color(status: &str) -> Color {
    match status {
        page::STATUS_PLAYING | page::STATUS_MANIFEST_LOADED | page::STATUS_READY => C_PLAYING,
        page::STATUS_LOADING | page::STATUS_NATIVE => C_CONNECTING,
        page::STATUS_PAUSED | page::STATUS_ENDED | "" => C_MUTED,
        page::STATUS_PLAYBACK_ERROR | page::STATUS_UNSUPPORTED => C_ERROR,
        s if s.starts_with("Error") => C_ERROR,
        _ => C_TAG,
    }
}

fn mode_label(attach: AttachMode) -> &'static str {
    match attach {
        AttachMode::Pending => "",
        AttachMode::Adaptive => "HLS",
        AttachMode::Native => "NATIVE",
        AttachMode::Unsupported => "NO HLS",
    }
}

impl Component for Header {
    fn id(&self) -> ComponentId {
        ComponentId::Header
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, page: &PageState) {
        if area.height == 0 {
            return;
        }
        let width = area.width as usize;
        let mode = mode_label(page.attach);

        let status = if page.status.is_empty() {
            "…".to_string()
        } else {
            page.status.clone()
        };
        let status_room = width.saturating_sub(12 + mode.len());
        let row1 = Line::from(vec![
            Span::styled(" ♫ calico ", style_bold(C_ACCENT)),
            Span::styled("│ ", style_muted()),
            Span::styled(
                fit(&status, status_room),
                Style::default().fg(status_color(&page.status)),
            ),
            Span::raw(" "),
            Span::styled(mode, style_bold(C_TAG)),
        ]);

        let row2 = Line::from(vec![
            Span::styled(" Stream quality: ", style_muted()),
            Span::styled(page.quality.stream.clone(), style_secondary()),
            Span::styled("   Source quality: ", style_muted()),
            Span::styled(page.quality.source.clone(), style_secondary()),
        ]);

        frame.render_widget(Paragraph::new(vec![row1, row2]), area);
    }

    fn min_height(&self) -> u16 {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_statuses_are_red() {
        assert_eq!(status_color("Error loading stream: fragLoadError"), C_ERROR);
        assert_eq!(status_color(page::STATUS_PLAYBACK_ERROR), C_ERROR);
        assert_eq!(status_color(page::STATUS_PLAYING), C_PLAYING);
    }
}
