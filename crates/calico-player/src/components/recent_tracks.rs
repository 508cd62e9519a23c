//! RecentTracks component — previously played items in slot order (1 to 5).

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::{
    action::ComponentId,
    component::Component,
    page::PageState,
    theme::{style_default, style_muted, style_secondary, C_SECONDARY},
    widgets::{
        pane_chrome::{pane_chrome, Badge},
        text::fit,
    },
};
use unicode_width::UnicodeWidthStr;

pub struct RecentTracks;

/// Artist and title fitted into one row of `width` columns: the artist gets
/// up to half, the title what is left after the padding and separator.
fn fit_row(artist: &str, title: &str, width: usize) -> (String, String) {
    let artist = fit(artist, width / 2);
    let title_room = width.saturating_sub(UnicodeWidthStr::width(artist.as_str()) + 4);
    let title = fit(title, title_room);
    (artist, title)
}

impl RecentTracks {
    pub fn new() -> Self {
        Self
    }
}

impl Component for RecentTracks {
    fn id(&self) -> ComponentId {
        ComponentId::RecentTracks
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, page: &PageState) {
        let polled = page
            .last_poll
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_default();
        let badge = (!polled.is_empty()).then(|| Badge {
            text: polled.as_str(),
            color: C_SECONDARY,
        });
        let block = pane_chrome("recently played", false, badge);
        let width = block.inner(area).width as usize;

        let lines: Vec<Line> = match page.recent_placeholder() {
            Some(placeholder) => vec![Line::from(Span::styled(
                format!(" {}", placeholder),
                style_muted(),
            ))],
            None => page
                .recent
                .iter()
                .map(|t| {
                    let (artist, title) = fit_row(&t.artist, &t.title, width);
                    Line::from(vec![
                        Span::styled(format!(" {}", artist), style_default()),
                        Span::styled(" – ", style_muted()),
                        Span::styled(title, style_secondary()),
                    ])
                })
                .collect(),
        };
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn min_height(&self) -> u16 {
        7
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_artist_leaves_room_by_columns() {
        // Four CJK characters take eight columns.
        let (artist, title) = fit_row("坂本龍一", "Merry Christmas Mr. Lawrence", 24);
        assert_eq!(artist, "坂本龍一");
        assert_eq!(UnicodeWidthStr::width(title.as_str()), 12);
        assert!(title.ends_with('…'));

        let (artist, title) = fit_row("Air", "Alone in Kyoto", 40);
        assert_eq!((artist.as_str(), title.as_str()), ("Air", "Alone in Kyoto"));
    }
}
