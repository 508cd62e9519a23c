//! Component trait — the interface every UI panel implements.
//!
//! Components read the latest `PageState` snapshot and never mutate it.
//! Anything they want changed goes out as `Vec<Action>`.

use ratatui::crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};

use crate::action::{Action, ComponentId};
use crate::page::PageState;

pub trait Component {
    fn id(&self) -> ComponentId;

    /// Handle a key the App did not consume globally.
    fn handle_key(&mut self, _key: KeyEvent, _page: &PageState) -> Vec<Action> {
        Vec::new()
    }

    /// Called each UI tick (~100ms) for animations.
    fn tick(&mut self, _page: &PageState) {}

    /// React to an action dispatched by the App.
    fn on_action(&mut self, _action: &Action, _page: &PageState) {}

    fn draw(&mut self, frame: &mut Frame, area: Rect, page: &PageState);

    /// The minimum height required to render meaningfully.
    fn min_height(&self) -> u16 {
        3
    }
}
