//! Action enum — user intents produced by key handling.

use calico_proto::protocol::{Command, Vote};

/// Identifier for a UI panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    Header,
    NowPlaying,
    RatingPanel,
    RecentTracks,
    HelpOverlay,
}

/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Vote(Vote),
    TogglePause,
    RefreshMetadata,
    ToggleHelp,
    Quit,
}

impl Action {
    /// The player-core command this action turns into, if any.
    pub fn command(self) -> Option<Command> {
        match self {
            Action::Vote(vote) => Some(Command::Rate { vote }),
            Action::TogglePause => Some(Command::TogglePause),
            Action::RefreshMetadata => Some(Command::RefreshMetadata),
            Action::ToggleHelp | Action::Quit => None,
        }
    }
}
