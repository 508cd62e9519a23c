pub mod header;
pub mod help_overlay;
pub mod now_playing;
pub mod rating_panel;
pub mod recent_tracks;
