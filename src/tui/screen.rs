//! Screen trait and transition type for the client state machine.

use crossterm::event::KeyEvent;
use ratatui::Frame;

use crate::game::GameMode;

/// The result of handling an input event on a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenTransition {
    /// Stay on the current screen.
    Stay,
    /// Start a new match in the chosen mode.
    StartMatch(GameMode),
    /// Abandon the current match and return to mode selection.
    BackToMenu,
    /// Exit the client.
    Quit,
}

/// Trait implemented by each screen.
///
/// Each screen owns its own state, renders its UI, and handles key events.
/// The controller calls these methods in the event loop.
pub trait Screen {
    /// Renders the screen into the provided [`Frame`].
    fn render(&self, frame: &mut Frame);

    /// Handles a key event and returns the resulting [`ScreenTransition`].
    fn handle_key(&mut self, key: KeyEvent) -> ScreenTransition;

    /// Called once per loop iteration to apply background work.
    fn on_tick(&mut self) {}
}
