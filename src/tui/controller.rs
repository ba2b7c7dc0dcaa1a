//! Client controller: the state machine driving mode selection and play.

use std::sync::Arc;

use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use ratatui::{Terminal, backend::Backend};
use tokio::time::{Duration, sleep};
use tracing::{debug, info, instrument};

use crate::capture::Camera;
use crate::prediction::Predictor;
use crate::tui::screen::{Screen, ScreenTransition};
use crate::tui::screens::{GameScreen, ModeSelectScreen};

/// Active screen in the client state machine.
#[derive(Debug)]
pub enum ActiveScreen {
    /// Choosing a game mode.
    ModeSelect(ModeSelectScreen),
    /// Playing a match.
    Game(GameScreen),
}

impl ActiveScreen {
    fn as_screen(&self) -> &dyn Screen {
        match self {
            Self::ModeSelect(s) => s,
            Self::Game(s) => s,
        }
    }

    fn as_screen_mut(&mut self) -> &mut dyn Screen {
        match self {
            Self::ModeSelect(s) => s,
            Self::Game(s) => s,
        }
    }
}

/// Controller that owns the collaborators and the active screen.
///
/// Call [`AppController::run`] to start the event loop.
#[derive(Debug)]
pub struct AppController {
    camera: Arc<dyn Camera>,
    predictor: Arc<dyn Predictor>,
    jpeg_quality: u8,
    screen: ActiveScreen,
}

impl AppController {
    /// Creates a controller showing mode selection.
    #[instrument(skip(camera, predictor))]
    pub fn new(camera: Arc<dyn Camera>, predictor: Arc<dyn Predictor>, jpeg_quality: u8) -> Self {
        info!("Creating AppController");
        Self {
            camera,
            predictor,
            jpeg_quality,
            screen: ActiveScreen::ModeSelect(ModeSelectScreen::new()),
        }
    }

    /// The active screen.
    pub fn screen(&self) -> &ActiveScreen {
        &self.screen
    }

    /// The active screen, mutably.
    pub fn screen_mut(&mut self) -> &mut ActiveScreen {
        &mut self.screen
    }

    /// Runs the event loop until the user quits.
    #[instrument(skip(self, terminal))]
    pub async fn run<B: Backend + std::io::Write>(
        &mut self,
        terminal: &mut Terminal<B>,
    ) -> anyhow::Result<()>
    where
        <B as Backend>::Error: Send + Sync + 'static,
    {
        info!("Starting client event loop");

        loop {
            self.screen.as_screen_mut().on_tick();
            terminal.draw(|f| self.screen.as_screen().render(f))?;

            // Short poll keeps countdown ticks and notifications responsive.
            if event::poll(Duration::from_millis(50))?
                && let Event::Key(key) = event::read()?
            {
                // Skip key release events (crossterm fires both press and release).
                if key.kind == KeyEventKind::Release {
                    continue;
                }
                if !self.handle_key(key) {
                    info!("Client quitting");
                    return Ok(());
                }
            }

            sleep(Duration::from_millis(10)).await;
        }
    }

    /// Routes a key to the active screen and applies the transition.
    /// Returns false when the client should exit.
    #[instrument(skip(self, key))]
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let transition = self.screen.as_screen_mut().handle_key(key);
        self.apply_transition(transition)
    }

    /// Applies a screen transition. Returns false on quit.
    #[instrument(skip(self))]
    pub fn apply_transition(&mut self, transition: ScreenTransition) -> bool {
        debug!(transition = ?transition, "Applying screen transition");
        match transition {
            ScreenTransition::Stay => true,
            ScreenTransition::StartMatch(mode) => {
                self.screen = ActiveScreen::Game(GameScreen::new(
                    mode,
                    Arc::clone(&self.camera),
                    Arc::clone(&self.predictor),
                    self.jpeg_quality,
                ));
                true
            }
            ScreenTransition::BackToMenu => {
                info!("Returning to mode selection");
                // Replacing the game screen drops its session and camera.
                self.screen = ActiveScreen::ModeSelect(ModeSelectScreen::new());
                true
            }
            ScreenTransition::Quit => false,
        }
    }
}
