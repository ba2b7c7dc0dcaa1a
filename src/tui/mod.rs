//! Terminal UI: mode selection and the game screen.

mod controller;
mod screen;
mod screens;
mod ui;

pub use controller::{ActiveScreen, AppController};
pub use screen::{Screen, ScreenTransition};
pub use screens::{GameScreen, ModeSelectScreen};

use std::io;
use std::sync::Arc;

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{error, info, instrument};

use crate::capture::CameraSource;
use crate::config::ClientConfig;
use crate::prediction::{PredictionClient, Predictor};

/// Runs the client until the user quits.
#[instrument(skip(config), fields(service_url = %config.service_url()))]
pub async fn run_client(config: &ClientConfig) -> Result<()> {
    let source = CameraSource::detect(config.camera_source());
    info!(source = ?source, "Camera source");
    let camera = source.into_camera();
    let predictor: Arc<dyn Predictor> = Arc::new(PredictionClient::new(
        config.service_url(),
        config.request_timeout(),
    )?);

    info!("Starting terminal UI");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut controller = AppController::new(camera, predictor, *config.jpeg_quality());
    let res = controller.run(&mut terminal).await;

    // Release the camera before handing the terminal back.
    drop(controller);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        error!(error = ?err, "Client loop error");
    }
    res
}
