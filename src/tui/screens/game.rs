//! Game screen: camera preview, countdown, score and round results.
//!
//! The screen owns the [`GameSession`]; leaving the screen drops the session,
//! which cancels the countdown and releases the camera.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crate::capture::Camera;
use crate::game::{GameMode, RoundPhase};
use crate::prediction::Predictor;
use crate::session::{GameSession, NotificationKind};
use crate::tui::screen::{Screen, ScreenTransition};
use crate::tui::ui;

/// State for the game screen.
#[derive(Debug)]
pub struct GameScreen {
    mode: GameMode,
    session: GameSession,
}

impl GameScreen {
    /// Starts a new match in `mode`.
    #[instrument(skip(camera, predictor))]
    pub fn new(
        mode: GameMode,
        camera: Arc<dyn Camera>,
        predictor: Arc<dyn Predictor>,
        jpeg_quality: u8,
    ) -> Self {
        info!(mode = mode.title(), "Entering game screen");
        Self {
            mode,
            session: GameSession::new(mode.config(), camera, predictor, jpeg_quality),
        }
    }

    /// The running session.
    pub fn session(&self) -> &GameSession {
        &self.session
    }

    /// The running session, mutably.
    pub fn session_mut(&mut self) -> &mut GameSession {
        &mut self.session
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![Span::styled(
            format!("Rock, Paper, Scissors: {}", self.mode.title()),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )];
        if *self.session.config().cheat_mode() {
            spans.push(Span::raw("   "));
            spans.push(Span::styled(
                " CHEAT MODE ",
                Style::default()
                    .fg(Color::White)
                    .bg(Color::Red)
                    .add_modifier(Modifier::BOLD),
            ));
        }
        frame.render_widget(
            Paragraph::new(Line::from(spans))
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL)),
            area,
        );
    }

    fn draw_camera_panel(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Camera");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(inner);

        let phase = self.session.phase();
        match (phase, self.session.preview()) {
            (RoundPhase::Waiting, _) | (_, None) => {
                frame.render_widget(
                    Paragraph::new("[ camera off ]")
                        .style(Style::default().fg(Color::DarkGray))
                        .alignment(Alignment::Center),
                    ui::center_rect(rows[0], 20, 1),
                );
            }
            (_, Some(image)) => {
                let lines = ui::preview_lines(image, rows[0].width, rows[0].height);
                frame.render_widget(Paragraph::new(lines), rows[0]);
            }
        }
        ui::draw_countdown(frame, rows[0], phase);

        frame.render_widget(
            Paragraph::new(self.action_hint())
                .style(Style::default().fg(Color::Yellow))
                .alignment(Alignment::Center),
            rows[1],
        );
    }

    fn action_hint(&self) -> &'static str {
        if self.session.is_match_over() {
            return "Match over";
        }
        if self.session.is_opening_camera() {
            return "Opening camera...";
        }
        match self.session.phase() {
            RoundPhase::Waiting => "Enter: Start round",
            RoundPhase::Countdown { .. } => "Get your gesture ready...",
            RoundPhase::Capturing => "Processing your move...",
            RoundPhase::ResultShown(_) => "Enter / r: Play again",
        }
    }
}

impl Screen for GameScreen {
    #[instrument(skip(self, frame))]
    fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(4),
                Constraint::Min(10),
                Constraint::Length(3),
            ])
            .split(area);

        self.draw_header(frame, chunks[0]);
        ui::draw_score_board(frame, chunks[1], self.session.score(), self.session.target());

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[2]);
        self.draw_camera_panel(frame, body[0]);
        ui::draw_status_panel(
            frame,
            body[1],
            self.session.phase(),
            *self.session.config().cheat_mode(),
        );

        let help = Paragraph::new("Enter: Start / Play again | m / Esc: Menu | q: Quit")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(help, chunks[3]);

        if self.session.is_match_over() {
            ui::draw_match_over(frame, self.session.match_winner(), self.session.score());
        }
        if let Some(notification) = self.session.notification() {
            ui::draw_notification(frame, notification);
        }
    }

    #[instrument(skip(self, key))]
    fn handle_key(&mut self, key: KeyEvent) -> ScreenTransition {
        if self
            .session
            .notification()
            .is_some_and(|n| *n.kind() == NotificationKind::Alert)
        {
            debug!("Dismissing alert");
            self.session.dismiss_notification();
            return ScreenTransition::Stay;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => ScreenTransition::Quit,
            KeyCode::Esc | KeyCode::Char('m') | KeyCode::Char('M') => ScreenTransition::BackToMenu,
            KeyCode::Enter if self.session.is_match_over() => ScreenTransition::BackToMenu,
            KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('r') | KeyCode::Char('R') => {
                let outcome = match self.session.phase() {
                    RoundPhase::Waiting => self.session.start_round().map(|_| ()),
                    RoundPhase::ResultShown(_) => self.session.play_again(),
                    _ => Ok(()),
                };
                if let Err(e) = outcome {
                    debug!(error = %e, "Action refused");
                }
                ScreenTransition::Stay
            }
            _ => ScreenTransition::Stay,
        }
    }

    fn on_tick(&mut self) {
        self.session.pump();
        self.session.expire_notification(Instant::now());
    }
}
