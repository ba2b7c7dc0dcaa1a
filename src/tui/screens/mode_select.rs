//! Mode selection screen: pick a preset to start a match.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use strum::IntoEnumIterator;
use tracing::{info, instrument};

use crate::game::GameMode;
use crate::tui::screen::{Screen, ScreenTransition};

/// State for the mode selection screen.
#[derive(Debug)]
pub struct ModeSelectScreen {
    modes: Vec<GameMode>,
    list_state: ListState,
}

impl ModeSelectScreen {
    /// Creates the screen with the first preset highlighted.
    #[instrument]
    pub fn new() -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        Self {
            modes: GameMode::iter().collect(),
            list_state,
        }
    }

    /// Currently highlighted preset.
    pub fn selected(&self) -> GameMode {
        let idx = self.list_state.selected().unwrap_or(0);
        self.modes[idx.min(self.modes.len() - 1)]
    }

    fn select_previous(&mut self) {
        let count = self.modes.len();
        let i = match self.list_state.selected() {
            Some(i) if i > 0 => i - 1,
            _ => count - 1,
        };
        self.list_state.select(Some(i));
    }

    fn select_next(&mut self) {
        let count = self.modes.len();
        let i = match self.list_state.selected() {
            Some(i) => (i + 1) % count,
            None => 0,
        };
        self.list_state.select(Some(i));
    }
}

impl Default for ModeSelectScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl Screen for ModeSelectScreen {
    #[instrument(skip(self, frame))]
    fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Min(8),
                Constraint::Length(3),
            ])
            .split(area);

        let title = Paragraph::new(vec![
            Line::from(Span::styled(
                "Rock, Paper, Scissors",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from("Choose your game mode and get ready for battle!"),
        ])
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(title, chunks[0]);

        let items: Vec<ListItem> = self
            .modes
            .iter()
            .enumerate()
            .map(|(i, mode)| {
                ListItem::new(vec![
                    Line::from(Span::styled(
                        format!("{}. {}", i + 1, mode.title()),
                        Style::default().add_modifier(Modifier::BOLD),
                    )),
                    Line::from(format!("   {}", mode.description())),
                    Line::from(""),
                ])
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title("Game Modes"))
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");

        let mut list_state = self.list_state.clone();
        frame.render_stateful_widget(list, chunks[1], &mut list_state);

        let help = Paragraph::new("↑↓: Navigate | Enter / 1-3: Play | q: Quit")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(help, chunks[2]);
    }

    #[instrument(skip(self, key))]
    fn handle_key(&mut self, key: KeyEvent) -> ScreenTransition {
        match key.code {
            KeyCode::Up => {
                self.select_previous();
                ScreenTransition::Stay
            }
            KeyCode::Down => {
                self.select_next();
                ScreenTransition::Stay
            }
            KeyCode::Enter => {
                let mode = self.selected();
                info!(mode = mode.title(), "Mode selected");
                ScreenTransition::StartMatch(mode)
            }
            KeyCode::Char(c @ '1'..='9') => {
                let idx = (c as usize) - ('1' as usize);
                match self.modes.get(idx) {
                    Some(&mode) => {
                        info!(mode = mode.title(), "Mode selected by number");
                        ScreenTransition::StartMatch(mode)
                    }
                    None => ScreenTransition::Stay,
                }
            }
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => ScreenTransition::Quit,
            _ => ScreenTransition::Stay,
        }
    }
}
