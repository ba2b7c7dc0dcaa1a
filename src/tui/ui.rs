//! Stateless rendering helpers shared by the screens.

use image::RgbImage;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::game::{Move, RoundPhase, RoundResult, Score, Winner};
use crate::session::{Notification, NotificationKind};

/// Score board: player, title, computer.
pub fn draw_score_board(frame: &mut Frame, area: Rect, score: Score, target: u32) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    let side = |label: &str, value: u32, color: Color| {
        Paragraph::new(vec![
            Line::from(label.to_string()),
            Line::from(Span::styled(
                value.to_string(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )),
        ])
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL))
    };

    frame.render_widget(side("You", *score.player(), Color::Green), cols[0]);
    frame.render_widget(
        Paragraph::new(vec![
            Line::from(Span::styled(
                "Score",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("first to {}", target)),
        ])
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL)),
        cols[1],
    );
    frame.render_widget(side("Computer", *score.computer(), Color::Red), cols[2]);
}

/// Downsamples `image` into half-block cells: each cell shows two pixels,
/// the upper one as foreground and the lower one as background.
pub fn preview_lines(image: &RgbImage, width: u16, height: u16) -> Vec<Line<'static>> {
    let (img_w, img_h) = image.dimensions();
    if img_w == 0 || img_h == 0 || width == 0 || height == 0 {
        return Vec::new();
    }
    let rows = u32::from(height) * 2;
    let sample = |col: u16, row: u32| {
        let x = (u32::from(col) * img_w / u32::from(width)).min(img_w - 1);
        let y = (row * img_h / rows).min(img_h - 1);
        let p = image.get_pixel(x, y);
        Color::Rgb(p[0], p[1], p[2])
    };

    (0..height)
        .map(|r| {
            let spans: Vec<Span<'static>> = (0..width)
                .map(|c| {
                    let top = sample(c, u32::from(r) * 2);
                    let bottom = sample(c, u32::from(r) * 2 + 1);
                    Span::styled("▀", Style::default().fg(top).bg(bottom))
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

/// Big countdown digit, or the processing indicator once capture began.
pub fn draw_countdown(frame: &mut Frame, area: Rect, phase: RoundPhase) {
    let text = match phase {
        RoundPhase::Countdown { remaining } => format!(" {} ", remaining),
        RoundPhase::Capturing => " SNAP! ".to_string(),
        _ => return,
    };
    let badge = center_rect(area, (text.len() as u16).saturating_add(2), 3);
    frame.render_widget(Clear, badge);
    frame.render_widget(
        Paragraph::new(text)
            .style(
                Style::default()
                    .fg(Color::White)
                    .bg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            )
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL)),
        badge,
    );
}

/// Right-hand status panel.
pub fn draw_status_panel(frame: &mut Frame, area: Rect, phase: RoundPhase, cheat_mode: bool) {
    let lines = match phase {
        RoundPhase::Waiting => vec![
            Line::from("Get ready to play!"),
            Line::from(""),
            Line::from(format!(
                "{} Rock    {} Paper    {} Scissors",
                Move::Rock.glyph(),
                Move::Paper.glyph(),
                Move::Scissors.glyph()
            )),
        ],
        RoundPhase::Countdown { .. } => {
            let mut lines = vec![
                Line::from(Span::styled(
                    "Make your gesture!",
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from("The camera will capture your move..."),
            ];
            if cheat_mode {
                lines.push(Line::from(""));
                lines.extend(cheat_reveal_lines());
            }
            lines
        }
        RoundPhase::Capturing => vec![Line::from("Processing your move...")],
        RoundPhase::ResultShown(result) => result_lines(result),
    };

    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Game Status")),
        area,
    );
}

/// The computer's answer to each gesture in cheat mode.
pub fn cheat_reveal_lines() -> Vec<Line<'static>> {
    let style = Style::default().fg(Color::Red);
    let mut lines = vec![Line::from(Span::styled(
        "Computer will play:",
        style.add_modifier(Modifier::BOLD),
    ))];
    for m in [Move::Rock, Move::Paper, Move::Scissors] {
        lines.push(Line::from(Span::styled(
            format!("your {} → {}", m, m.counter()),
            style,
        )));
    }
    lines
}

fn result_lines(result: RoundResult) -> Vec<Line<'static>> {
    let verdict = match result.winner() {
        Winner::Player => Span::styled(
            "You win!",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        Winner::Computer => Span::styled(
            "Computer wins!",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Winner::Draw => Span::styled(
            "Draw!",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
    };
    vec![
        Line::from(format!(
            "You: {} {}   vs   Computer: {} {}",
            result.player_move().glyph(),
            result.player_move(),
            result.computer_move().glyph(),
            result.computer_move()
        )),
        Line::from(""),
        Line::from(verdict),
    ]
}

/// Modal shown when a side reaches the target.
pub fn draw_match_over(frame: &mut Frame, winner: Option<Winner>, score: Score) {
    let headline = match winner {
        Some(Winner::Player) => "You Won the Match!",
        _ => "Computer Won the Match!",
    };
    let area = center_rect(frame.area(), 40, 7);
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(vec![
            Line::from(Span::styled(
                headline,
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(format!(
                "Final score: {} x {}",
                score.player(),
                score.computer()
            )),
            Line::from("Enter: back to menu"),
        ])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title("Match Over"),
        ),
        area,
    );
}

/// Notification box in the bottom-right corner.
pub fn draw_notification(frame: &mut Frame, notification: &Notification) {
    let screen = frame.area();
    let width = screen.width.min(50);
    let height = screen.height.min(5);
    let area = Rect {
        x: screen.width.saturating_sub(width),
        y: screen.height.saturating_sub(height),
        width,
        height,
    };
    let hint = match notification.kind() {
        NotificationKind::Alert => " (any key to dismiss)",
        NotificationKind::Transient => "",
    };
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(notification.message().as_str())
            .wrap(Wrap { trim: true })
            .style(Style::default().fg(Color::White))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red))
                    .title(format!("{}{}", notification.title(), hint)),
            ),
        area,
    );
}

/// Centers a `width` × `height` rectangle inside `area`.
pub fn center_rect(area: Rect, width: u16, height: u16) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height.saturating_sub(height)) / 2),
            Constraint::Length(height.min(area.height)),
            Constraint::Min(0),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length((area.width.saturating_sub(width)) / 2),
            Constraint::Length(width.min(area.width)),
            Constraint::Min(0),
        ])
        .split(vert[1])[1]
}
