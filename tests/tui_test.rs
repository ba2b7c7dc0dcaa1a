//! Terminal UI tests: rendering into a test backend and key routing.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    FakeCamera, ScriptedPredictor, SlowCamera, computer_wins, draw, player_wins, service_down,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{Terminal, backend::TestBackend};
use rps_vision::{
    ActiveScreen, AppController, GameMode, GameScreen, ModeSelectScreen, RoundPhase, Screen,
    ScreenTransition,
};

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn render(screen: &dyn Screen) -> String {
    let mut terminal = Terminal::new(TestBackend::new(100, 40)).expect("Test terminal");
    terminal
        .draw(|frame| screen.render(frame))
        .expect("Draw should succeed");
    let buffer = terminal.backend().buffer();
    let mut text = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            text.push_str(buffer[(x, y)].symbol());
        }
        text.push('\n');
    }
    text
}

fn game_screen(mode: GameMode, camera: FakeCamera, predictor: ScriptedPredictor) -> GameScreen {
    GameScreen::new(mode, Arc::new(camera), Arc::new(predictor), 80)
}

/// Applies session events until the camera open has been handled.
async fn settle_camera(screen: &mut GameScreen) {
    while screen.session().is_opening_camera() {
        let event = screen
            .session_mut()
            .next_event()
            .await
            .expect("Session channel closed");
        screen.session_mut().handle_event(event);
    }
}

/// Applies session events until the round has a result or was aborted.
async fn settle_round(screen: &mut GameScreen) {
    while screen.session().is_opening_camera()
        || matches!(
            screen.session().phase(),
            RoundPhase::Countdown { .. } | RoundPhase::Capturing
        )
    {
        let event = screen
            .session_mut()
            .next_event()
            .await
            .expect("Session channel closed");
        screen.session_mut().handle_event(event);
    }
}

#[test]
fn test_mode_select_lists_every_preset() {
    let screen = ModeSelectScreen::new();
    let text = render(&screen);

    assert!(text.contains("Rock, Paper, Scissors"));
    assert!(text.contains("1. Best of 3"));
    assert!(text.contains("2. Best of 5"));
    assert!(text.contains("3. Cheat Mode"));
    assert!(text.contains("Win 2 rounds"));
}

#[test]
fn test_mode_select_keys() {
    let mut screen = ModeSelectScreen::new();
    assert_eq!(screen.selected(), GameMode::BestOfThree);

    assert_eq!(screen.handle_key(key(KeyCode::Down)), ScreenTransition::Stay);
    assert_eq!(
        screen.handle_key(key(KeyCode::Enter)),
        ScreenTransition::StartMatch(GameMode::BestOfFive)
    );

    assert_eq!(screen.handle_key(key(KeyCode::Up)), ScreenTransition::Stay);
    assert_eq!(screen.handle_key(key(KeyCode::Up)), ScreenTransition::Stay);
    assert_eq!(screen.selected(), GameMode::Cheat, "Up wraps to the last preset");

    assert_eq!(
        screen.handle_key(key(KeyCode::Char('1'))),
        ScreenTransition::StartMatch(GameMode::BestOfThree)
    );
    assert_eq!(
        screen.handle_key(key(KeyCode::Char('9'))),
        ScreenTransition::Stay
    );
    assert_eq!(screen.handle_key(key(KeyCode::Char('q'))), ScreenTransition::Quit);
}

#[test]
fn test_controller_moves_between_screens() {
    let camera = Arc::new(FakeCamera::working());
    let mut controller = AppController::new(
        camera.clone(),
        Arc::new(ScriptedPredictor::default()),
        80,
    );
    assert!(matches!(controller.screen(), ActiveScreen::ModeSelect(_)));

    assert!(controller.handle_key(key(KeyCode::Char('3'))));
    match controller.screen() {
        ActiveScreen::Game(game) => {
            assert!(*game.session().config().cheat_mode());
            assert_eq!(game.session().phase(), RoundPhase::Waiting);
        }
        other => panic!("Expected the game screen, got {:?}", other),
    }

    assert!(controller.handle_key(key(KeyCode::Esc)));
    assert!(matches!(controller.screen(), ActiveScreen::ModeSelect(_)));
    assert_eq!(camera.opens(), 0, "Camera is only opened when a round starts");

    assert!(!controller.handle_key(key(KeyCode::Char('q'))));
}

#[tokio::test(start_paused = true)]
async fn test_leaving_game_releases_camera() {
    let camera = Arc::new(FakeCamera::working());
    let mut controller = AppController::new(
        camera.clone(),
        Arc::new(ScriptedPredictor::default()),
        80,
    );

    controller.handle_key(key(KeyCode::Enter));
    controller.handle_key(key(KeyCode::Enter));
    match controller.screen_mut() {
        ActiveScreen::Game(game) => settle_camera(game).await,
        other => panic!("Expected the game screen, got {:?}", other),
    }
    assert_eq!(camera.opens(), 1);
    assert_eq!(camera.stops(), 0);

    controller.handle_key(key(KeyCode::Char('m')));
    assert!(matches!(controller.screen(), ActiveScreen::ModeSelect(_)));
    assert_eq!(camera.stops(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_camera_alert_is_shown_and_dismissed_by_any_key() {
    let mut screen = game_screen(
        GameMode::BestOfThree,
        FakeCamera::denied(),
        ScriptedPredictor::default(),
    );

    assert_eq!(screen.handle_key(key(KeyCode::Enter)), ScreenTransition::Stay);
    settle_camera(&mut screen).await;
    assert_eq!(screen.session().phase(), RoundPhase::Waiting);
    let text = render(&screen);
    assert!(text.contains("Camera unavailable"));
    assert!(text.contains("[ camera off ]"));

    // The dismissing key is swallowed, even if it would otherwise quit.
    assert_eq!(screen.handle_key(key(KeyCode::Char('q'))), ScreenTransition::Stay);
    assert!(screen.session().notification().is_none());
    assert!(!render(&screen).contains("Camera unavailable"));
}

#[tokio::test(start_paused = true)]
async fn test_countdown_shows_digit_and_cheat_reveal() {
    let mut screen = game_screen(
        GameMode::Cheat,
        FakeCamera::working(),
        ScriptedPredictor::default(),
    );

    screen.handle_key(key(KeyCode::Enter));
    settle_camera(&mut screen).await;
    assert_eq!(
        screen.session().phase(),
        RoundPhase::Countdown { remaining: 3 }
    );

    let text = render(&screen);
    assert!(text.contains("CHEAT MODE"));
    assert!(text.contains(" 3 "));
    assert!(text.contains("Computer will play:"));
    assert!(text.contains("your Rock → Paper"));
    assert!(text.contains("Get your gesture ready..."));
}

#[tokio::test(start_paused = true)]
async fn test_normal_mode_hides_cheat_reveal() {
    let mut screen = game_screen(
        GameMode::BestOfFive,
        FakeCamera::working(),
        ScriptedPredictor::default(),
    );

    screen.handle_key(key(KeyCode::Char(' ')));
    settle_camera(&mut screen).await;
    let text = render(&screen);
    assert!(!text.contains("CHEAT MODE"));
    assert!(!text.contains("Computer will play:"));
    assert!(text.contains("Make your gesture!"));
    assert!(text.contains("first to 3"));
}

#[tokio::test(start_paused = true)]
async fn test_match_over_overlay_and_return_to_menu() {
    let mut screen = game_screen(
        GameMode::BestOfThree,
        FakeCamera::working(),
        ScriptedPredictor::new(vec![player_wins(), player_wins()]),
    );

    for _ in 0..2 {
        screen.handle_key(key(KeyCode::Enter));
        settle_round(&mut screen).await;
        assert!(matches!(screen.session().phase(), RoundPhase::ResultShown(_)));
        if !screen.session().is_match_over() {
            assert!(render(&screen).contains("You win!"));
            screen.handle_key(key(KeyCode::Char('r')));
        }
    }

    let text = render(&screen);
    assert!(text.contains("You Won the Match!"));
    assert!(text.contains("Final score: 2 x 0"));
    assert!(text.contains("Match over"));

    assert_eq!(
        screen.handle_key(key(KeyCode::Enter)),
        ScreenTransition::BackToMenu
    );
}

#[tokio::test]
async fn test_opening_camera_hint_until_device_is_ready() {
    let camera = Arc::new(SlowCamera::new(Duration::from_millis(200)));
    let mut screen = GameScreen::new(
        GameMode::BestOfThree,
        camera,
        Arc::new(ScriptedPredictor::default()),
        80,
    );

    assert_eq!(screen.handle_key(key(KeyCode::Enter)), ScreenTransition::Stay);
    assert_eq!(screen.session().phase(), RoundPhase::Waiting);
    assert!(render(&screen).contains("Opening camera..."));

    // Keys still route while the camera opens.
    assert_eq!(screen.handle_key(key(KeyCode::Enter)), ScreenTransition::Stay);

    settle_camera(&mut screen).await;
    let text = render(&screen);
    assert!(!text.contains("Opening camera..."));
    assert!(text.contains("Get your gesture ready..."));
}

#[tokio::test]
async fn test_leaving_while_camera_opens_stops_the_late_stream() {
    let camera = Arc::new(SlowCamera::new(Duration::from_millis(100)));
    let mut screen = GameScreen::new(
        GameMode::BestOfThree,
        camera.clone(),
        Arc::new(ScriptedPredictor::default()),
        80,
    );

    screen.handle_key(key(KeyCode::Enter));
    camera.wait_until_opening().await;
    assert_eq!(
        screen.handle_key(key(KeyCode::Char('m'))),
        ScreenTransition::BackToMenu
    );
    drop(screen);

    let stopped = tokio::time::timeout(Duration::from_secs(2), async {
        while camera.stops() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(stopped.is_ok(), "Stream opened after leaving was never stopped");
    assert_eq!(camera.stops(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_round_banners_and_failure_notifications() {
    let predictor = Arc::new(ScriptedPredictor::new(vec![
        computer_wins(),
        draw(),
        service_down(),
    ]));
    let mut screen = GameScreen::new(
        GameMode::Cheat,
        Arc::new(FakeCamera::working()),
        predictor.clone(),
        80,
    );

    screen.handle_key(key(KeyCode::Enter));
    settle_round(&mut screen).await;
    assert!(render(&screen).contains("Computer wins!"));

    screen.handle_key(key(KeyCode::Char('r')));
    screen.handle_key(key(KeyCode::Enter));
    settle_round(&mut screen).await;
    assert!(render(&screen).contains("Draw!"));

    screen.handle_key(key(KeyCode::Char('r')));
    screen.handle_key(key(KeyCode::Enter));
    settle_round(&mut screen).await;
    assert_eq!(screen.session().phase(), RoundPhase::Waiting);
    assert!(render(&screen).contains("Gesture not understood"));

    assert_eq!(predictor.calls(), 3);
    assert_eq!(predictor.last_cheat_flag(), Some(true));
}

#[tokio::test(start_paused = true)]
async fn test_blank_camera_shows_capture_failure() {
    let mut screen = game_screen(
        GameMode::BestOfThree,
        FakeCamera::blank(),
        ScriptedPredictor::default(),
    );

    screen.handle_key(key(KeyCode::Enter));
    settle_round(&mut screen).await;
    assert_eq!(screen.session().phase(), RoundPhase::Waiting);
    assert!(render(&screen).contains("Capture failed"));
}
