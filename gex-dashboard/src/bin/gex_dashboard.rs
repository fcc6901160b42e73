/// GEX Dashboard - gamma exposure terminal view
///
/// - Quote header with symbol entry
/// - GEX per strike with call wall / put wall / flip point markers
/// - Session candlesticks
/// - History slider over captured GEX snapshots (debounced)
use std::{
    error::Error,
    fs::OpenOptions,
    io,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gex_dashboard::{
    shared::gex_view::{
        render_content, render_expiration_picker, render_expirations, render_header, render_help,
        render_slider,
    },
    CoordinatorConfig, ExpirationPicker, GexCoordinator, Selection,
};
use gex_data::{ClientConfig, GexSource, RestClient};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};
use tracing::{info, warn};

const DRAW_INTERVAL: Duration = Duration::from_millis(50);

/// Keyboard focus
enum InputMode {
    Normal,
    Symbol(String),
    Expirations(ExpirationPicker),
}

/// Outcome of one key press
enum Flow {
    Continue,
    Quit,
}

fn get_initial_symbol() -> String {
    std::env::var("GEX_SYMBOL").unwrap_or_else(|_| "SPY".to_string())
}

fn get_log_file() -> String {
    std::env::var("GEX_LOG_FILE").unwrap_or_else(|_| "gex-dashboard.log".to_string())
}

/// Log to a file so output does not tear the alternate screen
fn init_logging() -> Result<(), Box<dyn Error>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(get_log_file())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_logging()?;

    let client_config = ClientConfig::from_env();
    info!(base_url = %client_config.base_url, "Starting GEX dashboard");
    let client = RestClient::new(client_config)?;

    let mut coordinator = GexCoordinator::new(Arc::new(client), CoordinatorConfig::from_env());
    if let Err(error) = coordinator.select_symbol(&get_initial_symbol(), Local::now().naive_local()) {
        warn!(%error, "Initial symbol rejected");
    }

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut mode = InputMode::Normal;
    let mut notice: Option<String> = None;
    let mut last_draw = Instant::now()
        .checked_sub(DRAW_INTERVAL)
        .unwrap_or_else(Instant::now);

    let result: Result<(), Box<dyn Error>> = loop {
        if event::poll(Duration::from_millis(5))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match handle_key(key, &mut mode, &mut coordinator, &mut notice) {
                        Flow::Quit => break Ok(()),
                        Flow::Continue => {}
                    }
                }
            }
        }

        coordinator.drain();

        if last_draw.elapsed() >= DRAW_INTERVAL {
            let state = coordinator.state();
            terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Length(3),
                        Constraint::Length(1),
                        Constraint::Length(1),
                        Constraint::Min(8),
                        Constraint::Length(1),
                    ])
                    .split(f.area());

                let symbol_input = match &mode {
                    InputMode::Symbol(input) => Some(input.as_str()),
                    _ => None,
                };
                render_header(f, chunks[0], state, symbol_input);
                render_expirations(f, chunks[1], state);
                render_slider(f, chunks[2], state);
                render_content(f, chunks[3], state);
                render_help(f, chunks[4], notice.as_deref());

                if let InputMode::Expirations(picker) = &mode {
                    render_expiration_picker(f, chunks[3], picker);
                }
            })?;
            last_draw = Instant::now();
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    };

    coordinator.teardown();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    info!("GEX dashboard stopped");
    result
}

fn handle_key<S: GexSource>(
    key: KeyEvent,
    mode: &mut InputMode,
    coordinator: &mut GexCoordinator<S>,
    notice: &mut Option<String>,
) -> Flow {
    match mode {
        InputMode::Symbol(input) => match key.code {
            KeyCode::Enter => {
                let symbol = std::mem::take(input);
                *mode = InputMode::Normal;
                report(
                    coordinator.select_symbol(&symbol, Local::now().naive_local()),
                    notice,
                );
            }
            KeyCode::Esc => *mode = InputMode::Normal,
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(c) if !c.is_whitespace() && input.len() < 12 => {
                input.push(c.to_ascii_uppercase());
            }
            _ => {}
        },
        InputMode::Expirations(picker) => match key.code {
            KeyCode::Up | KeyCode::Char('k') => picker.move_cursor(-1),
            KeyCode::Down | KeyCode::Char('j') => picker.move_cursor(1),
            KeyCode::Char(' ') => picker.toggle(),
            KeyCode::Enter => {
                let selection = picker.selection();
                *mode = InputMode::Normal;
                report(coordinator.select_expirations(selection), notice);
            }
            KeyCode::Esc => *mode = InputMode::Normal,
            _ => {}
        },
        InputMode::Normal => {
            *notice = None;
            match key.code {
                KeyCode::Char('q') => return Flow::Quit,
                KeyCode::Char('/') => *mode = InputMode::Symbol(String::new()),
                KeyCode::Char('e') => {
                    let state = coordinator.state();
                    if state.expirations_locked() {
                        *notice = Some("Expirations are locked while viewing a capture".to_string());
                    } else {
                        *mode = InputMode::Expirations(ExpirationPicker::new(
                            &state.expirations_available,
                            &state.expirations_selected,
                        ));
                    }
                }
                KeyCode::Left => report(coordinator.step_slider(-1), notice),
                KeyCode::Right => report(coordinator.step_slider(1), notice),
                KeyCode::Home => {
                    let first = coordinator.state().scrub.options().first().copied();
                    if let Some(first) = first {
                        report(coordinator.move_slider(first), notice);
                    }
                }
                KeyCode::End => report(coordinator.move_slider(Selection::Now), notice),
                KeyCode::Char(c) => {
                    coordinator.state_mut().series.toggle(c);
                }
                _ => {}
            }
        }
    }

    Flow::Continue
}

fn report<E: std::fmt::Display>(result: Result<(), E>, notice: &mut Option<String>) {
    if let Err(error) = result {
        warn!(%error, "Action rejected");
        *notice = Some(error.to_string());
    }
}
