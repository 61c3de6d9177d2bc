/// Scalp Watch - terminal market watcher
///
/// - Watchlist on the left, candles + volume + EMA/VWAP in the middle, RSI below
/// - Header badges: timeframe, market pulse, feed status, latest AI signal
/// - Popups for signals and Telegram-sourced symbols
use std::{
    error::Error,
    io,
    ops::Range,
    path::Path,
    sync::Mutex,
    time::{Duration, Instant},
};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Line as CanvasLine},
        Axis, Block, Borders, Chart, Clear, Dataset, GraphType, List, ListItem, Paragraph, Wrap,
    },
    Terminal,
};
use rustls::crypto::ring::default_provider;
use scalp_watch::{
    frame::{CandlePoint, LinePoint, VolumePoint},
    ChartFrame, Command, ConnectionStatus, Dashboard, JsonFileStore, KeyValueStore, Notification,
    Preferences, PresentationSink, Runtime, Settings, SignalSide, Symbol, Timeframe, WatchConfig,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

// ============================================================================
// COLORS
// ============================================================================
const C_UP: Color = Color::Rgb(24, 201, 100);
const C_DOWN: Color = Color::Rgb(255, 77, 79);
const C_VOL_UP: Color = Color::Rgb(30, 139, 95);
const C_VOL_DOWN: Color = Color::Rgb(139, 47, 51);
const C_EMA9: Color = Color::Rgb(119, 224, 174);
const C_EMA21: Color = Color::Rgb(58, 160, 255);
const C_EMA50: Color = Color::Rgb(240, 185, 11);
const C_VWAP: Color = Color::Rgb(199, 125, 255);
const C_RSI: Color = Color::Rgb(154, 164, 178);
const C_DIM: Color = Color::Rgb(120, 120, 120);
const C_BRIGHT: Color = Color::Rgb(220, 220, 220);
const C_ACCENT: Color = Color::Rgb(100, 180, 220);

// ============================================================================
// CONSTANTS
// ============================================================================
const DRAW_INTERVAL: Duration = Duration::from_millis(50);
const ZOOM_STEP: usize = 20;
const MIN_VISIBLE_BARS: usize = 20;
const SCROLL_STEP: usize = 30;
const CHANGE_LOOKBACK: usize = 60;

// ============================================================================
// PRESENTATION SINK
// ============================================================================

/// Latest frame and popup, drawn on the next tick
#[derive(Default)]
struct TerminalSink {
    frame: ChartFrame,
    popup: Option<Notification>,
}

impl PresentationSink for TerminalSink {
    fn redraw(&mut self, frame: &ChartFrame) {
        self.frame = frame.clone();
    }

    fn notify(&mut self, notification: Notification) {
        self.popup = Some(notification);
    }
}

impl TerminalSink {
    fn visible_popup(&mut self) -> Option<&Notification> {
        if self
            .popup
            .as_ref()
            .is_some_and(|popup| popup.is_expired(Instant::now()))
        {
            self.popup = None;
        }
        self.popup.as_ref()
    }
}

// ============================================================================
// VIEW STATE (zoom + scroll)
// ============================================================================

/// Visible window over the bar history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ChartView {
    /// Bars on screen, `None` fits everything
    visible: Option<usize>,
    /// Bars hidden to the right of the window
    offset: usize,
}

impl ChartView {
    fn zoom_in(&mut self, len: usize) {
        let current = self.visible.unwrap_or(len);
        self.visible = Some(current.saturating_sub(ZOOM_STEP).max(MIN_VISIBLE_BARS));
    }

    fn zoom_out(&mut self, len: usize) {
        self.visible = match self.visible {
            Some(visible) if visible + ZOOM_STEP < len => Some(visible + ZOOM_STEP),
            _ => None,
        };
        self.offset = self.offset.min(self.max_offset(len));
    }

    fn scroll_left(&mut self, len: usize) {
        self.offset = (self.offset + SCROLL_STEP).min(self.max_offset(len));
    }

    fn scroll_right(&mut self) {
        self.offset = self.offset.saturating_sub(SCROLL_STEP);
    }

    fn fit(&mut self) {
        *self = Self::default();
    }

    fn latest(&mut self) {
        self.offset = 0;
    }

    fn max_offset(&self, len: usize) -> usize {
        len.saturating_sub(self.visible.unwrap_or(len))
    }

    /// Index range of `len` bars currently on screen
    fn window(&self, len: usize) -> Range<usize> {
        let visible = self.visible.unwrap_or(len).min(len);
        let end = len - self.offset.min(len - visible);
        (end - visible)..end
    }
}

// ============================================================================
// INPUT MODES
// ============================================================================

const SETTINGS_FIELDS: [&str; 3] = ["Telegram bot token", "Telegram chat id", "OpenAI / Grok key"];

enum InputMode {
    Normal,
    AddSymbol(String),
    Settings { fields: [String; 3], focus: usize },
}

impl InputMode {
    fn settings(settings: &Settings) -> Self {
        let field = |value: &Option<String>| value.clone().unwrap_or_default();
        InputMode::Settings {
            fields: [
                field(&settings.tg_token),
                field(&settings.tg_chat_id),
                field(&settings.openai_key),
            ],
            focus: 0,
        }
    }
}

fn settings_from_fields(fields: &[String; 3]) -> Settings {
    let value = |s: &String| {
        let trimmed = s.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    };
    Settings {
        tg_token: value(&fields[0]),
        tg_chat_id: value(&fields[1]),
        openai_key: value(&fields[2]),
    }
}

/// Everything the key handler mutates
struct App<S> {
    dashboard: Dashboard<S>,
    runtime: Runtime,
    sink: TerminalSink,
    view: ChartView,
    mode: InputMode,
}

impl<S: KeyValueStore> App<S> {
    fn execute(&mut self, commands: Vec<Command>) {
        self.runtime.execute(commands);
    }

    fn select_offset(&mut self, step: isize) {
        let watchlist = self.dashboard.watchlist();
        if watchlist.is_empty() {
            return;
        }
        let len = watchlist.len() as isize;
        let current = watchlist.position(self.dashboard.active()).unwrap_or(0) as isize;
        let next = (current + step).rem_euclid(len) as usize;

        if let Some(symbol) = watchlist.get(next).cloned() {
            self.dashboard.set_active(&symbol, &mut self.sink);
            self.view.fit();
        }
    }

    /// Returns `false` when the user asked to quit
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let bars = self.sink.frame.candles.len();

        match &mut self.mode {
            InputMode::Normal => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return false,
                KeyCode::Up | KeyCode::BackTab => self.select_offset(-1),
                KeyCode::Down | KeyCode::Tab => self.select_offset(1),
                KeyCode::Char('a') => self.mode = InputMode::AddSymbol(String::new()),
                KeyCode::Char('s') => self.mode = InputMode::settings(self.dashboard.settings()),
                KeyCode::Char('x') => {
                    let active = self.dashboard.active().clone();
                    let commands = self.dashboard.remove_symbol(&active, &mut self.sink);
                    self.execute(commands);
                    self.view.fit();
                }
                KeyCode::Char(c @ '1'..='5') => {
                    let index = c as usize - '1' as usize;
                    let commands = self
                        .dashboard
                        .set_timeframe(Timeframe::ALL[index], &mut self.sink);
                    self.execute(commands);
                    self.view.fit();
                }
                KeyCode::Char('+') | KeyCode::Char('=') => self.view.zoom_in(bars),
                KeyCode::Char('-') => self.view.zoom_out(bars),
                KeyCode::Left => self.view.scroll_left(bars),
                KeyCode::Right => self.view.scroll_right(),
                KeyCode::Char('r') | KeyCode::Char('R') => self.view.fit(),
                KeyCode::End => self.view.latest(),
                _ => {}
            },
            InputMode::AddSymbol(input) => match key.code {
                KeyCode::Esc => self.mode = InputMode::Normal,
                KeyCode::Enter => {
                    let raw = std::mem::take(input);
                    self.mode = InputMode::Normal;
                    let commands = self.dashboard.add_symbol(&raw);
                    self.execute(commands);
                }
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Char(c) if input.len() < Symbol::MAX_LEN => input.push(c),
                _ => {}
            },
            InputMode::Settings { fields, focus } => match key.code {
                KeyCode::Esc => self.mode = InputMode::Normal,
                KeyCode::Enter => {
                    let settings = settings_from_fields(fields);
                    self.mode = InputMode::Normal;
                    let commands = self.dashboard.save_settings(settings);
                    self.execute(commands);
                }
                KeyCode::Tab | KeyCode::Down => *focus = (*focus + 1) % SETTINGS_FIELDS.len(),
                KeyCode::BackTab | KeyCode::Up => {
                    *focus = (*focus + SETTINGS_FIELDS.len() - 1) % SETTINGS_FIELDS.len()
                }
                KeyCode::Backspace => {
                    fields[*focus].pop();
                }
                KeyCode::Char(c) => fields[*focus].push(c),
                _ => {}
            },
        }

        true
    }
}

// ============================================================================
// MAIN
// ============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = WatchConfig::from_env();
    init_logging(&config.log_file)?;
    let _ = default_provider().install_default();

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));

    let prefs = Preferences::new(JsonFileStore::open(&config.prefs_path));
    let dashboard = Dashboard::new(prefs, &config);
    let (runtime, mut event_rx) = Runtime::new(config.clone());

    let mut app = App {
        dashboard,
        runtime,
        sink: TerminalSink::default(),
        view: ChartView::default(),
        mode: InputMode::Normal,
    };
    let startup = app.dashboard.startup_commands();
    app.execute(startup);
    app.dashboard.refresh(&mut app.sink);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    info!(prefs = %config.prefs_path.display(), "scalp-watch started");

    let mut last_draw = Instant::now() - DRAW_INTERVAL;

    let result: Result<(), Box<dyn Error>> = loop {
        if event::poll(Duration::from_millis(5))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && !app.handle_key(key) {
                    break Ok(());
                }
            }
        }

        while let Ok(event) = event_rx.try_recv() {
            let commands = app.dashboard.apply_event(event, &mut app.sink);
            app.execute(commands);
        }

        if last_draw.elapsed() >= DRAW_INTERVAL {
            terminal.draw(|f| render_ui(f, &mut app))?;
            last_draw = Instant::now();
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    };

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    info!("scalp-watch stopped");
    result
}

/// The terminal belongs to the UI, so logs go to a file
fn init_logging(path: &Path) -> Result<(), Box<dyn Error>> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

// ============================================================================
// RENDER
// ============================================================================

fn render_ui<S: KeyValueStore>(f: &mut ratatui::Frame, app: &mut App<S>) {
    let area = f.area();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Header badges + signal line
            Constraint::Min(10),   // Watchlist | charts
            Constraint::Length(1), // Footer
        ])
        .split(area);

    render_header(f, rows[0], &app.dashboard);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(24), Constraint::Min(40)])
        .split(rows[1]);
    render_watchlist(f, body[0], &app.dashboard);

    let charts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(58), // Candles + overlays
            Constraint::Percentage(17), // Volume
            Constraint::Percentage(25), // RSI
        ])
        .split(body[1]);

    let frame = &app.sink.frame;
    let window = app.view.window(frame.candles.len());
    render_price(f, charts[0], frame, window.clone());
    render_volume(f, charts[1], &frame.volume[window.clone()]);
    render_rsi(f, charts[2], &frame.rsi[window]);

    render_footer(f, rows[2], &app.mode);

    match &app.mode {
        InputMode::Normal => {}
        InputMode::AddSymbol(input) => render_add_symbol(f, area, input),
        InputMode::Settings { fields, focus } => render_settings(f, area, fields, *focus),
    }

    if let Some(popup) = app.sink.visible_popup() {
        render_popup(f, area, popup);
    }
}

fn badge(text: String, color: Color) -> Span<'static> {
    Span::styled(
        format!(" {text} "),
        Style::default()
            .fg(color)
            .add_modifier(Modifier::BOLD),
    )
}

fn render_header<S: KeyValueStore>(f: &mut ratatui::Frame, area: Rect, dashboard: &Dashboard<S>) {
    let block = Block::default()
        .title(Span::styled(
            " SCALP WATCH ",
            Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(C_DIM));

    let status_color = match dashboard.status() {
        Some(ConnectionStatus::Connected) => C_UP,
        Some(ConnectionStatus::Disconnected) => C_DOWN,
        _ => C_DIM,
    };

    let badges = Line::from(vec![
        badge(dashboard.active().to_string(), C_BRIGHT),
        Span::raw("│"),
        badge(format!("TF: {}", dashboard.timeframe()), C_ACCENT),
        Span::raw("│"),
        badge(format!("Pulse: {}", dashboard.pulse()), C_EMA50),
        Span::raw("│"),
        badge(dashboard.status_label().to_string(), status_color),
        Span::raw("│"),
        Span::styled(" [s] Settings ", Style::default().fg(C_DIM)),
    ]);

    let signal_color = match dashboard.signal().map(|s| s.side) {
        Some(SignalSide::Long) => C_UP,
        Some(SignalSide::Short) => C_DOWN,
        _ => C_DIM,
    };
    let signal = Line::from(Span::styled(
        format!(" {}", dashboard.signal_text()),
        Style::default().fg(signal_color),
    ));

    f.render_widget(Paragraph::new(vec![badges, signal]).block(block), area);
}

fn render_watchlist<S: KeyValueStore>(
    f: &mut ratatui::Frame,
    area: Rect,
    dashboard: &Dashboard<S>,
) {
    let block = Block::default()
        .title(format!(" Watchlist ({}) ", dashboard.watchlist().len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(C_DIM));

    let items: Vec<ListItem> = dashboard
        .watchlist()
        .iter()
        .map(|symbol| {
            let is_active = symbol == dashboard.active();
            let marker = if is_active { "▶ " } else { "  " };
            let name_style = if is_active {
                Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(C_BRIGHT)
            };

            let price = match dashboard.history().last_bar(symbol) {
                Some(bar) => Span::styled(
                    format_price(bar.c),
                    Style::default().fg(if bar.is_up() { C_UP } else { C_DOWN }),
                ),
                None => Span::styled("—", Style::default().fg(C_DIM)),
            };

            let change = match dashboard.history().change_pct(symbol, CHANGE_LOOKBACK) {
                Some(pct) => Span::styled(
                    format_change(pct),
                    Style::default().fg(if pct >= 0.0 { C_UP } else { C_DOWN }),
                ),
                None => Span::styled(format_change(0.0), Style::default().fg(C_DIM)),
            };

            ListItem::new(vec![
                Line::from(vec![
                    Span::raw(marker),
                    Span::styled(format!("{:<12}", symbol.as_str()), name_style),
                    change,
                ]),
                Line::from(vec![Span::raw("  "), price]),
            ])
        })
        .collect();

    f.render_widget(List::new(items).block(block), area);
}

fn render_price(f: &mut ratatui::Frame, area: Rect, frame: &ChartFrame, window: Range<usize>) {
    let candles: &[CandlePoint] = &frame.candles[window.clone()];
    let title = match (frame.symbol.as_ref(), candles.last()) {
        (Some(symbol), Some(last)) => format!(
            " {} {} │ O {} H {} L {} C {} ",
            symbol,
            frame.timeframe,
            format_price(last.open),
            format_price(last.high),
            format_price(last.low),
            format_price(last.close),
        ),
        (Some(symbol), None) => format!(" {} {} │ waiting for data… ", symbol, frame.timeframe),
        _ => " waiting for data… ".to_string(),
    };

    let legend = Line::from(vec![
        Span::styled(" EMA9 ", Style::default().fg(C_EMA9)),
        Span::styled("EMA21 ", Style::default().fg(C_EMA21)),
        Span::styled("EMA50 ", Style::default().fg(C_EMA50)),
        Span::styled("VWAP ", Style::default().fg(C_VWAP)),
    ]);

    let block = Block::default()
        .title(title)
        .title_bottom(legend)
        .title_bottom(Line::from(time_span(candles)).right_aligned())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(C_DIM));

    if candles.is_empty() {
        f.render_widget(block, area);
        return;
    }

    let (low, high) = candles.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
        (lo.min(c.low), hi.max(c.high))
    });
    let pad = ((high - low) * 0.05).max(high.abs() * 1e-4);
    let y_bounds = [low - pad, high + pad];
    let n = candles.len() as f64;

    let overlays: [(&[LinePoint], Color); 4] = [
        (&frame.ema9[window.clone()], C_EMA9),
        (&frame.ema21[window.clone()], C_EMA21),
        (&frame.ema50[window.clone()], C_EMA50),
        (&frame.vwap[window], C_VWAP),
    ];

    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .x_bounds([-1.0, n])
        .y_bounds(y_bounds)
        .paint(|ctx| {
            for (i, candle) in candles.iter().enumerate() {
                let x = i as f64;
                let color = if candle.close >= candle.open { C_UP } else { C_DOWN };
                ctx.draw(&CanvasLine::new(x, candle.low, x, candle.high, color));
                for dx in [-0.25, 0.25] {
                    ctx.draw(&CanvasLine::new(x + dx, candle.open, x + dx, candle.close, color));
                }
            }
            ctx.layer();
            for (series, color) in &overlays {
                for (i, pair) in series.windows(2).enumerate() {
                    ctx.draw(&CanvasLine::new(
                        i as f64,
                        pair[0].value,
                        i as f64 + 1.0,
                        pair[1].value,
                        *color,
                    ));
                }
            }
        });

    f.render_widget(canvas, area);
}

fn render_volume(f: &mut ratatui::Frame, area: Rect, volume: &[VolumePoint]) {
    let max = volume.iter().map(|v| v.value).fold(0.0, f64::max);
    let block = Block::default()
        .title(format!(" Volume │ max {} ", format_volume(max)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(C_DIM));

    let n = volume.len() as f64;
    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::HalfBlock)
        .x_bounds([-1.0, n.max(1.0)])
        .y_bounds([0.0, max.max(1e-9)])
        .paint(|ctx| {
            for (i, column) in volume.iter().enumerate() {
                let color = if column.up { C_VOL_UP } else { C_VOL_DOWN };
                ctx.draw(&CanvasLine::new(i as f64, 0.0, i as f64, column.value, color));
            }
        });

    f.render_widget(canvas, area);
}

fn render_rsi(f: &mut ratatui::Frame, area: Rect, rsi: &[LinePoint]) {
    let data: Vec<(f64, f64)> = rsi
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.value))
        .collect();
    let x_max = (data.len() as f64 - 1.0).max(1.0);
    let overbought = [(0.0, 70.0), (x_max, 70.0)];
    let oversold = [(0.0, 30.0), (x_max, 30.0)];

    let title = match rsi.last() {
        Some(last) => format!(" RSI 14 │ {:.1} ", last.value),
        None => " RSI 14 ".to_string(),
    };

    let datasets = vec![
        Dataset::default()
            .marker(Marker::Dot)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(C_DIM))
            .data(&overbought),
        Dataset::default()
            .marker(Marker::Dot)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(C_DIM))
            .data(&oversold),
        Dataset::default()
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(C_RSI))
            .data(&data),
    ];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(C_DIM)),
        )
        .x_axis(Axis::default().bounds([0.0, x_max]))
        .y_axis(
            Axis::default()
                .style(Style::default().fg(C_DIM))
                .bounds([0.0, 100.0])
                .labels(vec![Span::raw("0"), Span::raw("50"), Span::raw("100")]),
        );

    f.render_widget(chart, area);
}

fn render_footer(f: &mut ratatui::Frame, area: Rect, mode: &InputMode) {
    let help = match mode {
        InputMode::Normal => {
            " [↑↓/Tab] Symbol  [a] Add  [x] Remove  [1-5] TF  [+/-] Zoom  [←→] Scroll  [r] Fit  [End] Latest  [s] Settings  [q] Quit"
        }
        InputMode::AddSymbol(_) => " [Enter] Add  [Esc] Cancel",
        InputMode::Settings { .. } => " [Tab/↑↓] Field  [Enter] Save  [Esc] Close",
    };
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(help, Style::default().fg(C_DIM)))),
        area,
    );
}

fn render_add_symbol(f: &mut ratatui::Frame, area: Rect, input: &str) {
    let rect = centered(area, 40, 3);
    let block = Block::default()
        .title(" Add symbol (e.g. BTCUSDT) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(C_ACCENT));

    f.render_widget(Clear, rect);
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(input.to_uppercase(), Style::default().fg(C_BRIGHT)),
            Span::styled("█", Style::default().fg(C_ACCENT)),
        ]))
        .block(block),
        rect,
    );
}

fn render_settings(f: &mut ratatui::Frame, area: Rect, fields: &[String; 3], focus: usize) {
    let rect = centered(area, 60, 9);
    let block = Block::default()
        .title(" Settings ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(C_ACCENT));

    let mut lines: Vec<Line> = SETTINGS_FIELDS
        .iter()
        .zip(fields.iter())
        .enumerate()
        .map(|(i, (label, value))| {
            let focused = i == focus;
            let label_style = if focused {
                Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(C_DIM)
            };
            Line::from(vec![
                Span::styled(format!("{label:<20}"), label_style),
                Span::styled(mask(value), Style::default().fg(C_BRIGHT)),
                Span::raw(if focused { "█" } else { "" }),
            ])
        })
        .collect();
    lines.push(Line::raw(""));
    lines.push(Line::from(Span::styled(
        "Keys are stored locally only.",
        Style::default().fg(C_DIM),
    )));

    f.render_widget(Clear, rect);
    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        rect,
    );
}

fn render_popup(f: &mut ratatui::Frame, area: Rect, popup: &Notification) {
    let width = (popup.message.chars().count() as u16 + 6).max(30);
    let rect = centered(area, width, 3);
    let block = Block::default()
        .title(format!(" {} ", popup.title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(C_EMA50));

    f.render_widget(Clear, rect);
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            popup.message.as_str(),
            Style::default().fg(C_BRIGHT).add_modifier(Modifier::BOLD),
        )))
        .block(block)
        .centered(),
        rect,
    );
}

// ============================================================================
// HELPERS
// ============================================================================

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Show only the tail of a secret
fn mask(value: &str) -> String {
    let len = value.chars().count();
    if len <= 4 {
        return value.to_string();
    }
    let tail: String = value.chars().skip(len - 4).collect();
    format!("{}{}", "•".repeat((len - 4).min(16)), tail)
}

fn format_price(price: f64) -> String {
    match price.abs() {
        p if p >= 1000.0 => format!("{price:.2}"),
        p if p >= 1.0 => format!("{price:.4}"),
        p if p >= 0.01 => format!("{price:.5}"),
        _ => format!("{price:.8}"),
    }
}

/// Signed percent, eg/ `+1.25%` or `-0.40%`
fn format_change(pct: f64) -> String {
    format!("{pct:+.2}%")
}

fn format_volume(volume: f64) -> String {
    match volume {
        v if v >= 1e9 => format!("{:.2}B", v / 1e9),
        v if v >= 1e6 => format!("{:.2}M", v / 1e6),
        v if v >= 1e3 => format!("{:.1}K", v / 1e3),
        v => format!("{v:.2}"),
    }
}

fn time_span(candles: &[CandlePoint]) -> String {
    let format = |time: i64| {
        chrono::DateTime::from_timestamp(time, 0)
            .map(|dt| dt.format("%m-%d %H:%M").to_string())
            .unwrap_or_default()
    };
    match (candles.first(), candles.last()) {
        (Some(first), Some(last)) => format!(" {} → {} UTC ", format(first.time), format(last.time)),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_view_window() {
        struct TestCase {
            view: ChartView,
            len: usize,
            expected: Range<usize>,
        }

        let tests = vec![
            TestCase {
                // TC0: fit shows everything
                view: ChartView::default(),
                len: 100,
                expected: 0..100,
            },
            TestCase {
                // TC1: zoomed, pinned to latest
                view: ChartView { visible: Some(40), offset: 0 },
                len: 100,
                expected: 60..100,
            },
            TestCase {
                // TC2: zoomed and scrolled back
                view: ChartView { visible: Some(40), offset: 30 },
                len: 100,
                expected: 30..70,
            },
            TestCase {
                // TC3: offset past the start is clamped
                view: ChartView { visible: Some(40), offset: 500 },
                len: 100,
                expected: 0..40,
            },
            TestCase {
                // TC4: fewer bars than the zoom level
                view: ChartView { visible: Some(40), offset: 10 },
                len: 25,
                expected: 0..25,
            },
            TestCase {
                // TC5: empty history
                view: ChartView { visible: Some(40), offset: 10 },
                len: 0,
                expected: 0..0,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(test.view.window(test.len), test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_zoom_and_scroll() {
        let mut view = ChartView::default();

        view.zoom_in(100);
        assert_eq!(view.visible, Some(80));

        view.scroll_left(100);
        assert_eq!(view.offset, 20);
        assert_eq!(view.window(100), 0..80);

        view.scroll_right();
        assert_eq!(view.offset, 0);

        view.zoom_out(100);
        assert_eq!(view.visible, None);

        for _ in 0..10 {
            view.zoom_in(100);
        }
        assert_eq!(view.visible, Some(MIN_VISIBLE_BARS));

        view.scroll_left(100);
        view.latest();
        assert_eq!(view.offset, 0);

        view.fit();
        assert_eq!(view, ChartView::default());
    }

    #[test]
    fn test_settings_from_fields() {
        let settings = settings_from_fields(&[
            " 123:abc ".to_string(),
            String::new(),
            "sk-test".to_string(),
        ]);
        assert_eq!(settings.tg_token.as_deref(), Some("123:abc"));
        assert_eq!(settings.tg_chat_id, None);
        assert_eq!(settings.openai_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_mask_and_formatting() {
        assert_eq!(mask("abc"), "abc");
        assert_eq!(mask("123456"), "••3456");
        assert_eq!(format_price(65_000.123), "65000.12");
        assert_eq!(format_price(0.00001234), "0.00001234");
        assert_eq!(format_volume(2_500_000.0), "2.50M");
        assert_eq!(format_change(1.254), "+1.25%");
        assert_eq!(format_change(0.0), "+0.00%");
        assert_eq!(format_change(-0.4), "-0.40%");
    }
}
