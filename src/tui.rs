use std::time::{Duration, Instant};

use color_eyre::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Chart, Clear, Dataset, GraphType, Paragraph, Wrap};
use tokio::sync::{broadcast, mpsc};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::command::{
    BotRow, ChartSeries, Command, EquityPoint, MarketCandle, SimulationStats, StatCard,
    TradeLogRecord, UiRequest,
};
use crate::view;

const MAX_TRADE_LOG_ROWS: usize = 500;
const MAX_MARKET_ROWS: usize = 500;
const MAX_STAT_CARDS: usize = 4;
const PENDING_MARKER: char = '*';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Page {
    Chart,
    Bots,
    Dashboard,
    Logs,
    Market,
}

impl Page {
    const ALL: [Page; 5] = [
        Page::Chart,
        Page::Bots,
        Page::Dashboard,
        Page::Logs,
        Page::Market,
    ];

    fn title(&self) -> &'static str {
        match self {
            Page::Chart => "Chart",
            Page::Bots => "Active Bots",
            Page::Dashboard => "Dashboard",
            Page::Logs => "Trade Logs",
            Page::Market => "Market Data",
        }
    }

    fn next(&self) -> Page {
        let idx = Page::ALL.iter().position(|page| page == self).unwrap_or(0);
        Page::ALL[(idx + 1) % Page::ALL.len()]
    }
}

pub struct TuiApp {
    page: Page,
    req_tx: mpsc::Sender<UiRequest>,

    symbol: String,
    symbol_input: Option<String>,
    chart: Option<ChartSeries>,
    stats: Option<SimulationStats>,
    chart_loading: bool,

    bots: Vec<BotRow>,
    selected_bot: usize,
    bots_loaded: bool,

    summary: Vec<StatCard>,
    equity: Vec<EquityPoint>,
    dashboard_loading: bool,
    dashboard_loaded: bool,

    trade_logs: Vec<TradeLogRecord>,
    selected_log: usize,
    logs_loading: bool,
    logs_loaded: bool,
    log_view_height: u16,

    ticker: String,
    candles: Vec<MarketCandle>,
    selected_candle: usize,
    market_loading: bool,
    market_loaded: bool,
    market_view_height: u16,
    bot_view_height: u16,

    status_message: Option<String>,
    status_visible_until: Option<Instant>,
    status_is_error: bool,
    exit_confirmation: bool,
    last_draw: Instant,
    min_redraw_gap: Duration,
}

impl TuiApp {
    pub fn new(symbol: &str, ticker: &str, req_tx: mpsc::Sender<UiRequest>) -> TuiApp {
        let min_redraw_gap = Duration::from_millis(100);
        TuiApp {
            page: Page::Chart,
            req_tx,
            symbol: symbol.to_string(),
            symbol_input: None,
            chart: None,
            stats: None,
            chart_loading: false,
            bots: Vec::new(),
            selected_bot: 0,
            bots_loaded: false,
            summary: Vec::new(),
            equity: Vec::new(),
            dashboard_loading: false,
            dashboard_loaded: false,
            trade_logs: Vec::new(),
            selected_log: 0,
            logs_loading: false,
            logs_loaded: false,
            log_view_height: 0,
            ticker: ticker.to_string(),
            candles: Vec::new(),
            selected_candle: 0,
            market_loading: false,
            market_loaded: false,
            market_view_height: 0,
            bot_view_height: 0,
            status_message: None,
            status_visible_until: None,
            status_is_error: false,
            exit_confirmation: false,
            last_draw: Instant::now() - min_redraw_gap,
            min_redraw_gap,
        }
    }

    /// Kicks off the chart page load; the bot list arrives on its own
    /// from the controller's startup refresh.
    pub fn request_initial_data(&mut self) {
        self.load_chart();
    }

    pub fn dispose(&self) {
        ratatui::restore();
    }

    pub async fn run(&mut self, rx: &mut broadcast::Receiver<Command>) -> Result<()> {
        color_eyre::install()?;
        let mut terminal = ratatui::init();
        let mut input_tick = tokio::time::interval(self.min_redraw_gap);
        terminal.draw(|frame| self.render(frame))?;
        self.last_draw = Instant::now();
        loop {
            tokio::select! {
                biased;
                _ = input_tick.tick() => {
                    if self.poll_input()? {
                        return Ok(());
                    }
                    if self.last_draw.elapsed() >= self.min_redraw_gap {
                        terminal.draw(|frame| self.render(frame))?;
                        self.last_draw = Instant::now();
                    }
                }
                result = rx.recv() => {
                    match result {
                        Ok(command) => {
                            self.apply_command(command);
                            terminal.draw(|frame| self.render(frame))?;
                            self.last_draw = Instant::now();
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    }
                }
            }
        }
        Ok(())
    }

    fn apply_command(&mut self, command: Command) {
        match command {
            Command::BotsUpdated(rows) => {
                self.bots = rows;
                self.bots_loaded = true;
                self.selected_bot = clamp_index(self.selected_bot, self.bots.len());
            }
            Command::ChartLoaded(series) => {
                self.chart = Some(series);
                self.chart_loading = false;
            }
            Command::SimulationLoaded(stats) => {
                self.stats = Some(stats);
            }
            Command::SummaryLoaded(cards) => {
                self.summary = cards;
                self.dashboard_loading = false;
                self.dashboard_loaded = true;
            }
            Command::EquityLoaded(curve) => {
                self.equity = curve;
                self.dashboard_loading = false;
                self.dashboard_loaded = true;
            }
            Command::TradeLogsLoaded(logs) => {
                self.trade_logs = logs;
                self.logs_loading = false;
                self.logs_loaded = true;
                self.selected_log = clamp_index(self.selected_log, self.trade_logs.len());
            }
            Command::MarketLoaded(candles) => {
                self.candles = candles;
                self.market_loading = false;
                self.market_loaded = true;
                self.selected_candle = clamp_index(self.selected_candle, self.candles.len());
            }
            Command::Notice(message) => {
                self.set_status_message(message);
            }
            Command::Error(message) => {
                self.chart_loading = false;
                self.dashboard_loading = false;
                self.logs_loading = false;
                self.market_loading = false;
                self.set_error_status_message(message);
            }
        }
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_visible_until = Some(Instant::now() + Duration::from_secs(3));
        self.status_is_error = false;
    }

    fn set_error_status_message(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_visible_until = Some(Instant::now() + Duration::from_secs(5));
        self.status_is_error = true;
    }

    fn clear_status_if_allowed(&mut self) {
        if let Some(visible_until) = self.status_visible_until {
            if Instant::now() < visible_until {
                return;
            }
        }
        self.status_message = None;
        self.status_visible_until = None;
        self.status_is_error = false;
    }

    fn send_request(&mut self, request: UiRequest) {
        if self.req_tx.try_send(request).is_err() {
            self.set_error_status_message("controller is busy; try again shortly");
        }
    }

    fn load_chart(&mut self) {
        self.chart_loading = true;
        self.stats = None;
        let symbol = self.symbol.clone();
        self.send_request(UiRequest::LoadChart { symbol });
    }

    fn set_page(&mut self, page: Page) {
        if self.page == page {
            return;
        }
        self.page = page;
        match page {
            Page::Chart => {
                if self.chart.is_none() && !self.chart_loading {
                    self.load_chart();
                }
            }
            Page::Bots => {}
            Page::Dashboard => {
                if !self.dashboard_loaded && !self.dashboard_loading {
                    self.dashboard_loading = true;
                    self.send_request(UiRequest::LoadDashboard);
                }
            }
            Page::Logs => {
                if !self.logs_loaded && !self.logs_loading {
                    self.logs_loading = true;
                    self.send_request(UiRequest::LoadTradeLogs);
                }
            }
            Page::Market => {
                if !self.market_loaded && !self.market_loading {
                    self.market_loading = true;
                    let ticker = self.ticker.clone();
                    self.send_request(UiRequest::LoadMarket { ticker });
                }
            }
        }
    }

    fn reload_current_page(&mut self) {
        match self.page {
            Page::Chart => self.load_chart(),
            Page::Bots => self.send_request(UiRequest::RefreshBots),
            Page::Dashboard => {
                self.dashboard_loading = true;
                self.send_request(UiRequest::LoadDashboard);
            }
            Page::Logs => {
                self.logs_loading = true;
                self.send_request(UiRequest::LoadTradeLogs);
            }
            Page::Market => {
                self.market_loading = true;
                let ticker = self.ticker.clone();
                self.send_request(UiRequest::LoadMarket { ticker });
            }
        }
    }

    fn toggle_selected_bot(&mut self) {
        let Some(row) = self.bots.get(self.selected_bot) else {
            self.set_error_status_message("no bot selected");
            return;
        };
        if row.pending {
            self.set_status_message(format!(
                "Bot {} is still waiting for confirmation",
                row.bot.id
            ));
            return;
        }
        // The toggle is computed from the displayed status here, never in
        // the dispatcher, so a retry cannot double-toggle.
        let desired = view::desired_status(row.bot.status);
        let id = row.bot.id;
        let label = view::action_label(row.bot.status);
        self.set_status_message(format!("{label} requested for bot {id} ({})", row.bot.strategy));
        self.send_request(UiRequest::ControlBot { id, desired });
    }

    // --- input -----------------------------------------------------------

    fn poll_input(&mut self) -> Result<bool> {
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if self.handle_key_event(key)? {
                        return Ok(true);
                    }
                }
                _ => {}
            }
        }
        Ok(false)
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<bool> {
        if self.exit_confirmation {
            return self.handle_exit_confirmation_key(key);
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if let KeyCode::Char('c') = key.code {
                self.prompt_exit_confirmation();
                return Ok(false);
            }
        }
        if self.symbol_input.is_some() {
            self.handle_symbol_input_key(key);
            return Ok(false);
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.prompt_exit_confirmation();
            }
            KeyCode::Tab => {
                let next = self.page.next();
                self.set_page(next);
            }
            KeyCode::Char('1') => self.set_page(Page::Chart),
            KeyCode::Char('2') => self.set_page(Page::Bots),
            KeyCode::Char('3') => self.set_page(Page::Dashboard),
            KeyCode::Char('4') => self.set_page(Page::Logs),
            KeyCode::Char('5') => self.set_page(Page::Market),
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.reload_current_page();
            }
            _ => match self.page {
                Page::Chart => self.handle_chart_key(key),
                Page::Bots => self.handle_bots_key(key),
                Page::Logs => self.handle_logs_key(key),
                Page::Market => self.handle_market_key(key),
                Page::Dashboard => {}
            },
        }
        Ok(false)
    }

    fn prompt_exit_confirmation(&mut self) {
        if self.exit_confirmation {
            return;
        }
        self.exit_confirmation = true;
        self.set_status_message("Quit? Y/Enter to confirm, N/Esc to cancel");
    }

    fn handle_exit_confirmation_key(&mut self, key: KeyEvent) -> Result<bool> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if let KeyCode::Char('c') = key.code {
                self.exit_confirmation = false;
                return Ok(true);
            }
        }
        match key.code {
            KeyCode::Char('y')
            | KeyCode::Char('Y')
            | KeyCode::Char('q')
            | KeyCode::Char('Q')
            | KeyCode::Enter => {
                self.exit_confirmation = false;
                Ok(true)
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.exit_confirmation = false;
                self.set_status_message("Exit cancelled");
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    fn handle_chart_key(&mut self, key: KeyEvent) {
        if let KeyCode::Char('s') | KeyCode::Char('S') = key.code {
            self.symbol_input = Some(self.symbol.clone());
        }
    }

    fn handle_symbol_input_key(&mut self, key: KeyEvent) {
        let Some(input) = self.symbol_input.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Enter => {
                let entered = input.trim().to_uppercase();
                self.symbol_input = None;
                if entered.is_empty() {
                    self.set_error_status_message("symbol cannot be empty");
                    return;
                }
                self.symbol = entered;
                self.load_chart();
            }
            KeyCode::Esc => {
                self.symbol_input = None;
                self.set_status_message("Symbol change cancelled");
            }
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(ch) if !ch.is_control() => {
                input.push(ch);
            }
            _ => {}
        }
    }

    fn handle_bots_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_bot = self.selected_bot.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if !self.bots.is_empty() {
                    self.selected_bot = (self.selected_bot + 1).min(self.bots.len() - 1);
                }
            }
            KeyCode::PageUp => {
                let page = self.bot_view_height.max(1) as usize;
                self.selected_bot = self.selected_bot.saturating_sub(page);
            }
            KeyCode::PageDown => {
                if !self.bots.is_empty() {
                    let page = self.bot_view_height.max(1) as usize;
                    self.selected_bot = (self.selected_bot + page).min(self.bots.len() - 1);
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                self.toggle_selected_bot();
            }
            _ => {}
        }
    }

    fn handle_logs_key(&mut self, key: KeyEvent) {
        let len = self.trade_logs.len().min(MAX_TRADE_LOG_ROWS);
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_log = self.selected_log.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if len > 0 {
                    self.selected_log = (self.selected_log + 1).min(len - 1);
                }
            }
            KeyCode::PageUp => {
                let page = self.log_view_height.max(1) as usize;
                self.selected_log = self.selected_log.saturating_sub(page);
            }
            KeyCode::PageDown => {
                if len > 0 {
                    let page = self.log_view_height.max(1) as usize;
                    self.selected_log = (self.selected_log + page).min(len - 1);
                }
            }
            _ => {}
        }
    }

    fn handle_market_key(&mut self, key: KeyEvent) {
        let len = self.candles.len().min(MAX_MARKET_ROWS);
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_candle = self.selected_candle.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if len > 0 {
                    self.selected_candle = (self.selected_candle + 1).min(len - 1);
                }
            }
            KeyCode::PageUp => {
                let page = self.market_view_height.max(1) as usize;
                self.selected_candle = self.selected_candle.saturating_sub(page);
            }
            KeyCode::PageDown => {
                if len > 0 {
                    let page = self.market_view_height.max(1) as usize;
                    self.selected_candle = (self.selected_candle + page).min(len - 1);
                }
            }
            _ => {}
        }
    }

    // --- rendering -------------------------------------------------------

    fn render(&mut self, frame: &mut Frame) {
        self.clear_status_if_allowed();
        let area = frame.area();
        let has_status = self.status_message.is_some() && area.height >= 7;
        let constraints = if has_status {
            vec![
                Constraint::Length(1),
                Constraint::Min(4),
                Constraint::Length(3),
            ]
        } else {
            vec![Constraint::Length(1), Constraint::Min(4)]
        };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);
        self.render_tabs(frame, chunks[0]);
        let content = chunks[1];
        match self.page {
            Page::Chart => self.render_chart_page(frame, content),
            Page::Bots => self.render_bots_page(frame, content),
            Page::Dashboard => self.render_dashboard_page(frame, content),
            Page::Logs => self.render_logs_page(frame, content),
            Page::Market => self.render_market_page(frame, content),
        }
        if has_status {
            self.render_status(frame, chunks[2]);
        }
        if let Some(input) = self.symbol_input.clone() {
            self.render_symbol_dialog(frame, content, &input);
        }
        if self.exit_confirmation {
            self.render_exit_confirmation(frame);
        }
    }

    fn render_tabs(&self, frame: &mut Frame, area: Rect) {
        let mut spans = Vec::new();
        for (idx, page) in Page::ALL.iter().enumerate() {
            let label = format!(" {} {} ", idx + 1, page.title());
            let style = if *page == self.page {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            spans.push(Span::styled(label, style));
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(
            " Tab switch · R reload · Q quit",
            Style::default().fg(Color::DarkGray),
        ));
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        if let Some(message) = &self.status_message {
            let color = if self.status_is_error {
                Color::Red
            } else {
                Color::Yellow
            };
            let block = Block::bordered().title("Status");
            let status = Paragraph::new(message.as_str())
                .style(Style::default().fg(color))
                .alignment(Alignment::Left)
                .block(block);
            frame.render_widget(status, area);
        }
    }

    fn render_chart_page(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(3)])
            .split(area);
        self.render_stats_strip(frame, chunks[0]);
        self.render_price_chart(frame, chunks[1]);
    }

    fn render_stats_strip(&self, frame: &mut Frame, area: Rect) {
        let block = Block::bordered().title("Strategy Stats");
        let mut spans = vec![
            Span::raw("Asset "),
            Span::styled(
                self.symbol.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("   Total Return "),
        ];
        match &self.stats {
            Some(stats) => {
                spans.push(Span::styled(
                    format!("{:+.2}%", stats.total_return),
                    Style::default().fg(view::pnl_color(stats.total_return)),
                ));
                spans.push(Span::raw("   Win Rate "));
                spans.push(Span::styled(
                    format!("{:.1}%", stats.win_rate),
                    Style::default().fg(Color::Cyan),
                ));
                spans.push(Span::raw("   Trades "));
                spans.push(Span::raw(stats.total_trades.to_string()));
                spans.push(Span::raw("   Status "));
                spans.push(Span::styled(
                    "ACTIVE",
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                ));
            }
            None => {
                spans.push(Span::raw("--   Win Rate --   Trades --   Status "));
                spans.push(Span::styled("READY", Style::default().fg(Color::Gray)));
            }
        }
        let hint = Line::from(Span::styled(
            "S change symbol · R rerun",
            Style::default().fg(Color::DarkGray),
        ));
        let paragraph = Paragraph::new(vec![Line::from(spans), hint]).block(block);
        frame.render_widget(paragraph, area);
    }

    fn render_price_chart(&self, frame: &mut Frame, area: Rect) {
        let Some(series) = &self.chart else {
            let message = if self.chart_loading {
                format!("Loading chart data for {}...", self.symbol)
            } else {
                "No chart data loaded. Press R to load.".to_string()
            };
            let block = Block::bordered().title(format!("{} Price", self.symbol));
            let paragraph = Paragraph::new(message)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(block);
            frame.render_widget(paragraph, area);
            return;
        };
        let points = view::chart_points(series);
        let up = view::trend_up(&series.prices);
        let color = view::trend_color(up);
        let x_max = (points.len().saturating_sub(1)).max(1) as f64;
        let x_labels = axis_labels(&series.dates);
        let y_bounds = view::value_bounds(&points);
        let y_mid = (y_bounds[0] + y_bounds[1]) / 2.0;
        let y_labels = vec![
            Span::styled(
                format!("{:.2}", y_bounds[0]),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("{y_mid:.2}")),
            Span::styled(
                format!("{:.2}", y_bounds[1]),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ];
        let trend_label = if up { "▲ up" } else { "▼ down" };
        let title = Line::from(vec![
            Span::styled(
                format!("{} Price ", series.symbol),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(trend_label, Style::default().fg(color)),
        ]);
        let datasets = vec![
            Dataset::default()
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(color))
                .data(&points),
        ];
        let chart = Chart::new(datasets)
            .block(Block::bordered().title(title))
            .x_axis(
                Axis::default()
                    .style(Style::default().fg(Color::Gray))
                    .labels(x_labels)
                    .labels_alignment(Alignment::Left)
                    .bounds([0.0, x_max]),
            )
            .y_axis(
                Axis::default()
                    .style(Style::default().fg(Color::Gray))
                    .labels(y_labels)
                    .bounds(y_bounds),
            );
        frame.render_widget(chart, area);
    }

    fn render_bots_page(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::bordered().title("Active Trading Bots");
        if area.height < 3 {
            frame.render_widget(block, area);
            self.bot_view_height = 1;
            return;
        }
        let inner_height = area.height.saturating_sub(2) as usize;
        let list_visible = inner_height.saturating_sub(2);
        self.bot_view_height = list_visible.max(1).min(u16::MAX as usize) as u16;
        let mut lines = Vec::new();
        if self.bots.is_empty() {
            let text = if self.bots_loaded {
                "No active bots"
            } else {
                "Waiting for bot list..."
            };
            lines.push(Line::from(text));
        } else if list_visible == 0 {
            lines.push(Line::from("Window too small to list bots"));
        } else {
            lines.push(Line::from(format_columns(&[
                ("ID", ColumnAlign::Right, 4),
                ("Strategy", ColumnAlign::Left, 22),
                ("Pair", ColumnAlign::Left, 12),
                ("Status", ColumnAlign::Left, 9),
                ("PnL", ColumnAlign::Right, 12),
                ("Trades", ColumnAlign::Right, 8),
                ("Action", ColumnAlign::Left, 7),
            ])));
            let selected_idx = clamp_index(self.selected_bot, self.bots.len());
            let (start, end) = visible_range(self.bots.len(), list_visible, selected_idx);
            for (idx, row) in self
                .bots
                .iter()
                .enumerate()
                .skip(start)
                .take(end.saturating_sub(start))
            {
                let selected = idx == selected_idx;
                lines.push(bot_row_line(row, selected));
            }
            lines.push(Line::from(Span::styled(
                format!(
                    "Enter toggle · {PENDING_MARKER} awaiting confirmation · {} bot(s)",
                    self.bots.len()
                ),
                Style::default().fg(Color::DarkGray),
            )));
        }
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .block(block);
        frame.render_widget(paragraph, area);
    }

    fn render_dashboard_page(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(3)])
            .split(area);
        self.render_stat_cards(frame, chunks[0]);
        self.render_equity_chart(frame, chunks[1]);
    }

    fn render_stat_cards(&self, frame: &mut Frame, area: Rect) {
        if self.summary.is_empty() {
            let message = if self.dashboard_loading {
                "Loading portfolio summary..."
            } else {
                "No summary data. Press R to load."
            };
            let paragraph = Paragraph::new(message)
                .alignment(Alignment::Center)
                .block(Block::bordered().title("Portfolio"));
            frame.render_widget(paragraph, area);
            return;
        }
        let cards: Vec<&StatCard> = self.summary.iter().take(MAX_STAT_CARDS).collect();
        let constraints: Vec<Constraint> = cards
            .iter()
            .map(|_| Constraint::Ratio(1, cards.len() as u32))
            .collect();
        let slots = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(area);
        for (card, slot) in cards.iter().zip(slots.iter()) {
            let change_color = if card.is_positive {
                view::UP_COLOR
            } else {
                view::DOWN_COLOR
            };
            let lines = vec![
                Line::from(Span::styled(
                    card.value.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    card.change.clone(),
                    Style::default().fg(change_color),
                )),
            ];
            let paragraph = Paragraph::new(lines)
                .alignment(Alignment::Center)
                .block(Block::bordered().title(card.title.clone()));
            frame.render_widget(paragraph, *slot);
        }
    }

    fn render_equity_chart(&self, frame: &mut Frame, area: Rect) {
        if self.equity.is_empty() {
            let paragraph = Paragraph::new("No equity data")
                .alignment(Alignment::Center)
                .block(Block::bordered().title("Equity Curve"));
            frame.render_widget(paragraph, area);
            return;
        }
        let points = view::equity_points(&self.equity);
        let values: Vec<f64> = self.equity.iter().map(|point| point.value).collect();
        let color = view::trend_color(view::trend_up(&values));
        let days: Vec<String> = self.equity.iter().map(|point| point.day.clone()).collect();
        let x_labels = axis_labels(&days);
        let x_max = (points.len().saturating_sub(1)).max(1) as f64;
        let y_bounds = view::value_bounds(&points);
        let y_labels = vec![
            Span::raw(format!("{:.0}", y_bounds[0])),
            Span::raw(format!("{:.0}", (y_bounds[0] + y_bounds[1]) / 2.0)),
            Span::raw(format!("{:.0}", y_bounds[1])),
        ];
        let datasets = vec![
            Dataset::default()
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(color))
                .data(&points),
        ];
        let chart = Chart::new(datasets)
            .block(Block::bordered().title("Equity Curve"))
            .x_axis(
                Axis::default()
                    .style(Style::default().fg(Color::Gray))
                    .labels(x_labels)
                    .labels_alignment(Alignment::Left)
                    .bounds([0.0, x_max]),
            )
            .y_axis(
                Axis::default()
                    .style(Style::default().fg(Color::Gray))
                    .labels(y_labels)
                    .bounds(y_bounds),
            );
        frame.render_widget(chart, area);
    }

    fn render_logs_page(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::bordered().title(format!(
            "Trade Logs ({} total)",
            self.trade_logs.len()
        ));
        if area.height < 3 {
            frame.render_widget(block, area);
            self.log_view_height = 1;
            return;
        }
        let inner_height = area.height.saturating_sub(2) as usize;
        let list_visible = inner_height.saturating_sub(1);
        self.log_view_height = list_visible.max(1).min(u16::MAX as usize) as u16;
        let mut lines = Vec::new();
        let display_len = self.trade_logs.len().min(MAX_TRADE_LOG_ROWS);
        if display_len == 0 {
            let text = if self.logs_loading {
                "Loading trade logs..."
            } else {
                "No trades recorded"
            };
            lines.push(Line::from(text));
        } else if list_visible == 0 {
            lines.push(Line::from("Window too small to list trades"));
        } else {
            lines.push(Line::from(format_columns(&[
                ("ID", ColumnAlign::Right, 5),
                ("Time", ColumnAlign::Left, 20),
                ("Pair", ColumnAlign::Left, 12),
                ("Type", ColumnAlign::Left, 6),
                ("Price", ColumnAlign::Right, 12),
                ("Qty", ColumnAlign::Right, 10),
                ("PnL (USD)", ColumnAlign::Right, 12),
            ])));
            let selected_idx = clamp_index(self.selected_log, display_len);
            let (start, end) = visible_range(display_len, list_visible, selected_idx);
            for (idx, log) in self
                .trade_logs
                .iter()
                .take(display_len)
                .enumerate()
                .skip(start)
                .take(end.saturating_sub(start))
            {
                let row = format_columns(&[
                    (log.id.to_string().as_str(), ColumnAlign::Right, 5),
                    (log.time.as_str(), ColumnAlign::Left, 20),
                    (log.pair.as_str(), ColumnAlign::Left, 12),
                    (log.kind.as_str(), ColumnAlign::Left, 6),
                    (format!("{:.2}", log.price).as_str(), ColumnAlign::Right, 12),
                    (format!("{:.3}", log.qty).as_str(), ColumnAlign::Right, 10),
                    (format!("{:+.2}", log.pnl).as_str(), ColumnAlign::Right, 12),
                ]);
                let style = if idx == selected_idx {
                    row_style(true)
                } else {
                    Style::default().fg(view::pnl_color(log.pnl))
                };
                lines.push(Line::styled(row, style));
            }
        }
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .block(block);
        frame.render_widget(paragraph, area);
    }

    fn render_market_page(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::bordered().title(format!("Market History ({})", self.ticker));
        if area.height < 3 {
            frame.render_widget(block, area);
            self.market_view_height = 1;
            return;
        }
        let inner_height = area.height.saturating_sub(2) as usize;
        let list_visible = inner_height.saturating_sub(1);
        self.market_view_height = list_visible.max(1).min(u16::MAX as usize) as u16;
        let mut lines = Vec::new();
        let display_len = self.candles.len().min(MAX_MARKET_ROWS);
        if display_len == 0 {
            let text = if self.market_loading {
                "Loading market history..."
            } else {
                "No market data"
            };
            lines.push(Line::from(text));
        } else if list_visible == 0 {
            lines.push(Line::from("Window too small to list candles"));
        } else {
            lines.push(Line::from(format_columns(&[
                ("Timestamp", ColumnAlign::Left, 20),
                ("Open", ColumnAlign::Right, 12),
                ("High", ColumnAlign::Right, 12),
                ("Low", ColumnAlign::Right, 12),
                ("Close", ColumnAlign::Right, 12),
                ("Volume", ColumnAlign::Right, 14),
            ])));
            let selected_idx = clamp_index(self.selected_candle, display_len);
            let (start, end) = visible_range(display_len, list_visible, selected_idx);
            for (idx, candle) in self
                .candles
                .iter()
                .take(display_len)
                .enumerate()
                .skip(start)
                .take(end.saturating_sub(start))
            {
                let row = format_columns(&[
                    (candle.timestamp.as_str(), ColumnAlign::Left, 20),
                    (format!("{:.2}", candle.open).as_str(), ColumnAlign::Right, 12),
                    (format!("{:.2}", candle.high).as_str(), ColumnAlign::Right, 12),
                    (format!("{:.2}", candle.low).as_str(), ColumnAlign::Right, 12),
                    (format!("{:.2}", candle.close).as_str(), ColumnAlign::Right, 12),
                    (
                        format!("{:.0}", candle.volume).as_str(),
                        ColumnAlign::Right,
                        14,
                    ),
                ]);
                lines.push(Line::styled(row, row_style(idx == selected_idx)));
            }
        }
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .block(block);
        frame.render_widget(paragraph, area);
    }

    fn render_symbol_dialog(&self, frame: &mut Frame, area: Rect, input: &str) {
        if area.width < 30 || area.height < 5 {
            return;
        }
        let popup_width = area.width.saturating_sub(10).min(44).max(30);
        let popup_height = 5;
        let left = area.x + (area.width.saturating_sub(popup_width)) / 2;
        let top = area.y + (area.height.saturating_sub(popup_height)) / 2;
        let popup = Rect::new(left, top, popup_width, popup_height);
        frame.render_widget(Clear, popup);
        let lines = vec![
            Line::from(vec![
                Span::raw("Symbol: "),
                Span::styled(
                    format!("{input}_"),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(Span::styled(
                "Enter confirm · Esc cancel",
                Style::default().fg(Color::DarkGray),
            )),
        ];
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .block(Block::bordered().title("Change Symbol"));
        frame.render_widget(paragraph, popup);
    }

    fn render_exit_confirmation(&self, frame: &mut Frame) {
        let area = frame.area();
        if area.width < 24 || area.height < 5 {
            return;
        }
        let popup_width = area.width.saturating_sub(20).min(40).max(26);
        let popup_height = 5;
        let left = area.x + (area.width.saturating_sub(popup_width)) / 2;
        let top = area.y + (area.height.saturating_sub(popup_height)) / 2;
        let popup = Rect::new(left, top, popup_width, popup_height);
        frame.render_widget(Clear, popup);
        let lines = vec![
            Line::from("Quit quantdeck?"),
            Line::from(Span::styled(
                "Y/Enter confirm · N/Esc cancel",
                Style::default().fg(Color::DarkGray),
            )),
        ];
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::bordered().title("Confirm"));
        frame.render_widget(paragraph, popup);
    }
}

fn bot_row_line(row: &BotRow, selected: bool) -> Line<'static> {
    let (badge, badge_color) = view::status_badge(row.bot.status);
    let status_text = if row.pending {
        format!("{badge}{PENDING_MARKER}")
    } else {
        badge.to_string()
    };
    let base = row_style(selected);
    let mut spans = vec![
        Span::styled(
            format_column_value(&row.bot.id.to_string(), ColumnAlign::Right, 4),
            base,
        ),
        Span::styled(" ", base),
        Span::styled(
            format_column_value(&row.bot.strategy, ColumnAlign::Left, 22),
            base,
        ),
        Span::styled(" ", base),
        Span::styled(
            format_column_value(&row.bot.pair, ColumnAlign::Left, 12),
            base,
        ),
        Span::styled(" ", base),
    ];
    let status_style = if selected {
        base
    } else {
        Style::default().fg(badge_color)
    };
    spans.push(Span::styled(
        format_column_value(&status_text, ColumnAlign::Left, 9),
        status_style,
    ));
    spans.push(Span::styled(" ", base));
    let pnl_style = if selected {
        base
    } else {
        Style::default().fg(view::pnl_color(row.bot.pnl))
    };
    spans.push(Span::styled(
        format_column_value(&format!("{:+.2}", row.bot.pnl), ColumnAlign::Right, 12),
        pnl_style,
    ));
    spans.push(Span::styled(" ", base));
    spans.push(Span::styled(
        format_column_value(&row.bot.trades.to_string(), ColumnAlign::Right, 8),
        base,
    ));
    spans.push(Span::styled(" ", base));
    spans.push(Span::styled(
        format_column_value(view::action_label(row.bot.status), ColumnAlign::Left, 7),
        base.add_modifier(Modifier::BOLD),
    ));
    Line::from(spans)
}

fn axis_labels(labels: &[String]) -> Vec<Span<'static>> {
    let first = labels.first().cloned().unwrap_or_default();
    let mid = labels.get(labels.len() / 2).cloned().unwrap_or_default();
    let last = labels.last().cloned().unwrap_or_default();
    vec![
        Span::styled(first, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(mid),
        Span::styled(last, Style::default().add_modifier(Modifier::BOLD)),
    ]
}

#[derive(Clone, Copy)]
enum ColumnAlign {
    Left,
    Right,
}

fn row_style(selected: bool) -> Style {
    if selected {
        Style::default()
            .bg(Color::LightCyan)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

fn format_columns(columns: &[(&str, ColumnAlign, usize)]) -> String {
    let mut row = String::new();
    for (idx, (value, align, width)) in columns.iter().enumerate() {
        row.push_str(&format_column_value(value, *align, *width));
        if idx + 1 != columns.len() {
            row.push(' ');
        }
    }
    row
}

fn format_column_value(value: &str, align: ColumnAlign, width: usize) -> String {
    let clipped = clip_to_width(value, width);
    pad_to_width(&clipped, width, align)
}

fn clip_to_width(value: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    if UnicodeWidthStr::width(value) <= width {
        return value.to_string();
    }
    let mut result = String::new();
    let mut remaining = width.saturating_sub(1);
    for ch in value.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if ch_width > remaining {
            break;
        }
        result.push(ch);
        remaining = remaining.saturating_sub(ch_width);
    }
    result.push('…');
    result
}

fn pad_to_width(value: &str, width: usize, align: ColumnAlign) -> String {
    let current = UnicodeWidthStr::width(value);
    if current >= width {
        return value.to_string();
    }
    let padding = " ".repeat(width - current);
    match align {
        ColumnAlign::Left => format!("{value}{padding}"),
        ColumnAlign::Right => format!("{padding}{value}"),
    }
}

fn clamp_index(idx: usize, len: usize) -> usize {
    if len == 0 { 0 } else { idx.min(len - 1) }
}

fn visible_range(len: usize, visible: usize, selected: usize) -> (usize, usize) {
    if len == 0 || visible == 0 {
        return (0, 0);
    }
    if len <= visible {
        return (0, len);
    }
    let max_start = len - visible;
    let clamped = clamp_index(selected, len);
    let start = clamped.min(max_start);
    (start, start + visible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Bot, BotStatus};

    #[test]
    fn column_formatting_pads_and_clips() {
        assert_eq!(format_column_value("ab", ColumnAlign::Left, 4), "ab  ");
        assert_eq!(format_column_value("ab", ColumnAlign::Right, 4), "  ab");
        assert_eq!(format_column_value("abcdef", ColumnAlign::Left, 4), "abc…");
    }

    #[test]
    fn visible_range_follows_the_selection() {
        assert_eq!(visible_range(10, 4, 0), (0, 4));
        assert_eq!(visible_range(10, 4, 9), (6, 10));
        assert_eq!(visible_range(3, 10, 1), (0, 3));
        assert_eq!(visible_range(0, 4, 0), (0, 0));
    }

    #[test]
    fn pending_rows_carry_the_marker() {
        let row = BotRow {
            bot: Bot {
                id: 1,
                strategy: "Grid Trading".to_string(),
                pair: "BTC/USDT".to_string(),
                status: BotStatus::Paused,
                pnl: -3.5,
                trades: 2,
            },
            pending: true,
        };
        let line = bot_row_line(&row, false);
        let text: String = line
            .spans
            .iter()
            .map(|span| span.content.as_ref())
            .collect();
        assert!(text.contains("Paused*"));
        assert!(text.contains("Run"));
    }

    #[test]
    fn pages_cycle_in_order() {
        assert_eq!(Page::Chart.next(), Page::Bots);
        assert_eq!(Page::Market.next(), Page::Chart);
    }
}
