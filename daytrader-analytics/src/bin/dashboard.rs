/// Daytrader Agents Dashboard
///
/// Polls the forum backend through the analytics orchestrator and renders
/// each published view: market pulse, mentions, mood, markets, equity,
/// agent activity, research, threaded feed and recent trades.
use std::{error::Error, fs::File, io, sync::Arc, time::Duration};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use daytrader_analytics::{
    shared::format::{format_clock, format_signed, format_signed_pct},
    DashboardConfig, HttpForumSource, Orchestrator, SparkPoint, Trend, ViewModel,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const SPARK_BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Redraw cadence when no new view arrives (clock, key handling)
const FRAME_INTERVAL: Duration = Duration::from_millis(250);

/// Log file from DASHBOARD_LOG env var (default: daytrader-dashboard.log)
fn get_log_path() -> String {
    std::env::var("DASHBOARD_LOG").unwrap_or_else(|_| "daytrader-dashboard.log".to_string())
}

/// Initialize logging to a file so the terminal UI stays intact
fn init_logging() -> Result<(), Box<dyn Error>> {
    let file = File::create(get_log_path())?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_logging()?;

    let config = DashboardConfig::from_env();
    info!(api_base = %config.api_base, "starting daytrader dashboard");

    let source = HttpForumSource::new(&config)?;
    let orchestrator = Arc::new(Orchestrator::new(source, config));
    let mut views = orchestrator.subscribe();

    let cancel = CancellationToken::new();
    let poller = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        let cancel = cancel.clone();
        async move { orchestrator.run(cancel).await }
    });

    // Setup panic hook to restore terminal on crash
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic_info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = loop {
        let view = views.borrow_and_update().clone();
        if let Err(error) = terminal.draw(|f| render_ui(f, &view)) {
            break Err(error);
        }

        match event::poll(FRAME_INTERVAL) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) => {
                    break Ok(());
                }
                Ok(_) => {}
                Err(error) => break Err(error),
            },
            Ok(false) => {}
            Err(error) => break Err(error),
        }
    };

    // Stop polling; anything still in flight is discarded
    cancel.cancel();
    if let Err(error) = poller.await {
        error!(%error, "poller task failed");
    }

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    info!("dashboard closed");

    result.map_err(Into::into)
}

fn render_ui(f: &mut Frame, view: &ViewModel) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Percentage(28),
            Constraint::Percentage(30),
            Constraint::Min(10),
        ])
        .split(f.area());

    let pulse_row = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(50),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ])
        .split(chunks[1]);
    let market_row = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ])
        .split(chunks[2]);
    let feed_row = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
        ])
        .split(chunks[3]);
    let feed_side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(feed_row[2]);

    render_header(f, view, chunks[0]);
    render_market_pulse(f, view, pulse_row[0]);
    render_mentions(f, view, pulse_row[1]);
    render_mood(f, view, pulse_row[2]);
    render_quotes(f, " COMMODITIES ", &view.commodities, market_row[0]);
    render_quotes(f, " CRYPTO ", &view.cryptos, market_row[1]);
    render_equity(f, view, market_row[2]);
    render_activity(f, view, market_row[3]);
    render_forum(f, view, feed_row[0]);
    render_trades(f, view, feed_row[1]);
    render_research(f, view, feed_side[0]);
    render_conversations(f, view, feed_side[1]);
}

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
}

fn waiting_line() -> Line<'static> {
    Line::from(Span::styled(
        "Waiting for backend...",
        Style::default().fg(Color::DarkGray),
    ))
}

fn signed_color(value: f64) -> Color {
    if value >= 0.0 {
        Color::Green
    } else {
        Color::Red
    }
}

fn render_header(f: &mut Frame, view: &ViewModel, area: Rect) {
    let mut spans = vec![Span::styled(
        "DAYTRADER AGENTS ",
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )];

    match &view.config {
        Some(config) => {
            spans.push(Span::styled(
                format!(" {} agents ", config.agent_count),
                Style::default().fg(Color::Cyan),
            ));
            spans.push(Span::styled(
                format!(" tick {}s ", config.tick_seconds),
                Style::default().fg(Color::Cyan),
            ));
            spans.push(Span::styled(
                format!(" {} ", config.model_name),
                Style::default().fg(Color::Magenta),
            ));
            let (api_label, api_color) = if config.using_claude_api {
                ("LIVE API", Color::Green)
            } else {
                ("STUB", Color::Yellow)
            };
            spans.push(Span::styled(
                format!(" {} ", api_label),
                Style::default().fg(api_color).add_modifier(Modifier::BOLD),
            ));
            if let Some(mode) = &config.mode {
                spans.push(Span::styled(format!(" {} ", mode), Style::default().fg(Color::Gray)));
            }
        }
        None => spans.push(Span::styled(" config pending ", Style::default().fg(Color::DarkGray))),
    }

    spans.push(Span::styled(
        format!("  #{}", view.generation),
        Style::default().fg(Color::DarkGray),
    ));

    f.render_widget(Paragraph::new(Line::from(spans)).block(panel(" FORUM ")), area);
}

fn sparkline_spans(points: &[SparkPoint]) -> Vec<Span<'static>> {
    points
        .iter()
        .map(|point| {
            let level = ((point.height - 20.0) / 70.0 * (SPARK_BARS.len() - 1) as f64).round();
            let index = (level.max(0.0) as usize).min(SPARK_BARS.len() - 1);
            Span::styled(
                SPARK_BARS[index].to_string(),
                Style::default().fg(if point.is_up { Color::Green } else { Color::Red }),
            )
        })
        .collect()
}

fn render_market_pulse(f: &mut Frame, view: &ViewModel, area: Rect) {
    let block = panel(" MARKET PULSE ");
    if view.is_empty() {
        f.render_widget(Paragraph::new(vec![waiting_line()]).block(block), area);
        return;
    }

    let stats = &view.price_stats;
    let trend_color = match stats.trend {
        Trend::Up => Color::Green,
        Trend::Down => Color::Red,
        Trend::Flat => Color::Yellow,
    };

    let lines = vec![
        Line::from(vec![
            Span::styled(
                format!("{:.2} ", view.price),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{} ", format_signed(stats.change)),
                Style::default().fg(signed_color(stats.change)),
            ),
            Span::styled(
                format!("({}) ", format_signed_pct(stats.pct)),
                Style::default().fg(signed_color(stats.pct)),
            ),
            Span::styled(
                format!("{} {}", stats.trend.arrow(), stats.trend.label().to_uppercase()),
                Style::default().fg(trend_color).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(sparkline_spans(&view.sparkline)),
        Line::from(vec![
            Span::styled("Low ", Style::default().fg(Color::Gray)),
            Span::styled(format!("{:.2}", stats.low), Style::default().fg(Color::Cyan)),
            Span::styled("  High ", Style::default().fg(Color::Gray)),
            Span::styled(format!("{:.2}", stats.high), Style::default().fg(Color::Cyan)),
            Span::styled("  Vol ", Style::default().fg(Color::Gray)),
            Span::styled(format!("{:.3}", stats.vol), Style::default().fg(Color::Cyan)),
        ]),
        Line::from(vec![
            Span::styled("Range ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{:.2} ({:.2}%)", stats.range, stats.range_pct),
                Style::default().fg(Color::Cyan),
            ),
            Span::styled(
                format!("  {} samples", view.sparkline.len()),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
    ];

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_mentions(f: &mut Frame, view: &ViewModel, area: Rect) {
    let max = view.mentions.iter().map(|m| m.count).max().unwrap_or(0).max(1);
    let lines: Vec<Line> = view
        .mentions
        .iter()
        .map(|mention| {
            let filled = (mention.count * 10 / max).min(10);
            Line::from(vec![
                Span::styled(format!("{:<7}", mention.label), Style::default().fg(Color::White)),
                Span::styled(
                    format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled)),
                    Style::default().fg(Color::Yellow),
                ),
                Span::styled(format!(" {}", mention.count), Style::default().fg(Color::Cyan)),
            ])
        })
        .collect();

    f.render_widget(Paragraph::new(lines).block(panel(" HOT MENTIONS ")), area);
}

fn render_mood(f: &mut Frame, view: &ViewModel, area: Rect) {
    let mood = &view.mood;
    let bar = |pct: u32| "█".repeat((pct as usize / 10).min(10));

    let lines = vec![
        Line::from(vec![
            Span::styled("Bull  ", Style::default().fg(Color::Gray)),
            Span::styled(bar(mood.bull_pct), Style::default().fg(Color::Green)),
            Span::styled(format!(" {}%", mood.bull_pct), Style::default().fg(Color::Green)),
        ]),
        Line::from(vec![
            Span::styled("Dying ", Style::default().fg(Color::Gray)),
            Span::styled(bar(mood.dying_pct), Style::default().fg(Color::Red)),
            Span::styled(format!(" {}%", mood.dying_pct), Style::default().fg(Color::Red)),
        ]),
        Line::from(vec![
            Span::styled("Flat  ", Style::default().fg(Color::Gray)),
            Span::styled(bar(mood.neutral_pct), Style::default().fg(Color::Yellow)),
            Span::styled(format!(" {}%", mood.neutral_pct), Style::default().fg(Color::Yellow)),
        ]),
        Line::from(Span::styled(
            format!("{} posts with a bias", view.sentiment.total),
            Style::default().fg(Color::DarkGray),
        )),
    ];

    f.render_widget(Paragraph::new(lines).block(panel(" BULL vs DYING ")), area);
}

fn render_quotes(f: &mut Frame, title: &str, quotes: &[daytrader_analytics::MarketQuote], area: Rect) {
    let lines: Vec<Line> = if quotes.is_empty() {
        vec![waiting_line()]
    } else {
        quotes
            .iter()
            .map(|quote| {
                let mut spans = vec![
                    Span::styled(format!("{:<6}", quote.symbol), Style::default().fg(Color::White)),
                    Span::styled(format!("{:>12.2} ", quote.price), Style::default().fg(Color::Cyan)),
                    Span::styled(
                        format_signed_pct(quote.change_pct),
                        Style::default().fg(if quote.is_up() { Color::Green } else { Color::Red }),
                    ),
                ];
                if let Some(week) = quote.change_pct_7d {
                    spans.push(Span::styled(
                        format!(" 7d {}", format_signed_pct(week)),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
                Line::from(spans)
            })
            .collect()
    };

    f.render_widget(Paragraph::new(lines).block(panel(title)), area);
}

fn render_equity(f: &mut Frame, view: &ViewModel, area: Rect) {
    let lines: Vec<Line> = view
        .top_equity
        .iter()
        .enumerate()
        .map(|(rank, row)| {
            Line::from(vec![
                Span::styled(format!("{}. ", rank + 1), Style::default().fg(Color::DarkGray)),
                Span::styled(format!("{:<14}", row.agent), Style::default().fg(Color::White)),
                Span::styled(format!("{:>12.2}", row.equity), Style::default().fg(Color::Cyan)),
            ])
        })
        .collect();

    f.render_widget(Paragraph::new(lines).block(panel(" TOP EQUITY ")), area);
}

fn render_activity(f: &mut Frame, view: &ViewModel, area: Rect) {
    let activity = &view.activity;
    let mut lines = vec![Line::from(vec![
        Span::styled("Active ", Style::default().fg(Color::Gray)),
        Span::styled(
            activity.active_count.to_string(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled("  Top ", Style::default().fg(Color::Gray)),
        Span::styled(
            activity.most_active.clone().unwrap_or_else(|| "-".to_string()),
            Style::default().fg(Color::Yellow),
        ),
    ])];

    lines.extend(activity.top_agents.iter().map(|agent| {
        Line::from(vec![
            Span::styled(format!("{:<14}", agent.agent), Style::default().fg(Color::White)),
            Span::styled(format!("{:>4}", agent.posts), Style::default().fg(Color::Cyan)),
        ])
    }));

    f.render_widget(Paragraph::new(lines).block(panel(" AGENT ACTIVITY ")), area);
}

fn render_research(f: &mut Frame, view: &ViewModel, area: Rect) {
    let lines: Vec<Line> = view
        .research
        .iter()
        .map(|item| {
            Line::from(vec![
                Span::styled(
                    format!("[{}] ", item.score_label()),
                    Style::default().fg(Color::Yellow),
                ),
                Span::styled(
                    item.subreddit
                        .as_deref()
                        .map(|sub| format!("r/{} ", sub))
                        .unwrap_or_default(),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(item.title.clone(), Style::default().fg(Color::White)),
            ])
        })
        .collect();

    f.render_widget(
        Paragraph::new(lines)
            .block(panel(" RESEARCH RADAR "))
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn render_forum(f: &mut Frame, view: &ViewModel, area: Rect) {
    let visible = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = view
        .threads
        .iter()
        .flat_map(|thread| thread.walk())
        .take(visible)
        .map(|(depth, node)| {
            let indent = "  ".repeat(depth);
            let marker = if depth == 0 { "● " } else { "↳ " };
            Line::from(vec![
                Span::raw(indent),
                Span::styled(marker, Style::default().fg(Color::DarkGray)),
                Span::styled(
                    format!("{} ", format_clock(node.post.ts)),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("{}: ", node.post.agent),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(node.headline().to_string(), Style::default().fg(Color::White)),
            ])
        })
        .collect();

    let lines = if lines.is_empty() { vec![waiting_line()] } else { lines };
    f.render_widget(Paragraph::new(lines).block(panel(" FORUM FEED ")), area);
}

fn render_trades(f: &mut Frame, view: &ViewModel, area: Rect) {
    let lines: Vec<Line> = view
        .trades
        .iter()
        .map(|trade| {
            Line::from(vec![
                Span::styled(
                    format!("{} ", format_clock(trade.ts)),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("{:<4} ", trade.side.as_str()),
                    Style::default()
                        .fg(if trade.side.is_buy() { Color::Green } else { Color::Red })
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!("{:<12}", trade.agent), Style::default().fg(Color::White)),
                Span::styled(
                    format!("{:>6.1} @ {:.2}", trade.qty, trade.price),
                    Style::default().fg(Color::Cyan),
                ),
            ])
        })
        .collect();

    f.render_widget(Paragraph::new(lines).block(panel(" RECENT TRADES ")), area);
}

fn render_conversations(f: &mut Frame, view: &ViewModel, area: Rect) {
    let lines: Vec<Line> = view
        .threads
        .iter()
        .map(|thread| {
            Line::from(vec![
                Span::styled(
                    format!("{} ", format_clock(thread.latest_ts)),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("{} ", thread.headline()),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("- {} ", thread.post.agent),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(
                    format!("({} replies)", thread.reply_count),
                    Style::default().fg(Color::Yellow),
                ),
            ])
        })
        .collect();

    f.render_widget(Paragraph::new(lines).block(panel(" CONVERSATIONS ")), area);
}
