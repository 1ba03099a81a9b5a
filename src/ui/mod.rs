mod components;

use std::sync::OnceLock;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Popup, ViewState};
use crate::theme::Theme;
use crate::verse::Verse;
use components::{button, key_hint};

/// Widest the card gets on large terminals
const MAX_CARD_WIDTH: u16 = 76;

static THEME: OnceLock<Theme> = OnceLock::new();

fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::load)
}

fn accent() -> Color { theme().accent }
fn danger() -> Color { theme().danger }
fn text() -> Color { theme().text }
fn text_dim() -> Color { theme().text_dim }
fn inactive() -> Color { theme().inactive }
fn header() -> Color { theme().header }

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Info line
            Constraint::Min(8),    // Card
            Constraint::Length(1), // Footer
        ])
        .split(area);

    draw_info_line(f, app, chunks[0]);
    draw_card(f, app, centered_width(MAX_CARD_WIDTH, chunks[1]));
    draw_footer(f, chunks[2]);

    if app.popup == Popup::Help {
        draw_help_popup(f, app);
    }
}

fn draw_info_line(f: &mut Frame, app: &App, area: Rect) {
    let line = if let Some(ref status) = app.status_message {
        Line::from(Span::styled(status.as_str(), Style::default().fg(accent())))
    } else {
        let info = match &app.state {
            ViewState::Loading { .. } => "Fetching a verse...",
            ViewState::Error { .. } => "Verse service unavailable",
            ViewState::Loaded(_) => "Ready",
        };
        Line::from(Span::styled(info, Style::default().fg(text_dim())))
    };

    f.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}

fn draw_card(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(Span::styled(
            " Verse ",
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent()));

    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Min(3),    // Verse / loading / error
            Constraint::Length(1), // Controls
            Constraint::Length(1), // Auto-refresh note
        ])
        .split(inner);

    let content = match &app.state {
        ViewState::Loading { previous: None } => vec![Line::from(vec![
            Span::styled(app.spinner(), Style::default().fg(accent())),
            Span::styled(" Loading verse...", Style::default().fg(text_dim())),
        ])],
        ViewState::Loading { previous: Some(verse) } => {
            let mut lines = verse_lines(verse, true);
            lines.push(Line::from(""));
            lines.push(Line::from(vec![
                Span::styled(app.spinner(), Style::default().fg(accent())),
                Span::styled(" Refreshing...", Style::default().fg(text_dim())),
            ]));
            lines
        }
        ViewState::Error { message } => vec![
            Line::from(Span::styled(message.as_str(), Style::default().fg(danger()))),
            Line::from(""),
            Line::from(button("r", "Try Again", true, false, accent(), inactive())),
        ],
        ViewState::Loaded(verse) => verse_lines(verse, false),
    };

    f.render_widget(
        Paragraph::new(content).wrap(Wrap { trim: true }),
        chunks[0],
    );

    draw_controls(f, app, chunks[1]);

    if app.auto_refresh() {
        let note = Paragraph::new(Line::from(Span::styled(
            format!("Automatically refreshes every {}", app.refresh_label()),
            Style::default().fg(text_dim()).add_modifier(Modifier::ITALIC),
        )));
        f.render_widget(note, chunks[2]);
    }
}

/// Quoted text (trailing whitespace dropped), `— reference` and the translation name
fn verse_lines(verse: &Verse, stale: bool) -> Vec<Line<'static>> {
    let body_style = if stale {
        Style::default().fg(text_dim())
    } else {
        Style::default().fg(text())
    };
    let cite_style = if stale {
        Style::default().fg(text_dim())
    } else {
        Style::default().fg(accent())
    };

    let quoted = format!("\"{}\"", verse.display_text());
    let mut lines: Vec<Line<'static>> = quoted
        .lines()
        .map(|l| Line::from(Span::styled(l.to_string(), body_style.add_modifier(Modifier::ITALIC))))
        .collect();

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(format!("— {}", verse.reference), cite_style)).alignment(Alignment::Right));
    lines.push(
        Line::from(Span::styled(verse.translation_name.clone(), Style::default().fg(text_dim())))
            .alignment(Alignment::Right),
    );
    lines
}

fn draw_controls(f: &mut Frame, app: &App, area: Rect) {
    let loading = app.is_loading();
    let auto = app.auto_refresh();

    let mut spans = Vec::new();
    if loading {
        spans.push(Span::styled(format!("{} ", app.spinner()), Style::default().fg(inactive())));
    }
    spans.extend(button("n", "New Verse", !loading, false, accent(), inactive()));
    spans.push(Span::raw("   "));
    spans.extend(button(
        "a",
        format!("Auto-refresh {}", if auto { "On" } else { "Off" }),
        true,
        auto,
        accent(),
        inactive(),
    ));

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_footer(f: &mut Frame, area: Rect) {
    let hints = [
        ("n", "New"),
        ("a", "Auto-refresh"),
        ("?", "Help"),
        ("q", "Quit"),
    ];

    let spans: Vec<Span> = hints
        .iter()
        .flat_map(|&(key, action)| key_hint(key, action, accent(), text_dim()))
        .collect();

    f.render_widget(Paragraph::new(Line::from(spans)).alignment(Alignment::Center), area);
}

fn draw_help_popup(f: &mut Frame, app: &App) {
    let area = f.area();
    let popup_area = centered_rect(if area.width < 80 { 90 } else { 60 }, 60, area);

    f.render_widget(Clear, popup_area);

    let key = |k: &'static str| Span::styled(k, Style::default().fg(accent()));
    let help_text = vec![
        Line::from(Span::styled("═══ Keys ═══", Style::default().fg(header()).add_modifier(Modifier::BOLD))),
        Line::from(vec![key("  n / Space   "), Span::raw("Fetch a new verse")]),
        Line::from(vec![key("  r           "), Span::raw("Try again after an error")]),
        Line::from(vec![key("  a           "), Span::raw("Toggle auto-refresh")]),
        Line::from(vec![key("  ? / h       "), Span::raw("Show this help")]),
        Line::from(vec![key("  q / Esc     "), Span::raw("Quit")]),
        Line::from(""),
        Line::from(Span::styled("═══ Source ═══", Style::default().fg(header()).add_modifier(Modifier::BOLD))),
        Line::from(Span::styled(format!("  {}", app.config().api_base), Style::default().fg(text_dim()))),
        Line::from(Span::styled(
            format!("  Auto-refresh interval: {}", app.refresh_label()),
            Style::default().fg(text_dim()),
        )),
    ];

    let popup = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(Span::styled(" Help ", Style::default().fg(header())))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent())),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(popup, popup_area);
}

/// Horizontally center a column at most `max_width` wide
fn centered_width(max_width: u16, r: Rect) -> Rect {
    let width = r.width.min(max_width);
    Rect {
        x: r.x + (r.width - width) / 2,
        width,
        ..r
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
