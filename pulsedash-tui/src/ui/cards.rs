//! Stat cards row.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::app::AppState;
use crate::binding::{self, StatCard};
use crate::theme;

/// Cards beyond this count are not drawn.
const MAX_CARDS: usize = 6;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let cards = match app.scheduler.snapshot() {
        Some(snapshot) => binding::stat_cards(&snapshot),
        None => Vec::new(),
    };
    if cards.is_empty() {
        let msg = if app.scheduler.is_fetching() {
            "Fetching data…"
        } else {
            "No data yet. Press r to refresh."
        };
        let block = Block::default().borders(Borders::ALL).border_style(theme::muted());
        f.render_widget(Paragraph::new(Span::styled(msg, theme::muted())).block(block), area);
        return;
    }

    let shown = &cards[..cards.len().min(MAX_CARDS)];
    let constraints: Vec<Constraint> = shown
        .iter()
        .map(|_| Constraint::Ratio(1, shown.len() as u32))
        .collect();
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (i, (card, col)) in shown.iter().zip(cols.iter()).enumerate() {
        render_card(f, *col, card, i);
    }
}

fn render_card(f: &mut Frame, area: Rect, card: &StatCard, index: usize) {
    let color = theme::series_color(index);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(ratatui::style::Style::default().fg(color))
        .title(Span::styled(format!(" {} ", card.title), theme::text()));

    let mut value_line = vec![Span::styled(card.value.clone(), theme::accent_bold())];
    if let Some(delta) = card.delta {
        value_line.push(Span::raw("  "));
        value_line.push(Span::styled(
            binding::format_pct(Some(delta)),
            theme::change(Some(delta)),
        ));
    }
    let lines = vec![
        Line::from(value_line),
        Line::from(Span::styled(card.caption.clone(), theme::muted())),
    ];
    f.render_widget(Paragraph::new(lines).block(block), area);
}
