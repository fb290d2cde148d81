//! Help overlay: keyboard shortcuts.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use crate::theme;
use crate::ui::centered_rect;

pub fn render(f: &mut Frame, area: Rect) {
    let popup = centered_rect(70, 80, area);
    f.render_widget(Clear, popup);

    let mut lines: Vec<Line> = Vec::new();

    section(&mut lines, "Data source");
    key(&mut lines, "c / w / s", "Crypto / Weather / Stocks");
    key(&mut lines, "Tab / Shift+Tab", "Cycle data source");
    key(&mut lines, "e", "Edit coins, location or tickers");
    lines.push(Line::from(""));

    section(&mut lines, "Range");
    key(&mut lines, "+ / -", "Days (1-30); points in stock mode");
    key(&mut lines, "m", "Next weather metric");
    lines.push(Line::from(""));

    section(&mut lines, "Mock stocks");
    key(&mut lines, "[ / ]", "Lower / raise volatility");
    key(&mut lines, "n", "Next random seed");
    lines.push(Line::from(""));

    section(&mut lines, "General");
    key(&mut lines, "r", "Refresh now");
    key(&mut lines, "E", "Error history");
    key(&mut lines, "?", "This help");
    key(&mut lines, "q", "Quit");
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Press any key to close.", theme::neutral())));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::accent())
        .title(" Help ")
        .title_style(theme::accent_bold());
    f.render_widget(Paragraph::new(lines).block(block), popup);
}

fn section(lines: &mut Vec<Line<'_>>, title: &str) {
    lines.push(Line::from(Span::styled(title.to_string(), theme::accent_bold())));
}

fn key(lines: &mut Vec<Line<'_>>, keys: &str, desc: &str) {
    lines.push(Line::from(vec![
        Span::styled(format!("  {keys:>16}  "), theme::accent()),
        Span::styled(desc.to_string(), theme::muted()),
    ]));
}
