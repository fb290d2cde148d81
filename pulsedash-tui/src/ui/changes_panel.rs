//! Per-entity total change list.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::app::AppState;
use crate::binding::{self, ChangeRow};
use crate::theme;
use crate::ui::panel_block;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let block = panel_block("Total change", false);
    let rows = match app.scheduler.snapshot() {
        Some(snapshot) => binding::change_rows(&snapshot),
        None => Vec::new(),
    };
    let width = area.width.saturating_sub(4) as usize;
    let lines: Vec<Line> = rows.iter().map(|row| line(row, width)).collect();
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn line(row: &ChangeRow, width: usize) -> Line<'static> {
    let label_width = width.saturating_sub(10).max(4);
    let label: String = row.label.chars().take(label_width).collect();
    match &row.note {
        Some(_) => Line::from(vec![
            Span::styled(format!("{label:<label_width$}"), theme::muted()),
            Span::styled("  skipped", theme::warning()),
        ]),
        None => Line::from(vec![
            Span::styled(format!("{label:<label_width$}"), theme::text()),
            Span::styled(
                format!("{:>10}", binding::format_pct(row.pct_change)),
                theme::change(row.pct_change),
            ),
        ]),
    }
}
