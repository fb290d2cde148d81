//! Control strip: mode tabs and the active request parameters.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Tabs};
use ratatui::Frame;

use pulsedash_core::domain::MAX_FORECAST_DAYS;
use pulsedash_core::Mode;

use crate::app::AppState;
use crate::theme;
use crate::ui::panel_block;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let block = panel_block("PulseDash", true);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(34), Constraint::Min(10)])
        .split(inner);

    let params = app.params();
    let titles: Vec<Line> = Mode::ALL
        .iter()
        .map(|m| {
            let key = m.key().chars().next().unwrap_or(' ');
            Line::from(format!("[{key}] {}", m.label()))
        })
        .collect();
    let selected = Mode::ALL.iter().position(|m| *m == params.mode).unwrap_or(0);
    let tabs = Tabs::new(titles)
        .select(selected)
        .style(theme::muted())
        .highlight_style(theme::accent_bold())
        .divider("|");
    f.render_widget(tabs, cols[0]);

    f.render_widget(Paragraph::new(parameter_line(app)), cols[1]);
}

fn parameter_line(app: &AppState) -> Line<'static> {
    let params = app.params();
    let mut spans = vec![
        Span::styled(params.entities().join(", "), theme::text()),
        Span::styled("  ", theme::muted()),
    ];
    let field = |label: &str, value: String| {
        [
            Span::styled(format!("{label} "), theme::muted()),
            Span::styled(format!("{value}  "), theme::accent()),
        ]
    };
    match params.mode {
        Mode::Crypto => spans.extend(field("days", params.days.to_string())),
        Mode::Weather => {
            spans.extend(field("days", params.days.min(MAX_FORECAST_DAYS).to_string()));
            spans.extend(field("metric", params.weather_metric.label().to_string()));
        }
        Mode::Stock => {
            spans.extend(field("points", params.points.to_string()));
            spans.extend(field("vol", format!("{:.1}", params.volatility)));
            spans.extend(field("seed", params.seed.to_string()));
        }
    }
    if app.scheduler.is_fetching() {
        spans.push(Span::styled("loading…", theme::warning()));
    }
    Line::from(spans)
}
