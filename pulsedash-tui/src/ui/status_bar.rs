//! Bottom status bar and footer.

use std::time::Instant;

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::app::{AppState, StatusLevel};
use crate::binding;
use crate::theme;

const CREDITS: &str = "Data: CoinGecko · Open-Meteo · mock stocks";

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let mut spans: Vec<Span> = Vec::new();

    spans.push(Span::styled(
        " c/w/s:Mode e:Edit +/-:Range r:Refresh E:Errors ?:Help q:Quit",
        theme::muted(),
    ));
    spans.push(Span::raw(" | "));

    if let Some((msg, level)) = &app.status_message {
        let style = match level {
            StatusLevel::Info => theme::accent(),
            StatusLevel::Warning => theme::warning(),
            StatusLevel::Error => theme::negative(),
        };
        spans.push(Span::styled(msg.as_str(), style));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Last-updated time, countdown to the next refresh, and data credits.
pub fn render_footer(f: &mut Frame, area: Rect, app: &AppState) {
    let mut spans: Vec<Span> = Vec::new();

    let snapshot = app.scheduler.snapshot();
    let updated = match &snapshot {
        Some(snapshot) => format!(" Last updated: {}", binding::updated_label(snapshot.fetched_at)),
        None => " Last updated: never".to_string(),
    };
    spans.push(Span::styled(updated, theme::text()));

    if let Some(left) = app.scheduler.time_until_refresh(Instant::now()) {
        let secs = left.as_secs();
        spans.push(Span::styled(
            format!("  next refresh in {}m{:02}s", secs / 60, secs % 60),
            theme::muted(),
        ));
    }
    if app.scheduler.last_error().is_some() && snapshot.is_some() {
        spans.push(Span::styled("  showing previous data", theme::warning()));
    }
    if app.provider_paused {
        spans.push(Span::styled("  provider paused", theme::negative()));
    }

    spans.push(Span::raw("  "));
    spans.push(Span::styled(CREDITS, theme::neutral()));

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
