//! Main line chart.

use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Chart, Dataset, GraphType, Paragraph};
use ratatui::Frame;

use crate::app::AppState;
use crate::binding::{self, ChartModel};
use crate::theme;
use crate::ui::panel_block;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let model = app
        .scheduler
        .snapshot()
        .and_then(|snapshot| binding::chart_model(&snapshot));
    match model {
        Some(model) => render_chart(f, area, &model),
        None => render_empty(f, area, app),
    }
}

fn render_empty(f: &mut Frame, area: Rect, app: &AppState) {
    let block = panel_block("Chart", false);
    let hint = match app.scheduler.last_error() {
        Some(err) => Span::styled(format!("No data: {err}"), theme::negative()),
        None => Span::styled("Waiting for the first refresh…", theme::muted()),
    };
    let lines = vec![Line::from(""), Line::from(hint)];
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_chart(f: &mut Frame, area: Rect, model: &ChartModel) {
    let datasets: Vec<Dataset> = model
        .lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            Dataset::default()
                .name(line.name.clone())
                .marker(symbols::Marker::Braille)
                .style(Style::default().fg(theme::series_color(i)))
                .graph_type(GraphType::Line)
                .data(&line.points)
        })
        .collect();

    let [y_min, y_max] = model.y_bounds;
    let chart = Chart::new(datasets)
        .block(panel_block(&model.title, true))
        .x_axis(
            Axis::default()
                .style(theme::muted())
                .bounds(model.x_bounds)
                .labels(vec![
                    Span::styled(model.x_labels[0].clone(), theme::muted()),
                    Span::styled(model.x_labels[1].clone(), theme::muted()),
                ]),
        )
        .y_axis(
            Axis::default()
                .title(Span::styled(model.unit.clone(), theme::muted()))
                .style(theme::muted())
                .bounds(model.y_bounds)
                .labels(vec![
                    Span::styled(format!("{y_min:.2}"), theme::muted()),
                    Span::styled(format!("{y_max:.2}"), theme::muted()),
                ]),
        );

    f.render_widget(chart, area);
}
