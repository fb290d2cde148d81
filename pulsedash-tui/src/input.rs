//! Keyboard input dispatch: overlays first, then global keys.

use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use pulsedash_core::Mode;

use crate::app::{next_seed, step_range, step_volatility, AppState, Overlay};

/// Handle a key event.
pub fn handle_key(app: &mut AppState, key: KeyEvent) {
    // Only handle key press events (Windows sends both Press and Release).
    if key.kind != KeyEventKind::Press {
        return;
    }
    let now = Instant::now();

    // 1. Overlays consume input first.
    match &app.overlay {
        Overlay::Help => {
            app.overlay = Overlay::None;
            return;
        }
        Overlay::ErrorHistory => {
            handle_error_overlay(app, key);
            return;
        }
        Overlay::EntityEditor => {
            handle_entity_editor(app, key, now);
            return;
        }
        Overlay::None => {}
    }

    // 2. Global keys.
    match key.code {
        KeyCode::Char('q') => app.running = false,
        KeyCode::Char('c') => switch_mode(app, Mode::Crypto, now),
        KeyCode::Char('w') => switch_mode(app, Mode::Weather, now),
        KeyCode::Char('s') => switch_mode(app, Mode::Stock, now),
        KeyCode::Tab => {
            let mode = app.params().mode.next();
            switch_mode(app, mode, now);
        }
        KeyCode::BackTab => {
            let mode = app.params().mode.prev();
            switch_mode(app, mode, now);
        }
        KeyCode::Char('e') => {
            app.entity_input = app.params().entities().join(", ");
            app.overlay = Overlay::EntityEditor;
        }
        KeyCode::Char('+') | KeyCode::Char('=') => app.update_params(now, |p| step_range(p, true)),
        KeyCode::Char('-') => app.update_params(now, |p| step_range(p, false)),
        KeyCode::Char('[') => stock_only(app, now, "Volatility", |p| step_volatility(p, false)),
        KeyCode::Char(']') => stock_only(app, now, "Volatility", |p| step_volatility(p, true)),
        KeyCode::Char('n') => stock_only(app, now, "Seed", next_seed),
        KeyCode::Char('m') => {
            if app.params().mode == Mode::Weather {
                app.update_params(now, |p| p.weather_metric = p.weather_metric.next());
            } else {
                app.set_warning("Metric only applies in weather mode");
            }
        }
        KeyCode::Char('r') => app.refresh(now),
        KeyCode::Char('E') => {
            app.error_scroll = 0;
            app.overlay = Overlay::ErrorHistory;
        }
        KeyCode::Char('?') => app.overlay = Overlay::Help,
        _ => {}
    }
}

fn switch_mode(app: &mut AppState, mode: Mode, now: Instant) {
    app.update_params(now, |p| p.mode = mode);
}

fn stock_only(
    app: &mut AppState,
    now: Instant,
    what: &str,
    edit: impl FnOnce(&mut pulsedash_core::RequestParameters),
) {
    if app.params().mode == Mode::Stock {
        app.update_params(now, edit);
    } else {
        app.set_warning(format!("{what} only applies in stock mode"));
    }
}

fn handle_error_overlay(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('E') => {
            app.overlay = Overlay::None;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            if app.error_scroll + 1 < app.error_history.len() {
                app.error_scroll += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.error_scroll = app.error_scroll.saturating_sub(1);
        }
        _ => {}
    }
}

fn handle_entity_editor(app: &mut AppState, key: KeyEvent, now: Instant) {
    match key.code {
        KeyCode::Esc => {
            app.overlay = Overlay::None;
            app.entity_input.clear();
        }
        KeyCode::Enter => {
            let input = std::mem::take(&mut app.entity_input);
            app.overlay = Overlay::None;
            let mut params = app.params().clone();
            if params.set_entities(&input) {
                app.update_params(now, |p| *p = params);
            } else {
                app.set_warning("Selection unchanged: enter at least one name");
            }
        }
        KeyCode::Backspace => {
            app.entity_input.pop();
        }
        KeyCode::Char(c) => {
            app.entity_input.push(c);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::{self, Receiver};
    use std::time::Duration;

    use crossterm::event::{KeyEventState, KeyModifiers};
    use pulsedash_core::refresh::Scheduler;
    use pulsedash_core::RequestParameters;

    use crate::worker::WorkerCommand;

    fn app() -> (AppState, Receiver<WorkerCommand>) {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (_resp_tx, resp_rx) = mpsc::channel();
        let scheduler = Scheduler::new(RequestParameters::default(), Duration::from_secs(300));
        (AppState::new(scheduler, cmd_tx, resp_rx), cmd_rx)
    }

    fn press(app: &mut AppState, code: KeyCode) {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_str(app: &mut AppState, s: &str) {
        for c in s.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn quit() {
        let (mut app, _rx) = app();
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.running);
    }

    #[test]
    fn release_events_are_ignored() {
        let (mut app, _rx) = app();
        let mut key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        key.state = KeyEventState::NONE;
        handle_key(&mut app, key);
        assert!(app.running);
    }

    #[test]
    fn mode_keys_and_tab_cycle() {
        let (mut app, rx) = app();
        press(&mut app, KeyCode::Char('w'));
        assert_eq!(app.params().mode, Mode::Weather);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.params().mode, Mode::Stock);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.params().mode, Mode::Weather);
        // Already in weather mode: no new fetch.
        press(&mut app, KeyCode::Char('w'));
        assert_eq!(rx.try_iter().count(), 3);
    }

    #[test]
    fn stock_controls_are_mode_gated() {
        let (mut app, _rx) = app();
        press(&mut app, KeyCode::Char(']'));
        assert_eq!(app.params().volatility, 5.0);

        press(&mut app, KeyCode::Char('s'));
        press(&mut app, KeyCode::Char(']'));
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.params().volatility, 5.5);
        assert_eq!(app.params().seed, 43);
        press(&mut app, KeyCode::Char('+'));
        assert_eq!(app.params().points, 35);
    }

    #[test]
    fn entity_editor_applies_on_enter() {
        let (mut app, _rx) = app();
        press(&mut app, KeyCode::Char('e'));
        assert_eq!(app.overlay, Overlay::EntityEditor);
        assert_eq!(app.entity_input, "bitcoin, ethereum, cardano");

        app.entity_input.clear();
        type_str(&mut app, "Solana, dogecoin");
        // Global keys are captured by the editor.
        assert!(app.running);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.overlay, Overlay::None);
        assert_eq!(app.params().coins, vec!["solana", "dogecoin"]);
    }

    #[test]
    fn entity_editor_escape_discards() {
        let (mut app, _rx) = app();
        press(&mut app, KeyCode::Char('e'));
        type_str(&mut app, "xyz");
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.params().coins.len(), 3);
        assert!(app.entity_input.is_empty());
    }

    #[test]
    fn weather_metric_cycles() {
        let (mut app, _rx) = app();
        press(&mut app, KeyCode::Char('w'));
        press(&mut app, KeyCode::Char('m'));
        assert_eq!(
            app.params().weather_metric,
            pulsedash_core::WeatherMetric::Humidity
        );
    }

    #[test]
    fn overlays_open_and_close() {
        let (mut app, _rx) = app();
        press(&mut app, KeyCode::Char('?'));
        assert_eq!(app.overlay, Overlay::Help);
        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.overlay, Overlay::None);

        press(&mut app, KeyCode::Char('E'));
        assert_eq!(app.overlay, Overlay::ErrorHistory);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.overlay, Overlay::None);
    }
}
