use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use gtk4::glib;
use gtk4::prelude::*;

use super::recording::on_file_loaded;
use super::state::{refresh_controls, set_status, AppState, BackendEvent};
use crate::audio::format_elapsed;
use crate::report;

/// Handle a backend event on the main thread.
pub fn handle_backend_event(state: &Rc<RefCell<AppState>>, event: BackendEvent) {
    match event {
        BackendEvent::HealthChecked { id, status } => {
            let s = state.borrow();
            if let (Some(status), Some(ref win)) = (s.session.finish_health_check(id, status), &s.window) {
                win.set_health(status);
            }
        }
        BackendEvent::FileLoaded(Ok(payload)) => on_file_loaded(state, payload),
        BackendEvent::FileLoaded(Err(err)) => {
            log::error!("{err}");
            set_status(state, &err);
        }
        BackendEvent::TranscriptionFinished { id, result } => {
            on_transcription_finished(state, id, result);
        }
        BackendEvent::EvaluationFinished { id, result } => {
            on_evaluation_finished(state, id, result);
        }
        BackendEvent::TimerTick => {
            let s = state.borrow();
            if let (Some(elapsed), Some(ref win)) = (s.session.elapsed(Instant::now()), &s.window) {
                win.timer_label.set_text(&format_elapsed(elapsed));
            }
        }
        BackendEvent::AudioLevel(level) => {
            let s = state.borrow();
            if let Some(ref win) = s.window {
                // Speech RMS rarely exceeds ~0.3; stretch it over the bar.
                win.level_bar.set_value((level as f64 * 4.0).min(1.0));
            }
        }
    }
    refresh_controls(state);
}

fn on_transcription_finished(
    state: &Rc<RefCell<AppState>>,
    id: super::session::RequestId,
    result: Result<String, crate::error::ApiError>,
) {
    let mut s = state.borrow_mut();
    let Some(outcome) = s.session.finish_transcription(id, result) else {
        return;
    };
    let (status, transcript) = match outcome {
        Ok(text) => {
            log::info!("Transcript: {text}");
            (
                "Transcription complete - Ready to evaluate".to_string(),
                Some(text.to_string()),
            )
        }
        Err(e) => {
            log::error!("Transcription failed: {e}");
            (format!("Transcription failed: {e}"), None)
        }
    };
    s.request_task = None;
    if let Some(ref win) = s.window {
        win.set_transcript(transcript.as_deref());
        win.status_label.set_text(&status);
    }
}

fn on_evaluation_finished(
    state: &Rc<RefCell<AppState>>,
    id: super::session::RequestId,
    result: Result<crate::evaluation::EvaluationResponse, crate::error::ApiError>,
) {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

    let mut s = state.borrow_mut();
    let mode = s.config.scoring_mode;
    let Some(outcome) = s.session.finish_evaluation(id, result, timestamp) else {
        return;
    };
    let status = match outcome {
        Ok(eval) => {
            log::info!(
                "Evaluation complete: {}/100 at {}",
                eval.overall_score,
                eval.level_display()
            );
            Ok(report::completion_status(eval, mode))
        }
        Err(e) => {
            log::error!("Evaluation failed: {e}");
            Err(format!("Evaluation failed: {e}"))
        }
    };
    s.request_task = None;

    let Some(ref win) = s.window else {
        return;
    };
    match status {
        Ok(text) => {
            let entries = report::build(s.session.history(), s.config.scoring_mode);
            crate::ui::results::show_report(&win.results_box, &entries);
            win.status_label.set_text(&text);
            scroll_to_results(win);
        }
        Err(text) => win.status_label.set_text(&text),
    }
}

/// Bring the newest result into view once the new rows are laid out.
fn scroll_to_results(win: &crate::ui::window::MainWindow) {
    let scrolled = win.scrolled.clone();
    let content = win.content.clone();
    let results = win.results_box.clone();
    glib::timeout_add_local_once(Duration::from_millis(100), move || {
        if let Some(point) = results.compute_point(&content, &gtk4::graphene::Point::new(0.0, 0.0)) {
            scrolled.vadjustment().set_value(point.y() as f64);
        }
    });
}
