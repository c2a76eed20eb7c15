use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use super::session::RequestKind;
use super::state::{refresh_controls, set_status, AppState, BackendEvent};
use crate::audio::{AudioPayload, AudioSource};
use crate::evaluation::EvaluationRequest;

/// Probe the backend and update the connection badge.
pub fn dispatch_health_check(state: &Rc<RefCell<AppState>>) {
    let mut s = state.borrow_mut();
    let id = s.session.begin_health_check();
    let api = s.api.clone();
    let sender = s.backend_sender.clone();

    s.tokio_rt.spawn(async move {
        let status = api.health().await;
        log::info!("Backend health #{id}: {status:?}");
        let _ = sender.send(BackendEvent::HealthChecked { id, status }).await;
    });
}

/// Read an already-validated upload off the main thread.
pub fn dispatch_file_read(
    state: &Rc<RefCell<AppState>>,
    path: PathBuf,
    filename: String,
    mime_type: Option<String>,
) {
    let s = state.borrow();
    let sender = s.backend_sender.clone();

    s.tokio_rt.spawn(async move {
        let result = tokio::fs::read(&path)
            .await
            .map(|bytes| AudioPayload::uploaded(&filename, mime_type.as_deref(), bytes))
            .map_err(|e| format!("Could not read {}: {e}", path.display()));
        let _ = sender.send(BackendEvent::FileLoaded(result)).await;
    });
}

/// Send the active payload to the transcription endpoint.
pub fn dispatch_transcription(state: &Rc<RefCell<AppState>>) {
    let begun = state.borrow_mut().session.begin_transcription();
    let (id, payload) = match begun {
        Ok(v) => v,
        Err(e) => {
            log::warn!("Cannot transcribe: {e}");
            set_status(state, &format!("Transcription failed: {e}"));
            return;
        }
    };

    set_status(
        state,
        match payload.source {
            AudioSource::Upload => "Transcribing uploaded audio...",
            _ => "Transcribing audio...",
        },
    );
    refresh_controls(state);

    let mut s = state.borrow_mut();
    let api = s.api.clone();
    let sender = s.backend_sender.clone();
    let handle = s.tokio_rt.spawn(async move {
        let result = api.transcribe(&payload).await;
        let _ = sender
            .send(BackendEvent::TranscriptionFinished { id, result })
            .await;
    });
    s.request_task = Some(handle.abort_handle());
}

/// Send an evaluation request built from the current session.
pub fn dispatch_evaluation(state: &Rc<RefCell<AppState>>, request: EvaluationRequest) {
    let begun = state.borrow_mut().session.begin_evaluation(request.clone());
    let id = match begun {
        Ok(id) => id,
        Err(e) => {
            log::warn!("Cannot evaluate: {e}");
            set_status(state, &format!("Evaluation failed: {e}"));
            return;
        }
    };

    set_status(state, "Evaluating...");
    refresh_controls(state);

    let mut s = state.borrow_mut();
    let api = s.api.clone();
    let sender = s.backend_sender.clone();
    let handle = s.tokio_rt.spawn(async move {
        let result = api.evaluate(&request).await;
        let _ = sender
            .send(BackendEvent::EvaluationFinished { id, result })
            .await;
    });
    s.request_task = Some(handle.abort_handle());
}

/// Abort whatever request is in flight and give the controls back.
pub fn cancel_request(state: &Rc<RefCell<AppState>>) {
    let cancelled = {
        let mut s = state.borrow_mut();
        if let Some(task) = s.request_task.take() {
            task.abort();
        }
        s.session.cancel_request()
    };

    match cancelled {
        Some(RequestKind::Transcription) => {
            log::info!("Transcription cancelled");
            set_status(state, "Transcription cancelled");
        }
        Some(RequestKind::Evaluation) => {
            log::info!("Evaluation cancelled");
            set_status(state, "Evaluation cancelled");
        }
        None => {}
    }
    refresh_controls(state);
}
