use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use gtk4::glib;
use gtk4::prelude::*;

use super::pipeline::{dispatch_file_read, dispatch_transcription};
use super::state::{refresh_controls, set_status, AppState, BackendEvent};
use crate::audio::{self, AudioPayload};
use crate::ui::window::INITIAL_STATUS;

/// Samples considered for the level meter (~80ms at 16kHz).
const LEVEL_WINDOW: usize = 1280;

/// Probe the microphone once at startup; disable recording if there is none.
pub fn check_microphone(state: &Rc<RefCell<AppState>>) {
    if let Err(e) = crate::recorder::probe_input_device() {
        log::warn!("Microphone unavailable: {e}");
        state.borrow_mut().session.set_microphone_unavailable(true);
        set_status(
            state,
            &format!("Microphone unavailable ({e}). You can still upload a file."),
        );
        refresh_controls(state);
    }
}

/// Record button: start or stop depending on the current state.
pub fn toggle_recording(state: &Rc<RefCell<AppState>>) {
    if state.borrow().session.is_recording() {
        stop_recording(state);
    } else {
        start_recording(state);
    }
}

/// Start recording audio from the microphone.
pub fn start_recording(state: &Rc<RefCell<AppState>>) {
    if let Err(e) = state.borrow().session.ensure_can_record() {
        log::info!("Not starting recording: {e}");
        return;
    }
    log::info!("Starting recording");

    {
        let s = state.borrow();
        if let Ok(mut buf) = s.audio_buffer.lock() {
            buf.clear();
        };
    }

    let buffer = state.borrow().audio_buffer.clone();
    match crate::recorder::start_capture(buffer) {
        Ok((stream, sample_rate)) => {
            let mut s = state.borrow_mut();
            if let Err(e) = s.session.recording_started(Instant::now()) {
                log::warn!("Recording rejected: {e}");
                return;
            }
            s.cpal_stream = Some(stream);
            s.sample_rate = sample_rate;
            if let Some(ref win) = s.window {
                win.timer_label.set_text("00:00");
                win.set_recording(true);
                win.set_playback(None);
                win.set_file(None);
                win.set_transcript(None);
                win.status_label.set_text("Recording in progress...");
            }
        }
        Err(e) => {
            log::error!("Failed to start recording: {e}");
            set_status(state, &format!("Error: Could not access microphone ({e})"));
            return;
        }
    }
    refresh_controls(state);

    // 80ms tick for the level meter; every 12th tick (~1s) refreshes the timer.
    let sender = state.borrow().backend_sender.clone();
    let audio_buf = state.borrow().audio_buffer.clone();
    let tick_counter = Arc::new(AtomicUsize::new(0));

    let source = glib::timeout_add_local(std::time::Duration::from_millis(80), move || {
        let rms = audio_buf
            .lock()
            .map(|buf| crate::recorder::recent_rms(&buf, LEVEL_WINDOW))
            .unwrap_or(0.0);
        let _ = sender.try_send(BackendEvent::AudioLevel(rms));

        let count = tick_counter.fetch_add(1, Ordering::Relaxed);
        if count % 12 == 0 {
            let _ = sender.try_send(BackendEvent::TimerTick);
        }

        glib::ControlFlow::Continue
    });
    state.borrow_mut().timer_source = Some(source);
}

/// Stop recording, encode the capture and dispatch transcription.
pub fn stop_recording(state: &Rc<RefCell<AppState>>) {
    log::info!("Stopping recording");

    let elapsed = {
        let mut s = state.borrow_mut();
        if let Some(source) = s.timer_source.take() {
            source.remove();
        }
        // Dropping the stream releases the device.
        s.cpal_stream = None;
        if let Some(ref win) = s.window {
            win.set_recording(false);
        }
        s.session.recording_stopped(Instant::now())
    };

    if let Err(e) = elapsed {
        log::warn!("Stop ignored: {e}");
        refresh_controls(state);
        return;
    }

    let samples: Vec<f32> = state
        .borrow()
        .audio_buffer
        .lock()
        .map(|buf| buf.clone())
        .unwrap_or_default();
    let sample_rate = state.borrow().sample_rate;

    log::info!(
        "Captured {} samples ({:.1}s at {}Hz)",
        samples.len(),
        samples.len() as f32 / sample_rate as f32,
        sample_rate
    );

    match crate::recorder::samples_to_wav(&samples, sample_rate) {
        Ok(wav) => {
            state
                .borrow_mut()
                .session
                .recording_encoded(AudioPayload::recorded(wav));
            sync_playback(state);
            dispatch_transcription(state);
        }
        Err(e) => {
            log::warn!("Recording discarded: {e}");
            set_status(state, &format!("Error: {e}"));
            refresh_controls(state);
        }
    }
}

/// Open a file chooser and validate the chosen file before reading it.
pub fn choose_file(state: &Rc<RefCell<AppState>>) {
    let Some(window) = state.borrow().window.as_ref().map(|w| w.window.clone()) else {
        return;
    };

    let filter = gtk4::FileFilter::new();
    filter.set_name(Some("Audio files"));
    for suffix in ["mp3", "wav", "m4a", "webm", "ogg"] {
        filter.add_suffix(suffix);
    }
    let dialog = gtk4::FileDialog::builder()
        .title("Choose an audio file")
        .modal(true)
        .default_filter(&filter)
        .build();

    let state = state.clone();
    dialog.open(Some(&window), None::<&gtk4::gio::Cancellable>, move |result| {
        let file = match result {
            Ok(file) => file,
            Err(e) => {
                log::info!("File selection dismissed: {e}");
                return;
            }
        };
        on_file_chosen(&state, &file);
    });
}

fn on_file_chosen(state: &Rc<RefCell<AppState>>, file: &gtk4::gio::File) {
    let Some(path) = file.path() else {
        set_status(state, "Only local files can be uploaded");
        return;
    };
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let info = file.query_info(
        "standard::content-type,standard::size",
        gtk4::gio::FileQueryInfoFlags::NONE,
        None::<&gtk4::gio::Cancellable>,
    );
    let (size, mime_type) = match info {
        Ok(info) => (
            info.size().max(0) as u64,
            info.content_type()
                .and_then(|ct| gtk4::gio::content_type_get_mime_type(&ct))
                .map(|m| m.to_string()),
        ),
        Err(e) => {
            log::warn!("Could not inspect {}: {e}", path.display());
            set_status(state, &format!("Could not read file: {e}"));
            return;
        }
    };

    if let Err(e) = audio::validate_upload(&filename, mime_type.as_deref(), size) {
        log::info!("Rejected upload {filename}: {e}");
        if let Some(ref win) = state.borrow().window {
            win.show_alert(&e.to_string());
        }
        return;
    }

    log::info!("Reading upload {filename} ({size} bytes, {mime_type:?})");
    dispatch_file_read(state, path, filename, mime_type);
}

/// Make a loaded upload the active payload and transcribe it.
pub fn on_file_loaded(state: &Rc<RefCell<AppState>>, payload: AudioPayload) {
    let name = payload.filename.clone();
    let selected = state.borrow_mut().session.select_file(payload);
    if let Err(e) = selected {
        log::info!("Rejected upload {name}: {e}");
        if let Some(ref win) = state.borrow().window {
            win.show_alert(&e.to_string());
        }
        return;
    }

    if let Some(ref win) = state.borrow().window {
        win.set_file(Some(&name));
        win.set_transcript(None);
        win.timer_label.set_text(&audio::format_elapsed(std::time::Duration::ZERO));
    }
    sync_playback(state);
    dispatch_transcription(state);
}

/// Drop the uploaded file and return to the initial prompt.
pub fn remove_file(state: &Rc<RefCell<AppState>>) {
    log::info!("Removing uploaded file");
    state.borrow_mut().session.remove_file();
    if let Some(ref win) = state.borrow().window {
        win.set_file(None);
        win.set_transcript(None);
        win.status_label.set_text(INITIAL_STATUS);
    }
    sync_playback(state);
    refresh_controls(state);
}

/// Point the player at whatever audio is active.
fn sync_playback(state: &Rc<RefCell<AppState>>) {
    let s = state.borrow();
    if let Some(ref win) = s.window {
        win.set_playback(s.session.playback());
    }
}
