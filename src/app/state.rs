use std::sync::{Arc, Mutex};

use gtk4::glib;
use gtk4::prelude::*;

use super::session::{RequestId, Session};
use crate::api::{ApiClient, HealthStatus};
use crate::audio::AudioPayload;
use crate::config::Config;
use crate::error::ApiError;
use crate::evaluation::EvaluationResponse;
use crate::ui::window::MainWindow;

/// Events sent from background tasks to the GTK main thread.
#[derive(Debug)]
pub enum BackendEvent {
    HealthChecked {
        id: RequestId,
        status: HealthStatus,
    },
    FileLoaded(Result<AudioPayload, String>),
    TranscriptionFinished {
        id: RequestId,
        result: Result<String, ApiError>,
    },
    EvaluationFinished {
        id: RequestId,
        result: Result<EvaluationResponse, ApiError>,
    },
    TimerTick,
    AudioLevel(f32),
}

/// Central application state. Lives on the GTK main thread inside Rc<RefCell<>>.
pub struct AppState {
    pub config: Config,
    pub session: Session,
    pub api: ApiClient,
    pub tokio_rt: tokio::runtime::Runtime,
    pub backend_sender: async_channel::Sender<BackendEvent>,

    // Recording state
    pub audio_buffer: Arc<Mutex<Vec<f32>>>,
    pub cpal_stream: Option<cpal::Stream>,
    pub timer_source: Option<glib::SourceId>,
    pub sample_rate: u32,

    /// Abort handle of the transcription/evaluation task in flight.
    pub request_task: Option<tokio::task::AbortHandle>,

    pub window: Option<MainWindow>,
}

impl AppState {
    pub fn new(sender: async_channel::Sender<BackendEvent>) -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::load();
        log::info!(
            "Backend {} ({:?} scoring, {}s timeout)",
            config.api_base_url,
            config.scoring_mode,
            config.request_timeout_secs
        );
        let api = ApiClient::new(&config.api_base_url, config.request_timeout())?;
        let tokio_rt = tokio::runtime::Runtime::new()?;

        Ok(Self {
            config,
            session: Session::new(),
            api,
            tokio_rt,
            backend_sender: sender,
            audio_buffer: Arc::new(Mutex::new(Vec::new())),
            cpal_stream: None,
            timer_source: None,
            sample_rate: 16000,
            request_task: None,
            window: None,
        })
    }
}

/// Set the status line.
pub fn set_status(state: &std::rc::Rc<std::cell::RefCell<AppState>>, text: &str) {
    if let Some(ref win) = state.borrow().window {
        win.status_label.set_text(text);
    }
}

/// Push the session's control availability onto the widgets.
pub fn refresh_controls(state: &std::rc::Rc<std::cell::RefCell<AppState>>) {
    let s = state.borrow();
    let Some(ref win) = s.window else {
        return;
    };
    let controls = s.session.controls();
    win.record_button.set_sensitive(controls.record);
    win.upload_button.set_sensitive(controls.upload);
    win.remove_file_button.set_sensitive(controls.upload);
    win.evaluate_button.set_sensitive(controls.evaluate);
    win.cancel_button.set_visible(controls.cancel);
}
