mod evaluate;
mod event_handler;
mod pipeline;
mod recording;
mod rubric;
pub mod session;
mod state;

pub use evaluate::{apply_api_url, evaluate};
pub use event_handler::handle_backend_event;
pub use pipeline::{cancel_request, dispatch_health_check};
pub use recording::{check_microphone, choose_file, remove_file, toggle_recording};
pub use rubric::{select_level, sync_input_mode};
pub use state::{refresh_controls, AppState, BackendEvent};
