mod api;
mod app;
mod audio;
mod config;
mod error;
mod evaluation;
mod recorder;
mod report;
mod rubric;
mod ui;

use std::cell::RefCell;
use std::rc::Rc;

use gtk4::prelude::*;
use libadwaita::prelude::*;

use app::{AppState, BackendEvent};

fn main() {
    env_logger::init();
    log::info!("Speech Evaluator starting");

    let application = libadwaita::Application::builder()
        .application_id("com.github.speech-eval.SpeechEval")
        .build();

    application.connect_activate(on_activate);
    application.run();
}

fn on_activate(app: &libadwaita::Application) {
    // Background tasks report back to the main thread through this channel.
    let (backend_tx, backend_rx) = async_channel::unbounded::<BackendEvent>();

    let state = match AppState::new(backend_tx) {
        Ok(state) => Rc::new(RefCell::new(state)),
        Err(e) => {
            log::error!("Failed to initialise: {e}");
            app.quit();
            return;
        }
    };

    let api_url = state.borrow().config.api_base_url.clone();
    let window = ui::window::build_main_window(app, &api_url);

    {
        let state_clone = state.clone();
        window
            .record_button
            .connect_clicked(move |_| app::toggle_recording(&state_clone));
    }
    {
        let state_clone = state.clone();
        window
            .upload_button
            .connect_clicked(move |_| app::choose_file(&state_clone));
    }
    {
        let state_clone = state.clone();
        window
            .remove_file_button
            .connect_clicked(move |_| app::remove_file(&state_clone));
    }
    {
        let state_clone = state.clone();
        window
            .evaluate_button
            .connect_clicked(move |_| app::evaluate(&state_clone));
    }
    {
        let state_clone = state.clone();
        window
            .cancel_button
            .connect_clicked(move |_| app::cancel_request(&state_clone));
    }

    // `clicked` also fires when the already-active level is clicked again,
    // which must still reset the checked categories.
    for (index, button) in window.level_buttons.iter().enumerate() {
        let state_clone = state.clone();
        button.connect_clicked(move |button| {
            if button.is_active() {
                app::select_level(&state_clone, index);
            }
        });
    }

    {
        let state_clone = state.clone();
        window
            .rubric_stack
            .connect_visible_child_name_notify(move |_| app::sync_input_mode(&state_clone));
    }

    {
        let state_clone = state.clone();
        window
            .api_url_row
            .connect_apply(move |row: &libadwaita::EntryRow| {
                let url = row.text().to_string();
                app::apply_api_url(&state_clone, &url);
            });
    }

    let gtk_window = window.window.clone();
    state.borrow_mut().window = Some(window);
    gtk_window.present();

    {
        let state_clone = state.clone();
        gtk4::glib::spawn_future_local(async move {
            while let Ok(event) = backend_rx.recv().await {
                app::handle_backend_event(&state_clone, event);
            }
        });
    }

    app::sync_input_mode(&state);
    app::check_microphone(&state);
    app::refresh_controls(&state);
    app::dispatch_health_check(&state);
}
