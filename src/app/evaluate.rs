use std::cell::RefCell;
use std::rc::Rc;

use super::pipeline::{dispatch_evaluation, dispatch_health_check};
use super::state::{set_status, AppState};
use crate::api::ApiClient;

/// Evaluate button: validate inputs, then send the evaluation request.
pub fn evaluate(state: &Rc<RefCell<AppState>>) {
    let (question, manual) = match state.borrow().window {
        Some(ref win) => (win.question(), win.manual_rubrics()),
        None => return,
    };

    let prepared = {
        let s = state.borrow();
        s.session
            .prepare_evaluation(&question, &manual, s.config.scoring_mode)
    };

    match prepared {
        Ok(request) => {
            log::info!(
                "Evaluating {} chars of response (level {:?})",
                request.response.len(),
                request.level
            );
            dispatch_evaluation(state, request);
        }
        Err(e) => {
            log::info!("Evaluation blocked: {e}");
            if let Some(ref win) = state.borrow().window {
                win.show_alert(&e.to_string());
            }
        }
    }
}

/// Persist a new backend URL, rebuild the client and re-probe health.
pub fn apply_api_url(state: &Rc<RefCell<AppState>>, url: &str) {
    let url = url.trim();
    if url.is_empty() {
        set_status(state, "API endpoint cannot be empty");
        return;
    }

    let rebuilt = {
        let mut s = state.borrow_mut();
        match ApiClient::new(url, s.config.request_timeout()) {
            Ok(api) => {
                s.api = api;
                s.config.api_base_url = s.api.base_url().to_string();
                if let Err(e) = s.config.save() {
                    log::warn!("Failed to save config: {e}");
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    };

    match rebuilt {
        Ok(()) => {
            log::info!("Backend set to {url}");
            if let Some(ref win) = state.borrow().window {
                win.api_badge.set_text("\u{25CF} Checking...");
            }
            dispatch_health_check(state);
        }
        Err(e) => {
            log::error!("Invalid backend URL {url}: {e}");
            set_status(state, &format!("Could not use {url}: {e}"));
        }
    }
}
