use gtk4::prelude::*;
use libadwaita::prelude::*;

use crate::api::HealthStatus;
use crate::audio::AudioPayload;
use crate::rubric::catalog;

pub const CATALOG_PAGE: &str = "catalog";
pub const MANUAL_PAGE: &str = "manual";
pub const INITIAL_STATUS: &str = "Click the microphone to start recording or upload a file";

/// Handles returned from building the main window.
pub struct MainWindow {
    pub window: libadwaita::ApplicationWindow,
    pub api_badge: gtk4::Label,
    pub status_label: gtk4::Label,
    pub question_row: libadwaita::EntryRow,
    pub rubric_stack: gtk4::Stack,
    pub level_buttons: Vec<gtk4::ToggleButton>,
    pub categories_box: gtk4::Box,
    pub summary_box: gtk4::Box,
    pub manual_view: gtk4::TextView,
    pub record_button: gtk4::Button,
    pub timer_label: gtk4::Label,
    pub level_bar: gtk4::LevelBar,
    pub upload_button: gtk4::Button,
    pub file_row: libadwaita::ActionRow,
    pub remove_file_button: gtk4::Button,
    pub player: gtk4::MediaControls,
    pub transcript_group: libadwaita::PreferencesGroup,
    pub transcript_label: gtk4::Label,
    pub evaluate_button: gtk4::Button,
    pub cancel_button: gtk4::Button,
    pub api_url_row: libadwaita::EntryRow,
    pub results_box: gtk4::Box,
    pub scrolled: gtk4::ScrolledWindow,
    pub content: gtk4::Box,
}

impl MainWindow {
    pub fn question(&self) -> String {
        self.question_row.text().to_string()
    }

    pub fn manual_rubrics(&self) -> String {
        let buffer = self.manual_view.buffer();
        buffer
            .text(&buffer.start_iter(), &buffer.end_iter(), false)
            .to_string()
    }

    pub fn set_health(&self, status: HealthStatus) {
        for class in ["success", "warning", "error"] {
            self.api_badge.remove_css_class(class);
        }
        self.api_badge.add_css_class(match status {
            HealthStatus::Connected => "success",
            HealthStatus::NotConfigured => "warning",
            HealthStatus::Disconnected => "error",
        });
        self.api_badge
            .set_text(&format!("\u{25CF} {}", status.label()));
    }

    pub fn set_recording(&self, recording: bool) {
        if recording {
            self.record_button.set_icon_name("media-playback-stop-symbolic");
            self.record_button.set_tooltip_text(Some("Stop recording"));
            self.record_button.add_css_class("destructive-action");
            self.level_bar.set_visible(true);
        } else {
            self.record_button.set_icon_name("audio-input-microphone-symbolic");
            self.record_button.set_tooltip_text(Some("Start recording"));
            self.record_button.remove_css_class("destructive-action");
            self.level_bar.set_value(0.0);
            self.level_bar.set_visible(false);
        }
    }

    /// Show or hide the selected-file row.
    pub fn set_file(&self, name: Option<&str>) {
        match name {
            Some(name) => {
                self.file_row.set_title(name);
                self.file_row.set_visible(true);
                self.upload_button.set_visible(false);
            }
            None => {
                self.file_row.set_visible(false);
                self.upload_button.set_visible(true);
            }
        }
    }

    /// Load the active audio into the player, or hide it.
    pub fn set_playback(&self, payload: Option<&AudioPayload>) {
        if let Some(previous) = self.player.media_stream() {
            previous.pause();
        }
        match payload {
            Some(payload) => {
                let bytes = gtk4::glib::Bytes::from_owned(payload.bytes.clone());
                let input = gtk4::gio::MemoryInputStream::from_bytes(&bytes);
                let media = gtk4::MediaFile::for_input_stream(&input);
                self.player.set_media_stream(Some(&media));
                self.player.set_visible(true);
            }
            None => {
                self.player.set_media_stream(None::<&gtk4::MediaStream>);
                self.player.set_visible(false);
            }
        }
    }

    pub fn set_transcript(&self, text: Option<&str>) {
        match text {
            Some(text) => {
                self.transcript_label.set_text(text);
                self.transcript_group.set_visible(true);
            }
            None => {
                self.transcript_label.set_text("");
                self.transcript_group.set_visible(false);
            }
        }
    }

    /// Modal message for rejected input.
    pub fn show_alert(&self, message: &str) {
        let dialog = libadwaita::AlertDialog::builder()
            .heading("Speech Evaluator")
            .body(message)
            .build();
        dialog.add_response("ok", "OK");
        let parent_widget: Option<&gtk4::Widget> = Some(self.window.upcast_ref());
        dialog.choose(parent_widget, None::<&gtk4::gio::Cancellable>, |_response_id| {});
    }
}

/// Remove every child of a box.
pub fn clear_box(container: &gtk4::Box) {
    while let Some(child) = container.first_child() {
        container.remove(&child);
    }
}

/// Dim placeholder line.
pub fn placeholder(text: &str) -> gtk4::Label {
    let label = gtk4::Label::new(Some(text));
    label.add_css_class("dim-label");
    label.set_xalign(0.0);
    label.set_margin_top(6);
    label.set_margin_bottom(6);
    label
}

/// Build the main window.
pub fn build_main_window(app: &libadwaita::Application, initial_api_url: &str) -> MainWindow {
    let window = libadwaita::ApplicationWindow::builder()
        .application(app)
        .title("Speech Evaluator")
        .default_width(640)
        .default_height(820)
        .build();

    let toolbar_view = libadwaita::ToolbarView::new();
    let header = libadwaita::HeaderBar::new();

    let api_badge = gtk4::Label::new(Some("\u{25CF} Checking..."));
    api_badge.add_css_class("caption-heading");
    header.pack_end(&api_badge);
    toolbar_view.add_top_bar(&header);

    let content = gtk4::Box::new(gtk4::Orientation::Vertical, 12);
    content.set_margin_start(16);
    content.set_margin_end(16);
    content.set_margin_top(12);
    content.set_margin_bottom(12);

    // --- Question group ---
    let question_group = libadwaita::PreferencesGroup::new();
    question_group.set_title("Question");
    let question_row = libadwaita::EntryRow::builder()
        .title("Question asked to the speaker")
        .build();
    question_group.add(&question_row);
    content.append(&question_group);

    // --- Rubric group ---
    let rubric_group = libadwaita::PreferencesGroup::new();
    rubric_group.set_title("Evaluation Rubrics");

    let rubric_stack = gtk4::Stack::new();
    rubric_stack.set_vhomogeneous(false);
    let switcher = gtk4::StackSwitcher::new();
    switcher.set_stack(Some(&rubric_stack));
    switcher.set_halign(gtk4::Align::Center);
    switcher.set_margin_bottom(8);

    let catalog_page = gtk4::Box::new(gtk4::Orientation::Vertical, 8);

    let level_box = gtk4::Box::new(gtk4::Orientation::Horizontal, 0);
    level_box.add_css_class("linked");
    level_box.set_halign(gtk4::Align::Center);
    let mut level_buttons: Vec<gtk4::ToggleButton> = Vec::new();
    for level in catalog::levels() {
        let button = gtk4::ToggleButton::with_label(level.label.as_str());
        if let Some(first) = level_buttons.first() {
            button.set_group(Some(first));
        }
        level_box.append(&button);
        level_buttons.push(button);
    }
    catalog_page.append(&level_box);

    let categories_box = gtk4::Box::new(gtk4::Orientation::Vertical, 2);
    categories_box.set_margin_start(8);
    categories_box.append(&placeholder("Select a level first"));
    catalog_page.append(&categories_box);

    let summary_frame = gtk4::Frame::new(Some("Selected Rubrics"));
    let summary_box = gtk4::Box::new(gtk4::Orientation::Vertical, 6);
    summary_box.set_margin_start(8);
    summary_box.set_margin_end(8);
    summary_box.set_margin_bottom(8);
    summary_box.append(&placeholder("Select categories to see summary..."));
    summary_frame.set_child(Some(&summary_box));
    catalog_page.append(&summary_frame);

    let manual_view = gtk4::TextView::new();
    manual_view.set_wrap_mode(gtk4::WrapMode::WordChar);
    manual_view.set_top_margin(8);
    manual_view.set_bottom_margin(8);
    manual_view.set_left_margin(8);
    manual_view.set_right_margin(8);
    let manual_scroller = gtk4::ScrolledWindow::builder()
        .hscrollbar_policy(gtk4::PolicyType::Never)
        .min_content_height(160)
        .child(&manual_view)
        .build();
    manual_scroller.add_css_class("card");

    rubric_stack.add_titled(&catalog_page, Some(CATALOG_PAGE), "Rubric Catalog");
    rubric_stack.add_titled(&manual_scroller, Some(MANUAL_PAGE), "Manual Input");

    let rubric_box = gtk4::Box::new(gtk4::Orientation::Vertical, 0);
    rubric_box.append(&switcher);
    rubric_box.append(&rubric_stack);
    rubric_group.add(&rubric_box);
    content.append(&rubric_group);

    // --- Audio group ---
    let audio_group = libadwaita::PreferencesGroup::new();
    audio_group.set_title("Spoken Response");

    let record_row = libadwaita::ActionRow::builder()
        .title("Record from microphone")
        .build();
    let level_bar = gtk4::LevelBar::for_interval(0.0, 1.0);
    level_bar.set_width_request(120);
    level_bar.set_valign(gtk4::Align::Center);
    level_bar.set_visible(false);
    record_row.add_suffix(&level_bar);
    let timer_label = gtk4::Label::new(Some("00:00"));
    timer_label.add_css_class("numeric");
    timer_label.add_css_class("dim-label");
    record_row.add_suffix(&timer_label);
    let record_button = gtk4::Button::builder()
        .icon_name("audio-input-microphone-symbolic")
        .tooltip_text("Start recording")
        .valign(gtk4::Align::Center)
        .build();
    record_button.add_css_class("circular");
    record_row.add_suffix(&record_button);
    audio_group.add(&record_row);

    let upload_row = libadwaita::ActionRow::builder()
        .title("Or upload an audio file")
        .subtitle("MP3, WAV, M4A, WebM or OGG, up to 25MB")
        .build();
    let upload_button = gtk4::Button::builder()
        .label("Choose File")
        .valign(gtk4::Align::Center)
        .build();
    upload_row.add_suffix(&upload_button);
    audio_group.add(&upload_row);

    let file_row = libadwaita::ActionRow::builder()
        .subtitle("Uploaded file")
        .build();
    file_row.set_use_markup(false);
    let remove_file_button = gtk4::Button::builder()
        .icon_name("user-trash-symbolic")
        .tooltip_text("Remove file")
        .valign(gtk4::Align::Center)
        .build();
    remove_file_button.add_css_class("flat");
    file_row.add_suffix(&remove_file_button);
    file_row.set_visible(false);
    audio_group.add(&file_row);

    let player = gtk4::MediaControls::new(None::<&gtk4::MediaStream>);
    player.set_hexpand(true);
    player.set_margin_top(6);
    player.set_visible(false);
    audio_group.add(&player);
    content.append(&audio_group);

    let transcript_group = libadwaita::PreferencesGroup::new();
    transcript_group.set_title("Transcription");
    let transcript_label = gtk4::Label::new(None);
    transcript_label.set_wrap(true);
    transcript_label.set_xalign(0.0);
    transcript_label.set_selectable(true);
    transcript_label.add_css_class("card");
    transcript_label.set_margin_top(4);
    transcript_group.add(&transcript_label);
    transcript_group.set_visible(false);
    content.append(&transcript_group);

    // --- Status + actions ---
    let status_label = gtk4::Label::new(Some(INITIAL_STATUS));
    status_label.set_wrap(true);
    status_label.add_css_class("dim-label");
    content.append(&status_label);

    let action_box = gtk4::Box::new(gtk4::Orientation::Horizontal, 8);
    action_box.set_halign(gtk4::Align::Center);
    let evaluate_button = gtk4::Button::with_label("Evaluate Response");
    evaluate_button.add_css_class("suggested-action");
    evaluate_button.add_css_class("pill");
    evaluate_button.set_sensitive(false);
    let cancel_button = gtk4::Button::with_label("Cancel");
    cancel_button.add_css_class("pill");
    cancel_button.set_visible(false);
    action_box.append(&evaluate_button);
    action_box.append(&cancel_button);
    content.append(&action_box);

    // --- Results ---
    let results_group = libadwaita::PreferencesGroup::new();
    results_group.set_title("Evaluation Results");
    let results_box = gtk4::Box::new(gtk4::Orientation::Vertical, 18);
    results_box.append(&placeholder("No evaluations yet."));
    results_group.add(&results_box);
    content.append(&results_group);

    // --- Backend settings ---
    let api_group = libadwaita::PreferencesGroup::new();
    api_group.set_title("Backend");
    let api_url_row = libadwaita::EntryRow::builder()
        .title("API endpoint")
        .build();
    api_url_row.set_text(initial_api_url);
    api_url_row.set_show_apply_button(true);
    api_group.add(&api_url_row);
    content.append(&api_group);

    // Assemble
    let scrolled = gtk4::ScrolledWindow::builder()
        .hscrollbar_policy(gtk4::PolicyType::Never)
        .child(&content)
        .build();
    toolbar_view.set_content(Some(&scrolled));
    window.set_content(Some(&toolbar_view));

    MainWindow {
        window,
        api_badge,
        status_label,
        question_row,
        rubric_stack,
        level_buttons,
        categories_box,
        summary_box,
        manual_view,
        record_button,
        timer_label,
        level_bar,
        upload_button,
        file_row,
        remove_file_button,
        player,
        transcript_group,
        transcript_label,
        evaluate_button,
        cancel_button,
        api_url_row,
        results_box,
        scrolled,
        content,
    }
}
