use gtk4::prelude::*;
use libadwaita::prelude::*;

use super::window::{clear_box, placeholder};
use crate::report::{ReportEntry, ScoreCell};

/// Replace the results area with the given report, newest first.
pub fn show_report(container: &gtk4::Box, report: &[ReportEntry]) {
    clear_box(container);

    if report.is_empty() {
        container.append(&placeholder("No evaluations yet."));
        return;
    }

    for entry in report {
        container.append(&build_entry(entry));
    }
}

fn build_entry(entry: &ReportEntry) -> gtk4::Box {
    let card = gtk4::Box::new(gtk4::Orientation::Vertical, 6);

    let header = gtk4::Box::new(gtk4::Orientation::Horizontal, 8);
    let title = gtk4::Label::new(Some(&entry.title()));
    title.add_css_class("heading");
    title.set_hexpand(true);
    title.set_xalign(0.0);
    let timestamp = gtk4::Label::new(Some(&entry.timestamp));
    timestamp.add_css_class("dim-label");
    header.append(&title);
    header.append(&timestamp);
    card.append(&header);

    let list = gtk4::ListBox::new();
    list.set_selection_mode(gtk4::SelectionMode::None);
    list.add_css_class("boxed-list");

    list.append(&text_row("Question", &entry.question));

    let level_row = text_row("Proficiency Level", &entry.level);
    if let Some(adjustment) = entry.adjustment_text() {
        let label = gtk4::Label::new(Some(&adjustment));
        label.add_css_class(if entry.adjustment_percent.unwrap_or(0) > 0 {
            "success"
        } else {
            "error"
        });
        level_row.add_suffix(&label);
    }
    if let Some(note) = entry.cache_note {
        level_row.set_subtitle(&format!("{} \u{b7} {note}", entry.level));
    }
    list.append(&level_row);

    list.append(&response_row(entry));

    let score_row = libadwaita::ActionRow::builder()
        .title("Overall Score")
        .build();
    if let Some(ref breakdown) = entry.breakdown {
        score_row.set_subtitle(&format!("Base score (native speaker) {}", breakdown.text()));
    }
    score_row.add_suffix(&score_label(&entry.overall));
    list.append(&score_row);

    if let Some(ref summary) = entry.summary {
        list.append(&text_row("Summary", summary));
    }

    card.append(&list);

    if !entry.criteria.is_empty() {
        let criteria = gtk4::ListBox::new();
        criteria.set_selection_mode(gtk4::SelectionMode::None);
        criteria.add_css_class("boxed-list");
        for row in &entry.criteria {
            let action_row = libadwaita::ActionRow::new();
            action_row.set_use_markup(false);
            action_row.set_title(&row.criterion);
            action_row.set_subtitle(&row.feedback);
            action_row.add_suffix(&score_label(&row.score));
            criteria.append(&action_row);
        }
        card.append(&criteria);
    }

    card
}

fn text_row(title: &str, value: &str) -> libadwaita::ActionRow {
    let row = libadwaita::ActionRow::new();
    row.set_use_markup(false);
    row.set_title(title);
    row.set_subtitle(value);
    row.set_subtitle_selectable(true);
    row
}

/// Truncated response, expanding to the full transcript.
fn response_row(entry: &ReportEntry) -> libadwaita::ExpanderRow {
    let row = libadwaita::ExpanderRow::new();
    row.set_use_markup(false);
    row.set_title("Response");
    row.set_subtitle(&entry.response_preview);

    let full_text_row = libadwaita::ActionRow::new();
    let label = gtk4::Label::new(Some(&entry.full_response));
    label.set_wrap(true);
    label.set_xalign(0.0);
    label.set_margin_top(4);
    label.set_margin_bottom(4);
    label.set_margin_start(8);
    label.set_margin_end(8);
    label.set_selectable(true);
    full_text_row.set_child(Some(&label));
    row.add_row(&full_text_row);

    row
}

fn score_label(score: &ScoreCell) -> gtk4::Label {
    let label = gtk4::Label::new(Some(&score.text()));
    label.add_css_class("heading");
    label.add_css_class(score.class.css_class());
    label.set_tooltip_text(Some(score.class.name()));
    label.set_valign(gtk4::Align::Center);
    label
}
