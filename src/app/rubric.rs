use std::cell::RefCell;
use std::rc::Rc;

use gtk4::prelude::*;

use super::session::RubricInput;
use super::state::{set_status, AppState};
use crate::rubric::catalog;
use crate::ui::window::{clear_box, placeholder, MANUAL_PAGE};

/// Level toggle: reset the checked cells and redraw the category list.
pub fn select_level(state: &Rc<RefCell<AppState>>, index: usize) {
    let selected = state.borrow_mut().session.selection.select_level(index);
    let label = match selected {
        Ok(label) => label,
        Err(e) => {
            log::warn!("Level selection rejected: {e}");
            return;
        }
    };
    log::info!("Selected level {label}");

    redraw_categories(state);
    redraw_summary(state);

    let client_side = state.borrow().config.scoring_mode.is_client_side();
    let status = if client_side {
        format!(
            "Selected {label} level - {}",
            catalog::describe_adjustment(label.multiplier())
        )
    } else {
        format!("Selected {label} level")
    };
    set_status(state, &status);
}

/// Rebuild the category check list for the current level.
pub fn redraw_categories(state: &Rc<RefCell<AppState>>) {
    let (container, visible, checked) = {
        let s = state.borrow();
        let Some(ref win) = s.window else {
            return;
        };
        let selection = &s.session.selection;
        let visible = selection.visible_categories();
        let checked: Vec<bool> = visible.iter().map(|c| selection.is_checked(c.key)).collect();
        (win.categories_box.clone(), visible, checked)
    };

    clear_box(&container);
    if visible.is_empty() {
        container.append(&placeholder("Select a level first"));
        return;
    }

    for (category, is_checked) in visible.into_iter().zip(checked) {
        let check = gtk4::CheckButton::with_label(category.name);
        check.set_active(is_checked);

        let key = category.key;
        let state = state.clone();
        check.connect_toggled(move |button| {
            let toggled = state.borrow_mut().session.selection.toggle_category(key);
            match toggled {
                Ok(now_checked) if now_checked != button.is_active() => {
                    log::warn!("Checkbox for {key} out of sync with selection");
                }
                Ok(_) => {}
                Err(e) => log::warn!("Category toggle rejected: {e}"),
            }
            redraw_summary(&state);
        });
        container.append(&check);
    }
}

/// Rebuild the selected-rubrics summary.
pub fn redraw_summary(state: &Rc<RefCell<AppState>>) {
    let s = state.borrow();
    let Some(ref win) = s.window else {
        return;
    };
    let client_side = s.config.scoring_mode.is_client_side();
    let items = s.session.selection.build_summary_view();

    clear_box(&win.summary_box);
    if items.is_empty() {
        win.summary_box
            .append(&placeholder("Select categories to see summary..."));
        return;
    }

    for item in items {
        let heading = if client_side {
            let pct = catalog::adjustment_percent(item.level_label.multiplier());
            let sign = if pct > 0 { "+" } else { "" };
            format!("{} - {} ({sign}{pct}%)", item.category, item.level_label)
        } else {
            format!("{} - {}", item.category, item.level_label)
        };

        let title = gtk4::Label::new(Some(&heading));
        title.add_css_class("heading");
        title.set_xalign(0.0);
        let description = gtk4::Label::new(Some(item.description));
        description.set_wrap(true);
        description.set_xalign(0.0);
        description.add_css_class("dim-label");

        let entry = gtk4::Box::new(gtk4::Orientation::Vertical, 2);
        entry.set_margin_top(4);
        entry.append(&title);
        entry.append(&description);
        win.summary_box.append(&entry);
    }
}

/// Track which rubric input page is showing.
pub fn sync_input_mode(state: &Rc<RefCell<AppState>>) {
    let mut s = state.borrow_mut();
    let Some(page) = s
        .window
        .as_ref()
        .and_then(|w| w.rubric_stack.visible_child_name())
    else {
        return;
    };
    let mode = if page.as_str() == MANUAL_PAGE {
        RubricInput::Manual
    } else {
        RubricInput::Catalog
    };
    log::debug!("Rubric input mode: {mode:?}");
    s.session.input_mode = mode;
}
