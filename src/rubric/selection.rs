use super::catalog::{self, LevelLabel, RubricCategory};
use crate::error::ValidationError;

/// A checked (category, level) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionCell {
    pub category_key: &'static str,
    pub category_name: &'static str,
    pub level: usize,
    pub description: &'static str,
}

impl SelectionCell {
    pub fn level_label(&self) -> LevelLabel {
        // Cells are only created from valid catalog indices.
        catalog::level(self.level).map_or(LevelLabel::Proficient, |l| l.label)
    }
}

/// One line of the selection summary panel.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryItem {
    pub category: &'static str,
    pub level_label: LevelLabel,
    pub description: &'static str,
}

/// Chosen proficiency level plus the checked cells, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    level: Option<usize>,
    cells: Vec<SelectionCell>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> Option<usize> {
        self.level
    }

    pub fn level_label(&self) -> Option<LevelLabel> {
        self.level.and_then(catalog::level).map(|l| l.label)
    }

    pub fn cells(&self) -> &[SelectionCell] {
        &self.cells
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Switch level. Always drops every checked cell, whatever level it
    /// belonged to.
    pub fn select_level(&mut self, index: usize) -> Result<LevelLabel, ValidationError> {
        let level = catalog::level(index).ok_or(ValidationError::UnknownLevel(index))?;
        self.level = Some(index);
        self.cells.clear();
        Ok(level.label)
    }

    /// Categories that have a description at the current level.
    pub fn visible_categories(&self) -> Vec<&'static RubricCategory> {
        match self.level {
            Some(level) => catalog::categories()
                .iter()
                .filter(|c| c.is_valid_at(level))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn is_checked(&self, category_key: &str) -> bool {
        self.level
            .is_some_and(|level| self.position(category_key, level).is_some())
    }

    /// Flip the cell for `category_key` at the current level.
    /// Returns whether the cell is checked afterwards.
    pub fn toggle_category(&mut self, category_key: &str) -> Result<bool, ValidationError> {
        let level = self.level.ok_or(ValidationError::NoLevelSelected)?;
        let category = catalog::category(category_key)
            .ok_or_else(|| ValidationError::CategoryUnavailable(category_key.to_string()))?;
        let description = category
            .description(level)
            .ok_or_else(|| ValidationError::CategoryUnavailable(category.name.to_string()))?;

        if let Some(pos) = self.position(category.key, level) {
            self.cells.remove(pos);
            return Ok(false);
        }

        self.cells.push(SelectionCell {
            category_key: category.key,
            category_name: category.name,
            level,
            description,
        });
        Ok(true)
    }

    /// Rubric text sent to the evaluator. With `announce_level`, the text is
    /// prefixed with the selected level so the backend can scale scores.
    pub fn build_rubric_text(&self, announce_level: bool) -> String {
        let mut text = String::new();
        if announce_level {
            if let Some(label) = self.level_label() {
                text.push_str(&format!("EVALUATION LEVEL: {label}\n\n"));
            }
        }
        for cell in &self.cells {
            text.push_str(&format!(
                "{} ({} Level)\n{}\n\n",
                cell.category_name,
                cell.level_label(),
                cell.description
            ));
        }
        text
    }

    pub fn build_summary_view(&self) -> Vec<SummaryItem> {
        self.cells
            .iter()
            .map(|cell| SummaryItem {
                category: cell.category_name,
                level_label: cell.level_label(),
                description: cell.description,
            })
            .collect()
    }

    fn position(&self, category_key: &str, level: usize) -> Option<usize> {
        self.cells
            .iter()
            .position(|c| c.category_key == category_key && c.level == level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rubric::catalog::{categories, LEVEL_COUNT};

    #[test]
    fn test_toggle_only_visible_categories() {
        for level in 0..LEVEL_COUNT {
            let mut sel = Selection::new();
            sel.select_level(level).unwrap();
            let visible: Vec<_> = sel.visible_categories().iter().map(|c| c.key).collect();

            for cat in categories() {
                let result = sel.toggle_category(cat.key);
                if cat.is_valid_at(level) {
                    assert!(visible.contains(&cat.key));
                    assert_eq!(result, Ok(true), "{} at {}", cat.key, level);
                } else {
                    assert!(!visible.contains(&cat.key));
                    assert!(result.is_err(), "{} at {} should be rejected", cat.key, level);
                }
            }
        }
    }

    #[test]
    fn test_toggle_off_removes_exact_cell() {
        let mut sel = Selection::new();
        sel.select_level(3).unwrap();
        sel.toggle_category("grammar").unwrap();
        sel.toggle_category("fluency").unwrap();
        sel.toggle_category("audience").unwrap();

        assert_eq!(sel.toggle_category("fluency"), Ok(false));
        let keys: Vec<_> = sel.cells().iter().map(|c| c.category_key).collect();
        assert_eq!(keys, vec!["grammar", "audience"]);
        assert!(!sel.is_checked("fluency"));
        assert!(sel.is_checked("grammar"));
    }

    #[test]
    fn test_level_change_clears_selection() {
        let mut sel = Selection::new();
        sel.select_level(4).unwrap();
        sel.toggle_category("grammar").unwrap();
        sel.toggle_category("audience").unwrap();
        assert_eq!(sel.cells().len(), 2);

        sel.select_level(1).unwrap();
        assert!(sel.is_empty());

        // Re-selecting the same level still clears.
        sel.toggle_category("fluency").unwrap();
        sel.select_level(1).unwrap();
        assert!(sel.is_empty());
    }

    #[test]
    fn test_reselecting_current_level_resets_cells() {
        let mut sel = Selection::new();
        sel.select_level(2).unwrap();
        sel.toggle_category("comprehensibility").unwrap();
        assert!(sel.is_checked("comprehensibility"));

        assert_eq!(sel.select_level(2).unwrap(), LevelLabel::Competent);
        assert_eq!(sel.level(), Some(2));
        assert!(!sel.is_checked("comprehensibility"));
        assert_eq!(sel.build_rubric_text(false), "");
    }

    #[test]
    fn test_toggle_without_level_fails() {
        let mut sel = Selection::new();
        assert_eq!(
            sel.toggle_category("grammar"),
            Err(ValidationError::NoLevelSelected)
        );
        assert!(sel.visible_categories().is_empty());
    }

    #[test]
    fn test_unknown_level_rejected() {
        let mut sel = Selection::new();
        sel.select_level(2).unwrap();
        sel.toggle_category("grammar").unwrap();
        assert_eq!(sel.select_level(5), Err(ValidationError::UnknownLevel(5)));
        assert_eq!(sel.level(), Some(2));
        assert_eq!(sel.cells().len(), 1);
    }

    #[test]
    fn test_rubric_text_single_cell() {
        let mut sel = Selection::new();
        sel.select_level(2).unwrap();
        sel.toggle_category("comprehensibility").unwrap();

        assert_eq!(
            sel.build_rubric_text(false),
            "Comprehensibility (Competent Level)\nClear & easy to follow\n\n"
        );
        assert_eq!(
            sel.build_rubric_text(true),
            "EVALUATION LEVEL: Competent\n\nComprehensibility (Competent Level)\nClear & easy to follow\n\n"
        );
    }

    #[test]
    fn test_rubric_text_keeps_insertion_order() {
        let mut sel = Selection::new();
        sel.select_level(0).unwrap();
        sel.toggle_category("fluency").unwrap();
        sel.toggle_category("comprehensibility").unwrap();

        let text = sel.build_rubric_text(false);
        let fluency = text.find("Fluency").unwrap();
        let comp = text.find("Comprehensibility").unwrap();
        assert!(fluency < comp);
        assert!(text.contains("Fluency (Beginner Level)\nFrequent pauses; fragmented\n\n"));
    }

    #[test]
    fn test_summary_view() {
        let mut sel = Selection::new();
        sel.select_level(1).unwrap();
        sel.toggle_category("interaction").unwrap();

        let summary = sel.build_summary_view();
        assert_eq!(
            summary,
            vec![SummaryItem {
                category: "Interaction & Spontaneous Response",
                level_label: LevelLabel::Developing,
                description: "Responds to simple questions",
            }]
        );
    }
}
