pub mod catalog;
pub mod selection;

pub use catalog::LevelLabel;
pub use selection::Selection;
