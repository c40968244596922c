pub mod recipe;

pub use recipe::{format_number, Column, Instructions, ListField, NumericField, RecipeRecord};
