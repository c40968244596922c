pub mod config;
pub mod dataset;
pub mod domain;
pub mod errors;
pub mod nutrition;
pub mod search;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat};
pub use dataset::{DatasetSource, DatasetStore};
pub use domain::{Column, Instructions, ListField, NumericField, RecipeRecord};
pub use errors::{ApplicationError, DatasetError, InterfaceError};
pub use nutrition::nutrition_lookup;
pub use search::{FilterEngine, SearchCriteria, SearchOutcome};
