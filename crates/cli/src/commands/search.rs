use clap::Args;
use larder_core::search::{FilterEngine, SearchCriteria};

use crate::commands::{
    async_runtime, dataset_failure, load_config, load_store, CommandContext, CommandResult,
};

#[derive(Debug, Clone, Default, Args)]
pub struct SearchArgs {
    #[arg(long = "ingredient", value_name = "TEXT", help = "Required ingredient (repeatable)")]
    pub ingredients: Vec<String>,
    #[arg(long, help = "Recipe category, e.g. Dessert")]
    pub category: Option<String>,
    #[arg(long, value_name = "KCAL")]
    pub max_calories: Option<f64>,
    #[arg(long, value_name = "MG")]
    pub max_sodium: Option<f64>,
    #[arg(long, value_name = "TEXT", help = "Cuisine keyword, e.g. Italian")]
    pub cuisine: Option<String>,
    #[arg(long, value_name = "MINUTES")]
    pub max_cook_time: Option<f64>,
    #[arg(long, value_name = "TEXT", help = "Text the recipe name must contain")]
    pub name: Option<String>,
    #[arg(long, value_name = "N", help = "Recipes to show before summarising the rest")]
    pub max_results: Option<usize>,
}

impl SearchArgs {
    pub fn criteria(&self) -> SearchCriteria {
        SearchCriteria {
            ingredients: (!self.ingredients.is_empty()).then(|| self.ingredients.clone()),
            category: self.category.clone(),
            max_calories: self.max_calories,
            max_sodium_mg: self.max_sodium,
            cuisine_keyword: self.cuisine.clone(),
            max_cook_time_minutes: self.max_cook_time,
            name_contains: self.name.clone(),
        }
    }
}

pub fn run(context: &CommandContext, args: &SearchArgs) -> CommandResult {
    let config = match load_config("search", context, true) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match async_runtime("search") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let store = match runtime.block_on(load_store(&config)) {
        Ok(store) => store,
        Err(message) => return dataset_failure("search", message),
    };

    let max_results =
        args.max_results.filter(|limit| *limit > 0).unwrap_or(config.search.max_results);
    let engine = FilterEngine::new(store).with_max_results(max_results);
    CommandResult::text(engine.search(&args.criteria()))
}
