use larder_core::nutrition_lookup;

use crate::commands::{
    async_runtime, dataset_failure, load_config, load_store, CommandContext, CommandResult,
};

pub fn run(context: &CommandContext, recipe_name: &str) -> CommandResult {
    let config = match load_config("nutrition", context, true) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match async_runtime("nutrition") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    match runtime.block_on(load_store(&config)) {
        Ok(store) => CommandResult::text(nutrition_lookup(&store, recipe_name)),
        Err(message) => dataset_failure("nutrition", message),
    }
}
