use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use larder_core::dataset::DatasetStore;
use larder_core::nutrition::nutrition_lookup;
use larder_core::search::{FilterEngine, SearchCriteria};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::llm::AgentError;

pub const SEARCH_TOOL_NAME: &str = "search_recipes_by_criteria";
pub const NUTRITION_TOOL_NAME: &str = "get_nutritional_info";

/// Tool schema advertised to the agent.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn declaration(&self) -> ToolDeclaration;
    async fn execute(&self, input: Value) -> Result<String>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Registry holding the recipe search and nutrition lookup tools over one store.
    pub fn recipe_tools(store: Arc<DatasetStore>, max_results: usize) -> Self {
        let mut registry = Self::default();
        registry.register(SearchRecipesTool::new(
            FilterEngine::new(Arc::clone(&store)).with_max_results(max_results),
        ));
        registry.register(NutritionLookupTool::new(store));
        registry
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|tool| tool.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Declarations sorted by tool name.
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        let mut declarations =
            self.tools.values().map(|tool| tool.declaration()).collect::<Vec<_>>();
        declarations.sort_by(|left, right| left.name.cmp(&right.name));
        declarations
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn parse_args<T>(tool: &str, input: Value) -> Result<T, AgentError>
where
    T: for<'de> Deserialize<'de>,
{
    let input = if input.is_null() { json!({}) } else { input };
    serde_json::from_value(input).map_err(|error| AgentError::InvalidToolArguments {
        tool: tool.to_string(),
        message: error.to_string(),
    })
}

pub struct SearchRecipesTool {
    engine: FilterEngine,
}

impl SearchRecipesTool {
    pub fn new(engine: FilterEngine) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Tool for SearchRecipesTool {
    fn name(&self) -> &'static str {
        SEARCH_TOOL_NAME
    }

    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: SEARCH_TOOL_NAME.to_string(),
            description: "Search the recipe dataset. Every argument is optional and supplied \
                          arguments must all hold for a recipe to match."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "ingredients": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Ingredients that must all appear in the recipe, e.g. [\"chicken\", \"broccoli\"]."
                    },
                    "category": {
                        "type": "string",
                        "description": "Recipe category such as Dessert, Soup or Main Dish."
                    },
                    "max_calories": {
                        "type": "number",
                        "description": "Maximum calories per serving."
                    },
                    "max_sodium_mg": {
                        "type": "number",
                        "description": "Maximum sodium in milligrams."
                    },
                    "cuisine_keyword": {
                        "type": "string",
                        "description": "Cuisine or keyword such as Italian, Vegan or Quick."
                    },
                    "max_cook_time_minutes": {
                        "type": "number",
                        "description": "Maximum total cooking time in minutes."
                    },
                    "name_contains": {
                        "type": "string",
                        "description": "Text the recipe name must contain."
                    }
                }
            }),
        }
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let criteria: SearchCriteria = parse_args(SEARCH_TOOL_NAME, input)?;
        Ok(self.engine.search(&criteria))
    }
}

#[derive(Debug, Deserialize)]
struct NutritionArgs {
    recipe_name: String,
}

pub struct NutritionLookupTool {
    store: Arc<DatasetStore>,
}

impl NutritionLookupTool {
    pub fn new(store: Arc<DatasetStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for NutritionLookupTool {
    fn name(&self) -> &'static str {
        NUTRITION_TOOL_NAME
    }

    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: NUTRITION_TOOL_NAME.to_string(),
            description: "Get calories, sodium, fat, protein and carbohydrate for a recipe by name."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "recipe_name": {
                        "type": "string",
                        "description": "Full or partial recipe name."
                    }
                },
                "required": ["recipe_name"]
            }),
        }
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let args: NutritionArgs = parse_args(NUTRITION_TOOL_NAME, input)?;
        Ok(nutrition_lookup(&self.store, &args.recipe_name))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use larder_core::dataset::DatasetStore;
    use serde_json::{json, Value};

    use super::{ToolRegistry, NUTRITION_TOOL_NAME, SEARCH_TOOL_NAME};
    use crate::llm::AgentError;

    fn registry() -> ToolRegistry {
        let store = DatasetStore::from_json_str(
            r#"[
                {"Name": "Pumpkin Soup", "RecipeCategory": "Soup", "Calories": 180, "SodiumContent": 420},
                {"Name": "Apple Pie", "RecipeCategory": "Dessert", "Calories": 410}
            ]"#,
        )
        .expect("fixture parses");
        ToolRegistry::recipe_tools(Arc::new(store), 3)
    }

    #[test]
    fn registry_declares_both_tools_with_object_schemas() {
        let registry = registry();
        let declarations = registry.declarations();

        let names =
            declarations.iter().map(|declaration| declaration.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec![NUTRITION_TOOL_NAME, SEARCH_TOOL_NAME]);
        assert!(declarations.iter().all(|declaration| declaration.parameters["type"] == "object"));
        assert_eq!(declarations[0].parameters["required"], json!(["recipe_name"]));
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(SEARCH_TOOL_NAME));
        assert!(!registry.contains("delete_recipes"));
    }

    #[tokio::test]
    async fn search_tool_runs_filter_engine() {
        let registry = registry();
        let tool = registry.get(SEARCH_TOOL_NAME).expect("search tool registered");

        let text = tool.execute(json!({"category": "dessert"})).await.expect("search runs");
        assert!(text.starts_with("Here are some recipes I found:"));
        assert!(text.contains("### Apple Pie"));

        let empty = tool.execute(Value::Null).await.expect("null args are no criteria");
        assert!(empty.starts_with("Please provide some criteria"));
    }

    #[tokio::test]
    async fn nutrition_tool_requires_recipe_name() {
        let registry = registry();
        let tool = registry.get(NUTRITION_TOOL_NAME).expect("nutrition tool registered");

        let text = tool.execute(json!({"recipe_name": "pumpkin"})).await.expect("lookup runs");
        assert_eq!(
            text,
            "Nutritional information for 'Pumpkin Soup':\n* Calories: 180\n* Sodium: 420 mg"
        );

        let error = tool.execute(json!({})).await.expect_err("missing name is rejected");
        assert!(matches!(
            error.downcast_ref::<AgentError>(),
            Some(AgentError::InvalidToolArguments { tool, .. }) if tool == NUTRITION_TOOL_NAME
        ));
    }

    #[tokio::test]
    async fn wrongly_typed_search_arguments_are_rejected() {
        let registry = registry();
        let tool = registry.get(SEARCH_TOOL_NAME).expect("search tool registered");

        let error =
            tool.execute(json!({"max_calories": "lots"})).await.expect_err("string bound rejected");
        assert!(error.downcast_ref::<AgentError>().is_some());
    }
}
