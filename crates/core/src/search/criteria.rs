use serde::{Deserialize, Serialize};

use crate::domain::{format_number, Column, RecipeRecord};

/// Structured constraints supplied by a search tool call. Every field is optional;
/// supplied fields combine conjunctively.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "CriteriaArgs")]
pub struct SearchCriteria {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_calories: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_sodium_mg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuisine_keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cook_time_minutes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_contains: Option<String>,
}

/// Wire form of the tool arguments. Agents use either the field name or its
/// short alias; when both arrive the field name wins.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CriteriaArgs {
    ingredients: Option<Vec<String>>,
    category: Option<String>,
    max_calories: Option<f64>,
    max_sodium_mg: Option<f64>,
    max_sodium: Option<f64>,
    cuisine_keyword: Option<String>,
    cuisine: Option<String>,
    max_cook_time_minutes: Option<f64>,
    max_cook_time: Option<f64>,
    name_contains: Option<String>,
    recipe_name: Option<String>,
}

impl From<CriteriaArgs> for SearchCriteria {
    fn from(args: CriteriaArgs) -> Self {
        Self {
            ingredients: args.ingredients,
            category: args.category,
            max_calories: args.max_calories,
            max_sodium_mg: args.max_sodium_mg.or(args.max_sodium),
            cuisine_keyword: args.cuisine_keyword.or(args.cuisine),
            max_cook_time_minutes: args.max_cook_time_minutes.or(args.max_cook_time),
            name_contains: args.name_contains.or(args.recipe_name),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Ingredients,
    NameContains,
    Category,
    MaxCalories,
    MaxSodium,
    CuisineKeyword,
    MaxCookTime,
}

/// One supplied criterion, ready to test records against. Text needles are
/// lowercased once up front.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter<'a> {
    Ingredients { requested: &'a [String], needles: Vec<String> },
    NameContains { requested: &'a str, needle: String },
    Category { requested: &'a str, needle: String },
    MaxCalories(f64),
    MaxSodium(f64),
    CuisineKeyword { requested: &'a str, needle: String },
    MaxCookTime(f64),
}

impl SearchCriteria {
    /// Supplied criteria in the order the engine applies them. Empty strings and an
    /// empty ingredient list count as not supplied; numeric bounds always count.
    pub fn filters(&self) -> Vec<Filter<'_>> {
        let mut filters = Vec::new();

        if let Some(requested) = self.ingredients.as_deref().filter(|list| !list.is_empty()) {
            let needles = requested.iter().map(|item| item.to_lowercase()).collect();
            filters.push(Filter::Ingredients { requested, needles });
        }
        if let Some(requested) = non_empty(&self.name_contains) {
            filters.push(Filter::NameContains { requested, needle: requested.to_lowercase() });
        }
        if let Some(requested) = non_empty(&self.category) {
            filters.push(Filter::Category { requested, needle: requested.to_lowercase() });
        }
        if let Some(bound) = self.max_calories {
            filters.push(Filter::MaxCalories(bound));
        }
        if let Some(bound) = self.max_sodium_mg {
            filters.push(Filter::MaxSodium(bound));
        }
        if let Some(requested) = non_empty(&self.cuisine_keyword) {
            filters.push(Filter::CuisineKeyword { requested, needle: requested.to_lowercase() });
        }
        if let Some(bound) = self.max_cook_time_minutes {
            filters.push(Filter::MaxCookTime(bound));
        }

        filters
    }

    pub fn is_empty(&self) -> bool {
        self.filters().is_empty()
    }
}

impl Filter<'_> {
    pub fn kind(&self) -> FilterKind {
        match self {
            Self::Ingredients { .. } => FilterKind::Ingredients,
            Self::NameContains { .. } => FilterKind::NameContains,
            Self::Category { .. } => FilterKind::Category,
            Self::MaxCalories(_) => FilterKind::MaxCalories,
            Self::MaxSodium(_) => FilterKind::MaxSodium,
            Self::CuisineKeyword { .. } => FilterKind::CuisineKeyword,
            Self::MaxCookTime(_) => FilterKind::MaxCookTime,
        }
    }

    pub fn column(&self) -> Column {
        match self {
            Self::Ingredients { .. } => Column::Ingredients,
            Self::NameContains { .. } => Column::Name,
            Self::Category { .. } => Column::Category,
            Self::MaxCalories(_) => Column::Calories,
            Self::MaxSodium(_) => Column::Sodium,
            Self::CuisineKeyword { .. } => Column::Keywords,
            Self::MaxCookTime(_) => Column::TotalTime,
        }
    }

    pub fn matches(&self, record: &RecipeRecord) -> bool {
        match self {
            Self::Ingredients { needles, .. } => {
                record.ingredients.as_ref().and_then(|field| field.items()).is_some_and(|items| {
                    needles.iter().all(|needle| {
                        items.iter().any(|item| item.to_lowercase().contains(needle.as_str()))
                    })
                })
            }
            Self::NameContains { needle, .. } => contains_lowercase(record.name.as_deref(), needle),
            Self::Category { needle, .. } => contains_lowercase(record.category.as_deref(), needle),
            Self::MaxCalories(bound) => {
                record.calories.as_ref().is_some_and(|value| value.at_most(*bound))
            }
            Self::MaxSodium(bound) => {
                record.sodium_mg.as_ref().is_some_and(|value| value.at_most(*bound))
            }
            Self::CuisineKeyword { needle, .. } => {
                record.keywords.as_ref().is_some_and(|field| field.any_contains(needle))
            }
            Self::MaxCookTime(bound) => record
                .total_time_minutes
                .as_ref()
                .and_then(|value| value.as_minutes())
                .is_some_and(|minutes| minutes <= *bound),
        }
    }

    pub fn missing_column_message(&self) -> String {
        let column = self.column().source_name();
        match self {
            Self::Ingredients { .. } => {
                format!("Cannot search by ingredients: '{column}' column is missing.")
            }
            Self::NameContains { .. } => {
                format!("Cannot search by name: '{column}' column is missing.")
            }
            Self::Category { .. } => {
                format!("Cannot search by category: '{column}' column is missing.")
            }
            Self::MaxCalories(_) => {
                format!("Cannot filter by calories: '{column}' column is missing.")
            }
            Self::MaxSodium(_) => format!("Cannot filter by sodium: '{column}' column is missing."),
            Self::CuisineKeyword { .. } => {
                format!("Cannot search by cuisine: '{column}' column is missing.")
            }
            Self::MaxCookTime(_) => {
                format!("Cannot filter by cook time: '{column}' column is missing.")
            }
        }
    }

    pub fn no_results_message(&self) -> String {
        match self {
            Self::Ingredients { requested, .. } => {
                format!("No recipes found containing all ingredients: {}.", requested.join(", "))
            }
            Self::NameContains { requested, .. } => format!(
                "No recipes found with the name/keyword: {requested} (after other filters)."
            ),
            Self::Category { requested, .. } => {
                format!("No recipes found in category: {requested} (after other filters).")
            }
            Self::MaxCalories(bound) => format!(
                "No recipes found under {} calories (after other filters).",
                format_number(*bound)
            ),
            Self::MaxSodium(bound) => format!(
                "No recipes found under {}mg sodium (after other filters).",
                format_number(*bound)
            ),
            Self::CuisineKeyword { requested, .. } => {
                format!("No recipes found for cuisine/keyword: {requested} (after other filters).")
            }
            Self::MaxCookTime(bound) => format!(
                "No recipes found with cook time under {} minutes (after other filters).",
                format_number(*bound)
            ),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|text| !text.is_empty())
}

fn contains_lowercase(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|text| text.to_lowercase().contains(needle))
}
