use crate::dataset::DatasetStore;
use crate::domain::{Column, RecipeRecord};

const NUTRITION_FIELDS: [(Column, &str, &str); 5] = [
    (Column::Calories, "Calories", ""),
    (Column::Sodium, "Sodium", " mg"),
    (Column::Fat, "Fat", ""),
    (Column::Protein, "Protein", ""),
    (Column::Carbohydrate, "Carbohydrate", ""),
];

/// First record, in dataset order, whose name contains `query` case-insensitively.
pub fn find_by_name<'a>(store: &'a DatasetStore, query: &str) -> Option<&'a RecipeRecord> {
    let needle = query.to_lowercase();
    store.records().iter().find(|record| {
        record.name.as_deref().is_some_and(|name| name.to_lowercase().contains(&needle))
    })
}

/// Nutrition facts for the first recipe whose name contains `query`, as a bullet list.
pub fn nutrition_lookup(store: &DatasetStore, query: &str) -> String {
    if !store.has_column(Column::Name) {
        return "Information unavailable: 'Name' column missing.".to_string();
    }

    let Some(record) = find_by_name(store, query) else {
        return format!("Sorry, I couldn't find a recipe named '{query}' to get nutritional info.");
    };
    let name = record.name.as_deref().unwrap_or(query);

    let facts = NUTRITION_FIELDS
        .iter()
        .filter_map(|(column, label, unit)| {
            record.numeric(*column).map(|value| format!("* {label}: {value}{unit}"))
        })
        .collect::<Vec<_>>();

    if facts.is_empty() {
        return format!(
            "No specific nutritional details found for '{name}', though the recipe exists."
        );
    }

    let mut lines = vec![format!("Nutritional information for '{name}':")];
    lines.extend(facts);
    lines.join("\n")
}
