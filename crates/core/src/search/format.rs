use crate::domain::{format_number, ListField, RecipeRecord};

pub const DEFAULT_MAX_ITEMS: usize = 3;
pub const NO_RESULTS: &str = "No recipes found matching your criteria.";

const HEADER: &str = "Here are some recipes I found:";
const KEYWORD_PREVIEW: usize = 3;
const INGREDIENT_PREVIEW: usize = 5;
const INSTRUCTION_PREVIEW_CHARS: usize = 200;

/// Renders the leading `max_items` records as a Markdown block. Fields a record
/// does not carry are left out entirely.
pub fn format_results(records: &[&RecipeRecord], max_items: usize) -> String {
    if records.is_empty() {
        return NO_RESULTS.to_string();
    }

    let mut parts = vec![HEADER.to_string()];
    parts.extend(records.iter().take(max_items).map(|record| format_record(record)));

    if records.len() > max_items {
        parts.push(format!(
            "\n...and {} more similar recipes found.",
            records.len() - max_items
        ));
    }

    parts.join("\n")
}

fn format_record(record: &RecipeRecord) -> String {
    let mut lines = vec![format!("\n### {}", record.display_name())];

    if let Some(category) = &record.category {
        lines.push(format!("*Category:* {category}"));
    }
    if let Some(calories) = &record.calories {
        lines.push(format!("*Calories:* {calories}"));
    }
    if let Some(sodium) = &record.sodium_mg {
        lines.push(format!("*Sodium:* {sodium} mg"));
    }
    if let Some(total_time) = &record.total_time_minutes {
        let rendered =
            total_time.as_minutes().map(format_number).unwrap_or_else(|| total_time.to_string());
        lines.push(format!("*Cook Time:* {rendered} minutes"));
    }
    if let Some(keywords) = preview_list(record.keywords.as_ref(), KEYWORD_PREVIEW) {
        lines.push(format!("*Cuisine/Keywords:* {keywords}"));
    }
    if let Some(ingredients) = preview_list(record.ingredients.as_ref(), INGREDIENT_PREVIEW) {
        lines.push(format!("*Key Ingredients:* {ingredients}"));
    }
    if let Some(instructions) = &record.instructions {
        lines.push(format!(
            "*Instructions:* {}",
            truncate_chars(&instructions.render(), INSTRUCTION_PREVIEW_CHARS)
        ));
    }

    lines.join("\n")
}

fn preview_list(field: Option<&ListField>, limit: usize) -> Option<String> {
    let items = field.filter(|field| field.has_items())?.items()?;
    let shown = items.iter().take(limit).map(String::as_str).collect::<Vec<_>>().join(", ");
    let ellipsis = if items.len() > limit { "..." } else { "" };
    Some(format!("{shown}{ellipsis}"))
}

/// Cuts `text` to `limit` characters and appends `...` when anything was removed.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{format_results, truncate_chars, DEFAULT_MAX_ITEMS, NO_RESULTS};
    use crate::domain::{Instructions, ListField, NumericField, RecipeRecord};

    fn named(name: &str) -> RecipeRecord {
        RecipeRecord { name: Some(name.to_string()), ..RecipeRecord::default() }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn empty_input_renders_fixed_sentence() {
        assert_eq!(format_results(&[], DEFAULT_MAX_ITEMS), NO_RESULTS);
    }

    #[test]
    fn renders_present_fields_in_fixed_layout() {
        let record = RecipeRecord {
            name: Some("Green Curry".to_string()),
            category: Some("Thai".to_string()),
            calories: Some(NumericField::Number(420.0)),
            sodium_mg: Some(NumericField::Text("380.5".to_string())),
            total_time_minutes: Some(NumericField::Text("PT1H5M".to_string())),
            keywords: Some(ListField::Items(strings(&["Asian", "Spicy", "Curry", "Weeknight"]))),
            ingredients: Some(ListField::Items(strings(&["coconut milk", "chicken"]))),
            instructions: Some(Instructions::Steps(strings(&["Simmer.", "Serve."]))),
            ..RecipeRecord::default()
        };

        let rendered = format_results(&[&record], DEFAULT_MAX_ITEMS);
        assert_eq!(
            rendered,
            [
                "Here are some recipes I found:",
                "",
                "### Green Curry",
                "*Category:* Thai",
                "*Calories:* 420",
                "*Sodium:* 380.5 mg",
                "*Cook Time:* 65 minutes",
                "*Cuisine/Keywords:* Asian, Spicy, Curry...",
                "*Key Ingredients:* coconut milk, chicken",
                "*Instructions:* Simmer. Serve.",
            ]
            .join("\n")
        );
    }

    #[test]
    fn absent_and_malformed_fields_are_omitted() {
        let record = RecipeRecord {
            keywords: Some(ListField::Malformed("Dessert".to_string())),
            ingredients: Some(ListField::Items(Vec::new())),
            ..RecipeRecord::default()
        };

        let rendered = format_results(&[&record], DEFAULT_MAX_ITEMS);
        assert_eq!(rendered, "Here are some recipes I found:\n\n### N/A");
    }

    #[test]
    fn reports_remaining_matches_beyond_max_items() {
        let records = ["A", "B", "C", "D", "E"].map(named);
        let refs = records.iter().collect::<Vec<_>>();

        let rendered = format_results(&refs, 3);
        assert!(rendered.contains("### A"));
        assert!(rendered.contains("### C"));
        assert!(!rendered.contains("### D"));
        assert!(rendered.ends_with("\n\n...and 2 more similar recipes found."));
    }

    #[test]
    fn ingredient_preview_stops_at_five() {
        let record = RecipeRecord {
            ingredients: Some(ListField::Items(strings(&["a", "b", "c", "d", "e", "f"]))),
            ..named("Salad")
        };
        let rendered = format_results(&[&record], 1);
        assert!(rendered.ends_with("*Key Ingredients:* a, b, c, d, e..."));
    }

    #[test]
    fn long_instructions_are_cut_at_two_hundred_characters() {
        let record = RecipeRecord {
            instructions: Some(Instructions::Text("é".repeat(250))),
            ..named("Crepes")
        };
        let rendered = format_results(&[&record], 1);
        let expected = format!("*Instructions:* {}...", "é".repeat(200));
        assert!(rendered.ends_with(&expected));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        assert_eq!(truncate_chars("naïve", 3), "naï...");
        assert_eq!(truncate_chars("short", 5), "short");
        assert_eq!(truncate_chars("", 0), "");
    }
}
