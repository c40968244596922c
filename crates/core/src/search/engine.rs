use std::sync::Arc;

use tracing::debug;

use crate::dataset::DatasetStore;
use crate::domain::RecipeRecord;
use crate::search::criteria::{FilterKind, SearchCriteria};
use crate::search::format::{format_results, DEFAULT_MAX_ITEMS};

pub const NO_CRITERIA: &str = "Please provide some criteria to search for recipes \
(e.g., ingredients, category, name, max calories, cuisine, max cook time, max sodium).";

/// Records surviving every supplied criterion, in dataset order.
#[derive(Clone, Debug, PartialEq)]
pub struct FilteredResultSet<'a> {
    pub records: Vec<&'a RecipeRecord>,
    pub criteria_supplied: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SearchOutcome<'a> {
    NoCriteria,
    MissingColumn { filter: FilterKind, message: String },
    NoMatches { filter: FilterKind, message: String },
    Matches(FilteredResultSet<'a>),
}

impl SearchOutcome<'_> {
    pub fn match_count(&self) -> usize {
        match self {
            Self::Matches(result) => result.records.len(),
            _ => 0,
        }
    }
}

/// Conjunctive search over the shared dataset store.
#[derive(Clone, Debug)]
pub struct FilterEngine {
    store: Arc<DatasetStore>,
    max_results: usize,
}

impl FilterEngine {
    pub fn new(store: Arc<DatasetStore>) -> Self {
        Self { store, max_results: DEFAULT_MAX_ITEMS }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Applies the criteria one at a time, stopping at the first filter whose
    /// column is missing from the schema or that leaves no candidates.
    pub fn evaluate(&self, criteria: &SearchCriteria) -> SearchOutcome<'_> {
        let filters = criteria.filters();
        if filters.is_empty() {
            return SearchOutcome::NoCriteria;
        }

        let mut candidates = self.store.records().iter().collect::<Vec<_>>();
        for filter in &filters {
            if !self.store.has_column(filter.column()) {
                return SearchOutcome::MissingColumn {
                    filter: filter.kind(),
                    message: filter.missing_column_message(),
                };
            }

            candidates.retain(|record| filter.matches(record));
            if candidates.is_empty() {
                return SearchOutcome::NoMatches {
                    filter: filter.kind(),
                    message: filter.no_results_message(),
                };
            }
        }

        SearchOutcome::Matches(FilteredResultSet { records: candidates, criteria_supplied: true })
    }

    /// Text result handed back to the agent.
    pub fn search(&self, criteria: &SearchCriteria) -> String {
        let outcome = self.evaluate(criteria);
        debug!(
            event_name = "search.completed",
            criteria = ?criteria,
            matches = outcome.match_count(),
            "recipe search evaluated"
        );

        match outcome {
            SearchOutcome::NoCriteria => NO_CRITERIA.to_string(),
            SearchOutcome::MissingColumn { message, .. }
            | SearchOutcome::NoMatches { message, .. } => message,
            SearchOutcome::Matches(result) => format_results(&result.records, self.max_results),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{FilterEngine, SearchOutcome, NO_CRITERIA};
    use crate::dataset::DatasetStore;
    use crate::search::criteria::{FilterKind, SearchCriteria};

    fn engine(raw: &str) -> FilterEngine {
        FilterEngine::new(Arc::new(DatasetStore::from_json_str(raw).expect("fixture parses")))
    }

    fn five_recipes() -> FilterEngine {
        engine(
            r#"[
                {"Name": "Chicken Stir Fry", "RecipeCategory": "Main Dish", "Calories": 450,
                 "SodiumContent": 600, "TotalTime": "PT25M",
                 "RecipeIngredientParts": ["cooked chicken breast", "fresh broccoli florets", "salt"],
                 "Keywords": ["Asian", "Quick"]},
                {"Name": "Beef Stew", "RecipeCategory": "Main Dish", "Calories": 720,
                 "SodiumContent": 900, "TotalTime": 180,
                 "RecipeIngredientParts": ["beef", "carrot"], "Keywords": ["Comfort"]},
                {"Name": "Garden Salad", "RecipeCategory": "Salad", "Calories": "210",
                 "SodiumContent": 120, "TotalTime": 10,
                 "RecipeIngredientParts": ["lettuce", "tomato"], "Keywords": ["Vegetarian", "Quick"]},
                {"Name": "Chicken Soup", "RecipeCategory": "Soup", "Calories": 300,
                 "SodiumContent": 800, "TotalTime": "PT1H",
                 "RecipeIngredientParts": ["chicken thigh", "celery"], "Keywords": ["Comfort"]},
                {"Name": "Mystery Bake", "RecipeCategory": "Dessert", "Calories": "unknown",
                 "SodiumContent": null, "TotalTime": null,
                 "RecipeIngredientParts": "flour, sugar", "Keywords": null}
            ]"#,
        )
    }

    fn names(outcome: &SearchOutcome<'_>) -> Vec<String> {
        match outcome {
            SearchOutcome::Matches(result) => {
                result.records.iter().map(|record| record.display_name().to_string()).collect()
            }
            other => panic!("expected matches, got {other:?}"),
        }
    }

    #[test]
    fn empty_criteria_never_return_the_dataset() {
        let engine = five_recipes();
        assert_eq!(engine.evaluate(&SearchCriteria::default()), SearchOutcome::NoCriteria);
        assert_eq!(engine.search(&SearchCriteria::default()), NO_CRITERIA);

        let blank = SearchCriteria {
            category: Some(String::new()),
            ingredients: Some(Vec::new()),
            ..SearchCriteria::default()
        };
        assert_eq!(engine.search(&blank), NO_CRITERIA);
    }

    #[test]
    fn calorie_bound_keeps_three_of_five_and_shows_all_headers() {
        let engine = five_recipes();
        let criteria = SearchCriteria { max_calories: Some(500.0), ..SearchCriteria::default() };

        let outcome = engine.evaluate(&criteria);
        assert_eq!(names(&outcome), vec!["Chicken Stir Fry", "Garden Salad", "Chicken Soup"]);

        let text = engine.search(&criteria);
        assert!(text.contains("### Chicken Stir Fry"));
        assert!(text.contains("### Garden Salad"));
        assert!(text.contains("### Chicken Soup"));
        assert!(!text.contains("more similar recipes"));
    }

    #[test]
    fn results_beyond_max_results_are_counted() {
        let engine = five_recipes();
        let criteria =
            SearchCriteria { name_contains: Some("e".to_string()), ..SearchCriteria::default() };

        assert_eq!(engine.evaluate(&criteria).match_count(), 5);
        assert!(engine.search(&criteria).ends_with("...and 2 more similar recipes found."));
        assert!(engine
            .clone()
            .with_max_results(4)
            .search(&criteria)
            .ends_with("...and 1 more similar recipes found."));
    }

    #[test]
    fn every_returned_record_satisfies_every_supplied_criterion() {
        let engine = five_recipes();
        let criteria = SearchCriteria {
            ingredients: Some(vec!["chicken".to_string()]),
            max_sodium_mg: Some(700.0),
            cuisine_keyword: Some("quick".to_string()),
            max_cook_time_minutes: Some(30.0),
            ..SearchCriteria::default()
        };

        let outcome = engine.evaluate(&criteria);
        assert_eq!(names(&outcome), vec!["Chicken Stir Fry"]);
        if let SearchOutcome::Matches(result) = &outcome {
            assert!(result.criteria_supplied);
            for record in &result.records {
                assert!(criteria.filters().iter().all(|filter| filter.matches(record)));
            }
        }
    }

    #[test]
    fn non_numeric_calories_only_matter_to_calorie_searches() {
        let engine = five_recipes();

        let bounded = SearchCriteria { max_calories: Some(10_000.0), ..SearchCriteria::default() };
        assert!(!names(&engine.evaluate(&bounded)).contains(&"Mystery Bake".to_string()));

        let by_category =
            SearchCriteria { category: Some("dessert".to_string()), ..SearchCriteria::default() };
        assert_eq!(names(&engine.evaluate(&by_category)), vec!["Mystery Bake"]);
    }

    #[test]
    fn first_exhausting_filter_names_the_failure() {
        let engine = five_recipes();
        let criteria = SearchCriteria {
            ingredients: Some(vec!["chicken".to_string(), "broccoli".to_string()]),
            category: Some("Soup".to_string()),
            max_calories: Some(1.0),
            ..SearchCriteria::default()
        };

        let outcome = engine.evaluate(&criteria);
        assert_eq!(
            outcome,
            SearchOutcome::NoMatches {
                filter: FilterKind::Category,
                message: "No recipes found in category: Soup (after other filters).".to_string(),
            }
        );

        let ingredients_only = SearchCriteria {
            ingredients: Some(vec!["chicken".to_string(), "saffron".to_string()]),
            ..SearchCriteria::default()
        };
        assert_eq!(
            engine.search(&ingredients_only),
            "No recipes found containing all ingredients: chicken, saffron."
        );
    }

    #[test]
    fn zero_bound_is_applied_rather_than_ignored() {
        let engine = five_recipes();
        let criteria = SearchCriteria { max_calories: Some(0.0), ..SearchCriteria::default() };
        assert_eq!(
            engine.search(&criteria),
            "No recipes found under 0 calories (after other filters)."
        );
    }

    #[test]
    fn missing_column_stops_before_later_filters() {
        let engine = engine(r#"[{"Name": "Toast", "Calories": 90}]"#);
        let criteria = SearchCriteria {
            name_contains: Some("toast".to_string()),
            cuisine_keyword: Some("breakfast".to_string()),
            max_cook_time_minutes: Some(5.0),
            ..SearchCriteria::default()
        };

        assert_eq!(
            engine.evaluate(&criteria),
            SearchOutcome::MissingColumn {
                filter: FilterKind::CuisineKeyword,
                message: "Cannot search by cuisine: 'Keywords' column is missing.".to_string(),
            }
        );
    }

    #[test]
    fn search_is_idempotent() {
        let engine = five_recipes();
        let criteria = SearchCriteria {
            cuisine_keyword: Some("comfort".to_string()),
            ..SearchCriteria::default()
        };
        assert_eq!(engine.search(&criteria), engine.search(&criteria));
    }

    #[test]
    fn empty_store_reports_first_filter_as_exhausted() {
        let engine = engine(r#"{"Name": [], "Calories": []}"#);
        let criteria =
            SearchCriteria { name_contains: Some("pie".to_string()), ..SearchCriteria::default() };
        assert_eq!(
            engine.search(&criteria),
            "No recipes found with the name/keyword: pie (after other filters)."
        );
    }
}
