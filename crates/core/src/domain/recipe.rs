use std::fmt;

use serde_json::{Map, Value};

static NULL: Value = Value::Null;

/// Columns of the source dataset that the search and formatting code understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    Name,
    Category,
    Calories,
    Sodium,
    Fat,
    Protein,
    Carbohydrate,
    TotalTime,
    Ingredients,
    Keywords,
    Instructions,
}

impl Column {
    pub const ALL: [Column; 11] = [
        Column::Name,
        Column::Category,
        Column::Calories,
        Column::Sodium,
        Column::Fat,
        Column::Protein,
        Column::Carbohydrate,
        Column::TotalTime,
        Column::Ingredients,
        Column::Keywords,
        Column::Instructions,
    ];

    pub fn source_name(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Category => "RecipeCategory",
            Self::Calories => "Calories",
            Self::Sodium => "SodiumContent",
            Self::Fat => "FatContent",
            Self::Protein => "ProteinContent",
            Self::Carbohydrate => "CarbohydrateContent",
            Self::TotalTime => "TotalTime",
            Self::Ingredients => "RecipeIngredientParts",
            Self::Keywords => "Keywords",
            Self::Instructions => "RecipeInstructions",
        }
    }

    pub fn from_source_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|column| column.source_name() == name)
    }

    /// Columns whose cells are themselves lists in a row-oriented file.
    pub fn holds_lists(self) -> bool {
        matches!(self, Self::Ingredients | Self::Keywords | Self::Instructions)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.source_name())
    }
}

/// A numeric cell as it appeared in the dataset.
///
/// Text is kept verbatim so it can be shown back to the user; [`NumericField::as_number`]
/// performs the coercion used by bounded filters.
#[derive(Clone, Debug, PartialEq)]
pub enum NumericField {
    Number(f64),
    Text(String),
}

impl NumericField {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Number(number) => number.as_f64().map(Self::Number),
            Value::String(text) if text.trim().is_empty() => None,
            Value::String(text) => Some(Self::Text(text.clone())),
            other => Some(Self::Text(other.to_string())),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value).filter(|value| value.is_finite()),
            Self::Text(text) => text.trim().parse::<f64>().ok().filter(|value| value.is_finite()),
        }
    }

    /// Like [`NumericField::as_number`], but also understands ISO-8601 durations
    /// such as `PT1H30M`.
    pub fn as_minutes(&self) -> Option<f64> {
        self.as_number().or_else(|| match self {
            Self::Text(text) => iso_duration_minutes(text),
            Self::Number(_) => None,
        })
    }

    pub fn at_most(&self, bound: f64) -> bool {
        self.as_number().is_some_and(|value| value <= bound)
    }
}

impl fmt::Display for NumericField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => f.write_str(&format_number(*value)),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// A list-valued cell. Anything that is not a JSON array is kept as `Malformed`
/// and never satisfies a list predicate.
#[derive(Clone, Debug, PartialEq)]
pub enum ListField {
    Items(Vec<String>),
    Malformed(String),
}

impl ListField {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Array(items) => Some(Self::Items(items.iter().filter_map(text_of).collect())),
            Value::String(text) => Some(Self::Malformed(text.clone())),
            other => Some(Self::Malformed(other.to_string())),
        }
    }

    pub fn items(&self) -> Option<&[String]> {
        match self {
            Self::Items(items) => Some(items),
            Self::Malformed(_) => None,
        }
    }

    /// True when the cell is a proper list with at least one entry.
    pub fn has_items(&self) -> bool {
        self.items().is_some_and(|items| !items.is_empty())
    }

    pub fn any_contains(&self, needle_lowercase: &str) -> bool {
        self.items().is_some_and(|items| {
            items.iter().any(|item| item.to_lowercase().contains(needle_lowercase))
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Instructions {
    Steps(Vec<String>),
    Text(String),
}

impl Instructions {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Array(steps) => {
                let steps = steps.iter().filter_map(text_of).collect::<Vec<_>>();
                (!steps.is_empty()).then_some(Self::Steps(steps))
            }
            other => text_of(other).map(Self::Text),
        }
    }

    pub fn render(&self) -> String {
        match self {
            Self::Steps(steps) => steps.join(" "),
            Self::Text(text) => text.clone(),
        }
    }
}

/// One row of the recipe dataset. Every attribute is optional; a missing or
/// malformed cell only ever excludes the record from a filter.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecipeRecord {
    pub name: Option<String>,
    pub category: Option<String>,
    pub calories: Option<NumericField>,
    pub sodium_mg: Option<NumericField>,
    pub fat: Option<NumericField>,
    pub protein: Option<NumericField>,
    pub carbohydrate: Option<NumericField>,
    pub total_time_minutes: Option<NumericField>,
    pub ingredients: Option<ListField>,
    pub keywords: Option<ListField>,
    pub instructions: Option<Instructions>,
}

impl RecipeRecord {
    pub fn from_row(row: &Map<String, Value>) -> Self {
        let cell = |column: Column| row.get(column.source_name()).unwrap_or(&NULL);

        Self {
            name: text_of(cell(Column::Name)),
            category: text_of(cell(Column::Category)),
            calories: NumericField::from_value(cell(Column::Calories)),
            sodium_mg: NumericField::from_value(cell(Column::Sodium)),
            fat: NumericField::from_value(cell(Column::Fat)),
            protein: NumericField::from_value(cell(Column::Protein)),
            carbohydrate: NumericField::from_value(cell(Column::Carbohydrate)),
            total_time_minutes: NumericField::from_value(cell(Column::TotalTime)),
            ingredients: ListField::from_value(cell(Column::Ingredients)),
            keywords: ListField::from_value(cell(Column::Keywords)),
            instructions: Instructions::from_value(cell(Column::Instructions)),
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("N/A")
    }

    pub fn numeric(&self, column: Column) -> Option<&NumericField> {
        match column {
            Column::Calories => self.calories.as_ref(),
            Column::Sodium => self.sodium_mg.as_ref(),
            Column::Fat => self.fat.as_ref(),
            Column::Protein => self.protein.as_ref(),
            Column::Carbohydrate => self.carbohydrate.as_ref(),
            Column::TotalTime => self.total_time_minutes.as_ref(),
            _ => None,
        }
    }
}

/// Renders a number without a trailing `.0` when it is integral.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn iso_duration_minutes(raw: &str) -> Option<f64> {
    let rest = raw.trim().strip_prefix('P')?;
    let (date_part, time_part) = rest.split_once('T').unwrap_or((rest, ""));

    let date_units: &[(char, f64)] = &[('D', 24.0 * 60.0)];
    let time_units: &[(char, f64)] = &[('H', 60.0), ('M', 1.0), ('S', 1.0 / 60.0)];

    let mut minutes = 0.0;
    let mut saw_component = false;
    for (part, units) in [(date_part, date_units), (time_part, time_units)] {
        let mut digits = String::new();
        for ch in part.chars() {
            if ch.is_ascii_digit() || ch == '.' {
                digits.push(ch);
                continue;
            }
            let (_, factor) = units.iter().find(|(unit, _)| *unit == ch)?;
            let amount = digits.parse::<f64>().ok()?;
            minutes += amount * factor;
            digits.clear();
            saw_component = true;
        }
        if !digits.is_empty() {
            return None;
        }
    }

    saw_component.then_some(minutes)
}
