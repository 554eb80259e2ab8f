//! Request bodies accepted by the detail shapes and their validation.

use serde::Deserialize;
use serde_json::Value;

use crate::{
    constants::{MAX_NAME_LENGTH, MAX_PRICE_DIGITS, PRICE_DECIMAL_PLACES},
    error::ValidationErrors,
    schema::{NewRecipe, RecipeChanges},
};

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";
const TOO_LONG: &str = "Ensure this field has no more than 255 characters.";
const NOT_A_STRING: &str = "Not a valid string.";
const NOT_AN_INTEGER: &str = "A valid integer is required.";
const NOT_A_NUMBER: &str = "A valid number is required.";
const NOT_A_LIST: &str = "Expected a list of items.";
const NOT_AN_OBJECT: &str = "Invalid data. Expected a dictionary.";

/// A body field that keeps values of the wrong JSON type, so they are
/// reported against the field instead of failing the whole body.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Field<T> {
    Valid(T),
    Invalid(Value),
}

impl<T> Field<T> {
    fn accept(self, field: &str, message: &str, errors: &mut ValidationErrors) -> Option<T> {
        match self {
            Field::Valid(value) => Some(value),
            Field::Invalid(value) => {
                log::trace!("> Rejected {field} value {value}");
                errors.add(field, message);
                None
            }
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum PriceInput {
    Number(f64),
    Text(String),
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct AttributePayload {
    pub name: Option<Field<String>>,
}

/// Body of recipe create/update. Fields outside the detail shape (`id`,
/// `user`, `image`, ...) are ignored.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RecipePayload {
    pub title: Option<Field<String>>,
    pub description: Option<Field<String>>,
    pub time_minutes: Option<Field<i32>>,
    pub price: Option<Field<PriceInput>>,
    pub link: Option<Field<String>>,
    pub tags: Option<Field<Vec<Field<AttributePayload>>>>,
    pub ingredients: Option<Field<Vec<Field<AttributePayload>>>>,
}

fn check_text(field: &str, value: &str, allow_blank: bool, errors: &mut ValidationErrors) {
    if !allow_blank && value.trim().is_empty() {
        errors.add(field, BLANK);
    }
    if value.chars().count() > MAX_NAME_LENGTH {
        errors.add(field, TOO_LONG);
    }
}

/// Parses a price with at most five digits, two of them decimals.
pub fn parse_price(input: &PriceInput) -> Result<f64, &'static str> {
    let text = match input {
        PriceInput::Number(value) => value.to_string(),
        PriceInput::Text(value) => value.trim().to_string(),
    };

    let value: f64 = text.parse().map_err(|_e| "A valid number is required.")?;
    if !value.is_finite() {
        return Err("A valid number is required.");
    }

    let digits = text.trim_start_matches(['-', '+']);
    let (whole, decimals) = digits.split_once('.').unwrap_or((digits, ""));
    let decimals = decimals.trim_end_matches('0');
    let whole = whole.trim_start_matches('0');

    if decimals.len() > PRICE_DECIMAL_PLACES as usize {
        return Err("Ensure that there are no more than 2 decimal places.");
    }
    if whole.len() + decimals.len().max(PRICE_DECIMAL_PLACES as usize) > MAX_PRICE_DIGITS as usize
    {
        return Err("Ensure that there are no more than 5 digits in total.");
    }

    Ok((value * 100.0).round() / 100.0)
}

fn names(
    field: &str,
    items: Option<Field<Vec<Field<AttributePayload>>>>,
    errors: &mut ValidationErrors,
) -> Option<Vec<String>> {
    let items = items?.accept(field, NOT_A_LIST, errors)?;
    let mut names = vec![];

    for item in items {
        let Some(item) = item.accept(field, NOT_AN_OBJECT, errors) else {
            continue;
        };

        match item.name {
            Some(name) => {
                if let Some(name) = name.accept(field, NOT_A_STRING, errors) {
                    check_text(field, &name, false, errors);
                    names.push(name.trim().to_string());
                }
            }
            None => errors.add(field, "Each item requires a name."),
        }
    }

    Some(names)
}

impl RecipePayload {
    /// Validates a create body: `title`, `time_minutes` and `price` are required.
    pub fn into_new(self) -> Result<NewRecipe, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        for (field, missing) in [
            ("title", self.title.is_none()),
            ("time_minutes", self.time_minutes.is_none()),
            ("price", self.price.is_none()),
        ] {
            if missing {
                errors.add(field, REQUIRED);
            }
        }

        let changes = self.validate(&mut errors);

        errors.finish(NewRecipe {
            title: changes.title.unwrap_or_default(),
            description: changes.description.unwrap_or_default(),
            time_minutes: changes.time_minutes.unwrap_or_default(),
            price: changes.price.unwrap_or_default(),
            link: changes.link.unwrap_or_default(),
            tags: changes.tags.unwrap_or_default(),
            ingredients: changes.ingredients.unwrap_or_default(),
        })
    }

    /// Validates an update body. A full update requires the same fields as
    /// a create; a partial one accepts any subset.
    pub fn into_changes(self, partial: bool) -> Result<RecipeChanges, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !partial {
            for (field, missing) in [
                ("title", self.title.is_none()),
                ("time_minutes", self.time_minutes.is_none()),
                ("price", self.price.is_none()),
            ] {
                if missing {
                    errors.add(field, REQUIRED);
                }
            }
        }

        let changes = self.validate(&mut errors);
        errors.finish(changes)
    }

    fn validate(self, errors: &mut ValidationErrors) -> RecipeChanges {
        let title = self
            .title
            .and_then(|title| title.accept("title", NOT_A_STRING, errors));
        let description = self
            .description
            .and_then(|description| description.accept("description", NOT_A_STRING, errors));
        let time_minutes = self
            .time_minutes
            .and_then(|minutes| minutes.accept("time_minutes", NOT_AN_INTEGER, errors));
        let link = self
            .link
            .and_then(|link| link.accept("link", NOT_A_STRING, errors));

        if let Some(title) = &title {
            check_text("title", title, false, errors);
        }
        if let Some(link) = &link {
            check_text("link", link, true, errors);
        }

        let price = self
            .price
            .and_then(|price| price.accept("price", NOT_A_NUMBER, errors))
            .and_then(|price| match parse_price(&price) {
                Ok(price) => Some(price),
                Err(message) => {
                    errors.add("price", message);
                    None
                }
            });

        RecipeChanges {
            title: title.map(|title| title.trim().to_string()),
            description,
            time_minutes,
            price,
            link,
            tags: names("tags", self.tags, errors),
            ingredients: names("ingredients", self.ingredients, errors),
        }
    }
}

impl AttributePayload {
    pub fn into_name(self, partial: bool) -> Result<Option<String>, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = match self.name {
            Some(name) => name.accept("name", NOT_A_STRING, &mut errors),
            None if !partial => {
                errors.add("name", REQUIRED);
                None
            }
            None => None,
        };

        if let Some(name) = &name {
            check_text("name", name, false, &mut errors);
        }

        errors.finish(name.map(|name| name.trim().to_string()))
    }
}
