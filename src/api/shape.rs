//! Output representations and their selection per operation.

use serde::Serialize;

use crate::{
    media::media_url,
    schema::{Attribute, Id, RecipeRecord},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Destroy,
    UploadImage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecipeShape {
    Summary,
    Detail,
    Image,
}

const RECIPE_SHAPES: &[(Action, RecipeShape)] = &[
    (Action::List, RecipeShape::Summary),
    (Action::UploadImage, RecipeShape::Image),
];

impl RecipeShape {
    /// Representation used by the recipe endpoint; detail unless listed otherwise.
    pub fn for_action(action: Action) -> RecipeShape {
        RECIPE_SHAPES
            .iter()
            .find_map(|(a, shape)| (*a == action).then_some(*shape))
            .unwrap_or(RecipeShape::Detail)
    }

    pub fn encode(&self, record: &RecipeRecord) -> RecipeRepresentation {
        match self {
            RecipeShape::Summary => RecipeRepresentation::Summary(RecipeSummary::from(record)),
            RecipeShape::Detail => RecipeRepresentation::Detail(RecipeDetail::from(record)),
            RecipeShape::Image => RecipeRepresentation::Image(RecipeImage::from(record)),
        }
    }
}

/// Tags and ingredients use one representation for every operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AttributeShape;

impl AttributeShape {
    pub fn for_action(_action: Action) -> AttributeShape {
        AttributeShape
    }

    pub fn encode(&self, attribute: &Attribute) -> AttributeRepresentation {
        AttributeRepresentation::from(attribute)
    }
}

/// Decimal string with two places, the way prices are exchanged.
pub fn format_price(price: f64) -> String {
    format!("{price:.2}")
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AttributeRepresentation {
    pub id: Id,
    pub name: String,
}

impl From<&Attribute> for AttributeRepresentation {
    fn from(value: &Attribute) -> Self {
        Self {
            id: value.id,
            name: value.name.to_owned(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecipeSummary {
    pub id: Id,
    pub title: String,
    pub time_minutes: i32,
    pub price: String,
    pub link: String,
    pub tags: Vec<Id>,
    pub ingredients: Vec<Id>,
}

impl From<&RecipeRecord> for RecipeSummary {
    fn from(value: &RecipeRecord) -> Self {
        let recipe = &value.recipe;

        Self {
            id: recipe.id,
            title: recipe.title.to_owned(),
            time_minutes: recipe.time_minutes,
            price: format_price(recipe.price),
            link: recipe.link.to_owned(),
            tags: value.tags.iter().map(|tag| tag.id).collect(),
            ingredients: value.ingredients.iter().map(|ingredient| ingredient.id).collect(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecipeDetail {
    pub id: Id,
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: String,
    pub link: String,
    pub image: Option<String>,
    pub tags: Vec<AttributeRepresentation>,
    pub ingredients: Vec<AttributeRepresentation>,
}

impl From<&RecipeRecord> for RecipeDetail {
    fn from(value: &RecipeRecord) -> Self {
        let recipe = &value.recipe;

        Self {
            id: recipe.id,
            title: recipe.title.to_owned(),
            description: recipe.description.to_owned(),
            time_minutes: recipe.time_minutes,
            price: format_price(recipe.price),
            link: recipe.link.to_owned(),
            image: recipe.image.as_deref().map(media_url),
            tags: value.tags.iter().map(AttributeRepresentation::from).collect(),
            ingredients: value
                .ingredients
                .iter()
                .map(AttributeRepresentation::from)
                .collect(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecipeImage {
    pub id: Id,
    pub image: Option<String>,
}

impl From<&RecipeRecord> for RecipeImage {
    fn from(value: &RecipeRecord) -> Self {
        Self {
            id: value.recipe.id,
            image: value.recipe.image.as_deref().map(media_url),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum RecipeRepresentation {
    Summary(RecipeSummary),
    Detail(RecipeDetail),
    Image(RecipeImage),
}
