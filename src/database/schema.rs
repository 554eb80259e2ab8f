use serde::Serialize;

use crate::constants::{INGREDIENT_COUNT_PER_PAGE, TAG_COUNT_PER_PAGE};

pub type Id = i32;

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub name: String,
    #[serde(skip)]
    pub password: String,
    pub is_active: bool,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize)]
pub struct Recipe {
    pub id: Id,
    pub user_id: Id,
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: f64,
    pub link: String,
    pub image: Option<String>,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RecipeRow {
    #[sqlx(flatten)]
    pub recipe: Recipe,
    pub count: i64,
}

/// Tags and ingredients share one record layout; [`AttributeKind`] tells them apart.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub id: Id,
    pub user_id: Id,
    pub name: String,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct AttributeRow {
    #[sqlx(flatten)]
    pub attribute: Attribute,
    pub count: i64,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct LinkedAttribute {
    pub recipe_id: Id,
    #[sqlx(flatten)]
    pub attribute: Attribute,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeKind {
    Tag,
    Ingredient,
}

impl AttributeKind {
    pub fn table(&self) -> &'static str {
        match self {
            AttributeKind::Tag => "tags",
            AttributeKind::Ingredient => "ingredients",
        }
    }

    /// Link table between recipes and this kind, with its foreign key column.
    pub fn link(&self) -> (&'static str, &'static str) {
        match self {
            AttributeKind::Tag => ("recipe_tags", "tag_id"),
            AttributeKind::Ingredient => ("recipe_ingredients", "ingredient_id"),
        }
    }

    pub fn page_size(&self) -> i64 {
        match self {
            AttributeKind::Tag => TAG_COUNT_PER_PAGE,
            AttributeKind::Ingredient => INGREDIENT_COUNT_PER_PAGE,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AttributeKind::Tag => "tag",
            AttributeKind::Ingredient => "ingredient",
        }
    }
}

/// A recipe together with the tags and ingredients linked to it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeRecord {
    pub recipe: Recipe,
    pub tags: Vec<Attribute>,
    pub ingredients: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipe {
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: f64,
    pub link: String,
    pub tags: Vec<String>,
    pub ingredients: Vec<String>,
}

/// Field updates for an existing recipe. `None` leaves the column untouched;
/// `Some` on `tags`/`ingredients` replaces every link of that kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<f64>,
    pub link: Option<String>,
    pub tags: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
}

impl RecipeChanges {
    pub fn names(&self, kind: AttributeKind) -> Option<&Vec<String>> {
        match kind {
            AttributeKind::Tag => self.tags.as_ref(),
            AttributeKind::Ingredient => self.ingredients.as_ref(),
        }
    }
}
