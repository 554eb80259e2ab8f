use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    actions::{attributes, recipes, users},
    pagination::PageContext,
    query::{AttributeQuery, RecipeQuery},
    schema::{Attribute, AttributeKind, Id, NewRecipe, RecipeChanges, RecipeRecord, User},
};

/// Persistence behind the handlers. Every recipe, tag and ingredient operation
/// takes the owner and never touches records of another user; a foreign
/// record reads as absent.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn fetch_recipes(
        &self,
        query: &RecipeQuery,
    ) -> Result<PageContext<RecipeRecord>, potion::Error>;

    async fn get_recipe(&self, user_id: Id, id: Id)
        -> Result<Option<RecipeRecord>, potion::Error>;

    async fn create_recipe(
        &self,
        user_id: Id,
        recipe: NewRecipe,
    ) -> Result<RecipeRecord, potion::Error>;

    async fn update_recipe(
        &self,
        user_id: Id,
        id: Id,
        changes: RecipeChanges,
    ) -> Result<Option<RecipeRecord>, potion::Error>;

    async fn set_recipe_image(
        &self,
        user_id: Id,
        id: Id,
        image: &str,
    ) -> Result<Option<RecipeRecord>, potion::Error>;

    async fn delete_recipe(&self, user_id: Id, id: Id) -> Result<bool, potion::Error>;

    async fn fetch_attributes(
        &self,
        query: &AttributeQuery,
    ) -> Result<PageContext<Attribute>, potion::Error>;

    async fn update_attribute(
        &self,
        kind: AttributeKind,
        user_id: Id,
        id: Id,
        name: Option<String>,
    ) -> Result<Option<Attribute>, potion::Error>;

    async fn delete_attribute(
        &self,
        kind: AttributeKind,
        user_id: Id,
        id: Id,
    ) -> Result<bool, potion::Error>;

    async fn register_user(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<Option<User>, potion::Error>;

    async fn get_user_by_id(&self, id: Id) -> Result<Option<User>, potion::Error>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, potion::Error>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntityStore for PgStore {
    async fn fetch_recipes(
        &self,
        query: &RecipeQuery,
    ) -> Result<PageContext<RecipeRecord>, potion::Error> {
        recipes::fetch_recipes(query, &self.pool).await
    }

    async fn get_recipe(
        &self,
        user_id: Id,
        id: Id,
    ) -> Result<Option<RecipeRecord>, potion::Error> {
        recipes::get_recipe(user_id, id, &self.pool).await
    }

    async fn create_recipe(
        &self,
        user_id: Id,
        recipe: NewRecipe,
    ) -> Result<RecipeRecord, potion::Error> {
        recipes::create_recipe(user_id, recipe, &self.pool).await
    }

    async fn update_recipe(
        &self,
        user_id: Id,
        id: Id,
        changes: RecipeChanges,
    ) -> Result<Option<RecipeRecord>, potion::Error> {
        recipes::update_recipe(user_id, id, changes, &self.pool).await
    }

    async fn set_recipe_image(
        &self,
        user_id: Id,
        id: Id,
        image: &str,
    ) -> Result<Option<RecipeRecord>, potion::Error> {
        recipes::set_recipe_image(user_id, id, image, &self.pool).await
    }

    async fn delete_recipe(&self, user_id: Id, id: Id) -> Result<bool, potion::Error> {
        recipes::delete_recipe(user_id, id, &self.pool).await
    }

    async fn fetch_attributes(
        &self,
        query: &AttributeQuery,
    ) -> Result<PageContext<Attribute>, potion::Error> {
        attributes::fetch_attributes(query, &self.pool).await
    }

    async fn update_attribute(
        &self,
        kind: AttributeKind,
        user_id: Id,
        id: Id,
        name: Option<String>,
    ) -> Result<Option<Attribute>, potion::Error> {
        attributes::update_attribute(kind, user_id, id, name, &self.pool).await
    }

    async fn delete_attribute(
        &self,
        kind: AttributeKind,
        user_id: Id,
        id: Id,
    ) -> Result<bool, potion::Error> {
        attributes::delete_attribute(kind, user_id, id, &self.pool).await
    }

    async fn register_user(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<Option<User>, potion::Error> {
        users::register_user(email, name, password, &self.pool).await
    }

    async fn get_user_by_id(&self, id: Id) -> Result<Option<User>, potion::Error> {
        users::get_user_by_id(id, &self.pool).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, potion::Error> {
        users::get_user_by_email(email, &self.pool).await
    }
}
