use std::collections::HashMap;

use sqlx::{Pool, Postgres};

use super::attributes::{list_linked_attributes, replace_recipe_attributes};
use crate::{
    constants::RECIPE_COUNT_PER_PAGE,
    error::QueryError,
    pagination::PageContext,
    query::RecipeQuery,
    schema::{
        Attribute, AttributeKind, Id, NewRecipe, Recipe, RecipeChanges, RecipeRecord, RecipeRow,
    },
};

pub async fn fetch_recipes(
    query: &RecipeQuery,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeRecord>, potion::Error> {
    let rows: Vec<RecipeRow> = query
        .build(RECIPE_COUNT_PER_PAGE)
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None if query.offset > 0 => query
            .build_count()
            .build_query_scalar::<i64>()
            .fetch_one(pool)
            .await
            .map_err(QueryError::from)?,
        None => 0,
    };
    let recipes = rows.into_iter().map(|row| row.recipe).collect();
    let records = with_attributes(recipes, pool).await?;

    Ok(PageContext::from_rows(
        records,
        total_count,
        RECIPE_COUNT_PER_PAGE,
        query.offset,
    ))
}

/// Attaches linked tags and ingredients, keeping the order of `recipes`.
pub async fn with_attributes(
    recipes: Vec<Recipe>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeRecord>, potion::Error> {
    if recipes.is_empty() {
        return Ok(vec![]);
    }

    let ids: Vec<Id> = recipes.iter().map(|recipe| recipe.id).collect();

    let mut linked: HashMap<(AttributeKind, Id), Vec<Attribute>> = HashMap::new();
    for kind in [AttributeKind::Tag, AttributeKind::Ingredient] {
        list_linked_attributes(kind, &ids, pool)
            .await?
            .into_iter()
            .for_each(|row| {
                linked
                    .entry((kind, row.recipe_id))
                    .or_default()
                    .push(row.attribute)
            });
    }

    Ok(recipes
        .into_iter()
        .map(|recipe| RecipeRecord {
            tags: linked
                .remove(&(AttributeKind::Tag, recipe.id))
                .unwrap_or_default(),
            ingredients: linked
                .remove(&(AttributeKind::Ingredient, recipe.id))
                .unwrap_or_default(),
            recipe,
        })
        .collect())
}

pub async fn get_recipe(
    user_id: Id,
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeRecord>, potion::Error> {
    let row: Option<Recipe> =
        sqlx::query_as("SELECT * FROM recipes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    match row {
        Some(recipe) => Ok(with_attributes(vec![recipe], pool).await?.pop()),
        None => Ok(None),
    }
}

pub async fn create_recipe(
    user_id: Id,
    recipe: NewRecipe,
    pool: &Pool<Postgres>,
) -> Result<RecipeRecord, potion::Error> {
    let mut tx = pool.begin().await.map_err(QueryError::from)?;

    let created: Recipe = sqlx::query_as(
        "
        INSERT INTO recipes (user_id, title, description, time_minutes, price, link)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
    ",
    )
    .bind(user_id)
    .bind(&recipe.title)
    .bind(&recipe.description)
    .bind(recipe.time_minutes)
    .bind(recipe.price)
    .bind(&recipe.link)
    .fetch_one(&mut *tx)
    .await
    .map_err(QueryError::from)?;

    replace_recipe_attributes(AttributeKind::Tag, created.id, user_id, &recipe.tags, &mut tx)
        .await?;
    replace_recipe_attributes(
        AttributeKind::Ingredient,
        created.id,
        user_id,
        &recipe.ingredients,
        &mut tx,
    )
    .await?;

    tx.commit().await.map_err(QueryError::from)?;

    log::info!("> Created recipe {} for user {user_id}", created.id);

    get_recipe(user_id, created.id, pool)
        .await?
        .ok_or_else(crate::error::not_found)
}

pub async fn update_recipe(
    user_id: Id,
    id: Id,
    changes: RecipeChanges,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeRecord>, potion::Error> {
    let mut tx = pool.begin().await.map_err(QueryError::from)?;

    let updated: Option<Recipe> = sqlx::query_as(
        "
        UPDATE recipes SET
            title = COALESCE($3, title),
            description = COALESCE($4, description),
            time_minutes = COALESCE($5, time_minutes),
            price = COALESCE($6, price),
            link = COALESCE($7, link)
        WHERE id = $1 AND user_id = $2
        RETURNING *
    ",
    )
    .bind(id)
    .bind(user_id)
    .bind(&changes.title)
    .bind(&changes.description)
    .bind(changes.time_minutes)
    .bind(changes.price)
    .bind(&changes.link)
    .fetch_optional(&mut *tx)
    .await
    .map_err(QueryError::from)?;

    if updated.is_none() {
        return Ok(None);
    }

    for kind in [AttributeKind::Tag, AttributeKind::Ingredient] {
        if let Some(names) = changes.names(kind) {
            replace_recipe_attributes(kind, id, user_id, names, &mut tx).await?;
        }
    }

    tx.commit().await.map_err(QueryError::from)?;

    get_recipe(user_id, id, pool).await
}

pub async fn set_recipe_image(
    user_id: Id,
    id: Id,
    image: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeRecord>, potion::Error> {
    let updated: Option<Recipe> =
        sqlx::query_as("UPDATE recipes SET image = $3 WHERE id = $1 AND user_id = $2 RETURNING *")
            .bind(id)
            .bind(user_id)
            .bind(image)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    match updated {
        Some(recipe) => Ok(with_attributes(vec![recipe], pool).await?.pop()),
        None => Ok(None),
    }
}

pub async fn delete_recipe(
    user_id: Id,
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, potion::Error> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() > 0 {
        log::info!("> Deleted recipe {id} of user {user_id}");
    }

    Ok(result.rows_affected() > 0)
}
