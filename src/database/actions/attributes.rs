use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::QueryError,
    pagination::PageContext,
    query::AttributeQuery,
    schema::{Attribute, AttributeKind, AttributeRow, Id, LinkedAttribute},
};

pub async fn fetch_attributes(
    query: &AttributeQuery,
    pool: &Pool<Postgres>,
) -> Result<PageContext<Attribute>, potion::Error> {
    let page_size = query.kind.page_size();

    let rows: Vec<AttributeRow> = query
        .build(page_size)
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
    let rows = rows.into_iter().map(|row| row.attribute).collect();

    Ok(PageContext::from_rows(
        rows,
        total_count,
        page_size,
        query.offset,
    ))
}

/// Attributes of `kind` linked to any of `recipe_ids`, ordered by id.
pub async fn list_linked_attributes(
    kind: AttributeKind,
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<LinkedAttribute>, potion::Error> {
    let (link_table, column) = kind.link();
    let table = kind.table();

    let rows: Vec<LinkedAttribute> = sqlx::query_as(&format!(
        "
        SELECT l.recipe_id AS recipe_id, a.id AS id, a.user_id AS user_id, a.name AS name
        FROM {link_table} l
        INNER JOIN {table} a ON a.id = l.{column}
        WHERE l.recipe_id = ANY($1)
        ORDER BY a.id
    "
    ))
    .bind(recipe_ids.to_vec())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn get_or_create_attribute(
    kind: AttributeKind,
    user_id: Id,
    name: &str,
    conn: &mut PgConnection,
) -> Result<Id, potion::Error> {
    let table = kind.table();

    let existing: Option<(Id,)> = sqlx::query_as(&format!(
        "SELECT id FROM {table} WHERE user_id = $1 AND name = $2 ORDER BY id LIMIT 1"
    ))
    .bind(user_id)
    .bind(name)
    .fetch_optional(&mut *conn)
    .await
    .map_err(QueryError::from)?;

    if let Some((id,)) = existing {
        return Ok(id);
    }

    let created: (Id,) = sqlx::query_as(&format!(
        "INSERT INTO {table} (user_id, name) VALUES ($1, $2) RETURNING id"
    ))
    .bind(user_id)
    .bind(name)
    .fetch_one(&mut *conn)
    .await
    .map_err(QueryError::from)?;

    log::info!("> Created {} {} for user {user_id}", kind.label(), created.0);

    Ok(created.0)
}

/// Replaces the links of `kind` on a recipe with attributes named `names`,
/// creating missing ones under `user_id`.
pub async fn replace_recipe_attributes(
    kind: AttributeKind,
    recipe_id: Id,
    user_id: Id,
    names: &[String],
    conn: &mut PgConnection,
) -> Result<(), potion::Error> {
    let (link_table, column) = kind.link();

    sqlx::query(&format!("DELETE FROM {link_table} WHERE recipe_id = $1"))
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    for name in names {
        let attribute_id = get_or_create_attribute(kind, user_id, name, &mut *conn).await?;

        sqlx::query(&format!(
            "INSERT INTO {link_table} (recipe_id, {column}) VALUES ($1, $2) ON CONFLICT DO NOTHING"
        ))
        .bind(recipe_id)
        .bind(attribute_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;
    }

    Ok(())
}

pub async fn update_attribute(
    kind: AttributeKind,
    user_id: Id,
    id: Id,
    name: Option<String>,
    pool: &Pool<Postgres>,
) -> Result<Option<Attribute>, potion::Error> {
    let table = kind.table();

    let row: Option<Attribute> = sqlx::query_as(&format!(
        "UPDATE {table} SET name = COALESCE($3, name) WHERE id = $1 AND user_id = $2 RETURNING id, user_id, name"
    ))
    .bind(id)
    .bind(user_id)
    .bind(name)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn delete_attribute(
    kind: AttributeKind,
    user_id: Id,
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, potion::Error> {
    let table = kind.table();

    let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = $1 AND user_id = $2"))
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}
