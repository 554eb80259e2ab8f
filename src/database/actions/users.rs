use sqlx::{Pool, Postgres};

use crate::{
    error::QueryError,
    schema::{Id, User},
};

pub async fn get_user_by_email(
    email: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<User>, potion::Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_id(id: Id, pool: &Pool<Postgres>) -> Result<Option<User>, potion::Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Creates a user with `password` being the already hashed password.
/// Returns `None` when the email is taken.
pub async fn register_user(
    email: &str,
    name: &str,
    password: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<User>, potion::Error> {
    let row: Option<User> = sqlx::query_as(
        "
        INSERT INTO users (email, name, password)
        VALUES (LOWER($1), $2, $3)
        ON CONFLICT DO NOTHING RETURNING *;
    ",
    )
    .bind(email)
    .bind(name)
    .bind(password)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}
