//! Owner-scoped list queries for recipes, tags and ingredients.
//!
//! A query is a plain value built from the requester and the raw query
//! parameters. It renders itself to SQL for [`crate::store::PgStore`] and can
//! be evaluated directly against in-memory records, with the same scoping,
//! narrowing, ordering and deduplication either way.

use std::cmp::Ordering;

use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};

use crate::{
    error::ValidationErrors,
    schema::{Attribute, AttributeKind, Id, Recipe},
};

/// Raw `?tags=&ingredients=&offset=` parameters of the recipe list.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct RecipeParams {
    pub tags: Option<String>,
    pub ingredients: Option<String>,
    pub offset: Option<String>,
}

/// Raw `?assigned_only=&offset=` parameters of the tag and ingredient lists.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct AttributeParams {
    pub assigned_only: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecipeQuery {
    pub user_id: Id,
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<Id>>,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeQuery {
    pub kind: AttributeKind,
    pub user_id: Id,
    pub assigned_only: bool,
    pub offset: i64,
}

/// Splits a comma separated list of IDs. An empty value means no filter.
pub fn parse_id_list(field: &str, value: Option<&str>) -> Result<Option<Vec<Id>>, ValidationErrors> {
    let value = match value {
        Some(value) if !value.is_empty() => value,
        _ => return Ok(None),
    };

    value
        .split(',')
        .map(|token| token.trim().parse::<Id>())
        .collect::<Result<Vec<Id>, _>>()
        .map(Some)
        .map_err(|_e| {
            ValidationErrors::field(field, "Expected a comma separated list of integer IDs.")
        })
}

pub fn parse_flag(field: &str, value: Option<&str>) -> Result<bool, ValidationErrors> {
    match value.map(str::trim) {
        None | Some("") => Ok(false),
        Some(value) => value
            .parse::<i64>()
            .map(|flag| flag != 0)
            .map_err(|_e| ValidationErrors::field(field, "Expected 0 or 1.")),
    }
}

pub fn parse_offset(value: Option<&str>) -> Result<i64, ValidationErrors> {
    match value.map(str::trim) {
        None | Some("") => Ok(0),
        Some(value) => match value.parse::<i64>() {
            Ok(offset) if offset >= 0 => Ok(offset),
            Ok(_) => Err(ValidationErrors::field(
                "offset",
                "Ensure this value is greater than or equal to 0.",
            )),
            Err(_) => Err(ValidationErrors::field("offset", "A valid integer is required.")),
        },
    }
}

impl RecipeQuery {
    pub fn from_params(user_id: Id, params: &RecipeParams) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let tags = parse_id_list("tags", params.tags.as_deref()).unwrap_or_else(|e| {
            errors.merge(e);
            None
        });
        let ingredients =
            parse_id_list("ingredients", params.ingredients.as_deref()).unwrap_or_else(|e| {
                errors.merge(e);
                None
            });
        let offset = parse_offset(params.offset.as_deref()).unwrap_or_else(|e| {
            errors.merge(e);
            0
        });

        errors.finish(Self {
            user_id,
            tags,
            ingredients,
            offset,
        })
    }

    fn ids(&self, kind: AttributeKind) -> Option<&Vec<Id>> {
        match kind {
            AttributeKind::Tag => self.tags.as_ref(),
            AttributeKind::Ingredient => self.ingredients.as_ref(),
        }
    }

    fn push_filters(&self, builder: &mut QueryBuilder<'static, Postgres>) {
        builder.push(" WHERE r.user_id = ");
        builder.push_bind(self.user_id);

        for kind in [AttributeKind::Tag, AttributeKind::Ingredient] {
            if let Some(ids) = self.ids(kind) {
                let (link_table, column) = kind.link();
                // semi-join, so a recipe matching several IDs is still returned once
                builder.push(format!(
                    " AND r.id IN (SELECT recipe_id FROM {link_table} WHERE {column} = ANY("
                ));
                builder.push_bind(ids.clone());
                builder.push("))");
            }
        }
    }

    /// `SELECT` for one page of matching recipes, with the total match count in `count`.
    pub fn build(&self, limit: i64) -> QueryBuilder<'static, Postgres> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r");
        self.push_filters(&mut builder);

        builder.push(" ORDER BY r.id DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(self.offset);
        builder
    }

    /// Total number of matching recipes, for pages past the end.
    pub fn build_count(&self) -> QueryBuilder<'static, Postgres> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM recipes r");
        self.push_filters(&mut builder);
        builder
    }

    /// Evaluates the query against one recipe and the IDs of its linked tags and ingredients.
    pub fn admits(&self, recipe: &Recipe, tag_ids: &[Id], ingredient_ids: &[Id]) -> bool {
        if recipe.user_id != self.user_id {
            return false;
        }

        let narrows = |wanted: Option<&Vec<Id>>, linked: &[Id]| match wanted {
            Some(wanted) => linked.iter().any(|id| wanted.contains(id)),
            None => true,
        };

        narrows(self.tags.as_ref(), tag_ids) && narrows(self.ingredients.as_ref(), ingredient_ids)
    }

    pub fn order(a: &Recipe, b: &Recipe) -> Ordering {
        b.id.cmp(&a.id)
    }
}

impl AttributeQuery {
    pub fn from_params(
        kind: AttributeKind,
        user_id: Id,
        params: &AttributeParams,
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let assigned_only =
            parse_flag("assigned_only", params.assigned_only.as_deref()).unwrap_or_else(|e| {
                errors.merge(e);
                false
            });
        let offset = parse_offset(params.offset.as_deref()).unwrap_or_else(|e| {
            errors.merge(e);
            0
        });

        errors.finish(Self {
            kind,
            user_id,
            assigned_only,
            offset,
        })
    }

    fn push_filters(&self, builder: &mut QueryBuilder<'static, Postgres>) {
        let (link_table, column) = self.kind.link();

        builder.push(" WHERE a.user_id = ");
        builder.push_bind(self.user_id);

        if self.assigned_only {
            builder.push(format!(
                " AND EXISTS (SELECT 1 FROM {link_table} l WHERE l.{column} = a.id)"
            ));
        }
    }

    pub fn build(&self, limit: i64) -> QueryBuilder<'static, Postgres> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT a.id, a.user_id, a.name, COUNT(*) OVER() AS count FROM {} a",
            self.kind.table()
        ));
        self.push_filters(&mut builder);

        builder.push(" ORDER BY a.name COLLATE \"C\" DESC, a.id DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(self.offset);
        builder
    }

    pub fn build_count(&self) -> QueryBuilder<'static, Postgres> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT COUNT(*) FROM {} a", self.kind.table()));
        self.push_filters(&mut builder);
        builder
    }

    /// `linked` tells whether at least one recipe references the attribute.
    pub fn admits(&self, attribute: &Attribute, linked: bool) -> bool {
        attribute.user_id == self.user_id && (!self.assigned_only || linked)
    }

    pub fn order(a: &Attribute, b: &Attribute) -> Ordering {
        b.name
            .as_bytes()
            .cmp(a.name.as_bytes())
            .then_with(|| b.id.cmp(&a.id))
    }
}
