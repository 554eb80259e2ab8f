use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use async_trait::async_trait;

use crate::{
    constants::RECIPE_COUNT_PER_PAGE,
    error::internal,
    pagination::PageContext,
    query::{AttributeQuery, RecipeQuery},
    schema::{Attribute, AttributeKind, Id, NewRecipe, Recipe, RecipeChanges, RecipeRecord, User},
    store::EntityStore,
};

#[derive(Default)]
struct MemoryState {
    sequences: HashMap<&'static str, Id>,
    users: BTreeMap<Id, User>,
    recipes: BTreeMap<Id, Recipe>,
    attributes: HashMap<AttributeKind, BTreeMap<Id, Attribute>>,
    // (kind, recipe id, attribute id)
    links: BTreeSet<(AttributeKind, Id, Id)>,
}

impl MemoryState {
    fn next_id(&mut self, table: &'static str) -> Id {
        let id = self.sequences.entry(table).or_insert(0);
        *id += 1;
        *id
    }

    fn linked_ids(&self, kind: AttributeKind, recipe_id: Id) -> Vec<Id> {
        self.links
            .range((kind, recipe_id, Id::MIN)..=(kind, recipe_id, Id::MAX))
            .map(|(_, _, attribute_id)| *attribute_id)
            .collect()
    }

    fn is_linked(&self, kind: AttributeKind, attribute_id: Id) -> bool {
        self.links
            .iter()
            .any(|(k, _, id)| *k == kind && *id == attribute_id)
    }

    fn record(&self, recipe: &Recipe) -> RecipeRecord {
        let resolve = |kind: AttributeKind| -> Vec<Attribute> {
            let table = self.attributes.get(&kind);
            self.linked_ids(kind, recipe.id)
                .into_iter()
                .filter_map(|id| table.and_then(|table| table.get(&id)).cloned())
                .collect()
        };

        RecipeRecord {
            recipe: recipe.clone(),
            tags: resolve(AttributeKind::Tag),
            ingredients: resolve(AttributeKind::Ingredient),
        }
    }

    fn get_or_create_attribute(&mut self, kind: AttributeKind, user_id: Id, name: &str) -> Id {
        let existing = self.attributes.get(&kind).and_then(|table| {
            table
                .values()
                .find(|attribute| attribute.user_id == user_id && attribute.name == name)
                .map(|attribute| attribute.id)
        });
        if let Some(id) = existing {
            return id;
        }

        let id = self.next_id(kind.table());
        self.attributes.entry(kind).or_default().insert(
            id,
            Attribute {
                id,
                user_id,
                name: name.to_string(),
            },
        );
        id
    }

    fn replace_links(&mut self, kind: AttributeKind, recipe_id: Id, user_id: Id, names: &[String]) {
        self.links
            .retain(|(k, recipe, _)| !(*k == kind && *recipe == recipe_id));

        for name in names {
            let attribute_id = self.get_or_create_attribute(kind, user_id, name);
            self.links.insert((kind, recipe_id, attribute_id));
        }
    }
}

/// In-process [`EntityStore`] with the same owner scoping, ordering and
/// paging as the PostgreSQL store. Used by the test-suite and for
/// `DATABASE_URL=memory` runs.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>, potion::Error> {
        self.state
            .read()
            .map_err(|_e| internal("Memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>, potion::Error> {
        self.state
            .write()
            .map_err(|_e| internal("Memory store lock poisoned"))
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn fetch_recipes(
        &self,
        query: &RecipeQuery,
    ) -> Result<PageContext<RecipeRecord>, potion::Error> {
        let state = self.read()?;

        let mut matches: Vec<&Recipe> = state
            .recipes
            .values()
            .filter(|recipe| {
                query.admits(
                    recipe,
                    &state.linked_ids(AttributeKind::Tag, recipe.id),
                    &state.linked_ids(AttributeKind::Ingredient, recipe.id),
                )
            })
            .collect();
        matches.sort_by(|a, b| RecipeQuery::order(a, b));

        let total_rows = matches.len() as i64;
        let rows = matches
            .into_iter()
            .skip(query.offset as usize)
            .take(RECIPE_COUNT_PER_PAGE as usize)
            .map(|recipe| state.record(recipe))
            .collect();

        Ok(PageContext::from_rows(
            rows,
            total_rows,
            RECIPE_COUNT_PER_PAGE,
            query.offset,
        ))
    }

    async fn get_recipe(
        &self,
        user_id: Id,
        id: Id,
    ) -> Result<Option<RecipeRecord>, potion::Error> {
        let state = self.read()?;

        Ok(state
            .recipes
            .get(&id)
            .filter(|recipe| recipe.user_id == user_id)
            .map(|recipe| state.record(recipe)))
    }

    async fn create_recipe(
        &self,
        user_id: Id,
        recipe: NewRecipe,
    ) -> Result<RecipeRecord, potion::Error> {
        let mut state = self.write()?;

        let id = state.next_id("recipes");
        let created = Recipe {
            id,
            user_id,
            title: recipe.title,
            description: recipe.description,
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            link: recipe.link,
            image: None,
        };
        state.recipes.insert(id, created.clone());
        state.replace_links(AttributeKind::Tag, id, user_id, &recipe.tags);
        state.replace_links(AttributeKind::Ingredient, id, user_id, &recipe.ingredients);

        log::info!("> Created recipe {id} for user {user_id}");

        Ok(state.record(&created))
    }

    async fn update_recipe(
        &self,
        user_id: Id,
        id: Id,
        changes: RecipeChanges,
    ) -> Result<Option<RecipeRecord>, potion::Error> {
        let mut state = self.write()?;

        let recipe = match state.recipes.get_mut(&id) {
            Some(recipe) if recipe.user_id == user_id => recipe,
            _ => return Ok(None),
        };

        if let Some(title) = &changes.title {
            recipe.title = title.clone();
        }
        if let Some(description) = &changes.description {
            recipe.description = description.clone();
        }
        if let Some(time_minutes) = changes.time_minutes {
            recipe.time_minutes = time_minutes;
        }
        if let Some(price) = changes.price {
            recipe.price = price;
        }
        if let Some(link) = &changes.link {
            recipe.link = link.clone();
        }
        let updated = recipe.clone();

        for kind in [AttributeKind::Tag, AttributeKind::Ingredient] {
            if let Some(names) = changes.names(kind) {
                state.replace_links(kind, id, user_id, names);
            }
        }

        Ok(Some(state.record(&updated)))
    }

    async fn set_recipe_image(
        &self,
        user_id: Id,
        id: Id,
        image: &str,
    ) -> Result<Option<RecipeRecord>, potion::Error> {
        let mut state = self.write()?;

        let updated = match state.recipes.get_mut(&id) {
            Some(recipe) if recipe.user_id == user_id => {
                recipe.image = Some(image.to_string());
                recipe.clone()
            }
            _ => return Ok(None),
        };

        Ok(Some(state.record(&updated)))
    }

    async fn delete_recipe(&self, user_id: Id, id: Id) -> Result<bool, potion::Error> {
        let mut state = self.write()?;

        match state.recipes.get(&id) {
            Some(recipe) if recipe.user_id == user_id => {}
            _ => return Ok(false),
        }

        state.recipes.remove(&id);
        state.links.retain(|(_, recipe_id, _)| *recipe_id != id);

        log::info!("> Deleted recipe {id} of user {user_id}");

        Ok(true)
    }

    async fn fetch_attributes(
        &self,
        query: &AttributeQuery,
    ) -> Result<PageContext<Attribute>, potion::Error> {
        let state = self.read()?;
        let page_size = query.kind.page_size();

        let mut matches: Vec<&Attribute> = state
            .attributes
            .get(&query.kind)
            .map(|table| {
                table
                    .values()
                    .filter(|attribute| {
                        query.admits(attribute, state.is_linked(query.kind, attribute.id))
                    })
                    .collect()
            })
            .unwrap_or_default();
        matches.sort_by(|a, b| AttributeQuery::order(a, b));

        let total_rows = matches.len() as i64;
        let rows = matches
            .into_iter()
            .skip(query.offset as usize)
            .take(page_size as usize)
            .cloned()
            .collect();

        Ok(PageContext::from_rows(
            rows,
            total_rows,
            page_size,
            query.offset,
        ))
    }

    async fn update_attribute(
        &self,
        kind: AttributeKind,
        user_id: Id,
        id: Id,
        name: Option<String>,
    ) -> Result<Option<Attribute>, potion::Error> {
        let mut state = self.write()?;

        let attribute = state
            .attributes
            .get_mut(&kind)
            .and_then(|table| table.get_mut(&id))
            .filter(|attribute| attribute.user_id == user_id);

        Ok(attribute.map(|attribute| {
            if let Some(name) = name {
                attribute.name = name;
            }
            attribute.clone()
        }))
    }

    async fn delete_attribute(
        &self,
        kind: AttributeKind,
        user_id: Id,
        id: Id,
    ) -> Result<bool, potion::Error> {
        let mut state = self.write()?;

        let owned = state
            .attributes
            .get(&kind)
            .and_then(|table| table.get(&id))
            .map(|attribute| attribute.user_id == user_id)
            .unwrap_or(false);
        if !owned {
            return Ok(false);
        }

        if let Some(table) = state.attributes.get_mut(&kind) {
            table.remove(&id);
        }
        state
            .links
            .retain(|(k, _, attribute_id)| !(*k == kind && *attribute_id == id));

        Ok(true)
    }

    async fn register_user(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<Option<User>, potion::Error> {
        let mut state = self.write()?;
        let email = email.to_lowercase();

        if state.users.values().any(|user| user.email == email) {
            return Ok(None);
        }

        let id = state.next_id("users");
        let user = User {
            id,
            email,
            name: name.to_string(),
            password: password.to_string(),
            is_active: true,
        };
        state.users.insert(id, user.clone());

        Ok(Some(user))
    }

    async fn get_user_by_id(&self, id: Id) -> Result<Option<User>, potion::Error> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, potion::Error> {
        let email = email.to_lowercase();

        Ok(self
            .read()?
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }
}
