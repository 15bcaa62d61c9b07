// src/services/menu_service.rs

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{menu_repo::MenuItemFields, MenuRepository},
    models::menu::{Category, MenuItem, PublicMenuCategory, PublicMenuItem, RecipeLine},
};

/// Nests public items under their categories, keeping category order and
/// dropping categories left without items.
pub fn group_public_menu(categories: Vec<Category>, items: Vec<PublicMenuItem>) -> Vec<PublicMenuCategory> {
    let mut by_category: BTreeMap<Uuid, Vec<PublicMenuItem>> = BTreeMap::new();
    for item in items {
        by_category.entry(item.category_id).or_default().push(item);
    }

    categories
        .into_iter()
        .filter_map(|category| {
            let items = by_category.remove(&category.id)?;
            Some(PublicMenuCategory { category, items })
        })
        .collect()
}

/// Merges repeated materials in a recipe, summing their quantities.
pub fn normalize_recipe(lines: &[(Uuid, Decimal)]) -> Vec<(Uuid, Decimal)> {
    let mut merged: BTreeMap<Uuid, Decimal> = BTreeMap::new();
    for (material_id, qty) in lines {
        *merged.entry(*material_id).or_default() += *qty;
    }
    merged.into_iter().collect()
}

#[derive(Clone)]
pub struct MenuService {
    menu_repo: MenuRepository,
    pool: PgPool,
}

impl MenuService {
    pub fn new(menu_repo: MenuRepository, pool: PgPool) -> Self {
        Self { menu_repo, pool }
    }

    // ---
    // Categories
    // ---

    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        self.menu_repo.list_categories(false).await
    }

    pub async fn create_category(
        &self,
        name: &str,
        description: Option<&str>,
        image_url: Option<&str>,
        sort_order: i32,
        is_active: bool,
    ) -> Result<Category, AppError> {
        self.menu_repo
            .upsert_category(&self.pool, None, name.trim(), description, image_url, sort_order, is_active)
            .await?
            .ok_or_else(|| anyhow::anyhow!("category insert returned no row").into())
    }

    pub async fn update_category(
        &self,
        id: Uuid,
        name: &str,
        description: Option<&str>,
        image_url: Option<&str>,
        sort_order: i32,
        is_active: bool,
    ) -> Result<Category, AppError> {
        self.menu_repo
            .upsert_category(&self.pool, Some(id), name.trim(), description, image_url, sort_order, is_active)
            .await?
            .ok_or(AppError::ResourceNotFound("category"))
    }

    pub async fn delete_category(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        if self.menu_repo.count_items_in_category(&mut *tx, id).await? > 0 {
            return Err(AppError::CategoryNotEmpty);
        }
        if !self.menu_repo.delete_category(&mut *tx, id).await? {
            return Err(AppError::ResourceNotFound("category"));
        }

        tx.commit().await?;
        Ok(())
    }

    // ---
    // Items
    // ---

    pub async fn list_items(&self, category_id: Option<Uuid>) -> Result<Vec<MenuItem>, AppError> {
        self.menu_repo.list_items(category_id).await
    }

    pub async fn get_item(&self, id: Uuid) -> Result<MenuItem, AppError> {
        self.menu_repo
            .get_item(&self.pool, id)
            .await?
            .ok_or(AppError::ResourceNotFound("menu item"))
    }

    pub async fn create_item(&self, fields: &MenuItemFields<'_>) -> Result<MenuItem, AppError> {
        let mut tx = self.pool.begin().await?;

        self.menu_repo
            .get_category(&mut *tx, fields.category_id)
            .await?
            .ok_or(AppError::ResourceNotFound("category"))?;
        let item = self.menu_repo.create_item(&mut *tx, fields).await?;

        tx.commit().await?;
        tracing::info!(menu_item_id = %item.id, name = %item.name, "menu item created");
        Ok(item)
    }

    pub async fn update_item(&self, id: Uuid, fields: &MenuItemFields<'_>) -> Result<MenuItem, AppError> {
        let mut tx = self.pool.begin().await?;

        self.menu_repo
            .get_category(&mut *tx, fields.category_id)
            .await?
            .ok_or(AppError::ResourceNotFound("category"))?;
        let item = self
            .menu_repo
            .update_item(&mut *tx, id, fields)
            .await?
            .ok_or(AppError::ResourceNotFound("menu item"))?;

        tx.commit().await?;
        Ok(item)
    }

    pub async fn set_availability(&self, id: Uuid, is_available: bool) -> Result<MenuItem, AppError> {
        self.menu_repo
            .set_availability(&self.pool, id, is_available)
            .await?
            .ok_or(AppError::ResourceNotFound("menu item"))
    }

    pub async fn delete_item(&self, id: Uuid) -> Result<(), AppError> {
        if !self.menu_repo.delete_item(&self.pool, id).await? {
            return Err(AppError::ResourceNotFound("menu item"));
        }
        Ok(())
    }

    // ---
    // Recipes
    // ---

    pub async fn get_recipe(&self, menu_item_id: Uuid) -> Result<Vec<RecipeLine>, AppError> {
        self.get_item(menu_item_id).await?;
        self.menu_repo.get_recipe(&self.pool, menu_item_id).await
    }

    /// Replaces the whole recipe atomically.
    pub async fn set_recipe(&self, menu_item_id: Uuid, lines: &[(Uuid, Decimal)]) -> Result<Vec<RecipeLine>, AppError> {
        let mut tx = self.pool.begin().await?;

        self.menu_repo
            .get_item(&mut *tx, menu_item_id)
            .await?
            .ok_or(AppError::ResourceNotFound("menu item"))?;

        self.menu_repo.clear_recipe(&mut *tx, menu_item_id).await?;
        for (material_id, quantity) in normalize_recipe(lines) {
            self.menu_repo
                .add_recipe_line(&mut *tx, menu_item_id, material_id, quantity)
                .await?;
        }

        let recipe = self.menu_repo.get_recipe(&mut *tx, menu_item_id).await?;
        tx.commit().await?;
        Ok(recipe)
    }

    // ---
    // Public
    // ---

    pub async fn public_menu(&self) -> Result<Vec<PublicMenuCategory>, AppError> {
        let categories = self.menu_repo.list_categories(true).await?;
        let items = self.menu_repo.public_items().await?;
        Ok(group_public_menu(categories, items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::menu::Department;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn category(name: &str, sort_order: i32) -> Category {
        Category {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            image_url: None,
            sort_order,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item(category_id: Uuid, name: &str, in_stock: bool) -> PublicMenuItem {
        PublicMenuItem {
            id: Uuid::new_v4(),
            category_id,
            name: name.into(),
            description: None,
            price: dec!(3.50),
            department: Department::Barista,
            image_url: None,
            in_stock,
        }
    }

    #[test]
    fn groups_items_under_categories_in_order() {
        let drinks = category("Drinks", 0);
        let food = category("Food", 1);
        let empty = category("Desserts", 2);

        let items = vec![
            item(food.id, "Toast", true),
            item(drinks.id, "Espresso", true),
            item(drinks.id, "Latte", false),
        ];

        let menu = group_public_menu(vec![drinks.clone(), food.clone(), empty], items);
        assert_eq!(menu.len(), 2);
        assert_eq!(menu[0].category.name, "Drinks");
        assert_eq!(menu[0].items.len(), 2);
        assert!(!menu[0].items[1].in_stock);
        assert_eq!(menu[1].items[0].name, "Toast");
    }

    #[test]
    fn repeated_recipe_materials_are_merged() {
        let milk = Uuid::new_v4();
        let beans = Uuid::new_v4();
        let merged = normalize_recipe(&[(milk, dec!(0.1)), (beans, dec!(0.02)), (milk, dec!(0.05))]);

        assert_eq!(merged.len(), 2);
        let milk_qty = merged.iter().find(|(id, _)| *id == milk).map(|(_, q)| *q);
        assert_eq!(milk_qty, Some(dec!(0.15)));
    }
}
