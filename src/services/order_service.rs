// src/services/order_service.rs

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    common::{error::AppError, money::round_money},
    db::{
        order_repo::{NewOrder, NewOrderItem, OrderFilter},
        MenuRepository, OrderRepository,
    },
    models::{
        auth::StaffMember,
        menu::{Department, MenuItem},
        offers::{CartLine, PriceBreakdown},
        orders::{
            derive_order_status, CartItemRequest, DepartmentStatus, OrderDetail, OrderPage,
            OrderStatus, OrderTracking, OrderType, PlaceOrderRequest, QueueEntry, QuoteRequest,
        },
    },
    services::{
        inventory_service::{compute_requirements, InventoryService},
        notification_service::{cancelled_order_alert, new_order_alert, NotificationService},
        offer_service::OfferService,
        pricing::{price_cart, price_for_checkout, PricingInput},
        printing_service::PrintingService,
        settings_service::SettingsService,
    },
};

const MAX_PAGE_SIZE: i64 = 100;
const MAX_PAGE: i64 = 1_000_000;

/// Rules that depend on the order type.
pub fn validate_fulfillment(req: &PlaceOrderRequest) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    match req.order_type {
        OrderType::Delivery => {
            if req.delivery_address.as_deref().is_none_or(|a| a.trim().is_empty()) {
                let mut e = ValidationError::new("required");
                e.message = Some("Delivery orders need an address.".into());
                errors.add("deliveryAddress", e);
            }
        }
        OrderType::DineIn => {
            if req.table_number.is_none_or(|t| t < 1) {
                let mut e = ValidationError::new("required");
                e.message = Some("Dine-in orders need a table number.".into());
                errors.add("tableNumber", e);
            }
        }
        OrderType::Takeaway => {}
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Pairs each requested line with its menu item, rejecting unknown and
/// unavailable items.
pub fn resolve_lines<'a>(
    requested: &'a [CartItemRequest],
    menu_items: &'a [MenuItem],
) -> Result<Vec<(&'a CartItemRequest, &'a MenuItem)>, AppError> {
    let by_id: HashMap<Uuid, &MenuItem> = menu_items.iter().map(|m| (m.id, m)).collect();

    requested
        .iter()
        .map(|line| {
            let item = by_id
                .get(&line.menu_item_id)
                .copied()
                .ok_or(AppError::ResourceNotFound("menu item"))?;
            if !item.is_available {
                return Err(AppError::MenuItemUnavailable(item.name.clone()));
            }
            Ok((line, item))
        })
        .collect()
}

fn cart_lines(resolved: &[(&CartItemRequest, &MenuItem)]) -> Vec<CartLine> {
    resolved
        .iter()
        .map(|(line, item)| CartLine {
            menu_item_id: item.id,
            category_id: item.category_id,
            unit_price: item.price,
            quantity: line.quantity,
        })
        .collect()
}

fn distinct_ids(lines: &[CartItemRequest]) -> Vec<Uuid> {
    lines.iter().map(|l| l.menu_item_id).collect::<BTreeSet<_>>().into_iter().collect()
}

/// Page number and size clamped to sane bounds.
pub fn page_bounds(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).clamp(1, MAX_PAGE);
    let per_page = per_page.unwrap_or(20).clamp(1, MAX_PAGE_SIZE);
    (page, per_page)
}

/// Row offset of a clamped page.
pub fn page_offset(page: i64, per_page: i64) -> i64 {
    (page - 1) * per_page
}

#[derive(Clone)]
pub struct OrderService {
    order_repo: OrderRepository,
    menu_repo: MenuRepository,
    offer_service: OfferService,
    inventory_service: InventoryService,
    notification_service: NotificationService,
    settings_service: SettingsService,
    printing_service: PrintingService,
    pool: PgPool,
}

impl OrderService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_repo: OrderRepository,
        menu_repo: MenuRepository,
        offer_service: OfferService,
        inventory_service: InventoryService,
        notification_service: NotificationService,
        settings_service: SettingsService,
        printing_service: PrintingService,
        pool: PgPool,
    ) -> Self {
        Self {
            order_repo,
            menu_repo,
            offer_service,
            inventory_service,
            notification_service,
            settings_service,
            printing_service,
            pool,
        }
    }

    // ---
    // Checkout
    // ---

    /// Prices a cart without persisting anything.
    pub async fn quote_cart(&self, req: &QuoteRequest) -> Result<PriceBreakdown, AppError> {
        req.validate()?;

        let settings = self.settings_service.get_settings().await?;
        let menu_items = self.menu_repo.get_items_by_ids(&self.pool, &distinct_ids(&req.items)).await?;
        let resolved = resolve_lines(&req.items, &menu_items)?;
        let lines = cart_lines(&resolved);
        let now = Utc::now();
        let offers = self.offer_service.active_offers(&self.pool, now).await?;

        Ok(price_cart(&PricingInput {
            lines: &lines,
            offers: &offers,
            promo_code: req.promo_code.as_deref(),
            now,
            tax_rate: settings.tax_rate,
            service_charge_rate: settings.service_charge_rate,
        }))
    }

    pub async fn place_order(&self, req: &PlaceOrderRequest) -> Result<OrderDetail, AppError> {
        req.validate()?;
        validate_fulfillment(req)?;

        let settings = self.settings_service.get_settings().await?;
        let ids = distinct_ids(&req.items);

        let mut tx = self.pool.begin().await?;

        let menu_items = self.menu_repo.get_items_by_ids(&mut *tx, &ids).await?;
        let resolved = resolve_lines(&req.items, &menu_items)?;
        let lines = cart_lines(&resolved);

        let now = Utc::now();
        let offers = self.offer_service.active_offers(&mut *tx, now).await?;
        let price = price_for_checkout(&PricingInput {
            lines: &lines,
            offers: &offers,
            promo_code: req.promo_code.as_deref(),
            now,
            tax_rate: settings.tax_rate,
            service_charge_rate: settings.service_charge_rate,
        })?;

        let recipes = self.menu_repo.recipes_for_items(&mut *tx, &ids).await?;
        let quantities: Vec<(Uuid, i32)> = lines.iter().map(|l| (l.menu_item_id, l.quantity)).collect();
        let requirements = compute_requirements(&quantities, &recipes);

        let applied = price.applied_offer.as_ref();
        let order = self
            .order_repo
            .insert_order(
                &mut *tx,
                &NewOrder {
                    customer_name: req.customer_name.trim(),
                    customer_phone: req.customer_phone.trim(),
                    order_type: req.order_type,
                    table_number: match req.order_type {
                        OrderType::DineIn => req.table_number,
                        _ => None,
                    },
                    delivery_address: match req.order_type {
                        OrderType::Delivery => req.delivery_address.as_deref().map(str::trim),
                        _ => None,
                    },
                    notes: req.notes.as_deref(),
                    subtotal: price.subtotal,
                    discount_amount: price.discount_amount,
                    tax_amount: price.tax_amount,
                    service_charge: price.service_charge,
                    total: price.total,
                    offer_id: applied.map(|o| o.id),
                    promo_code: applied.and_then(|o| o.code.as_deref()),
                    inventory_consumed: !requirements.is_empty(),
                },
            )
            .await?;

        self.inventory_service
            .consume_for_order(&mut tx, order.id, &requirements)
            .await?;

        let mut items = Vec::with_capacity(resolved.len());
        for (line, item) in &resolved {
            let created = self
                .order_repo
                .insert_item(
                    &mut *tx,
                    order.id,
                    &NewOrderItem {
                        menu_item_id: item.id,
                        name: &item.name,
                        department: item.department,
                        quantity: line.quantity,
                        unit_price: item.price,
                        line_total: round_money(item.price * Decimal::from(line.quantity)),
                        notes: line.notes.as_deref(),
                    },
                )
                .await?;
            items.push(created);
        }

        let departments: BTreeSet<Department> = resolved.iter().map(|(_, item)| item.department).collect();
        let mut order_departments = Vec::with_capacity(departments.len());
        for department in departments {
            order_departments.push(self.order_repo.insert_department(&mut *tx, order.id, department).await?);
        }

        if let Some(offer) = applied {
            self.offer_service.record_usage(&mut *tx, offer).await?;
        }

        self.notification_service
            .notify(&mut *tx, &new_order_alert(&order))
            .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            order_number = order.order_number,
            total = %order.total,
            "order placed"
        );

        let printing = self.printing_service.clone();
        let order_id = order.id;
        tokio::spawn(async move { printing.auto_print(order_id).await });

        Ok(OrderDetail { order, items, departments: order_departments })
    }

    // ---
    // Reads
    // ---

    pub async fn get_order(&self, id: Uuid) -> Result<OrderDetail, AppError> {
        let mut conn = self.pool.acquire().await?;
        self.order_repo
            .find_detail(&mut conn, id)
            .await?
            .ok_or(AppError::ResourceNotFound("order"))
    }

    pub async fn list_orders(
        &self,
        filter: &OrderFilter,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> Result<OrderPage, AppError> {
        let (page, per_page) = page_bounds(page, per_page);
        let data = self
            .order_repo
            .list_orders(filter, per_page, page_offset(page, per_page))
            .await?;
        let total = self.order_repo.count_orders(filter).await?;
        Ok(OrderPage { data, total, page, per_page })
    }

    pub async fn track_order(&self, id: Uuid) -> Result<OrderTracking, AppError> {
        Ok(self.get_order(id).await?.into())
    }

    // ---
    // Lifecycle
    // ---

    pub async fn update_status(
        &self,
        id: Uuid,
        to: OrderStatus,
        reason: Option<&str>,
    ) -> Result<OrderDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = self
            .order_repo
            .lock_order(&mut *tx, id)
            .await?
            .ok_or(AppError::ResourceNotFound("order"))?;

        if !current.status.can_transition_to(to) {
            return Err(AppError::InvalidStatusTransition { from: current.status, to });
        }

        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        let order = self
            .order_repo
            .update_status(&mut *tx, id, to, if to == OrderStatus::Cancelled { reason } else { None })
            .await?;

        match to {
            OrderStatus::Ready | OrderStatus::Delivered => {
                self.order_repo.set_all_departments_ready(&mut *tx, id).await?;
            }
            OrderStatus::Cancelled => {
                if order.inventory_consumed && !order.inventory_restored {
                    self.inventory_service.restore_for_order(&mut tx, id).await?;
                    self.order_repo.mark_inventory_restored(&mut *tx, id).await?;
                }
                self.notification_service
                    .notify(&mut *tx, &cancelled_order_alert(&order))
                    .await?;
            }
            _ => {}
        }

        let detail = self
            .order_repo
            .find_detail(&mut tx, id)
            .await?
            .ok_or(AppError::ResourceNotFound("order"))?;

        tx.commit().await?;
        tracing::info!(order_id = %id, from = current.status.as_str(), to = to.as_str(), "order status changed");
        Ok(detail)
    }

    /// Moves one department of an order forward and re-derives the order
    /// status from all of its departments.
    pub async fn update_department_status(
        &self,
        actor: &StaffMember,
        id: Uuid,
        department: Department,
        to: DepartmentStatus,
    ) -> Result<OrderDetail, AppError> {
        if let Some(own) = actor.role.department() {
            if own != department {
                return Err(AppError::WrongDepartment(department));
            }
        }

        let mut tx = self.pool.begin().await?;

        let order = self
            .order_repo
            .lock_order(&mut *tx, id)
            .await?
            .ok_or(AppError::ResourceNotFound("order"))?;

        if !order.status.accepts_department_updates() {
            return Err(AppError::OrderNotInPreparation(order.status));
        }

        let departments = self.order_repo.departments(&mut *tx, id).await?;
        let current = departments
            .iter()
            .find(|d| d.department == department)
            .ok_or(AppError::DepartmentNotInOrder(department))?;

        if !current.status.can_transition_to(to) {
            return Err(AppError::InvalidDepartmentTransition { from: current.status, to });
        }

        self.order_repo
            .set_department_status(&mut *tx, id, department, to)
            .await?
            .ok_or(AppError::DepartmentNotInOrder(department))?;

        let statuses: Vec<DepartmentStatus> = departments
            .iter()
            .map(|d| if d.department == department { to } else { d.status })
            .collect();
        let next = derive_order_status(order.status, &statuses);
        if next != order.status {
            self.order_repo.update_status(&mut *tx, id, next, None).await?;
        }

        let detail = self
            .order_repo
            .find_detail(&mut tx, id)
            .await?
            .ok_or(AppError::ResourceNotFound("order"))?;

        tx.commit().await?;
        tracing::info!(
            order_id = %id,
            department = department.as_str(),
            status = to.as_str(),
            order_status = detail.order.status.as_str(),
            "department status changed"
        );
        Ok(detail)
    }

    /// Open orders for a station, oldest first, each with only the
    /// station's lines.
    pub async fn department_queue(&self, department: Department) -> Result<Vec<QueueEntry>, AppError> {
        let rows = self.order_repo.queue(department).await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.order_id).collect();
        let mut items_by_order: HashMap<Uuid, Vec<_>> = HashMap::new();
        for item in self.order_repo.items_for_orders(&ids, department).await? {
            items_by_order.entry(item.order_id).or_default().push(item);
        }

        Ok(rows
            .into_iter()
            .map(|row| QueueEntry {
                items: items_by_order.remove(&row.order_id).unwrap_or_default(),
                order_id: row.order_id,
                order_number: row.order_number,
                order_type: row.order_type,
                table_number: row.table_number,
                order_status: row.order_status,
                department_status: row.department_status,
                notes: row.notes,
                created_at: row.created_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{AppConfig, AppState},
        db::{inventory_repo::MaterialFields, menu_repo::MenuItemFields, offer_repo::OfferFields},
        models::{
            inventory::{MovementReason, StockMovement},
            notifications::NotificationKind,
            offers::OfferKind,
        },
    };
    use rust_decimal_macros::dec;

    fn request(order_type: OrderType) -> PlaceOrderRequest {
        PlaceOrderRequest {
            customer_name: "Ana".into(),
            customer_phone: "+15550001111".into(),
            order_type,
            table_number: None,
            delivery_address: None,
            notes: None,
            promo_code: None,
            items: vec![CartItemRequest { menu_item_id: Uuid::new_v4(), quantity: 1, notes: None }],
        }
    }

    fn menu_item(name: &str, available: bool) -> MenuItem {
        MenuItem {
            id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            price: dec!(4.50),
            department: Department::Barista,
            image_url: None,
            is_available: available,
            sort_order: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn delivery_needs_an_address() {
        let mut req = request(OrderType::Delivery);
        let errors = validate_fulfillment(&req).unwrap_err();
        assert!(errors.field_errors().contains_key("deliveryAddress"));

        req.delivery_address = Some("   ".into());
        assert!(validate_fulfillment(&req).is_err());

        req.delivery_address = Some("12 Main St".into());
        assert!(validate_fulfillment(&req).is_ok());
    }

    #[test]
    fn dine_in_needs_a_table() {
        let mut req = request(OrderType::DineIn);
        let errors = validate_fulfillment(&req).unwrap_err();
        assert!(errors.field_errors().contains_key("tableNumber"));

        req.table_number = Some(4);
        assert!(validate_fulfillment(&req).is_ok());
        assert!(validate_fulfillment(&request(OrderType::Takeaway)).is_ok());
    }

    #[test]
    fn line_quantities_and_empty_carts_are_rejected() {
        let mut req = request(OrderType::Takeaway);
        req.items[0].quantity = 100;
        assert!(req.validate().is_err());

        req.items[0].quantity = 0;
        assert!(req.validate().is_err());

        req.items[0].quantity = 99;
        assert!(req.validate().is_ok());

        req.items.clear();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("items"));
    }

    #[test]
    fn unknown_and_unavailable_items_are_rejected() {
        let latte = menu_item("Latte", true);
        let mocha = menu_item("Mocha", false);
        let menu = vec![latte.clone(), mocha.clone()];

        let line = |id| CartItemRequest { menu_item_id: id, quantity: 2, notes: None };

        let ok = [line(latte.id)];
        let resolved = resolve_lines(&ok, &menu).unwrap();
        assert_eq!(resolved[0].1.name, "Latte");
        assert_eq!(cart_lines(&resolved)[0].unit_price, dec!(4.50));

        let unavailable = [line(latte.id), line(mocha.id)];
        assert!(matches!(
            resolve_lines(&unavailable, &menu),
            Err(AppError::MenuItemUnavailable(name)) if name == "Mocha"
        ));

        let unknown = [line(Uuid::new_v4())];
        assert!(matches!(resolve_lines(&unknown, &menu), Err(AppError::ResourceNotFound("menu item"))));
    }

    #[test]
    fn repeated_items_are_loaded_once() {
        let id = Uuid::new_v4();
        let lines = vec![
            CartItemRequest { menu_item_id: id, quantity: 1, notes: None },
            CartItemRequest { menu_item_id: id, quantity: 2, notes: Some("no sugar".into()) },
        ];
        assert_eq!(distinct_ids(&lines), vec![id]);
    }

    #[test]
    fn pages_are_clamped() {
        assert_eq!(page_bounds(None, None), (1, 20));
        assert_eq!(page_bounds(Some(0), Some(1000)), (1, MAX_PAGE_SIZE));
        assert_eq!(page_bounds(Some(3), Some(0)), (3, 1));
    }

    #[test]
    fn huge_page_numbers_do_not_overflow_the_offset() {
        let (page, per_page) = page_bounds(Some(i64::MAX), Some(i64::MAX));
        assert_eq!((page, per_page), (MAX_PAGE, MAX_PAGE_SIZE));
        assert_eq!(page_offset(page, per_page), (MAX_PAGE - 1) * MAX_PAGE_SIZE);
        assert_eq!(page_offset(1, 20), 0);
    }

    // --- Against a database ---

    struct Kitchen {
        state: AppState,
        burger: Uuid,
        water: Uuid,
        beef: Uuid,
        bun: Uuid,
    }

    fn dish(category_id: Uuid, name: &str, price: Decimal) -> MenuItemFields<'_> {
        MenuItemFields {
            category_id,
            name,
            description: None,
            price,
            department: Department::Kitchen,
            image_url: None,
            is_available: true,
            sort_order: 0,
        }
    }

    // A burger made of 0.15 kg of beef and one bun, plus water with no recipe.
    async fn kitchen(pool: PgPool, beef_stock: Decimal) -> Kitchen {
        let state = AppState::with_pool(AppConfig::for_tests(), pool).unwrap();

        let category = state.menu_service.create_category("Mains", None, None, 0, true).await.unwrap();
        let burger = state.menu_service.create_item(&dish(category.id, "Burger", dec!(8.00))).await.unwrap();
        let water = state.menu_service.create_item(&dish(category.id, "Water", dec!(1.50))).await.unwrap();

        let beef = state
            .inventory_service
            .create_material(
                &MaterialFields { name: "Beef", unit: "kg", min_stock: dec!(0.2), alert_stock: dec!(0.5), supplier: None },
                beef_stock,
                dec!(12.00),
            )
            .await
            .unwrap();
        let bun = state
            .inventory_service
            .create_material(
                &MaterialFields { name: "Bun", unit: "unit", min_stock: dec!(0), alert_stock: dec!(0), supplier: None },
                dec!(10),
                dec!(0.40),
            )
            .await
            .unwrap();

        state
            .menu_service
            .set_recipe(burger.id, &[(beef.id, dec!(0.15)), (bun.id, dec!(1))])
            .await
            .unwrap();

        Kitchen { state, burger: burger.id, water: water.id, beef: beef.id, bun: bun.id }
    }

    fn takeaway(lines: &[(Uuid, i32)]) -> PlaceOrderRequest {
        let mut req = request(OrderType::Takeaway);
        req.items = lines
            .iter()
            .map(|&(menu_item_id, quantity)| CartItemRequest { menu_item_id, quantity, notes: None })
            .collect();
        req
    }

    async fn stock(state: &AppState, material: Uuid) -> Decimal {
        state.inventory_service.get_material(material).await.unwrap().current_stock
    }

    async fn movements(state: &AppState, material: Uuid, reason: MovementReason) -> Vec<StockMovement> {
        state
            .inventory_service
            .movements(material, 100)
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.reason == reason)
            .collect()
    }

    #[sqlx::test]
    async fn checkout_takes_recipe_stock_and_cancel_puts_it_back_once(pool: PgPool) {
        let k = kitchen(pool, dec!(0.6)).await;
        let orders = &k.state.order_service;

        let placed = orders.place_order(&takeaway(&[(k.burger, 2)])).await.unwrap();
        let id = placed.order.id;
        assert!(placed.order.inventory_consumed);
        assert!(!placed.order.inventory_restored);
        assert_eq!(stock(&k.state, k.beef).await, dec!(0.3));
        assert_eq!(stock(&k.state, k.bun).await, dec!(8));

        for (material, taken) in [(k.beef, dec!(-0.3)), (k.bun, dec!(-2))] {
            let consumed = movements(&k.state, material, MovementReason::Consumption).await;
            assert_eq!(consumed.len(), 1);
            assert_eq!(consumed[0].quantity_changed, taken);
            assert_eq!(consumed[0].order_id, Some(id));
        }

        let cancelled = orders
            .update_status(id, OrderStatus::Cancelled, Some("customer left"))
            .await
            .unwrap();
        assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
        assert!(cancelled.order.inventory_restored);
        assert_eq!(stock(&k.state, k.beef).await, dec!(0.6));
        assert_eq!(stock(&k.state, k.bun).await, dec!(10));

        let again = orders.update_status(id, OrderStatus::Cancelled, None).await;
        assert!(matches!(again, Err(AppError::InvalidStatusTransition { .. })));
        assert_eq!(stock(&k.state, k.beef).await, dec!(0.6));
        assert_eq!(stock(&k.state, k.bun).await, dec!(10));

        for (material, returned) in [(k.beef, dec!(0.3)), (k.bun, dec!(2))] {
            let restored = movements(&k.state, material, MovementReason::Restoration).await;
            assert_eq!(restored.len(), 1);
            assert_eq!(restored[0].quantity_changed, returned);
            assert_eq!(restored[0].order_id, Some(id));
        }
    }

    #[sqlx::test]
    async fn stock_alerts_are_written_with_the_order(pool: PgPool) {
        let k = kitchen(pool, dec!(0.6)).await;
        let orders = &k.state.order_service;
        let feed = &k.state.notification_service;

        let placed = orders.place_order(&takeaway(&[(k.burger, 2)])).await.unwrap();
        let id = placed.order.id;

        let after_checkout = feed.list(false, 50).await.unwrap();
        assert!(after_checkout
            .iter()
            .any(|n| n.kind == NotificationKind::LowStock && n.material_id == Some(k.beef)));
        assert!(after_checkout
            .iter()
            .any(|n| n.kind == NotificationKind::NewOrder && n.order_id == Some(id)));
        assert!(!after_checkout.iter().any(|n| n.material_id == Some(k.bun)));

        orders.update_status(id, OrderStatus::Cancelled, None).await.unwrap();

        let after_cancel = feed.list(false, 50).await.unwrap();
        assert!(after_cancel
            .iter()
            .any(|n| n.kind == NotificationKind::Restocked && n.material_id == Some(k.beef)));
        assert!(after_cancel
            .iter()
            .any(|n| n.kind == NotificationKind::OrderCancelled && n.order_id == Some(id)));
    }

    #[sqlx::test]
    async fn short_stock_rejects_checkout_and_leaves_nothing_behind(pool: PgPool) {
        let k = kitchen(pool, dec!(0.2)).await;

        let result = k.state.order_service.place_order(&takeaway(&[(k.burger, 2)])).await;
        assert!(matches!(
            result,
            Err(AppError::InsufficientStock { material, .. }) if material == "Beef"
        ));

        assert_eq!(stock(&k.state, k.beef).await, dec!(0.2));
        assert_eq!(stock(&k.state, k.bun).await, dec!(10));
        assert!(movements(&k.state, k.beef, MovementReason::Consumption).await.is_empty());
        assert!(movements(&k.state, k.bun, MovementReason::Consumption).await.is_empty());

        let page = k
            .state
            .order_service
            .list_orders(&OrderFilter::default(), None, None)
            .await
            .unwrap();
        assert_eq!(page.total, 0);
        assert!(k.state.notification_service.list(false, 50).await.unwrap().is_empty());
    }

    #[sqlx::test]
    async fn orders_without_recipes_do_not_claim_stock(pool: PgPool) {
        let k = kitchen(pool, dec!(0.6)).await;
        let orders = &k.state.order_service;

        let placed = orders.place_order(&takeaway(&[(k.water, 3)])).await.unwrap();
        assert!(!placed.order.inventory_consumed);

        let cancelled = orders
            .update_status(placed.order.id, OrderStatus::Cancelled, None)
            .await
            .unwrap();
        assert!(!cancelled.order.inventory_restored);
        assert_eq!(stock(&k.state, k.beef).await, dec!(0.6));
        assert!(movements(&k.state, k.beef, MovementReason::Restoration).await.is_empty());
    }

    #[sqlx::test]
    async fn single_use_code_is_refused_on_the_second_checkout(pool: PgPool) {
        let k = kitchen(pool, dec!(0.6)).await;
        let offer = k
            .state
            .offer_service
            .create(&OfferFields {
                name: "Welcome",
                description: None,
                kind: OfferKind::Percentage,
                value: dec!(5),
                buy_quantity: None,
                get_quantity: None,
                target_item_id: None,
                category_id: None,
                min_order_amount: dec!(0),
                max_discount: None,
                code: Some("WELCOME5"),
                usage_limit: Some(1),
                starts_at: None,
                ends_at: None,
                is_active: true,
            })
            .await
            .unwrap();

        let mut req = takeaway(&[(k.burger, 1)]);
        req.promo_code = Some("WELCOME5".into());

        let first = k.state.order_service.place_order(&req).await.unwrap();
        assert_eq!(first.order.offer_id, Some(offer.id));
        assert_eq!(k.state.offer_service.get(offer.id).await.unwrap().usage_count, 1);

        let second = k.state.order_service.place_order(&req).await;
        assert!(matches!(second, Err(AppError::InvalidPromoCode(code)) if code == "WELCOME5"));
        assert_eq!(k.state.offer_service.get(offer.id).await.unwrap().usage_count, 1);
        assert_eq!(stock(&k.state, k.bun).await, dec!(9));
    }
}
