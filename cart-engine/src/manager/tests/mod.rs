use super::*;

use crate::catalog::{EventStatus, InMemoryCatalog, ProductRecord};
use crate::coupon::{CouponRule, InMemoryCoupons};
use crate::wallet::InMemoryWallet;
use shared::cart::{
    CartRejection, DiscountType, ItemIssueKind, RejectionCode, ServiceBooking, TimeSlot,
};
use shared::util::DAY_MS;

struct TestContext {
    manager: CartManager,
    storage: CartStorage,
    catalog: Arc<InMemoryCatalog>,
    wallet: Arc<InMemoryWallet>,
    coupons: Arc<InMemoryCoupons>,
}

fn create_test_manager() -> TestContext {
    create_test_manager_with(EngineConfig::default())
}

fn create_test_manager_with(config: EngineConfig) -> TestContext {
    let storage = CartStorage::open_in_memory().unwrap();
    let catalog = Arc::new(InMemoryCatalog::new());
    let wallet = Arc::new(InMemoryWallet::new());
    let coupons = Arc::new(InMemoryCoupons::new());

    // Fixture products shared by most tests
    catalog.insert_product("espresso", ProductRecord::new(100.0, 10));
    catalog.insert_product("kettle", ProductRecord::new(1000.0, 5));
    let mut sticker = ProductRecord::new(10.0, 0);
    sticker.unlimited = true;
    catalog.insert_product("sticker", sticker);

    let manager = CartManager::with_storage(
        storage.clone(),
        config,
        catalog.clone(),
        wallet.clone(),
        coupons.clone(),
    );
    TestContext {
        manager,
        storage,
        catalog,
        wallet,
        coupons,
    }
}

fn future_booking(start: &str) -> ServiceBooking {
    ServiceBooking {
        booking_date: now_millis() + DAY_MS,
        time_slot: TimeSlot {
            start: start.to_string(),
            end: None,
        },
        duration_minutes: Some(60),
    }
}

/// Rewrite the stored cart outside the manager, simulating time passing or
/// corrupted rows
fn patch_cart(storage: &CartStorage, user_ref: &str, f: impl FnOnce(&mut Cart)) {
    let mut cart = storage.get_cart(user_ref).unwrap().unwrap();
    f(&mut cart);
    let txn = storage.begin_write().unwrap();
    storage.store_cart(&txn, &cart).unwrap();
    txn.commit().unwrap();
}

// ========================================================================
// Core cart operations
// ========================================================================

#[tokio::test]
async fn test_get_cart_creates_empty_active_cart() {
    let t = create_test_manager();

    let outcome = t.manager.get_cart("user-1").await.unwrap();
    assert_eq!(outcome.cart.user_ref, "user-1");
    assert!(outcome.cart.items.is_empty());
    assert!(outcome.cart.is_active);
    assert_eq!(outcome.cart.totals.total, 0.0);
    assert!(outcome.warnings.is_empty());
}

#[tokio::test]
async fn test_cart_summary_reflects_items_and_coupon() {
    let t = create_test_manager();

    // No cart yet: the empty summary, not an error
    let summary = t.manager.get_cart_summary("user-1").await.unwrap();
    assert_eq!(summary, CartSummary::default());

    let mut mug = ProductRecord::new(50.0, 10);
    mug.store_ref = Some("store-a".to_string());
    t.catalog.insert_product("mug", mug);
    t.coupons.insert(
        "TEN",
        CouponRule {
            discount_type: DiscountType::Percentage,
            amount: 10.0,
            min_subtotal: None,
        },
    );

    t.manager
        .add_item("user-1", AddItemInput::product("espresso", 2))
        .await
        .unwrap();
    t.manager
        .add_item("user-1", AddItemInput::product("mug", 3))
        .await
        .unwrap();
    t.manager.apply_coupon("user-1", "TEN").await.unwrap();

    let summary = t.manager.get_cart_summary("user-1").await.unwrap();
    assert_eq!(summary.item_count, 5);
    assert!(summary.has_items);
    // Only the mug fixture carries a store reference
    assert_eq!(summary.store_count, 1);
    // subtotal 350, tax 17.5, delivery 50, 10% coupon discount 35
    assert_eq!(summary.totals.subtotal, 350.0);
    assert_eq!(summary.totals.total, 382.5);
    assert_eq!(summary.coupon.as_ref().unwrap().code, "TEN");
    assert_eq!(summary.coupon.as_ref().unwrap().applied_amount, 35.0);
}

#[tokio::test]
async fn test_add_item_computes_totals() {
    let t = create_test_manager();

    let outcome = t
        .manager
        .add_item("user-1", AddItemInput::product("espresso", 2))
        .await
        .unwrap();

    let totals = &outcome.cart.totals;
    assert_eq!(totals.subtotal, 200.0);
    assert_eq!(totals.tax, 10.0);
    assert_eq!(totals.delivery, 50.0);
    assert_eq!(totals.total, 260.0);
    // Cashback is informational and never reduces the total
    assert_eq!(totals.cashback, 4.0);
}

#[tokio::test]
async fn test_free_delivery_at_threshold() {
    let t = create_test_manager();

    let outcome = t
        .manager
        .add_item("user-1", AddItemInput::product("kettle", 1))
        .await
        .unwrap();

    let totals = &outcome.cart.totals;
    assert_eq!(totals.subtotal, 1000.0);
    assert_eq!(totals.delivery, 0.0);
    assert_eq!(totals.total, 1050.0);
}

#[tokio::test]
async fn test_add_unknown_product_maps_to_rejection() {
    let t = create_test_manager();

    let err = t
        .manager
        .add_item("user-1", AddItemInput::product("ghost", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::ProductNotFound(_)));

    let rejection = CartRejection::from(err);
    assert_eq!(rejection.code, RejectionCode::ProductNotFound);
}

#[tokio::test]
async fn test_unlimited_product_skips_stock_check() {
    let t = create_test_manager();

    let outcome = t
        .manager
        .add_item("user-1", AddItemInput::product("sticker", 500))
        .await
        .unwrap();
    assert_eq!(outcome.cart.items[0].quantity, 500);
}

#[tokio::test]
async fn test_update_quantity_and_zero_removes() {
    let t = create_test_manager();
    t.manager
        .add_item("user-1", AddItemInput::product("espresso", 2))
        .await
        .unwrap();

    let outcome = t
        .manager
        .update_quantity("user-1", "espresso", None, 5)
        .await
        .unwrap();
    assert_eq!(outcome.cart.items[0].quantity, 5);

    let outcome = t
        .manager
        .update_quantity("user-1", "espresso", None, 0)
        .await
        .unwrap();
    assert!(outcome.cart.items.is_empty());
    assert_eq!(outcome.cart.totals.total, 0.0);

    let err = t
        .manager
        .remove_item("user-1", "espresso", None)
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::ItemNotFound(_)));
}

#[tokio::test]
async fn test_update_quantity_excludes_own_reservation() {
    let t = create_test_manager();
    t.manager
        .add_item("user-1", AddItemInput::product("espresso", 10))
        .await
        .unwrap();

    // The full stock is held by this cart; raising within it is fine
    let outcome = t
        .manager
        .update_quantity("user-1", "espresso", None, 10)
        .await
        .unwrap();
    assert_eq!(outcome.cart.items[0].quantity, 10);

    let err = t
        .manager
        .update_quantity("user-1", "espresso", None, 11)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CartError::InsufficientStock { available: 10, .. }
    ));
}

#[tokio::test]
async fn test_clear_cart_releases_reservations() {
    let t = create_test_manager();
    t.manager
        .add_item("user-a", AddItemInput::product("espresso", 8))
        .await
        .unwrap();

    let err = t
        .manager
        .add_item("user-b", AddItemInput::product("espresso", 5))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CartError::InsufficientStock { available: 2, .. }
    ));

    let outcome = t.manager.clear_cart("user-a").await.unwrap();
    assert!(outcome.cart.items.is_empty());

    t.manager
        .add_item("user-b", AddItemInput::product("espresso", 5))
        .await
        .unwrap();
}

// ========================================================================
// Coupons
// ========================================================================

#[tokio::test]
async fn test_apply_and_remove_coupon() {
    let t = create_test_manager();
    t.coupons.insert(
        "TEN",
        CouponRule {
            discount_type: DiscountType::Percentage,
            amount: 10.0,
            min_subtotal: None,
        },
    );
    t.manager
        .add_item("user-1", AddItemInput::product("espresso", 2))
        .await
        .unwrap();

    let outcome = t.manager.apply_coupon("user-1", "TEN").await.unwrap();
    let coupon = outcome.cart.coupon.as_ref().unwrap();
    assert_eq!(coupon.code, "TEN");
    assert_eq!(coupon.applied_amount, 20.0);
    assert_eq!(outcome.cart.totals.discount, 20.0);
    assert_eq!(outcome.cart.totals.total, 240.0);
    assert_eq!(outcome.cart.totals.savings, 20.0);

    let outcome = t.manager.remove_coupon("user-1").await.unwrap();
    assert!(outcome.cart.coupon.is_none());
    assert_eq!(outcome.cart.totals.discount, 0.0);
    assert_eq!(outcome.cart.totals.total, 260.0);
}

#[tokio::test]
async fn test_apply_coupon_to_empty_cart_rejected() {
    let t = create_test_manager();

    let err = t.manager.apply_coupon("user-1", "TEN").await.unwrap_err();
    assert!(matches!(err, CartError::EmptyCart));
}

#[tokio::test]
async fn test_rejected_coupon_surfaces_validator_reason() {
    let t = create_test_manager();
    t.manager
        .add_item("user-1", AddItemInput::product("espresso", 1))
        .await
        .unwrap();

    let err = t.manager.apply_coupon("user-1", "NOPE").await.unwrap_err();
    match err {
        CartError::CouponRejected(reason) => assert!(reason.contains("NOPE")),
        other => panic!("Unexpected error: {other}"),
    }

    let cart = t.manager.get_cart("user-1").await.unwrap().cart;
    assert!(cart.coupon.is_none());
}

#[tokio::test]
async fn test_markdown_counts_toward_savings() {
    let t = create_test_manager();
    let mut sale = ProductRecord::new(80.0, 10);
    sale.original_price = 100.0;
    t.catalog.insert_product("sale-mug", sale);

    let outcome = t
        .manager
        .add_item("user-1", AddItemInput::product("sale-mug", 2))
        .await
        .unwrap();
    assert_eq!(outcome.cart.totals.subtotal, 160.0);
    assert_eq!(outcome.cart.totals.savings, 40.0);
}

// ========================================================================
// Service bookings and event tickets
// ========================================================================

#[tokio::test]
async fn test_service_bookings_unique_per_slot() {
    let t = create_test_manager();
    t.catalog.insert_product("massage", ProductRecord::new(80.0, 0));

    let booking = future_booking("14:00");
    let input = AddItemInput {
        product_ref: "massage".to_string(),
        variant: None,
        quantity: 1,
        booking: Some(booking.clone()),
        event_ref: None,
    };
    t.manager.add_item("user-1", input.clone()).await.unwrap();

    let err = t.manager.add_item("user-1", input).await.unwrap_err();
    assert!(matches!(err, CartError::DuplicateBooking));

    // A different slot on the same day is a separate appointment
    let later = AddItemInput {
        product_ref: "massage".to_string(),
        variant: None,
        quantity: 1,
        booking: Some(future_booking("15:00")),
        event_ref: None,
    };
    let outcome = t.manager.add_item("user-1", later).await.unwrap();
    assert_eq!(outcome.cart.items.len(), 2);
}

#[tokio::test]
async fn test_event_ticket_requires_published_event() {
    let t = create_test_manager();
    t.catalog.insert_product("concert", ProductRecord::new(40.0, 0));
    t.catalog.insert_event("evt-draft", EventStatus::Draft);
    t.catalog.insert_event("evt-live", EventStatus::Published);

    let draft = AddItemInput {
        product_ref: "concert".to_string(),
        variant: None,
        quantity: 2,
        booking: None,
        event_ref: Some("evt-draft".to_string()),
    };
    let err = t.manager.add_item("user-1", draft).await.unwrap_err();
    assert!(matches!(err, CartError::EventNotPublished(_)));

    let live = AddItemInput {
        product_ref: "concert".to_string(),
        variant: None,
        quantity: 2,
        booking: None,
        event_ref: Some("evt-live".to_string()),
    };
    let outcome = t.manager.add_item("user-1", live).await.unwrap();
    assert_eq!(outcome.cart.items.len(), 1);
    assert_eq!(outcome.cart.totals.subtotal, 80.0);
}

// ========================================================================
// Validation
// ========================================================================

#[tokio::test]
async fn test_validate_cart_reports_stock_drift() {
    let t = create_test_manager();
    t.manager
        .add_item("user-1", AddItemInput::product("espresso", 2))
        .await
        .unwrap();

    // Stock collapsed after the add
    t.catalog.set_stock("espresso", 1);
    let report = t.manager.validate_cart("user-1").await.unwrap();
    assert!(!report.is_valid);
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].issue, ItemIssueKind::InsufficientStock);
    assert_eq!(report.issues[0].available, Some(1));

    // Product disappeared entirely
    t.catalog.remove_product("espresso");
    let report = t.manager.validate_cart("user-1").await.unwrap();
    assert_eq!(report.issues[0].issue, ItemIssueKind::Missing);
}

#[tokio::test]
async fn test_validate_cart_low_stock_is_warning_only() {
    let t = create_test_manager();
    t.manager
        .add_item("user-1", AddItemInput::product("espresso", 2))
        .await
        .unwrap();

    t.catalog.set_stock("espresso", 4);
    let report = t.manager.validate_cart("user-1").await.unwrap();
    assert!(report.is_valid);
    assert!(report.issues.is_empty());
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].issue, ItemIssueKind::LowStock);
}

#[tokio::test]
async fn test_validate_missing_cart_rejected() {
    let t = create_test_manager();
    let err = t.manager.validate_cart("nobody").await.unwrap_err();
    assert!(matches!(err, CartError::EmptyCart));
}

// ========================================================================
// Cart TTL
// ========================================================================

#[tokio::test]
async fn test_expired_cart_clears_and_releases_on_access() {
    let t = create_test_manager();
    t.manager
        .add_item("user-a", AddItemInput::product("espresso", 10))
        .await
        .unwrap();

    patch_cart(&t.storage, "user-a", |cart| {
        cart.expires_at = now_millis() - 1;
    });

    // The read heals: contents gone, TTL restarted
    let outcome = t.manager.get_cart("user-a").await.unwrap();
    assert!(outcome.cart.items.is_empty());
    assert!(outcome.cart.expires_at > now_millis());

    // And the reservation went with it
    t.manager
        .add_item("user-b", AddItemInput::product("espresso", 10))
        .await
        .unwrap();
}

mod test_flows;
