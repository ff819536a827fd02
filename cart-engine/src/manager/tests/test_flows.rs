use super::*;

// ========================================================================
// End-to-end flows across operations
// ========================================================================

#[tokio::test]
async fn test_reservation_blocks_second_cart_until_release() {
    let t = create_test_manager();
    t.catalog.insert_product("limited", ProductRecord::new(500.0, 1));

    t.manager
        .add_item("user-a", AddItemInput::product("limited", 1))
        .await
        .unwrap();

    let err = t
        .manager
        .add_item("user-b", AddItemInput::product("limited", 1))
        .await
        .unwrap_err();
    let rejection = CartRejection::from(err);
    assert_eq!(rejection.code, RejectionCode::OutOfStock);
    assert_eq!(rejection.available, Some(0));

    // The unit frees up the moment the first cart lets go of it
    t.manager.remove_item("user-a", "limited", None).await.unwrap();
    t.manager
        .add_item("user-b", AddItemInput::product("limited", 1))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_paid_lock_and_refund_round_trip() {
    let t = create_test_manager();
    t.wallet.deposit("user-1", 1000.0);

    // 4h lock on a 1000.0 item: 10% fee
    let outcome = t
        .manager
        .lock_item_with_payment("user-1", "kettle", None, 1, 4)
        .await
        .unwrap();
    assert_eq!(outcome.cart.locked_items[0].lock_fee, Some(100.0));
    assert_eq!(t.wallet.balance("user-1"), 900.0);

    t.manager.unlock_item("user-1", "kettle", None).await.unwrap();
    assert_eq!(t.wallet.balance("user-1"), 1000.0);

    let transactions = t.wallet.transactions_for("user-1");
    assert_eq!(transactions.len(), 2);
    assert!(transactions[1].description.contains("refund"));
}

#[tokio::test]
async fn test_stale_totals_heal_on_read() {
    let t = create_test_manager();
    t.manager
        .add_item("user-1", AddItemInput::product("espresso", 2))
        .await
        .unwrap();

    // Simulate a historical row persisted with zeroed totals
    patch_cart(&t.storage, "user-1", |cart| {
        cart.totals = Default::default();
        cart.totals.subtotal = 200.0;
    });

    let outcome = t.manager.get_cart("user-1").await.unwrap();
    assert_eq!(outcome.cart.totals.total, 260.0);
    assert_eq!(outcome.cart.totals.tax, 10.0);
}

#[tokio::test]
async fn test_expired_paid_lock_purges_and_allows_relock() {
    let t = create_test_manager();
    t.wallet.deposit("user-1", 200.0);

    t.manager
        .lock_item_with_payment("user-1", "kettle", None, 1, 2)
        .await
        .unwrap();
    assert_eq!(t.wallet.balance("user-1"), 150.0);

    // The lock window lapses; the fee is spent, not refundable
    patch_cart(&t.storage, "user-1", |cart| {
        cart.locked_items[0].expires_at = now_millis() - 1;
    });

    let err = t
        .manager
        .unlock_item("user-1", "kettle", None)
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::LockNotFound(_)));
    assert_eq!(t.wallet.balance("user-1"), 150.0);

    // A fresh paid lock goes through, charging a fresh fee
    let outcome = t
        .manager
        .lock_item_with_payment("user-1", "kettle", None, 1, 2)
        .await
        .unwrap();
    assert_eq!(outcome.cart.locked_items.len(), 1);
    assert_eq!(
        outcome.cart.locked_items[0].lock_payment_status,
        shared::cart::LockPaymentStatus::Paid
    );
    assert_eq!(t.wallet.balance("user-1"), 100.0);
}

#[tokio::test]
async fn test_totals_are_deterministic_across_reads() {
    let t = create_test_manager();
    t.coupons.insert(
        "FLAT",
        CouponRule {
            discount_type: DiscountType::Fixed,
            amount: 10.0,
            min_subtotal: None,
        },
    );
    t.manager
        .add_item("user-1", AddItemInput::product("espresso", 3))
        .await
        .unwrap();
    t.manager
        .add_item("user-1", AddItemInput::product("sticker", 2))
        .await
        .unwrap();
    t.manager.apply_coupon("user-1", "FLAT").await.unwrap();

    let first = t.manager.get_cart("user-1").await.unwrap().cart.totals;
    for _ in 0..3 {
        let again = t.manager.get_cart("user-1").await.unwrap().cart.totals;
        assert_eq!(again, first);
    }
}

// ========================================================================
// Sweep worker
// ========================================================================

#[tokio::test]
async fn test_sweep_reclaims_carts_locks_and_orphans() {
    let t = create_test_manager();

    // An expired cart still holding a reservation
    t.manager
        .add_item("user-a", AddItemInput::product("espresso", 10))
        .await
        .unwrap();
    patch_cart(&t.storage, "user-a", |cart| {
        cart.expires_at = now_millis() - 1;
    });

    // A live cart with one lapsed lock
    t.manager
        .lock_item("user-b", "kettle", None, 1, None)
        .await
        .unwrap();
    patch_cart(&t.storage, "user-b", |cart| {
        cart.locked_items[0].expires_at = now_millis() - 1;
        // Keep the cart itself alive
        cart.expires_at = now_millis() + DAY_MS;
    });

    // A ledger entry whose cart no longer exists
    {
        let reservations = crate::reservation::ReservationService::new(t.storage.clone());
        let txn = t.storage.begin_write().unwrap();
        reservations.reserve_txn(&txn, "ghost", "espresso", None, 1).unwrap();
        txn.commit().unwrap();
    }

    let worker = t.manager.sweep_worker(CancellationToken::new());
    let stats = worker.sweep_once().unwrap();
    assert_eq!(stats.carts_cleared, 1);
    assert_eq!(stats.locks_purged, 1);
    assert_eq!(stats.reservations_dropped, 1);

    // The swept reservation is actually free again
    t.manager
        .add_item("user-b", AddItemInput::product("espresso", 9))
        .await
        .unwrap();
}
