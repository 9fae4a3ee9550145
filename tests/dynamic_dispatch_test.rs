use orderflow::domain::money::Money;
use orderflow::domain::order::{Order, OrderItem};
use orderflow::domain::payment::{Payment, PaymentStatus};
use orderflow::domain::ports::{OrderStoreBox, PaymentStoreBox, ProductStoreBox, UnitOfWork};
use orderflow::domain::product::Product;
use orderflow::infrastructure::in_memory::InMemoryStore;
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_stores_as_trait_objects() {
    let store = InMemoryStore::new();
    let product_store: ProductStoreBox = Box::new(store.clone());
    let order_store: OrderStoreBox = Box::new(store.clone());
    let payment_store: PaymentStoreBox = Box::new(store);

    product_store
        .store(Product::new(1, "Lamp", Money::new(dec!(30.0)), 4))
        .await
        .unwrap();

    // Verify Send + Sync by spawning tasks
    let order_handle = tokio::spawn(async move {
        let order_id = order_store.next_id().await.unwrap();
        let item = OrderItem {
            order_id,
            product_id: 1,
            quantity: 1,
            price: Money::new(dec!(30.0)),
        };
        let order = Order::new(order_id, 8, &[item.clone()], chrono::Utc::now()).unwrap();
        order_store
            .commit(
                UnitOfWork::new()
                    .put_order_with_items(order, vec![item])
                    .unwrap()
                    .adjust_stock(1, -1),
            )
            .await
            .unwrap();
        order_store.get(order_id).await.unwrap().unwrap()
    });

    let payment_handle = tokio::spawn(async move {
        let payment = Payment {
            id: payment_store.next_id().await.unwrap(),
            order_id: 1,
            amount: Money::new(dec!(30.0)),
            refunded: Money::ZERO,
            currency: "USD".to_string(),
            status: PaymentStatus::Completed,
            payment_method: "card".to_string(),
            transaction_id: "mock_0_0_test".to_string(),
            created_at: chrono::Utc::now(),
        };
        payment_store.store(payment).await.unwrap();
        payment_store.for_order(1).await.unwrap().unwrap()
    });

    let order = order_handle.await.unwrap();
    assert_eq!(order.user_id, 8);
    assert_eq!(order.total(), Money::new(dec!(30)));

    let payment = payment_handle.await.unwrap();
    assert_eq!(payment.order_id, 1);

    let lamp = product_store.get(1).await.unwrap().unwrap();
    assert_eq!(lamp.stock, 3);
}
