use mockall::mock;
use order_engine::{db_types::Order, OrderStore, OrderStoreError};

mock! {
    pub Store {}
    impl Clone for Store {
        fn clone(&self) -> Self;
    }
    impl OrderStore for Store {
        async fn upsert_order(&self, order: &Order) -> Result<(), OrderStoreError>;
        async fn fetch_order(&self, order_uid: &str) -> Result<Option<Order>, OrderStoreError>;
        async fn fetch_all_order_uids(&self) -> Result<Vec<String>, OrderStoreError>;
    }
}
