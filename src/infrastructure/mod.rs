pub mod coupon_ledger;
pub mod models;
pub mod notifier;
pub mod order_repo;
pub mod paymongo;
