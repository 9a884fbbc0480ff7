use diesel::prelude::*;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::CouponLedger;
use crate::schema::coupons;

#[derive(Clone)]
pub struct DieselCouponLedger {
    pool: DbPool,
}

impl DieselCouponLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CouponLedger for DieselCouponLedger {
    fn increment_usage(&self, code: &str) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(coupons::table.filter(coupons::code.eq(code)))
            .set(coupons::used_count.eq(coupons::used_count + 1))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(DomainError::InvalidInput(format!(
                "unknown coupon code '{}'",
                code
            )));
        }
        log::debug!("Coupon {} usage incremented", code);
        Ok(())
    }
}
