//! Cart pricing: subtotal, flat delivery fee and promo discounts.
//!
//! All amounts are whole currency units. Totals are not clamped: a flat
//! discount larger than the order produces a negative total.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::value_objects::{round_half_up, PromoCode};
use crate::{CartItem, Result, ShopError};

/// Flat delivery charge applied to any non-empty order.
pub const DELIVERY_FEE: i64 = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "discount", rename_all = "lowercase")]
pub enum DiscountRule {
    /// Percent of the subtotal, rounded half up.
    Percentage(u32),
    Fixed(i64),
}

impl DiscountRule {
    pub fn amount_for(&self, subtotal: i64) -> i64 {
        match *self {
            Self::Percentage(percent) => round_half_up(Decimal::from(subtotal) * Decimal::from(percent) / Decimal::ONE_HUNDRED),
            Self::Fixed(amount) => amount,
        }
    }
}

/// Fixed lookup table of promo codes.
#[derive(Clone, Debug)]
pub struct PromoTable {
    rules: HashMap<String, DiscountRule>,
}

impl Default for PromoTable {
    fn default() -> Self {
        Self::empty()
            .with_rule("SAVE10", DiscountRule::Percentage(10))
            .with_rule("SAVE500", DiscountRule::Fixed(500))
            .with_rule("WELCOME20", DiscountRule::Percentage(20))
            .with_rule("FIRSTORDER", DiscountRule::Fixed(1000))
    }
}

impl PromoTable {
    pub fn empty() -> Self { Self { rules: HashMap::new() } }

    pub fn with_rule(mut self, code: &str, rule: DiscountRule) -> Self {
        self.rules.insert(code.trim().to_uppercase(), rule);
        self
    }

    pub fn lookup(&self, code: &PromoCode) -> Option<DiscountRule> { self.rules.get(code.as_str()).copied() }
}

/// Saturates instead of overflowing on absurd stored prices.
pub fn subtotal(items: &[CartItem]) -> i64 {
    items.iter().fold(0i64, |sum, item| sum.saturating_add(item.price.saturating_mul(i64::from(item.quantity))))
}

/// Fee charged for a given subtotal: the flat fee when anything is in the cart.
pub fn delivery_fee_for(subtotal: i64, flat_fee: i64) -> i64 {
    if subtotal > 0 { flat_fee } else { 0 }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub subtotal: i64,
    pub delivery_fee: i64,
    pub discount: i64,
    pub total: i64,
}

impl CartTotals {
    pub fn compute(items: &[CartItem], discount: i64, flat_fee: i64) -> Self {
        let subtotal = subtotal(items);
        let delivery_fee = delivery_fee_for(subtotal, flat_fee);
        Self { subtotal, delivery_fee, discount, total: subtotal.saturating_add(delivery_fee).saturating_sub(discount) }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedPromo {
    pub code: PromoCode,
    pub discount: i64,
}

/// Promo state for one shopping session. Applying a code replaces whatever
/// was applied before; discounts never stack.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PromoState {
    applied: Option<AppliedPromo>,
}

impl PromoState {
    pub fn applied(&self) -> Option<&AppliedPromo> { self.applied.as_ref() }
    pub fn discount(&self) -> i64 { self.applied.as_ref().map_or(0, |p| p.discount) }
    pub fn reset(&mut self) { self.applied = None; }

    /// Validates `input` against `table` and stores the discount it yields for
    /// the current cart. Rejected codes leave the state untouched.
    pub fn apply(&mut self, input: &str, items: &[CartItem], table: &PromoTable) -> Result<&AppliedPromo> {
        let code = PromoCode::new(input)?;
        if items.is_empty() { return Err(ShopError::EmptyCart); }
        let rule = table.lookup(&code).ok_or(ShopError::InvalidPromoCode)?;
        let discount = rule.amount_for(subtotal(items));
        Ok(&*self.applied.insert(AppliedPromo { code, discount }))
    }

    pub fn totals(&self, items: &[CartItem], flat_fee: i64) -> CartTotals {
        CartTotals::compute(items, self.discount(), flat_fee)
    }
}
