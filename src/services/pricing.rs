use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

/// Shipping speed chosen at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShippingTier {
    #[default]
    Standard,
    Express,
    SameDay,
}

/// All amounts in whole rupees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub subtotal: i64,
    pub discount: i64,
    pub shipping: i64,
    pub tax: i64,
    pub total: i64,
}

#[derive(Debug, Clone)]
pub struct PricingConfig {
    tax_rate: Decimal,
    free_shipping_threshold: i64,
    standard_rate: i64,
    express_rate: i64,
    same_day_rate: i64,
}

impl From<&AppConfig> for PricingConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            // tax_rate is validated finite and in [0, 1) at config load
            tax_rate: Decimal::from_f64(cfg.tax_rate).unwrap_or_else(|| Decimal::new(18, 2)),
            free_shipping_threshold: cfg.free_shipping_threshold,
            standard_rate: cfg.shipping_standard_rate,
            express_rate: cfg.shipping_express_rate,
            same_day_rate: cfg.shipping_same_day_rate,
        }
    }
}

impl PricingConfig {
    pub fn new(
        tax_rate: Decimal,
        free_shipping_threshold: i64,
        standard_rate: i64,
        express_rate: i64,
        same_day_rate: i64,
    ) -> Self {
        Self {
            tax_rate,
            free_shipping_threshold,
            standard_rate,
            express_rate,
            same_day_rate,
        }
    }
}

/// Pure price composition. Discount amounts come from the coupon service;
/// this service only lays out shipping, tax and the final total.
#[derive(Debug, Clone)]
pub struct PricingService {
    config: PricingConfig,
}

impl PricingService {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    /// Shipping charge for the discounted subtotal. Only the standard tier
    /// qualifies for free shipping.
    pub fn shipping_for(&self, discounted_subtotal: i64, tier: ShippingTier) -> i64 {
        match tier {
            ShippingTier::Standard => {
                if discounted_subtotal >= self.config.free_shipping_threshold {
                    0
                } else {
                    self.config.standard_rate
                }
            }
            ShippingTier::Express => self.config.express_rate,
            ShippingTier::SameDay => self.config.same_day_rate,
        }
    }

    /// Tax on the discounted subtotal, rounded half-away-from-zero to whole
    /// rupees. Shipping is not taxed.
    pub fn tax_for(&self, discounted_subtotal: i64) -> i64 {
        let tax = Decimal::from(discounted_subtotal) * self.config.tax_rate;
        tax.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .unwrap_or(0)
    }

    /// Compose the full breakdown. `discount` is clamped to the subtotal so
    /// a generous coupon can never push the total negative.
    pub fn quote(&self, subtotal: i64, discount: i64, tier: ShippingTier) -> PriceBreakdown {
        let discount = discount.clamp(0, subtotal);
        let discounted = subtotal - discount;
        let shipping = self.shipping_for(discounted, tier);
        let tax = self.tax_for(discounted);
        PriceBreakdown {
            subtotal,
            discount,
            shipping,
            tax,
            total: discounted + shipping + tax,
        }
    }
}
