use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse demand label derived from the live multiplier.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DemandLevel {
    Low,
    Medium,
    High,
    Peak,
}

impl DemandLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DemandLevel::Low => "low",
            DemandLevel::Medium => "medium",
            DemandLevel::High => "high",
            DemandLevel::Peak => "peak",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Quote {
    pub price: u32,
    pub demand: DemandLevel,
}

/// Live-demand price adjustment. Fixed threshold table, not a model:
/// scarcity (sell-through), velocity (recent views), and a last-minute
/// surge when a nearly-sold-out event is a day away or less.
pub fn dynamic_price(
    base_price: u32,
    sold_percentage: u8,
    recent_views: u32,
    event_date: DateTime<Utc>,
) -> Quote {
    let mut multiplier = 1.0_f64;

    if sold_percentage > 90 {
        multiplier += 0.50;
    } else if sold_percentage > 75 {
        multiplier += 0.25;
    } else if sold_percentage > 50 {
        multiplier += 0.10;
    }

    if recent_views > 100 {
        multiplier += 0.30;
    } else if recent_views > 50 {
        multiplier += 0.15;
    }

    let days_until = (event_date - Utc::now()).num_days();
    if days_until <= 1 && sold_percentage > 80 {
        multiplier += 0.20;
    }

    let price = (f64::from(base_price) * multiplier).round() as u32;
    let demand = if multiplier > 1.5 {
        DemandLevel::Peak
    } else if multiplier > 1.25 {
        DemandLevel::High
    } else if multiplier > 1.1 {
        DemandLevel::Medium
    } else {
        DemandLevel::Low
    };

    Quote { price, demand }
}

/// Display-tier badge for the sales window. Separate feature from
/// `dynamic_price`; the two never combine into one authority.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PricingWindow {
    Early,
    Standard,
    Final,
}

impl PricingWindow {
    pub fn multiplier(&self) -> f64 {
        match self {
            PricingWindow::Early => 0.8,
            PricingWindow::Standard => 1.0,
            PricingWindow::Final => 1.2,
        }
    }
}

pub fn pricing_window(days_until: i64) -> PricingWindow {
    if days_until > 30 {
        PricingWindow::Early
    } else if days_until >= 7 {
        PricingWindow::Standard
    } else {
        PricingWindow::Final
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn hot_event_two_days_out_doubles() {
        let quote = dynamic_price(100, 95, 150, Utc::now() + Duration::hours(30));
        assert_eq!(quote.price, 200);
        assert_eq!(quote.demand, DemandLevel::Peak);
    }

    #[test]
    fn quiet_event_far_out_keeps_base_price() {
        let quote = dynamic_price(100, 40, 10, Utc::now() + Duration::days(60));
        assert_eq!(quote.price, 100);
        assert_eq!(quote.demand, DemandLevel::Low);
    }

    #[test]
    fn price_is_non_decreasing_in_sell_through() {
        let date = Utc::now() + Duration::days(14);
        let mut previous = 0;
        for sold in [10, 49, 50, 51, 75, 76, 90, 91, 100] {
            let quote = dynamic_price(80, sold, 60, date);
            assert!(
                quote.price >= previous,
                "price dropped at sold={sold}: {} < {previous}",
                quote.price
            );
            previous = quote.price;
        }
    }

    #[test]
    fn thresholds_are_strict_inequalities() {
        let date = Utc::now() + Duration::days(14);
        assert_eq!(dynamic_price(100, 50, 0, date).price, 100);
        assert_eq!(dynamic_price(100, 51, 0, date).price, 110);
        assert_eq!(dynamic_price(100, 75, 0, date).price, 110);
        assert_eq!(dynamic_price(100, 76, 0, date).price, 125);
        assert_eq!(dynamic_price(100, 90, 0, date).price, 125);
        assert_eq!(dynamic_price(100, 91, 0, date).price, 150);
    }

    #[test]
    fn surge_needs_both_urgency_and_sell_through() {
        let tonight = Utc::now() + Duration::hours(6);
        assert_eq!(dynamic_price(100, 85, 0, tonight).price, 145);
        assert_eq!(dynamic_price(100, 60, 0, tonight).price, 110);
        let next_month = Utc::now() + Duration::days(30);
        assert_eq!(dynamic_price(100, 85, 0, next_month).price, 125);
    }

    #[test]
    fn demand_label_boundaries() {
        let date = Utc::now() + Duration::days(14);
        assert_eq!(dynamic_price(100, 60, 0, date).demand, DemandLevel::Low);
        assert_eq!(dynamic_price(100, 60, 60, date).demand, DemandLevel::Medium);
        assert_eq!(dynamic_price(100, 80, 60, date).demand, DemandLevel::High);
        assert_eq!(dynamic_price(100, 95, 120, date).demand, DemandLevel::Peak);
    }

    #[test]
    fn pricing_window_tiers() {
        assert_eq!(pricing_window(45), PricingWindow::Early);
        assert_eq!(pricing_window(31), PricingWindow::Early);
        assert_eq!(pricing_window(30), PricingWindow::Standard);
        assert_eq!(pricing_window(7), PricingWindow::Standard);
        assert_eq!(pricing_window(6), PricingWindow::Final);
        assert_eq!(pricing_window(0), PricingWindow::Final);
        assert_eq!(pricing_window(45).multiplier(), 0.8);
        assert_eq!(pricing_window(6).multiplier(), 1.2);
    }
}
