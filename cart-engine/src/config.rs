use shared::util::{DAY_MS, HOUR_MS};

/// Engine configuration
///
/// # Environment Variables
///
/// Every knob can be overridden through the environment:
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | CART_DATA_DIR | /var/lib/cart-engine | Data directory for the redb store |
/// | CART_TAX_RATE | 0.05 | Tax rate applied to the subtotal |
/// | CART_DELIVERY_FEE | 50.0 | Flat delivery fee below the threshold |
/// | CART_FREE_DELIVERY_THRESHOLD | 500.0 | Subtotal at which delivery is free |
/// | CART_CASHBACK_RATE | 0.02 | Informational cashback rate |
/// | CART_LOW_STOCK_THRESHOLD | 5 | Available units at or below which validation warns |
/// | CART_FREE_LOCK_HOURS | 24 | Default duration of an unpaid price lock |
/// | CART_TTL_HOURS | 24 | Cart TTL from creation |
/// | CART_LOCKED_TTL_DAYS | 30 | Cart TTL once any item is locked |
/// | CART_SWEEP_INTERVAL_SECS | 900 | Advisory cleanup sweep interval |
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory holding the redb database file
    pub data_dir: String,
    /// Tax rate on the subtotal (0.05 = 5%)
    pub tax_rate: f64,
    /// Flat per-order delivery fee charged below the free threshold
    pub delivery_fee: f64,
    /// Subtotal at or above which delivery is free
    pub free_delivery_threshold: f64,
    /// Informational cashback rate, never subtracted from the total
    pub cashback_rate: f64,
    /// Available units at or below which checkout validation warns
    pub low_stock_threshold: u32,
    /// Default duration for unpaid price locks (hours)
    pub free_lock_hours: u32,
    /// Cart TTL from creation (milliseconds)
    pub cart_ttl_ms: i64,
    /// Cart TTL once any item is locked (milliseconds)
    pub locked_cart_ttl_ms: i64,
    /// Advisory sweep interval (seconds)
    pub sweep_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: "/var/lib/cart-engine".to_string(),
            tax_rate: 0.05,
            delivery_fee: 50.0,
            free_delivery_threshold: 500.0,
            cashback_rate: 0.02,
            low_stock_threshold: 5,
            free_lock_hours: 24,
            cart_ttl_ms: 24 * HOUR_MS,
            locked_cart_ttl_ms: 30 * DAY_MS,
            sweep_interval_secs: 900,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_dir: std::env::var("CART_DATA_DIR").unwrap_or(defaults.data_dir),
            tax_rate: env_parse("CART_TAX_RATE", defaults.tax_rate),
            delivery_fee: env_parse("CART_DELIVERY_FEE", defaults.delivery_fee),
            free_delivery_threshold: env_parse(
                "CART_FREE_DELIVERY_THRESHOLD",
                defaults.free_delivery_threshold,
            ),
            cashback_rate: env_parse("CART_CASHBACK_RATE", defaults.cashback_rate),
            low_stock_threshold: env_parse("CART_LOW_STOCK_THRESHOLD", defaults.low_stock_threshold),
            free_lock_hours: env_parse("CART_FREE_LOCK_HOURS", defaults.free_lock_hours),
            cart_ttl_ms: env_parse("CART_TTL_HOURS", 24i64) * HOUR_MS,
            locked_cart_ttl_ms: env_parse("CART_LOCKED_TTL_DAYS", 30i64) * DAY_MS,
            sweep_interval_secs: env_parse("CART_SWEEP_INTERVAL_SECS", defaults.sweep_interval_secs),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
