use chrono::{DateTime, Utc};
use rand::Rng;

// ============================================================================
// Order Number Generator
// ============================================================================
//
// Human-facing numbers look like `ORD-482913-057`: a prefix, the last six
// digits of the creation time in milliseconds and a three digit random
// suffix. Uniqueness per tenant is enforced by the store.
//
// ============================================================================

const TIMESTAMP_DIGITS: i64 = 1_000_000;

#[derive(Debug, Clone)]
pub struct OrderNumberGenerator {
    prefix: String,
}

impl OrderNumberGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    pub fn generate(&self, now: DateTime<Utc>) -> String {
        let suffix: u16 = rand::thread_rng().gen_range(0..1000);
        self.format(now, suffix)
    }

    fn format(&self, now: DateTime<Utc>, suffix: u16) -> String {
        let stamp = now.timestamp_millis().rem_euclid(TIMESTAMP_DIGITS);
        format!("{}-{:06}-{:03}", self.prefix, stamp, suffix)
    }
}

impl Default for OrderNumberGenerator {
    fn default() -> Self {
        Self::new("ORD")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_uses_timestamp_tail_and_suffix() {
        let generator = OrderNumberGenerator::new("LDY");
        let now = Utc.timestamp_millis_opt(1_700_000_012_345).unwrap();
        assert_eq!(generator.format(now, 7), "LDY-012345-007");
    }

    #[test]
    fn test_generated_number_shape() {
        let number = OrderNumberGenerator::default().generate(Utc::now());
        let parts: Vec<&str> = number.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1].len(), 6);
        assert_eq!(parts[2].len(), 3);
        assert!(parts[1].chars().chain(parts[2].chars()).all(|c| c.is_ascii_digit()));
    }
}
