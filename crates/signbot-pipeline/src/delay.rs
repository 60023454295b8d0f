//! Startup jitter so runs don't hit the upstream at the same second every day.

use rand::Rng;
use std::time::Duration;

/// Uniformly random delay in `[0, max_seconds * 1000)` milliseconds.
pub fn compute_delay(max_seconds: u64) -> Duration {
    compute_delay_with(&mut rand::thread_rng(), max_seconds)
}

/// [`compute_delay`] with a caller-supplied RNG.
pub fn compute_delay_with<R: Rng + ?Sized>(rng: &mut R, max_seconds: u64) -> Duration {
    let max_ms = max_seconds.saturating_mul(1000);
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rng.gen_range(0..max_ms))
}

/// Sleep for a random delay of up to `max_seconds`.
pub async fn jitter(max_seconds: u64) {
    let delay = compute_delay(max_seconds);
    if delay.is_zero() {
        return;
    }
    tracing::info!("⏳ Waiting {:.1}s before check-in", delay.as_secs_f64());
    tokio::time::sleep(delay).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_zero_max_is_zero_delay() {
        assert_eq!(compute_delay(0), Duration::ZERO);
    }

    #[test]
    fn test_delay_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let d = compute_delay_with(&mut rng, 3);
            assert!(d < Duration::from_secs(3));
        }
    }

    #[test]
    fn test_delay_spreads_over_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let samples: Vec<_> = (0..500).map(|_| compute_delay_with(&mut rng, 10)).collect();
        assert!(samples.iter().any(|d| *d < Duration::from_secs(2)));
        assert!(samples.iter().any(|d| *d > Duration::from_secs(8)));
    }

    #[tokio::test]
    async fn test_jitter_zero_returns_immediately() {
        let start = std::time::Instant::now();
        jitter(0).await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
