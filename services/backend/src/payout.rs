//! Payout math
//!
//! Money is computed in integers: the house edge is in parts-per-million,
//! Mines odds are ratios of binomial coefficients and Crash multipliers are
//! hundredths. Every payout is floored to the minor unit. The `f64`
//! multipliers are for display and audit only.

use shared::{CrashMultiplier, HouseEdge, EDGE_SCALE, TILE_COUNT};

/// Coinflip win multiplier: `2 * (1 - edge)`
pub fn coinflip_multiplier(edge: HouseEdge) -> f64 {
    2.0 * (1.0 - edge.as_fraction())
}

/// Coinflip win payout: `floor(bet * 2 * (1 - edge))`
pub fn coinflip_payout(bet: i64, edge: HouseEdge) -> i64 {
    let bet = bet.max(0) as u128;
    to_minor_units(bet * 2 * u128::from(edge.retained_ppm()) / u128::from(EDGE_SCALE))
}

/// `C(n, k)`, exact for every board this service deals
pub fn binomial(n: u32, k: u32) -> u128 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    (0..k).fold(1u128, |acc, i| acc * u128::from(n - i) / u128::from(i + 1))
}

/// Probability of surviving `safe_reveals` picks with `mines` mines on the board
///
/// `p(k) = prod_{i<k} (T - M - i) / (T - i)`
pub fn mines_survival_probability(mines: u8, safe_reveals: u32) -> f64 {
    let total = u32::from(TILE_COUNT);
    let safe = total.saturating_sub(u32::from(mines));
    (0..safe_reveals).fold(1.0, |p, i| {
        p * f64::from(safe.saturating_sub(i)) / f64::from(total - i)
    })
}

/// Display multiplier after `safe_reveals` safe tiles: `max(1, (1 - edge) / p(k))`
pub fn mines_multiplier(edge: HouseEdge, mines: u8, safe_reveals: u32) -> f64 {
    if safe_reveals == 0 {
        return 1.0;
    }
    let survival = mines_survival_probability(mines, safe_reveals);
    if survival <= 0.0 {
        return 1.0;
    }
    ((1.0 - edge.as_fraction()) / survival).max(1.0)
}

/// Mines cashout payout
///
/// `1 / p(k) = C(T, k) / C(T - M, k)`, so the payout is
/// `max(bet, floor(bet * (1 - edge) * C(T, k) / C(T - M, k)))`.
pub fn mines_payout(bet: i64, edge: HouseEdge, mines: u8, safe_reveals: u32) -> i64 {
    if bet <= 0 {
        return 0;
    }
    if safe_reveals == 0 {
        return bet;
    }
    let total = u32::from(TILE_COUNT);
    let safe = total.saturating_sub(u32::from(mines));
    let picks = safe_reveals.min(safe);

    let numerator = bet as u128 * u128::from(edge.retained_ppm()) * binomial(total, picks);
    let denominator = u128::from(EDGE_SCALE) * binomial(safe, picks);
    if denominator == 0 {
        return bet;
    }
    to_minor_units(numerator / denominator).max(bet)
}

/// Crash cashout payout: `floor(bet * multiplier)`
pub fn crash_payout(bet: i64, multiplier: CrashMultiplier) -> i64 {
    let bet = bet.max(0) as u128;
    to_minor_units(bet * u128::from(multiplier.hundredths()) / 100)
}

fn to_minor_units(value: u128) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(fraction: f64) -> HouseEdge {
        HouseEdge::from_fraction(fraction).unwrap()
    }

    #[test]
    fn test_coinflip_payout() {
        assert_eq!(coinflip_payout(100, edge(0.02)), 196);
        assert_eq!(coinflip_payout(1, edge(0.02)), 1);
        assert_eq!(coinflip_payout(100, HouseEdge::ZERO), 200);
        assert!((coinflip_multiplier(edge(0.02)) - 1.96).abs() < 1e-12);
    }

    #[test]
    fn test_binomial() {
        assert_eq!(binomial(25, 0), 1);
        assert_eq!(binomial(25, 1), 25);
        assert_eq!(binomial(25, 12), 5_200_300);
        assert_eq!(binomial(22, 1), 22);
        assert_eq!(binomial(3, 4), 0);
    }

    #[test]
    fn test_mines_fair_multiplier() {
        // M = 3, k = 1: fair multiplier is 25/22
        let fair = mines_multiplier(HouseEdge::ZERO, 3, 1);
        assert!((fair - 25.0 / 22.0).abs() < 1e-12);

        let with_edge = mines_multiplier(edge(0.02), 3, 1);
        assert!((with_edge - 1.113_636_363_6).abs() < 1e-9);
    }

    #[test]
    fn test_mines_multiplier_floor_and_zero() {
        assert_eq!(mines_multiplier(edge(0.02), 3, 0), 1.0);
        // One mine, one reveal: fair 25/24 is eaten by a 5% edge, floored at 1
        assert_eq!(mines_multiplier(edge(0.05), 1, 1), 1.0);
    }

    #[test]
    fn test_mines_payout_matches_multiplier() {
        // 10000 * 0.98 * 25 / 22 = 11136.36..
        assert_eq!(mines_payout(10_000, edge(0.02), 3, 1), 11_136);
        assert_eq!(mines_payout(10_000, edge(0.05), 1, 1), 10_000);
        assert_eq!(mines_payout(500, edge(0.02), 3, 0), 500);
    }

    #[test]
    fn test_mines_payout_full_clear() {
        // 24 mines, 1 safe tile: fair multiplier is 25
        assert_eq!(mines_payout(100, HouseEdge::ZERO, 24, 1), 2_500);
        // k = 22 on a 3-mine board is C(25,22)/C(22,22) = 2300
        assert_eq!(mines_payout(1, HouseEdge::ZERO, 3, 22), 2_300);
    }

    #[test]
    fn test_crash_payout() {
        assert_eq!(crash_payout(1_000, CrashMultiplier::from_hundredths(240)), 2_400);
        assert_eq!(crash_payout(333, CrashMultiplier::from_hundredths(150)), 499);
        assert_eq!(crash_payout(1, CrashMultiplier::MIN), 1);
    }
}
