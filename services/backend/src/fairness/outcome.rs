//! Game outcomes derived from the draw stream

use shared::{CoinSide, CrashMultiplier, HouseEdge, CRASH_DRAW_CEILING, TILE_COUNT};

use super::rng::DrawStream;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoinflipDraw {
    pub draw: f64,
    pub side: CoinSide,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrashDraw {
    pub draw: f64,
    pub crash_point: CrashMultiplier,
}

/// Heads when the first draw is below one half
pub fn coinflip(server_seed: &str, client_seed: &str, nonce: i64) -> CoinflipDraw {
    let draw = DrawStream::new(server_seed, client_seed, nonce).next_draw();
    let side = if draw < 0.5 { CoinSide::Heads } else { CoinSide::Tails };
    CoinflipDraw { draw, side }
}

/// Mine tiles for a board, ascending
///
/// Fisher-Yates over `0..25` from the last index down, `j = floor(r * (i + 1))`,
/// then the first `mines_count` shuffled tiles are mines.
pub fn mine_positions(server_seed: &str, client_seed: &str, nonce: i64, mines_count: u8) -> Vec<u8> {
    let mut stream = DrawStream::new(server_seed, client_seed, nonce);
    let mut tiles: Vec<u8> = (0..TILE_COUNT).collect();

    for i in (1..tiles.len()).rev() {
        let j = stream.next_index(i + 1);
        tiles.swap(i, j);
    }

    let mut mines: Vec<u8> = tiles
        .into_iter()
        .take(usize::from(mines_count.min(TILE_COUNT)))
        .collect();
    mines.sort_unstable();
    mines
}

/// Crash point for a round: `floor(100 * (1 - edge) / (1 - r))` hundredths
pub fn crash_point(server_seed: &str, client_seed: &str, nonce: i64, edge: HouseEdge) -> CrashDraw {
    let draw = DrawStream::new(server_seed, client_seed, nonce).next_draw();
    let capped = draw.min(CRASH_DRAW_CEILING);
    let raw = 100.0 * (1.0 - edge.as_fraction()) / (1.0 - capped);
    // raw is finite and positive: capped <= 0.99 and edge < 1
    let hundredths = raw.floor().min(u32::MAX as f64) as u32;

    CrashDraw {
        draw,
        crash_point: CrashMultiplier::from_hundredths(hundredths),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{MAX_CRASH_POINT_X100, MIN_CRASH_POINT_X100};

    #[test]
    fn test_coinflip_matches_first_draw() {
        let flip = coinflip("server", "client", 1);
        let first = DrawStream::new("server", "client", 1).next_draw();
        assert_eq!(flip.draw, first);
        assert_eq!(flip.side == CoinSide::Heads, first < 0.5);
    }

    #[test]
    fn test_mine_positions_distinct_and_sorted() {
        for nonce in 1..50 {
            let mines = mine_positions("server", "client", nonce, 5);
            assert_eq!(mines.len(), 5);
            assert!(mines.windows(2).all(|w| w[0] < w[1]));
            assert!(mines.iter().all(|tile| *tile < TILE_COUNT));
        }
    }

    #[test]
    fn test_mine_positions_prefix_stable() {
        // The first three mines of a 3-mine board are a subset of a 10-mine board
        let small = mine_positions("server", "client", 4, 3);
        let large = mine_positions("server", "client", 4, 10);
        assert!(small.iter().all(|tile| large.contains(tile)));
    }

    #[test]
    fn test_mine_positions_max_board() {
        let mines = mine_positions("server", "client", 1, 24);
        assert_eq!(mines.len(), 24);
    }

    #[test]
    fn test_crash_point_bounds() {
        let edge = HouseEdge::from_fraction(0.04).unwrap();
        for nonce in 1..200 {
            let round = crash_point("server", "client", nonce, edge);
            let x100 = round.crash_point.hundredths();
            assert!((MIN_CRASH_POINT_X100..=MAX_CRASH_POINT_X100).contains(&x100));
        }
    }

    #[test]
    fn test_crash_point_formula() {
        let edge = HouseEdge::from_fraction(0.04).unwrap();
        let round = crash_point("server", "client", 11, edge);
        let capped = round.draw.min(CRASH_DRAW_CEILING);
        let expected = (96.0 / (1.0 - capped)).floor() as u32;
        assert_eq!(
            round.crash_point.hundredths(),
            expected.clamp(MIN_CRASH_POINT_X100, MAX_CRASH_POINT_X100)
        );
    }
}
