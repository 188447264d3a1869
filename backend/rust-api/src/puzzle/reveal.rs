use rand::seq::IndexedRandom;
use rand::Rng;

use super::grid::BLOCK;

/// Default number of cells pre-filled with the correct letter.
pub const DEFAULT_REVEAL_QUOTA: usize = 10;

/// Derive the player-facing puzzle string by re-revealing up to `quota`
/// cells of `display` from `answer`.
///
/// Block markers and clue-number digits are never revealed: they are not
/// answerable cells. Positions are drawn uniformly without replacement from
/// the eligible pool, so the quota is met exactly when the pool allows it
/// and the selection always terminates on short or heavily blocked grids.
/// Both strings are expected to be the same length; positions past the
/// shorter one are treated as ineligible.
///
/// Returns the patched display string and the revealed positions, recorded
/// on the puzzle record for audit.
pub fn reveal_letters<R: Rng + ?Sized>(
    display: &str,
    answer: &str,
    quota: usize,
    rng: &mut R,
) -> (String, Vec<usize>) {
    let mut cells: Vec<char> = display.chars().collect();
    let answer_cells: Vec<char> = answer.chars().collect();

    let bound = cells.len().min(answer_cells.len());
    let eligible: Vec<usize> = (0..bound)
        .filter(|&i| cells[i] != BLOCK && !cells[i].is_ascii_digit())
        .collect();

    let count = quota.min(eligible.len());
    let revealed: Vec<usize> = eligible.choose_multiple(rng, count).copied().collect();

    for &i in &revealed {
        cells[i] = answer_cells[i];
    }

    (cells.into_iter().collect(), revealed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const ANSWER: &str = "CAT-O-EAWIN-";
    const DISPLAY: &str = "1  - -  3  -";

    fn rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    #[test]
    fn never_reveals_blocks_or_digits() {
        for seed in 0..50 {
            let (_, revealed) = reveal_letters(DISPLAY, ANSWER, 10, &mut rng(seed));
            for &i in &revealed {
                let original = DISPLAY.chars().nth(i).unwrap();
                assert_ne!(original, BLOCK, "seed {} revealed a block", seed);
                assert!(!original.is_ascii_digit(), "seed {} revealed a digit", seed);
            }
        }
    }

    #[test]
    fn reveals_at_most_quota_distinct_positions() {
        for seed in 0..50 {
            let (_, revealed) = reveal_letters(DISPLAY, ANSWER, 3, &mut rng(seed));
            assert_eq!(revealed.len(), 3);
            let mut dedup = revealed.clone();
            dedup.sort_unstable();
            dedup.dedup();
            assert_eq!(dedup.len(), revealed.len());
        }
    }

    #[test]
    fn patched_positions_show_answer_letters() {
        let (patched, revealed) = reveal_letters(DISPLAY, ANSWER, 10, &mut rng(7));
        let patched: Vec<char> = patched.chars().collect();
        let answer: Vec<char> = ANSWER.chars().collect();
        for &i in &revealed {
            assert_eq!(patched[i], answer[i]);
        }
        assert_eq!(patched.len(), DISPLAY.chars().count());
    }

    #[test]
    fn stops_early_when_pool_is_exhausted() {
        // only two eligible cells
        let (_, revealed) = reveal_letters("1 - ", "AB-C", 10, &mut rng(0));
        assert_eq!(revealed.len(), 2);
    }

    #[test]
    fn all_blocked_grid_reveals_nothing() {
        let (patched, revealed) = reveal_letters("----", "ABCD", 10, &mut rng(0));
        assert!(revealed.is_empty());
        assert_eq!(patched, "----");
    }

    #[test]
    fn length_mismatch_is_bounded_by_shorter_string() {
        let (patched, revealed) = reveal_letters("      ", "ABC", 10, &mut rng(1));
        assert!(revealed.iter().all(|&i| i < 3));
        assert_eq!(patched.chars().count(), 6);
    }
}
