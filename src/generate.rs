use rand::Rng;
use rand::rngs::OsRng;

pub const NUMBER_MAX: u8 = 45;
pub const NUMBERS_PER_GAME: usize = 6;

/// Six distinct numbers in 1..=45, ascending. Pinned numbers for the slot
/// fill first (duplicates and overflow dropped), OS randomness tops up the
/// rest. One independent draw per call.
pub fn generate_numbers(pinned: &[u8]) -> [u8; NUMBERS_PER_GAME] {
    let mut picked: Vec<u8> = Vec::with_capacity(NUMBERS_PER_GAME);

    for &n in pinned {
        if picked.len() == NUMBERS_PER_GAME {
            break;
        }
        if (1..=NUMBER_MAX).contains(&n) && !picked.contains(&n) {
            picked.push(n);
        }
    }

    while picked.len() < NUMBERS_PER_GAME {
        let candidate = OsRng.gen_range(1..=NUMBER_MAX);
        if !picked.contains(&candidate) {
            picked.push(candidate);
        }
    }

    picked.sort_unstable();

    let mut numbers = [0u8; NUMBERS_PER_GAME];
    numbers.copy_from_slice(&picked);
    numbers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_valid(numbers: &[u8; 6]) {
        assert!(numbers.iter().all(|n| (1..=45).contains(n)));
        assert!(numbers.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn every_draw_is_six_distinct_ascending() {
        for _ in 0..200 {
            assert_valid(&generate_numbers(&[]));
        }
    }

    #[test]
    fn pinned_numbers_are_kept() {
        let numbers = generate_numbers(&[3, 7, 15, 22, 30, 41]);
        assert_eq!(numbers, [3, 7, 15, 22, 30, 41]);
    }

    #[test]
    fn partial_pins_are_topped_up() {
        let numbers = generate_numbers(&[45, 1]);
        assert_valid(&numbers);
        assert!(numbers.contains(&1));
        assert!(numbers.contains(&45));
    }

    #[test]
    fn duplicate_and_out_of_range_pins_are_dropped() {
        let numbers = generate_numbers(&[7, 7, 0, 99, 7]);
        assert_valid(&numbers);
        assert_eq!(numbers.iter().filter(|&&n| n == 7).count(), 1);
    }
}
