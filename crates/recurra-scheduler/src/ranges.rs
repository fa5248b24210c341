/// Group sorted, distinct values into maximal runs of consecutive values.
///
/// Values are consecutive when they differ by exactly one modulo
/// `wrap_modulus`, so the last and first runs join across the wrap point
/// (`[0, 1, 6]` mod 7 is the single run `(6, 1)`). A joined run is returned
/// first; the rest keep their ascending order.
pub fn group_ranges(values: &[i32], wrap_modulus: i32) -> Vec<(i32, i32)> {
    let mut runs: Vec<(i32, i32)> = Vec::new();
    for &value in values {
        match runs.last_mut() {
            Some(run) if (value - run.1).rem_euclid(wrap_modulus) == 1 => run.1 = value,
            _ => runs.push((value, value)),
        }
    }

    if runs.len() > 1 {
        let first = runs[0];
        let last = runs[runs.len() - 1];
        if (first.0 - last.1).rem_euclid(wrap_modulus) == 1 {
            runs.pop();
            runs[0] = (last.0, first.1);
        }
    }
    runs
}

/// Number of values a run covers, counting across the wrap point.
pub fn run_len(run: (i32, i32), wrap_modulus: i32) -> i32 {
    (run.1 - run.0).rem_euclid(wrap_modulus) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekdays_monday_to_friday() {
        assert_eq!(group_ranges(&[1, 2, 3, 4, 5], 7), vec![(1, 5)]);
    }

    #[test]
    fn separate_runs_stay_apart() {
        assert_eq!(group_ranges(&[1, 3, 4], 7), vec![(1, 1), (3, 4)]);
        assert_eq!(group_ranges(&[2, 5, 8, 9, 10], 12), vec![(2, 2), (5, 5), (8, 10)]);
    }

    #[test]
    fn runs_join_across_wrap() {
        assert_eq!(group_ranges(&[0, 1, 3, 6], 7), vec![(6, 1), (3, 3)]);
        assert_eq!(group_ranges(&[1, 2, 11, 12], 12), vec![(11, 2)]);
    }

    #[test]
    fn full_cycle_is_one_run() {
        assert_eq!(group_ranges(&[0, 1, 2, 3, 4, 5, 6], 7), vec![(0, 6)]);
        assert_eq!(run_len((0, 6), 7), 7);
    }

    #[test]
    fn empty_and_single() {
        assert!(group_ranges(&[], 7).is_empty());
        assert_eq!(group_ranges(&[4], 7), vec![(4, 4)]);
        assert_eq!(run_len((11, 2), 12), 4);
    }
}
