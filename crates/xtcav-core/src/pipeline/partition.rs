use crate::consts::TASK_BLOCK_SIZE;

/// Event indices assigned to worker `rank` out of `workers`.
///
/// Events are dealt out in blocks of [`TASK_BLOCK_SIZE`] consecutive indices;
/// block `b` belongs to worker `b % workers`. The result is ascending, and
/// over all ranks every index in `0..total` appears exactly once. An invalid
/// rank or a zero worker count yields no events.
pub fn assigned_events(total: usize, rank: usize, workers: usize) -> Vec<usize> {
    if workers == 0 || rank >= workers {
        return Vec::new();
    }
    (0..total.div_ceil(TASK_BLOCK_SIZE))
        .skip(rank)
        .step_by(workers)
        .flat_map(|block| {
            let start = block * TASK_BLOCK_SIZE;
            start..(start + TASK_BLOCK_SIZE).min(total)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_round_robin() {
        assert_eq!(assigned_events(10, 0, 2), vec![0, 1, 2, 3, 8, 9]);
        assert_eq!(assigned_events(10, 1, 2), vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_invalid_assignments_are_empty() {
        assert!(assigned_events(10, 2, 2).is_empty());
        assert!(assigned_events(10, 0, 0).is_empty());
        assert!(assigned_events(0, 0, 3).is_empty());
    }
}
