//! Padded optimal assignment (Kuhn-Munkres).

use pathfinding::kuhn_munkres::{Weights, kuhn_munkres};

/// Gains are scaled to integers before solving.
const SCALE: f64 = 1_000_000.0;

/// Square integer gain matrix, padded with a dummy value.
struct GainMatrix {
    data: Vec<Vec<i64>>,
    size: usize,
}

impl Weights<i64> for GainMatrix {
    fn rows(&self) -> usize {
        self.size
    }

    fn columns(&self) -> usize {
        self.size
    }

    fn at(&self, row: usize, col: usize) -> i64 {
        self.data[row][col]
    }

    fn neg(&self) -> Self {
        let data = self
            .data
            .iter()
            .map(|row| row.iter().map(|&v| -v).collect())
            .collect();
        Self { data, size: self.size }
    }
}

/// Assign each row to at most one column, maximising the total gain.
///
/// `gains` is `rows × columns`. The smaller side is padded to a square with a
/// dummy value strictly below every real entry, so a row only lands on a
/// dummy column when there are more rows than columns. Non-finite gains rank
/// below every finite one but above the dummy. Returns one entry per row:
/// `Some(column)` or `None` for a dummy assignment.
pub fn solve(gains: &[Vec<f64>], columns: usize) -> Vec<Option<usize>> {
    let rows = gains.len();
    let size = rows.max(columns);
    if size == 0 {
        return Vec::new();
    }

    let scaled: Vec<Vec<Option<i64>>> = gains
        .iter()
        .map(|row| {
            (0..columns)
                .map(|j| row.get(j).copied().filter(|g| g.is_finite()).map(|g| (g * SCALE).round() as i64))
                .collect()
        })
        .collect();
    let min_real = scaled.iter().flatten().flatten().copied().min().unwrap_or(0);
    let worst = min_real - SCALE as i64;
    let dummy = worst - SCALE as i64;

    let mut data = vec![vec![dummy; size]; size];
    for (i, row) in scaled.iter().enumerate() {
        for (j, value) in row.iter().enumerate() {
            data[i][j] = value.unwrap_or(worst);
        }
    }

    let (_, assignment) = kuhn_munkres(&GainMatrix { data, size });
    assignment
        .into_iter()
        .take(rows)
        .map(|col| (col < columns).then_some(col))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_square_assignment_beats_greedy() {
        // greedy on row 0 would take column 0 and force row 1 onto 0.1
        let gains = vec![vec![0.9, 0.8], vec![0.85, 0.1]];
        assert_eq!(solve(&gains, 2), vec![Some(1), Some(0)]);
    }

    #[test]
    fn test_more_rows_than_columns() {
        let gains = vec![vec![0.2], vec![0.9], vec![0.5]];
        assert_eq!(solve(&gains, 1), vec![None, Some(0), None]);
    }

    #[test]
    fn test_more_columns_than_rows() {
        let gains = vec![vec![0.1, 0.2, 0.95]];
        assert_eq!(solve(&gains, 3), vec![Some(2)]);
    }

    #[test]
    fn test_negative_gains_still_beat_dummy() {
        let gains = vec![vec![-5.0], vec![-7.0]];
        assert_eq!(solve(&gains, 1), vec![Some(0), None]);
    }

    #[test]
    fn test_non_finite_ranks_last() {
        let gains = vec![vec![f64::NAN, 0.1]];
        assert_eq!(solve(&gains, 2), vec![Some(1)]);
    }

    #[test]
    fn test_empty() {
        assert!(solve(&[], 0).is_empty());
        assert_eq!(solve(&[vec![], vec![]], 0), vec![None, None]);
    }
}
