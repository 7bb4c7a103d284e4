use crate::board::Board;

/// Number of out-of-order pairs among the non-blank tiles, read row by row.
pub fn inversions(board: &Board) -> u32 {
    let tiles: Vec<u8> = board.cells().iter().copied().filter(|&v| v != 0).collect();

    let mut inversions = 0;
    for i in 0..tiles.len() {
        for j in (i + 1)..tiles.len() {
            if tiles[i] > tiles[j] {
                inversions += 1;
            }
        }
    }
    inversions
}

pub fn inversion_parity(board: &Board) -> u32 {
    inversions(board) % 2
}

/// On an odd-width board a slide never changes inversion parity, so two
/// boards are mutually reachable exactly when their parities agree.
pub fn is_solvable(start: &Board, goal: &Board) -> bool {
    inversion_parity(start) == inversion_parity(goal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_inversions_ignoring_blank() {
        assert_eq!(inversions(&Board::solved()), 0);
        assert_eq!(inversions(&"123456870".parse().unwrap()), 1);
        assert_eq!(inversions(&"876543210".parse().unwrap()), 28);
        assert_eq!(inversions(&"012345678".parse().unwrap()), 0);
    }

    #[test]
    fn solvability_follows_parity() {
        let goal = Board::solved();
        assert!(is_solvable(&"123456708".parse().unwrap(), &goal));
        assert!(is_solvable(&"724506831".parse().unwrap(), &goal));
        assert!(!is_solvable(&"123456870".parse().unwrap(), &goal));
        assert!(is_solvable(&"123456870".parse().unwrap(), &"213456780".parse().unwrap()));
    }

    #[test]
    fn slides_preserve_parity() {
        let mut board: Board = "724506831".parse().unwrap();
        let parity = inversion_parity(&board);
        for _ in 0..20 {
            for next in board.possible_moves() {
                assert_eq!(inversion_parity(&next), parity);
            }
            board = *board.possible_moves().last().unwrap();
        }
    }
}
