pub mod puzzle {
    use colored::Colorize;

    use crate::board::{Board, CELLS, SIDE};

    pub trait DebugPrintable {
        /// Box-drawn grid. `highlight` marks a tile, e.g. the one that just slid.
        fn render(&self, highlight: Option<u8>) -> String;

        fn debug_print(&self, highlight: Option<u8>) {
            println!("{}", self.render(highlight));
        }
    }

    fn border(left: &str, joint: &str, right: &str) -> String {
        let mut line = String::from(left);
        for col in 0..SIDE {
            line.push_str("───");
            if col < SIDE - 1 {
                line.push_str(joint);
            }
        }
        line.push_str(right);
        line
    }

    /// Renders a grid where some cells may be unknown (`None`).
    pub fn render_cells(cells: &[Option<u8>; CELLS], highlight: Option<u8>) -> String {
        let mut out = Vec::with_capacity(2 * SIDE + 1);
        out.push(border("┌", "┬", "┐"));

        for row in 0..SIDE {
            let mut line = String::from("│");
            for col in 0..SIDE {
                let cell = match cells[row * SIDE + col] {
                    Some(0) => format!(" {} ", " ".on_green()),
                    Some(value) if Some(value) == highlight => format!(" {} ", value.to_string().yellow().bold()),
                    Some(value) => format!(" {} ", value),
                    None => format!(" {} ", "?".dimmed()),
                };
                line.push_str(&cell);
                line.push('│');
            }
            out.push(line);

            if row < SIDE - 1 {
                out.push(border("├", "┼", "┤"));
            }
        }

        out.push(border("└", "┴", "┘"));
        out.join("\n")
    }

    impl DebugPrintable for Board {
        fn render(&self, highlight: Option<u8>) -> String {
            let mut cells = [None; CELLS];
            for (idx, &value) in self.cells().iter().enumerate() {
                cells[idx] = Some(value);
            }
            render_cells(&cells, highlight)
        }
    }

    pub trait Heuristic {
        fn heuristic(&self, goal: &Board) -> u32;
    }

    impl Heuristic for Board {
        fn heuristic(&self, goal: &Board) -> u32 {
            manhattan_distance(self, goal)
        }
    }

    /// Sum over the non-blank tiles of the row plus column distance to where
    /// the tile sits in `goal`.
    pub fn manhattan_distance(board: &Board, goal: &Board) -> u32 {
        let mut target = [0usize; CELLS];
        for (idx, &value) in goal.cells().iter().enumerate() {
            target[value as usize] = idx;
        }

        let mut distance: u32 = 0;
        for (idx, &value) in board.cells().iter().enumerate() {
            if value == 0 {
                continue;
            }
            let solved_idx = target[value as usize];
            let lateral_moves = (idx % SIDE).abs_diff(solved_idx % SIDE);
            let vertical_moves = (idx / SIDE).abs_diff(solved_idx / SIDE);
            distance += (lateral_moves + vertical_moves) as u32;
        }

        distance
    }
}

#[cfg(test)]
mod tests {
    use super::puzzle::{manhattan_distance, DebugPrintable, Heuristic};
    use crate::board::Board;

    #[test]
    fn calculates_manhattan_distance_correctly() {
        let goal = Board::solved();
        let puzzle: Board = "123456708".parse().unwrap();
        assert_eq!(puzzle.heuristic(&goal), 1);

        // 1 2 3      8: one row, one column
        // 8 5 4      4: two columns
        // 7 6 0      6: one row, one column
        let puzzle: Board = "123854760".parse().unwrap();
        assert_eq!(manhattan_distance(&puzzle, &goal), 2 + 2 + 2);
        assert_eq!(goal.heuristic(&goal), 0);
    }

    #[test]
    fn distance_is_relative_to_the_supplied_goal() {
        let goal: Board = "012345678".parse().unwrap();
        assert_eq!(goal.heuristic(&goal), 0);
        assert!(Board::solved().heuristic(&goal) > 0);
    }

    #[test]
    fn renders_box_drawn_grid() {
        colored::control::set_override(false);
        let rendered = Board::solved().render(None);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "┌───┬───┬───┐");
        assert_eq!(lines[1], "│ 1 │ 2 │ 3 │");
        assert_eq!(lines[5], "│ 7 │ 8 │   │");
        assert_eq!(lines[6], "└───┴───┴───┘");
    }
}
