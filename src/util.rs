use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::board::Board;
use crate::error::{PuzzleError, Result};

/// Reads one board per line. Blank lines and lines starting with `#` are skipped.
pub fn read_boards(path: impl AsRef<Path>) -> Result<Vec<Board>> {
    let path = path.as_ref();
    let file = fs::File::open(path).map_err(|source| PuzzleError::Io {
        operation: format!("open {}", path.display()),
        source,
    })?;
    let reader = BufReader::new(file);

    let mut result: Vec<Board> = vec![];
    for line in reader.lines() {
        let line = line.map_err(|source| PuzzleError::Io {
            operation: format!("read {}", path.display()),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        result.push(trimmed.parse()?);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_comments_and_blank_lines() {
        let path = std::env::temp_dir().join(format!("eight-puzzle-boards-{}.txt", std::process::id()));
        fs::write(&path, "# fixtures\n123456708\n\n1 2 3 / 4 0 5 / 7 8 6\n").unwrap();

        let boards = read_boards(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(boards.len(), 2);
        assert_eq!(boards[1], "123405786".parse().unwrap());
    }

    #[test]
    fn bad_line_is_a_parse_error() {
        let path = std::env::temp_dir().join(format!("eight-puzzle-bad-{}.txt", std::process::id()));
        fs::write(&path, "12345678x\n").unwrap();

        let result = read_boards(&path);
        fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(PuzzleError::Parse { .. })));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            read_boards("/nonexistent/boards.txt"),
            Err(PuzzleError::Io { .. })
        ));
    }
}
