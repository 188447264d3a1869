use crate::error::PuzzleError;

/// Blocked (black) cell marker in both the solution and the display grid.
pub const BLOCK: char = '-';

/// Parsed generator output.
///
/// The generator prints three blocks in fixed positional order: `rows`
/// solution lines, `rows` display lines, then the clue legend. Solution
/// lines are whitespace-separated single-character cells. Display lines are
/// kept as raw text because cell spacing is significant there: cells sit at
/// even character offsets, and an empty fill-in cell is a space, so a blank
/// cell next to its separator forms the double-space run the collapse step
/// turns back into a single in-grid space.
#[derive(Debug, Clone)]
pub struct ParsedGrid {
    solution: Vec<Vec<char>>,
    display_rows: Vec<String>,
    solution_text: String,
    display_text: String,
    legend: String,
}

impl ParsedGrid {
    pub fn parse(raw: &str, rows: usize) -> Result<Self, PuzzleError> {
        if rows == 0 {
            return Err(PuzzleError::MalformedGeneratorOutput(
                "grid row count is zero".to_string(),
            ));
        }

        let lines: Vec<&str> = raw
            .lines()
            .map(|line| line.trim_end_matches(['\r', '\n']))
            .filter(|line| !line.trim().is_empty())
            .collect();

        if lines.len() < rows * 2 {
            return Err(PuzzleError::MalformedGeneratorOutput(format!(
                "expected at least {} lines (solution + display), got {}",
                rows * 2,
                lines.len()
            )));
        }

        let solution: Vec<Vec<char>> = lines[..rows]
            .iter()
            .map(|line| {
                line.split_whitespace()
                    .filter_map(|token| token.chars().next())
                    .collect()
            })
            .collect();

        let cols = solution[0].len();
        if cols == 0 {
            return Err(PuzzleError::MalformedGeneratorOutput(
                "grid column count is zero".to_string(),
            ));
        }
        if let Some(bad) = solution.iter().position(|row| row.len() != cols) {
            return Err(PuzzleError::MalformedGeneratorOutput(format!(
                "solution row {} has {} cells, expected {}",
                bad,
                solution[bad].len(),
                cols
            )));
        }

        let display_rows: Vec<String> = lines[rows..rows * 2]
            .iter()
            .map(|line| (*line).to_string())
            .collect();

        Ok(Self {
            solution,
            solution_text: lines[..rows].join("\n"),
            display_text: lines[rows..rows * 2].join("\n"),
            legend: lines[rows * 2..].join("\n"),
            display_rows,
        })
    }

    pub fn rows(&self) -> usize {
        self.solution.len()
    }

    pub fn cols(&self) -> usize {
        self.solution[0].len()
    }

    pub fn legend(&self) -> &str {
        &self.legend
    }

    /// Raw solution block, as printed by the generator.
    pub fn solution_text(&self) -> &str {
        &self.solution_text
    }

    /// Raw display block, as printed by the generator.
    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    /// All solution cells concatenated row-major. Blocked cells are kept so
    /// that positions line up one-to-one with [`display_string`]; the reveal
    /// transform indexes both strings with the same offsets.
    ///
    /// [`display_string`]: ParsedGrid::display_string
    pub fn answer_flattened(&self) -> String {
        self.solution.iter().flatten().collect()
    }

    /// The display grid collapsed to one character per cell, rows
    /// concatenated. Same length and cell order as [`answer_flattened`].
    ///
    /// [`answer_flattened`]: ParsedGrid::answer_flattened
    pub fn display_string(&self) -> String {
        let cols = self.cols();
        self.display_rows
            .iter()
            .flat_map(|row| collapse_display_row(row, cols))
            .collect()
    }
}

/// Cells in a display row are joined by single spaces, so cell `i` lives at
/// character offset `2 * i`. Rows the generator trimmed short are padded
/// with blank cells.
fn collapse_display_row(row: &str, cols: usize) -> Vec<char> {
    let chars: Vec<char> = row.chars().collect();
    (0..cols)
        .map(|i| chars.get(i * 2).copied().unwrap_or(' '))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_output() -> String {
        [
            // solution block, 3x4
            "C A T -",
            "O - E A",
            "W I N -",
            // display block: digits number the words, '-' blocks, blanks fill
            "1     -",
            "  -   2",
            "3     -",
            // legend
            "1. Feline",
            "3. Victory",
        ]
        .join("\n")
    }

    #[test]
    fn parses_dimensions_and_legend() {
        let grid = ParsedGrid::parse(&sample_output(), 3).unwrap();
        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.cols(), 4);
        assert_eq!(grid.legend(), "1. Feline\n3. Victory");
    }

    #[test]
    fn flattened_strings_align() {
        let grid = ParsedGrid::parse(&sample_output(), 3).unwrap();
        let answer = grid.answer_flattened();
        let display = grid.display_string();
        assert_eq!(answer, "CAT-O-EAWIN-");
        assert_eq!(answer.len(), grid.rows() * grid.cols());
        assert_eq!(display.len(), answer.len());
        // blocked cells appear at the same offsets in both strings
        for (i, c) in answer.chars().enumerate() {
            if c == BLOCK {
                assert_eq!(display.chars().nth(i), Some(BLOCK));
            }
        }
    }

    #[test]
    fn display_blanks_survive_collapse() {
        let grid = ParsedGrid::parse(&sample_output(), 3).unwrap();
        let display = grid.display_string();
        // row 0 is "1     -": number, two blanks, block
        assert_eq!(&display[..4], "1  -");
    }

    #[test]
    fn short_display_rows_are_padded() {
        let out = ["A B", "C D", "1", "2  "].join("\n");
        let grid = ParsedGrid::parse(&out, 2).unwrap();
        assert_eq!(grid.display_string(), "1 2 ");
    }

    #[test]
    fn rejects_non_rectangular_solution() {
        let out = ["A B C", "D E", "1 2 3", "4 5 6"].join("\n");
        let err = ParsedGrid::parse(&out, 2).unwrap_err();
        assert!(matches!(err, PuzzleError::MalformedGeneratorOutput(_)));
    }

    #[test]
    fn rejects_truncated_output() {
        let err = ParsedGrid::parse("A B\nC D\n", 2).unwrap_err();
        assert!(matches!(err, PuzzleError::MalformedGeneratorOutput(_)));
    }

    #[test]
    fn rejects_empty_output() {
        let err = ParsedGrid::parse("", 3).unwrap_err();
        assert!(matches!(err, PuzzleError::MalformedGeneratorOutput(_)));
    }

    #[test]
    fn blank_lines_between_blocks_are_skipped() {
        let out = "A B\nC D\n\n1 2\n3 4\n\nclue";
        let grid = ParsedGrid::parse(out, 2).unwrap();
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.legend(), "clue");
    }
}
