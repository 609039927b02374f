/// Row/column tracking for syntax nodes and edits
///
/// Rows and columns are 0-indexed; columns count bytes from the start of the
/// row, which is what editors send alongside byte offsets in edit events.
/// A point in source text (0-indexed row, byte column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Point {
    pub row: usize,
    pub column: usize,
}

/// A row/column range in source text, end exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PointRange {
    pub start: Point,
    pub end: Point,
}

impl Point {
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }

    /// Point reached after writing `text` starting at `self`.
    pub fn advance(self, text: &str) -> Self {
        match text.rfind('\n') {
            Some(last) => {
                let rows = text.bytes().filter(|&b| b == b'\n').count();
                Self::new(self.row + rows, text.len() - last - 1)
            }
            None => Self::new(self.row, self.column + text.len()),
        }
    }
}

impl PointRange {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Create a range from row/column coordinates
    pub fn from_coords(start_row: usize, start_col: usize, end_row: usize, end_col: usize) -> Self {
        Self {
            start: Point::new(start_row, start_col),
            end: Point::new(end_row, end_col),
        }
    }

    /// Check if a point falls within this range (end exclusive)
    pub fn contains(&self, point: Point) -> bool {
        self.start <= point && point < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_single_line() {
        assert_eq!(Point::new(2, 3).advance("abc"), Point::new(2, 6));
    }

    #[test]
    fn test_advance_across_lines() {
        assert_eq!(Point::new(0, 5).advance("a\nbc\nd"), Point::new(2, 1));
        assert_eq!(Point::new(1, 1).advance("\n"), Point::new(2, 0));
    }

    #[test]
    fn test_range_contains() {
        let range = PointRange::from_coords(1, 2, 3, 0);
        assert!(range.contains(Point::new(1, 2)));
        assert!(range.contains(Point::new(2, 100)));
        assert!(!range.contains(Point::new(3, 0)));
        assert!(!range.contains(Point::new(1, 1)));
    }
}
