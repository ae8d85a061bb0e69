/// Converts a 0-based column index into its letters, e.g. 0 => `A`, 27 => `AB`
pub(crate) fn column_letters(column: usize) -> String {
    let mut column = column + 1;
    let mut letters = Vec::new();
    while column > 0 {
        column -= 1;
        letters.push(b'A' + (column % 26) as u8);
        column /= 26;
    }
    letters.iter().rev().map(|letter| *letter as char).collect()
}

/// Converts 0-based row and column indexes into an A1-style cell reference
pub(crate) fn index_to_reference(row: usize, column: usize) -> String {
    format!("{}{}", column_letters(column), row + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references() {
        assert_eq!(index_to_reference(0, 0), "A1");
        assert_eq!(index_to_reference(9, 25), "Z10");
        assert_eq!(index_to_reference(0, 26), "AA1");
        assert_eq!(index_to_reference(1, 27), "AB2");
        assert_eq!(index_to_reference(0, 701), "ZZ1");
        assert_eq!(index_to_reference(0, 702), "AAA1");
    }
}
