/// Largest number of bound parameters in one `IN (...)` list.
pub const BATCH_SIZE: usize = 10_000;

/// `?,?,?` with `n` markers.
pub fn placeholders(n: usize) -> String {
    let mut out = String::with_capacity(n * 2);
    for i in 0..n {
        if i > 0 {
            out.push(',');
        }
        out.push('?');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(0), "");
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?,?,?");
    }

    #[test]
    fn test_chunking_boundary() {
        let ids: Vec<i64> = (0..25_001).collect();
        let sizes: Vec<usize> = ids.chunks(BATCH_SIZE).map(<[i64]>::len).collect();
        assert_eq!(sizes, [10_000, 10_000, 5_001]);
    }
}
