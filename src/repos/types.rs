use failure::Error as FailureError;

/// Repos layer result
pub type RepoResult<T> = Result<T, FailureError>;

/// PostgreSQL rejects statements with more bind parameters than this.
pub const MAX_BIND_PARAMS: usize = 65535;

/// Rows per multi-row `INSERT` for a table writing `columns` values per row.
pub fn insert_batch_size(columns: usize) -> usize {
    (MAX_BIND_PARAMS / columns.max(1)).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_batches_stay_under_bind_limit() {
        for columns in 1..8 {
            let size = insert_batch_size(columns);
            assert!(size * columns <= MAX_BIND_PARAMS);
            assert!((size + 1) * columns > MAX_BIND_PARAMS);
        }
        assert_eq!(insert_batch_size(0), MAX_BIND_PARAMS);
    }

    #[test]
    fn test_large_assignment_payload_is_split() {
        let rows: Vec<u8> = vec![0; 10_000 * 4];
        let batch = insert_batch_size(4);
        let chunks: Vec<&[u8]> = rows.chunks(batch).collect();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|chunk| chunk.len() * 4 <= MAX_BIND_PARAMS));
        assert_eq!(chunks.iter().map(|chunk| chunk.len()).sum::<usize>(), rows.len());
    }
}
