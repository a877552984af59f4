use crate::TransferError;
use crate::types::PartRange;

/// Number of parts a file of `total_bytes` is split into.
///
/// Always at least 1: an empty file is sent as one zero-length part.
/// Part numbers are `u32`, so larger counts are rejected.
pub fn part_count(total_bytes: u64, chunk_size: u64) -> Result<u32, TransferError> {
    if chunk_size == 0 {
        return Err(TransferError::InvalidChunkSize);
    }
    let parts = total_bytes.div_ceil(chunk_size).max(1);
    u32::try_from(parts).map_err(|_| TransferError::TooManyParts {
        total_bytes,
        chunk_size,
    })
}

/// Splits `total_bytes` into consecutive ranges of at most `chunk_size`.
///
/// Part `i` (0-based) covers `[i * chunk_size, (i + 1) * chunk_size)`, the
/// last one clamped to `total_bytes`. Part numbers are 1-based.
pub fn split(total_bytes: u64, chunk_size: u64) -> Result<Vec<PartRange>, TransferError> {
    let count = part_count(total_bytes, chunk_size)?;
    let parts = (0..count)
        .map(|i| {
            let start = (u64::from(i) * chunk_size).min(total_bytes);
            let end = (start + chunk_size).min(total_bytes);
            PartRange {
                number: i + 1,
                start,
                end,
            }
        })
        .collect();
    Ok(parts)
}
