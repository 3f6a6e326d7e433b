use crate::common::UploadError;

/// Partition of a file into fixed-size chunks. Built fresh per chunked
/// repetition, pure data, nothing mutable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferPlan {
    pub total_size: u64,
    pub chunk_size: u64,
    pub total_chunks: u32,
}

/// Half-open byte range `[start, end)` for one chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkRange {
    pub index: u32,
    pub start: u64,
    pub end: u64,
}

impl ChunkRange {
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl TransferPlan {
    pub fn new(total_size: u64, chunk_size: u64) -> Result<Self, UploadError> {
        if chunk_size == 0 {
            return Err(UploadError::InvalidChunkSize);
        }
        Ok(Self {
            total_size,
            chunk_size,
            total_chunks: total_size.div_ceil(chunk_size) as u32,
        })
    }

    /// Byte range of chunk `index`. The last chunk is clamped to the file end.
    pub fn range(&self, index: u32) -> Result<ChunkRange, UploadError> {
        if index >= self.total_chunks {
            return Err(UploadError::IndexOutOfRange {
                index,
                total: self.total_chunks,
            });
        }
        let start = u64::from(index) * self.chunk_size;
        let end = (start + self.chunk_size).min(self.total_size);
        Ok(ChunkRange { index, start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::UploadError;

    #[test]
    fn zero_chunk_size_is_rejected() {
        assert!(matches!(
            TransferPlan::new(1024, 0),
            Err(UploadError::InvalidChunkSize)
        ));
    }

    #[test]
    fn empty_file_has_no_chunks() {
        let plan = TransferPlan::new(0, 1024).unwrap();
        assert_eq!(plan.total_chunks, 0);
        assert!(matches!(
            plan.range(0),
            Err(UploadError::IndexOutOfRange { index: 0, total: 0 })
        ));
    }

    #[test]
    fn twenty_five_mib_in_ten_mib_chunks() {
        let plan = TransferPlan::new(26_214_400, 10_485_760).unwrap();
        assert_eq!(plan.total_chunks, 3);

        let ranges: Vec<_> = (0..3).map(|i| plan.range(i).unwrap()).collect();
        assert_eq!((ranges[0].start, ranges[0].end), (0, 10_485_760));
        assert_eq!((ranges[1].start, ranges[1].end), (10_485_760, 20_971_520));
        assert_eq!((ranges[2].start, ranges[2].end), (20_971_520, 26_214_400));
    }

    #[test]
    fn exact_multiple_has_no_stub_chunk() {
        let plan = TransferPlan::new(4096, 1024).unwrap();
        assert_eq!(plan.total_chunks, 4);
        let last = plan.range(3).unwrap();
        assert_eq!(last.len(), 1024);
        assert!(matches!(plan.range(4), Err(UploadError::IndexOutOfRange { .. })));
    }

    #[test]
    fn ranges_partition_the_file_exactly() {
        for (total_size, chunk_size) in [
            (1u64, 1u64),
            (1, 4096),
            (4095, 1024),
            (4096, 1024),
            (4097, 1024),
            (26_214_400, 10_485_760),
        ] {
            let plan = TransferPlan::new(total_size, chunk_size).unwrap();
            let mut covered = 0u64;
            for index in 0..plan.total_chunks {
                let range = plan.range(index).unwrap();
                assert_eq!(range.start, covered, "gap or overlap at chunk {index}");
                assert!(range.end > range.start);
                covered = range.end;
            }
            assert_eq!(covered, total_size);
        }
    }
}
