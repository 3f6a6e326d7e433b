use crate::common::UploadError;
use crate::transfer::plan::ChunkRange;
use bytes::Bytes;
use positioned_io::ReadAt;
use std::fs::File;
use std::sync::Arc;

/// Read exactly the bytes of `range` from a shared read-only handle.
///
/// Positioned reads let every worker share one handle without a stream
/// cursor to fight over. The blocking read runs on the blocking pool so chunk
/// workers never stall the runtime.
pub async fn read_range(file: &Arc<File>, range: ChunkRange) -> Result<Bytes, UploadError> {
    let file = Arc::clone(file);
    let start = range.start;
    let len = range.len();

    let buffer = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, std::io::Error> {
        let mut buffer = vec![0u8; len];
        file.read_exact_at(start, &mut buffer)?;
        Ok(buffer)
    })
    .await
    .map_err(std::io::Error::other)??;

    Ok(Bytes::from(buffer))
}
