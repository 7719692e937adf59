//! Blocking disk manager implementation.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use cairn_common::constants::PAGE_SIZE;
use cairn_common::types::PageId;
use parking_lot::Mutex;

use super::error::{DiskError, DiskResult};

/// A blocking, thread-safe page reader/writer.
///
/// The buffer pool is the only caller; it supplies page IDs it minted itself.
/// A successful [`DiskManager::write_page`] guarantees the page is durable on
/// return.
pub trait DiskManager: Send + Sync {
    /// Reads the page into `buf`, which must be exactly `PAGE_SIZE` bytes.
    ///
    /// Reading a page that was never written yields zeroed bytes.
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> DiskResult<()>;

    /// Writes the page from `buf`, which must be exactly `PAGE_SIZE` bytes.
    fn write_page(&self, page_id: PageId, buf: &[u8]) -> DiskResult<()>;
}

/// Disk manager backed by a single data file.
///
/// All pages live in one file at offset `page_id * PAGE_SIZE`. The file
/// handle sits behind a mutex; seek-and-transfer pairs are atomic with
/// respect to each other.
pub struct FileDiskManager {
    /// The underlying file, wrapped in a mutex for thread-safe access.
    file: Mutex<File>,
    /// The file path.
    path: PathBuf,
}

impl FileDiskManager {
    /// Opens (or creates) the data file at `path`.
    pub fn open(path: impl AsRef<Path>) -> DiskResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(|e| DiskError::open(&path, e))?;

        Ok(Self {
            file: Mutex::new(file),
            path,
        })
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the byte offset of a page, rejecting invalid IDs.
    fn page_offset(page_id: PageId) -> DiskResult<u64> {
        if !page_id.is_valid() {
            return Err(DiskError::InvalidPageId { page_id });
        }
        Ok(page_id.as_i32() as u64 * PAGE_SIZE as u64)
    }

    fn check_buffer(buf: &[u8]) -> DiskResult<()> {
        if buf.len() != PAGE_SIZE {
            return Err(DiskError::BadBufferLength {
                expected: PAGE_SIZE,
                actual: buf.len(),
            });
        }
        Ok(())
    }
}

impl DiskManager for FileDiskManager {
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> DiskResult<()> {
        Self::check_buffer(buf)?;
        let offset = Self::page_offset(page_id)?;

        let mut file = self.file.lock();
        let file_len = file.metadata()?.len();
        if offset >= file_len {
            // Page was never written; hand back a fresh zeroed page.
            tracing::debug!(page_id = %page_id, "read past end of data file, zero-filling");
            buf.fill(0);
            return Ok(());
        }

        file.seek(SeekFrom::Start(offset))?;
        let mut read = 0;
        while read < PAGE_SIZE {
            match file.read(&mut buf[read..])? {
                0 => break,
                n => read += n,
            }
        }
        // A page at the tail of the file may be short on disk.
        buf[read..].fill(0);
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> DiskResult<()> {
        Self::check_buffer(buf)?;
        let offset = Self::page_offset(page_id)?;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)?;
        // Durable on return.
        file.sync_data()?;
        Ok(())
    }
}

impl std::fmt::Debug for FileDiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDiskManager")
            .field("path", &self.path)
            .finish()
    }
}
