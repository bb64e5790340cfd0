use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::WalError;

/// Append-only record log backing one partition.
///
/// Record layout: 4-byte big-endian length, then that many payload bytes.
/// No file header, no checksums. The queue layer tolerates a torn rewrite:
/// lost records re-appear as replayed messages and spurious ones redeliver
/// already-acked messages, both within at-least-once semantics.
///
/// The internal mutex serializes appends against rewrites. Under normal
/// operation the owning queue's mutex already provides that exclusion.
pub struct Wal {
    inner: Mutex<WalInner>,
}

struct WalInner {
    file: File,
    path: PathBuf,
}

impl Wal {
    /// Open (or create) the log at `path` for appending.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, WalError> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            inner: Mutex::new(WalInner { file, path }),
        })
    }

    /// Append one record and force it to durable storage before returning.
    pub fn append(&self, record: &[u8]) -> Result<(), WalError> {
        let len = record_len(record)?;
        let mut inner = self.inner.lock();
        inner.file.write_all(&len.to_be_bytes())?;
        inner.file.write_all(record)?;
        inner.file.sync_all()?;
        Ok(())
    }

    /// Replace the log contents with `records`, in order.
    ///
    /// Truncates in place: the current handle is swapped for a freshly
    /// truncated one, the records are written through it, then fsynced. Not
    /// crash-atomic — a crash mid-rewrite leaves a prefix of the new
    /// contents, which replay treats as undelivered messages.
    pub fn rewrite(&self, records: &[Vec<u8>]) -> Result<(), WalError> {
        let mut inner = self.inner.lock();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&inner.path)?;
        inner.file = file;
        for record in records {
            let len = record_len(record)?;
            inner.file.write_all(&len.to_be_bytes())?;
            inner.file.write_all(record)?;
        }
        inner.file.sync_all()?;
        Ok(())
    }

    /// Final durability flush. The handle itself is released on drop.
    pub fn close(&self) -> Result<(), WalError> {
        self.inner.lock().file.sync_all()?;
        Ok(())
    }

    /// Read every record from the log at `path`, in file order.
    ///
    /// A missing file is an empty log. EOF before a length prefix ends the
    /// scan cleanly; EOF inside a prefix or a record body is
    /// [`WalError::Truncated`].
    pub fn read_all(path: &Path) -> Result<Vec<Vec<u8>>, WalError> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        loop {
            let mut len_buf = [0u8; 4];
            let n = read_full(&mut file, &mut len_buf)?;
            if n == 0 {
                break;
            }
            if n < len_buf.len() {
                return Err(WalError::Truncated {
                    expected: len_buf.len(),
                    found: n,
                });
            }

            let len = u32::from_be_bytes(len_buf) as usize;
            let mut record = vec![0u8; len];
            let n = read_full(&mut file, &mut record)?;
            if n < len {
                return Err(WalError::Truncated {
                    expected: len,
                    found: n,
                });
            }
            records.push(record);
        }
        Ok(records)
    }
}

fn record_len(record: &[u8]) -> Result<u32, WalError> {
    u32::try_from(record.len()).map_err(|_| WalError::RecordTooLarge(record.len()))
}

/// Read until `buf` is full or EOF; returns how many bytes were read.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}
