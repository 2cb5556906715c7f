//! Rotation-aware file follower.
//!
//! [`LogFollower`] reads an append-only log the way `tail -f` does.
//! Rotation (the path replaced by a new inode, as logrotate and the
//! SWAG nginx setup do) and truncation are detected by comparing the
//! on-disk file identity and length against the open handle; the
//! caller then [`reopen`](LogFollower::reopen)s the path and reading
//! continues from the start of the new file.
//!
//! Only complete lines are yielded. A partial line at end-of-file is
//! buffered until its terminating newline arrives, so a line written
//! in two chunks is never split in two.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader, SeekFrom};
use tracing::warn;

/// Identity of an open file, used for rotation detection.
///
/// On Unix this is the inode number. The comparison is abstract so the
/// rotation check does not leak platform details into the tail loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileIdentity(u64);

impl FileIdentity {
    fn of(meta: &std::fs::Metadata) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            Self(meta.ino())
        }
        #[cfg(not(unix))]
        {
            let _ = meta;
            Self(0)
        }
    }
}

/// Follows a single growing log file.
pub struct LogFollower {
    path: PathBuf,
    reader: BufReader<File>,
    identity: FileIdentity,
    /// Stream position of the reader, compared against the on-disk
    /// length to detect truncation.
    offset: u64,
    /// Buffered partial line awaiting its newline.
    pending: String,
    /// Set while skipping the remainder of an overlong line.
    discarding: bool,
    max_line_length: usize,
}

impl LogFollower {
    /// Open `path` positioned at the current end of file.
    ///
    /// Lines already present are skipped; only lines appended after
    /// the open are yielded.
    pub async fn open_end(
        path: impl AsRef<Path>,
        max_line_length: usize,
    ) -> io::Result<Self> {
        Self::open_at(path.as_ref(), true, max_line_length).await
    }

    /// Open `path` positioned at the start of the file.
    pub async fn open_start(
        path: impl AsRef<Path>,
        max_line_length: usize,
    ) -> io::Result<Self> {
        Self::open_at(path.as_ref(), false, max_line_length).await
    }

    async fn open_at(path: &Path, seek_end: bool, max_line_length: usize) -> io::Result<Self> {
        let file = File::open(path).await?;
        let meta = file.metadata().await?;
        let identity = FileIdentity::of(&meta);
        let mut reader = BufReader::new(file);
        let offset = if seek_end {
            reader.seek(SeekFrom::End(0)).await?
        } else {
            0
        };
        Ok(Self {
            path: path.to_owned(),
            reader,
            identity,
            offset,
            pending: String::new(),
            discarding: false,
            max_line_length,
        })
    }

    /// Read the next complete line, without its line terminator.
    ///
    /// Returns `Ok(None)` when no complete line is currently
    /// available (end of file, or a partial line was buffered).
    /// Overlong lines are dropped in full.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut chunk = String::new();
        let n = self.reader.read_line(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        self.offset += n as u64;

        let complete = chunk.ends_with('\n');

        if self.discarding {
            if complete {
                self.discarding = false;
            }
            return Ok(None);
        }

        if !complete {
            self.pending.push_str(&chunk);
            if self.pending.len() > self.max_line_length {
                warn!(
                    path = %self.path.display(),
                    length = self.pending.len(),
                    "dropping overlong log line"
                );
                self.pending.clear();
                self.discarding = true;
            }
            return Ok(None);
        }

        let mut line = std::mem::take(&mut self.pending);
        line.push_str(chunk.trim_end_matches(['\n', '\r']));
        if line.len() > self.max_line_length {
            warn!(
                path = %self.path.display(),
                length = line.len(),
                "dropping overlong log line"
            );
            return Ok(None);
        }
        Ok(Some(line))
    }

    /// Whether the on-disk file no longer matches the open handle.
    ///
    /// True when the path now points at a different inode (rotation)
    /// or the file shrank below the read position (truncation). A
    /// missing path is not rotation yet: the old handle stays valid
    /// until the new file appears.
    pub async fn rotated(&self) -> io::Result<bool> {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) => {
                Ok(FileIdentity::of(&meta) != self.identity || meta.len() < self.offset)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Reopen the path from the start of the (new) file.
    ///
    /// Any buffered partial line from the old file is discarded; it
    /// can never be completed.
    pub async fn reopen(&mut self) -> io::Result<()> {
        *self = Self::open_at(&self.path, false, self.max_line_length).await?;
        Ok(())
    }

    /// The followed path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
