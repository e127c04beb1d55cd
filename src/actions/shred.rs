//! Overwrite-then-unlink secure erasure.
//!
//! # Overview
//!
//! A file is overwritten [`SHRED_PASSES`] times over its recorded length:
//! even passes write random bytes from a CSPRNG, odd passes write zeros.
//! Every pass starts at offset 0, writes in [`SHRED_CHUNK_SIZE`] chunks and
//! ends with a durability sync. Only then is the file unlinked.
//!
//! This guarantees the pass protocol ran. It does not guarantee the old
//! blocks are unrecoverable on copy-on-write filesystems or flash storage.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

use rand::RngCore;

/// Number of overwrite passes.
pub const SHRED_PASSES: usize = 3;

/// Bytes written per write call.
pub const SHRED_CHUNK_SIZE: usize = 64 * 1024;

/// Sink the overwrite passes write into.
pub trait ShredTarget: Write + Seek {
    /// Force written data to durable storage.
    ///
    /// # Errors
    ///
    /// Returns the underlying sync error.
    fn sync(&mut self) -> io::Result<()>;
}

impl ShredTarget for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

impl ShredTarget for io::Cursor<Vec<u8>> {
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run every overwrite pass over the first `len` bytes of `target`.
///
/// # Errors
///
/// Stops at the first failed seek, write or sync and returns it.
pub fn overwrite_passes<T: ShredTarget + ?Sized>(target: &mut T, len: u64) -> io::Result<()> {
    let mut rng = rand::rng();
    let mut buf = vec![0u8; SHRED_CHUNK_SIZE];

    for pass in 0..SHRED_PASSES {
        let random = pass % 2 == 0;
        if !random {
            buf.fill(0);
        }

        target.seek(SeekFrom::Start(0))?;
        let mut remaining = len;
        while remaining > 0 {
            let chunk = usize::try_from(remaining).map_or(SHRED_CHUNK_SIZE, |r| r.min(SHRED_CHUNK_SIZE));
            if random {
                rng.fill_bytes(&mut buf[..chunk]);
            }
            target.write_all(&buf[..chunk])?;
            remaining -= chunk as u64;
        }
        target.sync()?;

        log::trace!(
            "Shred pass {}/{} ({}) complete, {} bytes",
            pass + 1,
            SHRED_PASSES,
            if random { "random" } else { "zero" },
            len
        );
    }

    Ok(())
}

/// Overwrite the file at `path` over `len` bytes, then unlink it.
///
/// `len` is the size recorded at scan time and is not re-read.
///
/// # Errors
///
/// Returns the open, overwrite or removal error. A file whose passes failed
/// is left in place.
pub fn shred_file(path: &Path, len: u64) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).open(path)?;
    overwrite_passes(&mut file, len)?;
    drop(file);
    fs::remove_file(path)?;
    log::debug!("Shredded {} ({} bytes)", path.display(), len);
    Ok(())
}
