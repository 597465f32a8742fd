//! Per-config advisory locking.
//!
//! One exclusive, non-blocking `flock` per config identity, held for the
//! lifetime of the engine. Acquisition never waits: a second assetgen pointed at
//! the same config fails immediately.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::LOCK_FILENAME;

#[derive(Debug, Serialize, Deserialize)]
pub struct LockMetadata {
  pub version: u32,
  pub pid: u32,
  pub started_at_unix: u64,
  pub config: PathBuf,
}

#[derive(Debug, Error)]
pub enum LockError {
  #[error(
    "Another assetgen is already running for {} (PID {})\n\
             If you're sure no assetgen process is running, remove the lock file:\n  {}",
    .config.display(),
    .pid,
    .lock_path.display()
  )]
  Contention {
    config: PathBuf,
    pid: u32,
    lock_path: PathBuf,
  },

  #[error(
    "Another assetgen is already running for {}\n\
             If you're sure no assetgen process is running, remove the lock file:\n  {}",
    .config.display(),
    .lock_path.display()
  )]
  ContentionUnknown { config: PathBuf, lock_path: PathBuf },

  #[error("Failed to create data directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("Failed to open lock file: {0}")]
  OpenFile(#[source] io::Error),

  #[error("Failed to write lock metadata: {0}")]
  WriteMetadata(#[source] io::Error),

  #[error("Failed to acquire lock: {0}")]
  LockFailed(#[source] io::Error),
}

/// A held config lock. Dropping it releases the lock.
#[derive(Debug)]
pub struct ConfigLock {
  file: File,
  lock_path: PathBuf,
}

impl ConfigLock {
  /// Takes the exclusive lock in `data_dir` for `config`.
  pub fn acquire(data_dir: &Path, config: &Path) -> Result<Self, LockError> {
    let lock_path = data_dir.join(LOCK_FILENAME);

    if !data_dir.exists() {
      std::fs::create_dir_all(data_dir).map_err(LockError::CreateDir)?;
    }

    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(&lock_path)
      .map_err(LockError::OpenFile)?;

    if let Err(err) = try_lock_exclusive(&file) {
      if err.kind() == io::ErrorKind::WouldBlock {
        return Err(Self::read_contention_error(&lock_path, config));
      }
      return Err(LockError::LockFailed(err));
    }

    Self::write_metadata(&file, config)?;
    debug!(lock = %lock_path.display(), config = %config.display(), "acquired config lock");

    Ok(ConfigLock { file, lock_path })
  }

  /// Reads the metadata back through the held handle.
  pub fn read_metadata(&self) -> io::Result<LockMetadata> {
    use std::io::{Seek, SeekFrom};

    let mut file = &self.file;
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).map_err(io::Error::other)
  }

  pub fn lock_path(&self) -> &Path {
    &self.lock_path
  }

  /// Releases the lock explicitly.
  pub fn unlock(self) {
    debug!(lock = %self.lock_path.display(), "released config lock");
  }

  fn write_metadata(file: &File, config: &Path) -> Result<(), LockError> {
    let metadata = LockMetadata {
      version: 1,
      pid: std::process::id(),
      started_at_unix: SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs(),
      config: config.to_path_buf(),
    };

    file.set_len(0).map_err(LockError::WriteMetadata)?;
    let mut writer = io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &metadata).map_err(|e| LockError::WriteMetadata(io::Error::other(e)))?;
    writer.flush().map_err(LockError::WriteMetadata)?;

    Ok(())
  }

  fn read_contention_error(lock_path: &Path, config: &Path) -> LockError {
    if let Ok(mut file) = File::open(lock_path) {
      let mut contents = String::new();
      if file.read_to_string(&mut contents).is_ok()
        && let Ok(metadata) = serde_json::from_str::<LockMetadata>(&contents)
      {
        return LockError::Contention {
          config: config.to_path_buf(),
          pid: metadata.pid,
          lock_path: lock_path.to_path_buf(),
        };
      }
    }

    LockError::ContentionUnknown {
      config: config.to_path_buf(),
      lock_path: lock_path.to_path_buf(),
    }
  }
}

#[cfg(unix)]
fn try_lock_exclusive(file: &File) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  flock(file.as_fd(), FlockOperation::NonBlockingLockExclusive)
    .map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(windows)]
fn try_lock_exclusive(file: &File) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::HANDLE;
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx};

  let handle = file.as_raw_handle() as HANDLE;

  // SAFETY: OVERLAPPED is a plain data struct that is valid when zero-initialized.
  // LockFileEx is safe to call with a valid file handle and zeroed OVERLAPPED.
  let result = unsafe {
    let mut overlapped = std::mem::zeroed();
    LockFileEx(
      handle,
      LOCKFILE_FAIL_IMMEDIATELY | LOCKFILE_EXCLUSIVE_LOCK,
      0,
      1,
      0,
      &mut overlapped,
    )
  };

  if result == 0 {
    Err(io::Error::last_os_error())
  } else {
    Ok(())
  }
}
