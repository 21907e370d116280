// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-working-directory socket addressing.
//!
//! The endpoint name is derived from the working directory and the
//! program name, so independent project instances never collide. On
//! Linux the socket lives in the abstract namespace (see unix(7)) and
//! leaves nothing on the filesystem; elsewhere it is a
//! `.{program}.sock` file in the working directory, removed on clean
//! shutdown because socket files do not go away on close.

use std::io;
use std::path::{Path, PathBuf};

use tokio::net::UnixListener;

/// A bound listening endpoint plus the filesystem cleanup it needs.
pub struct Endpoint {
    listener: UnixListener,
    cleanup: Option<PathBuf>,
}

impl Endpoint {
    /// Bind the well-known endpoint for `program` in the current
    /// working directory.
    pub fn bind(program: &str) -> io::Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::bind_in(&cwd, program)
    }

    #[cfg(target_os = "linux")]
    pub fn bind_in(dir: &Path, program: &str) -> io::Result<Self> {
        use std::os::linux::net::SocketAddrExt;

        let name = format!("{}/.{}.sock", dir.display(), program);
        let addr = std::os::unix::net::SocketAddr::from_abstract_name(name.as_bytes())?;
        let listener = std::os::unix::net::UnixListener::bind_addr(&addr)?;
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener: UnixListener::from_std(listener)?,
            cleanup: None,
        })
    }

    #[cfg(not(target_os = "linux"))]
    pub fn bind_in(dir: &Path, program: &str) -> io::Result<Self> {
        Self::bind_path(&dir.join(format!(".{program}.sock")))
    }

    /// Bind a concrete socket path. Used by tests and by platforms
    /// without an abstract namespace; the backing file is removed on
    /// clean shutdown.
    pub fn bind_path(path: &Path) -> io::Result<Self> {
        Ok(Self {
            listener: UnixListener::bind(path)?,
            cleanup: Some(path.to_path_buf()),
        })
    }

    pub(crate) fn into_parts(self) -> (UnixListener, Option<PathBuf>) {
        (self.listener, self.cleanup)
    }
}

#[cfg(test)]
#[path = "address_tests.rs"]
mod tests;
