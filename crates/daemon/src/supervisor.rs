// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervised subprocesses speaking the line protocol over stdio.
//!
//! The owning server spawns a child with piped stdin/stdout and a
//! reader task that pumps stdout lines into the event loop. Writes are
//! never retried; a wedged or crashed child is only recovered by an
//! explicit respawn.

use std::io;
use std::process::Stdio;

use retest_core::Message;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::server::Input;

pub struct Child {
    tag: &'static str,
    process: tokio::process::Child,
    stdin: ChildStdin,
    reader: JoinHandle<()>,
}

impl Child {
    pub(crate) fn spawn(
        program: &str,
        tag: &'static str,
        inputs: mpsc::Sender<Input>,
    ) -> io::Result<Self> {
        let mut process = Command::new(program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("subprocess stdin not captured"))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("subprocess stdout not captured"))?;

        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if inputs.send(Input::ChildLine(tag, line)).await.is_err() {
                            return;
                        }
                    }
                    Ok(None) | Err(_) => break,
                }
            }
            let _ = inputs.send(Input::ChildClosed(tag)).await;
        });

        debug!(child = tag, program, "spawned subprocess");
        Ok(Self { tag, process, stdin, reader })
    }

    /// Write one line-framed message to the subprocess.
    pub(crate) async fn send(&mut self, message: &Message) -> io::Result<()> {
        let mut line = message.encode();
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await
    }

    /// Kill and reap the subprocess. Consuming the handle makes
    /// destruction idempotent; the reader task is stopped first so a
    /// dying child cannot feed stale events into the loop.
    pub(crate) async fn destroy(mut self) {
        self.reader.abort();
        if let Err(error) = self.process.start_kill() {
            debug!(child = self.tag, %error, "kill failed");
        }
        let _ = self.process.wait().await;
        debug!(child = self.tag, "destroyed subprocess");
    }
}
