// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic bidirectional command/event endpoint over a Unix socket.
//!
//! A [`Server`] runs a [`Service`]: a synchronous state machine with
//! an explicit command table and a handler for subprocess messages.
//! Handlers describe their side effects as [`Effect`]s, which the
//! event loop applies after the handler returns; a failing handler's
//! effects are discarded and the error goes to the originating
//! connection only, so one client's bad command never crashes the
//! loop or leaks to other clients.
//!
//! Connections, the control channel (the process's own stdin), and
//! subprocess pipes each get a small reader task feeding one mpsc
//! channel; all state mutation happens on the loop task.

use std::collections::HashMap;

use retest_core::{Message, MessageError};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::address::Endpoint;
use crate::supervisor::Child;

/// Identity of an accepted client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

/// Everything the event loop reacts to.
#[derive(Debug)]
pub(crate) enum Input {
    Connected(UnixStream),
    ClientLine(ClientId, String),
    ClientClosed(ClientId),
    ControlLine(String),
    ControlClosed,
    ChildLine(&'static str, String),
    ChildClosed(&'static str),
}

/// Where a command line came from, for error routing.
#[derive(Debug, Clone, Copy)]
enum Sender {
    Control,
    Client(ClientId),
    Child,
}

/// Side effects a handler requests; applied by the loop in order.
#[derive(Debug, PartialEq)]
pub enum Effect {
    /// One diagnostic line to the originating connection only.
    Reply(String),
    /// One event line to every connected client and the control
    /// channel's event stream.
    Broadcast(Message),
    /// One message to the named subprocess.
    ToChild(&'static str, Message),
    /// Destroy and recreate the named subprocess.
    RespawnChild(&'static str),
    /// Leave the loop at the next iteration boundary.
    Quit,
}

/// Ordered effect accumulator handed to every handler.
#[derive(Debug, Default)]
pub struct Effects(Vec<Effect>);

impl Effects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&mut self, text: impl Into<String>) {
        self.0.push(Effect::Reply(text.into()));
    }

    pub fn broadcast(&mut self, message: Message) {
        self.0.push(Effect::Broadcast(message));
    }

    pub fn to_child(&mut self, tag: &'static str, message: Message) {
        self.0.push(Effect::ToChild(tag, message));
    }

    pub fn respawn_child(&mut self, tag: &'static str) {
        self.0.push(Effect::RespawnChild(tag));
    }

    pub fn quit(&mut self) {
        self.0.push(Effect::Quit);
    }

    pub fn as_slice(&self) -> &[Effect] {
        &self.0
    }
}

impl IntoIterator for Effects {
    type Item = Effect;
    type IntoIter = std::vec::IntoIter<Effect>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Why a command was rejected. Routed to the sender only.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("malformed command: {0}")]
    Malformed(#[from] MessageError),

    #[error("illegal command: {0}")]
    Illegal(String),

    #[error("{0}")]
    Failed(String),
}

impl CommandError {
    pub fn failed(text: impl Into<String>) -> Self {
        CommandError::Failed(text.into())
    }
}

pub type CommandFn<S> = fn(&mut S, &Message, &mut Effects) -> Result<(), CommandError>;

/// Explicit command-name → handler mapping. Only registered
/// operations are reachable from the wire; there is no reflection.
pub struct CommandTable<S> {
    entries: HashMap<&'static str, CommandFn<S>>,
}

impl<S> CommandTable<S> {
    /// An empty table, except for the universal `quit` command.
    pub fn new() -> Self {
        Self { entries: HashMap::new() }.register("quit", |_, _, out| {
            out.quit();
            Ok(())
        })
    }

    pub fn register(mut self, name: &'static str, handler: CommandFn<S>) -> Self {
        self.entries.insert(name, handler);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<CommandFn<S>> {
        self.entries.get(name).copied()
    }
}

impl<S> Default for CommandTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// A domain configuration of the server: which subprocesses to
/// supervise, which commands to expose, and what to do with
/// subprocess output.
pub trait Service: Send + 'static {
    /// Subprocesses to spawn before entering the loop: (tag, program).
    fn children(&self) -> Vec<(&'static str, String)>;

    fn commands() -> CommandTable<Self>
    where
        Self: Sized;

    /// One decoded line from a supervised subprocess.
    fn on_child_message(&mut self, tag: &'static str, message: Message, out: &mut Effects);
}

/// Control-channel streams. Events and diagnostics are separate sinks
/// so domain logging never pollutes the structured event stream.
pub struct ControlChannel {
    pub input: Box<dyn AsyncRead + Send + Unpin>,
    pub events: Box<dyn AsyncWrite + Send + Unpin>,
    pub diagnostics: Box<dyn AsyncWrite + Send + Unpin>,
}

impl ControlChannel {
    pub fn stdio() -> Self {
        Self {
            input: Box::new(tokio::io::stdin()),
            events: Box::new(tokio::io::stdout()),
            diagnostics: Box::new(tokio::io::stderr()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
}

pub struct Server {
    program: String,
    endpoint: Endpoint,
    control: ControlChannel,
}

impl Server {
    pub fn new(program: impl Into<String>, endpoint: Endpoint, control: ControlChannel) -> Self {
        Self { program: program.into(), endpoint, control }
    }

    /// Run `service` until a `quit` command, control-channel EOF, or
    /// SIGTERM. Children are destroyed and the socket file (if any)
    /// removed on the way out.
    pub async fn run<S: Service>(self, service: S) -> Result<(), ServerError> {
        let (listener, cleanup) = self.endpoint.into_parts();
        let (inputs_tx, mut inputs_rx) = mpsc::channel::<Input>(256);

        spawn_control_reader(self.control.input, inputs_tx.clone());
        spawn_acceptor(listener, inputs_tx.clone());

        let mut lp = EventLoop {
            program: self.program,
            control_events: self.control.events,
            control_diagnostics: self.control.diagnostics,
            clients: HashMap::new(),
            next_client: 0,
            children: HashMap::new(),
            programs: HashMap::new(),
            inputs_tx,
            commands: S::commands(),
            service,
            quitting: false,
        };

        for (tag, program) in lp.service.children() {
            lp.spawn_child(tag, &program)
                .map_err(|source| ServerError::Spawn { program, source })?;
        }

        let mut sigterm = signal(SignalKind::terminate())?;
        info!(program = %lp.program, "serving");

        while !lp.quitting {
            tokio::select! {
                _ = sigterm.recv() => lp.quitting = true,
                input = inputs_rx.recv() => match input {
                    Some(input) => lp.handle(input).await,
                    None => lp.quitting = true,
                },
            }
        }

        lp.shutdown().await;
        if let Some(path) = cleanup {
            // socket files outlive their listener unless unlinked
            let _ = std::fs::remove_file(path);
        }
        Ok(())
    }
}

struct EventLoop<S: Service> {
    program: String,
    control_events: Box<dyn AsyncWrite + Send + Unpin>,
    control_diagnostics: Box<dyn AsyncWrite + Send + Unpin>,
    clients: HashMap<ClientId, mpsc::Sender<String>>,
    next_client: u64,
    children: HashMap<&'static str, Child>,
    programs: HashMap<&'static str, String>,
    inputs_tx: mpsc::Sender<Input>,
    commands: CommandTable<S>,
    service: S,
    quitting: bool,
}

impl<S: Service> EventLoop<S> {
    async fn handle(&mut self, input: Input) {
        match input {
            Input::Connected(stream) => self.register_client(stream),
            Input::ClientLine(id, line) => self.dispatch(Sender::Client(id), &line).await,
            Input::ControlLine(line) => self.dispatch(Sender::Control, &line).await,
            Input::ClientClosed(id) => {
                debug!(client = id.0, "client disconnected");
                self.clients.remove(&id);
            }
            Input::ControlClosed => self.quitting = true,
            Input::ChildLine(tag, line) => match Message::decode(&line) {
                Ok(message) => {
                    let mut out = Effects::new();
                    self.service.on_child_message(tag, message, &mut out);
                    self.apply(Sender::Child, out).await;
                }
                Err(error) => warn!(child = tag, %error, "unparsable subprocess line"),
            },
            Input::ChildClosed(tag) => {
                // not auto-restarted; recovery is an explicit reabsorb
                warn!(child = tag, "subprocess closed its output");
            }
        }
    }

    /// Decode one line from a connection and run the named command.
    /// Every failure mode ends as a one-line diagnostic to the sender.
    async fn dispatch(&mut self, sender: Sender, line: &str) {
        let result = Message::decode(line)
            .map_err(CommandError::from)
            .and_then(|message| {
                let Some(name) = message.name() else {
                    return Err(CommandError::Illegal(line.trim().to_string()));
                };
                let Some(handler) = self.commands.get(name) else {
                    return Err(CommandError::Illegal(name.to_string()));
                };
                let mut out = Effects::new();
                handler(&mut self.service, &message, &mut out)?;
                Ok(out)
            });
        match result {
            Ok(out) => self.apply(sender, out).await,
            Err(error) => {
                debug!(%error, line, "command rejected");
                let text = format!("{}: {}", self.program, error);
                self.reply(sender, &text).await;
            }
        }
    }

    async fn apply(&mut self, sender: Sender, out: Effects) {
        for effect in out {
            match effect {
                Effect::Reply(text) => self.reply(sender, &text).await,
                Effect::Broadcast(message) => self.broadcast(&message).await,
                Effect::ToChild(tag, message) => self.send_to_child(tag, &message).await,
                Effect::RespawnChild(tag) => self.respawn_child(tag).await,
                Effect::Quit => self.quitting = true,
            }
        }
    }

    fn register_client(&mut self, stream: UnixStream) {
        let id = ClientId(self.next_client);
        self.next_client += 1;
        let (read_half, mut write_half) = stream.into_split();

        let (line_tx, mut line_rx) = mpsc::channel::<String>(64);
        tokio::spawn(async move {
            while let Some(line) = line_rx.recv().await {
                if write_half.write_all(line.as_bytes()).await.is_err()
                    || write_half.write_all(b"\n").await.is_err()
                {
                    break;
                }
            }
        });

        let inputs = self.inputs_tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(read_half).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if inputs.send(Input::ClientLine(id, line)).await.is_err() {
                            return;
                        }
                    }
                    Ok(None) | Err(_) => break,
                }
            }
            let _ = inputs.send(Input::ClientClosed(id)).await;
        });

        self.clients.insert(id, line_tx);
        debug!(client = id.0, "client connected");
    }

    /// Diagnostic line to one connection. Control-channel diagnostics
    /// go to the diagnostic sink, never the event stream.
    async fn reply(&mut self, sender: Sender, text: &str) {
        match sender {
            Sender::Client(id) => {
                if let Some(tx) = self.clients.get(&id) {
                    if tx.send(text.to_string()).await.is_err() {
                        self.clients.remove(&id);
                    }
                }
            }
            Sender::Control | Sender::Child => {
                write_line(self.control_diagnostics.as_mut(), text).await;
            }
        }
    }

    /// Event line to every connected client plus the control event
    /// stream, in this event's arrival order.
    async fn broadcast(&mut self, message: &Message) {
        let line = message.encode();
        write_line(self.control_events.as_mut(), &line).await;
        let mut gone = Vec::new();
        for (id, tx) in &self.clients {
            if tx.send(line.clone()).await.is_err() {
                gone.push(*id);
            }
        }
        for id in gone {
            self.clients.remove(&id);
        }
    }

    async fn send_to_child(&mut self, tag: &'static str, message: &Message) {
        match self.children.get_mut(tag) {
            Some(child) => {
                if let Err(error) = child.send(message).await {
                    // no retry; recovery is an explicit reabsorb
                    warn!(child = tag, %error, "subprocess write failed");
                }
            }
            None => warn!(child = tag, "no such subprocess"),
        }
    }

    fn spawn_child(&mut self, tag: &'static str, program: &str) -> std::io::Result<()> {
        let child = Child::spawn(program, tag, self.inputs_tx.clone())?;
        self.children.insert(tag, child);
        self.programs.insert(tag, program.to_string());
        Ok(())
    }

    async fn respawn_child(&mut self, tag: &'static str) {
        if let Some(child) = self.children.remove(tag) {
            child.destroy().await;
        }
        let Some(program) = self.programs.get(tag).cloned() else {
            warn!(child = tag, "respawn of unknown subprocess");
            return;
        };
        if let Err(error) = self.spawn_child(tag, &program) {
            warn!(child = tag, program, %error, "respawn failed");
        }
    }

    async fn shutdown(mut self) {
        for (_, child) in self.children.drain() {
            child.destroy().await;
        }
        let _ = self.control_events.flush().await;
        let _ = self.control_diagnostics.flush().await;
        info!(program = %self.program, "stopped");
    }
}

fn spawn_control_reader(input: Box<dyn AsyncRead + Send + Unpin>, tx: mpsc::Sender<Input>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(input).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(Input::ControlLine(line)).await.is_err() {
                        return;
                    }
                }
                Ok(None) | Err(_) => break,
            }
        }
        let _ = tx.send(Input::ControlClosed).await;
    });
}

fn spawn_acceptor(listener: UnixListener, tx: mpsc::Sender<Input>) {
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    if tx.send(Input::Connected(stream)).await.is_err() {
                        return;
                    }
                }
                Err(error) => warn!(%error, "accept failed"),
            }
        }
    });
}

async fn write_line(sink: &mut (dyn AsyncWrite + Send + Unpin), line: &str) {
    if sink.write_all(line.as_bytes()).await.is_err() {
        return;
    }
    let _ = sink.write_all(b"\n").await;
    let _ = sink.flush().await;
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
