//! Request/response client bound to one plugin subprocess
//!
//! The subprocess is started on the first call and then kept for the rest of
//! the run. A reader task owns its stdout and hands every response to the
//! `oneshot` waiting on that request id. Notifications go to a separate
//! dispatcher task, which runs the handler on the blocking pool, so a handler
//! may itself call back into the plugin. Once stdout closes the process counts
//! as gone: pending and future calls fail with `PluginUnavailable` and nothing
//! is respawned.

use crate::plugins::error::{PluginError, PluginResult};
use crate::plugins::jsonrpc::protocol::{decode_line, PluginMessage, RpcRequest, RpcResponse};
use crate::{log_debug, log_warn};
use serde_json::Value;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

/// Called for every notification a plugin writes (`method`, `params`)
pub type NotificationHandler = Arc<dyn Fn(&str, Value) + Send + Sync>;

type HandlerSlot = Arc<RwLock<Option<NotificationHandler>>>;

/// How to start a plugin subprocess
#[derive(Debug, Clone, Default)]
pub struct ProcessCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub working_dir: PathBuf,
    /// Added on top of the host environment
    pub env: HashMap<String, String>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Requests waiting for an answer, plus whether anyone can still answer them
struct Pending {
    alive: bool,
    exit_reason: String,
    waiters: HashMap<u64, oneshot::Sender<RpcResponse>>,
}

struct Connection {
    stdin: tokio::sync::Mutex<ChildStdin>,
    // Killed when the connection is dropped
    _child: Mutex<Child>,
    pending: Arc<Mutex<Pending>>,
}

pub struct RpcClient {
    name: String,
    command: ProcessCommand,
    timeout: Option<Duration>,
    next_id: AtomicU64,
    connection: Mutex<Option<Arc<Connection>>>,
    notifications: HandlerSlot,
}

impl RpcClient {
    /// `timeout` bounds each call; `None` waits as long as the process lives
    pub fn new(name: impl Into<String>, command: ProcessCommand, timeout: Option<Duration>) -> Self {
        Self {
            name: name.into(),
            command,
            timeout,
            next_id: AtomicU64::new(1),
            connection: Mutex::new(None),
            notifications: Arc::new(RwLock::new(None)),
        }
    }

    pub fn set_notification_handler(&self, handler: NotificationHandler) {
        let mut slot = self.notifications.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(handler);
    }

    /// Blocking form of [`RpcClient::request`]
    ///
    /// Must run on a thread of the runtime's blocking pool (`spawn_blocking`),
    /// which is where the host calls plugins from.
    pub fn call(&self, method: &str, params: Value) -> PluginResult<Value> {
        let handle = Handle::try_current()
            .map_err(|e| PluginError::unavailable(&self.name, format!("no tokio runtime: {}", e)))?;
        handle.block_on(self.request(method, params))
    }

    /// Send one request and wait for its response, the timeout, or process exit
    pub async fn request(&self, method: &str, params: Value) -> PluginResult<Value> {
        let connection = self.connection()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let line = RpcRequest::new(id, method, params).encode()?;

        let (sender, receiver) = oneshot::channel();
        {
            let mut pending = lock(&connection.pending);
            if !pending.alive {
                return Err(PluginError::unavailable(&self.name, pending.exit_reason.clone()));
            }
            pending.waiters.insert(id, sender);
        }

        let written = {
            let mut stdin = connection.stdin.lock().await;
            match stdin.write_all(line.as_bytes()).await {
                Ok(()) => stdin.flush().await,
                Err(e) => Err(e),
            }
        };
        if let Err(e) = written {
            lock(&connection.pending).waiters.remove(&id);
            return Err(PluginError::unavailable(
                &self.name,
                format!("failed to write request: {}", e),
            ));
        }

        let received = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, receiver).await {
                Ok(received) => received,
                Err(_) => {
                    lock(&connection.pending).waiters.remove(&id);
                    return Err(PluginError::PluginTimeout {
                        plugin: self.name.clone(),
                        method: method.to_string(),
                        seconds: limit.as_secs(),
                    });
                }
            },
            None => receiver.await,
        };

        match received {
            Ok(response) => response.outcome.map_err(|error| PluginError::Remote {
                plugin: self.name.clone(),
                method: method.to_string(),
                message: error.message,
            }),
            // The reader dropped the sender: stdout is closed
            Err(_) => {
                let reason = lock(&connection.pending).exit_reason.clone();
                Err(PluginError::unavailable(&self.name, reason))
            }
        }
    }

    fn connection(&self) -> PluginResult<Arc<Connection>> {
        let mut slot = lock(&self.connection);
        if let Some(connection) = slot.as_ref() {
            return Ok(Arc::clone(connection));
        }

        let connection = Arc::new(self.spawn()?);
        *slot = Some(Arc::clone(&connection));
        Ok(connection)
    }

    fn spawn(&self) -> PluginResult<Connection> {
        let command = &self.command;
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .current_dir(&command.working_dir)
            .envs(&command.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                PluginError::unavailable(
                    &self.name,
                    format!("failed to start {:?}: {}", command.program, e),
                )
            })?;

        log_debug!(
            "Started plugin process {} (pid {:?}) for '{}'",
            command.program.display(),
            child.id(),
            self.name
        );

        let missing = |stream: &str| PluginError::unavailable(&self.name, format!("no {} pipe", stream));
        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing("stderr"))?;

        let pending = Arc::new(Mutex::new(Pending {
            alive: true,
            exit_reason: String::new(),
            waiters: HashMap::new(),
        }));

        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        tokio::spawn(read_responses(
            self.name.clone(),
            stdout,
            Arc::clone(&pending),
            notify_tx,
        ));
        tokio::spawn(dispatch_notifications(
            self.name.clone(),
            notify_rx,
            Arc::clone(&self.notifications),
        ));
        tokio::spawn(forward_stderr(self.name.clone(), stderr));

        Ok(Connection {
            stdin: tokio::sync::Mutex::new(stdin),
            _child: Mutex::new(child),
            pending,
        })
    }
}

async fn read_responses(
    name: String,
    stdout: ChildStdout,
    pending: Arc<Mutex<Pending>>,
    notifications: mpsc::UnboundedSender<(String, Value)>,
) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                log_warn!("Failed to read from plugin '{}': {}", name, e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match decode_line(&line) {
            Ok(PluginMessage::Response(response)) => {
                let waiter = lock(&pending).waiters.remove(&response.id);
                match waiter {
                    Some(sender) => {
                        let _ = sender.send(response);
                    }
                    None => {
                        log_warn!(
                            "Plugin '{}' answered unknown request id {}, ignoring",
                            name,
                            response.id
                        );
                    }
                }
            }
            Ok(PluginMessage::Notification { method, params }) => {
                let _ = notifications.send((method, params));
            }
            Err(_) => {
                log_debug!("[{}] {}", name, line);
            }
        }
    }

    let mut pending = lock(&pending);
    pending.alive = false;
    pending.exit_reason = "plugin process exited".to_string();
    // Dropping the senders wakes every waiting caller
    pending.waiters.clear();
}

/// Run the handler for each notification in arrival order, off the reader task
async fn dispatch_notifications(
    name: String,
    mut notifications: mpsc::UnboundedReceiver<(String, Value)>,
    handler: HandlerSlot,
) {
    while let Some((method, params)) = notifications.recv().await {
        let current = handler.read().unwrap_or_else(PoisonError::into_inner).clone();
        let Some(current) = current else {
            log_debug!("Plugin '{}' sent '{}' before init", name, method);
            continue;
        };

        let handled = tokio::task::spawn_blocking(move || current(method.as_str(), params)).await;
        if let Err(e) = handled {
            log_warn!("Notification handler for plugin '{}' failed: {}", name, e);
        }
    }
}

async fn forward_stderr(name: String, stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        log_debug!("[{}] {}", name, line);
    }
}
