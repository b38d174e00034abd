//! Process supervisor.
//!
//! The supervisor owns a table of running service processes keyed by service
//! id. Each process is driven by a monitor task that owns the child handle;
//! the table only keeps what is needed to signal it and to observe its exit.
//! Table entries carry a generation number so a late exit of a replaced
//! process never removes its successor. The same generation owns the
//! service's status cell, so a replaced process cannot mark it exited and
//! output that outlives a process cannot mark it alive again.

use super::env::EnvLoader;
use super::launcher::LauncherRegistry;
use crate::config::SupervisorConfig;
use crate::platform::{force_kill, is_process_alive, send_terminate};
use crate::service::{
    resolve_all, sanitize, LocalService, ResolveOptions, ResolvedMap, ResolvedService,
    SanitizedMap, ServiceMap, StatusHandle,
};
use futures::future::join_all;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Output callback: `(service id, text)`.
pub type OutputCallback = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Exit callback: `(service id, exit code)`. The code is `None` when the
/// process was ended by a signal.
pub type ClosedCallback = Arc<dyn Fn(&str, Option<i32>) + Send + Sync>;

/// Options for starting service processes.
#[derive(Clone, Default)]
pub struct StartOptions {
    /// Project root; env files are read from here.
    pub root: PathBuf,
    /// Production run: production env files and the current directory as
    /// working directory. Development runs from `root`.
    pub build: bool,
    pub on_log: Option<OutputCallback>,
    pub on_error: Option<OutputCallback>,
    pub on_closed: Option<ClosedCallback>,
}

impl StartOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    pub fn with_build(mut self, build: bool) -> Self {
        self.build = build;
        self
    }

    pub fn on_log(mut self, callback: impl Fn(&str, &str) + Send + Sync + 'static) -> Self {
        self.on_log = Some(Arc::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl Fn(&str, &str) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    pub fn on_closed(
        mut self,
        callback: impl Fn(&str, Option<i32>) + Send + Sync + 'static,
    ) -> Self {
        self.on_closed = Some(Arc::new(callback));
        self
    }

    fn env_mode(&self) -> &'static str {
        if self.build {
            SupervisorConfig::PRODUCTION_ENV_MODE
        } else {
            SupervisorConfig::DEVELOPMENT_ENV_MODE
        }
    }
}

impl From<&ResolveOptions> for StartOptions {
    fn from(opts: &ResolveOptions) -> Self {
        StartOptions::new(&opts.root).with_build(opts.build)
    }
}

impl std::fmt::Debug for StartOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartOptions")
            .field("root", &self.root)
            .field("build", &self.build)
            .finish_non_exhaustive()
    }
}

/// A started service process.
#[derive(Debug, Clone)]
pub struct ActiveService {
    pub id: String,
    /// Descriptor the process was started from; shares its status cell.
    pub service: LocalService,
    pub pid: u32,
}

impl ActiveService {
    pub fn status(&self) -> &StatusHandle {
        &self.service.status
    }
}

#[derive(Debug, Clone, Copy)]
enum KillSignal {
    Terminate,
    Kill,
}

struct TrackedProcess {
    generation: u64,
    pid: u32,
    kill: mpsc::UnboundedSender<KillSignal>,
    exited: watch::Receiver<bool>,
}

impl TrackedProcess {
    fn signal(&self, id: &str, signal: KillSignal) {
        debug!("Sending {:?} to service {} (pid {})", signal, id, self.pid);
        // The monitor may already have exited; nothing left to signal then.
        let _ = self.kill.send(signal);
    }

    async fn wait_exited(&self, timeout: Duration) -> bool {
        let mut exited = self.exited.clone();
        tokio::time::timeout(timeout, exited.wait_for(|done| *done))
            .await
            .map(|result| result.is_ok())
            .unwrap_or(false)
    }
}

type ProcessTable = Arc<Mutex<HashMap<String, TrackedProcess>>>;

struct SupervisorInner {
    processes: ProcessTable,
    generation: AtomicU64,
    launchers: LauncherRegistry,
    env: EnvLoader,
}

/// Spawns, tracks and terminates service processes.
///
/// Cheap to clone; clones share the same process table.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<SupervisorInner>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::with_launchers(LauncherRegistry::default())
    }

    pub fn with_launchers(launchers: LauncherRegistry) -> Self {
        Self {
            inner: Arc::new(SupervisorInner {
                processes: Arc::new(Mutex::new(HashMap::new())),
                generation: AtomicU64::new(1),
                launchers,
                env: EnvLoader::new(),
            }),
        }
    }

    pub fn launchers(&self) -> &LauncherRegistry {
        &self.inner.launchers
    }

    /// Start the process behind a resolved local service.
    ///
    /// An id that is already active is closed first. Missing files, unknown
    /// extensions and spawn errors are logged and return `None`.
    pub async fn start(
        &self,
        service: &LocalService,
        id: &str,
        opts: &StartOptions,
    ) -> Option<ActiveService> {
        if self.is_active(id) {
            debug!("Service {} is already running, restarting", id);
            self.close(Some(id));
        }

        let Some((filepath, launcher)) = self.inner.launchers.resolve(&service.filepath) else {
            warn!(
                "No launcher for service {} ({})",
                id,
                service.filepath.display()
            );
            return None;
        };

        if !filepath.exists() {
            warn!("Service {} not found at {}", id, filepath.display());
            return None;
        }

        let env_files = self.inner.env.load(opts.env_mode(), &opts.root).await;

        let mut command = launcher.command(&filepath);
        for (key, value) in env_files.iter() {
            if std::env::var_os(key).is_none() {
                command.env(key, value);
            }
        }
        command
            .env(SupervisorConfig::PORT_ENV, service.port.to_string())
            .env(SupervisorConfig::HOST_ENV, &service.host)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = working_directory(opts) {
            command.current_dir(dir);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to start service {}: {}", id, e);
                return None;
            }
        };
        let pid = child.id().unwrap_or_default();

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst);
        service.status.claim(generation);

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_stdout_reader(stdout, id, generation, service, opts));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_stderr_reader(stderr, id, service, opts));
        }
        let (kill_tx, kill_rx) = mpsc::unbounded_channel();
        let (exited_tx, exited_rx) = watch::channel(false);

        self.lock().insert(
            id.to_string(),
            TrackedProcess {
                generation,
                pid,
                kill: kill_tx,
                exited: exited_rx,
            },
        );

        tokio::spawn(monitor(MonitorTask {
            id: id.to_string(),
            generation,
            child,
            readers,
            kill_rx,
            exited_tx,
            status: service.status.clone(),
            processes: Arc::clone(&self.inner.processes),
            on_closed: opts.on_closed.clone(),
        }));

        info!("Started service {} (pid {}) at {}", id, pid, service.url);

        Some(ActiveService {
            id: id.to_string(),
            service: service.clone(),
            pid,
        })
    }

    /// Start every local service in `resolved`, sequentially.
    pub async fn start_all(
        &self,
        resolved: &ResolvedMap,
        opts: &StartOptions,
    ) -> BTreeMap<String, ActiveService> {
        let mut active = BTreeMap::new();
        for (id, service) in resolved {
            let ResolvedService::Local(local) = service else {
                continue;
            };
            if let Some(started) = self.start(local, id, opts).await {
                active.insert(id.clone(), started);
            }
        }
        active
    }

    /// Resolve `specs` and start the resulting local services.
    pub async fn create_all(
        &self,
        specs: &ServiceMap,
        resolve: &ResolveOptions,
        opts: StartOptions,
    ) -> ServiceGroup {
        let resolved = resolve_all(specs, resolve).await;
        let active = self.start_all(&resolved, &opts).await;
        ServiceGroup {
            active,
            resolved,
            supervisor: self.clone(),
        }
    }

    /// Terminate one service, or every service when `id` is `None`.
    ///
    /// Returns immediately; exit is reported through `on_closed`.
    pub fn close(&self, id: Option<&str>) {
        match id {
            Some(id) => match self.lock().remove(id) {
                Some(process) => process.signal(id, KillSignal::Terminate),
                None => warn!("No active service named {}", id),
            },
            None => {
                let drained: Vec<(String, TrackedProcess)> = self.lock().drain().collect();
                for (id, process) in drained {
                    process.signal(&id, KillSignal::Terminate);
                }
            }
        }
    }

    /// Terminate every service and wait for them to exit, force-killing any
    /// that outlive `timeout`.
    pub async fn shutdown(&self, timeout: Duration) {
        let drained: Vec<(String, TrackedProcess)> = self.lock().drain().collect();
        if drained.is_empty() {
            return;
        }
        info!("Shutting down {} service(s)", drained.len());

        let waits = drained.into_iter().map(|(id, process)| async move {
            process.signal(&id, KillSignal::Terminate);
            if process.wait_exited(timeout).await {
                return;
            }

            warn!(
                "Service {} did not exit within {:?}, killing",
                id, timeout
            );
            process.signal(&id, KillSignal::Kill);
            if !process.wait_exited(SupervisorConfig::KILL_TIMEOUT).await
                && process.pid != 0
                && is_process_alive(process.pid)
            {
                error!("Service {} (pid {}) did not exit after kill", id, process.pid);
            }
        });
        join_all(waits).await;
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    /// Ids of running services, sorted.
    pub fn active_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Pid of a running service.
    pub fn pid(&self, id: &str) -> Option<u32> {
        self.lock().get(id).map(|process| process.pid)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, TrackedProcess>> {
        lock_table(&self.inner.processes)
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("active", &self.active_ids())
            .field("launchers", &self.inner.launchers)
            .finish()
    }
}

/// Result of [`Supervisor::create_all`].
#[derive(Debug, Clone)]
pub struct ServiceGroup {
    pub active: BTreeMap<String, ActiveService>,
    pub resolved: ResolvedMap,
    pub supervisor: Supervisor,
}

impl ServiceGroup {
    pub fn close(&self, id: Option<&str>) {
        self.supervisor.close(id);
    }

    pub async fn shutdown(&self, timeout: Duration) {
        self.supervisor.shutdown(timeout).await;
    }

    /// Client-safe view of the resolved services.
    pub fn sanitized(&self) -> SanitizedMap {
        sanitize(&self.resolved)
    }
}

fn lock_table(processes: &ProcessTable) -> MutexGuard<'_, HashMap<String, TrackedProcess>> {
    processes.lock().unwrap_or_else(|e| e.into_inner())
}

struct MonitorTask {
    id: String,
    generation: u64,
    child: Child,
    readers: Vec<JoinHandle<()>>,
    kill_rx: mpsc::UnboundedReceiver<KillSignal>,
    exited_tx: watch::Sender<bool>,
    status: StatusHandle,
    processes: ProcessTable,
    on_closed: Option<ClosedCallback>,
}

async fn monitor(task: MonitorTask) {
    let MonitorTask {
        id,
        generation,
        mut child,
        mut readers,
        mut kill_rx,
        exited_tx,
        status,
        processes,
        on_closed,
    } = task;

    let pid = child.id().unwrap_or_default();
    let exit = loop {
        let signal = tokio::select! {
            exit = child.wait() => break exit,
            Some(signal) = kill_rx.recv() => signal,
        };
        deliver(&mut child, pid, signal);
    };

    let code = match exit {
        Ok(exit) => exit.code(),
        Err(e) => {
            warn!("Failed to wait on service {}: {}", id, e);
            None
        }
    };

    // Descendants may keep the pipes open; stop reading after the drain window
    let drain = join_all(readers.iter_mut());
    if tokio::time::timeout(SupervisorConfig::OUTPUT_DRAIN_TIMEOUT, drain)
        .await
        .is_err()
    {
        debug!("Output of service {} still open after exit, detaching", id);
        for reader in &readers {
            reader.abort();
        }
    }

    status.mark_exited_by(generation);
    {
        let mut table = lock_table(&processes);
        if table.get(&id).is_some_and(|p| p.generation == generation) {
            table.remove(&id);
        }
    }
    exited_tx.send_replace(true);

    match code {
        Some(0) => info!("Service {} exited", id),
        Some(code) => error!("Service {} exited with code {}", id, code),
        None => info!("Service {} was terminated by a signal", id),
    }

    if let Some(on_closed) = on_closed {
        on_closed(&id, code);
    }
}

fn deliver(child: &mut Child, pid: u32, signal: KillSignal) {
    let delivered = match signal {
        _ if pid == 0 => Ok(false),
        KillSignal::Terminate => send_terminate(pid),
        KillSignal::Kill => force_kill(pid),
    }
    .unwrap_or_else(|e| {
        warn!("Failed to signal pid {}: {}", pid, e);
        false
    });

    // Fall back to the child handle where signals are unsupported
    if !delivered {
        if let Err(e) = child.start_kill() {
            debug!("Failed to kill pid {}: {}", pid, e);
        }
    }
}

fn spawn_stdout_reader<R>(
    reader: R,
    id: &str,
    generation: u64,
    service: &LocalService,
    opts: &StartOptions,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let id = id.to_string();
    let status = service.status.clone();
    let log_output = service.monitor.stdout;
    let on_log = opts.on_log.clone();

    tokio::spawn(read_chunks(reader, move |text| {
        status.mark_alive_by(generation);
        if log_output {
            info!(service = %id, "{}", text.trim_end());
        }
        if let Some(on_log) = &on_log {
            on_log(&id, text);
        }
    }))
}

fn spawn_stderr_reader<R>(
    reader: R,
    id: &str,
    service: &LocalService,
    opts: &StartOptions,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let id = id.to_string();
    let log_output = service.monitor.stderr;
    let on_error = opts.on_error.clone();

    tokio::spawn(read_chunks(reader, move |text| {
        if log_output {
            error!(service = %id, "{}", text.trim_end());
        }
        if let Some(on_error) = &on_error {
            on_error(&id, text);
        }
    }))
}

async fn read_chunks<R, F>(mut reader: R, mut handle: F)
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut buf = vec![0u8; SupervisorConfig::READ_BUFFER_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => handle(&String::from_utf8_lossy(&buf[..n])),
            Err(e) => {
                debug!("Stopped reading service output: {}", e);
                break;
            }
        }
    }
}

/// Working directory a service would be started in.
pub fn working_directory(opts: &StartOptions) -> Option<&Path> {
    (!opts.build).then_some(opts.root.as_path())
}
