//! Shared test helpers: an in-memory remote host, fake local adapters, and
//! output constructors.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use latent_cli::application::ports::{
    PortCandidates, ProgressReporter, ProjectDir, ProjectStore, RemoteConnector, RemoteShell,
    StreamMode,
};
use latent_cli::application::services::remote::{CLAIM_ENTRY_SCRIPT, WRITE_FILE_SCRIPT};
use latent_cli::domain::remote::PORTS_DIR;
use latent_cli::domain::{ProjectRecord, ProvisionCheckpoint, RemoteCommand, RemoteError};

pub const TEST_ID: &str = "0123456789abcdef";
pub const OTHER_ID: &str = "fedcba9876543210";

// ── Cross-platform ExitStatus construction ───────────────────────────────────

/// Build an `ExitStatus` from a logical exit code (0 = success, non-zero = failure).
///
/// On Unix the raw wait-status encodes the exit code in bits 8–15, so we shift.
/// On Windows `ExitStatusExt::from_raw` takes the exit code directly.
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    #[allow(clippy::cast_sign_loss)]
    ExitStatus::from_raw(code as u32)
}

// ── Output constructors ──────────────────────────────────────────────────────

pub fn ok_output(stdout: &[u8]) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub fn err_output(code: i32, stderr: &[u8]) -> Output {
    Output {
        status: exit_status(code),
        stdout: Vec::new(),
        stderr: stderr.to_vec(),
    }
}

// ── In-memory remote host ────────────────────────────────────────────────────

#[derive(Default)]
struct HostState {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, (String, String)>,
    listeners: BTreeSet<u16>,
    missing_tools: BTreeSet<String>,
    acme_account: bool,
    failing_programs: BTreeSet<String>,
    status_code: i32,
    journal: Vec<String>,
    journal_code: i32,
    commands: Vec<RemoteCommand>,
}

/// A remote host that interprets the structured commands Latent sends.
///
/// Every call yields to the scheduler before it runs, so concurrent callers
/// interleave one command at a time.
#[derive(Clone, Default)]
pub struct FakeHost {
    state: Arc<Mutex<HostState>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut HostState) -> T) -> T {
        let mut state = self.state.lock().expect("host state lock");
        f(&mut state)
    }

    /// Mark `port` as bound by a running process.
    pub fn with_listener(self, port: u16) -> Self {
        self.with_state(|s| s.listeners.insert(port));
        self
    }

    /// Pre-register `port` as owned by `id`, creating the registry directory.
    pub fn with_registered(self, port: u16, id: &str) -> Self {
        self.with_state(|s| {
            s.dirs.insert(PORTS_DIR.to_string());
            s.files
                .insert(entry(port), (format!("{id}\n"), "0644".to_string()))
        });
        self
    }

    /// Make every invocation of `program` exit 1.
    pub fn failing(self, program: &str) -> Self {
        self.with_state(|s| s.failing_programs.insert(program.to_string()));
        self
    }

    pub fn heal(&self, program: &str) {
        self.with_state(|s| s.failing_programs.remove(program));
    }

    pub fn with_acme_account(self) -> Self {
        self.with_state(|s| s.acme_account = true);
        self
    }

    pub fn has_acme_account(&self) -> bool {
        self.with_state(|s| s.acme_account)
    }

    pub fn without_tool(self, tool: &str) -> Self {
        self.with_state(|s| s.missing_tools.insert(tool.to_string()));
        self
    }

    pub fn with_status_code(self, code: i32) -> Self {
        self.with_state(|s| s.status_code = code);
        self
    }

    pub fn with_journal(self, lines: &[&str], code: i32) -> Self {
        self.with_state(|s| {
            s.journal = lines.iter().map(|l| (*l).to_string()).collect();
            s.journal_code = code;
        });
        self
    }

    pub fn commands(&self) -> Vec<RemoteCommand> {
        self.with_state(|s| s.commands.clone())
    }

    pub fn count(&self, program: &str) -> usize {
        self.commands()
            .iter()
            .filter(|c| c.program() == program)
            .count()
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.with_state(|s| s.files.get(path).map(|(content, _)| content.clone()))
    }

    pub fn mode(&self, path: &str) -> Option<String> {
        self.with_state(|s| s.files.get(path).map(|(_, mode)| mode.clone()))
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.with_state(|s| s.dirs.contains(path))
    }

    /// Registry entries as port → owner ID.
    pub fn registry(&self) -> BTreeMap<u16, String> {
        let prefix = format!("{PORTS_DIR}/");
        self.with_state(|s| {
            s.files
                .iter()
                .filter_map(|(path, (content, _))| {
                    let port = path.strip_prefix(&prefix)?.parse().ok()?;
                    Some((port, content.trim().to_string()))
                })
                .collect()
        })
    }

    fn interpret(&self, command: &RemoteCommand, stdin: &[u8]) -> Output {
        self.with_state(|s| {
            s.commands.push(command.clone());
            let args: Vec<&str> = command.arguments().iter().map(String::as_str).collect();
            if s.failing_programs.contains(command.program()) {
                return err_output(1, b"injected failure");
            }
            match (command.program(), args.as_slice()) {
                ("true" | "git" | "nginx", _) => ok_output(b""),
                ("mkdir", ["-p", dir]) => {
                    s.dirs.insert((*dir).to_string());
                    ok_output(b"")
                }
                ("test", ["-e", path]) => {
                    if s.files.contains_key(*path) || s.dirs.contains(*path) {
                        ok_output(b"")
                    } else {
                        err_output(1, b"")
                    }
                }
                ("test", ["-d", path]) => {
                    if s.dirs.contains(*path) {
                        ok_output(b"")
                    } else {
                        err_output(1, b"")
                    }
                }
                ("grep", ["-rlxF", "-e", _, "--", dir]) if !s.dirs.contains(*dir) => {
                    err_output(2, format!("grep: {dir}: No such file or directory").as_bytes())
                }
                ("grep", ["-rlxF", "-e", id, "--", dir]) => {
                    let prefix = format!("{dir}/");
                    let hits: Vec<&str> = s
                        .files
                        .iter()
                        .filter(|(path, (content, _))| {
                            path.starts_with(&prefix) && content.lines().any(|l| l == *id)
                        })
                        .map(|(path, _)| path.as_str())
                        .collect();
                    if hits.is_empty() {
                        err_output(1, b"")
                    } else {
                        ok_output(format!("{}\n", hits.join("\n")).as_bytes())
                    }
                }
                ("ss", [.., port]) => {
                    let port: u16 = port.trim_start_matches(':').parse().expect("ss port");
                    if s.listeners.contains(&port) {
                        ok_output(format!("LISTEN 0 511 0.0.0.0:{port} 0.0.0.0:*\n").as_bytes())
                    } else {
                        ok_output(b"")
                    }
                }
                ("sh", ["-c", script, "sh", path, mode]) if *script == WRITE_FILE_SCRIPT => {
                    let content = String::from_utf8_lossy(stdin).into_owned();
                    s.files
                        .insert((*path).to_string(), (content, (*mode).to_string()));
                    ok_output(b"")
                }
                ("sh", ["-c", script, "sh", id, path]) if *script == CLAIM_ENTRY_SCRIPT => {
                    if s.files.contains_key(*path) {
                        err_output(1, b"sh: cannot create: File exists")
                    } else {
                        s.files
                            .insert((*path).to_string(), (format!("{id}\n"), "0644".to_string()));
                        ok_output(b"")
                    }
                }
                ("sh", ["-c", _, "sh", tool]) => {
                    if s.missing_tools.contains(*tool) {
                        err_output(127, b"")
                    } else {
                        ok_output(b"")
                    }
                }
                ("systemctl", ["status", ..]) => Output {
                    status: exit_status(s.status_code),
                    stdout: b"* unit.latent.service\n   Active: active (running)\n".to_vec(),
                    stderr: Vec::new(),
                },
                ("systemctl", _) => ok_output(b""),
                ("certbot", ["show_account", ..]) => {
                    if s.acme_account {
                        ok_output(b"Account details for server https://acme-v02.api.letsencrypt.org/directory:\n")
                    } else {
                        err_output(1, b"Could not find an existing account for server")
                    }
                }
                ("certbot", ["register", ..]) => {
                    if s.acme_account {
                        err_output(1, b"There is an existing account")
                    } else {
                        s.acme_account = true;
                        ok_output(b"Account registered.\n")
                    }
                }
                ("apt-get", ["update", ..]) => ok_output(b"Reading package lists...\n"),
                ("env", ["DEBIAN_FRONTEND=noninteractive", "apt-get", "install", "-y", "-q", packages @ ..]) => {
                    for package in packages {
                        let tool = match *package {
                            "iproute2" => "ss",
                            "python3-certbot-nginx" => continue,
                            other => other,
                        };
                        s.missing_tools.remove(tool);
                    }
                    ok_output(b"Setting up nginx ...\n")
                }
                ("certbot", _) => ok_output(b"Requesting a certificate\nCongratulations!\n"),
                ("journalctl", _) => Output {
                    status: exit_status(s.journal_code),
                    stdout: s.journal.iter().map(|l| format!("{l}\n")).collect::<String>().into_bytes(),
                    stderr: Vec::new(),
                },
                _ => err_output(127, b"command not found"),
            }
        })
    }
}

fn entry(port: u16) -> String {
    latent_cli::domain::remote::registry_entry(port)
}

impl RemoteShell for FakeHost {
    async fn exec(&self, command: &RemoteCommand) -> Result<Output> {
        tokio::task::yield_now().await;
        Ok(self.interpret(command, b""))
    }

    async fn exec_with_stdin(&self, command: &RemoteCommand, input: &[u8]) -> Result<Output> {
        tokio::task::yield_now().await;
        Ok(self.interpret(command, input))
    }

    async fn exec_streaming(
        &self,
        command: &RemoteCommand,
        _mode: StreamMode,
        on_line: &mut (dyn FnMut(&str) + Send),
    ) -> Result<Output> {
        tokio::task::yield_now().await;
        let mut output = self.interpret(command, b"");
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            on_line(line);
        }
        output.stdout.clear();
        Ok(output)
    }

    fn remote_url(&self, path: &str) -> String {
        format!("ssh://deploy@fake.host:22{path}")
    }
}

// ── Connector ────────────────────────────────────────────────────────────────

/// Hands out the same [`FakeHost`] on every connect and counts connections.
#[derive(Clone, Default)]
pub struct FakeConnector {
    pub host: FakeHost,
    connects: Arc<AtomicUsize>,
    unreachable: bool,
}

impl FakeConnector {
    pub fn new(host: FakeHost) -> Self {
        Self {
            host,
            connects: Arc::new(AtomicUsize::new(0)),
            unreachable: false,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl RemoteConnector for FakeConnector {
    type Shell = FakeHost;

    async fn connect(&self) -> Result<FakeHost> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(RemoteError::ConnectivityFailure {
                host: "fake.host".to_string(),
                detail: "connection refused".to_string(),
            }
            .into());
        }
        Ok(self.host.clone())
    }
}

// ── Local project fakes ──────────────────────────────────────────────────────

/// Project store held in memory.
pub struct MemoryProjectStore {
    root: PathBuf,
    record: Mutex<Option<ProjectRecord>>,
    checkpoint: Mutex<Option<ProvisionCheckpoint>>,
    /// `completed` value of every checkpoint save, in order.
    pub saves: Mutex<Vec<u8>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/home/dev/app"),
            record: Mutex::new(None),
            checkpoint: Mutex::new(None),
            saves: Mutex::new(Vec::new()),
        }
    }

    pub fn with_record(record: ProjectRecord) -> Self {
        let store = Self::new();
        *store.record.lock().expect("lock") = Some(record);
        store
    }

    pub fn record(&self) -> Option<ProjectRecord> {
        self.record.lock().expect("lock").clone()
    }

    pub fn checkpoint(&self) -> Option<ProvisionCheckpoint> {
        self.checkpoint.lock().expect("lock").clone()
    }

    pub fn set_checkpoint(&self, checkpoint: ProvisionCheckpoint) {
        *self.checkpoint.lock().expect("lock") = Some(checkpoint);
    }
}

impl ProjectStore for MemoryProjectStore {
    fn project_root(&self) -> &Path {
        &self.root
    }

    async fn load_record(&self) -> Result<Option<ProjectRecord>> {
        Ok(self.record())
    }

    async fn save_record(&self, record: &ProjectRecord) -> Result<()> {
        *self.record.lock().expect("lock") = Some(record.clone());
        Ok(())
    }

    async fn load_checkpoint(&self) -> Result<Option<ProvisionCheckpoint>> {
        Ok(self.checkpoint())
    }

    async fn save_checkpoint(&self, checkpoint: &ProvisionCheckpoint) -> Result<()> {
        self.saves.lock().expect("lock").push(checkpoint.completed);
        self.set_checkpoint(checkpoint.clone());
        Ok(())
    }

    async fn clear_checkpoint(&self) -> Result<()> {
        *self.checkpoint.lock().expect("lock") = None;
        Ok(())
    }
}

/// Working tree with a configurable entry script; records linked remotes.
pub struct FakeProjectDir {
    entry_point: bool,
    pub remotes: Mutex<Vec<(String, String)>>,
}

impl FakeProjectDir {
    pub fn with_entry_point() -> Self {
        Self {
            entry_point: true,
            remotes: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self {
            entry_point: false,
            remotes: Mutex::new(Vec::new()),
        }
    }
}

impl ProjectDir for FakeProjectDir {
    fn has_entry_point(&self) -> bool {
        self.entry_point
    }

    async fn link_remote(&self, name: &str, url: &str) -> Result<()> {
        self.remotes
            .lock()
            .expect("lock")
            .push((name.to_string(), url.to_string()));
        Ok(())
    }
}

// ── Port candidates ──────────────────────────────────────────────────────────

/// Yields queued candidates in order, then repeats the last one forever.
pub struct QueueCandidates {
    queue: Mutex<VecDeque<u16>>,
}

impl QueueCandidates {
    pub fn new(ports: &[u16]) -> Self {
        Self {
            queue: Mutex::new(ports.iter().copied().collect()),
        }
    }
}

impl PortCandidates for QueueCandidates {
    fn next_candidate(&self) -> u16 {
        let mut queue = self.queue.lock().expect("lock");
        if queue.len() > 1 {
            queue.pop_front().expect("non-empty queue")
        } else {
            *queue.front().expect("candidate queue must not be empty")
        }
    }
}

// ── Reporters ────────────────────────────────────────────────────────────────

/// A no-op reporter that discards all progress messages.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn step(&self, _message: &str) {}
    fn success(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn output(&self, _line: &str) {}
}

/// Collects every event as `"<kind>: <message>"`.
#[derive(Default)]
pub struct RecordingReporter {
    pub events: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().expect("lock").clone()
    }

    fn push(&self, kind: &str, message: &str) {
        self.events
            .lock()
            .expect("lock")
            .push(format!("{kind}: {message}"));
    }
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.push("step", message);
    }
    fn success(&self, message: &str) {
        self.push("success", message);
    }
    fn warn(&self, message: &str) {
        self.push("warn", message);
    }
    fn output(&self, line: &str) {
        self.push("output", line);
    }
}
