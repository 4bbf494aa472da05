use crate::{
    config::Config,
    log::{log_level::LogLevel, log_msg::LogMsg, logger_handle::LoggerHandle},
};

use std::{
    fs::{self, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, SyncSender, TrySendError},
    thread::{self, JoinHandle},
    time::{SystemTime, UNIX_EPOCH},
};

#[cfg(feature = "log-debug")]
const FLUSH_BATCH_SIZE: u32 = 100;

#[cfg(not(feature = "log-debug"))]
const FLUSH_BATCH_SIZE: u32 = 1_000;

/// Bounded, non-blocking logger that writes to one file per process.
///
/// A background thread drains the queue into the file. It also forwards a
/// sample of the lines (every Warn/Error, one in `sample_every` of the rest)
/// to a second bounded channel that the GUI reads with [`Logger::try_recv_ui`].
pub struct Logger {
    handle: LoggerHandle,
    ui_log_rx: Receiver<String>,
    _thread: Option<JoinHandle<()>>,
    file_path: PathBuf,
}

impl Logger {
    /// Logger for the desktop client, placed per the `[Logging]` section.
    #[must_use]
    pub fn start_client(cap: usize, ui_cap: usize, sample_every: u32, config: &Config) -> Self {
        Self::start("client", "client_log_filename", "client_log_path", cap, ui_cap, sample_every, config)
    }

    /// Logger for the relay server, placed per the `[Logging]` section.
    #[must_use]
    pub fn start_server(cap: usize, ui_cap: usize, sample_every: u32, config: &Config) -> Self {
        Self::start("server", "server_log_filename", "server_log_path", cap, ui_cap, sample_every, config)
    }

    fn start(
        role: &str,
        name_key: &str,
        path_key: &str,
        cap: usize,
        ui_cap: usize,
        sample_every: u32,
        config: &Config,
    ) -> Self {
        let default_name = format!("peercall-{role}");
        let app_name = config.get_non_empty_or_default("Logging", name_key, &default_name);

        let dir = config
            .get_non_empty("Logging", path_key)
            .map_or_else(|| exe_dir_fallback_cwd().join("logs"), expand_path);
        Self::start_in_dir(dir, app_name, cap, ui_cap, sample_every)
    }

    /// Starts the writer thread for a file in `dir` (created if missing).
    ///
    /// The file is named `<app_name>-<unix secs>-pid<pid>.log`. If it cannot be
    /// opened the writer falls back to a file in the temp dir, then to
    /// `io::sink()`; logging never takes the process down.
    pub fn start_in_dir<D: AsRef<Path>>(
        dir: D,
        app_name: &str,
        cap: usize,
        ui_cap: usize,
        sample_every: u32,
    ) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let _ = fs::create_dir_all(&dir);

        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let file_path = dir.join(format!("{app_name}-{secs}-pid{}.log", std::process::id()));

        let (tx, rx) = mpsc::sync_channel::<LogMsg>(cap.max(1));
        let (ui_tx, ui_rx) = mpsc::sync_channel::<String>(ui_cap.max(1));

        let path_for_worker = file_path.clone();
        let sample_every = sample_every.max(1);

        let _thread = thread::Builder::new()
            .name("logger-worker".into())
            .spawn(move || write_loop(&path_for_worker, &rx, &ui_tx, sample_every))
            .ok();

        Self {
            handle: LoggerHandle { tx },
            ui_log_rx: ui_rx,
            _thread,
            file_path,
        }
    }

    /// Queues a line without blocking; dropped if the queue is full.
    ///
    /// # Errors
    ///
    /// Returns the rejected [`LogMsg`] when the queue is full or the writer is gone.
    pub fn try_log<S: Into<String>>(
        &self,
        level: LogLevel,
        text: S,
        target: &'static str,
    ) -> Result<(), TrySendError<LogMsg>> {
        self.handle.try_log(level, text, target)
    }

    #[must_use]
    pub fn handle(&self) -> LoggerHandle {
        self.handle.clone()
    }

    /// One sampled line for the GUI, if any is waiting.
    #[must_use]
    pub fn try_recv_ui(&self) -> Option<String> {
        self.ui_log_rx.try_recv().ok()
    }

    #[must_use]
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

fn write_loop(path: &Path, rx: &Receiver<LogMsg>, ui_tx: &SyncSender<String>, sample_every: u32) {
    let writer: Box<dyn Write + Send> = match OpenOptions::new().create(true).append(true).open(path) {
        Ok(f) => Box::new(f),
        Err(_) => {
            let fallback = std::env::temp_dir().join("peercall-fallback.log");
            match OpenOptions::new().create(true).append(true).open(fallback) {
                Ok(f) => Box::new(f),
                Err(_) => Box::new(io::sink()),
            }
        }
    };
    let mut out = BufWriter::new(writer);

    let mut sampled: u32 = 0;
    let mut lines_written: u32 = 0;
    let mut dropped_to_ui: usize = 0;

    while let Ok(m) = rx.recv() {
        let _ = writeln!(out, "{}", m.render());
        lines_written = lines_written.wrapping_add(1);
        if lines_written % FLUSH_BATCH_SIZE == 0 || m.level >= LogLevel::Warn {
            let _ = out.flush();
        }

        let forward = m.level >= LogLevel::Warn || {
            sampled = sampled.wrapping_add(1);
            sampled % sample_every == 0
        };
        if forward && ui_tx.try_send(format!("[{}] {}", m.level, m.text)).is_err() {
            dropped_to_ui += 1;
        }

        if dropped_to_ui >= 10 {
            let _ = ui_tx.try_send(format!("(logger) UI queue dropped {dropped_to_ui} lines"));
            dropped_to_ui = 0;
        }
    }

    let _ = out.flush();
}

/// Directory of the running executable, or the cwd when that is unknown.
fn exe_dir_fallback_cwd() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Expands a leading `~` to the home directory.
fn expand_path(path_str: &str) -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .ok()
        .map(PathBuf::from);

    match (path_str, home) {
        ("~", Some(home)) => home,
        (p, Some(home)) if p.starts_with("~/") || p.starts_with("~\\") => home.join(&p[2..]),
        (p, _) => PathBuf::from(p),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use std::time::{Duration, Instant};

    fn unique_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "peercall-logger-{tag}-{}-{}",
            std::process::id(),
            crate::clock::now_millis()
        ))
    }

    #[test]
    fn warn_lines_reach_file_and_ui_channel() {
        let dir = unique_dir("warn");
        let logger = Logger::start_in_dir(&dir, "test", 16, 16, 1000);

        logger
            .try_log(LogLevel::Warn, "target not found", "peercall::signaling")
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut ui_line = None;
        while Instant::now() < deadline && ui_line.is_none() {
            ui_line = logger.try_recv_ui();
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(ui_line.as_deref(), Some("[WARN] target not found"));

        let contents = fs::read_to_string(logger.file_path()).unwrap();
        assert!(contents.contains("target not found"));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn info_lines_are_sampled_for_ui() {
        let dir = unique_dir("sample");
        let logger = Logger::start_in_dir(&dir, "test", 64, 64, 3);

        for i in 0..6 {
            logger.try_log(LogLevel::Info, format!("line {i}"), "t").unwrap();
        }

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut got = Vec::new();
        while Instant::now() < deadline && got.len() < 2 {
            if let Some(l) = logger.try_recv_ui() {
                got.push(l);
            } else {
                thread::sleep(Duration::from_millis(5));
            }
        }
        assert_eq!(got, vec!["[INFO] line 2", "[INFO] line 5"]);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn tilde_expands_to_home() {
        if let Ok(home) = std::env::var("HOME") {
            assert_eq!(expand_path("~/logs"), PathBuf::from(home).join("logs"));
        }
        assert_eq!(expand_path("/var/log"), PathBuf::from("/var/log"));
    }
}
