use std::io::{self, Write};
use std::path::Path;
use std::process::{Child, Command};
use std::sync::{Arc, Mutex};
use tracing::Dispatch;

/// A `sleep` child process that is killed and reaped when dropped.
pub(crate) struct SleepingProcess {
    child: Child,
    reaped: bool,
}

impl SleepingProcess {
    pub(crate) fn spawn(secs: u64) -> Self {
        let child = Command::new("sleep")
            .arg(secs.to_string())
            .spawn()
            .unwrap_or_else(|e| panic!("failed to spawn sleep: {}", e));
        Self {
            child,
            reaped: false,
        }
    }

    pub(crate) fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Kill the child and wait for it so its pid stops existing.
    pub(crate) fn kill_and_reap(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        self.reaped = true;
    }
}

impl Drop for SleepingProcess {
    fn drop(&mut self) {
        if !self.reaped {
            self.kill_and_reap();
        }
    }
}

/// A pid that cannot belong to a running process.
pub(crate) fn unused_pid() -> u32 {
    // Above Linux's largest pid_max (2^22) but still a valid pid_t.
    let pid = 39_578_340;
    assert!(
        !crate::job::is_process_alive(pid),
        "made-up pid {} exists on this host",
        pid
    );
    pid
}

/// Write raw lock file content, creating parent directories.
pub(crate) fn write_lock_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// In-memory log output shared with a test subscriber.
#[derive(Clone, Default)]
pub(crate) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub(crate) fn contents(&self) -> String {
        let buf = self.0.lock().unwrap_or_else(|poison| poison.into_inner());
        String::from_utf8_lossy(&buf).to_string()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let mut buf = self.0.lock().unwrap_or_else(|poison| poison.into_inner());
        buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A log sink that records every event at debug level and above.
pub(crate) fn capture_logs() -> (Dispatch, CapturedLogs) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    (Dispatch::new(subscriber), logs)
}
