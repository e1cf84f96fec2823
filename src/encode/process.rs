//! Supervision of external encoder processes: output draining, deadlines and error mapping.

use std::io::{Read, Write};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::foundation::error::{SketchError, SketchResult};

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const STDERR_TAIL_BYTES: usize = 2048;

/// Captured output of a finished process.
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

type Drain = JoinHandle<std::io::Result<Vec<u8>>>;
type Written = (Vec<u8>, std::io::Result<()>);

/// Writes buffers into a child's stdin on a dedicated thread so the caller can bound how long
/// it waits for each write.
struct StdinFeed {
    tx: Option<SyncSender<Vec<u8>>>,
    done: Receiver<Written>,
    handle: Option<JoinHandle<()>>,
}

impl StdinFeed {
    fn start(mut stdin: ChildStdin) -> Self {
        let (tx, rx) = mpsc::sync_channel::<Vec<u8>>(1);
        let (done_tx, done) = mpsc::channel::<Written>();
        let handle = std::thread::spawn(move || {
            for buf in rx {
                let res = stdin.write_all(&buf);
                let failed = res.is_err();
                if done_tx.send((buf, res)).is_err() || failed {
                    break;
                }
            }
        });
        Self {
            tx: Some(tx),
            done,
            handle: Some(handle),
        }
    }

    /// Close the pipe without joining. Used after a kill, when a grandchild may still hold the
    /// read end and keep the writer blocked.
    fn detach(mut self) {
        drop(self.tx.take());
        drop(self.handle.take());
    }

    /// Close the pipe and join the writer. The writer only exits once its current write
    /// returns, so the child must have exited or been killed when this can block.
    fn close(&mut self) {
        drop(self.tx.take());
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

/// A spawned child whose stdout/stderr are drained on background threads so it can never block
/// on a full pipe. The deadline, when given, runs from spawn and covers stdin writes as well as
/// the final wait.
pub(crate) struct Supervised {
    program: String,
    child: Child,
    stdout: Option<Drain>,
    stderr: Option<Drain>,
    feed: Option<StdinFeed>,
    deadline: Option<(Instant, Duration)>,
}

impl Supervised {
    /// Spawn `cmd` with piped stdout/stderr. With `pipe_stdin`, buffers are fed through
    /// [`Supervised::write_stdin`]; otherwise stdin is null.
    pub(crate) fn spawn(
        cmd: &mut Command,
        program: &str,
        pipe_stdin: bool,
        timeout: Option<Duration>,
    ) -> SketchResult<Self> {
        let stdin = if pipe_stdin {
            Stdio::piped()
        } else {
            Stdio::null()
        };
        cmd.stdin(stdin).stdout(Stdio::piped()).stderr(Stdio::piped());
        tracing::debug!(command = ?cmd, "spawning {program}");

        let mut child = cmd.spawn().map_err(|e| spawn_error(program, &e))?;
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);
        let feed = child.stdin.take().map(StdinFeed::start);
        Ok(Self {
            program: program.to_owned(),
            child,
            stdout,
            stderr,
            feed,
            deadline: timeout.map(|t| (Instant::now() + t, t)),
        })
    }

    /// Write `buf` to the child's stdin and hand the buffer back for reuse.
    ///
    /// A write still blocked at the deadline kills the child (transient error). A failed
    /// write reaps the child and reports its exit status with the stderr tail.
    pub(crate) fn write_stdin(&mut self, buf: Vec<u8>) -> SketchResult<Vec<u8>> {
        let program = self.program.clone();
        let Some(feed) = self.feed.as_mut() else {
            return Err(SketchError::encoder(format!("{program} stdin is closed")));
        };
        let sent = feed.tx.as_ref().is_some_and(|tx| tx.send(buf).is_ok());
        if !sent {
            return Err(self.pipe_failure("stdin writer stopped"));
        }

        let outcome = match self.deadline {
            Some((at, _)) => feed
                .done
                .recv_timeout(at.saturating_duration_since(Instant::now())),
            None => feed.done.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match outcome {
            Ok((buf, Ok(()))) => Ok(buf),
            Ok((_, Err(e))) => Err(self.pipe_failure(&e.to_string())),
            Err(RecvTimeoutError::Disconnected) => Err(self.pipe_failure("stdin writer stopped")),
            Err(RecvTimeoutError::Timeout) => Err(self.kill_on_deadline()),
        }
    }

    /// Close stdin and wait for exit, killing the process once the deadline has passed.
    pub(crate) fn wait(mut self) -> SketchResult<ProcessOutput> {
        self.reap()
    }

    fn reap(&mut self) -> SketchResult<ProcessOutput> {
        if let Some(mut feed) = self.feed.take() {
            feed.close();
        }
        let status = loop {
            match self.child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    return Err(SketchError::encoder(format!(
                        "failed to wait for {}: {e}",
                        self.program
                    )));
                }
            }
            if let Some((at, _)) = self.deadline
                && Instant::now() >= at
            {
                return Err(self.kill_on_deadline());
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let stdout = join_drain(self.stdout.take(), &self.program)?;
        let stderr = join_drain(self.stderr.take(), &self.program)?;
        Ok(ProcessOutput {
            status,
            stdout,
            stderr,
        })
    }

    fn kill_on_deadline(&mut self) -> SketchError {
        if let Err(e) = self.child.kill() {
            tracing::warn!(program = %self.program, "failed to kill timed out process: {e}");
        }
        let _ = self.child.wait();
        if let Some(feed) = self.feed.take() {
            feed.detach();
        }
        let limit = self.deadline.map(|(_, t)| t.as_secs_f64()).unwrap_or_default();
        SketchError::encoder_transient(format!("{} timed out after {limit}s", self.program))
    }

    /// The child stopped reading stdin: reap it so its own diagnostics reach the error.
    fn pipe_failure(&mut self, write_error: &str) -> SketchError {
        let program = self.program.clone();
        match self.reap() {
            Ok(out) => match check_status(&program, &out) {
                Err(e) => e,
                Ok(()) => SketchError::encoder(format!(
                    "failed to write to {program} stdin: {write_error}"
                )),
            },
            Err(e) => e,
        }
    }
}

impl Drop for Supervised {
    fn drop(&mut self) {
        // Never leave an encoder running behind an abandoned render.
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
        if let Some(feed) = self.feed.take() {
            feed.detach();
        }
    }
}

/// Run `cmd` to completion and fail unless it exits successfully.
pub fn run_checked(
    cmd: &mut Command,
    program: &str,
    timeout: Option<Duration>,
) -> SketchResult<ProcessOutput> {
    let out = Supervised::spawn(cmd, program, false, timeout)?.wait()?;
    check_status(program, &out)?;
    Ok(out)
}

pub(crate) fn check_status(program: &str, out: &ProcessOutput) -> SketchResult<()> {
    if out.status.success() {
        return Ok(());
    }
    Err(SketchError::encoder(format!(
        "{program} exited with status {}: {}",
        out.status,
        stderr_tail(&out.stderr)
    )))
}

/// Last few KiB of stderr, lossily decoded and trimmed.
pub(crate) fn stderr_tail(stderr: &[u8]) -> String {
    let start = stderr.len().saturating_sub(STDERR_TAIL_BYTES);
    String::from_utf8_lossy(&stderr[start..]).trim().to_owned()
}

fn drain<R: Read + Send + 'static>(mut r: R) -> Drain {
    std::thread::spawn(move || {
        let mut bytes = Vec::new();
        r.read_to_end(&mut bytes)?;
        Ok(bytes)
    })
}

fn join_drain(handle: Option<Drain>, program: &str) -> SketchResult<Vec<u8>> {
    match handle {
        Some(h) => h
            .join()
            .map_err(|_| SketchError::encoder(format!("{program} output drain thread panicked")))?
            .map_err(|e| SketchError::encoder(format!("{program} output read failed: {e}"))),
        None => Ok(Vec::new()),
    }
}

fn spawn_error(program: &str, e: &std::io::Error) -> SketchError {
    use std::io::ErrorKind;

    match e.kind() {
        ErrorKind::NotFound => SketchError::encoder(format!(
            "failed to spawn {program} (is it installed and on PATH?): {e}"
        )),
        ErrorKind::WouldBlock | ErrorKind::OutOfMemory | ErrorKind::Interrupted => {
            SketchError::encoder_transient(format!("failed to spawn {program}: {e}"))
        }
        _ => SketchError::encoder(format!("failed to spawn {program}: {e}")),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/process.rs"]
mod tests;
