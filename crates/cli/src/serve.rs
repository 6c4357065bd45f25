//! Daemon mode – newline-delimited JSON over a Unix socket.
//!
//! Any number of clients may connect, but every line is funnelled through a
//! single executor task that owns the session, so instructions are admitted
//! one at a time and the history never sees interleaved run/undo/redo.
//! The executor also owns shutdown: after an `exit` it admits nothing more
//! and terminates the process once the reply has gone out.

use engine::types::*;
use engine::Session;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// How long an exit waits for its reply to reach the client.
const EXIT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(2);

struct Job {
    line: String,
    reply: oneshot::Sender<(Report, Delivery)>,
}

/// Travels with a report to whoever forwards it to a client.
///
/// For an `exit` the executor waits on this before terminating; calling
/// [`Delivery::done`] or dropping it both release the wait.
pub struct Delivery(Option<oneshot::Sender<()>>);

impl Delivery {
    fn none() -> Self {
        Delivery(None)
    }

    pub fn done(mut self) {
        if let Some(tx) = self.0.take() {
            let _ = tx.send(());
        }
    }
}

/// Handle to the single-queue executor.
#[derive(Clone)]
pub struct Executor {
    tx: mpsc::Sender<Job>,
}

impl Executor {
    /// Spawn the task that owns `session`.
    ///
    /// Once a line reports termination the queue is closed, so nothing behind
    /// the exit runs, and the process ends after the reply is delivered.
    pub fn spawn(mut session: Session) -> Self {
        let (tx, mut rx) = mpsc::channel::<Job>(64);
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let report = session.handle_line(&job.line);
                let code = match report.terminate_code() {
                    Some(code) => code,
                    None => {
                        let _ = job.reply.send((report, Delivery::none()));
                        continue;
                    }
                };

                rx.close();
                let (delivered, wait) = oneshot::channel();
                let _ = job.reply.send((report, Delivery(Some(delivered))));
                if tokio::time::timeout(EXIT_DELIVERY_TIMEOUT, wait).await.is_err() {
                    tracing::warn!("exit reply not delivered in time");
                }
                tracing::info!(code, "exit executed; stopping daemon");
                session.context().process().terminate(code);
            }
        });
        Self { tx }
    }

    /// Queue one line and wait for its report. `None` once the executor has
    /// stopped admitting work.
    pub async fn submit(&self, line: String) -> Option<(Report, Delivery)> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Job { line, reply }).await.ok()?;
        rx.await.ok()
    }
}

pub async fn handle_request(line: &str, executor: &Executor) -> (DaemonResponse, Delivery) {
    let req: DaemonRequest = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            let response = DaemonResponse {
                id: "unknown".into(),
                result: None,
                error: Some(ErrorInfo {
                    code: ErrorCode::InvalidInput,
                    message: format!("invalid JSON request: {}", e),
                }),
            };
            return (response, Delivery::none());
        }
    };

    match executor.submit(req.line).await {
        Some((report, delivery)) => (
            DaemonResponse {
                id: req.id,
                result: Some(report),
                error: None,
            },
            delivery,
        ),
        None => (
            DaemonResponse {
                id: req.id,
                result: None,
                error: Some(ErrorInfo {
                    code: ErrorCode::InternalError,
                    message: "executor has stopped".into(),
                }),
            },
            Delivery::none(),
        ),
    }
}

#[cfg(unix)]
pub async fn run_daemon(socket_path: std::path::PathBuf, session: Session) -> anyhow::Result<()> {
    use anyhow::Context;
    use tokio::net::UnixListener;

    // Remove stale socket if it exists
    let _ = std::fs::remove_file(&socket_path);

    let listener = UnixListener::bind(&socket_path)
        .with_context(|| format!("cannot bind socket {}", socket_path.display()))?;

    eprintln!("retrace daemon listening on {}", socket_path.display());

    let executor = Executor::spawn(session);
    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let executor = executor.clone();
                tokio::spawn(serve_connection(stream, executor));
            }
            Err(e) => {
                tracing::warn!(error = %e, "accept error");
            }
        }
    }
}

#[cfg(unix)]
async fn serve_connection(stream: tokio::net::UnixStream, executor: Executor) {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    let conn_id = uuid::Uuid::new_v4();
    tracing::info!(%conn_id, "client connected");

    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let (response, delivery) = handle_request(&line, &executor).await;
        let exiting = response
            .result
            .as_ref()
            .and_then(Report::terminate_code)
            .is_some();

        let mut resp_json = serde_json::to_string(&response).unwrap_or_else(|_| "{}".into());
        resp_json.push('\n');
        let written =
            writer.write_all(resp_json.as_bytes()).await.is_ok() && writer.flush().await.is_ok();
        delivery.done();

        if exiting {
            tracing::info!(%conn_id, "exit requested by client");
            return;
        }
        if !written {
            break;
        }
    }

    tracing::info!(%conn_id, "client disconnected");
}

#[cfg(not(unix))]
pub async fn run_daemon(_socket_path: std::path::PathBuf, _session: Session) -> anyhow::Result<()> {
    anyhow::bail!("serve requires Unix domain sockets")
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::platform::{MemoryStore, StdProcess};
    use engine::traits::ProcessOps;
    use engine::AppContext;
    use std::sync::{Arc, Mutex};

    fn executor() -> (Arc<MemoryStore>, Executor) {
        let store = Arc::new(MemoryStore::new());
        let ctx = AppContext::new(Box::new(store.clone()), Box::new(StdProcess));
        (store, Executor::spawn(Session::new(ctx)))
    }

    /// Records termination requests; panicking ends the executor task the
    /// way a real exit would end the process.
    struct RecordingProcess {
        codes: Arc<Mutex<Vec<i32>>>,
    }

    impl ProcessOps for RecordingProcess {
        fn terminate(&self, code: i32) -> ! {
            self.codes.lock().unwrap().push(code);
            panic!("terminated with code {code}");
        }
    }

    fn recording_executor() -> (Arc<MemoryStore>, Arc<Mutex<Vec<i32>>>, Executor) {
        let store = Arc::new(MemoryStore::new());
        let codes = Arc::new(Mutex::new(Vec::new()));
        let process = RecordingProcess {
            codes: codes.clone(),
        };
        let ctx = AppContext::new(Box::new(store.clone()), Box::new(process));
        (store, codes, Executor::spawn(Session::new(ctx)))
    }

    async fn wait_for_termination(codes: &Mutex<Vec<i32>>) -> Vec<i32> {
        for _ in 0..200 {
            if !codes.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        codes.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_request_round_trip() {
        let (store, executor) = executor();
        let (resp, _) = handle_request(r#"{"id":"1","line":"create a.txt hi"}"#, &executor).await;
        assert_eq!(resp.id, "1");
        assert!(resp.error.is_none());
        assert_eq!(resp.result.unwrap().status, Status::Pass);
        assert_eq!(store.snapshot()["a.txt"], b"hi");

        let (resp, _) = handle_request(r#"{"id":"2","line":"undo"}"#, &executor).await;
        assert_eq!(resp.result.unwrap().status, Status::Pass);
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_json_request() {
        let (_store, executor) = executor();
        let (resp, _) = handle_request("not json", &executor).await;
        assert_eq!(resp.id, "unknown");
        assert!(resp.result.is_none());
        assert_eq!(resp.error.unwrap().code, ErrorCode::InvalidInput);
    }

    #[tokio::test]
    async fn test_exit_is_answered_then_terminates_once() {
        let (store, codes, executor) = recording_executor();
        let (report, _) = executor.submit("create a.txt x".into()).await.unwrap();
        assert_eq!(report.status, Status::Pass);

        let (report, delivery) = executor.submit("exit".into()).await.unwrap();
        assert_eq!(report.terminate_code(), Some(0));
        // Still waiting for the reply to be delivered.
        assert!(codes.lock().unwrap().is_empty());

        // Nothing is admitted behind the exit.
        assert!(executor.submit("create late.txt x".into()).await.is_none());
        let (resp, _) = handle_request(r#"{"id":"9","line":"undo"}"#, &executor).await;
        assert_eq!(resp.error.unwrap().code, ErrorCode::InternalError);

        delivery.done();
        assert_eq!(wait_for_termination(&codes).await, vec![0]);
        assert!(!store.snapshot().contains_key("late.txt"));
        assert!(store.snapshot().contains_key("a.txt"));
    }

    #[tokio::test]
    async fn test_exit_terminates_even_if_reply_is_lost() {
        let (_store, codes, executor) = recording_executor();
        let (_, delivery) = executor.submit("exit".into()).await.unwrap();
        drop(delivery);
        assert_eq!(wait_for_termination(&codes).await, vec![0]);
        assert!(executor.submit("history".into()).await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_clients_are_serialized() {
        let (store, executor) = executor();
        let mut handles = Vec::new();
        for client in 0..8 {
            let executor = executor.clone();
            handles.push(tokio::spawn(async move {
                for n in 0..10 {
                    let line = format!("create c{client}-{n}.txt x");
                    let (report, _) = executor.submit(line).await.unwrap();
                    assert_eq!(report.status, Status::Pass);
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.snapshot().len(), 80);

        let (report, _) = executor.submit("history".into()).await.unwrap();
        assert_eq!(report.message.lines().count(), 80);
        assert!(report.message.lines().last().unwrap().starts_with(">  79"));
    }
}
