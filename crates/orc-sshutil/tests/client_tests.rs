//! Remote client behaviour over a scripted transport

use async_trait::async_trait;
use orc_sshutil::{
    CommandOutput, Connection, Connector, RemoteClient, Result, Session, SessionError, SessionPool, SshConfig,
};
use orc_tasks::CancelSignal;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Scripted remote host
#[derive(Debug, Default)]
struct Remote {
    connect_failures: AtomicUsize,
    connect_attempts: AtomicUsize,
    results: Mutex<VecDeque<Result<CommandOutput>>>,
    hang: AtomicBool,
    commands: Mutex<Vec<(String, Vec<u8>)>>,
    signals: Mutex<Vec<String>>,
    closed_sessions: AtomicUsize,
}

impl Remote {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn fail_connects(&self, count: usize) {
        self.connect_failures.store(count, Ordering::SeqCst);
    }

    fn reply(&self, result: Result<CommandOutput>) {
        self.results.lock().push_back(result);
    }

    fn commands(&self) -> Vec<String> {
        self.commands.lock().iter().map(|(c, _)| c.clone()).collect()
    }
}

struct FakeConnector(Arc<Remote>);

struct FakeConnection(Arc<Remote>);

struct FakeSession(Arc<Remote>);

#[async_trait]
impl Connector for FakeConnector {
    type Connection = FakeConnection;

    async fn connect(&self, config: &SshConfig) -> Result<FakeConnection> {
        self.0.connect_attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.0.connect_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.0.connect_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(SessionError::connection(config.target(), "connection refused"));
        }
        Ok(FakeConnection(Arc::clone(&self.0)))
    }
}

#[async_trait]
impl Connection for FakeConnection {
    type Session = FakeSession;

    async fn open_session(&self) -> Result<FakeSession> {
        Ok(FakeSession(Arc::clone(&self.0)))
    }

    fn is_closed(&self) -> bool {
        false
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn exec(&self, command: &str, stdin: Vec<u8>) -> Result<CommandOutput> {
        self.0.commands.lock().push((command.to_string(), stdin));
        if self.0.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let next = self.0.results.lock().pop_front();
        next.unwrap_or_else(|| Ok(CommandOutput::success("ok")))
    }

    async fn signal(&self, signal: &str) -> Result<()> {
        self.0.signals.lock().push(signal.to_string());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.0.closed_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn config() -> SshConfig {
    SshConfig::new("10.0.0.4", "centos").with_retries(3, Duration::from_millis(1))
}

fn client(remote: &Arc<Remote>, config: SshConfig) -> (RemoteClient<FakeConnector>, Arc<SessionPool<FakeConnector>>) {
    let pool = Arc::new(SessionPool::new(FakeConnector(Arc::clone(remote))));
    (RemoteClient::new(Arc::clone(&pool), config), pool)
}

#[tokio::test]
async fn output_is_trimmed_of_nul_padding() {
    let remote = Remote::new();
    remote.reply(Ok(CommandOutput::success("3.10.0\0\0")));
    let (client, _) = client(&remote, config());

    assert_eq!(client.run_command("uname -r").await.unwrap(), "3.10.0");
    assert_eq!(remote.closed_sessions.load(Ordering::SeqCst), 1);
}

/// One connection per target, one session per command.
#[tokio::test]
async fn connection_is_reused() {
    let remote = Remote::new();
    let (client, pool) = client(&remote, config());

    client.run_command("true").await.unwrap();
    client.run_command("true").await.unwrap();

    let stats = pool.stats();
    assert_eq!(stats.connects, 1);
    assert_eq!(stats.cached, 1);
    assert_eq!(remote.closed_sessions.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn connection_failures_are_retried() {
    let remote = Remote::new();
    remote.fail_connects(2);
    let (client, _) = client(&remote, config());

    assert_eq!(client.run_command("true").await.unwrap(), "ok");
    assert_eq!(remote.connect_attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retries_are_bounded() {
    let remote = Remote::new();
    remote.fail_connects(10);
    let (client, _) = client(&remote, config().with_retries(2, Duration::from_millis(1)));

    let err = client.run_command("true").await.unwrap_err();

    assert!(matches!(err, SessionError::Connection { .. }));
    assert_eq!(remote.connect_attempts.load(Ordering::SeqCst), 3);
}

/// A command that ran and failed is not run again.
#[tokio::test]
async fn non_zero_exit_is_not_retried() {
    let remote = Remote::new();
    remote.reply(Ok(CommandOutput {
        status: 2,
        output: b"missing".to_vec(),
    }));
    let (client, _) = client(&remote, config());

    let err = client.run_command("cat /nope").await.unwrap_err();

    assert_eq!(
        err,
        SessionError::Exit {
            status: 2,
            output: "missing".into()
        }
    );
    assert_eq!(remote.commands(), vec!["cat /nope"]);
}

#[tokio::test]
async fn broken_connection_is_evicted() {
    let remote = Remote::new();
    remote.reply(Err(SessionError::Closed("eof".into())));
    let (client, pool) = client(&remote, config());

    assert_eq!(client.run_command("true").await.unwrap(), "ok");

    let stats = pool.stats();
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.connects, 2);
}

#[tokio::test]
async fn attempts_time_out() {
    let remote = Remote::new();
    remote.hang.store(true, Ordering::SeqCst);
    let config = config()
        .with_timeout(Duration::from_millis(20))
        .with_retries(1, Duration::from_millis(1));
    let (client, _) = client(&remote, config);

    let err = client.run_command("sleep 100").await.unwrap_err();

    assert_eq!(err, SessionError::Timeout { duration_ms: 20 });
    assert_eq!(remote.commands().len(), 2);
}

/// Files go through the scp sink protocol after creating the directory.
#[tokio::test]
async fn copy_file_uses_scp_sink() {
    let remote = Remote::new();
    let (client, _) = client(&remote, config());

    client
        .copy_file(b"hello", "/opt/app/run.sh", "0755")
        .await
        .unwrap();

    let commands = remote.commands.lock().clone();
    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0].0, "mkdir -p /opt/app");
    assert_eq!(commands[1].0, "scp -qt /opt/app");
    assert_eq!(commands[1].1, b"C0755 5 run.sh\nhello\0".to_vec());
}

#[tokio::test]
async fn copy_file_reports_directory_failure() {
    let remote = Remote::new();
    remote.reply(Ok(CommandOutput {
        status: 1,
        output: b"permission denied".to_vec(),
    }));
    let (client, _) = client(&remote, config());

    let err = client.copy_file(b"x", "/root/x", "0644").await.unwrap_err();

    assert!(matches!(err, SessionError::Transfer { ref path, .. } if path == "/root/x"));
    assert_eq!(remote.commands(), vec!["mkdir -p /root"]);
}

/// Cancelling kills the remote process and closes the session.
#[tokio::test]
async fn cancelled_command_is_killed() {
    let remote = Remote::new();
    remote.hang.store(true, Ordering::SeqCst);
    let (client, _) = client(&remote, config());
    let cancel = CancelSignal::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });
    let err = client.run_cancellable("tail -f /var/log/app", &cancel).await.unwrap_err();

    assert_eq!(err, SessionError::Cancelled);
    assert_eq!(*remote.signals.lock(), vec!["KILL".to_string()]);
    assert_eq!(remote.closed_sessions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancellable_command_completes() {
    let remote = Remote::new();
    remote.reply(Ok(CommandOutput::success("done")));
    let (client, _) = client(&remote, config());

    let output = client.run_cancellable("make", &CancelSignal::new()).await.unwrap();

    assert_eq!(output, "done");
    assert!(remote.signals.lock().is_empty());
}
