//! Process-level supervisor tests using `/bin/sh` scripts as workers.

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;

use hostbridge_protocol::{Action, codec};
use rstest::rstest;
use tempfile::TempDir;

use super::*;
use crate::correlator::RequestCorrelator;

const QUIET_WORKER: &str = "while read line; do :; done";
const ACK_WORKER: &str = r#"while read line; do echo '{"type":"result","status":"success","msg":"ack"}'; done"#;

/// Launcher that replays a queue of scripts; `None` entries and an empty
/// queue simulate spawn failures.
struct ScriptedLauncher {
    scripts: Mutex<VecDeque<Option<String>>>,
    launches: AtomicUsize,
}

impl ScriptedLauncher {
    fn new<I, S>(scripts: I) -> Arc<Self>
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into_iter().map(|s| s.map(Into::into)).collect()),
            launches: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Self::new(Vec::<Option<String>>::new())
    }

    fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

impl WorkerLauncher for ScriptedLauncher {
    fn launch(&self) -> Result<WorkerProcess, SidecarError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        let next = self.scripts.lock().expect("script queue").pop_front().flatten();
        match next {
            Some(script) => CommandLauncher::new("/bin/sh").arg("-c").arg(script).launch(),
            None => Err(SidecarError::SpawnFailed {
                program: PathBuf::from("/bin/sh"),
                message: String::from("scripted failure"),
                source: Arc::new(io::Error::other("scripted failure")),
            }),
        }
    }
}

fn supervise(launcher: &Arc<ScriptedLauncher>, max_attempts: u32) -> ProcessSupervisor {
    supervise_with_delay(launcher, max_attempts, Duration::from_millis(1))
}

fn supervise_with_delay(
    launcher: &Arc<ScriptedLauncher>,
    max_attempts: u32,
    delay: Duration,
) -> ProcessSupervisor {
    ProcessSupervisor::new(
        Arc::clone(launcher),
        RestartPolicy::new(max_attempts, delay),
        Duration::from_millis(200),
    )
}

fn current_generation(supervisor: &ProcessSupervisor) -> u64 {
    supervisor
        .inner
        .current()
        .map(|handle| handle.generation())
        .expect("worker handle installed")
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

#[test]
fn forwards_worker_replies_to_listeners() {
    let launcher = ScriptedLauncher::new([Some(ACK_WORKER)]);
    let supervisor = supervise(&launcher, 0);
    let subscription = supervisor.events().subscribe(8);

    supervisor.start().expect("starts");
    assert_eq!(supervisor.state(), SupervisorState::Running);
    supervisor
        .send(&Command::new(Action::Verify, "imx.to"))
        .expect("sends");

    let reply = subscription
        .recv_timeout(Duration::from_secs(5))
        .expect("reply arrives");
    assert!(reply.is_success());
    assert_eq!(reply.msg(), Some("ack"));

    supervisor.shutdown();
    assert_eq!(supervisor.state(), SupervisorState::Stopped);
    assert!(!supervisor.is_alive());
}

#[test]
fn malformed_output_is_skipped() {
    let script = concat!(
        r#"echo '{"type":"status","file":"/a.jpg","status":"Uploading"}'; "#,
        "echo 'not json'; ",
        r#"echo '{"type":"status","file":"/b.jpg","status":"Uploading"}'; "#,
        "while read line; do :; done",
    );
    let launcher = ScriptedLauncher::new([Some(script)]);
    let supervisor = supervise(&launcher, 0);
    let subscription = supervisor.events().subscribe(8);
    supervisor.start().expect("starts");

    let first = subscription
        .recv_timeout(Duration::from_secs(5))
        .expect("first event");
    let second = subscription
        .recv_timeout(Duration::from_secs(5))
        .expect("second event");
    assert_eq!(first.file(), Some("/a.jpg"));
    assert_eq!(second.file(), Some("/b.jpg"));
    assert!(supervisor.is_alive());
}

#[test]
fn successful_restart_resets_attempt_count() {
    let launcher = ScriptedLauncher::new([Some("exit 3"), None, None, Some(QUIET_WORKER)]);
    let supervisor = supervise(&launcher, 5);
    supervisor.start().expect("starts");

    assert!(wait_until(|| {
        launcher.launches() == 4 && supervisor.state() == SupervisorState::Running
    }));
    assert_eq!(supervisor.restart_attempts(), 0);
    assert!(supervisor.is_alive());
    supervisor.shutdown();
}

#[rstest]
#[case(1)]
#[case(3)]
fn exhausted_budget_is_permanent(#[case] max_attempts: u32) {
    let launcher = ScriptedLauncher::new([Some("exit 1")]);
    let supervisor = supervise(&launcher, max_attempts);
    let subscription = supervisor.events().subscribe(8);
    supervisor.start().expect("starts");

    assert!(wait_until(|| supervisor.state() == SupervisorState::Unavailable));
    let expected = usize::try_from(max_attempts).expect("fits") + 1;
    assert_eq!(launcher.launches(), expected);

    let notice = subscription
        .recv_timeout(Duration::from_secs(5))
        .expect("unavailable notice");
    assert_eq!(notice.kind(), EventKind::Error);
    assert_eq!(notice.msg(), Some(UNAVAILABLE_MESSAGE));

    thread::sleep(Duration::from_millis(50));
    assert_eq!(launcher.launches(), expected);
    assert!(matches!(
        supervisor.send(&Command::new(Action::Verify, "imx.to")),
        Err(SidecarError::Unavailable)
    ));
}

#[test]
fn send_restarts_a_stopped_worker_once() {
    let launcher = ScriptedLauncher::new([Some(QUIET_WORKER)]);
    let supervisor = supervise(&launcher, 0);

    supervisor
        .send(&Command::new(Action::Verify, "imx.to"))
        .expect("revives and sends");
    assert!(supervisor.is_alive());
    assert_eq!(supervisor.state(), SupervisorState::Running);
    supervisor.shutdown();
}

#[test]
fn send_reports_failure_when_restart_fails() {
    let launcher = ScriptedLauncher::failing();
    let supervisor = supervise(&launcher, 0);

    let result = supervisor.send(&Command::new(Action::Verify, "imx.to"));
    assert!(matches!(result, Err(SidecarError::CannotSend { .. })));
    assert_eq!(launcher.launches(), 1);
}

#[test]
fn start_surfaces_launch_errors() {
    let launcher = ScriptedLauncher::failing();
    let supervisor = supervise(&launcher, 0);
    assert!(matches!(
        supervisor.start(),
        Err(SidecarError::SpawnFailed { .. })
    ));
    assert_eq!(supervisor.state(), SupervisorState::Stopped);
}

#[test]
fn shutdown_is_idempotent() {
    let launcher = ScriptedLauncher::failing();
    let supervisor = supervise(&launcher, 0);
    supervisor.shutdown();
    supervisor.shutdown();
    assert_eq!(supervisor.state(), SupervisorState::Stopped);
}

#[test]
fn shutdown_kills_worker_that_ignores_stdin() {
    let launcher = ScriptedLauncher::new([Some("exec sleep 30")]);
    let supervisor = supervise(&launcher, 0);
    supervisor.start().expect("starts");

    let started = Instant::now();
    supervisor.shutdown();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!supervisor.is_alive());
    thread::sleep(Duration::from_millis(50));
    assert_eq!(launcher.launches(), 1);
}

#[test]
fn concurrent_senders_write_whole_lines() {
    let dir = TempDir::new().expect("temp dir");
    let capture = dir.path().join("commands.jsonl");
    let launcher = ScriptedLauncher::new([Some(format!("cat > '{}'", capture.display()))]);
    let supervisor = Arc::new(supervise(&launcher, 0));
    supervisor.start().expect("starts");

    let senders: Vec<_> = (0..8)
        .map(|worker| {
            let supervisor = Arc::clone(&supervisor);
            thread::spawn(move || {
                for index in 0..20 {
                    let command = Command::new(Action::Upload, "pixhost.to")
                        .with_files([format!("/batch/{worker}/{index}.jpg")]);
                    supervisor.send(&command).expect("sends");
                }
            })
        })
        .collect();
    for sender in senders {
        sender.join().expect("sender thread");
    }
    supervisor.shutdown();

    let written = fs::read_to_string(&capture).expect("capture file");
    let commands: Vec<Command> = written
        .lines()
        .map(|line| codec::decode(line.as_bytes()).expect("whole command line"))
        .collect();
    assert_eq!(commands.len(), 160);
}

#[test]
fn write_failure_and_end_of_file_restart_once() {
    let closes_input = concat!(
        "exec 0<&-; ",
        r#"echo '{"type":"log","msg":"input closed"}'; "#,
        "exec sleep 5",
    );
    let launcher = ScriptedLauncher::new([Some(closes_input), Some(QUIET_WORKER)]);
    let supervisor = supervise(&launcher, 3);
    let subscription = supervisor.events().subscribe(8);
    supervisor.start().expect("starts");
    let ready = subscription
        .recv_timeout(Duration::from_secs(5))
        .expect("worker closed its input");
    assert_eq!(ready.kind(), EventKind::Log);

    let result = supervisor.send(&Command::new(Action::Verify, "imx.to"));
    assert!(matches!(result, Err(SidecarError::CannotSend { .. })));

    assert!(wait_until(|| {
        launcher.launches() == 2 && supervisor.state() == SupervisorState::Running
    }));
    thread::sleep(Duration::from_millis(100));
    assert_eq!(launcher.launches(), 2);
    assert_eq!(supervisor.restart_attempts(), 0);
    supervisor.shutdown();
}

#[test]
fn concurrent_crash_reports_share_one_restart() {
    let launcher = ScriptedLauncher::new([Some(QUIET_WORKER), Some(QUIET_WORKER)]);
    let supervisor = supervise(&launcher, 3);
    supervisor.start().expect("starts");
    let generation = current_generation(&supervisor);

    let reporters: Vec<_> = (0..4)
        .map(|_| {
            let inner = Arc::clone(&supervisor.inner);
            thread::spawn(move || inner.handle_crash(generation))
        })
        .collect();
    for reporter in reporters {
        reporter.join().expect("reporter thread");
    }

    assert!(wait_until(|| supervisor.state() == SupervisorState::Running));
    thread::sleep(Duration::from_millis(100));
    assert_eq!(launcher.launches(), 2);
    assert_eq!(current_generation(&supervisor), generation + 1);
    supervisor.shutdown();
}

#[test]
fn requests_during_backoff_return_within_their_timeout() {
    let launcher = ScriptedLauncher::new([Some("exit 1")]);
    let supervisor = Arc::new(supervise_with_delay(
        &launcher,
        2,
        Duration::from_millis(1_500),
    ));
    supervisor.start().expect("starts");
    assert!(wait_until(|| supervisor.state() == SupervisorState::Restarting));

    let correlator = RequestCorrelator::new(Arc::clone(&supervisor), 8);
    let started = Instant::now();
    let reply = correlator.request(
        &Command::new(Action::Verify, "imx.to"),
        Duration::from_millis(100),
    );

    assert!(started.elapsed() < Duration::from_millis(1_000));
    assert_eq!(reply.kind(), EventKind::Error);
    assert_eq!(correlator.link().events().listener_count(), 0);
    supervisor.shutdown();
}
