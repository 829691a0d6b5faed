use std::io::Cursor;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use keylaunch_core::action_executor::SpawnError;
use keylaunch_core::history::SelectionHistory;
use keylaunch_core::model::Entry;
use keylaunch_core::runtime::{apply_event, run_event_loop, Flow, RuntimeError};
use keylaunch_core::session::{
    session_channel, LaunchMode, Launcher, SessionController, SessionEvent, SessionOptions,
};
use keylaunch_core::ui::{spawn_input_reader, IconLookup, LauncherView, ResultRow};

fn unique_temp_dir(label: &str) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!(
        "keylaunch-{label}-{}-{unique}",
        std::process::id()
    ))
}

struct StubLauncher {
    fail: bool,
}

impl Launcher for StubLauncher {
    fn launch(&mut self, command: &str) -> Result<(), SpawnError> {
        if self.fail {
            Err(SpawnError::Failed {
                command: command.to_string(),
                message: "denied".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Frame {
    Shown { query: String, names: Vec<String> },
    Hidden,
}

#[derive(Default)]
struct RecordingView {
    frames: Vec<Frame>,
}

impl LauncherView for RecordingView {
    fn show(&mut self, query: &str, rows: &[ResultRow], _notice: Option<&str>) {
        self.frames.push(Frame::Shown {
            query: query.to_string(),
            names: rows.iter().map(|row| row.name.clone()).collect(),
        });
    }

    fn hide(&mut self) {
        self.frames.push(Frame::Hidden);
    }
}

fn session(label: &str, launch_mode: LaunchMode, fail: bool) -> (SessionController, PathBuf) {
    let dir = unique_temp_dir(label);
    let session = SessionController::new(
        vec![
            Entry::new("Firefox", "firefox"),
            Entry::new("Files", "nautilus"),
            Entry::new("Terminal", "gnome-terminal"),
        ],
        SelectionHistory::load(&dir.join("history")),
        Box::new(StubLauncher { fail }),
        SessionOptions {
            suggestion_limit: 5,
            launch_mode,
        },
    );
    (session, dir)
}

fn no_icons() -> IconLookup {
    IconLookup {
        theme_dirs: Vec::new(),
        size: 48,
    }
}

#[test]
fn input_is_dropped_while_hidden() {
    let (mut session, _dir) = session("runtime-hidden", LaunchMode::Hide, false);

    let flow = apply_event(&mut session, SessionEvent::QueryChanged("fi".into())).unwrap();
    assert_eq!(flow, Flow::Continue);
    assert_eq!(session.query(), "");

    apply_event(&mut session, SessionEvent::LaunchRequested).unwrap();
    assert_eq!(session.history().count("Firefox"), 0);
}

#[test]
fn acceptor_failure_ends_the_loop_with_error() {
    let (mut session, _dir) = session("runtime-acceptor", LaunchMode::Hide, false);

    let result = apply_event(&mut session, SessionEvent::CoordinatorFailed("reset".into()));

    assert!(matches!(result, Err(RuntimeError::AcceptorFailed(ref message)) if message == "reset"));
}

#[test]
fn failed_launch_is_fatal_only_in_exit_mode() {
    let (mut resident, _dir) = session("runtime-fail-hide", LaunchMode::Hide, true);
    apply_event(&mut resident, SessionEvent::Activate).unwrap();
    let flow = apply_event(&mut resident, SessionEvent::LaunchRequested).unwrap();
    assert_eq!(flow, Flow::Continue);
    assert!(resident.notice().is_some());

    let (mut one_shot, _dir) = session("runtime-fail-exit", LaunchMode::Exit, true);
    apply_event(&mut one_shot, SessionEvent::Activate).unwrap();
    let result = apply_event(&mut one_shot, SessionEvent::LaunchRequested);
    assert!(matches!(result, Err(RuntimeError::Launch(_))));
}

#[test]
fn event_loop_renders_each_event_and_stops_on_quit() {
    let (mut session, dir) = session("runtime-loop", LaunchMode::Hide, false);
    let (handle, events) = session_channel();
    handle.activate().unwrap();
    handle.post(SessionEvent::QueryChanged("t".into())).unwrap();
    handle.post(SessionEvent::LaunchRequested).unwrap();
    handle.post(SessionEvent::Quit).unwrap();
    handle.activate().unwrap();

    let mut view = RecordingView::default();
    run_event_loop(&mut session, &events, &no_icons(), &mut view).unwrap();

    assert_eq!(
        view.frames,
        vec![
            Frame::Hidden,
            Frame::Shown {
                query: String::new(),
                names: vec!["Firefox".into(), "Files".into(), "Terminal".into()],
            },
            Frame::Shown {
                query: "t".into(),
                names: vec!["Terminal".into()],
            },
            Frame::Hidden,
        ]
    );
    assert_eq!(session.history().count("Terminal"), 1);
    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn terminal_input_drives_the_session() {
    let (mut session, dir) = session("runtime-input", LaunchMode::Exit, false);
    let (handle, events) = session_channel();
    handle.activate().unwrap();
    let reader = spawn_input_reader(Cursor::new("fi\n:down\n\n"), handle).unwrap();
    reader.join().unwrap();

    let mut view = RecordingView::default();
    run_event_loop(&mut session, &events, &no_icons(), &mut view).unwrap();

    assert_eq!(session.history().count("Files"), 1);
    assert!(events.recv_timeout(Duration::from_millis(50)).is_err());
    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn closed_input_keeps_the_leader_resident() {
    let (mut session, _dir) = session("runtime-closed-input", LaunchMode::Hide, false);
    let (handle, events) = session_channel();
    spawn_input_reader(Cursor::new(""), handle.clone())
        .unwrap()
        .join()
        .unwrap();

    let acceptor = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        handle.activate().unwrap();
    });
    let mut view = RecordingView::default();
    run_event_loop(&mut session, &events, &no_icons(), &mut view).unwrap();
    acceptor.join().unwrap();

    assert!(session.is_visible());
    assert_eq!(
        view.frames,
        vec![
            Frame::Hidden,
            Frame::Shown {
                query: String::new(),
                names: vec!["Firefox".into(), "Files".into(), "Terminal".into()],
            },
        ]
    );
}
