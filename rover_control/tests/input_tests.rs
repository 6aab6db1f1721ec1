//! Input worker tests over real sockets and files.

use rover_common::config::InputConfig;
use rover_common::consts::{JOYSTICK_AXIS_RX, JOYSTICK_AXIS_RY, JOYSTICK_AXIS_X, JOYSTICK_AXIS_Y};
use rover_common::shutdown::ShutdownToken;
use rover_control::InputAxisVector;
use rover_control::input::InputManager;
use rover_control::input::joystick::{JS_EVENT_AXIS, JS_EVENT_INIT, JsEvent, JoystickWorker};
use rover_control::input::network::NetworkWorker;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn wait_for(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

fn loopback_config(timeout_ms: u64) -> InputConfig {
    InputConfig {
        joystick_path: PathBuf::from("/nonexistent/js0"),
        udp_port: 0,
        network_timeout_ms: timeout_ms,
        ..InputConfig::default()
    }
}

fn send(target: SocketAddr, payload: &str) {
    let sender = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let target = SocketAddr::from((Ipv4Addr::LOCALHOST, target.port()));
    sender.send_to(payload.as_bytes(), target).unwrap();
}

#[test]
fn test_udp_round_trip_sets_slots() {
    let axes = Arc::new(InputAxisVector::new());
    let shutdown = ShutdownToken::new();
    let worker = NetworkWorker::bind(&loopback_config(1000), Arc::clone(&axes), shutdown.clone())
        .expect("bind loopback");
    let addr = worker.local_addr();
    let handle = thread::spawn(move || worker.run());

    send(addr, r#"{"joysticks":{"left":[0.5,0.0],"right":[0,0]}}"#);
    assert!(wait_for(Duration::from_secs(1), || axes.get(JOYSTICK_AXIS_X) != 0));
    assert_eq!(axes.get(JOYSTICK_AXIS_X), 16383);
    assert_eq!(axes.get(JOYSTICK_AXIS_Y), 0);
    assert_eq!(axes.get(JOYSTICK_AXIS_RX), 0);
    assert_eq!(axes.get(JOYSTICK_AXIS_RY), 0);

    shutdown.request();
    handle.join().unwrap();
}

#[test]
fn test_malformed_datagram_does_not_stop_listener() {
    let axes = Arc::new(InputAxisVector::new());
    let shutdown = ShutdownToken::new();
    let worker = NetworkWorker::bind(&loopback_config(1000), Arc::clone(&axes), shutdown.clone())
        .expect("bind loopback");
    let addr = worker.local_addr();
    let handle = thread::spawn(move || worker.run());

    send(addr, "not json at all");
    send(addr, r#"{"joysticks":{"right":[0.0,1.0]}}"#);
    assert!(wait_for(Duration::from_secs(1), || {
        axes.get(JOYSTICK_AXIS_RY) == -32767
    }));

    shutdown.request();
    handle.join().unwrap();
}

#[test]
fn test_network_silence_returns_to_neutral() {
    let axes = Arc::new(InputAxisVector::new());
    let shutdown = ShutdownToken::new();
    let worker = NetworkWorker::bind(&loopback_config(200), Arc::clone(&axes), shutdown.clone())
        .expect("bind loopback");
    let addr = worker.local_addr();
    let handle = thread::spawn(move || worker.run());

    send(addr, r#"{"joysticks":{"left":[1.0,1.0]}}"#);
    assert!(wait_for(Duration::from_secs(1), || axes.get(JOYSTICK_AXIS_X) != 0));
    // Timeout plus one receive-timeout tick.
    assert!(wait_for(Duration::from_secs(2), || axes.snapshot() == [0; 8]));

    shutdown.request();
    handle.join().unwrap();
}

#[test]
fn test_missing_joystick_keeps_retrying() {
    let axes = Arc::new(InputAxisVector::new());
    axes.set(JOYSTICK_AXIS_X, 777);
    let shutdown = ShutdownToken::new();
    let worker = JoystickWorker::new(
        PathBuf::from("/nonexistent/js0"),
        Arc::clone(&axes),
        shutdown.clone(),
    );
    let stats = worker.stats();
    let handle = thread::spawn(move || worker.run());

    thread::sleep(Duration::from_millis(2_300));
    assert!(!handle.is_finished());
    let attempts = stats.open_attempts.load(Ordering::Relaxed);
    assert!((2..=4).contains(&attempts), "{attempts} open attempts");
    assert!(!stats.connected.load(Ordering::Relaxed));
    // Absence is not a reason to touch prior values.
    assert_eq!(axes.get(JOYSTICK_AXIS_X), 777);

    let stop = Instant::now();
    shutdown.request();
    handle.join().unwrap();
    assert!(stop.elapsed() < Duration::from_millis(500));
}

#[test]
fn test_joystick_events_from_device_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("js0");
    let events = [
        JsEvent {
            time_ms: 1,
            value: -20000,
            kind: JS_EVENT_AXIS | JS_EVENT_INIT,
            number: 1,
        },
        JsEvent {
            time_ms: 2,
            value: 999,
            kind: JS_EVENT_AXIS,
            number: 2,
        },
        JsEvent {
            time_ms: 3,
            value: 12345,
            kind: JS_EVENT_AXIS,
            number: 3,
        },
    ];
    let bytes: Vec<u8> = events.iter().flat_map(|e| e.encode()).collect();
    std::fs::write(&path, bytes).unwrap();

    let axes = Arc::new(InputAxisVector::new());
    let shutdown = ShutdownToken::new();
    let worker = JoystickWorker::new(path, Arc::clone(&axes), shutdown.clone());
    let handle = thread::spawn(move || worker.run());

    assert!(wait_for(Duration::from_secs(1), || {
        axes.get(JOYSTICK_AXIS_Y) == -20000 && axes.get(JOYSTICK_AXIS_RX) == 12345
    }));
    assert_eq!(axes.get(2), 0);

    shutdown.request();
    handle.join().unwrap();
}

/// Create a named pipe at `path`.
fn make_fifo(path: &std::path::Path) {
    use std::os::unix::ffi::OsStrExt;
    let c_path = std::ffi::CString::new(path.as_os_str().as_bytes()).unwrap();
    assert_eq!(unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) }, 0);
}

/// Hold the pipe's write side open. Read-write so the open never blocks.
fn open_writer(path: &std::path::Path) -> std::fs::File {
    std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .unwrap()
}

#[test]
fn test_joystick_reopens_after_read_error() {
    use std::io::Write;

    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("js0");
    make_fifo(&path);
    let event = |value| JsEvent {
        time_ms: 0,
        value,
        kind: JS_EVENT_AXIS,
        number: 0,
    };

    let mut writer = open_writer(&path);
    let axes = Arc::new(InputAxisVector::new());
    let shutdown = ShutdownToken::new();
    let worker = JoystickWorker::new(path.clone(), Arc::clone(&axes), shutdown.clone());
    let stats = worker.stats();
    let handle = thread::spawn(move || worker.run());

    writer.write_all(&event(1000).encode()).unwrap();
    assert!(wait_for(Duration::from_secs(1), || {
        axes.get(JOYSTICK_AXIS_X) == 1000 && stats.connected.load(Ordering::Relaxed)
    }));

    // Last writer gone: the next read is end-of-file.
    drop(writer);
    assert!(wait_for(Duration::from_secs(1), || {
        !stats.connected.load(Ordering::Relaxed)
    }));

    let mut writer = open_writer(&path);
    writer.write_all(&event(-3000).encode()).unwrap();
    assert!(wait_for(Duration::from_secs(3), || {
        stats.connected.load(Ordering::Relaxed) && axes.get(JOYSTICK_AXIS_X) == -3000
    }));
    // The first open plus at least one reopen.
    assert!(stats.open_attempts.load(Ordering::Relaxed) >= 2);

    shutdown.request();
    handle.join().unwrap();
}

#[test]
fn test_manager_runs_without_network_port() {
    // Occupy a port so the manager's bind fails.
    let blocker = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).unwrap();
    let config = InputConfig {
        udp_port: blocker.local_addr().unwrap().port(),
        ..loopback_config(1000)
    };

    let mut manager = InputManager::start(&config, ShutdownToken::new()).unwrap();
    assert!(manager.network_addr().is_none());
    manager.stop();
}
