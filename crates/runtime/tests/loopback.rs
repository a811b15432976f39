//! End-to-end gateway exercise over a real localhost TCP socket with
//! mock hardware standing in for the solenoid bank and serial link.

use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use common::SharedState;
use hardware::{HardwareError, MaskPort, SolenoidBank};
use runtime::gateway::run_gateway;

#[derive(Clone, Default)]
struct MockBank {
    levels: Arc<Mutex<Vec<(usize, bool)>>>,
}

impl SolenoidBank for MockBank {
    fn set(&mut self, index: usize, high: bool) -> Result<(), HardwareError> {
        self.levels.lock().unwrap().push((index, high));
        Ok(())
    }
}

#[derive(Clone, Default)]
struct MockPort {
    masks: Arc<Mutex<Vec<String>>>,
}

impl MaskPort for MockPort {
    fn send_mask(&self, bits: &str) {
        self.masks.lock().unwrap().push(bits.to_owned());
    }
}

struct Harness {
    client: TcpStream,
    state: Arc<SharedState>,
    bank: MockBank,
    port: MockPort,
    gateway: thread::JoinHandle<()>,
}

fn start_gateway(actuator_count: usize) -> Harness {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let client = TcpStream::connect(addr).unwrap();
    let (server, _) = listener.accept().unwrap();

    let state = Arc::new(SharedState::new(actuator_count));
    let bank = MockBank::default();
    let port = MockPort::default();

    let gateway = {
        let state = Arc::clone(&state);
        let bank = bank.clone();
        let port: Arc<dyn MaskPort> = Arc::new(port.clone());
        thread::spawn(move || run_gateway(server, state, Box::new(bank), port))
    };

    Harness {
        client,
        state,
        bank,
        port,
        gateway,
    }
}

fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn command_frame_reaches_serial_and_solenoids() {
    let mut harness = start_gateway(1);

    harness.client.write_all(b"C1010101010101010").unwrap();

    let port = harness.port.clone();
    assert!(wait_until(Duration::from_secs(2), || {
        !port.masks.lock().unwrap().is_empty()
    }));
    assert_eq!(*harness.port.masks.lock().unwrap(), vec!["101010101010"]);
    assert_eq!(
        *harness.bank.levels.lock().unwrap(),
        vec![(0, true), (1, false), (2, true), (3, false)]
    );

    drop(harness.client);
    harness.gateway.join().unwrap();
    assert!(harness.state.stop_requested());
}

#[test]
fn actuation_frame_updates_shared_array() {
    let mut harness = start_gateway(8);

    let mut frame = vec![b'W'];
    for _ in 0..8 {
        frame.extend_from_slice(&1.5f64.to_le_bytes());
    }
    harness.client.write_all(&frame).unwrap();

    let state = Arc::clone(&harness.state);
    assert!(wait_until(Duration::from_secs(2), || {
        state.actuators().values() == vec![1.5; 8]
    }));

    drop(harness.client);
    harness.gateway.join().unwrap();
}

#[test]
fn unknown_tags_and_bad_masks_do_not_stop_the_gateway() {
    let mut harness = start_gateway(1);

    // Unknown tag, then a malformed mask, then a valid command.
    harness.client.write_all(b"X").unwrap();
    harness.client.write_all(b"C10101010101010xy").unwrap();
    harness.client.write_all(b"C0000000000001111").unwrap();

    let bank = harness.bank.clone();
    assert!(wait_until(Duration::from_secs(2), || {
        bank.levels.lock().unwrap().len() == 4
    }));
    assert!(!harness.state.stop_requested());
    assert_eq!(
        *harness.bank.levels.lock().unwrap(),
        vec![(0, true), (1, true), (2, true), (3, true)]
    );

    drop(harness.client);
    harness.gateway.join().unwrap();
}

#[test]
fn peer_close_is_fatal() {
    let harness = start_gateway(1);
    drop(harness.client);
    harness.gateway.join().unwrap();
    assert!(harness.state.stop_requested());
}
