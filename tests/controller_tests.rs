use std::io::{self, BufReader, Cursor, Read};
use std::sync::Arc;
use std::time::Duration;

use futures::stream;
use maestro_demo::{
    read_lines, Channel, Config, Controller, Dispatcher, DispatcherState, ExitCheck, MotionPattern,
    ServoDevice, TransportError,
};
use parking_lot::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Speed(u8, u16),
    Acceleration(u8, u8),
    Target(u8, u16),
}

#[derive(Default, Clone)]
struct RecordingDevice {
    calls: Arc<Mutex<Vec<Call>>>,
    error_register: Option<u16>,
}

impl RecordingDevice {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    fn targets(&self) -> Vec<u16> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Target(_, target) => Some(target),
                _ => None,
            })
            .collect()
    }
}

impl ServoDevice for RecordingDevice {
    async fn set_target(&mut self, channel: Channel, target: u16) -> Result<(), TransportError> {
        self.calls.lock().push(Call::Target(channel.index(), target));
        Ok(())
    }

    async fn set_speed(&mut self, channel: Channel, speed: u16) -> Result<(), TransportError> {
        self.calls.lock().push(Call::Speed(channel.index(), speed));
        Ok(())
    }

    async fn set_acceleration(
        &mut self,
        channel: Channel,
        acceleration: u8,
    ) -> Result<(), TransportError> {
        self.calls.lock().push(Call::Acceleration(channel.index(), acceleration));
        Ok(())
    }

    async fn get_errors(&mut self) -> Result<u16, TransportError> {
        self.error_register.ok_or(TransportError::Unsupported)
    }
}

struct BrokenDevice;

impl ServoDevice for BrokenDevice {
    async fn set_target(&mut self, _channel: Channel, _target: u16) -> Result<(), TransportError> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged").into())
    }

    async fn set_speed(&mut self, _channel: Channel, _speed: u16) -> Result<(), TransportError> {
        Ok(())
    }

    async fn set_acceleration(
        &mut self,
        _channel: Channel,
        _acceleration: u8,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    async fn get_errors(&mut self) -> Result<u16, TransportError> {
        Err(io::Error::new(io::ErrorKind::TimedOut, "no reply").into())
    }
}

fn lines(input: &[&str]) -> impl futures::Stream<Item = io::Result<String>> + Unpin {
    stream::iter(input.iter().map(|l| Ok(l.to_string())).collect::<Vec<_>>())
}

fn fast_config(exit_check: ExitCheck) -> Config {
    Config {
        step_delay: Duration::from_millis(10),
        pattern_pause: Duration::from_millis(20),
        speed: 40,
        acceleration: 3,
        exit_check,
        ..Config::default()
    }
}

#[tokio::test]
async fn angle_sets_speed_acceleration_then_target() {
    let device = RecordingDevice::default();
    let mut controller = Controller::new(device.clone(), fast_config(ExitCheck::CycleStart));

    controller.run(lines(&["90"])).await.unwrap();

    let expected: Vec<Call> = (0..3)
        .flat_map(|ch| [Call::Speed(ch, 40), Call::Acceleration(ch, 3), Call::Target(ch, 6000)])
        .collect();
    assert_eq!(device.calls(), expected);
}

#[tokio::test]
async fn rejected_and_garbage_input_touch_nothing() {
    let device = RecordingDevice::default();
    let mut controller = Controller::new(device.clone(), Config::default());

    controller.run(lines(&["69", "111", "abc", ""])).await.unwrap();

    assert!(device.calls().is_empty());
    assert_eq!(controller.state(), DispatcherState::Idle);
}

#[tokio::test(start_paused = true)]
async fn demo_runs_until_cycle_end_after_interrupt() {
    let config = fast_config(ExitCheck::CycleStart);
    let cycle = MotionPattern::cycle_duration(&config);
    let device = RecordingDevice::default();
    let mut controller =
        Controller::with_dispatcher(device.clone(), Dispatcher::with_seed(config, 5));

    let start = Instant::now();
    controller.run(lines(&["d", "x"])).await.unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed >= cycle, "stopped after {:?}, cycle is {:?}", elapsed, cycle);
    assert!(elapsed < cycle + Duration::from_millis(10));
    assert_eq!(controller.state(), DispatcherState::Idle);

    let targets = device.targets();
    // ten steps on three channels, then the recenter
    assert_eq!(targets.len(), 33);
    assert_eq!(&targets[30..], &[6000, 6000, 6000]);
}

#[tokio::test(start_paused = true)]
async fn immediate_exit_recenters_without_waiting() {
    let device = RecordingDevice::default();
    let mut controller = Controller::with_dispatcher(
        device.clone(),
        Dispatcher::with_seed(fast_config(ExitCheck::Immediate), 5),
    );

    let start = Instant::now();
    controller.run(lines(&["d", "stop"])).await.unwrap();

    assert_eq!(start.elapsed(), Duration::ZERO);
    let targets = device.targets();
    assert_eq!(targets.len(), 6);
    assert_eq!(&targets[3..], &[6000, 6000, 6000]);
}

#[tokio::test(start_paused = true)]
async fn demo_keeps_running_after_input_closes() {
    let (tx, rx) = futures::channel::mpsc::unbounded::<io::Result<String>>();
    let device = RecordingDevice::default();
    let mut controller = Controller::with_dispatcher(
        device.clone(),
        Dispatcher::with_seed(fast_config(ExitCheck::PatternStart), 5),
    );

    tx.unbounded_send(Ok("d".to_string())).unwrap();
    let driver = async move {
        tokio::time::sleep(Duration::from_millis(55)).await;
        // The random pattern (30ms) and its pause (20ms) are done; the sweep is running.
        tx.unbounded_send(Ok("x".to_string())).unwrap();
    };

    let (result, _) = tokio::join!(controller.run(rx), driver);
    result.unwrap();

    let targets = device.targets();
    // three random steps, three sweep steps, recenter
    assert_eq!(targets.len(), 21);
    assert_eq!(&targets[9..18], &[8000, 8000, 8000, 4000, 4000, 4000, 6000, 6000, 6000]);
    assert_eq!(&targets[18..], &[6000, 6000, 6000]);
}

#[tokio::test]
async fn device_failure_ends_the_loop() {
    let mut controller = Controller::new(BrokenDevice, Config::default());
    let err = controller.run(lines(&["95", "100"])).await.unwrap_err();
    assert!(matches!(err, TransportError::Io(_)));
}

/// Yields `data`, then fails every read after it.
struct FailingReader {
    data: Cursor<Vec<u8>>,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.data.read(buf)? {
            0 => Err(io::Error::new(io::ErrorKind::BrokenPipe, "terminal gone")),
            n => Ok(n),
        }
    }
}

#[tokio::test]
async fn input_error_ends_the_loop() {
    let device = RecordingDevice::default();
    let mut controller = Controller::new(device.clone(), Config::default());
    let reader = FailingReader {
        data: Cursor::new(b"90\n".to_vec()),
    };

    let input = stream::iter(read_lines(BufReader::new(reader)));

    let err = controller.run(input).await.unwrap_err();
    assert!(matches!(err, TransportError::Io(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
    assert_eq!(device.targets(), vec![6000, 6000, 6000]);
}

#[test]
fn read_lines_decodes_invalid_utf8_lossily() {
    let lines: Vec<String> = read_lines(Cursor::new(b"\xff\xfe\n90\r\n75".to_vec()))
        .collect::<io::Result<_>>()
        .unwrap();
    assert_eq!(lines, vec!["\u{fffd}\u{fffd}\n", "90\r\n", "75"]);
}

#[tokio::test]
async fn invalid_utf8_line_is_ignored_when_idle() {
    let device = RecordingDevice::default();
    let mut controller = Controller::new(device.clone(), Config::default());
    let input = read_lines(Cursor::new(b"\xff\xfe\n90\n".to_vec()));

    controller.run(stream::iter(input)).await.unwrap();

    assert_eq!(device.targets(), vec![6000, 6000, 6000]);
    assert_eq!(controller.state(), DispatcherState::Idle);
}

#[tokio::test(start_paused = true)]
async fn invalid_utf8_line_stops_a_demo() {
    let device = RecordingDevice::default();
    let mut controller = Controller::with_dispatcher(
        device.clone(),
        Dispatcher::with_seed(fast_config(ExitCheck::Immediate), 5),
    );
    let input = read_lines(Cursor::new(b"d\n\xc3\x28\n".to_vec()));

    controller.run(stream::iter(input)).await.unwrap();

    let targets = device.targets();
    assert_eq!(targets.len(), 6);
    assert_eq!(&targets[3..], &[6000, 6000, 6000]);
    assert_eq!(controller.state(), DispatcherState::Idle);
}

#[tokio::test]
async fn end_of_input_leaves_last_angle_in_place() {
    let device = RecordingDevice::default();
    let mut controller = Controller::new(device.clone(), Config::default());

    controller.run(lines(&["75"])).await.unwrap();

    assert_eq!(device.targets(), vec![4500, 4500, 4500]);
    assert_eq!(controller.state(), DispatcherState::Idle);
}

#[tokio::test]
async fn park_recenters_all_channels() {
    let device = RecordingDevice::default();
    let mut controller = Controller::new(device.clone(), Config::default());

    controller.run(lines(&["75"])).await.unwrap();
    controller.park().await.unwrap();

    assert_eq!(device.targets(), vec![4500, 4500, 4500, 6000, 6000, 6000]);
}

#[tokio::test]
async fn error_report_is_best_effort() {
    let mut controller = Controller::new(RecordingDevice::default(), Config::default());
    controller.report_errors().await.unwrap();

    let device = RecordingDevice {
        error_register: Some(0x0011),
        ..RecordingDevice::default()
    };
    let mut controller = Controller::new(device, Config::default());
    controller.report_errors().await.unwrap();

    let mut controller = Controller::new(BrokenDevice, Config::default());
    assert!(controller.report_errors().await.is_err());
}

#[tokio::test]
async fn positions_report_unsupported_per_channel() {
    let mut controller = Controller::new(RecordingDevice::default(), Config::default());
    let positions = controller.positions().await;

    assert_eq!(positions.len(), 3);
    assert!(positions.iter().all(|(_, p)| matches!(p, Err(TransportError::Unsupported))));
}
