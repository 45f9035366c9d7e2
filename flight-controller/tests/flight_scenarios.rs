use std::cell::{Cell, RefCell};
use std::rc::Rc;

use approx::assert_abs_diff_eq;
use drone_flight_core::config::store::{RamStorage, RamStorageError};
use drone_flight_core::config::tuning::TuningConfig;
use drone_flight_core::control::control_loops::{CalibrationStatus, FlightComputer, FlightHardware};
use drone_flight_core::control::flight_state::FlightMode;
use drone_flight_core::drivers::barometer::Barometer;
use drone_flight_core::drivers::imu_sensors::{ImuSample, ImuSensor};
use drone_flight_core::output::motor_controller::MotorDriver;
use drone_flight_core::shared_core_values::{AtomicControllerInput, AtomicTelemetry};
use drone_flight_core::util::error::{BootError, CalibrationError, ControlLockError, TuningError};
use drone_flight_core::util::math::vectors::Vector3D;
use drone_flight_core::util::time::MonotonicClock;
use embedded_hal::delay::DelayNs;
use embedded_storage::{ReadStorage, Storage};
use shared_definitions::calibration::CalibrationRequest;
use shared_definitions::controller::ControllerInput;

const PASS_US: u64 = 500;
const PACKET_INTERVAL_US: u64 = 20_000;
const GROUND_ALTITUDE_M: f32 = 120.0;

#[derive(Default)]
struct ImuState {
    sample: ImuSample,
    fail_init: bool,
    init_calls: u32,
}

struct SimImu(Rc<RefCell<ImuState>>);

impl ImuSensor for SimImu {
    type Error = &'static str;

    fn init(&mut self) -> Result<(), Self::Error> {
        let mut state = self.0.borrow_mut();
        state.init_calls += 1;
        if state.fail_init {
            return Err("no ack");
        }
        Ok(())
    }

    fn read_raw(&mut self) -> Result<ImuSample, Self::Error> {
        Ok(self.0.borrow().sample)
    }
}

struct SimBarometer(Rc<Cell<f32>>);

impl Barometer for SimBarometer {
    type Error = ();

    fn init(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn read_altitude(&mut self) -> Result<f32, Self::Error> {
        Ok(self.0.get())
    }
}

struct SimMotors(Rc<RefCell<[u16; 4]>>);

impl MotorDriver for SimMotors {
    type Error = ();

    fn set_duty(&mut self, channel: usize, duty: u16) -> Result<(), Self::Error> {
        self.0.borrow_mut()[channel] = duty;
        Ok(())
    }
}

struct SimClock(Rc<Cell<u64>>);

impl MonotonicClock for SimClock {
    fn now_us(&self) -> u64 {
        self.0.get()
    }
}

struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

/// Flash that outlives a single flight computer, to check what survives a reboot.
struct SharedStorage(Rc<RefCell<RamStorage>>);

impl ReadStorage for SharedStorage {
    type Error = RamStorageError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.0.borrow_mut().read(offset, bytes)
    }

    fn capacity(&self) -> usize {
        self.0.borrow().capacity()
    }
}

impl Storage for SharedStorage {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        self.0.borrow_mut().write(offset, bytes)
    }
}

type Computer<'a> = FlightComputer<'a, SimImu, SimBarometer, SimMotors, SharedStorage, SimClock, NoDelay>;

struct Rig {
    imu: Rc<RefCell<ImuState>>,
    altitude: Rc<Cell<f32>>,
    duties: Rc<RefCell<[u16; 4]>>,
    now: Rc<Cell<u64>>,
    storage: Rc<RefCell<RamStorage>>,
    input: AtomicControllerInput,
    telemetry: AtomicTelemetry,
}

fn level_sample() -> ImuSample {
    ImuSample {
        accel: Vector3D::new(0.0, 0.0, 1.0),
        gyro: Vector3D::default(),
        mag: Vector3D::new(20.0, 5.0, -40.0),
    }
}

fn command() -> ControllerInput {
    ControllerInput {
        web_command: 0,
        ..Default::default()
    }
}

fn arm_buttons() -> ControllerInput {
    ControllerInput {
        switch_left: true,
        switch_right: true,
        ..command()
    }
}

fn climb(y_left: i32) -> ControllerInput {
    ControllerInput { y_left, ..command() }
}

impl Rig {
    fn new() -> Self {
        Self {
            imu: Rc::new(RefCell::new(ImuState {
                sample: level_sample(),
                ..Default::default()
            })),
            altitude: Rc::new(Cell::new(GROUND_ALTITUDE_M)),
            duties: Rc::new(RefCell::new([0; 4])),
            now: Rc::new(Cell::new(0)),
            storage: Rc::new(RefCell::new(RamStorage::new(4096))),
            input: AtomicControllerInput::new(),
            telemetry: AtomicTelemetry::new(),
        }
    }

    fn try_boot(&self) -> Result<Computer<'_>, BootError<&'static str, ()>> {
        FlightComputer::new(
            FlightHardware {
                imu: SimImu(self.imu.clone()),
                barometer: SimBarometer(self.altitude.clone()),
                motors: SimMotors(self.duties.clone()),
                clock: SimClock(self.now.clone()),
                delay: NoDelay,
            },
            SharedStorage(self.storage.clone()),
            &self.input,
            &self.telemetry,
        )
    }

    fn boot(&self) -> Computer<'_> {
        self.try_boot().unwrap()
    }

    fn send(&self, packet: ControllerInput) {
        assert!(self.input.receive_packet(&packet.to_bytes()));
    }

    /// Runs passes without any new packet.
    fn run_for(&self, computer: &mut Computer, duration_us: u64) {
        let end = self.now.get() + duration_us;
        while self.now.get() < end {
            self.now.set(self.now.get() + PASS_US);
            computer.run_pass();
        }
    }

    /// Runs passes while the transmitter keeps repeating `packet`.
    fn hold(&self, computer: &mut Computer, packet: ControllerInput, duration_us: u64) {
        let end = self.now.get() + duration_us;
        while self.now.get() < end {
            self.send(packet);
            let step = PACKET_INTERVAL_US.min(end - self.now.get());
            self.run_for(computer, step);
        }
    }

    fn toggle_arm(&self, computer: &mut Computer) {
        self.hold(computer, arm_buttons(), 20_000);
        self.hold(computer, command(), 20_000);
    }

    fn duties(&self) -> [u16; 4] {
        *self.duties.borrow()
    }
}

#[test]
fn boot_fails_without_the_imu() {
    let rig = Rig::new();
    rig.imu.borrow_mut().fail_init = true;
    assert!(matches!(rig.try_boot(), Err(BootError::Imu("no ack"))));
}

#[test]
fn vehicle_stays_locked_until_the_first_packet() {
    let rig = Rig::new();
    let mut computer = rig.boot();
    rig.run_for(&mut computer, 100_000);
    assert!(rig.telemetry.read().status.tuning_locked());

    // Arm buttons are ignored while the tuning flag is set
    rig.hold(
        &mut computer,
        ControllerInput {
            web_command: 1,
            ..arm_buttons()
        },
        50_000,
    );
    assert_eq!(computer.mode(), FlightMode::Disarmed);
    assert_eq!(rig.duties(), [0; 4]);

    rig.hold(&mut computer, command(), 20_000);
    assert!(!rig.telemetry.read().status.tuning_locked());
}

#[test]
fn arm_toggle_idles_the_motors_and_disarm_stops_them() {
    let rig = Rig::new();
    let mut computer = rig.boot();
    rig.hold(&mut computer, command(), 50_000);

    rig.hold(&mut computer, arm_buttons(), 20_000);
    assert_eq!(computer.mode(), FlightMode::ArmedGrounded);
    assert_eq!(rig.duties(), [100; 4]);

    // Holding the buttons does not toggle again
    rig.hold(&mut computer, arm_buttons(), 500_000);
    assert_eq!(computer.mode(), FlightMode::ArmedGrounded);

    rig.hold(&mut computer, command(), 20_000);
    rig.hold(&mut computer, arm_buttons(), 20_000);
    assert_eq!(computer.mode(), FlightMode::Disarmed);
    assert_eq!(rig.duties(), [0; 4]);

    rig.toggle_arm(&mut computer);
    assert_eq!(computer.mode(), FlightMode::ArmedGrounded);
}

#[test]
fn throttle_takes_off_and_the_mixer_drives_the_motors() {
    let rig = Rig::new();
    let mut computer = rig.boot();
    rig.hold(&mut computer, command(), 200_000);
    rig.toggle_arm(&mut computer);

    rig.hold(&mut computer, climb(200), 300_000);
    assert_eq!(computer.mode(), FlightMode::ArmedFlying);

    let duties = rig.duties();
    for duty in duties {
        assert!(duty > 480 && duty <= 1023, "{:?}", duties);
    }
    // Level and on heading, the mix is symmetric
    assert!(duties.iter().all(|duty| *duty == duties[0]), "{:?}", duties);

    assert_eq!(computer.telemetry().motors, duties);
    let published = rig.telemetry.read();
    assert!(published.status.on_flying());
    assert_abs_diff_eq!(published.altitude_rate_target, 2.0, epsilon = 1e-3);
}

#[test]
fn arming_with_the_throttle_off_centre_still_captures_the_reference() {
    let rig = Rig::new();
    let mut computer = rig.boot();
    rig.hold(&mut computer, command(), 200_000);

    rig.hold(
        &mut computer,
        ControllerInput {
            y_left: 50,
            ..arm_buttons()
        },
        20_000,
    );
    assert_eq!(computer.mode(), FlightMode::ArmedFlying);
    assert_eq!(computer.altitude_window(), (105.0, 135.0));

    rig.hold(&mut computer, climb(50), 300_000);
    let setpoint = computer.altitude_setpoint();
    assert!(setpoint > GROUND_ALTITUDE_M && setpoint <= 135.0, "{}", setpoint);
    for duty in rig.duties() {
        assert!(duty > 480, "{:?}", rig.duties());
    }
}

#[test]
fn altitude_setpoint_stays_inside_the_armed_window() {
    let rig = Rig::new();
    let mut computer = rig.boot();
    rig.hold(&mut computer, command(), 200_000);
    rig.toggle_arm(&mut computer);

    assert_eq!(computer.altitude_window(), (105.0, 135.0));
    assert_abs_diff_eq!(computer.altitude_setpoint(), 121.0, epsilon = 1e-4);

    rig.hold(&mut computer, climb(500), 5_000_000);
    assert_abs_diff_eq!(computer.altitude_setpoint(), 135.0, epsilon = 1e-4);

    rig.hold(&mut computer, climb(-500), 10_000_000);
    assert_abs_diff_eq!(computer.altitude_setpoint(), 105.0, epsilon = 1e-4);
    for duty in rig.duties() {
        assert!(duty <= 1023);
    }
}

#[test]
fn tilt_cutoff_stops_the_motors_until_rearmed() {
    let rig = Rig::new();
    let mut computer = rig.boot();
    rig.hold(&mut computer, command(), 200_000);
    rig.toggle_arm(&mut computer);
    rig.hold(&mut computer, climb(100), 200_000);
    assert_eq!(computer.mode(), FlightMode::ArmedFlying);

    // Flip around the roll axis at 200 deg/s for half a second
    rig.imu.borrow_mut().sample.gyro = Vector3D::new(200.0, 0.0, 0.0);
    rig.hold(&mut computer, climb(100), 500_000);
    rig.imu.borrow_mut().sample.gyro = Vector3D::default();
    rig.hold(&mut computer, climb(100), 50_000);

    assert!(computer.attitude().roll.abs() > 70.0, "{:?}", computer.attitude());
    assert_eq!(rig.duties(), [0; 4]);
    assert!(rig.telemetry.read().status.tilt_cutoff());

    // Still latched after the sticks move again
    rig.hold(&mut computer, climb(300), 200_000);
    assert_eq!(rig.duties(), [0; 4]);

    rig.toggle_arm(&mut computer);
    assert_eq!(computer.mode(), FlightMode::Disarmed);
    rig.toggle_arm(&mut computer);
    assert_eq!(computer.mode(), FlightMode::ArmedGrounded);
    assert_eq!(rig.duties(), [100; 4]);
    assert!(!rig.telemetry.read().status.tilt_cutoff());
}

#[test]
fn tuning_writes_are_locked_while_armed_and_persist_when_disarmed() {
    let rig = Rig::new();
    {
        let mut computer = rig.boot();
        rig.hold(&mut computer, command(), 50_000);
        rig.toggle_arm(&mut computer);

        let result = computer.update_parameters(&[("pRoll_rate", 2.0)]);
        assert!(matches!(result, Err(TuningError::Locked)));
        assert_abs_diff_eq!(computer.tuning().rate_gains.roll.proportional, 1.2);

        rig.toggle_arm(&mut computer);
        assert_eq!(computer.mode(), FlightMode::Disarmed);

        let unknown = computer.update_parameters(&[("pRoll_rate", 2.0), ("bogus", 1.0)]);
        assert!(matches!(unknown, Err(TuningError::UnknownParameter(name)) if name == "bogus"));
        assert_abs_diff_eq!(computer.tuning().rate_gains.roll.proportional, 1.2);

        computer
            .update_parameters(&[("pRoll_rate", 2.0), ("maxAngleDeg", 120.0)])
            .unwrap();
        assert_abs_diff_eq!(computer.tuning().rate_gains.roll.proportional, 2.0);
        assert_abs_diff_eq!(computer.tuning().roll_pitch_shaping.limit, 70.0);
    }

    let rebooted = rig.boot();
    assert_abs_diff_eq!(rebooted.tuning().rate_gains.roll.proportional, 2.0);
    assert_abs_diff_eq!(rebooted.tuning().roll_pitch_shaping.limit, 70.0);
    let read_back: Vec<_> = rebooted.tuning().named_values().collect();
    assert!(read_back.contains(&("pRoll_rate", 2.0)));
}

#[test]
fn non_finite_tuning_record_is_neither_applied_nor_stored() {
    let rig = Rig::new();
    {
        let mut computer = rig.boot();
        let mut config = *computer.tuning();
        config.base_speed = f32::NAN;
        config.rate_gains.roll.proportional = f32::INFINITY;

        let result = computer.apply_tuning(config);
        assert!(matches!(result, Err(TuningError::NonFinite(_))));
        assert_abs_diff_eq!(computer.tuning().base_speed, 480.0);
        assert_abs_diff_eq!(computer.tuning().rate_gains.roll.proportional, 1.2);
    }

    assert_eq!(*rig.boot().tuning(), TuningConfig::default());
}

#[test]
fn tuning_flag_disarms_a_flying_vehicle() {
    let rig = Rig::new();
    let mut computer = rig.boot();
    rig.hold(&mut computer, command(), 200_000);
    rig.toggle_arm(&mut computer);
    rig.hold(&mut computer, climb(100), 100_000);
    assert_eq!(computer.mode(), FlightMode::ArmedFlying);

    rig.send(ControllerInput {
        web_command: 1,
        ..climb(100)
    });
    rig.run_for(&mut computer, PASS_US);
    assert_eq!(computer.mode(), FlightMode::Disarmed);
    assert_eq!(rig.duties(), [0; 4]);
}

#[test]
fn calibration_runs_on_the_ground_and_reports_done_once() {
    let rig = Rig::new();
    rig.imu.borrow_mut().sample = ImuSample {
        accel: Vector3D::new(0.02, -0.01, 1.03),
        gyro: Vector3D::new(1.5, -0.5, 0.25),
        ..level_sample()
    };
    {
        let mut computer = rig.boot();
        assert!(!computer.calibration().calibrated);
        rig.hold(&mut computer, command(), 50_000);

        rig.toggle_arm(&mut computer);
        assert_eq!(
            computer.request_calibration(CalibrationRequest::ACCEL_GYRO),
            Err(ControlLockError::LockedWhileFlying)
        );
        assert!(matches!(computer.reset_calibration(), Err(CalibrationError::Locked)));
        assert_eq!(computer.calibration_status(), CalibrationStatus::Idle);
        rig.toggle_arm(&mut computer);

        computer
            .request_calibration(CalibrationRequest::ACCEL_GYRO)
            .unwrap();
        assert_eq!(
            computer.calibration_status(),
            CalibrationStatus::InProgress(CalibrationRequest::ACCEL_GYRO)
        );
        rig.run_for(&mut computer, PASS_US);

        assert_eq!(
            computer.calibration_status(),
            CalibrationStatus::Done(CalibrationRequest::ACCEL_GYRO)
        );
        assert_eq!(computer.calibration_status(), CalibrationStatus::Idle);
        assert_eq!(rig.imu.borrow().init_calls, 2);

        let offsets = computer.sensor_offsets();
        assert_abs_diff_eq!(offsets.gyro_bias.x, 1.5, epsilon = 1e-4);
        assert_abs_diff_eq!(offsets.gyro_bias.y, -0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(offsets.gyro_bias.z, 0.25, epsilon = 1e-4);
        assert_abs_diff_eq!(offsets.accel_bias.x, 0.02, epsilon = 1e-4);
        assert_abs_diff_eq!(offsets.accel_bias.y, -0.01, epsilon = 1e-4);
        assert_abs_diff_eq!(offsets.accel_bias.z, 0.03, epsilon = 1e-4);
    }

    let mut rebooted = rig.boot();
    assert!(rebooted.calibration().calibrated);
    assert_abs_diff_eq!(rebooted.sensor_offsets().gyro_bias.x, 1.5, epsilon = 1e-4);

    rebooted.reset_calibration().unwrap();
    assert!(!rebooted.calibration().calibrated);
    assert_eq!(rebooted.sensor_offsets().mag_scale, Vector3D::new(1.0, 1.0, 1.0));
    drop(rebooted);
    assert!(!rig.boot().calibration().calibrated);
}

#[test]
fn magnetometer_calibration_stores_hard_iron_bias() {
    let rig = Rig::new();
    let mut computer = rig.boot();
    computer
        .request_calibration(CalibrationRequest::MAGNETOMETER)
        .unwrap();
    rig.run_for(&mut computer, PASS_US);

    assert_eq!(
        computer.calibration_status(),
        CalibrationStatus::Done(CalibrationRequest::MAGNETOMETER)
    );
    // A fixed reading gives its own value as bias and a zero span
    assert_eq!(computer.calibration().magnetometer.bias, [20.0, 5.0, -40.0]);
    assert_eq!(computer.calibration().magnetometer.scale, [0.0; 3]);
    assert_eq!(computer.calibration().accel_bias, [0.0; 3]);
}

#[test]
fn link_loss_neutralises_the_sticks_while_armed() {
    let rig = Rig::new();
    let mut computer = rig.boot();
    rig.hold(&mut computer, command(), 200_000);
    rig.toggle_arm(&mut computer);
    rig.hold(&mut computer, climb(300), 200_000);
    assert_eq!(computer.mode(), FlightMode::ArmedFlying);

    rig.run_for(&mut computer, 900_000);
    assert!(!computer.is_link_lost());
    rig.run_for(&mut computer, 300_000);
    assert!(computer.is_link_lost());

    let telemetry = rig.telemetry.read();
    assert!(telemetry.status.link_lost());
    assert_eq!(computer.mode(), FlightMode::ArmedFlying);
    assert!(rig.duties().iter().all(|duty| *duty > 0));
    // Slew-limited back towards a hover
    rig.run_for(&mut computer, 100_000);
    assert_abs_diff_eq!(rig.telemetry.read().altitude_rate_target, 0.0, epsilon = 1e-3);

    // Malformed packets do not count as traffic
    assert!(!rig.input.receive_packet(&[0_u8; 10]));
    rig.run_for(&mut computer, 10_000);
    assert!(computer.is_link_lost());

    rig.hold(&mut computer, climb(300), 20_000);
    assert!(!computer.is_link_lost());
}

#[test]
fn long_press_switches_headless_mode() {
    let rig = Rig::new();
    let mut computer = rig.boot();
    rig.hold(&mut computer, command(), 50_000);

    let left = ControllerInput {
        switch_left: true,
        ..command()
    };
    let right = ControllerInput {
        switch_right: true,
        ..command()
    };

    rig.hold(&mut computer, left, 2_900_000);
    assert!(!computer.is_headless());
    rig.hold(&mut computer, left, 200_000);
    assert!(computer.is_headless());
    assert!(rig.telemetry.read().status.headless());

    rig.hold(&mut computer, command(), 20_000);
    rig.hold(&mut computer, right, 3_100_000);
    assert!(!computer.is_headless());
    assert_eq!(computer.mode(), FlightMode::Disarmed);
}
