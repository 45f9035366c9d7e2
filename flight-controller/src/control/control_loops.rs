use core::fmt::Debug;

use embedded_hal::delay::DelayNs;
use embedded_storage::Storage;
use shared_definitions::calibration::{CalibrationRecord, CalibrationRequest};
use shared_definitions::controller::ControllerInput;
use shared_definitions::telemetry::TelemetrySnapshot;

use super::attitude_estimator::{AltitudeEstimator, AttitudeEstimator};
use super::command_shaper::{CommandShaper, ShapedCommand};
use super::filters::SignalConditioner;
use super::flight_controllers::{
    AngleModeControllerInput, AngleModeFlightController, FlightStabilizerOut,
    RotationRateControllerInput, RotationRateFlightController,
};
use super::flight_state::{FlightMode, FlightStateMachine, StateTransitions};
use super::scheduler::{DueTicks, FlightScheduler};
use crate::config::constants::{
    ARMED_IDLE_MOTOR_DUTY, BAROMETER_FREQUENCY_HZ, HEADLESS_LONG_PRESS_US, INNER_LOOP_DT_S,
    INNER_LOOP_FREQUENCY_HZ, LINK_LOSS_TIMEOUT_US, MADGWICK_BETA, MAX_MOTOR_DUTY, MIN_MOTOR_DUTY,
    OUTER_LOOP_DT_S, OUTER_LOOP_FREQUENCY_HZ, SENSOR_FAULT_LOG_INTERVAL_US,
    TELEMETRY_LOG_FREQUENCY_HZ, TILT_CUTOFF_DEG,
};
use crate::config::store::ConfigStorage;
use crate::config::tuning::TuningConfig;
use crate::drivers::barometer::Barometer;
use crate::drivers::imu_sensors::{ImuSample, ImuSensor, SensorOffsets};
use crate::output::motor_controller::MotorDriver;
use crate::output::motors_state_manager::QuadcopterMotorsStateManager;
use crate::output::vehicle_movement_mappers::{
    exceeds_tilt_limit, FlyingVehicleMovementMapper, Quadcopter,
};
use crate::shared_core_values::{AtomicControllerInput, AtomicTelemetry};
use crate::telemetry::log_snapshot;
use crate::util::error::{AppError, BootError, CalibrationError, ControlLockError, TuningError};
use crate::util::math::vectors::{RotationVector3D, Vector3D};
use crate::util::time::MonotonicClock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStatus {
    Idle,
    InProgress(CalibrationRequest),
    /// Reported once, then the status returns to `Idle`.
    Done(CalibrationRequest),
}

/// Sensor, actuator and timing collaborators the flight computer drives.
pub struct FlightHardware<I, B, M, C, D> {
    pub imu: I,
    pub barometer: B,
    pub motors: M,
    pub clock: C,
    /// Only used by the blocking ground calibrations.
    pub delay: D,
}

/// Rate-limits repeated fault warnings.
#[derive(Debug, Default, Clone)]
struct FaultLog {
    last_logged_us: Option<u64>,
}

impl FaultLog {
    fn should_log(&mut self, now_us: u64) -> bool {
        match self.last_logged_us {
            Some(last) if now_us.saturating_sub(last) < SENSOR_FAULT_LOG_INTERVAL_US => false,
            _ => {
                self.last_logged_us = Some(now_us);
                true
            }
        }
    }
}

/// Everything the control path mutates, owned by one [`FlightComputer`].
pub struct FlightControllerState {
    flight: FlightStateMachine,
    tuning: TuningConfig,
    calibration: CalibrationRecord,
    offsets: SensorOffsets,
    conditioner: SignalConditioner,
    attitude_estimator: AttitudeEstimator,
    altitude_estimator: AltitudeEstimator,
    shaper: CommandShaper,
    angle_controller: AngleModeFlightController,
    rate_controller: RotationRateFlightController,
    input: ControllerInput,
    conditioned_sample: ImuSample,
    last_raw_sample: ImuSample,
    baro_altitude: Option<f32>,
    command: ShapedCommand,
    stabilizer_out: FlightStabilizerOut,
    last_commit_count: u32,
    last_packet_us: u64,
    link_lost: bool,
    pending_calibration: CalibrationRequest,
    calibration_status: CalibrationStatus,
}

impl FlightControllerState {
    fn new(tuning: TuningConfig, calibration: CalibrationRecord) -> Self {
        Self {
            flight: FlightStateMachine::new(HEADLESS_LONG_PRESS_US),
            tuning,
            calibration,
            offsets: offsets_from_record(&calibration),
            conditioner: SignalConditioner::new(),
            attitude_estimator: AttitudeEstimator::new(MADGWICK_BETA, INNER_LOOP_FREQUENCY_HZ as f32),
            altitude_estimator: AltitudeEstimator::new(tuning.altitude_alpha, tuning.velocity_beta),
            shaper: CommandShaper::new(),
            angle_controller: AngleModeFlightController::new(&tuning.angle_gains),
            rate_controller: RotationRateFlightController::new(&tuning.rate_gains, tuning.feed_forward),
            input: ControllerInput {
                web_command: 1,
                ..Default::default()
            },
            conditioned_sample: ImuSample::default(),
            last_raw_sample: ImuSample::default(),
            baro_altitude: None,
            command: ShapedCommand::default(),
            stabilizer_out: FlightStabilizerOut::default(),
            last_commit_count: 0,
            last_packet_us: 0,
            link_lost: false,
            pending_calibration: CalibrationRequest::empty(),
            calibration_status: CalibrationStatus::Idle,
        }
    }

    fn reset_controllers(&mut self) {
        self.angle_controller.reset();
        self.rate_controller.reset();
        self.stabilizer_out = FlightStabilizerOut::default();
    }
}

fn offsets_from_record(record: &CalibrationRecord) -> SensorOffsets {
    if !record.calibrated {
        return SensorOffsets::default();
    }
    SensorOffsets {
        accel_bias: Vector3D::from_array(record.accel_bias),
        gyro_bias: Vector3D::from_array(record.gyro_bias),
        mag_bias: Vector3D::from_array(record.magnetometer.bias),
        mag_scale: Vector3D::from_array(record.magnetometer.scale),
    }
}

/// The flight-control core: sensor fusion, cascaded PID, mixer and the arming state machine,
/// advanced one cooperative pass at a time by [`FlightComputer::run_pass`].
pub struct FlightComputer<'a, I, B, M, S, C, D>
where
    I: ImuSensor,
    B: Barometer,
    M: MotorDriver,
    S: Storage,
    S::Error: Debug,
    C: MonotonicClock,
    D: DelayNs,
{
    imu: I,
    barometer: B,
    motors: QuadcopterMotorsStateManager<M>,
    clock: C,
    delay: D,
    storage: ConfigStorage<S>,
    controller_input: &'a AtomicControllerInput,
    telemetry_data: &'a AtomicTelemetry,
    scheduler: FlightScheduler,
    mixer: Quadcopter,
    state: FlightControllerState,
    imu_faults: FaultLog,
    barometer_faults: FaultLog,
    motor_faults: FaultLog,
}

impl<'a, I, B, M, S, C, D> FlightComputer<'a, I, B, M, S, C, D>
where
    I: ImuSensor,
    B: Barometer,
    M: MotorDriver,
    S: Storage,
    S::Error: Debug,
    C: MonotonicClock,
    D: DelayNs,
{
    /// Brings up the sensors and loads the persisted tuning and calibration.
    /// A missing IMU or barometer is fatal.
    pub fn new(
        hardware: FlightHardware<I, B, M, C, D>,
        storage: S,
        controller_input: &'a AtomicControllerInput,
        telemetry_data: &'a AtomicTelemetry,
    ) -> Result<Self, BootError<I::Error, B::Error>> {
        let FlightHardware {
            mut imu,
            mut barometer,
            motors,
            clock,
            delay,
        } = hardware;

        imu.init().map_err(|error| {
            log::error!("IMU init failed {:?}", error);
            BootError::Imu(error)
        })?;
        barometer.init().map_err(|error| {
            log::error!("Barometer init failed {:?}", error);
            BootError::Barometer(error)
        })?;

        let mut storage = ConfigStorage::new(storage);
        let tuning = match storage.load_tuning() {
            Ok(Some(tuning)) => tuning,
            Ok(None) => {
                log::info!("No stored tuning, using defaults");
                TuningConfig::default()
            }
            Err(error) => {
                log::warn!("{}", error);
                TuningConfig::default()
            }
        };
        let calibration = storage.load_calibration().unwrap_or_else(|error| {
            log::warn!("{}", error);
            CalibrationRecord::default()
        });
        if !calibration.calibrated {
            log::warn!("Sensors not calibrated");
        }

        let now_us = clock.now_us();
        let mut motors = QuadcopterMotorsStateManager::new(motors);
        if let Err(error) = motors.kill_motors() {
            log::warn!("{}", error);
        }

        let mut state = FlightControllerState::new(tuning, calibration);
        state.last_packet_us = now_us;
        state.last_commit_count = controller_input.commit_count();

        log::info!("Flight computer ready");
        Ok(Self {
            imu,
            barometer,
            motors,
            clock,
            delay,
            storage,
            controller_input,
            telemetry_data,
            scheduler: FlightScheduler::new(
                INNER_LOOP_FREQUENCY_HZ,
                OUTER_LOOP_FREQUENCY_HZ,
                BAROMETER_FREQUENCY_HZ,
                TELEMETRY_LOG_FREQUENCY_HZ,
                now_us,
            ),
            mixer: Quadcopter::new(MIN_MOTOR_DUTY as f32, MAX_MOTOR_DUTY as f32),
            state,
            imu_faults: FaultLog::default(),
            barometer_faults: FaultLog::default(),
            motor_faults: FaultLog::default(),
        })
    }

    /// One cooperative pass: command snapshot, pending ground calibration, state machine,
    /// then whichever of the loop schedules are due. Never blocks while armed.
    pub fn run_pass(&mut self) -> DueTicks {
        let now_us = self.clock.now_us();
        self.read_command(now_us);

        if !self.state.pending_calibration.is_empty() {
            self.run_pending_calibration();
            return DueTicks::default();
        }

        let transitions = self.state.flight.update(&self.state.input, now_us);
        self.handle_transitions(transitions);

        let due = self.scheduler.poll(now_us);
        if due.barometer {
            self.barometer_tick(now_us);
        }
        if due.inner {
            self.inner_tick(now_us);
        }
        if due.outer {
            self.outer_tick();
        }
        if due.telemetry_log {
            log_snapshot(&self.telemetry());
        }
        due
    }

    fn read_command(&mut self, now_us: u64) {
        let commit_count = self.controller_input.commit_count();
        if commit_count != self.state.last_commit_count {
            self.state.last_commit_count = commit_count;
            self.state.last_packet_us = now_us;
            if self.state.link_lost {
                self.state.link_lost = false;
                log::info!("Command link restored");
            }
        }

        // A torn read keeps the previous command
        if let Some(input) = self.controller_input.read() {
            self.state.input = input;
        }

        if self.state.flight.is_armed()
            && now_us.saturating_sub(self.state.last_packet_us) >= LINK_LOSS_TIMEOUT_US
        {
            if !self.state.link_lost {
                self.state.link_lost = true;
                log::warn!("Command link lost, holding attitude and altitude");
            }
            self.state.input = self.state.input.with_neutral_sticks();
        }
    }

    fn handle_transitions(&mut self, transitions: StateTransitions) {
        if transitions.armed_toggled || transitions.disarmed_by_lock {
            self.state.reset_controllers();
            if !self.state.flight.is_armed() {
                self.stop_motors();
            }
        }
    }

    fn barometer_tick(&mut self, now_us: u64) {
        match self.barometer.read_altitude() {
            Ok(altitude) if altitude.is_finite() => {
                self.state.baro_altitude = Some(self.state.conditioner.condition_altitude(altitude));
            }
            Ok(_) => {
                if self.barometer_faults.should_log(now_us) {
                    log::warn!("Barometer returned a non-finite altitude");
                }
            }
            Err(error) => {
                if self.barometer_faults.should_log(now_us) {
                    log::warn!("Barometer read failed {:?}", error);
                }
            }
        }
    }

    fn inner_tick(&mut self, now_us: u64) {
        let raw = match self.imu.read_raw() {
            Ok(sample) => {
                self.state.last_raw_sample = sample;
                sample
            }
            Err(error) => {
                if self.imu_faults.should_log(now_us) {
                    log::warn!("IMU read failed, reusing last sample {:?}", error);
                }
                self.state.last_raw_sample
            }
        };

        let state = &mut self.state;
        let sample = state.conditioner.condition_imu(state.offsets.apply(raw));
        state.conditioned_sample = sample;
        state.attitude_estimator.update(sample.gyro, sample.accel);

        if let Some(baro_altitude) = state.baro_altitude {
            let vertical_acceleration = AltitudeEstimator::vertical_acceleration(
                sample.accel,
                state.attitude_estimator.filter_frame(),
            );
            let estimate =
                state
                    .altitude_estimator
                    .update(vertical_acceleration, baro_altitude, INNER_LOOP_DT_S);
            let velocity = state
                .conditioner
                .condition_vertical_velocity(estimate.vertical_velocity);
            state.altitude_estimator.set_vertical_velocity(velocity);
        }

        if state.flight.needs_reference_capture() {
            self.capture_reference();
        }

        match self.state.flight.mode() {
            FlightMode::ArmedFlying => self.drive_motors(now_us),
            FlightMode::ArmedGrounded => {
                self.state.reset_controllers();
                self.write_motors(|motors| motors.idle(ARMED_IDLE_MOTOR_DUTY), now_us);
            }
            FlightMode::Disarmed => {
                self.state.reset_controllers();
                self.write_motors(|motors| motors.kill_motors(), now_us);
            }
        }
    }

    fn capture_reference(&mut self) {
        let state = &mut self.state;
        let baseline = state
            .baro_altitude
            .unwrap_or(state.altitude_estimator.estimate().altitude);
        let yaw = state.attitude_estimator.attitude().yaw;
        state
            .shaper
            .capture_reference(baseline, state.tuning.range_altitude, yaw);
        state.flight.mark_reference_captured();
        log::info!("Captured altitude baseline {:.2} m, yaw reference {:.1}", baseline, yaw);
    }

    fn drive_motors(&mut self, now_us: u64) {
        let state = &mut self.state;
        let gyro = state.conditioned_sample.gyro;
        let measured_rotation_rate = RotationVector3D::new(-gyro.x, gyro.y, -gyro.z);

        state.stabilizer_out = state.rate_controller.get_next_output(
            RotationRateControllerInput {
                desired: state.angle_controller.last_output(),
                measured_rotation_rate,
                measured_vertical_velocity: state.altitude_estimator.estimate().vertical_velocity,
                iteration_time: INNER_LOOP_DT_S,
            },
            state.tuning.integral_limit,
        );

        let attitude = state.attitude_estimator.attitude();
        if exceeds_tilt_limit(&attitude, TILT_CUTOFF_DEG) && state.flight.engage_tilt_cutoff() {
            log::warn!(
                "Tilt cutoff, roll {:.1} pitch {:.1}, motors stopped until re-armed",
                attitude.roll,
                attitude.pitch
            );
        }

        if state.flight.is_tilt_cutoff() {
            self.write_motors(|motors| motors.kill_motors(), now_us);
            return;
        }

        let out = self.mixer.map_controller_output_to_actuators_input(
            state.tuning.base_speed + state.stabilizer_out.altitude_output,
            state.stabilizer_out.rotation_output_command,
        );
        self.write_motors(|motors| motors.set_motor_power(out.to_array()), now_us);
    }

    fn write_motors(
        &mut self,
        write: impl FnOnce(
            &mut QuadcopterMotorsStateManager<M>,
        ) -> Result<(), AppError<M::Error>>,
        now_us: u64,
    ) {
        if let Err(error) = write(&mut self.motors) {
            if self.motor_faults.should_log(now_us) {
                log::warn!("{}", error);
            }
        }
    }

    fn stop_motors(&mut self) {
        if let Err(error) = self.motors.kill_motors() {
            log::warn!("{}", error);
        }
    }

    fn outer_tick(&mut self) {
        let state = &mut self.state;
        let headless = state.flight.is_headless();
        let attitude = state.attitude_estimator.attitude();

        if state.flight.mode() == FlightMode::ArmedFlying {
            state.command = state.shaper.update(
                &state.input,
                &state.tuning,
                headless,
                attitude.yaw,
                OUTER_LOOP_DT_S,
            );
            state.angle_controller.get_next_output(
                AngleModeControllerInput {
                    desired_rotation: RotationVector3D::new(
                        state.command.target_roll,
                        state.command.target_pitch,
                        state.shaper.yaw_setpoint(),
                    ),
                    measured_rotation: attitude,
                    desired_altitude: state.shaper.altitude_setpoint(),
                    measured_altitude: state.altitude_estimator.estimate().altitude,
                    iteration_time: OUTER_LOOP_DT_S,
                },
                state.tuning.integral_limit,
            );
        } else {
            state.command = state
                .shaper
                .shape(&state.input, &state.tuning, headless, attitude.yaw);
        }

        self.telemetry_data.publish(&self.telemetry());
    }

    /// Snapshot of what the loop is doing right now, the same data the UI polls.
    pub fn telemetry(&self) -> TelemetrySnapshot {
        let state = &self.state;
        let attitude = state.attitude_estimator.attitude();
        let altitude = state.altitude_estimator.estimate();
        let calibrating = matches!(state.calibration_status, CalibrationStatus::InProgress(_));
        TelemetrySnapshot {
            target_roll: state.command.target_roll,
            target_pitch: state.command.target_pitch,
            target_yaw: state.command.target_yaw_rate,
            altitude_rate_target: state.shaper.altitude_rate(),
            current_roll: attitude.roll,
            current_pitch: attitude.pitch,
            current_yaw: attitude.yaw,
            current_altitude: altitude.altitude,
            vertical_velocity: altitude.vertical_velocity,
            motors: self.motors.last_duties(),
            status: state.flight.status_flags(calibrating, state.link_lost),
        }
    }

    pub fn mode(&self) -> FlightMode {
        self.state.flight.mode()
    }

    pub fn is_headless(&self) -> bool {
        self.state.flight.is_headless()
    }

    pub fn is_link_lost(&self) -> bool {
        self.state.link_lost
    }

    pub fn motor_duties(&self) -> [u16; 4] {
        self.motors.last_duties()
    }

    pub fn attitude(&self) -> RotationVector3D {
        self.state.attitude_estimator.attitude()
    }

    pub fn altitude_setpoint(&self) -> f32 {
        self.state.shaper.altitude_setpoint()
    }

    pub fn altitude_window(&self) -> (f32, f32) {
        self.state.shaper.altitude_window()
    }

    pub fn stabilizer_output(&self) -> FlightStabilizerOut {
        self.state.stabilizer_out
    }

    /// Configuration read-back for the tuning UI.
    pub fn tuning(&self) -> &TuningConfig {
        &self.state.tuning
    }

    pub fn calibration(&self) -> &CalibrationRecord {
        &self.state.calibration
    }

    pub fn sensor_offsets(&self) -> &SensorOffsets {
        &self.state.offsets
    }

    /// Sanitises, persists and applies a full tuning record. Rejected while armed or flying.
    pub fn apply_tuning(&mut self, config: TuningConfig) -> Result<(), TuningError<S::Error>> {
        self.state.flight.ensure_grounded().map_err(|error| {
            log::warn!("Tuning write rejected, {}", error);
            error
        })?;

        config.validate::<S::Error>().map_err(|error| {
            log::warn!("Tuning write rejected, {}", error);
            error
        })?;
        let config = config.sanitized();
        self.storage.store_tuning(&config)?;

        let state = &mut self.state;
        state.tuning = config;
        state.angle_controller.set_pid_tune(&config.angle_gains);
        state
            .rate_controller
            .set_pid_tune(&config.rate_gains, config.feed_forward);
        state
            .altitude_estimator
            .set_weights(config.altitude_alpha, config.velocity_beta);
        log::info!("Tuning saved");
        Ok(())
    }

    /// Named-parameter write, all or nothing.
    pub fn update_parameters(&mut self, updates: &[(&str, f32)]) -> Result<(), TuningError<S::Error>> {
        self.state.flight.ensure_grounded()?;
        let mut config = self.state.tuning;
        for (name, value) in updates {
            config.set_named::<S::Error>(name, *value)?;
        }
        self.apply_tuning(config)
    }

    /// Queues a ground calibration, run by the next pass. Rejected while armed or flying.
    pub fn request_calibration(&mut self, request: CalibrationRequest) -> Result<(), ControlLockError> {
        if let Err(error) = self.state.flight.ensure_grounded() {
            log::warn!("Calibration request rejected, {}", error);
            return Err(error);
        }
        if request.is_empty() {
            return Ok(());
        }
        self.state.pending_calibration |= request;
        self.state.calibration_status = CalibrationStatus::InProgress(self.state.pending_calibration);
        Ok(())
    }

    pub fn calibration_status(&mut self) -> CalibrationStatus {
        let status = self.state.calibration_status;
        if let CalibrationStatus::Done(_) = status {
            self.state.calibration_status = CalibrationStatus::Idle;
        }
        status
    }

    /// Forgets the persisted calibration: zero biases and unit scales.
    pub fn reset_calibration(&mut self) -> Result<(), CalibrationError<S::Error>> {
        self.state.flight.ensure_grounded()?;
        self.storage.clear_calibration()?;
        self.state.calibration = CalibrationRecord::default();
        self.state.offsets = SensorOffsets::default();
        self.state.conditioner.reset();
        self.state.reset_controllers();
        log::info!("Calibration reset");
        Ok(())
    }

    fn run_pending_calibration(&mut self) {
        let request = self.state.pending_calibration;
        self.state.pending_calibration = CalibrationRequest::empty();

        if self.state.flight.ensure_grounded().is_err() {
            log::warn!("Calibration dropped, vehicle armed");
            self.state.calibration_status = CalibrationStatus::Idle;
            return;
        }

        self.stop_motors();
        let mut record = self.state.calibration;
        let mut updated = false;

        if request.contains(CalibrationRequest::ACCEL_GYRO) {
            log::info!("Calibrating accelerometer and gyroscope, keep the vehicle level");
            match self.imu.calculate_accel_gyro_bias(&mut self.delay) {
                Ok((accel_bias, gyro_bias)) => {
                    record.accel_bias = accel_bias.to_array();
                    record.gyro_bias = gyro_bias.to_array();
                    updated = true;
                }
                Err(error) => log::warn!("Accelerometer/gyroscope calibration failed {:?}", error),
            }
        }
        if request.contains(CalibrationRequest::MAGNETOMETER) {
            log::info!("Calibrating magnetometer, rotate the vehicle");
            match self.imu.calculate_magnetometer_calibration(&mut self.delay) {
                Ok(magnetometer) => {
                    record.magnetometer = magnetometer;
                    updated = true;
                }
                Err(error) => log::warn!("Magnetometer calibration failed {:?}", error),
            }
        }

        if updated {
            record.calibrated = true;
            if let Err(error) = self.storage.store_calibration(&record) {
                log::warn!("{}", error);
            }
        }

        if let Err(error) = self.imu.init() {
            log::warn!("IMU re-init after calibration failed {:?}", error);
        }
        let record = self.storage.load_calibration().unwrap_or_else(|error| {
            log::warn!("{}", error);
            record
        });
        self.state.calibration = record;
        self.state.offsets = offsets_from_record(&record);
        self.state.conditioner.reset();
        self.state.reset_controllers();

        self.state.calibration_status = CalibrationStatus::Done(request);
        self.scheduler.restart(self.clock.now_us());
        log::info!("Calibration finished {:?}", request);
    }
}
