use shared_definitions::tuning::{AxisPidGains, PidGains, StickShaping};

use crate::util::error::TuningError;

/// Flat parameter names exchanged with the tuning UI and used as the storage order.
pub const PARAMETER_NAMES: [&str; 47] = [
    "pRoll_rate",
    "iRoll_rate",
    "dRoll_rate",
    "pPitch_rate",
    "iPitch_rate",
    "dPitch_rate",
    "pYaw_rate",
    "iYaw_rate",
    "dYaw_rate",
    "pAltitude_rate",
    "iAltitude_rate",
    "dAltitude_rate",
    "pRoll_angle",
    "iRoll_angle",
    "dRoll_angle",
    "pPitch_angle",
    "iPitch_angle",
    "dPitch_angle",
    "pYaw_angle",
    "iYaw_angle",
    "dYaw_angle",
    "pAltitude_m",
    "iAltitude_m",
    "dAltitude_m",
    "trimRoll",
    "trimPitch",
    "trimYaw",
    "trimAltitude",
    "baseSpeed",
    "integralLimit",
    "maxRateChange",
    "alpha",
    "beta",
    "range_altitude",
    "kff_roll",
    "kff_pitch",
    "kff_yaw",
    "kff_altitude",
    "maxAngleDeg",
    "maxYawRateDegS",
    "maxAltRateMps",
    "rpResponse",
    "yawResponse",
    "altResponse",
    "rpExpo",
    "yawExpo",
    "altExpo",
];

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct AxisValues {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub altitude: f32,
}

impl AxisValues {
    pub const fn new(roll: f32, pitch: f32, yaw: f32, altitude: f32) -> Self {
        Self {
            roll,
            pitch,
            yaw,
            altitude,
        }
    }
}

/// Everything the pilot can tune. Read-only to the control loop, replaced only while disarmed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuningConfig {
    /// Inner loop, deg/s and m/s in, motor duty out.
    pub rate_gains: AxisPidGains,
    /// Outer loop, degrees and metres in, rate setpoints out.
    pub angle_gains: AxisPidGains,
    pub trims: AxisValues,
    pub feed_forward: AxisValues,
    /// Roll and pitch share the angle limit (deg).
    pub roll_pitch_shaping: StickShaping,
    /// Yaw rate limit (deg/s).
    pub yaw_shaping: StickShaping,
    /// Altitude rate limit (m/s).
    pub altitude_shaping: StickShaping,
    pub base_speed: f32,
    pub integral_limit: f32,
    /// Largest altitude-rate change accepted per outer tick (m/s).
    pub max_rate_change: f32,
    /// Altitude setpoint range around the armed baseline (m).
    pub range_altitude: f32,
    /// Complementary filter weight of the integrated altitude.
    pub altitude_alpha: f32,
    /// Complementary filter weight of the integrated vertical velocity.
    pub velocity_beta: f32,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            rate_gains: AxisPidGains {
                roll: PidGains::new(1.2, 0.0, 0.03),
                pitch: PidGains::new(1.2, 0.0, 0.04),
                yaw: PidGains::new(3.0, 0.0, 0.03),
                altitude: PidGains::new(45.0, 0.0, 1.5),
            },
            angle_gains: AxisPidGains {
                roll: PidGains::new(10.0, 0.0, 0.0),
                pitch: PidGains::new(9.0, 0.5, 0.0),
                yaw: PidGains::new(4.0, 0.0, 0.0),
                altitude: PidGains::new(1.0, 0.0, 0.4),
            },
            trims: AxisValues::default(),
            feed_forward: AxisValues::new(0.5, 0.5, 0.5, 0.9),
            roll_pitch_shaping: StickShaping::new(30.0, 1.0, 0.0),
            yaw_shaping: StickShaping::new(90.0, 1.0, 0.0),
            altitude_shaping: StickShaping::new(5.0, 1.0, 0.0),
            base_speed: 480.0,
            integral_limit: 10.0,
            max_rate_change: 1.0,
            range_altitude: 15.0,
            altitude_alpha: 0.95,
            velocity_beta: 0.75,
        }
    }
}

impl TuningConfig {
    /// Copy with every scalar forced into its safe range.
    pub fn sanitized(&self) -> Self {
        let mut config = *self;
        config.roll_pitch_shaping.limit = config.roll_pitch_shaping.limit.clamp(5.0, 70.0);
        config.yaw_shaping.limit = config.yaw_shaping.limit.clamp(10.0, 250.0);
        config.altitude_shaping.limit = config.altitude_shaping.limit.clamp(0.5, 15.0);
        for shaping in [
            &mut config.roll_pitch_shaping,
            &mut config.yaw_shaping,
            &mut config.altitude_shaping,
        ] {
            shaping.response = shaping.response.clamp(0.2, 2.5);
            shaping.expo = shaping.expo.clamp(0.0, 1.0);
        }
        config.altitude_alpha = config.altitude_alpha.clamp(0.0, 1.0);
        config.velocity_beta = config.velocity_beta.clamp(0.0, 1.0);
        config.integral_limit = config.integral_limit.max(0.0);
        config.max_rate_change = config.max_rate_change.max(0.0);
        config.range_altitude = config.range_altitude.max(0.0);
        config.base_speed = config.base_speed.clamp(0.0, 1023.0);
        config
    }

    pub fn get_named(&self, name: &str) -> Option<f32> {
        let mut copy = *self;
        copy.field_mut(name).map(|value| *value)
    }

    pub fn set_named<E>(&mut self, name: &str, value: f32) -> Result<(), TuningError<E>> {
        if !value.is_finite() {
            return Err(TuningError::NonFinite(name.to_string()));
        }
        match self.field_mut(name) {
            Some(field) => {
                *field = value;
                Ok(())
            }
            None => Err(TuningError::UnknownParameter(name.to_string())),
        }
    }

    /// All parameters in storage order, for UI read-back.
    pub fn named_values(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        PARAMETER_NAMES
            .iter()
            .map(move |name| (*name, self.get_named(name).unwrap_or_default()))
    }

    /// Rejects a record carrying NaN or an infinity in any field.
    pub fn validate<E>(&self) -> Result<(), TuningError<E>> {
        match self.named_values().find(|(_, value)| !value.is_finite()) {
            Some((name, _)) => Err(TuningError::NonFinite(name.to_string())),
            None => Ok(()),
        }
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut f32> {
        let field = match name {
            "pRoll_rate" => &mut self.rate_gains.roll.proportional,
            "iRoll_rate" => &mut self.rate_gains.roll.integral,
            "dRoll_rate" => &mut self.rate_gains.roll.derivative,
            "pPitch_rate" => &mut self.rate_gains.pitch.proportional,
            "iPitch_rate" => &mut self.rate_gains.pitch.integral,
            "dPitch_rate" => &mut self.rate_gains.pitch.derivative,
            "pYaw_rate" => &mut self.rate_gains.yaw.proportional,
            "iYaw_rate" => &mut self.rate_gains.yaw.integral,
            "dYaw_rate" => &mut self.rate_gains.yaw.derivative,
            "pAltitude_rate" => &mut self.rate_gains.altitude.proportional,
            "iAltitude_rate" => &mut self.rate_gains.altitude.integral,
            "dAltitude_rate" => &mut self.rate_gains.altitude.derivative,
            "pRoll_angle" => &mut self.angle_gains.roll.proportional,
            "iRoll_angle" => &mut self.angle_gains.roll.integral,
            "dRoll_angle" => &mut self.angle_gains.roll.derivative,
            "pPitch_angle" => &mut self.angle_gains.pitch.proportional,
            "iPitch_angle" => &mut self.angle_gains.pitch.integral,
            "dPitch_angle" => &mut self.angle_gains.pitch.derivative,
            "pYaw_angle" => &mut self.angle_gains.yaw.proportional,
            "iYaw_angle" => &mut self.angle_gains.yaw.integral,
            "dYaw_angle" => &mut self.angle_gains.yaw.derivative,
            "pAltitude_m" => &mut self.angle_gains.altitude.proportional,
            "iAltitude_m" => &mut self.angle_gains.altitude.integral,
            "dAltitude_m" => &mut self.angle_gains.altitude.derivative,
            "trimRoll" => &mut self.trims.roll,
            "trimPitch" => &mut self.trims.pitch,
            "trimYaw" => &mut self.trims.yaw,
            "trimAltitude" => &mut self.trims.altitude,
            "baseSpeed" => &mut self.base_speed,
            "integralLimit" => &mut self.integral_limit,
            "maxRateChange" => &mut self.max_rate_change,
            "alpha" => &mut self.altitude_alpha,
            "beta" => &mut self.velocity_beta,
            "range_altitude" => &mut self.range_altitude,
            "kff_roll" => &mut self.feed_forward.roll,
            "kff_pitch" => &mut self.feed_forward.pitch,
            "kff_yaw" => &mut self.feed_forward.yaw,
            "kff_altitude" => &mut self.feed_forward.altitude,
            "maxAngleDeg" => &mut self.roll_pitch_shaping.limit,
            "maxYawRateDegS" => &mut self.yaw_shaping.limit,
            "maxAltRateMps" => &mut self.altitude_shaping.limit,
            "rpResponse" => &mut self.roll_pitch_shaping.response,
            "yawResponse" => &mut self.yaw_shaping.response,
            "altResponse" => &mut self.altitude_shaping.response,
            "rpExpo" => &mut self.roll_pitch_shaping.expo,
            "yawExpo" => &mut self.yaw_shaping.expo,
            "altExpo" => &mut self.altitude_shaping.expo,
            _ => return None,
        };
        Some(field)
    }
}
