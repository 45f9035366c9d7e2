use bitfield_struct::bitfield;
use byteorder::{ByteOrder, LittleEndian};
use crc::{Crc, CRC_32_ISO_HDLC};
use embedded_storage::{ReadStorage, Storage};
use shared_definitions::calibration::{CalibrationRecord, MagnetometerCalibration};

use crate::config::constants::{CALIBRATION_RECORD_OFFSET, TUNING_RECORD_OFFSET};
use crate::config::tuning::{TuningConfig, PARAMETER_NAMES};
use crate::util::error::AppError;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

const RECORD_VERSION: u8 = 1;
const HEADER_LEN: usize = 5;
const CRC_LEN: usize = 4;

const TUNING_MAGIC: u32 = 0x454E_5554; // "TUNE"
const TUNING_PAYLOAD_LEN: usize = PARAMETER_NAMES.len() * 4;
const TUNING_RECORD_LEN: usize = HEADER_LEN + TUNING_PAYLOAD_LEN + CRC_LEN;

const CALIBRATION_MAGIC: u32 = 0x4249_4C43; // "CLIB"
const CALIBRATION_PAYLOAD_LEN: usize = 1 + 12 * 4;
const CALIBRATION_RECORD_LEN: usize = HEADER_LEN + CALIBRATION_PAYLOAD_LEN + CRC_LEN;

#[bitfield(u8)]
struct StoredCalibrationFlags {
    calibrated: bool,
    #[bits(7)]
    __: u8,
}

/// Persists tuning and calibration as `[magic][version][payload][crc32]` records.
pub struct ConfigStorage<S> {
    flash: S,
}

impl<S> ConfigStorage<S>
where
    S: Storage,
{
    pub fn new(flash: S) -> Self {
        log::info!("Config storage capacity {}", flash.capacity());
        ConfigStorage { flash }
    }

    pub fn release(self) -> S {
        self.flash
    }

    pub fn store_tuning(&mut self, config: &TuningConfig) -> Result<(), AppError<S::Error>> {
        let mut payload = [0_u8; TUNING_PAYLOAD_LEN];
        for (index, (_, value)) in config.named_values().enumerate() {
            LittleEndian::write_f32(&mut payload[index * 4..], value);
        }

        let mut record = [0_u8; TUNING_RECORD_LEN];
        encode_record(&mut record, TUNING_MAGIC, &payload);
        self.flash
            .write(TUNING_RECORD_OFFSET, &record)
            .map_err(|error| AppError {
                message: "Failed to store the tuning config",
                error,
            })
    }

    /// `None` when nothing valid has been stored yet.
    pub fn load_tuning(&mut self) -> Result<Option<TuningConfig>, AppError<S::Error>> {
        let mut record = [0_u8; TUNING_RECORD_LEN];
        self.flash
            .read(TUNING_RECORD_OFFSET, &mut record)
            .map_err(|error| AppError {
                message: "Failed to load the tuning config",
                error,
            })?;

        let Some(payload) = decode_record(&record, TUNING_MAGIC) else {
            return Ok(None);
        };

        let mut config = TuningConfig::default();
        for (index, name) in PARAMETER_NAMES.iter().enumerate() {
            let value = LittleEndian::read_f32(&payload[index * 4..]);
            if config.set_named::<S::Error>(name, value).is_err() {
                log::warn!("Stored parameter {} is invalid, keeping default", name);
            }
        }
        Ok(Some(config.sanitized()))
    }

    pub fn store_calibration(
        &mut self,
        calibration: &CalibrationRecord,
    ) -> Result<(), AppError<S::Error>> {
        let mut payload = [0_u8; CALIBRATION_PAYLOAD_LEN];
        payload[0] = StoredCalibrationFlags::new()
            .with_calibrated(calibration.calibrated)
            .into();
        let values = calibration
            .accel_bias
            .iter()
            .chain(calibration.gyro_bias.iter())
            .chain(calibration.magnetometer.bias.iter())
            .chain(calibration.magnetometer.scale.iter());
        for (index, value) in values.enumerate() {
            LittleEndian::write_f32(&mut payload[1 + index * 4..], *value);
        }

        let mut record = [0_u8; CALIBRATION_RECORD_LEN];
        encode_record(&mut record, CALIBRATION_MAGIC, &payload);
        self.flash
            .write(CALIBRATION_RECORD_OFFSET, &record)
            .map_err(|error| AppError {
                message: "Failed to store the sensors calibration",
                error,
            })
    }

    /// Missing or corrupted records load as the untrusted default.
    pub fn load_calibration(&mut self) -> Result<CalibrationRecord, AppError<S::Error>> {
        let mut record = [0_u8; CALIBRATION_RECORD_LEN];
        self.flash
            .read(CALIBRATION_RECORD_OFFSET, &mut record)
            .map_err(|error| AppError {
                message: "Failed to load the sensors calibration",
                error,
            })?;

        let Some(payload) = decode_record(&record, CALIBRATION_MAGIC) else {
            return Ok(CalibrationRecord::default());
        };

        let flags = StoredCalibrationFlags::from(payload[0]);
        if !flags.calibrated() {
            return Ok(CalibrationRecord::default());
        }

        let mut values = [0.0_f32; 12];
        for (index, value) in values.iter_mut().enumerate() {
            *value = LittleEndian::read_f32(&payload[1 + index * 4..]);
        }
        if values.iter().any(|value| !value.is_finite()) {
            log::warn!("Stored calibration holds non-finite values, ignoring it");
            return Ok(CalibrationRecord::default());
        }

        Ok(CalibrationRecord {
            calibrated: true,
            accel_bias: [values[0], values[1], values[2]],
            gyro_bias: [values[3], values[4], values[5]],
            magnetometer: MagnetometerCalibration {
                bias: [values[6], values[7], values[8]],
                scale: [values[9], values[10], values[11]],
            },
        })
    }

    pub fn clear_calibration(&mut self) -> Result<(), AppError<S::Error>> {
        self.store_calibration(&CalibrationRecord::default())
    }
}

fn encode_record(record: &mut [u8], magic: u32, payload: &[u8]) {
    let crc_offset = HEADER_LEN + payload.len();
    LittleEndian::write_u32(&mut record[0..4], magic);
    record[4] = RECORD_VERSION;
    record[HEADER_LEN..crc_offset].copy_from_slice(payload);
    let checksum = CRC32.checksum(&record[..crc_offset]);
    LittleEndian::write_u32(&mut record[crc_offset..crc_offset + CRC_LEN], checksum);
}

fn decode_record(record: &[u8], magic: u32) -> Option<&[u8]> {
    if record.len() < HEADER_LEN + CRC_LEN || LittleEndian::read_u32(&record[0..4]) != magic {
        return None;
    }
    let crc_offset = record.len() - CRC_LEN;
    let stored_checksum = LittleEndian::read_u32(&record[crc_offset..]);
    if CRC32.checksum(&record[..crc_offset]) != stored_checksum {
        log::warn!("Stored record {:#010x} failed its checksum, ignoring it", magic);
        return None;
    }
    if record[4] != RECORD_VERSION {
        log::warn!("Stored record {:#010x} has unknown version {}", magic, record[4]);
        return None;
    }
    Some(&record[HEADER_LEN..crc_offset])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RamStorageError {
    OutOfBounds,
}

/// Volatile storage backend for host runs and tests. Starts erased (`0xFF`).
pub struct RamStorage {
    bytes: Vec<u8>,
}

impl RamStorage {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0xFF; capacity],
        }
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    fn range(&self, offset: u32, len: usize) -> Result<core::ops::Range<usize>, RamStorageError> {
        let start = offset as usize;
        let end = start.checked_add(len).ok_or(RamStorageError::OutOfBounds)?;
        if end > self.bytes.len() {
            return Err(RamStorageError::OutOfBounds);
        }
        Ok(start..end)
    }
}

impl ReadStorage for RamStorage {
    type Error = RamStorageError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let range = self.range(offset, bytes.len())?;
        bytes.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.bytes.len()
    }
}

impl Storage for RamStorage {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let range = self.range(offset, bytes.len())?;
        self.bytes[range].copy_from_slice(bytes);
        Ok(())
    }
}
