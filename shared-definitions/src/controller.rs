use byteorder::{ByteOrder, LittleEndian};

/// Size of the radio command packet, C layout with natural alignment
/// (`int, int, bool, int, int, bool, uint8`).
pub const CONTROLLER_INPUT_PACKET_SIZE: usize = 24;

const X_LEFT_OFFSET: usize = 0;
const Y_LEFT_OFFSET: usize = 4;
const SWITCH_LEFT_OFFSET: usize = 8;
const X_RIGHT_OFFSET: usize = 12;
const Y_RIGHT_OFFSET: usize = 16;
const SWITCH_RIGHT_OFFSET: usize = 20;
const WEB_COMMAND_OFFSET: usize = 21;

/// Latest stick/switch state sent by the transmitter.
///
/// Left stick: `x_left` yaw rate, `y_left` altitude rate (throttle axis).
/// Right stick: `x_right` roll, `y_right` pitch.
/// `web_command` is non-zero while the tuning UI holds the vehicle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ControllerInput {
    pub x_left: i32,
    pub y_left: i32,
    pub switch_left: bool,
    pub x_right: i32,
    pub y_right: i32,
    pub switch_right: bool,
    pub web_command: u8,
}

impl ControllerInput {
    /// Decodes a received packet. Anything that is not exactly one packet long is rejected.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != CONTROLLER_INPUT_PACKET_SIZE {
            return None;
        }

        Some(Self {
            x_left: LittleEndian::read_i32(&bytes[X_LEFT_OFFSET..]),
            y_left: LittleEndian::read_i32(&bytes[Y_LEFT_OFFSET..]),
            switch_left: bytes[SWITCH_LEFT_OFFSET] != 0,
            x_right: LittleEndian::read_i32(&bytes[X_RIGHT_OFFSET..]),
            y_right: LittleEndian::read_i32(&bytes[Y_RIGHT_OFFSET..]),
            switch_right: bytes[SWITCH_RIGHT_OFFSET] != 0,
            web_command: bytes[WEB_COMMAND_OFFSET],
        })
    }

    pub fn to_bytes(&self) -> [u8; CONTROLLER_INPUT_PACKET_SIZE] {
        let mut bytes = [0_u8; CONTROLLER_INPUT_PACKET_SIZE];
        LittleEndian::write_i32(&mut bytes[X_LEFT_OFFSET..], self.x_left);
        LittleEndian::write_i32(&mut bytes[Y_LEFT_OFFSET..], self.y_left);
        bytes[SWITCH_LEFT_OFFSET] = self.switch_left as u8;
        LittleEndian::write_i32(&mut bytes[X_RIGHT_OFFSET..], self.x_right);
        LittleEndian::write_i32(&mut bytes[Y_RIGHT_OFFSET..], self.y_right);
        bytes[SWITCH_RIGHT_OFFSET] = self.switch_right as u8;
        bytes[WEB_COMMAND_OFFSET] = self.web_command;
        bytes
    }

    /// Same switches and tuning flag, sticks centred.
    pub fn with_neutral_sticks(&self) -> Self {
        Self {
            x_left: 0,
            y_left: 0,
            x_right: 0,
            y_right: 0,
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_packet_with_c_padding() {
        let mut packet = [0_u8; CONTROLLER_INPUT_PACKET_SIZE];
        packet[0..4].copy_from_slice(&(-15_i32).to_le_bytes());
        packet[4..8].copy_from_slice(&300_i32.to_le_bytes());
        packet[8] = 1;
        packet[12..16].copy_from_slice(&20_i32.to_le_bytes());
        packet[16..20].copy_from_slice(&(-7_i32).to_le_bytes());
        packet[20] = 0;
        packet[21] = 3;

        let input = ControllerInput::from_bytes(&packet).unwrap();
        assert_eq!(input.x_left, -15);
        assert_eq!(input.y_left, 300);
        assert!(input.switch_left);
        assert_eq!(input.x_right, 20);
        assert_eq!(input.y_right, -7);
        assert!(!input.switch_right);
        assert_eq!(input.web_command, 3);
        assert_eq!(input.to_bytes(), packet);
    }

    #[test]
    fn rejects_packets_of_the_wrong_size() {
        assert!(ControllerInput::from_bytes(&[0_u8; 23]).is_none());
        assert!(ControllerInput::from_bytes(&[0_u8; 25]).is_none());
        assert!(ControllerInput::from_bytes(&[]).is_none());
    }

    #[test]
    fn neutral_sticks_keep_switches() {
        let input = ControllerInput {
            x_left: 10,
            y_left: 20,
            switch_left: true,
            x_right: 30,
            y_right: 40,
            switch_right: true,
            web_command: 0,
        };
        let neutral = input.with_neutral_sticks();
        assert_eq!(neutral.x_left, 0);
        assert_eq!(neutral.y_right, 0);
        assert!(neutral.switch_left && neutral.switch_right);
    }
}
