use core::fmt::Debug;

use crate::shared_core_values::AtomicControllerInput;

/// Largest datagram the receive path accepts; anything longer is oversized and dropped.
pub const MAX_PACKET_LEN: usize = 64;

/// Radio link delivering raw command packets. `receive` never blocks.
pub trait RemoteControl {
    type Error: Debug;

    /// Copies the next pending packet into `buffer` and returns its length.
    fn receive(&mut self, buffer: &mut [u8; MAX_PACKET_LEN]) -> Result<Option<usize>, Self::Error>;
}

/// Drains the link into the shared command block and returns how many packets were accepted.
pub fn forward_pending_packets<R: RemoteControl>(
    remote: &mut R,
    shared_controller_input: &AtomicControllerInput,
) -> Result<usize, R::Error> {
    let mut buffer = [0_u8; MAX_PACKET_LEN];
    let mut accepted = 0;
    while let Some(length) = remote.receive(&mut buffer)? {
        let packet = &buffer[..length.min(MAX_PACKET_LEN)];
        if shared_controller_input.receive_packet(packet) {
            accepted += 1;
        }
    }
    Ok(accepted)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use shared_definitions::controller::ControllerInput;

    use super::*;

    struct QueuedRemote {
        packets: VecDeque<Vec<u8>>,
    }

    impl RemoteControl for QueuedRemote {
        type Error = ();

        fn receive(&mut self, buffer: &mut [u8; MAX_PACKET_LEN]) -> Result<Option<usize>, ()> {
            Ok(self.packets.pop_front().map(|packet| {
                buffer[..packet.len()].copy_from_slice(&packet);
                packet.len()
            }))
        }
    }

    #[test]
    fn forwards_valid_packets_and_drops_the_rest() {
        let first = ControllerInput {
            y_left: 100,
            ..Default::default()
        };
        let last = ControllerInput {
            x_right: -30,
            switch_left: true,
            ..Default::default()
        };
        let mut remote = QueuedRemote {
            packets: VecDeque::from(vec![
                first.to_bytes().to_vec(),
                vec![1, 2, 3],
                last.to_bytes().to_vec(),
            ]),
        };
        let shared = AtomicControllerInput::new();

        assert_eq!(forward_pending_packets(&mut remote, &shared), Ok(2));
        assert_eq!(shared.read(), Some(last));
        assert_eq!(forward_pending_packets(&mut remote, &shared), Ok(0));
    }
}
