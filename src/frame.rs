use crate::duty_cycle::LED_COUNT;

/// Opcode for "set LED register"
pub const SET_LED_REGISTER: u8 = 0x03;

/// Every command on the wire is exactly this many bytes
pub const FRAME_LEN: usize = 2;

/// Frame that turns every LED off
pub const BLANK_FRAME: [u8; FRAME_LEN] = [SET_LED_REGISTER, 0x00];

/// Pack LED bits into a byte, index 0 is the least significant bit
pub fn pack(bits: &[bool; LED_COUNT]) -> u8 {
    bits.iter()
        .enumerate()
        .fold(0u8, |byte, (i, &on)| byte | ((on as u8) << i))
}

/// Build the 2-byte command frame for a register value
pub fn encode_frame(byte: u8) -> [u8; FRAME_LEN] {
    [SET_LED_REGISTER, byte]
}

/// Space separated hex, for trace logging
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes.iter()
        .map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_lsb_first() {
        assert_eq!(pack(&[true, false, false, false, false, false, false, false]), 1);
        assert_eq!(pack(&[false, false, false, false, false, false, false, true]), 128);
    }

    #[test]
    fn test_pack_all_and_none() {
        assert_eq!(pack(&[true; LED_COUNT]), 255);
        assert_eq!(pack(&[false; LED_COUNT]), 0);
    }

    #[test]
    fn test_pack_mixed() {
        assert_eq!(pack(&[false, true, false, true, false, false, false, false]), 0b0000_1010);
    }

    #[test]
    fn test_encode_frame() {
        assert_eq!(encode_frame(42), [0x03, 42]);
        assert_eq!(encode_frame(0), BLANK_FRAME);
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(&encode_frame(0xff)), "03 ff");
    }
}
