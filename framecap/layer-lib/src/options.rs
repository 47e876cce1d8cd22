//! Capture options and their command-line marshalling.
//!
//! The controller treats [`CaptureOptions`] as an opaque fixed-size blob when
//! shipping it into the target; only the capture library interprets the
//! fields. When delegating to the 32-bit helper the blob travels on the
//! command line as nibble-hex: two ASCII letters per byte, high nibble first,
//! each nibble encoded as `'a' + n`. That keeps the argument free of shell
//! metacharacters for any byte value.

use thiserror::Error;

/// Capture behaviour pushed into the target during boot.
///
/// Plain data, `#[repr(C)]`: the byte image must be identical in the
/// controller and the capture library, including across the 64-bit
/// controller / 32-bit helper boundary, so every field is a `u32` and the
/// struct carries no padding.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOptions {
    pub allow_vsync: u32,
    pub allow_fullscreen: u32,
    pub api_validation: u32,
    pub capture_callstacks: u32,
    pub capture_callstacks_only_actions: u32,
    /// Seconds the controller waits for a debugger to attach to the target
    /// before injecting. Zero disables the wait.
    pub delay_for_debugger: u32,
    pub verify_buffer_writes: u32,
    pub hook_into_children: u32,
    pub ref_all_resources: u32,
    pub capture_all_cmd_lists: u32,
    pub debug_output_mute: u32,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            allow_vsync: 1,
            allow_fullscreen: 1,
            api_validation: 0,
            capture_callstacks: 0,
            capture_callstacks_only_actions: 0,
            delay_for_debugger: 0,
            verify_buffer_writes: 0,
            hook_into_children: 0,
            ref_all_resources: 0,
            capture_all_cmd_lists: 0,
            debug_output_mute: 1,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionsDecodeError {
    #[error("capture options hex has length {0}, expected {1}")]
    BadLength(usize, usize),

    #[error("capture options hex contains invalid character {0:?}")]
    BadCharacter(char),
}

impl CaptureOptions {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Raw byte image, as written into the target process.
    pub fn as_bytes(&self) -> &[u8] {
        // All fields are u32 and the struct is repr(C): no padding, no
        // uninitialised bytes.
        unsafe { std::slice::from_raw_parts(self as *const Self as *const u8, Self::SIZE) }
    }

    /// Rebuild from a byte image previously produced by [`Self::as_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::SIZE {
            return None;
        }
        Some(unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const Self) })
    }

    pub fn to_hex(&self) -> String {
        bytes_to_hex(self.as_bytes())
    }

    pub fn from_hex(hex: &str) -> Result<Self, OptionsDecodeError> {
        let bytes = hex_to_bytes(hex)?;
        Self::from_bytes(&bytes)
            .ok_or(OptionsDecodeError::BadLength(hex.len(), Self::SIZE * 2))
    }
}

/// Encode bytes as nibble-hex (`'a' + nibble`, high nibble first).
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push((b'a' + (b >> 4)) as char);
        out.push((b'a' + (b & 0xf)) as char);
    }
    out
}

/// Decode nibble-hex back into bytes.
pub fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, OptionsDecodeError> {
    if hex.len() % 2 != 0 {
        return Err(OptionsDecodeError::BadLength(hex.len(), hex.len() + 1));
    }

    let nibble = |c: char| -> Result<u8, OptionsDecodeError> {
        match c {
            'a'..='p' => Ok(c as u8 - b'a'),
            other => Err(OptionsDecodeError::BadCharacter(other)),
        }
    };

    let chars: Vec<char> = hex.chars().collect();
    chars
        .chunks(2)
        .map(|pair| Ok((nibble(pair[0])? << 4) | nibble(pair[1])?))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nibble_hex_of_known_bytes() {
        assert_eq!(bytes_to_hex(&[0x00, 0xff, 0x10]), "aappba");
    }

    #[test]
    fn nibble_hex_round_trips() {
        let blob: Vec<u8> = (0..=255).collect();
        assert_eq!(hex_to_bytes(&bytes_to_hex(&blob)).unwrap(), blob);
    }

    #[test]
    fn decode_rejects_odd_length() {
        assert!(matches!(
            hex_to_bytes("abc"),
            Err(OptionsDecodeError::BadLength(3, _))
        ));
    }

    #[test]
    fn decode_rejects_out_of_range_characters() {
        assert_eq!(
            hex_to_bytes("aq"),
            Err(OptionsDecodeError::BadCharacter('q'))
        );
        assert_eq!(
            hex_to_bytes("Aa"),
            Err(OptionsDecodeError::BadCharacter('A'))
        );
    }

    #[test]
    fn options_round_trip_through_hex() {
        let options = CaptureOptions {
            api_validation: 1,
            delay_for_debugger: 30,
            hook_into_children: 1,
            ..Default::default()
        };

        let hex = options.to_hex();
        assert_eq!(hex.len(), CaptureOptions::SIZE * 2);
        assert_eq!(CaptureOptions::from_hex(&hex).unwrap(), options);
    }

    #[test]
    fn options_reject_truncated_hex() {
        let hex = CaptureOptions::default().to_hex();
        assert!(CaptureOptions::from_hex(&hex[..hex.len() - 2]).is_err());
    }
}
