//! Conversions between Rust strings and the NUL-terminated UTF-16 buffers the
//! Win32 API traffics in, plus helpers for double-NUL-terminated multi-string
//! blocks (environment blocks, `REG_MULTI_SZ`).
//!
//! Everything here is pure buffer manipulation so it can be unit tested on any
//! host; the unsafe pointer variants exist for call sites that receive raw
//! pointers from the OS.

/// Index of the first `stop` element, or the buffer length if there is none.
fn terminator_index<T: PartialEq>(buffer: &[T], stop: T) -> usize {
    buffer
        .iter()
        .position(|x| *x == stop)
        .unwrap_or(buffer.len())
}

/// Encode a string as UTF-16 with a trailing NUL, ready to pass as `LPCWSTR`.
pub fn to_wide<S: AsRef<str>>(s: S) -> Vec<u16> {
    s.as_ref().encode_utf16().chain(Some(0)).collect()
}

/// Encode a string into a fixed-size UTF-16 buffer.
///
/// The result is always NUL-terminated; input that does not fit is truncated
/// at `N - 1` code units. Useful when a fixed-size buffer image is written
/// into another process.
pub fn to_wide_fixed<const N: usize>(s: &str) -> [u16; N] {
    let mut buf = [0u16; N];
    for (slot, unit) in buf.iter_mut().take(N - 1).zip(s.encode_utf16()) {
        *slot = unit;
    }
    buf
}

/// Decode a UTF-16 buffer up to its first NUL (or its full length).
pub fn from_wide<T: AsRef<[u16]>>(buffer: T) -> String {
    let buffer = buffer.as_ref();
    let len = terminator_index(buffer, 0);
    String::from_utf16_lossy(buffer.get(..len).unwrap_or(buffer))
}

/// Decode a UTF-8 buffer up to its first NUL (or its full length).
pub fn from_utf8_nul<T: AsRef<[u8]>>(buffer: T) -> String {
    let buffer = buffer.as_ref();
    let len = terminator_index(buffer, 0);
    String::from_utf8_lossy(buffer.get(..len).unwrap_or(buffer)).into_owned()
}

/// Decode a NUL-terminated C string, reading at most `max_len` bytes.
///
/// # Safety
///
/// `ptr` must either be null (returns an empty string) or point to readable
/// memory of at least `max_len` bytes or up to a NUL terminator, whichever
/// comes first.
pub unsafe fn from_cstr_ptr(ptr: *const i8, max_len: usize) -> String {
    if ptr.is_null() {
        return String::new();
    }

    let bytes = unsafe { std::slice::from_raw_parts(ptr as *const u8, max_len) };
    from_utf8_nul(bytes)
}

/// Decode a NUL-terminated wide string, reading at most `max_len` code units.
///
/// # Safety
///
/// Same contract as [`from_cstr_ptr`], in `u16` units.
pub unsafe fn from_wide_ptr(ptr: *const u16, max_len: usize) -> String {
    if ptr.is_null() {
        return String::new();
    }

    let units = unsafe { std::slice::from_raw_parts(ptr, max_len) };
    from_wide(units)
}

/// Length in `u16` units of a double-NUL-terminated multi-string block,
/// including both terminators.
///
/// Returns `None` when no double NUL is found within `max_len` units.
///
/// # Safety
///
/// `ptr` must be null or point to at least `max_len` readable `u16` units.
pub unsafe fn multi_string_len(ptr: *const u16, max_len: usize) -> Option<usize> {
    if ptr.is_null() {
        return None;
    }

    let units = unsafe { std::slice::from_raw_parts(ptr, max_len) };
    units
        .windows(2)
        .position(|w| w[0] == 0 && w[1] == 0)
        .map(|i| i + 2)
}

/// Split a multi-string block into its component strings.
///
/// The block may or may not include the trailing double NUL; empty entries
/// are skipped either way.
pub fn multi_string_entries(block: &[u16]) -> Vec<String> {
    block
        .split(|&u| u == 0)
        .filter(|part| !part.is_empty())
        .map(String::from_utf16_lossy)
        .collect()
}

/// Parse an environment block into `(name, value)` pairs.
///
/// Entries without a `=`, or with an empty name, are dropped. Entries whose
/// name starts with `=` (the hidden per-drive working-directory variables) are
/// dropped as well, matching what the OS itself hides from lookups.
pub fn env_block_pairs(block: &[u16]) -> Vec<(String, String)> {
    multi_string_entries(block)
        .into_iter()
        .filter_map(|entry| {
            let (name, value) = entry.split_once('=')?;
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}
