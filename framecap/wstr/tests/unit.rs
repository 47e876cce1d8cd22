use framecap_wstr::*;

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

#[test]
fn round_trip() {
    let buf = to_wide("Hello!");
    assert_eq!(buf.last(), Some(&0));
    assert_eq!(from_wide(&buf), "Hello!");

    let buf = to_wide("привет");
    assert_eq!(from_wide(&buf), "привет");
}

#[test]
fn from_wide_stops_at_nul() {
    let mut buf = wide("visible");
    buf.push(0);
    buf.extend(wide("hidden"));

    assert_eq!(from_wide(&buf), "visible");
}

#[test]
fn from_wide_without_terminator() {
    assert_eq!(from_wide(wide("no nul here")), "no nul here");
}

#[test]
fn fixed_buffer_truncates_and_terminates() {
    let buf = to_wide_fixed::<8>("C:\\some\\long\\path.dll");
    assert_eq!(buf[7], 0);
    assert_eq!(from_wide(&buf), "C:\\some");

    let buf = to_wide_fixed::<32>("short");
    assert_eq!(from_wide(&buf), "short");
}

#[test]
fn utf8_nul_terminated() {
    assert_eq!(from_utf8_nul(b"value\0junk"), "value");
    assert_eq!(from_utf8_nul(b"no terminator"), "no terminator");
}

#[test]
fn cstr_ptr_null_is_empty() {
    let s = unsafe { from_cstr_ptr(std::ptr::null(), 256) };
    assert!(s.is_empty());
}

#[test]
fn cstr_ptr_reads_to_nul() {
    let raw = b"RENDERDOC_SetLogFile\0trailing";
    let s = unsafe { from_cstr_ptr(raw.as_ptr() as *const i8, raw.len()) };
    assert_eq!(s, "RENDERDOC_SetLogFile");
}

#[test]
fn multi_string_block_length() {
    let mut block = wide("A=1");
    block.push(0);
    block.extend(wide("B=2"));
    block.push(0);
    block.push(0);

    let len = unsafe { multi_string_len(block.as_ptr(), block.len()) };
    assert_eq!(len, Some(block.len()));

    let unterminated = wide("A=1");
    let len = unsafe { multi_string_len(unterminated.as_ptr(), unterminated.len()) };
    assert_eq!(len, None);
}

#[test]
fn multi_string_splitting() {
    let mut block = wide("one");
    block.push(0);
    block.extend(wide("two"));
    block.push(0);
    block.push(0);

    assert_eq!(multi_string_entries(&block), ["one", "two"]);
}

#[test]
fn env_block_parsing() {
    let mut block = Vec::new();
    for entry in ["PATH=C:\\bin", "USER=test", "=C:=C:\\hidden", "NOEQUALS", "EMPTY="] {
        block.extend(wide(entry));
        block.push(0);
    }
    block.push(0);

    let pairs = env_block_pairs(&block);
    assert_eq!(
        pairs,
        [
            ("PATH".to_string(), "C:\\bin".to_string()),
            ("USER".to_string(), "test".to_string()),
            ("EMPTY".to_string(), String::new()),
        ]
    );
}
