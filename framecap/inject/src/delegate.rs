//! Command-line marshalling for the bitness hand-off.
//!
//! A 64-bit controller cannot call into a 32-bit (WoW64) target directly, so
//! it spawns a sibling 32-bit helper executable and passes the whole
//! injection request on the command line: target pid, log path, the capture
//! options blob as nibble-hex, and one `+env-<op> "name" "value"` group per
//! environment edit. The helper performs the injection from its own 32-bit
//! world and reports the control identifier through its exit code.

use framecap_layer_lib::env::{EnvOp, EnvironmentModification};

/// File name of the sibling helper executable. The 32-bit copy lives in an
/// `x86` subdirectory next to the controller's capture library.
pub const HELPER_EXE: &str = "framecap-cmd.exe";

/// Helper subcommand implementing the 64-to-32 delegation.
pub const DELEGATE_SUBCOMMAND: &str = "cap32for64";

/// Helper subcommand implementing the global-hook service.
pub const GLOBAL_HOOK_SUBCOMMAND: &str = "globalhook";

/// Escape one argument for the `"..."` wrap used on the helper command line.
///
/// Embedded quotes are backslash-prefixed. A trailing backslash is doubled:
/// without that, the final `\` would escape the closing quote and swallow the
/// rest of the line when the helper's runtime re-parses it.
pub fn escape_arg(arg: &str) -> String {
    let mut out = arg.replace('"', "\\\"");
    if out.ends_with('\\') {
        out.push('\\');
    }
    out
}

/// The ` +env-<op> "name" "value"` suffix for a batch of environment edits.
///
/// Names are trimmed; edits whose trimmed name is empty are dropped.
pub fn env_args(modifications: &[EnvironmentModification]) -> String {
    let mut out = String::new();
    for modification in modifications {
        let name = modification.name.trim();
        if name.is_empty() {
            continue;
        }
        out.push_str(&format!(
            " +env-{} \"{}\" \"{}\"",
            modification.op.as_str(),
            escape_arg(name),
            escape_arg(&modification.value),
        ));
    }
    out
}

/// Full delegation command line for the helper at `helper_path`.
pub fn delegate_cmdline(
    helper_path: &str,
    pid: u32,
    logfile: &str,
    options_hex: &str,
    modifications: &[EnvironmentModification],
) -> String {
    format!(
        "\"{helper_path}\" {DELEGATE_SUBCOMMAND} --pid={pid} --log=\"{logfile}\" --capopts=\"{options_hex}\"{}",
        env_args(modifications)
    )
}

/// Command line for the global-hook helper service.
pub fn global_hook_cmdline(
    helper_path: &str,
    pathmatch: &str,
    logfile: &str,
    options_hex: &str,
) -> String {
    format!(
        "\"{helper_path}\" {GLOBAL_HOOK_SUBCOMMAND} --match \"{pathmatch}\" --log \"{logfile}\" --capopts \"{options_hex}\""
    )
}

/// Parse the `+env-<op> "name" "value"` groups back into edits, as the helper
/// sees them after its runtime has split and unquoted the command line.
pub fn parse_env_args(args: &[String]) -> Result<Vec<EnvironmentModification>, String> {
    let mut out = Vec::new();
    let mut iter = args.iter();

    while let Some(tag) = iter.next() {
        let op = tag
            .strip_prefix("+env-")
            .ok_or_else(|| format!("expected `+env-<op>`, got `{tag}`"))?
            .parse::<EnvOp>()
            .map_err(|e| e.to_string())?;

        let name = iter
            .next()
            .ok_or_else(|| format!("`{tag}` is missing its variable name"))?;
        let value = iter
            .next()
            .ok_or_else(|| format!("`{tag}` is missing its value"))?;

        out.push(EnvironmentModification::new(
            name.clone(),
            value.clone(),
            op,
        ));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_arguments_pass_through() {
        assert_eq!(escape_arg("C:\\tools\\bin"), "C:\\tools\\bin");
    }

    #[test]
    fn embedded_quotes_are_escaped() {
        assert_eq!(escape_arg(r#"say "hi""#), r#"say \"hi\""#);
    }

    #[test]
    fn trailing_backslash_is_doubled() {
        assert_eq!(escape_arg(r#"C:\dir\"#), r#"C:\dir\\"#);
        // Only the trailing one; interior backslashes are untouched.
        assert_eq!(escape_arg(r#"a\b"#), r#"a\b"#);
    }

    #[test]
    fn delegate_cmdline_shape() {
        let mods = [
            EnvironmentModification::new("Path", "C:\\b", EnvOp::PrependSemicolon),
            EnvironmentModification::new("  ", "dropped", EnvOp::Replace),
            EnvironmentModification::new(" VK_LAYER ", "1", EnvOp::Replace),
        ];
        let cmdline = delegate_cmdline(
            r#"C:\tools\x86\framecap-cmd.exe"#,
            4242,
            r#"C:\logs\cap.log"#,
            "abcd",
            &mods,
        );

        assert_eq!(
            cmdline,
            r#""C:\tools\x86\framecap-cmd.exe" cap32for64 --pid=4242 --log="C:\logs\cap.log" --capopts="abcd" +env-prepend-semicolon "Path" "C:\b" +env-replace "VK_LAYER" "1""#
        );
    }

    #[test]
    fn global_hook_cmdline_shape() {
        let cmdline = global_hook_cmdline(
            r#"C:\tools\framecap-cmd.exe"#,
            "game.exe",
            r#"C:\logs\hook.log"#,
            "aaaa",
        );
        assert_eq!(
            cmdline,
            r#""C:\tools\framecap-cmd.exe" globalhook --match "game.exe" --log "C:\logs\hook.log" --capopts "aaaa""#
        );
    }

    #[test]
    fn env_args_parse_back() {
        let args: Vec<String> = [
            "+env-prepend-semicolon",
            "Path",
            "C:\\b",
            "+env-replace",
            "X",
            "1",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let mods = parse_env_args(&args).unwrap();
        assert_eq!(
            mods,
            [
                EnvironmentModification::new("Path", "C:\\b", EnvOp::PrependSemicolon),
                EnvironmentModification::new("X", "1", EnvOp::Replace),
            ]
        );
    }

    #[test]
    fn env_args_reject_malformed_groups() {
        let missing_value: Vec<String> = ["+env-append", "NAME"]
            .into_iter()
            .map(String::from)
            .collect();
        assert!(parse_env_args(&missing_value).is_err());

        let bad_tag: Vec<String> = ["envreplace", "NAME", "VALUE"]
            .into_iter()
            .map(String::from)
            .collect();
        assert!(parse_env_args(&bad_tag).is_err());

        let bad_op: Vec<String> = ["+env-rotate", "NAME", "VALUE"]
            .into_iter()
            .map(String::from)
            .collect();
        assert!(parse_env_args(&bad_op).is_err());
    }
}
