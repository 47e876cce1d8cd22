//! Small path and name helpers used by the orchestrator.

/// Case-insensitive substring match of a module query against a module's
/// short name. The query may be a full file name (`capture.dll`) or any
/// fragment of one.
pub fn module_name_matches(module: &str, query: &str) -> bool {
    module.to_lowercase().contains(&query.to_lowercase())
}

/// Directory portion of an application path, used as the working-directory
/// fallback when the caller supplies none. Handles both separator styles so
/// command-line input does not have to be normalised first.
pub fn dirname(app: &str) -> &str {
    match app.rfind(['\\', '/']) {
        Some(i) => &app[..i],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_matching_is_case_insensitive_substring() {
        assert!(module_name_matches("LIB.DLL", "lib.dll"));
        assert!(module_name_matches("some_capture.dll", "capture.dll"));
        assert!(!module_name_matches("other.dll", "capture.dll"));
    }

    #[test]
    fn dirname_of_application_path() {
        assert_eq!(dirname(r#"C:\tools\app.exe"#), r#"C:\tools"#);
        assert_eq!(dirname("C:/tools/app.exe"), "C:/tools");
        assert_eq!(dirname("bare.exe"), "");
    }
}
