//! Environment-modification model and the merge algorithm applied inside the
//! target process.
//!
//! The controller cannot rewrite the startup environment of a process it did
//! not launch, so edits are shipped into the capture library one record at a
//! time and merged into the live environment block at a single boot point.
//! This module holds the record types and the pure merge; the capture library
//! commits the results with `SetEnvironmentVariableW`.

use std::{collections::HashMap, str::FromStr};

use thiserror::Error;

/// How a single environment edit combines with the variable's current value.
///
/// The `*Platform` variants follow the separator convention of the host;
/// on Windows that is the semicolon.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvOp {
    Replace = 0,
    Append = 1,
    AppendColon = 2,
    AppendSemicolon = 3,
    AppendPlatform = 4,
    Prepend = 5,
    PrependColon = 6,
    PrependSemicolon = 7,
    PrependPlatform = 8,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown environment operation `{0}`")]
pub struct UnknownEnvOp(pub String);

impl EnvOp {
    /// Kebab-case name used on the delegated helper command line
    /// (`+env-<op>`).
    pub fn as_str(self) -> &'static str {
        match self {
            EnvOp::Replace => "replace",
            EnvOp::Append => "append",
            EnvOp::AppendColon => "append-colon",
            EnvOp::AppendSemicolon => "append-semicolon",
            EnvOp::AppendPlatform => "append-platform",
            EnvOp::Prepend => "prepend",
            EnvOp::PrependColon => "prepend-colon",
            EnvOp::PrependSemicolon => "prepend-semicolon",
            EnvOp::PrependPlatform => "prepend-platform",
        }
    }

    /// Decode the 4-byte wire form received by the capture library's
    /// `RENDERDOC_EnvMod` entry point.
    pub fn from_u32(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => EnvOp::Replace,
            1 => EnvOp::Append,
            2 => EnvOp::AppendColon,
            3 => EnvOp::AppendSemicolon,
            4 => EnvOp::AppendPlatform,
            5 => EnvOp::Prepend,
            6 => EnvOp::PrependColon,
            7 => EnvOp::PrependSemicolon,
            8 => EnvOp::PrependPlatform,
            _ => return None,
        })
    }

    fn is_prepend(self) -> bool {
        matches!(
            self,
            EnvOp::Prepend
                | EnvOp::PrependColon
                | EnvOp::PrependSemicolon
                | EnvOp::PrependPlatform
        )
    }

    /// Separator inserted between the edit value and an existing non-empty
    /// value. `None` for the unconditional concatenation variants.
    fn separator(self) -> Option<char> {
        match self {
            EnvOp::AppendColon | EnvOp::PrependColon => Some(':'),
            EnvOp::AppendSemicolon
            | EnvOp::PrependSemicolon
            | EnvOp::AppendPlatform
            | EnvOp::PrependPlatform => Some(';'),
            EnvOp::Replace | EnvOp::Append | EnvOp::Prepend => None,
        }
    }
}

impl FromStr for EnvOp {
    type Err = UnknownEnvOp;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "replace" => EnvOp::Replace,
            "append" => EnvOp::Append,
            "append-colon" => EnvOp::AppendColon,
            "append-semicolon" => EnvOp::AppendSemicolon,
            "append-platform" => EnvOp::AppendPlatform,
            "prepend" => EnvOp::Prepend,
            "prepend-colon" => EnvOp::PrependColon,
            "prepend-semicolon" => EnvOp::PrependSemicolon,
            "prepend-platform" => EnvOp::PrependPlatform,
            other => return Err(UnknownEnvOp(other.to_string())),
        })
    }
}

/// One environment edit, shipped to the capture library as a
/// name / value / op triple of remote calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentModification {
    pub name: String,
    pub value: String,
    pub op: EnvOp,
}

impl EnvironmentModification {
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V, op: EnvOp) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            op,
        }
    }
}

/// Snapshot of an environment, keyed by lowercased variable name for
/// case-insensitive lookups. Built once per apply, never persisted.
pub type EnvironmentMap = HashMap<String, String>;

/// Build an [`EnvironmentMap`] from `(name, value)` pairs as parsed out of a
/// live environment block.
pub fn environment_map<I>(pairs: I) -> EnvironmentMap
where
    I: IntoIterator<Item = (String, String)>,
{
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_lowercase(), value))
        .collect()
}

/// Merge a single edit into the map and return the `(name, value)` pair to
/// commit to the live environment.
///
/// When the variable already exists the lookup key's lowercased casing is
/// adopted as the commit name, so the OS-level set updates the existing slot
/// rather than minting a differently-cased twin; otherwise the edit's own
/// casing is preserved. The map is written through so later edits in the same
/// batch observe this one's result.
pub fn merge_modification(
    map: &mut EnvironmentMap,
    modification: &EnvironmentModification,
) -> (String, String) {
    let lowername = modification.name.to_lowercase();

    let (mut value, name) = match map.get(&lowername) {
        Some(existing) => (existing.clone(), lowername.clone()),
        None => (String::new(), modification.name.clone()),
    };

    match modification.op {
        EnvOp::Replace => value = modification.value.clone(),
        EnvOp::Append => value.push_str(&modification.value),
        EnvOp::Prepend => value = format!("{}{}", modification.value, value),
        op => {
            // Separator variants degrade to plain assignment when there is
            // nothing to separate from.
            let sep = op.separator().unwrap_or(';');
            if value.is_empty() {
                value = modification.value.clone();
            } else if op.is_prepend() {
                value = format!("{}{}{}", modification.value, sep, value);
            } else {
                value.push(sep);
                value.push_str(&modification.value);
            }
        }
    }

    map.insert(lowername, value.clone());
    (name, value)
}

/// Merge a whole batch in order, returning the commits to perform.
///
/// Edits are sequenced, not commutative: each commit is visible to the edits
/// after it.
pub fn merge_modifications(
    map: &mut EnvironmentMap,
    modifications: &[EnvironmentModification],
) -> Vec<(String, String)> {
    modifications
        .iter()
        .map(|modification| merge_modification(map, modification))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Model of the live Windows environment: case-insensitive name lookup,
    /// first writer's casing wins, like `SetEnvironmentVariableW`.
    fn commit(live: &mut Vec<(String, String)>, name: &str, value: &str) {
        match live
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some((_, v)) => *v = value.to_string(),
            None => live.push((name.to_string(), value.to_string())),
        }
    }

    fn apply(
        live: &mut Vec<(String, String)>,
        modifications: &[EnvironmentModification],
    ) {
        let mut map = environment_map(live.iter().cloned());
        for (name, value) in merge_modifications(&mut map, modifications) {
            commit(live, &name, &value);
        }
    }

    #[test]
    fn prepend_semicolon_with_existing_value() {
        let mut live = vec![("PATH".to_string(), "C:\\a".to_string())];
        apply(
            &mut live,
            &[EnvironmentModification::new(
                "Path",
                "C:\\b",
                EnvOp::PrependSemicolon,
            )],
        );
        assert_eq!(live, [("PATH".to_string(), "C:\\b;C:\\a".to_string())]);
    }

    #[test]
    fn separator_suppressed_when_unset() {
        let mut live = Vec::new();
        apply(
            &mut live,
            &[EnvironmentModification::new("FOO", "1", EnvOp::AppendColon)],
        );
        assert_eq!(live, [("FOO".to_string(), "1".to_string())]);
    }

    #[test]
    fn edits_in_one_batch_compose() {
        let mut live = Vec::new();
        apply(
            &mut live,
            &[
                EnvironmentModification::new("X", "a", EnvOp::Replace),
                EnvironmentModification::new("X", "b", EnvOp::Append),
            ],
        );
        assert_eq!(live, [("X".to_string(), "ab".to_string())]);
    }

    #[test]
    fn case_insensitive_hit_keeps_existing_variable() {
        let mut live = vec![("PATH".to_string(), "foo".to_string())];
        apply(
            &mut live,
            &[EnvironmentModification::new(
                "path",
                "bar",
                EnvOp::AppendSemicolon,
            )],
        );
        // One variable, original casing, merged value.
        assert_eq!(live, [("PATH".to_string(), "foo;bar".to_string())]);
    }

    #[test]
    fn missing_variable_preserves_edit_casing() {
        let mut live = Vec::new();
        apply(
            &mut live,
            &[EnvironmentModification::new("MyVar", "x", EnvOp::Replace)],
        );
        assert_eq!(live, [("MyVar".to_string(), "x".to_string())]);
    }

    #[test]
    fn all_separator_variants() {
        let cases = [
            (EnvOp::AppendColon, "old:new"),
            (EnvOp::AppendSemicolon, "old;new"),
            (EnvOp::AppendPlatform, "old;new"),
            (EnvOp::PrependColon, "new:old"),
            (EnvOp::PrependSemicolon, "new;old"),
            (EnvOp::PrependPlatform, "new;old"),
        ];
        for (op, expected) in cases {
            let mut live = vec![("V".to_string(), "old".to_string())];
            apply(&mut live, &[EnvironmentModification::new("V", "new", op)]);
            assert_eq!(live[0].1, expected, "{op:?}");
        }
    }

    #[test]
    fn plain_append_and_prepend_take_no_separator() {
        let mut live = vec![("V".to_string(), "mid".to_string())];
        apply(
            &mut live,
            &[
                EnvironmentModification::new("V", "pre-", EnvOp::Prepend),
                EnvironmentModification::new("V", "-post", EnvOp::Append),
            ],
        );
        assert_eq!(live[0].1, "pre-mid-post");
    }

    #[test]
    fn merge_is_deterministic() {
        let edits = [
            EnvironmentModification::new("A", "1", EnvOp::Replace),
            EnvironmentModification::new("b", "2", EnvOp::PrependColon),
            EnvironmentModification::new("A", "3", EnvOp::AppendSemicolon),
        ];
        let run = || {
            let mut live = vec![("B".to_string(), "base".to_string())];
            apply(&mut live, &edits);
            live
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let mut live = vec![("KEEP".to_string(), "me".to_string())];
        let before = live.clone();
        apply(&mut live, &[]);
        assert_eq!(live, before);
    }

    #[test]
    fn op_names_round_trip() {
        for op in [
            EnvOp::Replace,
            EnvOp::Append,
            EnvOp::AppendColon,
            EnvOp::AppendSemicolon,
            EnvOp::AppendPlatform,
            EnvOp::Prepend,
            EnvOp::PrependColon,
            EnvOp::PrependSemicolon,
            EnvOp::PrependPlatform,
        ] {
            assert_eq!(op.as_str().parse::<EnvOp>(), Ok(op));
            assert_eq!(EnvOp::from_u32(op as u32), Some(op));
        }

        assert!("append-platforms".parse::<EnvOp>().is_err());
        assert_eq!(EnvOp::from_u32(9), None);
    }
}
