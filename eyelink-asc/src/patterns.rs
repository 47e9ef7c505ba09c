//! Compilation of user-supplied message patterns.
//!
//! A pattern is either a bare regex, whose named groups become column (or
//! metadata) names, or a mapping that assigns a fixed value to a named column
//! (or metadata key) whenever one of its regexes matches. All patterns match
//! against `MSG` lines only: [`MESSAGE_PREFIX`] is prepended to every regex.

use std::collections::BTreeSet;

use gazeframe::Value;
use regex::Regex;

use crate::AscParserError;

/// Prepended to every user pattern; matches `MSG <timestamp> `.
pub const MESSAGE_PREFIX: &str = r"MSG\s+\d+[.]?\d*\s+";

/// One regex or several alternatives sharing the same assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternSource {
    One(String),
    Many(Vec<String>),
}

impl PatternSource {
    fn regexes(&self) -> &[String] {
        match self {
            PatternSource::One(p) => std::slice::from_ref(p),
            PatternSource::Many(ps) => ps,
        }
    }
}

impl From<&str> for PatternSource {
    fn from(s: &str) -> Self {
        PatternSource::One(s.to_string())
    }
}

impl From<Vec<&str>> for PatternSource {
    fn from(v: Vec<&str>) -> Self {
        PatternSource::Many(v.into_iter().map(String::from).collect())
    }
}

/// A pattern that assigns `value` to `column` (for sample/event patterns) or
/// to `key` (for metadata patterns). Without a value, the named groups of the
/// regex are assigned instead.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternMapping {
    pub pattern: PatternSource,
    pub column: Option<String>,
    pub key: Option<String>,
    pub value: Option<Value>,
}

impl PatternMapping {
    pub fn new<P: Into<PatternSource>>(pattern: P) -> PatternMapping {
        PatternMapping {
            pattern: pattern.into(),
            column: None,
            key: None,
            value: None,
        }
    }

    pub fn column(mut self, column: &str) -> PatternMapping {
        self.column = Some(column.to_string());
        self
    }

    pub fn key(mut self, key: &str) -> PatternMapping {
        self.key = Some(key.to_string());
        self
    }

    pub fn value<V: Into<Value>>(mut self, value: V) -> PatternMapping {
        self.value = Some(value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternSpec {
    Regex(String),
    Mapping(PatternMapping),
}

impl From<&str> for PatternSpec {
    fn from(s: &str) -> Self {
        PatternSpec::Regex(s.to_string())
    }
}

impl From<PatternMapping> for PatternSpec {
    fn from(m: PatternMapping) -> Self {
        PatternSpec::Mapping(m)
    }
}

fn invalid(value: &toml::Value) -> AscParserError {
    AscParserError::InvalidPattern(value.to_string())
}

fn optional_str(
    table: &toml::value::Table,
    field: &str,
    whole: &toml::Value,
) -> Result<Option<String>, AscParserError> {
    match table.get(field) {
        None => Ok(None),
        Some(toml::Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(invalid(whole)),
    }
}

/// Patterns as written in a TOML settings file:
///
/// ```toml
/// patterns = [
///     "TRIALID (?P<trial_id>\\d+)",
///     { pattern = "START_TASK_A", column = "task", value = "A" },
///     { pattern = ["END_TASK_A", "END_TASK_B"], column = "task", reset = true },
/// ]
/// ```
///
/// `reset = true` assigns null.
impl TryFrom<&toml::Value> for PatternSpec {
    type Error = AscParserError;

    fn try_from(value: &toml::Value) -> Result<PatternSpec, AscParserError> {
        let table = match value {
            toml::Value::String(s) => return Ok(PatternSpec::Regex(s.clone())),
            toml::Value::Table(t) => t,
            _ => return Err(invalid(value)),
        };

        let pattern = match table.get("pattern") {
            Some(toml::Value::String(s)) => PatternSource::One(s.clone()),
            Some(toml::Value::Array(items)) => PatternSource::Many(
                items
                    .iter()
                    .map(|item| match item {
                        toml::Value::String(s) => Ok(s.clone()),
                        _ => Err(invalid(value)),
                    })
                    .collect::<Result<_, _>>()?,
            ),
            _ => return Err(invalid(value)),
        };

        let literal = match table.get("value") {
            None => None,
            Some(toml::Value::String(s)) => Some(Value::Str(s.clone())),
            Some(toml::Value::Integer(i)) => Some(Value::Int(*i)),
            Some(toml::Value::Float(f)) => Some(Value::Float(*f)),
            Some(toml::Value::Boolean(b)) => Some(Value::Bool(*b)),
            Some(other) => Some(Value::Str(other.to_string())),
        };
        let reset = matches!(table.get("reset"), Some(toml::Value::Boolean(true)));

        Ok(PatternSpec::Mapping(PatternMapping {
            pattern,
            column: optional_str(table, "column", value)?,
            key: optional_str(table, "key", value)?,
            value: if reset { Some(Value::Null) } else { literal },
        }))
    }
}

/// Which field of a mapping names the assignment target.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PatternField {
    /// Sample/event patterns assign to `column`.
    Column,
    /// Metadata patterns assign to `key`.
    Key,
}

impl PatternField {
    fn target<'a>(self, mapping: &'a PatternMapping) -> Option<&'a String> {
        match self {
            PatternField::Column => mapping.column.as_ref(),
            PatternField::Key => mapping.key.as_ref(),
        }
    }
}

/// A compiled regex tagged with the spec it came from.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    regex: Regex,
    target: Option<String>,
    value: Option<Value>,
    spec: Option<PatternSpec>,
}

impl CompiledPattern {
    /// A pattern assigning the named groups of `regex`, without the `MSG`
    /// prefix.
    pub(crate) fn from_regex(regex: Regex) -> CompiledPattern {
        CompiledPattern {
            regex,
            target: None,
            value: None,
            spec: None,
        }
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn spec(&self) -> Option<&PatternSpec> {
        self.spec.as_ref()
    }

    pub fn is_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }

    /// Assign this pattern's values into `target` if `line` matches.
    ///
    /// Returns whether the line matched. Named groups that did not take part
    /// in the match are assigned null.
    pub fn apply(&self, line: &str, target: &mut std::collections::BTreeMap<String, Value>) -> bool {
        let caps = match self.regex.captures(line) {
            None => return false,
            Some(caps) => caps,
        };

        if let (Some(name), Some(value)) = (&self.target, &self.value) {
            target.insert(name.clone(), value.clone());
            return true;
        }
        for name in self.regex.capture_names().flatten() {
            let value = caps.name(name).map(|m| Value::from(m.as_str())).unwrap_or_default();
            target.insert(name.to_string(), value);
        }
        true
    }
}

/// Compile `specs` into anchored regexes matching `MSG` lines.
///
/// A mapping with several regexes yields one compiled pattern per regex. A
/// mapping carrying a value must name its target `field`.
pub fn compile_patterns(
    specs: &[PatternSpec],
    field: PatternField,
) -> Result<Vec<CompiledPattern>, AscParserError> {
    let mut compiled = vec![];
    for spec in specs {
        let (sources, target, value) = match spec {
            PatternSpec::Regex(p) => (std::slice::from_ref(p), None, None),
            PatternSpec::Mapping(mapping) => {
                let target = field.target(mapping);
                if mapping.value.is_some() && target.is_none() {
                    return Err(AscParserError::InvalidPattern(format!(
                        "{:?} assigns a value but names no {}",
                        mapping.pattern,
                        match field {
                            PatternField::Column => "column",
                            PatternField::Key => "key",
                        }
                    )));
                }
                (mapping.pattern.regexes(), target.cloned(), mapping.value.clone())
            }
        };
        for source in sources {
            compiled.push(CompiledPattern {
                regex: Regex::new(&format!("^{}{}", MESSAGE_PREFIX, source))?,
                target: target.clone(),
                value: value.clone(),
                spec: Some(spec.clone()),
            });
        }
    }
    Ok(compiled)
}

/// Every name the compiled patterns can assign: explicit targets plus every
/// named capture group.
pub fn pattern_keys(patterns: &[CompiledPattern]) -> BTreeSet<String> {
    let mut keys = BTreeSet::new();
    for pattern in patterns {
        if let Some(target) = &pattern.target {
            keys.insert(target.clone());
        }
        keys.extend(pattern.regex.capture_names().flatten().map(String::from));
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_compile_prefixes_message() {
        let specs = vec![PatternSpec::from(r"TRIALID (?P<trial_id>\d+)")];
        let compiled = compile_patterns(&specs, PatternField::Column).unwrap();
        assert_eq!(compiled.len(), 1);
        assert!(compiled[0].is_match("MSG 10000001 TRIALID 3"));
        assert!(compiled[0].is_match("MSG\t10000001.5\tTRIALID 3"));
        assert!(!compiled[0].is_match("TRIALID 3"));
        assert!(!compiled[0].is_match("INPUT 10000001 TRIALID 3"));
    }

    #[test]
    fn test_mapping_with_many_regexes() {
        let specs = vec![PatternSpec::from(
            PatternMapping::new(vec!["END_TASK_A", "END_TASK_B"])
                .column("task")
                .value(Value::Null),
        )];
        let compiled = compile_patterns(&specs, PatternField::Column).unwrap();
        assert_eq!(compiled.len(), 2);
        assert_eq!(compiled[1].spec(), Some(&specs[0]));
    }

    #[test]
    fn test_apply_value_and_groups() {
        let specs = vec![
            PatternSpec::from(PatternMapping::new("START_A").column("task").value("A")),
            PatternSpec::from(r"TRIAL (?P<trial_id>\d+)(?: (?P<block>\w+))?"),
        ];
        let compiled = compile_patterns(&specs, PatternField::Column).unwrap();
        let mut current = BTreeMap::new();

        assert!(compiled[0].apply("MSG 1 START_A", &mut current));
        assert!(!compiled[1].apply("MSG 1 START_A", &mut current));
        assert!(compiled[1].apply("MSG 2 TRIAL 7", &mut current));

        assert_eq!(current["task"], Value::from("A"));
        assert_eq!(current["trial_id"], Value::from("7"));
        assert_eq!(current["block"], Value::Null);
    }

    #[test]
    fn test_pattern_keys() {
        let specs = vec![
            PatternSpec::from(PatternMapping::new("START_A").column("task").value("A")),
            PatternSpec::from(r"TRIAL (?P<trial_id>\d+)"),
        ];
        let compiled = compile_patterns(&specs, PatternField::Column).unwrap();
        let keys: Vec<String> = pattern_keys(&compiled).into_iter().collect();
        assert_eq!(keys, vec!["task".to_string(), "trial_id".to_string()]);
    }

    #[test]
    fn test_value_without_target_is_invalid() {
        let specs = vec![PatternSpec::from(PatternMapping::new("START_A").key("task").value("A"))];
        assert!(compile_patterns(&specs, PatternField::Key).is_ok());
        match compile_patterns(&specs, PatternField::Column) {
            Err(AscParserError::InvalidPattern(_)) => (),
            other => panic!("Should have failed, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_regex() {
        let specs = vec![PatternSpec::from("TRIAL (")];
        if let Ok(_) = compile_patterns(&specs, PatternField::Column) {
            panic!("Should have failed.");
        }
    }

    #[test]
    fn test_from_toml() {
        let settings: toml::Value = toml::from_str(
            r#"
            regex = "TRIALID (?P<trial_id>\\d+)"
            assign = { pattern = "START_A", column = "task", value = "A" }
            reset = { pattern = ["END_A", "END_B"], column = "task", reset = true }
            number = 1
            "#,
        )
        .unwrap();

        assert_eq!(
            PatternSpec::try_from(&settings["regex"]).unwrap(),
            PatternSpec::Regex(r"TRIALID (?P<trial_id>\d+)".into())
        );
        assert_eq!(
            PatternSpec::try_from(&settings["assign"]).unwrap(),
            PatternSpec::from(PatternMapping::new("START_A").column("task").value("A"))
        );
        assert_eq!(
            PatternSpec::try_from(&settings["reset"]).unwrap(),
            PatternSpec::from(
                PatternMapping::new(vec!["END_A", "END_B"])
                    .column("task")
                    .value(Value::Null)
            )
        );

        let err = PatternSpec::try_from(&settings["number"]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("invalid pattern"));
        assert!(msg.contains('1'));
    }
}
