use std::borrow::Cow;
use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::warn;

use crate::config::ReconPolicy;
use crate::error::ReconError;

/// Identity key holding the student's name in the persisted transcript.
pub const NAME_KEY: &str = "姓名";
/// Identity key holding the student id in the persisted transcript.
pub const ID_KEY: &str = "学号";

/// Student ids are exactly 14 ASCII digits.
pub fn is_valid_student_id(id: &str) -> bool {
    id.len() == 14 && id.bytes().all(|b| b.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct StudentIdentity {
    pub name: String,
    pub student_id: String,
    /// Any other keys found on the identity object, in file order.
    pub extra: Map<String, Value>,
}

impl StudentIdentity {
    pub fn new(name: impl Into<String>, student_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            student_id: student_id.into(),
            extra: Map::new(),
        }
    }
}

/// One transcript entry. Attribute values are kept as the JSON values they
/// were stored as.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscriptCourse {
    pub attributes: Map<String, Value>,
}

impl TranscriptCourse {
    pub fn new(attributes: Map<String, Value>) -> Self {
        Self { attributes }
    }

    /// Attribute rendered as text. Strings are returned as stored, numbers and
    /// booleans in their JSON form; null and missing are `None`.
    pub fn attribute(&self, key: &str) -> Option<Cow<'_, str>> {
        value_text(self.attributes.get(key)?)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: Value) {
        self.attributes.insert(key.into(), value);
    }
}

fn value_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        other => Some(Cow::Owned(other.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptRecord {
    pub student: StudentIdentity,
    pub courses: Vec<TranscriptCourse>,
}

impl TranscriptRecord {
    pub fn from_json_str(input: &str) -> Result<Self, ReconError> {
        let value: Value =
            serde_json::from_str(input).map_err(|e| ReconError::TranscriptParse(e.to_string()))?;
        Self::from_json_value(value)
    }

    /// Decode the persisted array form: identity object first, then one
    /// object per course.
    pub fn from_json_value(value: Value) -> Result<Self, ReconError> {
        let Value::Array(items) = value else {
            return Err(ReconError::TranscriptSchema(
                "expected a JSON array".to_string(),
            ));
        };
        if items.len() < 2 {
            return Err(ReconError::TranscriptSchema(format!(
                "expected an identity object and at least one course, found {} element(s)",
                items.len()
            )));
        }

        let mut objects = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            match item {
                Value::Object(map) => objects.push(map),
                other => {
                    return Err(ReconError::TranscriptSchema(format!(
                        "element {i} is not an object: {other}"
                    )))
                }
            }
        }

        let mut objects = objects.into_iter();
        let mut identity = objects.next().unwrap_or_default();
        let name = take_identity_key(&mut identity, NAME_KEY)?;
        let student_id = take_identity_key(&mut identity, ID_KEY)?;

        Ok(Self {
            student: StudentIdentity {
                name,
                student_id,
                extra: identity,
            },
            courses: objects.map(TranscriptCourse::new).collect(),
        })
    }

    /// Every course entry must carry each of `required`. The error names the
    /// array element (the identity object is element 0) and the missing key.
    pub fn check_required_keys(&self, required: &[String]) -> Result<(), ReconError> {
        for (i, course) in self.courses.iter().enumerate() {
            if let Some(key) = required.iter().find(|k| !course.attributes.contains_key(k.as_str())) {
                return Err(ReconError::TranscriptSchema(format!(
                    "element {} lacks required key '{key}'",
                    i + 1
                )));
            }
        }
        Ok(())
    }

    pub fn to_json_value(&self) -> Value {
        let mut identity = Map::new();
        identity.insert(NAME_KEY.to_string(), Value::String(self.student.name.clone()));
        identity.insert(
            ID_KEY.to_string(),
            Value::String(self.student.student_id.clone()),
        );
        for (k, v) in &self.student.extra {
            identity.insert(k.clone(), v.clone());
        }

        let mut items = Vec::with_capacity(self.courses.len() + 1);
        items.push(Value::Object(identity));
        items.extend(
            self.courses
                .iter()
                .map(|c| Value::Object(c.attributes.clone())),
        );
        Value::Array(items)
    }

    pub fn to_json_pretty(&self) -> Result<String, ReconError> {
        serde_json::to_string_pretty(&self.to_json_value()).map_err(|e| ReconError::Io(e.to_string()))
    }
}

fn take_identity_key(identity: &mut Map<String, Value>, key: &str) -> Result<String, ReconError> {
    let value = identity
        .remove(key)
        .ok_or_else(|| ReconError::TranscriptSchema(format!("identity object has no '{key}'")))?;
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(ReconError::TranscriptSchema(format!(
            "identity '{key}' must be a string, found {other}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

/// Collapse whitespace runs and trim.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Completed courses keyed by course name. The first entry recorded for a
/// name wins; the subtotal marker is never indexed.
#[derive(Debug, Clone)]
pub struct TranscriptIndex<'a> {
    entries: HashMap<String, &'a TranscriptCourse>,
    normalize: bool,
}

impl<'a> TranscriptIndex<'a> {
    pub fn build(record: &'a TranscriptRecord, policy: &ReconPolicy) -> Self {
        let normalize = policy.classify.normalize_course_names;
        let name_key = policy.transcript.course_name.as_str();
        let mut entries = HashMap::new();

        for (i, course) in record.courses.iter().enumerate() {
            let Some(name) = course.attribute(name_key) else {
                warn!(entry = i + 1, key = name_key, "transcript entry has no course name; skipped");
                continue;
            };
            let key = if normalize {
                normalize_name(&name)
            } else {
                name.into_owned()
            };
            if key == policy.classify.subtotal_marker {
                continue;
            }
            entries.entry(key).or_insert(course);
        }

        Self { entries, normalize }
    }

    pub fn lookup(&self, course_name: &str) -> Option<&'a TranscriptCourse> {
        if self.normalize {
            self.entries.get(&normalize_name(course_name)).copied()
        } else {
            self.entries.get(course_name).copied()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
