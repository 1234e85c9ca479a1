// src/schema.rs

//! Per-collection structural validators.
//!
//! Each collection carries a declarative [`CollectionSchema`]: the attribute
//! set, the storage type of every attribute, required fields and enum
//! constraints. Raw JSON is checked against it at the storage boundary before
//! it is handed to the typed models in [`crate::models`].

use std::{fmt, str::FromStr};

use chrono::DateTime;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::error::AppError;

/// Field holding the store-assigned document id.
pub const ID_FIELD: &str = "_id";

/// The four collections of the content store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionName {
    LessonContent,
    CodeTemplates,
    UserNotes,
    Exercises,
}

impl CollectionName {
    pub const ALL: [CollectionName; 4] = [
        CollectionName::LessonContent,
        CollectionName::CodeTemplates,
        CollectionName::UserNotes,
        CollectionName::Exercises,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionName::LessonContent => "lesson_content",
            CollectionName::CodeTemplates => "code_templates",
            CollectionName::UserNotes => "user_notes",
            CollectionName::Exercises => "exercises",
        }
    }

    pub fn schema(&self) -> &'static CollectionSchema {
        match self {
            CollectionName::LessonContent => &LESSON_CONTENT,
            CollectionName::CodeTemplates => &CODE_TEMPLATES,
            CollectionName::UserNotes => &USER_NOTES,
            CollectionName::Exercises => &EXERCISES,
        }
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionName {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CollectionName::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| AppError::NotFound(format!("Collection '{}' does not exist", s)))
    }
}

/// Storage type of a field, named after the BSON types the validators declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BsonType {
    /// 64-bit integer.
    Long,
    /// 32-bit integer.
    Int,
    String,
    Bool,
    /// RFC 3339 timestamp string.
    Date,
    Object,
    Array,
}

impl BsonType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BsonType::Long => "long",
            BsonType::Int => "int",
            BsonType::String => "string",
            BsonType::Bool => "bool",
            BsonType::Date => "date",
            BsonType::Object => "object",
            BsonType::Array => "array",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            BsonType::Long => value.as_i64().is_some(),
            BsonType::Int => value
                .as_i64()
                .is_some_and(|n| i32::try_from(n).is_ok()),
            BsonType::String => value.is_string(),
            BsonType::Bool => value.is_boolean(),
            BsonType::Date => value
                .as_str()
                .is_some_and(|s| DateTime::parse_from_rfc3339(s).is_ok()),
            BsonType::Object => value.is_object(),
            BsonType::Array => value.is_array(),
        }
    }
}

/// Declarative constraint for one attribute.
#[derive(Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub bson_type: BsonType,
    /// Allowed values for string enums. Empty means unconstrained.
    pub allowed: &'static [&'static str],
    pub minimum: Option<i64>,
    pub min_items: Option<usize>,
    /// Element constraint for arrays.
    pub items: Option<&'static FieldSpec>,
    /// Declared sub-fields for objects. Empty means an opaque payload.
    pub properties: &'static [FieldSpec],
    pub description: &'static str,
}

impl FieldSpec {
    pub const fn new(name: &'static str, bson_type: BsonType, description: &'static str) -> Self {
        Self {
            name,
            bson_type,
            allowed: &[],
            minimum: None,
            min_items: None,
            items: None,
            properties: &[],
            description,
        }
    }

    pub const fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = allowed;
        self
    }

    pub const fn minimum(mut self, minimum: i64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub const fn min_items(mut self, min_items: usize) -> Self {
        self.min_items = Some(min_items);
        self
    }

    pub const fn items(mut self, items: &'static FieldSpec) -> Self {
        self.items = Some(items);
        self
    }

    pub const fn properties(mut self, properties: &'static [FieldSpec]) -> Self {
        self.properties = properties;
        self
    }

    fn check(&self, path: &str, value: &Value, violations: &mut Vec<String>) {
        if !self.bson_type.matches(value) {
            violations.push(format!(
                "{}: expected {}, found {}",
                path,
                self.bson_type.as_str(),
                describe(value)
            ));
            return;
        }

        if !self.allowed.is_empty() {
            if let Some(s) = value.as_str() {
                if !self.allowed.contains(&s) {
                    violations.push(format!(
                        "{}: '{}' is not one of [{}]",
                        path,
                        s,
                        self.allowed.join(", ")
                    ));
                }
            }
        }

        if let (Some(minimum), Some(n)) = (self.minimum, value.as_i64()) {
            if n < minimum {
                violations.push(format!("{}: {} is less than minimum {}", path, n, minimum));
            }
        }

        if let Some(items) = value.as_array() {
            if let Some(min) = self.min_items {
                if items.len() < min {
                    violations.push(format!(
                        "{}: expected at least {} item(s), found {}",
                        path,
                        min,
                        items.len()
                    ));
                }
            }
            if let Some(item_spec) = self.items {
                for (idx, item) in items.iter().enumerate() {
                    item_spec.check(&format!("{}[{}]", path, idx), item, violations);
                }
            }
        }

        if let Some(obj) = value.as_object() {
            if !self.properties.is_empty() {
                check_properties(path, obj, self.properties, &[], violations);
            }
        }
    }

    fn to_json_schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("bsonType".into(), json!(self.bson_type.as_str()));
        if !self.allowed.is_empty() {
            schema.insert("enum".into(), json!(self.allowed));
        }
        if let Some(minimum) = self.minimum {
            schema.insert("minimum".into(), json!(minimum));
        }
        if let Some(min_items) = self.min_items {
            schema.insert("minItems".into(), json!(min_items));
        }
        if let Some(items) = self.items {
            schema.insert("items".into(), items.to_json_schema());
        }
        if !self.properties.is_empty() {
            schema.insert("properties".into(), properties_json(self.properties));
        }
        if !self.description.is_empty() {
            schema.insert("description".into(), json!(self.description));
        }
        Value::Object(schema)
    }
}

/// Validator of one collection.
#[derive(Debug)]
pub struct CollectionSchema {
    pub name: CollectionName,
    pub required: &'static [&'static str],
    pub fields: &'static [FieldSpec],
}

impl CollectionSchema {
    /// Checks a raw document, returning every violation found.
    ///
    /// Unknown top-level attributes are rejected, `_id` excepted.
    pub fn validate(&self, document: &Value) -> Result<(), AppError> {
        let Some(obj) = document.as_object() else {
            return Err(AppError::ValidationFailed(vec![format!(
                "document: expected object, found {}",
                describe(document)
            )]));
        };

        let mut violations = Vec::new();
        for name in self.required {
            if !obj.contains_key(*name) {
                violations.push(format!("{}: required field is missing", name));
            }
        }
        if let Some(id) = obj.get(ID_FIELD) {
            if !id.is_string() {
                violations.push(format!("{}: expected string, found {}", ID_FIELD, describe(id)));
            }
        }
        check_properties("", obj, self.fields, &[ID_FIELD], &mut violations);

        if violations.is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationFailed(violations))
        }
    }

    pub fn field(&self, path: &str) -> Option<&'static FieldSpec> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut spec = self.fields.iter().find(|f| f.name == first)?;
        for segment in segments {
            let props = match spec.items {
                Some(items) => items.properties,
                None => spec.properties,
            };
            spec = props.iter().find(|f| f.name == segment)?;
        }
        Some(spec)
    }

    /// Renders the validator in `$jsonSchema` form.
    pub fn to_json_schema(&self) -> Value {
        json!({
            "$jsonSchema": {
                "bsonType": "object",
                "required": self.required,
                "properties": properties_json(self.fields),
            }
        })
    }
}

fn properties_json(fields: &[FieldSpec]) -> Value {
    let mut props = Map::new();
    for field in fields {
        props.insert(field.name.to_string(), field.to_json_schema());
    }
    Value::Object(props)
}

fn check_properties(
    prefix: &str,
    obj: &Map<String, Value>,
    fields: &[FieldSpec],
    ignored: &[&str],
    violations: &mut Vec<String>,
) {
    for (key, value) in obj {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match fields.iter().find(|f| f.name == key) {
            Some(spec) => spec.check(&path, value, violations),
            None if ignored.contains(&key.as_str()) => {}
            None => violations.push(format!("{}: unknown field", path)),
        }
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "double",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

static STRING_ITEM: FieldSpec = FieldSpec::new("item", BsonType::String, "");

const CREATED_AT: FieldSpec = FieldSpec::new("createdAt", BsonType::Date, "Creation time");
const UPDATED_AT: FieldSpec = FieldSpec::new("updatedAt", BsonType::Date, "Last modification time");

pub const LANGUAGES: &[&str] = &["java", "python", "javascript", "cpp", "csharp", "go", "rust"];

pub static LESSON_CONTENT: CollectionSchema = CollectionSchema {
    name: CollectionName::LessonContent,
    required: &["lessonId", "courseId", "contentType", "content"],
    fields: &[
        FieldSpec::new("lessonId", BsonType::Long, "Lesson id, unique"),
        FieldSpec::new("courseId", BsonType::Long, "Owning course id"),
        FieldSpec::new("contentType", BsonType::String, "Content type")
            .one_of(&["markdown", "html", "video", "interactive"]),
        FieldSpec::new("content", BsonType::Object, "Lesson content payload"),
        FieldSpec::new("metadata", BsonType::Object, "Metadata, may carry a tag list"),
        FieldSpec::new("version", BsonType::Int, "Content version").minimum(1),
        CREATED_AT,
        UPDATED_AT,
    ],
};

const PLACEHOLDER_PROPS: &[FieldSpec] = &[
    FieldSpec::new("name", BsonType::String, ""),
    FieldSpec::new("description", BsonType::String, ""),
    FieldSpec::new("defaultValue", BsonType::String, ""),
];

static PLACEHOLDER_ITEM: FieldSpec =
    FieldSpec::new("placeholder", BsonType::Object, "").properties(PLACEHOLDER_PROPS);

pub static CODE_TEMPLATES: CollectionSchema = CollectionSchema {
    name: CollectionName::CodeTemplates,
    required: &["language", "templateType", "code"],
    fields: &[
        FieldSpec::new("language", BsonType::String, "Programming language").one_of(LANGUAGES),
        FieldSpec::new("templateType", BsonType::String, "Template type")
            .one_of(&["basic", "class", "function", "algorithm", "data-structure"]),
        FieldSpec::new("name", BsonType::String, "Template name"),
        FieldSpec::new("description", BsonType::String, "Template description"),
        FieldSpec::new("code", BsonType::String, "Template code"),
        FieldSpec::new("placeholders", BsonType::Array, "Code placeholders").items(&PLACEHOLDER_ITEM),
        FieldSpec::new("tags", BsonType::Array, "Tags").items(&STRING_ITEM),
        FieldSpec::new("difficulty", BsonType::String, "Difficulty level")
            .one_of(&["beginner", "intermediate", "advanced"]),
        FieldSpec::new("isPublic", BsonType::Bool, "Visible platform-wide"),
        FieldSpec::new("createdBy", BsonType::Long, "Author user id"),
        CREATED_AT,
        UPDATED_AT,
    ],
};

const POSITION_PROPS: &[FieldSpec] = &[
    FieldSpec::new("timestamp", BsonType::Int, ""),
    FieldSpec::new("line", BsonType::Int, ""),
    FieldSpec::new("column", BsonType::Int, ""),
];

pub static USER_NOTES: CollectionSchema = CollectionSchema {
    name: CollectionName::UserNotes,
    required: &["userId", "noteType", "content"],
    fields: &[
        FieldSpec::new("userId", BsonType::Long, "Owner user id"),
        FieldSpec::new("courseId", BsonType::Long, "Course id"),
        FieldSpec::new("lessonId", BsonType::Long, "Lesson id"),
        FieldSpec::new("noteType", BsonType::String, "Note type")
            .one_of(&["text", "code", "bookmark", "question"]),
        FieldSpec::new("title", BsonType::String, "Note title"),
        FieldSpec::new("content", BsonType::String, "Note content"),
        FieldSpec::new("tags", BsonType::Array, "Tags").items(&STRING_ITEM),
        FieldSpec::new("isPrivate", BsonType::Bool, "Visible to the owner only"),
        FieldSpec::new("position", BsonType::Object, "Anchor into the source material")
            .properties(POSITION_PROPS),
        CREATED_AT,
        UPDATED_AT,
    ],
};

const TEST_CASE_PROPS: &[FieldSpec] = &[
    FieldSpec::new("input", BsonType::String, ""),
    FieldSpec::new("expectedOutput", BsonType::String, ""),
    FieldSpec::new("isHidden", BsonType::Bool, ""),
    FieldSpec::new("description", BsonType::String, ""),
];

static TEST_CASE_ITEM: FieldSpec =
    FieldSpec::new("testCase", BsonType::Object, "").properties(TEST_CASE_PROPS);

pub static EXERCISES: CollectionSchema = CollectionSchema {
    name: CollectionName::Exercises,
    required: &["lessonId", "title", "description", "language", "testCases"],
    fields: &[
        FieldSpec::new("lessonId", BsonType::Long, "Lesson id"),
        FieldSpec::new("title", BsonType::String, "Exercise title"),
        FieldSpec::new("description", BsonType::String, "Problem statement"),
        FieldSpec::new("language", BsonType::String, "Programming language"),
        FieldSpec::new("difficulty", BsonType::String, "Difficulty level")
            .one_of(&["easy", "medium", "hard"]),
        FieldSpec::new("starterCode", BsonType::String, "Starter code"),
        FieldSpec::new("solutionCode", BsonType::String, "Reference solution"),
        FieldSpec::new("testCases", BsonType::Array, "Test cases")
            .min_items(1)
            .items(&TEST_CASE_ITEM),
        FieldSpec::new("hints", BsonType::Array, "Hints").items(&STRING_ITEM),
        FieldSpec::new("timeLimit", BsonType::Int, "Time limit in seconds"),
        FieldSpec::new("memoryLimit", BsonType::Int, "Memory limit in KB"),
        FieldSpec::new("tags", BsonType::Array, "Tags").items(&STRING_ITEM),
        CREATED_AT,
        UPDATED_AT,
    ],
};
