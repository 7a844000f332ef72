//! Job files (metadata YAML)
//!
//! A job file describes one data resource to create: where the files are,
//! the status to create it with, its metadata, and how it links to a
//! collection. The collection fields are rewritten in place once a
//! collection is resolved so that rerunning the same job never creates a
//! second collection.

use crate::api::payload::CREATOR_URI;
use crate::error::{CliError, Result};
use serde::de::{self, DeserializeOwned, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Status of the created data resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataStatus {
    #[default]
    Pending,
    Published,
}

/// Visibility of a created collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionStatus {
    #[default]
    Private,
    Public,
}

impl fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionStatus::Private => write!(f, "private"),
            CollectionStatus::Public => write!(f, "public"),
        }
    }
}

/// `data:` section of a job file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    /// Directory holding the files to send
    pub path: String,

    /// Free-form file type hint ("tif", "jpeg", ...)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,

    #[serde(default)]
    pub status: DataStatus,
}

/// One job file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Project name, used for the report directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub data: DataSection,

    #[serde(rename = "collectionIds", default, with = "blank")]
    pub collection_id: Option<String>,

    #[serde(rename = "collectionTitle", default, with = "blank")]
    pub collection_title: Option<String>,

    #[serde(rename = "collectionDescription", default, with = "blank")]
    pub collection_description: Option<String>,

    #[serde(rename = "collectionStatus", default, with = "blank")]
    pub collection_status: Option<CollectionStatus>,

    #[serde(default)]
    pub metadata: Metadata,
}

impl JobConfig {
    /// Load and validate a job file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CliError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let job: JobConfig = serde_yaml::from_str(&content)
            .map_err(|e| CliError::invalid_job(path.display().to_string(), e.to_string()))?;

        job.validate()
            .map_err(|reason| CliError::invalid_job(path.display().to_string(), reason))?;

        Ok(job)
    }

    /// Write the job file back, keeping the field order users edit
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Write back only `collectionIds` and `collectionStatus`, leaving the
    /// rest of the file as the user wrote it (comments, quoting, spacing).
    ///
    /// Falls back to [`JobConfig::save`] when the keys are not plain one-line
    /// scalars that can be replaced in place.
    pub fn save_collection_fields(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let patched = std::fs::read_to_string(path)
            .ok()
            .and_then(|content| self.patch_collection_fields(&content));

        match patched {
            Some(content) => {
                std::fs::write(path, content)?;
                Ok(())
            },
            None => {
                debug!(job = %path.display(), "Collection keys not patchable in place, rewriting the job file");
                self.save(path)
            },
        }
    }

    fn patch_collection_fields(&self, content: &str) -> Option<String> {
        let id = self.collection_id.clone().unwrap_or_default();
        let status = self.collection_status.map(|s| s.to_string()).unwrap_or_default();

        let patched = replace_top_level_value(content, "collectionIds", &id)?;
        let patched = replace_top_level_value(&patched, "collectionStatus", &status)?;

        // The patched text must read back to the same link
        let reread: JobConfig = serde_yaml::from_str(&patched).ok()?;
        (reread.collection_id == self.collection_id
            && reread.collection_status == self.collection_status)
            .then_some(patched)
    }

    /// Report directory name
    pub fn project_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("project")
    }

    /// Check the invariants that serde cannot express
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.data.path.trim().is_empty() {
            return Err("'data.path' cannot be empty".to_string());
        }

        for (uri, field) in self.metadata.iter() {
            if !is_absolute_uri(uri) {
                return Err(format!("metadata key '{}' is not an absolute property URI", uri));
            }

            // `typeUri` stays optional; the repository applies its own default
            if matches!(field.value, MetadataValue::Person(_)) && uri != CREATOR_URI {
                return Err(format!(
                    "metadata '{}' holds a person; only '{}' accepts one",
                    uri, CREATOR_URI
                ));
            }
        }

        Ok(())
    }
}

/// Replace the value of a top-level `key:` line, keeping its trailing
/// comment. A missing key is appended unless the value is empty.
fn replace_top_level_value(content: &str, key: &str, value: &str) -> Option<String> {
    let prefix = format!("{}:", key);
    let quoted = format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""));
    let mut out = String::with_capacity(content.len() + value.len());
    let mut found = false;

    for line in content.split_inclusive('\n') {
        let body = line.trim_end_matches(['\n', '\r']);
        let ending = &line[body.len()..];
        match body.strip_prefix(prefix.as_str()) {
            Some(rest) if !found => {
                found = true;
                out.push_str(&format!("{} {}{}{}", prefix, quoted, value_tail(rest)?, ending));
            },
            _ => out.push_str(line),
        }
    }

    if !found && !value.is_empty() {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&format!("{} {}\n", prefix, quoted));
    }

    Some(out)
}

/// What follows a one-line scalar: blanks and an optional comment. `None`
/// for block, flow, anchored or tagged values.
fn value_tail(rest: &str) -> Option<&str> {
    let trimmed = rest.trim_start();
    let start = rest.len() - trimmed.len();

    let end = match trimmed.as_bytes().first() {
        None | Some(b'#') => 0,
        Some(b'"' | b'\'') => start + closing_quote(trimmed)? + 1,
        Some(b'|' | b'>' | b'[' | b'{' | b'&' | b'*' | b'!') => return None,
        Some(_) => start + trimmed.find(" #").unwrap_or(trimmed.len()),
    };

    let tail = &rest[end..];
    let after = tail.trim_start();
    (after.is_empty() || after.starts_with('#')).then_some(tail)
}

/// Byte index of the quote closing the one opening `s`
fn closing_quote(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let quote = *bytes.first()?;
    let mut escaped = false;
    let mut i = 1;

    while i < bytes.len() {
        let b = bytes[i];
        if escaped {
            escaped = false;
        } else if quote == b'"' && b == b'\\' {
            escaped = true;
        } else if b == quote {
            // '' is an escaped quote inside single quotes
            if quote == b'\'' && bytes.get(i + 1) == Some(&b'\'') {
                i += 1;
            } else {
                return Some(i);
            }
        }
        i += 1;
    }

    None
}

fn is_absolute_uri(uri: &str) -> bool {
    match uri.split_once(':') {
        Some((scheme, rest)) => {
            !rest.is_empty()
                && scheme
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        },
        None => false,
    }
}

/// A person value (the creator property)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    #[serde(default)]
    pub givenname: String,

    #[serde(default)]
    pub surname: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orcid: Option<String>,
}

/// Value of a metadata field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// Scalar value; numbers and booleans are kept as their text
    Literal(String),
    /// Several scalars, sent to the repository as a JSON array
    List(Vec<String>),
    Person(Person),
}

fn scalar_text(value: &serde_yaml::Value) -> Option<String> {
    use serde_yaml::Value;

    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl<'de> Deserialize<'de> for MetadataValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        use serde_yaml::Value;

        let value = Value::deserialize(deserializer)?;
        if let Some(text) = scalar_text(&value) {
            return Ok(MetadataValue::Literal(text));
        }

        match value {
            Value::Sequence(items) => items
                .iter()
                .map(|item| {
                    scalar_text(item).ok_or_else(|| {
                        de::Error::custom(format!("unsupported metadata list item: {:?}", item))
                    })
                })
                .collect::<std::result::Result<Vec<_>, D::Error>>()
                .map(MetadataValue::List),
            value @ Value::Mapping(_) => serde_yaml::from_value::<Person>(value)
                .map(MetadataValue::Person)
                .map_err(de::Error::custom),
            other => Err(de::Error::custom(format!(
                "unsupported metadata value: {:?}",
                other
            ))),
        }
    }
}

/// One metadata field: a value plus its language and datatype
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataField {
    pub value: MetadataValue,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_uri: Option<String>,
}

impl MetadataField {
    /// Literal value with a datatype
    pub fn literal(value: impl Into<String>, type_uri: impl Into<String>) -> Self {
        Self {
            value: MetadataValue::Literal(value.into()),
            lang: None,
            type_uri: Some(type_uri.into()),
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }
}

/// Property URI → field, in file order, keys unique
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata(Vec<(String, MetadataField)>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field, keeping the position of an existing key
    pub fn insert(&mut self, uri: impl Into<String>, field: MetadataField) {
        let uri = uri.into();
        match self.0.iter_mut().find(|(k, _)| *k == uri) {
            Some(entry) => entry.1 = field,
            None => self.0.push((uri, field)),
        }
    }

    pub fn get(&self, uri: &str) -> Option<&MetadataField> {
        self.0.iter().find(|(k, _)| k == uri).map(|(_, v)| v)
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.get(uri).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataField)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Metadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (uri, field) in &self.0 {
            map.serialize_entry(uri, field)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Metadata {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct MetadataVisitor;

        impl<'de> Visitor<'de> for MetadataVisitor {
            type Value = Metadata;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping of property URI to metadata field")
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<Metadata, E> {
                Ok(Metadata::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Metadata, A::Error> {
                let mut entries: Vec<(String, MetadataField)> = Vec::new();
                while let Some((uri, field)) = access.next_entry::<String, MetadataField>()? {
                    if entries.iter().any(|(k, _)| *k == uri) {
                        return Err(de::Error::custom(format!("duplicate metadata key '{}'", uri)));
                    }
                    entries.push((uri, field));
                }
                Ok(Metadata(entries))
            }
        }

        deserializer.deserialize_any(MetadataVisitor)
    }
}

/// Optional fields written as `""` when unset, read back as `None` when
/// empty or null.
mod blank {
    use super::*;

    pub fn serialize<S, T>(value: &Option<T>, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(v) => v.serialize(serializer),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        use serde_yaml::Value;

        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(value) => serde_yaml::from_value(value)
                .map(Some)
                .map_err(de::Error::custom),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const EXAMPLE: &str = r#"
name: "BELLELAY"
data:
  path: "data/bellelay/"
  type: "tif"
  status: "pending"
collectionIds: ""
collectionTitle: "Graduel de Bellelay"
collectionDescription: "Images du graduel"
collectionStatus: ""
metadata:
  http://nakala.fr/terms#title:
    value: "Images du graduel de Bellelay"
    lang: "fr"
    typeUri: "http://www.w3.org/2001/XMLSchema#string"
  http://nakala.fr/terms#creator:
    value:
      givenname: "Toto"
      surname: "Tati"
  http://purl.org/dc/terms/date:
    value: 1988
    typeUri: "http://www.w3.org/2001/XMLSchema#string"
"#;

    fn write_example(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("job.yml");
        std::fs::write(&path, EXAMPLE).unwrap();
        path
    }

    #[test]
    fn test_load_example() {
        let dir = TempDir::new().unwrap();
        let job = JobConfig::load(write_example(&dir)).unwrap();

        assert_eq!(job.project_name(), "BELLELAY");
        assert_eq!(job.data.status, DataStatus::Pending);
        assert_eq!(job.data.file_type.as_deref(), Some("tif"));
        assert_eq!(job.collection_id, None);
        assert_eq!(job.collection_status, None);
        assert_eq!(job.collection_title.as_deref(), Some("Graduel de Bellelay"));

        let uris: Vec<&str> = job.metadata.iter().map(|(k, _)| k).collect();
        assert_eq!(
            uris,
            vec![
                "http://nakala.fr/terms#title",
                CREATOR_URI,
                "http://purl.org/dc/terms/date"
            ]
        );
        assert_eq!(
            job.metadata.get("http://purl.org/dc/terms/date").unwrap().value,
            MetadataValue::Literal("1988".to_string())
        );
        assert!(matches!(
            job.metadata.get(CREATOR_URI).unwrap().value,
            MetadataValue::Person(_)
        ));
    }

    #[test]
    fn test_save_writes_blank_fields_and_keeps_order() {
        let dir = TempDir::new().unwrap();
        let path = write_example(&dir);
        let mut job = JobConfig::load(&path).unwrap();

        job.collection_id = Some("10.34847/nkl.abcd".to_string());
        job.collection_status = Some(CollectionStatus::Private);
        job.save(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("collectionIds:"));
        assert!(raw.contains("10.34847/nkl.abcd"));
        assert!(raw.contains("collectionStatus: private"));
        let title_pos = raw.find("terms#title").unwrap();
        let date_pos = raw.find("terms/date").unwrap();
        assert!(title_pos < date_pos);

        let reloaded = JobConfig::load(&path).unwrap();
        assert_eq!(reloaded, job);

        job.collection_id = None;
        job.save(&path).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("collectionIds:"));
        assert_eq!(JobConfig::load(&path).unwrap().collection_id, None);
    }

    #[test]
    fn test_collection_fields_saved_without_losing_comments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.yml");
        std::fs::write(&path, crate::templates::METADATA_EXAMPLE).unwrap();
        let mut job = JobConfig::load(&path).unwrap();

        job.collection_id = Some("10.34847/nkl.abcd".to_string());
        job.collection_status = Some(CollectionStatus::Public);
        job.save_collection_fields(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("# Example job file."));
        assert!(raw.contains(
            "collectionIds: \"10.34847/nkl.abcd\"          # DOI of an existing collection"
        ));
        assert!(raw.contains("collectionStatus: \"public\" # \"private\" or \"public\""));
        assert!(raw.contains("# Other Dublin Core terms can be added the same way:"));
        assert_eq!(JobConfig::load(&path).unwrap(), job);
    }

    #[test]
    fn test_collection_fields_plain_and_missing_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.yml");
        std::fs::write(
            &path,
            "# batch 2\ndata:\n  path: \"data/x\"\ncollectionIds: # set on first run\nmetadata: {}\n",
        )
        .unwrap();
        let mut job = JobConfig::load(&path).unwrap();
        assert_eq!(job.collection_id, None);

        job.collection_id = Some("10.34847/nkl.abcd".to_string());
        job.collection_status = Some(CollectionStatus::Private);
        job.save_collection_fields(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("# batch 2\n"));
        assert!(raw.contains("collectionIds: \"10.34847/nkl.abcd\" # set on first run\n"));
        assert!(raw.ends_with("collectionStatus: \"private\"\n"));
        assert_eq!(JobConfig::load(&path).unwrap(), job);
    }

    #[test]
    fn test_block_collection_value_falls_back_to_full_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.yml");
        let content = "data:\n  path: \"data/x\"\ncollectionIds: >\n  10.34847/nkl.old\n";
        std::fs::write(&path, content).unwrap();

        let mut job = JobConfig::load(&path).unwrap();
        job.collection_id = Some("10.34847/nkl.abcd".to_string());
        assert_eq!(job.patch_collection_fields(content), None);

        job.save_collection_fields(&path).unwrap();
        assert_eq!(JobConfig::load(&path).unwrap(), job);

        assert_eq!(value_tail(" 'it''s' # note"), Some(" # note"));
        assert_eq!(value_tail(" \"a\\\"b\""), Some(""));
        assert_eq!(value_tail(" plain words"), Some(""));
        assert_eq!(value_tail(" \"open"), None);
    }

    #[test]
    fn test_duplicate_metadata_key_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dup.yml");
        std::fs::write(
            &path,
            r#"
data:
  path: "data/x"
metadata:
  http://nakala.fr/terms#title:
    value: "a"
    typeUri: "http://www.w3.org/2001/XMLSchema#string"
  http://nakala.fr/terms#title:
    value: "b"
    typeUri: "http://www.w3.org/2001/XMLSchema#string"
"#,
        )
        .unwrap();

        assert!(matches!(JobConfig::load(&path), Err(CliError::InvalidJob { .. })));
    }

    #[test]
    fn test_validation_rules() {
        let mut job: JobConfig = serde_yaml::from_str("data:\n  path: data/x\n").unwrap();
        assert!(job.validate().is_ok());
        assert_eq!(job.project_name(), "project");

        job.metadata.insert(
            "title",
            MetadataField::literal("x", "http://www.w3.org/2001/XMLSchema#string"),
        );
        assert!(job.validate().unwrap_err().contains("absolute property URI"));

        let mut job: JobConfig = serde_yaml::from_str("data:\n  path: data/x\n").unwrap();
        job.metadata.insert(
            "http://nakala.fr/terms#title",
            MetadataField {
                value: MetadataValue::Literal("x".to_string()),
                lang: None,
                type_uri: None,
            },
        );
        assert!(job.validate().is_ok());

        let mut job: JobConfig = serde_yaml::from_str("data:\n  path: data/x\n").unwrap();
        job.metadata.insert(
            "http://purl.org/dc/terms/contributor",
            MetadataField {
                value: MetadataValue::Person(Person {
                    givenname: "A".to_string(),
                    surname: "B".to_string(),
                    orcid: None,
                }),
                lang: None,
                type_uri: None,
            },
        );
        assert!(job.validate().unwrap_err().contains("person"));
    }

    #[test]
    fn test_list_values_and_missing_type_uri_accepted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lists.yml");
        std::fs::write(
            &path,
            r#"
data:
  path: "data/x"
metadata:
  http://purl.org/dc/terms/subject:
    value: ["graduel", "liturgie", 1988]
    lang: "fr"
  http://purl.org/dc/terms/language:
    value: "lat"
"#,
        )
        .unwrap();

        let job = JobConfig::load(&path).unwrap();
        assert_eq!(
            job.metadata.get("http://purl.org/dc/terms/subject").unwrap().value,
            MetadataValue::List(vec![
                "graduel".to_string(),
                "liturgie".to_string(),
                "1988".to_string()
            ])
        );
        assert_eq!(job.metadata.get("http://purl.org/dc/terms/language").unwrap().type_uri, None);

        std::fs::write(
            &path,
            "data:\n  path: data/x\nmetadata:\n  http://purl.org/dc/terms/subject:\n    value: [[nested]]\n",
        )
        .unwrap();
        assert!(matches!(JobConfig::load(&path), Err(CliError::InvalidJob { .. })));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            JobConfig::load("/no/such/job.yml"),
            Err(CliError::FileNotFound(_))
        ));
    }
}
