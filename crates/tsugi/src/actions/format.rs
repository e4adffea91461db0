//! Document formats understood by the file actions.

use super::FileActionError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value};
use std::path::Path;

const SUPPORTED: &str = "json,xml,yaml,yml,toml";

/// A document format, chosen from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `.json`
    Json,
    /// `.yaml` or `.yml`
    Yaml,
    /// `.toml`
    Toml,
    /// `.xml`
    ///
    /// A document is an object with a single key naming the root element.
    /// Attributes are keys prefixed with `@`, text next to child elements
    /// sits under `#`, and repeated elements become arrays. XML has no
    /// scalar types, so every parsed leaf is a string.
    Xml,
}

impl Format {
    /// Picks the format matching the extension of `path` (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`FileActionError::InvalidExtension`] for any other extension.
    pub fn from_path(path: &Path) -> Result<Self, FileActionError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match extension.as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "toml" => Ok(Self::Toml),
            "xml" => Ok(Self::Xml),
            _ => Err(FileActionError::InvalidExtension {
                expected: SUPPORTED,
                received: extension,
            }),
        }
    }

    /// Parses `content` into a JSON value.
    ///
    /// # Errors
    ///
    /// Returns the parser error if `content` is not valid in this format.
    pub fn parse(self, content: &str) -> Result<Value, FileActionError> {
        match self {
            Self::Json => Ok(serde_json::from_str(content)?),
            Self::Yaml => Ok(serde_yaml::from_str(content)?),
            Self::Toml => Ok(toml::from_str(content)?),
            Self::Xml => parse_xml(content),
        }
    }

    /// Serializes `value` in this format.
    ///
    /// # Errors
    ///
    /// TOML cannot represent `null` or a non-table root, and XML needs an
    /// object with exactly one key; those fail.
    pub fn serialize(self, value: &Value) -> Result<String, FileActionError> {
        match self {
            Self::Json => Ok(serde_json::to_string_pretty(value)?),
            Self::Yaml => Ok(serde_yaml::to_string(value)?),
            Self::Toml => Ok(toml::to_string(value)?),
            Self::Xml => serialize_xml(value),
        }
    }
}

/// Deep-merges `source` into `target`.
///
/// Objects merge key by key and arrays merge index by index, both
/// recursively. Source array items past the end of the target are appended.
/// Any other source value replaces the target value.
pub fn merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(target), Value::Array(source)) => {
            for (index, value) in source.into_iter().enumerate() {
                match target.get_mut(index) {
                    Some(existing) => merge(existing, value),
                    None => target.push(value),
                }
            }
        }
        (target, source) => *target = source,
    }
}

fn xml_error(error: impl std::fmt::Display) -> FileActionError {
    FileActionError::Xml(error.to_string())
}

struct Element {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self, FileActionError> {
        let mut fields = Map::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(xml_error)?;
            let key = format!("@{}", String::from_utf8_lossy(attribute.key.as_ref()));
            let value = attribute.unescape_value().map_err(xml_error)?;
            fields.insert(key, Value::String(value.into_owned()));
        }
        Ok(Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            fields,
            text: String::new(),
        })
    }

    fn close(self) -> (String, Value) {
        let Self {
            name,
            mut fields,
            text,
        } = self;
        if fields.is_empty() && !text.is_empty() {
            return (name, Value::String(text));
        }
        if !text.is_empty() {
            fields.insert("#".to_string(), Value::String(text));
        }
        (name, Value::Object(fields))
    }
}

fn attach(stack: &mut [Element], root: &mut Map<String, Value>, element: Element) {
    let (name, value) = element.close();
    let fields = match stack.last_mut() {
        Some(parent) => &mut parent.fields,
        None => root,
    };
    match fields.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            fields.insert(name, value);
        }
    }
}

fn parse_xml(content: &str) -> Result<Value, FileActionError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root = Map::new();
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(start) => stack.push(Element::open(&start)?),
            Event::Empty(start) => {
                let element = Element::open(&start)?;
                attach(&mut stack, &mut root, element);
            }
            Event::End(end) => {
                let element = stack.pop().ok_or_else(|| {
                    xml_error(format!(
                        "unexpected closing tag </{}>",
                        String::from_utf8_lossy(end.name().as_ref())
                    ))
                })?;
                attach(&mut stack, &mut root, element);
            }
            Event::Text(text) => {
                if let Some(element) = stack.last_mut() {
                    element
                        .text
                        .push_str(&text.unescape().map_err(xml_error)?);
                }
            }
            Event::CData(data) => {
                if let Some(element) = stack.last_mut() {
                    element
                        .text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(xml_error(format!("unclosed element <{}>", open.name)));
    }
    Ok(Value::Object(root))
}

fn serialize_xml(value: &Value) -> Result<String, FileActionError> {
    let (name, element) = match value {
        Value::Object(root) if root.len() == 1 => match root.iter().next() {
            Some((_, Value::Array(_))) | None => return Err(FileActionError::XmlRoot),
            Some(entry) => entry,
        },
        _ => return Err(FileActionError::XmlRoot),
    };

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_error)?;
    write_element(&mut writer, name, element)?;
    String::from_utf8(writer.into_inner()).map_err(xml_error)
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    value: &Value,
) -> Result<(), FileActionError> {
    match value {
        Value::Array(items) => {
            for item in items {
                write_element(writer, name, item)?;
            }
            Ok(())
        }
        Value::Object(fields) => {
            let mut start = BytesStart::new(name);
            let mut children = Vec::new();
            for (key, field) in fields {
                match key.strip_prefix('@') {
                    Some(attribute) => {
                        start.push_attribute((attribute, scalar_text(field).as_str()))
                    }
                    None => children.push((key.as_str(), field)),
                }
            }
            if children.is_empty() {
                return writer.write_event(Event::Empty(start)).map_err(xml_error);
            }

            writer.write_event(Event::Start(start)).map_err(xml_error)?;
            for (key, field) in children {
                if key == "#" {
                    let text = scalar_text(field);
                    writer
                        .write_event(Event::Text(BytesText::new(&text)))
                        .map_err(xml_error)?;
                } else {
                    write_element(writer, key, field)?;
                }
            }
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(xml_error)
        }
        Value::Null => writer
            .write_event(Event::Empty(BytesStart::new(name)))
            .map_err(xml_error),
        scalar => {
            let text = scalar_text(scalar);
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .map_err(xml_error)?;
            writer
                .write_event(Event::Text(BytesText::new(&text)))
                .map_err(xml_error)?;
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(xml_error)
        }
    }
}
