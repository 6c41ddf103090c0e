//! Tree-markup parser with materialized and streaming strategies.
//!
//! Two extraction paths: a registry-record path that recognizes repeated
//! `item` elements carrying cadastral-style metadata and coordinates, and a
//! generic fallback that treats any sufficiently repeated tag as the record
//! type.

use super::{ParseOutput, ParseStrategy};
use crate::dataset::TabularDataset;
use crate::{Result, StoreScoutError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// File size above which the streaming strategy is used.
const LARGE_FILE_BYTES: u64 = 50 * 1024 * 1024;
/// Maximum records materialized for analysis.
const MAX_SAMPLE_RECORDS: usize = 10_000;
/// A tag repeating more than this often is a candidate record type.
const RECORD_TAG_THRESHOLD: usize = 10;

/// Element tag of the known record shape.
const RECORD_TAG: &str = "item";
/// Scalar fields extracted directly from a known record.
const KNOWN_FIELDS: [&str; 7] = [
    "cad_number",
    "status",
    "last_container_fixed_at",
    "address",
    "object_type",
    "area",
    "purpose",
];
/// Tags checked for coordinate content, in order.
const COORDINATE_TAGS: [&str; 4] = ["coordinates", "coord", "point", "location"];

pub struct XmlParser;

impl XmlParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, path: &Path) -> Result<ParseOutput> {
        let file_size = fs::metadata(path)?.len();

        if file_size > LARGE_FILE_BYTES {
            debug!(file_size, "large markup file, streaming record extraction");
            self.parse_streaming(path)
        } else {
            self.parse_materialized(path)
        }
    }

    /// Build one parse tree, then extract records from it.
    fn parse_materialized(&self, path: &Path) -> Result<ParseOutput> {
        let text = fs::read_to_string(path)?;
        let root = build_tree(&text)?;

        let mut records = Vec::new();
        let mut items = Vec::new();
        find_all(&root, RECORD_TAG, &mut items);
        for item in items {
            if let Some(record) = extract_known_record(item) {
                records.push(record);
                if records.len() >= MAX_SAMPLE_RECORDS {
                    break;
                }
            }
        }

        let structure = if records.is_empty() {
            records = extract_generic_records(&root);
            "generic"
        } else {
            "cadastral"
        };

        if records.is_empty() {
            return Err(StoreScoutError::parse(
                "xml",
                "no tabular data found in XML structure",
            ));
        }

        Ok(ParseOutput {
            dataset: TabularDataset::from_string_records(&records)?,
            strategy: ParseStrategy::Full,
            structure: Some(structure),
        })
    }

    /// Event-based extraction that keeps only the subtree of the record
    /// currently being read.
    fn parse_streaming(&self, path: &Path) -> Result<ParseOutput> {
        let mut reader = Reader::from_file(path)?;
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut records = Vec::new();
        // Stack of open nodes inside the record being captured; empty when
        // outside any record.
        let mut capture: Vec<XmlNode> = Vec::new();

        loop {
            match reader
                .read_event_into(&mut buf)
                .map_err(|e| StoreScoutError::parse("xml", e.to_string()))?
            {
                Event::Start(start) => {
                    let node = node_from_start(&start)?;
                    if !capture.is_empty() || node.tag == RECORD_TAG {
                        capture.push(node);
                    }
                }
                Event::Empty(start) => {
                    let node = node_from_start(&start)?;
                    if let Some(parent) = capture.last_mut() {
                        parent.children.push(node);
                    }
                }
                Event::Text(text) => {
                    if let Some(node) = capture.last_mut() {
                        let content = text
                            .unescape()
                            .map_err(|e| StoreScoutError::parse("xml", e.to_string()))?;
                        append_text(node, content.trim());
                    }
                }
                Event::End(_) => {
                    if let Some(node) = capture.pop() {
                        if let Some(parent) = capture.last_mut() {
                            parent.children.push(node);
                        } else {
                            // Record complete; consume and discard its memory.
                            if let Some(record) = extract_known_record(&node) {
                                records.push(record);
                                if records.len() >= MAX_SAMPLE_RECORDS {
                                    break;
                                }
                            }
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if records.is_empty() {
            return Err(StoreScoutError::parse(
                "xml",
                "no records extracted by streaming parser",
            ));
        }

        Ok(ParseOutput {
            dataset: TabularDataset::from_string_records(&records)?,
            strategy: ParseStrategy::Streaming,
            structure: Some("cadastral"),
        })
    }
}

impl Default for XmlParser {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory element tree for the materialized strategy.
struct XmlNode {
    tag: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<XmlNode>,
}

fn node_from_start(start: &BytesStart<'_>) -> Result<XmlNode> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| StoreScoutError::parse("xml", e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| StoreScoutError::parse("xml", e.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(XmlNode {
        tag,
        attributes,
        text: None,
        children: Vec::new(),
    })
}

fn append_text(node: &mut XmlNode, content: &str) {
    if content.is_empty() {
        return;
    }
    match &mut node.text {
        Some(existing) => {
            existing.push(' ');
            existing.push_str(content);
        }
        None => node.text = Some(content.to_string()),
    }
}

fn build_tree(text: &str) -> Result<XmlNode> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        match reader
            .read_event()
            .map_err(|e| StoreScoutError::parse("xml", e.to_string()))?
        {
            Event::Start(start) => stack.push(node_from_start(&start)?),
            Event::Empty(start) => {
                let node = node_from_start(&start)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => root = Some(node),
                }
            }
            Event::Text(text) => {
                if let Some(node) = stack.last_mut() {
                    let content = text
                        .unescape()
                        .map_err(|e| StoreScoutError::parse("xml", e.to_string()))?;
                    append_text(node, content.trim());
                }
            }
            Event::End(_) => {
                if let Some(node) = stack.pop() {
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => root = Some(node),
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    root.ok_or_else(|| StoreScoutError::parse("xml", "document has no root element"))
}

fn find_all<'a>(node: &'a XmlNode, tag: &str, out: &mut Vec<&'a XmlNode>) {
    for child in &node.children {
        if child.tag == tag {
            out.push(child);
        }
        find_all(child, tag, out);
    }
}

/// First text content found for `tag` among descendants (or the node itself).
fn find_text<'a>(node: &'a XmlNode, tag: &str) -> Option<&'a str> {
    if node.tag == tag {
        if let Some(text) = &node.text {
            return Some(text);
        }
    }
    for child in &node.children {
        if let Some(text) = find_text(child, tag) {
            return Some(text);
        }
    }
    None
}

/// Extract the known record shape: scalar registry fields plus coordinates.
fn extract_known_record(item: &XmlNode) -> Option<HashMap<String, String>> {
    let mut record = HashMap::new();

    for field in KNOWN_FIELDS {
        if let Some(text) = find_text(item, field) {
            record.insert(field.to_string(), text.to_string());
        }
    }

    for tag in COORDINATE_TAGS {
        if let Some(text) = find_text(item, tag) {
            if let Some((lat, lon)) = text.split_once(',') {
                record.insert("latitude".to_string(), lat.trim().to_string());
                record.insert("longitude".to_string(), lon.trim().to_string());
            } else {
                record.insert("coordinates_raw".to_string(), text.to_string());
            }
            break;
        }
    }

    if record.is_empty() {
        None
    } else {
        Some(record)
    }
}

/// Generic fallback: any non-root tag repeating more than the threshold is a
/// candidate record type; each occurrence is flattened into one row.
fn extract_generic_records(root: &XmlNode) -> Vec<HashMap<String, String>> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    count_tags(root, &mut counts);

    let mut records = Vec::new();
    for (tag, count) in &counts {
        if *count <= RECORD_TAG_THRESHOLD || *tag == root.tag {
            continue;
        }
        let mut elements = Vec::new();
        find_all(root, tag, &mut elements);
        for element in elements {
            let mut fields: HashMap<String, Vec<String>> = HashMap::new();
            flatten_element(element, "", &mut fields);
            if !fields.is_empty() {
                records.push(collapse_fields(fields));
                if records.len() >= MAX_SAMPLE_RECORDS {
                    return records;
                }
            }
        }
        // First tag that yields rows wins; repeated descendants of the
        // record tag would otherwise be harvested again as record types.
        if !records.is_empty() {
            break;
        }
    }
    records
}

/// Tag occurrence counts in first-appearance order.
fn count_tags(node: &XmlNode, counts: &mut Vec<(String, usize)>) {
    match counts.iter_mut().find(|(tag, _)| *tag == node.tag) {
        Some((_, count)) => *count += 1,
        None => counts.push((node.tag.clone(), 1)),
    }
    for child in &node.children {
        count_tags(child, counts);
    }
}

/// Flatten attributes, text and children of one element. Nested element
/// names are joined with an underscore; repeated keys accumulate.
fn flatten_element(node: &XmlNode, prefix: &str, fields: &mut HashMap<String, Vec<String>>) {
    for (key, value) in &node.attributes {
        let name = join_key(prefix, key);
        fields.entry(name).or_default().push(value.clone());
    }
    if let Some(text) = &node.text {
        let name = if prefix.is_empty() {
            "text".to_string()
        } else {
            prefix.to_string()
        };
        fields.entry(name).or_default().push(text.clone());
    }
    for child in &node.children {
        let child_prefix = join_key(prefix, &child.tag);
        flatten_element(child, &child_prefix, fields);
    }
}

fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}_{key}")
    }
}

fn collapse_fields(fields: HashMap<String, Vec<String>>) -> HashMap<String, String> {
    fields
        .into_iter()
        .map(|(key, mut values)| {
            let value = match values.len() {
                1 => values.pop().unwrap_or_default(),
                _ => format!("[{}]", values.join(", ")),
            };
            (key, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_known_record_extraction() {
        let file = write_file(
            r#"<root>
                <item>
                    <cad_number>16:50:010101:1</cad_number>
                    <status>active</status>
                    <address>Main st 1</address>
                    <coordinates>55.79, 49.12</coordinates>
                    <area>120.5</area>
                </item>
                <item>
                    <cad_number>16:50:010101:2</cad_number>
                    <status>archived</status>
                    <address>Main st 2</address>
                    <coordinates>55.80, 49.13</coordinates>
                    <area>88.0</area>
                </item>
            </root>"#,
        );
        let output = XmlParser::new().parse(file.path()).unwrap();
        assert_eq!(output.structure, Some("cadastral"));
        assert_eq!(output.dataset.row_count(), 2);
        assert!(output.dataset.column("cad_number").is_some());
        assert!(output.dataset.column("latitude").is_some());
        assert!(output.dataset.column("longitude").is_some());
    }

    #[test]
    fn test_unsplittable_coordinates_kept_raw() {
        let file = write_file(
            r#"<root>
                <item><cad_number>1</cad_number><point>POINT(49 55)</point></item>
            </root>"#,
        );
        let output = XmlParser::new().parse(file.path()).unwrap();
        assert!(output.dataset.column("coordinates_raw").is_some());
    }

    #[test]
    fn test_generic_fallback_on_repeated_tags() {
        let rows: String = (0..12)
            .map(|i| format!("<row id=\"{i}\"><name>n{i}</name></row>"))
            .collect();
        let file = write_file(&format!("<table>{rows}</table>"));
        let output = XmlParser::new().parse(file.path()).unwrap();
        assert_eq!(output.structure, Some("generic"));
        assert_eq!(output.dataset.row_count(), 12);
        assert!(output.dataset.column("id").is_some());
        assert!(output.dataset.column("name").is_some());
    }

    #[test]
    fn test_rare_tags_not_treated_as_records() {
        let file = write_file(
            "<doc><entry><v>1</v></entry><entry><v>2</v></entry></doc>",
        );
        let err = XmlParser::new().parse(file.path()).unwrap_err();
        assert!(matches!(err, StoreScoutError::Parse { .. }));
    }

    #[test]
    fn test_malformed_xml_rejected() {
        let file = write_file("<root><item>");
        assert!(XmlParser::new().parse(file.path()).is_err());
    }
}
