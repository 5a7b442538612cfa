//! CCSDS Orbit Ephemeris Message (OEM) XML parsing.
//!
//! The feed is read with `quick_xml` into a small element tree, then the
//! handful of paths the service cares about are mapped onto the typed
//! [`Dataset`]:
//!
//! ```text
//! ndm.oem.header
//! ndm.oem.body.segment.metadata
//! ndm.oem.body.segment.data.COMMENT*
//! ndm.oem.body.segment.data.stateVector*
//! ```
//!
//! Anything else in the document is ignored. Only the first `segment` is
//! read.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Result, TrackerError};
use crate::models::{Dataset, Header, Measure, Metadata, StateVector};

/// Generic XML element: local name, attributes, concatenated text, children.
#[derive(Debug, Default)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn open(start: &BytesStart) -> Result<Self> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| parse_error(format!("bad attribute on <{}>: {}", name, e)))?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| parse_error(format!("bad attribute value on <{}>: {}", name, e)))?
                .into_owned();
            attrs.push((key, value));
        }
        Ok(Self {
            name,
            attrs,
            ..Default::default()
        })
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn trimmed_text(&self) -> String {
        self.text.trim().to_string()
    }
}

fn parse_error(message: impl Into<String>) -> TrackerError {
    TrackerError::Parse(message.into())
}

/// Reads the whole document into an element tree and returns its root.
fn read_tree(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(Element::open(&e)?),
            Ok(Event::Empty(e)) => {
                let element = Element::open(&e)?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| parse_error("unbalanced closing tag"))?;
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::Text(t)) => {
                if let Some(top) = stack.last_mut() {
                    let text = t.unescape().map_err(|e| parse_error(e.to_string()))?;
                    top.text.push_str(&text);
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(parse_error(format!(
                    "malformed XML at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(parse_error(format!(
            "document ended inside <{}>",
            open.name
        )));
    }

    root.ok_or_else(|| parse_error("document has no root element"))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_none() {
        *root = Some(element);
    }
}

/// Parses an OEM XML document into a [`Dataset`].
///
/// Fails with [`TrackerError::Parse`] when the XML is malformed, when the
/// `ndm`/`oem` envelope is missing, or when a `stateVector` has no `EPOCH`.
/// Missing sections below `oem` are not errors; they come back as `None`.
pub fn parse_document(xml: &str) -> Result<Dataset> {
    let root = read_tree(xml)?;
    if root.name != "ndm" {
        return Err(parse_error(format!(
            "expected <ndm> root element, found <{}>",
            root.name
        )));
    }
    let oem = root
        .child("oem")
        .ok_or_else(|| parse_error("missing <oem> element under <ndm>"))?;

    let header = oem.child("header").map(parse_header);
    let segment = oem.child("body").and_then(|b| b.child("segment"));
    let metadata = segment
        .and_then(|s| s.child("metadata"))
        .map(parse_metadata);
    let data = segment.and_then(|s| s.child("data"));

    let comments = data
        .map(|d| {
            d.children_named("COMMENT")
                .map(Element::trimmed_text)
                .collect::<Vec<_>>()
        })
        .filter(|c| !c.is_empty());

    let state_vectors = match data {
        Some(d) => {
            let mut vectors = Vec::new();
            for (index, el) in d.children_named("stateVector").enumerate() {
                vectors.push(parse_state_vector(index, el)?);
            }
            Some(vectors).filter(|v| !v.is_empty())
        }
        None => None,
    };

    Ok(Dataset {
        header,
        metadata,
        comments,
        state_vectors,
    })
}

fn parse_header(el: &Element) -> Header {
    let mut header = Header::default();
    for child in &el.children {
        let text = child.trimmed_text();
        match child.name.as_str() {
            "CREATION_DATE" => header.creation_date = Some(text),
            "ORIGINATOR" => header.originator = Some(text),
            "COMMENT" => header.comments.push(text),
            other => {
                header.extra.insert(other.to_string(), text);
            }
        }
    }
    header
}

fn parse_metadata(el: &Element) -> Metadata {
    let mut metadata = Metadata::default();
    for child in &el.children {
        let text = child.trimmed_text();
        match child.name.as_str() {
            "OBJECT_NAME" => metadata.object_name = Some(text),
            "OBJECT_ID" => metadata.object_id = Some(text),
            "CENTER_NAME" => metadata.center_name = Some(text),
            "REF_FRAME" => metadata.ref_frame = Some(text),
            "TIME_SYSTEM" => metadata.time_system = Some(text),
            "START_TIME" => metadata.start_time = Some(text),
            "STOP_TIME" => metadata.stop_time = Some(text),
            "COMMENT" => metadata.comments.push(text),
            other => {
                metadata.extra.insert(other.to_string(), text);
            }
        }
    }
    metadata
}

fn parse_state_vector(index: usize, el: &Element) -> Result<StateVector> {
    let epoch = el
        .child("EPOCH")
        .map(Element::trimmed_text)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| parse_error(format!("stateVector #{} has no EPOCH", index)))?;

    Ok(StateVector {
        epoch,
        x: measure(el, "X"),
        y: measure(el, "Y"),
        z: measure(el, "Z"),
        x_dot: measure(el, "X_DOT"),
        y_dot: measure(el, "Y_DOT"),
        z_dot: measure(el, "Z_DOT"),
    })
}

/// A component is `None` when the element is absent or its text isn't a number.
fn measure(el: &Element, name: &str) -> Option<Measure> {
    let child = el.child(name)?;
    let value = child
        .text
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())?;
    let units = child.attr("units").unwrap_or_default();
    Some(Measure::new(value, units))
}
