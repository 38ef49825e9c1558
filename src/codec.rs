//! Reading and writing MAME `.lay` layout documents.
//!
//! Only the lamp subset of the format is understood: element definitions
//! built from `rect`/`disk` components with a `color` per state, and a
//! single `view` holding `bounds` plus one `element ref` per lamp.
//!
//! ```text
//! <mamelayout version="2">
//!     <element name="lamp_x" defstate="0">
//!         <rect state="0"><color red="0.231" green="0.184" blue="0.2" alpha="1"/></rect>
//!         <rect state="1"><color red="1" green="0.302" blue="0.302" alpha="1"/></rect>
//!     </element>
//!     <view name="Main View">
//!         <bounds x="0" y="0" width="800" height="600"/>
//!         <element ref="lamp_x" name="Lamp 1"><bounds x="80" y="80" width="60" height="60"/></element>
//!     </view>
//! </mamelayout>
//! ```

use crate::color::{format_number, Color, NormalizedColor};
use crate::model::{
    clamp_size, create_empty_project, new_lamp_id, Lamp, LampShape, Project, DEFAULT_OFF_COLOR,
    DEFAULT_ON_COLOR,
};
use log::{debug, warn};
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

pub const LAYOUT_VERSION: u32 = 2;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Layout file is empty")]
    Empty,
    #[error("No root element found")]
    NoRoot,
    #[error("XML parse error at byte {position}: {source}")]
    Xml {
        position: usize,
        #[source]
        source: quick_xml::Error,
    },
    #[error("Malformed attribute at byte {position}: {source}")]
    Attribute {
        position: usize,
        #[source]
        source: AttrError,
    },
    #[error("Element <{0}> is never closed")]
    Unterminated(String),
    #[error("Document has more than one root element")]
    MultipleRoots,
    #[error("Root element is <{0}>, expected <mamelayout>")]
    NotALayout(String),
    #[error("Layout has no <view>")]
    MissingView,
    #[error("View references undefined element \"{0}\"")]
    UnknownElement(String),
    #[error("Attribute {attribute}=\"{value}\" is not a number")]
    InvalidNumber { attribute: String, value: String },
}

/// Minimal element tree; text content is irrelevant to layouts.
#[derive(Debug)]
struct Node {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Node {
    fn from_start(e: &BytesStart, position: usize) -> Result<Self, DecodeError> {
        let mut attrs = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|source| DecodeError::Attribute { position, source })?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|source| DecodeError::Xml { position, source })?
                .into_owned();
            attrs.push((key, value));
        }
        Ok(Self {
            name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
            attrs,
            children: Vec::new(),
        })
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn number(&self, key: &str) -> Result<Option<f64>, DecodeError> {
        match self.attr(key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Some)
                .ok_or_else(|| DecodeError::InvalidNumber {
                    attribute: key.to_string(),
                    value: raw.to_string(),
                }),
        }
    }
}

fn read_tree(text: &str) -> Result<Node, DecodeError> {
    if text.trim().is_empty() {
        return Err(DecodeError::Empty);
    }

    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        let position = reader.buffer_position();
        match reader.read_event() {
            Ok(Event::Start(ref e)) => stack.push(Node::from_start(e, position)?),
            Ok(Event::Empty(ref e)) => {
                let node = Node::from_start(e, position)?;
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::End(_)) => {
                let Some(node) = stack.pop() else {
                    return Err(DecodeError::NoRoot);
                };
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(source) => {
                return Err(DecodeError::Xml { position: reader.buffer_position(), source })
            }
        }
    }

    if let Some(open) = stack.pop() {
        return Err(DecodeError::Unterminated(open.name));
    }
    root.ok_or(DecodeError::NoRoot)
}

fn attach(stack: &mut [Node], root: &mut Option<Node>, node: Node) -> Result<(), DecodeError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        Ok(())
    } else if root.is_some() {
        Err(DecodeError::MultipleRoots)
    } else {
        *root = Some(node);
        Ok(())
    }
}

/// What an element definition contributes to a lamp.
struct LampTemplate {
    shape: LampShape,
    on: Color,
    off: Color,
}

/// `None` for definitions with no `rect`/`disk` components (text, images...).
fn read_template(def: &Node) -> Result<Option<LampTemplate>, DecodeError> {
    let mut shape = None;
    let mut on = None;
    let mut off = None;

    for component in &def.children {
        let component_shape = match component.name.as_str() {
            "rect" => LampShape::Rectangle,
            "disk" => LampShape::Disc,
            other => {
                debug!("Skipping <{}> in element {:?}", other, def.attr("name"));
                continue;
            }
        };
        shape.get_or_insert(component_shape);

        let color = match component.child("color") {
            Some(c) => read_color(c)?,
            None => NormalizedColor::default(),
        };
        let color = Color::from_normalized(&color);

        match component.number("state")? {
            Some(s) if s == 0.0 => off = Some(color),
            Some(s) if s == 1.0 => on = Some(color),
            Some(_) => {}
            None => {
                // Stateless components draw in every state
                on.get_or_insert_with(|| color.clone());
                off.get_or_insert(color);
            }
        }
    }

    Ok(shape.map(|shape| LampTemplate {
        shape,
        on: on.unwrap_or_else(|| Color::new(DEFAULT_ON_COLOR, 1.0)),
        off: off.unwrap_or_else(|| Color::new(DEFAULT_OFF_COLOR, 1.0)),
    }))
}

fn read_color(node: &Node) -> Result<NormalizedColor, DecodeError> {
    let d = NormalizedColor::default();
    Ok(NormalizedColor {
        red: node.number("red")?.unwrap_or(d.red),
        green: node.number("green")?.unwrap_or(d.green),
        blue: node.number("blue")?.unwrap_or(d.blue),
        alpha: node.number("alpha")?.unwrap_or(d.alpha),
    })
}

/// `(x, y, width, height)`; accepts the `left/top/right/bottom` form too.
fn read_bounds(node: &Node) -> Result<(f64, f64, f64, f64), DecodeError> {
    let left = node.number("left")?;
    let top = node.number("top")?;
    let right = node.number("right")?;
    let bottom = node.number("bottom")?;
    if left.is_some() || top.is_some() || right.is_some() || bottom.is_some() {
        let (l, t) = (left.unwrap_or(0.0), top.unwrap_or(0.0));
        let (r, b) = (right.unwrap_or(l + 1.0), bottom.unwrap_or(t + 1.0));
        return Ok((l, t, r - l, b - t));
    }
    Ok((
        node.number("x")?.unwrap_or(0.0),
        node.number("y")?.unwrap_or(0.0),
        node.number("width")?.unwrap_or(1.0),
        node.number("height")?.unwrap_or(1.0),
    ))
}

/// Parse layout source into a project. Structurally invalid input is an
/// error; nothing partial is ever returned.
pub fn decode(text: &str) -> Result<Project, DecodeError> {
    let root = read_tree(text)?;
    if root.name != "mamelayout" {
        return Err(DecodeError::NotALayout(root.name));
    }

    let mut project = create_empty_project();
    if let Some(version) = root.number("version")? {
        project.version = version as u32;
    }

    let mut templates: HashMap<&str, Option<LampTemplate>> = HashMap::new();
    for def in root.children_named("element") {
        if let Some(name) = def.attr("name") {
            templates.insert(name, read_template(def)?);
        }
    }

    let mut views = root.children_named("view");
    let view = views.next().ok_or(DecodeError::MissingView)?;
    let extra = views.count();
    if extra > 0 {
        warn!("Layout has {} additional view(s); only the first is edited", extra);
    }

    if let Some(name) = view.attr("name") {
        project.view_name = name.to_string();
    }

    // Lamps are stored relative to the view's corner, which is written back as 0,0
    let view_bounds = view.child("bounds").map(read_bounds).transpose()?;
    let (origin_x, origin_y) = view_bounds.map_or((0.0, 0.0), |(x, y, _, _)| (x, y));
    if origin_x != 0.0 || origin_y != 0.0 {
        debug!("View origin at ({}, {}), shifting lamps", origin_x, origin_y);
    }

    for item in &view.children {
        if item.name != "element" {
            if item.name != "bounds" {
                debug!("Skipping <{}> in view", item.name);
            }
            continue;
        }
        let Some(reference) = item.attr("ref") else {
            debug!("Skipping view element without ref");
            continue;
        };
        let template = match templates.get(reference) {
            None => return Err(DecodeError::UnknownElement(reference.to_string())),
            Some(None) => {
                debug!("Element {} has no lamp components, skipping", reference);
                continue;
            }
            Some(Some(t)) => t,
        };

        let (x, y, width, height) = match item.child("bounds") {
            Some(b) => read_bounds(b)?,
            None => (0.0, 0.0, 1.0, 1.0),
        };
        let index = project.lamps.len();
        project.lamps.push(Lamp {
            id: new_lamp_id(),
            name: item
                .attr("name")
                .map(str::to_string)
                .unwrap_or_else(|| format!("Lamp {}", index + 1)),
            x: x - origin_x,
            y: y - origin_y,
            width: clamp_size(width),
            height: clamp_size(height),
            shape: template.shape,
            on_color: template.on.clone(),
            off_color: template.off.clone(),
        });
    }

    match view_bounds {
        Some((_, _, width, height)) => {
            project.width = width;
            project.height = height;
        }
        None if !project.lamps.is_empty() => {
            project.width = project.lamps.iter().map(|l| l.x + l.width).fold(0.0, f64::max);
            project.height = project.lamps.iter().map(|l| l.y + l.height).fold(0.0, f64::max);
        }
        None => {}
    }

    debug!("Decoded {} lamps from view {:?}", project.lamps.len(), project.view_name);
    Ok(project)
}

/// `lamp_` followed by the id with everything outside `[A-Za-z0-9_]` replaced.
pub fn element_name(id: &str) -> String {
    let body: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("lamp_{}", body)
}

/// Serialize a project. Output depends only on the project, byte for byte.
pub fn encode(project: &Project) -> String {
    let mut writer = Writer::new_with_indent(Vec::new(), b'\t', 1);
    if let Err(e) = write_layout(&mut writer, project) {
        // Writing into memory cannot fail
        log::error!("Layout serialization failed: {}", e);
    }
    let mut text = String::from_utf8_lossy(&writer.into_inner()).into_owned();
    text.push('\n');
    text
}

fn write_layout(w: &mut Writer<Vec<u8>>, project: &Project) -> quick_xml::Result<()> {
    // Sanitizing can map distinct ids onto one name
    let mut used = HashSet::new();
    let names: Vec<String> = project
        .lamps
        .iter()
        .map(|l| {
            let base = element_name(&l.id);
            let mut name = base.clone();
            let mut n = 2;
            while !used.insert(name.clone()) {
                name = format!("{}_{}", base, n);
                n += 1;
            }
            name
        })
        .collect();

    w.write_event(Event::Decl(BytesDecl::new("1.0", None, None)))?;
    w.create_element("mamelayout")
        .with_attribute(("version", LAYOUT_VERSION.to_string().as_str()))
        .write_inner_content(|w| {
            for (lamp, name) in project.lamps.iter().zip(&names) {
                write_lamp_element(w, lamp, name)?;
            }
            w.create_element("view")
                .with_attribute(("name", project.view_name.as_str()))
                .write_inner_content(|w| {
                    write_bounds(w, 0.0, 0.0, project.width, project.height)?;
                    for (lamp, name) in project.lamps.iter().zip(&names) {
                        w.create_element("element")
                            .with_attribute(("ref", name.as_str()))
                            .with_attribute(("name", lamp.name.as_str()))
                            .write_inner_content(|w| {
                                write_bounds(w, lamp.x, lamp.y, lamp.width, lamp.height)
                            })?;
                    }
                    Ok::<(), quick_xml::Error>(())
                })?;
            Ok::<(), quick_xml::Error>(())
        })?;
    Ok(())
}

fn write_lamp_element(w: &mut Writer<Vec<u8>>, lamp: &Lamp, name: &str) -> quick_xml::Result<()> {
    let component = match lamp.shape {
        LampShape::Rectangle => "rect",
        LampShape::Disc => "disk",
    };
    w.create_element("element")
        .with_attribute(("name", name))
        .with_attribute(("defstate", "0"))
        .write_inner_content(|w| {
            for (state, color) in [("0", &lamp.off_color), ("1", &lamp.on_color)] {
                let c = color.to_normalized();
                w.create_element(component)
                    .with_attribute(("state", state))
                    .write_inner_content(|w| {
                        w.create_element("color")
                            .with_attribute(("red", format_number(c.red).as_str()))
                            .with_attribute(("green", format_number(c.green).as_str()))
                            .with_attribute(("blue", format_number(c.blue).as_str()))
                            .with_attribute(("alpha", format_number(c.alpha).as_str()))
                            .write_empty()?;
                        Ok::<(), quick_xml::Error>(())
                    })?;
            }
            Ok::<(), quick_xml::Error>(())
        })?;
    Ok(())
}

fn write_bounds(w: &mut Writer<Vec<u8>>, x: f64, y: f64, width: f64, height: f64) -> quick_xml::Result<()> {
    w.create_element("bounds")
        .with_attribute(("x", format_number(x).as_str()))
        .with_attribute(("y", format_number(y).as_str()))
        .with_attribute(("width", format_number(width).as_str()))
        .with_attribute(("height", format_number(height).as_str()))
        .write_empty()?;
    Ok(())
}
