//! Shape wrappers over shape containers.
//!
//! One [`Shape`] wraps one SpContainer (or a nested SpgrContainer for
//! groups). The wrapper keeps handles to the client-data and client-textbox
//! records so the model builder can attach text and hyperlinks; it never
//! copies drawing bytes out of the arena.
use crate::drawing::{shape_group, ShapeAtom, ShapeFlags};
use crate::error::{Error, Result};
use crate::record::atoms::read_atom;
use crate::record::store::{RecordId, RecordStore};
use crate::record::types::{escher, RecordType};

/// Geometry preset of a shape, from the Sp atom's instance field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// Nested shape group
    Group,
    /// Plain rectangle
    Rectangle,
    Line,
    /// Picture frame
    Picture,
    /// Text box
    TextBox,
    /// A placeholder shape (carries an OEPlaceholderAtom in client data)
    Placeholder,
    /// Any other preset, raw code preserved
    Other(u16),
}

impl ShapeKind {
    fn from_preset(preset: u16) -> Self {
        match preset {
            1 => ShapeKind::Rectangle,
            20 => ShapeKind::Line,
            75 => ShapeKind::Picture,
            202 => ShapeKind::TextBox,
            other => ShapeKind::Other(other),
        }
    }
}

/// Where a shape's text lives, as an index into the owning sheet's
/// paragraph-list collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeTextSource {
    /// The shape's own client textbox decoded into block `index`
    Own(usize),
    /// An outline reference into the sheet's persisted text, block `index`
    Outline(usize),
}

/// One drawing shape on a sheet.
#[derive(Debug, Clone)]
pub struct Shape {
    /// The wrapped shape container record
    pub container: RecordId,
    /// Shape id, unique within the drawing group
    pub shape_id: u32,
    pub flags: ShapeFlags,
    pub kind: ShapeKind,
    /// Client data container, if present (placeholder atoms, actions)
    pub client_data: Option<RecordId>,
    /// Client textbox container, if present
    pub client_textbox: Option<RecordId>,
    /// Resolved text, filled by the model builder
    pub text: Option<ShapeTextSource>,
    /// Document hyperlink object attached at shape level
    pub hyperlink: Option<u32>,
}

impl Shape {
    /// Whether this shape is a group rather than a simple shape.
    #[inline]
    pub fn is_group(&self) -> bool {
        self.kind == ShapeKind::Group
    }
}

/// Build the shape list of a drawing container. The first child of the
/// shape group is the group's own descriptor and is skipped.
pub fn shapes_from_drawing(store: &RecordStore, drawing: RecordId) -> Result<Vec<Shape>> {
    let group = shape_group(store, drawing)?;
    let children: Vec<RecordId> = store.children(group).to_vec();
    children
        .into_iter()
        .skip(1)
        .map(|child| build_shape(store, child))
        .collect()
}

fn build_shape(store: &RecordStore, container: RecordId) -> Result<Shape> {
    let node = store.node(container);
    let is_group = node.raw_type == escher::SPGR_CONTAINER;

    // a group's Sp atom lives in its first (descriptor) shape container
    let sp_owner = if is_group {
        store
            .children(container)
            .first()
            .copied()
            .ok_or_else(|| Error::CorruptStream("empty shape group container".into()))?
    } else {
        container
    };

    let sp = store
        .find_child_raw(sp_owner, escher::SP)
        .ok_or_else(|| Error::CorruptStream("shape container has no shape atom".into()))?;
    let atom: ShapeAtom = read_atom(store, sp, "Sp")?;
    let flags = ShapeFlags::from_bits_truncate(atom.flags.get());

    let client_data = store.find_child_raw(sp_owner, escher::CLIENT_DATA);
    let client_textbox = store.find_child_raw(sp_owner, escher::CLIENT_TEXTBOX);

    let kind = if is_group || flags.contains(ShapeFlags::GROUP) {
        ShapeKind::Group
    } else if client_data
        .is_some_and(|cd| store.find_child(cd, RecordType::OEPlaceholderAtom).is_some())
    {
        ShapeKind::Placeholder
    } else {
        ShapeKind::from_preset(store.node(sp).instance)
    };

    Ok(Shape {
        container,
        shape_id: atom.shape_id.get(),
        flags,
        kind,
        client_data,
        client_textbox,
        text: None,
        hyperlink: None,
    })
}
