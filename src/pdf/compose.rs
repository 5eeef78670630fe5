//! Layer composition
//!
//! Merges a [`PageOverlay`] into a template page. The resulting content
//! order is: behind layer, template content (isolated in `q`/`Q`), front
//! layer. Overlay fonts and images are added to the page's own resource
//! dictionary; inherited or referenced resources are copied down first so
//! other pages sharing them are unaffected.

use super::overlay::{OverlayLayer, PageOverlay, StandardFont};
use super::template::FormTemplate;
use crate::error::{Error, Result};
use crate::warning::Warnings;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::BTreeMap;

const MAX_INHERIT_DEPTH: usize = 10;

/// Merges overlays into the pages of one template document
pub struct Compositor<'a> {
    template: &'a mut FormTemplate,
    fonts: BTreeMap<StandardFont, ObjectId>,
}

impl<'a> Compositor<'a> {
    pub fn new(template: &'a mut FormTemplate) -> Self {
        Self {
            template,
            fonts: BTreeMap::new(),
        }
    }

    fn font_id(&mut self, font: StandardFont) -> ObjectId {
        if let Some(id) = self.fonts.get(&font) {
            return *id;
        }
        let id = self.template.document_mut().add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        self.fonts.insert(font, id);
        id
    }

    /// Compose one overlay onto its page. Layer warnings are moved into
    /// `warnings`.
    pub fn compose(&mut self, overlay: PageOverlay, warnings: &mut Warnings) -> Result<()> {
        let page_id = self.template.page_id(overlay.page)?;
        let (mut behind, mut front) = overlay.into_layers();
        warnings.append(behind.take_warnings());
        warnings.append(front.take_warnings());

        if behind.is_empty() && front.is_empty() {
            return Ok(());
        }

        let mut resources = resolve_resources(self.template.document(), page_id)?;
        let behind_ref = self.render_layer(&behind, &mut resources)?;
        let front_ref = self.render_layer(&front, &mut resources)?;

        let doc = self.template.document_mut();
        let original = existing_contents(doc, page_id)?;

        let mut contents = Vec::with_capacity(original.len() + 4);
        contents.extend(behind_ref);
        contents.push(Object::Reference(add_raw_stream(doc, b"q\n")));
        contents.extend(original);
        contents.push(Object::Reference(add_raw_stream(doc, b"\nQ\n")));
        contents.extend(front_ref);

        let page = doc.get_dictionary_mut(page_id)?;
        page.set("Resources", Object::Dictionary(resources));
        page.set("Contents", Object::Array(contents));

        tracing::debug!(
            page = ?page_id,
            behind_ops = behind.operations().len(),
            front_ops = front.operations().len(),
            "overlay composed"
        );
        Ok(())
    }

    fn render_layer(
        &mut self,
        layer: &OverlayLayer,
        resources: &mut Dictionary,
    ) -> Result<Option<Object>> {
        if layer.is_empty() {
            return Ok(None);
        }

        for font in layer.fonts() {
            let id = self.font_id(*font);
            subdictionary(self.template.document(), resources, b"Font")?
                .set(font.resource_name(), Object::Reference(id));
        }

        for (name, image) in layer.images() {
            let id = self.template.document_mut().add_object(image.to_stream());
            subdictionary(self.template.document(), resources, b"XObject")?
                .set(name.as_bytes().to_vec(), Object::Reference(id));
        }

        let mut operations = Vec::with_capacity(layer.operations().len() + 2);
        operations.push(Operation::new("q", vec![]));
        operations.extend(layer.operations().iter().cloned());
        operations.push(Operation::new("Q", vec![]));
        let bytes = Content { operations }.encode()?;

        let id = self
            .template
            .document_mut()
            .add_object(Stream::new(dictionary! {}, bytes));
        Ok(Some(Object::Reference(id)))
    }
}

fn add_raw_stream(doc: &mut Document, bytes: &[u8]) -> ObjectId {
    doc.add_object(Stream::new(dictionary! {}, bytes.to_vec()))
}

/// The page's content streams as a flat list of references.
fn existing_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page = doc.get_dictionary(page_id)?;
    let contents = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id)? {
            Object::Array(arr) => arr.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(arr)) => arr.clone(),
        Ok(_) => {
            return Err(Error::Pdf {
                reason: "page Contents is neither a stream nor an array".to_string(),
            })
        }
        Err(_) => Vec::new(),
    };
    Ok(contents)
}

/// Resolve the resource dictionary in effect for a page into an owned copy.
fn resolve_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut current = doc.get_dictionary(page_id)?;
    for _ in 0..MAX_INHERIT_DEPTH {
        match current.get(b"Resources") {
            Ok(Object::Dictionary(dict)) => return Ok(dict.clone()),
            Ok(Object::Reference(id)) => return Ok(doc.get_dictionary(*id)?.clone()),
            _ => {}
        }
        match current.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent) => current = doc.get_dictionary(parent)?,
            Err(_) => break,
        }
    }
    Ok(Dictionary::new())
}

/// Get `key` inside `resources` as an inline dictionary, dereferencing or
/// creating it as needed.
fn subdictionary<'r>(
    doc: &Document,
    resources: &'r mut Dictionary,
    key: &[u8],
) -> Result<&'r mut Dictionary> {
    let inline = match resources.get(key) {
        Ok(Object::Dictionary(_)) => None,
        Ok(Object::Reference(id)) => Some(doc.get_dictionary(*id)?.clone()),
        _ => Some(Dictionary::new()),
    };
    if let Some(dict) = inline {
        resources.set(key.to_vec(), Object::Dictionary(dict));
    }
    Ok(resources.get_mut(key)?.as_dict_mut()?)
}
