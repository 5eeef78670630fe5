//! Template loading
//!
//! A [`FormTemplate`] is a fixed-layout PDF loaded fresh for every generation
//! call. Nothing is cached between calls.

use crate::error::{Error, Result};
use lopdf::{Document, Object, ObjectId};
use std::path::Path;

/// US Letter, used when a page carries no usable MediaBox
pub const LETTER: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// A loaded template document
pub struct FormTemplate {
    doc: Document,
}

impl FormTemplate {
    /// Load a template from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.is_file() {
            return Err(Error::TemplateNotFound {
                path: path.display().to_string(),
            });
        }

        let data = std::fs::read(path)?;
        let template = Self::from_bytes(&data)?;
        tracing::debug!(
            path = %path.display(),
            pages = template.page_count(),
            "template loaded"
        );
        Ok(template)
    }

    /// Load a template from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 4 || &data[0..4] != b"%PDF" {
            return Err(Error::InvalidTemplate {
                reason: "Not a valid PDF file".to_string(),
            });
        }

        let doc = Document::load_mem(data).map_err(|e| Error::InvalidTemplate {
            reason: e.to_string(),
        })?;

        if doc.get_pages().is_empty() {
            return Err(Error::InvalidTemplate {
                reason: "PDF has no pages".to_string(),
            });
        }

        Ok(Self { doc })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Object id of the zero-based page `index`.
    pub fn page_id(&self, index: usize) -> Result<ObjectId> {
        let total = self.page_count();
        u32::try_from(index + 1)
            .ok()
            .and_then(|number| self.doc.get_pages().get(&number).copied())
            .ok_or(Error::PageOutOfBounds {
                page: u32::try_from(index).unwrap_or(u32::MAX),
                total: u32::try_from(total).unwrap_or(u32::MAX),
            })
    }

    /// MediaBox of a page, inherited from the page tree if needed.
    pub fn media_box(&self, index: usize) -> Result<[f32; 4]> {
        let page_id = self.page_id(index)?;
        Ok(media_box(&self.doc, page_id))
    }

    /// Drop every page after the first `count`.
    pub fn keep_pages(&mut self, count: usize) {
        let total = self.page_count();
        if total <= count {
            return;
        }
        let extra: Vec<u32> = ((count + 1)..=total)
            .filter_map(|n| u32::try_from(n).ok())
            .collect();
        tracing::debug!(kept = count, removed = extra.len(), "trimming template pages");
        self.doc.delete_pages(&extra);
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Serialize the (possibly modified) document.
    pub fn save_to_vec(mut self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.doc.save_to(&mut output)?;
        Ok(output)
    }
}

fn as_f32(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Resolve a page's MediaBox, walking up `Parent` links with a depth limit.
pub fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let mut current = doc.get_dictionary(page_id).ok();
    for _ in 0..10 {
        let Some(dict) = current else { break };

        if let Ok(obj) = dict.get(b"MediaBox") {
            let arr = match obj {
                Object::Array(arr) => Some(arr),
                Object::Reference(id) => doc.get_object(*id).ok().and_then(|o| o.as_array().ok()),
                _ => None,
            };
            if let Some(values) = arr.map(|a| a.iter().filter_map(as_f32).collect::<Vec<_>>()) {
                if values.len() == 4 {
                    return [values[0], values[1], values[2], values[3]];
                }
            }
        }

        current = dict
            .get(b"Parent")
            .and_then(Object::as_reference)
            .and_then(|id| doc.get_dictionary(id))
            .ok();
    }
    LETTER
}
