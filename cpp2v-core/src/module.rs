//! The ordered name-to-term mapping and the single pass that fills it.

use std::collections::HashMap;

use tracing::debug;

use crate::ast::{DeclId, TranslationUnit};
use crate::error::CoreError;
use crate::filter::{Filter, FilterContext};
use crate::render::{RenderContext, Renderer};
use crate::specs::SpecTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub term: String,
    /// Declaration the entry was rendered from.
    pub origin: DeclId,
}

/// Entries in insertion order. Names are unique.
#[derive(Debug, Default)]
pub struct Module {
    entries: Vec<Entry>,
    by_name: HashMap<String, usize>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. A name already owned by another declaration is a
    /// fatal collision; re-adding the same declaration changes nothing.
    pub fn insert(&mut self, name: String, term: String, origin: DeclId) -> Result<(), CoreError> {
        if let Some(&index) = self.by_name.get(&name) {
            let first = self.entries[index].origin;
            if first == origin {
                return Ok(());
            }
            return Err(CoreError::NameCollision {
                name,
                first,
                second: origin,
            });
        }
        self.by_name.insert(name.clone(), self.entries.len());
        self.entries.push(Entry { name, term, origin });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.by_name.get(name).map(|&index| &self.entries[index])
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Render every top-level declaration of `unit` that `filter` lets
/// through, in source order. Nested declarations are the renderer's
/// business.
pub fn build_module(
    unit: &TranslationUnit,
    filter: &Filter,
    specs: &SpecTable,
    renderer: &mut dyn Renderer,
) -> Result<Module, CoreError> {
    let filter_cx = FilterContext { unit, specs };
    let mut module = Module::new();
    for decl in &unit.decls {
        let verdict = filter.verdict(decl, &filter_cx);
        if !verdict.is_included() {
            debug!(decl = %decl.id, name = %decl.qualified_name(), ?verdict, "skipping declaration");
            continue;
        }
        let render_cx = RenderContext { unit, verdict };
        let rendered = renderer.render(decl, &render_cx, specs)?;
        debug!(decl = %decl.id, name = %rendered.name, ?verdict, "adding declaration");
        module.insert(rendered.name, rendered.term, decl.id)?;
    }
    Ok(module)
}
