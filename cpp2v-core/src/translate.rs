use std::io::Write;
use std::path::PathBuf;

use tracing::info;

use crate::ast::{Decl, Stmt, TranslationUnit};
use crate::document::{Shape, assemble};
use crate::error::CoreError;
use crate::filter::{Filter, FilterContext, Reduction};
use crate::layout::Formatter;
use crate::module::build_module;
use crate::render::{RenderContext, Renderer, render_stmt};
use crate::specs::{SpecCollector, SpecTable, parse_annotations};

/// Knobs for one whole-module translation.
#[derive(Debug, Clone)]
pub struct TranslateOptions {
    pub shape: Shape,
    pub reduction: Reduction,
    /// Annotation a declaration must carry to be exported. `None` drops
    /// the annotation gate.
    pub export_key: Option<String>,
    /// Directories treated as system headers in addition to the files the
    /// front-end marked as such.
    pub system_roots: Vec<PathBuf>,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            shape: Shape::NamedPairs,
            reduction: Reduction::Min,
            export_key: Some("export".to_string()),
            system_roots: Vec::new(),
        }
    }
}

impl TranslateOptions {
    /// The gates every exported declaration goes through, reduced as
    /// configured.
    pub fn export_filter(&self) -> Filter {
        let mut filters = vec![Filter::NoSystemHeaders {
            extra_roots: self.system_roots.clone(),
        }];
        if let Some(key) = &self.export_key {
            filters.push(Filter::RequiresAnnotation { key: key.clone() });
        }
        Filter::Combine {
            reduction: self.reduction,
            filters,
        }
    }
}

/// Translate the whole unit into one document written to `sink`.
///
/// On error the sink may hold a partial document; callers should write
/// into a buffer and discard it in that case.
pub fn translate_module<W: Write>(
    unit: &TranslationUnit,
    options: &TranslateOptions,
    renderer: &mut dyn Renderer,
    sink: W,
) -> Result<W, CoreError> {
    let mut specs = SpecTable::new();
    SpecCollector::new().collect_unit(unit, &mut specs);

    let filter = options.export_filter();
    let module = build_module(unit, &filter, &specs, renderer)?;
    info!(
        declarations = unit.decls.len(),
        annotated = specs.len(),
        exported = module.len(),
        "module assembled"
    );
    assemble(&module, options.shape, sink)
}

/// Render a single declaration as a bare term, bypassing the export gates.
pub fn translate_decl<W: Write>(
    unit: &TranslationUnit,
    decl: &Decl,
    renderer: &mut dyn Renderer,
    sink: W,
) -> Result<W, CoreError> {
    let mut specs = SpecTable::new();
    if let Some(comment) = &decl.comment {
        specs.record(decl.id, parse_annotations(comment));
    }
    let filter = Filter::definitions();
    let verdict = filter.verdict(
        decl,
        &FilterContext {
            unit,
            specs: &specs,
        },
    );
    let rendered = renderer.render(decl, &RenderContext { unit, verdict }, &specs)?;
    write_term(&rendered.term, sink)
}

pub fn translate_stmt<W: Write>(stmt: &Stmt, sink: W) -> Result<W, CoreError> {
    write_term(&render_stmt(stmt)?, sink)
}

fn write_term<W: Write>(term: &str, sink: W) -> Result<W, CoreError> {
    let mut fmt = Formatter::new(sink);
    fmt.text(term)?.line()?;
    fmt.finish()
}
