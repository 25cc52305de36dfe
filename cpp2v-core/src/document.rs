//! Emitting a `Module` as one closed Coq document.
//!
//! The generated file has the following format:
//! ```text
//! From Cpp Require Import Parser.
//!
//! Local Open Scope string_scope.
//! Import ListNotations.
//!
//! Definition module : Ast.module :=
//!   ("<name1>",
//!     <term1>) ::
//!   ("<name2>",
//!     <term2>) ::
//!   nil.
//!
//! ```
//! Every entry is followed by `::`, so the `nil.` terminator appears
//! exactly once whether or not the module has entries.

use std::io::Write;

use crate::error::CoreError;
use crate::layout::Formatter;
use crate::module::{Entry, Module};

const PREAMBLE: &[&str] = &[
    "From Cpp Require Import Parser.",
    "",
    "Local Open Scope string_scope.",
    "Import ListNotations.",
    "",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shape {
    /// `term :: ... :: nil`
    DeclList,
    /// `(name, term) :: ... :: nil`
    #[default]
    NamedPairs,
}

impl Shape {
    fn definition_header(self) -> &'static str {
        match self {
            Shape::DeclList => "Definition module : list Decl :=",
            Shape::NamedPairs => "Definition module : Ast.module :=",
        }
    }
}

/// A document between its preamble and its terminator. `begin` writes
/// the preamble and `finish` the terminator; `finish` consumes the
/// writer, so nothing can be appended to a terminated document.
pub struct DocumentWriter<W: Write> {
    fmt: Formatter<W>,
    shape: Shape,
}

impl<W: Write> DocumentWriter<W> {
    pub fn begin(sink: W, shape: Shape) -> Result<Self, CoreError> {
        let mut fmt = Formatter::new(sink);
        for line in PREAMBLE {
            fmt.text(line)?.line()?;
        }
        fmt.text(shape.definition_header())?.indent();
        Ok(Self { fmt, shape })
    }

    pub fn entry(&mut self, entry: &Entry) -> Result<(), CoreError> {
        let shape = self.shape;
        let fmt = &mut self.fmt;
        fmt.line()?.text("(")?;
        if shape == Shape::NamedPairs {
            fmt.text(&format!("\"{}\",", entry.name.replace('"', "\"\"")))?;
            fmt.nested(|f| {
                f.line()?.text(&entry.term)?;
                Ok(())
            })?;
        } else {
            fmt.text(&entry.term)?;
        }
        fmt.text(")")?.nbsp()?.text("::")?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<W, CoreError> {
        self.fmt.line()?.text("nil.")?;
        self.fmt.outdent()?;
        self.fmt.line()?.line()?;
        self.fmt.finish()
    }
}

/// Write `module` to `sink` as a complete document.
pub fn assemble<W: Write>(module: &Module, shape: Shape, sink: W) -> Result<W, CoreError> {
    let mut document = DocumentWriter::begin(sink, shape)?;
    for entry in module.entries() {
        document.entry(entry)?;
    }
    document.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::DeclId;

    fn assemble_text(module: &Module, shape: Shape) -> String {
        let bytes = assemble(module, shape, Vec::new()).expect("assemble");
        String::from_utf8(bytes).expect("utf8")
    }

    fn sample_module() -> Module {
        let mut module = Module::new();
        module
            .insert("f".to_string(), "Dtypedef \"f\" Tbool".to_string(), DeclId(1))
            .expect("insert");
        module
            .insert(
                "g".to_string(),
                "Dstruct \"g\" (Some\n  [ (\"x\", Tbool) ])".to_string(),
                DeclId(2),
            )
            .expect("insert");
        module
    }

    #[test]
    fn empty_module_is_preamble_and_terminator() {
        assert_eq!(
            assemble_text(&Module::new(), Shape::NamedPairs),
            concat!(
                "From Cpp Require Import Parser.\n",
                "\n",
                "Local Open Scope string_scope.\n",
                "Import ListNotations.\n",
                "\n",
                "Definition module : Ast.module :=\n",
                "  nil.\n",
                "\n",
            )
        );
    }

    #[test]
    fn named_pairs_reindent_multiline_terms() {
        let text = assemble_text(&sample_module(), Shape::NamedPairs);
        assert!(text.ends_with(concat!(
            "Definition module : Ast.module :=\n",
            "  (\"f\",\n",
            "    Dtypedef \"f\" Tbool) ::\n",
            "  (\"g\",\n",
            "    Dstruct \"g\" (Some\n",
            "      [ (\"x\", Tbool) ])) ::\n",
            "  nil.\n",
            "\n",
        )));
    }

    #[test]
    fn decl_list_omits_names() {
        let text = assemble_text(&sample_module(), Shape::DeclList);
        assert!(text.contains(concat!(
            "Definition module : list Decl :=\n",
            "  (Dtypedef \"f\" Tbool) ::\n",
        )));
        assert!(!text.contains("(\"f\","));
        assert_eq!(text.matches("nil.").count(), 1);
    }
}
