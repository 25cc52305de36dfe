//! The translation unit as handed over by the semantic analyzer.
//!
//! Parsing C++ is not our job: the front-end serializes its resolved AST
//! to JSON and this module only models the parts the module pipeline
//! consumes. Declarations are identified by `DeclId`, which is the key
//! for every side table built during a run.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub u32);

/// Stable identity of a declaration within one translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeclId(pub u32);

impl fmt::Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a source file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// The file the front-end was invoked on.
    Main,
    User,
    /// A system or library header.
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceFile {
    pub id: FileId,
    pub path: PathBuf,
    pub provenance: Provenance,
    #[serde(default)]
    pub included_from: Option<FileId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceLocation {
    pub file: FileId,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    Void,
    Bool,
    Char,
    Int { bits: u16, signed: bool },
    Float { bits: u16 },
    Pointer(Box<Type>),
    Reference(Box<Type>),
    Const(Box<Type>),
    Named(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Neg,
    Not,
    Deref,
    AddrOf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Int(i64),
    Bool(bool),
    Var(String),
    Call { callee: String, args: Vec<Expr> },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Assign { target: Box<Expr>, value: Box<Expr> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stmt {
    Return(Option<Expr>),
    Expr(Expr),
    Block(Vec<Stmt>),
    If {
        cond: Expr,
        then: Box<Stmt>,
        #[serde(default)]
        otherwise: Option<Box<Stmt>>,
    },
    While { cond: Expr, body: Box<Stmt> },
    Decl {
        name: String,
        ty: Type,
        #[serde(default)]
        init: Option<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Field {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordTag {
    Struct,
    Class,
    Union,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    Function {
        ret: Type,
        params: Vec<Param>,
        #[serde(default)]
        body: Option<Vec<Stmt>>,
    },
    Variable {
        ty: Type,
        #[serde(default)]
        init: Option<Expr>,
    },
    Record {
        tag: RecordTag,
        #[serde(default)]
        fields: Option<Vec<Field>>,
    },
    Enumeration { constants: Vec<(String, i64)> },
    Typedef { ty: Type },
    /// Anything the front-end saw but has no structured form for.
    Unsupported { clang_kind: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Decl {
    pub id: DeclId,
    pub name: String,
    /// Enclosing namespaces and classes, outermost first.
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub location: Option<SourceLocation>,
    /// Raw comment text attached by the front-end.
    #[serde(default)]
    pub comment: Option<String>,
    pub kind: DeclKind,
}

impl Decl {
    pub fn qualified_name(&self) -> String {
        if self.scope.is_empty() {
            self.name.clone()
        } else {
            format!("{}::{}", self.scope.join("::"), self.name)
        }
    }

    pub fn is_definition(&self) -> bool {
        match &self.kind {
            DeclKind::Function { body, .. } => body.is_some(),
            DeclKind::Variable { init, .. } => init.is_some(),
            DeclKind::Record { fields, .. } => fields.is_some(),
            DeclKind::Enumeration { .. } | DeclKind::Typedef { .. } => true,
            DeclKind::Unsupported { .. } => false,
        }
    }
}

/// The immediate children of the translation unit, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranslationUnit {
    pub files: Vec<SourceFile>,
    pub decls: Vec<Decl>,
}

impl TranslationUnit {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, CoreError> {
        let unit: TranslationUnit = serde_json::from_str(text)?;
        unit.validate()?;
        Ok(unit)
    }

    /// Check the referential integrity the rest of the pipeline relies on.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut file_ids = HashSet::new();
        for file in &self.files {
            if !file_ids.insert(file.id) {
                return Err(CoreError::InvalidUnit(format!(
                    "file id {} is used twice",
                    file.id.0
                )));
            }
        }
        for file in &self.files {
            if let Some(parent) = file.included_from {
                if !file_ids.contains(&parent) {
                    return Err(CoreError::InvalidUnit(format!(
                        "{} is included from unknown file {}",
                        file.path.display(),
                        parent.0
                    )));
                }
            }
            if self.include_chain(file.id).count() > self.files.len() {
                return Err(CoreError::InvalidUnit(format!(
                    "include chain of {} is cyclic",
                    file.path.display()
                )));
            }
        }

        let mut decl_ids = HashSet::new();
        for decl in &self.decls {
            if !decl_ids.insert(decl.id) {
                return Err(CoreError::InvalidUnit(format!(
                    "declaration id {} is used twice",
                    decl.id
                )));
            }
            if let Some(location) = decl.location {
                if !file_ids.contains(&location.file) {
                    return Err(CoreError::InvalidUnit(format!(
                        "declaration `{}` refers to unknown file {}",
                        decl.qualified_name(),
                        location.file.0
                    )));
                }
            }
        }
        Ok(())
    }

    /// Linear lookup; units carry few files.
    pub fn file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.iter().find(|file| file.id == id)
    }

    pub fn find_decl(&self, qualified_name: &str) -> Option<&Decl> {
        self.decls
            .iter()
            .find(|decl| decl.qualified_name() == qualified_name)
    }

    /// Whether `location` lies in a system header, either directly, through
    /// a system file somewhere up its include chain, or under one of
    /// `extra_roots`.
    pub fn is_system_location(&self, location: &SourceLocation, extra_roots: &[PathBuf]) -> bool {
        self.include_chain(location.file)
            .take(self.files.len())
            .any(|file| {
                file.provenance == Provenance::System
                    || extra_roots.iter().any(|root| file.path.starts_with(root))
            })
    }

    /// `start` followed by every file that (transitively) includes it.
    /// Yields more than `files.len()` items only when the chain is cyclic.
    fn include_chain(&self, start: FileId) -> impl Iterator<Item = &SourceFile> + '_ {
        let mut next = self.file(start);
        let mut steps = 0;
        std::iter::from_fn(move || {
            if steps > self.files.len() {
                return None;
            }
            let current = next?;
            steps += 1;
            next = current.included_from.and_then(|parent| self.file(parent));
            Some(current)
        })
    }
}
