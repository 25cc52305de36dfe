//! Turning one declaration into a term.
//!
//! The module builder only depends on the `Renderer` trait. `CoqRenderer`
//! is the stock implementation; it targets the `Cpp.Parser` notation and
//! lays nested statements out with the shared `Formatter`.

use std::io::Write;

use crate::ast::{
    BinaryOp, Decl, DeclKind, Expr, Field, Param, RecordTag, Stmt, TranslationUnit, Type, UnaryOp,
};
use crate::error::CoreError;
use crate::filter::Verdict;
use crate::layout::{Formatter, render_to_string};
use crate::specs::SpecTable;

/// Canonical name and term of one declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub name: String,
    pub term: String,
}

#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub unit: &'a TranslationUnit,
    /// Combined filter verdict; `Declaration` asks for the signature only.
    pub verdict: Verdict,
}

pub trait Renderer {
    /// Must be deterministic for a given declaration and table content.
    fn render(
        &mut self,
        decl: &Decl,
        cx: &RenderContext<'_>,
        specs: &SpecTable,
    ) -> Result<Rendered, CoreError>;
}

#[derive(Debug, Default)]
pub struct CoqRenderer;

impl CoqRenderer {
    pub fn new() -> Self {
        CoqRenderer
    }
}

impl Renderer for CoqRenderer {
    fn render(
        &mut self,
        decl: &Decl,
        cx: &RenderContext<'_>,
        specs: &SpecTable,
    ) -> Result<Rendered, CoreError> {
        let name = decl.qualified_name();
        let full = cx.verdict >= Verdict::Definition;
        let term = render_to_string(|f| emit_decl(f, decl, &name, full, specs))?;
        Ok(Rendered { name, term })
    }
}

/// Lay out a single statement on its own.
pub fn render_stmt(stmt: &Stmt) -> Result<String, CoreError> {
    render_to_string(|f| emit_stmt(f, stmt))
}

fn emit_decl<W: Write>(
    f: &mut Formatter<W>,
    decl: &Decl,
    name: &str,
    full: bool,
    specs: &SpecTable,
) -> Result<(), CoreError> {
    let name = coq_string(name);
    match &decl.kind {
        DeclKind::Function { ret, params, body } => {
            f.text("Dfunction ")?.text(&name)?;
            f.nested(|f| {
                f.line()?.text("{| f_return := ")?.text(&type_term(ret))?.text(";")?;
                f.line()?.text("   f_params := ")?.text(&params_term(params))?.text(";")?;
                f.line()?.text("   f_spec := ")?;
                emit_fn_spec(f, decl, specs)?;
                f.text(";")?;
                f.line()?.text("   f_body := ")?;
                match body.as_ref().filter(|_| full) {
                    Some(body) => {
                        f.text("Some")?;
                        f.nested(|f| {
                            f.line()?;
                            emit_block(f, body)
                        })?;
                    }
                    None => {
                        f.text("None")?;
                    }
                }
                f.text(" |}")?;
                Ok(())
            })
        }
        DeclKind::Variable { ty, init } => {
            f.text("Dvar ")?.text(&name)?.nbsp()?.text(&type_term(ty))?.nbsp()?;
            match init.as_ref().filter(|_| full) {
                Some(init) => f.text("(Some ")?.text(&expr_term(init))?.text(")")?,
                None => f.text("None")?,
            };
            Ok(())
        }
        DeclKind::Record { tag, fields } => {
            let ctor = match tag {
                RecordTag::Struct | RecordTag::Class => "Dstruct ",
                RecordTag::Union => "Dunion ",
            };
            f.text(ctor)?.text(&name)?.nbsp()?;
            match fields.as_ref().filter(|_| full) {
                Some(fields) => {
                    f.text("(Some")?;
                    f.nested(|f| {
                        f.line()?;
                        emit_fields(f, fields)
                    })?;
                    f.text(")")?;
                }
                None => {
                    f.text("None")?;
                }
            }
            Ok(())
        }
        DeclKind::Enumeration { constants } => {
            let constants = constants
                .iter()
                .map(|(constant, value)| format!("({}, {})", coq_string(constant), coq_int(*value)))
                .collect::<Vec<_>>();
            f.text("Denum ")?.text(&name)?.nbsp()?.text(&coq_list(&constants))?;
            Ok(())
        }
        DeclKind::Typedef { ty } => {
            f.text("Dtypedef ")?.text(&name)?.nbsp()?.text(&type_term(ty))?;
            Ok(())
        }
        DeclKind::Unsupported { clang_kind } => Err(CoreError::Unrenderable {
            decl: decl.id,
            reason: format!("no term for `{clang_kind}` declarations"),
        }),
    }
}

fn emit_fn_spec<W: Write>(
    f: &mut Formatter<W>,
    decl: &Decl,
    specs: &SpecTable,
) -> Result<(), CoreError> {
    let requires = specs.get(decl.id, "requires");
    let ensures = specs.get(decl.id, "ensures");
    if requires.is_none() && ensures.is_none() {
        f.text("None")?;
        return Ok(());
    }
    let clause = |value: Option<&str>| match value {
        Some(value) => format!("(Some {})", coq_string(value)),
        None => "None".to_string(),
    };
    f.text("Some {| s_requires := ")?
        .text(&clause(requires))?
        .text(";")?;
    f.nested(|f| {
        f.line()?
            .text("s_ensures := ")?
            .text(&clause(ensures))?
            .text(" |}")?;
        Ok(())
    })
}

fn emit_fields<W: Write>(f: &mut Formatter<W>, fields: &[Field]) -> Result<(), CoreError> {
    if fields.is_empty() {
        f.text("[]")?;
        return Ok(());
    }
    for (i, field) in fields.iter().enumerate() {
        f.text(if i == 0 { "[ " } else { "; " })?;
        f.text(&format!("({}, {})", coq_string(&field.name), type_term(&field.ty)))?;
        if i + 1 < fields.len() {
            f.line()?;
        }
    }
    f.text(" ]")?;
    Ok(())
}

fn emit_block<W: Write>(f: &mut Formatter<W>, stmts: &[Stmt]) -> Result<(), CoreError> {
    if stmts.is_empty() {
        f.text("(Sseq [])")?;
        return Ok(());
    }
    f.text("(Sseq [")?;
    f.nested(|f| {
        for (i, stmt) in stmts.iter().enumerate() {
            f.line()?;
            emit_stmt(f, stmt)?;
            if i + 1 < stmts.len() {
                f.text(";")?;
            }
        }
        Ok(())
    })?;
    f.text("])")?;
    Ok(())
}

fn emit_stmt<W: Write>(f: &mut Formatter<W>, stmt: &Stmt) -> Result<(), CoreError> {
    match stmt {
        Stmt::Return(None) => {
            f.text("(Sreturn None)")?;
        }
        Stmt::Return(Some(value)) => {
            f.text("(Sreturn (Some ")?.text(&expr_term(value))?.text("))")?;
        }
        Stmt::Expr(expr) => {
            f.text("(Sexpr ")?.text(&expr_term(expr))?.text(")")?;
        }
        Stmt::Block(stmts) => emit_block(f, stmts)?,
        Stmt::If {
            cond,
            then,
            otherwise,
        } => {
            f.text("(Sif ")?.text(&expr_term(cond))?;
            f.nested(|f| {
                f.line()?;
                emit_stmt(f, then)?;
                f.line()?;
                match otherwise {
                    Some(otherwise) => emit_stmt(f, otherwise),
                    None => {
                        f.text("Sskip")?;
                        Ok(())
                    }
                }
            })?;
            f.text(")")?;
        }
        Stmt::While { cond, body } => {
            f.text("(Swhile ")?.text(&expr_term(cond))?;
            f.nested(|f| {
                f.line()?;
                emit_stmt(f, body)
            })?;
            f.text(")")?;
        }
        Stmt::Decl { name, ty, init } => {
            let init = match init {
                Some(init) => format!("(Some {})", expr_term(init)),
                None => "None".to_string(),
            };
            f.text(&format!(
                "(Sdecl {} {} {})",
                coq_string(name),
                type_term(ty),
                init
            ))?;
        }
    }
    Ok(())
}

fn type_term(ty: &Type) -> String {
    match ty {
        Type::Void => "Tvoid".to_string(),
        Type::Bool => "Tbool".to_string(),
        Type::Char => "Tchar".to_string(),
        Type::Int { bits, signed } => {
            let signedness = if *signed { "Signed" } else { "Unsigned" };
            format!("(Tint W{bits} {signedness})")
        }
        Type::Float { bits } => format!("(Tfloat W{bits})"),
        Type::Pointer(inner) => format!("(Tpointer {})", type_term(inner)),
        Type::Reference(inner) => format!("(Treference {})", type_term(inner)),
        Type::Const(inner) => format!("(Qconst {})", type_term(inner)),
        Type::Named(name) => format!("(Tnamed {})", coq_string(name)),
    }
}

fn params_term(params: &[Param]) -> String {
    let params = params
        .iter()
        .map(|param| format!("({}, {})", coq_string(&param.name), type_term(&param.ty)))
        .collect::<Vec<_>>();
    coq_list(&params)
}

fn expr_term(expr: &Expr) -> String {
    match expr {
        Expr::Int(value) => format!("(Eint {})", coq_int(*value)),
        Expr::Bool(value) => format!("(Ebool {value})"),
        Expr::Var(name) => format!("(Evar {})", coq_string(name)),
        Expr::Call { callee, args } => {
            let args = args.iter().map(expr_term).collect::<Vec<_>>();
            format!("(Ecall {} {})", coq_string(callee), coq_list(&args))
        }
        Expr::Binary { op, lhs, rhs } => {
            let (lhs, rhs) = (expr_term(lhs), expr_term(rhs));
            match op {
                BinaryOp::And => format!("(Eseqand {lhs} {rhs})"),
                BinaryOp::Or => format!("(Eseqor {lhs} {rhs})"),
                op => format!("(Ebinop {} {lhs} {rhs})", binop_name(*op)),
            }
        }
        Expr::Unary { op, operand } => {
            let operand = expr_term(operand);
            match op {
                UnaryOp::Neg => format!("(Eunop Uminus {operand})"),
                UnaryOp::Not => format!("(Eunop Unot {operand})"),
                UnaryOp::Deref => format!("(Ederef {operand})"),
                UnaryOp::AddrOf => format!("(Eaddrof {operand})"),
            }
        }
        Expr::Assign { target, value } => {
            format!("(Eassign {} {})", expr_term(target), expr_term(value))
        }
    }
}

fn binop_name(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "Badd",
        BinaryOp::Sub => "Bsub",
        BinaryOp::Mul => "Bmul",
        BinaryOp::Div => "Bdiv",
        BinaryOp::Rem => "Bmod",
        BinaryOp::Lt => "Blt",
        BinaryOp::Le => "Ble",
        BinaryOp::Gt => "Bgt",
        BinaryOp::Ge => "Bge",
        BinaryOp::Eq => "Beq",
        BinaryOp::Ne => "Bneq",
        BinaryOp::And => "Band",
        BinaryOp::Or => "Bor",
    }
}

/// Coq string literal; quotes are escaped by doubling them.
fn coq_string(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

fn coq_int(value: i64) -> String {
    if value < 0 {
        format!("({value})")
    } else {
        value.to_string()
    }
}

fn coq_list(items: &[String]) -> String {
    format!("[{}]", items.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::DeclId;
    use crate::specs::Annotation;

    fn int() -> Type {
        Type::Int {
            bits: 32,
            signed: true,
        }
    }

    fn decl(kind: DeclKind) -> Decl {
        Decl {
            id: DeclId(1),
            name: "f".to_string(),
            scope: vec!["ns".to_string()],
            location: None,
            comment: None,
            kind,
        }
    }

    fn render(decl: &Decl, verdict: Verdict, specs: &SpecTable) -> Result<Rendered, CoreError> {
        let unit = TranslationUnit::default();
        let cx = RenderContext {
            unit: &unit,
            verdict,
        };
        CoqRenderer::new().render(decl, &cx, specs)
    }

    fn add_function() -> Decl {
        decl(DeclKind::Function {
            ret: int(),
            params: vec![
                Param {
                    name: "a".to_string(),
                    ty: int(),
                },
                Param {
                    name: "b".to_string(),
                    ty: int(),
                },
            ],
            body: Some(vec![Stmt::Return(Some(Expr::Binary {
                op: BinaryOp::Add,
                lhs: Box::new(Expr::Var("a".to_string())),
                rhs: Box::new(Expr::Var("b".to_string())),
            }))]),
        })
    }

    #[test]
    fn renders_function_definition() {
        let rendered = render(&add_function(), Verdict::Definition, &SpecTable::new()).expect("render");
        assert_eq!(rendered.name, "ns::f");
        assert_eq!(
            rendered.term,
            concat!(
                "Dfunction \"ns::f\"\n",
                "  {| f_return := (Tint W32 Signed);\n",
                "     f_params := [(\"a\", (Tint W32 Signed)); (\"b\", (Tint W32 Signed))];\n",
                "     f_spec := None;\n",
                "     f_body := Some\n",
                "    (Sseq [\n",
                "      (Sreturn (Some (Ebinop Badd (Evar \"a\") (Evar \"b\"))))]) |}",
            )
        );
    }

    #[test]
    fn declaration_verdict_drops_body() {
        let rendered = render(&add_function(), Verdict::Declaration, &SpecTable::new()).expect("render");
        assert!(rendered.term.contains("f_body := None |}"));
        assert!(!rendered.term.contains("Sseq"));
    }

    #[test]
    fn spec_annotations_become_function_spec() {
        let mut specs = SpecTable::new();
        specs.record(DeclId(1), [Annotation::new("requires", Some("a >= \"0\""))]);
        let rendered = render(&add_function(), Verdict::Definition, &specs).expect("render");
        assert!(rendered.term.contains("f_spec := Some {| s_requires := (Some \"a >= \"\"0\"\"\");"));
        assert!(rendered.term.contains("s_ensures := None |};"));
    }

    #[test]
    fn renders_records_and_enums() {
        let record = decl(DeclKind::Record {
            tag: RecordTag::Union,
            fields: Some(vec![
                Field {
                    name: "i".to_string(),
                    ty: int(),
                },
                Field {
                    name: "p".to_string(),
                    ty: Type::Pointer(Box::new(Type::Const(Box::new(Type::Char)))),
                },
            ]),
        });
        let rendered = render(&record, Verdict::Definition, &SpecTable::new()).expect("render");
        assert_eq!(
            rendered.term,
            "Dunion \"ns::f\" (Some\n  [ (\"i\", (Tint W32 Signed))\n  ; (\"p\", (Tpointer (Qconst Tchar))) ])"
        );

        let enumeration = decl(DeclKind::Enumeration {
            constants: vec![("Lo".to_string(), -1), ("Hi".to_string(), 1)],
        });
        let rendered = render(&enumeration, Verdict::Declaration, &SpecTable::new()).expect("render");
        assert_eq!(rendered.term, "Denum \"ns::f\" [(\"Lo\", (-1)); (\"Hi\", 1)]");
    }

    #[test]
    fn unsupported_declarations_are_unrenderable() {
        let unsupported = decl(DeclKind::Unsupported {
            clang_kind: "ClassTemplate".to_string(),
        });
        let err = render(&unsupported, Verdict::Definition, &SpecTable::new()).unwrap_err();
        assert!(matches!(err, CoreError::Unrenderable { decl: DeclId(1), .. }));
    }

    #[test]
    fn statements_nest_with_indentation() {
        let stmt = Stmt::While {
            cond: Expr::Bool(true),
            body: Box::new(Stmt::If {
                cond: Expr::Var("x".to_string()),
                then: Box::new(Stmt::Return(None)),
                otherwise: None,
            }),
        };
        let text = render_stmt(&stmt).expect("render");
        assert_eq!(
            text,
            "(Swhile (Ebool true)\n  (Sif (Evar \"x\")\n    (Sreturn None)\n    Sskip))"
        );
    }
}
