use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use cpp2v_core::document::Shape;
use cpp2v_core::filter::Reduction;
use cpp2v_core::{
    CoqRenderer, CoreError, TranslateOptions, TranslationUnit, translate_decl, translate_module,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

/// Environment variable holding the log filter.
const LOG_ENV_VAR: &str = "CPP2V_LOG";

/// Translate a serialized C++ translation unit into a Coq module.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(short, long, help = "Translation unit JSON (defaults to stdin)")]
    input: Option<String>,

    #[arg(short, long, help = "Output file (defaults to stdout)")]
    output: Option<String>,

    #[arg(
        long,
        value_name = "SHAPE",
        default_value = "named",
        help = "Document shape: named, decls"
    )]
    shape: String,

    #[arg(
        long,
        value_name = "MODE",
        default_value = "min",
        help = "How export gates are combined: min (all must pass), max (any may pass)"
    )]
    reduction: String,

    #[arg(
        long,
        value_name = "KEY",
        default_value = "export",
        help = "Annotation that marks a declaration for export"
    )]
    export_key: String,

    #[arg(long, help = "Export every declaration outside system headers")]
    all: bool,

    #[arg(
        long = "system-root",
        value_name = "DIR",
        help = "Treat headers under DIR as system headers (repeatable)"
    )]
    system_roots: Vec<String>,

    #[arg(
        long,
        value_name = "QUALIFIED_NAME",
        help = "Print the term of a single declaration instead of a module"
    )]
    decl: Option<String>,

    #[arg(long, value_name = "DIRECTIVE", help = "Log filter directive, e.g. cpp2v_core=debug")]
    log_level: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = execute(cli) {
        eprintln!("[FATAL ERROR] {err:#}");
        std::process::exit(1);
    }
}

fn execute(cli: Cli) -> Result<()> {
    init_logger(cli.log_level.as_deref())?;

    let source = match &cli.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read input file {path}"))?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    let unit = TranslationUnit::from_json(&source).context("invalid translation unit")?;
    debug!(
        files = unit.files.len(),
        decls = unit.decls.len(),
        "loaded translation unit"
    );

    let mut renderer = CoqRenderer::new();
    // Rendered into memory first: a failed run must not leave a partial document behind.
    let document = match &cli.decl {
        Some(name) => {
            let decl = unit
                .find_decl(name)
                .ok_or_else(|| CoreError::UnknownDecl(name.clone()))?;
            translate_decl(&unit, decl, &mut renderer, Vec::new())?
        }
        None => {
            let options = options(&cli)?;
            translate_module(&unit, &options, &mut renderer, Vec::new())?
        }
    };

    write_output(cli.output.as_deref(), &document)
}

fn options(cli: &Cli) -> Result<TranslateOptions> {
    let shape = match cli.shape.as_str() {
        "named" => Shape::NamedPairs,
        "decls" => Shape::DeclList,
        other => return Err(anyhow::anyhow!("unsupported document shape: {other}")),
    };
    let reduction = match cli.reduction.as_str() {
        "min" => Reduction::Min,
        "max" => Reduction::Max,
        other => return Err(anyhow::anyhow!("unsupported reduction: {other}")),
    };
    Ok(TranslateOptions {
        shape,
        reduction,
        export_key: (!cli.all).then(|| cli.export_key.clone()),
        system_roots: cli.system_roots.iter().map(PathBuf::from).collect(),
    })
}

/// Log to stderr, filtered by `CPP2V_LOG` and `--log-level`.
fn init_logger(log_level: Option<&str>) -> Result<()> {
    let mut filter = EnvFilter::from_env(LOG_ENV_VAR);
    if let Some(log_level) = log_level {
        let directive: Directive = log_level
            .parse()
            .with_context(|| format!("invalid log directive {log_level}"))?;
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

fn write_output(path: Option<&str>, bytes: &[u8]) -> Result<()> {
    let Some(path) = path else {
        let mut stdout = io::stdout().lock();
        stdout.write_all(bytes)?;
        stdout.flush()?;
        return Ok(());
    };
    if let Some(parent) = PathBuf::from(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {parent:?}"))?;
        }
    }
    fs::write(path, bytes).with_context(|| format!("failed to write output file {path}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_cmd::Command;
    use predicates::prelude::*;
    use std::fs;
    use tempfile::tempdir;

    const UNIT: &str = r#"{
        "files": [
            {"id": 0, "path": "main.cpp", "provenance": "main"},
            {"id": 1, "path": "/usr/include/stdlib.h", "provenance": "system", "included_from": 0},
            {"id": 2, "path": "third_party/lib.hpp", "provenance": "user", "included_from": 0}
        ],
        "decls": [
            {"id": 1, "name": "abs", "location": {"file": 1, "line": 40, "column": 1},
             "comment": "// @export",
             "kind": {"function": {"ret": {"int": {"bits": 32, "signed": true}},
                                   "params": [{"name": "x", "ty": {"int": {"bits": 32, "signed": true}}}]}}},
            {"id": 2, "name": "Point", "scope": ["geo"], "location": {"file": 0, "line": 3, "column": 1},
             "comment": "/** @export */",
             "kind": {"record": {"tag": "struct", "fields": [
                 {"name": "x", "ty": {"int": {"bits": 32, "signed": true}}},
                 {"name": "y", "ty": {"int": {"bits": 32, "signed": true}}}]}}},
            {"id": 3, "name": "helper", "location": {"file": 0, "line": 9, "column": 1},
             "kind": {"typedef": {"ty": "bool"}}},
            {"id": 4, "name": "vendored", "location": {"file": 2, "line": 1, "column": 1},
             "comment": "// @export",
             "kind": {"typedef": {"ty": "char"}}}
        ]
    }"#;

    fn write_unit(dir: &std::path::Path, contents: &str) -> std::path::PathBuf {
        let path = dir.join("unit.json");
        fs::write(&path, contents).expect("write unit");
        path
    }

    #[test]
    fn translates_annotated_declarations_to_stdout() {
        let dir = tempdir().expect("tempdir");
        let input_path = write_unit(dir.path(), UNIT);

        Command::cargo_bin("cpp2v")
            .expect("binary exists")
            .arg("--input")
            .arg(&input_path)
            .assert()
            .success()
            .stdout(predicate::str::starts_with("From Cpp Require Import Parser."))
            .stdout(predicate::str::contains("(\"geo::Point\","))
            .stdout(predicate::str::contains("(\"vendored\","))
            .stdout(predicate::str::contains("\"abs\"").not())
            .stdout(predicate::str::contains("helper").not())
            .stdout(predicate::str::ends_with("  nil.\n\n"));
    }

    #[test]
    fn system_roots_extend_the_system_region() {
        let dir = tempdir().expect("tempdir");
        let input_path = write_unit(dir.path(), UNIT);
        let output_path = dir.path().join("out").join("module.v");

        Command::cargo_bin("cpp2v")
            .expect("binary exists")
            .arg("--input")
            .arg(&input_path)
            .arg("--output")
            .arg(&output_path)
            .arg("--system-root")
            .arg("third_party")
            .assert()
            .success();

        let module = fs::read_to_string(&output_path).expect("read module");
        assert!(module.contains("(\"geo::Point\","));
        assert!(!module.contains("vendored"));
    }

    #[test]
    fn all_flag_exports_unannotated_declarations() {
        let dir = tempdir().expect("tempdir");
        let input_path = write_unit(dir.path(), UNIT);

        Command::cargo_bin("cpp2v")
            .expect("binary exists")
            .arg("--input")
            .arg(&input_path)
            .arg("--all")
            .arg("--shape")
            .arg("decls")
            .assert()
            .success()
            .stdout(predicate::str::contains("Definition module : list Decl :="))
            .stdout(predicate::str::contains("(Dtypedef \"helper\" Tbool) ::"))
            .stdout(predicate::str::contains("Dfunction \"abs\"").not());
    }

    #[test]
    fn reads_unit_from_stdin_and_prints_single_declaration() {
        Command::cargo_bin("cpp2v")
            .expect("binary exists")
            .arg("--decl")
            .arg("helper")
            .write_stdin(UNIT)
            .assert()
            .success()
            .stdout("Dtypedef \"helper\" Tbool\n");
    }

    #[test]
    fn reports_unknown_declaration() {
        Command::cargo_bin("cpp2v")
            .expect("binary exists")
            .arg("--decl")
            .arg("missing")
            .write_stdin(UNIT)
            .assert()
            .failure()
            .stderr(predicate::str::contains("[FATAL ERROR]"))
            .stderr(predicate::str::contains("`missing` was not found"));
    }

    #[test]
    fn name_collision_aborts_without_output() {
        let dir = tempdir().expect("tempdir");
        let colliding = r#"{
            "files": [{"id": 0, "path": "main.cpp", "provenance": "main"}],
            "decls": [
                {"id": 1, "name": "f", "location": {"file": 0, "line": 1, "column": 1},
                 "kind": {"function": {"ret": "void", "params": []}}},
                {"id": 2, "name": "f", "location": {"file": 0, "line": 2, "column": 1},
                 "kind": {"function": {"ret": "void", "params": [{"name": "x", "ty": "bool"}]}}}
            ]
        }"#;
        let input_path = write_unit(dir.path(), colliding);
        let output_path = dir.path().join("module.v");

        Command::cargo_bin("cpp2v")
            .expect("binary exists")
            .arg("--input")
            .arg(&input_path)
            .arg("--output")
            .arg(&output_path)
            .arg("--all")
            .assert()
            .failure()
            .stderr(predicate::str::contains("name collision"));

        assert!(!output_path.exists(), "partial output was written");
    }

    #[test]
    fn rejects_unknown_shape() {
        Command::cargo_bin("cpp2v")
            .expect("binary exists")
            .arg("--shape")
            .arg("tree")
            .write_stdin(UNIT)
            .assert()
            .failure()
            .stderr(predicate::str::contains("unsupported document shape: tree"));
    }
}
