#![allow(dead_code)]
use std::fs;
use std::path::Path;

use minipy::ast::Program;
use minipy::{lexer, parser};
use serde::Deserialize;

/// The slice of `expect.yaml` the benches care about; everything else in the
/// descriptor is ignored here and checked by the integration harness.
#[derive(Deserialize)]
struct BenchTags {
    #[serde(default)]
    bench: Vec<String>,
}

pub struct Workload {
    pub name: String,
    pub source: String,
}

/// Fixture programs whose `expect.yaml` carries bench tags.
pub fn workloads() -> Vec<Workload> {
    let root = Path::new("tests/programs");
    let mut workloads = Vec::new();
    for entry in fs::read_dir(root).expect("list fixture programs") {
        let dir = entry.expect("fixture dir entry").path();
        let Ok(raw) = fs::read_to_string(dir.join("expect.yaml")) else {
            continue;
        };
        let tags: BenchTags = serde_yaml::from_str(&raw)
            .unwrap_or_else(|err| panic!("bad expect.yaml in {}: {err}", dir.display()));
        if tags.bench.is_empty() {
            continue;
        }
        let name = dir
            .file_name()
            .and_then(|value| value.to_str())
            .unwrap_or_else(|| panic!("bad fixture directory name {}", dir.display()))
            .to_string();
        let source = fs::read_to_string(dir.join("program.py"))
            .unwrap_or_else(|err| panic!("read program for {name}: {err}"));
        workloads.push(Workload { name, source });
    }
    workloads.sort_by(|left, right| left.name.cmp(&right.name));
    assert!(!workloads.is_empty(), "no bench-tagged fixture programs");
    workloads
}

pub fn load_program(source: &str) -> Program {
    let tokens = lexer::tokenize(source).expect("tokenize");
    parser::parse_tokens(tokens).expect("parse")
}
