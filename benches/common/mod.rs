#![allow(dead_code)]
use std::fs;

use lumos::ast::Program;
use lumos::{lexer, parser};

pub const WORKLOADS: [(&str, &str); 2] = [
    ("long", "tests/programs/long_mixed/program.lum"),
    ("targets", "tests/programs/targets_roundtrip/program.lum"),
];

pub fn workloads() -> Vec<(&'static str, String)> {
    WORKLOADS
        .iter()
        .map(|(label, path)| (*label, (*path).to_string()))
        .collect()
}

pub fn load_source(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|err| panic!("read {path}: {err}"))
}

pub fn load_program(path: &str) -> Program {
    let source = load_source(path);
    let tokens = lexer::tokenize(&source).unwrap_or_else(|err| panic!("tokenize {path}: {err}"));
    parser::parse_tokens(tokens).unwrap_or_else(|err| panic!("parse {path}: {err}"))
}
