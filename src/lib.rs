/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

pub mod assembler;
pub mod ast;
pub mod errors;
pub mod file_reader;
pub mod parser;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use assembler::emitter::{DisassemblyEmitter, Emitter, MachineCodeEmitter};
use assembler::symbol_table::SymbolTable;
use ast::TopItem;
use file_reader::FileReader;

extern crate pest;
extern crate pest_derive;

/// Parses `source_path` through `reader`, recursively flattening any
/// `include` directives it meets, and returns the resulting top-level item
/// list in source order.
fn parse_items(source_path: &Path, reader: &dyn FileReader) -> Result<Vec<TopItem>> {
    let mut include_stack: HashSet<PathBuf> = HashSet::new();
    parser::parse_source_recursive(source_path, reader, &mut include_stack)
        .context("Failed during parsing stage")
}

/// Assembles `source_path` into a raw binary image and its symbol table
/// (spec.md sec 2/6). This is the `bin`/`carray` code path: both CLI
/// formats share the same assembled bytes, differing only in how the CLI
/// serialises them to disk.
pub fn assemble_source(source_path: &Path, reader: &dyn FileReader) -> Result<(Vec<u8>, SymbolTable)> {
    let items = parse_items(source_path, reader)?;
    let mut emitter = MachineCodeEmitter::new();
    let symbol_table = assembler::assemble_items(items, &mut emitter).context("Failed during assembly")?;
    Ok((emitter.buffer().to_vec(), symbol_table))
}

/// Assembles `source_path` through the disassembly back-end, returning the
/// text listing and the symbol table. The underlying binary is
/// byte-for-byte identical to `assemble_source`'s (spec.md sec 8).
pub fn assemble_source_disassembly(source_path: &Path, reader: &dyn FileReader) -> Result<(String, SymbolTable)> {
    let items = parse_items(source_path, reader)?;
    let mut emitter = DisassemblyEmitter::new();
    let symbol_table = assembler::assemble_items(items, &mut emitter).context("Failed during assembly")?;
    Ok((emitter.listing(), symbol_table))
}

/// Renders an assembled image as a comma-separated line of hex literals
/// (the `carray` output format, spec.md sec 6).
pub fn to_carray(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:#x}", b)).collect::<Vec<_>>().join(", ")
}
