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

pub mod body;
pub mod constant_table;
pub mod emitter;
pub mod encoder;
pub mod expr;
pub mod header;
pub mod macro_table;
pub mod symbol_table;

use std::collections::HashMap;

use crate::ast::TopItem;
use crate::errors::AssemblyError;

use body::emit_stmts;
use constant_table::{build_constant_table, resolve_constants};
use emitter::Emitter;
use macro_table::build_macro_table;
use symbol_table::SymbolTable;

/// Runs the full two-pass assembly over a flattened (include-resolved)
/// source: constant folding, macro-table collection, a single emission walk
/// over every top-level item (maintaining the dictionary chain and the
/// macro call-number counter), then `finalize`. Returns the populated
/// symbol table; the assembled bytes/listing live in `emitter`.
pub fn assemble_items(items: Vec<TopItem>, emitter: &mut dyn Emitter) -> Result<SymbolTable, AssemblyError> {
    let constant_table = build_constant_table(&items)?;
    let items = resolve_constants(items, &constant_table)?;
    let macro_table = build_macro_table(&items)?;

    let mut word_address_table: HashMap<String, u32> = HashMap::new();
    let mut symbol_table = SymbolTable::new();
    let mut call_counter: usize = 0;
    let mut previous_word_start: u32 = 0;

    for item in &items {
        match item {
            TopItem::Const { .. } | TopItem::Include { .. } => {}
            TopItem::MacroDef(_) => {}
            TopItem::CodeBlock { body, .. } => {
                emit_stmts(emitter, body, &macro_table, &mut call_counter, &word_address_table, &constant_table)?;
            }
            TopItem::Def(decl) => {
                header::process_def(
                    decl,
                    emitter,
                    &macro_table,
                    &mut call_counter,
                    &mut word_address_table,
                    &constant_table,
                    &mut symbol_table,
                    &mut previous_word_start,
                )?;
            }
        }
    }

    emitter.finalize()?;
    Ok(symbol_table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use emitter::MachineCodeEmitter;

    #[test]
    fn macro_local_label_scenario_matches_spec() {
        let source = "macro M()\ndw :'L\n'L:\nend\ncodeblock\nM()\nM()\nend\n";
        let items = crate::parser::parse_source(source).unwrap();
        let mut emitter = MachineCodeEmitter::new();
        assemble_items(items, &mut emitter).unwrap();
        assert_eq!(emitter.buffer(), &[0x04, 0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn two_header_scenario_matches_spec() {
        let source = "codeblock\nnop\nend\ndef asm(code) A\nnop\nend\ndef asm(code) B\nnop\nend\n";
        let items = crate::parser::parse_source(source).unwrap();
        let mut emitter = MachineCodeEmitter::new();
        assemble_items(items, &mut emitter).unwrap();
        let buffer = emitter.buffer();
        assert_eq!(&buffer[1..5], &[0x00, 0x00, 0x00, 0x00]);
        assert_eq!(&buffer[12..16], &[0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn named_flag_scenario_matches_spec() {
        let source = "def asm[#0x80](code) WORD1 end";
        let items = crate::parser::parse_source(source).unwrap();
        let mut emitter = MachineCodeEmitter::new();
        assemble_items(items, &mut emitter).unwrap();
        let buffer = emitter.buffer();
        assert_eq!(buffer[4], 0x85);
        assert_eq!(&buffer[5..10], b"WORD1");
    }
}
