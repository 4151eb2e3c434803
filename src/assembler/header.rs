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

use std::collections::HashMap;

use crate::ast::{DefDecl, Operand};
use crate::errors::AssemblyError;

use super::body::emit_stmts;
use super::constant_table::ConstantTable;
use super::emitter::Emitter;
use super::expr;
use super::macro_table::{expand_macro_call, MacroTable};
use super::symbol_table::SymbolTable;

/// Implements spec.md sec 4.5's ten-step procedure for one `def` block:
/// back-link, name-length+flags byte, name bytes, CFA mark, the
/// kind-specific code-field extensibility hook, the body walk, the end
/// mark, and the symbol-table entry — each repeated for `alias` when
/// present.
pub fn process_def(
    decl: &DefDecl,
    emitter: &mut dyn Emitter,
    macro_table: &MacroTable,
    call_counter: &mut usize,
    word_address_table: &mut HashMap<String, u32>,
    constant_table: &ConstantTable,
    symbol_table: &mut SymbolTable,
    previous_word_start: &mut u32,
) -> Result<(), AssemblyError> {
    let line = decl.line;

    check_not_redefined(&decl.name, word_address_table, line)?;
    if let Some(alias) = &decl.alias {
        check_not_redefined(alias, word_address_table, line)?;
    }

    // 1. Record header_start.
    let header_start = emitter.get_current_code_address();

    // 2. Emit the back-link to the previous header (0 for the first).
    emitter.emit_data_32(&[Operand::Number(*previous_word_start, line)], line)?;

    // 3. Update previous_word_start.
    *previous_word_start = header_start;

    // 4. flags_byte = OR(flag expressions) | len(NAME).
    let flags_byte = compute_flags_byte(decl, line)?;
    emitter.emit_data_8(&[Operand::Number(flags_byte as u32, line)], line)?;

    // 5. Emit NAME as raw bytes.
    emitter.emit_data_string(&[Operand::Str(decl.name.clone(), line)], line)?;

    // 6. Mark name_cfa (and alias_cfa), recording both in the word-address
    // table. The recorded offset is the CFA field's own address — the value
    // another word's body compiles in when it names this word (GLOSSARY).
    let cfa = emitter.get_current_code_address();
    mark_cfa(emitter, &decl.name, word_address_table, cfa);
    if let Some(alias) = &decl.alias {
        mark_cfa(emitter, alias, word_address_table, cfa);
    }

    // 7. Evaluate the code-field macro extension point, if one exists;
    // otherwise the code-field defaults to a self-relative pointer at the
    // byte immediately following it (direct execution, as for a plain code
    // word). Grounded in original_source/fbuilder/assembler.py's
    // `code_definition`, which always appends "the current address +4" as
    // the CFA field.
    let cfa_macro_name = format!("__DEF{}_CFA", decl.subkind.to_uppercase());
    if macro_table.contains_key(&cfa_macro_name) {
        let expanded = expand_macro_call(&cfa_macro_name, Vec::new(), macro_table, call_counter, line)?;
        emit_stmts(emitter, &expanded, macro_table, call_counter, word_address_table, constant_table)?;
    } else {
        emitter.emit_data_32(&[Operand::Number(cfa + 4, line)], line)?;
    }

    // 8. Walk the body.
    emit_stmts(emitter, &decl.body, macro_table, call_counter, word_address_table, constant_table)?;

    // 9. Mark name_end (and alias_end).
    mark_end(emitter, &decl.name);
    if let Some(alias) = &decl.alias {
        mark_end(emitter, alias);
    }

    // 10. Append the symbol-table entry (and alias-equivalent).
    let end = emitter.get_current_code_address();
    symbol_table.push(decl.name.clone(), header_start, end);
    if let Some(alias) = &decl.alias {
        symbol_table.push(alias.clone(), header_start, end);
    }

    Ok(())
}

/// A `def` name (or alias) already present in the word-address table means a
/// second header is trying to reuse a dictionary entry already claimed by an
/// earlier `def` — rejected per SPEC_FULL.md sec 3's redefinition policy.
fn check_not_redefined(name: &str, word_address_table: &HashMap<String, u32>, line: usize) -> Result<(), AssemblyError> {
    if word_address_table.contains_key(&name.to_lowercase()) {
        return Err(AssemblyError::DuplicateDefinition {
            line,
            reason: format!("word '{}' is already defined", name),
        });
    }
    Ok(())
}

fn mark_cfa(emitter: &mut dyn Emitter, name: &str, word_address_table: &mut HashMap<String, u32>, cfa: u32) {
    let lower = name.to_lowercase();
    emitter.mark_label(&format!("{}_cfa", lower));
    word_address_table.insert(lower, cfa);
}

fn mark_end(emitter: &mut dyn Emitter, name: &str) {
    emitter.mark_label(&format!("{}_end", name.to_lowercase()));
}

fn compute_flags_byte(decl: &DefDecl, line: usize) -> Result<u8, AssemblyError> {
    let mut bits: u32 = 0;
    for flag in &decl.flags {
        if !expr::is_constant(flag) {
            return Err(AssemblyError::Encoding {
                line,
                reason: "def flags must be compile-time constants".to_string(),
            });
        }
        bits |= expr::reduce_constant(flag);
    }
    let len = decl.name.len();
    if len > 0x3F {
        return Err(AssemblyError::Encoding {
            line,
            reason: format!("word name '{}' exceeds the maximum length of 63", decl.name),
        });
    }
    Ok((bits as u8) | (len as u8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::emitter::MachineCodeEmitter;
    use crate::ast::{DefType, Stmt, Instruction};

    fn sample_def(name: &str) -> DefDecl {
        DefDecl {
            def_type: DefType::Asm,
            flags: Vec::new(),
            subkind: "code".to_string(),
            alias: None,
            name: name.to_string(),
            body: vec![Stmt::Instr(Instruction::Nop, 1)],
            line: 1,
        }
    }

    #[test]
    fn second_header_back_link_points_at_first() {
        let mut emitter = MachineCodeEmitter::new();
        let macro_table = MacroTable::new();
        let constant_table = ConstantTable::new();
        let mut word_address_table = HashMap::new();
        let mut symbol_table = SymbolTable::new();
        let mut call_counter = 0usize;
        let mut previous_word_start = 0u32;

        process_def(
            &sample_def("A"),
            &mut emitter,
            &macro_table,
            &mut call_counter,
            &mut word_address_table,
            &constant_table,
            &mut symbol_table,
            &mut previous_word_start,
        )
        .unwrap();
        let a_start = 0u32;
        process_def(
            &sample_def("B"),
            &mut emitter,
            &macro_table,
            &mut call_counter,
            &mut word_address_table,
            &constant_table,
            &mut symbol_table,
            &mut previous_word_start,
        )
        .unwrap();
        emitter.finalize().unwrap();

        let b_start = symbol_table.entries()[1].start as usize;
        let back_link = u32::from_le_bytes(emitter.buffer()[b_start..b_start + 4].try_into().unwrap());
        assert_eq!(back_link, a_start);
    }

    #[test]
    fn flags_byte_ors_with_name_length() {
        let mut emitter = MachineCodeEmitter::new();
        let macro_table = MacroTable::new();
        let constant_table = ConstantTable::new();
        let mut word_address_table = HashMap::new();
        let mut symbol_table = SymbolTable::new();
        let mut call_counter = 0usize;
        let mut previous_word_start = 0u32;

        let mut decl = sample_def("WORD1");
        decl.flags = vec![crate::ast::Expression::single(crate::ast::ExprTerm::Number(0x80), 1)];

        process_def(
            &decl,
            &mut emitter,
            &macro_table,
            &mut call_counter,
            &mut word_address_table,
            &constant_table,
            &mut symbol_table,
            &mut previous_word_start,
        )
        .unwrap();
        emitter.finalize().unwrap();

        assert_eq!(emitter.buffer()[4], 0x85);
        assert_eq!(&emitter.buffer()[5..10], b"WORD1");
    }

    #[test]
    fn redefining_a_word_name_is_rejected() {
        let mut emitter = MachineCodeEmitter::new();
        let macro_table = MacroTable::new();
        let constant_table = ConstantTable::new();
        let mut word_address_table = HashMap::new();
        let mut symbol_table = SymbolTable::new();
        let mut call_counter = 0usize;
        let mut previous_word_start = 0u32;

        process_def(
            &sample_def("DUP"),
            &mut emitter,
            &macro_table,
            &mut call_counter,
            &mut word_address_table,
            &constant_table,
            &mut symbol_table,
            &mut previous_word_start,
        )
        .unwrap();

        let result = process_def(
            &sample_def("DUP"),
            &mut emitter,
            &macro_table,
            &mut call_counter,
            &mut word_address_table,
            &constant_table,
            &mut symbol_table,
            &mut previous_word_start,
        );
        assert!(matches!(result, Err(AssemblyError::DuplicateDefinition { .. })));
    }
}
