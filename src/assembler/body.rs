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

use crate::ast::{DataDirective, Instruction, Operand, Stmt, WordBodyToken};
use crate::errors::AssemblyError;

use super::constant_table::ConstantTable;
use super::emitter::Emitter;
use super::encoder::control_flow::{OPCODE_JC, OPCODE_JZ};
use super::macro_table::{expand_macro_call, MacroTable};

/// Resolves one word-body bare identifier per spec.md sec 4.5: an
/// already-defined word's CFA takes priority, then a named constant;
/// anything else is undefined. Unlike label references, this lookup is
/// immediate rather than deferred — a word body can only reference a word
/// defined earlier in the dictionary, mirroring ordinary Forth compilation
/// order.
fn resolve_bare_ident(
    name: &str,
    word_address_table: &HashMap<String, u32>,
    constant_table: &ConstantTable,
    line: usize,
) -> Result<u32, AssemblyError> {
    let key = name.to_lowercase();
    if let Some(&cfa) = word_address_table.get(&key) {
        return Ok(cfa);
    }
    if let Some(&value) = constant_table.get(name) {
        return Ok(value);
    }
    Err(AssemblyError::Undefined {
        line,
        reason: format!("undefined reference to word or constant '{}'", name),
    })
}

fn emit_instruction(emitter: &mut dyn Emitter, instr: &Instruction) -> Result<(), AssemblyError> {
    match instr {
        Instruction::Nop => {
            emitter.emit_nop();
            Ok(())
        }
        Instruction::Illegal => {
            emitter.emit_illegal();
            Ok(())
        }
        Instruction::Mov { width, dst, src, line } => emitter.emit_mov(*width, dst, src, *line),
        Instruction::Alu { op, width, dst, s1, s2, line } => emitter.emit_alu(*op, *width, dst, s1, s2, *line),
        Instruction::Shift { op, width, reg, imm, line } => emitter.emit_shift(*op, *width, reg, imm, *line),
        Instruction::Stack { kind, op, width, reg, line } => emitter.emit_stack(*kind, *op, *width, reg, *line),
        Instruction::JmpIndirect { reg, .. } => {
            emitter.emit_jump_indirect(reg);
            Ok(())
        }
        Instruction::JmpLabel { target, line } => emitter.emit_jump(target, *line),
        Instruction::Jz { target, line } => emitter.emit_conditional_jump(OPCODE_JZ, target, *line),
        Instruction::Jc { target, line } => emitter.emit_conditional_jump(OPCODE_JC, target, *line),
        Instruction::Call { target, line } => emitter.emit_call(target, *line),
        Instruction::Ifkt { imm, line } => emitter.emit_ifkt(imm, *line),
    }
}

fn emit_data(emitter: &mut dyn Emitter, data: &DataDirective, line: usize) -> Result<(), AssemblyError> {
    match data {
        DataDirective::Db(ops) => emitter.emit_data_8(ops, line),
        DataDirective::Dw(ops) => emitter.emit_data_32(ops, line),
        DataDirective::Ds(ops) => emitter.emit_data_string(ops, line),
    }
}

fn emit_word_body_token(
    emitter: &mut dyn Emitter,
    token: &WordBodyToken,
    line: usize,
    word_address_table: &HashMap<String, u32>,
    constant_table: &ConstantTable,
) -> Result<(), AssemblyError> {
    match token {
        WordBodyToken::JumpTarget(name) => {
            emitter.emit_label_target(name);
            Ok(())
        }
        WordBodyToken::Number(n) => emitter.emit_data_32(&[Operand::Number(*n, line)], line),
        WordBodyToken::BareIdent(name) => {
            let value = resolve_bare_ident(name, word_address_table, constant_table, line)?;
            emitter.emit_data_32(&[Operand::Number(value, line)], line)
        }
    }
}

/// Walks one flattened statement list, expanding any macro call it meets in
/// place (with its own nested expansions) before emitting. Shared by
/// codeblocks and both `def` body kinds, since macro expansion and label
/// marks are common to all of them.
pub fn emit_stmts(
    emitter: &mut dyn Emitter,
    stmts: &[Stmt],
    macro_table: &MacroTable,
    call_counter: &mut usize,
    word_address_table: &HashMap<String, u32>,
    constant_table: &ConstantTable,
) -> Result<(), AssemblyError> {
    for stmt in stmts {
        match stmt {
            Stmt::Label(name, _) => emitter.mark_label(name),
            Stmt::Instr(instr, _) => emit_instruction(emitter, instr)?,
            Stmt::Data(data, line) => emit_data(emitter, data, *line)?,
            Stmt::WordBody(token, line) => emit_word_body_token(emitter, token, *line, word_address_table, constant_table)?,
            Stmt::MacroCall(name, args, line) => {
                let expanded = expand_macro_call(name, args.clone(), macro_table, call_counter, *line)?;
                emit_stmts(emitter, &expanded, macro_table, call_counter, word_address_table, constant_table)?;
            }
        }
    }
    Ok(())
}
