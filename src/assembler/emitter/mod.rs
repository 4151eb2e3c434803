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

pub mod disassembly;
pub mod machine_code;

use crate::ast::{AluOp, Operand, RegisterOperand, ShiftOp, StackKind, StackOp, Width};
use crate::errors::AssemblyError;

pub use disassembly::DisassemblyEmitter;
pub use machine_code::MachineCodeEmitter;

/// The operations both emitters expose (spec.md sec 4.6). `MachineCodeEmitter`
/// writes bytes directly; `DisassemblyEmitter` wraps one to keep offsets
/// identical while building a parallel text listing.
pub trait Emitter {
    fn get_current_code_address(&self) -> u32;

    fn mark_label(&mut self, name: &str);

    /// Emits a 32-bit fixup slot that resolves to `name`'s offset at
    /// finalisation — used for word-body CFA references and any other bare
    /// `:label` use outside a jump/call instruction.
    fn emit_label_target(&mut self, name: &str);

    fn emit_nop(&mut self);
    fn emit_illegal(&mut self);

    fn emit_mov(&mut self, width: Width, dst: &Operand, src: &Operand, line: usize) -> Result<(), AssemblyError>;

    fn emit_alu(
        &mut self,
        op: AluOp,
        width: Width,
        dst: &RegisterOperand,
        s1: &RegisterOperand,
        s2: &RegisterOperand,
        line: usize,
    ) -> Result<(), AssemblyError>;

    fn emit_sra(&mut self, width: Width, reg: &RegisterOperand, imm: &Operand, line: usize) -> Result<(), AssemblyError> {
        self.emit_shift(ShiftOp::Sra, width, reg, imm, line)
    }

    fn emit_sll(&mut self, width: Width, reg: &RegisterOperand, imm: &Operand, line: usize) -> Result<(), AssemblyError> {
        self.emit_shift(ShiftOp::Sll, width, reg, imm, line)
    }

    fn emit_shift(&mut self, op: ShiftOp, width: Width, reg: &RegisterOperand, imm: &Operand, line: usize) -> Result<(), AssemblyError>;

    fn emit_stack(
        &mut self,
        kind: StackKind,
        op: StackOp,
        width: Width,
        reg: &RegisterOperand,
        line: usize,
    ) -> Result<(), AssemblyError>;

    fn emit_jump_indirect(&mut self, reg: &RegisterOperand);

    fn emit_jump(&mut self, target: &Operand, line: usize) -> Result<(), AssemblyError>;

    fn emit_conditional_jump(&mut self, opcode: u8, target: &Operand, line: usize) -> Result<(), AssemblyError>;

    fn emit_call(&mut self, target: &Operand, line: usize) -> Result<(), AssemblyError>;

    fn emit_ifkt(&mut self, imm: &Operand, line: usize) -> Result<(), AssemblyError>;

    fn emit_data_8(&mut self, operands: &[Operand], line: usize) -> Result<(), AssemblyError>;
    fn emit_data_32(&mut self, operands: &[Operand], line: usize) -> Result<(), AssemblyError>;
    fn emit_data_string(&mut self, operands: &[Operand], line: usize) -> Result<(), AssemblyError>;

    fn finalize(&mut self) -> Result<(), AssemblyError>;
}

pub(crate) fn alu_mnemonic(op: AluOp) -> &'static str {
    match op {
        AluOp::Add => "add",
        AluOp::Sub => "sub",
        AluOp::Or => "or",
        AluOp::And => "and",
        AluOp::Xor => "xor",
    }
}

pub(crate) fn stack_mnemonic(kind: StackKind, op: StackOp) -> &'static str {
    match (kind, op) {
        (StackKind::Data, StackOp::Push) => "pushd",
        (StackKind::Data, StackOp::Pop) => "popd",
        (StackKind::Return, StackOp::Push) => "pushr",
        (StackKind::Return, StackOp::Pop) => "popr",
    }
}
