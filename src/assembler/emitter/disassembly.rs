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

use crate::ast::{AluOp, ExprOp, ExprTerm, Expression, Operand, RegModifier, RegisterOperand, ShiftOp, StackKind, StackOp, Width};
use crate::errors::AssemblyError;

use super::{alu_mnemonic, stack_mnemonic, Emitter, MachineCodeEmitter};

struct PendingFixup {
    line_index: usize,
    sentinel: String,
    absolute_offset: usize,
}

/// Wraps a [`MachineCodeEmitter`] so both emitters share identical offsets,
/// while building a parallel human-readable listing alongside it (spec.md
/// sec 4.6). Unresolved references are written as `@@@@name@@@@` sentinels
/// and text-replaced with the resolved hex once `finalize` runs.
#[derive(Default)]
pub struct DisassemblyEmitter {
    inner: MachineCodeEmitter,
    lines: Vec<String>,
    fixups: Vec<PendingFixup>,
}

impl DisassemblyEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &[u8] {
        self.inner.buffer()
    }

    pub fn listing(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Renders one line: `{offset:08x}: {hex:<18} {text}`. `slots` describes,
    /// in emission order, each 4-byte word of the just-emitted bytes that is
    /// a pending fixup (by sentinel label); everything else is shown as hex.
    fn push_line(&mut self, start: u32, text: String, slots: &[(usize, String)]) {
        let end = self.inner.get_current_code_address();
        let bytes = &self.inner.buffer()[start as usize..end as usize];
        let mut hex = String::new();
        let mut i = 0usize;
        while i < bytes.len() {
            if let Some((_, sentinel)) = slots.iter().find(|(off, _)| *off == i) {
                let marker = format!("@@@@{}@@@@", sentinel);
                hex.push_str(&marker);
                hex.push(' ');
                self.fixups.push(PendingFixup {
                    line_index: self.lines.len(),
                    sentinel: marker,
                    absolute_offset: start as usize + i,
                });
                i += 4;
            } else {
                hex.push_str(&format!("{:02x} ", bytes[i]));
                i += 1;
            }
        }
        self.lines.push(format!("{:08x}: {:<18} {}", start, hex.trim_end(), text));
    }

    fn fixup_slot(operand: &Operand, rel_offset: usize) -> Option<(usize, String)> {
        match operand {
            Operand::Jump(name, _) => Some((rel_offset, name.clone())),
            Operand::Expression(expr) if !crate::assembler::expr::is_constant(expr) => {
                Some((rel_offset, "expr".to_string()))
            }
            _ => None,
        }
    }
}

fn fmt_register(reg: &RegisterOperand) -> String {
    let name = reg.reg.name();
    if !reg.indirect {
        return format!("%{}", name);
    }
    match reg.modifier {
        RegModifier::None => format!("[%{}]", name),
        RegModifier::PreInc => format!("[++%{}]", name),
        RegModifier::PreDec => format!("[--%{}]", name),
        RegModifier::PostInc => format!("[%{}++]", name),
        RegModifier::PostDec => format!("[%{}--]", name),
    }
}

fn fmt_term(term: &ExprTerm) -> String {
    match term {
        ExprTerm::Number(n) => format!("{:#x}", n),
        ExprTerm::Jump(name) => format!(":{}", name),
        ExprTerm::ConstRef(name) => name.clone(),
        ExprTerm::MacroArg(name) => format!("@{}", name),
        ExprTerm::CurrentAddress => "$".to_string(),
    }
}

fn fmt_expression(expr: &Expression) -> String {
    let mut out = fmt_term(&expr.first);
    for (op, term) in &expr.rest {
        out.push(match op {
            ExprOp::Add => '+',
            ExprOp::Sub => '-',
        });
        out.push_str(&fmt_term(term));
    }
    out
}

fn fmt_operand(operand: &Operand) -> String {
    match operand {
        Operand::Register(r) => fmt_register(r),
        Operand::Number(n, _) => format!("{:#x}", n),
        Operand::Jump(name, _) => format!(":{}", name),
        Operand::Expression(e) => fmt_expression(e),
        Operand::Str(s, _) => format!("{:?}", s),
    }
}

fn width_suffix(width: Width) -> &'static str {
    match width {
        Width::Word => ".w",
        Width::Byte => ".b",
    }
}

impl Emitter for DisassemblyEmitter {
    fn get_current_code_address(&self) -> u32 {
        self.inner.get_current_code_address()
    }

    fn mark_label(&mut self, name: &str) {
        self.inner.mark_label(name);
        self.lines.push(format!("{}:", name));
    }

    fn emit_label_target(&mut self, name: &str) {
        let start = self.inner.get_current_code_address();
        self.inner.emit_label_target(name);
        self.push_line(start, format!(":{}", name), &[(0, name.to_string())]);
    }

    fn emit_nop(&mut self) {
        let start = self.inner.get_current_code_address();
        self.inner.emit_nop();
        self.push_line(start, "nop".to_string(), &[]);
    }

    fn emit_illegal(&mut self) {
        let start = self.inner.get_current_code_address();
        self.inner.emit_illegal();
        self.push_line(start, "illegal".to_string(), &[]);
    }

    fn emit_mov(&mut self, width: Width, dst: &Operand, src: &Operand, line: usize) -> Result<(), AssemblyError> {
        let start = self.inner.get_current_code_address();
        self.inner.emit_mov(width, dst, src, line)?;
        let slots: Vec<_> = Self::fixup_slot(src, 1).into_iter().collect();
        self.push_line(start, format!("mov{} {},{}", width_suffix(width), fmt_operand(dst), fmt_operand(src)), &slots);
        Ok(())
    }

    fn emit_alu(
        &mut self,
        op: AluOp,
        width: Width,
        dst: &RegisterOperand,
        s1: &RegisterOperand,
        s2: &RegisterOperand,
        line: usize,
    ) -> Result<(), AssemblyError> {
        let start = self.inner.get_current_code_address();
        self.inner.emit_alu(op, width, dst, s1, s2, line)?;
        let text = format!(
            "{}{} {},{},{}",
            alu_mnemonic(op),
            width_suffix(width),
            fmt_register(dst),
            fmt_register(s1),
            fmt_register(s2)
        );
        self.push_line(start, text, &[]);
        Ok(())
    }

    fn emit_shift(&mut self, op: ShiftOp, width: Width, reg: &RegisterOperand, imm: &Operand, line: usize) -> Result<(), AssemblyError> {
        let start = self.inner.get_current_code_address();
        self.inner.emit_shift(op, width, reg, imm, line)?;
        let mnemonic = match op {
            ShiftOp::Sra => "sra",
            ShiftOp::Sll => "sll",
        };
        let text = format!("{}{} {},{}", mnemonic, width_suffix(width), fmt_register(reg), fmt_operand(imm));
        self.push_line(start, text, &[]);
        Ok(())
    }

    fn emit_stack(&mut self, kind: StackKind, op: StackOp, width: Width, reg: &RegisterOperand, line: usize) -> Result<(), AssemblyError> {
        let start = self.inner.get_current_code_address();
        self.inner.emit_stack(kind, op, width, reg, line)?;
        let text = format!("{} {}", stack_mnemonic(kind, op), fmt_register(reg));
        self.push_line(start, text, &[]);
        Ok(())
    }

    fn emit_jump_indirect(&mut self, reg: &RegisterOperand) {
        let start = self.inner.get_current_code_address();
        self.inner.emit_jump_indirect(reg);
        self.push_line(start, format!("jmp {}", fmt_register(reg)), &[]);
    }

    fn emit_jump(&mut self, target: &Operand, line: usize) -> Result<(), AssemblyError> {
        let start = self.inner.get_current_code_address();
        self.inner.emit_jump(target, line)?;
        let slots: Vec<_> = Self::fixup_slot(target, 1).into_iter().collect();
        self.push_line(start, format!("jmp {}", fmt_operand(target)), &slots);
        Ok(())
    }

    fn emit_conditional_jump(&mut self, opcode: u8, target: &Operand, line: usize) -> Result<(), AssemblyError> {
        let start = self.inner.get_current_code_address();
        self.inner.emit_conditional_jump(opcode, target, line)?;
        let mnemonic = match opcode {
            crate::assembler::encoder::control_flow::OPCODE_JZ => "jz",
            crate::assembler::encoder::control_flow::OPCODE_JC => "jc",
            _ => "j?",
        };
        let slots: Vec<_> = Self::fixup_slot(target, 1).into_iter().collect();
        self.push_line(start, format!("{} {}", mnemonic, fmt_operand(target)), &slots);
        Ok(())
    }

    fn emit_call(&mut self, target: &Operand, line: usize) -> Result<(), AssemblyError> {
        let start = self.inner.get_current_code_address();
        self.inner.emit_call(target, line)?;
        let slots: Vec<_> = Self::fixup_slot(target, 1).into_iter().collect();
        self.push_line(start, format!("call {}", fmt_operand(target)), &slots);
        Ok(())
    }

    fn emit_ifkt(&mut self, imm: &Operand, line: usize) -> Result<(), AssemblyError> {
        let start = self.inner.get_current_code_address();
        self.inner.emit_ifkt(imm, line)?;
        self.push_line(start, format!("ifkt {}", fmt_operand(imm)), &[]);
        Ok(())
    }

    fn emit_data_8(&mut self, operands: &[Operand], line: usize) -> Result<(), AssemblyError> {
        let start = self.inner.get_current_code_address();
        self.inner.emit_data_8(operands, line)?;
        let text = format!("db {}", operands.iter().map(fmt_operand).collect::<Vec<_>>().join(","));
        self.push_line(start, text, &[]);
        Ok(())
    }

    fn emit_data_32(&mut self, operands: &[Operand], line: usize) -> Result<(), AssemblyError> {
        let start = self.inner.get_current_code_address();
        self.inner.emit_data_32(operands, line)?;
        let mut slots = Vec::new();
        let mut offset = 0usize;
        for operand in operands {
            if let Some(slot) = Self::fixup_slot(operand, offset) {
                slots.push(slot);
            }
            offset += 4;
        }
        let text = format!("dw {}", operands.iter().map(fmt_operand).collect::<Vec<_>>().join(","));
        self.push_line(start, text, &slots);
        Ok(())
    }

    fn emit_data_string(&mut self, operands: &[Operand], line: usize) -> Result<(), AssemblyError> {
        let start = self.inner.get_current_code_address();
        self.inner.emit_data_string(operands, line)?;
        let text = format!("ds {}", operands.iter().map(fmt_operand).collect::<Vec<_>>().join(","));
        self.push_line(start, text, &[]);
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), AssemblyError> {
        self.inner.finalize()?;
        let buffer = self.inner.buffer().to_vec();
        for fixup in &self.fixups {
            let value = u32::from_le_bytes(buffer[fixup.absolute_offset..fixup.absolute_offset + 4].try_into().unwrap());
            let hex = format!("{:08x}", value);
            self.lines[fixup.line_index] = self.lines[fixup.line_index].replacen(&fixup.sentinel, &hex, 1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::RegName;

    #[test]
    fn disassembly_buffer_matches_machine_code_buffer() {
        let mut disasm = DisassemblyEmitter::new();
        disasm.emit_nop();
        disasm.emit_jump(&Operand::Jump("t".to_string(), 1), 1).unwrap();
        disasm.mark_label("t");
        disasm.emit_nop();
        disasm.finalize().unwrap();

        let mut machine = MachineCodeEmitter::new();
        machine.emit_nop();
        machine.emit_jump(&Operand::Jump("t".to_string(), 1), 1).unwrap();
        machine.mark_label("t");
        machine.emit_nop();
        machine.finalize().unwrap();

        assert_eq!(disasm.buffer(), machine.buffer());
    }

    #[test]
    fn listing_replaces_sentinel_after_finalize() {
        let mut disasm = DisassemblyEmitter::new();
        disasm.emit_jump(&Operand::Jump("t".to_string(), 1), 1).unwrap();
        disasm.mark_label("t");
        disasm.finalize().unwrap();
        let listing = disasm.listing();
        assert!(!listing.contains("@@@@"));
        assert!(listing.contains("jmp :t"));
    }

    #[test]
    fn register_operand_formats_with_modifier() {
        let reg = RegisterOperand {
            reg: RegName::Dsp,
            indirect: true,
            modifier: RegModifier::PostInc,
            line: 1,
        };
        assert_eq!(fmt_register(&reg), "[%dsp++]");
    }
}
