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

use crate::assembler::encoder::control_flow::{
    encode_jmp_register_opcode, OPCODE_CALL, OPCODE_JMP_LABEL,
};
use crate::assembler::encoder::data::{
    fits_in_byte, OPCODE_ADD, OPCODE_AND, OPCODE_IFKT, OPCODE_ILLEGAL, OPCODE_MOV_IMM_ACC1,
    OPCODE_MOV_IMM_ACC2, OPCODE_MOV_IND_LOAD_WORD, OPCODE_MOV_IND_STORE_WORD, OPCODE_MOV_REG_BYTE,
    OPCODE_MOV_REG_WORD, OPCODE_NOP, OPCODE_OR, OPCODE_SLL, OPCODE_SRA, OPCODE_SUB, OPCODE_XOR,
};
use crate::assembler::encoder::registers::{encode_modifier_byte, encode_rd_rs_byte, encode_reg_reg_byte, encode_shift_byte};
use crate::assembler::encoder::stack::encode_stack_opcode;
use crate::assembler::expr::{self, reduce_constant};
use crate::ast::{AluOp, Expression, Operand, RegModifier, RegName, RegisterOperand, ShiftOp, StackKind, StackOp, Width};
use crate::errors::AssemblyError;

use super::{alu_mnemonic, stack_mnemonic, Emitter};

/// Appends encoded bytes to a single growable buffer and defers anything
/// depending on a not-yet-known label or expression to a final resolution
/// pass, per spec.md sec 4.6.
#[derive(Debug, Default)]
pub struct MachineCodeEmitter {
    buffer: Vec<u8>,
    labels: HashMap<String, u32>,
    jumps: HashMap<usize, (String, usize)>,
    expressions: HashMap<usize, Expression>,
}

impl MachineCodeEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn labels(&self) -> &HashMap<String, u32> {
        &self.labels
    }

    fn push_byte(&mut self, byte: u8) {
        self.buffer.push(byte);
    }

    fn push_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    fn reserve_u32_slot(&mut self) -> usize {
        let offset = self.buffer.len();
        self.buffer.extend_from_slice(&[0, 0, 0, 0]);
        offset
    }

    /// Writes a 32-bit operand slot: a constant value is written immediately,
    /// a label or non-constant expression reserves a zero slot and records a
    /// fixup for `finalize`. `$` is materialised against the slot's own
    /// offset, matching the point where the directive is actually evaluated.
    fn write_u32_operand(&mut self, operand: &Operand, line: usize) -> Result<(), AssemblyError> {
        match operand {
            Operand::Number(n, _) => {
                self.push_u32(*n);
                Ok(())
            }
            Operand::Jump(name, _) => {
                let offset = self.reserve_u32_slot();
                self.jumps.insert(offset, (name.clone(), line));
                Ok(())
            }
            Operand::Expression(expr) => {
                let offset = self.reserve_u32_slot();
                let materialized = expr::materialize_current_address(expr, offset as u32);
                if expr::is_constant(&materialized) {
                    let value = reduce_constant(&materialized);
                    self.buffer[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
                } else {
                    self.expressions.insert(offset, materialized);
                }
                Ok(())
            }
            other => Err(AssemblyError::Encoding {
                line,
                reason: format!("expected a numeric or label operand, found {:?}", other),
            }),
        }
    }

    /// Reduces an operand that must already be a compile-time constant (no
    /// fixup support available for this slot, e.g. `db`, shift immediates,
    /// `ifkt`).
    fn reduce_constant_operand(&self, operand: &Operand, line: usize, context: &str) -> Result<u32, AssemblyError> {
        match operand {
            Operand::Number(n, _) => Ok(*n),
            Operand::Expression(expr) if expr::is_constant(expr) => Ok(reduce_constant(expr)),
            other => Err(AssemblyError::Encoding {
                line,
                reason: format!("{} requires a compile-time constant operand, found {:?}", context, other),
            }),
        }
    }
}

impl Emitter for MachineCodeEmitter {
    fn get_current_code_address(&self) -> u32 {
        self.buffer.len() as u32
    }

    fn mark_label(&mut self, name: &str) {
        self.labels.insert(name.to_string(), self.get_current_code_address());
    }

    fn emit_label_target(&mut self, name: &str) {
        let offset = self.reserve_u32_slot();
        self.jumps.insert(offset, (name.to_string(), 0));
    }

    fn emit_nop(&mut self) {
        self.push_byte(OPCODE_NOP);
    }

    fn emit_illegal(&mut self) {
        self.push_byte(OPCODE_ILLEGAL);
    }

    fn emit_mov(&mut self, width: Width, dst: &Operand, src: &Operand, line: usize) -> Result<(), AssemblyError> {
        match (dst, src) {
            (Operand::Register(d), Operand::Register(s)) => {
                if d.indirect && s.indirect {
                    return Err(AssemblyError::Encoding {
                        line,
                        reason: "mov cannot have both operands indirect".to_string(),
                    });
                }
                let has_modifier = d.modifier != RegModifier::None || s.modifier != RegModifier::None;
                if has_modifier {
                    if width == Width::Byte {
                        return Err(AssemblyError::Encoding {
                            line,
                            reason: "mov.b indirect-with-modifier forms are not supported".to_string(),
                        });
                    }
                    if d.indirect {
                        self.push_byte(OPCODE_MOV_IND_STORE_WORD);
                        self.push_byte(encode_modifier_byte(d, s));
                    } else if s.indirect {
                        self.push_byte(OPCODE_MOV_IND_LOAD_WORD);
                        self.push_byte(encode_modifier_byte(s, d));
                    } else {
                        return Err(AssemblyError::Encoding {
                            line,
                            reason: "mov modifier requires an indirect operand".to_string(),
                        });
                    }
                } else {
                    let opcode = if width == Width::Word { OPCODE_MOV_REG_WORD } else { OPCODE_MOV_REG_BYTE };
                    self.push_byte(opcode);
                    self.push_byte(encode_reg_reg_byte(d, s));
                }
                Ok(())
            }
            (Operand::Register(d), imm @ (Operand::Number(..) | Operand::Jump(..) | Operand::Expression(_))) => {
                if d.indirect || d.modifier != RegModifier::None {
                    return Err(AssemblyError::Encoding {
                        line,
                        reason: "mov immediate/label source requires a direct destination register".to_string(),
                    });
                }
                let opcode = match d.reg {
                    RegName::Acc1 => OPCODE_MOV_IMM_ACC1,
                    RegName::Acc2 => OPCODE_MOV_IMM_ACC2,
                    _ => {
                        return Err(AssemblyError::Encoding {
                            line,
                            reason: "mov from a label/immediate is only legal into acc1 or acc2".to_string(),
                        })
                    }
                };
                self.push_byte(opcode);
                self.write_u32_operand(imm, line)
            }
            _ => Err(AssemblyError::Encoding {
                line,
                reason: "unsupported mov operand combination".to_string(),
            }),
        }
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
        if width == Width::Byte {
            return Err(AssemblyError::Encoding {
                line,
                reason: format!("{} only supports word-sized mode", alu_mnemonic(op)),
            });
        }
        let opcode = match op {
            AluOp::Add => OPCODE_ADD,
            AluOp::Sub => OPCODE_SUB,
            AluOp::Or => OPCODE_OR,
            AluOp::And => OPCODE_AND,
            AluOp::Xor => OPCODE_XOR,
        };
        self.push_byte(opcode);
        self.push_byte(encode_rd_rs_byte(dst, s1));
        self.push_byte(s2.reg.code());
        Ok(())
    }

    fn emit_shift(&mut self, op: ShiftOp, width: Width, reg: &RegisterOperand, imm: &Operand, line: usize) -> Result<(), AssemblyError> {
        let mnemonic = match op {
            ShiftOp::Sra => "sra",
            ShiftOp::Sll => "sll",
        };
        if width == Width::Byte {
            return Err(AssemblyError::Encoding {
                line,
                reason: format!("{} only supports word-sized mode", mnemonic),
            });
        }
        let value = self.reduce_constant_operand(imm, line, mnemonic)?;
        let opcode = match op {
            ShiftOp::Sra => OPCODE_SRA,
            ShiftOp::Sll => OPCODE_SLL,
        };
        self.push_byte(opcode);
        self.push_byte(encode_shift_byte(reg, value));
        Ok(())
    }

    fn emit_stack(&mut self, kind: StackKind, op: StackOp, width: Width, reg: &RegisterOperand, line: usize) -> Result<(), AssemblyError> {
        if width == Width::Byte {
            return Err(AssemblyError::Encoding {
                line,
                reason: format!("{} only supports word-sized mode", stack_mnemonic(kind, op)),
            });
        }
        self.push_byte(encode_stack_opcode(kind, op, reg));
        Ok(())
    }

    fn emit_jump_indirect(&mut self, reg: &RegisterOperand) {
        self.push_byte(encode_jmp_register_opcode(reg.reg.code(), reg.indirect));
    }

    fn emit_jump(&mut self, target: &Operand, line: usize) -> Result<(), AssemblyError> {
        self.push_byte(OPCODE_JMP_LABEL);
        self.write_u32_operand(target, line)
    }

    fn emit_conditional_jump(&mut self, opcode: u8, target: &Operand, line: usize) -> Result<(), AssemblyError> {
        self.push_byte(opcode);
        self.write_u32_operand(target, line)
    }

    fn emit_call(&mut self, target: &Operand, line: usize) -> Result<(), AssemblyError> {
        self.push_byte(OPCODE_CALL);
        self.write_u32_operand(target, line)
    }

    fn emit_ifkt(&mut self, imm: &Operand, line: usize) -> Result<(), AssemblyError> {
        let value = self.reduce_constant_operand(imm, line, "ifkt")?;
        self.push_byte(OPCODE_IFKT);
        self.buffer.extend_from_slice(&(value as u16).to_le_bytes());
        Ok(())
    }

    fn emit_data_8(&mut self, operands: &[Operand], line: usize) -> Result<(), AssemblyError> {
        for operand in operands {
            let value = self.reduce_constant_operand(operand, line, "db")?;
            if !fits_in_byte(value) {
                return Err(AssemblyError::Encoding {
                    line,
                    reason: format!("db operand {:#x} exceeds 0xFF", value),
                });
            }
            self.push_byte(value as u8);
        }
        Ok(())
    }

    fn emit_data_32(&mut self, operands: &[Operand], line: usize) -> Result<(), AssemblyError> {
        for operand in operands {
            self.write_u32_operand(operand, line)?;
        }
        Ok(())
    }

    fn emit_data_string(&mut self, operands: &[Operand], line: usize) -> Result<(), AssemblyError> {
        for operand in operands {
            match operand {
                Operand::Str(s, _) => self.buffer.extend_from_slice(s.as_bytes()),
                other => {
                    return Err(AssemblyError::Encoding {
                        line,
                        reason: format!("ds requires a string operand, found {:?}", other),
                    })
                }
            }
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), AssemblyError> {
        for (offset, (name, line)) in self.jumps.clone() {
            let value = self.labels.get(&name).copied().ok_or_else(|| AssemblyError::Undefined {
                line,
                reason: format!("unresolved label '{}'", name),
            })?;
            self.buffer[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }
        for (offset, expr) in self.expressions.clone() {
            let value = expr::reduce_with_labels(&expr, &self.labels)?;
            self.buffer[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::RegisterOperand;

    #[test]
    fn ifkt_scenario_matches_spec() {
        let mut emitter = MachineCodeEmitter::new();
        emitter.emit_ifkt(&Operand::Number(0x1234, 1), 1).unwrap();
        emitter.finalize().unwrap();
        assert_eq!(emitter.buffer(), &[0xfe, 0x34, 0x12]);
    }

    #[test]
    fn dw_scenario_matches_spec() {
        let mut emitter = MachineCodeEmitter::new();
        emitter.emit_data_32(&[Operand::Number(0x12345678, 1)], 1).unwrap();
        emitter.finalize().unwrap();
        assert_eq!(emitter.buffer(), &[0x78, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn forward_jump_scenario_matches_spec() {
        let mut emitter = MachineCodeEmitter::new();
        emitter.emit_jump(&Operand::Jump("t".to_string(), 1), 1).unwrap();
        emitter.emit_nop();
        emitter.emit_nop();
        emitter.mark_label("t");
        emitter.emit_nop();
        emitter.finalize().unwrap();
        assert_eq!(emitter.buffer(), &[0x70, 0x07, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(emitter.labels().get("t"), Some(&7));
    }

    #[test]
    fn db_overflow_is_rejected() {
        let mut emitter = MachineCodeEmitter::new();
        let result = emitter.emit_data_8(&[Operand::Number(0x100, 1)], 1);
        assert!(matches!(result, Err(AssemblyError::Encoding { .. })));
    }

    #[test]
    fn mov_label_to_non_accumulator_is_rejected() {
        let mut emitter = MachineCodeEmitter::new();
        let dst = Operand::Register(RegisterOperand::direct(RegName::Ip, 1));
        let src = Operand::Jump("somewhere".to_string(), 1);
        let result = emitter.emit_mov(Width::Word, &dst, &src, 1);
        assert!(matches!(result, Err(AssemblyError::Encoding { .. })));
    }
}
