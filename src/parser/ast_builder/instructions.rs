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

use crate::ast::{AluOp, Instruction, Operand, RegisterOperand, ShiftOp, StackKind, StackOp, Width};
use crate::errors::AssemblyError;

fn split_mnemonic(mnemonic: &str) -> (&str, Option<&str>) {
    match mnemonic.split_once('.') {
        Some((base, suffix)) => (base, Some(suffix)),
        None => (mnemonic, None),
    }
}

fn width_of(suffix: Option<&str>) -> Width {
    match suffix {
        Some("b") => Width::Byte,
        _ => Width::Word,
    }
}

fn as_register(operand: Operand, line: usize) -> Result<RegisterOperand, AssemblyError> {
    match operand {
        Operand::Register(r) => Ok(r),
        other => Err(AssemblyError::Encoding {
            line,
            reason: format!("expected a register operand, found {:?}", other),
        }),
    }
}

fn arity_error(mnemonic: &str, line: usize, expected: usize, found: usize) -> AssemblyError {
    AssemblyError::Encoding {
        line,
        reason: format!(
            "'{}' expects {} operand(s), found {}",
            mnemonic, expected, found
        ),
    }
}

pub fn build_instruction(
    mnemonic: &str,
    mut operands: Vec<Operand>,
    line: usize,
) -> Result<Instruction, AssemblyError> {
    let (base, suffix) = split_mnemonic(mnemonic);
    let width = width_of(suffix);

    match base {
        "nop" => {
            if !operands.is_empty() {
                return Err(arity_error(mnemonic, line, 0, operands.len()));
            }
            Ok(Instruction::Nop)
        }
        "illegal" => {
            if !operands.is_empty() {
                return Err(arity_error(mnemonic, line, 0, operands.len()));
            }
            Ok(Instruction::Illegal)
        }
        "mov" => {
            if operands.len() != 2 {
                return Err(arity_error(mnemonic, line, 2, operands.len()));
            }
            let src = operands.pop().unwrap();
            let dst = operands.pop().unwrap();
            Ok(Instruction::Mov {
                width,
                dst,
                src,
                line,
            })
        }
        "add" | "sub" | "or" | "and" | "xor" => {
            if operands.len() != 3 {
                return Err(arity_error(mnemonic, line, 3, operands.len()));
            }
            let s2 = as_register(operands.pop().unwrap(), line)?;
            let s1 = as_register(operands.pop().unwrap(), line)?;
            let dst = as_register(operands.pop().unwrap(), line)?;
            let op = match base {
                "add" => AluOp::Add,
                "sub" => AluOp::Sub,
                "or" => AluOp::Or,
                "and" => AluOp::And,
                "xor" => AluOp::Xor,
                _ => unreachable!(),
            };
            Ok(Instruction::Alu {
                op,
                width,
                dst,
                s1,
                s2,
                line,
            })
        }
        "sra" | "sll" => {
            if operands.len() != 2 {
                return Err(arity_error(mnemonic, line, 2, operands.len()));
            }
            let imm = operands.pop().unwrap();
            let reg = as_register(operands.pop().unwrap(), line)?;
            let op = if base == "sra" { ShiftOp::Sra } else { ShiftOp::Sll };
            Ok(Instruction::Shift {
                op,
                width,
                reg,
                imm,
                line,
            })
        }
        "pushd" | "popd" | "pushr" | "popr" => {
            if operands.len() != 1 {
                return Err(arity_error(mnemonic, line, 1, operands.len()));
            }
            let reg = as_register(operands.pop().unwrap(), line)?;
            let kind = if base.ends_with('d') {
                StackKind::Data
            } else {
                StackKind::Return
            };
            let op = if base.starts_with("push") {
                StackOp::Push
            } else {
                StackOp::Pop
            };
            Ok(Instruction::Stack {
                kind,
                op,
                width,
                reg,
                line,
            })
        }
        "jmp" => {
            if operands.len() != 1 {
                return Err(arity_error(mnemonic, line, 1, operands.len()));
            }
            match operands.pop().unwrap() {
                Operand::Register(reg) => Ok(Instruction::JmpIndirect { reg, line }),
                target => Ok(Instruction::JmpLabel { target, line }),
            }
        }
        "jz" => {
            if operands.len() != 1 {
                return Err(arity_error(mnemonic, line, 1, operands.len()));
            }
            Ok(Instruction::Jz {
                target: operands.pop().unwrap(),
                line,
            })
        }
        "jc" => {
            if operands.len() != 1 {
                return Err(arity_error(mnemonic, line, 1, operands.len()));
            }
            Ok(Instruction::Jc {
                target: operands.pop().unwrap(),
                line,
            })
        }
        "call" => {
            if operands.len() != 1 {
                return Err(arity_error(mnemonic, line, 1, operands.len()));
            }
            Ok(Instruction::Call {
                target: operands.pop().unwrap(),
                line,
            })
        }
        "ifkt" => {
            if operands.len() != 1 {
                return Err(arity_error(mnemonic, line, 1, operands.len()));
            }
            Ok(Instruction::Ifkt {
                imm: operands.pop().unwrap(),
                line,
            })
        }
        other => Err(AssemblyError::UnsupportedOpcode {
            line,
            mnemonic: other.to_string(),
        }),
    }
}
