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

use crate::ast::{RegisterOperand, StackKind, StackOp};

const DATA_BASE: u8 = 0xA0;
const RETURN_BASE: u8 = 0xB0;
const POP_BIT: u8 = 0x08;

/// `pushd`/`popd` occupy `0xA0..=0xAF`, `pushr`/`popr` occupy `0xB0..=0xBF`;
/// within each range the low nibble packs direction (push = low half, pop =
/// high half) and the 3-bit register code.
pub fn encode_stack_opcode(kind: StackKind, op: StackOp, reg: &RegisterOperand) -> u8 {
    let base = match kind {
        StackKind::Data => DATA_BASE,
        StackKind::Return => RETURN_BASE,
    };
    let direction = match op {
        StackOp::Push => 0,
        StackOp::Pop => POP_BIT,
    };
    base | direction | reg.reg.code()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{RegName, RegisterOperand};

    #[test]
    fn pushd_and_popd_occupy_distinct_halves() {
        let reg = RegisterOperand::direct(RegName::Acc1, 1);
        let push = encode_stack_opcode(StackKind::Data, StackOp::Push, &reg);
        let pop = encode_stack_opcode(StackKind::Data, StackOp::Pop, &reg);
        assert_eq!(push, 0xA0 | 4);
        assert_eq!(pop, 0xA8 | 4);
    }

    #[test]
    fn pushr_uses_return_stack_base() {
        let reg = RegisterOperand::direct(RegName::Ip, 1);
        let push = encode_stack_opcode(StackKind::Return, StackOp::Push, &reg);
        assert_eq!(push, 0xB0);
    }
}
