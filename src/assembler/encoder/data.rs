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

pub const OPCODE_NOP: u8 = 0x00;
pub const OPCODE_ILLEGAL: u8 = 0xFF;
pub const OPCODE_IFKT: u8 = 0xFE;

pub const OPCODE_MOV_REG_WORD: u8 = 0x20;
pub const OPCODE_MOV_REG_BYTE: u8 = 0x21;
pub const OPCODE_MOV_IND_STORE_WORD: u8 = 0x22;
pub const OPCODE_MOV_IND_STORE_BYTE: u8 = 0x23;
pub const OPCODE_MOV_IND_LOAD_WORD: u8 = 0x24;
pub const OPCODE_MOV_IND_LOAD_BYTE: u8 = 0x25;
pub const OPCODE_MOV_IMM_ACC1: u8 = 0x26;
pub const OPCODE_MOV_IMM_ACC2: u8 = 0x27;

pub const OPCODE_ADD: u8 = 0x30;
pub const OPCODE_SUB: u8 = 0x32;
pub const OPCODE_OR: u8 = 0x34;
pub const OPCODE_AND: u8 = 0x36;
pub const OPCODE_XOR: u8 = 0x38;
pub const OPCODE_SRA: u8 = 0x3c;
pub const OPCODE_SLL: u8 = 0x3e;

/// `db` rejects every value that doesn't fit a byte.
pub fn fits_in_byte(value: u32) -> bool {
    value <= 0xFF
}
