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

pub const OPCODE_JMP_LABEL: u8 = 0x70;
pub const OPCODE_JZ: u8 = 0x71;
pub const OPCODE_JC: u8 = 0x72;
pub const OPCODE_CALL: u8 = 0x73;

const JMP_INDIRECT_BASE: u8 = 0x60;
const JMP_DIRECT_BASE: u8 = 0x68;

/// `jmp [r]` (through memory) vs `jmp r` (through the register's own
/// value) share the 0x60/0x68 bases, split by the register's own
/// `indirect` flag.
pub fn encode_jmp_register_opcode(reg_code: u8, indirect: bool) -> u8 {
    let base = if indirect { JMP_INDIRECT_BASE } else { JMP_DIRECT_BASE };
    base + reg_code
}
