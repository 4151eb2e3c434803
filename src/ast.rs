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

// Register names of the inner-interpreter VM, with their fixed 3-bit encodings.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RegName {
    Ip,
    Wp,
    Rsp,
    Dsp,
    Acc1,
    Acc2,
    Ret,
    Pc,
}

impl RegName {
    pub fn code(self) -> u8 {
        match self {
            RegName::Ip => 0,
            RegName::Wp => 1,
            RegName::Rsp => 2,
            RegName::Dsp => 3,
            RegName::Acc1 => 4,
            RegName::Acc2 => 5,
            RegName::Ret => 6,
            RegName::Pc => 7,
        }
    }

    pub fn from_ident(s: &str) -> Option<RegName> {
        match s {
            "ip" => Some(RegName::Ip),
            "wp" => Some(RegName::Wp),
            "rsp" => Some(RegName::Rsp),
            "dsp" => Some(RegName::Dsp),
            "acc1" => Some(RegName::Acc1),
            "acc2" => Some(RegName::Acc2),
            "ret" => Some(RegName::Ret),
            "pc" => Some(RegName::Pc),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RegName::Ip => "ip",
            RegName::Wp => "wp",
            RegName::Rsp => "rsp",
            RegName::Dsp => "dsp",
            RegName::Acc1 => "acc1",
            RegName::Acc2 => "acc2",
            RegName::Ret => "ret",
            RegName::Pc => "pc",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RegModifier {
    None,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

// A register operand: `%r`, `[%r]`, `[%r++]`, `[%r--]`, `[++%r]`, `[--%r]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterOperand {
    pub reg: RegName,
    pub indirect: bool,
    pub modifier: RegModifier,
    pub line: usize,
}

impl RegisterOperand {
    pub fn direct(reg: RegName, line: usize) -> Self {
        RegisterOperand {
            reg,
            indirect: false,
            modifier: RegModifier::None,
            line,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExprOp {
    Add,
    Sub,
}

// A single term of an address-arithmetic expression. `ConstRef` is a bare
// (non-colon) identifier that must name a top-level `const`; `MacroArg` is
// an `@name` reference that only resolves inside a macro body, against the
// current call's argument scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprTerm {
    Number(u32),
    Jump(String),
    ConstRef(String),
    MacroArg(String),
    CurrentAddress,
}

// Ordered list alternating terms and +/- operators, per spec.md sec 3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub first: ExprTerm,
    pub rest: Vec<(ExprOp, ExprTerm)>,
    pub line: usize,
}

impl Expression {
    pub fn single(term: ExprTerm, line: usize) -> Self {
        Expression {
            first: term,
            rest: Vec::new(),
            line,
        }
    }

    pub fn terms(&self) -> impl Iterator<Item = &ExprTerm> {
        std::iter::once(&self.first).chain(self.rest.iter().map(|(_, t)| t))
    }

    pub fn is_single(&self) -> bool {
        self.rest.is_empty()
    }
}

// The closed operand set from spec.md sec 3/9: Register, Number, Jump,
// Expression, String. `Number` and `Jump` are kept as distinct variants
// (rather than folded into a one-term Expression) because spec.md's
// operand model treats them as separate tags; `Expression` is only built
// when parsing actually saw a `+`/`-` chain, or a bare `$`/`@name` term.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Register(RegisterOperand),
    Number(u32, usize),
    Jump(String, usize),
    Expression(Expression),
    Str(String, usize),
}

impl Operand {
    pub fn line(&self) -> usize {
        match self {
            Operand::Register(r) => r.line,
            Operand::Number(_, l) => *l,
            Operand::Jump(_, l) => *l,
            Operand::Expression(e) => e.line,
            Operand::Str(_, l) => *l,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Width {
    Word,
    Byte,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Sub,
    Or,
    And,
    Xor,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShiftOp {
    Sra,
    Sll,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StackOp {
    Push,
    Pop,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StackKind {
    Data,
    Return,
}

// One instruction line from the source. `width` carries the `.w`/`.b`
// suffix when the grammar allows one; the encoder is the sole authority on
// which (mnemonic, width) combinations are legal (spec.md sec 4.4).
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Nop,
    Illegal,
    Mov {
        width: Width,
        dst: Operand,
        src: Operand,
        line: usize,
    },
    Alu {
        op: AluOp,
        width: Width,
        dst: RegisterOperand,
        s1: RegisterOperand,
        s2: RegisterOperand,
        line: usize,
    },
    Shift {
        op: ShiftOp,
        width: Width,
        reg: RegisterOperand,
        imm: Operand,
        line: usize,
    },
    Stack {
        kind: StackKind,
        op: StackOp,
        width: Width,
        reg: RegisterOperand,
        line: usize,
    },
    JmpIndirect {
        reg: RegisterOperand,
        line: usize,
    },
    JmpLabel {
        target: Operand,
        line: usize,
    },
    Jz {
        target: Operand,
        line: usize,
    },
    Jc {
        target: Operand,
        line: usize,
    },
    Call {
        target: Operand,
        line: usize,
    },
    Ifkt {
        imm: Operand,
        line: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataDirective {
    Db(Vec<Operand>),
    Dw(Vec<Operand>),
    Ds(Vec<Operand>),
}

// A bare token inside a word body: per spec.md sec 4.5/4.6, word bodies
// compile word references, numbers, label marks/targets, and constants —
// not raw instructions.
#[derive(Debug, Clone, PartialEq)]
pub enum WordBodyToken {
    JumpTarget(String),
    Number(u32),
    BareIdent(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Label(String, usize),
    Instr(Instruction, usize),
    Data(DataDirective, usize),
    MacroCall(String, Vec<Operand>, usize),
    WordBody(WordBodyToken, usize),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DefType {
    Asm,
    Word,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacroDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefDecl {
    pub def_type: DefType,
    pub flags: Vec<Expression>,
    pub subkind: String,
    pub alias: Option<String>,
    pub name: String,
    pub body: Vec<Stmt>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TopItem {
    Const {
        name: String,
        value: u32,
        line: usize,
    },
    Include {
        path: String,
        line: usize,
    },
    MacroDef(MacroDecl),
    CodeBlock {
        body: Vec<Stmt>,
        line: usize,
    },
    Def(DefDecl),
}

impl TopItem {
    pub fn line(&self) -> usize {
        match self {
            TopItem::Const { line, .. } => *line,
            TopItem::Include { line, .. } => *line,
            TopItem::MacroDef(m) => m.line,
            TopItem::CodeBlock { line, .. } => *line,
            TopItem::Def(d) => d.line,
        }
    }
}
