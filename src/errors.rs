use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("Syntax Error: {0}")]
    Syntax(#[from] pest::error::Error<crate::parser::Rule>),

    #[error("Undefined Reference on line {line}: {reason}")]
    Undefined { line: usize, reason: String },

    #[error("Encoding Error on line {line}: {reason}")]
    Encoding { line: usize, reason: String },

    #[error("Macro Arity Error on line {line}: {reason}")]
    MacroArity { line: usize, reason: String },

    #[error("Opcode '{mnemonic}' currently not implemented (line {line})")]
    UnsupportedOpcode { line: usize, mnemonic: String },

    #[error("Duplicate definition on line {line}: {reason}")]
    DuplicateDefinition { line: usize, reason: String },

    #[error("Include cycle on line {line}: {reason}")]
    IncludeCycle { line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
