//! Argument resolution: turning a program template into a concrete argv.

use crate::operation::Operation;
use crate::program::{Program, Token};
use std::collections::HashMap;

/// Variables bound by earlier operations of the current phase.
pub type Bindings = HashMap<String, String>;

/// Errors from expanding a program's argument template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// A `<name>` placeholder referenced a variable nothing has bound yet.
    #[error("program {program} uses variable <{variable}> that is not defined")]
    Unbound { program: String, variable: String },
    /// The template expanded to nothing, so there is no executable.
    #[error("program {program} resolved to an empty argument list")]
    Empty { program: String },
}

/// Expand `program`'s template for `op`.
///
/// Literals are copied, `<args>` splices `op.args`, and every other
/// placeholder is looked up in `vars`.  An unbound variable is an error
/// rather than an empty string: it means the consuming operation was
/// declared before the one producing the value.
pub fn resolve(program: &Program, op: &Operation, vars: &Bindings) -> Result<Vec<String>, ResolveError> {
    let mut argv = Vec::with_capacity(program.template().len() + op.args.len());
    for token in program.template() {
        match token {
            Token::Literal(text) => argv.push(text.clone()),
            Token::Args => argv.extend(op.args.iter().cloned()),
            Token::Var(name) => {
                let value = vars.get(name).ok_or_else(|| ResolveError::Unbound {
                    program: program.name().to_string(),
                    variable: name.clone(),
                })?;
                argv.push(value.clone());
            }
        }
    }
    if argv.is_empty() {
        return Err(ResolveError::Empty {
            program: program.name().to_string(),
        });
    }
    Ok(argv)
}
