//! Reporte de errores al usuario.
//!
//! Cada fase produce su propio tipo de error, siempre acompañado de una
//! [`Location`]. [`Diagnostics`] unifica cualquiera de ellos para
//! presentarlos en una sola línea por error.

use crate::source::{Located, Location};
use std::{
    error::Error,
    fmt::{self, Display},
};

mod sealed {
    pub trait Sealed {}
}

pub trait LocatedError: sealed::Sealed {
    fn source(&self) -> &dyn Error;
    fn location(&self) -> &Location;
}

pub struct Diagnostics {
    kind: &'static str,
    errors: Vec<Box<dyn 'static + LocatedError>>,
}

impl Diagnostics {
    pub fn kind(self, kind: &'static str) -> Self {
        Diagnostics { kind, ..self }
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Diagnostics {
            kind: "error",
            errors: Default::default(),
        }
    }
}

impl<E: 'static + LocatedError> From<E> for Diagnostics {
    fn from(error: E) -> Self {
        Diagnostics {
            errors: vec![Box::new(error)],
            ..Default::default()
        }
    }
}

impl Display for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Diagnostics { kind, errors } = self;

        // Una línea por error: origen, línea y mensaje
        for error in errors {
            writeln!(
                fmt,
                "pl0c: {}: {}: {}",
                kind,
                error.location(),
                error.source()
            )?;
        }

        Ok(())
    }
}

impl<E: Error> sealed::Sealed for Located<E> {}

impl<E: Error> LocatedError for Located<E> {
    fn source(&self) -> &dyn Error {
        self.as_ref()
    }

    fn location(&self) -> &Location {
        Located::location(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lex::LexerError, source::Source};
    use pretty_assertions::assert_eq;

    #[test]
    fn one_line_per_error() {
        let source = Source::new("demo.pl0", "var x;\nx := !\n");
        let location = Location::start(&source).at_line(2);
        let error = Located::at(LexerError::BadChar('!'), location);

        let diagnostics = Diagnostics::from(error).kind("lexical error");
        assert_eq!(
            diagnostics.to_string(),
            "pl0c: lexical error: demo.pl0:2: Unknown token '!'\n"
        );
    }
}
