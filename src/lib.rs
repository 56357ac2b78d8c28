//! Traductor de PL/0 a C.
//!
//! # Una sola pasada
//! Cada programa deriva de un único archivo de código fuente, descrito
//! por [`source`]. El traductor de [`translate`] es el único que dirige
//! el proceso: solicita tokens al lexer de [`lex`] conforme los necesita,
//! consulta y modifica la tabla de [`symbol`] durante cada producción y
//! escribe C en cuanto reconoce cada construcción. No se construye un
//! árbol sintáctico ni una representación intermedia.
//!
//! # Salida
//! El resultado es un programa C autocontenido: un preámbulo fijo con
//! las rutinas de apoyo de E/S, las constantes y variables globales, un
//! `void f(void)` por procedimiento, `main()` para el bloque externo y
//! un comentario final. Los fragmentos fijos se encuentran en [`target`].
//!
//! # Errores
//! La traducción termina en el primer error. [`error::Diagnostics`]
//! se encarga de presentarlo junto a la línea donde ocurrió.

#[macro_use]
mod macros;

pub mod error;
pub mod lex;
pub mod source;
pub mod symbol;
pub mod target;
pub mod translate;
