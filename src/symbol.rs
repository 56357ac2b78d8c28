//! Tabla de símbolos.
//!
//! Los símbolos se registran en orden de declaración y se recorren
//! linealmente. Una búsqueda siempre resuelve al símbolo más reciente
//! con el mismo nombre, lo cual modela la sombra de nombres entre
//! profundidades de anidamiento. Al salir del cuerpo de un procedimiento
//! se descartan sus declaraciones locales, pero nunca los procedimientos
//! ya registrados.

use thiserror::Error;

use crate::lex::{Identifier, INT_MAX};

/// Profundidad máxima de un bloque antes de ingresar a él.
///
/// El programa principal ingresa desde 0 y los procedimientos desde 1,
/// por lo cual solo se permite un nivel de procedimientos.
pub const MAX_DEPTH: u32 = 1;

pub type Semantic<T> = Result<T, SemanticError>;

#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SemanticError {
    #[error("Symbol `{0}` is undefined")]
    Undefined(Identifier),

    #[error("Duplicate symbol `{0}`")]
    Duplicate(Identifier),

    #[error("`{0}` must be a variable")]
    ExpectedVariable(Identifier),

    #[error("`{0}` must not be a procedure")]
    UnexpectedProcedure(Identifier),

    #[error("`{0}` must be a procedure")]
    ExpectedProcedure(Identifier),

    #[error("Arrays must be declared with `var`")]
    ArrayNotVariable,

    #[error("Invalid array size {0}, valid range is [1, {max}]", max = INT_MAX)]
    InvalidArraySize(i64),

    #[error("Symbol `{0}` is not an array")]
    NotAnArray(Identifier),

    #[error("Array `{0}` must be indexed")]
    UnindexedArray(Identifier),

    #[error("`{0}` is reserved in the generated C code")]
    ReservedName(Identifier),

    #[error("Nesting depth exceeded")]
    NestingDepthExceeded,
}

/// Clase de un símbolo.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    Constant,
    Variable,
    Procedure,
}

/// Papel que debe cumplir un identificador según su contexto.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Role {
    /// Destino de asignación o de lectura.
    Variable,

    /// Operando de una expresión.
    Value,

    /// Destino de `call`.
    Procedure,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    name: Identifier,
    kind: Kind,
    depth: u32,
    size: Option<u64>,
}

impl Symbol {
    pub fn name(&self) -> &Identifier {
        &self.name
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Profundidad a la que pertenece la declaración.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Tamaño declarado con `size`, solo para arreglos.
    pub fn size(&self) -> Option<u64> {
        self.size
    }
}

#[derive(Debug)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        SymbolTable::new()
    }
}

impl SymbolTable {
    /// Crea una tabla que solo contiene al procedimiento sintético `main`.
    pub fn new() -> Self {
        let main = Symbol {
            name: Identifier::new("main"),
            kind: Kind::Procedure,
            depth: 0,
            size: None,
        };

        SymbolTable {
            symbols: vec![main],
        }
    }

    /// Registra un símbolo mientras se analiza un bloque de profundidad `depth`.
    ///
    /// El bloque ya incrementó la profundidad al ingresar, por lo cual la
    /// declaración pertenece a `depth - 1`. Un mismo nombre no puede
    /// repetirse a esa profundidad, pero sí hacer sombra a declaraciones
    /// de otras profundidades. `depth` debe ser al menos 1.
    pub fn declare(&mut self, name: &Identifier, kind: Kind, depth: u32) -> Semantic<&Symbol> {
        let depth = depth - 1;

        let duplicate = self
            .symbols
            .iter()
            .any(|symbol| symbol.name == *name && symbol.depth == depth);

        if duplicate {
            return Err(SemanticError::Duplicate(name.clone()));
        }

        self.symbols.push(Symbol {
            name: name.clone(),
            kind,
            depth,
            size: None,
        });

        Ok(&self.symbols[self.symbols.len() - 1])
    }

    /// Busca la declaración más reciente de un nombre.
    pub fn lookup(&self, name: &Identifier) -> Option<&Symbol> {
        self.symbols.iter().rev().find(|symbol| symbol.name == *name)
    }

    /// Verifica que un nombre exista y que su clase sea adecuada para `role`.
    pub fn check(&self, name: &Identifier, role: Role) -> Semantic<&Symbol> {
        let symbol = self
            .lookup(name)
            .ok_or_else(|| SemanticError::Undefined(name.clone()))?;

        match (role, symbol.kind) {
            (Role::Variable, Kind::Variable) => Ok(symbol),
            (Role::Variable, _) => Err(SemanticError::ExpectedVariable(name.clone())),

            (Role::Value, Kind::Procedure) => Err(SemanticError::UnexpectedProcedure(name.clone())),
            (Role::Value, _) => Ok(symbol),

            (Role::Procedure, Kind::Procedure) => Ok(symbol),
            (Role::Procedure, _) => Err(SemanticError::ExpectedProcedure(name.clone())),
        }
    }

    /// Obtiene el tamaño de un arreglo, fallando si el nombre no es uno.
    pub fn array_size(&self, name: &Identifier) -> Semantic<u64> {
        let symbol = self
            .lookup(name)
            .ok_or_else(|| SemanticError::Undefined(name.clone()))?;

        symbol
            .size
            .ok_or_else(|| SemanticError::NotAnArray(name.clone()))
    }

    /// Verifica que un nombre no sea un arreglo, el cual solo puede
    /// usarse con subíndice fuera de `writeStr`.
    pub fn check_scalar(&self, name: &Identifier) -> Semantic<()> {
        match self.lookup(name) {
            Some(symbol) if symbol.size.is_some() => {
                Err(SemanticError::UnindexedArray(name.clone()))
            }

            _ => Ok(()),
        }
    }

    /// Asigna un tamaño de arreglo al último símbolo declarado.
    pub fn record_array_size(&mut self, size: i64) -> Semantic<u64> {
        // `main` nunca se remueve, por lo cual siempre hay un último símbolo
        let last = match self.symbols.last_mut() {
            Some(symbol) if symbol.kind == Kind::Variable => symbol,
            _ => return Err(SemanticError::ArrayNotVariable),
        };

        let size = u64::try_from(size)
            .ok()
            .filter(|&size| size >= 1)
            .ok_or(SemanticError::InvalidArraySize(size))?;

        last.size = Some(size);
        Ok(size)
    }

    /// Descarta las declaraciones locales del procedimiento que termina.
    ///
    /// Se remueven símbolos desde el final hasta encontrar un
    /// procedimiento, el cual se preserva.
    pub fn close_scope(&mut self) {
        while let Some(symbol) = self.symbols.last() {
            if symbol.kind == Kind::Procedure {
                break;
            }

            self.symbols.pop();
        }
    }

    /// Símbolos vigentes, en orden de declaración.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }
}
