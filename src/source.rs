//! Rastreo de ubicaciones originales en código fuente.
//!
//! El traductor opera en una sola pasada, por lo cual una ubicación
//! se reduce al archivo de origen y a la línea donde comenzó un token.
//! Esto es suficiente para señalar en qué punto ocurre un error de
//! cualquier fase.

use std::{
    fmt::{self, Debug, Display, Formatter},
    fs, io,
    path::Path,
    rc::Rc,
};

/// Un objeto cualquiera con una posición original asociada.
#[derive(Debug, Clone)]
pub struct Located<T> {
    location: Location,
    value: T,
}

impl<T> Located<T> {
    /// Obtiene la ubicación.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Descarta la ubicación y toma ownership del valor.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Descompone y toma ownership de las dos partes.
    pub fn split(self) -> (Location, T) {
        (self.location, self.value)
    }

    /// Construye a partir de un valor y una ubicación.
    pub fn at(value: T, location: Location) -> Self {
        Located { value, location }
    }

    /// Transforma el valor con la misma ubicación.
    pub fn map<U, F>(self, map: F) -> Located<U>
    where
        F: FnOnce(T) -> U,
    {
        Located {
            value: map(self.value),
            location: self.location,
        }
    }
}

impl<T> AsRef<T> for Located<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

/// Una ubicación está conformada por un origen y un número de línea.
#[derive(Clone)]
pub struct Location {
    from: Rc<Source>,
    line: u32,
}

impl Location {
    /// Primera línea de un origen.
    pub fn start(from: &Rc<Source>) -> Self {
        Location {
            from: Rc::clone(from),
            line: 1,
        }
    }

    /// Misma fuente, otra línea.
    pub fn at_line(&self, line: u32) -> Self {
        Location {
            from: Rc::clone(&self.from),
            line,
        }
    }

    /// Obtiene el número de línea, comenzando en 1.
    pub fn line(&self) -> u32 {
        self.line
    }
}

impl Display for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.from.name, self.line)
    }
}

impl Debug for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, formatter)
    }
}

/// Nombre de origen y texto completo del programa.
///
/// El texto se lee de una sola vez antes de traducir; el lexer
/// lo recorre después sin volver a tocar el sistema de archivos.
pub struct Source {
    name: String,
    text: String,
}

impl Source {
    /// Construye un origen a partir de texto ya disponible.
    pub fn new<N, T>(name: N, text: T) -> Rc<Self>
    where
        N: Into<String>,
        T: Into<String>,
    {
        Rc::new(Source {
            name: name.into(),
            text: text.into(),
        })
    }

    /// Lee un archivo completo.
    pub fn read<P: AsRef<Path>>(path: P) -> io::Result<Rc<Self>> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;

        Ok(Source::new(path.display().to_string(), text))
    }

    /// Nombre del origen, usualmente la ruta del archivo.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Texto completo del programa.
    pub fn text(&self) -> &str {
        &self.text
    }
}
