//! Análisis léxico.
//!
//! # Tokenization
//! Esta fase descompone el texto de un [`Source`] en unidades léxicas
//! denominadas tokens. Los espacios en blanco y los comentarios se
//! descartan durante esta operación. A diferencia de un lexer que produce
//! toda la secuencia de antemano, este lexer es invocado por el traductor
//! cada vez que necesita un siguiente token de lookahead. Cada token
//! emitido está asociado a la línea donde comienza.
//!
//! # Contenido de un token
//! Operadores, puntuación y palabras clave se identifican por el hecho
//! de lo que son y no incluyen lexemas. Los identificadores y las
//! cadenas literales sí incluyen su texto original. Las constantes
//! enteras se resuelven a sus valores, descartando los `_` separadores.
//!
//! # Reglas importantes del lenguaje
//! - Los identificadores cumplen `[A-Za-z_][A-Za-z0-9_]*`.
//! - El lenguaje distingue mayúsculas de minúsculas, por lo cual
//!   `begin` es palabra clave pero `BEGIN` es un identificador.
//! - Los comentarios se delimitan por `{` y `}` y pueden abarcar
//!   varias líneas.
//! - Las cadenas se delimitan por `'`; dentro de ellas `''` representa
//!   una comilla simple.
//!
//! # Errores
//! Todo error léxico es definitivo. No hay recuperación, ya que el
//! traductor no puede continuar sin un token válido.

use crate::source::{Located, Location, Source};
use std::{
    borrow::Cow,
    fmt::{self, Display},
    iter::Peekable,
    mem,
    rc::Rc,
    str::{Chars, FromStr},
};

use thiserror::Error;

/// Literal entero máximo, el rango de un `long` en el lenguaje objetivo.
pub const INT_MAX: i64 = i64::MAX;

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LexerError {
    /// Carácter desconocido o inesperado en el flujo de entrada.
    #[error("Unknown token {0:?}")]
    BadChar(char),

    /// `:` no fue seguido inmediatamente por `=`.
    #[error("Unknown token `:{0}`, expected `:=`")]
    BadAssign(String),

    /// Se alcanzó el final de la entrada dentro de un comentario.
    #[error("Unterminated comment")]
    UnterminatedComment,

    /// Una cadena no se cerró antes del final de la línea.
    #[error("Unterminated string")]
    UnterminatedString,

    /// Una cadena literal sin contenido.
    #[error("Empty string literal")]
    EmptyString,

    /// Una constante entera se encuentra fuera de rango.
    #[error("Invalid number `{0}`, valid range is [0, {max}]", max = INT_MAX)]
    IntOverflow(String),
}

/// Un identificador.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(Rc<str>);

impl Identifier {
    pub fn new(name: &str) -> Self {
        Identifier(Rc::from(name))
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Identifier {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.0)
    }
}

/// Objeto resultante del análisis léxico.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Identificador.
    Id(Identifier),

    /// Palabra clave.
    Keyword(Keyword),

    /// Literal de entero: su valor y sus dígitos tal como aparecen,
    /// sin separadores `_`.
    IntLiteral(i64, Rc<str>),

    /// Cadena literal, ya sin comillas ni escapes.
    StrLiteral(Rc<str>),

    /// `:=`
    Assign,

    /// `=`
    Equal,

    /// `#`
    Hash,

    /// `<`
    Less,

    /// `>`
    Greater,

    /// `,`
    Comma,

    /// `.`
    Period,

    /// `;`
    Semicolon,

    /// `+`
    Plus,

    /// `-`
    Minus,

    /// `*`
    Times,

    /// `/`
    Slash,

    /// `(`
    OpenParen,

    /// `)`
    CloseParen,

    /// `[`
    OpenSquare,

    /// `]`
    CloseSquare,

    /// Fin de la entrada.
    Eof,
}

impl Token {
    /// Nombre de la clase del token, tal como aparece en listados.
    pub fn name(&self) -> &'static str {
        use Token::*;

        match self {
            Id(_) => "IDENT",
            Keyword(keyword) => keyword.name(),
            IntLiteral(..) => "NUMBER",
            StrLiteral(_) => "STRING",
            Assign => "ASSIGN",
            Equal => "EQUAL",
            Hash => "HASH",
            Less => "LESSTHAN",
            Greater => "GREATERTHAN",
            Comma => "COMMA",
            Period => "DOT",
            Semicolon => "SEMICOLON",
            Plus => "PLUS",
            Minus => "MINUS",
            Times => "MULTIPLY",
            Slash => "DIVIDE",
            OpenParen => "LPAREN",
            CloseParen => "RPAREN",
            OpenSquare => "LBRACK",
            CloseSquare => "RBRACK",
            Eof => "EOF",
        }
    }

    /// Reconstruye el texto fuente que produce este token.
    pub fn lexeme(&self) -> Cow<'_, str> {
        use Token::*;

        let symbol = match self {
            Id(id) => return Cow::Borrowed(id.as_ref()),
            Keyword(keyword) => keyword.as_str(),
            IntLiteral(_, digits) => return Cow::Borrowed(digits.as_ref()),
            StrLiteral(string) => return Cow::Owned(format!("'{}'", string.replace('\'', "''"))),
            Assign => ":=",
            Equal => "=",
            Hash => "#",
            Less => "<",
            Greater => ">",
            Comma => ",",
            Period => ".",
            Semicolon => ";",
            Plus => "+",
            Minus => "-",
            Times => "*",
            Slash => "/",
            OpenParen => "(",
            CloseParen => ")",
            OpenSquare => "[",
            CloseSquare => "]",
            Eof => "",
        };

        Cow::Borrowed(symbol)
    }
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Token::*;

        match self {
            Id(id) => write!(fmt, "identifier `{}`", id),
            Keyword(keyword) => write!(fmt, "keyword `{}`", keyword),
            IntLiteral(_, digits) => write!(fmt, "literal `{}`", digits),
            StrLiteral(_) => write!(fmt, "string literal {}", self.lexeme()),
            Eof => fmt.write_str("end of file"),
            _ => write!(fmt, "`{}`", self.lexeme()),
        }
    }
}

/// Una palabra clave.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    Const,
    Var,
    Size,
    Procedure,
    Call,
    Begin,
    End,
    If,
    Then,
    While,
    Do,
    Odd,
    WriteInt,
    WriteChar,
    WriteStr,
    ReadInt,
    ReadChar,
    Into,
}

/// Tabla de palabras reservadas, sensible a mayúsculas.
const KEYWORDS: &[(&str, Keyword, &str)] = &[
    ("const",     Keyword::Const,     "CONST"),
    ("var",       Keyword::Var,       "VAR"),
    ("size",      Keyword::Size,      "SIZE"),
    ("procedure", Keyword::Procedure, "PROCEDURE"),
    ("call",      Keyword::Call,      "CALL"),
    ("begin",     Keyword::Begin,     "BEGIN"),
    ("end",       Keyword::End,       "END"),
    ("if",        Keyword::If,        "IF"),
    ("then",      Keyword::Then,      "THEN"),
    ("while",     Keyword::While,     "WHILE"),
    ("do",        Keyword::Do,        "DO"),
    ("odd",       Keyword::Odd,       "ODD"),
    ("writeInt",  Keyword::WriteInt,  "WRITEINT"),
    ("writeChar", Keyword::WriteChar, "WRITECHAR"),
    ("writeStr",  Keyword::WriteStr,  "WRITESTR"),
    ("readInt",   Keyword::ReadInt,   "READINT"),
    ("readChar",  Keyword::ReadChar,  "READCHAR"),
    ("into",      Keyword::Into,      "INTO"),
];

impl Keyword {
    /// Texto de la palabra clave en el código fuente.
    pub fn as_str(self) -> &'static str {
        self.entry().0
    }

    fn name(self) -> &'static str {
        self.entry().2
    }

    fn entry(self) -> &'static (&'static str, Keyword, &'static str) {
        // La tabla enumera todas las variantes
        &KEYWORDS[self as usize]
    }
}

impl Display for Keyword {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(self.as_str())
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        KEYWORDS
            .iter()
            .find(|&&(text, _, _)| text == string)
            .map(|&(_, keyword, _)| keyword)
            .ok_or(())
    }
}

/// Máquina de estados para análisis léxico.
///
/// Un lexer puede encontrarse en uno de diversos estados. La
/// salida del lexer, así como su siguiente estado, se define
/// a partir de tanto su estado actual como el siguiente carácter
/// encontrado en el flujo de entrada.
pub struct Lexer<'a> {
    source: Peekable<Chars<'a>>,
    origin: Location,
    state: State,
    line: u32,
    finished: bool,
}

/// Posibles estados del lexer.
enum State {
    /// Estado que ocurre antes de encontrar el inicio de un token.
    Start,

    /// Estado de completitud; siempre emite el token incluido,
    /// consume la entrada actual y pasa a [`State::Start`].
    Complete(Token),

    /// Se encontró `:`.
    ///
    /// Debe seguir `=` para formar una asignación.
    Colon,

    /// Comentario de bloque.
    ///
    /// Este estado vuelve a [`State::Start`] al encontrar `'}'`.
    Comment,

    /// Constante entera.
    ///
    /// Acumula dígitos mientras el siguiente carácter sea un dígito
    /// o un separador `_`, el cual se descarta.
    Integer(String),

    /// Término que puede ser un identificador o una palabra clave.
    Word(String),

    /// Contenido de una cadena literal.
    Str(String),

    /// Se encontró `'` dentro de una cadena. Otra `'` la continúa,
    /// cualquier otra cosa la cierra.
    Quote(String),
}

impl<'a> Lexer<'a> {
    /// Crea un lexer en estado inicial a partir de un origen.
    pub fn new(source: &'a Rc<Source>) -> Self {
        Lexer {
            source: source.text().chars().peekable(),
            origin: Location::start(source),
            state: State::Start,
            line: 1,
            finished: false,
        }
    }

    /// Escanea el siguiente token.
    ///
    /// Al agotarse la entrada se emite [`Token::Eof`] indefinidamente.
    pub fn next_token(&mut self) -> Result<Located<Token>, Located<LexerError>> {
        let result = self.lex();
        self.state = State::Start;

        match result {
            Ok((token, line)) => Ok(Located::at(token, self.origin.at_line(line))),
            Err(error) => Err(Located::at(error, self.origin.at_line(self.line))),
        }
    }

    /// Intenta construir un siguiente token, junto a su línea de inicio.
    fn lex(&mut self) -> Result<(Token, u32), LexerError> {
        use {State::*, Token::*};

        let mut start = self.line;
        let token = loop {
            let next_char = self.source.peek().copied();

            // La línea de origen avanza junto al cursor siempre que no
            // se haya encontrado una frontera de token
            if let Start = self.state {
                start = self.line;
            }

            // Switch table principal, determina cambios de estado
            // y de salida del lexer a partir de combinaciones del
            // estado actual y el siguiente carácter
            match (&mut self.state, next_char) {
                // Tokens triviales
                (Start, None) => break Ok(Eof),
                (Start, Some('.')) => self.state = Complete(Period),
                (Start, Some('=')) => self.state = Complete(Equal),
                (Start, Some(',')) => self.state = Complete(Comma),
                (Start, Some(';')) => self.state = Complete(Semicolon),
                (Start, Some('#')) => self.state = Complete(Hash),
                (Start, Some('<')) => self.state = Complete(Less),
                (Start, Some('>')) => self.state = Complete(Greater),
                (Start, Some('+')) => self.state = Complete(Plus),
                (Start, Some('-')) => self.state = Complete(Minus),
                (Start, Some('*')) => self.state = Complete(Times),
                (Start, Some('/')) => self.state = Complete(Slash),
                (Start, Some('(')) => self.state = Complete(OpenParen),
                (Start, Some(')')) => self.state = Complete(CloseParen),
                (Start, Some('[')) => self.state = Complete(OpenSquare),
                (Start, Some(']')) => self.state = Complete(CloseSquare),
                (Start, Some(':')) => self.state = Colon,
                (Start, Some('{')) => self.state = Comment,
                (Start, Some('\'')) => self.state = Str(String::new()),

                // Identificadores y palabras clave
                (Start, Some(c)) if c.is_ascii_alphabetic() || c == '_' => {
                    self.state = Word(c.to_string())
                }

                // Inicio de una constante numérica. No se consume el
                // dígito, ya que esta lógica ya está implementada en el
                // respectivo caso para un estado de constante entera
                (Start, Some(c)) if c.is_ascii_digit() => {
                    self.state = Integer(String::new());
                    continue;
                }

                // Espacios en blanco y caracteres inesperados
                (Start, Some(' ' | '\t' | '\r' | '\n')) => (),
                (Start, Some(c)) => break Err(LexerError::BadChar(c)),

                // Emisión retardada de tokens cualesquiera
                (Complete(token), _) => break Ok(mem::replace(token, Eof)),

                // `:` solamente puede iniciar `:=`
                (Colon, Some('=')) => self.state = Complete(Assign),
                (Colon, other) => {
                    let found = other.map(String::from).unwrap_or_default();
                    break Err(LexerError::BadAssign(found));
                }

                // Los comentarios descartan todo hasta `}`
                (Comment, Some('}')) => self.state = Start,
                (Comment, Some(_)) => (),
                (Comment, None) => break Err(LexerError::UnterminatedComment),

                // Acumulación dígito por dígito de constantes enteras
                (Integer(digits), Some(c)) if c.is_ascii_digit() || c == '_' => {
                    if c != '_' {
                        digits.push(c);
                    }
                }

                // Si sigue algo que no es un dígito, la constante ha terminado
                (Integer(digits), _) => match digits.parse::<i64>() {
                    Ok(integer) => break Ok(IntLiteral(integer, Rc::from(mem::take(digits)))),
                    Err(_) => break Err(LexerError::IntOverflow(mem::take(digits))),
                },

                // Extensión de términos
                (Word(word), Some(c)) if is_word_char(c) => word.push(c),

                // Si sigue algo que no puede formar parte del término, ha terminado
                (Word(word), _) => match self::Keyword::from_str(word) {
                    Ok(keyword) => break Ok(Keyword(keyword)),
                    Err(()) => break Ok(Id(Identifier::new(word))),
                },

                // Cadenas literales de una sola línea
                (Str(text), Some('\'')) => self.state = Quote(mem::take(text)),
                (Str(_), None | Some('\n')) => break Err(LexerError::UnterminatedString),
                (Str(text), Some(c)) => text.push(c),

                (Quote(text), Some('\'')) => {
                    text.push('\'');
                    self.state = Str(mem::take(text));
                }

                (Quote(text), _) if text.is_empty() => break Err(LexerError::EmptyString),
                (Quote(text), _) => break Ok(StrLiteral(Rc::from(mem::take(text)))),
            }

            // Si no hubo `continue` ni `break`, aquí se consume el carácter
            // que se observó con lookahead anteriormente
            if let Some('\n') = self.source.next() {
                self.line += 1;
            }
        };

        token.map(|token| (token, start))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Located<Token>, Located<LexerError>>;

    /// Recorre la entrada hasta incluir [`Token::Eof`] o el primer error.
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let result = self.next_token();
        self.finished = match &result {
            Ok(token) => *token.as_ref() == Token::Eof,
            Err(_) => true,
        };

        Some(result)
    }
}

/// Determina si un carácter puede pertenecer a un término.
fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lex_all(text: &str) -> Result<Vec<(u32, Token)>, (u32, LexerError)> {
        let source = Source::new("test.pl0", text);
        Lexer::new(&source)
            .map(|result| match result {
                Ok(token) => {
                    let (location, token) = token.split();
                    Ok((location.line(), token))
                }

                Err(error) => {
                    let (location, error) = error.split();
                    Err((location.line(), error))
                }
            })
            .collect()
    }

    fn id(name: &str) -> Token {
        Token::Id(Identifier::new(name))
    }

    #[test]
    fn keywords_and_identifiers() {
        use Token::*;

        let tokens = lex_all("const x = 5; var Begin, _y1;").unwrap();
        let tokens: Vec<_> = tokens.into_iter().map(|(_, token)| token).collect();

        assert_eq!(
            tokens,
            [
                Keyword(self::Keyword::Const),
                id("x"),
                Equal,
                IntLiteral(5, Rc::from("5")),
                Semicolon,
                Keyword(self::Keyword::Var),
                id("Begin"),
                Comma,
                id("_y1"),
                Semicolon,
                Eof,
            ]
        );
    }

    #[test]
    fn keyword_table_is_case_sensitive() {
        assert_eq!(Keyword::from_str("writeInt"), Ok(Keyword::WriteInt));
        assert_eq!(Keyword::from_str("writeint"), Err(()));
        assert_eq!(Keyword::from_str("WHILE"), Err(()));

        for &(text, keyword, _) in KEYWORDS {
            assert_eq!(keyword.as_str(), text);
        }
    }

    #[test]
    fn punctuation_and_assignment() {
        use Token::*;

        let tokens = lex_all("a[i]:=(b*c)/d-e+f#g<h>i.").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|(_, token)| token.name()).collect();

        assert_eq!(
            kinds,
            [
                "IDENT", "LBRACK", "IDENT", "RBRACK", "ASSIGN", "LPAREN", "IDENT", "MULTIPLY",
                "IDENT", "RPAREN", "DIVIDE", "IDENT", "MINUS", "IDENT", "PLUS", "IDENT", "HASH",
                "IDENT", "LESSTHAN", "IDENT", "GREATERTHAN", "IDENT", "DOT", "EOF",
            ]
        );

        assert_eq!(tokens[4].1, Assign);
    }

    #[test]
    fn numbers_strip_separators() {
        let tokens = lex_all("1_000 007 9_223_372_036_854_775_807").unwrap();
        let values: Vec<_> = tokens.into_iter().map(|(_, token)| token).collect();

        assert_eq!(
            values,
            [
                Token::IntLiteral(1000, Rc::from("1000")),
                Token::IntLiteral(7, Rc::from("007")),
                Token::IntLiteral(i64::MAX, Rc::from("9223372036854775807")),
                Token::Eof,
            ]
        );

        assert_eq!(values[1].lexeme(), "007");
    }

    #[test]
    fn number_out_of_range() {
        assert_eq!(
            lex_all("x := 9223372036854775808"),
            Err((1, LexerError::IntOverflow("9223372036854775808".into())))
        );
    }

    #[test]
    fn lines_are_tracked_through_comments() {
        let tokens = lex_all("a\n{ one\ntwo }\n\tb {x} c\n").unwrap();
        let lines: Vec<_> = tokens.iter().map(|&(line, _)| line).collect();

        assert_eq!(lines, [1, 4, 4, 5]);
    }

    #[test]
    fn unterminated_comment() {
        assert_eq!(
            lex_all("begin\n{ never\nclosed"),
            Err((3, LexerError::UnterminatedComment))
        );
    }

    #[test]
    fn bad_assignment_operator() {
        assert_eq!(
            lex_all("x :- 1"),
            Err((1, LexerError::BadAssign("-".into())))
        );

        assert_eq!(lex_all("x :"), Err((1, LexerError::BadAssign(String::new()))));
    }

    #[test]
    fn unknown_character() {
        assert_eq!(lex_all("x\n := 1 ! 2"), Err((2, LexerError::BadChar('!'))));
    }

    #[test]
    fn string_literals() {
        let tokens = lex_all("writeStr 'it''s'; writeStr 'a'").unwrap();

        assert_eq!(tokens[1].1, Token::StrLiteral(Rc::from("it's")));
        assert_eq!(tokens[1].1.lexeme(), "'it''s'");
        assert_eq!(tokens[4].1, Token::StrLiteral(Rc::from("a")));

        assert_eq!(
            lex_all("writeStr 'open\n'"),
            Err((1, LexerError::UnterminatedString))
        );

        assert_eq!(lex_all("writeStr ''"), Err((1, LexerError::EmptyString)));
    }

    #[test]
    fn eof_repeats() {
        let source = Source::new("test.pl0", "  ");
        let mut lexer = Lexer::new(&source);

        for _ in 0..3 {
            assert_eq!(lexer.next_token().unwrap().into_inner(), Token::Eof);
        }
    }
}
