//! Análisis sintáctico, análisis semántico y emisión en una sola pasada.
//!
//! # Traducción dirigida por sintaxis
//! No existe un árbol sintáctico. Cada producción de la gramática es un
//! método de [`Translator`] que consume tokens del [`Lexer`] bajo demanda,
//! valida nombres contra la [`SymbolTable`] y escribe fragmentos de C en
//! cuanto el token correspondiente se confirma como lookahead, antes de
//! avanzar más allá de él. Por tanto, el orden de la salida refleja
//! exactamente el orden de reconocimiento.
//!
//! ```text
//! program    = block "." .
//! block      = [ "const" ident "=" number { "," ident "=" number } ";" ]
//!              [ "var" ident [ "size" number ] { "," ident [ "size" number ] } ";" ]
//!              { "procedure" ident ";" block ";" } statement .
//! statement  = [ ident [ "[" expression "]" ] ":=" expression
//!              | "call" ident
//!              | "begin" statement { ";" statement } "end"
//!              | "if" condition "then" statement
//!              | "while" condition "do" statement
//!              | ( "writeInt" | "writeChar" ) ( ident | number )
//!              | ( "readInt" | "readChar" ) [ "into" ] ident
//!              | "writeStr" ( ident | string ) ] .
//! condition  = "odd" expression
//!            | expression ( "=" | "#" | "<" | ">" ) expression .
//! expression = [ "+" | "-" ] term { ( "+" | "-" ) term } .
//! term       = factor { ( "*" | "/" ) factor } .
//! factor     = ident [ "[" expression "]" ] | number | "(" expression ")" .
//! ```
//!
//! # Errores
//! La traducción se detiene en el primer error. Lo que ya se haya
//! escrito a la salida permanece escrito.

use std::{
    io::{self, Write},
    rc::Rc,
};

use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    lex::{Identifier, Keyword, Lexer, LexerError, Token},
    source::{Located, Location, Source},
    symbol::{Kind, Role, SemanticError, SymbolTable, MAX_DEPTH},
    target,
};

pub type Translate<T> = Result<T, Located<TranslateError>>;

/// Cualquier error que detiene una traducción.
#[derive(Error, Debug)]
pub enum TranslateError {
    #[error(transparent)]
    Lexer(#[from] LexerError),

    #[error(transparent)]
    Parser(#[from] ParserError),

    #[error(transparent)]
    Semantic(#[from] SemanticError),

    #[error(transparent)]
    Internal(#[from] InternalError),

    #[error("Failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl TranslateError {
    /// Categoría del error, tal como se reporta al usuario.
    pub fn kind(&self) -> &'static str {
        match self {
            TranslateError::Lexer(_) => "lexical error",
            TranslateError::Parser(_) => "syntax error",
            TranslateError::Semantic(_) => "semantic error",
            TranslateError::Internal(_) => "internal error",
            TranslateError::Output(_) => "output error",
        }
    }

    /// Determina si el error indica un defecto del traductor mismo.
    pub fn is_internal(&self) -> bool {
        matches!(self, TranslateError::Internal(_))
    }
}

#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParserError {
    #[error("Expected {0}, found {1} instead")]
    UnexpectedToken(Token, Token),

    #[error("Expected identifier, found {0} instead")]
    ExpectedId(Token),

    #[error("Expected number, found {0} instead")]
    ExpectedNumber(Token),

    #[error("Invalid conditional, expected any of `=`, `#`, `<`, `>`, found {0}")]
    InvalidConditional(Token),

    #[error("Expected an expression, found {0} instead")]
    ExpectedFactor(Token),

    #[error("`{0}` takes an identifier or a number, found {1}")]
    ExpectedIntOperand(Keyword, Token),

    #[error("`writeStr` takes an array or a string, found {0}")]
    ExpectedStrOperand(Token),

    #[error("Extra tokens at end of file, found {0}")]
    TrailingTokens(Token),
}

/// Violación de una invariante del traductor.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum InternalError {
    #[error("Nesting depth fell below 0")]
    DepthUnderflow,
}

/// Traduce un programa completo, escribiendo C a `output`.
pub fn translate<W: Write>(source: &Rc<Source>, output: W) -> Translate<()> {
    debug!(source = source.name(), "translating");

    let mut translator = Translator {
        lexer: Lexer::new(source),
        token: Located::at(Token::Eof, Location::start(source)),
        symbols: SymbolTable::new(),
        depth: 0,
        output,
    };

    translator.program()
}

/// Lista los tokens de un programa sin traducirlo, uno por línea.
pub fn dump_tokens<W: Write>(source: &Rc<Source>, mut output: W) -> Translate<()> {
    let mut last = Location::start(source);

    for result in Lexer::new(source) {
        let token = result.map_err(|error| error.map(TranslateError::from))?;
        let (location, token) = token.split();

        let written = match token {
            Token::Eof => Ok(()),
            Token::Id(_) | Token::Keyword(_) | Token::IntLiteral(..) => writeln!(
                output,
                "({}|{}) '{}'",
                location.line(),
                token.name(),
                token.lexeme()
            ),

            _ => writeln!(
                output,
                "({}|{}) {}",
                location.line(),
                token.name(),
                token.lexeme()
            ),
        };

        written.map_err(|error| Located::at(TranslateError::from(error), location.clone()))?;
        last = location;
    }

    output
        .flush()
        .map_err(|error| Located::at(TranslateError::from(error), last))
}

/// Bloque que se está traduciendo.
#[derive(Copy, Clone, PartialEq, Eq)]
enum Block {
    /// Bloque externo, traducido como `main()`.
    Program,

    /// Cuerpo de un procedimiento.
    Procedure,
}

/// Contexto de una traducción en curso.
///
/// Incluye el cursor (lexer y token de lookahead), la profundidad de
/// anidamiento, la tabla de símbolos y el destino de la salida.
struct Translator<'a, W: Write> {
    lexer: Lexer<'a>,
    token: Located<Token>,
    symbols: SymbolTable,
    depth: u32,
    output: W,
}

impl<W: Write> Translator<'_, W> {
    fn program(&mut self) -> Translate<()> {
        self.sink(|output| output.write_all(target::PREAMBLE.as_bytes()))?;

        self.next()?;
        self.block(Block::Program)?;
        self.expect(Token::Period)?;

        if *self.token.as_ref() != Token::Eof {
            let found = self.token.as_ref().clone();
            return self.fail(ParserError::TrailingTokens(found));
        }

        self.sink(|output| {
            output.write_all(target::TRAILER.as_bytes())?;
            output.flush()
        })
    }

    fn block(&mut self, block: Block) -> Translate<()> {
        if self.depth > MAX_DEPTH {
            return self.fail(SemanticError::NestingDepthExceeded);
        }

        self.depth += 1;
        trace!(depth = self.depth, "entering block");

        if self.peek_keyword(Keyword::Const) {
            self.constants()?;
        }

        if self.peek_keyword(Keyword::Var) {
            self.variables()?;
        }

        while self.peek_keyword(Keyword::Procedure) {
            self.procedure()?;
        }

        if block == Block::Program {
            self.sink(target::main)?;
        }

        self.statement()?;
        self.sink(|output| target::epilogue(output, block == Block::Program))?;

        self.depth = match self.depth.checked_sub(1) {
            Some(depth) => depth,
            None => return self.fail(InternalError::DepthUnderflow),
        };

        Ok(())
    }

    fn constants(&mut self) -> Translate<()> {
        self.keyword(Keyword::Const)?;

        loop {
            let name = self.id()?;
            self.declare(&name, Kind::Constant)?;
            emit!(self, "const long {}=", name)?;
            self.next()?;

            self.expect(Token::Equal)?;

            let value = self.number()?;
            emit!(self, "{};\n", value)?;
            self.next()?;

            if !self.take(Token::Comma)? {
                break self.expect(Token::Semicolon);
            }
        }
    }

    fn variables(&mut self) -> Translate<()> {
        self.keyword(Keyword::Var)?;

        loop {
            let name = self.id()?;
            self.declare(&name, Kind::Variable)?;
            emit!(self, "long {}", name)?;
            self.next()?;

            if self.peek_keyword(Keyword::Size) {
                self.next()?;

                let size = self.number()?;
                let recorded = self.symbols.record_array_size(size);
                let size = self.located(recorded)?;
                emit!(self, "[{}]", size)?;
                self.next()?;
            }

            emit!(self, ";\n")?;

            if !self.take(Token::Comma)? {
                break;
            }
        }

        self.expect(Token::Semicolon)?;
        emit!(self, "\n")
    }

    fn procedure(&mut self) -> Translate<()> {
        self.keyword(Keyword::Procedure)?;

        // El símbolo se declara antes del cuerpo, lo cual permite recursión
        let name = self.id()?;
        self.declare(&name, Kind::Procedure)?;
        self.sink(|output| target::procedure(output, &name))?;
        self.next()?;

        debug!(procedure = %name, line = self.token.location().line(), "procedure");

        self.expect(Token::Semicolon)?;
        self.block(Block::Procedure)?;
        self.expect(Token::Semicolon)?;

        self.symbols.close_scope();
        trace!(procedure = %name, symbols = self.symbols.len(), "closed scope");

        Ok(())
    }

    fn statement(&mut self) -> Translate<()> {
        let keyword = match self.token.as_ref() {
            Token::Id(_) => return self.assignment(),
            Token::Keyword(keyword) => *keyword,

            // Sentencia vacía
            _ => return Ok(()),
        };

        match keyword {
            Keyword::Call => self.call(),
            Keyword::Begin => self.compound(),
            Keyword::If => self.if_statement(),
            Keyword::While => self.while_statement(),
            Keyword::WriteInt | Keyword::WriteChar => self.write_value(keyword),
            Keyword::ReadInt | Keyword::ReadChar => self.read(keyword),
            Keyword::WriteStr => self.write_str(),
            _ => Ok(()),
        }
    }

    fn assignment(&mut self) -> Translate<()> {
        let name = self.id()?;
        self.check(&name, Role::Variable)?;
        emit!(self, "{}", name)?;
        self.next()?;

        if *self.token.as_ref() == Token::OpenSquare {
            self.index(&name)?;
        } else {
            self.scalar(&name)?;
        }

        self.accept(Token::Assign, "=")?;
        self.expression()
    }

    fn call(&mut self) -> Translate<()> {
        self.keyword(Keyword::Call)?;

        let name = self.id()?;
        self.check(&name, Role::Procedure)?;
        emit!(self, "{}();\n", name)?;
        self.next()
    }

    fn compound(&mut self) -> Translate<()> {
        self.accept(Token::Keyword(Keyword::Begin), "{\n")?;
        self.statement()?;

        while *self.token.as_ref() == Token::Semicolon {
            self.accept(Token::Semicolon, ";\n")?;
            self.statement()?;
        }

        self.accept(Token::Keyword(Keyword::End), ";\n}\n")
    }

    fn if_statement(&mut self) -> Translate<()> {
        self.accept(Token::Keyword(Keyword::If), "if(")?;
        self.condition()?;
        self.accept(Token::Keyword(Keyword::Then), ")\n")?;
        self.statement()
    }

    fn while_statement(&mut self) -> Translate<()> {
        self.accept(Token::Keyword(Keyword::While), "while(")?;
        self.condition()?;
        self.accept(Token::Keyword(Keyword::Do), ")\n")?;
        self.statement()
    }

    /// `writeInt` y `writeChar`, que aceptan un nombre o una constante.
    fn write_value(&mut self, keyword: Keyword) -> Translate<()> {
        self.keyword(keyword)?;

        let operand = match self.token.as_ref() {
            Token::Id(name) => {
                let name = name.clone();
                self.check(&name, Role::Value)?;
                self.scalar(&name)?;
                name.to_string()
            }

            Token::IntLiteral(integer, _) => integer.to_string(),

            other => {
                let found = other.clone();
                return self.fail(ParserError::ExpectedIntOperand(keyword, found));
            }
        };

        match keyword {
            Keyword::WriteInt => self.sink(|output| target::write_int(output, &operand))?,
            _ => self.sink(|output| target::write_char(output, &operand))?,
        }

        self.next()
    }

    /// `readInt` y `readChar`, con `into` opcional.
    fn read(&mut self, keyword: Keyword) -> Translate<()> {
        self.keyword(keyword)?;
        self.take(Token::Keyword(Keyword::Into))?;

        let name = self.id()?;
        self.check(&name, Role::Variable)?;
        self.scalar(&name)?;

        match keyword {
            Keyword::ReadInt => self.sink(|output| target::read_int(output, &name))?,
            _ => self.sink(|output| target::read_char(output, &name))?,
        }

        self.next()
    }

    fn write_str(&mut self) -> Translate<()> {
        self.keyword(Keyword::WriteStr)?;

        match self.token.as_ref().clone() {
            Token::Id(name) => {
                self.check(&name, Role::Variable)?;
                let size = self.located(self.symbols.array_size(&name))?;
                self.sink(|output| target::write_array(output, &name, size))?;
            }

            Token::StrLiteral(text) => {
                self.sink(|output| target::write_literal(output, &text))?;
            }

            other => return self.fail(ParserError::ExpectedStrOperand(other)),
        }

        self.next()
    }

    fn condition(&mut self) -> Translate<()> {
        if self.peek_keyword(Keyword::Odd) {
            self.accept(Token::Keyword(Keyword::Odd), "(")?;
            self.expression()?;
            return emit!(self, ")&1");
        }

        self.expression()?;

        let operator = match self.token.as_ref() {
            Token::Equal => "==",
            Token::Hash => "!=",
            Token::Less => "<",
            Token::Greater => ">",
            other => {
                let found = other.clone();
                return self.fail(ParserError::InvalidConditional(found));
            }
        };

        emit!(self, "{}", operator)?;
        self.next()?;
        self.expression()
    }

    fn expression(&mut self) -> Translate<()> {
        if let Some(sign) = self.additive() {
            emit!(self, "{}", sign)?;
            self.next()?;
        }

        self.term()?;
        while let Some(operator) = self.additive() {
            emit!(self, "{}", operator)?;
            self.next()?;
            self.term()?;
        }

        Ok(())
    }

    fn term(&mut self) -> Translate<()> {
        self.factor()?;
        while let Some(operator) = self.multiplicative() {
            emit!(self, "{}", operator)?;
            self.next()?;
            self.factor()?;
        }

        Ok(())
    }

    fn factor(&mut self) -> Translate<()> {
        match self.token.as_ref() {
            Token::Id(name) => {
                let name = name.clone();
                self.check(&name, Role::Value)?;
                emit!(self, "{}", name)?;
                self.next()?;

                if *self.token.as_ref() == Token::OpenSquare {
                    self.index(&name)
                } else {
                    self.scalar(&name)
                }
            }

            Token::IntLiteral(integer, _) => {
                let integer = *integer;
                emit!(self, "{}", integer)?;
                self.next()
            }

            Token::OpenParen => {
                self.accept(Token::OpenParen, "(")?;
                self.expression()?;
                self.accept(Token::CloseParen, ")")
            }

            other => {
                let found = other.clone();
                self.fail(ParserError::ExpectedFactor(found))
            }
        }
    }

    /// Subíndice de un arreglo ya emitido.
    fn index(&mut self, name: &Identifier) -> Translate<()> {
        self.located(self.symbols.array_size(name))?;

        self.accept(Token::OpenSquare, "[")?;
        self.expression()?;
        self.accept(Token::CloseSquare, "]")
    }

    fn additive(&self) -> Option<&'static str> {
        match self.token.as_ref() {
            Token::Plus => Some("+"),
            Token::Minus => Some("-"),
            _ => None,
        }
    }

    fn multiplicative(&self) -> Option<&'static str> {
        match self.token.as_ref() {
            Token::Times => Some("*"),
            Token::Slash => Some("/"),
            _ => None,
        }
    }

    fn declare(&mut self, name: &Identifier, kind: Kind) -> Translate<()> {
        if target::is_reserved(name.as_ref()) {
            return self.fail(SemanticError::ReservedName(name.clone()));
        }

        let declared = self.symbols.declare(name, kind, self.depth).map(|_| ());
        self.located(declared)
    }

    fn check(&self, name: &Identifier, role: Role) -> Translate<()> {
        self.located(self.symbols.check(name, role).map(|_| ()))
    }

    fn scalar(&self, name: &Identifier) -> Translate<()> {
        self.located(self.symbols.check_scalar(name))
    }

    /// Obtiene el identificador de lookahead sin consumirlo.
    fn id(&self) -> Translate<Identifier> {
        match self.token.as_ref() {
            Token::Id(id) => Ok(id.clone()),
            other => self.fail(ParserError::ExpectedId(other.clone())),
        }
    }

    /// Obtiene la constante de lookahead sin consumirla.
    fn number(&self) -> Translate<i64> {
        match self.token.as_ref() {
            Token::IntLiteral(integer, _) => Ok(*integer),
            other => self.fail(ParserError::ExpectedNumber(other.clone())),
        }
    }

    fn peek_keyword(&self, keyword: Keyword) -> bool {
        *self.token.as_ref() == Token::Keyword(keyword)
    }

    /// Consume el token de lookahead solamente si es `token`.
    fn take(&mut self, token: Token) -> Translate<bool> {
        if *self.token.as_ref() == token {
            self.next()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Confirma `token`, emite su traducción y lo consume.
    fn accept(&mut self, token: Token, fragment: &str) -> Translate<()> {
        self.confirm(&token)?;
        self.sink(|output| output.write_all(fragment.as_bytes()))?;
        self.next()
    }

    fn keyword(&mut self, keyword: Keyword) -> Translate<()> {
        self.expect(Token::Keyword(keyword))
    }

    fn expect(&mut self, token: Token) -> Translate<()> {
        self.confirm(&token)?;
        self.next()
    }

    fn confirm(&self, token: &Token) -> Translate<()> {
        let found = self.token.as_ref();
        if found == token {
            Ok(())
        } else {
            self.fail(ParserError::UnexpectedToken(token.clone(), found.clone()))
        }
    }

    /// Avanza el cursor, reemplazando el token de lookahead.
    fn next(&mut self) -> Translate<()> {
        self.token = self
            .lexer
            .next_token()
            .map_err(|error| error.map(TranslateError::from))?;

        Ok(())
    }

    /// Escribe a la salida.
    fn sink<F>(&mut self, write: F) -> Translate<()>
    where
        F: FnOnce(&mut W) -> io::Result<()>,
    {
        match write(&mut self.output) {
            Ok(()) => Ok(()),
            Err(error) => self.fail(error),
        }
    }

    fn located<T, E>(&self, result: Result<T, E>) -> Translate<T>
    where
        E: Into<TranslateError>,
    {
        result.or_else(|error| self.fail(error))
    }

    fn fail<T, E>(&self, error: E) -> Translate<T>
    where
        E: Into<TranslateError>,
    {
        Err(Located::at(error.into(), self.token.location().clone()))
    }
}
