//! Fragmentos de C emitidos por el traductor.
//!
//! El traductor no conoce la sintaxis de C más allá de operadores y
//! puntuación triviales. Todo fragmento con estructura fija (preámbulo,
//! encabezados de funciones y sentencias de E/S) se define aquí.

use std::io::{self, Write};

use crate::lex::Identifier;

/// Inicio fijo de todo programa traducido.
///
/// Declara el búfer de lectura de `readInt`, el índice de `writeStr`
/// y la validación numérica de entradas.
pub const PREAMBLE: &str = r#"/* PL/0 compiler output */

#include <errno.h>
#include <stdio.h>
#include <stdlib.h>
#include <string.h>

static char __stdin[24];
static long __writestridx;

static long
__pl0_parse_int(const char *text)
{
	char *end;
	long value;

	errno = 0;
	value = strtol(text, &end, 10);
	if (errno != 0 || end == text || *end != '\0') {
		(void) fprintf(stderr, "invalid number: %s\n", text);
		exit(1);
	}

	return value;
}

"#;

/// Comentario final que marca una traducción exitosa.
pub const TRAILER: &str = concat!("/* PL/0 compiler ", env!("CARGO_PKG_VERSION"), " */\n");

/// Nombres que el código generado no puede redefinir.
///
/// Incluye palabras clave de C y lo que declaran los encabezados del
/// preámbulo, junto con las extensiones POSIX y GNU más comunes.
const RESERVED: &[&str] = &[
    // Palabras clave de C
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while", "bool", "true", "false", "alignas",
    "alignof", "nullptr", "static_assert", "thread_local", "typeof", "constexpr",

    // Macros predefinidas por GCC fuera del modo estricto
    "unix", "linux", "i386",

    // <stdio.h>
    "FILE", "fpos_t", "size_t", "NULL", "EOF", "BUFSIZ", "FILENAME_MAX", "FOPEN_MAX",
    "L_tmpnam", "SEEK_CUR", "SEEK_END", "SEEK_SET", "TMP_MAX", "stdin", "stdout", "stderr",
    "remove", "rename", "renameat", "tmpfile", "tmpnam", "tempnam", "fclose", "fflush", "fopen",
    "freopen", "fdopen", "fmemopen", "open_memstream", "setbuf", "setvbuf", "setlinebuf",
    "fprintf", "fscanf", "printf", "scanf", "snprintf", "sprintf", "sscanf", "dprintf",
    "asprintf", "vfprintf", "vfscanf", "vprintf", "vscanf", "vsnprintf", "vsprintf", "vsscanf",
    "vdprintf", "vasprintf", "fgetc", "fgets", "fputc", "fputs", "getc", "getchar", "gets",
    "getw", "putw", "putc", "putchar", "puts", "ungetc", "fread", "fwrite", "fgetpos", "fseek",
    "fseeko", "fsetpos", "ftell", "ftello", "rewind", "clearerr", "feof", "ferror", "perror",
    "fileno", "getline", "getdelim", "popen", "pclose", "ctermid", "flockfile", "ftrylockfile",
    "funlockfile", "getc_unlocked", "getchar_unlocked", "putc_unlocked", "putchar_unlocked",
    "off_t", "ssize_t", "va_list",

    // <stdlib.h>
    "div_t", "ldiv_t", "lldiv_t", "wchar_t", "EXIT_FAILURE", "EXIT_SUCCESS", "MB_CUR_MAX",
    "RAND_MAX", "atof", "atoi", "atol", "atoll", "strtod", "strtof", "strtold", "strtol",
    "strtoll", "strtoul", "strtoull", "rand", "rand_r", "srand", "random", "srandom",
    "initstate", "setstate", "drand48", "erand48", "lrand48", "nrand48", "mrand48", "jrand48",
    "srand48", "seed48", "lcong48", "aligned_alloc", "calloc", "free", "malloc", "realloc",
    "reallocarray", "posix_memalign", "valloc", "alloca", "abort", "atexit", "at_quick_exit",
    "on_exit", "exit", "quick_exit", "getenv", "secure_getenv", "setenv", "unsetenv", "putenv",
    "clearenv", "system", "realpath", "mktemp", "mkstemp", "mkstemps", "mkdtemp", "bsearch",
    "qsort", "abs", "labs", "llabs", "div", "ldiv", "lldiv", "mblen", "mbtowc", "wctomb",
    "mbstowcs", "wcstombs", "ecvt", "fcvt", "gcvt", "a64l", "l64a", "getsubopt", "grantpt",
    "ptsname", "unlockpt", "posix_openpt", "getloadavg",

    // <string.h>
    "memcpy", "memmove", "memccpy", "mempcpy", "memchr", "memrchr", "memcmp", "memset",
    "strcpy", "strncpy", "stpcpy", "stpncpy", "strcat", "strncat", "strcmp", "strncmp",
    "strcoll", "strxfrm", "strchr", "strrchr", "strchrnul", "strcspn", "strspn", "strpbrk",
    "strstr", "strcasestr", "strtok", "strtok_r", "strsep", "strdup", "strndup", "strlen",
    "strnlen", "strerror", "strerror_r", "strsignal", "strcasecmp", "strncasecmp", "bcopy",
    "bzero", "bcmp", "index", "rindex", "ffs", "basename",

    // <errno.h>
    "errno",

    // Preámbulo
    "argc", "argv",
];

/// Determina si un identificador choca con un nombre de C.
///
/// Además de los nombres listados, C reserva todo identificador que
/// comienza con `__` o `_` seguido de mayúscula, y `<errno.h>` reserva
/// los que comienzan con `E` seguida de dígito o mayúscula.
pub fn is_reserved(name: &str) -> bool {
    let mut chars = name.chars();
    let reserved_prefix = match (chars.next(), chars.next()) {
        (Some('_'), Some(c)) => c == '_' || c.is_ascii_uppercase(),
        (Some('E'), Some(c)) => c.is_ascii_digit() || c.is_ascii_uppercase(),
        _ => false,
    };

    reserved_prefix || RESERVED.contains(&name)
}

/// Encabezado de un procedimiento de usuario.
pub fn procedure<W: Write>(output: &mut W, name: &Identifier) -> io::Result<()> {
    write!(output, "void\n{}(void)\n{{\n", name)
}

/// Encabezado del bloque principal.
pub fn main<W: Write>(output: &mut W) -> io::Result<()> {
    output.write_all(b"int\nmain(int argc, char *argv[])\n{\n")
}

/// Cierre de un bloque, con retorno exitoso en el caso de `main`.
pub fn epilogue<W: Write>(output: &mut W, is_main: bool) -> io::Result<()> {
    output.write_all(b";")?;
    if is_main {
        output.write_all(b"\nreturn 0;")?;
    }

    output.write_all(b"\n}\n\n")
}

pub fn write_int<W: Write>(output: &mut W, operand: &str) -> io::Result<()> {
    write!(output, "(void) fprintf(stdout, \"%ld\", (long) {});", operand)
}

pub fn write_char<W: Write>(output: &mut W, operand: &str) -> io::Result<()> {
    write!(output, "(void) fprintf(stdout, \"%c\", (unsigned char) {});", operand)
}

/// Lectura de una línea completa, validada como entero.
pub fn read_int<W: Write>(output: &mut W, target: &Identifier) -> io::Result<()> {
    output.write_all(b"if(fgets(__stdin, sizeof(__stdin), stdin) == NULL)__stdin[0] = '\\0';\n")?;
    output.write_all(
        b"if(__stdin[0] != '\\0' && __stdin[strlen(__stdin) - 1] == '\\n')\
          __stdin[strlen(__stdin) - 1] = '\\0';\n",
    )?;

    write!(output, "{}=__pl0_parse_int(__stdin);", target)
}

pub fn read_char<W: Write>(output: &mut W, target: &Identifier) -> io::Result<()> {
    write!(output, "{}=(int) fgetc(stdin);", target)
}

/// Escritura byte por byte de un arreglo, hasta un `'\0'` o su tamaño.
///
/// El límite se verifica antes de leer cada elemento.
pub fn write_array<W: Write>(output: &mut W, array: &Identifier, size: u64) -> io::Result<()> {
    output.write_all(b"__writestridx = 0;\n")?;
    writeln!(
        output,
        "while(__writestridx<{}&&{}[__writestridx]!='\\0')",
        size, array
    )?;

    write!(
        output,
        "(void) putchar((unsigned char) {}[__writestridx++]);",
        array
    )
}

pub fn write_literal<W: Write>(output: &mut W, text: &str) -> io::Result<()> {
    write!(output, "(void) fputs({}, stdout);", string_literal(text))
}

/// Construye una cadena literal de C equivalente a `text`.
///
/// Todo byte fuera de ASCII imprimible se escribe como escape octal de
/// tres dígitos, lo cual evita ambigüedad con el carácter que le sigue.
pub fn string_literal(text: &str) -> String {
    let mut literal = String::with_capacity(text.len() + 2);
    literal.push('"');

    for &byte in text.as_bytes() {
        match byte {
            b'"' => literal.push_str("\\\""),
            b'\\' => literal.push_str("\\\\"),
            b'?' => literal.push_str("\\?"),
            b' '..=b'~' => literal.push(char::from(byte)),
            _ => literal.push_str(&format!("\\{:03o}", byte)),
        }
    }

    literal.push('"');
    literal
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render<F>(callback: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        let mut output = Vec::new();
        callback(&mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn escapes_string_literals() {
        assert_eq!(string_literal("hello"), r#""hello""#);
        assert_eq!(string_literal(r#"say "hi"\"#), r#""say \"hi\"\\""#);
        assert_eq!(string_literal("tab\there"), r#""tab\011here""#);
        assert_eq!(string_literal("??="), r#""\?\?=""#);
        assert_eq!(string_literal("ñ"), r#""\303\261""#);
    }

    #[test]
    fn reserved_names() {
        for name in ["errno", "puts", "printf", "int", "stdout", "index", "EOF", "ERANGE"] {
            assert!(is_reserved(name), "{}", name);
        }

        for name in ["__stdin", "__writestridx", "_Bool"] {
            assert!(is_reserved(name), "{}", name);
        }

        for name in ["x", "count", "step", "_y1", "Each", "E", "putsx"] {
            assert!(!is_reserved(name), "{}", name);
        }
    }

    #[test]
    fn epilogues() {
        assert_eq!(render(|out| epilogue(out, true)), ";\nreturn 0;\n}\n\n");
        assert_eq!(render(|out| epilogue(out, false)), ";\n}\n\n");
    }

    #[test]
    fn array_output_is_bounded() {
        let text = render(|out| write_array(out, &Identifier::new("buf"), 8));

        assert_eq!(
            text,
            "__writestridx = 0;\n\
             while(__writestridx<8&&buf[__writestridx]!='\\0')\n\
             (void) putchar((unsigned char) buf[__writestridx++]);"
        );
    }

    #[test]
    fn trailer_carries_version() {
        assert!(TRAILER.starts_with("/* PL/0 compiler "));
        assert!(TRAILER.ends_with(" */\n"));
        assert!(TRAILER.contains(env!("CARGO_PKG_VERSION")));
    }
}
