use std::path::Path;

use pl0c::{
    source::Source,
    target::{PREAMBLE, TRAILER},
    translate::{dump_tokens, translate},
};

fn demo(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos").join(name);
    let source = Source::read(&path).unwrap();

    let mut output = Vec::new();
    if let Err(error) = translate(&source, &mut output) {
        panic!("{}: {}", error.location(), error.as_ref());
    }

    String::from_utf8(output).unwrap()
}

#[test]
fn demos_translate() {
    for name in ["hello.pl0", "fibonacci.pl0", "parity.pl0"] {
        let output = demo(name);

        assert!(output.starts_with(PREAMBLE), "{}", name);
        assert!(output.ends_with(TRAILER), "{}", name);
        assert_eq!(output.matches("int\nmain(int argc, char *argv[])\n{\n").count(), 1);
    }
}

#[test]
fn hello() {
    let output = demo("hello.pl0");

    assert!(output.contains("long msg[6];\nlong i;\n"));
    assert!(output.contains("(void) fputs(\"Hola, \", stdout);"));
    assert!(output.contains("msg[i]=109+i;\n"));
    assert!(output.contains("while(__writestridx<6&&msg[__writestridx]!='\\0')"));
}

#[test]
fn fibonacci() {
    let output = demo("fibonacci.pl0");

    assert!(output.contains("const long limit=90;\n"));
    assert!(output.contains("void\nstep(void)\n{\n"));
    assert!(output.contains("if(n>limit)\nn=limit;\n"));
    assert!(output.contains("step();\n"));
}

#[test]
fn recursive_procedure() {
    let output = demo("parity.pl0");

    let body = output.find("void\nflip(void)").unwrap();
    let call = output.rfind("flip();").unwrap();
    assert!(body < call);
    assert!(output.contains("if(parity==1)\n(void) fputs(\"odd\", stdout);"));
}

#[test]
fn token_listing_keeps_number_digits() {
    let source = Source::new("listing.pl0", "{ nada }\nwriteInt 0_42 .");
    let mut output = Vec::new();

    dump_tokens(&source, &mut output).unwrap();
    assert_eq!(
        String::from_utf8(output).unwrap(),
        "(2|WRITEINT) 'writeInt'\n(2|NUMBER) '042'\n(2|DOT) .\n"
    );
}
