use plc_compiler::{lex, parse, Analyzer, Expression, Generator, Literal, Parser, Source};

fn analyzed(text: &str) -> Source {
    let tokens = lex(text).unwrap_or_else(|err| panic!("lexing {text:?}: {err:?}"));
    let mut source = parse(tokens).unwrap_or_else(|err| panic!("parsing {text:?}: {err:?}"));
    Analyzer::new()
        .analyze(&mut source)
        .unwrap_or_else(|err| panic!("analyzing {text:?}: {err}"));
    source
}

fn generate(text: &str) -> String {
    Generator::new().generate(&analyzed(text))
}

fn statement(text: &str) -> String {
    let tokens = lex(text).expect("statement lexes");
    let statement = Parser::new(tokens)
        .parse_statement()
        .expect("statement parses");
    Generator::new().statement(&statement)
}

fn expression(text: &str) -> String {
    let tokens = lex(text).expect("expression lexes");
    let expression = Parser::new(tokens)
        .parse_expression()
        .expect("expression parses");
    Generator::new().expression(&expression)
}

fn lines(lines: &[&str]) -> String {
    lines.join("\n")
}

#[test]
fn generates_hello_world() {
    assert_eq!(
        generate("FUN main(): Integer DO print(\"Hello, World!\"); RETURN 0; END"),
        lines(&[
            "public class Main {",
            "",
            "    public static void main(String[] args) {",
            "        System.exit(new Main().main());",
            "    }",
            "",
            "    int main() {",
            "        System.out.println(\"Hello, World!\");",
            "        return 0;",
            "    }",
            "",
            "}",
        ])
    );
}

#[test]
fn generates_globals_before_the_entry_point() {
    assert_eq!(
        generate(
            "VAR x: Integer = 1;\nVAL y = 10;\nLIST list: Decimal = [1.0, 2.5];\nFUN main(): Integer DO RETURN x + y; END"
        ),
        lines(&[
            "public class Main {",
            "",
            "    int x = 1;",
            "    final int y = 10;",
            "    double[] list = {1.0, 2.5};",
            "",
            "    public static void main(String[] args) {",
            "        System.exit(new Main().main());",
            "    }",
            "",
            "    int main() {",
            "        return x + y;",
            "    }",
            "",
            "}",
        ])
    );
}

#[test]
fn separates_functions_with_blank_lines() {
    assert_eq!(
        generate(
            "FUN area(w: Decimal, h: Decimal): Decimal DO RETURN w * h; END\nFUN main(): Integer DO IF area(1.0, 2.0) > 1.0 DO RETURN 1; END RETURN 0; END"
        ),
        lines(&[
            "public class Main {",
            "",
            "    public static void main(String[] args) {",
            "        System.exit(new Main().main());",
            "    }",
            "",
            "    double area(double w, double h) {",
            "        return w * h;",
            "    }",
            "",
            "    int main() {",
            "        if (area(1.0, 2.0) > 1.0) {",
            "            return 1;",
            "        }",
            "        return 0;",
            "    }",
            "",
            "}",
        ])
    );
}

#[test]
fn generates_declarations() {
    let source = analyzed(
        "FUN main(): Integer DO LET name: String; LET ratio = 1.5; LET flag = TRUE; RETURN 0; END",
    );
    let rendered: Vec<_> = source.functions[0]
        .body
        .iter()
        .map(|statement| Generator::new().statement(statement))
        .collect();
    assert_eq!(
        rendered,
        vec![
            "String name;",
            "double ratio = 1.5;",
            "boolean flag = true;",
            "return 0;",
        ]
    );
}

#[test]
fn falls_back_to_source_names_without_analysis() {
    assert_eq!(statement("LET x: Integer = 1;"), "int x = 1;");
    assert_eq!(statement("LET x = 1;"), "Object x = 1;");
    assert_eq!(statement("print(x);"), "print(x);");

    let tokens = lex("FUN f(a) DO END").expect("function lexes");
    let function = Parser::new(tokens)
        .parse_function()
        .expect("function parses");
    assert_eq!(Generator::new().function(&function), "Void f(Object a) {}");
}

#[test]
fn generates_immutable_globals_as_final() {
    let source = analyzed("VAL name: String = \"plc\"; FUN main(): Integer DO RETURN 0; END");
    assert_eq!(
        Generator::new().global(&source.globals[0]),
        "final String name = \"plc\";"
    );
}

#[test]
fn generates_if_statements() {
    assert_eq!(
        statement("IF x DO a(); END"),
        lines(&["if (x) {", "    a();", "}"])
    );
    assert_eq!(
        statement("IF x DO a(); ELSE b(); END"),
        lines(&["if (x) {", "    a();", "} else {", "    b();", "}"])
    );
}

#[test]
fn generates_switch_statements() {
    assert_eq!(
        statement("SWITCH x CASE 1: a(); CASE 2: DEFAULT b(); END"),
        lines(&[
            "switch (x) {",
            "    case 1:",
            "        a();",
            "        break;",
            "    case 2:",
            "        break;",
            "    default:",
            "        b();",
            "}",
        ])
    );
}

#[test]
fn generates_while_loops() {
    assert_eq!(statement("WHILE TRUE DO END"), "while (true) {}");
    assert_eq!(
        statement("WHILE i < 10 DO i = i + 1; END"),
        lines(&["while (i < 10) {", "    i = i + 1;", "}"])
    );
}

#[test]
fn generates_assignments() {
    assert_eq!(statement("x = 1;"), "x = 1;");
    assert_eq!(statement("list[i + 1] = 'c';"), "list[i + 1] = 'c';");
}

#[test]
fn generates_expressions() {
    assert_eq!(expression("NIL"), "null");
    assert_eq!(expression("FALSE || TRUE && x"), "false || true && x");
    assert_eq!(expression("(1 + 2) * 3"), "(1 + 2) * 3");
    assert_eq!(expression("2 ^ 3 ^ 2"), "Math.pow(Math.pow(2, 3), 2)");
    assert_eq!(expression("f(1, g(), -2.50)"), "f(1, g(), -2.50)");
    assert_eq!(expression("x != 'a'"), "x != 'a'");
}

#[test]
fn escapes_literals() {
    assert_eq!(expression("\"a\\\"b\\n\""), "\"a\\\"b\\n\"");
    assert_eq!(expression("'\\''"), "'\\''");
    assert_eq!(expression("'\"'"), "'\"'");
    assert_eq!(
        Generator::new().expression(&Expression::literal(Literal::String("tab\there\\".into()))),
        "\"tab\\there\\\\\""
    );
}
