//! Surface syntax checks for inline code fragments.
//!
//! Flow arguments such as `mapping.Assign.value` or `flow.If.condition` are
//! pasted into generated code verbatim. The compiler has no target-language
//! parser, so it checks the lexical surface: literals terminate, brackets
//! balance, and an expression does not end on an operator.

///
/// SyntaxChecker
///

pub trait SyntaxChecker {
    /// `Err` carries a short description of the first problem found.
    fn check(&self, code: &str) -> Result<(), String>;
}

///
/// NoSyntaxCheck
///

#[derive(Clone, Copy, Debug, Default)]
pub struct NoSyntaxCheck;

impl SyntaxChecker for NoSyntaxCheck {
    fn check(&self, _code: &str) -> Result<(), String> {
        Ok(())
    }
}

///
/// SurfaceSyntax
///
/// Lexical checker for C-family expression and statement fragments.
/// Fragments containing `{{` are template placeholders and always pass.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct SurfaceSyntax;

impl SyntaxChecker for SurfaceSyntax {
    fn check(&self, code: &str) -> Result<(), String> {
        let code = code.trim();
        if code.is_empty() || code.contains("{{") {
            return Ok(());
        }

        let tokens = scan(code)?;
        if is_statement_list(code) {
            return Ok(());
        }

        check_expression(&tokens)
    }
}

fn is_statement_list(code: &str) -> bool {
    code.contains(';') || code.contains("for ") || code.contains("if ")
}

#[derive(Clone, Debug)]
enum Token {
    Word,
    Literal,
    Op(String),
    Open,
    Close,
    Comma,
}

// Characters that may appear in multi-character operators.
const OP_CHARS: &str = "+-*/%&|^<>=!:.";

fn scan(code: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut stack: Vec<char> = Vec::new();
    let mut chars = code.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '"' | '\'' | '`' => {
                let mut closed = false;
                let mut escaped = false;
                for (_, n) in chars.by_ref() {
                    if escaped {
                        escaped = false;
                        continue;
                    }
                    if n == '\\' && c != '`' {
                        escaped = true;
                        continue;
                    }
                    if n == c {
                        closed = true;
                        break;
                    }
                    if n == '\n' && c != '`' {
                        break;
                    }
                }
                if !closed {
                    return Err(format!("unterminated literal starting at offset {offset}"));
                }
                tokens.push(Token::Literal);
            }
            '(' | '[' | '{' => {
                stack.push(c);
                tokens.push(Token::Open);
            }
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if stack.pop() != Some(expected) {
                    return Err(format!("unexpected '{c}' at offset {offset}"));
                }
                tokens.push(Token::Close);
            }
            ',' => tokens.push(Token::Comma),
            ';' => tokens.push(Token::Op(";".to_string())),
            c if c.is_alphanumeric() || c == '_' => {
                while chars
                    .peek()
                    .is_some_and(|(_, n)| n.is_alphanumeric() || *n == '_')
                {
                    chars.next();
                }
                tokens.push(Token::Word);
            }
            c if OP_CHARS.contains(c) => {
                let mut op = c.to_string();
                while let Some((_, n)) = chars.peek().copied() {
                    // `.` never extends an operator.
                    if OP_CHARS.contains(n) && n != '.' {
                        op.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Op(op));
            }
            other => return Err(format!("illegal character {other:?} at offset {offset}")),
        }
    }

    match stack.pop() {
        Some(open) => Err(format!("unclosed '{open}'")),
        None => Ok(tokens),
    }
}

fn check_expression(tokens: &[Token]) -> Result<(), String> {
    if let Some(Token::Op(op)) = tokens.iter().find(|t| {
        matches!(t, Token::Op(op) if op == "=" || op == ":=" || op.ends_with("++") || op.ends_with("--"))
    }) {
        return Err(format!("'{op}' is a statement, not an expression"));
    }

    match tokens.last() {
        Some(Token::Op(op)) if op != "++" && op != "--" => {
            Err(format!("expression ends with operator '{op}'"))
        }
        Some(Token::Comma) => Err("expression ends with ','".to_string()),
        _ => Ok(()),
    }
}
