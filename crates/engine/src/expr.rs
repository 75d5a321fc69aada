//! Configuration-expression evaluator (§4.7.1): integer literals (decimal or
//! `0x`-prefixed hex), named config references, and the operators
//! `+ - * / % & | ^ ~ << >> ( )`, evaluated as wrapping 64-bit signed
//! integers. Evaluation is a single left-to-right descent over a token
//! stream producing both the value and the set of names it touched, so a
//! caller can maintain a reference graph without re-walking the text.
//!
//! Open question (c): the source leaves overflow behavior unspecified;
//! this implementation wraps (two's-complement), matching Rust's
//! `wrapping_*` operators.

use std::collections::HashSet;

/// A parsed and evaluated expression: its value plus every config name it
/// referenced (duplicates collapsed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluated {
    pub value: i64,
    pub referenced: HashSet<String>,
}

/// Evaluates `text`, resolving named references through `resolve`. A name
/// `resolve` doesn't recognize still contributes `0` to the arithmetic and is
/// still recorded as referenced — callers (configlib.add/update) are
/// responsible for rejecting unresolved references themselves, mirroring the
/// two-step check the original `configlib.add` performs (parse, then a
/// separate existence scan over the referenced set).
pub fn evaluate(text: &str, resolve: &dyn Fn(&str) -> Option<i64>) -> Result<Evaluated, String> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err("empty expression".to_string());
    }
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        resolve,
        referenced: HashSet::new(),
    };
    let value = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(format!("unexpected trailing token at position {}", parser.pos));
    }
    Ok(Evaluated {
        value,
        referenced: parser.referenced,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Number(i64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,
    LParen,
    RParen,
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '+' => {
                out.push(Token::Plus);
                i += 1;
            }
            '-' => {
                out.push(Token::Minus);
                i += 1;
            }
            '*' => {
                out.push(Token::Star);
                i += 1;
            }
            '/' => {
                out.push(Token::Slash);
                i += 1;
            }
            '%' => {
                out.push(Token::Percent);
                i += 1;
            }
            '&' => {
                out.push(Token::Amp);
                i += 1;
            }
            '|' => {
                out.push(Token::Pipe);
                i += 1;
            }
            '^' => {
                out.push(Token::Caret);
                i += 1;
            }
            '~' => {
                out.push(Token::Tilde);
                i += 1;
            }
            '(' => {
                out.push(Token::LParen);
                i += 1;
            }
            ')' => {
                out.push(Token::RParen);
                i += 1;
            }
            '<' if chars.get(i + 1) == Some(&'<') => {
                out.push(Token::Shl);
                i += 2;
            }
            '>' if chars.get(i + 1) == Some(&'>') => {
                out.push(Token::Shr);
                i += 2;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                if c == '0' && chars.get(i + 1) == Some(&'x') {
                    i += 2;
                    let hex_start = i;
                    while i < chars.len() && chars[i].is_ascii_hexdigit() {
                        i += 1;
                    }
                    let digits: String = chars[hex_start..i].iter().collect();
                    let value = i64::from_str_radix(&digits, 16)
                        .map_err(|e| format!("invalid hex literal: {e}"))?;
                    out.push(Token::Number(value));
                } else {
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                    let digits: String = chars[start..i].iter().collect();
                    let value = digits
                        .parse::<i64>()
                        .map_err(|e| format!("invalid integer literal: {e}"))?;
                    out.push(Token::Number(value));
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                out.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
    }
    Ok(out)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    resolve: &'a dyn Fn(&str) -> Option<i64>,
    referenced: HashSet<String>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        self.pos += 1;
        t
    }

    // Precedence, loosest to tightest: | , ^ , & , << >> , + - , * / % , unary.
    fn parse_or(&mut self) -> Result<i64, String> {
        let mut lhs = self.parse_xor()?;
        while matches!(self.peek(), Some(Token::Pipe)) {
            self.bump();
            let rhs = self.parse_xor()?;
            lhs |= rhs;
        }
        Ok(lhs)
    }

    fn parse_xor(&mut self) -> Result<i64, String> {
        let mut lhs = self.parse_and()?;
        while matches!(self.peek(), Some(Token::Caret)) {
            self.bump();
            let rhs = self.parse_and()?;
            lhs ^= rhs;
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<i64, String> {
        let mut lhs = self.parse_shift()?;
        while matches!(self.peek(), Some(Token::Amp)) {
            self.bump();
            let rhs = self.parse_shift()?;
            lhs &= rhs;
        }
        Ok(lhs)
    }

    fn parse_shift(&mut self) -> Result<i64, String> {
        let mut lhs = self.parse_additive()?;
        loop {
            match self.peek() {
                Some(Token::Shl) => {
                    self.bump();
                    let rhs = self.parse_additive()?;
                    lhs = lhs.wrapping_shl(shift_amount(rhs)?);
                }
                Some(Token::Shr) => {
                    self.bump();
                    let rhs = self.parse_additive()?;
                    lhs = lhs.wrapping_shr(shift_amount(rhs)?);
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<i64, String> {
        let mut lhs = self.parse_term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.bump();
                    lhs = lhs.wrapping_add(self.parse_term()?);
                }
                Some(Token::Minus) => {
                    self.bump();
                    lhs = lhs.wrapping_sub(self.parse_term()?);
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<i64, String> {
        let mut lhs = self.parse_unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.bump();
                    lhs = lhs.wrapping_mul(self.parse_unary()?);
                }
                Some(Token::Slash) => {
                    self.bump();
                    let rhs = self.parse_unary()?;
                    if rhs == 0 {
                        return Err("division by zero".to_string());
                    }
                    lhs = lhs.wrapping_div(rhs);
                }
                Some(Token::Percent) => {
                    self.bump();
                    let rhs = self.parse_unary()?;
                    if rhs == 0 {
                        return Err("modulo by zero".to_string());
                    }
                    lhs = lhs.wrapping_rem(rhs);
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<i64, String> {
        match self.peek() {
            Some(Token::Minus) => {
                self.bump();
                Ok(self.parse_unary()?.wrapping_neg())
            }
            Some(Token::Tilde) => {
                self.bump();
                Ok(!self.parse_unary()?)
            }
            Some(Token::Plus) => {
                self.bump();
                self.parse_unary()
            }
            _ => self.parse_atom(),
        }
    }

    fn parse_atom(&mut self) -> Result<i64, String> {
        match self.bump().cloned() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::Ident(name)) => {
                let value = (self.resolve)(&name).unwrap_or(0);
                let _ = self.referenced.insert(name);
                Ok(value)
            }
            Some(Token::LParen) => {
                let value = self.parse_or()?;
                match self.bump() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err("expected ')'".to_string()),
                }
            }
            other => Err(format!("unexpected token: {other:?}")),
        }
    }
}

fn shift_amount(rhs: i64) -> Result<u32, String> {
    u32::try_from(rhs.rem_euclid(64)).map_err(|e| format!("invalid shift amount: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_refs(_: &str) -> Option<i64> {
        None
    }

    #[test]
    fn arithmetic_precedence() {
        let r = evaluate("2 + 3 * 4", &no_refs).unwrap();
        assert_eq!(r.value, 14);
    }

    #[test]
    fn hex_literal_and_bitops() {
        let r = evaluate("0xff & 0x0f | 0x100", &no_refs).unwrap();
        assert_eq!(r.value, 0x10f);
    }

    #[test]
    fn references_collected_even_when_unresolved() {
        let r = evaluate("WIDTH * 2", &no_refs).unwrap();
        assert_eq!(r.value, 0);
        assert!(r.referenced.contains("WIDTH"));
    }

    #[test]
    fn resolves_named_references() {
        let resolve = |name: &str| if name == "WIDTH" { Some(8) } else { None };
        let r = evaluate("WIDTH * 2 + 1", &resolve).unwrap();
        assert_eq!(r.value, 17);
    }

    #[test]
    fn wraps_on_overflow() {
        let r = evaluate("9223372036854775807 + 1", &no_refs).unwrap();
        assert_eq!(r.value, i64::MIN);
    }

    #[test]
    fn division_by_zero_errors() {
        assert!(evaluate("1 / 0", &no_refs).is_err());
    }
}
