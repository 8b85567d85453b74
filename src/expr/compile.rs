//! Restricted boolean expression parsers.
//!
//! Two surface syntaxes compile to the same [`ExprNode`] tree:
//!
//! * graph trigger expressions: `&`, `|`, parentheses, opaque leaf tokens
//!   (e.g. `foo[-P1D]:succeeded`);
//! * completion expressions: `and`, `or`, parentheses, `[A-Za-z0-9_]`
//!   identifiers only.
//!
//! Both are deliberately tiny recursive-descent parsers. Anything outside the
//! grammar (calls, attribute access, arithmetic) is an error; this must never
//! grow into a general evaluator.

use super::ast::ExprNode;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExprError {
    #[error("unbalanced parentheses in expression: {0}")]
    UnbalancedParens(String),
    #[error("empty group in expression: {0}")]
    EmptyGroup(String),
    #[error("missing operator in expression: {0}")]
    MissingOperator(String),
    #[error("missing operand in expression: {0}")]
    MissingOperand(String),
    #[error("invalid token '{token}' in expression: {expr}")]
    InvalidToken { token: String, expr: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Leaf(String),
    And,
    Or,
    Open,
    Close,
}

/// Compile a graph trigger expression (`&`/`|` operators).
pub fn compile(expr: &str) -> Result<ExprNode<String>, ExprError> {
    let tokens = scan_graph(expr)?;
    parse_tokens(tokens, expr)
}

/// Compile a completion expression (`and`/`or` word operators).
pub fn compile_completion(expr: &str) -> Result<ExprNode<String>, ExprError> {
    let tokens = scan_completion(expr)?;
    parse_tokens(tokens, expr)
}

fn scan_graph(expr: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let mut leaf = String::new();
    for ch in expr.chars() {
        match ch {
            '(' | ')' | '&' | '|' => {
                if !leaf.is_empty() {
                    tokens.push(Token::Leaf(std::mem::take(&mut leaf)));
                }
                tokens.push(match ch {
                    '(' => Token::Open,
                    ')' => Token::Close,
                    '&' => Token::And,
                    _ => Token::Or,
                });
            }
            c if c.is_whitespace() => {
                if !leaf.is_empty() {
                    tokens.push(Token::Leaf(std::mem::take(&mut leaf)));
                }
            }
            c => leaf.push(c),
        }
    }
    if !leaf.is_empty() {
        tokens.push(Token::Leaf(leaf));
    }
    Ok(tokens)
}

fn scan_completion(expr: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut flush = |word: &mut String, tokens: &mut Vec<Token>| {
        if word.is_empty() {
            return;
        }
        let token = match word.as_str() {
            "and" => Token::And,
            "or" => Token::Or,
            w => Token::Leaf(w.to_string()),
        };
        tokens.push(token);
        word.clear();
    };
    for ch in expr.chars() {
        match ch {
            '(' => {
                flush(&mut word, &mut tokens);
                tokens.push(Token::Open);
            }
            ')' => {
                flush(&mut word, &mut tokens);
                tokens.push(Token::Close);
            }
            c if c.is_whitespace() => flush(&mut word, &mut tokens),
            c if c.is_ascii_alphanumeric() || c == '_' => word.push(c),
            c => {
                return Err(ExprError::InvalidToken {
                    token: c.to_string(),
                    expr: expr.to_string(),
                });
            }
        }
    }
    flush(&mut word, &mut tokens);
    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    source: &'a str,
}

fn parse_tokens(tokens: Vec<Token>, source: &str) -> Result<ExprNode<String>, ExprError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        source,
    };
    if parser.tokens.is_empty() {
        return Err(ExprError::MissingOperand(source.to_string()));
    }
    let node = parser.or_expr()?;
    match parser.peek() {
        None => Ok(node),
        Some(Token::Close) => Err(ExprError::UnbalancedParens(source.to_string())),
        Some(Token::Leaf(_)) | Some(Token::Open) => {
            Err(ExprError::MissingOperator(source.to_string()))
        }
        Some(_) => Err(ExprError::MissingOperand(source.to_string())),
    }
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    // or_expr := and_expr ('|' and_expr)*
    fn or_expr(&mut self) -> Result<ExprNode<String>, ExprError> {
        let mut children = vec![self.and_expr()?];
        while matches!(self.peek(), Some(Token::Or)) {
            self.advance();
            children.push(self.and_expr()?);
        }
        if children.len() == 1 {
            Ok(children.pop().unwrap())
        } else {
            Ok(ExprNode::Or(children))
        }
    }

    // and_expr := atom ('&' atom)*
    fn and_expr(&mut self) -> Result<ExprNode<String>, ExprError> {
        let mut children = vec![self.atom()?];
        while matches!(self.peek(), Some(Token::And)) {
            self.advance();
            children.push(self.atom()?);
        }
        if children.len() == 1 {
            Ok(children.pop().unwrap())
        } else {
            Ok(ExprNode::And(children))
        }
    }

    // atom := leaf | '(' or_expr ')'
    //
    // A parenthesized single-element group collapses to its element.
    fn atom(&mut self) -> Result<ExprNode<String>, ExprError> {
        match self.advance() {
            Some(Token::Leaf(value)) => {
                if matches!(self.peek(), Some(Token::Open) | Some(Token::Leaf(_))) {
                    return Err(ExprError::MissingOperator(self.source.to_string()));
                }
                Ok(ExprNode::Leaf(value))
            }
            Some(Token::Open) => {
                if matches!(self.peek(), Some(Token::Close)) {
                    return Err(ExprError::EmptyGroup(self.source.to_string()));
                }
                let inner = self.or_expr()?;
                match self.advance() {
                    Some(Token::Close) => {
                        if matches!(self.peek(), Some(Token::Open) | Some(Token::Leaf(_))) {
                            return Err(ExprError::MissingOperator(self.source.to_string()));
                        }
                        Ok(inner)
                    }
                    _ => Err(ExprError::UnbalancedParens(self.source.to_string())),
                }
            }
            Some(Token::Close) => Err(ExprError::UnbalancedParens(self.source.to_string())),
            _ => Err(ExprError::MissingOperand(self.source.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_group_collapses() {
        assert_eq!(compile("(foo)").unwrap(), ExprNode::Leaf("foo".to_string()));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let node = compile("a & b | c").unwrap();
        assert_eq!(
            node,
            ExprNode::Or(vec![
                ExprNode::And(vec![
                    ExprNode::Leaf("a".to_string()),
                    ExprNode::Leaf("b".to_string()),
                ]),
                ExprNode::Leaf("c".to_string()),
            ])
        );
    }

    #[test]
    fn unbalanced_parens_rejected() {
        assert!(matches!(
            compile("(a & b"),
            Err(ExprError::UnbalancedParens(_))
        ));
        assert!(matches!(
            compile("a & b)"),
            Err(ExprError::UnbalancedParens(_))
        ));
    }

    #[test]
    fn completion_rejects_non_boolean_constructs() {
        assert!(compile_completion("succeeded.x").is_err());
        assert!(compile_completion("f(succeeded)").is_err());
        assert!(compile_completion("1 + 2").is_err());
    }

    #[test]
    fn completion_word_operators() {
        let node = compile_completion("succeeded and (x or y)").unwrap();
        assert_eq!(
            node,
            ExprNode::And(vec![
                ExprNode::Leaf("succeeded".to_string()),
                ExprNode::Or(vec![
                    ExprNode::Leaf("x".to_string()),
                    ExprNode::Leaf("y".to_string()),
                ]),
            ])
        );
    }
}
