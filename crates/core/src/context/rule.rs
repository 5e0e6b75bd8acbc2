// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rule expression grammar: lexer, AST and evaluator.
//!
//! A rule is a one-line expression such as
//! `distro == fedora-33 && arch != s390x` or `initiator is defined`.
//! `&&` binds tighter than `||`. Comparison against an undefined
//! dimension never matches; only `is not defined` does.

use super::{split_versioned, Context, VERSIONED_DIMENSIONS};
use std::cmp::Ordering;
use thiserror::Error;

/// Errors raised while parsing or evaluating rules
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("cannot parse rule '{input}': {reason}")]
    Parse { input: String, reason: String },
    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Comparison operators usable in a rule clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Match,
    NotMatch,
}

impl CmpOp {
    fn as_str(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Match => "~",
            CmpOp::NotMatch => "!~",
        }
    }
}

/// Parsed rule expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Any branch matching satisfies the rule
    Or(Vec<Rule>),
    /// Every branch must match
    And(Vec<Rule>),
    /// `<dimension> <op> <value>`
    Cmp {
        dimension: String,
        op: CmpOp,
        value: String,
    },
    /// `<dimension> is defined` / `is not defined`
    Defined { dimension: String, negated: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Op(CmpOp),
    AndAnd,
    OrOr,
}

fn lex(input: &str) -> Result<Vec<Token>, RuleError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    let parse_err = |reason: &str| RuleError::Parse {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '=' => {
                chars.next();
                if chars.next_if_eq(&'=').is_none() {
                    return Err(parse_err("expected '=='"));
                }
                tokens.push(Token::Op(CmpOp::Eq));
            }
            '!' => {
                chars.next();
                match chars.next() {
                    Some('=') => tokens.push(Token::Op(CmpOp::Ne)),
                    Some('~') => tokens.push(Token::Op(CmpOp::NotMatch)),
                    _ => return Err(parse_err("expected '!=' or '!~'")),
                }
            }
            '<' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Op(CmpOp::Le));
                } else {
                    tokens.push(Token::Op(CmpOp::Lt));
                }
            }
            '>' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Op(CmpOp::Ge));
                } else {
                    tokens.push(Token::Op(CmpOp::Gt));
                }
            }
            '~' => {
                chars.next();
                tokens.push(Token::Op(CmpOp::Match));
            }
            '&' => {
                chars.next();
                if chars.next_if_eq(&'&').is_none() {
                    return Err(parse_err("expected '&&'"));
                }
                tokens.push(Token::AndAnd);
            }
            '|' => {
                chars.next();
                if chars.next_if_eq(&'|').is_none() {
                    return Err(parse_err("expected '||'"));
                }
                tokens.push(Token::OrOr);
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || matches!(c, '=' | '!' | '<' | '>' | '~' | '&' | '|') {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
        }
    }

    Ok(tokens)
}

impl Rule {
    /// Parse a rule expression
    pub fn parse(input: &str) -> Result<Rule, RuleError> {
        let tokens = lex(input)?;
        let mut parser = Parser {
            input,
            tokens,
            position: 0,
        };
        let rule = parser.or_expr()?;
        if parser.position != parser.tokens.len() {
            return Err(RuleError::Parse {
                input: input.to_string(),
                reason: "trailing tokens".to_string(),
            });
        }
        Ok(rule)
    }

    /// Evaluate the rule against a context
    pub fn matches(&self, context: &Context) -> Result<bool, RuleError> {
        match self {
            Rule::Or(branches) => {
                for branch in branches {
                    if branch.matches(context)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Rule::And(branches) => {
                for branch in branches {
                    if !branch.matches(context)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Rule::Defined { dimension, negated } => {
                let defined = context.get(dimension).is_some();
                Ok(defined != *negated)
            }
            Rule::Cmp {
                dimension,
                op,
                value,
            } => {
                let Some(actual) = context.get(dimension) else {
                    return Ok(false);
                };
                let versioned = VERSIONED_DIMENSIONS.contains(&dimension.as_str());
                match op {
                    CmpOp::Match | CmpOp::NotMatch => {
                        let pattern =
                            regex::Regex::new(value).map_err(|source| RuleError::Pattern {
                                pattern: value.clone(),
                                source,
                            })?;
                        let hit = actual.iter().any(|v| pattern.is_match(v));
                        Ok((*op == CmpOp::Match) == hit)
                    }
                    _ => Ok(actual
                        .iter()
                        .any(|v| compare_values(v, value, *op, versioned))),
                }
            }
        }
    }
}

/// Compare one context value against the rule operand.
///
/// Versioned dimensions match on the name part and order on the
/// version part lexicographically; a rule operand without a version
/// (`fedora`) matches any version for equality and never orders.
fn compare_values(actual: &str, wanted: &str, op: CmpOp, versioned: bool) -> bool {
    if !versioned {
        return match op {
            CmpOp::Eq => actual == wanted,
            CmpOp::Ne => actual != wanted,
            CmpOp::Lt => actual < wanted,
            CmpOp::Le => actual <= wanted,
            CmpOp::Gt => actual > wanted,
            CmpOp::Ge => actual >= wanted,
            CmpOp::Match | CmpOp::NotMatch => false,
        };
    }

    let (actual_name, actual_version) = split_versioned(actual);
    let (wanted_name, wanted_version) = split_versioned(wanted);

    if actual_name != wanted_name {
        return op == CmpOp::Ne;
    }

    match (op, actual_version, wanted_version) {
        (CmpOp::Eq, _, None) => true,
        (CmpOp::Ne, _, None) => false,
        (CmpOp::Eq, Some(a), Some(w)) => a == w,
        (CmpOp::Ne, Some(a), Some(w)) => a != w,
        (CmpOp::Eq, None, Some(_)) => false,
        (CmpOp::Ne, None, Some(_)) => true,
        (op, Some(a), Some(w)) => {
            let ordering = a.cmp(w);
            match op {
                CmpOp::Lt => ordering == Ordering::Less,
                CmpOp::Le => ordering != Ordering::Greater,
                CmpOp::Gt => ordering == Ordering::Greater,
                CmpOp::Ge => ordering != Ordering::Less,
                _ => false,
            }
        }
        // Ordering against a missing version cannot be decided
        _ => false,
    }
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    position: usize,
}

impl Parser<'_> {
    fn err(&self, reason: impl Into<String>) -> RuleError {
        RuleError::Parse {
            input: self.input.to_string(),
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn or_expr(&mut self) -> Result<Rule, RuleError> {
        let mut branches = vec![self.and_expr()?];
        while self.peek() == Some(&Token::OrOr) {
            self.next();
            branches.push(self.and_expr()?);
        }
        if branches.len() == 1 {
            Ok(branches.remove(0))
        } else {
            Ok(Rule::Or(branches))
        }
    }

    fn and_expr(&mut self) -> Result<Rule, RuleError> {
        let mut branches = vec![self.clause()?];
        while self.peek() == Some(&Token::AndAnd) {
            self.next();
            branches.push(self.clause()?);
        }
        if branches.len() == 1 {
            Ok(branches.remove(0))
        } else {
            Ok(Rule::And(branches))
        }
    }

    fn clause(&mut self) -> Result<Rule, RuleError> {
        let dimension = match self.next() {
            Some(Token::Word(word)) => word.to_lowercase(),
            _ => return Err(self.err("expected dimension name")),
        };

        match self.next() {
            Some(Token::Op(op)) => {
                let value = match self.next() {
                    Some(Token::Word(word)) => word.to_lowercase(),
                    _ => return Err(self.err(format!("expected value after '{}'", op.as_str()))),
                };
                Ok(Rule::Cmp {
                    dimension,
                    op,
                    value,
                })
            }
            Some(Token::Word(word)) if word == "is" => match self.next() {
                Some(Token::Word(word)) if word == "defined" => Ok(Rule::Defined {
                    dimension,
                    negated: false,
                }),
                Some(Token::Word(word)) if word == "not" => match self.next() {
                    Some(Token::Word(word)) if word == "defined" => Ok(Rule::Defined {
                        dimension,
                        negated: true,
                    }),
                    _ => Err(self.err("expected 'defined' after 'is not'")),
                },
                _ => Err(self.err("expected 'defined' or 'not defined' after 'is'")),
            },
            _ => Err(self.err("expected operator")),
        }
    }
}

/// A rule list is satisfied when any entry matches
pub fn any_matches(rules: &[Rule], context: &Context) -> Result<bool, RuleError> {
    for rule in rules {
        if rule.matches(context)? {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
#[path = "rule_tests.rs"]
mod tests;
