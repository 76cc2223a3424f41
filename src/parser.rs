// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::lexer::*;

use anyhow::Result;

/// Parsed form of a RAML type expression.
///
/// `?` and `[]` are postfix and bind tighter than `|`; parentheses group.
/// A name is either a primitive, a locally defined type, or a
/// `library.type` reference — which of those it is gets decided when the
/// expression is applied to a shape, not here.
#[derive(Debug, Clone)]
pub enum TypeExpr {
    Name {
        library: Option<Span>,
        member: Span,
    },
    Optional {
        expr: Box<TypeExpr>,
        span: Span,
    },
    Array {
        expr: Box<TypeExpr>,
        span: Span,
    },
    Union {
        members: Vec<TypeExpr>,
        span: Span,
    },
    Group {
        expr: Box<TypeExpr>,
        span: Span,
    },
}

impl TypeExpr {
    pub fn span(&self) -> &Span {
        match self {
            TypeExpr::Name { member, .. } => member,
            TypeExpr::Optional { span, .. }
            | TypeExpr::Array { span, .. }
            | TypeExpr::Union { span, .. }
            | TypeExpr::Group { span, .. } => span,
        }
    }
}

#[derive(Clone)]
pub struct Parser<'source> {
    lexer: Lexer<'source>,
    tok: Token,
}

impl<'source> Parser<'source> {
    pub fn new(source: &'source Source) -> Result<Self> {
        let mut lexer = Lexer::new(source);
        let tok = lexer.next_token()?;
        Ok(Self { lexer, tok })
    }

    pub fn token_text(&self) -> &str {
        self.tok.1.text()
    }

    fn next_token(&mut self) -> Result<()> {
        self.tok = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, text: &str, context: &str) -> Result<()> {
        if self.token_text() == text {
            self.next_token()
        } else {
            let msg = format!("expecting `{text}` {context}");
            Err(self.tok.1.error(&msg))
        }
    }

    /// Parse a complete type expression; trailing input is an error.
    pub fn parse(&mut self) -> Result<TypeExpr> {
        let expr = self.parse_union_expr()?;
        if self.tok.0 != TokenKind::Eof {
            return Err(self.tok.1.error("expecting end of type expression"));
        }
        Ok(expr)
    }

    fn parse_union_expr(&mut self) -> Result<TypeExpr> {
        let start = self.tok.1.clone();
        let first = self.parse_postfix_expr()?;
        if self.token_text() != "|" {
            return Ok(first);
        }
        let mut members = vec![first];
        while self.token_text() == "|" {
            self.next_token()?;
            members.push(self.parse_postfix_expr()?);
        }
        Ok(TypeExpr::Union {
            members,
            span: start,
        })
    }

    fn parse_postfix_expr(&mut self) -> Result<TypeExpr> {
        let mut expr = self.parse_atom()?;
        loop {
            match self.token_text() {
                "[]" => {
                    let span = self.tok.1.clone();
                    self.next_token()?;
                    expr = TypeExpr::Array {
                        expr: Box::new(expr),
                        span,
                    };
                }
                "?" => {
                    let span = self.tok.1.clone();
                    self.next_token()?;
                    expr = TypeExpr::Optional {
                        expr: Box::new(expr),
                        span,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_atom(&mut self) -> Result<TypeExpr> {
        if self.token_text() == "(" {
            let span = self.tok.1.clone();
            self.next_token()?;
            let expr = self.parse_union_expr()?;
            self.expect(")", "to close type group")?;
            return Ok(TypeExpr::Group {
                expr: Box::new(expr),
                span,
            });
        }
        let first = self.parse_ident()?;
        if self.token_text() == "." {
            self.next_token()?;
            let member = self.parse_ident()?;
            return Ok(TypeExpr::Name {
                library: Some(first),
                member,
            });
        }
        Ok(TypeExpr::Name {
            library: None,
            member: first,
        })
    }

    fn parse_ident(&mut self) -> Result<Span> {
        if self.tok.0 != TokenKind::Ident {
            return Err(self
                .tok
                .1
                .error("expecting identifier in type expression"));
        }
        let span = self.tok.1.clone();
        self.next_token()?;
        Ok(span)
    }
}
