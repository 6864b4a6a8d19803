//! Recursive-descent parser from tokens to the AST in [`crate::ast`].
//!
//! This is the "external collaborator" spec §1 describes as out of core
//! scope, kept deliberately small: just enough of Lua 5.1's grammar plus `$`
//! and `\` (spec §6.4) to drive the evaluator end to end. Mirrors the
//! teacher's `compiler::parser` in spirit (tokenize first, then a hand-rolled
//! descent over the token vector) rather than its bytecode-emitting
//! parse-and-compile-in-one-pass design, since here the parser's only job is
//! to produce an AST.

use super::lexer::Lexer;
use super::token::{LuaToken, LuaTokenKind as TK, TokenSpan};
use crate::ast::*;

pub struct Parser {
    tokens: Vec<LuaToken>,
    pos: usize,
}

pub fn parse(source: &str) -> Result<Chunk, Vec<String>> {
    let tokens = Lexer::new(source).tokenize().map_err(|e| vec![e])?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_chunk_toplevel().map_err(|e| vec![e])
}

type PResult<T> = Result<T, String>;

impl Parser {
    fn cur(&self) -> &LuaToken {
        &self.tokens[self.pos]
    }

    fn cur_kind(&self) -> TK {
        self.cur().kind
    }

    fn cur_span(&self) -> TokenSpan {
        self.cur().span
    }

    fn advance(&mut self) -> LuaToken {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn check(&self, k: TK) -> bool {
        self.cur_kind() == k
    }

    fn eat(&mut self, k: TK) -> PResult<LuaToken> {
        if self.check(k) {
            Ok(self.advance())
        } else {
            Err(format!(
                "expected {:?}, found {:?} ('{}') at byte {}",
                k,
                self.cur_kind(),
                self.cur().text,
                self.cur().span.offset
            ))
        }
    }

    fn parse_chunk_toplevel(&mut self) -> PResult<Chunk> {
        let chunk = self.parse_block()?;
        self.eat(TK::TkEof)?;
        Ok(chunk)
    }

    fn block_end(&self) -> bool {
        matches!(
            self.cur_kind(),
            TK::TkEof
                | TK::TkEnd
                | TK::TkElse
                | TK::TkElseIf
                | TK::TkUntil
        )
    }

    fn parse_block(&mut self) -> PResult<Chunk> {
        let mut stats = Vec::new();
        while !self.block_end() {
            if self.check(TK::TkSemicolon) {
                self.advance();
                continue;
            }
            if self.check(TK::TkReturn) {
                self.advance();
                let mut exprs = Vec::new();
                if !self.block_end() && !self.check(TK::TkSemicolon) {
                    exprs = self.parse_exprlist()?;
                }
                if self.check(TK::TkSemicolon) {
                    self.advance();
                }
                stats.push(Stat::Return(exprs));
                break;
            }
            stats.push(self.parse_statement()?);
        }
        Ok(Chunk(stats))
    }

    fn parse_statement(&mut self) -> PResult<Stat> {
        match self.cur_kind() {
            TK::TkBreak => {
                self.advance();
                Ok(Stat::Break)
            }
            TK::TkDo => {
                self.advance();
                let body = self.parse_block()?;
                self.eat(TK::TkEnd)?;
                Ok(Stat::Do(body))
            }
            TK::TkWhile => {
                self.advance();
                let cond = self.parse_expr()?;
                self.eat(TK::TkDo)?;
                let body = self.parse_block()?;
                self.eat(TK::TkEnd)?;
                Ok(Stat::Loop {
                    head_controlled: true,
                    cond,
                    body,
                })
            }
            TK::TkRepeat => {
                self.advance();
                let body = self.parse_block()?;
                self.eat(TK::TkUntil)?;
                let cond = self.parse_expr()?;
                Ok(Stat::Loop {
                    head_controlled: false,
                    cond,
                    body,
                })
            }
            TK::TkIf => self.parse_if(),
            TK::TkFor => self.parse_for(),
            TK::TkFunction => self.parse_function_decl(),
            TK::TkLocal => self.parse_local(),
            _ => self.parse_expr_stat(),
        }
    }

    fn parse_if(&mut self) -> PResult<Stat> {
        self.eat(TK::TkIf)?;
        let mut branches = Vec::new();
        let cond = self.parse_expr()?;
        self.eat(TK::TkThen)?;
        let body = self.parse_block()?;
        branches.push((cond, body));
        while self.check(TK::TkElseIf) {
            self.advance();
            let cond = self.parse_expr()?;
            self.eat(TK::TkThen)?;
            let body = self.parse_block()?;
            branches.push((cond, body));
        }
        let else_branch = if self.check(TK::TkElse) {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };
        self.eat(TK::TkEnd)?;
        Ok(Stat::If {
            branches,
            else_branch,
        })
    }

    fn parse_for(&mut self) -> PResult<Stat> {
        self.eat(TK::TkFor)?;
        let first_name = self.eat(TK::TkName)?.text;
        if self.check(TK::TkAssign) {
            self.advance();
            let start = self.parse_expr()?;
            self.eat(TK::TkComma)?;
            let end = self.parse_expr()?;
            let step = if self.check(TK::TkComma) {
                self.advance();
                Some(self.parse_expr()?)
            } else {
                None
            };
            self.eat(TK::TkDo)?;
            let body = self.parse_block()?;
            self.eat(TK::TkEnd)?;
            Ok(Stat::NumericFor {
                var: first_name,
                start,
                end,
                step,
                body,
            })
        } else {
            let mut names = vec![first_name];
            while self.check(TK::TkComma) {
                self.advance();
                names.push(self.eat(TK::TkName)?.text);
            }
            self.eat(TK::TkIn)?;
            let exprs = self.parse_exprlist()?;
            self.eat(TK::TkDo)?;
            let body = self.parse_block()?;
            self.eat(TK::TkEnd)?;
            Ok(Stat::GenericFor { names, exprs, body })
        }
    }

    fn parse_function_decl(&mut self) -> PResult<Stat> {
        self.eat(TK::TkFunction)?;
        let name_tok = self.eat(TK::TkName)?;
        let mut target = Var::Name(name_tok.text, name_tok.span);
        let mut is_method = false;
        loop {
            if self.check(TK::TkDot) {
                self.advance();
                let field = self.eat(TK::TkName)?;
                target = Var::Member(
                    Box::new(var_to_expr(target)),
                    field.text,
                    field.span,
                );
            } else if self.check(TK::TkColon) {
                self.advance();
                let field = self.eat(TK::TkName)?;
                target = Var::Member(
                    Box::new(var_to_expr(target)),
                    field.text,
                    field.span,
                );
                is_method = true;
                break;
            } else {
                break;
            }
        }
        let body = self.parse_function_body(is_method)?;
        Ok(Stat::FunctionDecl {
            target,
            is_method,
            body: std::rc::Rc::new(body),
        })
    }

    fn parse_function_body(&mut self, is_method: bool) -> PResult<FunctionBody> {
        self.eat(TK::TkLParen)?;
        let mut params = Vec::new();
        if is_method {
            params.push("self".to_string());
        }
        let mut has_vararg = false;
        if !self.check(TK::TkRParen) {
            loop {
                if self.check(TK::TkDots) {
                    self.advance();
                    has_vararg = true;
                    break;
                }
                params.push(self.eat(TK::TkName)?.text);
                if self.check(TK::TkComma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.eat(TK::TkRParen)?;
        let body = self.parse_block()?;
        self.eat(TK::TkEnd)?;
        Ok(FunctionBody {
            params,
            has_vararg,
            body,
        })
    }

    fn parse_local(&mut self) -> PResult<Stat> {
        self.eat(TK::TkLocal)?;
        if self.check(TK::TkFunction) {
            self.advance();
            let name_tok = self.eat(TK::TkName)?;
            let body = self.parse_function_body(false)?;
            return Ok(Stat::Assignment {
                local: true,
                targets: vec![Var::Name(name_tok.text, name_tok.span)],
                values: vec![Expr::Function(std::rc::Rc::new(body))],
            });
        }
        let mut targets = Vec::new();
        loop {
            let name_tok = self.eat(TK::TkName)?;
            targets.push(Var::Name(name_tok.text, name_tok.span));
            if self.check(TK::TkComma) {
                self.advance();
            } else {
                break;
            }
        }
        let values = if self.check(TK::TkAssign) {
            self.advance();
            self.parse_exprlist()?
        } else {
            Vec::new()
        };
        Ok(Stat::Assignment {
            local: true,
            targets,
            values,
        })
    }

    fn parse_expr_stat(&mut self) -> PResult<Stat> {
        let first = self.parse_suffixed_expr()?;
        if self.check(TK::TkAssign) || self.check(TK::TkComma) {
            let mut targets = vec![expr_to_var(first)?];
            while self.check(TK::TkComma) {
                self.advance();
                let e = self.parse_suffixed_expr()?;
                targets.push(expr_to_var(e)?);
            }
            self.eat(TK::TkAssign)?;
            let values = self.parse_exprlist()?;
            Ok(Stat::Assignment {
                local: false,
                targets,
                values,
            })
        } else {
            match first {
                Expr::Call(..) | Expr::MethodCall(..) => Ok(Stat::FunctionCall(first)),
                _ => Err("syntax error: expression statement must be a function call".to_string()),
            }
        }
    }

    fn parse_exprlist(&mut self) -> PResult<Vec<Expr>> {
        let mut out = vec![self.parse_expr()?];
        while self.check(TK::TkComma) {
            self.advance();
            out.push(self.parse_expr()?);
        }
        Ok(out)
    }

    // --- expressions, precedence-climbing ---

    fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_binop_expr(0)
    }

    fn binop_info(kind: TK) -> Option<(BinOpKind, u8, u8)> {
        // (op, left binding power, right binding power)
        Some(match kind {
            TK::TkOr => (BinOpKind::Or, 1, 2),
            TK::TkAnd => (BinOpKind::And, 3, 4),
            TK::TkLt => (BinOpKind::Lt, 5, 6),
            TK::TkGt => (BinOpKind::Gt, 5, 6),
            TK::TkLe => (BinOpKind::Le, 5, 6),
            TK::TkGe => (BinOpKind::Ge, 5, 6),
            TK::TkNe => (BinOpKind::Ne, 5, 6),
            TK::TkEq => (BinOpKind::Eq, 5, 6),
            TK::TkEval => (BinOpKind::Eval, 7, 8),
            TK::TkConcat => (BinOpKind::Concat, 10, 9), // right-assoc
            TK::TkPlus => (BinOpKind::Add, 11, 12),
            TK::TkMinus => (BinOpKind::Sub, 11, 12),
            TK::TkMul => (BinOpKind::Mul, 13, 14),
            TK::TkDiv => (BinOpKind::Div, 13, 14),
            TK::TkMod => (BinOpKind::Mod, 13, 14),
            TK::TkPow => (BinOpKind::Pow, 18, 17), // right-assoc, binds tighter than unary
            _ => return None,
        })
    }

    fn parse_binop_expr(&mut self, min_bp: u8) -> PResult<Expr> {
        let mut lhs = self.parse_unary_expr()?;
        loop {
            let kind = self.cur_kind();
            let Some((op, lbp, rbp)) = Self::binop_info(kind) else {
                break;
            };
            if lbp < min_bp {
                break;
            }
            let tok_span = self.cur_span();
            self.advance();
            let rhs = self.parse_binop_expr(rbp)?;
            lhs = Expr::Op(Box::new(lhs), op, tok_span, Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary_expr(&mut self) -> PResult<Expr> {
        match self.cur_kind() {
            TK::TkNot => {
                let span = self.cur_span();
                self.advance();
                let operand = self.parse_binop_expr(15)?;
                Ok(Expr::UnOp(UnOpKind::Not, span, Box::new(operand)))
            }
            TK::TkMinus => {
                let span = self.cur_span();
                self.advance();
                let operand = self.parse_binop_expr(15)?;
                Ok(Expr::UnOp(UnOpKind::Neg, span, Box::new(operand)))
            }
            TK::TkLen => {
                let span = self.cur_span();
                self.advance();
                let operand = self.parse_binop_expr(15)?;
                Ok(Expr::UnOp(UnOpKind::Len, span, Box::new(operand)))
            }
            TK::TkStrip => {
                let span = self.cur_span();
                self.advance();
                let operand = self.parse_binop_expr(15)?;
                Ok(Expr::UnOp(UnOpKind::Strip, span, Box::new(operand)))
            }
            _ => self.parse_postfix_eval_expr(),
        }
    }

    /// Postfix `\` (live-eval) binds directly onto a suffixed expression,
    /// before it participates in further binary operators.
    fn parse_postfix_eval_expr(&mut self) -> PResult<Expr> {
        let base = self.parse_suffixed_expr()?;
        if self.check(TK::TkEval) && !Self::starts_expr(self.peek_kind(1)) {
            let span = self.cur_span();
            self.advance();
            return Ok(Expr::UnOp(UnOpKind::Eval, span, Box::new(base)));
        }
        Ok(base)
    }

    fn peek_kind(&self, n: usize) -> TK {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(TK::TkEof)
    }

    fn starts_expr(kind: TK) -> bool {
        matches!(
            kind,
            TK::TkNil
                | TK::TkTrue
                | TK::TkFalse
                | TK::TkNumber
                | TK::TkString
                | TK::TkName
                | TK::TkLParen
                | TK::TkLBrace
                | TK::TkFunction
                | TK::TkNot
                | TK::TkMinus
                | TK::TkLen
                | TK::TkStrip
                | TK::TkDots
        )
    }

    fn parse_primary_expr(&mut self) -> PResult<Expr> {
        let span = self.cur_span();
        match self.cur_kind() {
            TK::TkNil => {
                self.advance();
                Ok(Expr::Value(Literal::Nil, span))
            }
            TK::TkTrue => {
                self.advance();
                Ok(Expr::Value(Literal::True, span))
            }
            TK::TkFalse => {
                self.advance();
                Ok(Expr::Value(Literal::False, span))
            }
            TK::TkNumber => {
                let text = self.advance().text;
                let n = parse_lua_number(&text)
                    .ok_or_else(|| format!("invalid number literal '{}'", text))?;
                Ok(Expr::Value(Literal::Number(n), span))
            }
            TK::TkString => {
                let text = self.advance().text;
                Ok(Expr::Value(Literal::RawString(text), span))
            }
            TK::TkDots => {
                self.advance();
                Ok(Expr::Vararg)
            }
            TK::TkName => {
                let text = self.advance().text;
                Ok(Expr::Name(text, span))
            }
            TK::TkLParen => {
                self.advance();
                let e = self.parse_expr()?;
                self.eat(TK::TkRParen)?;
                Ok(e)
            }
            TK::TkLBrace => self.parse_table_constructor(),
            TK::TkFunction => {
                self.advance();
                let body = self.parse_function_body(false)?;
                Ok(Expr::Function(std::rc::Rc::new(body)))
            }
            other => Err(format!("unexpected token {:?} in expression", other)),
        }
    }

    fn parse_suffixed_expr(&mut self) -> PResult<Expr> {
        let mut e = self.parse_primary_expr()?;
        loop {
            match self.cur_kind() {
                TK::TkDot => {
                    self.advance();
                    let field = self.eat(TK::TkName)?;
                    e = Expr::Member(Box::new(e), field.text, field.span);
                }
                TK::TkLBracket => {
                    self.advance();
                    let idx = self.parse_expr()?;
                    self.eat(TK::TkRBracket)?;
                    e = Expr::Index(Box::new(e), Box::new(idx));
                }
                TK::TkColon => {
                    self.advance();
                    let name = self.eat(TK::TkName)?.text;
                    let args = self.parse_call_args()?;
                    e = Expr::MethodCall(Box::new(e), name, args);
                }
                TK::TkLParen | TK::TkString | TK::TkLBrace => {
                    let args = self.parse_call_args()?;
                    e = Expr::Call(Box::new(e), args);
                }
                _ => break,
            }
        }
        Ok(e)
    }

    fn parse_call_args(&mut self) -> PResult<Vec<Expr>> {
        match self.cur_kind() {
            TK::TkLParen => {
                self.advance();
                let args = if self.check(TK::TkRParen) {
                    Vec::new()
                } else {
                    self.parse_exprlist()?
                };
                self.eat(TK::TkRParen)?;
                Ok(args)
            }
            TK::TkString => {
                let span = self.cur_span();
                let text = self.advance().text;
                Ok(vec![Expr::Value(Literal::RawString(text), span)])
            }
            TK::TkLBrace => Ok(vec![self.parse_table_constructor()?]),
            _ => Err("expected function arguments".to_string()),
        }
    }

    fn parse_table_constructor(&mut self) -> PResult<Expr> {
        self.eat(TK::TkLBrace)?;
        let mut fields = Vec::new();
        while !self.check(TK::TkRBrace) {
            if self.check(TK::TkLBracket) {
                self.advance();
                let key = self.parse_expr()?;
                self.eat(TK::TkRBracket)?;
                self.eat(TK::TkAssign)?;
                let value = self.parse_expr()?;
                fields.push(TableField::Keyed(key, value));
            } else if self.check(TK::TkName) && self.peek_kind(1) == TK::TkAssign {
                let name = self.advance().text;
                self.advance(); // '='
                let value = self.parse_expr()?;
                fields.push(TableField::Named(name, value));
            } else {
                let value = self.parse_expr()?;
                fields.push(TableField::Positional(value));
            }
            if self.check(TK::TkComma) || self.check(TK::TkSemicolon) {
                self.advance();
            } else {
                break;
            }
        }
        self.eat(TK::TkRBrace)?;
        Ok(Expr::TableConstructor(fields))
    }
}

fn var_to_expr(v: Var) -> Expr {
    match v {
        Var::Name(n, s) => Expr::Name(n, s),
        Var::Index(t, i) => Expr::Index(t, i),
        Var::Member(t, n, s) => Expr::Member(t, n, s),
    }
}

fn expr_to_var(e: Expr) -> PResult<Var> {
    match e {
        Expr::Name(n, s) => Ok(Var::Name(n, s)),
        Expr::Index(t, i) => Ok(Var::Index(t, i)),
        Expr::Member(t, n, s) => Ok(Var::Member(t, n, s)),
        _ => Err("invalid assignment target".to_string()),
    }
}

fn parse_lua_number(text: &str) -> Option<f64> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok().map(|v| v as f64);
    }
    text.parse::<f64>().ok()
}
