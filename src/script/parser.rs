use super::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DomQuery {
    ById(String),
    Var(String),
}

impl DomQuery {
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::ById(id) => format!("document.getElementById('{id}')"),
            Self::Var(name) => name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DomProp {
    Value,
    Checked,
    Disabled,
    TextContent,
    InnerHtml,
    ClassName,
    Id,
    Style(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Not,
    Neg,
    Typeof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Gt,
    Le,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AssignOp {
    Assign,
    Add,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StrMethod {
    IndexOf,
    Replace,
    ToLowerCase,
    ToUpperCase,
    Trim,
    Substring,
    CharAt,
    Match,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    String(String),
    Number(i64),
    Float(f64),
    Bool(bool),
    Null,
    Undefined,
    Var(String),
    DomQueryExpr(DomQuery),
    DomRead {
        target: DomQuery,
        prop: DomProp,
    },
    StrLength(Box<Expr>),
    StringCall {
        target: Box<Expr>,
        method: StrMethod,
        args: Vec<Expr>,
    },
    RegexLiteral {
        pattern: String,
        flags: String,
    },
    RegexTest {
        pattern: String,
        flags: String,
        input: Box<Expr>,
    },
    MathRandom,
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Cond {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Stmt {
    VarDecl {
        name: String,
        expr: Option<Expr>,
    },
    VarAssign {
        name: String,
        op: AssignOp,
        expr: Expr,
    },
    DomAssign {
        target: DomQuery,
        prop: DomProp,
        expr: Expr,
    },
    Alert(Expr),
    SetTimeout {
        code: Expr,
        delay_ms: Expr,
    },
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    Block(Vec<Stmt>),
    ExprStmt(Expr),
}

pub(crate) fn parse_script(src: &str) -> Result<Vec<Stmt>> {
    stacker::maybe_grow(64 * 1024, 4 * 1024 * 1024, || {
        let mut cursor = Cursor::new(src);
        let mut stmts = Vec::new();
        loop {
            cursor.skip_ws_and_comments();
            if cursor.eof() {
                return Ok(stmts);
            }
            stmts.push(parse_stmt(&mut cursor)?);
        }
    })
}

struct Cursor<'a> {
    src: &'a str,
    i: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, i: 0 }
    }

    fn eof(&self) -> bool {
        self.i >= self.src.len()
    }

    fn pos(&self) -> usize {
        self.i
    }

    fn set_pos(&mut self, pos: usize) {
        self.i = pos;
    }

    fn bytes(&self) -> &'a [u8] {
        self.src.as_bytes()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().get(self.i).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes().get(self.i + offset).copied()
    }

    fn consume_byte(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.i += 1;
            true
        } else {
            false
        }
    }

    fn expect_byte(&mut self, b: u8) -> Result<()> {
        if self.consume_byte(b) {
            Ok(())
        } else {
            Err(Error::ScriptParse(format!(
                "expected '{}' at {}",
                b as char, self.i
            )))
        }
    }

    fn consume_ascii(&mut self, token: &str) -> bool {
        let bytes = self.bytes();
        if self.i + token.len() > bytes.len() {
            return false;
        }
        if &bytes[self.i..self.i + token.len()] == token.as_bytes() {
            self.i += token.len();
            true
        } else {
            false
        }
    }

    // A keyword match must end at a word boundary.
    fn consume_keyword(&mut self, keyword: &str) -> bool {
        let start = self.i;
        if !self.consume_ascii(keyword) {
            return false;
        }
        if self.peek().is_some_and(is_ident_char) {
            self.i = start;
            return false;
        }
        true
    }

    fn skip_ws_and_comments(&mut self) {
        loop {
            while let Some(b) = self.peek() {
                if b.is_ascii_whitespace() {
                    self.i += 1;
                } else {
                    break;
                }
            }
            if self.consume_ascii("//") {
                while let Some(b) = self.peek() {
                    self.i += 1;
                    if b == b'\n' {
                        break;
                    }
                }
                continue;
            }
            if self.consume_ascii("/*") {
                while !self.eof() && !self.consume_ascii("*/") {
                    self.i += 1;
                }
                continue;
            }
            return;
        }
    }

    fn parse_identifier(&mut self) -> Result<String> {
        let start = self.i;
        if !self.peek().is_some_and(is_ident_start_char) {
            return Err(Error::ScriptParse(format!(
                "expected an identifier at {}",
                self.i
            )));
        }
        while self.peek().is_some_and(is_ident_char) {
            self.i += 1;
        }
        Ok(self.src[start..self.i].to_string())
    }
}

fn is_ident_start_char(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

fn parse_stmt(cursor: &mut Cursor<'_>) -> Result<Stmt> {
    cursor.skip_ws_and_comments();

    // Stray semicolons are empty statements.
    if cursor.consume_byte(b';') {
        return Ok(Stmt::Block(Vec::new()));
    }

    if cursor.consume_byte(b'{') {
        let mut body = Vec::new();
        loop {
            cursor.skip_ws_and_comments();
            if cursor.consume_byte(b'}') {
                break;
            }
            if cursor.eof() {
                return Err(Error::ScriptParse("unclosed block".into()));
            }
            body.push(parse_stmt(cursor)?);
        }
        return Ok(Stmt::Block(body));
    }

    if cursor.consume_keyword("var")
        || cursor.consume_keyword("let")
        || cursor.consume_keyword("const")
    {
        cursor.skip_ws_and_comments();
        let name = cursor.parse_identifier()?;
        cursor.skip_ws_and_comments();
        let expr = if cursor.consume_byte(b'=') {
            cursor.skip_ws_and_comments();
            Some(parse_expr(cursor)?)
        } else {
            None
        };
        consume_stmt_end(cursor);
        return Ok(Stmt::VarDecl { name, expr });
    }

    if cursor.consume_keyword("if") {
        cursor.skip_ws_and_comments();
        cursor.expect_byte(b'(')?;
        let cond = parse_expr(cursor)?;
        cursor.skip_ws_and_comments();
        cursor.expect_byte(b')')?;
        let then_body = parse_branch_body(cursor)?;
        cursor.skip_ws_and_comments();
        let else_body = if cursor.consume_keyword("else") {
            parse_branch_body(cursor)?
        } else {
            Vec::new()
        };
        return Ok(Stmt::If {
            cond,
            then_body,
            else_body,
        });
    }

    if cursor.consume_keyword("while") {
        cursor.skip_ws_and_comments();
        cursor.expect_byte(b'(')?;
        let cond = parse_expr(cursor)?;
        cursor.skip_ws_and_comments();
        cursor.expect_byte(b')')?;
        let body = parse_branch_body(cursor)?;
        return Ok(Stmt::While { cond, body });
    }

    let start = cursor.pos();
    if cursor.consume_keyword("alert") {
        cursor.skip_ws_and_comments();
        if cursor.consume_byte(b'(') {
            let message = parse_expr(cursor)?;
            cursor.skip_ws_and_comments();
            cursor.expect_byte(b')')?;
            consume_stmt_end(cursor);
            return Ok(Stmt::Alert(message));
        }
        cursor.set_pos(start);
    }

    if cursor.consume_keyword("setTimeout") {
        cursor.skip_ws_and_comments();
        if cursor.consume_byte(b'(') {
            let code = parse_expr(cursor)?;
            cursor.skip_ws_and_comments();
            cursor.expect_byte(b',')?;
            let delay_ms = parse_expr(cursor)?;
            cursor.skip_ws_and_comments();
            cursor.expect_byte(b')')?;
            consume_stmt_end(cursor);
            return Ok(Stmt::SetTimeout { code, delay_ms });
        }
        cursor.set_pos(start);
    }

    if let Some(stmt) = try_parse_assignment(cursor)? {
        consume_stmt_end(cursor);
        return Ok(stmt);
    }

    let expr = parse_expr(cursor)?;
    consume_stmt_end(cursor);
    Ok(Stmt::ExprStmt(expr))
}

fn parse_branch_body(cursor: &mut Cursor<'_>) -> Result<Vec<Stmt>> {
    cursor.skip_ws_and_comments();
    if cursor.consume_byte(b'{') {
        let mut body = Vec::new();
        loop {
            cursor.skip_ws_and_comments();
            if cursor.consume_byte(b'}') {
                return Ok(body);
            }
            if cursor.eof() {
                return Err(Error::ScriptParse("unclosed block".into()));
            }
            body.push(parse_stmt(cursor)?);
        }
    }
    Ok(vec![parse_stmt(cursor)?])
}

fn consume_stmt_end(cursor: &mut Cursor<'_>) {
    cursor.skip_ws_and_comments();
    cursor.consume_byte(b';');
}

// Assignment targets are recognized structurally so DOM writes become typed
// statements instead of generic member stores.
fn try_parse_assignment(cursor: &mut Cursor<'_>) -> Result<Option<Stmt>> {
    let start = cursor.pos();

    let Some(target) = parse_reference(cursor)? else {
        cursor.set_pos(start);
        return Ok(None);
    };

    cursor.skip_ws_and_comments();
    let op = if cursor.consume_ascii("+=") {
        AssignOp::Add
    } else if cursor.peek() == Some(b'=') && cursor.peek_at(1) != Some(b'=') {
        cursor.consume_byte(b'=');
        AssignOp::Assign
    } else {
        cursor.set_pos(start);
        return Ok(None);
    };

    cursor.skip_ws_and_comments();
    let expr = parse_expr(cursor)?;

    match target {
        Reference::Var(name) => Ok(Some(Stmt::VarAssign { name, op, expr })),
        Reference::Dom { target, prop } => {
            // Compound DOM assignment desugars to a read-modify-write.
            let expr = match op {
                AssignOp::Assign => expr,
                AssignOp::Add => Expr::Binary {
                    op: BinaryOp::Add,
                    lhs: Box::new(Expr::DomRead {
                        target: target.clone(),
                        prop: prop.clone(),
                    }),
                    rhs: Box::new(expr),
                },
            };
            Ok(Some(Stmt::DomAssign { target, prop, expr }))
        }
    }
}

enum Reference {
    Var(String),
    Dom { target: DomQuery, prop: DomProp },
}

fn parse_reference(cursor: &mut Cursor<'_>) -> Result<Option<Reference>> {
    // window.x and bare x address the same global binding.
    while cursor.consume_keyword("window") {
        cursor.skip_ws_and_comments();
        if !cursor.consume_byte(b'.') {
            return Ok(None);
        }
        cursor.skip_ws_and_comments();
    }

    let query = if let Some(query) = try_parse_get_element_by_id(cursor)? {
        query
    } else {
        if !cursor.peek().is_some_and(is_ident_start_char) {
            return Ok(None);
        }
        let name = cursor.parse_identifier()?;
        cursor.skip_ws_and_comments();
        if cursor.peek() != Some(b'.') {
            return Ok(Some(Reference::Var(name)));
        }
        DomQuery::Var(name)
    };

    cursor.skip_ws_and_comments();
    if !cursor.consume_byte(b'.') {
        return match query {
            DomQuery::ById(_) => Ok(None),
            DomQuery::Var(name) => Ok(Some(Reference::Var(name))),
        };
    }
    cursor.skip_ws_and_comments();
    let prop_name = cursor.parse_identifier()?;
    let prop = if prop_name == "style" {
        cursor.skip_ws_and_comments();
        if !cursor.consume_byte(b'.') {
            return Ok(None);
        }
        cursor.skip_ws_and_comments();
        let style_prop = cursor.parse_identifier()?;
        DomProp::Style(js_prop_to_css_name(&style_prop))
    } else {
        match dom_prop_from_name(&prop_name) {
            Some(prop) => prop,
            None => return Ok(None),
        }
    };

    Ok(Some(Reference::Dom {
        target: query,
        prop,
    }))
}

fn try_parse_get_element_by_id(cursor: &mut Cursor<'_>) -> Result<Option<DomQuery>> {
    let start = cursor.pos();
    if !cursor.consume_keyword("document") {
        return Ok(None);
    }
    cursor.skip_ws_and_comments();
    if !cursor.consume_byte(b'.') {
        cursor.set_pos(start);
        return Ok(None);
    }
    cursor.skip_ws_and_comments();
    if !cursor.consume_keyword("getElementById") {
        return Err(Error::ScriptParse(format!(
            "unsupported document member at {}",
            cursor.pos()
        )));
    }
    cursor.skip_ws_and_comments();
    cursor.expect_byte(b'(')?;
    cursor.skip_ws_and_comments();
    let id = parse_string_literal(cursor)?;
    cursor.skip_ws_and_comments();
    cursor.expect_byte(b')')?;
    Ok(Some(DomQuery::ById(id)))
}

fn dom_prop_from_name(name: &str) -> Option<DomProp> {
    match name {
        "value" => Some(DomProp::Value),
        "checked" => Some(DomProp::Checked),
        "disabled" => Some(DomProp::Disabled),
        "textContent" => Some(DomProp::TextContent),
        "innerHTML" => Some(DomProp::InnerHtml),
        "className" => Some(DomProp::ClassName),
        "id" => Some(DomProp::Id),
        _ => None,
    }
}

fn js_prop_to_css_name(prop: &str) -> String {
    let mut out = String::new();
    for ch in prop.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn parse_expr(cursor: &mut Cursor<'_>) -> Result<Expr> {
    parse_cond(cursor)
}

fn parse_cond(cursor: &mut Cursor<'_>) -> Result<Expr> {
    let cond = parse_or(cursor)?;
    cursor.skip_ws_and_comments();
    if !cursor.consume_byte(b'?') {
        return Ok(cond);
    }
    let then_expr = parse_expr(cursor)?;
    cursor.skip_ws_and_comments();
    cursor.expect_byte(b':')?;
    let else_expr = parse_expr(cursor)?;
    Ok(Expr::Cond {
        cond: Box::new(cond),
        then_expr: Box::new(then_expr),
        else_expr: Box::new(else_expr),
    })
}

fn parse_or(cursor: &mut Cursor<'_>) -> Result<Expr> {
    let mut lhs = parse_and(cursor)?;
    loop {
        cursor.skip_ws_and_comments();
        if cursor.consume_ascii("||") {
            let rhs = parse_and(cursor)?;
            lhs = Expr::Binary {
                op: BinaryOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        } else {
            return Ok(lhs);
        }
    }
}

fn parse_and(cursor: &mut Cursor<'_>) -> Result<Expr> {
    let mut lhs = parse_equality(cursor)?;
    loop {
        cursor.skip_ws_and_comments();
        if cursor.consume_ascii("&&") {
            let rhs = parse_equality(cursor)?;
            lhs = Expr::Binary {
                op: BinaryOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        } else {
            return Ok(lhs);
        }
    }
}

fn parse_equality(cursor: &mut Cursor<'_>) -> Result<Expr> {
    let mut lhs = parse_relational(cursor)?;
    loop {
        cursor.skip_ws_and_comments();
        let op = if cursor.consume_ascii("===") {
            BinaryOp::StrictEq
        } else if cursor.consume_ascii("!==") {
            BinaryOp::StrictNe
        } else if cursor.consume_ascii("==") {
            BinaryOp::Eq
        } else if cursor.consume_ascii("!=") {
            BinaryOp::Ne
        } else {
            return Ok(lhs);
        };
        let rhs = parse_relational(cursor)?;
        lhs = Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        };
    }
}

fn parse_relational(cursor: &mut Cursor<'_>) -> Result<Expr> {
    let mut lhs = parse_additive(cursor)?;
    loop {
        cursor.skip_ws_and_comments();
        let op = if cursor.consume_ascii("<=") {
            BinaryOp::Le
        } else if cursor.consume_ascii(">=") {
            BinaryOp::Ge
        } else if cursor.peek() == Some(b'<') {
            cursor.consume_byte(b'<');
            BinaryOp::Lt
        } else if cursor.peek() == Some(b'>') {
            cursor.consume_byte(b'>');
            BinaryOp::Gt
        } else {
            return Ok(lhs);
        };
        let rhs = parse_additive(cursor)?;
        lhs = Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        };
    }
}

fn parse_additive(cursor: &mut Cursor<'_>) -> Result<Expr> {
    let mut lhs = parse_multiplicative(cursor)?;
    loop {
        cursor.skip_ws_and_comments();
        let op = if cursor.peek() == Some(b'+') && cursor.peek_at(1) != Some(b'=') {
            cursor.consume_byte(b'+');
            BinaryOp::Add
        } else if cursor.peek() == Some(b'-') && cursor.peek_at(1) != Some(b'=') {
            cursor.consume_byte(b'-');
            BinaryOp::Sub
        } else {
            return Ok(lhs);
        };
        let rhs = parse_multiplicative(cursor)?;
        lhs = Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        };
    }
}

fn parse_multiplicative(cursor: &mut Cursor<'_>) -> Result<Expr> {
    let mut lhs = parse_unary(cursor)?;
    loop {
        cursor.skip_ws_and_comments();
        let op = if cursor.consume_byte(b'*') {
            BinaryOp::Mul
        } else if cursor.peek() == Some(b'/')
            && cursor.peek_at(1) != Some(b'/')
            && cursor.peek_at(1) != Some(b'*')
        {
            cursor.consume_byte(b'/');
            BinaryOp::Div
        } else if cursor.consume_byte(b'%') {
            BinaryOp::Mod
        } else {
            return Ok(lhs);
        };
        let rhs = parse_unary(cursor)?;
        lhs = Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        };
    }
}

fn parse_unary(cursor: &mut Cursor<'_>) -> Result<Expr> {
    cursor.skip_ws_and_comments();
    if cursor.consume_byte(b'!') {
        let expr = parse_unary(cursor)?;
        return Ok(Expr::Unary {
            op: UnaryOp::Not,
            expr: Box::new(expr),
        });
    }
    if cursor.peek() == Some(b'-') && cursor.peek_at(1) != Some(b'=') {
        cursor.consume_byte(b'-');
        let expr = parse_unary(cursor)?;
        return Ok(Expr::Unary {
            op: UnaryOp::Neg,
            expr: Box::new(expr),
        });
    }
    if cursor.consume_keyword("typeof") {
        let expr = parse_unary(cursor)?;
        return Ok(Expr::Unary {
            op: UnaryOp::Typeof,
            expr: Box::new(expr),
        });
    }
    parse_postfix(cursor)
}

fn parse_postfix(cursor: &mut Cursor<'_>) -> Result<Expr> {
    let mut expr = parse_primary(cursor)?;

    loop {
        cursor.skip_ws_and_comments();
        if !cursor.consume_byte(b'.') {
            return Ok(expr);
        }
        cursor.skip_ws_and_comments();
        let name = cursor.parse_identifier()?;

        if name == "length" {
            expr = Expr::StrLength(Box::new(expr));
            continue;
        }

        if name == "style" {
            cursor.skip_ws_and_comments();
            cursor.expect_byte(b'.')?;
            cursor.skip_ws_and_comments();
            let style_prop = cursor.parse_identifier()?;
            let target = expr_to_dom_query(&expr)?;
            expr = Expr::DomRead {
                target,
                prop: DomProp::Style(js_prop_to_css_name(&style_prop)),
            };
            continue;
        }

        if name == "test" {
            cursor.skip_ws_and_comments();
            cursor.expect_byte(b'(')?;
            let input = parse_expr(cursor)?;
            cursor.skip_ws_and_comments();
            cursor.expect_byte(b')')?;
            let Expr::RegexLiteral { pattern, flags } = expr else {
                return Err(Error::ScriptParse(
                    "test() is only supported on a regex literal".into(),
                ));
            };
            expr = Expr::RegexTest {
                pattern,
                flags,
                input: Box::new(input),
            };
            continue;
        }

        if let Some(method) = str_method_from_name(&name) {
            cursor.skip_ws_and_comments();
            cursor.expect_byte(b'(')?;
            let mut args = Vec::new();
            cursor.skip_ws_and_comments();
            if !cursor.consume_byte(b')') {
                loop {
                    args.push(parse_expr(cursor)?);
                    cursor.skip_ws_and_comments();
                    if cursor.consume_byte(b',') {
                        continue;
                    }
                    cursor.expect_byte(b')')?;
                    break;
                }
            }
            expr = Expr::StringCall {
                target: Box::new(expr),
                method,
                args,
            };
            continue;
        }

        if let Some(prop) = dom_prop_from_name(&name) {
            let target = expr_to_dom_query(&expr)?;
            expr = Expr::DomRead { target, prop };
            continue;
        }

        return Err(Error::ScriptParse(format!("unsupported property: {name}")));
    }
}

fn expr_to_dom_query(expr: &Expr) -> Result<DomQuery> {
    match expr {
        Expr::DomQueryExpr(query) => Ok(query.clone()),
        Expr::Var(name) => Ok(DomQuery::Var(name.clone())),
        _ => Err(Error::ScriptParse(
            "property access requires an element reference".into(),
        )),
    }
}

fn str_method_from_name(name: &str) -> Option<StrMethod> {
    match name {
        "indexOf" => Some(StrMethod::IndexOf),
        "replace" => Some(StrMethod::Replace),
        "toLowerCase" => Some(StrMethod::ToLowerCase),
        "toUpperCase" => Some(StrMethod::ToUpperCase),
        "trim" => Some(StrMethod::Trim),
        "substring" => Some(StrMethod::Substring),
        "charAt" => Some(StrMethod::CharAt),
        "match" => Some(StrMethod::Match),
        _ => None,
    }
}

fn parse_primary(cursor: &mut Cursor<'_>) -> Result<Expr> {
    cursor.skip_ws_and_comments();

    if cursor.consume_byte(b'(') {
        let expr = parse_expr(cursor)?;
        cursor.skip_ws_and_comments();
        cursor.expect_byte(b')')?;
        return Ok(expr);
    }

    match cursor.peek() {
        Some(b'\'' | b'"') => {
            let value = parse_string_literal(cursor)?;
            return Ok(Expr::String(value));
        }
        Some(b'/') => {
            return parse_regex_literal(cursor);
        }
        Some(b) if b.is_ascii_digit() => {
            return parse_number_literal(cursor);
        }
        _ => {}
    }

    if cursor.consume_keyword("true") {
        return Ok(Expr::Bool(true));
    }
    if cursor.consume_keyword("false") {
        return Ok(Expr::Bool(false));
    }
    if cursor.consume_keyword("null") {
        return Ok(Expr::Null);
    }
    if cursor.consume_keyword("undefined") {
        return Ok(Expr::Undefined);
    }

    // window.x reads resolve to the same global binding as bare x.
    while cursor.consume_keyword("window") {
        cursor.skip_ws_and_comments();
        cursor.expect_byte(b'.')?;
        cursor.skip_ws_and_comments();
    }

    if let Some(query) = try_parse_get_element_by_id(cursor)? {
        return Ok(Expr::DomQueryExpr(query));
    }

    let start = cursor.pos();
    if cursor.consume_keyword("Math") {
        cursor.skip_ws_and_comments();
        if cursor.consume_byte(b'.') {
            cursor.skip_ws_and_comments();
            if cursor.consume_keyword("random") {
                cursor.skip_ws_and_comments();
                cursor.expect_byte(b'(')?;
                cursor.skip_ws_and_comments();
                cursor.expect_byte(b')')?;
                return Ok(Expr::MathRandom);
            }
            return Err(Error::ScriptParse(format!(
                "unsupported Math member at {}",
                cursor.pos()
            )));
        }
        cursor.set_pos(start);
    }

    let name = cursor.parse_identifier()?;
    Ok(Expr::Var(name))
}

fn parse_string_literal(cursor: &mut Cursor<'_>) -> Result<String> {
    let quote = match cursor.peek() {
        Some(b @ (b'\'' | b'"')) => b,
        _ => {
            return Err(Error::ScriptParse(format!(
                "expected a string literal at {}",
                cursor.pos()
            )));
        }
    };
    cursor.consume_byte(quote);

    let mut out = String::new();
    loop {
        let Some(b) = cursor.peek() else {
            return Err(Error::ScriptParse("unterminated string literal".into()));
        };
        if b == quote {
            cursor.consume_byte(quote);
            return Ok(out);
        }
        if b == b'\\' {
            cursor.consume_byte(b'\\');
            let Some(escaped) = cursor.peek() else {
                return Err(Error::ScriptParse("unterminated string escape".into()));
            };
            cursor.consume_byte(escaped);
            match escaped {
                b'n' => out.push('\n'),
                b'r' => out.push('\r'),
                b't' => out.push('\t'),
                b'0' => out.push('\0'),
                other => out.push(other as char),
            }
            continue;
        }
        let ch = cursor.src[cursor.pos()..].chars().next().unwrap_or_default();
        out.push(ch);
        cursor.set_pos(cursor.pos() + ch.len_utf8());
    }
}

fn parse_regex_literal(cursor: &mut Cursor<'_>) -> Result<Expr> {
    cursor.expect_byte(b'/')?;
    let mut pattern = String::new();
    let mut in_class = false;
    loop {
        let Some(b) = cursor.peek() else {
            return Err(Error::ScriptParse("unterminated regex literal".into()));
        };
        match b {
            b'\\' => {
                cursor.consume_byte(b'\\');
                let Some(escaped) = cursor.peek() else {
                    return Err(Error::ScriptParse("unterminated regex escape".into()));
                };
                cursor.consume_byte(escaped);
                pattern.push('\\');
                pattern.push(escaped as char);
            }
            b'[' => {
                cursor.consume_byte(b'[');
                in_class = true;
                pattern.push('[');
            }
            b']' => {
                cursor.consume_byte(b']');
                in_class = false;
                pattern.push(']');
            }
            b'/' if !in_class => {
                cursor.consume_byte(b'/');
                break;
            }
            b'\n' => {
                return Err(Error::ScriptParse("unterminated regex literal".into()));
            }
            _ => {
                let ch = cursor.src[cursor.pos()..].chars().next().unwrap_or_default();
                pattern.push(ch);
                cursor.set_pos(cursor.pos() + ch.len_utf8());
            }
        }
    }

    let mut flags = String::new();
    while cursor.peek().is_some_and(is_ident_char) {
        flags.push(cursor.peek().unwrap_or_default() as char);
        cursor.set_pos(cursor.pos() + 1);
    }

    Ok(Expr::RegexLiteral { pattern, flags })
}

fn parse_number_literal(cursor: &mut Cursor<'_>) -> Result<Expr> {
    let start = cursor.pos();
    while cursor.peek().is_some_and(|b| b.is_ascii_digit()) {
        cursor.set_pos(cursor.pos() + 1);
    }
    let mut is_float = false;
    if cursor.peek() == Some(b'.') && cursor.peek_at(1).is_some_and(|b| b.is_ascii_digit()) {
        is_float = true;
        cursor.set_pos(cursor.pos() + 1);
        while cursor.peek().is_some_and(|b| b.is_ascii_digit()) {
            cursor.set_pos(cursor.pos() + 1);
        }
    }

    let raw = &cursor.src[start..cursor.pos()];
    if is_float {
        let value = raw
            .parse::<f64>()
            .map_err(|_| Error::ScriptParse(format!("invalid number literal: {raw}")))?;
        Ok(Expr::Float(value))
    } else {
        let value = raw
            .parse::<i64>()
            .map_err(|_| Error::ScriptParse(format!("invalid number literal: {raw}")))?;
        Ok(Expr::Number(value))
    }
}
