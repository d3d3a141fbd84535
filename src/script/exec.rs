use super::*;

impl Page {
    // The single entry point through which server-supplied script text runs.
    pub(crate) fn exec_script_source(&mut self, src: &str) -> Result<()> {
        let stmts = parse_script(src)?;
        self.exec_stmts(&stmts)
    }

    pub(crate) fn exec_stmts(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            self.exec_stmt(stmt)?;
        }
        Ok(())
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::VarDecl { name, expr } => {
                let value = match expr {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Undefined,
                };
                self.globals.insert(name.clone(), value);
            }
            Stmt::VarAssign { name, op, expr } => {
                let rhs = self.eval_expr(expr)?;
                let value = match op {
                    AssignOp::Assign => rhs,
                    AssignOp::Add => {
                        let current = self
                            .globals
                            .get(name)
                            .cloned()
                            .unwrap_or(Value::Undefined);
                        self.binary_add(&current, &rhs)?
                    }
                };
                self.globals.insert(name.clone(), value);
            }
            Stmt::DomAssign { target, prop, expr } => {
                let value = self.eval_expr(expr)?;
                let node = self.resolve_query(target)?;
                self.write_dom_prop(node, prop, &value)?;
            }
            Stmt::Alert(message) => {
                let text = self.eval_expr(message)?.as_string();
                self.trace_ajax_line(format!("[script] alert {text}"));
                self.alert_messages.push(text);
            }
            Stmt::SetTimeout { code, delay_ms } => {
                let source = self.eval_expr(code)?.as_string();
                let delay = self.eval_number(delay_ms)? as i64;
                let body = parse_script(&source)?;
                self.schedule_script_task(body, delay, None)?;
            }
            Stmt::If {
                cond,
                then_body,
                else_body,
            } => {
                if self.eval_expr(cond)?.truthy() {
                    self.exec_stmts(then_body)?;
                } else {
                    self.exec_stmts(else_body)?;
                }
            }
            Stmt::While { cond, body } => {
                let mut steps = 0usize;
                while self.eval_expr(cond)?.truthy() {
                    steps += 1;
                    if steps > SCRIPT_LOOP_STEP_LIMIT {
                        return Err(Error::ScriptRuntime(format!(
                            "while loop exceeded {SCRIPT_LOOP_STEP_LIMIT} iterations"
                        )));
                    }
                    self.exec_stmts(body)?;
                }
            }
            Stmt::Block(body) => {
                self.exec_stmts(body)?;
            }
            Stmt::ExprStmt(expr) => {
                self.eval_expr(expr)?;
            }
        }
        Ok(())
    }

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::String(value) => Ok(Value::String(value.clone())),
            Expr::Number(value) => Ok(Value::Number(*value)),
            Expr::Float(value) => Ok(Value::Float(*value)),
            Expr::Bool(value) => Ok(Value::Bool(*value)),
            Expr::Null => Ok(Value::Null),
            Expr::Undefined => Ok(Value::Undefined),
            // A read of a binding that was never assigned yields undefined,
            // which is what typeof-style feature probes rely on.
            Expr::Var(name) => Ok(self
                .globals
                .get(name)
                .cloned()
                .unwrap_or(Value::Undefined)),
            Expr::DomQueryExpr(query) => Ok(Value::Node(self.resolve_query(query)?)),
            Expr::DomRead { target, prop } => {
                let node = self.resolve_query(target)?;
                self.read_dom_prop(node, prop)
            }
            Expr::StrLength(inner) => {
                let value = self.eval_expr(inner)?.as_string();
                Ok(Value::Number(value.chars().count() as i64))
            }
            Expr::StringCall {
                target,
                method,
                args,
            } => self.eval_string_call(target, *method, args),
            Expr::RegexLiteral { pattern, flags } => {
                // Standalone literal in value position: keep its source form.
                Ok(Value::String(format!("/{pattern}/{flags}")))
            }
            Expr::RegexTest {
                pattern,
                flags,
                input,
            } => {
                let input = self.eval_expr(input)?.as_string();
                let regex = crate::js_regex::Regex::new(pattern, flags)
                    .map_err(|err| Error::ScriptRuntime(err.to_string()))?;
                let matched = regex
                    .is_match(&input)
                    .map_err(|err| Error::ScriptRuntime(err.to_string()))?;
                Ok(Value::Bool(matched))
            }
            Expr::MathRandom => Ok(Value::Float(self.next_random_f64())),
            Expr::Unary { op, expr } => {
                let value = self.eval_expr(expr)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.truthy())),
                    UnaryOp::Neg => {
                        let number = value.as_number().ok_or_else(|| {
                            Error::ScriptRuntime(format!(
                                "cannot negate a {}",
                                value.type_of()
                            ))
                        })?;
                        Ok(Value::from_f64(-number))
                    }
                    UnaryOp::Typeof => Ok(Value::String(value.type_of().to_string())),
                }
            }
            Expr::Binary { op, lhs, rhs } => self.eval_binary(*op, lhs, rhs),
            Expr::Cond {
                cond,
                then_expr,
                else_expr,
            } => {
                if self.eval_expr(cond)?.truthy() {
                    self.eval_expr(then_expr)
                } else {
                    self.eval_expr(else_expr)
                }
            }
        }
    }

    fn eval_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<Value> {
        // && and || short-circuit and yield the deciding operand.
        if op == BinaryOp::And {
            let left = self.eval_expr(lhs)?;
            if !left.truthy() {
                return Ok(left);
            }
            return self.eval_expr(rhs);
        }
        if op == BinaryOp::Or {
            let left = self.eval_expr(lhs)?;
            if left.truthy() {
                return Ok(left);
            }
            return self.eval_expr(rhs);
        }

        let left = self.eval_expr(lhs)?;
        let right = self.eval_expr(rhs)?;

        match op {
            BinaryOp::Add => self.binary_add(&left, &right),
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                let a = self.require_number(&left)?;
                let b = self.require_number(&right)?;
                let result = match op {
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    _ => a % b,
                };
                Ok(Value::from_f64(result))
            }
            BinaryOp::Eq => Ok(Value::Bool(loose_eq(&left, &right))),
            BinaryOp::Ne => Ok(Value::Bool(!loose_eq(&left, &right))),
            BinaryOp::StrictEq => Ok(Value::Bool(strict_eq(&left, &right))),
            BinaryOp::StrictNe => Ok(Value::Bool(!strict_eq(&left, &right))),
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
                if let (Value::String(a), Value::String(b)) = (&left, &right) {
                    return Ok(Value::Bool(match op {
                        BinaryOp::Lt => a < b,
                        BinaryOp::Gt => a > b,
                        BinaryOp::Le => a <= b,
                        _ => a >= b,
                    }));
                }
                let a = self.require_number(&left)?;
                let b = self.require_number(&right)?;
                Ok(Value::Bool(match op {
                    BinaryOp::Lt => a < b,
                    BinaryOp::Gt => a > b,
                    BinaryOp::Le => a <= b,
                    _ => a >= b,
                }))
            }
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }
    }

    fn binary_add(&self, left: &Value, right: &Value) -> Result<Value> {
        if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
            return Ok(Value::String(format!(
                "{}{}",
                left.as_string(),
                right.as_string()
            )));
        }
        let a = self.require_number(left)?;
        let b = self.require_number(right)?;
        Ok(Value::from_f64(a + b))
    }

    fn require_number(&self, value: &Value) -> Result<f64> {
        value.as_number().ok_or_else(|| {
            Error::ScriptRuntime(format!(
                "expected a number, got {}",
                value.type_of()
            ))
        })
    }

    fn eval_number(&mut self, expr: &Expr) -> Result<f64> {
        let value = self.eval_expr(expr)?;
        self.require_number(&value)
    }

    fn eval_string_call(
        &mut self,
        target: &Expr,
        method: StrMethod,
        args: &[Expr],
    ) -> Result<Value> {
        let subject = self.eval_expr(target)?.as_string();
        match method {
            StrMethod::ToLowerCase => Ok(Value::String(subject.to_lowercase())),
            StrMethod::ToUpperCase => Ok(Value::String(subject.to_uppercase())),
            StrMethod::Trim => Ok(Value::String(subject.trim().to_string())),
            StrMethod::IndexOf => {
                let needle = self.eval_arg_string(args, 0)?;
                let index = subject.find(&needle).map_or(-1, |byte_index| {
                    subject[..byte_index].chars().count() as i64
                });
                Ok(Value::Number(index))
            }
            StrMethod::CharAt => {
                let index = self
                    .eval_arg_number(args, 0)
                    .unwrap_or(0.0)
                    .max(0.0) as usize;
                let out = subject
                    .chars()
                    .nth(index)
                    .map(String::from)
                    .unwrap_or_default();
                Ok(Value::String(out))
            }
            StrMethod::Substring => {
                let chars = subject.chars().collect::<Vec<_>>();
                let mut start = self.eval_arg_number(args, 0).unwrap_or(0.0).max(0.0) as usize;
                let mut end = match args.get(1) {
                    Some(_) => self
                        .eval_arg_number(args, 1)
                        .unwrap_or(chars.len() as f64)
                        .max(0.0) as usize,
                    None => chars.len(),
                };
                start = start.min(chars.len());
                end = end.min(chars.len());
                if start > end {
                    std::mem::swap(&mut start, &mut end);
                }
                Ok(Value::String(chars[start..end].iter().collect()))
            }
            StrMethod::Replace => {
                // String patterns replace the first occurrence only.
                match args.first() {
                    Some(Expr::RegexLiteral { pattern, flags }) => {
                        let replacement = self.eval_arg_string(args, 1)?;
                        let regex = crate::js_regex::Regex::new(pattern, flags)
                            .map_err(|err| Error::ScriptRuntime(err.to_string()))?;
                        let matched = regex
                            .find(&subject)
                            .map_err(|err| Error::ScriptRuntime(err.to_string()))?;
                        match matched {
                            Some(found) => {
                                Ok(Value::String(subject.replacen(&found, &replacement, 1)))
                            }
                            None => Ok(Value::String(subject)),
                        }
                    }
                    Some(_) => {
                        let from = self.eval_arg_string(args, 0)?;
                        let to = self.eval_arg_string(args, 1)?;
                        Ok(Value::String(subject.replacen(&from, &to, 1)))
                    }
                    None => Err(Error::ScriptRuntime(
                        "replace() requires two arguments".into(),
                    )),
                }
            }
            StrMethod::Match => match args.first() {
                Some(Expr::RegexLiteral { pattern, flags }) => {
                    let regex = crate::js_regex::Regex::new(pattern, flags)
                        .map_err(|err| Error::ScriptRuntime(err.to_string()))?;
                    let matched = regex
                        .find(&subject)
                        .map_err(|err| Error::ScriptRuntime(err.to_string()))?;
                    Ok(matched.map(Value::String).unwrap_or(Value::Null))
                }
                Some(_) => {
                    let pattern = self.eval_arg_string(args, 0)?;
                    let regex = crate::js_regex::Regex::new(&pattern, "")
                        .map_err(|err| Error::ScriptRuntime(err.to_string()))?;
                    let matched = regex
                        .find(&subject)
                        .map_err(|err| Error::ScriptRuntime(err.to_string()))?;
                    Ok(matched.map(Value::String).unwrap_or(Value::Null))
                }
                None => Err(Error::ScriptRuntime("match() requires an argument".into())),
            },
        }
    }

    fn eval_arg_string(&mut self, args: &[Expr], index: usize) -> Result<String> {
        let arg = args.get(index).ok_or_else(|| {
            Error::ScriptRuntime(format!("missing argument {index}"))
        })?;
        Ok(self.eval_expr(arg)?.as_string())
    }

    fn eval_arg_number(&mut self, args: &[Expr], index: usize) -> Option<f64> {
        let arg = args.get(index)?;
        self.eval_expr(arg).ok()?.as_number()
    }

    pub(crate) fn resolve_query(&self, query: &DomQuery) -> Result<NodeId> {
        match query {
            DomQuery::ById(id) => self.dom.by_id(id).ok_or_else(|| {
                Error::ScriptRuntime(format!("{} found no element", query.describe()))
            }),
            DomQuery::Var(name) => match self.globals.get(name) {
                Some(Value::Node(node)) => Ok(*node),
                Some(other) => Err(Error::ScriptRuntime(format!(
                    "{name} is a {}, not an element",
                    other.type_of()
                ))),
                None => Err(Error::ScriptRuntime(format!("{name} is not defined"))),
            },
        }
    }

    fn read_dom_prop(&self, node: NodeId, prop: &DomProp) -> Result<Value> {
        match prop {
            DomProp::Value => Ok(Value::String(self.dom.value(node)?)),
            DomProp::Checked => Ok(Value::Bool(
                self.dom.element(node).map(|e| e.checked).unwrap_or(false),
            )),
            DomProp::Disabled => Ok(Value::Bool(
                self.dom.element(node).map(|e| e.disabled).unwrap_or(false),
            )),
            DomProp::TextContent => Ok(Value::String(self.dom.text_content(node))),
            DomProp::InnerHtml => Ok(Value::String(self.dom.inner_html(node)?)),
            DomProp::ClassName => Ok(Value::String(
                self.dom.attr(node, "class").unwrap_or_default(),
            )),
            DomProp::Id => Ok(Value::String(self.dom.attr(node, "id").unwrap_or_default())),
            DomProp::Style(prop) => Ok(Value::String(
                self.dom.style(node, prop).unwrap_or_default(),
            )),
        }
    }

    fn write_dom_prop(&mut self, node: NodeId, prop: &DomProp, value: &Value) -> Result<()> {
        match prop {
            DomProp::Value => self.dom.set_value(node, &value.as_string()),
            DomProp::Checked => self.dom.set_checked(node, value.truthy()),
            DomProp::Disabled => {
                let element = self.dom.element_mut(node).ok_or_else(|| {
                    Error::ScriptRuntime("disabled target is not an element".into())
                })?;
                element.disabled = value.truthy();
                Ok(())
            }
            DomProp::TextContent => self.dom.set_text_content(node, &value.as_string()),
            DomProp::InnerHtml => self.dom.set_inner_html(node, &value.as_string()),
            DomProp::ClassName => self.dom.set_attr(node, "class", &value.as_string()),
            DomProp::Id => self.dom.set_attr(node, "id", &value.as_string()),
            DomProp::Style(prop) => self.dom.set_style(node, prop, &value.as_string()),
        }
    }
}

fn strict_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Node(a), Value::Node(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Null, Value::Null) | (Value::Undefined, Value::Undefined) => true,
        _ => match (left.as_number(), right.as_number()) {
            (Some(a), Some(b))
                if left.type_of() == "number" && right.type_of() == "number" =>
            {
                a == b
            }
            _ => false,
        },
    }
}

fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null | Value::Undefined, Value::Null | Value::Undefined) => true,
        // null and undefined are loosely equal only to each other.
        (Value::Null | Value::Undefined, _) | (_, Value::Null | Value::Undefined) => false,
        (Value::Node(a), Value::Node(b)) => a == b,
        (Value::Node(_), _) | (_, Value::Node(_)) => false,
        (Value::String(a), Value::String(b)) => a == b,
        _ => match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => left.as_string() == right.as_string(),
        },
    }
}

const SCRIPT_LOOP_STEP_LIMIT: usize = 100_000;
