use super::*;

/// Render a lowered expression as Java-like source text.
pub fn print_expr(expr: &JExpr) -> String {
    let mut pp = IrPrinter::new();
    pp.emit_expr(expr, 0);
    pp.buf
}

/// Render a lowered statement, one line per simple statement.
pub fn print_stmt(stmt: &JStmt) -> String {
    let mut pp = IrPrinter::new();
    pp.emit_stmt(stmt);
    pp.buf
}

/// Render a class member, as it appears inside an anonymous class body.
pub fn print_member(member: &JMember) -> String {
    let mut pp = IrPrinter::new();
    pp.emit_member(member);
    pp.buf
}

pub fn print_type(ty: &JType) -> String {
    let mut pp = IrPrinter::new();
    pp.emit_type(ty);
    pp.buf
}

struct IrPrinter {
    buf: String,
    indent: usize,
}

const PREC_ASSIGN: u8 = 1;
const PREC_COND: u8 = 2;
const PREC_UNARY: u8 = 13;
const PREC_POSTFIX: u8 = 14;

impl IrPrinter {
    fn new() -> Self {
        Self { buf: String::new(), indent: 0 }
    }

    fn write(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    fn newline(&mut self) {
        self.buf.push('\n');
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.buf.push_str("    ");
        }
    }

    fn indent(&mut self) {
        self.indent += 1;
    }

    fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    fn comma_separated<T>(&mut self, items: &[T], mut emit: impl FnMut(&mut Self, &T)) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            emit(self, item);
        }
    }

    // ── Types ────────────────────────────────────────────────────

    fn emit_type(&mut self, ty: &JType) {
        match ty {
            JType::Prim(p) => self.write(p.java_name()),
            JType::Class { name, args } => {
                self.write(name);
                if !args.is_empty() {
                    self.write("<");
                    self.comma_separated(args, |pp, a| pp.emit_type_arg(a));
                    self.write(">");
                }
            }
            JType::Array(element) => {
                self.emit_type(element);
                self.write("[]");
            }
        }
    }

    fn emit_type_arg(&mut self, arg: &JTypeArg) {
        match arg {
            JTypeArg::Type(t) => self.emit_type(t),
            JTypeArg::Wildcard => self.write("?"),
            JTypeArg::Extends(t) => {
                self.write("? extends ");
                self.emit_type(t);
            }
            JTypeArg::Super(t) => {
                self.write("? super ");
                self.emit_type(t);
            }
        }
    }

    // ── Expressions ──────────────────────────────────────────────

    fn emit_expr(&mut self, expr: &JExpr, parent_prec: u8) {
        match expr {
            JExpr::Literal(lit) => self.emit_literal(lit),
            JExpr::Ident(name) => self.write(name),
            JExpr::QualifiedThis(class) => {
                self.write(class);
                self.write(".this");
            }
            JExpr::Select { target, name } => {
                self.emit_expr(target, PREC_POSTFIX);
                self.write(".");
                self.write(name);
            }
            JExpr::Apply { type_args, method, args } => {
                match (&**method, type_args.is_empty()) {
                    (JExpr::Select { target, name }, false) => {
                        self.emit_expr(target, PREC_POSTFIX);
                        self.write(".<");
                        self.comma_separated(type_args, |pp, t| pp.emit_type(t));
                        self.write(">");
                        self.write(name);
                    }
                    (_, false) => {
                        self.write("<");
                        self.comma_separated(type_args, |pp, t| pp.emit_type(t));
                        self.write(">");
                        self.emit_expr(method, PREC_POSTFIX);
                    }
                    (_, true) => self.emit_expr(method, PREC_POSTFIX),
                }
                self.write("(");
                self.comma_separated(args, |pp, a| pp.emit_expr(a, 0));
                self.write(")");
            }
            JExpr::NewClass { outer, class, args, body } => {
                if let Some(outer) = outer {
                    self.emit_expr(outer, PREC_POSTFIX);
                    self.write(".");
                }
                self.write("new ");
                self.emit_type(class);
                self.write("(");
                self.comma_separated(args, |pp, a| pp.emit_expr(a, 0));
                self.write(")");
                if let Some(members) = body {
                    self.emit_class_body(members);
                }
            }
            JExpr::NewArray { element, dims, elems } => {
                self.write("new ");
                self.emit_type(element);
                if dims.is_empty() {
                    self.write("[]");
                }
                for d in dims {
                    self.write("[");
                    self.emit_expr(d, 0);
                    self.write("]");
                }
                if let Some(elems) = elems {
                    self.write("{");
                    self.comma_separated(elems, |pp, e| pp.emit_expr(e, 0));
                    self.write("}");
                }
            }
            JExpr::TypeCast { ty, expr } => {
                self.open(PREC_UNARY, parent_prec);
                self.write("(");
                self.emit_type(ty);
                self.write(")");
                self.emit_expr(expr, PREC_UNARY);
                self.close(PREC_UNARY, parent_prec);
            }
            JExpr::InstanceOf { expr, ty } => {
                let prec = binary_prec(JBinaryOp::Lt);
                self.open(prec, parent_prec);
                self.emit_expr(expr, prec);
                self.write(" instanceof ");
                self.emit_type(ty);
                self.close(prec, parent_prec);
            }
            JExpr::Unary { op, operand } => {
                let postfix = matches!(op, JUnaryOp::PostInc | JUnaryOp::PostDec);
                let prec = if postfix { PREC_POSTFIX } else { PREC_UNARY };
                self.open(prec, parent_prec);
                match op {
                    JUnaryOp::PostInc | JUnaryOp::PostDec => {
                        self.emit_expr(operand, prec);
                        self.write(if *op == JUnaryOp::PostInc { "++" } else { "--" });
                    }
                    _ => {
                        self.write(match op {
                            JUnaryOp::Neg => "-",
                            JUnaryOp::Pos => "+",
                            JUnaryOp::Not => "!",
                            JUnaryOp::PreInc => "++",
                            _ => "--",
                        });
                        self.emit_expr(operand, prec);
                    }
                }
                self.close(prec, parent_prec);
            }
            JExpr::Binary { op, left, right } => {
                let prec = binary_prec(*op);
                self.open(prec, parent_prec);
                self.emit_expr(left, prec);
                self.write(" ");
                self.write(op.symbol());
                self.write(" ");
                self.emit_expr(right, prec + 1);
                self.close(prec, parent_prec);
            }
            JExpr::Conditional { cond, then, otherwise } => {
                self.open(PREC_COND, parent_prec);
                self.emit_expr(cond, PREC_COND + 1);
                self.write(" ? ");
                self.emit_expr(then, PREC_COND + 1);
                self.write(" : ");
                self.emit_expr(otherwise, PREC_COND);
                self.close(PREC_COND, parent_prec);
            }
            JExpr::Assign { target, value } => {
                self.open(PREC_ASSIGN, parent_prec);
                self.emit_expr(target, PREC_POSTFIX);
                self.write(" = ");
                self.emit_expr(value, PREC_ASSIGN);
                self.close(PREC_ASSIGN, parent_prec);
            }
            JExpr::AssignOp { op, target, value } => {
                self.open(PREC_ASSIGN, parent_prec);
                self.emit_expr(target, PREC_POSTFIX);
                self.write(" ");
                self.write(op.symbol());
                self.write("= ");
                self.emit_expr(value, PREC_ASSIGN);
                self.close(PREC_ASSIGN, parent_prec);
            }
            JExpr::Let { defs, expr } => {
                self.write("(let ");
                for def in defs {
                    self.emit_stmt_inline(def);
                    self.write(" ");
                }
                self.write("in ");
                self.emit_expr(expr, 0);
                self.write(")");
            }
            JExpr::Erroneous { message, .. } => {
                self.write("<error: ");
                self.write(message);
                self.write(">");
            }
        }
    }

    fn open(&mut self, prec: u8, parent_prec: u8) {
        if prec < parent_prec {
            self.write("(");
        }
    }

    fn close(&mut self, prec: u8, parent_prec: u8) {
        if prec < parent_prec {
            self.write(")");
        }
    }

    fn emit_literal(&mut self, lit: &Literal) {
        match lit {
            Literal::Null => self.write("null"),
            Literal::Bool(b) => self.write(if *b { "true" } else { "false" }),
            Literal::Int(i) => self.write(&i.to_string()),
            Literal::Long(l) => {
                self.write(&l.to_string());
                self.write("L");
            }
            Literal::Double(d) => self.write(&format!("{d:?}")),
            Literal::Char(cp) => match char::from_u32(*cp).filter(|c| !c.is_control()) {
                Some('\'') => self.write("'\\''"),
                Some('\\') => self.write("'\\\\'"),
                Some(c) => self.write(&format!("'{c}'")),
                None => self.write(&format!("{cp}")),
            },
            Literal::String(s) => {
                self.write("\"");
                self.write(&escape_string(s));
                self.write("\"");
            }
        }
    }

    // ── Statements ───────────────────────────────────────────────

    fn emit_stmt(&mut self, stmt: &JStmt) {
        self.write_indent();
        self.emit_stmt_inline(stmt);
        self.newline();
    }

    /// Emit a statement without leading indentation or trailing newline.
    fn emit_stmt_inline(&mut self, stmt: &JStmt) {
        match stmt {
            JStmt::VarDef { is_final, ty, name, init } => {
                if *is_final {
                    self.write("final ");
                }
                self.emit_type(ty);
                self.write(" ");
                self.write(name);
                if let Some(init) = init {
                    self.write(" = ");
                    self.emit_expr(init, 0);
                }
                self.write(";");
            }
            JStmt::Exec(expr) => {
                self.emit_expr(expr, 0);
                self.write(";");
            }
            JStmt::If { cond, then, otherwise } => {
                self.write("if (");
                self.emit_expr(cond, 0);
                self.write(") ");
                self.emit_nested(then);
                if let Some(otherwise) = otherwise {
                    self.write(" else ");
                    self.emit_nested(otherwise);
                }
            }
            JStmt::While { cond, body } => {
                self.write("while (");
                self.emit_expr(cond, 0);
                self.write(") ");
                self.emit_nested(body);
            }
            JStmt::Labelled { label, body } => {
                self.write(label);
                self.write(": ");
                self.emit_stmt_inline(body);
            }
            JStmt::Break(label) => {
                self.write("break");
                if let Some(label) = label {
                    self.write(" ");
                    self.write(label);
                }
                self.write(";");
            }
            JStmt::Return(expr) => {
                self.write("return");
                if let Some(expr) = expr {
                    self.write(" ");
                    self.emit_expr(expr, 0);
                }
                self.write(";");
            }
            JStmt::Block(stmts) => self.emit_block(stmts),
        }
    }

    /// Bodies of `if` and `while` are always printed as blocks.
    fn emit_nested(&mut self, stmt: &JStmt) {
        match stmt {
            JStmt::Block(stmts) => self.emit_block(stmts),
            other => self.emit_block(std::slice::from_ref(other)),
        }
    }

    fn emit_block(&mut self, stmts: &[JStmt]) {
        self.write("{");
        self.newline();
        self.indent();
        for s in stmts {
            self.emit_stmt(s);
        }
        self.dedent();
        self.write_indent();
        self.write("}");
    }

    // ── Class bodies ─────────────────────────────────────────────

    fn emit_class_body(&mut self, members: &[JMember]) {
        self.write(" {");
        self.newline();
        self.indent();
        for member in members {
            self.write_indent();
            self.emit_member(member);
            self.newline();
        }
        self.dedent();
        self.write_indent();
        self.write("}");
    }

    fn emit_modifiers(&mut self, modifiers: Modifiers) {
        for kw in modifiers.keywords() {
            self.write(kw);
            self.write(" ");
        }
    }

    fn emit_member(&mut self, member: &JMember) {
        match member {
            JMember::Field { modifiers, ty, name, init } => {
                self.emit_modifiers(*modifiers);
                self.emit_type(ty);
                self.write(" ");
                self.write(name);
                if let Some(init) = init {
                    self.write(" = ");
                    self.emit_expr(init, 0);
                }
                self.write(";");
            }
            JMember::Method(method) => {
                self.emit_modifiers(method.modifiers);
                match &method.result {
                    Some(ty) => self.emit_type(ty),
                    None => self.write("void"),
                }
                self.write(" ");
                self.write(&method.name);
                self.write("(");
                self.comma_separated(&method.params, |pp, (ty, name)| {
                    pp.emit_type(ty);
                    pp.write(" ");
                    pp.write(name);
                });
                self.write(") ");
                self.emit_block(&method.body);
            }
            JMember::Init(stmts) => self.emit_block(stmts),
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn binary_prec(op: JBinaryOp) -> u8 {
    match op {
        JBinaryOp::Or => 3,
        JBinaryOp::And => 4,
        JBinaryOp::Eq | JBinaryOp::Neq => 8,
        JBinaryOp::Lt | JBinaryOp::LtEq | JBinaryOp::Gt | JBinaryOp::GtEq => 9,
        JBinaryOp::Add | JBinaryOp::Sub => 11,
        JBinaryOp::Mul | JBinaryOp::Div | JBinaryOp::Rem => 12,
    }
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}
