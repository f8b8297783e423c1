use crate::expression::ast::{BinaryOp, Expr, UnaryOp};
use crate::expression::error::ExprError;
use crate::expression::parser::parse_expr;
use crate::foundation::error::NodeResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    Abs,
    Min,
    Max,
    Clip,
    Sqrt,
    Exp,
    Log,
    Sin,
    Cos,
    Tan,
    Tanh,
    Pow,
    Floor,
    Ceil,
    Round,
}

impl Builtin {
    fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "abs" => Self::Abs,
            "min" | "minimum" => Self::Min,
            "max" | "maximum" => Self::Max,
            "clip" | "clamp" => Self::Clip,
            "sqrt" => Self::Sqrt,
            "exp" => Self::Exp,
            "log" => Self::Log,
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            "tan" => Self::Tan,
            "tanh" => Self::Tanh,
            "pow" | "power" => Self::Pow,
            "floor" => Self::Floor,
            "ceil" => Self::Ceil,
            "round" => Self::Round,
            _ => return None,
        })
    }

    fn arity_ok(self, argc: usize) -> bool {
        match self {
            Self::Min | Self::Max => argc >= 2,
            Self::Clip => argc == 3,
            Self::Pow => argc == 2,
            _ => argc == 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Op {
    PushConst(f64),
    LoadX,
    Neg,
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    Call { builtin: Builtin, argc: u8 },
}

/// A compiled per-value math expression over the variable `x`.
///
/// The language is plain infix arithmetic: numbers, `x`, `pi`, `e`,
/// `+ - * / // % **`, unary signs, parentheses and calls to `abs min max clip clamp sqrt exp
/// log sin cos tan tanh pow floor ceil round`, optionally written as `np.name` or `math.name`.
/// Evaluation follows IEEE semantics, so division by zero yields an infinity or NaN rather
/// than an error.
#[derive(Debug, Clone)]
pub struct PixelExpr {
    ops: Vec<Op>,
    max_stack: usize,
}

impl PixelExpr {
    pub fn compile(src: &str) -> NodeResult<Self> {
        let ast = parse_expr(src)?;
        let mut c = Compiler::default();
        c.emit(&ast)?;
        Ok(Self {
            ops: c.ops,
            max_stack: c.max_depth,
        })
    }

    pub fn eval(&self, x: f64) -> f64 {
        let mut stack = Vec::with_capacity(self.max_stack);
        self.eval_with_stack(x, &mut stack)
    }

    /// Evaluate reusing `stack`, which avoids an allocation per value in hot loops.
    pub fn eval_with_stack(&self, x: f64, stack: &mut Vec<f64>) -> f64 {
        stack.clear();
        for &op in &self.ops {
            match op {
                Op::PushConst(v) => stack.push(v),
                Op::LoadX => stack.push(x),
                Op::Neg => {
                    let v = pop(stack);
                    stack.push(-v);
                }
                Op::Add => bin(stack, |a, b| a + b),
                Op::Sub => bin(stack, |a, b| a - b),
                Op::Mul => bin(stack, |a, b| a * b),
                Op::Div => bin(stack, |a, b| a / b),
                Op::FloorDiv => bin(stack, |a, b| (a / b).floor()),
                Op::Mod => bin(stack, py_mod),
                Op::Pow => bin(stack, f64::powf),
                Op::Call { builtin, argc } => call(stack, builtin, argc as usize),
            }
        }
        pop(stack)
    }
}

// Stack depth is checked at compile time; an empty pop yields NaN.
fn pop(stack: &mut Vec<f64>) -> f64 {
    stack.pop().unwrap_or(f64::NAN)
}

fn bin(stack: &mut Vec<f64>, f: impl FnOnce(f64, f64) -> f64) {
    let b = pop(stack);
    let a = pop(stack);
    stack.push(f(a, b));
}

/// Floored modulo: the result takes the sign of the divisor.
fn py_mod(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r != 0.0 && (r < 0.0) != (b < 0.0) {
        r + b
    } else {
        r
    }
}

fn call(stack: &mut Vec<f64>, builtin: Builtin, argc: usize) {
    let v = match builtin {
        Builtin::Min | Builtin::Max => {
            let start = stack.len().saturating_sub(argc);
            let args = stack.split_off(start);
            let pick = if builtin == Builtin::Min {
                f64::min
            } else {
                f64::max
            };
            args.into_iter().reduce(pick).unwrap_or(f64::NAN)
        }
        Builtin::Clip => {
            let hi = pop(stack);
            let lo = pop(stack);
            let x = pop(stack);
            x.max(lo).min(hi)
        }
        Builtin::Pow => {
            let e = pop(stack);
            let b = pop(stack);
            b.powf(e)
        }
        Builtin::Abs => pop(stack).abs(),
        Builtin::Sqrt => pop(stack).sqrt(),
        Builtin::Exp => pop(stack).exp(),
        Builtin::Log => pop(stack).ln(),
        Builtin::Sin => pop(stack).sin(),
        Builtin::Cos => pop(stack).cos(),
        Builtin::Tan => pop(stack).tan(),
        Builtin::Tanh => pop(stack).tanh(),
        Builtin::Floor => pop(stack).floor(),
        Builtin::Ceil => pop(stack).ceil(),
        Builtin::Round => pop(stack).round_ties_even(),
    };
    stack.push(v);
}

#[derive(Default)]
struct Compiler {
    ops: Vec<Op>,
    depth: usize,
    max_depth: usize,
}

impl Compiler {
    fn push(&mut self, op: Op, pops: usize) {
        self.ops.push(op);
        self.depth = self.depth - pops + 1;
        self.max_depth = self.max_depth.max(self.depth);
    }

    fn emit(&mut self, e: &Expr) -> Result<(), ExprError> {
        match e {
            Expr::Num(v) => self.push(Op::PushConst(*v), 0),
            Expr::Var { name, offset } => {
                let op = match name.as_str() {
                    "x" => Op::LoadX,
                    "pi" => Op::PushConst(std::f64::consts::PI),
                    "e" => Op::PushConst(std::f64::consts::E),
                    _ => {
                        return Err(ExprError::new(
                            *offset,
                            format!("unknown variable '{name}' (only x, pi and e are defined)"),
                        ));
                    }
                };
                self.push(op, 0);
            }
            Expr::Unary { op, expr } => {
                self.emit(expr)?;
                if *op == UnaryOp::Neg {
                    self.push(Op::Neg, 1);
                }
            }
            Expr::Binary { op, left, right } => {
                self.emit(left)?;
                self.emit(right)?;
                let op = match op {
                    BinaryOp::Add => Op::Add,
                    BinaryOp::Sub => Op::Sub,
                    BinaryOp::Mul => Op::Mul,
                    BinaryOp::Div => Op::Div,
                    BinaryOp::FloorDiv => Op::FloorDiv,
                    BinaryOp::Mod => Op::Mod,
                    BinaryOp::Pow => Op::Pow,
                };
                self.push(op, 2);
            }
            Expr::Call { func, args, offset } => {
                let builtin = Builtin::lookup(func).ok_or_else(|| {
                    ExprError::new(*offset, format!("unknown function '{func}'"))
                })?;
                if !builtin.arity_ok(args.len()) {
                    return Err(ExprError::new(
                        *offset,
                        format!("wrong number of arguments to '{func}': {}", args.len()),
                    ));
                }
                let argc = u8::try_from(args.len())
                    .map_err(|_| ExprError::new(*offset, "too many arguments"))?;
                for a in args {
                    self.emit(a)?;
                }
                self.push(Op::Call { builtin, argc }, args.len());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/expression/program.rs"]
mod tests;
