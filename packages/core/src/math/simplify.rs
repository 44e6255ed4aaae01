use super::{MathExpr, Operator};
use crate::config::SimplifyPolicy;

/// Normalize an expression according to `policy`.
pub fn simplify(expr: &MathExpr, policy: SimplifyPolicy) -> MathExpr {
    match policy {
        SimplifyPolicy::None => expr.clone(),
        SimplifyPolicy::Numbers => fold_numbers(expr),
        SimplifyPolicy::Full => full(&fold_numbers(expr)),
    }
}

fn fold_numbers(expr: &MathExpr) -> MathExpr {
    let MathExpr::Apply(op, args) = expr else {
        return expr.clone();
    };
    let args: Vec<MathExpr> = args.iter().map(fold_numbers).collect();

    match op {
        Operator::Neg => match args.as_slice() {
            [MathExpr::Number(n)] => MathExpr::Number(-n),
            _ => MathExpr::Apply(*op, args),
        },
        Operator::Add | Operator::Mul => {
            let (numbers, rest): (Vec<MathExpr>, Vec<MathExpr>) =
                args.into_iter().partition(|a| matches!(a, MathExpr::Number(_)));
            let values = numbers.iter().filter_map(MathExpr::evaluate);
            let folded = if *op == Operator::Add {
                values.sum::<f64>()
            } else {
                values.product::<f64>()
            };
            if rest.is_empty() {
                return MathExpr::Number(folded);
            }
            let mut items = rest;
            if !numbers.is_empty() {
                // constants lead products and trail sums
                if *op == Operator::Mul {
                    items.insert(0, MathExpr::Number(folded));
                } else {
                    items.push(MathExpr::Number(folded));
                }
            }
            if items.len() == 1 {
                items.remove(0)
            } else {
                MathExpr::Apply(*op, items)
            }
        }
        Operator::Div | Operator::Pow => match args.as_slice() {
            [MathExpr::Number(a), MathExpr::Number(b)] => {
                let value = if *op == Operator::Div { a / b } else { a.powf(*b) };
                if value.is_finite() {
                    MathExpr::Number(value)
                } else {
                    MathExpr::Apply(*op, args)
                }
            }
            _ => MathExpr::Apply(*op, args),
        },
        Operator::Eq => MathExpr::Apply(*op, args),
    }
}

fn full(expr: &MathExpr) -> MathExpr {
    let MathExpr::Apply(op, args) = expr else {
        return expr.clone();
    };
    let args: Vec<MathExpr> = args.iter().map(full).collect();

    match op {
        Operator::Add | Operator::Mul => {
            let identity = if *op == Operator::Add { 0.0 } else { 1.0 };
            let mut flat = Vec::new();
            for arg in args {
                match arg {
                    MathExpr::Apply(inner, nested) if inner == *op => flat.extend(nested),
                    MathExpr::Number(n) if n == identity => {}
                    other => flat.push(other),
                }
            }
            if *op == Operator::Mul && flat.iter().any(|a| matches!(a, MathExpr::Number(n) if *n == 0.0)) {
                return MathExpr::Number(0.0);
            }
            match flat.len() {
                0 => MathExpr::Number(identity),
                1 => flat.remove(0),
                _ => fold_numbers(&MathExpr::Apply(*op, flat)),
            }
        }
        Operator::Neg => match args.as_slice() {
            [MathExpr::Apply(Operator::Neg, inner)] if inner.len() == 1 => inner[0].clone(),
            _ => fold_numbers(&MathExpr::Apply(*op, args)),
        },
        Operator::Pow => match args.as_slice() {
            [base, MathExpr::Number(e)] if *e == 1.0 => base.clone(),
            [_, MathExpr::Number(e)] if *e == 0.0 => MathExpr::Number(1.0),
            _ => fold_numbers(&MathExpr::Apply(*op, args)),
        },
        Operator::Div => match args.as_slice() {
            [numerator, MathExpr::Number(d)] if *d == 1.0 => numerator.clone(),
            _ => fold_numbers(&MathExpr::Apply(*op, args)),
        },
        Operator::Eq => MathExpr::Apply(*op, args),
    }
}
