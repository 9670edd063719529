//! SMT-LIB2 text for terms, as sent to external solvers.

use std::fmt::Write;

use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

/// Render `term` as an SMT-LIB2 s-expression.
pub fn to_smtlib(term: &SmtTerm) -> String {
    let mut out = String::new();
    write_term(&mut out, term);
    out
}

/// Operator symbol of a fixed-arity application node.
fn operator(term: &SmtTerm) -> Option<&'static str> {
    Some(match term {
        SmtTerm::Add(..) => "+",
        SmtTerm::Sub(..) | SmtTerm::Neg(_) => "-",
        SmtTerm::Mul(..) => "*",
        SmtTerm::Mod(..) => "mod",
        SmtTerm::Eq(..) => "=",
        SmtTerm::Lt(..) => "<",
        SmtTerm::Le(..) => "<=",
        SmtTerm::Gt(..) => ">",
        SmtTerm::Ge(..) => ">=",
        SmtTerm::Not(_) => "not",
        SmtTerm::Implies(..) => "=>",
        SmtTerm::Ite(..) => "ite",
        _ => return None,
    })
}

fn write_term(out: &mut String, term: &SmtTerm) {
    match term {
        SmtTerm::Var(name) => out.push_str(&quote_symbol(name)),
        SmtTerm::IntLit(n) if *n < 0 => {
            let _ = write!(out, "(- {})", n.unsigned_abs());
        }
        SmtTerm::IntLit(n) => {
            let _ = write!(out, "{n}");
        }
        SmtTerm::BoolLit(b) => out.push_str(if *b { "true" } else { "false" }),
        SmtTerm::And(terms) => write_connective(out, "and", "true", terms),
        SmtTerm::Or(terms) => write_connective(out, "or", "false", terms),
        SmtTerm::ForAll(bindings, body) => write_quantifier(out, "forall", bindings, body),
        SmtTerm::Exists(bindings, body) => write_quantifier(out, "exists", bindings, body),
        _ => {
            if let Some(op) = operator(term) {
                out.push('(');
                out.push_str(op);
                for child in term.children() {
                    out.push(' ');
                    write_term(out, child);
                }
                out.push(')');
            }
        }
    }
}

fn write_connective(out: &mut String, op: &str, unit: &str, terms: &[SmtTerm]) {
    match terms {
        [] => out.push_str(unit),
        [only] => write_term(out, only),
        _ => {
            out.push('(');
            out.push_str(op);
            for t in terms {
                out.push(' ');
                write_term(out, t);
            }
            out.push(')');
        }
    }
}

fn write_quantifier(out: &mut String, q: &str, bindings: &[(String, SmtSort)], body: &SmtTerm) {
    let _ = write!(out, "({q} (");
    for (i, (name, sort)) in bindings.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "({} {})", quote_symbol(name), sort_to_smtlib(sort));
    }
    out.push_str(") ");
    write_term(out, body);
    out.push(')');
}

pub fn sort_to_smtlib(sort: &SmtSort) -> &'static str {
    sort.smtlib_name()
}

/// Symbols outside the SMT-LIB simple-symbol alphabet are wrapped in `|...|`.
pub fn quote_symbol(name: &str) -> String {
    let simple = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "~!@$%^&*_-+=<>.?/".contains(c));
    if simple {
        name.to_string()
    } else {
        format!("|{name}|")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_negative_literals_and_mod() {
        let term = SmtTerm::var("x")
            .sub(SmtTerm::int(-3))
            .modulo(SmtTerm::int(2))
            .eq(SmtTerm::int(0));
        assert_eq!(to_smtlib(&term), "(= (mod (- x (- 3)) 2) 0)");
    }

    #[test]
    fn prints_quantifier_bindings() {
        let term = SmtTerm::forall(
            vec![("y".into(), SmtSort::Int), ("p".into(), SmtSort::Bool)],
            SmtTerm::var("p").implies(SmtTerm::var("y").ge(SmtTerm::int(0))),
        );
        assert_eq!(
            to_smtlib(&term),
            "(forall ((y Int) (p Bool)) (=> p (>= y 0)))"
        );
    }

    #[test]
    fn quotes_symbols_that_need_it() {
        assert_eq!(quote_symbol("x!0"), "x!0");
        assert_eq!(quote_symbol("has space"), "|has space|");
        assert_eq!(quote_symbol("0x"), "|0x|");
    }

    #[test]
    fn prints_unary_and_ternary_nodes() {
        let term = SmtTerm::ite(
            SmtTerm::var("p").not(),
            SmtTerm::var("x").neg(),
            SmtTerm::int(4),
        );
        assert_eq!(to_smtlib(&term), "(ite (not p) (- x) 4)");
    }

    #[test]
    fn empty_connectives_print_as_constants() {
        assert_eq!(to_smtlib(&SmtTerm::and(Vec::new())), "true");
        assert_eq!(to_smtlib(&SmtTerm::or(Vec::new())), "false");
        assert_eq!(to_smtlib(&SmtTerm::and(vec![SmtTerm::var("p")])), "p");
    }
}
