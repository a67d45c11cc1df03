//! TPTP `fof` rendering.
//!
//! Identifiers are restricted to `[A-Za-z0-9_]`; variables start uppercase,
//! predicates and constants lowercase. Identifiers that would start with a
//! digit or underscore receive a letter prefix.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Atom, Term, TermKind};

use super::{Formula, FolProblem, NamedFormula};

static UNSAFE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());

const TEXT_PROPOSITION_CHARS: usize = 20;

fn sanitize(raw: &str) -> String {
    let s = UNSAFE.replace_all(raw.trim(), "_").into_owned();
    if s.is_empty() { "x".to_string() } else { s }
}

fn starts_with_letter(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
}

fn lower_first(s: String, prefix: &str) -> String {
    if !starts_with_letter(&s) {
        return format!("{prefix}{s}");
    }
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_ascii_lowercase().to_string() + chars.as_str(),
        None => s,
    }
}

/// Sanitized TPTP variable name.
pub fn variable(name: &str) -> String {
    let s = sanitize(name);
    if !starts_with_letter(&s) {
        return format!("V{s}");
    }
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_ascii_uppercase().to_string() + chars.as_str(),
        None => s,
    }
}

/// Sanitized TPTP functor (predicate or constant) name.
pub fn functor(name: &str) -> String {
    lower_first(sanitize(name), "c")
}

/// Sanitized TPTP formula name.
pub fn formula_name(name: &str) -> String {
    lower_first(sanitize(name), "f")
}

/// Name of the 0-ary proposition standing for an atomless statement.
pub fn text_proposition(text: &str) -> String {
    let prefix: String = text.chars().take(TEXT_PROPOSITION_CHARS).collect();
    format!("nl_{}", sanitize(&prefix))
}

pub fn term(t: &Term) -> String {
    match t.kind {
        TermKind::Variable => variable(&t.name),
        TermKind::Number => lower_first(sanitize(&t.name), "n"),
        _ => functor(&t.name),
    }
}

pub fn atom(a: &Atom) -> String {
    let pred = lower_first(sanitize(&a.predicate), "p");
    let body = if a.args.is_empty() {
        pred
    } else {
        let args: Vec<String> = a.args.iter().map(term).collect();
        format!("{pred}({})", args.join(","))
    };
    if a.negated { format!("~({body})") } else { body }
}

fn join(parts: &[Formula], op: &str, empty: &str) -> String {
    match parts {
        [] => empty.to_string(),
        [only] => render(only),
        _ => {
            let rendered: Vec<String> = parts.iter().map(render).collect();
            format!("({})", rendered.join(&format!(" {op} ")))
        }
    }
}

fn binder(symbol: char, vars: &[String], body: &Formula) -> String {
    let vars: Vec<String> = vars.iter().map(|v| variable(v)).collect();
    format!("{symbol} [{}] : ({})", vars.join(","), render(body))
}

/// Render a formula in TPTP syntax.
pub fn render(formula: &Formula) -> String {
    match formula {
        Formula::Literal(a) => atom(a),
        Formula::Not(inner) => format!("~({})", render(inner)),
        Formula::And(parts) => join(parts, "&", "$true"),
        Formula::Or(parts) => join(parts, "|", "$false"),
        Formula::Implies(a, b) => format!("({} => {})", render(a), render(b)),
        Formula::Forall(vars, body) => binder('!', vars, body),
        Formula::Exists(vars, body) => binder('?', vars, body),
        Formula::False => "$false".to_string(),
    }
}

pub fn fof(entry: &NamedFormula) -> String {
    format!(
        "fof({}, {}, {}).",
        formula_name(&entry.name),
        entry.role,
        render(&entry.formula)
    )
}

/// One `fof` line per axiom, then the conjecture.
pub fn render_problem(problem: &FolProblem) -> String {
    let mut out = String::new();
    for entry in problem.axioms.iter().chain(problem.conjecture.iter()) {
        let _ = writeln!(out, "{}", fof(entry));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_sanitized_and_cased() {
        assert_eq!(variable("x"), "X");
        assert_eq!(variable("1st"), "V1st");
        assert_eq!(functor("New York"), "new_York");
        assert_eq!(functor("Alice"), "alice");
        assert_eq!(functor(""), "x");
        assert_eq!(text_proposition("It's raining hard outside today"), "nl_It_s_raining_hard_ou");
    }

    #[test]
    fn renders_rule_axiom() {
        let rule = Formula::Forall(
            vec!["X".into()],
            Box::new(Formula::Implies(
                Box::new(Formula::Literal(Atom::new("raining", vec![Term::variable("X")]))),
                Box::new(Formula::Literal(Atom::new("wet", vec![Term::variable("X")]))),
            )),
        );
        let entry = NamedFormula::axiom("rule_S1", rule);
        assert_eq!(fof(&entry), "fof(rule_S1, axiom, ! [X] : ((raining(X) => wet(X)))).");
    }

    #[test]
    fn renders_negation_and_conjunction() {
        let f = Formula::And(vec![
            Formula::Literal(Atom::new("p", vec![Term::constant("a")]).negate()),
            Formula::Literal(Atom::new("q", Vec::new())),
        ]);
        assert_eq!(render(&f), "(~(p(a)) & q)");
        assert_eq!(render(&Formula::And(Vec::new())), "$true");
        let problem = FolProblem {
            axioms: vec![NamedFormula::axiom("fact_F1", f)],
            conjecture: Some(NamedFormula::conjecture(Formula::False)),
        };
        let text = problem.to_tptp();
        assert_eq!(text.lines().count(), 2);
        assert!(text.ends_with("fof(goal, conjecture, $false).\n"));
    }
}
