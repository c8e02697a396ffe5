//! Minimal S-expression tree for KiCad files.

use std::fmt;

/// One S-expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum SExpr {
    /// Bare token, printed as is.
    Atom(String),
    /// Quoted string.
    Str(String),
    /// Parenthesised list.
    List(Vec<SExpr>),
}

impl SExpr {
    /// Bare token.
    pub fn atom(s: impl Into<String>) -> Self {
        Self::Atom(s.into())
    }

    /// Quoted string.
    pub fn string(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    /// Number token, at most 4 decimals and no trailing zeros.
    pub fn num(value: f64) -> Self {
        Self::Atom(format_num(value))
    }

    /// `(head items...)`.
    pub fn list(head: &str, items: impl IntoIterator<Item = SExpr>) -> Self {
        let mut v = vec![Self::atom(head)];
        v.extend(items);
        Self::List(v)
    }

    /// `(head "value")`.
    pub fn named_str(head: &str, value: impl Into<String>) -> Self {
        Self::list(head, [Self::string(value)])
    }

    /// `(head value)` with a bare token.
    pub fn named_atom(head: &str, value: impl Into<String>) -> Self {
        Self::list(head, [Self::atom(value)])
    }

    /// `(at x y angle)`.
    pub fn at(x: f64, y: f64, angle: f64) -> Self {
        Self::list("at", [Self::num(x), Self::num(y), Self::num(angle)])
    }

    /// `(uuid "...")`.
    pub fn uuid(id: uuid::Uuid) -> Self {
        Self::named_str("uuid", id.to_string())
    }

    /// Head token of a list.
    pub fn head(&self) -> Option<&str> {
        match self {
            Self::List(items) => match items.first() {
                Some(Self::Atom(a)) => Some(a),
                _ => None,
            },
            _ => None,
        }
    }

    /// Child lists whose head is `head`, searched recursively.
    pub fn find_all<'a>(&'a self, head: &str, out: &mut Vec<&'a SExpr>) {
        if let Self::List(items) = self {
            if self.head() == Some(head) {
                out.push(self);
            }
            for item in items {
                item.find_all(head, out);
            }
        }
    }

    fn is_flat(&self) -> bool {
        match self {
            Self::List(items) => items.iter().all(|i| !matches!(i, Self::List(_))),
            _ => true,
        }
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        match self {
            Self::Atom(a) => f.write_str(a),
            Self::Str(s) => write!(f, "\"{}\"", escape(s)),
            Self::List(items) => {
                f.write_str("(")?;
                let mut nested = false;
                for (i, item) in items.iter().enumerate() {
                    let is_list = matches!(item, Self::List(_));
                    if is_list && (nested || !item.is_flat()) {
                        nested = true;
                        writeln!(f)?;
                        write!(f, "{:width$}", "", width = (indent + 1) * 2)?;
                    } else if i > 0 {
                        f.write_str(" ")?;
                    }
                    item.write(f, indent + 1)?;
                }
                if nested {
                    writeln!(f)?;
                    write!(f, "{:width$}", "", width = indent * 2)?;
                }
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for SExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, 0)
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

fn format_num(value: f64) -> String {
    let s = format!("{value:.4}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn numbers_are_trimmed() {
        assert_eq!(format_num(1.27), "1.27");
        assert_eq!(format_num(50.8), "50.8");
        assert_eq!(format_num(10.0), "10");
        assert_eq!(format_num(-0.00001), "0");
        assert_eq!(format_num(-2.54), "-2.54");
        assert_eq!(format_num(1.0 / 3.0), "0.3333");
    }

    #[test]
    fn strings_are_escaped() {
        assert_eq!(SExpr::string("a\"b\\c").to_string(), r#""a\"b\\c""#);
    }

    #[test]
    fn flat_lists_stay_on_one_line() {
        let e = SExpr::list("at", [SExpr::num(1.0), SExpr::num(2.5), SExpr::num(0.0)]);
        assert_eq!(e.to_string(), "(at 1 2.5 0)");
    }

    #[test]
    fn nested_lists_are_indented() {
        let e = SExpr::list(
            "label",
            [
                SExpr::string("vdd"),
                SExpr::at(0.0, 0.0, 180.0),
                SExpr::list("effects", [SExpr::list("font", [SExpr::list("size", [SExpr::num(1.27), SExpr::num(1.27)])])]),
            ],
        );
        assert_eq!(
            e.to_string(),
            "(label \"vdd\" (at 0 0 180)\n  (effects\n    (font (size 1.27 1.27))\n  )\n)"
        );
    }

    #[test]
    fn find_all_recurses() {
        let e = SExpr::list("root", [SExpr::list("a", Vec::new()), SExpr::list("b", [SExpr::list("a", Vec::new())])]);
        let mut found = Vec::new();
        e.find_all("a", &mut found);
        assert_eq!(found.len(), 2);
    }
}
