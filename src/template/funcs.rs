//! Function namespace
//!
//! Every callable visible to templates lives in a `FunctionNamespace`
//! owned by its `TemplateSet`. Callables receive a `FuncContext` that
//! borrows the owning set, which is how `listTemplates` sees the set it
//! runs in without any global state.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use super::lexer::is_identifier;
use super::value::Value;
use super::TemplateSet;

/// Per-call context handed to template functions
pub struct FuncContext<'a> {
    pub templates: &'a TemplateSet,
}

pub type TemplateFn = Box<dyn Fn(&FuncContext<'_>, &[Value]) -> Result<Value, String> + Send + Sync>;

/// Name to callable map
#[derive(Default)]
pub struct FunctionNamespace {
    funcs: HashMap<String, TemplateFn>,
}

impl fmt::Debug for FunctionNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.funcs.keys().collect();
        names.sort();
        f.debug_struct("FunctionNamespace").field("funcs", &names).finish()
    }
}

impl FunctionNamespace {
    /// An empty namespace
    pub fn new() -> Self {
        Self::default()
    }

    /// The builtin functions plus `listTemplates`
    pub fn builtins() -> Self {
        let mut ns = Self::new();
        ns.add("and", |_, args| and(args));
        ns.add("or", |_, args| or(args));
        ns.add("not", |_, args| not(args));
        ns.add("len", |_, args| len(args));
        ns.add("index", |_, args| index(args));
        ns.add("print", |_, args| Ok(Value::Str(sprint(args))));
        ns.add("printf", |_, args| printf(args));
        ns.add("println", |_, args| Ok(Value::Str(sprintln(args))));
        ns.add("eq", |_, args| eq(args));
        ns.add("ne", |_, args| compare_pair("ne", args, |o| o != Ordering::Equal));
        ns.add("lt", |_, args| compare_pair("lt", args, |o| o == Ordering::Less));
        ns.add("le", |_, args| compare_pair("le", args, |o| o != Ordering::Greater));
        ns.add("gt", |_, args| compare_pair("gt", args, |o| o == Ordering::Greater));
        ns.add("ge", |_, args| compare_pair("ge", args, |o| o != Ordering::Less));
        ns.add("listTemplates", list_templates);
        ns
    }

    fn add<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&FuncContext<'_>, &[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.funcs.insert(name.to_string(), Box::new(f));
    }

    /// Add or replace a function. Names must be identifiers.
    pub fn register<F>(&mut self, name: &str, f: F) -> Result<(), String>
    where
        F: Fn(&FuncContext<'_>, &[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        if !is_identifier(name) {
            return Err(format!("invalid function name {:?}", name));
        }
        self.add(name, f);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TemplateFn> {
        self.funcs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }
}

fn want_args(name: &str, args: &[Value], n: usize) -> Result<(), String> {
    if args.len() != n {
        return Err(format!("wrong number of args for {}: want {} got {}", name, n, args.len()));
    }
    Ok(())
}

fn and(args: &[Value]) -> Result<Value, String> {
    if args.is_empty() {
        return Err("wrong number of args for and: want at least 1 got 0".to_string());
    }
    Ok(args
        .iter()
        .find(|v| !v.is_truthy())
        .unwrap_or(&args[args.len() - 1])
        .clone())
}

fn or(args: &[Value]) -> Result<Value, String> {
    if args.is_empty() {
        return Err("wrong number of args for or: want at least 1 got 0".to_string());
    }
    Ok(args
        .iter()
        .find(|v| v.is_truthy())
        .unwrap_or(&args[args.len() - 1])
        .clone())
}

fn not(args: &[Value]) -> Result<Value, String> {
    want_args("not", args, 1)?;
    Ok(Value::Bool(!args[0].is_truthy()))
}

fn len(args: &[Value]) -> Result<Value, String> {
    want_args("len", args, 1)?;
    let n = match &args[0] {
        Value::Str(s) => s.len(),
        Value::List(l) => l.len(),
        Value::Map(m) => m.len(),
        other => return Err(format!("len of type {}", other.type_name())),
    };
    Ok(Value::Int(n as i64))
}

fn index(args: &[Value]) -> Result<Value, String> {
    let (item, keys) = args
        .split_first()
        .ok_or_else(|| "wrong number of args for index: want at least 1 got 0".to_string())?;
    let mut current = item.clone();
    for key in keys {
        current = match (&current, key) {
            (Value::List(list), Value::Int(i)) => {
                let idx = usize::try_from(*i)
                    .ok()
                    .filter(|idx| *idx < list.len())
                    .ok_or_else(|| format!("index out of range: {}", i))?;
                list[idx].clone()
            }
            (Value::Str(s), Value::Int(i)) => {
                let idx = usize::try_from(*i)
                    .ok()
                    .filter(|idx| *idx < s.len())
                    .ok_or_else(|| format!("index out of range: {}", i))?;
                Value::Int(s.as_bytes()[idx] as i64)
            }
            (Value::Map(map), Value::Str(k)) => {
                map.get(k).cloned().unwrap_or_else(|| Value::Str(String::new()))
            }
            (Value::Nil, _) => return Err("index of untyped nil".to_string()),
            (container, key) => {
                return Err(format!(
                    "can't index item of type {} with {}",
                    container.type_name(),
                    key.type_name()
                ))
            }
        };
    }
    Ok(current)
}

/// Operands joined with a space where neither side is a string.
pub fn sprint(args: &[Value]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 && !arg.is_string() && !args[i - 1].is_string() {
            out.push(' ');
        }
        out.push_str(&arg.to_string());
    }
    out
}

pub fn sprintln(args: &[Value]) -> String {
    let parts: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    format!("{}\n", parts.join(" "))
}

fn bad_verb(verb: char, arg: &Value) -> String {
    format!("%!{}({}={})", verb, arg.type_name(), arg)
}

/// Widths and precisions past this print `%!(BADWIDTH)` / `%!(BADPREC)`.
const MAX_FORMAT_NUMBER: usize = 1_000_000;

/// Flags, width and precision of one `printf` directive.
#[derive(Debug, Default, Clone, Copy)]
struct Directive {
    minus: bool,
    plus: bool,
    space: bool,
    sharp: bool,
    zero: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

fn read_number(chars: &mut Peekable<Chars<'_>>) -> Option<usize> {
    let mut n: Option<usize> = None;
    while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
        chars.next();
        n = Some(n.unwrap_or(0).saturating_mul(10).saturating_add(digit as usize));
    }
    n
}

impl Directive {
    /// Read `[-+ #0]*[width][.precision]`, reporting oversized numbers
    /// into `out`.
    fn parse(chars: &mut Peekable<Chars<'_>>, out: &mut String) -> Self {
        let mut d = Directive::default();
        while let Some(&c) = chars.peek() {
            match c {
                '-' => d.minus = true,
                '+' => d.plus = true,
                ' ' => d.space = true,
                '#' => d.sharp = true,
                '0' => d.zero = true,
                _ => break,
            }
            chars.next();
        }
        d.width = read_number(chars);
        if d.width.is_some_and(|w| w > MAX_FORMAT_NUMBER) {
            out.push_str("%!(BADWIDTH)");
            d.width = None;
        }
        if chars.peek() == Some(&'.') {
            chars.next();
            d.precision = Some(read_number(chars).unwrap_or(0));
            if d.precision.is_some_and(|p| p > MAX_FORMAT_NUMBER) {
                out.push_str("%!(BADPREC)");
                d.precision = None;
            }
        }
        d
    }

    /// Pad to the width with spaces, or with zeros after the sign under `0`.
    fn pad(&self, text: String, numeric: bool) -> String {
        let len = text.chars().count();
        let fill = match self.width {
            Some(width) if width > len => width - len,
            _ => return text,
        };
        if self.minus {
            format!("{}{}", text, " ".repeat(fill))
        } else if self.zero && !(numeric && self.precision.is_some()) {
            let sign_len = if numeric && text.starts_with(&['-', '+', ' '][..]) { 1 } else { 0 };
            let (sign, rest) = text.split_at(sign_len);
            format!("{}{}{}", sign, "0".repeat(fill), rest)
        } else {
            format!("{}{}", " ".repeat(fill), text)
        }
    }

    fn truncate(&self, text: &str) -> String {
        match self.precision {
            Some(p) => text.chars().take(p).collect(),
            None => text.to_string(),
        }
    }

    /// Precision is the minimum digit count; `%.0d` of zero prints nothing.
    fn integer(&self, i: i64) -> String {
        let mut digits = i.unsigned_abs().to_string();
        match self.precision {
            Some(0) if i == 0 => digits.clear(),
            Some(p) if digits.len() < p => digits.insert_str(0, &"0".repeat(p - digits.len())),
            _ => {}
        }
        let sign = if i < 0 {
            "-"
        } else if self.plus {
            "+"
        } else if self.space {
            " "
        } else {
            ""
        };
        self.pad(format!("{}{}", sign, digits), true)
    }

    /// `#` prefers a raw backquoted string when the text allows it.
    fn quote(&self, s: &str) -> String {
        let s = self.truncate(s);
        if self.sharp && !s.contains('`') && !s.chars().any(char::is_control) {
            format!("`{}`", s)
        } else {
            format!("{:?}", s)
        }
    }
}

/// `printf` with the `%s %v %d %q %t %%` verbs, the `-+ #0` flags, width
/// and precision.
pub fn printf(args: &[Value]) -> Result<Value, String> {
    let (format, rest) = match args.split_first() {
        Some((Value::Str(f), rest)) => (f.as_str(), rest),
        Some((other, _)) => {
            return Err(format!("printf format must be a string, got {}", other.type_name()))
        }
        None => return Err("wrong number of args for printf: want at least 1 got 0".to_string()),
    };
    let mut out = String::new();
    let mut next = rest.iter();
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let d = Directive::parse(&mut chars, &mut out);
        let verb = match chars.next() {
            Some(v) => v,
            None => {
                out.push_str("%!(NOVERB)");
                break;
            }
        };
        if verb == '%' {
            out.push('%');
            continue;
        }
        let arg = match next.next() {
            Some(arg) => arg,
            None => {
                out.push_str(&format!("%!{}(MISSING)", verb));
                continue;
            }
        };
        let piece = match (verb, arg) {
            ('s', Value::Nil) => "%!s(<nil>)".to_string(),
            ('d', Value::Int(i)) | ('v', Value::Int(i)) => d.integer(*i),
            ('s', _) | ('v', _) => d.pad(d.truncate(&arg.to_string()), false),
            ('q', Value::Str(s)) => d.pad(d.quote(s), false),
            ('q', Value::Int(i)) => match u32::try_from(*i).ok().and_then(char::from_u32) {
                Some(ch) => d.pad(format!("{:?}", ch), false),
                None => bad_verb(verb, arg),
            },
            ('t', Value::Bool(b)) => d.pad(b.to_string(), false),
            _ => bad_verb(verb, arg),
        };
        out.push_str(&piece);
    }
    let extra: Vec<String> = next.map(|a| format!("{}={}", a.type_name(), a)).collect();
    if !extra.is_empty() {
        out.push_str(&format!("%!(EXTRA {})", extra.join(", ")));
    }
    Ok(Value::Str(out))
}

/// Ordering of two basic values of the same kind.
fn basic_cmp(a: &Value, b: &Value) -> Result<Ordering, String> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x.cmp(y)),
        (Value::Str(x), Value::Str(y)) => Ok(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Ok(x.cmp(y)),
        (Value::List(_), _) | (Value::Map(_), _) | (_, Value::List(_)) | (_, Value::Map(_)) => {
            Err("non-comparable type".to_string())
        }
        _ => Err("incompatible types for comparison".to_string()),
    }
}

fn eq(args: &[Value]) -> Result<Value, String> {
    let (first, rest) = args
        .split_first()
        .ok_or_else(|| "missing argument for comparison".to_string())?;
    if rest.is_empty() {
        return Err("missing argument for comparison".to_string());
    }
    for other in rest {
        if matches!((first, other), (Value::Nil, Value::Nil)) {
            return Ok(Value::Bool(true));
        }
        if basic_cmp(first, other)? == Ordering::Equal {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn compare_pair(
    name: &str,
    args: &[Value],
    test: impl Fn(Ordering) -> bool,
) -> Result<Value, String> {
    want_args(name, args, 2)?;
    if matches!(name, "lt" | "le" | "gt" | "ge") && matches!(args[0], Value::Bool(_)) {
        return Err("invalid type for comparison".to_string());
    }
    Ok(Value::Bool(test(basic_cmp(&args[0], &args[1])?)))
}

/// Every template name in the owning set, each followed by a newline.
fn list_templates(ctx: &FuncContext<'_>, args: &[Value]) -> Result<Value, String> {
    want_args("listTemplates", args, 0)?;
    let mut out = String::new();
    for name in ctx.templates.names() {
        out.push_str(name);
        out.push('\n');
    }
    Ok(Value::Str(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::from(v)
    }

    #[test]
    fn test_and_or_not() {
        assert_eq!(and(&[s("a"), s(""), s("c")]).unwrap(), s(""));
        assert_eq!(and(&[s("a"), s("b")]).unwrap(), s("b"));
        assert_eq!(or(&[s(""), s("b")]).unwrap(), s("b"));
        assert_eq!(not(&[s("")]).unwrap(), Value::Bool(true));
        assert!(not(&[]).is_err());
    }

    #[test]
    fn test_len_and_index() {
        assert_eq!(len(&[s("abc")]).unwrap(), Value::Int(3));
        assert!(len(&[Value::Int(3)]).is_err());
        let list = Value::List(vec![s("x"), s("y")]);
        assert_eq!(index(&[list.clone(), Value::Int(1)]).unwrap(), s("y"));
        assert_eq!(
            index(&[list, Value::Int(5)]).unwrap_err(),
            "index out of range: 5"
        );
    }

    #[test]
    fn test_print_family() {
        assert_eq!(sprint(&[s("a"), s("b")]), "ab");
        assert_eq!(sprint(&[Value::Int(1), Value::Int(2)]), "1 2");
        assert_eq!(sprint(&[s("n="), Value::Int(2)]), "n=2");
        assert_eq!(sprintln(&[s("a"), Value::Int(1)]), "a 1\n");
    }

    #[test]
    fn test_printf_verbs() {
        let out = printf(&[
            s("%s-%d-%q-%t-%v-%%"),
            s("x"),
            Value::Int(7),
            s("q"),
            Value::Bool(true),
            Value::Int(1),
        ])
        .unwrap();
        assert_eq!(out, s("x-7-\"q\"-true-1-%"));
    }

    #[test]
    fn test_printf_mismatches() {
        assert_eq!(printf(&[s("%d"), s("x")]).unwrap(), s("%!d(string=x)"));
        assert_eq!(printf(&[s("%s")]).unwrap(), s("%!s(MISSING)"));
        assert_eq!(printf(&[s("a"), Value::Int(1)]).unwrap(), s("a%!(EXTRA int=1)"));
    }

    #[test]
    fn test_printf_width_and_flags() {
        let one = |format: &str, arg: Value| printf(&[s(format), arg]).unwrap();
        assert_eq!(one("%5s", s("x")), s("    x"));
        assert_eq!(one("%-5s|", s("x")), s("x    |"));
        assert_eq!(one("%05s", s("ab")), s("000ab"));
        assert_eq!(one("%.1s", s("abc")), s("a"));
        assert_eq!(one("%4.2s|", s("héllo")), s("  hé|"));
        assert_eq!(one("%05d", Value::Int(42)), s("00042"));
        assert_eq!(one("%05d", Value::Int(-42)), s("-0042"));
        assert_eq!(one("%-05d|", Value::Int(7)), s("7    |"));
        assert_eq!(one("%+d", Value::Int(3)), s("+3"));
        assert_eq!(one("% d", Value::Int(3)), s(" 3"));
        assert_eq!(one("%8.3d", Value::Int(7)), s("     007"));
        assert_eq!(one("%08.3d", Value::Int(-7)), s("    -007"));
        assert_eq!(one("[%.0d]", Value::Int(0)), s("[]"));
        assert_eq!(one("%3v", Value::Int(5)), s("  5"));
        assert_eq!(one("%6.2q", s("abc")), s("  \"ab\""));
        assert_eq!(one("%#q", s("a\"b")), s("`a\"b`"));
        assert_eq!(one("%5t", Value::Bool(true)), s(" true"));
    }

    #[test]
    fn test_printf_padding_skips_errors() {
        assert_eq!(printf(&[s("%5d"), s("x")]).unwrap(), s("%!d(string=x)"));
        assert_eq!(printf(&[s("%-5s")]).unwrap(), s("%!s(MISSING)"));
        assert_eq!(printf(&[s("%5")]).unwrap(), s("%!(NOVERB)"));
        assert_eq!(
            printf(&[s("%9999999s"), s("x")]).unwrap(),
            s("%!(BADWIDTH)x")
        );
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eq(&[s("a"), s("b"), s("a")]).unwrap(), Value::Bool(true));
        assert_eq!(eq(&[Value::Int(1), Value::Int(2)]).unwrap(), Value::Bool(false));
        assert_eq!(
            eq(&[s("1"), Value::Int(1)]).unwrap_err(),
            "incompatible types for comparison"
        );
        assert_eq!(
            compare_pair("lt", &[Value::Int(1), Value::Int(2)], |o| o == Ordering::Less).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_register_validates_name() {
        let mut ns = FunctionNamespace::new();
        assert!(ns.register("upper", |_, args| Ok(Value::Str(sprint(args).to_uppercase()))).is_ok());
        assert!(ns.register("not-a-name", |_, _| Ok(Value::Nil)).is_err());
        assert!(ns.contains("upper"));
    }
}
