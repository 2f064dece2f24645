//! Rendering values as text.

use serde::{Deserialize, Serialize};

use crate::rt::{ExecContext, Outcome};
use crate::util::fast_map::VisitedNodes;
use crate::val::{List, Value};

/// Float notation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notation {
    /// Shortest round-trip form.
    #[default]
    Default,
    /// Fixed number of decimals.
    Fixed(usize),
    /// Scientific notation with the given number of decimals.
    Exponent(usize),
}

/// Integer radix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Radix {
    #[default]
    Decimal,
    LowerHex,
    UpperHex,
    Binary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    pub notation: Notation,
    pub radix: Radix,
    /// Quote a top-level string or char. Nested ones are always quoted.
    pub quote_strings: bool,
    /// Stop rendering a list after this many elements.
    pub max_items: Option<usize>,
}

const DEFAULT_FIXED: usize = 2;
const DEFAULT_EXPONENT: usize = 6;

impl FormatOptions {
    /// Parses a format spec: `""`, `f[N]`, `e[N]`, `x`, `X`, `b` or `q`.
    pub fn parse(spec: &str) -> Option<Self> {
        let mut opts = FormatOptions::default();
        let mut chars = spec.chars();
        let Some(first) = chars.next() else {
            return Some(opts);
        };
        let digits = chars.as_str();
        let precision = |default: usize| -> Option<usize> {
            if digits.is_empty() {
                Some(default)
            } else {
                digits.parse().ok()
            }
        };
        match first {
            'f' | 'F' => opts.notation = Notation::Fixed(precision(DEFAULT_FIXED)?),
            'e' | 'E' => opts.notation = Notation::Exponent(precision(DEFAULT_EXPONENT)?),
            'x' if digits.is_empty() => opts.radix = Radix::LowerHex,
            'X' if digits.is_empty() => opts.radix = Radix::UpperHex,
            'b' if digits.is_empty() => opts.radix = Radix::Binary,
            'q' if digits.is_empty() => opts.quote_strings = true,
            _ => return None,
        }
        Some(opts)
    }

    /// The spec string these options were parsed from, as far as it can be
    /// reconstructed. Used in diagnostics.
    pub fn spec(&self) -> String {
        let mut out = String::new();
        match self.notation {
            Notation::Default => {}
            Notation::Fixed(n) => out.push_str(&format!("f{n}")),
            Notation::Exponent(n) => out.push_str(&format!("e{n}")),
        }
        match self.radix {
            Radix::Decimal => {}
            Radix::LowerHex => out.push('x'),
            Radix::UpperHex => out.push('X'),
            Radix::Binary => out.push('b'),
        }
        if self.quote_strings {
            out.push('q');
        }
        out
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }
}

/// Show entry point; forces every lazy value it meets once.
pub(crate) fn show(value: &Value, opts: &FormatOptions, ctx: &mut ExecContext) -> Outcome<String> {
    ctx.ensure_live()?;
    let mut writer = Writer {
        opts,
        visited: VisitedNodes::default(),
        out: String::new(),
    };
    writer.value(value, false, ctx)?;
    Ok(writer.out)
}

struct Writer<'a> {
    opts: &'a FormatOptions,
    visited: VisitedNodes,
    out: String,
}

impl Writer<'_> {
    fn value(&mut self, value: &Value, nested: bool, ctx: &mut ExecContext) -> Outcome<()> {
        let value = value.force(ctx)?;
        match &value {
            Value::Unit => self.out.push_str("()"),
            Value::Int(i) => self.integer(*i as i64, *i as u32 as u64, 32),
            Value::Long(i) => self.integer(*i, *i as u64, 64),
            Value::Single(x) => self.float(*x as f64, &value, ctx, |buf, x| buf.format(x as f32).to_string())?,
            Value::Double(x) => self.float(*x, &value, ctx, |buf, x| buf.format(x).to_string())?,
            Value::Bool(b) => self.out.push_str(if *b { "true" } else { "false" }),
            Value::Char(c) => {
                if nested || self.opts.quote_strings {
                    self.out.push_str(&format!("{c:?}"));
                } else {
                    self.out.push(*c);
                }
            }
            Value::Str(s) => {
                if nested || self.opts.quote_strings {
                    self.out.push_str(&format!("{:?}", s.as_ref()));
                } else {
                    self.out.push_str(s);
                }
            }
            Value::List(list) => self.list(list, ctx)?,
            Value::Record(record) => {
                let addr = value.heap_addr();
                if !self.visited.enter(addr) {
                    self.out.push_str("...");
                    return Ok(());
                }
                self.out.push('{');
                for (i, (name, field)) in record.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.out.push_str(name);
                    self.out.push_str(" = ");
                    self.value(field, true, ctx)?;
                }
                self.out.push('}');
                self.visited.leave(addr);
            }
            Value::Variant(variant) => {
                let addr = value.heap_addr();
                if !self.visited.enter(addr) {
                    self.out.push_str("...");
                    return Ok(());
                }
                self.out.push_str(variant.tag());
                let payload = variant.value().force(ctx)?;
                if !payload.is_unit() {
                    self.out.push(' ');
                    let wrap = matches!(&payload, Value::Variant(inner) if inner.has_payload());
                    if wrap {
                        self.out.push('(');
                    }
                    self.value(&payload, true, ctx)?;
                    if wrap {
                        self.out.push(')');
                    }
                }
                self.visited.leave(addr);
            }
            Value::Lazy(_) => self.out.push_str("<lazy>"),
            Value::Function(f) => self.out.push_str(&format!("<function {}/{}>", f.name(), f.remaining())),
            Value::Module(m) => self.out.push_str(&format!("<module {}>", m.name())),
            Value::TypeInfo(info) => self.out.push_str(&format!("<type {}>", info.name)),
            Value::Foreign(f) => {
                let text = f.dispatcher().show(f, self.opts, ctx)?;
                self.out.push_str(&text);
            }
        }
        Ok(())
    }

    fn integer(&mut self, signed: i64, bits: u64, width: u32) {
        let mask = if width == 64 { u64::MAX } else { (1u64 << width) - 1 };
        match self.opts.radix {
            Radix::Decimal => {
                let mut buf = itoa::Buffer::new();
                self.out.push_str(buf.format(signed));
            }
            Radix::LowerHex => self.out.push_str(&format!("{:x}", bits & mask)),
            Radix::UpperHex => self.out.push_str(&format!("{:X}", bits & mask)),
            Radix::Binary => self.out.push_str(&format!("{:b}", bits & mask)),
        }
    }

    fn float(
        &mut self,
        x: f64,
        value: &Value,
        ctx: &mut ExecContext,
        shortest: impl Fn(&mut ryu::Buffer, f64) -> String,
    ) -> Outcome<()> {
        if self.opts.radix != Radix::Decimal {
            return Err(ctx.invalid_format(&self.opts.spec(), value));
        }
        if x.is_nan() {
            self.out.push_str("NaN");
            return Ok(());
        }
        if x.is_infinite() {
            self.out.push_str(if x > 0.0 { "Infinity" } else { "-Infinity" });
            return Ok(());
        }
        match self.opts.notation {
            Notation::Default => {
                let mut buf = ryu::Buffer::new();
                self.out.push_str(&shortest(&mut buf, x));
            }
            Notation::Fixed(n) => self.out.push_str(&format!("{x:.n$}")),
            Notation::Exponent(n) => self.out.push_str(&format!("{x:.n$e}")),
        }
        Ok(())
    }

    // Walks the spine iteratively. Cells already on the current spine mark a
    // cycle and are rendered as `...`.
    fn list(&mut self, list: &List, ctx: &mut ExecContext) -> Outcome<()> {
        let mut entered = Vec::new();
        let mut cursor = list.clone();
        let mut shown = 0usize;
        self.out.push('[');
        while let Some(node) = cursor.node() {
            if shown > 0 {
                self.out.push_str(", ");
            }
            let addr = cursor.addr();
            if self.opts.max_items.is_some_and(|max| shown >= max) || !self.visited.enter(addr) {
                self.out.push_str("...");
                break;
            }
            entered.push(addr);
            self.value(node.head(), true, ctx)?;
            shown += 1;
            cursor = match cursor.forced_tail(ctx)? {
                Some(next) => next,
                None => break,
            };
        }
        self.out.push(']');
        for addr in entered {
            self.visited.leave(addr);
        }
        Ok(())
    }
}
