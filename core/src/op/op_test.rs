#[cfg(test)]
mod tests {
    use crate::op::BinOp;
    use crate::rt::{ErrorKind, ExecContext, Interrupt};
    use crate::val::{TypeTag, Value};

    fn list(items: &[i32]) -> Value {
        Value::list(items.iter().map(|i| Value::Int(*i)))
    }

    #[test]
    fn comparisons_promote() {
        let mut ctx = ExecContext::new();
        let cases = [
            (BinOp::Lt, Value::Int(1), Value::Double(1.5), true),
            (BinOp::Gt, Value::Long(2), Value::Single(1.5), true),
            (BinOp::Ge, Value::Int(2), Value::Long(2), true),
            (BinOp::Le, Value::Double(2.5), Value::Int(2), false),
            (BinOp::Ne, Value::Int(2), Value::Double(2.0), false),
            (BinOp::Lt, Value::Char('a'), Value::Char('b'), true),
            (BinOp::Gt, Value::str("b"), Value::str("abc"), true),
        ];
        for (op, l, r, expected) in cases {
            assert_eq!(l.binary(op, &r, &mut ctx).unwrap(), Value::Bool(expected), "{l:?} {op} {r:?}");
        }
    }

    #[test]
    fn nan_is_unordered() {
        let mut ctx = ExecContext::new();
        let nan = Value::Double(f64::NAN);
        for op in [BinOp::Eq, BinOp::Lt, BinOp::Gt, BinOp::Le, BinOp::Ge] {
            assert_eq!(nan.binary(op, &nan, &mut ctx).unwrap(), Value::Bool(false));
        }
        assert_eq!(nan.binary(BinOp::Ne, &nan, &mut ctx).unwrap(), Value::Bool(true));
    }

    #[test]
    fn ordering_unrelated_kinds_fails() {
        let mut ctx = ExecContext::new();
        assert_eq!(Value::Int(1).lesser(&Value::str("x"), &mut ctx), Err(Interrupt::Failed));
        let err = ctx.error().unwrap();
        assert_eq!(err.kind, ErrorKind::InvalidOperand);
        assert_eq!(err.op.as_ref(), "Lesser");
    }

    #[test]
    fn unrelated_kinds_are_unequal() {
        let mut ctx = ExecContext::new();
        assert!(!list(&[1, 2, 3]).equal(&Value::Int(123), &mut ctx).unwrap());
        assert!(!Value::nil().equal(&Value::record(Vec::<(&str, Value)>::new()), &mut ctx).unwrap());
        assert!(!Value::Char('a').equal(&Value::str("a"), &mut ctx).unwrap());
        assert!(!ctx.is_failed());
    }

    #[test]
    fn structural_list_equality() {
        let mut ctx = ExecContext::new();
        let nested = Value::list([list(&[1, 2]), list(&[3, 4])]);
        let same = Value::list([list(&[1, 2]), list(&[3, 4])]);
        let other = Value::list([list(&[1, 2]), list(&[3, 5])]);
        assert!(nested.equal(&same, &mut ctx).unwrap());
        assert!(!nested.equal(&other, &mut ctx).unwrap());
        assert!(!list(&[1, 2]).equal(&list(&[1, 2, 3]), &mut ctx).unwrap());
        // element equality promotes too
        let doubles = Value::list([Value::Double(1.0), Value::Double(2.0)]);
        assert!(list(&[1, 2]).equal(&doubles, &mut ctx).unwrap());
    }

    #[test]
    fn equality_forces_lazy_operands() {
        let mut ctx = ExecContext::new();
        let lazy = Value::lazy(|_| Ok(Value::Int(3)));
        assert!(lazy.equal(&Value::Long(3), &mut ctx).unwrap());
        assert!(Value::Long(3).equal(&lazy, &mut ctx).unwrap());
    }

    #[test]
    fn cyclic_lazy_list_equality_terminates() {
        use crate::val::Thunk;
        use std::sync::{Arc, Mutex};

        // ones = 1 :: ones, tied through a thunk that returns the first cell
        fn ones() -> Value {
            let slot: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
            let inner = slot.clone();
            let tail = Thunk::new(move |_| Ok(inner.lock().unwrap().clone().unwrap_or_default()));
            let mut ctx = ExecContext::new();
            let cell = Value::Int(1).cons(&Value::Lazy(tail), &mut ctx).unwrap();
            *slot.lock().unwrap() = Some(cell.clone());
            cell
        }

        let mut ctx = ExecContext::new();
        let a = ones();
        let b = ones();
        assert!(a.equal(&b, &mut ctx).unwrap());
        assert!(a.equal(&a, &mut ctx).unwrap());
        assert_eq!(a.show(&crate::op::FormatOptions::default(), &mut ctx).unwrap(), "[1, ...]");
    }

    #[test]
    fn string_and_char_concatenation() {
        let mut ctx = ExecContext::new();
        let cases = [
            (Value::str("ab"), Value::str("cd"), "abcd"),
            (Value::str("ab"), Value::Char('c'), "abc"),
            (Value::Char('a'), Value::str("bc"), "abc"),
            (Value::Char('a'), Value::Char('b'), "ab"),
        ];
        for (l, r, expected) in cases {
            assert_eq!(l.concat(&r, &mut ctx).unwrap(), Value::str(expected));
        }
    }

    #[test]
    fn list_concatenation_and_length() {
        let mut ctx = ExecContext::new();
        let joined = list(&[1, 2]).concat(&list(&[3]), &mut ctx).unwrap();
        assert_eq!(joined, list(&[1, 2, 3]));
        assert_eq!(joined.length(&mut ctx).unwrap(), Value::Int(3));
        assert_eq!(Value::str("héllo").length(&mut ctx).unwrap(), Value::Int(5));
        assert_eq!(Value::Int(1).length(&mut ctx), Err(Interrupt::Failed));
    }

    #[test]
    fn list_indexing() {
        let mut ctx = ExecContext::new();
        let items = list(&[10, 20, 30]);
        assert_eq!(items.get_value(&Value::Int(1), &mut ctx).unwrap(), Value::Int(20));
        assert_eq!(items.get_value(&Value::Long(2), &mut ctx).unwrap(), Value::Int(30));

        assert_eq!(items.get_value(&Value::Int(3), &mut ctx), Err(Interrupt::Failed));
        assert_eq!(ctx.error().unwrap().kind, ErrorKind::IndexOutOfRange);

        let mut ctx = ExecContext::new();
        assert_eq!(items.get_value(&Value::str("a"), &mut ctx), Err(Interrupt::Failed));
        assert_eq!(ctx.error().unwrap().kind, ErrorKind::InvalidIndexType);

        let mut ctx = ExecContext::new();
        assert_eq!(Value::str("abc").get_value(&Value::Int(2), &mut ctx).unwrap(), Value::Char('c'));
        assert_eq!(Value::Int(5).get_value(&Value::Int(0), &mut ctx), Err(Interrupt::Failed));
        assert_eq!(ctx.error().unwrap().kind, ErrorKind::InvalidOperand);
    }

    #[test]
    fn list_functional_update_shares_suffix() {
        let mut ctx = ExecContext::new();
        let items = list(&[1, 2, 3, 4]);
        let updated = items.set_value(&Value::Int(1), Value::Int(9), &mut ctx).unwrap();
        assert_eq!(updated, list(&[1, 9, 3, 4]));
        assert_eq!(items, list(&[1, 2, 3, 4]));

        let (Value::List(a), Value::List(b)) = (&items, &updated) else {
            panic!("expected lists");
        };
        let suffix_a = skip(a, 2, &mut ctx);
        let suffix_b = skip(b, 2, &mut ctx);
        assert!(suffix_a.ptr_eq(&suffix_b));
        assert!(!skip(a, 1, &mut ctx).ptr_eq(&skip(b, 1, &mut ctx)));
    }

    #[test]
    fn list_update_out_of_range_keys() {
        let items = list(&[1, 2]);
        for key in [Value::Long(1 << 60), Value::Int(i32::MAX), Value::Int(2), Value::Int(-1)] {
            let mut ctx = ExecContext::new();
            assert_eq!(items.set_value(&key, Value::Int(9), &mut ctx), Err(Interrupt::Failed), "{key:?}");
            assert_eq!(ctx.error().unwrap().kind, ErrorKind::IndexOutOfRange);
        }
        let mut ctx = ExecContext::new();
        assert_eq!(Value::nil().set_value(&Value::Int(0), Value::Int(9), &mut ctx), Err(Interrupt::Failed));
        assert_eq!(ctx.error().unwrap().kind, ErrorKind::IndexOutOfRange);
    }

    fn skip(list: &crate::val::List, n: usize, ctx: &mut ExecContext) -> crate::val::List {
        let mut cursor = list.clone();
        for _ in 0..n {
            cursor = cursor.forced_tail(ctx).unwrap().unwrap();
        }
        cursor
    }

    #[test]
    fn sequence_protocol() {
        let mut ctx = ExecContext::new();
        let items = list(&[1, 2]);
        assert_eq!(items.head(&mut ctx).unwrap(), Value::Int(1));
        assert_eq!(items.tail(&mut ctx).unwrap(), list(&[2]));
        assert!(!items.is_nil(&mut ctx).unwrap());
        assert!(Value::nil().is_nil(&mut ctx).unwrap());
        assert_eq!(items.nil_of(&mut ctx).unwrap(), Value::nil());
        assert_eq!(Value::str("ab").head(&mut ctx).unwrap(), Value::Char('a'));
        assert_eq!(Value::str("ab").tail(&mut ctx).unwrap(), Value::str("b"));
        assert_eq!(Value::Char('a').cons(&Value::str("b"), &mut ctx).unwrap(), Value::str("ab"));

        assert_eq!(Value::nil().head(&mut ctx), Err(Interrupt::Failed));
        assert_eq!(ctx.error().unwrap().op.as_ref(), "Head");
    }

    #[test]
    fn cons_keeps_tail_and_head_lazy() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let forced = Arc::new(AtomicUsize::new(0));
        let counter = forced.clone();
        let tail = Value::lazy(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::nil())
        });
        let head = Value::lazy(|_| Ok(Value::Int(1)));

        let mut ctx = ExecContext::new();
        let cell = head.cons(&tail, &mut ctx).unwrap();
        let generated = Value::nil().generate(&head, &mut ctx).unwrap();
        assert_eq!(forced.load(Ordering::SeqCst), 0);
        assert!(head.resolved().is_lazy());

        assert_eq!(cell.length(&mut ctx).unwrap(), Value::Int(1));
        assert_eq!(forced.load(Ordering::SeqCst), 1);
        assert_eq!(generated.generate_finalize(&mut ctx).unwrap().head(&mut ctx).unwrap().force(&mut ctx).unwrap(), Value::Int(1));
    }

    #[test]
    fn generate_builds_in_order() {
        let mut ctx = ExecContext::new();
        let mut acc = Value::nil();
        for i in 1..=3 {
            acc = acc.generate(&Value::Int(i), &mut ctx).unwrap();
        }
        assert_eq!(acc.generate_finalize(&mut ctx).unwrap(), list(&[1, 2, 3]));

        let mut text = Value::str("");
        for c in ['a', 'b'] {
            text = text.generate(&Value::Char(c), &mut ctx).unwrap();
        }
        assert_eq!(text.generate_finalize(&mut ctx).unwrap(), Value::str("ab"));
    }

    #[test]
    fn conversions() {
        let mut ctx = ExecContext::new();
        let cases = [
            (Value::Double(3.9), TypeTag::Int, Value::Int(3)),
            (Value::Double(-3.9), TypeTag::Long, Value::Long(-3)),
            (Value::Int(7), TypeTag::Double, Value::Double(7.0)),
            (Value::Long(7), TypeTag::Int, Value::Int(7)),
            (Value::Char('A'), TypeTag::Int, Value::Int(65)),
            (Value::Int(97), TypeTag::Char, Value::Char('a')),
            (Value::Bool(true), TypeTag::Int, Value::Int(1)),
            (Value::Int(42), TypeTag::String, Value::str("42")),
            (Value::str("hi"), TypeTag::List, Value::list([Value::Char('h'), Value::Char('i')])),
            (Value::list([Value::Char('o'), Value::Char('k')]), TypeTag::String, Value::str("ok")),
            (list(&[1, 2]), TypeTag::String, Value::str("[1, 2]")),
        ];
        for (value, target, expected) in cases {
            assert_eq!(value.convert(target, &mut ctx).unwrap(), expected, "{value:?} -> {target}");
        }
    }

    #[test]
    fn failed_conversions() {
        let cases = [
            (Value::Double(f64::NAN), TypeTag::Int),
            (Value::Double(1e20), TypeTag::Int),
            (Value::Long(i64::MAX), TypeTag::Int),
            (Value::Int(-1), TypeTag::Char),
            (Value::str("12"), TypeTag::Int),
            (Value::Int(1), TypeTag::Record),
        ];
        for (value, target) in cases {
            let mut ctx = ExecContext::new();
            assert_eq!(value.convert(target, &mut ctx), Err(Interrupt::Failed), "{value:?} -> {target}");
            assert_eq!(ctx.error().unwrap().kind, ErrorKind::ConversionFailed);
        }
    }

    #[test]
    fn read_parses_text() {
        let mut ctx = ExecContext::new();
        assert_eq!(Value::read(" 42 ", TypeTag::Int, &mut ctx).unwrap(), Value::Int(42));
        assert_eq!(Value::read("2.5", TypeTag::Double, &mut ctx).unwrap(), Value::Double(2.5));
        assert_eq!(Value::read("true", TypeTag::Bool, &mut ctx).unwrap(), Value::Bool(true));
        assert_eq!(Value::read("x", TypeTag::Char, &mut ctx).unwrap(), Value::Char('x'));

        assert_eq!(Value::read("4x", TypeTag::Int, &mut ctx), Err(Interrupt::Failed));
        assert_eq!(ctx.error().unwrap().kind, ErrorKind::UnableRead);
    }

    #[test]
    fn type_of_reports_kind() {
        let mut ctx = ExecContext::new();
        let info = Value::lazy(|_| Ok(Value::Long(1))).type_of(&mut ctx).unwrap();
        let Value::TypeInfo(info) = info else {
            panic!("expected a type descriptor");
        };
        assert_eq!(info.tag(), Some(TypeTag::Long));
        assert_eq!(info.name.as_ref(), "Long");
    }
}
