#[cfg(test)]
mod tests {
    use crate::op::{BinOp, NumericClass, NumericTower, UnaryOp};
    use crate::rt::{ErrorKind, ExecContext, Interrupt};
    use crate::val::Value;

    macro_rules! test_arith {
        ($name:ident, $op:expr, $l:expr, $r:expr, $res:expr) => {
            #[test]
            fn $name() {
                let mut ctx = ExecContext::new();
                let l: Value = $l.into();
                let r: Value = $r.into();
                let res: Value = $res.into();
                assert_eq!(l.binary($op, &r, &mut ctx).unwrap(), res);
                assert!(!ctx.is_failed());
            }
        };
    }

    test_arith!(add_int, BinOp::Add, 1, 2, 3);
    test_arith!(sub_int, BinOp::Sub, 1, 2, -1);
    test_arith!(mul_long, BinOp::Mul, 3i64, 4i64, 12i64);
    test_arith!(div_int_truncates, BinOp::Div, 7, 2, 3);
    test_arith!(div_negative_truncates, BinOp::Div, -7, 2, -3);
    test_arith!(div_double, BinOp::Div, 3.0, 2.0, 1.5);
    test_arith!(rem_takes_dividend_sign, BinOp::Rem, -7, 3, -1);
    test_arith!(add_wraps, BinOp::Add, i32::MAX, 1, i32::MIN);
    test_arith!(mul_long_wraps, BinOp::Mul, i64::MAX, 2i64, -2i64);
    test_arith!(pow_int, BinOp::Pow, 2, 10, 1024);
    test_arith!(pow_negative_exponent_truncates, BinOp::Pow, 2, -1, 0);
    test_arith!(pow_double, BinOp::Pow, 2.0, 3.0, 8.0);

    // promotion picks the higher class
    test_arith!(int_plus_long, BinOp::Add, 1, 2i64, 3i64);
    test_arith!(long_plus_int, BinOp::Add, 2i64, 1, 3i64);
    test_arith!(int_plus_single, BinOp::Add, 1, 0.5f32, 1.5f32);
    test_arith!(single_plus_double, BinOp::Add, 0.5f32, 0.25, 0.75);
    test_arith!(long_times_double, BinOp::Mul, 3i64, 0.5, 1.5);
    test_arith!(int_div_double, BinOp::Div, 1, 4.0, 0.25);

    test_arith!(bit_and, BinOp::BitAnd, 0b1100, 0b1010, 0b1000);
    test_arith!(bit_or_long, BinOp::BitOr, 0b1100i64, 0b1010, 0b1110i64);
    test_arith!(bit_xor, BinOp::BitXor, 0b1100, 0b1010, 0b0110);
    test_arith!(shl, BinOp::Shl, 1, 4, 16);
    test_arith!(shl_masks_count, BinOp::Shl, 1, 33, 2);
    test_arith!(shr_is_arithmetic, BinOp::Shr, -16, 2, -4);

    fn numbers(x: i32) -> [Value; 4] {
        [
            Value::Int(x),
            Value::Long(x as i64),
            Value::Single(x as f32),
            Value::Double(x as f64),
        ]
    }

    #[test]
    fn floored_modulus_in_every_class() {
        let cases = [(-7, 3, 2), (7, -3, -2), (-7, -3, -1), (7, 3, 1)];
        for (x, y, expected) in cases {
            for ((l, r), res) in numbers(x).iter().zip(numbers(y).iter()).zip(numbers(expected).iter()) {
                let mut ctx = ExecContext::new();
                let got = l.modulus(r, &mut ctx).unwrap();
                assert_eq!(&got, res, "{l:?} % {r:?}");
            }
        }
    }

    #[test]
    fn division_by_zero_in_every_class() {
        for op in [BinOp::Div, BinOp::Rem, BinOp::Mod] {
            for lhs in numbers(5) {
                for zero in numbers(0) {
                    let mut ctx = ExecContext::new();
                    assert_eq!(lhs.binary(op, &zero, &mut ctx), Err(Interrupt::Failed));
                    let err = ctx.error().unwrap();
                    assert_eq!(err.kind, ErrorKind::DivideByZero);
                    assert_eq!(err.op.as_ref(), op.name());
                }
            }
        }
    }

    #[test]
    fn add_is_commutative_across_classes() {
        for l in numbers(3) {
            for r in numbers(4) {
                let mut ctx = ExecContext::new();
                let lr = l.add(&r, &mut ctx).unwrap();
                let rl = r.add(&l, &mut ctx).unwrap();
                assert_eq!(lr, rl);

                let expected = NumericTower::result(
                    NumericTower::classify(&l).unwrap(),
                    NumericTower::classify(&r).unwrap(),
                );
                assert_eq!(NumericTower::classify(&lr), Some(expected));
                assert!(lr.equal(&Value::Int(7), &mut ctx).unwrap());
            }
        }
    }

    #[test]
    fn cross_class_equality_is_symmetric() {
        let samples: Vec<Value> = numbers(2).into_iter().chain(numbers(-1)).collect();
        for l in &samples {
            for r in &samples {
                let mut ctx = ExecContext::new();
                assert_eq!(l.equal(r, &mut ctx).unwrap(), r.equal(l, &mut ctx).unwrap(), "{l:?} == {r:?}");
            }
        }
    }

    #[test]
    fn rank_table() {
        assert!(NumericClass::Int < NumericClass::Long);
        assert!(NumericClass::Long < NumericClass::Single);
        assert!(NumericClass::Single < NumericClass::Double);
        assert_eq!(
            NumericTower::result(NumericClass::Long, NumericClass::Single),
            NumericClass::Single
        );
        assert!(NumericTower::is_integral(NumericClass::Long));
        assert!(!NumericTower::is_integral(NumericClass::Single));
    }

    #[test]
    fn bitwise_rejects_floats() {
        let mut ctx = ExecContext::new();
        let res = Value::Int(1).bit_and(&Value::Double(1.0), &mut ctx);
        assert_eq!(res, Err(Interrupt::Failed));
        assert_eq!(ctx.error().unwrap().kind, ErrorKind::InvalidOperand);
    }

    #[test]
    fn arithmetic_on_strings_is_invalid() {
        let mut ctx = ExecContext::new();
        let res = Value::str("a").add(&Value::Int(1), &mut ctx);
        assert_eq!(res, Err(Interrupt::Failed));
        let err = ctx.error().unwrap();
        assert_eq!(err.kind, ErrorKind::InvalidOperand);
        assert_eq!(err.op.as_ref(), "Add");
        let operands: Vec<&str> = err.operands.iter().map(|s| s.as_ref()).collect();
        assert_eq!(operands, ["String", "Int"]);
    }

    #[test]
    fn failed_context_short_circuits() {
        let mut ctx = ExecContext::new();
        let _ = Value::Int(1).div(&Value::Int(0), &mut ctx);
        assert_eq!(Value::Int(1).add(&Value::Int(1), &mut ctx), Err(Interrupt::Failed));
        // the first error is kept
        assert_eq!(ctx.error().unwrap().kind, ErrorKind::DivideByZero);
    }

    #[test]
    fn unary_steps() {
        let mut ctx = ExecContext::new();
        assert_eq!(Value::Int(i32::MAX).succ(&mut ctx).unwrap(), Value::Int(i32::MIN));
        assert_eq!(Value::Double(1.5).pred(&mut ctx).unwrap(), Value::Double(0.5));
        assert_eq!(Value::Long(5).neg(&mut ctx).unwrap(), Value::Long(-5));
        assert_eq!(Value::Int(0).bit_not(&mut ctx).unwrap(), Value::Int(-1));
        assert_eq!(Value::Char('a').succ(&mut ctx).unwrap(), Value::Char('b'));
        assert_eq!(Value::Bool(true).not(&mut ctx).unwrap(), Value::Bool(false));
    }

    #[test]
    fn char_step_out_of_range_fails() {
        let mut ctx = ExecContext::new();
        assert_eq!(Value::Char('\0').pred(&mut ctx), Err(Interrupt::Failed));
        assert_eq!(ctx.error().unwrap().kind, ErrorKind::ConversionFailed);

        let mut ctx = ExecContext::new();
        assert_eq!(Value::Single(1.0).unary(UnaryOp::BitNot, &mut ctx), Err(Interrupt::Failed));
        assert_eq!(ctx.error().unwrap().kind, ErrorKind::InvalidOperand);
    }
}
