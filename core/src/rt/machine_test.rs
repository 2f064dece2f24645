#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::op::{BinOp, UnaryOp};
    use crate::rt::{Chunk, ErrorKind, ExecContext, Instr, Interrupt, Literal, Machine, Program, RuntimeError};
    use crate::val::{Function, OverloadTable, Thunk, TypeTag, Value};

    fn main(code: Vec<Instr>) -> Chunk {
        Chunk::new("main", 0, code)
    }

    fn run(chunks: Vec<Chunk>) -> anyhow::Result<Value> {
        let program = Program::new(chunks, 0)?;
        Machine::new().run(&program, &mut ExecContext::cooperative())
    }

    fn int(i: i32) -> Instr {
        Instr::Push(Literal::Int(i))
    }

    /// `range lo hi`: the list `[lo, hi)` with every tail a lazy call back
    /// into `range`.
    fn range_chunks() -> Vec<Chunk> {
        vec![
            Chunk::new(
                "range",
                2,
                vec![
                    Instr::Load(0),
                    Instr::Load(1),
                    Instr::Binary(BinOp::Lt),
                    Instr::JumpIfFalse(12),
                    Instr::Load(0),
                    Instr::Load(0),
                    int(1),
                    Instr::Binary(BinOp::Add),
                    Instr::Load(1),
                    Instr::Lazy { chunk: 2, captures: 2 },
                    Instr::Cons,
                    Instr::Return,
                    Instr::MakeList(0),
                    Instr::Return,
                ],
            ),
            Chunk::new(
                "range_tail",
                0,
                vec![
                    Instr::Closure { chunk: 1, captures: 0 },
                    Instr::Load(0),
                    Instr::Load(1),
                    Instr::Call(2),
                    Instr::Return,
                ],
            ),
        ]
    }

    /// Sums `range 0 n` with a loop over the lazy spine.
    fn sum_range(n: i32) -> Vec<Chunk> {
        let mut chunks = vec![main(vec![
            Instr::Closure { chunk: 1, captures: 0 },
            int(0),
            Instr::Push(Literal::Int(n)),
            Instr::Call(2),
            Instr::Store(0),
            Instr::Push(Literal::Long(0)),
            Instr::Store(1),
            // loop
            Instr::Load(0),
            Instr::IsNil,
            Instr::JumpIfFalse(12),
            Instr::Load(1),
            Instr::Return,
            Instr::Load(1),
            Instr::Load(0),
            Instr::Head,
            Instr::Binary(BinOp::Add),
            Instr::Store(1),
            Instr::Load(0),
            Instr::Tail,
            Instr::Store(0),
            Instr::Jump(7),
        ])];
        chunks.extend(range_chunks());
        chunks
    }

    #[test]
    fn arithmetic_program() {
        let value = run(vec![main(vec![
            int(6),
            int(7),
            Instr::Binary(BinOp::Mul),
            Instr::Unary(UnaryOp::Neg),
            Instr::Return,
        ])])
        .unwrap();
        assert_eq!(value, Value::Int(-42));
    }

    #[test]
    fn running_off_the_end_returns_top() {
        let value = run(vec![main(vec![int(1), int(2)])]).unwrap();
        assert_eq!(value, Value::Int(2));
    }

    #[test]
    fn lazy_list_walk() {
        let value = run(sum_range(1000)).unwrap();
        assert_eq!(value, Value::Long(499_500));
    }

    #[test]
    fn empty_range() {
        let value = run(sum_range(0)).unwrap();
        assert_eq!(value, Value::Long(0));
    }

    #[test]
    fn aggregates_and_show() {
        let value = run(vec![main(vec![
            int(1),
            Instr::Push(Literal::Str("x".into())),
            Instr::MakeRecord(vec!["n".into(), "s".into()]),
            Instr::MakeVariant("Box".into()),
            Instr::Show,
            Instr::Return,
        ])])
        .unwrap();
        assert_eq!(value, Value::str("Box {n = 1, s = \"x\"}"));

        let value = run(vec![main(vec![
            int(1),
            int(2),
            int(3),
            Instr::MakeList(3),
            Instr::Dup,
            Instr::Length,
            Instr::Swap,
            Instr::Pop,
            Instr::Return,
        ])])
        .unwrap();
        assert_eq!(value, Value::Int(3));
    }

    #[test]
    fn set_index_and_convert() {
        let value = run(vec![main(vec![
            int(1),
            int(2),
            Instr::MakeList(2),
            int(0),
            Instr::Push(Literal::Double(2.5)),
            Instr::SetIndex,
            int(0),
            Instr::Index,
            Instr::Convert(TypeTag::Int),
            Instr::Return,
        ])])
        .unwrap();
        assert_eq!(value, Value::Int(2));
    }

    #[test]
    fn lazy_returning_lazy_is_chained() {
        // chunk 1 yields a thunk over chunk 2, which yields 5
        let chunks = vec![
            main(vec![
                Instr::Lazy { chunk: 1, captures: 0 },
                Instr::Dup,
                int(1),
                Instr::Binary(BinOp::Add),
                Instr::Swap,
                Instr::Force,
                Instr::Binary(BinOp::Add),
                Instr::Return,
            ]),
            Chunk::new("outer", 0, vec![Instr::Lazy { chunk: 2, captures: 0 }, Instr::Return]),
            Chunk::new("inner", 0, vec![int(5), Instr::Return]),
        ];
        assert_eq!(run(chunks).unwrap(), Value::Int(11));
    }

    #[test]
    fn try_catches_runtime_errors() {
        let value = run(vec![main(vec![
            Instr::Try(6),
            int(1),
            int(0),
            Instr::Binary(BinOp::Div),
            Instr::EndTry,
            Instr::Return,
            // handler: Error {kind, op, message}
            Instr::Dup,
            Instr::Tag,
            Instr::Swap,
            Instr::Untag,
            Instr::Push(Literal::Str("kind".into())),
            Instr::Index,
            Instr::MakeList(2),
            Instr::Return,
        ])])
        .unwrap();
        assert_eq!(value, Value::list([Value::str("Error"), Value::str("DivideByZero")]));
    }

    #[test]
    fn try_catches_errors_from_nested_calls() {
        let chunks = vec![
            main(vec![
                Instr::Try(5),
                Instr::Closure { chunk: 1, captures: 0 },
                int(3),
                Instr::Call(1),
                Instr::Return,
                Instr::Untag,
                Instr::Push(Literal::Str("op".into())),
                Instr::Index,
                Instr::Return,
            ]),
            Chunk::new(
                "bad",
                1,
                vec![Instr::Load(0), Instr::Push(Literal::Str("s".into())), Instr::Binary(BinOp::Sub), Instr::Return],
            ),
        ];
        assert_eq!(run(chunks).unwrap(), Value::str("Subtract"));
    }

    #[test]
    fn unhandled_error_is_returned() {
        let err = run(vec![main(vec![int(1), Instr::Push(Literal::Bool(true)), Instr::Binary(BinOp::Add)])])
            .unwrap_err();
        let runtime = err.downcast_ref::<RuntimeError>().unwrap();
        assert_eq!(runtime.kind, ErrorKind::InvalidOperand);
        let operands: Vec<&str> = runtime.operands.iter().map(|s| s.as_ref()).collect();
        assert_eq!(operands, ["Int", "Bool"]);
    }

    #[test]
    fn condition_must_be_bool() {
        let err = run(vec![main(vec![int(1), Instr::JumpIfFalse(0)])]).unwrap_err();
        assert_eq!(err.downcast_ref::<RuntimeError>().unwrap().op.as_ref(), "JumpIfFalse");
    }

    #[test]
    fn curried_code_functions() {
        let chunks = vec![
            main(vec![
                Instr::Closure { chunk: 1, captures: 0 },
                int(10),
                Instr::Call(1),
                int(5),
                Instr::Call(1),
                Instr::Return,
            ]),
            Chunk::new("minus", 2, vec![Instr::Load(0), Instr::Load(1), Instr::Binary(BinOp::Sub), Instr::Return]),
        ];
        assert_eq!(run(chunks).unwrap(), Value::Int(5));
    }

    #[test]
    fn surplus_arguments_apply_to_the_returned_function() {
        // make_adder n = \x -> n + x, called as make_adder 2 40
        let chunks = vec![
            main(vec![
                Instr::Closure { chunk: 1, captures: 0 },
                int(2),
                int(40),
                Instr::Call(2),
                Instr::Return,
            ]),
            Chunk::new("make_adder", 1, vec![Instr::Load(0), Instr::Closure { chunk: 2, captures: 1 }, Instr::Return]),
            Chunk::new("adder", 1, vec![Instr::Load(0), Instr::Load(1), Instr::Binary(BinOp::Add), Instr::Return]),
        ];
        assert_eq!(run(chunks).unwrap(), Value::Int(42));
    }

    fn describe() -> Arc<Function> {
        let int = Function::native("int_case", 1, |_, _| Ok(Value::str("int")));
        let text = Function::native("str_case", 1, |_, _| Ok(Value::str("string")));
        let table = OverloadTable::new("describe", 1)
            .with_clause(vec![Some(TypeTag::Int.id())], int)
            .and_then(|table| table.with_clause(vec![Some(TypeTag::String.id())], text))
            .unwrap();
        Function::overloaded(table)
    }

    #[test]
    fn overloads_select_by_runtime_type() {
        let program = Program::new(
            vec![
                main(vec![
                    Instr::Load(0),
                    Instr::Lazy { chunk: 1, captures: 0 },
                    Instr::Call(1),
                    Instr::Return,
                ]),
                Chunk::new("lazy_text", 0, vec![Instr::Push(Literal::Str("s".into())), Instr::Return]),
            ],
            0,
        )
        .unwrap();
        let mut ctx = ExecContext::cooperative();
        let out = Machine::new().invoke(&program, 0, vec![Value::Function(describe())], &mut ctx);
        // the lazy argument is forced before the clause is chosen
        assert_eq!(out.unwrap(), Value::str("string"));
    }

    #[test]
    fn no_matching_overload() {
        let program = Program::new(
            vec![main(vec![Instr::Load(0), Instr::Push(Literal::Bool(true)), Instr::Call(1), Instr::Return])],
            0,
        )
        .unwrap();
        let mut ctx = ExecContext::cooperative();
        let out = Machine::new().invoke(&program, 0, vec![Value::Function(describe())], &mut ctx);
        assert_eq!(out, Err(Interrupt::Failed));
        let err = ctx.error().unwrap();
        assert_eq!(err.kind, ErrorKind::NoOverload);
        assert_eq!(err.op.as_ref(), "describe");
    }

    #[test]
    fn code_function_applied_from_the_host() {
        let program = Program::new(
            vec![
                main(vec![Instr::Push(Literal::Unit)]),
                Chunk::new("square", 1, vec![Instr::Load(0), Instr::Dup, Instr::Binary(BinOp::Mul), Instr::Return]),
                Chunk::new("seven", 0, vec![int(7), Instr::Return]),
            ],
            0,
        )
        .unwrap();
        let square = Function::code(program.clone(), 1, Vec::new()).unwrap();
        let mut ctx = ExecContext::new();
        assert_eq!(square.invoke(&[Value::Int(9)], &mut ctx).unwrap(), Value::Int(81));
        assert!(Function::code(program.clone(), 3, Vec::new()).is_none());

        // forcing eagerly runs the body on a nested machine
        let seven = Function::code(program, 2, Vec::new()).unwrap();
        let lazy = Value::Lazy(Thunk::from_function(seven));
        assert_eq!(lazy.add(&Value::Int(1), &mut ctx).unwrap(), Value::Int(8));
        assert_eq!(lazy.resolved(), &Value::Int(7));
    }

    #[test]
    fn host_thunk_forced_by_the_machine_runs_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let inner = Value::lazy(|_| Ok(Value::Int(41)));
        let outer = Value::lazy(move |ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            inner.add(&Value::Int(1), ctx)
        });
        let program = Program::new(
            vec![
                main(vec![Instr::Push(Literal::Unit)]),
                Chunk::new("force_capture", 0, vec![Instr::Load(0), Instr::Force, Instr::Return]),
            ],
            0,
        )
        .unwrap();
        let force_capture = Function::code(program, 1, vec![outer.clone()]).unwrap();

        let mut ctx = ExecContext::cooperative();
        assert_eq!(force_capture.apply(&[], &mut ctx).unwrap(), Value::Int(42));
        assert_eq!(force_capture.apply(&[], &mut ctx).unwrap(), Value::Int(42));
        assert_eq!(outer.resolved(), &Value::Int(42));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn step_limit_aborts() {
        let program = Program::new(vec![main(vec![Instr::Jump(0)])], 0).unwrap();
        let mut machine = Machine::new().with_step_limit(1000);
        let err = machine.run(&program, &mut ExecContext::cooperative()).unwrap_err();
        assert!(err.to_string().contains("step limit"));
        assert_eq!(machine.steps(), 1000);
    }

    #[test]
    fn step_limit_is_not_catchable() {
        let program = Program::new(vec![main(vec![Instr::Try(2), Instr::Jump(1), Instr::Return])], 0).unwrap();
        let err = Machine::new()
            .with_step_limit(50)
            .run(&program, &mut ExecContext::cooperative())
            .unwrap_err();
        assert!(err.downcast_ref::<RuntimeError>().is_none());
    }

    #[test]
    fn validation_rejects_bad_programs() {
        assert!(Program::new(vec![main(vec![Instr::Jump(9)])], 0).is_err());
        assert!(Program::new(vec![main(vec![Instr::Lazy { chunk: 4, captures: 0 }])], 0).is_err());
        assert!(Program::new(vec![Chunk::new("f", 1, vec![])], 0).is_err());
        assert!(Program::new(vec![], 0).is_err());
    }

    #[test]
    fn stack_underflow_aborts() {
        let err = run(vec![main(vec![Instr::Binary(BinOp::Add)])]).unwrap_err();
        assert!(err.to_string().contains("stack underflow"));
    }

    #[test]
    fn programs_load_from_json_and_yaml() {
        let json = r#"{
            "chunks": [
                {"name": "main", "code": [
                    {"push": {"int": 20}},
                    {"push": {"long": 22}},
                    {"binary": "add"},
                    "return"
                ]}
            ]
        }"#;
        let program = Program::from_json(json).unwrap();
        let value = Machine::new().run(&program, &mut ExecContext::cooperative()).unwrap();
        assert_eq!(value, Value::Long(42));

        let yaml = "
chunks:
  - name: main
    code:
      - push:
          str: hi
      - show
      - return
";
        let program = Program::from_yaml(yaml).unwrap();
        let value = Machine::new().run(&program, &mut ExecContext::cooperative()).unwrap();
        assert_eq!(value, Value::str("hi"));
    }
}
