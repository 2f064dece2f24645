#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::rt::{ErrorKind, ExecContext, Interrupt};
    use crate::val::{Module, Record, Value};

    fn pairs(fields: &[(&str, i32)]) -> Value {
        Value::record(fields.iter().map(|(name, value)| (*name, Value::Int(*value))))
    }

    #[test]
    fn lookup_sees_first_duplicate() {
        let mut ctx = ExecContext::new();
        let record = pairs(&[("a", 1), ("b", 2), ("a", 3)]);
        assert_eq!(record.get_value(&Value::str("a"), &mut ctx).unwrap(), Value::Int(1));
        assert_eq!(record.get_value(&Value::Int(2), &mut ctx).unwrap(), Value::Int(3));
        assert_eq!(record.length(&mut ctx).unwrap(), Value::Int(3));
        assert_eq!(record.to_string(), "{a = 1, b = 2, a = 3}");
    }

    #[test]
    fn missing_name_is_out_of_range() {
        let mut ctx = ExecContext::new();
        let record = pairs(&[("a", 1)]);
        assert_eq!(record.get_value(&Value::str("z"), &mut ctx), Err(Interrupt::Failed));
        assert_eq!(ctx.error().unwrap().kind, ErrorKind::IndexOutOfRange);

        let mut ctx = ExecContext::new();
        assert_eq!(record.get_value(&Value::Bool(true), &mut ctx), Err(Interrupt::Failed));
        assert_eq!(ctx.error().unwrap().kind, ErrorKind::InvalidIndexType);
    }

    #[test]
    fn concat_keeps_left_fields_first() {
        let mut ctx = ExecContext::new();
        let joined = pairs(&[("a", 1)]).concat(&pairs(&[("a", 2), ("b", 3)]), &mut ctx).unwrap();
        assert_eq!(joined.length(&mut ctx).unwrap(), Value::Int(3));
        assert_eq!(joined.get_value(&Value::str("a"), &mut ctx).unwrap(), Value::Int(1));
        assert_eq!(joined.get_value(&Value::str("b"), &mut ctx).unwrap(), Value::Int(3));
    }

    #[test]
    fn set_value_updates_first_match_only() {
        let mut ctx = ExecContext::new();
        let record = pairs(&[("a", 1), ("a", 2)]);
        let updated = record.set_value(&Value::str("a"), Value::Int(9), &mut ctx).unwrap();
        assert_eq!(updated, pairs(&[("a", 9), ("a", 2)]));
        assert_eq!(record, pairs(&[("a", 1), ("a", 2)]));

        let by_position = record.set_value(&Value::Int(1), Value::Int(7), &mut ctx).unwrap();
        assert_eq!(by_position, pairs(&[("a", 1), ("a", 7)]));

        assert_eq!(record.set_value(&Value::Int(2), Value::Unit, &mut ctx), Err(Interrupt::Failed));
        assert_eq!(ctx.error().unwrap().kind, ErrorKind::IndexOutOfRange);
    }

    #[test]
    fn equality_compares_every_entry_in_order() {
        let mut ctx = ExecContext::new();
        let base = pairs(&[("a", 1), ("a", 2)]);
        assert!(base.equal(&pairs(&[("a", 1), ("a", 2)]), &mut ctx).unwrap());
        assert!(!base.equal(&pairs(&[("a", 1), ("a", 3)]), &mut ctx).unwrap());
        assert!(!base.equal(&pairs(&[("a", 1)]), &mut ctx).unwrap());
        assert!(!pairs(&[("a", 1), ("b", 2)]).equal(&pairs(&[("b", 2), ("a", 1)]), &mut ctx).unwrap());

        let widened = Value::record([("a", Value::Double(1.0)), ("a", Value::Long(2))]);
        assert!(base.equal(&widened, &mut ctx).unwrap());
    }

    #[test]
    fn empty_record_from_nil_of() {
        let mut ctx = ExecContext::new();
        let empty = pairs(&[("a", 1)]).nil_of(&mut ctx).unwrap();
        assert_eq!(empty, Value::Record(Arc::new(Record::default())));
        assert_eq!(empty.to_string(), "{}");
    }

    #[test]
    fn variant_tags_and_payloads() {
        let mut ctx = ExecContext::new();
        let some = Value::some(Value::Int(1));
        assert_eq!(some.get_tag(&mut ctx).unwrap(), Value::str("Some"));
        assert_eq!(some.untag(&mut ctx).unwrap(), Value::Int(1));
        assert_eq!(Value::none().untag(&mut ctx).unwrap(), Value::Unit);

        assert!(some.equal(&Value::some(Value::Double(1.0)), &mut ctx).unwrap());
        assert!(!some.equal(&Value::none(), &mut ctx).unwrap());
        assert!(!some.equal(&Value::some(Value::Int(2)), &mut ctx).unwrap());
        assert!(!some.equal(&Value::variant("Ok", Value::Int(1)), &mut ctx).unwrap());

        assert_eq!(Value::Int(1).get_tag(&mut ctx), Err(Interrupt::Failed));
        assert_eq!(ctx.error().unwrap().op.as_ref(), "GetTag");
    }

    #[test]
    fn module_exports() {
        let mut ctx = ExecContext::new();
        let exports = Record::from_pairs([("pi", Value::Double(3.5)), ("one", Value::Int(1))]);
        let module = Value::Module(Arc::new(Module::new("consts", exports)));
        assert_eq!(module.get_value(&Value::str("one"), &mut ctx).unwrap(), Value::Int(1));
        assert_eq!(module.length(&mut ctx).unwrap(), Value::Int(2));
        assert_eq!(module.to_string(), "<module consts>");
        assert!(module.equal(&module.clone(), &mut ctx).unwrap());
    }
}
