use la_arena::Arena;

use crate::{
    expr::{ExprKind, ExprNode, ValueUsage},
    generics::GenericParams,
    item::{Crate, Function, Module, Param},
    name::Name,
    pattern::Pattern,
    target::{Edition, TargetSpec},
    ty::TypeRef,
    visitor::Visitor,
};

fn sample_crate() -> Crate {
    let mut krate = Crate::new(Name::new("demo"), TargetSpec::host(), Edition::E1_54);
    let body = ExprNode::new(
        TypeRef::Primitive(crate::ty::Primitive::I32),
        ExprKind::Literal(crate::expr::Literal::Integer(1)),
    );
    let func = Function {
        generics: GenericParams::default(),
        receiver: None,
        args: vec![Param { pattern: Pattern::any(), ty: TypeRef::Primitive(crate::ty::Primitive::I32) }],
        ret_ty: TypeRef::Primitive(crate::ty::Primitive::I32),
        body: Some(Box::new(body)),
        is_const: false,
        is_unsafe: false,
        erased_types: Vec::new(),
    };
    krate.root.functions.insert(Name::new("f"), func);
    krate
}

#[test]
fn arena_round_trips_idx() {
    let mut arena: Arena<u32> = Arena::new();
    let a = arena.alloc(10);
    let b = arena.alloc(20);
    assert_eq!(arena[a], 10);
    assert_eq!(arena[b], 20);
}

#[test]
fn visitor_visits_every_function() {
    struct CountFns(usize);
    impl Visitor for CountFns {
        fn visit_function(&mut self, _path: &[Name], _name: &Name, func: &mut Function) {
            self.0 += 1;
            crate::visitor::walk_function(self, func);
        }
    }

    let mut krate = sample_crate();
    let mut counter = CountFns(0);
    counter.visit_crate(&mut krate);
    assert_eq!(counter.0, 1);
}

#[test]
fn value_usage_combine_follows_borrow_mutate_move_order() {
    assert_eq!(ValueUsage::Borrow.combine(ValueUsage::Move), ValueUsage::Move);
    assert_eq!(ValueUsage::Mutate.combine(ValueUsage::Borrow), ValueUsage::Mutate);
    assert_eq!(ValueUsage::Unknown.combine(ValueUsage::Borrow), ValueUsage::Borrow);
}

#[test]
fn module_is_empty_by_default_for_fresh_submodule() {
    let m = Module::new(Name::new("child"));
    assert!(m.functions.is_empty());
    assert!(m.submodules.is_empty());
}
