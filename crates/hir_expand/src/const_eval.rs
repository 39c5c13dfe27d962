//! Pass A (full constant evaluation, `const_eval_full.cpp`) and pass E
//! (static borrow promotion, the first half of `static_borrow_constants.cpp`
//! — spec §4.8 splits one source file's purpose across two entry points).
//!
//! This repo's `ExprNode` tree already is the lowered form the original's
//! MIR interpreter (`evaluate_constant_mir`) worked over — there is no
//! separate MIR IR here — so the evaluator below walks `ExprNode` directly
//! instead of a block/statement MIR. `Variable` nodes only resolve here
//! while evaluating a `const fn`'s own body, bound against its parameters;
//! any other `Variable` reaching the evaluator is a real runtime local and
//! a bug at this point in the pipeline.

use rustc_hash::FxHashMap;

use hir_def::{
    diagnostics::{LowerError, LowerResult, RecursionStack, Span},
    expr::{BinOp, ExprKind, ExprNode, Literal, UniOp},
    item::{Const, ConstValue, Crate, Module, PathValueKind, Static},
    name::{Name, NameSupply},
    path::{GenericPath, Path, SimplePath},
    pattern::PatternBinding,
    target::TargetSpec,
    ty::{BorrowType, Mutability, Primitive, TypeRef},
};

// ---------------------------------------------------------------------
// Pass A: full constant evaluation
// ---------------------------------------------------------------------

pub fn evaluate_constants_full(krate: &mut Crate) {
    let _s = profile::span("hir_expand::evaluate_constants_full");
    let target = krate.target;
    let mut ctx = EvalCtx { krate: &*krate, target, cache: FxHashMap::default(), pending: Vec::new(), supply: NameSupply::default() };
    let paths = collect_const_paths(&krate.root, &[]);
    for path in paths {
        // Errors are reported and the item is left `Invalid`; the next
        // typecheck-adjacent pass would surface it, matching spec §7's
        // "inference failures leave ivars unresolved, the next pass detects
        // them" propagation style.
        let _ = ctx.eval_item(&path);
    }
    let EvalCtx { cache, pending, .. } = ctx;
    apply_results(&mut krate.root, &cache);
    for (name, static_) in pending {
        krate.root.statics.insert(name, static_);
    }
    fill_enum_discriminants(&mut krate.root);
}

fn collect_const_paths(module: &Module, prefix: &[Name]) -> Vec<SimplePath> {
    let mut out = Vec::new();
    for name in module.consts.keys().chain(module.statics.keys()) {
        let mut components = prefix.to_vec();
        components.push(name.clone());
        out.push(SimplePath { crate_name: Name::new("self"), components });
    }
    for (name, sub) in &module.submodules {
        let mut next_prefix = prefix.to_vec();
        next_prefix.push(name.clone());
        out.extend(collect_const_paths(sub, &next_prefix));
    }
    out
}

fn apply_results(module: &mut Module, cache: &FxHashMap<SimplePath, ConstValue>) {
    for (name, c) in module.consts.iter_mut() {
        if let Some(v) = find_by_last_name(cache, name) {
            c.evaluated = v.clone();
        }
    }
    for (name, s) in module.statics.iter_mut() {
        if let Some(v) = find_by_last_name(cache, name) {
            s.evaluated = v.clone();
        }
    }
    for sub in module.submodules.values_mut() {
        apply_results(sub, cache);
    }
}

fn find_by_last_name<'c>(cache: &'c FxHashMap<SimplePath, ConstValue>, name: &Name) -> Option<&'c ConstValue> {
    cache.iter().find(|(p, _)| p.components.last() == Some(name)).map(|(_, v)| v)
}

fn fill_enum_discriminants(module: &mut Module) {
    for (_, e) in module.enums.iter_mut() {
        let mut next = 0u64;
        for v in e.variants.iter_mut() {
            match &v.discriminant {
                Some(d) => next = d.as_u64().unwrap_or(0).wrapping_add(1),
                None => {
                    v.discriminant = Some(ConstValue::Integer(next));
                    next = next.wrapping_add(1);
                }
            }
        }
    }
    for sub in module.submodules.values_mut() {
        fill_enum_discriminants(sub);
    }
}

struct EvalCtx<'a> {
    krate: &'a Crate,
    target: TargetSpec,
    cache: FxHashMap<SimplePath, ConstValue>,
    pending: Vec<(Name, Static)>,
    supply: NameSupply,
}

impl<'a> EvalCtx<'a> {
    fn eval_item(&mut self, path: &SimplePath) -> LowerResult<ConstValue> {
        if let Some(v) = self.cache.get(path) {
            return Ok(v.clone());
        }
        let name = path.components.last().cloned().ok_or_else(|| LowerError::bug(Span::DUMMY, "empty const path"))?;
        if let Some(c) = find_in_modules(&self.krate.root, &name, |m, n| m.consts.get(n)) {
            if c.evaluated.is_valid() {
                self.cache.insert(path.clone(), c.evaluated.clone());
                return Ok(c.evaluated.clone());
            }
            let init = c.init.as_ref().ok_or_else(|| LowerError::bug(Span::DUMMY, "const with no initializer"))?;
            let mut stack = RecursionStack::new(256);
            let locals = FxHashMap::default();
            let value = self.eval_expr(init, &locals, &mut stack)?;
            self.cache.insert(path.clone(), value.clone());
            return Ok(value);
        }
        if let Some(s) = find_in_modules(&self.krate.root, &name, |m, n| m.statics.get(n)) {
            if s.evaluated.is_valid() {
                self.cache.insert(path.clone(), s.evaluated.clone());
                return Ok(s.evaluated.clone());
            }
            let init = s.init.as_ref().ok_or_else(|| LowerError::bug(Span::DUMMY, "static with no initializer"))?;
            let mut stack = RecursionStack::new(256);
            let locals = FxHashMap::default();
            let value = self.eval_expr(init, &locals, &mut stack)?;
            self.cache.insert(path.clone(), value.clone());
            return Ok(value);
        }
        Err(LowerError::bug(Span::DUMMY, "const path resolves to neither a const nor a static"))
    }

    fn eval_expr(&mut self, node: &ExprNode, locals: &FxHashMap<u32, ConstValue>, stack: &mut RecursionStack<SimplePath>) -> LowerResult<ConstValue> {
        let value = match &node.kind {
            ExprKind::Literal(lit) => literal_to_const(lit),
            ExprKind::Tuple { vals } | ExprKind::ArrayList { vals } => {
                ConstValue::List(vals.iter().map(|v| self.eval_expr(v, locals, stack)).collect::<LowerResult<_>>()?)
            }
            ExprKind::ArraySized { value, count } => {
                let v = self.eval_expr(value, locals, stack)?;
                let n = count.is_known().then(|| match count {
                    hir_def::ty::ConstGeneric::Known(n) => *n,
                    _ => unreachable!(),
                });
                let n = n.ok_or_else(|| LowerError::bug(node_span(), "array length not known at const-eval time"))?;
                ConstValue::List(std::iter::repeat(v).take(n as usize).collect())
            }
            ExprKind::StructLiteral { path, fields, .. } => {
                let ordered = self.order_struct_fields(path, fields, locals, stack)?;
                ConstValue::List(ordered)
            }
            ExprKind::UnitVariant { path } => {
                let idx = self.variant_index(path).unwrap_or(0);
                ConstValue::Variant { idx, fields: Vec::new() }
            }
            ExprKind::TupleVariant { path, args } => {
                let idx = self.variant_index(path).unwrap_or(0);
                let fields = args.iter().map(|a| self.eval_expr(a, locals, stack)).collect::<LowerResult<_>>()?;
                ConstValue::Variant { idx, fields }
            }
            ExprKind::PathValue { path, kind } => match kind {
                PathValueKind::Function => ConstValue::ItemAddr(path.clone()),
                PathValueKind::Const | PathValueKind::Static => {
                    let simple = simple_path_of(path).ok_or_else(|| LowerError::bug(node_span(), "UFCS path in constant position"))?;
                    self.eval_item(&simple)?
                }
                PathValueKind::UnitStruct => ConstValue::List(Vec::new()),
                PathValueKind::UnitEnumVariant => {
                    let idx = self.variant_index(path).unwrap_or(0);
                    ConstValue::Variant { idx, fields: Vec::new() }
                }
            },
            ExprKind::Variable { slot, .. } => {
                locals.get(slot).cloned().ok_or_else(|| LowerError::bug(node_span(), "unbound local in constant expression"))?
            }
            ExprKind::Cast { value, ty } => {
                let v = self.eval_expr(value, locals, stack)?;
                mask_to(&self.target, v, ty)
            }
            ExprKind::Unsize { value, .. } => self.eval_expr(value, locals, stack)?,
            ExprKind::Block { stmts, result } => {
                let mut scope = locals.clone();
                for s in stmts {
                    self.eval_stmt(s, &mut scope, stack)?;
                }
                self.eval_expr(result, &scope, stack)?
            }
            ExprKind::If { cond, then_, else_ } => {
                let c = self.eval_expr(cond, locals, stack)?;
                if is_truthy(&c) {
                    self.eval_expr(then_, locals, stack)?
                } else {
                    match else_ {
                        Some(e) => self.eval_expr(e, locals, stack)?,
                        None => ConstValue::List(Vec::new()),
                    }
                }
            }
            ExprKind::BinOp { op, lhs, rhs } => {
                let l = self.eval_expr(lhs, locals, stack)?;
                let r = self.eval_expr(rhs, locals, stack)?;
                eval_binop(*op, &l, &r)?
            }
            ExprKind::UniOp { op, value } => {
                let v = self.eval_expr(value, locals, stack)?;
                eval_uniop(*op, &v)?
            }
            ExprKind::Borrow { ty, value } => {
                if !matches!(ty, BorrowType::Shared) {
                    return Err(LowerError::bug(node_span(), "non-shared borrow in constant position"));
                }
                let inner = self.eval_expr(value, locals, stack)?;
                let static_name = self.supply.fresh("const_lifted");
                self.pending.push((
                    static_name.clone(),
                    Static { ty: value.ty.clone(), init: Some(value.clone()), evaluated: inner.clone(), is_mut: false },
                ));
                ConstValue::BorrowOf(Path::Generic(GenericPath::new(SimplePath { crate_name: self.krate.name.clone(), components: vec![static_name] })))
            }
            ExprKind::Field { value, name } => {
                let v = self.eval_expr(value, locals, stack)?;
                let idx = self.field_index(&value.ty, name).ok_or_else(|| LowerError::bug(node_span(), "unknown field in constant position"))?;
                match v {
                    ConstValue::List(mut fs) if idx < fs.len() => fs.swap_remove(idx),
                    ConstValue::Variant { mut fields, .. } if idx < fields.len() => fields.swap_remove(idx),
                    _ => return Err(LowerError::bug(node_span(), "field access on non-aggregate constant")),
                }
            }
            ExprKind::Index { value, index } => {
                let v = self.eval_expr(value, locals, stack)?;
                let i = self.eval_expr(index, locals, stack)?;
                let i = i.as_u64().ok_or_else(|| LowerError::bug(node_span(), "non-constant index in constant position"))? as usize;
                match v {
                    ConstValue::List(fs) if i < fs.len() => fs[i].clone(),
                    _ => return Err(LowerError::bug(node_span(), "index out of range in constant position")),
                }
            }
            ExprKind::CallPath { path, args } => {
                let simple = simple_path_of(path).ok_or_else(|| LowerError::bug(node_span(), "UFCS call in constant position"))?;
                let func = find_in_modules(&self.krate.root, simple.components.last().unwrap(), |m, n| m.functions.get(n))
                    .ok_or_else(|| LowerError::bug(node_span(), "call to unknown function in constant position"))?;
                if !func.is_const {
                    return Err(LowerError::bug(node_span(), "call to non-const fn in constant position"));
                }
                let arg_values: Vec<ConstValue> = args.iter().map(|a| self.eval_expr(a, locals, stack)).collect::<LowerResult<_>>()?;
                let _guard = stack.enter(simple.clone()).map_err(|()| LowerError::recursion(node_span(), "const fn recursion"))?;
                let mut callee_locals = FxHashMap::default();
                for (param, value) in func.args.iter().zip(arg_values) {
                    if let Some(PatternBinding { slot, .. }) = &param.pattern.binding {
                        callee_locals.insert(*slot, value);
                    }
                }
                let body = func.body.as_ref().ok_or_else(|| LowerError::bug(node_span(), "const fn with no body"))?;
                self.eval_expr(body, &callee_locals, stack)?
            }
            _ => return Err(LowerError::bug(node_span(), "expression kind not valid in a constant context")),
        };
        Ok(mask_literal_width(&self.target, value, &node.ty))
    }

    fn eval_stmt(&mut self, stmt: &ExprNode, scope: &mut FxHashMap<u32, ConstValue>, stack: &mut RecursionStack<SimplePath>) -> LowerResult<()> {
        match &stmt.kind {
            ExprKind::Let { pattern, value, .. } => {
                let v = self.eval_expr(value, scope, stack)?;
                if let Some(PatternBinding { slot, .. }) = &pattern.binding {
                    scope.insert(*slot, v);
                }
            }
            ExprKind::Assign { lhs, rhs, .. } => {
                if let ExprKind::Variable { slot, .. } = &lhs.kind {
                    let v = self.eval_expr(rhs, scope, stack)?;
                    scope.insert(*slot, v);
                } else {
                    return Err(LowerError::bug(node_span(), "assignment to non-local in constant position"));
                }
            }
            _ => {
                self.eval_expr(stmt, scope, stack)?;
            }
        }
        Ok(())
    }

    fn order_struct_fields(&mut self, path: &Path, fields: &[(Name, ExprNode)], locals: &FxHashMap<u32, ConstValue>, stack: &mut RecursionStack<SimplePath>) -> LowerResult<Vec<ConstValue>> {
        use hir_def::item::StructFields;
        let simple = simple_path_of(path);
        let struct_def = simple.as_ref().and_then(|p| p.components.last()).and_then(|n| find_in_modules(&self.krate.root, n, |m, n| m.structs.get(n)));
        match struct_def.map(|s| &s.fields) {
            Some(StructFields::Named(names)) => {
                let mut out = Vec::with_capacity(names.len());
                for (name, _) in names.iter() {
                    let (_, expr) = fields.iter().find(|(n, _)| n == name).ok_or_else(|| LowerError::bug(node_span(), "missing struct field in constant literal"))?;
                    out.push(self.eval_expr(expr, locals, stack)?);
                }
                Ok(out)
            }
            _ => fields.iter().map(|(_, e)| self.eval_expr(e, locals, stack)).collect(),
        }
    }

    fn field_index(&self, ty: &TypeRef, name: &Name) -> Option<usize> {
        use hir_def::item::StructFields;
        if let TypeRef::Path(p) = ty {
            if let Path::Generic(gp) = &**p {
                if let Some(s) = find_in_modules(&self.krate.root, gp.path.components.last()?, |m, n| m.structs.get(n)) {
                    return match &s.fields {
                        StructFields::Named(map) => map.get_index_of(name),
                        StructFields::Tuple(_) => name.as_str().parse().ok(),
                        StructFields::Unit => None,
                    };
                }
            }
        }
        None
    }

    fn variant_index(&self, path: &Path) -> Option<u32> {
        let simple = simple_path_of(path)?;
        let variant_name = simple.components.last()?;
        find_variant_index(&self.krate.root, variant_name)
    }
}

fn find_variant_index(module: &Module, variant_name: &Name) -> Option<u32> {
    for (_, e) in module.enums.iter() {
        if let Some(i) = e.variants.iter().position(|v| &v.name == variant_name) {
            return Some(i as u32);
        }
    }
    for sub in module.submodules.values() {
        if let Some(i) = find_variant_index(sub, variant_name) {
            return Some(i);
        }
    }
    None
}

fn find_in_modules<'b, T>(module: &'b Module, name: &Name, get: impl Fn(&'b Module, &Name) -> Option<&'b T> + Copy) -> Option<&'b T> {
    if let Some(found) = get(module, name) {
        return Some(found);
    }
    for sub in module.submodules.values() {
        if let Some(found) = find_in_modules(sub, name, get) {
            return Some(found);
        }
    }
    None
}

fn simple_path_of(path: &Path) -> Option<SimplePath> {
    match path {
        Path::Generic(gp) => Some(gp.path.clone()),
        _ => None,
    }
}

fn node_span() -> Span {
    Span::DUMMY
}

fn literal_to_const(lit: &Literal) -> ConstValue {
    match lit {
        Literal::Bool(b) => ConstValue::Bool(*b),
        Literal::Integer(i) => ConstValue::Integer(*i),
        Literal::Float(f) => ConstValue::Float(*f),
        Literal::Char(c) => ConstValue::Integer(*c as u64),
        Literal::String(s) => ConstValue::Str(s.clone()),
        Literal::ByteString(b) => ConstValue::Bytes(b.clone()),
    }
}

fn is_truthy(v: &ConstValue) -> bool {
    match v {
        ConstValue::Bool(b) => *b,
        ConstValue::Integer(i) => *i != 0,
        _ => false,
    }
}

fn mask_to(target: &TargetSpec, value: ConstValue, ty: &TypeRef) -> ConstValue {
    mask_literal_width(target, value, ty)
}

fn mask_literal_width(target: &TargetSpec, value: ConstValue, ty: &TypeRef) -> ConstValue {
    if let (ConstValue::Integer(i), TypeRef::Primitive(p)) = (&value, ty) {
        let bits = p.fixed_bits().unwrap_or(target.pointer_bits);
        if *p == Primitive::F32 || *p == Primitive::F64 {
            return value;
        }
        if bits >= 64 {
            return ConstValue::Integer(*i);
        }
        let mask = (1u64 << bits) - 1;
        let masked = i & mask;
        if p.is_signed() && (masked >> (bits - 1)) & 1 == 1 {
            // sign-extend back into a u64 two's-complement representation
            let sign_extended = masked | !mask;
            return ConstValue::Integer(sign_extended);
        }
        return ConstValue::Integer(masked);
    }
    value
}

fn eval_binop(op: BinOp, l: &ConstValue, r: &ConstValue) -> LowerResult<ConstValue> {
    use BinOp::*;
    if op.is_comparison() {
        let ord = match (l, r) {
            (ConstValue::Integer(a), ConstValue::Integer(b)) => a.cmp(b),
            (ConstValue::Float(a), ConstValue::Float(b)) => a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal),
            (ConstValue::Bool(a), ConstValue::Bool(b)) => a.cmp(b),
            _ => return Err(LowerError::bug(Span::DUMMY, "comparison of mismatched constant kinds")),
        };
        return Ok(ConstValue::Bool(match op {
            Eq => ord.is_eq(),
            Ne => !ord.is_eq(),
            Lt => ord.is_lt(),
            Le => ord.is_le(),
            Gt => ord.is_gt(),
            Ge => ord.is_ge(),
            _ => unreachable!(),
        }));
    }
    match (l, r) {
        (ConstValue::Integer(a), ConstValue::Integer(b)) => {
            let v = match op {
                Add => a.wrapping_add(*b),
                Sub => a.wrapping_sub(*b),
                Mul => a.wrapping_mul(*b),
                Div => a.checked_div(*b).ok_or_else(|| LowerError::bug(Span::DUMMY, "division by zero in constant"))?,
                Mod => a.checked_rem(*b).ok_or_else(|| LowerError::bug(Span::DUMMY, "modulo by zero in constant"))?,
                And => a & b,
                Or => a | b,
                Xor => a ^ b,
                Shl => a.wrapping_shl(*b as u32),
                Shr => a.wrapping_shr(*b as u32),
                BoolAnd | BoolOr => return Err(LowerError::bug(Span::DUMMY, "boolean op on integer constants")),
                _ => unreachable!(),
            };
            Ok(ConstValue::Integer(v))
        }
        (ConstValue::Float(a), ConstValue::Float(b)) => {
            let v = match op {
                Add => a + b,
                Sub => a - b,
                Mul => a * b,
                Div => a / b,
                _ => return Err(LowerError::bug(Span::DUMMY, "non-arithmetic op on float constants")),
            };
            Ok(ConstValue::Float(v))
        }
        (ConstValue::Bool(a), ConstValue::Bool(b)) => {
            let v = match op {
                BoolAnd | And => *a && *b,
                BoolOr | Or => *a || *b,
                Xor => a ^ b,
                _ => return Err(LowerError::bug(Span::DUMMY, "non-boolean op on bool constants")),
            };
            Ok(ConstValue::Bool(v))
        }
        _ => Err(LowerError::bug(Span::DUMMY, "binary op on mismatched constant kinds")),
    }
}

fn eval_uniop(op: UniOp, v: &ConstValue) -> LowerResult<ConstValue> {
    match (op, v) {
        (UniOp::Negate, ConstValue::Integer(i)) => Ok(ConstValue::Integer((*i as i64).wrapping_neg() as u64)),
        (UniOp::Negate, ConstValue::Float(f)) => Ok(ConstValue::Float(-f)),
        (UniOp::Invert, ConstValue::Integer(i)) => Ok(ConstValue::Integer(!i)),
        (UniOp::Invert, ConstValue::Bool(b)) => Ok(ConstValue::Bool(!b)),
        _ => Err(LowerError::bug(Span::DUMMY, "unary op on mismatched constant kind")),
    }
}

// ---------------------------------------------------------------------
// Pass E: static borrow promotion
// ---------------------------------------------------------------------

pub fn promote_static_borrows(krate: &mut Crate) {
    let _s = profile::span("hir_expand::promote_static_borrows");
    let mut supply = NameSupply::default();
    let mut pending = Vec::new();
    crate::body_walk::for_each_body(krate, |_krate, target, body| {
        let mut promoter = BorrowPromoter { supply: &mut supply, generics: target.generics.own.clone(), pending: &mut pending };
        promoter.visit(body);
    });
    for (name, static_) in pending {
        krate.root.statics.insert(name, static_);
    }
}

struct BorrowPromoter<'a> {
    supply: &'a mut NameSupply,
    generics: hir_def::generics::GenericParams,
    pending: &'a mut Vec<(Name, Static)>,
}

impl<'a> BorrowPromoter<'a> {
    /// Returns whether `node` is constant per spec §4.8's rule list, mutating
    /// any qualifying `Borrow` descendant into a `PathValue` pointing at a
    /// freshly lifted static along the way. Unlike the other passes this
    /// needs a per-node return value threaded back up to its parent (an
    /// aggregate is only constant if every child is), which `ExprVisitor`'s
    /// `()`-returning `visit_node` can't carry — so, like `value_usage.rs`,
    /// this is a hand-rolled recursive walk instead of an `ExprVisitor` impl.
    fn visit(&mut self, node: &mut ExprNode) -> bool {
        let is_constant = match &mut node.kind {
            ExprKind::Literal(_) | ExprKind::UnitVariant { .. } => true,
            ExprKind::PathValue { kind, .. } => {
                matches!(kind, PathValueKind::Function | PathValueKind::Const | PathValueKind::Static | PathValueKind::UnitStruct | PathValueKind::UnitEnumVariant)
            }
            ExprKind::Tuple { vals } | ExprKind::ArrayList { vals } => vals.iter_mut().map(|v| self.visit(v)).collect::<Vec<_>>().into_iter().all(|b| b),
            ExprKind::ArraySized { value, .. } => self.visit(value),
            ExprKind::TupleVariant { args, .. } => args.iter_mut().map(|a| self.visit(a)).collect::<Vec<_>>().into_iter().all(|b| b),
            ExprKind::StructLiteral { fields, base, .. } => {
                let all = fields.iter_mut().map(|(_, v)| self.visit(v)).collect::<Vec<_>>().into_iter().all(|b| b);
                let base_ok = base.as_mut().map_or(true, |b| self.visit(b));
                all && base_ok
            }
            ExprKind::Cast { value, .. } | ExprKind::Unsize { value, .. } => self.visit(value),
            ExprKind::Block { stmts, result } => {
                for s in stmts.iter_mut() {
                    self.visit_stmt(s);
                }
                self.visit(result)
            }
            ExprKind::Field { value, .. } => self.visit(value),
            ExprKind::Index { value, index } => {
                let v = self.visit(value);
                let i = self.visit(index);
                v && i
            }
            ExprKind::CallPath { args, .. } => {
                // Conservative: this pass doesn't re-check `is_const`/purity
                // here (pass A already evaluated every genuine const fn
                // call it could reach); treat any remaining call as
                // non-constant so a qualifying `Borrow` argument still gets
                // visited (and possibly promoted) without the call itself
                // being folded.
                for a in args.iter_mut() {
                    self.visit(a);
                }
                false
            }
            ExprKind::Borrow { ty, value } => {
                let inner_const = self.visit(value);
                let zst = matches!(&value.ty, TypeRef::Tuple(t) if t.is_empty());
                if inner_const && (matches!(ty, BorrowType::Shared) || zst) {
                    self.promote(node);
                    true
                } else {
                    false
                }
            }
            _ => {
                walk_children_mut(node, |child| {
                    self.visit(child);
                });
                false
            }
        };
        is_constant
    }

    fn visit_stmt(&mut self, stmt: &mut ExprNode) {
        match &mut stmt.kind {
            ExprKind::Let { value, .. } => {
                self.visit(value);
            }
            _ => {
                self.visit(stmt);
            }
        }
    }

    fn promote(&mut self, node: &mut ExprNode) {
        let ExprKind::Borrow { value, .. } = &mut node.kind else { return };
        let inner = std::mem::replace(value.as_mut(), ExprNode::tombstone());
        let name = self.supply.fresh("lifted");
        self.pending.push((
            name.clone(),
            Static { ty: inner.ty.clone(), init: Some(Box::new(inner)), evaluated: ConstValue::Invalid, is_mut: false },
        ));
        let _ = &self.generics; // in-scope generics are implicitly carried: the lifted static's `init` keeps referencing them unchanged.
        node.kind = ExprKind::PathValue {
            path: Path::Generic(GenericPath::new(SimplePath { crate_name: Name::new("self"), components: vec![name] })),
            kind: PathValueKind::Static,
        };
    }
}

/// Visits every direct `ExprNode` child of `node` without attempting to
/// compute or return constant-ness — used only to keep recursing (and
/// therefore still promoting nested `Borrow`s) through node kinds the
/// constant-classification rules above don't otherwise assign meaning to.
fn walk_children_mut(node: &mut ExprNode, mut f: impl FnMut(&mut ExprNode)) {
    use hir_def::expr_visitor::{walk_expr, ExprVisitor};
    struct W<'a, F: FnMut(&mut ExprNode)>(&'a mut F);
    impl<'a, F: FnMut(&mut ExprNode)> ExprVisitor for W<'a, F> {
        fn visit_node(&mut self, node: &mut ExprNode) {
            (self.0)(node);
            walk_expr(self, node);
        }
    }
    let mut w = W(&mut f);
    walk_expr(&mut w, node);
}

#[cfg(test)]
mod tests {
    use super::*;
    use hir_def::name::Name;
    use test_utils::{empty_crate, int_literal};

    #[test]
    fn literal_const_evaluates_to_integer() {
        let mut krate = empty_crate();
        krate.root.consts.insert(
            Name::new("N"),
            Const { generics: Default::default(), ty: TypeRef::Primitive(Primitive::I32), init: Some(Box::new(int_literal(41))), evaluated: ConstValue::Invalid },
        );
        evaluate_constants_full(&mut krate);
        assert_eq!(krate.root.consts[&Name::new("N")].evaluated, ConstValue::Integer(41));
    }

    #[test]
    fn binop_add_evaluates() {
        let mut krate = empty_crate();
        let lhs = int_literal(1);
        let rhs = int_literal(2);
        let body = ExprNode::new(TypeRef::Primitive(Primitive::I32), ExprKind::BinOp { op: BinOp::Add, lhs: Box::new(lhs), rhs: Box::new(rhs) });
        krate.root.consts.insert(Name::new("SUM"), Const { generics: Default::default(), ty: TypeRef::Primitive(Primitive::I32), init: Some(Box::new(body)), evaluated: ConstValue::Invalid });
        evaluate_constants_full(&mut krate);
        assert_eq!(krate.root.consts[&Name::new("SUM")].evaluated, ConstValue::Integer(3));
    }

    #[test]
    fn enum_discriminants_auto_increment() {
        use hir_def::item::{Enum, EnumVariant, StructFields};
        let mut krate = empty_crate();
        krate.root.enums.insert(
            Name::new("E"),
            Enum {
                generics: Default::default(),
                variants: vec![
                    EnumVariant { name: Name::new("A"), fields: StructFields::Unit, discriminant: None },
                    EnumVariant { name: Name::new("B"), fields: StructFields::Unit, discriminant: None },
                ],
                markings: Default::default(),
                repr: None,
            },
        );
        evaluate_constants_full(&mut krate);
        let e = &krate.root.enums[&Name::new("E")];
        assert_eq!(e.variants[0].discriminant, Some(ConstValue::Integer(0)));
        assert_eq!(e.variants[1].discriminant, Some(ConstValue::Integer(1)));
    }

    #[test]
    fn shared_borrow_of_constant_array_promotes_to_static() {
        let mut krate = empty_crate();
        let elems = vec![int_literal(1), int_literal(2), int_literal(3)];
        let array_ty = TypeRef::Array { inner: Box::new(TypeRef::Primitive(Primitive::U8)), size: hir_def::ty::ConstGeneric::Known(3) };
        let array = ExprNode::new(array_ty.clone(), ExprKind::ArrayList { vals: elems });
        let borrow_ty = TypeRef::Borrow { mutability: Mutability::Shared, lifetime: hir_def::ty::LifetimeRef::Infer, inner: Box::new(array_ty) };
        let body = ExprNode::new(borrow_ty.clone(), ExprKind::Borrow { ty: BorrowType::Shared, value: Box::new(array) });
        test_utils::declare_fn(&mut krate.root, "f", Vec::new(), borrow_ty, body);
        promote_static_borrows(&mut krate);
        assert_eq!(krate.root.statics.len(), 1);
        let f_body = krate.root.functions[&Name::new("f")].body.as_ref().unwrap();
        assert!(matches!(f_body.kind, ExprKind::PathValue { kind: PathValueKind::Static, .. }));
    }
}
