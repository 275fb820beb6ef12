//! The C-like function language referenced by `comb` leaves (§3, §4.1).
//! A [`Function`] is a signature plus an opaque C body; the compiler
//! never parses the body, only the prototype's parameter/return shape.

use crate::DataType;
use f2cc_utils::Id;
use std::collections::HashMap;

/// One formal parameter. `is_output` marks the single trailing
/// out-parameter of a void-returning function (§3 invariant 5).
#[derive(Clone, Debug)]
pub struct Param {
    pub name: Id,
    pub ty: DataType,
    pub is_output: bool,
}

impl Param {
    pub fn input(name: impl Into<Id>, ty: DataType) -> Self {
        Param {
            name: name.into(),
            ty,
            is_output: false,
        }
    }

    pub fn output(name: impl Into<Id>, ty: DataType) -> Self {
        Param {
            name: name.into(),
            ty,
            is_output: true,
        }
    }
}

/// A registered C function: `(T1,...,Tk) -> T` or
/// `(T1,...,Tk, out Tout) -> void`. Bodies are deduplicated by name in
/// the registry (§4.1) and, later, by body text in the synthesizer
/// (§4.4 Step 3).
#[derive(Clone, Debug)]
pub struct Function {
    pub name: Id,
    pub params: Vec<Param>,
    /// `None` means the function returns `void` and instead writes its
    /// result through the trailing out-parameter.
    pub ret: Option<DataType>,
    /// Opaque C source for the function body (without the signature).
    pub body: String,
}

impl Function {
    pub fn new(
        name: impl Into<Id>,
        params: Vec<Param>,
        ret: Option<DataType>,
        body: impl Into<String>,
    ) -> Self {
        let f = Function {
            name: name.into(),
            params,
            ret,
            body: body.into(),
        };
        debug_assert!(f.validate_shape().is_ok());
        f
    }

    /// Enforce §3 invariant 5: at most one admitted shape, and an
    /// array/pointer input parameter must be `const`.
    pub fn validate_shape(&self) -> Result<(), String> {
        let out_params: Vec<_> =
            self.params.iter().filter(|p| p.is_output).collect();
        match (self.ret.is_some(), out_params.len()) {
            (true, 0) => {}
            (false, 1) => {
                if !matches!(
                    self.params.last(),
                    Some(p) if p.is_output
                ) {
                    return Err(format!(
                        "function `{}`: out-parameter must be last",
                        self.name
                    ));
                }
            }
            _ => {
                return Err(format!(
                    "function `{}` has an inadmissible signature shape",
                    self.name
                ));
            }
        }
        for p in self.params.iter().filter(|p| !p.is_output) {
            if (p.ty.is_array || p.ty.is_pointer) && !p.ty.is_const {
                return Err(format!(
                    "function `{}`: input parameter `{}` is array/pointer \
                     but not const",
                    self.name, p.name
                ));
            }
        }
        Ok(())
    }

    /// Number of "real" (non-output) arguments, i.e. the `k` in
    /// `(T1,...,Tk) -> T`.
    pub fn arity(&self) -> usize {
        self.params.iter().filter(|p| !p.is_output).count()
    }

    /// The type a caller observes as "the result": either the return
    /// type, or the last out-parameter's pointee type.
    pub fn result_type(&self) -> &DataType {
        if let Some(ret) = &self.ret {
            ret
        } else {
            &self
                .params
                .iter()
                .rev()
                .find(|p| p.is_output)
                .expect("validated function has an out-parameter")
                .ty
        }
    }

    pub fn is_void_returning(&self) -> bool {
        self.ret.is_none()
    }
}

/// Process-network-global table of defined functions, keyed and
/// deduplicated by name (§4.1: "a second reference to the same name
/// does not create a new record").
#[derive(Clone, Debug, Default)]
pub struct FunctionRegistry {
    functions: HashMap<Id, Function>,
    /// Preserves first-definition order for stable emission.
    order: Vec<Id>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an existing function by name, or insert `make()`'s result
    /// if this is the first reference.
    pub fn get_or_insert_with(
        &mut self,
        name: Id,
        make: impl FnOnce() -> Function,
    ) -> &Function {
        if !self.functions.contains_key(&name) {
            self.functions.insert(name, make());
            self.order.push(name);
        }
        &self.functions[&name]
    }

    pub fn get(&self, name: Id) -> Option<&Function> {
        self.functions.get(&name)
    }

    pub fn get_mut(&mut self, name: Id) -> Option<&mut Function> {
        self.functions.get_mut(&name)
    }

    pub fn contains(&self, name: Id) -> bool {
        self.functions.contains_key(&name)
    }

    /// Insert or overwrite unconditionally (used by the synthesizer when
    /// it renames and deduplicates functions).
    pub fn insert(&mut self, f: Function) {
        if !self.functions.contains_key(&f.name) {
            self.order.push(f.name);
        }
        self.functions.insert(f.name, f);
    }

    pub fn remove(&mut self, name: Id) -> Option<Function> {
        self.order.retain(|n| *n != name);
        self.functions.remove(&name)
    }

    /// Iterate functions in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &Function> {
        self.order.iter().map(move |n| &self.functions[n])
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
