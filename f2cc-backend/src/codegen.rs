//! Small C-statement builders shared by `wrap` and `emit` (§4.4 Steps
//! 4, 5, 11): every call site has to pick between `x = f(args)` and
//! `f(args, &x)` depending on the callee's calling convention, so the
//! logic lives in one place instead of being repeated at each site.

use f2cc_ir::Function;

/// `f(args...)` as a value expression; only valid when `f` itself
/// returns by value.
pub fn call_expr(f: &Function, args: &[String]) -> String {
    format!("{}({})", f.name, args.join(", "))
}

/// A full statement calling `f` and depositing its result in `dest`
/// (an already-declared lvalue): `dest = f(args);` for a by-value
/// return, `f(args, &dest);` for an out-parameter return.
pub fn call_into(f: &Function, args: &[String], dest: &str) -> String {
    if f.is_void_returning() {
        if args.is_empty() {
            format!("{}(&{});", f.name, dest)
        } else {
            format!("{}({}, &{});", f.name, args.join(", "), dest)
        }
    } else {
        format!("{} = {};", dest, call_expr(f, args))
    }
}
