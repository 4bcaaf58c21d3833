//! Argument coercion between compatible typespecs: numeric↔numeric
//! and string↔symbol, routed through an `f64` wide intermediate.

use crate::argument::{Argument, TypeTag};

/// `true` if an argument of type `from` can stand in for one declared as
/// `to`: identical types always coerce, and the numeric set `{i, f, h, d}`
/// and the string set `{s, S}` each coerce freely within themselves.
pub fn can_coerce(to: TypeTag, from: TypeTag) -> bool {
    to == from || (to.is_numeric() && from.is_numeric()) || (to.is_stringy() && from.is_stringy())
}

/// `true` if every type in `to` can receive the corresponding type in `from`
/// (same length, pairwise [`can_coerce`]).
pub fn can_coerce_spec(to: &[TypeTag], from: &[TypeTag]) -> bool {
    to.len() == from.len()
        && to.iter()
            .zip(from.iter())
            .all(|(&t, &f)| can_coerce(t, f))
}

/// Coerces one argument to `to`, assuming `can_coerce(to, arg.type_tag())`
/// already holds. Numeric conversions go through `f64`, matching the wide
/// intermediate the dispatch engine uses before doing a target-typed cast.
pub fn coerce(to: TypeTag, arg: &Argument) -> Option<Argument> {
    if to == arg.type_tag() {
        return Some(arg.clone());
    }
    match (to, arg) {
        (TypeTag::String, Argument::Symbol(s)) => Some(Argument::String(s.clone())),
        (TypeTag::Symbol, Argument::String(s)) => Some(Argument::Symbol(s.clone())),
        (t, a) if t.is_numeric() && a.type_tag().is_numeric() => {
            let wide = numeric_to_f64(a)?;
            Some(f64_to_numeric(t, wide))
        }
        _ => None,
    }
}

/// Coerces a whole argument list against `to`, assuming
/// `can_coerce_spec(to, from_types)` already holds.
pub fn coerce_all(to: &[TypeTag], args: &[Argument]) -> Option<Vec<Argument>> {
    if to.len() != args.len() {
        return None;
    }
    to.iter()
        .zip(args.iter())
        .map(|(&t, a)| coerce(t, a))
        .collect()
}

fn numeric_to_f64(arg: &Argument) -> Option<f64> {
    match arg {
        Argument::Int32(v) => Some(*v as f64),
        Argument::Float32(v) => Some(*v as f64),
        Argument::Int64(v) => Some(*v as f64),
        Argument::Float64(v) => Some(*v),
        _ => None,
    }
}

fn f64_to_numeric(to: TypeTag, wide: f64) -> Argument {
    match to {
        TypeTag::Int32 => Argument::Int32(wide as i32),
        TypeTag::Float32 => Argument::Float32(wide as f32),
        TypeTag::Int64 => Argument::Int64(wide as i64),
        TypeTag::Float64 => Argument::Float64(wide),
        _ => unreachable!("f64_to_numeric called with non-numeric target"),
    }
}
