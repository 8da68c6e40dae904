//! Primitive lookup: which device routine computes (op, element type).
//!
//! Each element type lists the operators the device provides for it. Any
//! operator not listed has no primitive and cannot be dispatched.

use half::f16;
use xew_core::{Element, OperatorKind};
use xew_sys as sys;

/// ABI of a device broadcast primitive for element type `T`.
pub type Primitive<T> = sys::xew_broadcast_fn<T>;

/// Element type with device broadcast primitives.
pub trait XpuElement: Element {
    fn primitive(op: OperatorKind) -> Option<Primitive<Self>>;
}

macro_rules! primitive_table {
    ($ty:ty { $($op:ident => $symbol:ident),* $(,)? }) => {
        impl XpuElement for $ty {
            fn primitive(op: OperatorKind) -> Option<Primitive<Self>> {
                match op {
                    $(OperatorKind::$op => Some(sys::$symbol as Primitive<Self>),)*
                    #[allow(unreachable_patterns)]
                    _ => None,
                }
            }
        }
    };
}

primitive_table!(f32 {
    Add => xew_broadcast_add_f32,
    Sub => xew_broadcast_sub_f32,
    Mul => xew_broadcast_mul_f32,
    Div => xew_broadcast_div_f32,
    Max => xew_broadcast_max_f32,
    Min => xew_broadcast_min_f32,
    Mod => xew_broadcast_mod_f32,
    FloorDiv => xew_broadcast_floordiv_f32,
    Pow => xew_broadcast_pow_f32,
});

primitive_table!(f16 {
    Add => xew_broadcast_add_f16,
    Sub => xew_broadcast_sub_f16,
    Mul => xew_broadcast_mul_f16,
    Div => xew_broadcast_div_f16,
    Max => xew_broadcast_max_f16,
    Min => xew_broadcast_min_f16,
    Mod => xew_broadcast_mod_f16,
    FloorDiv => xew_broadcast_floordiv_f16,
    Pow => xew_broadcast_pow_f16,
});

primitive_table!(i32 {
    Add => xew_broadcast_add_i32,
    Sub => xew_broadcast_sub_i32,
    Max => xew_broadcast_max_i32,
    Min => xew_broadcast_min_i32,
    Mod => xew_broadcast_mod_i32,
    FloorDiv => xew_broadcast_floordiv_i32,
    Pow => xew_broadcast_pow_i32,
});

primitive_table!(i64 {
    Add => xew_broadcast_add_i64,
    Sub => xew_broadcast_sub_i64,
    Mul => xew_broadcast_mul_i64,
    Pow => xew_broadcast_pow_i64,
});

#[cfg(test)]
mod tests {
    use super::*;

    fn supported<T: XpuElement>() -> Vec<OperatorKind> {
        OperatorKind::ALL
            .into_iter()
            .filter(|&op| T::primitive(op).is_some())
            .collect()
    }

    #[test]
    fn test_float_types_cover_every_op() {
        assert_eq!(supported::<f32>(), OperatorKind::ALL.to_vec());
        assert_eq!(supported::<f16>(), OperatorKind::ALL.to_vec());
    }

    #[test]
    fn test_int32_has_no_mul_or_div() {
        let ops = supported::<i32>();
        assert_eq!(ops.len(), 7);
        assert!(!ops.contains(&OperatorKind::Mul));
        assert!(!ops.contains(&OperatorKind::Div));
    }

    #[test]
    fn test_int64_arithmetic_subset() {
        use OperatorKind::*;
        assert_eq!(supported::<i64>(), vec![Add, Sub, Mul, Pow]);
    }
}
