//! Pure-Rust host implementation of the `xew_*` C ABI.
//!
//! Contexts are boxed [`HostContext`] values cast through the zero-sized
//! `xew_context_t` marker. Primitives run on host memory and follow the
//! vendor's documented semantics closely enough to serve as a stand-in.
//!
//! # Safety
//!
//! All functions follow C ABI conventions: pointers must be valid for the
//! element counts implied by the shape vectors. Contexts must be destroyed
//! exactly once via `xew_context_destroy`.

#![allow(clippy::missing_safety_doc)]

use std::sync::atomic::{AtomicU64, Ordering};

use half::f16;
use libc::{c_int, size_t};

use crate::{
    XEW_ERR_INVALID_PARAM, XEW_ERR_ZERO_DIVISION, XEW_SUCCESS, xew_context_t,
    xew_device_generation_t,
};

struct HostContext {
    generation: xew_device_generation_t,
    launches: AtomicU64,
}

unsafe fn ref_context<'a>(p: *mut xew_context_t) -> &'a HostContext {
    unsafe { &*(p as *const HostContext) }
}

// ── Context ─────────────────────────────────────────────────────────────

#[unsafe(no_mangle)]
pub unsafe extern "C" fn xew_context_create(
    generation: xew_device_generation_t,
) -> *mut xew_context_t {
    let ctx = HostContext {
        generation,
        launches: AtomicU64::new(0),
    };
    Box::into_raw(Box::new(ctx)) as *mut xew_context_t
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn xew_context_destroy(ctx: *mut xew_context_t) {
    if !ctx.is_null() {
        drop(unsafe { Box::from_raw(ctx as *mut HostContext) });
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn xew_context_generation(
    ctx: *mut xew_context_t,
) -> xew_device_generation_t {
    unsafe { ref_context(ctx) }.generation
}

/// Number of primitive launches that completed successfully on `ctx`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn xew_context_launch_count(ctx: *mut xew_context_t) -> u64 {
    unsafe { ref_context(ctx) }.launches.load(Ordering::Relaxed)
}

// ── Scalar semantics ────────────────────────────────────────────────────

/// Per-element op semantics. `None` reports a domain error.
trait HostScalar: Copy {
    fn add(a: Self, b: Self) -> Option<Self>;
    fn sub(a: Self, b: Self) -> Option<Self>;
    fn mul(a: Self, b: Self) -> Option<Self>;
    fn div(a: Self, b: Self) -> Option<Self>;
    fn max(a: Self, b: Self) -> Option<Self>;
    fn min(a: Self, b: Self) -> Option<Self>;
    /// Remainder with the sign of the divisor.
    fn rem(a: Self, b: Self) -> Option<Self>;
    fn floordiv(a: Self, b: Self) -> Option<Self>;
    fn pow(a: Self, b: Self) -> Option<Self>;
}

impl HostScalar for f32 {
    fn add(a: f32, b: f32) -> Option<f32> {
        Some(a + b)
    }
    fn sub(a: f32, b: f32) -> Option<f32> {
        Some(a - b)
    }
    fn mul(a: f32, b: f32) -> Option<f32> {
        Some(a * b)
    }
    fn div(a: f32, b: f32) -> Option<f32> {
        Some(a / b)
    }
    fn max(a: f32, b: f32) -> Option<f32> {
        Some(a.max(b))
    }
    fn min(a: f32, b: f32) -> Option<f32> {
        Some(a.min(b))
    }
    fn rem(a: f32, b: f32) -> Option<f32> {
        let r = a % b;
        if r != 0.0 && (r < 0.0) != (b < 0.0) {
            Some(r + b)
        } else {
            Some(r)
        }
    }
    fn floordiv(a: f32, b: f32) -> Option<f32> {
        Some((a / b).floor())
    }
    fn pow(a: f32, b: f32) -> Option<f32> {
        Some(a.powf(b))
    }
}

macro_rules! half_via_f32 {
    ($($op:ident),*) => {
        impl HostScalar for f16 {
            $(
                fn $op(a: f16, b: f16) -> Option<f16> {
                    <f32 as HostScalar>::$op(a.to_f32(), b.to_f32()).map(f16::from_f32)
                }
            )*
        }
    };
}

half_via_f32!(add, sub, mul, div, max, min, rem, floordiv, pow);

macro_rules! impl_integer {
    ($($ty:ty),*) => {
        $(
            impl HostScalar for $ty {
                fn add(a: $ty, b: $ty) -> Option<$ty> {
                    Some(a.wrapping_add(b))
                }
                fn sub(a: $ty, b: $ty) -> Option<$ty> {
                    Some(a.wrapping_sub(b))
                }
                fn mul(a: $ty, b: $ty) -> Option<$ty> {
                    Some(a.wrapping_mul(b))
                }
                fn div(a: $ty, b: $ty) -> Option<$ty> {
                    (b != 0).then(|| a.wrapping_div(b))
                }
                fn max(a: $ty, b: $ty) -> Option<$ty> {
                    Some(Ord::max(a, b))
                }
                fn min(a: $ty, b: $ty) -> Option<$ty> {
                    Some(Ord::min(a, b))
                }
                fn rem(a: $ty, b: $ty) -> Option<$ty> {
                    if b == 0 {
                        return None;
                    }
                    let r = a.wrapping_rem(b);
                    if r != 0 && (r < 0) != (b < 0) {
                        Some(r + b)
                    } else {
                        Some(r)
                    }
                }
                fn floordiv(a: $ty, b: $ty) -> Option<$ty> {
                    if b == 0 {
                        return None;
                    }
                    let q = a.wrapping_div(b);
                    if a.wrapping_rem(b) != 0 && (a < 0) != (b < 0) {
                        Some(q - 1)
                    } else {
                        Some(q)
                    }
                }
                /// Exact wrapping power. Negative exponents truncate toward
                /// zero; `0` raised to one is a zero division.
                fn pow(a: $ty, b: $ty) -> Option<$ty> {
                    if b < 0 {
                        return match a {
                            0 => None,
                            1 => Some(1),
                            -1 => Some(if b % 2 == 0 { 1 } else { -1 }),
                            _ => Some(0),
                        };
                    }
                    let (mut base, mut exp, mut acc) = (a, b as u64, 1 as $ty);
                    while exp > 0 {
                        if exp & 1 == 1 {
                            acc = acc.wrapping_mul(base);
                        }
                        base = base.wrapping_mul(base);
                        exp >>= 1;
                    }
                    Some(acc)
                }
            }
        )*
    };
}

impl_integer!(i32, i64);

// ── Broadcast plan ──────────────────────────────────────────────────────

/// Index mapping from output positions to input positions.
///
/// Size-1 input dims get stride 0 so every output index along that axis
/// reads the same element.
struct BroadcastPlan {
    out_dims: Vec<usize>,
    x_strides: Vec<usize>,
    y_strides: Vec<usize>,
    x_len: usize,
    y_len: usize,
    out_len: usize,
}

impl BroadcastPlan {
    fn new(xs: &[c_int], ys: &[c_int]) -> Option<Self> {
        if xs.len() != ys.len() {
            return None;
        }
        let rank = xs.len();
        let mut out_dims = Vec::with_capacity(rank);
        for (&dx, &dy) in xs.iter().zip(ys) {
            if dx < 0 || dy < 0 || (dx != dy && dx != 1 && dy != 1) {
                return None;
            }
            let d = if dx == 1 { dy } else { dx };
            out_dims.push(d as usize);
        }
        let (x_strides, x_len) = strides(xs)?;
        let (y_strides, y_len) = strides(ys)?;
        let out_len = out_dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))?;
        Some(Self {
            out_dims,
            x_strides,
            y_strides,
            x_len,
            y_len,
            out_len,
        })
    }

    fn source_index(&self, mut linear: usize) -> (usize, usize) {
        let (mut ix, mut iy) = (0, 0);
        for d in (0..self.out_dims.len()).rev() {
            let n = self.out_dims[d];
            let coord = linear % n;
            linear /= n;
            ix += coord * self.x_strides[d];
            iy += coord * self.y_strides[d];
        }
        (ix, iy)
    }
}

/// Row-major strides with 0 for size-1 dims, plus the element count.
/// `None` if the element count overflows `usize`.
fn strides(dims: &[c_int]) -> Option<(Vec<usize>, usize)> {
    let mut out = vec![0; dims.len()];
    let mut acc = 1usize;
    for (i, &d) in dims.iter().enumerate().rev() {
        let d = d as usize;
        out[i] = if d == 1 { 0 } else { acc };
        acc = acc.checked_mul(d)?;
    }
    Some((out, acc))
}

#[allow(clippy::too_many_arguments)]
unsafe fn launch<T: HostScalar>(
    ctx: *mut xew_context_t,
    x: *const T,
    y: *const T,
    z: *mut T,
    x_shape: *const c_int,
    x_shape_len: size_t,
    y_shape: *const c_int,
    y_shape_len: size_t,
    op: fn(T, T) -> Option<T>,
) -> c_int {
    if ctx.is_null() || x.is_null() || y.is_null() || z.is_null() {
        return XEW_ERR_INVALID_PARAM;
    }
    if x_shape.is_null() || y_shape.is_null() {
        return XEW_ERR_INVALID_PARAM;
    }
    let xs = unsafe { std::slice::from_raw_parts(x_shape, x_shape_len) };
    let ys = unsafe { std::slice::from_raw_parts(y_shape, y_shape_len) };
    let Some(plan) = BroadcastPlan::new(xs, ys) else {
        return XEW_ERR_INVALID_PARAM;
    };

    let x = unsafe { std::slice::from_raw_parts(x, plan.x_len) };
    let y = unsafe { std::slice::from_raw_parts(y, plan.y_len) };
    let z = unsafe { std::slice::from_raw_parts_mut(z, plan.out_len) };

    for (i, out) in z.iter_mut().enumerate() {
        let (ix, iy) = plan.source_index(i);
        match op(x[ix], y[iy]) {
            Some(v) => *out = v,
            None => return XEW_ERR_ZERO_DIVISION,
        }
    }

    unsafe { ref_context(ctx) }
        .launches
        .fetch_add(1, Ordering::Relaxed);
    XEW_SUCCESS
}

// ── Primitives ──────────────────────────────────────────────────────────

macro_rules! define_native_primitives {
    ($($symbol:ident: $ty:ty => $op:ident),* $(,)?) => {
        $(
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn $symbol(
                ctx: *mut xew_context_t,
                x: *const $ty,
                y: *const $ty,
                z: *mut $ty,
                x_shape: *const c_int,
                x_shape_len: size_t,
                y_shape: *const c_int,
                y_shape_len: size_t,
            ) -> c_int {
                unsafe {
                    launch(
                        ctx,
                        x,
                        y,
                        z,
                        x_shape,
                        x_shape_len,
                        y_shape,
                        y_shape_len,
                        <$ty as HostScalar>::$op,
                    )
                }
            }
        )*
    };
}

for_each_primitive!(define_native_primitives);
