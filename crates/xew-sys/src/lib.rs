//! C ABI of the XPU broadcast elementwise primitives.
//!
//! With the default `native` feature, every `xew_*` function is implemented
//! in pure Rust on host memory. With the `vendor` feature, they link against
//! the accelerator vendor's library (see `build.rs`).
//!
//! Every primitive takes the device context, two input buffers, one output
//! buffer, and the two operands' shapes already aligned to the output rank.
//! It returns [`XEW_SUCCESS`] or a non-zero failure code.

#![allow(non_camel_case_types)]

#[cfg(not(any(feature = "native", feature = "vendor")))]
compile_error!("xew-sys needs either the `native` or the `vendor` feature");

use libc::{c_int, size_t};

pub use half::f16;

// ── Status codes ────────────────────────────────────────────────────────

pub const XEW_SUCCESS: c_int = 0;
/// Null pointer, mismatched shape lengths, incompatible shapes, or an
/// element count that overflows.
pub const XEW_ERR_INVALID_PARAM: c_int = -1;
/// Integer division or modulo by zero.
pub const XEW_ERR_ZERO_DIVISION: c_int = -2;

// ── Opaque handle types ─────────────────────────────────────────────────

/// Opaque handle to a device execution context.
#[repr(C)]
pub struct xew_context_t {
    _private: [u8; 0],
}

/// Accelerator generation the context was created for.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum xew_device_generation_t {
    XPU1 = 1,
    XPU2 = 2,
}

/// Signature shared by every broadcast primitive.
pub type xew_broadcast_fn<T> = unsafe extern "C" fn(
    ctx: *mut xew_context_t,
    x: *const T,
    y: *const T,
    z: *mut T,
    x_shape: *const c_int,
    x_shape_len: size_t,
    y_shape: *const c_int,
    y_shape_len: size_t,
) -> c_int;

/// Invokes `$m!` with the full list of primitives the device provides,
/// one `symbol: element type => host op` entry per (op, type) pair.
macro_rules! for_each_primitive {
    ($m:ident) => {
        $m! {
            xew_broadcast_add_f32: f32 => add,
            xew_broadcast_add_f16: f16 => add,
            xew_broadcast_add_i32: i32 => add,
            xew_broadcast_add_i64: i64 => add,

            xew_broadcast_sub_f32: f32 => sub,
            xew_broadcast_sub_f16: f16 => sub,
            xew_broadcast_sub_i32: i32 => sub,
            xew_broadcast_sub_i64: i64 => sub,

            xew_broadcast_mul_f32: f32 => mul,
            xew_broadcast_mul_f16: f16 => mul,
            xew_broadcast_mul_i64: i64 => mul,

            xew_broadcast_div_f32: f32 => div,
            xew_broadcast_div_f16: f16 => div,

            xew_broadcast_max_f32: f32 => max,
            xew_broadcast_max_f16: f16 => max,
            xew_broadcast_max_i32: i32 => max,

            xew_broadcast_min_f32: f32 => min,
            xew_broadcast_min_f16: f16 => min,
            xew_broadcast_min_i32: i32 => min,

            xew_broadcast_mod_f32: f32 => rem,
            xew_broadcast_mod_f16: f16 => rem,
            xew_broadcast_mod_i32: i32 => rem,

            xew_broadcast_floordiv_f32: f32 => floordiv,
            xew_broadcast_floordiv_f16: f16 => floordiv,
            xew_broadcast_floordiv_i32: i32 => floordiv,

            xew_broadcast_pow_f32: f32 => pow,
            xew_broadcast_pow_f16: f16 => pow,
            xew_broadcast_pow_i32: i32 => pow,
            xew_broadcast_pow_i64: i64 => pow,
        }
    };
}

// ── Vendor library declarations (enabled with `vendor` feature) ─────────

#[cfg(feature = "vendor")]
macro_rules! declare_vendor_primitives {
    ($($symbol:ident: $ty:ty => $op:ident),* $(,)?) => {
        unsafe extern "C" {
            $(
                pub fn $symbol(
                    ctx: *mut xew_context_t,
                    x: *const $ty,
                    y: *const $ty,
                    z: *mut $ty,
                    x_shape: *const c_int,
                    x_shape_len: size_t,
                    y_shape: *const c_int,
                    y_shape_len: size_t,
                ) -> c_int;
            )*
        }
    };
}

#[cfg(feature = "vendor")]
for_each_primitive!(declare_vendor_primitives);

#[cfg(feature = "vendor")]
unsafe extern "C" {
    pub fn xew_context_create(generation: xew_device_generation_t) -> *mut xew_context_t;
    pub fn xew_context_destroy(ctx: *mut xew_context_t);
    pub fn xew_context_generation(ctx: *mut xew_context_t) -> xew_device_generation_t;
    pub fn xew_context_launch_count(ctx: *mut xew_context_t) -> u64;
}

// ── Pure-Rust host implementation (enabled with `native` feature) ───────

#[cfg(all(feature = "native", not(feature = "vendor")))]
mod native_impl;

#[cfg(all(feature = "native", not(feature = "vendor")))]
pub use native_impl::*;
