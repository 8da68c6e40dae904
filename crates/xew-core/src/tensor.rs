//! Borrowed tensor views handed to kernels for the duration of one launch.
//!
//! Kernels never own tensor memory. A launch borrows the two input buffers
//! and the output buffer, each paired with the shape the caller declared
//! for it. Typed views (`TensorRef`, `TensorMut`) are used by a dispatcher
//! that already knows its element type; type-erased views (`TensorArg`,
//! `TensorArgMut`) are what the kernel registry passes through.

use half::f16;

use crate::{DType, Shape};

/// Element type a kernel can be instantiated for.
pub trait Element: Copy + Send + Sync + std::fmt::Debug + 'static {
    const DTYPE: DType;

    fn view(data: TensorData<'_>) -> Option<&[Self]>;
    fn view_mut(data: TensorDataMut<'_>) -> Option<&mut [Self]>;
    fn wrap(data: &[Self]) -> TensorData<'_>;
    fn wrap_mut(data: &mut [Self]) -> TensorDataMut<'_>;
}

/// Read-only buffer of any supported element type.
#[derive(Clone, Copy, Debug)]
pub enum TensorData<'a> {
    F32(&'a [f32]),
    F16(&'a [f16]),
    I32(&'a [i32]),
    I64(&'a [i64]),
}

impl TensorData<'_> {
    pub fn dtype(&self) -> DType {
        match self {
            TensorData::F32(_) => DType::F32,
            TensorData::F16(_) => DType::F16,
            TensorData::I32(_) => DType::I32,
            TensorData::I64(_) => DType::I64,
        }
    }
}

/// Writable buffer of any supported element type.
#[derive(Debug)]
pub enum TensorDataMut<'a> {
    F32(&'a mut [f32]),
    F16(&'a mut [f16]),
    I32(&'a mut [i32]),
    I64(&'a mut [i64]),
}

impl TensorDataMut<'_> {
    pub fn dtype(&self) -> DType {
        match self {
            TensorDataMut::F32(_) => DType::F32,
            TensorDataMut::F16(_) => DType::F16,
            TensorDataMut::I32(_) => DType::I32,
            TensorDataMut::I64(_) => DType::I64,
        }
    }
}

macro_rules! impl_element {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const DTYPE: DType = DType::$variant;

                fn view(data: TensorData<'_>) -> Option<&[Self]> {
                    match data {
                        TensorData::$variant(d) => Some(d),
                        _ => None,
                    }
                }

                fn view_mut(data: TensorDataMut<'_>) -> Option<&mut [Self]> {
                    match data {
                        TensorDataMut::$variant(d) => Some(d),
                        _ => None,
                    }
                }

                fn wrap(data: &[Self]) -> TensorData<'_> {
                    TensorData::$variant(data)
                }

                fn wrap_mut(data: &mut [Self]) -> TensorDataMut<'_> {
                    TensorDataMut::$variant(data)
                }
            }
        )*
    };
}

impl_element!(f32 => F32, f16 => F16, i32 => I32, i64 => I64);

/// Typed read-only tensor view.
#[derive(Clone, Copy, Debug)]
pub struct TensorRef<'a, T> {
    pub data: &'a [T],
    pub shape: &'a Shape,
}

impl<'a, T: Element> TensorRef<'a, T> {
    pub fn new(data: &'a [T], shape: &'a Shape) -> Self {
        Self { data, shape }
    }
}

/// Typed writable tensor view.
#[derive(Debug)]
pub struct TensorMut<'a, T> {
    pub data: &'a mut [T],
    pub shape: &'a Shape,
}

impl<'a, T: Element> TensorMut<'a, T> {
    pub fn new(data: &'a mut [T], shape: &'a Shape) -> Self {
        Self { data, shape }
    }
}

/// Type-erased read-only tensor view.
#[derive(Clone, Copy, Debug)]
pub struct TensorArg<'a> {
    pub data: TensorData<'a>,
    pub shape: &'a Shape,
}

impl<'a> TensorArg<'a> {
    pub fn new<T: Element>(data: &'a [T], shape: &'a Shape) -> Self {
        Self {
            data: T::wrap(data),
            shape,
        }
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    /// Reinterpret as a typed view, or `None` if the element type differs.
    pub fn typed<T: Element>(self) -> Option<TensorRef<'a, T>> {
        T::view(self.data).map(|data| TensorRef {
            data,
            shape: self.shape,
        })
    }
}

/// Type-erased writable tensor view.
#[derive(Debug)]
pub struct TensorArgMut<'a> {
    pub data: TensorDataMut<'a>,
    pub shape: &'a Shape,
}

impl<'a> TensorArgMut<'a> {
    pub fn new<T: Element>(data: &'a mut [T], shape: &'a Shape) -> Self {
        Self {
            data: T::wrap_mut(data),
            shape,
        }
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn typed<T: Element>(self) -> Option<TensorMut<'a, T>> {
        let shape = self.shape;
        T::view_mut(self.data).map(|data| TensorMut { data, shape })
    }
}
