//! Array handles: the user-facing, backend-independent array reference

use super::host::HostArray;
use super::shape::Shape;
use crate::backend::{BackendDescriptor, NativeRef};
use crate::device::Device;
use crate::dtype::{DType, Element, Scalar};
use crate::error::Result;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
struct Binding {
    native: NativeRef,
    backend: Arc<BackendDescriptor>,
    shape: Shape,
    dtype: DType,
}

struct ArrayCell {
    binding: RwLock<Binding>,
    variable: bool,
}

/// Opaque handle over a backend-native array.
///
/// Clones share the same cell, so writing into an array through an `out`
/// argument is visible through every clone. The cached shape and dtype
/// always describe the bound native array.
#[derive(Clone)]
pub struct Array {
    cell: Arc<ArrayCell>,
}

impl Array {
    /// Wrap a native array produced by `backend`
    pub(crate) fn from_native(native: NativeRef, backend: Arc<BackendDescriptor>) -> Self {
        Self::bind(native, backend, false)
    }

    fn bind(native: NativeRef, backend: Arc<BackendDescriptor>, variable: bool) -> Self {
        let binding = Binding {
            shape: native.shape(),
            dtype: native.dtype(),
            native,
            backend,
        };
        Self {
            cell: Arc::new(ArrayCell {
                binding: RwLock::new(binding),
                variable,
            }),
        }
    }

    /// A new handle over the same native array with the variable flag set
    pub(crate) fn with_variable(&self, variable: bool) -> Self {
        let b = self.cell.binding.read().clone();
        Self::bind(b.native, b.backend, variable)
    }

    /// Rebind this handle (and every clone) to a new native array
    pub(crate) fn assign(&self, native: NativeRef, backend: Arc<BackendDescriptor>) {
        let mut b = self.cell.binding.write();
        b.shape = native.shape();
        b.dtype = native.dtype();
        b.native = native;
        b.backend = backend;
    }

    /// Create an array from typed data on the active backend
    pub fn from_slice<T: Element>(data: &[T], shape: &[usize]) -> Result<Self> {
        crate::api::asarray(super::ArrayLike::from_slice(data, shape)?, None)
    }

    /// Shape
    pub fn shape(&self) -> Shape {
        self.cell.binding.read().shape.clone()
    }

    /// Dtype
    pub fn dtype(&self) -> DType {
        self.cell.binding.read().dtype
    }

    /// Number of dimensions
    pub fn ndim(&self) -> usize {
        self.cell.binding.read().shape.ndim()
    }

    /// Number of elements
    pub fn numel(&self) -> usize {
        self.cell.binding.read().shape.numel()
    }

    /// Placement
    pub fn device(&self) -> Device {
        self.cell.binding.read().native.device()
    }

    /// Descriptor of the backend that produced the native array
    pub fn backend(&self) -> Arc<BackendDescriptor> {
        Arc::clone(&self.cell.binding.read().backend)
    }

    /// Name of the backend that produced the native array
    pub fn backend_name(&self) -> &'static str {
        self.cell.binding.read().backend.name()
    }

    /// Escape hatch: the backend-native array
    pub fn native(&self) -> NativeRef {
        Arc::clone(&self.cell.binding.read().native)
    }

    /// Whether the handle is marked as gradient-eligible
    #[inline]
    pub fn is_variable(&self) -> bool {
        self.cell.variable
    }

    /// Whether two handles share the same cell
    #[inline]
    pub fn same_handle(&self, other: &Array) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    /// Copy of the data on the host
    pub fn to_host(&self) -> HostArray {
        self.native().host().into_owned()
    }

    /// Elements converted to `T`
    pub fn to_vec<T: Element>(&self) -> Vec<T> {
        let host = self.to_host();
        (0..host.numel())
            .map(|i| {
                let (re, im) = host.get(i);
                T::from_parts(re, im)
            })
            .collect()
    }

    /// Real parts as f64
    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.to_host().re().to_vec()
    }

    /// The single element of a one-element array
    pub fn item(&self) -> Result<Scalar> {
        self.native().host().item()
    }

    /// Raw little-endian bytes of the data in its own dtype
    pub fn to_bytes(&self) -> Vec<u8> {
        use crate::dtype::{Complex128, Complex64};
        use half::{bf16, f16};

        macro_rules! bytes_of {
            ($t:ty) => {
                bytemuck::cast_slice::<$t, u8>(&self.to_vec::<$t>()).to_vec()
            };
        }
        match self.dtype() {
            DType::F64 => bytes_of!(f64),
            DType::F32 => bytes_of!(f32),
            DType::F16 => bytes_of!(f16),
            DType::BF16 => bytes_of!(bf16),
            DType::I64 => bytes_of!(i64),
            DType::I32 => bytes_of!(i32),
            DType::I16 => bytes_of!(i16),
            DType::I8 => bytes_of!(i8),
            DType::U64 => bytes_of!(u64),
            DType::U32 => bytes_of!(u32),
            DType::U16 => bytes_of!(u16),
            DType::U8 | DType::Bool => bytes_of!(u8),
            DType::Complex64 => bytes_of!(Complex64),
            DType::Complex128 => bytes_of!(Complex128),
        }
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.cell.binding.read();
        f.debug_struct("Array")
            .field("shape", &b.shape)
            .field("dtype", &b.dtype)
            .field("backend", &b.backend.name())
            .field("device", &b.native.device())
            .field("variable", &self.cell.variable)
            .finish()
    }
}

impl fmt::Display for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let host = self.to_host();
        f.write_str("array(")?;
        write_nested(f, &host, 0, 0)?;
        write!(f, ", dtype={})", host.dtype())
    }
}

fn write_nested(f: &mut fmt::Formatter<'_>, host: &HostArray, dim: usize, offset: usize) -> fmt::Result {
    if dim == host.ndim() {
        return write!(f, "{}", host.scalar_at(offset));
    }
    let len = host.shape()[dim];
    let stride: usize = host.shape()[dim + 1..].iter().product();
    f.write_str("[")?;
    for i in 0..len {
        if i > 0 {
            f.write_str(", ")?;
        }
        write_nested(f, host, dim + 1, offset + i * stride)?;
    }
    f.write_str("]")
}
