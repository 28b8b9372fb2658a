//! Conversions between plain arrays and candle tensors.

use candle_core::{DType as CandleDType, Device, Tensor};
use tb_core::prelude::*;

use crate::INTERFACE;

/// Attach the interface tag to candle errors.
pub(crate) trait CandleResultExt<T> {
    fn lift(self) -> Result<T>;
}

impl<T> CandleResultExt<T> for candle_core::Result<T> {
    fn lift(self) -> Result<T> {
        self.map_err(|e| BoxError::backend(INTERFACE, e))
    }
}

pub(crate) fn candle_dtype(dtype: DType, op: &'static str) -> Result<CandleDType> {
    match dtype {
        DType::Int64 => Ok(CandleDType::I64),
        DType::Float32 => Ok(CandleDType::F32),
        DType::Float64 => Ok(CandleDType::F64),
        DType::Complex128 => Err(BoxError::UnsupportedDType {
            op,
            dtype,
            interface: INTERFACE,
        }),
    }
}

pub(crate) fn box_dtype(dtype: CandleDType) -> DType {
    match dtype {
        CandleDType::I64 | CandleDType::U32 | CandleDType::U8 => DType::Int64,
        CandleDType::F64 => DType::Float64,
        _ => DType::Float32,
    }
}

/// Copy a plain array into a CPU tensor. Complex arrays have no candle
/// counterpart.
pub(crate) fn to_tensor(array: &NdArray) -> Result<Tensor> {
    let dims = array.shape().dims().to_vec();
    let device = Device::Cpu;
    let tensor = match array {
        NdArray::Int64(a) => Tensor::from_vec(a.iter().copied().collect::<Vec<_>>(), dims, &device),
        NdArray::Float32(a) => Tensor::from_vec(a.iter().copied().collect::<Vec<_>>(), dims, &device),
        NdArray::Float64(a) => Tensor::from_vec(a.iter().copied().collect::<Vec<_>>(), dims, &device),
        NdArray::Complex128(_) => {
            return Err(BoxError::UnsupportedDType {
                op: "astensor",
                dtype: DType::Complex128,
                interface: INTERFACE,
            })
        }
    };
    tensor.lift()
}

/// Copy a tensor's values out into a plain array of the same shape.
pub(crate) fn to_ndarray(tensor: &Tensor) -> Result<NdArray> {
    let dims = tensor.dims().to_vec();
    let flat = tensor.flatten_all().lift()?;
    match tensor.dtype() {
        CandleDType::I64 => NdArray::from_shape_vec(&dims, flat.to_vec1::<i64>().lift()?),
        CandleDType::F32 => NdArray::from_shape_vec(&dims, flat.to_vec1::<f32>().lift()?),
        CandleDType::F64 => NdArray::from_shape_vec(&dims, flat.to_vec1::<f64>().lift()?),
        other => {
            let target = box_dtype(other);
            log::debug!("exporting {other:?} tensor as {target}");
            to_ndarray(&tensor.to_dtype(candle_dtype(target, "numpy")?).lift()?)
        }
    }
}

/// Cast `tensor` to `dtype` unless it already has it.
pub(crate) fn ensure_dtype(tensor: &Tensor, dtype: CandleDType) -> Result<Tensor> {
    if tensor.dtype() == dtype {
        Ok(tensor.clone())
    } else {
        tensor.to_dtype(dtype).lift()
    }
}
