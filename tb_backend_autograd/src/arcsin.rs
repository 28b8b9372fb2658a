//! Inverse sine as a candle custom op, since candle has no built-in `asin`.

use candle_core::{bail, CpuStorage, CustomOp1, Layout, Shape, Tensor};

/// `asin(x)`, with derivative `1 / sqrt(1 - x^2)`.
pub(crate) struct Arcsin;

impl CustomOp1 for Arcsin {
    fn name(&self) -> &'static str {
        "arcsin"
    }

    fn cpu_fwd(&self, storage: &CpuStorage, layout: &Layout) -> candle_core::Result<(CpuStorage, Shape)> {
        let Some((start, end)) = layout.contiguous_offsets() else {
            bail!("arcsin: input must be contiguous")
        };
        let out = match storage {
            CpuStorage::F32(v) => CpuStorage::F32(v[start..end].iter().map(|x| x.asin()).collect()),
            CpuStorage::F64(v) => CpuStorage::F64(v[start..end].iter().map(|x| x.asin()).collect()),
            _ => bail!("arcsin: expected a float32 or float64 tensor"),
        };
        Ok((out, layout.shape().clone()))
    }

    fn bwd(&self, arg: &Tensor, _res: &Tensor, grad_res: &Tensor) -> candle_core::Result<Option<Tensor>> {
        let denom = arg.sqr()?.affine(-1.0, 1.0)?.sqrt()?;
        Ok(Some(grad_res.div(&denom)?))
    }
}
