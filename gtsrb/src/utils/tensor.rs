use crate::common::*;

/// The size of the leading dimension, failing on 0-dimensional tensors.
pub fn batch_len(tensor: &Tensor) -> Result<i64> {
    let len = tensor
        .size()
        .first()
        .copied()
        .ok_or_else(|| format_err!("expect a batched tensor, but get a scalar"))?;
    Ok(len)
}
