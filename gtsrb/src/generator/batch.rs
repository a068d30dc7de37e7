use crate::{common::*, utils};

/// A batch of `[batch, channels, height, width]` images with optional labels.
#[derive(Debug)]
pub struct Batch {
    pub images: Tensor,
    /// One-hot `[batch, classes]` float labels or `[batch]` int64 class indices.
    pub labels: Option<Tensor>,
}

impl Batch {
    pub fn batch_size(&self) -> Result<i64> {
        utils::batch_len(&self.images)
    }

    pub fn to_device(&self, device: Device) -> Self {
        Self {
            images: self.images.to_device(device),
            labels: self.labels.as_ref().map(|labels| labels.to_device(device)),
        }
    }

    /// Returns labels or fails for unlabeled batches.
    pub fn labels(&self) -> Result<&Tensor> {
        self.labels
            .as_ref()
            .ok_or_else(|| format_err!("the batch has no labels"))
    }
}

impl Clone for Batch {
    fn clone(&self) -> Self {
        Self {
            images: self.images.shallow_clone(),
            labels: self.labels.as_ref().map(|labels| labels.shallow_clone()),
        }
    }
}
