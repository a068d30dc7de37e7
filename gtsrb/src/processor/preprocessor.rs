use crate::common::*;

/// A transform applied to one `[channels, height, width]` image.
pub trait Preprocessor
where
    Self: Debug + Send + Sync,
{
    fn title(&self) -> &str;

    fn evaluate(&self, image: &Tensor) -> Result<Tensor>;
}

/// A preprocessor built from a closure.
pub struct FnPreprocessor<F> {
    title: String,
    func: F,
}

impl<F> FnPreprocessor<F>
where
    F: Fn(&Tensor) -> Result<Tensor> + Send + Sync,
{
    pub fn new(title: impl Into<String>, func: F) -> Self {
        Self {
            title: title.into(),
            func,
        }
    }
}

impl<F> Debug for FnPreprocessor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPreprocessor")
            .field("title", &self.title)
            .finish()
    }
}

impl<F> Preprocessor for FnPreprocessor<F>
where
    F: Fn(&Tensor) -> Result<Tensor> + Send + Sync,
{
    fn title(&self) -> &str {
        &self.title
    }

    fn evaluate(&self, image: &Tensor) -> Result<Tensor> {
        (self.func)(image)
    }
}
