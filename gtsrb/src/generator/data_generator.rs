use super::{
    load_image, DirectoryIterator, FlowOptions, GeneratorOptions, ImageTransformer,
};
use crate::{
    common::*,
    dataset::{ClassifiedDataset, DirectoryDataset, TableDataset},
    processor::Preprocessor,
};

/// Options to build a [DataGenerator].
#[derive(Debug, Clone)]
pub struct DataGeneratorInit {
    pub data_dir: PathBuf,
    /// Target `[height, width]` of produced images.
    pub image_shape: [usize; 2],
    pub batch_size: usize,
    pub preprocessing_function: Option<Arc<dyn Preprocessor>>,
    pub use_augmentation: bool,
}

impl DataGeneratorInit {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            image_shape: [46, 46],
            batch_size: 32,
            preprocessing_function: None,
            use_augmentation: false,
        }
    }

    pub fn build(self) -> Result<DataGenerator> {
        let Self {
            data_dir,
            image_shape,
            batch_size,
            preprocessing_function,
            use_augmentation,
        } = self;

        ensure!(batch_size > 0, "batch_size must be positive");
        ensure!(
            image_shape.iter().all(|&size| size > 0),
            "image_shape must be positive"
        );

        Ok(DataGenerator {
            data_dir,
            image_shape,
            batch_size,
            preprocessing_function,
            use_augmentation,
            transformer: None,
        })
    }
}

/// Produces batch iterators over a class-per-directory image tree.
#[derive(Debug)]
pub struct DataGenerator {
    data_dir: PathBuf,
    image_shape: [usize; 2],
    batch_size: usize,
    preprocessing_function: Option<Arc<dyn Preprocessor>>,
    use_augmentation: bool,
    transformer: Option<ImageTransformer>,
}

impl DataGenerator {
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn image_shape(&self) -> [usize; 2] {
        self.image_shape
    }

    pub fn use_augmentation(&self) -> bool {
        self.use_augmentation
    }

    /// The single-channel `[channels, height, width]` input shape.
    pub fn input_shape(&self) -> [usize; 3] {
        let [height, width] = self.image_shape;
        [1, height, width]
    }

    pub fn is_created(&self) -> bool {
        self.transformer.is_some()
    }

    /// Build the image transformer from options.
    pub fn create(&mut self, options: &GeneratorOptions) -> Result<()> {
        let transformer = ImageTransformer::new(
            options,
            self.preprocessing_function.clone(),
            self.use_augmentation,
        )?;
        self.transformer = Some(transformer);
        Ok(())
    }

    fn transformer(&mut self) -> Result<&mut ImageTransformer> {
        if self.transformer.is_none() {
            self.create(&GeneratorOptions::default())?;
        }
        self.transformer
            .as_mut()
            .ok_or_else(|| format_err!("the image transformer is not created"))
    }

    /// Iterate over the data directory. Creates the transformer with default
    /// options if [DataGenerator::create] was not called.
    pub fn get_generator(&mut self, options: &FlowOptions) -> Result<DirectoryIterator> {
        let dataset = DirectoryDataset::scan(&self.data_dir, &options.formats)?;
        self.flow_from_dataset(&dataset, options)
    }

    /// Iterate over an arbitrary labeled dataset with this generator's settings.
    pub fn flow_from_dataset(
        &mut self,
        dataset: &dyn ClassifiedDataset,
        options: &FlowOptions,
    ) -> Result<DirectoryIterator> {
        let image_shape = self.image_shape;
        let batch_size = self.batch_size;
        let transformer = self.transformer()?.clone();
        DirectoryIterator::new(dataset, transformer, image_shape, batch_size, options)
    }

    /// Iterate over images listed in a ground truth table, e.g. the flat test folder.
    pub fn flow_from_table(
        &mut self,
        image_dir: impl AsRef<Path>,
        table_file: impl AsRef<Path>,
        num_classes: impl Into<Option<usize>>,
        options: &FlowOptions,
    ) -> Result<DirectoryIterator> {
        let dataset = TableDataset::load(image_dir, table_file, num_classes)?;
        self.flow_from_dataset(&dataset, options)
    }

    /// Fit featurewise statistics on up to `max_samples` images of the data
    /// directory, as they look after the preprocessing function.
    pub fn fit(&mut self, max_samples: usize, options: &FlowOptions) -> Result<()> {
        ensure!(max_samples > 0, "max_samples must be positive");
        let [height, width] = self.image_shape;
        let dataset = DirectoryDataset::scan(&self.data_dir, &options.formats)?;

        let images: Vec<Tensor> = {
            let mut records = dataset.records.clone();
            if options.shuffle {
                let mut rng = match options.seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_entropy(),
                };
                records.shuffle(&mut rng);
            }
            records
                .iter()
                .take(max_samples)
                .map(|record| load_image(&record.path, height, width, options.color_mode))
                .try_collect()?
        };
        ensure!(!images.is_empty(), "no images to fit on");

        self.transformer()?.fit(&images)?;
        info!("fitted featurewise statistics on {} images", images.len());
        Ok(())
    }
}
