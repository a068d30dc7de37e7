pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use indexmap::{IndexMap, IndexSet};
pub use itertools::{izip, Itertools as _};
pub use log::{debug, info, warn};
pub use noisy_float::prelude::*;
pub use once_cell::sync::Lazy;
pub use rand::{prelude::*, rngs::StdRng, seq::SliceRandom};
pub use serde::{Deserialize, Serialize};
pub use std::{
    borrow::{Borrow, Cow},
    collections::HashMap,
    fmt,
    fmt::Debug,
    fs,
    io::{self, BufWriter, Write as _},
    iter,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
    time::{Duration, Instant},
};
pub use tch::{
    kind::FLOAT_CPU,
    nn::{self, Module as _, ModuleT as _, OptimizerConfig as _},
    vision, Device, IndexOp as _, Kind, Reduction, Tensor,
};
pub use tch_act::{Activation, TensorActivationExt as _};
