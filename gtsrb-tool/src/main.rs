use anyhow::Result;
use clap::Parser;
use gtsrb::{
    callbacks::CallbackKind,
    dataset::{self, ArtifactLayout, DatasetUrls},
    model::{ModelInit, ModelTopology, SimpleCnnInit},
};
use prettytable::{cell, row, Table};
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;

#[derive(Debug, Clone, Parser)]
enum Opts {
    /// Download the dataset and create the artifact directories
    Init {
        /// root directory of the artifacts
        #[clap(default_value = ".")]
        root: PathBuf,
    },
    /// Print the layers of a model
    Info {
        /// topology file, the default model is shown if omitted
        topology_file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    match Opts::parse() {
        Opts::Init { root } => {
            init(root)?;
        }
        Opts::Info { topology_file } => {
            info(topology_file.as_deref())?;
        }
    }

    Ok(())
}

fn init(root: PathBuf) -> Result<()> {
    let layout = ArtifactLayout::with_root(root);
    dataset::init_all(&layout, &DatasetUrls::default())
}

fn info(topology_file: Option<&Path>) -> Result<()> {
    let topology = match topology_file {
        Some(file) => ModelTopology::load(file)?,
        None => {
            let init = ModelInit::default();
            SimpleCnnInit {
                name: init.name,
                input_shape: init.input_shape,
                kernel_size: init.kernel_size,
                layer_activation: init.layer_activation,
                num_output: init.num_output,
                output_activation: init.output_activation,
            }
            .build()?
        }
    };
    let summary = topology.summary()?;

    println!("model: {}", topology.name);

    // print layer information
    {
        let mut table = Table::new();
        table.add_row(row!["index", "kind", "input shape", "output shape", "params"]);

        summary.iter().for_each(|layer| {
            table.add_row(row![
                layer.index,
                layer.kind,
                layer.input_shape,
                layer.output_shape,
                layer.num_params,
            ]);
        });

        table.printstd();
    }

    println!(
        "total params: {}",
        summary.iter().map(|layer| layer.num_params).sum::<usize>()
    );

    // print callbacks constructible by name
    let names: Vec<_> = CallbackKind::iter().map(|kind| kind.to_string()).collect();
    println!("available callbacks: {}", names.join(", "));

    Ok(())
}
