mod config;
mod data;
mod errors;
mod etl;
mod map;

use std::env;
use std::fs::create_dir_all;
use std::io;
use std::path::{Path, PathBuf};

use structured_logger::json::new_writer;
use structured_logger::Builder;

use crate::config::{UserConfig, DEFAULT_CONFIG_PATH};
use crate::errors::Result;
use crate::etl::parse_osm::ParseOsmEtl;
use crate::etl::render_map::RenderMapEtl;
use crate::etl::Etl;

/// Stage outputs go to `<dest_path>/<input file name>`.
fn create_output_dir(config: &UserConfig) -> Result<PathBuf> {
    let input_fname = config.data_path
        .file_name()
        .ok_or("Could not get input file name")?;
    let output_dir = config.dest_path.join(input_fname);
    create_dir_all(&output_dir)?;
    Ok(output_dir)
}

fn setup_logging() {
    Builder::with_level("info")
        .with_target_writer("*", new_writer(io::stdout()))
        .init();
}

fn main() -> Result<()> {
    setup_logging();

    let config_path = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let user_config = UserConfig::from_file(Path::new(&config_path))?;
    let output_dir = create_output_dir(&user_config)?;

    ParseOsmEtl::new(&user_config).process(&output_dir)?;

    RenderMapEtl::new(&user_config).rebuild(&output_dir)?;

    Ok(())
}
