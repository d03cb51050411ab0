use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

#[derive(Args)]
pub struct InfoArgs {
    /// SER file or directory of frame images
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let info = frap_core::io::source_info(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    println!("Source:      {}", info.path.display());
    println!("Frames:      {}", info.total_frames);
    println!("Dimensions:  {}x{}", info.width, info.height);
    println!("Pixel type:  {}", info.pixel_type);

    if let Some(ref obs) = info.observer {
        println!("Observer:    {}", obs);
    }
    if let Some(ref inst) = info.instrument {
        println!("Instrument:  {}", inst);
    }

    let bytes = info.width as usize
        * info.height as usize
        * (info.pixel_type.bit_depth() as usize / 8)
        * info.total_frames;
    println!("Data size:   {:.1} MB", bytes as f64 / (1024.0 * 1024.0));

    Ok(())
}
