use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::Result;
use crate::frame::Calibration;
use crate::kinetics::RegionKinetics;
use crate::pipeline::AnalysisOutput;
use crate::regions::Region;
use crate::series::{normalize, RegionTimeSeries};

pub const SUMMARY_FILE: &str = "summary.csv";

pub fn region_file_name(id: u8) -> String {
    format!("region_{id}.csv")
}

fn optional(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.6}")).unwrap_or_default()
}

/// Write one region's trace: `#` header lines describing the region, then
/// `time,mean,normalized,fit` per frame.
pub fn write_region_csv(
    path: &Path,
    region: &Region,
    series: &RegionTimeSeries,
    foreground: &[f64],
    kinetics: Option<&RegionKinetics>,
    calibration: &Calibration,
) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    let selected = kinetics.and_then(|k| k.selected.as_ref());

    writeln!(out, "# region,{}", region.id)?;
    writeln!(out, "# pixels,{}", region.size())?;
    writeln!(
        out,
        "# area,{:.6},{}^2",
        calibration.area(region.size()),
        calibration.distance_unit
    )?;
    writeln!(out, "# bleach_frame,{}", region.bleach_frame)?;
    writeln!(
        out,
        "# centroid,{:.3},{:.3}",
        region.centroid.0, region.centroid.1
    )?;
    writeln!(
        out,
        "# model,{}",
        selected.map(|f| f.kind.to_string()).unwrap_or_default()
    )?;
    if let Some(fit) = selected {
        let params: Vec<String> = fit
            .kind
            .param_names()
            .iter()
            .zip(&fit.params)
            .map(|(n, v)| format!("{n}={v:.6e}"))
            .collect();
        writeln!(out, "# params,{}", params.join(","))?;
    }
    writeln!(
        out,
        "# half_life,{},{}",
        optional(kinetics.and_then(|k| k.half_life)),
        calibration.time_unit
    )?;
    if let Some(d) = kinetics.and_then(|k| k.diffusion_coefficient) {
        writeln!(
            out,
            "# diffusion_coefficient,{d:.6},{}^2/{}",
            calibration.distance_unit, calibration.time_unit
        )?;
    }

    writeln!(out, "time,mean,normalized,fit")?;
    let normalized = normalize(&series.means, foreground, region.bleach_frame);
    for (j, (&mean, &norm)) in series.means.iter().zip(&normalized).enumerate() {
        let fit = selected
            .filter(|_| j >= region.bleach_frame)
            .map(|f| {
                let t = calibration.time_of(j - region.bleach_frame);
                f.kind.value(t, &f.params)
            });
        writeln!(
            out,
            "{:.6},{mean:.6},{norm:.6},{}",
            calibration.time_of(j),
            optional(fit)
        )?;
    }

    out.flush()?;
    Ok(())
}

/// One row per region with the selected model and derived quantities.
pub fn write_summary_csv(path: &Path, output: &AnalysisOutput) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(
        out,
        "region,bleach_frame,pixels,model,rss,half_life,bleach_half_life,diffusion_coefficient,failures"
    )?;
    for k in &output.kinetics.regions {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{}",
            k.region_id,
            k.bleach_frame,
            k.area_px,
            k.selected
                .as_ref()
                .map(|f| f.kind.to_string())
                .unwrap_or_default(),
            optional(k.selected.as_ref().map(|f| f.rss)),
            optional(k.half_life),
            optional(k.bleach_half_life),
            optional(k.diffusion_coefficient),
            k.failures.len()
        )?;
    }
    out.flush()?;
    Ok(())
}

/// Write every region CSV plus the summary into `dir`.
///
/// Failures are logged and skipped; the paths actually written are returned.
pub fn write_results(dir: &Path, output: &AnalysisOutput) -> Vec<PathBuf> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "Results directory does not exist, skipping CSV output");
        return Vec::new();
    }

    let mut written = Vec::new();
    for (region, series) in output.regions.iter().zip(&output.series.regions) {
        let path = dir.join(region_file_name(region.id));
        let kinetics = output
            .kinetics
            .regions
            .iter()
            .find(|k| k.region_id == region.id);
        match write_region_csv(
            &path,
            region,
            series,
            &output.series.foreground,
            kinetics,
            &output.calibration,
        ) {
            Ok(()) => written.push(path),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to write region CSV"),
        }
    }

    let summary = dir.join(SUMMARY_FILE);
    match write_summary_csv(&summary, output) {
        Ok(()) => written.push(summary),
        Err(e) => warn!(path = %summary.display(), error = %e, "Failed to write summary CSV"),
    }

    info!(files = written.len(), dir = %dir.display(), "Results written");
    written
}
