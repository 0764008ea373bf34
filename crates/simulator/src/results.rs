//! Result-file writers.
//!
//! One CSV per measurement series, plus the merged configuration as JSON,
//! all under the configured result directory:
//!
//! - `aw<peer>.csv`: approval weights per color for each monitored peer
//! - `tips.csv`: tip-pool sizes per color (peer 0)
//! - `ww.csv`: witness-weight trace of the monitored (peer, message) pair
//! - `rmc.csv`: Referenced Mana Cost per slot (peer 0)
//! - `throughput.csv`: final per-peer counters
//! - `config.json`: the full merged configuration

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tanglesim_simulation::{MetricsLog, SimulationConfig};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ResultsError {
    #[error("result file i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("config serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Write every result file for a finished run.
pub fn write_all(
    dir: &Path,
    config: &SimulationConfig,
    metrics: &MetricsLog,
) -> Result<(), ResultsError> {
    fs::create_dir_all(dir)?;

    write_config(&dir.join("config.json"), config)?;
    for (&peer, rows) in &metrics.aw {
        write_aw(&dir.join(format!("aw{peer}.csv")), rows)?;
    }
    write_tips(&dir.join("tips.csv"), metrics)?;
    write_ww(&dir.join("ww.csv"), metrics)?;
    write_rmc(&dir.join("rmc.csv"), metrics)?;
    write_throughput(&dir.join("throughput.csv"), metrics)?;

    info!(dir = %dir.display(), "results written");
    Ok(())
}

fn write_config(path: &PathBuf, config: &SimulationConfig) -> Result<(), ResultsError> {
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json)?;
    Ok(())
}

fn write_aw(path: &PathBuf, rows: &[tanglesim_simulation::AwRow]) -> Result<(), ResultsError> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(
        out,
        "ns since start,undefined,red,green,blue,confirmed msgs,issued msgs"
    )?;
    for row in rows {
        let [undefined, red, green, blue] = row.approval_weights;
        writeln!(
            out,
            "{},{undefined},{red},{green},{blue},{},{}",
            row.ns_since_start, row.confirmed, row.issued
        )?;
    }
    Ok(())
}

fn write_tips(path: &PathBuf, metrics: &MetricsLog) -> Result<(), ResultsError> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "ns since start,undefined,red,green,blue")?;
    for row in &metrics.tips {
        let [undefined, red, green, blue] = row.sizes;
        writeln!(
            out,
            "{},{undefined},{red},{green},{blue}",
            row.ns_since_start
        )?;
    }
    Ok(())
}

fn write_ww(path: &PathBuf, metrics: &MetricsLog) -> Result<(), ResultsError> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "ns since start,witness weight")?;
    for row in &metrics.ww {
        writeln!(out, "{},{}", row.ns_since_start, row.weight)?;
    }
    Ok(())
}

fn write_rmc(path: &PathBuf, metrics: &MetricsLog) -> Result<(), ResultsError> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "slot,rmc")?;
    for (slot, price) in &metrics.rmc {
        writeln!(out, "{slot},{price}")?;
    }
    Ok(())
}

fn write_throughput(path: &PathBuf, metrics: &MetricsLog) -> Result<(), ResultsError> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(
        out,
        "peer,issued,scheduled,confirmed,orphaned,dropped,throttled"
    )?;
    for row in &metrics.throughput {
        writeln!(
            out,
            "{},{},{},{},{},{},{}",
            row.peer,
            row.issued,
            row.scheduled,
            row.confirmed,
            row.orphaned,
            row.dropped,
            row.throttled
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tanglesim_simulation::{AwRow, ThroughputRow};

    #[test]
    fn test_writes_expected_files() {
        let dir = std::env::temp_dir().join(format!("tanglesim-results-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);

        let config = SimulationConfig::default();
        let mut metrics = MetricsLog::default();
        metrics.aw.insert(
            0,
            vec![AwRow {
                ns_since_start: 100,
                approval_weights: [0, 10, 20, 0],
                confirmed: 1,
                issued: 5,
            }],
        );
        metrics.throughput.push(ThroughputRow {
            peer: 0,
            issued: 5,
            scheduled: 5,
            confirmed: 1,
            orphaned: 0,
            dropped: 0,
            throttled: 0,
        });

        write_all(&dir, &config, &metrics).unwrap();
        for file in ["config.json", "aw0.csv", "tips.csv", "ww.csv", "rmc.csv", "throughput.csv"] {
            assert!(dir.join(file).exists(), "{file} missing");
        }

        let aw = fs::read_to_string(dir.join("aw0.csv")).unwrap();
        let mut lines = aw.lines();
        assert_eq!(
            lines.next().unwrap(),
            "ns since start,undefined,red,green,blue,confirmed msgs,issued msgs"
        );
        assert_eq!(lines.next().unwrap(), "100,0,10,20,0,1,5");

        let _ = fs::remove_dir_all(&dir);
    }
}
