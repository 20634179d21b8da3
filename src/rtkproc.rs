//! External RTK solver driver (rnx2rtkp)
//!
//! The positioning engine is an opaque external binary: one worker
//! thread per baseline, a hard timeout after which the child is
//! killed, and no retry. A failed or timed-out baseline is reported
//! on its own; sibling baselines keep running (their file sets,
//! processes and outputs are disjoint).
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Instant;

use hifitime::Duration;
use log::{debug, error, info, warn};

use crate::error::Error;

/// One solver invocation: executable, config, output and input files.
#[derive(Debug, Clone)]
pub struct RtkInvocation {
    /// Path to the rnx2rtkp executable
    pub executable: PathBuf,
    /// Solver configuration file (-k)
    pub config_file: PathBuf,
    /// Solution output file (-o)
    pub output_file: PathBuf,
    /// Rover observation file
    pub rover_obs: PathBuf,
    /// Base observation file
    pub base_obs: PathBuf,
    /// Navigation / precise ephemeris / clock files, in solver order
    pub extra_files: Vec<PathBuf>,
}

impl RtkInvocation {
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("-k")
            .arg(&self.config_file)
            .arg("-o")
            .arg(&self.output_file)
            .arg(&self.rover_obs)
            .arg(&self.base_obs)
            .args(&self.extra_files)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

/// One baseline to process.
#[derive(Debug, Clone)]
pub struct BaselineJob {
    /// Baseline label, e.g. "Base-Port"
    pub name: String,
    pub invocation: RtkInvocation,
}

/// Successful solver run.
#[derive(Debug, Clone)]
pub struct ProcessReport {
    pub name: String,
    /// Solution file to hand to the reader
    pub output_file: PathBuf,
    /// Wall-clock solver time [s]
    pub elapsed_s: f64,
    /// Trailing solver diagnostics
    pub stderr_tail: String,
}

/// Runs all baselines concurrently, one worker thread each, and
/// returns one result per job in input order. Partial failure
/// semantics at the baseline granularity: an error in one job never
/// aborts the others.
pub fn run_baselines(jobs: Vec<BaselineJob>, timeout: Duration) -> Vec<Result<ProcessReport, Error>> {
    thread::scope(|scope| {
        let handles: Vec<_> = jobs
            .into_iter()
            .map(|job| {
                let name = job.name.clone();
                (name, scope.spawn(move || run_job(job, timeout)))
            })
            .collect();

        handles
            .into_iter()
            .map(|(name, handle)| {
                handle.join().unwrap_or(Err(Error::ProcessFailed {
                    name,
                    status: None,
                }))
            })
            .collect()
    })
}

fn run_job(job: BaselineJob, timeout: Duration) -> Result<ProcessReport, Error> {
    let BaselineJob { name, invocation } = job;

    if !invocation.executable.is_file() {
        return Err(Error::MissingExecutable(invocation.executable.clone()));
    }

    // progress scale for the observer thread
    let expected_epochs = match estimate_epoch_count(&invocation.rover_obs) {
        Ok(count) => {
            debug!("{}: ~{} epochs to process", name, count);
            Some(count)
        },
        Err(err) => {
            warn!("{}: epoch estimation failed: {}", name, err);
            None
        },
    };

    info!("{}: starting solver", name);
    let started = Instant::now();

    let mut child = invocation.command().spawn()?;

    // drain both pipes so the child never blocks on a full buffer
    let stdout = child.stdout.take();
    let progress_name = name.clone();
    let progress = thread::spawn(move || {
        let mut lines = 0usize;
        if let Some(stdout) = stdout {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                if line.contains("processing") || line.contains("Q=") {
                    lines += 1;
                    // the solver sweeps forward then backward over the
                    // observation window, hence the factor two
                    if let Some(total) = expected_epochs {
                        if lines % 100 == 0 {
                            let percent = (lines * 100 / (total * 2)).min(100);
                            debug!("{}: ~{}%", progress_name, percent);
                        }
                    }
                }
            }
        }
        lines
    });

    let stderr = child.stderr.take();
    let stderr_drain = thread::spawn(move || {
        let mut captured = String::new();
        if let Some(mut stderr) = stderr {
            let _ = stderr.read_to_string(&mut captured);
        }
        captured
    });

    let timeout_s = timeout.to_seconds().max(0.0);

    let status = loop {
        match child.try_wait()? {
            Some(status) => break status,
            None => {
                if started.elapsed().as_secs_f64() > timeout_s {
                    error!("{}: timeout, killing solver", name);
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = progress.join();
                    let _ = stderr_drain.join();
                    return Err(Error::ProcessTimeout {
                        name,
                        seconds: timeout_s as u64,
                    });
                }
                thread::sleep(std::time::Duration::from_millis(200));
            },
        }
    };

    let _ = progress.join();
    let stderr_tail = stderr_drain
        .join()
        .map(|s| tail(&s, 20))
        .unwrap_or_default();

    if !status.success() {
        error!("{}: solver failed ({:?})", name, status.code());
        if !stderr_tail.is_empty() {
            debug!("{}: {}", name, stderr_tail);
        }
        return Err(Error::ProcessFailed {
            name,
            status: status.code(),
        });
    }

    let elapsed_s = started.elapsed().as_secs_f64();
    info!("{}: solver done in {:.1} s", name, elapsed_s);

    Ok(ProcessReport {
        name,
        output_file: invocation.output_file,
        elapsed_s,
        stderr_tail,
    })
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

/// Counts epoch headers in a RINEX observation file, as the scale of
/// the progress heuristic. RINEX 3 epochs open with `>`; RINEX 2
/// epochs open with a 2-digit year followed by month/day/time fields.
pub fn estimate_epoch_count<P: AsRef<Path>>(path: P) -> Result<usize, Error> {
    let reader = BufReader::new(File::open(path.as_ref())?);

    let mut v3 = 0usize;
    let mut v2 = 0usize;

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim_start();

        if trimmed.starts_with('>') {
            v3 += 1;
        } else if looks_like_v2_epoch(trimmed) {
            v2 += 1;
        }
    }

    Ok(v3.max(v2).max(1))
}

/// `yy mm dd hh mm ss.sssssss flag` with plausible ranges.
fn looks_like_v2_epoch(line: &str) -> bool {
    let mut fields = line.split_whitespace();

    let mut ints = [0u32; 5];
    for slot in ints.iter_mut() {
        match fields.next().and_then(|f| f.parse::<u32>().ok()) {
            Some(value) => *slot = value,
            None => return false,
        }
    }

    let seconds = match fields.next().and_then(|f| f.parse::<f64>().ok()) {
        Some(value) => value,
        None => return false,
    };

    ints[0] <= 99
        && (1..=12).contains(&ints[1])
        && (1..=31).contains(&ints[2])
        && ints[3] <= 23
        && ints[4] <= 59
        && (0.0..61.0).contains(&seconds)
}

#[cfg(test)]
mod test {
    use super::{estimate_epoch_count, looks_like_v2_epoch, run_baselines, BaselineJob, RtkInvocation};
    use crate::error::Error;
    use hifitime::Unit;
    use std::io::Write;

    #[test]
    fn v2_epoch_detection() {
        assert!(looks_like_v2_epoch("25  7 16  1 23 45.0000000  0 12"));
        assert!(!looks_like_v2_epoch("G12  23456789.123"));
        assert!(!looks_like_v2_epoch("END OF HEADER"));
    }

    #[test]
    fn epoch_count_rinex3() {
        let mut file = tempfile();
        writeln!(file.file, "> 2025 07 16 01 23 45.0000000  0 12").unwrap();
        writeln!(file.file, "G12  23456789.123").unwrap();
        writeln!(file.file, "> 2025 07 16 01 23 46.0000000  0 12").unwrap();

        assert_eq!(estimate_epoch_count(&file.path).unwrap(), 2);
    }

    #[test]
    fn missing_executable() {
        let job = BaselineJob {
            name: "Base-Port".to_string(),
            invocation: RtkInvocation {
                executable: "/nonexistent/rnx2rtkp".into(),
                config_file: "conf.conf".into(),
                output_file: "out.pos".into(),
                rover_obs: "rover.obs".into(),
                base_obs: "base.obs".into(),
                extra_files: vec![],
            },
        };

        let results = run_baselines(vec![job], 1.0 * Unit::Second);
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(Error::MissingExecutable(_))));
    }

    struct TempFile {
        path: std::path::PathBuf,
        file: std::fs::File,
    }

    impl Drop for TempFile {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    fn tempfile() -> TempFile {
        let path = std::env::temp_dir().join(format!(
            "gnss-attitude-test-{}-{:?}",
            std::process::id(),
            std::thread::current().id()
        ));
        let file = std::fs::File::create(&path).unwrap();
        TempFile { path, file }
    }
}
