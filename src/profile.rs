//! Worst-case core requirement profiles for the supported benchmarks.
//!
//! Each task is identified by a composition string
//! `suite-benchmark-input-parallelism`. The profile maps a
//! `(suite, benchmark)` pair to an ordered vector where entry `p - 1`
//! is the worst-case number of cores the benchmark occupies when run
//! with requested parallelism `p`. A zero entry marks a parallelism
//! level the benchmark cannot meaningfully run with; the lookup
//! returns it as-is and admission rejects it at construction.

use anyhow::{bail, Result};
use std::fmt;

/// Parsed composition string: `suite-benchmark-input-parallelism`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskName {
    pub suite: String,
    pub benchmark: String,
    /// Input-set name. Not used for mapping decisions, preserved for
    /// log output.
    pub input: String,
    pub parallelism: usize,
}

impl TaskName {
    /// Parse a composition string into its four dash-separated fields.
    pub fn parse(s: &str) -> Result<Self> {
        let fields: Vec<&str> = s.split('-').collect();
        if fields.len() != 4 {
            bail!("configuration error: malformed composition string {s:?}, expected suite-benchmark-input-parallelism");
        }
        let parallelism: usize = fields[3].parse().unwrap_or(0);
        Ok(TaskName {
            suite: fields[0].to_string(),
            benchmark: fields[1].to_string(),
            input: fields[2].to_string(),
            parallelism,
        })
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.suite, self.benchmark, self.input, self.parallelism
        )
    }
}

/// Worst-case core counts per requested parallelism, indexed by `p - 1`.
/// Zeros are placeholders for forbidden parallelism values.
const PARSEC: &[(&str, &[u32])] = &[
    ("blackscholes", &[2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]),
    ("bodytrack", &[3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]),
    ("canneal", &[2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]),
    ("dedup", &[4, 7, 10, 13, 16]),
    ("ferret", &[7, 11, 15]),
    ("fluidanimate", &[2, 3, 0, 5, 0, 0, 0, 9]),
    ("streamcluster", &[2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]),
    ("swaptions", &[2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]),
    ("x264", &[1, 3, 4, 5, 6, 7, 8, 9]),
];

const SPLASH2: &[(&str, &[u32])] = &[
    ("barnes", &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]),
    ("cholesky", &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]),
    ("fft", &[1, 2, 0, 4, 0, 0, 0, 8, 0, 0, 0, 0, 0, 0, 0, 16]),
    ("fmm", &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]),
    ("lu.cont", &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]),
    ("lu.ncont", &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]),
    ("ocean.cont", &[1, 2, 0, 4, 0, 0, 0, 8, 0, 0, 0, 0, 0, 0, 0, 16]),
    ("ocean.ncont", &[1, 2, 0, 4, 0, 0, 0, 8, 0, 0, 0, 0, 0, 0, 0, 16]),
    ("radiosity", &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]),
    ("radix", &[1, 2, 0, 4, 0, 0, 0, 8, 0, 0, 0, 0, 0, 0, 0, 16]),
    ("raytrace", &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]),
    ("water.nsq", &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]),
    ("water.sp", &[1, 2, 0, 4, 0, 0, 0, 8, 0, 0, 0, 0, 0, 0, 0, 16]),
];

/// Look up the worst-case core requirement for a task.
///
/// Returns the raw table entry, including zero for forbidden
/// parallelism values; the caller treats zero as a configuration
/// error. Fails when the suite or benchmark is unknown, the
/// parallelism is below 1, or it exceeds the profile length (this
/// deliberately rejects e.g. `fluidanimate` above 8, whose vector is
/// shorter than the others).
pub fn core_requirement(name: &TaskName) -> Result<u32> {
    if name.parallelism < 1 {
        bail!("configuration error: no core requirement profile for {name} (parallelism < 1)");
    }
    let table = match name.suite.as_str() {
        "parsec" => PARSEC,
        "splash2" => SPLASH2,
        _ => bail!(
            "configuration error: no core requirement profile for {name} (only parsec and splash2 profiles exist)"
        ),
    };
    let requirements = match table.iter().find(|(b, _)| *b == name.benchmark) {
        Some((_, r)) => *r,
        None => bail!("configuration error: no core requirement profile for benchmark {name}"),
    };
    match requirements.get(name.parallelism - 1) {
        Some(&r) => Ok(r),
        None => bail!(
            "configuration error: no core requirement profile for {name} (parallelism beyond profile)"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> TaskName {
        TaskName::parse(s).unwrap()
    }

    #[test]
    fn parses_composition_string() {
        let n = name("parsec-blackscholes-simsmall-4");
        assert_eq!(n.suite, "parsec");
        assert_eq!(n.benchmark, "blackscholes");
        assert_eq!(n.input, "simsmall");
        assert_eq!(n.parallelism, 4);
        assert_eq!(n.to_string(), "parsec-blackscholes-simsmall-4");
    }

    #[test]
    fn rejects_malformed_composition_string() {
        assert!(TaskName::parse("parsec-blackscholes-4").is_err());
        assert!(TaskName::parse("parsec-blackscholes-simsmall-4-extra").is_err());
    }

    #[test]
    fn parsec_requirements() {
        assert_eq!(core_requirement(&name("parsec-blackscholes-simsmall-1")).unwrap(), 2);
        assert_eq!(core_requirement(&name("parsec-blackscholes-simsmall-15")).unwrap(), 16);
        assert_eq!(core_requirement(&name("parsec-bodytrack-simsmall-1")).unwrap(), 3);
        assert_eq!(core_requirement(&name("parsec-dedup-simsmall-3")).unwrap(), 10);
        assert_eq!(core_requirement(&name("parsec-ferret-simsmall-2")).unwrap(), 11);
        assert_eq!(core_requirement(&name("parsec-x264-simsmall-1")).unwrap(), 1);
    }

    #[test]
    fn splash2_requirements() {
        assert_eq!(core_requirement(&name("splash2-barnes-small-7")).unwrap(), 7);
        assert_eq!(core_requirement(&name("splash2-fft-small-16")).unwrap(), 16);
        assert_eq!(core_requirement(&name("splash2-water.sp-small-4")).unwrap(), 4);
    }

    #[test]
    fn zero_entries_are_returned_verbatim() {
        assert_eq!(core_requirement(&name("parsec-fluidanimate-simsmall-3")).unwrap(), 0);
        assert_eq!(core_requirement(&name("splash2-fft-small-3")).unwrap(), 0);
        assert_eq!(core_requirement(&name("splash2-radix-small-5")).unwrap(), 0);
    }

    #[test]
    fn fluidanimate_rejects_parallelism_beyond_its_short_vector() {
        assert!(core_requirement(&name("parsec-fluidanimate-simsmall-9")).is_err());
        assert!(core_requirement(&name("parsec-fluidanimate-simsmall-16")).is_err());
    }

    #[test]
    fn rejects_unknown_names_and_bad_parallelism() {
        assert!(core_requirement(&name("spec-gcc-ref-4")).is_err());
        assert!(core_requirement(&name("parsec-vips-simsmall-4")).is_err());
        assert!(core_requirement(&name("parsec-blackscholes-simsmall-0")).is_err());
        assert!(core_requirement(&name("parsec-blackscholes-simsmall-16")).is_err());
    }
}
