use crate::collectors::oid;
use crate::collectors::CounterSource;
use crate::config::SnmpConfig;
use crate::counters::{CodeSegment, Observation, Table};
use crate::error::ReadError;
use crate::rules::Policy;
use log::debug;
use std::process::{Command, Stdio};

/// Counter source that reads the Cx statistics from the local SNMP agent
///
/// Spawns the net-snmp `snmpwalk` and `snmpget` tools for every read and parses
/// their numeric (`-On -Oq`) output. Each read is bounded by the configured
/// SNMP timeout and retry count, so a dead agent surfaces as a failed command
/// rather than a hang.
pub struct SnmpCollector {
    config: SnmpConfig,
}

impl SnmpCollector {
    /// Create a new SnmpCollector
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use cx_health::collectors::{CounterSource, SnmpCollector};
    /// use cx_health::config::SnmpConfig;
    /// use cx_health::counters::Table;
    ///
    /// let collector = SnmpCollector::new(SnmpConfig::default());
    /// let timeouts = collector.read_timeouts(Table::Mar);
    /// ```
    pub fn new(config: SnmpConfig) -> Self {
        Self { config }
    }

    /// Arguments shared by `snmpwalk` and `snmpget`, up to and including the host
    fn common_args(&self) -> Vec<String> {
        vec![
            "-v".to_string(),
            self.config.version.clone(),
            "-c".to_string(),
            self.config
                .community
                .clone()
                .unwrap_or_else(|| Policy::default().default_community().to_string()),
            // Numeric OIDs, "OID value" lines, no enum labels
            "-On".to_string(),
            "-Oq".to_string(),
            "-Oe".to_string(),
            "-t".to_string(),
            self.config.timeout_seconds.to_string(),
            "-r".to_string(),
            self.config.retries.to_string(),
            self.config.host.clone(),
        ]
    }

    /// Run an SNMP tool against `oid` and return its stdout
    fn run(&self, program: &str, oid: &str) -> Result<String, ReadError> {
        debug!("Running {} for {}", program, oid);

        let output = Command::new(program)
            .args(self.common_args())
            .arg(oid)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ReadError::SubprocessSpawn(format!("{}: {}", program, e)))?;

        if !output.status.success() {
            return Err(ReadError::CommandFailed {
                command: format!("{} {}", program, oid),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl CounterSource for SnmpCollector {
    fn read_counters(
        &self,
        table: Table,
        segment: CodeSegment,
    ) -> Result<Vec<Observation>, ReadError> {
        let segment_oid = oid::segment_oid(table, segment);
        let output = self.run(&self.config.walk_command, &segment_oid)?;
        parse_walk_output(table, segment, &output)
    }

    fn read_timeouts(&self, table: Table) -> Result<u64, ReadError> {
        let timeouts_oid = oid::timeouts_oid(table);
        let output = self.run(&self.config.get_command, &timeouts_oid)?;
        let timeouts = parse_get_output(&timeouts_oid, &output)?;
        debug!("Got value {} for timeout OID {}", timeouts, timeouts_oid);
        Ok(timeouts)
    }
}

/// Parse the output of a walk over one table segment
///
/// The result code is the final OID element below the segment OID, e.g.
/// `.1.2.826.0.1.1578918.9.5.10.1.4.3.0.2001 5` is 5 responses with code 2001.
/// A "no such object" reply means the segment holds no counters yet.
pub fn parse_walk_output(
    table: Table,
    segment: CodeSegment,
    output: &str,
) -> Result<Vec<Observation>, ReadError> {
    let prefix = format!("{}.", oid::segment_oid(table, segment));
    let mut observations = Vec::new();

    for line in output.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let (raw_oid, raw_value) = split_line(line);
        if is_missing(raw_value) {
            debug!("No counters under {}: {}", raw_oid, raw_value);
            continue;
        }

        let full_oid = oid::normalize(raw_oid);
        let code = full_oid
            .strip_prefix(&prefix)
            .and_then(|suffix| suffix.parse::<u32>().ok())
            .ok_or_else(|| ReadError::MalformedIdentifier(full_oid.clone()))?;
        let count = parse_count(&full_oid, raw_value)?;

        debug!("Extracted retcode {} and count {} from {}", code, count, full_oid);
        observations.push(Observation::new(table, segment, code, count));
    }

    Ok(observations)
}

/// Parse the output of a get for a single counter
pub fn parse_get_output(expected_oid: &str, output: &str) -> Result<u64, ReadError> {
    let line = output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| ReadError::MissingValue(expected_oid.to_string()))?;

    let (raw_oid, raw_value) = split_line(line);
    if is_missing(raw_value) {
        return Err(ReadError::MissingValue(expected_oid.to_string()));
    }

    let full_oid = oid::normalize(raw_oid);
    if full_oid != expected_oid {
        return Err(ReadError::MalformedIdentifier(full_oid));
    }

    parse_count(&full_oid, raw_value)
}

/// Split an output line into OID and value, accepting both the `-Oq`
/// "OID value" form and the default "OID = TYPE: value" form
fn split_line(line: &str) -> (&str, &str) {
    let split = line
        .split_once(" = ")
        .or_else(|| line.split_once(char::is_whitespace));

    match split {
        Some((oid, value)) => (oid.trim(), value.trim()),
        None => (line, ""),
    }
}

fn is_missing(value: &str) -> bool {
    value.starts_with("No Such Object")
        || value.starts_with("No Such Instance")
        || value.starts_with("No more variables")
}

/// Parse a counter value, dropping any `Counter32:`-style type prefix
fn parse_count(oid: &str, raw_value: &str) -> Result<u64, ReadError> {
    let value = raw_value
        .rsplit_once(": ")
        .map_or(raw_value, |(_, value)| value)
        .trim();

    value.parse::<u64>().map_err(|_| ReadError::MalformedValue {
        oid: oid.to_string(),
        value: raw_value.to_string(),
    })
}
