//! Per-step telemetry.
//!
//! Outputs CSV data for analysis. Supports multiple output destinations via
//! the `TelemetryOutput` trait.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use glam::Vec3;

/// Aggregate state of one simulation step.
pub struct TelemetrySnapshot {
    pub elapsed: f32,
    pub dt: f32,
    pub active: usize,
    pub consumed_total: usize,
    pub consumed_step: usize,
    pub forces: usize,
    pub fallback_used: bool,
    pub min_distance: f32,
    pub mean_distance: f32,
    pub mean_radial_accel: f32,
    pub max_accel: f32,
    pub mean_speed: f32,
    pub mean_tangential_speed: f32,
    /// Net acceleration applied across all bodies this step.
    pub net_accel: Vec3,
}

/// Trait for telemetry output destinations.
pub trait TelemetryOutput {
    /// Write the CSV header.
    fn write_header(&mut self, header: &str);
    /// Write a data row.
    fn write_row(&mut self, row: &str);
    /// Push buffered output to its destination.
    fn flush(&mut self) {}
}

/// Stdout output.
pub struct StdoutTelemetryOutput;

impl TelemetryOutput for StdoutTelemetryOutput {
    fn write_header(&mut self, header: &str) {
        println!("{header}");
    }

    fn write_row(&mut self, row: &str) {
        println!("{row}");
    }

    fn flush(&mut self) {
        if let Err(e) = io::stdout().flush() {
            tracing::warn!("Failed to flush telemetry: {e}");
        }
    }
}

/// File output, truncated when created.
pub struct FileTelemetryOutput {
    writer: BufWriter<File>,
}

impl FileTelemetryOutput {
    pub fn create(path: &Path) -> io::Result<Self> {
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
        })
    }
}

impl TelemetryOutput for FileTelemetryOutput {
    fn write_header(&mut self, header: &str) {
        if let Err(e) = writeln!(self.writer, "{header}") {
            tracing::warn!("Failed to write telemetry header: {e}");
        }
    }

    fn write_row(&mut self, row: &str) {
        if let Err(e) = writeln!(self.writer, "{row}") {
            tracing::warn!("Failed to write telemetry row: {e}");
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.writer.flush() {
            tracing::warn!("Failed to flush telemetry file: {e}");
        }
    }
}

/// In-memory output, used by tests.
#[derive(Default)]
pub struct MemoryTelemetryOutput {
    pub lines: Vec<String>,
    pub flushes: usize,
}

impl TelemetryOutput for MemoryTelemetryOutput {
    fn write_header(&mut self, header: &str) {
        self.lines.push(header.to_string());
    }

    fn write_row(&mut self, row: &str) {
        self.lines.push(row.to_string());
    }

    fn flush(&mut self) {
        self.flushes += 1;
    }
}

/// Discards everything.
pub struct NullTelemetryOutput;

impl TelemetryOutput for NullTelemetryOutput {
    fn write_header(&mut self, _header: &str) {}

    fn write_row(&mut self, _row: &str) {}
}

/// Macro to define CSV schema and generate telemetry functions.
///
/// This generates `reset_telemetry_to()` and `emit_telemetry_to()` from a
/// single schema definition, keeping column names and formats in sync.
macro_rules! define_telemetry {
    (
        columns: { $( $name:ident : $fmt:literal ),* $(,)? },
        prelude: |$snapshot:ident| { $( $prelude:stmt );* $(;)? },
        row_values: { $( $val:expr ),* $(,)? }
    ) => {
        /// CSV header string.
        const CSV_HEADER: &str = concat!( $( stringify!($name), "," ),* );

        /// Write the header to the specified output.
        pub fn reset_telemetry_to(output: &mut dyn TelemetryOutput) {
            output.write_header(CSV_HEADER.trim_end_matches(','));
        }

        /// Write one row to the specified output.
        pub fn emit_telemetry_to($snapshot: &TelemetrySnapshot, output: &mut dyn TelemetryOutput) {
            $( $prelude )*

            // Generate row from schema, then trim trailing comma.
            let line = format!( concat!( $( $fmt, "," ),* ), $( $val ),* );
            let line = line.trim_end_matches(',');

            output.write_row(line);
        }
    };
}

define_telemetry! {
    columns: {
        t: "{:.4}",
        dt: "{:.5}",
        active: "{}",
        consumed: "{}",
        consumed_step: "{}",
        forces: "{}",
        fallback: "{}",
        min_dist: "{:.2}",
        mean_dist: "{:.2}",
        mean_radial: "{:.1}",
        max_accel: "{:.1}",
        mean_speed: "{:.2}",
        mean_tangential: "{:.2}",
        net_x: "{:.1}",
        net_y: "{:.1}",
        net_z: "{:.1}",
    },
    prelude: |t| {
        let min_distance = if t.min_distance.is_finite() { t.min_distance } else { -1.0 };
    },
    row_values: {
        t.elapsed,
        t.dt,
        t.active,
        t.consumed_total,
        t.consumed_step,
        t.forces,
        u8::from(t.fallback_used),
        min_distance,
        t.mean_distance,
        t.mean_radial_accel,
        t.max_accel,
        t.mean_speed,
        t.mean_tangential_speed,
        t.net_accel.x,
        t.net_accel.y,
        t.net_accel.z,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> TelemetrySnapshot {
        TelemetrySnapshot {
            elapsed: 0.5,
            dt: 1.0 / 60.0,
            active: 3,
            consumed_total: 1,
            consumed_step: 1,
            forces: 3,
            fallback_used: false,
            min_distance: f32::INFINITY,
            mean_distance: 120.0,
            mean_radial_accel: 2500.0,
            max_accel: 4000.0,
            mean_speed: 12.5,
            mean_tangential_speed: 0.25,
            net_accel: Vec3::new(1.0, -2.0, 3.0),
        }
    }

    #[test]
    fn test_header_and_row_columns_match() {
        let mut output = MemoryTelemetryOutput::default();
        reset_telemetry_to(&mut output);
        emit_telemetry_to(&snapshot(), &mut output);

        assert_eq!(output.lines.len(), 2);
        let header: Vec<&str> = output.lines[0].split(',').collect();
        let row: Vec<&str> = output.lines[1].split(',').collect();
        assert_eq!(header.len(), row.len());
        assert_eq!(header[0], "t");
        assert_eq!(header[header.len() - 1], "net_z");
    }

    #[test]
    fn test_file_output_flushed_before_drop() {
        let path = std::env::temp_dir()
            .join(format!("well-sim-telemetry-{}.csv", std::process::id()));
        let mut output = FileTelemetryOutput::create(&path).unwrap();
        reset_telemetry_to(&mut output);
        emit_telemetry_to(&snapshot(), &mut output);
        output.flush();

        // Still holding the writer: contents must already be on disk.
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.starts_with("t,dt,"));

        drop(output);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_row_formatting() {
        let mut output = MemoryTelemetryOutput::default();
        emit_telemetry_to(&snapshot(), &mut output);

        assert_eq!(
            output.lines[0],
            "0.5000,0.01667,3,1,1,3,0,-1.00,120.00,2500.0,4000.0,12.50,0.25,1.0,-2.0,3.0"
        );
    }
}
