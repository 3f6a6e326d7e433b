//! Human-readable rendering of byte sizes and transfer speeds.

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

/// `-` for zero/absent, otherwise B/s, KB/s, or MB/s with two decimals.
pub fn format_speed(bytes_per_sec: Option<f64>) -> String {
    match bytes_per_sec {
        None => "-".to_string(),
        Some(speed) if speed <= 0.0 => "-".to_string(),
        Some(speed) if speed >= MIB => format!("{:.2} MB/s", speed / MIB),
        Some(speed) if speed >= KIB => format!("{:.2} KB/s", speed / KIB),
        Some(speed) => format!("{speed:.0} B/s"),
    }
}

/// Size with the largest fitting unit, one decimal, trailing zeros trimmed.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let exponent = (bytes as f64).log(KIB).floor().min(3.0) as usize;
    let value = bytes as f64 / KIB.powi(exponent as i32);
    let rendered = format!("{value:.1}");
    let rendered = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", rendered, UNITS[exponent])
}

/// `-` for absent, otherwise seconds with two decimals.
pub fn format_elapsed(elapsed: Option<std::time::Duration>) -> String {
    match elapsed {
        None => "-".to_string(),
        Some(elapsed) => format!("{:.2}s", elapsed.as_secs_f64()),
    }
}
