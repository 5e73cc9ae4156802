use itertools::Itertools;

/// Zero-padded `HH:MM:SS`.
pub fn format_hms(seconds: u64) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    [h, m, s].iter().map(|v| format!("{v:02}")).join(":")
}

/// Zero-padded `MM:SS`. There is no hour field: past 59 minutes the minute
/// count keeps growing (`65:00`), which is acceptable for per-question times.
pub fn format_ms(seconds: u64) -> String {
    let m = seconds / 60;
    let s = seconds % 60;
    [m, s].iter().map(|v| format!("{v:02}")).join(":")
}
