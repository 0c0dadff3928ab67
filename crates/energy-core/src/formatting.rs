/// Watt-seconds in one kilowatt-hour.
pub const WS_PER_KWH: f64 = 3_600_000.0;

/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use energy_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5,  1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let factor = 10_f64.powi(decimals as i32);
    let abs_value = value.abs();
    // Half-ULP nudge so exact midpoints such as 1.005 round up.
    let epsilon = f64::EPSILON * abs_value * factor;
    let rounded = ((abs_value * factor) + epsilon).round() / factor;

    let grouped = group_thousands(&(rounded.trunc() as u64).to_string());
    let body = if decimals == 0 {
        grouped
    } else {
        let frac = format!("{:.prec$}", rounded.fract(), prec = decimals as usize);
        // `frac` looks like "0.50"; keep ".50".
        format!("{}{}", grouped, &frac[1..])
    };

    if value < 0.0 && rounded != 0.0 {
        format!("-{}", body)
    } else {
        body
    }
}

/// Format an energy amount in watt-seconds, e.g. `"1,234.50 Ws"`.
pub fn format_energy(ws: f64) -> String {
    format!("{} Ws", format_number(ws, 2))
}

/// Format an energy amount in kilowatt-hours with three decimals.
///
/// ```
/// use energy_core::formatting::format_energy_kwh;
///
/// assert_eq!(format_energy_kwh(7_200_000.0), "2.000 kWh");
/// ```
pub fn format_energy_kwh(ws: f64) -> String {
    format!("{} kWh", format_number(ws / WS_PER_KWH, 3))
}

/// Format a block duration in seconds, or `"open"` when it has no end.
///
/// * `< 60` seconds → `"45s"`
/// * `< 1` hour → `"2m 5s"`
/// * otherwise → `"1h 2m 5s"`
pub fn format_duration(seconds: Option<f64>) -> String {
    let Some(secs) = seconds else {
        return "open".to_string();
    };
    let total = secs.round() as i64;
    let sign = if total < 0 { "-" } else { "" };
    let total = total.abs();
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{sign}{h}h {m}m {s}s")
    } else if m > 0 {
        format!("{sign}{m}m {s}s")
    } else {
        format!("{sign}{s}s")
    }
}

fn group_thousands(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + s.len() / 3);
    let lead = s.len() % 3;
    for (i, c) in s.chars().enumerate() {
        if i != 0 && i % 3 == lead {
            out.push(',');
        }
        out.push(c);
    }
    out
}
