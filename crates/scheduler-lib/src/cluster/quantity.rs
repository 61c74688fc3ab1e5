//! Kubernetes resource quantity parsing

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Binary suffixes, checked before the single-letter decimal ones
const BINARY_SUFFIXES: &[(&str, f64)] = &[
    ("Ki", 1024.0),
    ("Mi", 1024.0 * 1024.0),
    ("Gi", GIB),
    ("Ti", GIB * 1024.0),
    ("Pi", GIB * 1024.0 * 1024.0),
    ("Ei", GIB * 1024.0 * 1024.0 * 1024.0),
];

/// Decimal suffixes as powers of ten
const DECIMAL_SUFFIXES: &[(&str, i32)] = &[
    ("n", -9),
    ("u", -6),
    ("m", -3),
    ("k", 3),
    ("K", 3),
    ("M", 6),
    ("G", 9),
    ("T", 12),
    ("P", 15),
    ("E", 18),
];

/// Parse a quantity such as `500m`, `16Gi` or `123456` into base units
pub fn parse_quantity(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for (suffix, factor) in BINARY_SUFFIXES {
        if let Some(value) = s.strip_suffix(suffix).and_then(|n| n.parse::<f64>().ok()) {
            return finite(value * factor);
        }
    }

    for (suffix, exponent) in DECIMAL_SUFFIXES {
        // "1E" is exa, but "1e3" is a plain exponent handled below
        if let Some(value) = s.strip_suffix(suffix).and_then(|n| n.parse::<f64>().ok()) {
            let scale = 10f64.powi(exponent.abs());
            return finite(if *exponent < 0 { value / scale } else { value * scale });
        }
    }

    s.parse::<f64>().ok().and_then(finite)
}

/// CPU quantity in cores
pub fn cpu_cores(raw: &str) -> Option<f64> {
    parse_quantity(raw)
}

/// Memory quantity in GB (2^30 bytes)
pub fn memory_gb(raw: &str) -> Option<f64> {
    parse_quantity(raw).map(|bytes| bytes / GIB)
}

fn finite(value: f64) -> Option<f64> {
    (value.is_finite() && value >= 0.0).then_some(value)
}
