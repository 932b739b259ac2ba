// src/common/protocol.rs

/// Protocolo de solicitação unificada: ano + sequência com 6 dígitos (ex: `2026000042`).
pub fn request_protocol(year: i32, seq: i64) -> String {
    format!("{}{:06}", year, seq)
}

/// Protocolo da ouvidoria: `OUV-2026-000042`.
pub fn ouvidoria_protocol(year: i32, seq: i64) -> String {
    format!("OUV-{}-{:06}", year, seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_sequence() {
        assert_eq!(request_protocol(2026, 42), "2026000042");
        assert_eq!(ouvidoria_protocol(2026, 7), "OUV-2026-000007");
    }

    #[test]
    fn long_sequences_are_not_truncated() {
        assert_eq!(request_protocol(2026, 1_234_567), "20261234567");
    }
}
