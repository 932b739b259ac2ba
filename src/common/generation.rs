// src/common/generation.rs

use std::collections::HashMap;
use std::hash::Hash;

/// Contador de geração por contexto de consulta.
///
/// Cada carga emitida recebe um número crescente; quando a resposta volta, só é
/// aplicada se ainda for a última emitida para aquele contexto. Respostas antigas
/// que chegam depois de uma mais nova são descartadas.
#[derive(Debug, Default)]
pub struct GenerationCounter<K> {
    latest: HashMap<K, u64>,
}

impl<K: Eq + Hash> GenerationCounter<K> {
    pub fn issue(&mut self, key: K) -> u64 {
        let next = self.latest.entry(key).or_insert(0);
        *next += 1;
        *next
    }

    pub fn is_current(&self, key: &K, generation: u64) -> bool {
        self.latest.get(key) == Some(&generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_latest_generation_is_current() {
        let mut counter = GenerationCounter::default();
        let first = counter.issue("students");
        let second = counter.issue("students");

        assert!(second > first);
        assert!(!counter.is_current(&"students", first));
        assert!(counter.is_current(&"students", second));
    }

    #[test]
    fn contexts_are_independent() {
        let mut counter = GenerationCounter::default();
        let a = counter.issue(1u32);
        let b = counter.issue(2u32);
        assert!(counter.is_current(&1, a));
        assert!(counter.is_current(&2, b));
        assert!(!counter.is_current(&3, 1));
    }
}
