//! Per-pulse accent flags within one beat

use super::meter::Subdivision;

/// Which pulses of a beat are emphasized
///
/// Index 0 is the beat itself, indices `1..len` are the intra-beat
/// subdivisions. The length always matches the current subdivision.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct AccentMap(Vec<bool>);

impl AccentMap {
    /// Default map for a subdivision: the beat accented, everything else not
    pub fn for_subdivision(subdivision: Subdivision) -> Self {
        Self((0..subdivision.count()).map(|i| i == 0).collect())
    }

    /// Build a map from an explicit pattern, padding with `false` or
    /// truncating so the length matches `subdivision`
    pub fn from_pattern(pattern: &[bool], subdivision: Subdivision) -> Self {
        let mut flags = pattern.to_vec();
        flags.resize(subdivision.count(), false);
        Self(flags)
    }

    /// Whether pulse `index` is accented; out-of-range indices are not
    pub fn is_accented(&self, index: usize) -> bool {
        self.0.get(index).copied().unwrap_or(false)
    }

    /// Flip the flag at `index`. Returns false (and changes nothing) when the
    /// index is out of range.
    pub fn toggle(&mut self, index: usize) -> bool {
        match self.0.get_mut(index) {
            Some(flag) => {
                *flag = !*flag;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }
}

impl Default for AccentMap {
    fn default() -> Self {
        Self::for_subdivision(Subdivision::default())
    }
}
