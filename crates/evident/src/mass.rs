use serde::{Deserialize, Serialize};

pub const H2O: f64 = 18.010565;
pub const PROTON: f64 = 1.00727646688;
/// Mass of the hydrogen capping an unmodified peptide N-terminus
pub const NTERM_H: f64 = 1.007825;
/// Mass of the hydroxyl capping an unmodified peptide C-terminus
pub const CTERM_OH: f64 = 17.002740;

pub const VALID_AA: [u8; 22] = [
    b'A', b'C', b'D', b'E', b'F', b'G', b'H', b'I', b'K', b'L', b'M', b'N', b'P', b'Q', b'R', b'S',
    b'T', b'V', b'W', b'Y', b'U', b'O',
];

/// Monoisotopic residue mass of an amino acid, if it is one of the
/// standard (or selenocysteine/pyrrolysine) residues
pub fn residue_mass(aa: u8) -> Option<f64> {
    let mass = match aa.to_ascii_uppercase() {
        b'A' => 71.03711,
        b'R' => 156.10111,
        b'N' => 114.04293,
        b'D' => 115.02694,
        b'C' => 103.00919,
        b'E' => 129.04259,
        b'Q' => 128.05858,
        b'G' => 57.02146,
        b'H' => 137.05891,
        b'I' => 113.08406,
        b'L' => 113.08406,
        b'K' => 128.09496,
        b'M' => 131.04049,
        b'F' => 147.06841,
        b'P' => 97.05276,
        b'S' => 87.03203,
        b'T' => 101.04768,
        b'W' => 186.07931,
        b'Y' => 163.06333,
        b'V' => 99.06841,
        b'U' => 150.95363,
        b'O' => 237.14773,
        _ => return None,
    };
    Some(mass)
}

/// Convert a neutral mass into the m/z of the `charge`-protonated ion
pub fn mz(neutral_mass: f64, charge: u8) -> f64 {
    if charge == 0 {
        return neutral_mass;
    }
    (neutral_mass + charge as f64 * PROTON) / charge as f64
}

/// Round to a fixed number of decimal places, half away from zero
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// A mass rounded to 4 decimal places and stored as a fixed-point integer.
///
/// Every mass-based join in the pipeline goes through this type, so two
/// masses that format identically with `{:.4}` always compare equal.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MassKey(pub i64);

impl MassKey {
    const SCALE: f64 = 10_000.0;

    pub fn new(mass: f64) -> Self {
        MassKey((mass * Self::SCALE).round() as i64)
    }

    pub fn value(&self) -> f64 {
        self.0 as f64 / Self::SCALE
    }

    /// Shift the key by `steps` units of the last decimal place
    pub fn offset(&self, steps: i64) -> Self {
        MassKey(self.0 + steps)
    }
}

impl From<f64> for MassKey {
    fn from(mass: f64) -> Self {
        MassKey::new(mass)
    }
}

impl std::fmt::Display for MassKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:04}", sign, abs / 10_000, abs % 10_000)
    }
}
