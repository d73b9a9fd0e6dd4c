use crate::mass::{residue_mass, round_to, MassKey, CTERM_OH, NTERM_H, VALID_AA};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::str::FromStr;

/// Known N-terminal mass that the localization stage and the search engine
/// round differently. Only this single value is retried.
const NTERM_ALTERNATE: f64 = 305.2150;

/// Where a modification can occur
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Site {
    Residue(u8),
    NTerm,
    CTerm,
}

impl Site {
    /// Parse the single-letter terminus designation used by terminal
    /// modification catalogs (`n` or `c`, case-insensitive)
    pub fn terminus(s: &str) -> Result<Site, InvalidModification> {
        match s.trim() {
            "n" | "N" => Ok(Site::NTerm),
            "c" | "C" => Ok(Site::CTerm),
            "" => Err(InvalidModification::Empty),
            other => Err(InvalidModification::InvalidTerminus(other.into())),
        }
    }

    /// Mass of the unmodified residue or terminal group
    pub fn unmodified_mass(&self) -> Option<f64> {
        match self {
            Site::Residue(aa) => residue_mass(*aa),
            Site::NTerm => Some(NTERM_H),
            Site::CTerm => Some(CTERM_OH),
        }
    }
}

impl std::fmt::Display for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Site::Residue(r) => f.write_char(*r as char),
            Site::NTerm => f.write_str("N-term"),
            Site::CTerm => f.write_str("C-term"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InvalidModification {
    Empty,
    InvalidResidue(char),
    InvalidTerminus(String),
    TooLong(String),
}

impl std::fmt::Display for InvalidModification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidModification::Empty => write!(f, "empty modification site"),
            InvalidModification::InvalidResidue(c) => write!(f, "unrecognized residue ({})", c),
            InvalidModification::InvalidTerminus(s) => write!(f, "unrecognized terminus ({})", s),
            InvalidModification::TooLong(s) => write!(f, "{} is too long", s),
        }
    }
}

impl FromStr for Site {
    type Err = InvalidModification;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("n-term") {
            return Ok(Site::NTerm);
        }
        if s.eq_ignore_ascii_case("c-term") {
            return Ok(Site::CTerm);
        }
        if s.len() > 1 {
            return Err(InvalidModification::TooLong(s.into()));
        }
        match s.chars().next() {
            Some(c) => {
                let aa = c.to_ascii_uppercase() as u8;
                if VALID_AA.contains(&aa) {
                    Ok(Site::Residue(aa))
                } else {
                    Err(InvalidModification::InvalidResidue(c))
                }
            }
            None => Err(InvalidModification::Empty),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModificationKind {
    /// Matches an entry of the search engine's modification catalog
    Assigned,
    /// Mass difference without a catalog match
    Observed,
}

/// Identity of a modification within an index
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModKey {
    /// Catalog entry: residue (or terminus) and total modified mass
    Catalog { site: Site, mass: MassKey },
    /// Catalog entry placed on a 1-based peptide position
    Localized {
        site: Site,
        position: u16,
        mass: MassKey,
    },
    /// Unassigned mass difference
    Observed { delta: MassKey },
}

impl std::fmt::Display for ModKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModKey::Catalog { site, mass } => write!(f, "{}#{}", site, mass),
            ModKey::Localized {
                site,
                position,
                mass,
            } => write!(f, "{}#{}#{}", site, position, mass),
            ModKey::Observed { delta } => write!(f, "{}", delta),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Modification {
    pub key: ModKey,
    pub name: String,
    pub kind: ModificationKind,
    pub site: Option<Site>,
    pub position: Option<u16>,
    pub monoisotopic_mass: f64,
    pub mass_diff: f64,
    pub variable: bool,
    pub protein_terminus: bool,
}

impl Modification {
    /// Catalog entry as declared in a search summary
    pub fn catalog(
        site: Site,
        mass: f64,
        mass_diff: f64,
        variable: bool,
        protein_terminus: bool,
    ) -> Self {
        Modification {
            key: ModKey::Catalog {
                site,
                mass: MassKey::new(mass),
            },
            name: String::new(),
            kind: ModificationKind::Assigned,
            site: Some(site),
            position: None,
            monoisotopic_mass: mass,
            mass_diff: round_to(mass_diff, 4),
            variable,
            protein_terminus,
        }
    }

    /// Placeholder for a mass difference that has no catalog entry
    pub fn observed(delta: f64) -> Self {
        Modification {
            key: ModKey::Observed {
                delta: MassKey::new(delta),
            },
            name: "Unknown".into(),
            kind: ModificationKind::Observed,
            site: None,
            position: None,
            monoisotopic_mass: 0.0,
            mass_diff: round_to(delta, 4),
            variable: false,
            protein_terminus: false,
        }
    }

    /// Copy of a catalog entry pinned to a peptide position. The key keeps
    /// the mass reported for the position, not the catalog mass.
    fn localize(&self, position: u16, mass: f64) -> Self {
        let mut m = self.clone();
        m.key = ModKey::Localized {
            site: self.site.unwrap_or(Site::NTerm),
            position,
            mass: MassKey::new(mass),
        };
        m.position = Some(position);
        m
    }

    /// Text used in the "Assigned Modifications" report column
    pub fn assigned_label(&self) -> Option<String> {
        if self.kind != ModificationKind::Assigned {
            return None;
        }
        let label = match (self.site, self.position) {
            (Some(site @ Site::Residue(_)), Some(pos)) => {
                format!("{}{}({:.4})", pos, site, self.mass_diff)
            }
            (Some(site), _) => format!("{}({:.4})", site, self.mass_diff),
            (None, _) => format!("({:.4})", self.mass_diff),
        };
        Some(label)
    }

    /// Text used in the "Observed Modifications" report column. Zero mass
    /// differences carry no information and are not reported.
    pub fn observed_label(&self) -> Option<String> {
        match self.key {
            ModKey::Observed { delta } if self.kind == ModificationKind::Observed => {
                if delta == MassKey(0) {
                    None
                } else {
                    Some(delta.to_string())
                }
            }
            _ => None,
        }
    }
}

/// Modifications keyed by identity. Insertion never overwrites: the first
/// entry stored under a key wins.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Modification>", into = "Vec<Modification>")]
pub struct ModificationIndex {
    entries: BTreeMap<ModKey, Modification>,
}

impl From<Vec<Modification>> for ModificationIndex {
    fn from(mods: Vec<Modification>) -> Self {
        let mut index = ModificationIndex::default();
        for m in mods {
            index.insert(m);
        }
        index
    }
}

impl From<ModificationIndex> for Vec<Modification> {
    fn from(index: ModificationIndex) -> Self {
        index.entries.into_values().collect()
    }
}

impl FromIterator<Modification> for ModificationIndex {
    fn from_iter<I: IntoIterator<Item = Modification>>(iter: I) -> Self {
        let mut index = ModificationIndex::default();
        for m in iter {
            index.insert(m);
        }
        index
    }
}

impl ModificationIndex {
    /// Insert `m` unless its key is already present. Returns true if inserted
    pub fn insert(&mut self, m: Modification) -> bool {
        match self.entries.entry(m.key) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(v) => {
                v.insert(m);
                true
            }
        }
    }

    /// Union with `other`, keeping existing entries on key collision
    pub fn merge(&mut self, other: &ModificationIndex) {
        for m in other.entries.values() {
            self.insert(m.clone());
        }
    }

    pub fn get(&self, key: &ModKey) -> Option<&Modification> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &ModKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Modification> {
        self.entries.values()
    }

    pub fn lookup(&self, site: Site, mass: MassKey) -> Option<&Modification> {
        self.entries.get(&ModKey::Catalog { site, mass })
    }

    /// Resolve the modified mass reported at a 1-based peptide position.
    ///
    /// Exact 4-decimal matches are tried first, then one unit above and one
    /// unit below, absorbing rounding drift between producers. Without any
    /// match an `Observed` entry for the mass difference is returned.
    pub fn resolve_residue(&self, residue: u8, position: u16, mass: f64) -> Modification {
        let site = Site::Residue(residue.to_ascii_uppercase());
        let key = MassKey::new(mass);
        let found = self
            .lookup(site, key)
            .or_else(|| self.lookup(site, key.offset(1)))
            .or_else(|| self.lookup(site, key.offset(-1)));

        match found {
            Some(m) => m.localize(position, mass),
            None => {
                log::trace!(
                    "no catalog entry for {}{} at {:.4}",
                    position,
                    site,
                    mass
                );
                let base = site.unmodified_mass().unwrap_or(0.0);
                Modification::observed(mass - base)
            }
        }
    }

    /// Resolve a peptide-terminal modified mass
    pub fn resolve_terminal(&self, site: Site, mass: f64) -> Modification {
        let key = MassKey::new(mass);
        let found = self.lookup(site, key).or_else(|| {
            if site == Site::NTerm && mass.trunc() == NTERM_ALTERNATE.trunc() {
                self.lookup(site, MassKey::new(NTERM_ALTERNATE))
            } else {
                None
            }
        });

        match found {
            Some(m) => m.clone(),
            None => {
                let base = site.unmodified_mass().unwrap_or(0.0);
                Modification::observed(mass - base)
            }
        }
    }

    /// Sorted (assigned, observed) report labels
    pub fn labels(&self) -> (Vec<String>, Vec<String>) {
        let mut assigned = self
            .entries
            .values()
            .filter_map(Modification::assigned_label)
            .collect::<Vec<_>>();
        let mut observed = self
            .entries
            .values()
            .filter_map(Modification::observed_label)
            .collect::<Vec<_>>();
        assigned.sort();
        observed.sort();
        (assigned, observed)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn catalog() -> ModificationIndex {
        let mut index = ModificationIndex::default();
        index.insert(Modification::catalog(
            Site::Residue(b'M'),
            147.0354,
            15.9949,
            true,
            false,
        ));
        index.insert(Modification::catalog(
            Site::Residue(b'C'),
            160.0307,
            57.0215,
            false,
            false,
        ));
        index.insert(Modification::catalog(
            Site::NTerm,
            305.2150,
            304.2071,
            false,
            false,
        ));
        index
    }

    #[test]
    fn parse_sites() {
        use InvalidModification::*;
        assert_eq!("M".parse::<Site>(), Ok(Site::Residue(b'M')));
        assert_eq!("m".parse::<Site>(), Ok(Site::Residue(b'M')));
        assert_eq!("N-term".parse::<Site>(), Ok(Site::NTerm));
        assert_eq!("c-term".parse::<Site>(), Ok(Site::CTerm));
        assert_eq!("Z".parse::<Site>(), Err(InvalidResidue('Z')));
        assert_eq!("".parse::<Site>(), Err(Empty));
        assert_eq!("MK".parse::<Site>(), Err(TooLong("MK".into())));
        assert_eq!(Site::terminus("n"), Ok(Site::NTerm));
        assert_eq!(Site::terminus("C"), Ok(Site::CTerm));
    }

    #[test]
    fn key_text() {
        let m = &catalog();
        let ox = m.lookup(Site::Residue(b'M'), MassKey::new(147.0354)).unwrap();
        assert_eq!(ox.key.to_string(), "M#147.0354");
        assert_eq!(ox.localize(3, 147.0354).key.to_string(), "M#3#147.0354");
        assert_eq!(Modification::observed(0.98402).key.to_string(), "0.9840");
    }

    #[test]
    fn first_entry_wins() {
        let mut index = catalog();
        let mut dup = Modification::catalog(Site::Residue(b'M'), 147.0354, 99.0, true, false);
        dup.name = "duplicate".into();
        assert!(!index.insert(dup));
        let m = index
            .lookup(Site::Residue(b'M'), MassKey::new(147.0354))
            .unwrap();
        assert_eq!(m.mass_diff, 15.9949);
    }

    #[test]
    fn residue_rounding_retry() {
        let index = catalog();
        let m = index.resolve_residue(b'M', 4, 147.0353);
        assert_eq!(m.kind, ModificationKind::Assigned);
        assert_eq!(m.position, Some(4));
        assert_eq!(m.key.to_string(), "M#4#147.0353");

        let m = index.resolve_residue(b'M', 4, 147.0355);
        assert_eq!(m.kind, ModificationKind::Assigned);

        // two units away is not absorbed
        let m = index.resolve_residue(b'M', 4, 147.0356);
        assert_eq!(m.kind, ModificationKind::Observed);
        assert_eq!(m.observed_label(), Some("15.9951".into()));
    }

    #[test]
    fn nterm_alternate_mass() {
        let index = catalog();
        let m = index.resolve_terminal(Site::NTerm, 305.2138);
        assert_eq!(m.kind, ModificationKind::Assigned);
        assert_eq!(m.assigned_label(), Some("N-term(304.2071)".into()));

        let m = index.resolve_terminal(Site::NTerm, 43.0184);
        assert_eq!(m.kind, ModificationKind::Observed);
    }

    #[test]
    fn report_labels() {
        let index = catalog();
        let mut psm_mods = ModificationIndex::default();
        psm_mods.insert(index.resolve_residue(b'M', 7, 147.0354));
        psm_mods.insert(index.resolve_residue(b'C', 2, 160.0307));
        psm_mods.insert(Modification::observed(0.0));
        psm_mods.insert(Modification::observed(-17.0265));
        let (assigned, observed) = psm_mods.labels();
        assert_eq!(assigned, vec!["2C(57.0215)", "7M(15.9949)"]);
        assert_eq!(observed, vec!["-17.0265"]);
    }
}
