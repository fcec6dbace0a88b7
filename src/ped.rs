//! Pedigree representation and PLINK PED parsing.

use indexmap::IndexMap;

/// Enumeration for the sex of an individual.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Sex {
    /// Sex is unknown.
    #[default]
    Unknown,
    /// Male.
    Male,
    /// Female.
    Female,
}

impl Sex {
    /// Convert from the PED integer encoding.
    pub fn from_ped_code(code: i32) -> Self {
        match code {
            1 => Sex::Male,
            2 => Sex::Female,
            _ => Sex::Unknown,
        }
    }
}

/// Enumeration for the disease state of an individual.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Disease {
    /// Disease state is unknown.
    #[default]
    Unknown,
    /// The individual is unaffected.
    Unaffected,
    /// The individual is affected.
    Affected,
}

impl Disease {
    /// Convert from the PED integer encoding.
    pub fn from_ped_code(code: i32) -> Self {
        match code {
            1 => Disease::Unaffected,
            2 => Disease::Affected,
            _ => Disease::Unknown,
        }
    }
}

/// One individual in a pedigree.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Individual {
    /// Name of the family.
    pub family: String,
    /// Name of the individual, also the sample name in the genotype data.
    pub name: String,
    /// Name of the father, if any.
    pub father: Option<String>,
    /// Name of the mother, if any.
    pub mother: Option<String>,
    /// Sex of the individual.
    pub sex: Sex,
    /// Disease state of the individual.
    pub disease: Disease,
    /// Whether genotype data is available for this individual.
    pub has_gt_data: bool,
}

/// Supporting code for `Pedigree`.
pub(crate) mod pedigree {
    /// Error type for `Pedigree::from_ped_str()` and friends.
    #[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
    pub enum Error {
        #[error("PED line has {0} columns, expected at least 6")]
        MissingColumns(usize),
        #[error("invalid integer column in PED line: {0}")]
        InvalidIntColumn(String),
        #[error("duplicate individual in pedigree: {0}")]
        DuplicateIndividual(String),
        #[error("unknown parent {parent} of individual {individual}")]
        UnknownParent { individual: String, parent: String },
    }
}

/// A pedigree, individuals keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Pedigree {
    /// Mapping from individual name to individual.
    pub individuals: IndexMap<String, Individual>,
}

impl Pedigree {
    /// Parse a pedigree from PLINK PED format.
    ///
    /// Columns are `family name father mother sex disease`, whitespace
    /// separated, `0` denoting an absent parent.  Lines starting with `#`
    /// are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed lines, duplicate individuals, or parent
    /// names that do not occur as individuals themselves.
    pub fn from_ped_str(text: &str) -> Result<Self, pedigree::Error> {
        let mut result = Self::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields = line.split_ascii_whitespace().collect::<Vec<_>>();
            if fields.len() < 6 {
                return Err(pedigree::Error::MissingColumns(fields.len()));
            }
            let parent = |s: &str| {
                if s == "0" {
                    None
                } else {
                    Some(s.to_string())
                }
            };
            let int_col = |s: &str| {
                s.parse::<i32>()
                    .map_err(|_| pedigree::Error::InvalidIntColumn(s.to_string()))
            };
            let individual = Individual {
                family: fields[0].to_string(),
                name: fields[1].to_string(),
                father: parent(fields[2]),
                mother: parent(fields[3]),
                sex: Sex::from_ped_code(int_col(fields[4])?),
                disease: Disease::from_ped_code(int_col(fields[5])?),
                has_gt_data: true,
            };
            if result.individuals.contains_key(&individual.name) {
                return Err(pedigree::Error::DuplicateIndividual(individual.name));
            }
            result
                .individuals
                .insert(individual.name.clone(), individual);
        }
        result.check_parents()?;
        Ok(result)
    }

    /// Check that all parent links resolve to individuals in the pedigree.
    fn check_parents(&self) -> Result<(), pedigree::Error> {
        for individual in self.individuals.values() {
            for parent in [&individual.father, &individual.mother].into_iter().flatten() {
                if !self.individuals.contains_key(parent) {
                    return Err(pedigree::Error::UnknownParent {
                        individual: individual.name.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Return the names of all individuals, in pedigree order.
    pub fn sample_names(&self) -> Vec<String> {
        self.individuals.keys().cloned().collect()
    }

    /// Return the father of the given individual, if recorded.
    pub fn father_of(&self, name: &str) -> Option<&Individual> {
        self.individuals
            .get(name)
            .and_then(|individual| individual.father.as_deref())
            .and_then(|father| self.individuals.get(father))
    }

    /// Return the mother of the given individual, if recorded.
    pub fn mother_of(&self, name: &str) -> Option<&Individual> {
        self.individuals
            .get(name)
            .and_then(|individual| individual.mother.as_deref())
            .and_then(|mother| self.individuals.get(mother))
    }

    /// Return the union of two pedigrees, e.g., for project-wide queries.
    ///
    /// Individuals occurring in both pedigrees are taken from `self`.
    pub fn union(&self, other: &Pedigree) -> Pedigree {
        let mut individuals = self.individuals.clone();
        for (name, individual) in &other.individuals {
            individuals
                .entry(name.clone())
                .or_insert_with(|| individual.clone());
        }
        Pedigree { individuals }
    }
}
