//! Code for sorting `VariantRecord`s by HGNC ID or coordinate.

use crate::common::chrom_no;

use super::schema::data::VariantRecord;

/// Helper wrapper that allows to sort `VariantRecord` by HGNC ID, then
/// coordinate.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ByHgncId {
    pub hgnc_id: String,
    pub seqvar: VariantRecord,
}

impl From<VariantRecord> for ByHgncId {
    fn from(val: VariantRecord) -> Self {
        Self {
            hgnc_id: val.hgnc_id().unwrap_or_default().to_string(),
            seqvar: val,
        }
    }
}

impl ByHgncId {
    fn sort_key(&self) -> (&String, usize, i32, &String, &String) {
        (
            &self.hgnc_id,
            chrom_no(&self.seqvar.chrom),
            self.seqvar.pos,
            &self.seqvar.reference,
            &self.seqvar.alternative,
        )
    }
}

impl PartialEq for ByHgncId {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for ByHgncId {}

impl PartialOrd for ByHgncId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ByHgncId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// Helper wrapper that allows to sort `VariantRecord` by coordinate.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ByCoordinate {
    pub coordinate: (usize, i32, String, String),
    pub seqvar: VariantRecord,
}

impl From<VariantRecord> for ByCoordinate {
    fn from(val: VariantRecord) -> Self {
        Self {
            coordinate: (
                chrom_no(&val.chrom),
                val.pos,
                val.reference.clone(),
                val.alternative.clone(),
            ),
            seqvar: val,
        }
    }
}

impl PartialEq for ByCoordinate {
    fn eq(&self, other: &Self) -> bool {
        self.coordinate == other.coordinate
    }
}

impl Eq for ByCoordinate {}

impl PartialOrd for ByCoordinate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ByCoordinate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.coordinate.cmp(&other.coordinate)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::query::schema::data::test::record_with_genotypes;

    #[test]
    fn by_coordinate_orders_chromosomes_numerically() {
        let mut records = vec![
            super::ByCoordinate::from(record_with_genotypes("chrX", 1, "A", "G", "HGNC:1", &[])),
            super::ByCoordinate::from(record_with_genotypes("10", 5, "A", "G", "HGNC:1", &[])),
            super::ByCoordinate::from(record_with_genotypes("2", 7, "A", "G", "HGNC:1", &[])),
            super::ByCoordinate::from(record_with_genotypes("2", 3, "A", "G", "HGNC:1", &[])),
        ];

        records.sort();

        let order = records
            .iter()
            .map(|record| (record.seqvar.chrom.clone(), record.seqvar.pos))
            .collect::<Vec<_>>();
        assert_eq!(
            order,
            vec![
                ("2".to_string(), 3),
                ("2".to_string(), 7),
                ("10".to_string(), 5),
                ("chrX".to_string(), 1),
            ]
        );
    }

    #[test]
    fn by_hgnc_id_groups_genes() {
        let mut records = vec![
            super::ByHgncId::from(record_with_genotypes("2", 1, "A", "G", "HGNC:2", &[])),
            super::ByHgncId::from(record_with_genotypes("1", 9, "A", "G", "HGNC:1", &[])),
            super::ByHgncId::from(record_with_genotypes("1", 5, "A", "G", "HGNC:2", &[])),
        ];

        records.sort();

        let order = records
            .iter()
            .map(|record| (record.hgnc_id.clone(), record.seqvar.pos))
            .collect::<Vec<_>>();
        assert_eq!(
            order,
            vec![
                ("HGNC:1".to_string(), 9),
                ("HGNC:2".to_string(), 5),
                ("HGNC:2".to_string(), 1),
            ]
        );
    }
}
