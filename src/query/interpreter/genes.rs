//! Gene allow-/block-list filter.

use std::collections::HashSet;

use crate::query::schema::data::VariantRecord;

/// Determine whether the `VariantRecord` passes the gene allow-/block-list
/// filter.
///
/// Annotations for block-listed genes are discarded before the allowlist is
/// consulted, so the blocklist always wins when a gene occurs in both.
pub fn passes(
    hgnc_allowlist: &Option<HashSet<String>>,
    hgnc_blocklist: &HashSet<String>,
    seqvar: &VariantRecord,
) -> bool {
    let effective_genes = seqvar
        .ann_fields
        .iter()
        .map(|ann_field| &ann_field.gene_id)
        .filter(|gene_id| !gene_id.is_empty())
        .filter(|gene_id| !hgnc_blocklist.contains(*gene_id))
        .collect::<Vec<_>>();

    if !hgnc_blocklist.is_empty()
        && effective_genes.is_empty()
        && seqvar
            .ann_fields
            .iter()
            .any(|ann_field| !ann_field.gene_id.is_empty())
    {
        tracing::trace!(
            "variant {:?} fails gene blocklist filter {:?}",
            seqvar,
            hgnc_blocklist
        );
        return false;
    }

    if let Some(hgnc_allowlist) = hgnc_allowlist {
        if hgnc_allowlist.is_empty() {
            true
        } else {
            let res = effective_genes
                .iter()
                .any(|gene_id| hgnc_allowlist.contains(*gene_id));
            if !res {
                tracing::trace!(
                    "variant {:?} fails gene allowlist filter {:?}",
                    seqvar,
                    hgnc_allowlist
                );
            }
            res
        }
    } else {
        true
    }
}
