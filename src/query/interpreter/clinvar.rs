//! ClinVar membership filter.

use crate::query::schema::data::VariantRecord;
use crate::query::schema::query::CaseQuery;

/// Determine whether the `VariantRecord` passes the ClinVar filter.
///
/// Without `require_in_clinvar` everything passes.  Otherwise the variant
/// must carry a classification from the included set; in paranoid mode all
/// recorded classifications are consulted instead of only the aggregate one.
pub fn passes(query: &CaseQuery, seqvar: &VariantRecord) -> Result<bool, anyhow::Error> {
    let settings = &query.clinvar;
    if !settings.require_in_clinvar {
        return Ok(true);
    }

    let considered = if settings.paranoid_mode {
        seqvar.clinvar.as_slice()
    } else {
        &seqvar.clinvar[..seqvar.clinvar.len().min(1)]
    };
    let result = considered
        .iter()
        .any(|significance| settings.includes(*significance));
    if !result {
        tracing::trace!(
            "variant {:?} fails ClinVar filter {:?}",
            &seqvar,
            &settings
        );
    }
    Ok(result)
}
