use super::records::{DnskeyRecord, DsRecord};
use tracing::{trace, warn};

/// Fill in `calculated_ds` on every key for `digest_type`.
///
/// A key whose digest cannot be computed keeps `calculated_ds = None`
/// and therefore never matches.
pub fn annotate_calculated_ds(owner: &str, keys: &mut [DnskeyRecord], digest_type: u8) {
    for key in keys.iter_mut() {
        key.calculated_ds = match key.calculate_ds(owner, digest_type) {
            Ok(ds) => {
                trace!("DNSKEY {} for {} hashes to {}", ds.key_tag, owner, ds.digest);
                Some(ds)
            }
            Err(e) => {
                warn!("Cannot calculate DS for a DNSKEY of {}: {}", owner, e);
                None
            }
        };
    }
}

/// Pair every published DS with each key whose calculated DS digest is
/// identical to it. Keys must already carry `calculated_ds`.
pub fn match_keys(ds: &[DsRecord], keys: &[DnskeyRecord]) -> Vec<(DsRecord, DnskeyRecord)> {
    let mut pairs = Vec::new();

    for published in ds {
        for key in keys {
            let Some(calculated) = &key.calculated_ds else {
                continue;
            };
            if calculated.digest_type == published.digest_type
                && calculated.digest == published.digest
            {
                pairs.push((published.clone(), key.clone()));
            }
        }
    }

    pairs
}
