//! Signing: block grouping, per-group digesting, bundle assembly.

use tracing::{debug, info};

use mtss_cff::{best_params_within, obtain, obtain_params, CffDesign, DesignRepository};
use mtss_crypto::{PrivateKey, SigScheme};

use crate::bundle::SignatureBundle;
use crate::error::{ProtocolError, Result};
use crate::group_content;

/// How the CFF design for a signature is chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DesignRequest {
    /// Pick the design with the largest localization capacity whose bundle
    /// fits within this many bytes (the `-s` mode).
    MaxBytes(usize),
    /// Use the polynomial construction for this explicit k (the `-k` mode);
    /// k = 1 selects the trivial per-block design.
    Explicit {
        /// Construction degree bound.
        k: u32,
    },
}

/// Sign a message, producing one aggregate signature per test group.
///
/// No output is produced on any failure path: design selection and every
/// signing step complete before the bundle exists at all.
///
/// # Errors
///
/// Returns `InvalidArguments` for an empty message, `DesignUnavailable` when
/// no design satisfies a byte budget, and crypto errors from the signing
/// primitive.
pub fn sign(
    scheme: &SigScheme,
    key: &PrivateKey,
    blocks: &[String],
    request: DesignRequest,
    repository: &dyn DesignRepository,
) -> Result<SignatureBundle> {
    if blocks.is_empty() {
        return Err(ProtocolError::InvalidArguments(
            "message has no blocks".into(),
        ));
    }
    let n = u32::try_from(blocks.len())
        .map_err(|_| ProtocolError::InvalidArguments("too many blocks".into()))?;
    let signature_length = key.signature_length();

    let design = select_design(n, signature_length, request, repository)?;
    debug_assert_eq!(design.n, n);
    info!(
        n,
        d = design.d,
        t = design.t,
        scheme = %scheme.scheme(),
        hash = %scheme.hash(),
        "signing message"
    );

    let mut signatures = Vec::with_capacity(design.t as usize);
    for group in design.groups() {
        let content = group_content(blocks, group);
        signatures.push(scheme.sign(key, &content)?);
    }

    SignatureBundle::new(
        n,
        design.d,
        design.t,
        design.q,
        design.k,
        scheme.scheme(),
        scheme.hash(),
        signature_length as u32,
        signatures,
    )
}

fn select_design(
    n: u32,
    signature_length: usize,
    request: DesignRequest,
    repository: &dyn DesignRepository,
) -> Result<CffDesign> {
    match request {
        DesignRequest::Explicit { k } => Ok(obtain(repository, n, k)?),
        DesignRequest::MaxBytes(budget) => {
            let params = best_params_within(n, budget, |t| {
                SignatureBundle::encoded_len(t, signature_length)
            })?;
            debug!(
                budget,
                d = params.d,
                t = params.t,
                q = params.q,
                k = params.k,
                "size-constrained design selected"
            );
            Ok(obtain_params(repository, params)?)
        }
    }
}
