//! Pointer-chain resolution.
//!
//! Chains follow the convention of memory-analysis tools: the first
//! offset is applied to the module base, every intermediate result is
//! dereferenced, and the final offset is a plain field offset that is
//! never dereferenced. A chain with a single offset therefore performs
//! no remote reads at all.

use rewind_common::{Error, Result};

/// Walk a pointer chain and produce the effective address.
///
/// `read_ptr` reads one pointer-sized word from the target; any failure
/// it reports is returned unchanged.
pub fn resolve_chain<F>(base: usize, offsets: &[usize], mut read_ptr: F) -> Result<usize>
where
    F: FnMut(usize) -> Result<usize>,
{
    let (first, rest) = offsets
        .split_first()
        .ok_or_else(|| Error::Internal("pointer chain is empty".to_string()))?;

    let start = base.wrapping_add(*first);
    let Some((last, hops)) = rest.split_last() else {
        return Ok(start);
    };

    let mut addr = read_ptr(start)?;
    for offset in hops {
        addr = read_ptr(addr.wrapping_add(*offset))?;
    }

    Ok(addr.wrapping_add(*last))
}
