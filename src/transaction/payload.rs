//! Decoding for the opaque transaction `data` field.
//!
//! Over the wire the payload is base64; decoded it reads
//! `function@hexArg1@hexArg2@...`, with every argument hex-encoded.

use data_encoding::{BASE64, HEXLOWER_PERMISSIVE};

use crate::{NFT_CREATE_FUNCTION, SFT_TO_META_FUNCTION};

pub fn decode_base64(data: &str) -> Option<Vec<u8>> {
    BASE64.decode(data.as_bytes()).ok()
}

/// Everything up to the first `@`, or the whole payload when there are no
/// arguments. `None` when the payload is not valid utf8.
pub fn function_name(data: &[u8]) -> Option<&str> {
    let text = std::str::from_utf8(data).ok()?;
    Some(text.split('@').next().unwrap_or(text))
}

/// Hex-decodes the argument at `index` (zero-based, not counting the
/// function name).
pub fn argument(data: &[u8], index: usize) -> Option<Vec<u8>> {
    let text = std::str::from_utf8(data).ok()?;
    let raw = text.split('@').nth(index + 1)?;
    HEXLOWER_PERMISSIVE.decode(raw.as_bytes()).ok()
}

pub fn argument_utf8(data: &[u8], index: usize) -> Option<String> {
    String::from_utf8(argument(data, index)?).ok()
}

/// Collection identifier and raw attributes of an `ESDTNFTCreate` payload:
/// `ESDTNFTCreate@collection@quantity@name@royalties@hash@attributes@uri...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NftCreateMetadata {
    pub collection: String,
    pub attributes: Vec<u8>,
}

pub fn nft_create_metadata(data: &[u8]) -> Option<NftCreateMetadata> {
    if function_name(data)? != NFT_CREATE_FUNCTION {
        return None;
    }
    let collection = argument_utf8(data, 0)?;
    let attributes = argument(data, 5).unwrap_or_default();
    Some(NftCreateMetadata {
        collection,
        attributes,
    })
}

/// Collection identifier of a `changeSFTToMetaESDT@collection@decimals`
/// payload.
pub fn sft_to_meta_collection(data: &[u8]) -> Option<String> {
    if function_name(data)? != SFT_TO_META_FUNCTION {
        return None;
    }
    argument_utf8(data, 0)
}
