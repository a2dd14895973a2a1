//! ABI encoding for the Bee-ish NFT contract calls the application makes.

use once_cell::sync::Lazy;
use sha3::{Digest, Keccak256};

use crate::blockchain::Address;
use crate::errors::{WalletError, WalletResult};

pub const TOKENS_OF_OWNER_SIGNATURE: &str = "tokensOfOwner(address)";
pub const MINT_SIGNATURE: &str = "mint((bytes32,bytes32[]),uint256,address,bytes)";

static TOKENS_OF_OWNER_SELECTOR: Lazy<[u8; 4]> =
    Lazy::new(|| function_selector(TOKENS_OF_OWNER_SIGNATURE));
static MINT_SELECTOR: Lazy<[u8; 4]> = Lazy::new(|| function_selector(MINT_SIGNATURE));

const WORD: usize = 32;

/// First four bytes of the Keccak-256 hash of a canonical function signature.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&digest[..4]);
    selector
}

/// Allow-list proof presented to `mint`. The public sale uses a zero key and no proof.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MintAuth {
    pub key: [u8; 32],
    pub proof: Vec<[u8; 32]>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintCall {
    pub auth: MintAuth,
    pub quantity: u64,
    pub affiliate: Address,
    pub signature: Vec<u8>,
}

impl MintCall {
    /// Public-sale call: zero auth, zero affiliate, empty signature.
    pub fn public(quantity: u64) -> Self {
        Self {
            auth: MintAuth::default(),
            quantity,
            affiliate: Address::ZERO,
            signature: Vec::new(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        // head: auth offset, quantity, affiliate, signature offset
        let auth = encode_auth(&self.auth);
        let head_len = 4 * WORD;
        let signature_offset = head_len + auth.len();

        let mut out = Vec::with_capacity(4 + signature_offset + WORD + padded_len(self.signature.len()));
        out.extend_from_slice(&*MINT_SELECTOR);
        out.extend_from_slice(&uint_word(head_len as u128));
        out.extend_from_slice(&uint_word(self.quantity as u128));
        out.extend_from_slice(&address_word(&self.affiliate));
        out.extend_from_slice(&uint_word(signature_offset as u128));
        out.extend_from_slice(&auth);
        out.extend_from_slice(&encode_bytes(&self.signature));
        out
    }
}

/// Calldata for `tokensOfOwner(address)`.
pub fn encode_tokens_of_owner(owner: &Address) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + WORD);
    out.extend_from_slice(&*TOKENS_OF_OWNER_SELECTOR);
    out.extend_from_slice(&address_word(owner));
    out
}

/// Decode a returned `uint256[]` whose elements are token ids.
pub fn decode_token_ids(data: &[u8]) -> WalletResult<Vec<u64>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let offset = read_usize(data, 0)?;
    let len = read_usize(data, offset)?;
    let mut ids = Vec::with_capacity(len.min(1024));
    for index in 0..len {
        let start = index
            .checked_mul(WORD)
            .and_then(|rel| rel.checked_add(offset))
            .and_then(|pos| pos.checked_add(WORD))
            .ok_or_else(|| out_of_range(offset))?;
        let word = word_at(data, start)?;
        if word[..24].iter().any(|b| *b != 0) {
            return Err(WalletError::InvalidResponse(
                "Token id does not fit in 64 bits".to_string(),
            ));
        }
        let mut tail = [0u8; 8];
        tail.copy_from_slice(&word[24..]);
        ids.push(u64::from_be_bytes(tail));
    }
    Ok(ids)
}

/// `0x`-prefixed hex encoding used for JSON-RPC `data` fields.
pub fn to_hex_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn from_hex_data(data: &str) -> WalletResult<Vec<u8>> {
    let stripped = data.strip_prefix("0x").unwrap_or(data);
    hex::decode(stripped)
        .map_err(|e| WalletError::InvalidResponse(format!("Invalid hex payload: {}", e)))
}

fn encode_auth(auth: &MintAuth) -> Vec<u8> {
    // (bytes32 key, bytes32[] proof): key, offset to proof (relative to tuple start), proof
    let mut out = Vec::with_capacity(3 * WORD + auth.proof.len() * WORD);
    out.extend_from_slice(&auth.key);
    out.extend_from_slice(&uint_word((2 * WORD) as u128));
    out.extend_from_slice(&uint_word(auth.proof.len() as u128));
    for node in &auth.proof {
        out.extend_from_slice(node);
    }
    out
}

fn encode_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(WORD + padded_len(bytes.len()));
    out.extend_from_slice(&uint_word(bytes.len() as u128));
    out.extend_from_slice(bytes);
    out.resize(WORD + padded_len(bytes.len()), 0);
    out
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(WORD) * WORD
}

fn uint_word(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn address_word(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

fn out_of_range(position: usize) -> WalletError {
    WalletError::InvalidResponse(format!("ABI offset {} out of range", position))
}

fn word_at(data: &[u8], start: usize) -> WalletResult<&[u8]> {
    let end = start.checked_add(WORD).ok_or_else(|| out_of_range(start))?;
    data.get(start..end).ok_or_else(|| {
        WalletError::InvalidResponse(format!(
            "ABI payload truncated at byte {} (length {})",
            start,
            data.len()
        ))
    })
}

fn read_usize(data: &[u8], start: usize) -> WalletResult<usize> {
    let word = word_at(data, start)?;
    if word[..24].iter().any(|b| *b != 0) {
        return Err(WalletError::InvalidResponse(
            "ABI offset out of range".to_string(),
        ));
    }
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&word[24..]);
    usize::try_from(u64::from_be_bytes(tail))
        .map_err(|_| WalletError::InvalidResponse("ABI offset out of range".to_string()))
}
