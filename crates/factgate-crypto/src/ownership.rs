//! # Ownership Proof Verification
//!
//! A submitter proves control of an address by signing EIP-712 typed data
//! that binds the wallet, a timestamp, and a fixed statement of intent to a
//! fixed signing domain:
//!
//! ```text
//! EIP712Domain(string name,string version,uint256 chainId)
//! ProveScrollWalletOwnership(address wallet,uint256 timestamp,string statement)
//! ```
//!
//! The digest is `keccak256(0x19 0x01 || domainSeparator || structHash)`.
//! Verification never errors: malformed input, recovery failure, a signer
//! mismatch or a stale timestamp all yield `false`.

use crate::ecdsa::{self, keccak256, Hash};
use crate::CryptoError;
use factgate_domain::Address;
use tracing::debug;

/// Default signing domain name
pub const DEFAULT_DOMAIN_NAME: &str = "Scroll";

/// Default signing domain version
pub const DEFAULT_DOMAIN_VERSION: &str = "1";

/// Default chain id (Scroll Sepolia)
pub const DEFAULT_CHAIN_ID: u64 = 534351;

/// Fixed statement of intent the wallet signs
pub const OWNERSHIP_STATEMENT: &str =
    "I am proving ownership of this Scroll wallet to submit a fact to Scroll of Fans.";

/// Default proof freshness window (5 minutes)
pub const DEFAULT_MAX_AGE_SECS: u64 = 300;

const DOMAIN_TYPE: &str = "EIP712Domain(string name,string version,uint256 chainId)";
const OWNERSHIP_TYPE: &str =
    "ProveScrollWalletOwnership(address wallet,uint256 timestamp,string statement)";

/// EIP-712 signing domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningDomain {
    /// Domain name
    pub name: String,
    /// Domain version
    pub version: String,
    /// Chain the proofs are scoped to
    pub chain_id: u64,
}

impl Default for SigningDomain {
    fn default() -> Self {
        Self {
            name: DEFAULT_DOMAIN_NAME.to_string(),
            version: DEFAULT_DOMAIN_VERSION.to_string(),
            chain_id: DEFAULT_CHAIN_ID,
        }
    }
}

impl SigningDomain {
    /// `hashStruct(EIP712Domain)`
    pub fn separator(&self) -> Hash {
        let mut encoded = Vec::with_capacity(32 * 4);
        encoded.extend_from_slice(&keccak256(DOMAIN_TYPE.as_bytes()));
        encoded.extend_from_slice(&keccak256(self.name.as_bytes()));
        encoded.extend_from_slice(&keccak256(self.version.as_bytes()));
        encoded.extend_from_slice(&uint256(self.chain_id));
        keccak256(&encoded)
    }
}

/// Checks that an identity produced a fresh ownership proof
#[derive(Debug, Clone)]
pub struct IdentityVerifier {
    domain: SigningDomain,
    domain_separator: Hash,
    max_age_secs: u64,
}

impl Default for IdentityVerifier {
    fn default() -> Self {
        Self::new(SigningDomain::default(), DEFAULT_MAX_AGE_SECS)
    }
}

impl IdentityVerifier {
    /// Create a verifier for `domain` accepting proofs up to `max_age_secs` old
    pub fn new(domain: SigningDomain, max_age_secs: u64) -> Self {
        let domain_separator = domain.separator();
        Self {
            domain,
            domain_separator,
            max_age_secs,
        }
    }

    /// The signing domain
    pub fn domain(&self) -> &SigningDomain {
        &self.domain
    }

    /// The freshness window in seconds
    pub fn max_age_secs(&self) -> u64 {
        self.max_age_secs
    }

    /// The digest `wallet` must sign for `timestamp`
    pub fn digest(&self, wallet: &Address, timestamp: u64) -> Hash {
        let mut struct_encoded = Vec::with_capacity(32 * 4);
        struct_encoded.extend_from_slice(&keccak256(OWNERSHIP_TYPE.as_bytes()));
        struct_encoded.extend_from_slice(&address_word(wallet));
        struct_encoded.extend_from_slice(&uint256(timestamp));
        struct_encoded.extend_from_slice(&keccak256(OWNERSHIP_STATEMENT.as_bytes()));
        let struct_hash = keccak256(&struct_encoded);

        let mut message = Vec::with_capacity(2 + 32 + 32);
        message.extend_from_slice(&[0x19, 0x01]);
        message.extend_from_slice(&self.domain_separator);
        message.extend_from_slice(&struct_hash);
        keccak256(&message)
    }

    /// Recover the address that signed the proof for `wallet` and `timestamp`
    pub fn recover(
        &self,
        wallet: &Address,
        timestamp: u64,
        proof: &str,
    ) -> Result<Address, CryptoError> {
        let signature = ecdsa::parse_signature_hex(proof)?;
        ecdsa::recover_address(&self.digest(wallet, timestamp), &signature)
    }

    /// Whether `timestamp` is at most `max_age_secs` older than `now`
    ///
    /// Timestamps ahead of `now` count as fresh.
    pub fn is_fresh(&self, timestamp: u64, now: u64) -> bool {
        now.saturating_sub(timestamp) <= self.max_age_secs
    }

    /// Verify an ownership proof
    ///
    /// Returns true iff `proof` recovers to `identity` (compared
    /// case-insensitively) and `now - timestamp` is at most `max_age_secs`.
    pub fn verify(&self, identity: &str, proof: &str, timestamp: &str, now: u64) -> bool {
        let wallet = match Address::parse(identity) {
            Ok(wallet) => wallet,
            Err(e) => {
                debug!("Rejecting proof: {}", e);
                return false;
            }
        };

        let timestamp: u64 = match timestamp.trim().parse() {
            Ok(ts) => ts,
            Err(_) => {
                debug!("Rejecting proof for {}: unparseable timestamp", wallet);
                return false;
            }
        };

        if !self.is_fresh(timestamp, now) {
            debug!(
                "Rejecting proof for {}: timestamp {} older than {}s at {}",
                wallet, timestamp, self.max_age_secs, now
            );
            return false;
        }

        match self.recover(&wallet, timestamp, proof) {
            Ok(recovered) if recovered == wallet => true,
            Ok(recovered) => {
                debug!("Rejecting proof for {}: signed by {}", wallet, recovered);
                false
            }
            Err(e) => {
                debug!("Rejecting proof for {}: {}", wallet, e);
                false
            }
        }
    }
}

/// ABI word for a `uint256` holding `value`
pub(crate) fn uint256(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

/// ABI word for an `address`
pub(crate) fn address_word(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}
