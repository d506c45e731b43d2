//! Key derivation facade over Argon2.
//!
//! Cost bounds are enforced here for every variant, so no caller can reach
//! the memory mill with degenerate parameters.

use strum::{Display, EnumString};
use tracing::debug;

use crate::crypto::argon2::{self, Costs, Input, Variant};
use crate::error::{Error, Result};

/// KDF identifiers as they appear on the command line.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, EnumString)]
pub enum KdfAlgorithm {
    #[strum(serialize = "argon2d")]
    Argon2d,
    #[strum(serialize = "argon2i")]
    Argon2i,
    #[strum(serialize = "argon2id")]
    Argon2id,
}

impl KdfAlgorithm {
    fn variant(self) -> Variant {
        match self {
            Self::Argon2d => Variant::Argon2d,
            Self::Argon2i => Variant::Argon2i,
            Self::Argon2id => Variant::Argon2id,
        }
    }
}

/// Inputs and costs for one derivation. All byte fields are borrowed views;
/// the caller owns (and wipes) the secrets.
#[derive(Clone, Copy)]
pub struct KdfParams<'a> {
    pub password: &'a [u8],
    pub salt: &'a [u8],
    pub secret: &'a [u8],
    /// Memory cost in KiB blocks.
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

/// Derives `out.len()` key bytes.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] when the costs are out of range:
/// `time_cost` of zero, `memory_cost` below `8 * parallelism`, `parallelism`
/// of zero or at least 2^24, or an output shorter than 4 bytes.
pub fn derive_key(algorithm: KdfAlgorithm, params: &KdfParams<'_>, out: &mut [u8]) -> Result<()> {
    if params.time_cost == 0 {
        return Err(Error::InvalidArgument("time cost must be greater than zero".into()));
    }
    if params.parallelism == 0 || params.parallelism >= 1 << 24 {
        return Err(Error::InvalidArgument("parallelism out of range".into()));
    }
    if params.memory_cost < 8 * params.parallelism {
        return Err(Error::InvalidArgument(format!(
            "memory cost must be at least 8 * parallelism ({})",
            8 * params.parallelism
        )));
    }
    if out.len() < 4 {
        return Err(Error::InvalidArgument("key output must be at least 4 bytes".into()));
    }

    debug!(
        %algorithm,
        time_cost = params.time_cost,
        memory_cost = params.memory_cost,
        parallelism = params.parallelism,
        key_bytes = out.len(),
        "deriving key"
    );

    let input = Input {
        password: params.password,
        salt: params.salt,
        secret: params.secret,
        associated_data: &[],
    };
    let costs = Costs {
        time_cost: params.time_cost,
        memory_cost: params.memory_cost,
        parallelism: params.parallelism,
    };
    argon2::hash(algorithm.variant(), &input, costs, out);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> KdfParams<'static> {
        KdfParams {
            password: b"password",
            salt: b"somesalt",
            secret: b"",
            memory_cost: 16,
            time_cost: 1,
            parallelism: 2,
        }
    }

    #[test]
    fn names_round_trip() {
        for name in ["argon2d", "argon2i", "argon2id"] {
            let algorithm: KdfAlgorithm = name.parse().unwrap();
            assert_eq!(algorithm.to_string(), name);
        }
        assert!("scrypt".parse::<KdfAlgorithm>().is_err());
    }

    #[test]
    fn derivation_is_deterministic_and_variant_specific() {
        let mut id = [0u8; 32];
        derive_key(KdfAlgorithm::Argon2id, &params(), &mut id).unwrap();
        let mut id2 = [0u8; 32];
        derive_key(KdfAlgorithm::Argon2id, &params(), &mut id2).unwrap();
        assert_eq!(id, id2);

        let mut i = [0u8; 32];
        derive_key(KdfAlgorithm::Argon2i, &params(), &mut i).unwrap();
        assert_ne!(id, i);
    }

    #[test]
    fn bad_costs_are_rejected() {
        let mut out = [0u8; 32];

        let mut p = params();
        p.time_cost = 0;
        assert!(derive_key(KdfAlgorithm::Argon2id, &p, &mut out).is_err());

        let mut p = params();
        p.memory_cost = 8 * p.parallelism - 1;
        assert!(derive_key(KdfAlgorithm::Argon2id, &p, &mut out).is_err());

        let mut p = params();
        p.parallelism = 0;
        assert!(derive_key(KdfAlgorithm::Argon2id, &p, &mut out).is_err());

        let mut p = params();
        p.parallelism = 1 << 24;
        p.memory_cost = u32::MAX;
        assert!(derive_key(KdfAlgorithm::Argon2id, &p, &mut out).is_err());

        assert!(derive_key(KdfAlgorithm::Argon2id, &params(), &mut [0u8; 3]).is_err());
    }

    #[test]
    fn salt_binds_the_key() {
        let mut a = [0u8; 32];
        derive_key(KdfAlgorithm::Argon2id, &params(), &mut a).unwrap();

        let mut p = params();
        p.salt = b"TOMESALT";
        let mut b = [0u8; 32];
        derive_key(KdfAlgorithm::Argon2id, &p, &mut b).unwrap();
        assert_ne!(a, b);
    }
}
