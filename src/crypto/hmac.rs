//! HMAC (RFC 2104), generic over any [`Digest`].

use crate::crypto::Digest;

const IPAD: u8 = 0x36;
const OPAD: u8 = 0x5c;

/// HMAC state. Keys longer than the hash block size are pre-hashed; shorter
/// keys are zero padded to the block size.
#[derive(Clone)]
pub struct Hmac<D: Digest> {
    inner: D,
    outer: D,
}

impl<D: Digest> Hmac<D> {
    pub const OUTPUT_SIZE: usize = D::OUTPUT_SIZE;

    pub fn new(key: &[u8]) -> Self {
        let mut padded = vec![0u8; D::BLOCK_SIZE];
        if key.len() > D::BLOCK_SIZE {
            let mut hasher = D::new();
            hasher.update(key);
            hasher.finalize(&mut padded[..D::OUTPUT_SIZE]);
        } else {
            padded[..key.len()].copy_from_slice(key);
        }

        let mut inner = D::new();
        let mut outer = D::new();

        let ipad_key: Vec<u8> = padded.iter().map(|b| b ^ IPAD).collect();
        let opad_key: Vec<u8> = padded.iter().map(|b| b ^ OPAD).collect();
        inner.update(&ipad_key);
        outer.update(&opad_key);

        Self { inner, outer }
    }

    pub fn update(&mut self, input: &[u8]) {
        self.inner.update(input);
    }

    /// Writes `D::OUTPUT_SIZE` bytes into `out`.
    pub fn finalize(self, out: &mut [u8]) {
        let Self { inner, mut outer } = self;

        let mut inner_digest = vec![0u8; D::OUTPUT_SIZE];
        inner.finalize(&mut inner_digest);

        outer.update(&inner_digest);
        outer.finalize(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::sha1::Sha1;
    use crate::crypto::sha2::{Sha224, Sha256, Sha512};

    fn hmac_hex<D: Digest>(key: &[u8], data: &[u8]) -> String {
        let mut mac = Hmac::<D>::new(key);
        mac.update(data);
        let mut out = vec![0u8; D::OUTPUT_SIZE];
        mac.finalize(&mut out);
        hex::encode(out)
    }

    #[test]
    fn rfc2202_hmac_sha1() {
        assert_eq!(
            hmac_hex::<Sha1>(&[0x0b; 20], b"Hi There"),
            "b617318655057264e28bc0b6fb378c8ef146be00"
        );
    }

    #[test]
    fn rfc4231_case_1() {
        let key = [0x0b; 20];
        assert_eq!(
            hmac_hex::<Sha256>(&key, b"Hi There"),
            "b0344c61d8db38535ca8afceaf0bf12b881dc200c9833da726e9376c2e32cff7"
        );
        assert_eq!(
            hmac_hex::<Sha512>(&key, b"Hi There"),
            "87aa7cdea5ef619d4ff0b4241a1d6cb02379f4e2ce4ec2787ad0b30545e17cde\
             daa833b7d6b8a702038b274eaea3f4e4be9d914eeb61f1702e696c203a126854"
        );
        assert_eq!(
            hmac_hex::<Sha224>(&key, b"Hi There"),
            "896fb1128abbdf196832107cd49df33f47b4b1169912ba4f53684b22"
        );
    }

    #[test]
    fn rfc4231_case_2_short_key() {
        // "Jefe" exercises the zero-padding path.
        assert_eq!(
            hmac_hex::<Sha256>(b"Jefe", b"what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn long_key_is_prehashed() {
        // Any key above the block size must go through the hash first, so it
        // has to agree with its own digest used directly as the key.
        let long_key = [0xaa; 200];
        let mut short_key = [0u8; 32];
        crate::crypto::digest::<Sha256>(&long_key, &mut short_key);

        assert_eq!(
            hmac_hex::<Sha256>(&long_key, b"data"),
            hmac_hex::<Sha256>(&short_key, b"data")
        );
    }
}
