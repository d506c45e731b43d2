//! Poly1305 (RFC 8439 §2.5).
//!
//! The accumulator works modulo p = 2^130 - 5 and therefore needs more than
//! 128 bits: it is held as a 256-bit value in two `u128` halves. The multiply
//! by `r` is a 192×128-bit schoolbook product over 64-bit limbs; reduction
//! uses `a mod p = (a mod 2^130) + 5·(a >> 130)` followed by one conditional
//! subtraction of p.

/// Clamp mask for `r` per RFC 8439 §2.5.1.
const R_CLAMP: u128 = 0x0fff_fffc_0fff_fffc_0fff_fffc_0fff_ffff;

// p = 2^130 - 5, as two u128 halves.
const P_HI: u128 = 3;
const P_LO: u128 = u128::MAX - 4;

/// 256-bit accumulator in two 128-bit halves.
#[derive(Clone, Copy)]
struct Wide {
    hi: u128,
    lo: u128,
}

impl Wide {
    const ZERO: Self = Self { hi: 0, lo: 0 };

    fn add(&mut self, value: u128) {
        let (lo, carry) = self.lo.overflowing_add(value);
        self.lo = lo;
        self.hi = self.hi.wrapping_add(u128::from(carry));
    }

    /// `self *= b`, treating `self` as a 192-bit value (the accumulator never
    /// exceeds 2^131 here, and `b` is the clamped `r` below 2^124, so the
    /// product fits in 256 bits).
    fn mul(&mut self, b: u128) {
        let lo64 = |x: u128| x & u128::from(u64::MAX);
        let hi64 = |x: u128| x >> 64;

        let a0 = lo64(self.hi);
        let a1 = hi64(self.lo);
        let a2 = lo64(self.lo);
        let b0 = hi64(b);
        let b1 = lo64(b);

        let v0 = a0 * b0;
        let v1 = a0 * b1;
        let v2 = a1 * b0;
        let v3 = a1 * b1;
        let v4 = a2 * b0;
        let v5 = a2 * b1;

        let mut lo = lo64(v5);
        let mut t = lo64(v3) + lo64(v4) + hi64(v5);
        lo |= lo64(t) << 64;

        t = hi64(t) + lo64(v1) + lo64(v2) + hi64(v3) + hi64(v4);
        let mut hi = lo64(t);

        t = hi64(t) + lo64(v0) + hi64(v1) + hi64(v2);
        hi |= lo64(t) << 64;

        self.lo = lo;
        self.hi = hi;
    }
}

#[derive(Clone)]
pub struct Poly1305 {
    r: u128,
    s: u128,
    acc: Wide,
    block: [u8; 16],
    block_len: usize,
}

impl Poly1305 {
    pub const KEY_SIZE: usize = 32;
    pub const BLOCK_SIZE: usize = 16;
    pub const OUTPUT_SIZE: usize = 16;

    pub fn new(key: &[u8; 32]) -> Self {
        let r = u128::from_le_bytes(key[..16].try_into().unwrap()) & R_CLAMP;
        let s = u128::from_le_bytes(key[16..].try_into().unwrap());
        Self { r, s, acc: Wide::ZERO, block: [0; 16], block_len: 0 }
    }

    pub fn update(&mut self, mut input: &[u8]) {
        while !input.is_empty() {
            if self.block_len == Self::BLOCK_SIZE {
                self.compress();
                self.block_len = 0;
            }

            let take = (Self::BLOCK_SIZE - self.block_len).min(input.len());
            self.block[self.block_len..self.block_len + take].copy_from_slice(&input[..take]);
            self.block_len += take;
            input = &input[take..];
        }
    }

    /// Writes the 16-byte tag into `out`.
    pub fn finalize(mut self, out: &mut [u8]) {
        self.compress();
        self.acc.add(self.s);
        out[..16].copy_from_slice(&self.acc.lo.to_le_bytes());
    }

    fn compress(&mut self) {
        if self.block_len == Self::BLOCK_SIZE {
            // Full block: the 2^128 marker bit lands in the high half.
            self.acc.hi = self.acc.hi.wrapping_add(1);
        } else {
            self.block[self.block_len] = 0x01;
            self.block[self.block_len + 1..].fill(0);
        }

        self.acc.add(u128::from_le_bytes(self.block));
        self.acc.mul(self.r);
        self.reduce();
    }

    fn reduce(&mut self) {
        // 5·(acc >> 130) = 4·(acc >> 130) + (acc >> 130), both halves taken
        // from the high 128 bits.
        let carry = (self.hi_div_4() << 2).wrapping_add(self.hi_div_4());
        self.acc.hi &= 3;
        self.acc.add(carry);

        let ge_p = (self.acc.hi, self.acc.lo) >= (P_HI, P_LO);
        if ge_p {
            let borrow = self.acc.lo < P_LO;
            self.acc.hi = self.acc.hi.wrapping_sub(P_HI + u128::from(borrow));
            self.acc.lo = self.acc.lo.wrapping_sub(P_LO);
        }
    }

    fn hi_div_4(&self) -> u128 {
        self.acc.hi >> 2
    }
}
