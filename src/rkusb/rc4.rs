//! RC4 keystream cipher with the fixed Rockchip loader key.
//!
//! XOR with the keystream is its own inverse, so the same call both
//! ciphers and deciphers a buffer.

const KEY: [u8; 16] = [
    124, 78, 3, 4, 85, 5, 9, 7, 45, 44, 123, 56, 23, 13, 23, 17,
];

/// Transform `buf` in place.
pub(crate) fn cipher(buf: &mut [u8]) {
    let mut state: [u8; 256] = core::array::from_fn(|i| i as u8);

    // Key scheduling
    let mut j: u8 = 0;
    for i in 0..256 {
        j = j.wrapping_add(state[i]).wrapping_add(KEY[i % KEY.len()]);
        state.swap(i, j as usize);
    }

    // Keystream generation
    let mut i: u8 = 0;
    let mut j: u8 = 0;
    for byte in buf.iter_mut() {
        i = i.wrapping_add(1);
        j = j.wrapping_add(state[i as usize]);
        state.swap(i as usize, j as usize);
        let k = state[state[i as usize].wrapping_add(state[j as usize]) as usize];
        *byte ^= k;
    }
}
