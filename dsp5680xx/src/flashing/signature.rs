//! Host side mirror of the data signature computed by the flash module.

/// Compute the signature the flash module reports for `words`.
///
/// The words are fed through a 16 bit LFSR front to back and then back to
/// front again, without resetting in between.
pub fn data_signature(words: &[u16]) -> u16 {
    let forward = words.iter();
    let backward = words.iter().rev();

    forward.chain(backward).fold(0xFFFF, |signature, word| {
        word ^ ((signature << 1) | feedback(signature))
    })
}

/// XOR of bits 1, 2, 4 and 15.
fn feedback(signature: u16) -> u16 {
    ((signature >> 1) ^ (signature >> 2) ^ (signature >> 4) ^ (signature >> 15)) & 1
}

#[cfg(test)]
mod tests {
    use super::data_signature;
    use test_case::test_case;

    #[test_case(&[], 0xFFFF; "empty")]
    #[test_case(&[0x0000], 0xFFFC; "single zero")]
    #[test_case(&[1, 2, 3, 4], 0xFF3F; "counting")]
    #[test_case(&[0x1234, 0xABCD], 0x84C9; "mixed")]
    #[test_case(&[0xE70A, 0xE70A], 0x7296; "security words")]
    #[test_case(&[0xFFFF; 4], 0xFF64; "erased")]
    fn golden(words: &[u16], signature: u16) {
        pretty_assertions::assert_eq!(data_signature(words), signature);
    }

    #[test]
    fn sixteen_counting_words() {
        let words: Vec<u16> = (0..16).collect();

        pretty_assertions::assert_eq!(data_signature(&words), 0xE5DB);
    }
}
