//! Frame encryption hooks
//!
//! The engine drives encryption as query size, allocate once, transform, then
//! truncate to the reported length. Splitting the size query from the
//! transform keeps the transform allocation-free on the media thread.

use std::sync::OnceLock;

use bytes::Bytes;
use tracing::warn;

use crate::config;
use crate::utils::{try_alloc, LogThrottler};

/// Outbound media transform installed on the engine's senders
pub trait FrameEncryptor: Send + Sync {
    fn ciphertext_size(&self, is_audio: bool, plaintext_size: usize) -> usize;

    /// Returns the bytes written into `ciphertext`, `None` drops the frame
    fn encrypt(&self, is_audio: bool, plaintext: &[u8], ciphertext: &mut [u8]) -> Option<usize>;
}

/// Inbound media transform installed on the engine's receivers
pub trait FrameDecryptor: Send + Sync {
    fn plaintext_size(&self, track_id: u32, is_audio: bool, ciphertext_size: usize) -> usize;

    /// Returns the bytes written into `plaintext`, `None` drops the frame
    fn decrypt(
        &self,
        track_id: u32,
        is_audio: bool,
        ciphertext: &[u8],
        plaintext: &mut [u8],
    ) -> Option<usize>;
}

fn throttler() -> &'static LogThrottler {
    static THROTTLER: OnceLock<LogThrottler> = OnceLock::new();
    THROTTLER.get_or_init(|| LogThrottler::from_config(&config::global().get().log))
}

/// A reported size is only trusted when it fits the buffer it describes
pub fn checked_size(reported: usize, capacity: usize) -> Option<usize> {
    if reported > capacity {
        if let Some(suppressed) = throttler().check("transform_overflow") {
            warn!(
                "Transform reported {} bytes for a {} byte buffer, dropping frame \
                 ({} similar suppressed)",
                reported, capacity, suppressed
            );
        }
        return None;
    }
    Some(reported)
}

/// Output buffer for one transform; `None` when the queried size cannot be met
fn output_buffer(capacity: usize) -> Option<Vec<u8>> {
    match try_alloc(capacity, 0) {
        Ok(buffer) => Some(buffer),
        Err(e) => {
            if let Some(suppressed) = throttler().check("transform_alloc") {
                warn!("{}, dropping frame ({} similar suppressed)", e, suppressed);
            }
            None
        }
    }
}

/// Encrypt one frame; `None` means the frame must be dropped
pub fn encrypt_frame(
    encryptor: &dyn FrameEncryptor,
    is_audio: bool,
    plaintext: &[u8],
) -> Option<Bytes> {
    let capacity = encryptor.ciphertext_size(is_audio, plaintext.len());
    let mut ciphertext = output_buffer(capacity)?;
    let written = encryptor.encrypt(is_audio, plaintext, &mut ciphertext)?;
    let written = checked_size(written, capacity)?;
    ciphertext.truncate(written);
    Some(Bytes::from(ciphertext))
}

/// Decrypt one frame; `None` means the frame must be dropped
pub fn decrypt_frame(
    decryptor: &dyn FrameDecryptor,
    track_id: u32,
    is_audio: bool,
    ciphertext: &[u8],
) -> Option<Bytes> {
    let capacity = decryptor.plaintext_size(track_id, is_audio, ciphertext.len());
    let mut plaintext = output_buffer(capacity)?;
    let written = decryptor.decrypt(track_id, is_audio, ciphertext, &mut plaintext)?;
    let written = checked_size(written, capacity)?;
    plaintext.truncate(written);
    Some(Bytes::from(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// XOR with a trailing 16-byte tag
    struct XorCipher;

    const TAG: usize = 16;

    impl FrameEncryptor for XorCipher {
        fn ciphertext_size(&self, _is_audio: bool, plaintext_size: usize) -> usize {
            plaintext_size + TAG
        }

        fn encrypt(
            &self,
            _is_audio: bool,
            plaintext: &[u8],
            ciphertext: &mut [u8],
        ) -> Option<usize> {
            let needed = plaintext.len() + TAG;
            if ciphertext.len() < needed {
                return None;
            }
            for (dst, src) in ciphertext.iter_mut().zip(plaintext) {
                *dst = src ^ 0x5a;
            }
            ciphertext[plaintext.len()..needed].fill(0xee);
            Some(needed)
        }
    }

    impl FrameDecryptor for XorCipher {
        fn plaintext_size(&self, _track_id: u32, _is_audio: bool, ciphertext_size: usize) -> usize {
            ciphertext_size.saturating_sub(TAG)
        }

        fn decrypt(
            &self,
            _track_id: u32,
            _is_audio: bool,
            ciphertext: &[u8],
            plaintext: &mut [u8],
        ) -> Option<usize> {
            let len = ciphertext.len().checked_sub(TAG)?;
            for (dst, src) in plaintext.iter_mut().zip(&ciphertext[..len]) {
                *dst = src ^ 0x5a;
            }
            Some(len)
        }
    }

    struct Liar;

    impl FrameEncryptor for Liar {
        fn ciphertext_size(&self, _is_audio: bool, plaintext_size: usize) -> usize {
            plaintext_size
        }

        fn encrypt(
            &self,
            _is_audio: bool,
            _plaintext: &[u8],
            ciphertext: &mut [u8],
        ) -> Option<usize> {
            Some(ciphertext.len() + 1)
        }
    }

    /// Size queries that no allocator can satisfy
    struct Unbounded;

    impl FrameEncryptor for Unbounded {
        fn ciphertext_size(&self, _is_audio: bool, _plaintext_size: usize) -> usize {
            usize::MAX
        }

        fn encrypt(
            &self,
            _is_audio: bool,
            _plaintext: &[u8],
            _ciphertext: &mut [u8],
        ) -> Option<usize> {
            Some(0)
        }
    }

    impl FrameDecryptor for Unbounded {
        fn plaintext_size(
            &self,
            _track_id: u32,
            _is_audio: bool,
            _ciphertext_size: usize,
        ) -> usize {
            usize::MAX
        }

        fn decrypt(
            &self,
            _track_id: u32,
            _is_audio: bool,
            _ciphertext: &[u8],
            _plaintext: &mut [u8],
        ) -> Option<usize> {
            Some(0)
        }
    }

    #[test]
    fn test_unallocatable_size_drops_frame() {
        assert!(encrypt_frame(&Unbounded, false, &[0u8; 100]).is_none());
        assert!(decrypt_frame(&Unbounded, 3, true, &[0u8; 100]).is_none());
    }

    #[test]
    fn test_encrypt_decrypt() {
        let plaintext = b"frame payload".to_vec();
        let ciphertext = encrypt_frame(&XorCipher, false, &plaintext).unwrap();
        assert_eq!(ciphertext.len(), plaintext.len() + TAG);

        let decrypted = decrypt_frame(&XorCipher, 7, false, &ciphertext).unwrap();
        assert_eq!(&decrypted[..], &plaintext[..]);
    }

    #[test]
    fn test_size_monotonic() {
        for size in [0usize, 1, 100, 1200, 65_535] {
            let capacity = XorCipher.ciphertext_size(true, size);
            assert!(capacity >= size);

            let plaintext = vec![1u8; size];
            let mut out = vec![0u8; capacity];
            let written = XorCipher.encrypt(true, &plaintext, &mut out).unwrap();
            assert!(written <= capacity);
        }
    }

    #[test]
    fn test_oversized_report_dropped() {
        assert!(encrypt_frame(&Liar, false, &[0u8; 10]).is_none());
        assert_eq!(checked_size(5, 5), Some(5));
        assert_eq!(checked_size(6, 5), None);
    }

    #[test]
    fn test_failed_decrypt_dropped() {
        assert!(decrypt_frame(&XorCipher, 1, true, &[0u8; 4]).is_none());
    }
}
