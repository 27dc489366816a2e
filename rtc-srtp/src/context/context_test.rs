use super::*;

const MASTER_KEY: [u8; 16] = [
    0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10,
];
const MASTER_SALT: [u8; 14] = [
    0x20, 0x21, 0x22, 0x23, 0x24, 0x25, 0x26, 0x27, 0x28, 0x29, 0x2a, 0x2b, 0x2c, 0x2d,
];

fn rtp_packet(sequence_number: u16) -> Vec<u8> {
    let mut pkt = vec![0x80, 0xe0];
    pkt.extend_from_slice(&sequence_number.to_be_bytes());
    pkt.extend_from_slice(&[0x00, 0x00, 0x00, 0x64, 0x00, 0x00, 0x00, 0x2a]);
    pkt.extend(0xa0u8..0xb0);
    pkt
}

fn encrypted_aes_cm_80() -> Vec<u8> {
    vec![
        0x80, 0xe0, 0x12, 0x34, 0x00, 0x00, 0x00, 0x64, 0x00, 0x00, 0x00, 0x2a, 0x6b, 0x5c,
        0x21, 0x82, 0xef, 0x05, 0x1f, 0xa0, 0x09, 0x94, 0xf8, 0x01, 0x8d, 0x01, 0xde, 0xb4,
        0x46, 0x22, 0x76, 0x77, 0x25, 0x0d, 0x7f, 0xd1, 0x72, 0x11,
    ]
}

#[test]
fn test_context_key_lengths() {
    assert_eq!(
        Context::new(&[0; 15], &MASTER_SALT, ProtectionProfile::Aes128CmHmacSha1_80).err(),
        Some(Error::SrtpMasterKeyLength(16, 15))
    );
    assert_eq!(
        Context::new(&MASTER_KEY, &MASTER_SALT[..12], ProtectionProfile::Aes128CmHmacSha1_80)
            .err(),
        Some(Error::SrtpSaltLength(14, 12))
    );
    assert_eq!(
        Context::new(&MASTER_KEY, &MASTER_SALT, ProtectionProfile::AeadAes128Gcm).err(),
        Some(Error::SrtpSaltLength(12, 14))
    );
}

#[test]
fn test_encrypt_aes_cm_hmac_sha1_80() -> Result<()> {
    let mut ctx = Context::new(&MASTER_KEY, &MASTER_SALT, ProtectionProfile::Aes128CmHmacSha1_80)?;
    let plaintext = rtp_packet(0x1234);

    let encrypted = ctx.encrypt_rtp(&plaintext)?;
    assert_eq!(encrypted.len(), plaintext.len() + 10);
    assert_eq!(ctx.rtp_overhead(), 10);
    assert_eq!(&encrypted[..], &encrypted_aes_cm_80()[..]);

    let mut decrypter =
        Context::new(&MASTER_KEY, &MASTER_SALT, ProtectionProfile::Aes128CmHmacSha1_80)?;
    let decrypted = decrypter.decrypt_rtp(&encrypted)?;
    assert_eq!(&decrypted[..], &plaintext[..]);

    Ok(())
}

#[test]
fn test_encrypt_aes_cm_hmac_sha1_32() -> Result<()> {
    let mut ctx = Context::new(&MASTER_KEY, &MASTER_SALT, ProtectionProfile::Aes128CmHmacSha1_32)?;
    let plaintext = rtp_packet(0x1234);

    let encrypted = ctx.encrypt_rtp(&plaintext)?;
    assert_eq!(encrypted.len(), plaintext.len() + 4);
    // same keystream as _80, the tag is the truncated prefix
    assert_eq!(&encrypted[..], &encrypted_aes_cm_80()[..plaintext.len() + 4]);

    Ok(())
}

#[test]
fn test_encrypt_aead_aes_128_gcm() -> Result<()> {
    let mut ctx = Context::new(&MASTER_KEY, &MASTER_SALT[..12], ProtectionProfile::AeadAes128Gcm)?;
    let plaintext = rtp_packet(0x1234);

    let encrypted = ctx.encrypt_rtp(&plaintext)?;
    assert_eq!(encrypted.len(), plaintext.len() + 16);
    assert_eq!(
        &encrypted[..],
        &[
            0x80, 0xe0, 0x12, 0x34, 0x00, 0x00, 0x00, 0x64, 0x00, 0x00, 0x00, 0x2a, 0xe1, 0xdb,
            0x6a, 0x56, 0x9d, 0x5b, 0x0e, 0xc7, 0x85, 0xfa, 0x95, 0x96, 0x16, 0xcf, 0xd9, 0x97,
            0x6e, 0xaf, 0x95, 0x07, 0x73, 0xcc, 0x29, 0x23, 0xd7, 0x56, 0xd9, 0x06, 0x37, 0xd9,
            0xfa, 0x31,
        ][..]
    );

    let mut decrypter =
        Context::new(&MASTER_KEY, &MASTER_SALT[..12], ProtectionProfile::AeadAes128Gcm)?;
    assert_eq!(&decrypter.decrypt_rtp(&encrypted)?[..], &plaintext[..]);

    let mut tampered = encrypted.to_vec();
    tampered[14] ^= 0xff;
    assert_eq!(
        decrypter.decrypt_rtp(&tampered),
        Err(Error::RtpFailedToVerifyAuthTag)
    );
    Ok(())
}

#[test]
fn test_decrypt_rejects_bad_tag_and_short_packets() -> Result<()> {
    let mut ctx = Context::new(&MASTER_KEY, &MASTER_SALT, ProtectionProfile::Aes128CmHmacSha1_80)?;

    let mut tampered = encrypted_aes_cm_80();
    tampered[20] ^= 0x01;
    assert_eq!(ctx.decrypt_rtp(&tampered), Err(Error::RtpFailedToVerifyAuthTag));

    let short = &encrypted_aes_cm_80()[..16];
    assert_eq!(ctx.decrypt_rtp(short), Err(Error::SrtpTooSmall(16, 22)));

    assert_eq!(ctx.encrypt_rtp(&[0x80, 0xe0]).err(), Some(Error::ErrHeaderSizeInsufficient));
    Ok(())
}

#[test]
fn test_rollover_counter() -> Result<()> {
    let mut ctx = Context::new(&MASTER_KEY, &MASTER_SALT, ProtectionProfile::Aes128CmHmacSha1_80)?;
    assert_eq!(ctx.roc(42), None);

    ctx.encrypt_rtp(&rtp_packet(65534))?;
    ctx.encrypt_rtp(&rtp_packet(65535))?;
    assert_eq!(ctx.roc(42), Some(0));

    let wrapped = ctx.encrypt_rtp(&rtp_packet(0))?;
    assert_eq!(ctx.roc(42), Some(1));
    assert_eq!(
        &wrapped[..],
        &[
            0x80, 0xe0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x64, 0x00, 0x00, 0x00, 0x2a, 0x69, 0x8c,
            0x3c, 0x93, 0x38, 0x4d, 0xaa, 0xc8, 0x48, 0xba, 0x8c, 0x84, 0x50, 0x1b, 0x71, 0xa5,
            0x12, 0xef, 0x9e, 0x14, 0xc9, 0xb9, 0xac, 0xfd, 0x03, 0x52,
        ][..]
    );

    // a late packet from before the wrap keeps the old counter
    ctx.encrypt_rtp(&rtp_packet(65533))?;
    assert_eq!(ctx.roc(42), Some(1));

    Ok(())
}

#[test]
fn test_ssrc_state_estimate() {
    let mut state = SrtpSsrcState::default();
    assert_eq!(state.estimate_roc(100), 0);
    state.update(100, 0);
    assert_eq!(state.estimate_roc(101), 0);
    // far behind a low sequence number would be the previous cycle, clamped at zero
    assert_eq!(state.estimate_roc(65000), 0);

    state.update(65000, 0);
    assert_eq!(state.estimate_roc(10), 1);
    state.update(10, 1);
    assert_eq!(state.estimate_roc(65500), 0);
}
