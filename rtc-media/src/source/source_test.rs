use super::*;

fn init_log() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .is_test(true)
        .try_init()
        .ok();
}

const SOURCE_SDP: &str = "v=0\r\n\
o=- 0 0 IN IP4 127.0.0.1\r\n\
s=Live\r\n\
t=0 0\r\n\
m=video 0 RTP/AVP 96\r\n\
c=IN IP4 0.0.0.0\r\n\
a=rtpmap:96 H264/90000\r\n\
a=ssrc:1234 cname:live\r\n\
a=control:trackID=0\r\n\
m=audio 0 RTP/AVP 97\r\n\
a=rtpmap:97 MPEG4-GENERIC/44100/2\r\n\
a=control:trackID=1\r\n";

fn rtp(ssrc: u32, sequence_number: u16) -> Vec<u8> {
    let mut pkt = vec![0x80, 97];
    pkt.extend_from_slice(&sequence_number.to_be_bytes());
    pkt.extend_from_slice(&[0, 0, 0, 1]);
    pkt.extend_from_slice(&ssrc.to_be_bytes());
    pkt.extend_from_slice(&[0xde, 0xad]);
    pkt
}

#[test]
fn test_source_sdp_lookups() -> Result<()> {
    init_log();
    let source = MediaSource::new(SOURCE_SDP, 8)?;
    assert_eq!(source.sdp(), SOURCE_SDP);
    assert!(source.has_track(TrackType::Video));
    assert_eq!(source.payload_type(TrackType::Video)?, 96);
    assert_eq!(source.payload_type(TrackType::Audio)?, 97);
    assert_eq!(source.ssrc(TrackType::Video), Some(1234));
    assert_eq!(source.ssrc(TrackType::Audio), None);
    Ok(())
}

#[test]
fn test_missing_track() -> Result<()> {
    init_log();
    let video_only = "v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\nm=video 0 RTP/AVP 96\r\n";
    let source = MediaSource::new(video_only, 8)?;
    assert!(!source.has_track(TrackType::Audio));
    assert_eq!(
        source.payload_type(TrackType::Audio),
        Err(Error::ErrNoSuchTrack("audio".to_owned()))
    );
    Ok(())
}

#[test]
fn test_invalid_sdp() {
    init_log();
    assert!(matches!(
        MediaSource::new("not an sdp", 8),
        Err(Error::OtherSdpErr(_))
    ));
}

#[test]
fn test_ssrc_learned_from_first_packet() -> Result<()> {
    init_log();
    let source = MediaSource::new(SOURCE_SDP, 8)?;
    source.write(vec![
        MediaPacket::from_rtp(TrackType::Audio, &rtp(777, 1))?,
        MediaPacket::from_rtp(TrackType::Audio, &rtp(888, 2))?,
        MediaPacket::from_rtp(TrackType::Video, &rtp(999, 1))?,
    ]);
    assert_eq!(source.ssrc(TrackType::Audio), Some(777));
    // announced ssrc wins over the packets
    assert_eq!(source.ssrc(TrackType::Video), Some(1234));
    Ok(())
}

#[tokio::test]
async fn test_ring_fan_out() -> Result<()> {
    init_log();
    let source = MediaSource::new(SOURCE_SDP, 8)?;
    source.write(vec![MediaPacket::from_rtp(TrackType::Video, &rtp(1234, 0))?]);

    let mut first = source.attach();
    let mut second = source.attach();
    assert_eq!(source.reader_count(), 2);
    assert!(first.try_recv().is_none(), "bundles written before attach are not seen");

    let packet = MediaPacket::from_rtp(TrackType::Video, &rtp(1234, 1))?;
    source.write(vec![packet.clone()]);

    let data = first.recv().await.expect("bundle");
    assert_eq!(data.as_slice(), &[packet.clone()]);
    let data = second.try_recv().expect("bundle");
    assert_eq!(data[0], packet);

    first.detach();
    assert_eq!(source.reader_count(), 1);
    drop(second);
    assert_eq!(source.reader_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_slow_reader_skips_lost_bundles() -> Result<()> {
    init_log();
    let source = MediaSource::new(SOURCE_SDP, 2)?;
    let mut reader = source.attach();

    for seq in 0..5u16 {
        source.write(vec![MediaPacket::from_rtp(TrackType::Video, &rtp(1234, seq))?]);
    }

    let data = reader.recv().await.expect("bundle");
    assert_eq!(reader.skipped(), 3);
    let header = RtpHeader::unmarshal(data[0].rtp())?;
    assert_eq!(header.sequence_number, 3);

    let data = reader.try_recv().expect("bundle");
    assert_eq!(RtpHeader::unmarshal(data[0].rtp())?.sequence_number, 4);
    assert!(reader.try_recv().is_none());
    Ok(())
}

#[tokio::test]
async fn test_reader_ends_with_source() -> Result<()> {
    init_log();
    let source = MediaSource::new(SOURCE_SDP, 2)?;
    let mut reader = source.attach();
    drop(source);
    assert!(reader.recv().await.is_none());
    Ok(())
}
