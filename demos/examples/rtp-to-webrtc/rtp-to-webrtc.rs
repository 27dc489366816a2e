use anyhow::Result;
use clap::Parser;
use dtls::Fingerprint;
use log::{error, trace, warn};
use media::{MediaPacket, MediaSource, TrackType};
use rtc::{TransportConfigBuilder, UdpWebRtcTransport};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::broadcast;

const RTP_MTU: usize = 1600;

#[derive(Parser)]
#[command(name = "rtp-to-webrtc")]
#[command(author = "edge-rtc developers")]
#[command(version = "0.1.0")]
#[command(about = "Forwards plain RTP video received on a UDP port to one WebRTC peer")]
struct Cli {
    #[arg(short, long)]
    debug: bool,
    #[arg(short, long, default_value_t = format!("INFO"))]
    log_level: String,
    #[arg(short, long, default_value_t = format!(""))]
    output_log_file: String,
    #[arg(short, long, default_value_t = 5004)]
    rtp_port: u16,
    /// SDP describing the incoming RTP, e.g. as written by `ffmpeg -sdp_file`
    #[arg(short, long)]
    source_sdp_file: String,
    /// IP to advertise in the answer instead of the detected local one
    #[arg(short, long)]
    announced_ip: Option<IpAddr>,
    /// Expected browser certificate fingerprint, e.g. "sha-256 AB:CD:..."
    #[arg(long)]
    remote_fingerprint: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.debug {
        edge_demos::init_log(&cli.log_level, &cli.output_log_file)?;
    }

    let source_sdp = std::fs::read_to_string(&cli.source_sdp_file)?;

    let mut builder = TransportConfigBuilder::new();
    if let Some(announced_ip) = cli.announced_ip {
        builder = builder.with_announced_ip(announced_ip);
    }
    let config = builder.build();
    let source = Arc::new(MediaSource::new(&source_sdp, config.ring_size())?);

    let rtp_listener = UdpSocket::bind(SocketAddr::from(([127, 0, 0, 1], cli.rtp_port))).await?;
    println!("Listening for RTP packets on {}", rtp_listener.local_addr()?);

    // The answer announces the source SSRC, so wait until it is known.
    let mut buf = vec![0u8; RTP_MTU];
    let (n, _) = rtp_listener.recv_from(&mut buf).await?;
    source.write(vec![MediaPacket::from_rtp(TrackType::Video, &buf[..n])?]);
    println!("First RTP packet received");

    let mut transport = UdpWebRtcTransport::bind(config, Arc::clone(&source)).await?;
    if let Some(remote_fingerprint) = &cli.remote_fingerprint {
        transport
            .transport_mut()
            .set_remote_fingerprint(Fingerprint::try_from(remote_fingerprint.as_str())?)?;
    }
    println!("\nAnswer for the browser:\n{}", transport.local_sdp()?);

    let forward_source = Arc::clone(&source);
    tokio::spawn(async move {
        let mut buf = vec![0u8; RTP_MTU];
        loop {
            match rtp_listener.recv_from(&mut buf).await {
                Ok((n, _)) => match MediaPacket::from_rtp(TrackType::Video, &buf[..n]) {
                    Ok(packet) => {
                        trace!("received {n} bytes of RTP");
                        forward_source.write(vec![packet]);
                    }
                    Err(err) => warn!("dropping RTP packet: {err}"),
                },
                Err(err) => {
                    error!("rtp_listener read error: {err}");
                    break;
                }
            }
        }
    });

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\nReceived Ctrl-C, shutting down...");
        }
        let _ = shutdown_tx.send(());
    });

    println!("Press ctrl-c to stop");
    transport.run(shutdown_rx).await?;

    Ok(())
}
