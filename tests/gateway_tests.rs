use std::sync::Arc;
use std::time::Duration;

use ehub_gateway::artnet::ArtNetSender;
use ehub_gateway::ehub::{encode_config, encode_update};
use ehub_gateway::gateway::{start, Options};
use ehub_gateway::mapping::EntityMapper;
use ehub_gateway::patch::PatchOverlay;
use ehub_gateway::processor::PacketProcessor;
use ehub_gateway::stats::GatewayStats;
use ehub_gateway::{ControllerTopology, EntityRange, EntityUpdate};
use tokio::net::UdpSocket;

async fn recv_artnet(rx: &UdpSocket) -> Vec<u8> {
    let mut buf = [0u8; 1024];
    let n = tokio::time::timeout(Duration::from_secs(2), rx.recv(&mut buf))
        .await
        .expect("no ArtNet packet received")
        .unwrap();
    buf[..n].to_vec()
}

#[tokio::test]
async fn test_end_to_end_over_loopback() {
    let artnet_rx = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let artnet_port = artnet_rx.local_addr().unwrap().port();

    let mapper = EntityMapper::new(vec![ControllerTopology {
        ip: "127.0.0.1".into(),
        start_entity: 100,
        end_entity: 4858,
        universes: (0..32).collect(),
    }]);
    let mut patches = PatchOverlay::new();
    patches.add(1, 389);
    patches.enable();

    let processor = PacketProcessor::new(
        0,
        mapper,
        patches,
        ArtNetSender::new(100).with_port(artnet_port),
        Arc::new(GatewayStats::new()),
    );
    let handle = start(
        Options {
            addr: "127.0.0.1:0".parse().unwrap(),
            ehub_universe: 0,
            refresh_secs: 0,
        },
        processor,
    )
    .await
    .unwrap();
    let target = handle.local_addr();

    let tx = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    // noise, empty datagrams and a foreign universe must not stop the loop
    tx.send_to(b"not eHuB at all", target).await.unwrap();
    tx.send_to(&[], target).await.unwrap();
    tx.send_to(&encode_update(7, &[EntityUpdate::new(100, 1, 1, 1, 0)]).unwrap(), target)
        .await
        .unwrap();
    tx.send_to(&encode_config(0, &[EntityRange::new(0, 100, 169, 300)]).unwrap(), target)
        .await
        .unwrap();
    tx.send_to(
        &encode_update(0, &[EntityUpdate::new(100, 255, 128, 0, 0), EntityUpdate::new(270, 9, 8, 7, 0)]).unwrap(),
        target,
    )
    .await
    .unwrap();

    let mut universes = Vec::new();
    for _ in 0..2 {
        let pkt = recv_artnet(&artnet_rx).await;
        assert_eq!(pkt.len(), 530);
        assert_eq!(&pkt[..8], b"Art-Net\0");
        let universe = u16::from_le_bytes([pkt[14], pkt[15]]);
        match universe {
            0 => {
                assert_eq!(&pkt[18..21], &[255, 128, 0]);
                assert_eq!(pkt[18 + 388], 255);
            }
            1 => {
                assert_eq!(&pkt[18..21], &[9, 8, 7]);
                assert_eq!(pkt[18 + 388], 9);
            }
            other => panic!("unexpected universe {other}"),
        }
        universes.push(universe);
    }
    universes.sort_unstable();
    assert_eq!(universes, vec![0, 1]);

    // counters are bumped right after the batch leaves, give the task a moment
    let mut snap = handle.stats().snapshot();
    for _ in 0..50 {
        if snap.artnet_sent == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        snap = handle.stats().snapshot();
    }
    assert_eq!(snap.datagrams, 5);
    assert_eq!(snap.decode_errors, 2);
    assert_eq!(snap.filtered, 1);
    assert_eq!(snap.mapped_table_size, 201);
    assert_eq!(snap.artnet_sent, 2);
    assert_eq!(snap.sends_per_destination["127.0.0.1"], 2);

    handle.stop(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test]
async fn test_stop_without_traffic() {
    let processor = PacketProcessor::new(
        0,
        EntityMapper::new(Vec::new()),
        PatchOverlay::new(),
        ArtNetSender::new(40),
        Arc::new(GatewayStats::new()),
    );
    let handle = start(
        Options {
            addr: "127.0.0.1:0".parse().unwrap(),
            ehub_universe: 0,
            refresh_secs: 1,
        },
        processor,
    )
    .await
    .unwrap();
    handle.stop(Duration::from_secs(1)).await.unwrap();
}
