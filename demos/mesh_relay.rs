//! Three-hop mesh: a sensor reports through two relays, the root forwards the
//! collected telemetry upstream piggybacked on a request.

use tsch_int::coap::{self, Code, Message, MessageIdGenerator, MessageType};
use tsch_int::int::{
    FrameBuffer, FrameKind, IntConfig, IntEngine, PacketBuf, SimEnvironment, TelemetryRecord,
    TrafficOrigin,
};

const LINK_HEADER: usize = 21;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("In-band telemetry relay");
    println!("=======================\n");

    let config = IntConfig::default();
    let mut path = Vec::new();
    for (node_id, hops) in [(4u16, 3u16), (3, 2), (2, 1), (1, 0)] {
        let mut env = SimEnvironment::new(node_id, u64::from(node_id)).with_root_distance(hops);
        env.channel = 15 + node_id as u8;
        env.last_rssi = -50 - node_id as i8;
        env.asn = 0x2000 + u64::from(node_id) * 3;
        path.push(IntEngine::new(config.clone(), env)?);
    }

    let mut ids = MessageIdGenerator::new();
    let mut reading = Message::new(MessageType::Non, Code::POST, ids.next_id());
    reading.set_uri_path("sensors/temp");
    reading.set_payload(&b"21.5"[..]);
    let payload = coap::serialize(&reading)?;

    let mut frame = PacketBuf::outgoing(FrameKind::Data, vec![0u8; LINK_HEADER], &payload);
    let added = path[0].prepare_outgoing(&mut frame, TrafficOrigin::Originator);
    println!("node 4 sends {} bytes (+{added} telemetry)", frame.frame_len());

    let last = path.len() - 1;
    for hop in 1..=last {
        let mut received = frame.into_received();
        let node = &mut path[hop];
        let node_id = node.env().node_id;
        if let Some(content) = node.on_frame_received(&mut received, hop == last) {
            println!(
                "node {node_id} received seq {} with {} record(s)",
                content.header.sequence,
                content.records.len()
            );
        }
        if hop == last {
            let request = coap::parse(received.data())?;
            println!(
                "root delivered {:?} to /{}",
                std::str::from_utf8(request.payload())?,
                request.uri_path().unwrap_or_default()
            );
            break;
        }
        frame = PacketBuf::outgoing(FrameKind::Data, vec![0u8; LINK_HEADER], received.data());
        let added = node.prepare_outgoing(&mut frame, TrafficOrigin::Forwarder);
        println!("node {node_id} forwards {} bytes (+{added} telemetry)", frame.frame_len());
    }

    let root = &mut path[last];
    let mut report = Message::new(MessageType::Con, Code::POST, ids.next_id());
    report.set_uri_path("int/report");
    report.set_payload(&b"ok"[..]);
    let upstream = root.serialize_with_pending(&report)?;

    let (_, telemetry) = coap::parse_with_telemetry(&upstream)?;
    let telemetry = telemetry.unwrap_or_default();
    println!(
        "\nroot report: {} bytes, {} telemetry bytes, {} record(s) still queued",
        upstream.len(),
        telemetry.len(),
        root.pending_telemetry()
    );
    let layout = root.config().layout;
    for chunk in telemetry.chunks_exact(layout.record_size()) {
        if let TelemetryRecord::Sample(sample) = TelemetryRecord::decode(layout, chunk)? {
            println!(
                "  node {:>2}  channel {:>2}  slot {:#05x}  rssi {:>4} dBm",
                sample.node_id,
                sample.channel(),
                sample.slot(),
                sample.rssi
            );
        }
    }

    println!("\nroot stats: {:?}", root.stats());
    Ok(())
}
